use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use super::adapter::{ErasedProcedure, ProcedureAdapter};
use super::core::{Procedure, TypeInfo};
use crate::codec::MessageCodec;

/// One parameter or return position of a procedure signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    /// The per-request [`RequestContext`](crate::context::RequestContext).
    Context,
    /// A type with the message capability.
    Message(TypeInfo),
    /// The error half of the reply.
    Error,
    /// Any other value.
    Value(TypeInfo),
}

impl Slot {
    fn describe(&self) -> String {
        match self {
            Slot::Context => "the request context".to_string(),
            Slot::Message(ty) => format!("message `{ty}`"),
            Slot::Error => "an error".to_string(),
            Slot::Value(ty) => format!("non-message value `{ty}`"),
        }
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Slot::Context => f.write_str("&RequestContext"),
            Slot::Message(ty) | Slot::Value(ty) => f.write_str(ty.name()),
            Slot::Error => f.write_str("ProcedureError"),
        }
    }
}

/// Shape of a procedure: its parameter and return slots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    params: Vec<Slot>,
    returns: Vec<Slot>,
}

impl Signature {
    pub fn new(params: Vec<Slot>, returns: Vec<Slot>) -> Self {
        Self { params, returns }
    }

    /// Signature of a typed [`Procedure`].
    pub fn of<P: Procedure>() -> Self {
        Self {
            params: vec![
                Slot::Context,
                Slot::Message(TypeInfo::of::<P::Input>()),
            ],
            returns: vec![
                Slot::Message(TypeInfo::of::<P::Output>()),
                Slot::Error,
            ],
        }
    }

    pub fn params(&self) -> &[Slot] {
        &self.params
    }

    pub fn returns(&self) -> &[Slot] {
        &self.returns
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let join = |slots: &[Slot]| {
            slots
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", ")
        };
        write!(f, "fn({}) -> ({})", join(&self.params), join(&self.returns))
    }
}

/// A signature that does not satisfy the procedure contract.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContractError {
    #[error("expected 2 parameters (context, message), found {0}")]
    ParamCount(usize),
    #[error("expected 2 return values (message, error), found {0}")]
    ReturnCount(usize),
    #[error("parameter {position} must be {expected}, found {found}")]
    Param {
        position: usize,
        expected: &'static str,
        found: String,
    },
    #[error("return value {position} must be {expected}, found {found}")]
    Return {
        position: usize,
        expected: &'static str,
        found: String,
    },
}

/// Input and output identities of a signature that passed validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Contract {
    pub input: TypeInfo,
    pub output: TypeInfo,
}

/// Checks procedure signatures at registration time.
pub struct ContractValidator;

impl ContractValidator {
    /// Validate `signature` against the procedure contract:
    /// `(context, message) -> (message, error)`.
    ///
    /// Pure; reports the first offending position.
    pub fn validate(signature: &Signature) -> Result<Contract, ContractError> {
        let params = signature.params();
        if params.len() != 2 {
            return Err(ContractError::ParamCount(params.len()));
        }
        if params[0] != Slot::Context {
            return Err(ContractError::Param {
                position: 0,
                expected: "the request context",
                found: params[0].describe(),
            });
        }
        let input = match params[1] {
            Slot::Message(ty) => ty,
            other => {
                return Err(ContractError::Param {
                    position: 1,
                    expected: "a message",
                    found: other.describe(),
                })
            }
        };

        let returns = signature.returns();
        if returns.len() != 2 {
            return Err(ContractError::ReturnCount(returns.len()));
        }
        let output = match returns[0] {
            Slot::Message(ty) => ty,
            other => {
                return Err(ContractError::Return {
                    position: 0,
                    expected: "a message",
                    found: other.describe(),
                })
            }
        };
        if returns[1] != Slot::Error {
            return Err(ContractError::Return {
                position: 1,
                expected: "an error",
                found: returns[1].describe(),
            });
        }

        Ok(Contract { input, output })
    }
}

/// A validated procedure, bound to its codec and ready to serve.
///
/// Only [`ProcedureDescriptor::bind`] creates descriptors, so nothing is invocable
/// without having passed [`ContractValidator::validate`].
#[derive(Clone)]
pub struct ProcedureDescriptor {
    contract: Contract,
    signature: Signature,
    callable: Arc<dyn ErasedProcedure>,
}

impl ProcedureDescriptor {
    pub fn bind<P, C>(procedure: P, codec: Arc<C>) -> Result<Self, ContractError>
    where
        P: Procedure,
        C: MessageCodec,
    {
        let signature = Signature::of::<P>();
        let contract = ContractValidator::validate(&signature)?;
        Ok(Self {
            contract,
            signature,
            callable: Arc::new(ProcedureAdapter::new(procedure, codec)),
        })
    }

    pub fn input_type(&self) -> TypeInfo {
        self.contract.input
    }

    pub fn output_type(&self) -> TypeInfo {
        self.contract.output
    }

    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    pub fn callable(&self) -> &dyn ErasedProcedure {
        self.callable.as_ref()
    }
}

impl fmt::Debug for ProcedureDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcedureDescriptor")
            .field("signature", &self.signature.to_string())
            .finish()
    }
}
