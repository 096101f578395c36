use std::any::Any;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use thiserror::Error;
use tracing::error;

use super::core::{Message, Procedure, ProcedureError, TypeInfo};
use crate::codec::{CodecError, MessageCodec};
use crate::context::RequestContext;
use crate::envelope::Envelope;

/// A message whose concrete type has been erased for storage behind
/// [`ErasedProcedure`]. Carries its [`TypeInfo`] so mismatches are detectable.
pub struct ErasedMessage {
    ty: TypeInfo,
    value: Box<dyn Any + Send>,
}

impl ErasedMessage {
    pub fn new<T: Message>(value: T) -> Self {
        Self {
            ty: TypeInfo::of::<T>(),
            value: Box::new(value),
        }
    }

    pub fn message_type(&self) -> TypeInfo {
        self.ty
    }

    /// Recover the concrete message, or get `self` back if `T` is the wrong type.
    pub fn downcast<T: Message>(self) -> Result<T, Self> {
        let ty = self.ty;
        match self.value.downcast::<T>() {
            Ok(value) => Ok(*value),
            Err(value) => Err(Self { ty, value }),
        }
    }
}

impl fmt::Debug for ErasedMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ErasedMessage")
            .field("type", &self.ty.name())
            .finish_non_exhaustive()
    }
}

/// The payload could not be decoded into the procedure's input type.
#[derive(Debug, Error)]
#[error("cannot decode `{expected}` from request body: {source}")]
pub struct DecodeError {
    pub expected: &'static str,
    #[source]
    pub source: CodecError,
}

/// The procedure call did not produce a usable message.
#[derive(Debug, Error)]
pub enum InvokeError {
    #[error("expected input message `{expected}`, got `{found}`")]
    InputMismatch {
        expected: &'static str,
        found: &'static str,
    },
    #[error("expected output message `{expected}`, got `{found}`")]
    OutputMismatch {
        expected: &'static str,
        found: &'static str,
    },
    /// The procedure returned an error. Any message returned alongside it is discarded.
    #[error("procedure failed: {0}")]
    Failed(#[source] ProcedureError),
    #[error("procedure returned neither a message nor an error")]
    EmptyReply,
    #[error("procedure panicked: {0}")]
    Panicked(String),
    #[error("failed to encode response: {0}")]
    Encode(#[source] CodecError),
}

/// Object-safe view of a validated procedure.
///
/// None of these methods panic; every structural problem is reported as an error.
pub trait ErasedProcedure: Send + Sync {
    fn input_type(&self) -> TypeInfo;

    fn output_type(&self) -> TypeInfo;

    /// Decode `bytes` into a fresh instance of the declared input type.
    fn decode_input(&self, bytes: &[u8]) -> Result<ErasedMessage, DecodeError>;

    /// Call the procedure with `input` and normalize its reply.
    fn invoke(&self, ctx: &RequestContext, input: ErasedMessage) -> Result<ErasedMessage, InvokeError>;

    /// Encode a success envelope around `output`.
    fn encode_success(&self, output: ErasedMessage) -> Result<Vec<u8>, InvokeError>;
}

/// Binds one [`Procedure`] to a codec.
pub struct ProcedureAdapter<P, C> {
    procedure: P,
    codec: Arc<C>,
}

impl<P, C> ProcedureAdapter<P, C>
where
    P: Procedure,
    C: MessageCodec,
{
    pub fn new(procedure: P, codec: Arc<C>) -> Self {
        Self { procedure, codec }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

impl<P, C> ErasedProcedure for ProcedureAdapter<P, C>
where
    P: Procedure,
    C: MessageCodec,
{
    fn input_type(&self) -> TypeInfo {
        TypeInfo::of::<P::Input>()
    }

    fn output_type(&self) -> TypeInfo {
        TypeInfo::of::<P::Output>()
    }

    fn decode_input(&self, bytes: &[u8]) -> Result<ErasedMessage, DecodeError> {
        self.codec
            .decode::<P::Input>(bytes)
            .map(ErasedMessage::new)
            .map_err(|source| DecodeError {
                expected: std::any::type_name::<P::Input>(),
                source,
            })
    }

    fn invoke(&self, ctx: &RequestContext, input: ErasedMessage) -> Result<ErasedMessage, InvokeError> {
        let input = input
            .downcast::<P::Input>()
            .map_err(|other| InvokeError::InputMismatch {
                expected: std::any::type_name::<P::Input>(),
                found: other.message_type().name(),
            })?;

        let reply = catch_unwind(AssertUnwindSafe(|| self.procedure.handle(ctx, input)))
            .map_err(|payload| {
                let message = panic_message(payload.as_ref());
                error!(request_id = %ctx.request_id(), path = %ctx.path(), panic = %message, "Procedure panicked");
                InvokeError::Panicked(message)
            })?;

        match reply.into_parts() {
            (_, Some(err)) => Err(InvokeError::Failed(err)),
            (Some(message), None) => Ok(ErasedMessage::new(message)),
            (None, None) => Err(InvokeError::EmptyReply),
        }
    }

    fn encode_success(&self, output: ErasedMessage) -> Result<Vec<u8>, InvokeError> {
        let output = output
            .downcast::<P::Output>()
            .map_err(|other| InvokeError::OutputMismatch {
                expected: std::any::type_name::<P::Output>(),
                found: other.message_type().name(),
            })?;
        self.codec
            .encode(&Envelope::success(output))
            .map_err(InvokeError::Encode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::JsonCodec;
    use crate::procedure::{procedure_fn, Reply};
    use http::Method;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    #[allow(non_snake_case)]
    struct DemoReq {
        Field: String,
    }

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    #[allow(non_snake_case)]
    struct DemoRsp {
        Field: String,
    }

    fn demo(_ctx: &RequestContext, req: DemoReq) -> Reply<DemoRsp> {
        match req.Field.as_str() {
            "Error" => Reply::err("error"),
            "Nil" => Reply::empty(),
            "Both" => Reply::both(DemoRsp { Field: "Both".into() }, "both error"),
            "Panic" => panic!("handler blew up"),
            _ => Reply::ok(DemoRsp { Field: req.Field }),
        }
    }

    fn adapter() -> impl ErasedProcedure {
        ProcedureAdapter::new(procedure_fn(demo), Arc::new(JsonCodec))
    }

    fn ctx() -> RequestContext {
        RequestContext::new(Method::POST, "/api/demo")
    }

    #[test]
    fn test_decode_input() {
        let decoded = adapter().decode_input(br#"{"Field":"hello"}"#).unwrap();
        assert_eq!(decoded.message_type(), TypeInfo::of::<DemoReq>());
        assert_eq!(
            decoded.downcast::<DemoReq>().unwrap(),
            DemoReq { Field: "hello".into() }
        );
    }

    #[test]
    fn test_decode_input_rejects_mismatch() {
        let err = adapter().decode_input(br#"{"Field":[1,2]}"#).unwrap_err();
        assert!(err.expected.ends_with("DemoReq"));
        assert!(adapter().decode_input(b"garbage").is_err());
    }

    #[test]
    fn test_invoke_outcomes() {
        let adapter = adapter();
        let call = |field: &str| {
            adapter.invoke(&ctx(), ErasedMessage::new(DemoReq { Field: field.into() }))
        };

        let ok = call("HelloWorld").unwrap();
        assert_eq!(
            ok.downcast::<DemoRsp>().unwrap(),
            DemoRsp { Field: "HelloWorld".into() }
        );
        assert!(matches!(call("Error"), Err(InvokeError::Failed(_))));
        assert!(matches!(call("Nil"), Err(InvokeError::EmptyReply)));
        // An error always wins over a returned message.
        match call("Both") {
            Err(InvokeError::Failed(e)) => assert_eq!(e.message(), "both error"),
            other => panic!("expected failure, got {other:?}"),
        }
        match call("Panic") {
            Err(InvokeError::Panicked(msg)) => assert_eq!(msg, "handler blew up"),
            other => panic!("expected panic report, got {other:?}"),
        }
    }

    #[test]
    fn test_invoke_rejects_wrong_input_type() {
        let err = adapter()
            .invoke(&ctx(), ErasedMessage::new("not a DemoReq".to_string()))
            .unwrap_err();
        assert!(matches!(err, InvokeError::InputMismatch { .. }));
    }

    #[test]
    fn test_encode_success_envelope() {
        let adapter = adapter();
        let bytes = adapter
            .encode_success(ErasedMessage::new(DemoRsp { Field: "hi".into() }))
            .unwrap();
        assert_eq!(bytes, br#"{"code":0,"msg":"","data":{"Field":"hi"}}"#);
        assert!(matches!(
            adapter.encode_success(ErasedMessage::new(1u8)),
            Err(InvokeError::OutputMismatch { .. })
        ));
    }
}
