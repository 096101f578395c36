//! # Procedure Module
//!
//! Typed API procedures and the machinery that turns wire bytes into procedure calls.
//!
//! ## Overview
//!
//! A procedure takes the request context plus one typed message and hands back a
//! [`Reply`] holding a typed message and/or an error. Registration goes through three
//! steps, all at startup:
//!
//! 1. [`Signature::of`] records the procedure's shape from its associated types.
//! 2. [`ContractValidator::validate`] checks the shape is
//!    `(context, message) -> (message, error)` and records the input/output identities.
//! 3. [`ProcedureDescriptor::bind`] wraps the procedure in a [`ProcedureAdapter`] bound
//!    to the server's codec and erases its types so descriptors can live in one table.
//!
//! At request time the adapter decodes the body into the declared input type, calls the
//! procedure and normalizes the reply:
//!
//! | Reply                 | Outcome                        |
//! |-----------------------|--------------------------------|
//! | message, no error     | success                        |
//! | error (with or without message) | [`InvokeError::Failed`], message discarded |
//! | neither               | [`InvokeError::EmptyReply`]    |
//! | panic                 | [`InvokeError::Panicked`]      |
//!
//! Shape mismatches are compile errors for typed procedures; the validator exists so
//! the check lives in one place and runs only at registration, never on the request
//! path.
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use serde::{Deserialize, Serialize};
//! use switchyard::codec::JsonCodec;
//! use switchyard::context::RequestContext;
//! use switchyard::procedure::{procedure_fn, ProcedureDescriptor, ProcedureError};
//!
//! #[derive(Serialize, Deserialize)]
//! struct Greeting { name: String }
//!
//! let greet = procedure_fn(|_ctx: &RequestContext, g: Greeting| -> Result<Greeting, ProcedureError> {
//!     Ok(Greeting { name: format!("hello {}", g.name) })
//! });
//! let descriptor = ProcedureDescriptor::bind(greet, Arc::new(JsonCodec)).unwrap();
//! assert!(descriptor.input_type().name().ends_with("Greeting"));
//! ```

mod adapter;
mod contract;
mod core;

pub use adapter::{DecodeError, ErasedMessage, ErasedProcedure, InvokeError, ProcedureAdapter};
pub use contract::{Contract, ContractError, ContractValidator, ProcedureDescriptor, Signature, Slot};
pub use self::core::{
    procedure_fn, FnProcedure, IntoReply, Message, Procedure, ProcedureError, Reply, TypeInfo,
};
