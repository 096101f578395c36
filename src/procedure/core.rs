use std::any::TypeId;
use std::fmt;
use std::marker::PhantomData;

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

use crate::context::RequestContext;

/// Identity of a concrete Rust type, recorded at registration time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeInfo {
    id: TypeId,
    name: &'static str,
}

impl TypeInfo {
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    pub fn id(&self) -> TypeId {
        self.id
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl fmt::Display for TypeInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// The message capability: anything that can cross the wire as an API input or output.
///
/// Implemented for every serde type that is `Send + Sync + 'static`; a message is
/// identified by its [`TypeInfo`].
pub trait Message: Serialize + DeserializeOwned + Send + Sync + 'static {
    fn message_type() -> TypeInfo
    where
        Self: Sized,
    {
        TypeInfo::of::<Self>()
    }
}

impl<T> Message for T where T: Serialize + DeserializeOwned + Send + Sync + 'static {}

/// Error returned by a procedure. Only a generic failure indicator reaches the client;
/// the message is logged.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct ProcedureError {
    message: String,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl ProcedureError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<&str> for ProcedureError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

impl From<String> for ProcedureError {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}

impl From<anyhow::Error> for ProcedureError {
    fn from(err: anyhow::Error) -> Self {
        Self::new(format!("{err:#}"))
    }
}

/// The (message, error) pair a procedure hands back.
///
/// Both halves are optional so that every outcome a handler can produce is
/// representable; the adapter decides what counts as success. An error always wins
/// over a message, and a reply with neither is a failure.
#[derive(Debug)]
pub struct Reply<O> {
    message: Option<O>,
    error: Option<ProcedureError>,
}

impl<O> Reply<O> {
    pub fn ok(message: O) -> Self {
        Self {
            message: Some(message),
            error: None,
        }
    }

    pub fn err(error: impl Into<ProcedureError>) -> Self {
        Self {
            message: None,
            error: Some(error.into()),
        }
    }

    pub fn empty() -> Self {
        Self {
            message: None,
            error: None,
        }
    }

    pub fn both(message: O, error: impl Into<ProcedureError>) -> Self {
        Self {
            message: Some(message),
            error: Some(error.into()),
        }
    }

    pub fn into_parts(self) -> (Option<O>, Option<ProcedureError>) {
        (self.message, self.error)
    }
}

/// Conversion into a [`Reply`], so procedures can return `Result` directly.
pub trait IntoReply {
    type Output;

    fn into_reply(self) -> Reply<Self::Output>;
}

impl<O> IntoReply for Reply<O> {
    type Output = O;

    fn into_reply(self) -> Reply<O> {
        self
    }
}

impl<O, E> IntoReply for Result<O, E>
where
    E: Into<ProcedureError>,
{
    type Output = O;

    fn into_reply(self) -> Reply<O> {
        match self {
            Ok(message) => Reply::ok(message),
            Err(error) => Reply::err(error),
        }
    }
}

/// An API procedure: one typed message in, one typed message out.
///
/// ```rust
/// use serde::{Deserialize, Serialize};
/// use switchyard::context::RequestContext;
/// use switchyard::procedure::{Procedure, Reply};
///
/// #[derive(Serialize, Deserialize)]
/// struct Ping { seq: u32 }
///
/// struct Pong;
///
/// impl Procedure for Pong {
///     type Input = Ping;
///     type Output = Ping;
///
///     fn handle(&self, _ctx: &RequestContext, input: Ping) -> Reply<Ping> {
///         Reply::ok(Ping { seq: input.seq + 1 })
///     }
/// }
/// ```
pub trait Procedure: Send + Sync + 'static {
    type Input: Message;
    type Output: Message;

    fn handle(&self, ctx: &RequestContext, input: Self::Input) -> Reply<Self::Output>;
}

/// A closure adapted into a [`Procedure`]. Built by [`procedure_fn`].
pub struct FnProcedure<F, I, R> {
    f: F,
    _marker: PhantomData<fn(I) -> R>,
}

/// Adapt a closure `Fn(&RequestContext, I) -> R` into a [`Procedure`], where `R` is a
/// [`Reply`] or a `Result`.
pub fn procedure_fn<F, I, R>(f: F) -> FnProcedure<F, I, R>
where
    F: Fn(&RequestContext, I) -> R + Send + Sync + 'static,
    I: Message,
    R: IntoReply + 'static,
    R::Output: Message,
{
    FnProcedure {
        f,
        _marker: PhantomData,
    }
}

impl<F, I, R> Procedure for FnProcedure<F, I, R>
where
    F: Fn(&RequestContext, I) -> R + Send + Sync + 'static,
    I: Message,
    R: IntoReply + 'static,
    R::Output: Message,
{
    type Input = I;
    type Output = R::Output;

    fn handle(&self, ctx: &RequestContext, input: I) -> Reply<R::Output> {
        (self.f)(ctx, input).into_reply()
    }
}
