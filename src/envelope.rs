//! Uniform response envelope written by the API sub-server.
//!
//! Every API response is an envelope, success or not, and is sent with transport status
//! 200; the `code` field carries the outcome. On failure `data` is omitted.

use serde::{Deserialize, Serialize};

/// Outcome codes carried in [`Envelope::code`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvelopeCode {
    Success,
    ServiceNotFound,
    InternalError,
    ParseError,
    ReadError,
}

impl EnvelopeCode {
    pub const fn code(self) -> i32 {
        match self {
            EnvelopeCode::Success => 0,
            EnvelopeCode::ServiceNotFound => -100001,
            EnvelopeCode::InternalError => -100002,
            EnvelopeCode::ParseError => -100003,
            EnvelopeCode::ReadError => -100004,
        }
    }

    /// Client-facing message for this outcome.
    pub const fn message(self) -> &'static str {
        match self {
            EnvelopeCode::Success => "",
            EnvelopeCode::ServiceNotFound => "service not found",
            EnvelopeCode::InternalError => "invoke error",
            EnvelopeCode::ParseError => "req param type not match",
            EnvelopeCode::ReadError => "read request body fail",
        }
    }

    pub fn from_code(code: i32) -> Option<Self> {
        [
            EnvelopeCode::Success,
            EnvelopeCode::ServiceNotFound,
            EnvelopeCode::InternalError,
            EnvelopeCode::ParseError,
            EnvelopeCode::ReadError,
        ]
        .into_iter()
        .find(|c| c.code() == code)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub code: i32,
    pub msg: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> Envelope<T> {
    pub fn success(data: T) -> Self {
        Self {
            code: EnvelopeCode::Success.code(),
            msg: String::new(),
            data: Some(data),
        }
    }

    pub fn failure(code: EnvelopeCode) -> Self {
        Self {
            code: code.code(),
            msg: code.message().to_string(),
            data: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.code == EnvelopeCode::Success.code()
    }
}
