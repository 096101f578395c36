//! Built-in demo endpoints mounted by `switchyard serve`.

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::context::RequestContext;
use crate::procedure::{Procedure, Reply};
use crate::servers::PageResult;

/// Payload of the `echo` procedure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EchoMessage {
    #[serde(rename = "Field")]
    pub field: String,
}

/// Returns its input unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct EchoProcedure;

impl Procedure for EchoProcedure {
    type Input = EchoMessage;
    type Output = EchoMessage;

    fn handle(&self, _ctx: &RequestContext, input: EchoMessage) -> Reply<EchoMessage> {
        Reply::ok(input)
    }
}

/// Page handler exposing the request itself as template data:
/// `path`, `method`, `query` and `request_id`.
pub fn echo_page(ctx: &RequestContext) -> PageResult {
    Ok(json!({
        "path": ctx.path(),
        "method": ctx.method().as_str(),
        "query": ctx.query_params(),
        "request_id": ctx.request_id().to_string(),
    }))
}
