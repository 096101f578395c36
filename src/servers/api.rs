use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, error, info, warn};

use super::{normalize_route, ServerKind, SubServer};
use crate::codec::{JsonCodec, MessageCodec};
use crate::context::{RequestContext, ResponseWriter};
use crate::envelope::{Envelope, EnvelopeCode};
use crate::error::ConfigError;
use crate::procedure::{InvokeError, Procedure, ProcedureDescriptor};

/// Typed procedures keyed by service name, answered with [`Envelope`]s.
///
/// The service name is the request path with the route prefix stripped, so a procedure
/// registered as `echo` under route `/api/` answers `/api/echo`. Lookup is exact; there is
/// no method fallback and any HTTP method is accepted.
///
/// Every response is an envelope sent with transport status 200.
pub struct ApiServer<C: MessageCodec = JsonCodec> {
    pattern: String,
    codec: Arc<C>,
    procedures: HashMap<String, ProcedureDescriptor>,
}

impl ApiServer<JsonCodec> {
    /// API server using the JSON codec.
    pub fn json(route: &str) -> Result<Self, ConfigError> {
        Self::new(route, JsonCodec)
    }
}

impl<C: MessageCodec> ApiServer<C> {
    pub fn new(route: &str, codec: C) -> Result<Self, ConfigError> {
        Ok(Self {
            pattern: normalize_route(route, true)?,
            codec: Arc::new(codec),
            procedures: HashMap::new(),
        })
    }

    /// Validate `procedure` and bind it under `service`.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::InvalidServiceName`] for an empty name or one containing `/`
    /// - [`ConfigError::DuplicateService`] if `service` is taken; the existing binding
    ///   stays in place
    /// - [`ConfigError::Contract`] if the procedure fails validation
    pub fn register<P: Procedure>(&mut self, service: &str, procedure: P) -> Result<(), ConfigError> {
        if service.is_empty() || service.contains('/') {
            return Err(ConfigError::InvalidServiceName(service.to_string()));
        }
        if self.procedures.contains_key(service) {
            return Err(ConfigError::DuplicateService(service.to_string()));
        }
        let descriptor = ProcedureDescriptor::bind(procedure, Arc::clone(&self.codec)).map_err(
            |source| ConfigError::Contract {
                service: service.to_string(),
                source,
            },
        )?;
        info!(
            route = %self.pattern,
            service = %service,
            signature = %descriptor.signature(),
            "Procedure registered"
        );
        self.procedures.insert(service.to_string(), descriptor);
        Ok(())
    }

    pub fn descriptor(&self, service: &str) -> Option<&ProcedureDescriptor> {
        self.procedures.get(service)
    }

    /// Registered service names, sorted.
    pub fn services(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.procedures.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    fn service_name<'a>(&self, path: &'a str) -> &'a str {
        path.strip_prefix(self.pattern.as_str()).unwrap_or(path)
    }

    fn write_failure(&self, out: &mut ResponseWriter, code: EnvelopeCode) {
        self.write_envelope(out, &Envelope::<()>::failure(code));
    }

    fn write_envelope<T: serde::Serialize>(&self, out: &mut ResponseWriter, envelope: &Envelope<T>) {
        match self.codec.encode(envelope) {
            Ok(bytes) => self.write_payload(out, bytes),
            Err(e) => {
                error!(codec = self.codec.name(), error = %e, "Failed to encode envelope");
                out.write_status(500);
            }
        }
    }

    fn write_payload(&self, out: &mut ResponseWriter, bytes: Vec<u8>) {
        out.set_status(200);
        out.set_content_type(self.codec.content_type());
        out.set_body(bytes);
    }
}

impl<C: MessageCodec> SubServer for ApiServer<C> {
    fn pattern(&self) -> &str {
        &self.pattern
    }

    fn kind(&self) -> ServerKind {
        ServerKind::Api
    }

    fn handle(&self, ctx: &RequestContext, out: &mut ResponseWriter) {
        let service = self.service_name(ctx.path());
        debug!(request_id = %ctx.request_id(), method = %ctx.method(), service = %service, "API request");

        if ctx.body_read_failed() {
            warn!(request_id = %ctx.request_id(), service = %service, "Request body could not be read");
            self.write_failure(out, EnvelopeCode::ReadError);
            return;
        }

        let Some(descriptor) = self.procedures.get(service) else {
            warn!(request_id = %ctx.request_id(), service = %service, "Service not found");
            self.write_failure(out, EnvelopeCode::ServiceNotFound);
            return;
        };
        let procedure = descriptor.callable();

        let input = match procedure.decode_input(ctx.body()) {
            Ok(input) => input,
            Err(e) => {
                warn!(request_id = %ctx.request_id(), service = %service, error = %e, "Request body does not match input type");
                self.write_failure(out, EnvelopeCode::ParseError);
                return;
            }
        };

        let encoded = procedure
            .invoke(ctx, input)
            .and_then(|output| procedure.encode_success(output));
        match encoded {
            Ok(bytes) => self.write_payload(out, bytes),
            Err(e) => {
                match &e {
                    InvokeError::Panicked(_) | InvokeError::Encode(_) => {
                        error!(request_id = %ctx.request_id(), service = %service, error = %e, "Procedure invocation failed")
                    }
                    _ => {
                        warn!(request_id = %ctx.request_id(), service = %service, error = %e, "Procedure invocation failed")
                    }
                }
                self.write_failure(out, EnvelopeCode::InternalError);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::procedure::{procedure_fn, ProcedureError, Reply};
    use http::Method;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Serialize, Deserialize)]
    #[allow(non_snake_case)]
    struct DemoReq {
        Field: String,
    }

    #[derive(Debug, Serialize, Deserialize)]
    #[allow(non_snake_case)]
    struct DemoRsp {
        Field: String,
    }

    fn demo(_ctx: &RequestContext, req: DemoReq) -> Reply<DemoRsp> {
        match req.Field.as_str() {
            "Error" => Reply::err("error"),
            "Nil" => Reply::empty(),
            "Both" => Reply::both(DemoRsp { Field: "Both".into() }, "both"),
            _ => Reply::ok(DemoRsp { Field: req.Field }),
        }
    }

    fn server() -> ApiServer {
        let mut server = ApiServer::json("/api/").unwrap();
        server.register("demo", procedure_fn(demo)).unwrap();
        server
    }

    fn call(server: &ApiServer, path: &str, body: &str) -> ResponseWriter {
        let ctx = RequestContext::new(Method::POST, path).with_body(body);
        let mut out = ResponseWriter::new();
        server.handle(&ctx, &mut out);
        out
    }

    fn body(out: &ResponseWriter) -> &str {
        std::str::from_utf8(out.body()).unwrap()
    }

    #[test]
    fn test_success_envelope() {
        let out = call(&server(), "/api/demo", r#"{"Field":"hi"}"#);
        assert_eq!(out.status(), 200);
        assert_eq!(out.content_type(), Some("application/json"));
        assert_eq!(body(&out), r#"{"code":0,"msg":"","data":{"Field":"hi"}}"#);
    }

    #[test]
    fn test_failure_envelopes() {
        let server = server();
        let cases = [
            ("/api/missing", r#"{"Field":"hi"}"#, r#"{"code":-100001,"msg":"service not found"}"#),
            ("/api/demo", r#"{"Field":5}"#, r#"{"code":-100003,"msg":"req param type not match"}"#),
            ("/api/demo", "", r#"{"code":-100003,"msg":"req param type not match"}"#),
            ("/api/demo", r#"{"Field":"Error"}"#, r#"{"code":-100002,"msg":"invoke error"}"#),
            ("/api/demo", r#"{"Field":"Nil"}"#, r#"{"code":-100002,"msg":"invoke error"}"#),
            ("/api/demo", r#"{"Field":"Both"}"#, r#"{"code":-100002,"msg":"invoke error"}"#),
            ("/api/", r#"{"Field":"hi"}"#, r#"{"code":-100001,"msg":"service not found"}"#),
        ];
        for (path, req, expected) in cases {
            let out = call(&server, path, req);
            assert_eq!(out.status(), 200, "{path} {req}");
            assert_eq!(body(&out), expected, "{path} {req}");
        }
    }

    #[test]
    fn test_read_failure_envelope() {
        let ctx = RequestContext::new(Method::POST, "/api/demo").with_body_read_failure();
        let mut out = ResponseWriter::new();
        server().handle(&ctx, &mut out);
        assert_eq!(body(&out), r#"{"code":-100004,"msg":"read request body fail"}"#);
    }

    #[test]
    fn test_duplicate_service_keeps_first() {
        let mut server = server();
        let other = procedure_fn(|_: &RequestContext, _: DemoReq| -> Result<DemoRsp, ProcedureError> {
            Ok(DemoRsp { Field: "second".into() })
        });
        let err = server.register("demo", other).unwrap_err();
        assert!(matches!(err, ConfigError::DuplicateService(ref s) if s == "demo"));

        let out = call(&server, "/api/demo", r#"{"Field":"first"}"#);
        assert_eq!(body(&out), r#"{"code":0,"msg":"","data":{"Field":"first"}}"#);
        assert_eq!(server.services(), vec!["demo"]);
    }

    #[test]
    fn test_invalid_service_names() {
        let mut server = ApiServer::json("api").unwrap();
        assert_eq!(server.pattern(), "/api/");
        for name in ["", "a/b"] {
            let err = server.register(name, procedure_fn(demo)).unwrap_err();
            assert!(matches!(err, ConfigError::InvalidServiceName(_)));
        }
    }
}
