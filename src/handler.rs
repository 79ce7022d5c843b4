//! Adapts a plain object with named operations into the `RequestHandler`
//! the server drives (spec §4.6).
//!
//! The source does this with `getattr(self._handler, request.method)`,
//! Rust has no equivalent of dynamically resolving a string to a method, so
//! per the spec's own Design Notes (§9, option b) the handler side is a
//! trait whose single method is a `match` over the requested name: "a
//! generic `call(method, pos, named)` operation ... with the handler-side
//! method resolved via a name-to-operation table." The `match` arms *are*
//! that table.

use std::panic::{self, AssertUnwindSafe};

use tracing::{debug, error};

use crate::error::ApiError;
use crate::server::RequestHandler;
use crate::types::{ApiRequest, HandlerResponse};
use crate::value::{Map, Value};

/// What a single method call on the wrapped object produced.
pub enum MethodOutcome {
    /// An ordinary return value.
    Value(Value),
    /// The method wants to talk to the server loop directly (e.g. to
    /// signal shutdown), the Rust equivalent of "the returned value is
    /// itself a `HandlerResponse`, in which case return it verbatim."
    Handled(HandlerResponse),
}

impl From<Value> for MethodOutcome {
    fn from(value: Value) -> MethodOutcome {
        MethodOutcome::Value(value)
    }
}

impl From<()> for MethodOutcome {
    fn from(_: ()) -> MethodOutcome {
        MethodOutcome::Value(Value::Null)
    }
}

/// An object whose public named operations are the remote API surface
/// (spec §6: "an embedder-supplied object whose public named operations
/// are the remote API surface").
pub trait ApiHandler: Send + Sync {
    /// Resolve `method` against this handler's operation table and invoke
    /// it with the combined positional/named arguments. Return
    /// `Err(ApiError::unknown_method(method))` when `method` does not
    /// resolve to a public operation (spec §4.6: "If the name is not
    /// present or is not a callable public operation, treat as a handler
    /// exception").
    fn call_method(
        &self,
        method: &str,
        positional: Vec<Value>,
        named: Map<String, Value>,
    ) -> Result<MethodOutcome, ApiError>;
}

/// Wraps an `ApiHandler` as a `RequestHandler`.
pub struct MethodApiHandlerWrapper<H: ApiHandler> {
    handler: H,
}

impl<H: ApiHandler> MethodApiHandlerWrapper<H> {
    pub fn new(handler: H) -> MethodApiHandlerWrapper<H> {
        MethodApiHandlerWrapper { handler }
    }
}

impl<H: ApiHandler> RequestHandler for MethodApiHandlerWrapper<H> {
    fn handle(
        &self,
        request: &ApiRequest,
        extra_positional: &[Value],
        extra_named: &Map<String, Value>,
    ) -> HandlerResponse {
        // outer_positional..., request.positional... (spec §4.6).
        let mut positional = extra_positional.to_vec();
        positional.extend(request.positional.iter().cloned());

        // request.named overrides extra_named on key conflict (spec §4.6).
        let mut named = extra_named.clone();
        for (key, value) in &request.named {
            named.insert(key.clone(), value.clone());
        }

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            self.handler.call_method(&request.method, positional, named)
        }));

        let response = match outcome {
            Ok(Ok(MethodOutcome::Value(value))) => HandlerResponse::ok(Some(value)),
            Ok(Ok(MethodOutcome::Handled(handler_response))) => handler_response,
            Ok(Err(error)) => {
                error!(method = %request.method, %error, "handler returned an error");
                HandlerResponse::err(error)
            }
            Err(payload) => {
                error!(method = %request.method, "handler panicked");
                HandlerResponse::err(ApiError::from_panic(payload))
            }
        };

        debug!(%request, ?response, "dispatched method call");
        response
    }
}
