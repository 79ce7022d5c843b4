//! Plain request/response value types (spec §3).
//!
//! Three records cross the seams of this crate: `ApiRequest` travels
//! client → server, `ApiResponse` travels server → client, and
//! `HandlerResponse` never leaves the server process; it is how a handler
//! talks back to the `ConnectionServer` that is driving it.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::value::{Map, Value};

/// A single method call, as built by `MethodApiClientWrapper` and consumed
/// by `MethodApiHandlerWrapper` (spec §4.6, §4.7).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiRequest {
    pub method: String,
    pub positional: Vec<Value>,
    pub named: Map<String, Value>,
}

impl ApiRequest {
    pub fn new(
        method: impl Into<String>,
        positional: Vec<Value>,
        named: Map<String, Value>,
    ) -> ApiRequest {
        ApiRequest {
            method: method.into(),
            positional,
            named,
        }
    }
}

impl fmt::Display for ApiRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ApiRequest({}, {:?}, {:?})",
            self.method, self.positional, self.named
        )
    }
}

/// The response handed back to a client. Exactly one of `value`/`error`
/// carries meaning; both may be `None` if the caller ignores the return
/// value (spec §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse {
    pub value: Option<Value>,
    pub error: Option<ApiError>,
}

impl ApiResponse {
    pub fn ok(value: Option<Value>) -> ApiResponse {
        ApiResponse { value, error: None }
    }

    pub fn err(error: ApiError) -> ApiResponse {
        ApiResponse {
            value: None,
            error: Some(error),
        }
    }
}

impl From<HandlerResponse> for ApiResponse {
    fn from(handler_response: HandlerResponse) -> ApiResponse {
        ApiResponse {
            value: handler_response.value,
            error: handler_response.error,
        }
    }
}

/// Out-of-band signal a handler sends back to the `ConnectionServer`/
/// `SocketServer` driving it. Never serialized, never sent to a client
/// (spec §3, §6).
///
/// The source represents this with a string sentinel
/// (`"Shutdown Server"`) stored in `relay_value`. Design Notes §9 in the
/// spec calls that out as fragile and recommends "a typed discriminated
/// variant ... [that] does not change observable behavior"; this enum is
/// that variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Relay {
    #[default]
    None,
    Shutdown,
}

impl Relay {
    pub fn is_shutdown(&self) -> bool {
        matches!(self, Relay::Shutdown)
    }
}

/// The handler's response to an `ApiRequest`. Produced by the handler,
/// consumed by the `ConnectionServer` loop, and discarded (spec §3).
#[derive(Debug, Clone, Default)]
pub struct HandlerResponse {
    pub value: Option<Value>,
    pub error: Option<ApiError>,
    pub relay: Relay,
}

impl HandlerResponse {
    pub fn ok(value: Option<Value>) -> HandlerResponse {
        HandlerResponse {
            value,
            error: None,
            relay: Relay::None,
        }
    }

    pub fn err(error: ApiError) -> HandlerResponse {
        HandlerResponse {
            value: None,
            error: Some(error),
            relay: Relay::None,
        }
    }

    /// The sole legitimate way to terminate a `SocketServer` loop (spec §3,
    /// §6). `value`/`error` here are never observed by a client because this
    /// response never crosses the wire in its raw form; a handler that wants
    /// to also reply to the caller before shutting down should return
    /// `MethodOutcome::Handled(HandlerResponse::shutdown_with(value))`.
    pub fn shutdown() -> HandlerResponse {
        HandlerResponse {
            value: None,
            error: None,
            relay: Relay::Shutdown,
        }
    }

    pub fn shutdown_with(value: Option<Value>) -> HandlerResponse {
        HandlerResponse {
            value,
            error: None,
            relay: Relay::Shutdown,
        }
    }
}
