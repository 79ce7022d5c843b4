//! A Unix-socket API transport and an exception-safe subprocess execution
//! harness for interactive workflow engines.
//!
//! The transport is five small, composable pieces: `connection` (atomic
//! per-message byte framing), `types` (the request/response/handler-relay
//! values that travel across it), `server` (`ConnectionServer` serves one
//! request per connection, `SocketServer` drives the accept loop),
//! `client` (`ConnectionClient`/`SocketClient`, the mirror image), and
//! `handler`/`method_client` (the typed method-dispatch convenience layer
//! built on top of all of the above). `subprocess` is a second, unrelated
//! harness for running a single registered job in its own process and
//! getting its result back without a handler crash anywhere taking down
//! the caller.

pub mod client;
pub mod connection;
pub mod demo;
pub mod error;
pub mod handler;
pub mod io;
pub mod method_client;
pub mod server;
pub mod snapshot;
pub mod subprocess;
pub mod types;
pub mod value;

pub use client::{ConnectionClient, SocketClient};
pub use connection::Connection;
pub use error::{ApiError, Error, Result};
pub use handler::{ApiHandler, MethodApiHandlerWrapper, MethodOutcome};
pub use method_client::MethodApiClientWrapper;
pub use server::{BindOptions, ConnectionServer, RequestHandler, SocketServer};
pub use snapshot::SnapshotAggregator;
pub use subprocess::SubprocessTask;
pub use types::{ApiRequest, ApiResponse, HandlerResponse, Relay};
pub use value::{Map, Value};

/// How long a `ConnectionServer`/`ConnectionClient` waits for a message
/// before treating the exchange as empty, unless the caller picks
/// something else. Mirrors the role the teacher's `DEFAULT_PORT` plays: a
/// sensible default, not a hidden requirement.
pub const DEFAULT_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(5);

/// How long `SocketServer::run`'s accept loop sleeps between requests
/// unless the caller picks something else.
pub const DEFAULT_POLL_DELAY: std::time::Duration = std::time::Duration::from_millis(10);
