//! A typed convenience facade over `SocketClient` for method-style calls
//! (spec §4.6, client side of the `ApiHandler` pairing).
//!
//! The source's `MethodAPIClientWrapper` is a thin `__getattr__` proxy that
//! turns `client.some_method(1, two=2)` into a socket round trip. Rust can't
//! proxy arbitrary attribute access, so the equivalent here is a single
//! generic `call`: the method name becomes an explicit first argument
//! instead of a dynamically resolved attribute.

use std::path::Path;
use std::time::Duration;

use serde::de::DeserializeOwned;
use tracing::instrument;

use crate::client::SocketClient;
use crate::error::Error;
use crate::types::ApiRequest;
use crate::value::{Map, Value};

/// Calls methods on a remote `ApiHandler` by name and decodes the result
/// into `T`. One connection per call (spec §4.5); no connection pooling or
/// retries.
#[derive(Debug, Clone)]
pub struct MethodApiClientWrapper {
    client: SocketClient,
    timeout: Duration,
}

impl MethodApiClientWrapper {
    pub fn new(socket_path: impl AsRef<Path>, timeout: Duration) -> MethodApiClientWrapper {
        MethodApiClientWrapper {
            client: SocketClient::new(socket_path),
            timeout,
        }
    }

    /// Invoke `method` with `positional`/`named` arguments and decode the
    /// returned value as `T`.
    ///
    /// Three outcomes, mirroring the source's `ApiResponse` unpacking:
    /// - the peer sent a value: decode it and return `Ok(Some(value))`.
    /// - the peer sent an error: return `Err(ApiError)`.
    /// - nothing arrived before `timeout` (or the peer closed without
    ///   replying): return `Ok(None)`.
    #[instrument(skip(self, positional, named))]
    pub async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        positional: Vec<Value>,
        named: Map<String, Value>,
    ) -> Result<Option<T>, Error> {
        let request = ApiRequest::new(method, positional, named);
        let response = self.client.call(request, self.timeout).await?;

        let Some(response) = response else {
            return Ok(None);
        };
        if let Some(error) = response.error {
            return Err(Error::Api(error));
        }
        match response.value {
            Some(value) => serde_json::from_value(value)
                .map(Some)
                .map_err(|e| Error::Codec(e.to_string())),
            None => Ok(None),
        }
    }

    /// Convenience wrapper for methods with no return value worth decoding.
    pub async fn notify(
        &self,
        method: &str,
        positional: Vec<Value>,
        named: Map<String, Value>,
    ) -> Result<(), Error> {
        self.call::<Value>(method, positional, named).await?;
        Ok(())
    }
}
