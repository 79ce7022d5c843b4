//! Connection-level and socket-level client (spec §4.3, §4.5).

use std::path::Path;
use std::time::Duration;

use tokio::net::UnixStream;
use tracing::{debug, instrument};

use crate::connection::Connection;
use crate::error::Error;
use crate::io::receive_one;
use crate::types::{ApiRequest, ApiResponse};

/// Sends one request and waits for one response. No retries; the caller
/// owns the connection (spec §4.3).
pub struct ConnectionClient {
    connection: Connection,
}

impl ConnectionClient {
    pub fn new(connection: Connection) -> ConnectionClient {
        ConnectionClient { connection }
    }

    #[instrument(skip(self, request))]
    pub async fn call(
        &mut self,
        request: ApiRequest,
        timeout: Duration,
    ) -> Result<Option<ApiResponse>, Error> {
        debug!(%request, "sending request");
        self.connection.send(&request).await?;
        receive_one(&mut self.connection, timeout).await
    }

    pub async fn close(&mut self) -> Result<(), Error> {
        self.connection.close().await
    }
}

/// Opens a fresh connection per call, exchanges one request/response pair,
/// and closes the connection (spec §4.5). All transient errors (connection
/// refused, address missing) surface to the caller unchanged.
#[derive(Debug, Clone)]
pub struct SocketClient {
    socket_path: std::path::PathBuf,
}

impl SocketClient {
    pub fn new(socket_path: impl AsRef<Path>) -> SocketClient {
        SocketClient {
            socket_path: socket_path.as_ref().to_path_buf(),
        }
    }

    pub async fn call(
        &self,
        request: ApiRequest,
        timeout: Duration,
    ) -> Result<Option<ApiResponse>, Error> {
        let stream = UnixStream::connect(&self.socket_path)
            .await
            .map_err(|source| Error::Connect {
                path: self.socket_path.display().to_string(),
                source,
            })?;
        let mut client = ConnectionClient::new(Connection::new(stream));
        let response = client.call(request, timeout).await?;
        client.close().await?;
        Ok(response)
    }
}
