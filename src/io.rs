//! Message I/O primitives shared by every layer above `Connection` (spec
//! §4.1). Non-blocking receive with a timeout, a bounded drain generator,
//! and a synchronous-per-message send.

use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio_stream::Stream;

use crate::connection::Connection;
use crate::error::Error;

/// Wait up to `timeout` for the next message. Returns `None` if the timeout
/// elapses or the peer has closed cleanly, both are the "empty" outcome
/// the spec calls for, not an error (spec §4.1, §7).
pub async fn receive_one<T: DeserializeOwned>(
    conn: &mut Connection,
    timeout: Duration,
) -> Result<Option<T>, Error> {
    match tokio::time::timeout(timeout, conn.try_recv::<T>()).await {
        Ok(result) => result,
        Err(_elapsed) => Ok(None),
    }
}

/// A lazy, finite, non-restartable sequence of messages: repeatedly call
/// `receive_one`, yield each non-empty message, stop at the first empty
/// outcome (spec §4.1). Used for best-effort reads during shutdown.
pub fn drain<'a, T: DeserializeOwned + 'a>(
    conn: &'a mut Connection,
    timeout: Duration,
) -> impl Stream<Item = T> + 'a {
    async_stream::stream! {
        loop {
            match receive_one::<T>(conn, timeout).await {
                Ok(Some(message)) => yield message,
                _ => break,
            }
        }
    }
}

/// Send each message in order. Synchronous per message; no buffering beyond
/// what the transport provides (spec §4.1).
pub async fn send_all<T: Serialize>(
    conn: &mut Connection,
    messages: impl IntoIterator<Item = T>,
) -> Result<(), Error> {
    for message in messages {
        conn.send(&message).await?;
    }
    Ok(())
}
