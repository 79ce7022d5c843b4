//! Send and receive framed messages over a `UnixStream`.
//!
//! This plays the role the teacher's `Connection`/`Frame` pair plays for a
//! `TcpStream`: it is the only place that knows about byte-level framing.
//! Everything above this layer deals in typed Rust values.
//!
//! Messages are framed with `tokio_util::codec::LengthDelimitedCodec`, which
//! gives the atomic per-message framing spec §6 requires "for free", a
//! reader can never observe a partial message, because the codec only ever
//! yields a complete frame. The frame payload is a `bincode` encoding of the
//! typed value.

use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::net::UnixStream;
use tokio_util::codec::{Framed, LengthDelimitedCodec};

use crate::error::Error;

/// A duplex, message-framed channel over a Unix-domain stream socket (spec
/// §3's `Connection` entity).
#[derive(Debug)]
pub struct Connection {
    framed: Framed<UnixStream, LengthDelimitedCodec>,
}

impl Connection {
    pub fn new(stream: UnixStream) -> Connection {
        Connection {
            framed: Framed::new(stream, LengthDelimitedCodec::new()),
        }
    }

    /// Read the next frame off the stream, if any is currently available.
    /// Returns `Ok(None)` on a clean peer close; this is not an error (spec
    /// §4.1, §7, "peer-closed reads surface as a distinguished end-of-stream
    /// outcome, not as data").
    pub async fn try_recv<T: DeserializeOwned>(&mut self) -> Result<Option<T>, Error> {
        match self.framed.next().await {
            Some(Ok(bytes)) => {
                let value = bincode::deserialize(&bytes)
                    .map_err(|e| Error::Codec(e.to_string()))?;
                Ok(Some(value))
            }
            Some(Err(e)) => Err(Error::Io(e)),
            None => Ok(None),
        }
    }

    /// Write one frame to the stream.
    pub async fn send<T: Serialize>(&mut self, value: &T) -> Result<(), Error> {
        let encoded = bincode::serialize(value).map_err(|e| Error::Codec(e.to_string()))?;
        self.framed
            .send(Bytes::from(encoded))
            .await
            .map_err(Error::Io)
    }

    /// Idempotent: shuts the underlying socket down. Close errors are
    /// suppressed by callers, matching the source's `__del__` behavior
    /// (spec §4.2).
    pub async fn close(&mut self) -> Result<(), Error> {
        self.framed.close().await.map_err(Error::Io)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Sample {
        n: u32,
        s: String,
    }

    #[tokio::test]
    async fn round_trips_a_value_atomically() {
        let (a, b) = UnixStream::pair().unwrap();
        let mut server = Connection::new(a);
        let mut client = Connection::new(b);

        let msg = Sample {
            n: 7,
            s: "hello".into(),
        };
        client.send(&msg).await.unwrap();

        let received: Sample = server.try_recv().await.unwrap().unwrap();
        assert_eq!(received, msg);
    }

    #[tokio::test]
    async fn clean_close_surfaces_as_none() {
        let (a, b) = UnixStream::pair().unwrap();
        let mut server = Connection::new(a);
        drop(b);

        let received: Option<Sample> = server.try_recv().await.unwrap();
        assert!(received.is_none());
    }
}
