//! The worker-side half of the subprocess harness: runs inside the spawned
//! child, reads one job request off stdin, and writes one response to
//! stdout.

use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use tokio_util::codec::{FramedRead, FramedWrite, LengthDelimitedCodec};
use tracing::{error, instrument};

use crate::error::ApiError;
use crate::types::ApiResponse;

use super::{call_safe, SubprocessRequest};

/// Set on the child's environment by `SubprocessTask::start` so the same
/// binary can serve both as the normal entry point and as a worker.
pub const WORKER_ENV_VAR: &str = "AUTOTRAIL_SUBPROCESS_WORKER";

/// Call this at the top of a worker binary's `main`, before any other
/// startup logic. If the process was spawned as a subprocess job worker
/// (`WORKER_ENV_VAR` is set), this reads the one request frame from stdin,
/// runs the job, writes the one response frame to stdout, and exits the
/// process; it never returns in that case. Otherwise it returns
/// immediately and the binary's normal `main` continues.
#[instrument]
pub async fn run_worker_if_requested() {
    if std::env::var(WORKER_ENV_VAR).is_err() {
        return;
    }

    let mut reader = FramedRead::new(tokio::io::stdin(), LengthDelimitedCodec::new());
    let mut writer = FramedWrite::new(tokio::io::stdout(), LengthDelimitedCodec::new());

    let response = match reader.next().await {
        Some(Ok(bytes)) => match bincode::deserialize::<SubprocessRequest>(&bytes) {
            Ok(request) => {
                let (value, error) = call_safe(&request.job, request.positional, request.named);
                ApiResponse { value, error }
            }
            Err(e) => {
                error!(error = %e, "worker could not decode its request");
                ApiResponse::err(ApiError::new("codec", e.to_string()))
            }
        },
        Some(Err(e)) => {
            error!(error = %e, "worker failed reading its request");
            ApiResponse::err(ApiError::new("io", e.to_string()))
        }
        None => ApiResponse::err(ApiError::new("codec", "no request received on stdin")),
    };

    if let Ok(encoded) = bincode::serialize(&response) {
        let _ = writer.send(Bytes::from(encoded)).await;
    }

    std::process::exit(0);
}
