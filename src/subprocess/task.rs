//! `SubprocessTask`: spawns a worker process for one job invocation and
//! hands its eventual result back through a `tokio::sync::oneshot` channel
//! (spec §3, §4.8 Tier 2).

use std::path::Path;
use std::process::Stdio;
use std::sync::Mutex;

use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use tokio::process::{Child, Command};
use tokio::sync::oneshot;
use tokio_util::codec::{FramedRead, FramedWrite, LengthDelimitedCodec};
use tracing::{debug, instrument};

use crate::error::{ApiError, Error};
use crate::types::ApiResponse;
use crate::value::{Map, Value};

use super::worker::WORKER_ENV_VAR;
use super::SubprocessRequest;

type JobResult = (Option<Value>, Option<ApiError>);

/// One in-flight (or completed) subprocess job invocation.
///
/// Mirrors the source's `ExceptionSafeSubProcessFunction`: `start` spawns
/// the child and returns immediately, `is_alive`/`join` observe and wait on
/// the OS process, and `get_result` is the idempotent, caching read of
/// whatever the job produced, regardless of whether the child is still
/// running, has exited cleanly, or crashed (spec §4.8, P5).
pub struct SubprocessTask {
    child: Mutex<Option<Child>>,
    result_rx: Mutex<Option<oneshot::Receiver<JobResult>>>,
    cached: Mutex<Option<JobResult>>,
}

impl SubprocessTask {
    /// Spawn the current executable as the worker, requesting `job` with
    /// the given arguments. The worker binary must call
    /// `subprocess::run_worker_if_requested()` at the top of its `main`.
    pub async fn start(
        job: &str,
        positional: Vec<Value>,
        named: Map<String, Value>,
    ) -> Result<SubprocessTask, Error> {
        let worker = std::env::current_exe().map_err(Error::Io)?;
        SubprocessTask::start_with_worker(worker, job, positional, named).await
    }

    /// Spawn an explicit worker binary rather than re-exec'ing the current
    /// one. Used by the integration tests, pointed at the
    /// `autotrail-subprocess-worker` binary via `env!("CARGO_BIN_EXE_...")`.
    #[instrument(skip(positional, named))]
    pub async fn start_with_worker(
        worker: impl AsRef<Path>,
        job: &str,
        positional: Vec<Value>,
        named: Map<String, Value>,
    ) -> Result<SubprocessTask, Error> {
        let mut child = Command::new(worker.as_ref())
            .env(WORKER_ENV_VAR, "1")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(Error::Io)?;

        let stdin = child.stdin.take().expect("child spawned with piped stdin");
        let stdout = child.stdout.take().expect("child spawned with piped stdout");

        let request = SubprocessRequest {
            job: job.to_string(),
            positional,
            named,
        };
        let encoded = bincode::serialize(&request).map_err(|e| Error::Codec(e.to_string()))?;
        let mut writer = FramedWrite::new(stdin, LengthDelimitedCodec::new());
        writer.send(Bytes::from(encoded)).await.map_err(Error::Io)?;
        drop(writer); // closes the child's stdin so it sees EOF after the one frame

        let (result_tx, result_rx) = oneshot::channel();
        tokio::spawn(async move {
            let mut reader = FramedRead::new(stdout, LengthDelimitedCodec::new());
            if let Some(Ok(bytes)) = reader.next().await {
                if let Ok(response) = bincode::deserialize::<ApiResponse>(&bytes) {
                    let _ = result_tx.send((response.value, response.error));
                    return;
                }
            }
            // Child crashed or sent nothing decodable; drop `result_tx` so
            // `get_result` sees a closed channel and resolves to "no result"
            // rather than blocking forever (spec §4.8, scenario 6).
        });

        Ok(SubprocessTask {
            child: Mutex::new(Some(child)),
            result_rx: Mutex::new(Some(result_rx)),
            cached: Mutex::new(None),
        })
    }

    /// Whether the child process is still running.
    pub fn is_alive(&self) -> bool {
        let mut guard = self.child.lock().unwrap();
        match guard.as_mut() {
            Some(child) => matches!(child.try_wait(), Ok(None)),
            None => false,
        }
    }

    /// Wait for the child process to exit. Idempotent: a second call after
    /// the child is already reaped is a no-op.
    pub async fn join(&self) -> Result<(), Error> {
        let child = self.child.lock().unwrap().take();
        if let Some(mut child) = child {
            child.wait().await.map_err(Error::Io)?;
        }
        Ok(())
    }

    /// Forcibly kill the child process.
    pub fn terminate(&self) -> Result<(), Error> {
        let mut guard = self.child.lock().unwrap();
        if let Some(child) = guard.as_mut() {
            child.start_kill().map_err(Error::Io)?;
        }
        Ok(())
    }

    /// Read the job's result, if any has arrived. Non-blocking: this polls
    /// the result channel once with `try_recv` and returns `(None, None)`
    /// immediately if nothing has arrived yet, leaving the receiver in
    /// place for the next call (spec §4.8, §5 - "channel `get_nowait`
    /// (non-blocking)"). Idempotent once a result has arrived: the first
    /// non-empty read is cached and replayed on every later call (spec
    /// §4.8, P5). If the child crashed before producing a result, the
    /// channel closes and this resolves to `(None, None)` once, which is
    /// then cached the same way.
    pub async fn get_result(&self) -> JobResult {
        if let Some(cached) = self.cached.lock().unwrap().clone() {
            return cached;
        }

        let mut guard = self.result_rx.lock().unwrap();
        let delivered = match guard.as_mut() {
            Some(rx) => match rx.try_recv() {
                Ok(result) => Some(result),
                Err(oneshot::error::TryRecvError::Closed) => Some((None, None)),
                Err(oneshot::error::TryRecvError::Empty) => None,
            },
            None => Some((None, None)),
        };

        let Some(result) = delivered else {
            // Still running; leave the receiver in place for the next poll.
            return (None, None);
        };
        *guard = None;
        drop(guard);

        debug!(?result, "subprocess job result received");
        *self.cached.lock().unwrap() = Some(result.clone());
        result
    }
}
