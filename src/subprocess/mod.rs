//! Exception-safe subprocess execution harness (spec §4.8).
//!
//! Grounded on the source's `workflow/helpers/execution.py`: Tier 1
//! (`exception_safe_call`/`make_exception_safe`) becomes `call_safe`; Tier 2
//! (`run_function_as_execption_safe_subprocess`/`ExceptionSafeSubProcessFunction`)
//! becomes `SubprocessTask`.
//!
//! The source pickles an arbitrary callable and forks it into a child
//! process. Rust closures can capture non-`'static`, non-serializable state
//! and cannot be sent across a process boundary at all, so jobs here are
//! plain `fn` pointers registered ahead of time under a string name; the
//! name crosses the process boundary instead of the code.

use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Mutex, OnceLock};

use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::value::{Map, Value};

pub mod task;
pub mod worker;

pub use task::SubprocessTask;
pub use worker::run_worker_if_requested;

/// A registered job. Takes the same `(positional, named)` argument shape an
/// `ApiRequest` carries, so the same values that arrive over the socket
/// transport can be forwarded straight into a subprocess job.
pub type JobFn = fn(Vec<Value>, Map<String, Value>) -> Result<Value, ApiError>;

/// What crosses the pipe from parent to worker: which job to run and with
/// what arguments.
#[derive(Debug, Serialize, Deserialize)]
pub struct SubprocessRequest {
    pub job: String,
    pub positional: Vec<Value>,
    pub named: Map<String, Value>,
}

fn registry() -> &'static Mutex<HashMap<String, JobFn>> {
    static REGISTRY: OnceLock<Mutex<HashMap<String, JobFn>>> = OnceLock::new();
    REGISTRY.get_or_init(|| Mutex::new(HashMap::new()))
}

/// Register a job under `name`. Both the parent process (to validate a name
/// exists before spawning) and the worker process (to actually run it) need
/// their own call to this during startup; the registry is per-process.
pub fn register_job(name: &str, job: JobFn) {
    registry().lock().unwrap().insert(name.to_string(), job);
}

/// Tier 1: look up `name`, invoke it inside `catch_unwind`, and return
/// exactly one of `(Some(value), None)` or `(None, Some(error))`, a
/// registered job never produces "both" or "neither" (spec §4.8, P6).
pub fn call_safe(
    name: &str,
    positional: Vec<Value>,
    named: Map<String, Value>,
) -> (Option<Value>, Option<ApiError>) {
    let job = registry().lock().unwrap().get(name).copied();

    let Some(job) = job else {
        return (None, Some(ApiError::new("unknown_job", format!("no subprocess job registered under name {name:?}"))));
    };

    match panic::catch_unwind(AssertUnwindSafe(|| job(positional, named))) {
        Ok(Ok(value)) => (Some(value), None),
        Ok(Err(error)) => (None, Some(error)),
        Err(payload) => (None, Some(ApiError::from_panic(payload))),
    }
}
