//! A small handler and job set used by the demo binaries and the
//! integration tests: `add`, `ping`, `boom`, `stop`, `slow`, `echo_named`
//! as methods, `double` and `crash` as subprocess jobs. None of this is
//! part of the public API, it exists so the transport and the harness
//! have something concrete to exercise end to end.

use std::time::Duration;

use serde_json::json;

use crate::error::ApiError;
use crate::handler::{ApiHandler, MethodOutcome};
use crate::types::HandlerResponse;
use crate::value::{Map, Value};

pub struct DemoHandler;

impl ApiHandler for DemoHandler {
    fn call_method(
        &self,
        method: &str,
        positional: Vec<Value>,
        named: Map<String, Value>,
    ) -> Result<MethodOutcome, ApiError> {
        match method {
            "ping" => Ok(MethodOutcome::Value(json!("pong"))),

            "add" => {
                let a = positional
                    .first()
                    .and_then(Value::as_i64)
                    .ok_or_else(|| ApiError::new("ValueError", "add requires two numbers"))?;
                let b = positional
                    .get(1)
                    .and_then(Value::as_i64)
                    .ok_or_else(|| ApiError::new("ValueError", "add requires two numbers"))?;
                Ok(MethodOutcome::Value(json!(a + b)))
            }

            "boom" => {
                let message = named
                    .get("message")
                    .and_then(Value::as_str)
                    .unwrap_or("boom")
                    .to_string();
                Err(ApiError::new("DemoError", message))
            }

            "stop" => Ok(MethodOutcome::Handled(HandlerResponse::shutdown_with(Some(json!("bye"))))),

            "echo_named" => Ok(MethodOutcome::Value(Value::Object(named))),

            // A handler that takes its time, for exercising the client
            // timeout path (spec §8 scenario 3). `call_method` is
            // synchronous, so this blocks whichever task is driving the
            // `ConnectionServer`, exactly the blocking-handler semantics
            // the spec describes, not a simulation of them.
            "slow" => {
                let millis = positional.first().and_then(Value::as_u64).unwrap_or(2000);
                std::thread::sleep(Duration::from_millis(millis));
                Ok(MethodOutcome::Value(json!("finally done")))
            }

            other => Err(ApiError::unknown_method(other)),
        }
    }
}

pub fn double_job(positional: Vec<Value>, _named: Map<String, Value>) -> Result<Value, ApiError> {
    let n = positional
        .first()
        .and_then(Value::as_i64)
        .ok_or_else(|| ApiError::new("ValueError", "double requires one number"))?;
    Ok(json!(n * 2))
}

pub fn crash_job(_positional: Vec<Value>, _named: Map<String, Value>) -> Result<Value, ApiError> {
    std::process::abort();
}

pub fn register_demo_jobs() {
    crate::subprocess::register_job("demo::double", double_job);
    crate::subprocess::register_job("demo::crash", crash_job);
}
