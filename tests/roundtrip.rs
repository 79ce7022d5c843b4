//! End-to-end coverage of the transport through a real `SocketServer` bound
//! to a Unix-domain socket, exercising the testable properties from
//! `SPEC_FULL.md` §8.

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use autotrail::value::named;
use autotrail::{
    BindOptions, ConnectionClient, ConnectionServer, Connection, MethodApiClientWrapper,
    MethodApiHandlerWrapper, SocketServer,
};
use serde_json::{json, Value};
use tokio::net::{UnixListener, UnixStream};

fn unique_socket_path(label: &str) -> PathBuf {
    static COUNTER: AtomicU64 = AtomicU64::new(0);
    let n = COUNTER.fetch_add(1, Ordering::Relaxed);
    std::env::temp_dir().join(format!(
        "autotrail-test-{}-{}-{}.sock",
        std::process::id(),
        label,
        n
    ))
}

async fn spawn_demo_server(socket_path: PathBuf) -> tokio::task::JoinHandle<autotrail::Result<()>> {
    let server = SocketServer::new(
        MethodApiHandlerWrapper::new(autotrail::demo::DemoHandler),
        Duration::from_millis(5),
        Duration::from_secs(2),
    );
    tokio::spawn(async move {
        server
            .run(
                socket_path,
                BindOptions::default(),
                &[],
                &autotrail::Map::new(),
                std::future::pending(),
            )
            .await
    })
}

/// Same as `spawn_demo_server`, but the `SocketServer` itself carries
/// non-empty `extra_named`, as a real embedder's call-time arguments would
/// (spec §4.4 step 2).
async fn spawn_demo_server_with_extra_named(
    socket_path: PathBuf,
    extra_named: autotrail::Map<String, Value>,
) -> tokio::task::JoinHandle<autotrail::Result<()>> {
    let server = SocketServer::new(
        MethodApiHandlerWrapper::new(autotrail::demo::DemoHandler),
        Duration::from_millis(5),
        Duration::from_secs(2),
    );
    tokio::spawn(async move {
        server
            .run(
                socket_path,
                BindOptions::default(),
                &[],
                &extra_named,
                std::future::pending(),
            )
            .await
    })
}

// P1: a request that reaches a handler returning a value produces exactly
// that value back at the client.
#[tokio::test]
async fn p1_happy_round_trip_returns_the_handlers_value() {
    let socket_path = unique_socket_path("p1");
    let _server = spawn_demo_server(socket_path.clone()).await;
    tokio::time::sleep(Duration::from_millis(50)).await;

    let client = MethodApiClientWrapper::new(&socket_path, Duration::from_secs(2));
    let result: Option<Value> = client.call("ping", vec![], named([])).await.unwrap();
    assert_eq!(result, Some(json!("pong")));
}

// P2: a handler error round-trips as an `ApiError` at the client, not as a
// value and not as a transport failure.
#[tokio::test]
async fn p2_handler_errors_propagate_as_api_errors() {
    let socket_path = unique_socket_path("p2");
    let _server = spawn_demo_server(socket_path.clone()).await;
    tokio::time::sleep(Duration::from_millis(50)).await;

    let client = MethodApiClientWrapper::new(&socket_path, Duration::from_secs(2));
    let outcome: Result<Option<Value>, autotrail::Error> = client
        .call(
            "boom",
            vec![],
            named([("message".to_string(), json!("custom failure"))]),
        )
        .await;

    match outcome {
        Err(autotrail::Error::Api(error)) => {
            assert_eq!(error.kind, "DemoError");
            assert_eq!(error.message, "custom failure");
        }
        other => panic!("expected an ApiError, got {other:?}"),
    }
}

// P3: sequential calls on a single-threaded SocketServer are served in the
// order they were issued.
#[tokio::test]
async fn p3_sequential_calls_are_served_in_order() {
    let socket_path = unique_socket_path("p3");
    let _server = spawn_demo_server(socket_path.clone()).await;
    tokio::time::sleep(Duration::from_millis(50)).await;

    let client = MethodApiClientWrapper::new(&socket_path, Duration::from_secs(2));
    let mut results = Vec::new();
    for (a, b) in [(1, 1), (2, 2), (3, 3)] {
        let value: Option<Value> = client
            .call("add", vec![json!(a), json!(b)], named([]))
            .await
            .unwrap();
        results.push(value);
    }
    assert_eq!(results, vec![Some(json!(2)), Some(json!(4)), Some(json!(6))]);
}

// Scenario 5: a SocketServer's own call-time extra_named reaches the
// handler merged with the request's named arguments, the request's keys
// winning on conflict. This exercises the forwarding path through the
// full accept loop, not just MethodApiHandlerWrapper in isolation.
#[tokio::test]
async fn scenario_5_extra_named_merges_through_the_socket_server() {
    let socket_path = unique_socket_path("scenario5");
    let outer_named = named([("x".to_string(), json!(1)), ("y".to_string(), json!(2))]);
    let _server = spawn_demo_server_with_extra_named(socket_path.clone(), outer_named).await;
    tokio::time::sleep(Duration::from_millis(50)).await;

    let client = MethodApiClientWrapper::new(&socket_path, Duration::from_secs(2));
    let result: Option<Value> = client
        .call(
            "echo_named",
            vec![],
            named([("y".to_string(), json!(9)), ("z".to_string(), json!(3))]),
        )
        .await
        .unwrap();
    assert_eq!(result, Some(json!({"x": 1, "y": 9, "z": 3})));
}

// P4: a ConnectionServer serves exactly one request per connection; a
// second request on the same connection is never observed.
#[tokio::test]
async fn p4_connection_server_serves_exactly_one_request() {
    let (client_side, server_side) = UnixStream::pair().unwrap();
    let handler = MethodApiHandlerWrapper::new(autotrail::demo::DemoHandler);
    let mut server = ConnectionServer::new(
        &handler,
        Connection::new(server_side),
        Duration::from_millis(200),
    );

    let mut client = ConnectionClient::new(Connection::new(client_side));
    let request = autotrail::ApiRequest::new("ping", vec![], named([]));
    let call = tokio::spawn(async move { client.call(request, Duration::from_millis(200)).await });

    let relay = server.serve_once(&[], &autotrail::Map::new()).await;
    assert!(!relay.is_shutdown());

    let response = call.await.unwrap().unwrap().unwrap();
    assert_eq!(response.value, Some(json!("pong")));
}

// Scenario 3: a handler that takes longer than the client's timeout causes
// the client call to resolve to `None` within roughly that timeout, and
// the server remains ready to serve the next request normally.
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn scenario_3_client_times_out_on_a_slow_handler() {
    let socket_path = unique_socket_path("scenario3");
    let _server = spawn_demo_server(socket_path.clone()).await;
    tokio::time::sleep(Duration::from_millis(50)).await;

    let impatient_client = MethodApiClientWrapper::new(&socket_path, Duration::from_millis(100));
    let started = std::time::Instant::now();
    let result: Option<Value> = impatient_client
        .call("slow", vec![json!(2000)], named([]))
        .await
        .unwrap();
    assert!(result.is_none());
    assert!(started.elapsed() < Duration::from_secs(1));

    // The server is ready for the next request once the slow handler call
    // finishes, without needing a restart.
    tokio::time::sleep(Duration::from_millis(2200)).await;
    let patient_client = MethodApiClientWrapper::new(&socket_path, Duration::from_secs(2));
    let result: Option<Value> = patient_client.call("ping", vec![], named([])).await.unwrap();
    assert_eq!(result, Some(json!("pong")));
}

// A connection that never sends a request at all times out as an empty
// outcome rather than hanging the server or erroring (spec §4.1/§4.2's
// "normal idle tick" case, distinct from scenario 3's slow-handler case).
#[tokio::test]
async fn scenario_silent_peer_times_out_as_empty() {
    let (client_side, server_side) = UnixStream::pair().unwrap();
    let handler = MethodApiHandlerWrapper::new(autotrail::demo::DemoHandler);
    let mut server = ConnectionServer::new(
        &handler,
        Connection::new(server_side),
        Duration::from_millis(30),
    );

    let relay = server.serve_once(&[], &autotrail::Map::new()).await;
    assert!(!relay.is_shutdown());
    drop(client_side);
}

// Scenario 4: calling the `stop` method relays a shutdown signal that ends
// the SocketServer's accept loop.
#[tokio::test]
async fn scenario_stop_method_shuts_the_server_down() {
    let socket_path = unique_socket_path("shutdown");
    let server_handle = spawn_demo_server(socket_path.clone()).await;
    tokio::time::sleep(Duration::from_millis(50)).await;

    let client = MethodApiClientWrapper::new(&socket_path, Duration::from_secs(2));
    let result: Option<Value> = client.call("stop", vec![], named([])).await.unwrap();
    assert_eq!(result, Some(json!("bye")));

    let outcome = tokio::time::timeout(Duration::from_secs(2), server_handle)
        .await
        .expect("server task did not finish after shutdown")
        .expect("server task panicked");
    assert!(outcome.is_ok());
}

#[tokio::test]
async fn bind_options_remove_existing_replaces_a_stale_socket_file() {
    let socket_path = unique_socket_path("stale");
    // Leave a stale file behind, as if a previous server crashed without
    // cleaning up.
    std::fs::write(&socket_path, b"not a socket").unwrap();

    let server = SocketServer::new(
        MethodApiHandlerWrapper::new(autotrail::demo::DemoHandler),
        Duration::from_millis(5),
        Duration::from_secs(2),
    );
    let socket_path_for_server = socket_path.clone();
    let handle = tokio::spawn(async move {
        server
            .run(
                socket_path_for_server,
                BindOptions {
                    remove_existing: true,
                },
                &[],
                &autotrail::Map::new(),
                std::future::pending(),
            )
            .await
    });
    tokio::time::sleep(Duration::from_millis(50)).await;

    let client = MethodApiClientWrapper::new(&socket_path, Duration::from_secs(2));
    let result: Option<Value> = client.call("ping", vec![], named([])).await.unwrap();
    assert_eq!(result, Some(json!("pong")));

    handle.abort();
}

// bind() without `remove_existing` fails fast against a stale socket path,
// matching the source's undocumented-but-observed behavior of never
// unlinking automatically.
#[tokio::test]
async fn bind_options_default_fails_fast_on_a_stale_path() {
    let socket_path = unique_socket_path("stale-default");
    std::fs::write(&socket_path, b"not a socket").unwrap();

    let server = SocketServer::new(
        MethodApiHandlerWrapper::new(autotrail::demo::DemoHandler),
        Duration::from_millis(5),
        Duration::from_secs(2),
    );
    let result = server
        .run(
            &socket_path,
            BindOptions::default(),
            &[],
            &autotrail::Map::new(),
            std::future::pending(),
        )
        .await;
    assert!(result.is_err());

    let _ = std::fs::remove_file(&socket_path);
}

// Exercising bind() directly, separately from SocketServer, to confirm the
// listener accepts connections at all (sanity check for the UnixListener
// wiring itself).
#[tokio::test]
async fn a_bound_listener_accepts_a_connection() {
    let socket_path = unique_socket_path("listener-sanity");
    let listener = UnixListener::bind(&socket_path).unwrap();
    let accept = tokio::spawn(async move { listener.accept().await.map(|_| ()) });

    let _stream = UnixStream::connect(&socket_path).await.unwrap();
    accept.await.unwrap().unwrap();
    let _ = std::fs::remove_file(&socket_path);
}
