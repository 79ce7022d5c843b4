//! autotrail demo server
//!
//! Binds a Unix-domain socket and serves the demo `ApiHandler` until
//! either a client calls `stop` or the process receives Ctrl-C.

use std::path::PathBuf;
use std::time::Duration;

use autotrail::{BindOptions, Map, MethodApiHandlerWrapper, SocketServer};
use clap::Parser;
use tokio::signal;

#[cfg(feature = "otel")]
use opentelemetry::global;
#[cfg(feature = "otel")]
use opentelemetry::sdk::trace as sdktrace;
#[cfg(feature = "otel")]
use opentelemetry_aws::trace::XrayPropagator;
#[cfg(feature = "otel")]
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, util::TryInitError, EnvFilter};

#[derive(Parser, Debug)]
#[clap(name = "autotrail-server", version, author, about = "Serve the demo AutoTrail API over a Unix socket")]
struct Cli {
    #[clap(long, default_value = "/tmp/autotrail.sock")]
    socket: PathBuf,

    /// Remove a pre-existing socket file at this path before binding.
    #[clap(long)]
    remove_existing: bool,

    #[clap(long, default_value_t = 5)]
    timeout_secs: u64,

    #[clap(long, default_value_t = 10)]
    poll_delay_millis: u64,
}

#[tokio::main]
pub async fn main() -> autotrail::Result<()> {
    set_up_logging().map_err(|e| autotrail::Error::Codec(e.to_string()))?;

    let cli = Cli::parse();
    let server = SocketServer::new(
        MethodApiHandlerWrapper::new(autotrail::demo::DemoHandler),
        Duration::from_millis(cli.poll_delay_millis),
        Duration::from_secs(cli.timeout_secs),
    );

    server
        .run(
            &cli.socket,
            BindOptions {
                remove_existing: cli.remove_existing,
            },
            &[],
            &Map::new(),
            async {
                let _ = signal::ctrl_c().await;
            },
        )
        .await
}

#[cfg(not(feature = "otel"))]
fn set_up_logging() -> Result<(), tracing_subscriber::util::TryInitError> {
    tracing_subscriber::fmt::try_init()
}

#[cfg(feature = "otel")]
fn set_up_logging() -> Result<(), TryInitError> {
    use tracing_subscriber::{fmt, EnvFilter};
    global::set_text_map_propagator(XrayPropagator::default());

    let tracer = opentelemetry_otlp::new_pipeline()
        .tracing()
        .with_exporter(opentelemetry_otlp::new_exporter().tonic())
        .with_trace_config(
            sdktrace::config()
                .with_sampler(sdktrace::Sampler::AlwaysOn)
                .with_id_generator(sdktrace::XrayIdGenerator::default()),
        )
        .install_simple()
        .expect("Unable to initialize OtlpPipeline");

    let opentelemetry = tracing_opentelemetry::layer().with_tracer(tracer);
    let filter = EnvFilter::from_default_env();

    tracing_subscriber::registry()
        .with(opentelemetry)
        .with(filter)
        .with(fmt::Layer::default())
        .try_init()
}
