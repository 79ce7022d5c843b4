//! autotrail demo CLI
//!
//! Issues one method call against the demo server and prints the result.

use std::path::PathBuf;
use std::time::Duration;

use autotrail::value::named;
use autotrail::MethodApiClientWrapper;
use clap::{Parser, Subcommand};
use serde_json::Value;

#[derive(Parser, Debug)]
#[clap(name = "autotrail-cli", version, author, about = "Call methods on the demo AutoTrail server")]
struct Cli {
    #[clap(subcommand)]
    command: Command,

    #[clap(long, default_value = "/tmp/autotrail.sock")]
    socket: PathBuf,

    #[clap(long, default_value_t = 5)]
    timeout_secs: u64,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Call `ping`.
    Ping,
    /// Call `add a b`.
    Add { a: i64, b: i64 },
    /// Call `boom`, which always returns an error.
    Boom,
    /// Call `stop`, which shuts down the server.
    Stop,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> autotrail::Result<()> {
    tracing_subscriber::fmt::try_init().map_err(|e| autotrail::Error::Codec(e.to_string()))?;

    let cli = Cli::parse();
    let client = MethodApiClientWrapper::new(&cli.socket, Duration::from_secs(cli.timeout_secs));

    let result: Option<Value> = match cli.command {
        Command::Ping => client.call("ping", vec![], named([])).await?,
        Command::Add { a, b } => {
            client
                .call("add", vec![Value::from(a), Value::from(b)], named([]))
                .await?
        }
        Command::Boom => client.call("boom", vec![], named([])).await?,
        Command::Stop => client.call("stop", vec![], named([])).await?,
    };

    match result {
        Some(value) => println!("{value}"),
        None => println!("(no response)"),
    }
    Ok(())
}
