mod args;

use std::process::ExitCode;

use clap::Parser;
use httpc_core::{HttpClient, HttpResponse};
use tracing::debug;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::args::{Cli, Command};

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("[FAILED] {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: bool) {
    let default_filter = if verbose {
        "httpc=debug,httpc_core=debug"
    } else {
        "httpc=info,httpc_core=info"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn run(cli: Cli) -> anyhow::Result<()> {
    debug!(?cli, "arguments");
    let client = HttpClient::new(cli.transport.to_config(cli.udp));

    let response = execute(&client, &cli.command)?;
    println!("{}", render(&response)?);
    Ok(())
}

fn execute(client: &HttpClient, command: &Command) -> anyhow::Result<HttpResponse> {
    let response = match command {
        Command::Get(args) => client.get(&args.url, args.request_headers())?,
        Command::Delete(args) => client.delete(&args.url, args.request_headers())?,
        Command::Post(args) => {
            let (headers, body) = args.payload()?;
            client.post(&args.common.url, headers, body)?
        }
        Command::Put(args) => {
            let (headers, body) = args.payload()?;
            client.put(&args.common.url, headers, body)?
        }
    };
    Ok(response)
}

/// Pretty-printed `{status_code, status, headers, body}` object.
fn render(response: &HttpResponse) -> serde_json::Result<String> {
    serde_json::to_string_pretty(response)
}
