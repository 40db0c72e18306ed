//! Command-line client: issue one request and print the response body.
//!
//! Run with: mcp-call [--host H] [--port P] [--timeout S] TYPE [JSON]

use std::env;
use std::process::ExitCode;

use serde_json::Value;
use tracing_subscriber::EnvFilter;

use mcp_rpc::config::ClientConfig;
use mcp_rpc::{RpcClient, RpcError};

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Parsed command line.
struct Invocation {
    config: ClientConfig,
    request_type: String,
    params: Value,
}

fn main() -> ExitCode {
    let args: Vec<String> = env::args().skip(1).collect();

    if args.iter().any(|a| a == "--help" || a == "-h") {
        print_help();
        return ExitCode::SUCCESS;
    }

    if args.iter().any(|a| a == "--version" || a == "-V") {
        println!("mcp-call {}", VERSION);
        return ExitCode::SUCCESS;
    }

    // Quiet unless RUST_LOG asks otherwise
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let invocation = match parse_args(&args) {
        Ok(invocation) => invocation,
        Err(message) => {
            eprintln!("Error: {}\n", message);
            print_help();
            return ExitCode::from(64);
        }
    };

    let mut client = RpcClient::new(invocation.config);
    match client.call(&invocation.request_type, invocation.params) {
        Ok(body) => {
            match serde_json::to_string_pretty(&body) {
                Ok(text) => println!("{}", text),
                Err(_) => println!("{}", body),
            }
            ExitCode::SUCCESS
        }
        Err(e) if e.is_retryable() => {
            eprintln!("Transport failure (retry on a fresh connection): {}", e);
            ExitCode::from(2)
        }
        Err(e @ RpcError::Protocol { .. }) => {
            eprintln!("Request rejected: {}", e);
            ExitCode::from(1)
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::from(1)
        }
    }
}

fn parse_args(args: &[String]) -> Result<Invocation, String> {
    let mut config = ClientConfig::default();
    let mut positional = Vec::new();
    let mut iter = args.iter();

    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--host" => {
                config.host = iter.next().ok_or("--host needs a value")?.clone();
            }
            "--port" | "-p" => {
                let value = iter.next().ok_or("--port needs a value")?;
                config.port = value
                    .parse()
                    .map_err(|_| format!("invalid port '{}'", value))?;
            }
            "--timeout" | "-t" => {
                let value = iter.next().ok_or("--timeout needs a value")?;
                let seconds: u64 = value
                    .parse()
                    .map_err(|_| format!("invalid timeout '{}'", value))?;
                if seconds == 0 {
                    return Err("timeout must be at least 1 second".to_string());
                }
                config.connect_timeout_seconds = seconds;
                config.io_timeout_seconds = seconds;
            }
            _ => positional.push(arg.clone()),
        }
    }

    let mut positional = positional.into_iter();
    let request_type = positional.next().ok_or("missing request TYPE")?;
    let params = match positional.next() {
        Some(text) => {
            serde_json::from_str(&text).map_err(|e| format!("invalid JSON params: {}", e))?
        }
        None => Value::Object(serde_json::Map::new()),
    };
    if let Some(extra) = positional.next() {
        return Err(format!("unexpected argument '{}'", extra));
    }

    Ok(Invocation {
        config,
        request_type,
        params,
    })
}

fn print_help() {
    println!(
        r#"mcp-call {}
Send one request to an MCP RPC server and print the response body.

USAGE:
    mcp-call [OPTIONS] TYPE [JSON]

ARGS:
    TYPE                   Request type (e.g. data_query)
    JSON                   Request body [default: {{}}]

OPTIONS:
        --host <HOST>      Server host [default: 127.0.0.1]
    -p, --port <PORT>      Server port [default: 8080]
    -t, --timeout <SECS>   Connect and I/O timeout [default: 10]
    -h, --help             Print help information
    -V, --version          Print version information

EXIT CODES:
    0  success
    1  request rejected by the server
    2  transport failure
"#,
        VERSION
    );
}
