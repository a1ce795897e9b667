use std::io::Write;
use std::path::Path;

use clap::{Parser, Subcommand};

use rpc_mux::config::ObservabilityConfig;
use rpc_mux::observability::logging;
use rpc_mux::wire::{from_json, to_json, Blob, Value};
use rpc_mux::RemoteClient;

#[derive(Parser)]
#[command(name = "rpc-cli")]
#[command(about = "Call remote functions on an rpc-mux server", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:3000/api/remote")]
    url: String,

    /// Extra request header, `name:value`. Repeatable.
    #[arg(short = 'H', long = "header")]
    headers: Vec<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Call a function. Arguments are JSON literals, `@path` for a file,
    /// or plain strings.
    Call {
        function: String,
        args: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    logging::init(&ObservabilityConfig {
        log_level: "warn".to_string(),
        ..Default::default()
    })?;

    let mut client = RemoteClient::new(&cli.url);
    for header in &cli.headers {
        let (name, value) = header
            .split_once(':')
            .ok_or_else(|| format!("header must be name:value, got {header:?}"))?;
        client = client.with_header(name.trim(), value.trim())?;
    }

    match cli.command {
        Commands::Call { function, args } => {
            let args = args
                .iter()
                .map(|arg| parse_arg(arg))
                .collect::<Result<Vec<_>, _>>()?;
            let result = client.call(&function, &args).await?;
            print_value(&result)?;
        }
    }

    Ok(())
}

fn parse_arg(arg: &str) -> Result<Value, std::io::Error> {
    if let Some(path) = arg.strip_prefix('@') {
        let data = std::fs::read(path)?;
        let filename = Path::new(path)
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.to_string());
        return Ok(Value::Bytes(Blob::new(filename, data)));
    }
    Ok(match serde_json::from_str(arg) {
        Ok(json) => from_json(json),
        Err(_) => Value::String(arg.to_string()),
    })
}

fn print_value(value: &Value) -> Result<(), Box<dyn std::error::Error>> {
    match value {
        Value::Undefined => {}
        Value::String(s) => println!("{s}"),
        Value::Bytes(blob) => std::io::stdout().write_all(&blob.data)?,
        other => println!("{}", serde_json::to_string_pretty(&to_json(other)?)?),
    }
    Ok(())
}
