use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use poolcopapi::PoolCopilot;
use tracing::debug;
use tracing_subscriber::prelude::*;

mod config;
mod parser;

use config::Settings;

#[derive(Parser)]
#[clap(author, version, about)]
struct Args {
    #[clap(short, long, action)]
    verbose: bool,
    #[clap(short, long, help = "yaml config file")]
    config: Option<PathBuf>,
    #[clap(long, env = "POOLCOPILOT_API_KEY", hide_env_values = true)]
    api_key: Option<String>,
    #[clap(long, env = "POOLCOPILOT_BASE_URL")]
    base_url: Option<String>,
    #[clap(long, value_parser = parser::parse_timeout, help = "request timeout, e.g. 10s")]
    timeout: Option<Duration>,
    #[clap(long, action, help = "exchange the API key for a token instead of sending it directly")]
    token: bool,
    #[clap(long, action, conflicts_with = "token", help = "send the API key directly, overrides the config file")]
    no_token: bool,
    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    /// Prints the current state of the PoolCop.
    Status,
    /// Prints the alarm history.
    Alarms {
        #[clap(long, default_value_t = 0)]
        offset: u32,
    },
    /// Prints the history of commands sent to the PoolCop.
    Commands {
        #[clap(long, default_value_t = 0)]
        offset: u32,
    },
    #[clap(subcommand)]
    Pump(PumpCommand),
    /// Toggles an auxiliary output.
    Aux { id: u32 },
    ClearAlarm,
    /// Moves the valve to a position.
    Valve { position: u32 },
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
enum PumpCommand {
    Toggle,
    Speed {
        #[clap(value_parser = parser::parse_pump_speed)]
        speed: u8,
    },
}

impl Args {
    fn settings(&self) -> anyhow::Result<Settings> {
        let file = match &self.config {
            Some(path) => Settings::from_yaml_file(path)?,
            None => Settings::default(),
        };
        let flags = Settings {
            api_key: self.api_key.clone(),
            base_url: self.base_url.clone(),
            timeout: self.timeout,
            token_auth: match (self.token, self.no_token) {
                (true, _) => Some(true),
                (_, true) => Some(false),
                _ => None,
            },
        };
        Ok(file.merge(flags))
    }
}

async fn run(client: &PoolCopilot, cmd: Command) -> poolcopapi::Result<poolcopapi::Value> {
    match cmd {
        Command::Status => client.status().await,
        Command::Alarms { offset } => client.alarm_history(offset).await,
        Command::Commands { offset } => client.command_history(offset).await,
        Command::Pump(PumpCommand::Toggle) => client.toggle_pump().await,
        Command::Pump(PumpCommand::Speed { speed }) => client.set_pump_speed(speed).await,
        Command::Aux { id } => client.toggle_aux(id).await,
        Command::ClearAlarm => client.clear_alarm().await,
        Command::Valve { position } => client.set_valve_position(position).await,
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    let args = Args::parse();

    let log_level = if args.verbose {
        "info,poolcopapi=trace,reqwest=debug"
    } else {
        "warn"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::builder()
                .parse_lossy(std::env::var("RUST_LOG").unwrap_or_else(|_| log_level.to_string())),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let (api_key, config) = args.settings()?.client_config()?;
    debug!("using {:?}", config);

    let mut client = PoolCopilot::with_config(api_key, config)?;
    let session = client.open()?;
    let result = run(&session, args.command).await?;
    println!("{}", serde_json::to_string_pretty(&result)?);

    Ok(())
}
