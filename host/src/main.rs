use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use host::config::FileConfig;
use host::daq::CreditUnit;
use host::{Client, Settings};

#[derive(Parser)]
#[command(name = "minos-host", about = "UDP command client for a MINOS Feminos/TCM card")]
struct Cli {
  /// Card address, e.g. 192.168.1.50:2000. Overrides the config file.
  #[arg(long)]
  target: Option<SocketAddr>,

  /// Optional TOML config file (§10.3).
  #[arg(long)]
  config: Option<PathBuf>,

  #[arg(long)]
  card_id: Option<u8>,

  /// Reply timeout in milliseconds.
  #[arg(long, default_value_t = 2000)]
  timeout_ms: u64,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand)]
enum Command {
  /// Send one raw command line and print the CFRAME reply.
  Send { line: String },
  /// Continuously grant DAQ credit (§4.4.1) until interrupted.
  Daq {
    amount: u32,
    #[arg(long, default_value = "frames")]
    unit: String,
    #[arg(long, default_value_t = 500)]
    interval_ms: u64,
  },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt::init();
  let cli = Cli::parse();

  let file_config = match &cli.config {
    Some(path) => FileConfig::load(path)?,
    None => FileConfig::default(),
  };
  let settings = Settings::resolve(file_config, cli.target, cli.card_id, None)?;

  let client = Client::connect(settings.target).await?;
  let reply_wait = Duration::from_millis(cli.timeout_ms);

  match cli.command {
    Command::Send { line } => {
      let reply = client.command(&line, reply_wait).await?;
      println!("{} {}", reply.error_code, reply.message);
    }
    Command::Daq { amount, unit, interval_ms } => {
      let unit = match unit.as_str() {
        "bytes" | "b" => CreditUnit::Bytes,
        _ => CreditUnit::Frames,
      };
      let period = Duration::from_millis(interval_ms);
      tokio::select! {
        result = host::daq::run(&client, amount, unit, period, reply_wait, || false) => result?,
        _ = tokio::signal::ctrl_c() => {
          tracing::info!("interrupted, stopping credit issuer");
        }
      }
    }
  }

  Ok(())
}
