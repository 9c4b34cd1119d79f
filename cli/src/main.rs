//! kafka-please: start a throwaway ZooKeeper + Kafka pair, or probe one.

mod commands;

use clap::{Parser, Subcommand};
use kafka_please::logging;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(name = "kafka-please")]
#[command(about = "Disposable single-node ZooKeeper + Kafka clusters")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start a cluster, print its ports, and stop it on Ctrl-C
    Up {
        /// YAML configuration file
        #[arg(long)]
        config: Option<PathBuf>,

        /// Kafka distribution to run (overrides the config file and KAFKA_PLEASE_HOME)
        #[arg(long)]
        kafka_home: Option<PathBuf>,
    },

    /// Run a single readiness check
    Probe {
        #[command(subcommand)]
        target: ProbeTarget,
    },
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
enum ProbeTarget {
    /// `ruok` against a ZooKeeper client port
    Zookeeper {
        #[arg(long)]
        port: u16,

        /// Connect + reply budget in milliseconds
        #[arg(long, default_value = "1000")]
        timeout_ms: u64,
    },

    /// Broker registration, looked up through ZooKeeper
    Broker {
        #[arg(long)]
        zk_port: u16,

        /// Connect + lookup budget in milliseconds
        #[arg(long, default_value = "1000")]
        timeout_ms: u64,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    logging::init_logging(&logging::resolve_level());

    let cli = Cli::parse();
    match cli.command {
        Command::Up { config, kafka_home } => {
            commands::up(config.as_deref(), kafka_home).await?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Probe { target } => Ok(commands::probe(target).await),
    }
}
