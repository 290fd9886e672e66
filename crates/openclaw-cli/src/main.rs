//! openclaw-route - run the OpenClaw routing core from the command line.

mod commands;
mod ui;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser)]
#[command(name = "openclaw-route")]
#[command(about = "OpenClaw routing core - delivery targets, sessions and channel enablement")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Config file (defaults to ~/.openclaw/openclaw.json)
    #[arg(long, global = true, env = "OPENCLAW_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Switch on configured channels and auth plugins
    AutoEnable {
        /// Save the resolved configuration
        #[arg(long)]
        write: bool,
    },

    /// Resolve where an agent's reply should be delivered
    Resolve {
        /// Agent id
        #[arg(long, default_value = "main")]
        agent: String,

        /// Channel, or "last" for the session's last channel
        #[arg(long)]
        channel: Option<String>,

        /// Address on the channel
        #[arg(long)]
        to: Option<String>,

        /// Thread within the address
        #[arg(long)]
        thread: Option<String>,

        /// Session store override
        #[arg(long)]
        store: Option<PathBuf>,
    },

    /// Record an inbound message against a session
    Record {
        /// Session key (e.g. agent:main:main)
        #[arg(long)]
        session_key: String,

        /// Originating channel
        #[arg(long)]
        channel: String,

        /// Surface the message was typed into (defaults to the channel)
        #[arg(long)]
        surface: Option<String>,

        /// Reply address; also proposes it as the session's last route
        #[arg(long)]
        to: Option<String>,

        /// Receiving account
        #[arg(long)]
        account: Option<String>,

        /// Thread within the address
        #[arg(long)]
        thread: Option<String>,

        /// Message text
        #[arg(long)]
        body: Option<String>,

        /// Agent owning the session store
        #[arg(long, default_value = "main")]
        agent: String,

        /// Session store override
        #[arg(long)]
        store: Option<PathBuf>,
    },

    /// List stored sessions
    Sessions {
        /// Agent owning the session store
        #[arg(long, default_value = "main")]
        agent: String,

        /// Session store override
        #[arg(long)]
        store: Option<PathBuf>,
    },

    /// Validate the configuration file
    Validate,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    if cli.json {
        tracing_subscriber::registry()
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .with(filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
            .with(filter)
            .init();
    }

    let config_path = cli.config;

    match cli.command {
        Commands::AutoEnable { write } => {
            let args = commands::auto_enable::AutoEnableArgs { config_path, write };
            commands::run_auto_enable(&args)?;
        }

        Commands::Resolve {
            agent,
            channel,
            to,
            thread,
            store,
        } => {
            let args = commands::resolve::ResolveArgs {
                config_path,
                agent,
                channel,
                to,
                thread,
                store,
            };
            commands::run_resolve(&args).await?;
        }

        Commands::Record {
            session_key,
            channel,
            surface,
            to,
            account,
            thread,
            body,
            agent,
            store,
        } => {
            let args = commands::record::RecordArgs {
                config_path,
                session_key,
                channel,
                surface,
                to,
                account,
                thread,
                body,
                agent,
                store,
            };
            commands::run_record(&args).await?;
        }

        Commands::Sessions { agent, store } => {
            let args = commands::sessions::SessionsArgs {
                config_path,
                agent,
                store,
            };
            commands::run_sessions(&args)?;
        }

        Commands::Validate => {
            commands::run_validate(config_path.as_deref())?;
        }
    }

    Ok(())
}
