pub mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config::AppConfig;

#[derive(Parser)]
#[command(name = "api-moduled")]
#[command(about = "HTTP API backed by a directory of handler executables")]
#[command(version)]
pub struct Cli {
    #[arg(long, global = true, help = "Output in JSON format")]
    pub json: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Run the HTTP server (default)")]
    Serve(ServeArgs),

    #[command(about = "List the routes discovered in the handler directory")]
    Routes {
        #[arg(long, help = "Handler directory (overrides AMLD_HANDLER_DIR)")]
        handler_dir: Option<PathBuf>,
    },

    #[command(about = "Show the effective configuration (secrets omitted)")]
    Config,
}

#[derive(clap::Args, Default)]
pub struct ServeArgs {
    #[arg(long, help = "Listen address (overrides AMLD_BIND_ADDRESS)")]
    pub bind: Option<String>,

    #[arg(long, help = "Handler directory (overrides AMLD_HANDLER_DIR)")]
    pub handler_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    pub fn from_cli(cli: &Cli) -> Self {
        if cli.json {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        }
    }
}

pub async fn run(cli: Cli, mut config: AppConfig) -> anyhow::Result<()> {
    let output_format = OutputFormat::from_cli(&cli);

    match cli.command.unwrap_or(Commands::Serve(ServeArgs::default())) {
        Commands::Serve(args) => {
            if let Some(bind) = args.bind {
                config.server.bind_address = bind;
            }
            if let Some(dir) = args.handler_dir {
                config.server.handler_dir = dir;
            }
            commands::serve::handle(config).await
        }
        Commands::Routes { handler_dir } => {
            if let Some(dir) = handler_dir {
                config.server.handler_dir = dir;
            }
            commands::routes::handle(&config, output_format)
        }
        Commands::Config => commands::config::handle(&config, output_format),
    }
}
