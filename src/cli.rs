use clap::{Parser, Subcommand};

/// Solterra Server - marketing site backend
#[derive(Parser)]
#[command(name = "solterra-server")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the server (default)
    Serve,

    /// Validate environment configuration and exit
    CheckConfig,
}
