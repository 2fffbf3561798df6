use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "chat-memory-relay")]
#[command(author, version, about = "LLM chat relay with per-user memory", long_about = None)]
pub struct Cli {
    /// Memory directory (overrides memory.dir from config)
    #[arg(long, global = true)]
    pub memory_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the HTTP server
    Serve {
        #[arg(long)]
        host: Option<String>,

        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Print the stored conversation of a user
    Show { user: String },

    /// List users that have a stored conversation
    Users,

    /// Delete the stored conversation of a user
    Forget { user: String },

    /// Delete every stored conversation
    ForgetAll,
}
