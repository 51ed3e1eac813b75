//! Entitydef CLI - Inspect entity definitions and transcode values

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{decode, describe, digest, encode, layout};

#[derive(Parser)]
#[command(name = "entitydef")]
#[command(about = "Inspect entity type definitions and transcode property values", long_about = None)]
#[command(version)]
struct Cli {
    /// Definition directories, each holding `types/*.toml`. Later ones
    /// override earlier ones.
    #[arg(long = "defs", global = true, default_value = "defs")]
    defs: Vec<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List named types, or describe one type
    Describe {
        /// Type name or built-in type token
        name: Option<String>,
    },

    /// Print the fingerprint of every named type
    Digest,

    /// Print the flattened stream elements of a type
    Layout {
        /// Type name or built-in type token
        name: String,

        /// Only persistent fields
        #[arg(long)]
        persistent: bool,
    },

    /// Encode the `value` key of a TOML file and print it as hex
    Encode {
        /// Type name or built-in type token
        name: String,

        /// Path to a TOML file with a `value` key
        value: String,

        /// Only persistent fields
        #[arg(long)]
        persistent: bool,
    },

    /// Decode hex bytes and print the value as TOML
    Decode {
        /// Type name or built-in type token
        name: String,

        /// Hex-encoded stream
        hex: String,

        /// Only persistent fields
        #[arg(long)]
        persistent: bool,
    },
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    let defs = cli.defs;

    match cli.command {
        Commands::Describe { name } => describe::run(&defs, name.as_deref()),
        Commands::Digest => digest::run(&defs),
        Commands::Layout { name, persistent } => layout::run(&defs, &name, persistent),
        Commands::Encode {
            name,
            value,
            persistent,
        } => encode::run(&defs, &name, &value, persistent),
        Commands::Decode {
            name,
            hex,
            persistent,
        } => decode::run(&defs, &name, &hex, persistent),
    }
}
