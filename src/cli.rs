//! Command-line interface for voxmix
//!
//! Provides argument parsing using clap derive macros.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Synthetic speech-separation training corpus generator
#[derive(Parser, Debug)]
#[command(name = "voxmix", version, about = "Synthetic speech-separation corpus generator")]
pub struct Cli {
    /// Subcommand to execute (default: generate the corpus)
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Path to the TOML configuration file
    #[arg(short, long, value_name = "PATH")]
    pub config: PathBuf,

    /// Directory for generated artifacts (train/ and test/ are created inside)
    #[arg(short, long, value_name = "PATH")]
    pub out_dir: PathBuf,

    /// Worker pool size override (default: configured value, 0 = core count)
    #[arg(short, long, value_name = "N")]
    pub processes: Option<usize>,

    /// Apply VAD merging to target/interference before cropping
    #[arg(long)]
    pub vad: bool,

    /// Base RNG seed override for deterministic runs
    #[arg(long, value_name = "SEED")]
    pub seed: Option<u64>,

    /// Suppress progress output
    #[arg(short, long)]
    pub quiet: bool,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List speakers discovered in the source corpus
    Speakers,
}
