//! Server configuration
//!
//! Every option can come from a command-line flag or an environment
//! variable; flags win.

use crate::storage::ReaperConfig;
use crate::{DEFAULT_DATA_DIR, DEFAULT_HOST, DEFAULT_PORT};
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Parser)]
#[command(name = "textdrop", version, about = "Ephemeral text sharing server")]
pub struct Config {
    /// Host to bind to
    #[arg(long, env = "TEXTDROP_HOST", default_value = DEFAULT_HOST)]
    pub host: String,

    /// Port to listen on
    #[arg(short, long, env = "TEXTDROP_PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Directory holding one file per entry
    #[arg(long, env = "TEXTDROP_DATA_DIR", default_value = DEFAULT_DATA_DIR)]
    pub data_dir: PathBuf,

    /// Directory of static files served at `/`
    #[arg(long, env = "TEXTDROP_STATIC_DIR")]
    pub static_dir: Option<PathBuf>,

    /// Seconds between reaper sweeps
    #[arg(
        long,
        env = "TEXTDROP_REAP_INTERVAL",
        default_value_t = 660,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub reap_interval: u64,

    /// Length of generated entry ids
    #[arg(
        long,
        env = "TEXTDROP_ID_LENGTH",
        default_value_t = 36,
        value_parser = clap::value_parser!(u16).range(33..=36)
    )]
    pub id_length: u16,
}

impl Config {
    /// Returns the bind address as a string
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn reaper_config(&self) -> ReaperConfig {
        ReaperConfig {
            interval: Duration::from_secs(self.reap_interval),
        }
    }

    pub fn id_length(&self) -> usize {
        usize::from(self.id_length)
    }
}
