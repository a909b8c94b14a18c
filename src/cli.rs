use std::path::PathBuf;

use clap::Parser;

#[derive(Debug, Parser)]
#[command(name = "chessroom", version, about = "Realtime multiplayer chess server")]
pub struct Cli {
    /// YAML configuration file. Falls back to $CHESSROOM_CONFIG when absent.
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Address to listen on, overrides the configuration file.
    #[arg(short, long, value_name = "HOST:PORT")]
    pub address: Option<String>,

    /// Number of command worker threads, overrides the configuration file.
    #[arg(short, long, value_name = "N")]
    pub threads: Option<usize>,
}

impl Cli {
    /// Configuration path from the command line, or from the environment.
    pub fn config_path(&self) -> Option<PathBuf> {
        self.config
            .clone()
            .or_else(|| std::env::var_os("CHESSROOM_CONFIG").map(PathBuf::from))
    }
}
