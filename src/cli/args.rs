use clap::Parser;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "s2mosaic", version, about = "S2MOSAIC CLI")]
pub struct CliArgs {
    /// Acquisition configuration file (JSON)
    #[arg(short, long)]
    pub config: PathBuf,

    /// Override the local output directory from the configuration
    #[arg(long)]
    pub output_dir: Option<PathBuf>,

    /// Override the stacked output file name from the configuration
    #[arg(long)]
    pub stacked_file: Option<String>,

    /// Abort monitoring after this many seconds instead of polling forever
    #[arg(long)]
    pub max_wait_secs: Option<u64>,

    /// Enable logging
    #[arg(long, default_value_t = false)]
    pub log: bool,
}
