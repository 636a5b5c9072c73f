use crate::models::FetchOptions;
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "bulkfetch")]
#[command(author, version, about = "Download every URL listed in a file, in parallel", long_about = None)]
pub struct Args {
    /// Input file containing one URL per line
    #[arg(short = 'l', long = "list", default_value = "js-urls.txt")]
    pub list: PathBuf,

    /// Output directory
    #[arg(short, long, default_value = "jsoutput-files")]
    pub output: PathBuf,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Maximum number of simultaneous downloads (0 = unlimited)
    #[arg(short, long, default_value = "0")]
    pub jobs: usize,

    /// HTTP proxy (e.g., http://127.0.0.1:7890)
    #[arg(long)]
    pub proxy: Option<String>,

    /// Delete the empty or partial file left behind by a failed download
    #[arg(long)]
    pub remove_failed: bool,

    /// Write a JSON summary of the run to this file
    #[arg(long)]
    pub report: Option<PathBuf>,

    /// Show an overall progress bar
    #[arg(long)]
    pub progress: bool,

    /// Exit with a non-zero status if any download failed
    #[arg(long)]
    pub fail_on_error: bool,
}

impl Args {
    pub fn fetch_options(&self) -> FetchOptions {
        FetchOptions {
            output_dir: self.output.clone(),
            verbose: self.verbose,
            jobs: (self.jobs > 0).then_some(self.jobs),
            proxy: self.proxy.clone(),
            remove_failed: self.remove_failed,
            progress: self.progress,
        }
    }
}
