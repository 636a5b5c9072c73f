use anyhow::Result;
use bulkfetch::cli::Args;
use bulkfetch::report::ReportWriter;
use bulkfetch::{logging, Downloader, RunSummary};
use clap::Parser;
use tracing::error;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    logging::init(args.verbose);

    let downloader = Downloader::new(&args.fetch_options())?;

    let summary = match Downloader::open_url_list(&args.list) {
        Ok(lines) => downloader.download_all(lines).await,
        Err(e) => {
            error!("{:#}", e);
            RunSummary {
                reports: Vec::new(),
                input_error: Some(format!("{:#}", e)),
            }
        }
    };

    if let Some(report) = &args.report {
        ReportWriter::new(report).save(&summary)?;
    }

    // Individual failures are only logged unless the caller asks otherwise.
    if args.fail_on_error && summary.has_failures() {
        std::process::exit(1);
    }

    Ok(())
}
