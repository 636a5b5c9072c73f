//! Bulk URL fetcher: downloads every URL of a list concurrently into one
//! directory, giving colliding file names a numeric suffix.

pub mod cli;
pub mod downloader;
pub mod logging;
pub mod models;
pub mod naming;
pub mod report;

pub use downloader::Downloader;
pub use models::{Downloaded, FetchError, FetchOptions, FetchReport, RunSummary};
