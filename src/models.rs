use reqwest::StatusCode;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Settings shared by every worker of one run.
#[derive(Debug, Clone)]
pub struct FetchOptions {
    pub output_dir: PathBuf,
    pub verbose: bool,
    /// `None` spawns every download at once.
    pub jobs: Option<usize>,
    pub proxy: Option<String>,
    pub remove_failed: bool,
    pub progress: bool,
}

impl FetchOptions {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            verbose: false,
            jobs: None,
            proxy: None,
            remove_failed: false,
            progress: false,
        }
    }
}

/// A file that was written in full.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Downloaded {
    pub path: PathBuf,
    pub bytes: u64,
}

/// Why a single URL failed. Every variant is terminal for its worker only.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("cannot derive a file name from {url:?}")]
    NoFileName { url: String },

    #[error("error creating output directory {}: {source}", .dir.display())]
    CreateDir {
        dir: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("error creating file {}: {source}", .path.display())]
    CreateFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("error downloading {url}: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("non-live URL {url}: HTTP {}", .status.as_u16())]
    NonLive { url: String, status: StatusCode },

    #[error("error writing to file {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("download of {url} interrupted: {source}")]
    Interrupted {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("download task for {url} failed: {message}")]
    Task { url: String, message: String },
}

impl FetchError {
    pub fn kind(&self) -> &'static str {
        match self {
            FetchError::NoFileName { .. } => "no_file_name",
            FetchError::CreateDir { .. } => "create_dir",
            FetchError::CreateFile { .. } => "create_file",
            FetchError::Transport { .. } => "transport",
            FetchError::NonLive { .. } => "non_live",
            FetchError::Write { .. } => "write",
            FetchError::Interrupted { .. } => "interrupted",
            FetchError::Task { .. } => "task",
        }
    }
}

#[derive(Debug)]
pub struct FetchReport {
    pub url: String,
    pub result: Result<Downloaded, FetchError>,
}

#[derive(Debug, Default)]
pub struct RunSummary {
    pub reports: Vec<FetchReport>,
    /// Set when the URL list could not be read to the end.
    pub input_error: Option<String>,
}

impl RunSummary {
    pub fn succeeded(&self) -> usize {
        self.reports.iter().filter(|r| r.result.is_ok()).count()
    }

    pub fn failed(&self) -> usize {
        self.reports.len() - self.succeeded()
    }

    pub fn has_failures(&self) -> bool {
        self.failed() > 0 || self.input_error.is_some()
    }

    pub fn report_for(&self, url: &str) -> Option<&FetchReport> {
        self.reports.iter().find(|r| r.url == url)
    }
}
