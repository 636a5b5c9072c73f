use crate::models::{Downloaded, FetchError, FetchOptions, FetchReport, RunSummary};
use crate::naming::{self, PathAllocator};
use anyhow::{Context, Result};
use futures::future::join_all;
use indicatif::{ProgressBar, ProgressStyle};
use reqwest::{Client, Response, StatusCode};
use std::fs::File;
use std::io::{self, BufRead, BufReader, Split};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::Semaphore;
use tokio::task;
use tracing::{debug, error, info, warn};

#[derive(Clone)]
pub struct Downloader {
    client: Client,
    output_dir: PathBuf,
    allocator: Arc<PathAllocator>,
    verbose: bool,
    jobs: Option<usize>,
    remove_failed: bool,
    progress: bool,
}

impl Downloader {
    pub fn new(options: &FetchOptions) -> Result<Self> {
        // No timeout: a slow transfer is left to finish.
        let mut client_builder = Client::builder();

        if let Some(proxy_url) = &options.proxy {
            let proxy = reqwest::Proxy::all(proxy_url)
                .with_context(|| format!("Invalid proxy URL: {}", proxy_url))?;
            client_builder = client_builder.proxy(proxy);
        }

        let client = client_builder
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            output_dir: options.output_dir.clone(),
            allocator: Arc::new(PathAllocator::new()),
            verbose: options.verbose,
            jobs: options.jobs,
            remove_failed: options.remove_failed,
            progress: options.progress,
        })
    }

    /// Opens the URL list. Lines are read lazily so downloads start while the
    /// rest of the file is still being read.
    pub fn open_url_list(path: &Path) -> Result<UrlLines<BufReader<File>>> {
        let file = File::open(path)
            .with_context(|| format!("Failed to open input file {}", path.display()))?;
        Ok(UrlLines::new(BufReader::new(file)))
    }

    /// Fetches one URL into the output directory and logs the outcome.
    pub async fn fetch(&self, url: String) -> FetchReport {
        let result = self.download_file(&url).await;

        match &result {
            Ok(done) => {
                let name = done
                    .path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default();
                info!(bytes = done.bytes, "Downloaded {}", name);
            }
            Err(e @ FetchError::NonLive { .. }) => warn!("{}", e),
            Err(e) => error!("{}", e),
        }

        FetchReport { url, result }
    }

    async fn download_file(&self, url: &str) -> Result<Downloaded, FetchError> {
        let file_name = naming::base_name(url).ok_or_else(|| FetchError::NoFileName {
            url: url.to_string(),
        })?;
        let output_path = {
            let allocator = Arc::clone(&self.allocator);
            let dir = self.output_dir.clone();
            let file_name = file_name.to_string();
            task::spawn_blocking(move || allocator.claim(&dir, &file_name))
                .await
                .map_err(|e| FetchError::Task {
                    url: url.to_string(),
                    message: e.to_string(),
                })?
        };

        if self.verbose {
            info!("Starting download: {}", url);
        }

        fs::create_dir_all(&self.output_dir)
            .await
            .map_err(|source| FetchError::CreateDir {
                dir: self.output_dir.clone(),
                source,
            })?;

        let mut file = fs::File::create(&output_path)
            .await
            .map_err(|source| FetchError::CreateFile {
                path: output_path.clone(),
                source,
            })?;

        let streamed = self.stream_body(url, &output_path, &mut file).await;
        drop(file);

        match streamed {
            Ok(bytes) => Ok(Downloaded {
                path: output_path,
                bytes,
            }),
            Err(e) => {
                if self.remove_failed {
                    self.remove_artifact(&output_path).await;
                }
                Err(e)
            }
        }
    }

    async fn stream_body(
        &self,
        url: &str,
        output_path: &Path,
        file: &mut fs::File,
    ) -> Result<u64, FetchError> {
        let mut response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|source| FetchError::Transport {
                url: url.to_string(),
                source,
            })?;

        if response.status() != StatusCode::OK {
            return Err(FetchError::NonLive {
                url: url.to_string(),
                status: response.status(),
            });
        }

        write_body(&mut response, file, url, output_path).await
    }

    async fn remove_artifact(&self, path: &Path) {
        match fs::remove_file(path).await {
            Ok(()) => debug!("Removed {}", path.display()),
            Err(e) => warn!("Failed to remove {}: {}", path.display(), e),
        }
    }

    fn progress_bar(&self) -> ProgressBar {
        if !self.progress {
            return ProgressBar::hidden();
        }

        let pb = ProgressBar::new(0);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{msg} {bar:40} {pos}/{len}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=>-"),
        );
        pb.set_message("Overall");
        pb
    }

    /// Starts one task per URL as soon as its line is read and waits for all
    /// of them. A read error stops reading but not the tasks already running.
    pub async fn download_all<I>(&self, urls: I) -> RunSummary
    where
        I: IntoIterator<Item = io::Result<String>>,
    {
        let semaphore = self
            .jobs
            .filter(|&n| n > 0)
            .map(|n| Arc::new(Semaphore::new(n.min(Semaphore::MAX_PERMITS))));
        let overall_pb = self.progress_bar();

        let mut handles = Vec::new();
        let mut started = Vec::new();
        let mut input_error = None;

        for line in urls {
            let url = match line {
                Ok(url) => url,
                Err(e) => {
                    error!("Error reading input file: {}", e);
                    input_error = Some(e.to_string());
                    break;
                }
            };

            let downloader = self.clone();
            let semaphore = semaphore.clone();
            let overall_pb = overall_pb.clone();
            overall_pb.inc_length(1);
            started.push(url.clone());

            let handle = task::spawn(async move {
                // Closed semaphores never happen here; run ungated if one does.
                let _permit = match semaphore {
                    Some(semaphore) => semaphore.acquire_owned().await.ok(),
                    None => None,
                };

                let report = downloader.fetch(url).await;
                overall_pb.inc(1);
                report
            });

            handles.push(handle);
        }

        let reports: Vec<FetchReport> = join_all(handles)
            .await
            .into_iter()
            .zip(started)
            .map(|(joined, url)| match joined {
                Ok(report) => report,
                Err(e) => {
                    let err = FetchError::Task {
                        url: url.clone(),
                        message: e.to_string(),
                    };
                    error!("{}", err);
                    FetchReport {
                        url,
                        result: Err(err),
                    }
                }
            })
            .collect();

        overall_pb.finish_and_clear();

        let summary = RunSummary {
            reports,
            input_error,
        };
        info!(
            "done: {} downloaded, {} failed",
            summary.succeeded(),
            summary.failed()
        );

        summary
    }
}

/// Copies the response body into `file` chunk by chunk, then flushes it.
async fn write_body<W>(
    response: &mut Response,
    file: &mut W,
    url: &str,
    output_path: &Path,
) -> Result<u64, FetchError>
where
    W: AsyncWrite + Unpin,
{
    let mut written = 0u64;

    while let Some(chunk) = response
        .chunk()
        .await
        .map_err(|source| FetchError::Interrupted {
            url: url.to_string(),
            source,
        })?
    {
        file.write_all(&chunk)
            .await
            .map_err(|source| write_error(output_path, source))?;
        written += chunk.len() as u64;
    }

    file.flush()
        .await
        .map_err(|source| write_error(output_path, source))?;

    Ok(written)
}

/// URL list reader. Lines are split on `\n` with a trailing `\r` dropped;
/// bytes that are not UTF-8 are replaced so the line still reaches a worker.
/// Only I/O errors of the underlying reader are returned as errors.
#[derive(Debug)]
pub struct UrlLines<R> {
    inner: Split<R>,
}

impl<R: BufRead> UrlLines<R> {
    pub fn new(reader: R) -> Self {
        Self {
            inner: reader.split(b'\n'),
        }
    }
}

impl<R: BufRead> Iterator for UrlLines<R> {
    type Item = io::Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|line| {
            line.map(|mut bytes| {
                if bytes.last() == Some(&b'\r') {
                    bytes.pop();
                }
                String::from_utf8_lossy(&bytes).into_owned()
            })
        })
    }
}

fn write_error(path: &Path, source: io::Error) -> FetchError {
    FetchError::Write {
        path: path.to_path_buf(),
        source,
    }
}
