use crate::models::RunSummary;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportEntry {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bytes: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunReport {
    pub succeeded: usize,
    pub failed: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_error: Option<String>,
    pub entries: Vec<ReportEntry>,
}

impl From<&RunSummary> for RunReport {
    fn from(summary: &RunSummary) -> Self {
        let entries = summary
            .reports
            .iter()
            .map(|report| match &report.result {
                Ok(done) => ReportEntry {
                    url: report.url.clone(),
                    path: Some(done.path.clone()),
                    bytes: Some(done.bytes),
                    error_kind: None,
                    error: None,
                },
                Err(e) => ReportEntry {
                    url: report.url.clone(),
                    path: None,
                    bytes: None,
                    error_kind: Some(e.kind().to_string()),
                    error: Some(e.to_string()),
                },
            })
            .collect();

        Self {
            succeeded: summary.succeeded(),
            failed: summary.failed(),
            input_error: summary.input_error.clone(),
            entries,
        }
    }
}

pub struct ReportWriter {
    report_file: PathBuf,
}

impl ReportWriter {
    pub fn new(report_file: &Path) -> Self {
        Self {
            report_file: report_file.to_path_buf(),
        }
    }

    pub fn save(&self, summary: &RunSummary) -> Result<()> {
        let content = serde_json::to_string_pretty(&RunReport::from(summary))
            .context("Failed to serialize run report")?;

        fs::write(&self.report_file, content).with_context(|| {
            format!("Failed to write run report {}", self.report_file.display())
        })?;

        Ok(())
    }

    pub fn load(&self) -> Result<RunReport> {
        let content =
            fs::read_to_string(&self.report_file).context("Failed to read run report")?;

        serde_json::from_str(&content).context("Failed to parse run report")
    }
}
