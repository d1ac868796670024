use chrono::{DateTime, Local};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::info;
use uuid::Uuid;

use crate::config::Config;
use crate::error::{Result, SeoError};
use crate::orchestrator::{RunOutcome, RunStatistics, Termination};

/// Summary of one run, written next to the result files
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub processing_time: DateTime<Local>,
    pub termination: Termination,
    pub model_used: String,
    pub media_directory: PathBuf,
    pub transcript_directory: PathBuf,
    pub output_directory: PathBuf,
    pub statistics: RunStatistics,
    /// Entry count per language tag
    pub results: BTreeMap<String, usize>,
    /// Final snapshot file per language tag
    pub output_files: BTreeMap<String, PathBuf>,
}

/// Builds run reports from orchestrator outcomes; never feeds back into processing
pub struct ReportBuilder<'a> {
    config: &'a Config,
    collaborator: String,
}

impl<'a> ReportBuilder<'a> {
    pub fn new(config: &'a Config, collaborator: &str) -> Self {
        Self {
            config,
            collaborator: collaborator.to_string(),
        }
    }

    pub fn build(&self, outcome: &RunOutcome) -> RunReport {
        let results = outcome
            .results
            .iter()
            .map(|(language, store)| (language.tag().to_string(), store.len()))
            .collect();

        let output_files = outcome
            .final_snapshot
            .iter()
            .flat_map(|location| location.files.iter())
            .map(|(language, path)| (language.tag().to_string(), path.clone()))
            .collect();

        RunReport {
            run_id: Uuid::new_v4(),
            processing_time: Local::now(),
            termination: outcome.termination.clone(),
            model_used: self.collaborator.clone(),
            media_directory: self.config.input.media_dir.clone(),
            transcript_directory: self.config.input.transcript_dir.clone(),
            output_directory: self.config.output.dir.clone(),
            statistics: outcome.statistics.clone(),
            results,
            output_files,
        }
    }
}

impl RunReport {
    /// Write the report as `seo_report_{timestamp}.json` into `dir`
    pub fn save<P: AsRef<Path>>(&self, dir: P) -> Result<PathBuf> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir)?;
        let path = dir.join(format!(
            "seo_report_{}.json",
            self.processing_time.format("%Y%m%d_%H%M%S_%3f")
        ));
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(&path, content)
            .map_err(|e| SeoError::Checkpoint(format!("Failed to write report {}: {}", path.display(), e)))?;
        info!("Saved run report: {}", path.display());
        Ok(path)
    }

    /// Print a fixed-width summary table to stdout
    pub fn print_summary(&self) {
        let cwd = std::env::current_dir().unwrap_or_default();
        let display = |path: &Path| {
            pathdiff::diff_paths(path, &cwd)
                .unwrap_or_else(|| path.to_path_buf())
                .display()
                .to_string()
        };
        let stats = &self.statistics;

        println!("\n{}", "=".repeat(80));
        println!("Run summary ({})", self.termination);
        println!("{}", "=".repeat(80));
        println!("{:<24} {}", "Model:", self.model_used);
        println!("{:<24} {}", "Media directory:", display(self.media_directory.as_path()));
        println!("{:<24} {}", "Transcript directory:", display(self.transcript_directory.as_path()));
        println!("{:<24} {}", "Output directory:", display(self.output_directory.as_path()));
        println!("{}", "-".repeat(80));
        println!("{:<24} {}", "Media files found:", stats.total_media);
        println!("{:<24} {}", "Transcripts found:", stats.total_transcripts);
        println!("{:<24} {}", "Matched pairs:", stats.matched_pairs);
        println!("{:<24} {}", "Unmatched media:", stats.unmatched_media);
        println!("{:<24} {}", "Unmatched transcripts:", stats.unmatched_transcripts);
        println!("{}", "-".repeat(80));
        println!("{:<24} {}", "Processed:", stats.processed);
        println!("{:<24} {}", "Skipped:", stats.skipped);
        println!("{:<24} {}", "Failed:", stats.failed);
        println!("{:<24} {}", "Degraded records:", stats.degraded);
        println!("{:<24} {}", "API calls:", stats.api_calls);
        println!("{}", "-".repeat(80));
        for (language, count) in &self.results {
            println!("{:<24} {}", format!("{} entries:", language), count);
        }
        for (language, path) in &self.output_files {
            println!("{:<24} {}", format!("{} results file:", language), display(path.as_path()));
        }
        println!("{}", "=".repeat(80));
    }
}
