use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::fmt;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::checkpoint::{CheckpointStore, SnapshotLabel, SnapshotLocation};
use crate::client::ContentClient;
use crate::config::GenerationConfig;
use crate::error::SeoError;
use crate::pairing::{Item, PairingResult};
use crate::parser::{parse_response, ParseOutcome};
use crate::record::{GeneratedRecord, Language, ResultSet};

/// Knobs that drive one orchestrator run
#[derive(Debug, Clone)]
pub struct GenerationSettings {
    pub force_reprocess: bool,
    pub reprocess_degraded: bool,
    pub max_items: Option<usize>,
    pub checkpoint_interval: usize,
    pub language_delay: Duration,
    pub item_delay: Duration,
    pub show_progress: bool,
}

impl From<&GenerationConfig> for GenerationSettings {
    fn from(config: &GenerationConfig) -> Self {
        Self {
            force_reprocess: config.force_reprocess,
            reprocess_degraded: config.reprocess_degraded,
            max_items: config.max_items,
            checkpoint_interval: config.checkpoint_interval.max(1),
            language_delay: config.language_delay(),
            item_delay: config.item_delay(),
            show_progress: config.show_progress,
        }
    }
}

/// Counters for one run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunStatistics {
    pub total_media: usize,
    pub total_transcripts: usize,
    pub matched_pairs: usize,
    pub unmatched_media: usize,
    pub unmatched_transcripts: usize,
    pub processed: usize,
    pub skipped: usize,
    pub failed: usize,
    /// Committed language records whose response could not be parsed
    pub degraded: usize,
    pub api_calls: usize,
}

/// How a run ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum Termination {
    Completed,
    Interrupted,
    Aborted(String),
}

impl fmt::Display for Termination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Completed => f.write_str("completed"),
            Self::Interrupted => f.write_str("interrupted"),
            Self::Aborted(reason) => write!(f, "aborted: {}", reason),
        }
    }
}

/// Everything a finished run leaves behind
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub statistics: RunStatistics,
    pub termination: Termination,
    pub final_snapshot: Option<SnapshotLocation>,
    pub results: ResultSet,
}

/// Generated record for one language of an item, not yet committed
#[derive(Debug, Clone)]
struct LanguageResult {
    language: Language,
    record: GeneratedRecord,
    degraded: bool,
}

/// Terminal state of an item
#[derive(Debug)]
enum ItemOutcome {
    Skipped,
    Complete(Vec<LanguageResult>),
    Failed(SeoError),
}

/// Per-item state machine: Pending -> Generating(lang_0..lang_n) -> Done
#[derive(Debug)]
enum ItemState {
    Pending,
    Generating {
        next: usize,
        content: String,
        completed: Vec<LanguageResult>,
    },
    Done(ItemOutcome),
}

/// Resolves once a shutdown has been requested; never resolves if the sender is gone
async fn wait_for_shutdown(shutdown: &mut watch::Receiver<bool>) {
    loop {
        if *shutdown.borrow_and_update() {
            return;
        }
        if shutdown.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

/// Drives items through generation and owns the in-memory result stores
pub struct GenerationOrchestrator {
    client: Box<dyn ContentClient>,
    checkpoints: CheckpointStore,
    settings: GenerationSettings,
    results: ResultSet,
    statistics: RunStatistics,
}

impl GenerationOrchestrator {
    pub fn new(
        client: Box<dyn ContentClient>,
        checkpoints: CheckpointStore,
        settings: GenerationSettings,
        results: ResultSet,
    ) -> Self {
        Self {
            client,
            checkpoints,
            settings,
            results,
            statistics: RunStatistics::default(),
        }
    }

    fn should_skip(&self, item: &Item) -> bool {
        if self.settings.force_reprocess {
            return false;
        }
        let languages = &item.languages_required;
        if !self.results.contains_all(&item.identifier, languages) {
            return false;
        }
        if self.settings.reprocess_degraded && self.results.any_degraded(&item.identifier, languages) {
            debug!("Reprocessing degraded entry: {}", item.identifier);
            return false;
        }
        true
    }

    /// Perform one transition of the item state machine
    async fn advance(&self, item: &Item, state: ItemState, api_calls: &mut usize) -> ItemState {
        match state {
            ItemState::Pending => {
                if self.should_skip(item) {
                    return ItemState::Done(ItemOutcome::Skipped);
                }
                let source_error = |message: String| {
                    ItemState::Done(ItemOutcome::Failed(SeoError::SourceRead {
                        identifier: item.identifier.clone(),
                        message,
                    }))
                };
                match tokio::fs::read_to_string(&item.primary_content_path).await {
                    Err(e) => source_error(format!("{}: {}", item.primary_content_path.display(), e)),
                    Ok(content) if content.trim().is_empty() => {
                        source_error(format!("{} is empty", item.primary_content_path.display()))
                    }
                    Ok(content) => ItemState::Generating {
                        next: 0,
                        content,
                        completed: Vec::new(),
                    },
                }
            }
            ItemState::Generating {
                next,
                content,
                mut completed,
            } => {
                let Some(&language) = item.languages_required.get(next) else {
                    return ItemState::Done(ItemOutcome::Complete(completed));
                };
                if next > 0 {
                    tokio::time::sleep(self.settings.language_delay).await;
                }

                info!("Generating {} content for {}", language, item.identifier);
                *api_calls += 1;
                let raw = match self.client.generate(&item.identifier, &content, language).await {
                    Ok(raw) => raw,
                    Err(e) => return ItemState::Done(ItemOutcome::Failed(e)),
                };

                let outcome = parse_response(&raw);
                let degraded = outcome.is_degraded();
                if let ParseOutcome::Degraded { reason, .. } = &outcome {
                    warn!(
                        "Could not parse {} response for {}, storing empty record: {}",
                        language, item.identifier, reason
                    );
                }
                completed.push(LanguageResult {
                    language,
                    record: outcome.into_record(),
                    degraded,
                });

                if next + 1 < item.languages_required.len() {
                    ItemState::Generating {
                        next: next + 1,
                        content,
                        completed,
                    }
                } else {
                    ItemState::Done(ItemOutcome::Complete(completed))
                }
            }
            done @ ItemState::Done(_) => done,
        }
    }

    /// Run the state machine for one item until it reaches a terminal state
    async fn drive_item(&self, item: &Item, api_calls: &mut usize) -> ItemOutcome {
        let mut state = ItemState::Pending;
        loop {
            state = match state {
                ItemState::Done(outcome) => return outcome,
                other => self.advance(item, other, api_calls).await,
            };
        }
    }

    /// Store every language record of a completed item
    fn commit(&mut self, identifier: &str, results: Vec<LanguageResult>) {
        for result in results {
            if result.degraded {
                self.statistics.degraded += 1;
            }
            self.results
                .store_mut(result.language)
                .insert(identifier.to_string(), result.record);
        }
    }

    fn save_intermediate(&self) {
        match self.checkpoints.save(&self.results, SnapshotLabel::Intermediate) {
            Ok(_) => info!(
                "Saved intermediate results: {} items processed",
                self.statistics.processed
            ),
            Err(e) => error!("Failed to save intermediate results: {}", e),
        }
    }

    fn progress_bar(&self, total: usize) -> ProgressBar {
        if !self.settings.show_progress {
            return ProgressBar::hidden();
        }
        let pb = ProgressBar::new(total as u64);
        if let Ok(style) =
            ProgressStyle::default_bar().template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
        {
            pb.set_style(style.progress_chars("#>-"));
        }
        pb
    }

    /// Process every matched item in order, then flush a final snapshot.
    ///
    /// The final flush happens whether the run completes, is interrupted through
    /// `shutdown`, or is aborted by a fatal error.
    pub async fn run(mut self, pairing: PairingResult, mut shutdown: watch::Receiver<bool>) -> RunOutcome {
        self.statistics.total_media = pairing.total_media;
        self.statistics.total_transcripts = pairing.total_transcripts;
        self.statistics.matched_pairs = pairing.items.len();
        self.statistics.unmatched_media = pairing.unmatched_media.len();
        self.statistics.unmatched_transcripts = pairing.unmatched_transcripts.len();

        let mut items = pairing.items;
        if let Some(max) = self.settings.max_items {
            if items.len() > max {
                info!("Limiting run to {} of {} items", max, items.len());
                items.truncate(max);
            }
        }

        let total = items.len();
        info!("Processing {} items", total);
        let pb = self.progress_bar(total);
        let mut termination = Termination::Completed;

        for (idx, item) in items.iter().enumerate() {
            if *shutdown.borrow() {
                termination = Termination::Interrupted;
                break;
            }
            pb.set_message(item.identifier.clone());
            info!("[{}/{}] Processing {}", idx + 1, total, item.identifier);

            let mut calls = 0;
            let outcome = tokio::select! {
                biased;
                _ = wait_for_shutdown(&mut shutdown) => None,
                outcome = self.drive_item(item, &mut calls) => Some(outcome),
            };
            self.statistics.api_calls += calls;

            let Some(outcome) = outcome else {
                warn!("Interrupted while processing {}, discarding its partial results", item.identifier);
                termination = Termination::Interrupted;
                break;
            };

            match outcome {
                ItemOutcome::Skipped => {
                    info!("Skipping already processed item: {}", item.identifier);
                    self.statistics.skipped += 1;
                }
                ItemOutcome::Complete(results) => {
                    self.commit(&item.identifier, results);
                    self.statistics.processed += 1;
                    info!(
                        "Processed {} ({}/{})",
                        item.identifier, self.statistics.processed, self.statistics.matched_pairs
                    );
                    if self.statistics.processed % self.settings.checkpoint_interval == 0 {
                        self.save_intermediate();
                    }
                }
                ItemOutcome::Failed(e) => {
                    error!("Failed to process {}: {}", item.identifier, e);
                    self.statistics.failed += 1;
                    if e.is_fatal() {
                        termination = Termination::Aborted(e.to_string());
                        break;
                    }
                }
            }
            pb.inc(1);

            if calls > 0 && idx + 1 < total {
                let interrupted = tokio::select! {
                    biased;
                    _ = wait_for_shutdown(&mut shutdown) => true,
                    _ = tokio::time::sleep(self.settings.item_delay) => false,
                };
                if interrupted {
                    termination = Termination::Interrupted;
                    break;
                }
            }
        }
        pb.finish_and_clear();

        if termination == Termination::Interrupted {
            warn!("Run interrupted, flushing results collected so far");
        }

        let final_snapshot = match self.checkpoints.save(&self.results, SnapshotLabel::Final) {
            Ok(location) => {
                for (language, path) in &location.files {
                    info!("Saved {} results: {}", language, path.display());
                }
                Some(location)
            }
            Err(e) => {
                error!("Failed to save final results: {}", e);
                if termination == Termination::Completed {
                    termination = Termination::Aborted(format!("final checkpoint failed: {}", e));
                }
                None
            }
        };

        RunOutcome {
            statistics: self.statistics,
            termination,
            final_snapshot,
            results: self.results,
        }
    }
}
