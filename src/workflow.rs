use tokio::sync::watch;
use tracing::{info, warn};

use crate::checkpoint::CheckpointStore;
use crate::client::{ClientFactory, ContentClient};
use crate::config::{mask_secret, Config};
use crate::error::Result;
use crate::orchestrator::{GenerationOrchestrator, GenerationSettings};
use crate::pairing::{discover, match_pairs, scan_collection};
use crate::report::{ReportBuilder, RunReport};

/// Wires discovery, generation, checkpointing and reporting together
pub struct Workflow {
    config: Config,
    api_key: String,
}

impl Workflow {
    /// Validate configuration and resolve the credential; fails before any work starts
    pub fn new(config: Config, api_key_override: Option<&str>) -> Result<Self> {
        config.validate()?;
        let api_key = config.resolve_api_key(api_key_override)?;

        info!("Model: {}", config.client.model);
        info!("Media directory: {}", config.input.media_dir.display());
        info!("Transcript directory: {}", config.input.transcript_dir.display());
        info!("Output directory: {}", config.output.dir.display());

        Ok(Self { config, api_key })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Run the pipeline against the configured collaborator, stopping on Ctrl-C
    pub async fn run(&self) -> Result<RunReport> {
        let client = ClientFactory::create_default(self.config.client.clone(), self.api_key.clone())?;
        self.run_with(client, interrupt_signal()).await
    }

    /// Run the pipeline with an explicit client and shutdown channel
    pub async fn run_with(
        &self,
        client: Box<dyn ContentClient>,
        shutdown: watch::Receiver<bool>,
    ) -> Result<RunReport> {
        let languages = &self.config.generation.languages;
        let pairing = discover(&self.config.input, languages)?;
        if pairing.items.is_empty() {
            warn!("No matching media/transcript pairs found");
        }

        let checkpoints = CheckpointStore::new(&self.config.output.dir, &self.config.output.file_prefix);
        let results = checkpoints.load_latest(languages);

        let collaborator = client.identifier().to_string();
        let settings = GenerationSettings::from(&self.config.generation);
        let outcome = GenerationOrchestrator::new(client, checkpoints, settings, results)
            .run(pairing, shutdown)
            .await;

        let report = ReportBuilder::new(&self.config, &collaborator).build(&outcome);
        if let Err(e) = report.save(&self.config.output.dir) {
            warn!("Failed to save run report: {}", e);
        }
        Ok(report)
    }
}

/// Shutdown channel flipped to `true` on the first Ctrl-C
pub fn interrupt_signal() -> watch::Receiver<bool> {
    let (tx, rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, finishing up...");
            let _ = tx.send(true);
        }
    });
    rx
}

/// Outcome of one environment check
#[derive(Debug, Clone)]
pub struct CheckItem {
    pub name: String,
    pub ok: bool,
    pub detail: String,
}

impl CheckItem {
    fn new(name: &str, ok: bool, detail: String) -> Self {
        Self {
            name: name.to_string(),
            ok,
            detail,
        }
    }
}

/// Inspect credential and input directories without calling the collaborator
pub fn check_environment(config: &Config, api_key_override: Option<&str>) -> Vec<CheckItem> {
    let mut checks = Vec::new();

    checks.push(match config.resolve_api_key(api_key_override) {
        Ok(key) => CheckItem::new("API key", true, mask_secret(&key)),
        Err(e) => CheckItem::new("API key", false, e.to_string()),
    });

    let collections = [
        ("Media directory", &config.input.media_dir, &config.input.media_extension),
        ("Transcript directory", &config.input.transcript_dir, &config.input.transcript_extension),
    ];
    let mut scanned = Vec::new();
    for (name, dir, extension) in collections {
        match scan_collection(dir, extension) {
            Ok(files) => {
                checks.push(CheckItem::new(
                    name,
                    true,
                    format!("{} ({} .{} files)", dir.display(), files.len(), extension),
                ));
                scanned.push(files);
            }
            Err(e) => checks.push(CheckItem::new(name, false, e.to_string())),
        }
    }

    if let [media, transcripts] = scanned.as_slice() {
        let pairing = match_pairs(media, transcripts, &config.generation.languages);
        checks.push(CheckItem::new(
            "Matched pairs",
            !pairing.items.is_empty(),
            format!(
                "{} matched, {} media without transcript, {} transcripts without media",
                pairing.items.len(),
                pairing.unmatched_media.len(),
                pairing.unmatched_transcripts.len()
            ),
        ));
    }

    let output_ok = !config.output.dir.exists() || config.output.dir.is_dir();
    checks.push(CheckItem::new(
        "Output directory",
        output_ok,
        config.output.dir.display().to_string(),
    ));

    checks
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SeoError;

    #[test]
    fn test_new_requires_paths_and_key() {
        let err = Workflow::new(Config::default(), Some("key")).err().unwrap();
        assert!(matches!(err, SeoError::Configuration(_)));

        let mut config = Config::default();
        config.input.media_dir = "videos".into();
        config.input.transcript_dir = "subs".into();
        config.client.api_key_env = "SEOGEN_TEST_UNSET_KEY_VARIABLE".into();
        let err = Workflow::new(config.clone(), None).err().unwrap();
        assert!(matches!(err, SeoError::Configuration(_)));
        assert!(Workflow::new(config, Some("key")).is_ok());
    }

    #[test]
    fn test_check_environment_reports_failures() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("media")).unwrap();
        std::fs::write(dir.path().join("media/a.mp4"), "").unwrap();

        let mut config = Config::default();
        config.input.media_dir = dir.path().join("media");
        config.input.transcript_dir = dir.path().join("missing");

        let checks = check_environment(&config, Some("AIzaSyA1234567890abcd"));
        let by_name = |name: &str| checks.iter().find(|c| c.name == name).unwrap().clone();

        assert!(by_name("API key").ok);
        assert_eq!(by_name("API key").detail, "AIzaSyA1...abcd");
        assert!(by_name("Media directory").ok);
        assert!(!by_name("Transcript directory").ok);
        assert!(checks.iter().all(|c| c.name != "Matched pairs"));
    }
}
