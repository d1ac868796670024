use async_trait::async_trait;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tokio::sync::watch;

use seogen::client::ContentClient;
use seogen::config::Config;
use seogen::error::{Result, SeoError};
use seogen::orchestrator::Termination;
use seogen::record::{Language, ResultStore};
use seogen::workflow::Workflow;

/// Collaborator stub answering every request with a well-formed payload
#[derive(Clone, Default)]
struct StubClient {
    calls: Arc<Mutex<Vec<(String, Language)>>>,
}

impl StubClient {
    fn calls(&self) -> Vec<(String, Language)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ContentClient for StubClient {
    fn identifier(&self) -> &str {
        "stub-model"
    }

    async fn generate(&self, identifier: &str, content: &str, language: Language) -> Result<String> {
        self.calls.lock().unwrap().push((identifier.to_string(), language));
        Ok(format!(
            "Here you go:\n```json\n{{\"title\":\"{id} {lang} A\\n{id} {lang} B\",\"description\":\"{content}\",\"keywords\":\"{id}, {lang}\",\"summary\":\"S\"}}\n```",
            id = identifier,
            lang = language,
            content = content.trim(),
        ))
    }
}

struct Fixture {
    root: tempfile::TempDir,
}

impl Fixture {
    fn new(media: &[&str], transcripts: &[&str]) -> Self {
        let root = tempfile::tempdir().unwrap();
        fs::create_dir(root.path().join("videos")).unwrap();
        fs::create_dir(root.path().join("subs")).unwrap();
        for stem in media {
            fs::write(root.path().join("videos").join(format!("{}.mp4", stem)), b"").unwrap();
        }
        for stem in transcripts {
            fs::write(
                root.path().join("subs").join(format!("{}.md", stem)),
                format!("transcript of {}\n", stem),
            )
            .unwrap();
        }
        Self { root }
    }

    fn output(&self) -> PathBuf {
        self.root.path().join("out")
    }

    fn config(&self) -> Config {
        let mut config = Config::default();
        config.input.media_dir = self.root.path().join("videos");
        config.input.transcript_dir = self.root.path().join("subs");
        config.output.dir = self.output();
        config.generation.language_delay_ms = 0;
        config.generation.item_delay_ms = 0;
        config.generation.show_progress = false;
        config
    }

    async fn run(&self, config: Config, client: &StubClient) -> Result<seogen::report::RunReport> {
        let (_tx, rx) = watch::channel(false);
        Workflow::new(config, Some("test-key"))?
            .run_with(Box::new(client.clone()), rx)
            .await
    }
}

fn newest_final(dir: &Path, tag: &str) -> PathBuf {
    fs::read_dir(dir)
        .unwrap()
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| {
            let name = p.file_name().unwrap().to_string_lossy().to_string();
            name.starts_with(&format!("{}_video_seo_results_", tag)) && !name.contains("_temp")
        })
        .max()
        .unwrap()
}

fn load_store(path: &Path) -> ResultStore {
    serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
}

#[tokio::test]
async fn end_to_end_single_match() {
    let fixture = Fixture::new(&["a", "b"], &["a", "c"]);
    let client = StubClient::default();

    let report = fixture.run(fixture.config(), &client).await.unwrap();

    assert_eq!(report.termination, Termination::Completed);
    assert_eq!(report.statistics.total_media, 2);
    assert_eq!(report.statistics.total_transcripts, 2);
    assert_eq!(report.statistics.matched_pairs, 1);
    assert_eq!(report.statistics.unmatched_media, 1);
    assert_eq!(report.statistics.unmatched_transcripts, 1);
    assert_eq!(report.statistics.processed, 1);
    assert_eq!(report.statistics.failed, 0);
    assert_eq!(report.statistics.api_calls, 2);
    assert_eq!(report.model_used, "stub-model");

    for tag in ["cn", "en"] {
        let store = load_store(&report.output_files[tag]);
        let record = store.get("a").unwrap();
        assert_eq!(record.title_variants, vec![format!("a {} A", tag), format!("a {} B", tag)]);
        assert_eq!(record.description, "transcript of a");
        assert_eq!(record.keywords, vec!["a".to_string(), tag.to_string()]);
        assert!(!store.contains("b"));
    }

    let reports = fs::read_dir(fixture.output())
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_name().to_string_lossy().starts_with("seo_report_"))
        .count();
    assert_eq!(reports, 1);
}

#[tokio::test]
async fn rerun_is_idempotent() {
    let fixture = Fixture::new(&["a", "b"], &["a", "b"]);
    let first = StubClient::default();
    fixture.run(fixture.config(), &first).await.unwrap();
    let before = fs::read(newest_final(&fixture.output(), "en")).unwrap();

    let second = StubClient::default();
    let report = fixture.run(fixture.config(), &second).await.unwrap();

    assert!(second.calls().is_empty());
    assert_eq!(report.statistics.skipped, 2);
    assert_eq!(report.statistics.api_calls, 0);
    let after = fs::read(newest_final(&fixture.output(), "en")).unwrap();
    assert_eq!(before, after);
}

#[tokio::test]
async fn resume_only_generates_remaining_items() {
    let fixture = Fixture::new(&["a", "b", "c"], &["a", "b", "c"]);

    let mut bounded = fixture.config();
    bounded.generation.max_items = Some(2);
    let first = StubClient::default();
    fixture.run(bounded, &first).await.unwrap();
    assert_eq!(first.calls().len(), 4);

    let second = StubClient::default();
    let report = fixture.run(fixture.config(), &second).await.unwrap();

    assert_eq!(
        second.calls(),
        vec![("c".to_string(), Language::Chinese), ("c".to_string(), Language::English)]
    );
    assert_eq!(report.statistics.skipped, 2);
    assert_eq!(report.statistics.processed, 1);
    assert_eq!(report.results["cn"], 3);
}

#[tokio::test]
async fn missing_input_directory_is_fatal() {
    let fixture = Fixture::new(&["a"], &["a"]);
    let mut config = fixture.config();
    config.input.media_dir = fixture.root.path().join("nowhere");
    let client = StubClient::default();

    let err = fixture.run(config, &client).await.unwrap_err();

    assert!(matches!(err, SeoError::Discovery(_)));
    assert!(client.calls().is_empty());
    assert!(!fixture.output().exists());
}
