use chrono::Local;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::{debug, info, warn};

use crate::error::{Result, SeoError};
use crate::record::{Language, ResultSet, ResultStore};

/// Kind of snapshot being written
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotLabel {
    /// Periodic snapshot taken during a run
    Intermediate,
    /// Snapshot taken when a run ends, however it ends
    Final,
}

impl SnapshotLabel {
    fn suffix(&self) -> &'static str {
        match self {
            Self::Intermediate => "_temp",
            Self::Final => "",
        }
    }
}

/// Where one snapshot was written, per language
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SnapshotLocation {
    pub files: Vec<(Language, PathBuf)>,
}

impl SnapshotLocation {
    pub fn path(&self, language: Language) -> Option<&Path> {
        self.files
            .iter()
            .find(|(lang, _)| *lang == language)
            .map(|(_, path)| path.as_path())
    }
}

/// Durable, append-only store of result snapshots
///
/// Files are named `{lang}_{prefix}_seo_results_{timestamp}[_temp].json`.
/// Existing files are never overwritten; the newest file per language wins on load.
#[derive(Debug, Clone)]
pub struct CheckpointStore {
    dir: PathBuf,
    prefix: String,
}

impl CheckpointStore {
    pub fn new<P: AsRef<Path>>(dir: P, prefix: &str) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
            prefix: prefix.to_string(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn file_stem_prefix(&self, language: Language) -> String {
        format!("{}_{}_seo_results_", language.tag(), self.prefix)
    }

    /// All snapshot files for a language with their modification times
    fn candidates(&self, language: Language) -> Vec<(SystemTime, PathBuf)> {
        let prefix = self.file_stem_prefix(language);
        let Ok(entries) = fs::read_dir(&self.dir) else {
            return Vec::new();
        };

        entries
            .filter_map(|entry| entry.ok())
            .filter(|entry| {
                let name = entry.file_name();
                let name = name.to_string_lossy();
                name.starts_with(&prefix) && name.ends_with(".json")
            })
            .filter_map(|entry| {
                let modified = entry.metadata().and_then(|m| m.modified()).ok()?;
                Some((modified, entry.path()))
            })
            .collect()
    }

    fn load_language(&self, language: Language) -> ResultStore {
        let latest = self
            .candidates(language)
            .into_iter()
            .max_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(&b.1)));

        let Some((_, path)) = latest else {
            debug!("No existing {} results in {}", language, self.dir.display());
            return ResultStore::new();
        };

        let loaded = fs::read_to_string(&path)
            .map_err(SeoError::from)
            .and_then(|content| serde_json::from_str::<ResultStore>(&content).map_err(SeoError::from));

        match loaded {
            Ok(store) => {
                info!(
                    "Loaded existing {} results: {} ({} entries)",
                    language,
                    path.display(),
                    store.len()
                );
                store
            }
            Err(e) => {
                warn!(
                    "Ignoring unreadable {} snapshot {}: {}",
                    language,
                    path.display(),
                    e
                );
                ResultStore::new()
            }
        }
    }

    /// Load the most recent snapshot for every language; missing or corrupt files yield empty stores
    pub fn load_latest(&self, languages: &[Language]) -> ResultSet {
        languages
            .iter()
            .fold(ResultSet::new(languages), |set, &language| {
                set.with_store(language, self.load_language(language))
            })
    }

    /// Pick a file name that does not exist yet
    fn unused_path(&self, base: &str) -> PathBuf {
        let mut path = self.dir.join(format!("{}.json", base));
        let mut counter = 1;
        while path.exists() {
            path = self.dir.join(format!("{}_{}.json", base, counter));
            counter += 1;
        }
        path
    }

    /// Write a new snapshot of every store in the set
    pub fn save(&self, results: &ResultSet, label: SnapshotLabel) -> Result<SnapshotLocation> {
        fs::create_dir_all(&self.dir).map_err(|e| {
            SeoError::Checkpoint(format!("Cannot create {}: {}", self.dir.display(), e))
        })?;

        let timestamp = Local::now().format("%Y%m%d_%H%M%S_%3f").to_string();
        let mut location = SnapshotLocation::default();

        for (language, store) in results.iter() {
            let base = format!(
                "{}{}{}",
                self.file_stem_prefix(language),
                timestamp,
                label.suffix()
            );
            let path = self.unused_path(&base);
            let content = serde_json::to_string_pretty(store)?;
            fs::write(&path, content).map_err(|e| {
                SeoError::Checkpoint(format!("Failed to write {}: {}", path.display(), e))
            })?;
            debug!("Wrote {} entries to {}", store.len(), path.display());
            location.files.push((language, path));
        }

        Ok(location)
    }
}
