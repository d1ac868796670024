use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::config::InputConfig;
use crate::error::{Result, SeoError};
use crate::record::Language;

/// A file in one of the input collections, indexed by its stem
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub stem: String,
    pub path: PathBuf,
}

/// One unit of work: a media asset paired with its transcript
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    pub identifier: String,
    pub media_path: PathBuf,
    /// Transcript text consumed by generation
    pub primary_content_path: PathBuf,
    pub languages_required: Vec<Language>,
}

#[derive(Debug, Clone, Default)]
pub struct PairingResult {
    pub items: Vec<Item>,
    pub total_media: usize,
    pub total_transcripts: usize,
    pub unmatched_media: Vec<String>,
    pub unmatched_transcripts: Vec<String>,
}

/// List files with the given extension directly inside `dir`, sorted by name
pub fn scan_collection(dir: &Path, extension: &str) -> Result<Vec<SourceFile>> {
    if !dir.is_dir() {
        return Err(SeoError::Discovery(format!(
            "Not a directory: {}",
            dir.display()
        )));
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1).sort_by_file_name() {
        let entry = entry.map_err(|e| {
            SeoError::Discovery(format!("Failed to enumerate {}: {}", dir.display(), e))
        })?;
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let matches = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case(extension));
        if !matches {
            continue;
        }

        if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
            files.push(SourceFile {
                stem: stem.to_string(),
                path: path.to_path_buf(),
            });
        } else {
            warn!("Skipping file with non UTF-8 name: {}", path.display());
        }
    }

    Ok(files)
}

/// Keep the first file for every stem; later files with the same stem are dropped with a warning
fn unique_stems<'a>(files: &'a [SourceFile], kind: &str) -> Vec<&'a SourceFile> {
    let mut seen = HashSet::new();
    files
        .iter()
        .filter(|file| {
            if seen.insert(file.stem.as_str()) {
                return true;
            }
            warn!(
                "Ignoring duplicate {} file for '{}': {}",
                kind,
                file.stem,
                file.path.display()
            );
            false
        })
        .collect()
}

/// Join media and transcripts on exact stem equality, keeping media order.
///
/// Identifiers are unique in the result: only the first file per stem takes part.
pub fn match_pairs(
    media: &[SourceFile],
    transcripts: &[SourceFile],
    languages: &[Language],
) -> PairingResult {
    let media = unique_stems(media, "media");
    let transcripts = unique_stems(transcripts, "transcript");
    let transcript_map: HashMap<&str, &SourceFile> =
        transcripts.iter().map(|t| (t.stem.as_str(), *t)).collect();

    let mut items = Vec::new();
    let mut unmatched_media = Vec::new();
    for file in &media {
        match transcript_map.get(file.stem.as_str()) {
            Some(transcript) => {
                debug!("Matched: {} <-> {}", file.path.display(), transcript.path.display());
                items.push(Item {
                    identifier: file.stem.clone(),
                    media_path: file.path.clone(),
                    primary_content_path: transcript.path.clone(),
                    languages_required: languages.to_vec(),
                });
            }
            None => {
                warn!("No transcript found for media file: {}", file.path.display());
                unmatched_media.push(file.stem.clone());
            }
        }
    }

    let media_stems: HashSet<&str> = media.iter().map(|m| m.stem.as_str()).collect();
    let unmatched_transcripts: Vec<String> = transcripts
        .iter()
        .filter(|t| !media_stems.contains(t.stem.as_str()))
        .map(|t| {
            warn!("No media file found for transcript: {}", t.path.display());
            t.stem.clone()
        })
        .collect();

    info!(
        "Matched {} pairs ({} media, {} transcripts)",
        items.len(),
        media.len(),
        transcripts.len()
    );

    PairingResult {
        items,
        total_media: media.len(),
        total_transcripts: transcripts.len(),
        unmatched_media,
        unmatched_transcripts,
    }
}

/// Scan both input directories and pair their files
pub fn discover(input: &InputConfig, languages: &[Language]) -> Result<PairingResult> {
    info!("Scanning media and transcript files...");
    let media = scan_collection(&input.media_dir, &input.media_extension)?;
    info!("Found {} media files in {}", media.len(), input.media_dir.display());
    let transcripts = scan_collection(&input.transcript_dir, &input.transcript_extension)?;
    info!(
        "Found {} transcript files in {}",
        transcripts.len(),
        input.transcript_dir.display()
    );

    Ok(match_pairs(&media, &transcripts, languages))
}
