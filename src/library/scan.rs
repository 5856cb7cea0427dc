use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use lofty::file::AudioFile;
use lofty::prelude::*;
use tracing::debug;
use walkdir::WalkDir;

use crate::config::LibrarySettings;
use crate::identity::AudioIdentity;

use super::model::Recording;

fn is_audio_file(path: &Path, settings: &LibrarySettings) -> bool {
    let exts: Vec<String> = settings
        .extensions
        .iter()
        .map(|e| e.trim().trim_start_matches('.').to_ascii_lowercase())
        .filter(|e| !e.is_empty())
        .collect();

    path.extension()
        .and_then(|s| s.to_str())
        .map(|ext| {
            let ext = ext.to_ascii_lowercase();
            exts.iter().any(|e| e == &ext)
        })
        .unwrap_or(false)
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|s| s.to_str())
        .map(|name| name.starts_with('.'))
        .unwrap_or(false)
}

/// Probe tags for a display title and duration; a file lofty cannot
/// parse just keeps its stem as the title.
fn probe_title(path: &Path, default_title: String) -> (String, Option<Duration>) {
    let mut title = default_title;
    let mut duration = None;

    if let Ok(tagged) = lofty::read_from_path(path) {
        duration = Some(tagged.properties().duration());

        if let Some(tag) = tagged.primary_tag().or_else(|| tagged.first_tag()) {
            if let Some(v) = tag.title() {
                let v = v.trim();
                if !v.is_empty() {
                    title = v.to_string();
                }
            }
        }
    }

    (title, duration)
}

/// Scan `dir` for recordings, probing each file's identity fresh.
///
/// Files whose metadata cannot be read (racing deletion, permissions)
/// are skipped; the list reflects whatever was on disk at walk time.
pub fn scan(dir: &Path, settings: &LibrarySettings) -> Vec<Recording> {
    let mut recordings: Vec<Recording> = Vec::new();

    let mut walker = WalkDir::new(dir).follow_links(settings.follow_links);

    // Non-recursive = only the root directory.
    let depth_cap = if settings.recursive {
        settings.max_depth
    } else {
        Some(1)
    };
    if let Some(d) = depth_cap {
        walker = walker.max_depth(d);
    }

    for entry in walker
        .into_iter()
        .filter_entry(|e| settings.include_hidden || e.depth() == 0 || !is_hidden(e.path()))
        .filter_map(Result::ok)
    {
        let path = entry.path();
        if !path.is_file()
            || (!settings.include_hidden && is_hidden(path))
            || !is_audio_file(path, settings)
        {
            continue;
        }

        let identity = match AudioIdentity::probe(path) {
            Ok(identity) => identity,
            Err(e) => {
                debug!(path = %path.display(), error = %e, "skipping unreadable file");
                continue;
            }
        };

        let default_title = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("UNKNOWN")
            .to_string();
        let (title, duration) = probe_title(path, default_title);

        recordings.push(Recording {
            identity,
            title,
            duration,
        });
    }

    recordings.sort_by(|a, b| {
        a.title
            .to_lowercase()
            .cmp(&b.title.to_lowercase())
            .then_with(|| a.identity.path.cmp(&b.identity.path))
    });
    recordings
}

/// Collect the paths of `recordings` for a cache sweep.
pub fn known_paths(recordings: &[Recording]) -> HashSet<PathBuf> {
    recordings
        .iter()
        .map(|r| r.identity.path.clone())
        .collect()
}
