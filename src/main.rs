//! Batch pre-scan tool: warm the cache for a session folder and,
//! optionally, print label suggestions against a reference folder.
//!
//! Usage: `woodshed <session-dir> [reference-dir]`

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use tracing_subscriber::EnvFilter;

use woodshed::config::Settings;
use woodshed::engine::{CacheEngine, Readiness};
use woodshed::identity::AudioIdentity;
use woodshed::jobs::{EngineEvent, JobHandle, JobState};
use woodshed::library::{self, Recording};
use woodshed::matcher::Confidence;
use woodshed::{ProductSet, WaitOutcome};

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run() {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let mut args = std::env::args().skip(1);
    let Some(session_dir) = args.next() else {
        eprintln!("usage: woodshed <session-dir> [reference-dir]");
        std::process::exit(2);
    };
    let reference_dir = args.next();

    let settings = Settings::load()?;
    settings.validate().map_err(std::io::Error::other)?;

    let engine = CacheEngine::new(settings.clone())?;

    let recordings = library::scan(Path::new(&session_dir), &settings.library);
    if recordings.is_empty() {
        println!("no recordings found under {session_dir}");
        return Ok(());
    }
    println!("{} recordings in {session_dir}", recordings.len());

    let identities: Vec<AudioIdentity> =
        recordings.iter().map(|r| r.identity.clone()).collect();
    let pending = warm_cache(&engine, &identities)?;
    drain_progress(&engine, pending);

    // Reclaim entries for files that no longer exist.
    let removed = engine.sweep(&library::known_paths(&recordings));
    if removed > 0 {
        println!("swept {removed} stale cache entries");
    }

    if let Some(reference_dir) = reference_dir {
        suggest_labels(
            &engine,
            &settings,
            &recordings,
            Path::new(&reference_dir),
        )?;
    }

    Ok(())
}

/// Submit everything that is not already cached; returns the pending
/// job handles.
fn warm_cache(
    engine: &CacheEngine,
    identities: &[AudioIdentity],
) -> Result<Vec<JobHandle>, Box<dyn std::error::Error>> {
    let mut pending = Vec::new();
    let mut hits = 0usize;

    for readiness in engine.ensure_all(identities, ProductSet::ALL)? {
        match readiness {
            Readiness::Ready(_) => hits += 1,
            Readiness::Pending(handle) => pending.push(handle),
        }
    }

    if hits > 0 {
        println!("{hits} already cached");
    }
    Ok(pending)
}

/// Print progress lines as the batch completes.
fn drain_progress(engine: &CacheEngine, pending: Vec<JobHandle>) {
    if pending.is_empty() {
        return;
    }

    let mut failures: Vec<(AudioIdentity, String)> = Vec::new();
    loop {
        for event in engine.poll_events() {
            match event {
                EngineEvent::Progress {
                    completed,
                    total,
                    identity,
                } => {
                    println!("  [{completed}/{total}] {}", identity.display_name());
                }
                EngineEvent::JobFinished {
                    identity,
                    outcome: JobState::Failed(reason),
                } => {
                    failures.push((identity, reason));
                }
                EngineEvent::JobFinished { .. } => {}
            }
        }

        if pending.iter().all(|h| h.state().is_terminal()) {
            break;
        }
        thread::sleep(Duration::from_millis(50));
    }

    // A final drain catches events posted after the last poll.
    for event in engine.poll_events() {
        if let EngineEvent::Progress {
            completed,
            total,
            identity,
        } = event
        {
            println!("  [{completed}/{total}] {}", identity.display_name());
        }
    }

    for (identity, reason) in &failures {
        eprintln!("failed: {}: {reason}", identity.display_name());
    }
}

/// Match each session recording against the reference folder and print
/// the best suggestion per file.
fn suggest_labels(
    engine: &CacheEngine,
    settings: &Settings,
    recordings: &[Recording],
    reference_dir: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    let reference = library::scan(reference_dir, &settings.library);
    if reference.is_empty() {
        println!("no reference recordings under {}", reference_dir.display());
        return Ok(());
    }

    let titles: HashMap<PathBuf, &str> = reference
        .iter()
        .map(|r| (r.identity.path.clone(), r.title.as_str()))
        .collect();

    let reference_ids: Vec<AudioIdentity> =
        reference.iter().map(|r| r.identity.clone()).collect();
    for id in &reference_ids {
        if let WaitOutcome::Failed { reason } =
            engine.wait_ready(id, ProductSet::fingerprint_only())?
        {
            eprintln!("reference skipped: {}: {reason}", id.display_name());
        }
    }

    println!("\nlabel suggestions:");
    for recording in recordings {
        let results = match engine.find_best_matches(&recording.identity, &reference_ids) {
            Ok(results) => results,
            Err(e) => {
                eprintln!("  {}: {e}", recording.title);
                continue;
            }
        };

        match results.first() {
            Some(best) => {
                let label = titles
                    .get(&best.identity.path)
                    .copied()
                    .unwrap_or("(unknown)");
                let band = match settings.matching.band(best.score) {
                    Confidence::High => "high",
                    Confidence::Medium => "medium",
                    Confidence::Low => "low",
                };
                println!(
                    "  {} -> {} (score {:.2}, {} confidence)",
                    recording.title, label, best.score, band
                );
            }
            None => println!("  {} -> no usable reference match", recording.title),
        }
    }

    Ok(())
}
