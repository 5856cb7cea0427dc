use std::fs;
use std::path::Path;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use tempfile::{TempDir, tempdir};

use super::*;
use crate::cache::{CacheStore, ProductSet};
use crate::config::FingerprintSettings;
use crate::decode::{CompressedDecoder, SampleBuffer};
use crate::error::DecodeError;
use crate::identity::AudioIdentity;
use crate::jobs::worker::WorkerContext;

fn write_wav(path: &Path, seconds: f32) {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: 8_000,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec).unwrap();
    let n = (8_000.0 * seconds) as usize;
    for i in 0..n {
        let s = ((i as f32 * 0.345).sin() * 12_000.0) as i16;
        writer.write_sample(s).unwrap();
    }
    writer.finalize().unwrap();
}

/// Backend whose decodes block until the test releases them; lets tests
/// hold workers at a known point without sleeping.
struct GateBackend {
    gate: Mutex<Receiver<()>>,
}

impl GateBackend {
    fn new() -> (Arc<Self>, Sender<()>) {
        let (tx, rx) = mpsc::channel();
        (
            Arc::new(Self {
                gate: Mutex::new(rx),
            }),
            tx,
        )
    }
}

impl CompressedDecoder for GateBackend {
    fn decode_compressed(&self, _path: &Path) -> Result<SampleBuffer, DecodeError> {
        self.gate.lock().unwrap().recv().ok();
        let samples: Vec<f32> = (0..8_000).map(|i| (i as f32 * 0.05).sin() * 0.5).collect();
        Ok(SampleBuffer {
            samples,
            channels: 1,
            sample_rate: 8_000,
        })
    }
}

struct NoBackend;

impl CompressedDecoder for NoBackend {
    fn decode_compressed(&self, path: &Path) -> Result<SampleBuffer, DecodeError> {
        Err(DecodeError::UnsupportedFormat(path.display().to_string()))
    }
}

struct Fixture {
    audio_dir: TempDir,
    _cache_dir: TempDir,
    store: Arc<CacheStore>,
    scheduler: JobScheduler,
    events: Receiver<EngineEvent>,
}

fn fixture(workers: usize, backend: Arc<dyn CompressedDecoder>) -> Fixture {
    let audio_dir = tempdir().unwrap();
    let cache_dir = tempdir().unwrap();
    let store = Arc::new(CacheStore::open(cache_dir.path()).unwrap());
    let (tx, rx) = mpsc::channel();

    let scheduler = JobScheduler::new(
        workers,
        WorkerContext {
            store: store.clone(),
            backend,
            fingerprint: FingerprintSettings::default(),
            peak_columns: 64,
        },
        tx,
    );

    Fixture {
        audio_dir,
        _cache_dir: cache_dir,
        store,
        scheduler,
        events: rx,
    }
}

fn gated_identity(fx: &Fixture, name: &str) -> AudioIdentity {
    // Non-wav extension routes through the (gated) backend.
    let path = fx.audio_dir.path().join(name);
    fs::write(&path, b"opaque").unwrap();
    AudioIdentity::probe(&path).unwrap()
}

fn wav_identity(fx: &Fixture, name: &str, seconds: f32) -> AudioIdentity {
    let path = fx.audio_dir.path().join(name);
    write_wav(&path, seconds);
    AudioIdentity::probe(&path).unwrap()
}

fn wait_for_state(handle: &JobHandle, wanted: JobState) {
    for _ in 0..500 {
        if handle.state() == wanted {
            return;
        }
        thread::sleep(Duration::from_millis(2));
    }
    panic!("job never reached {wanted:?}, stuck at {:?}", handle.state());
}

#[test]
fn completed_job_stores_the_requested_products() {
    let fx = fixture(2, Arc::new(NoBackend));
    let id = wav_identity(&fx, "take.wav", 0.5);

    let handle = fx.scheduler.submit(id.clone(), ProductSet::ALL);
    assert_eq!(handle.wait(), JobState::Done);

    let entry = fx.store.get(&id).expect("entry stored");
    assert!(entry.peaks.is_some());
    assert!(entry.fingerprint.is_some());
}

#[test]
fn resubmitting_an_in_flight_identity_returns_the_same_job() {
    let (backend, gate) = GateBackend::new();
    let fx = fixture(1, backend);
    let id = gated_identity(&fx, "take.mp3");

    let first = fx.scheduler.submit(id.clone(), ProductSet::peaks_only());
    let second = fx.scheduler.submit(id.clone(), ProductSet::fingerprint_only());
    assert!(first.same_job(&second));

    // The duplicate submission folded its products in.
    gate.send(()).unwrap();
    assert_eq!(first.wait(), JobState::Done);
    let entry = fx.store.get(&id).unwrap();
    assert!(entry.peaks.is_some());
    assert!(entry.fingerprint.is_some());
}

#[test]
fn fifty_concurrent_submissions_run_exactly_one_job() {
    let (backend, gate) = GateBackend::new();
    let fx = fixture(4, backend);
    let id = gated_identity(&fx, "take.mp3");

    let scheduler = Arc::new(fx.scheduler);
    let handles: Vec<_> = (0..50)
        .map(|_| {
            let scheduler = scheduler.clone();
            let id = id.clone();
            thread::spawn(move || scheduler.submit(id, ProductSet::ALL))
        })
        .map(|t| t.join().unwrap())
        .collect();

    gate.send(()).unwrap();
    for handle in &handles {
        assert_eq!(handle.wait(), JobState::Done);
    }
    assert!(handles.windows(2).all(|w| w[0].same_job(&w[1])));

    drop(scheduler);
    let finished = fx
        .events
        .try_iter()
        .filter(|e| matches!(e, EngineEvent::JobFinished { .. }))
        .count();
    assert_eq!(finished, 1);
}

#[test]
fn cancelling_a_queued_job_removes_it_without_running() {
    let (backend, gate) = GateBackend::new();
    let fx = fixture(1, backend);
    let running = gated_identity(&fx, "running.mp3");
    let queued = gated_identity(&fx, "queued.mp3");

    let first = fx.scheduler.submit(running, ProductSet::ALL);
    let second = fx.scheduler.submit(queued.clone(), ProductSet::ALL);

    fx.scheduler.cancel(&second);
    assert_eq!(second.wait(), JobState::Cancelled);
    assert!(fx.store.get(&queued).is_none());

    // The first job is untouched by the cancellation.
    gate.send(()).unwrap();
    assert_eq!(first.wait(), JobState::Done);
}

#[test]
fn cancelling_a_running_job_is_cooperative() {
    let (backend, gate) = GateBackend::new();
    let fx = fixture(1, backend);
    let id = gated_identity(&fx, "take.mp3");

    let handle = fx.scheduler.submit(id.clone(), ProductSet::ALL);
    wait_for_state(&handle, JobState::Running);

    fx.scheduler.cancel(&handle);
    gate.send(()).unwrap(); // decode returns, worker sees the flag

    assert_eq!(handle.wait(), JobState::Cancelled);
    assert!(fx.store.get(&id).is_none());
}

#[test]
fn a_failing_file_does_not_abort_the_rest_of_the_batch() {
    let fx = fixture(1, Arc::new(NoBackend));

    let garbage_path = fx.audio_dir.path().join("garbage.wav");
    fs::write(&garbage_path, b"not a riff at all").unwrap();
    let garbage = AudioIdentity::probe(&garbage_path).unwrap();
    let good = wav_identity(&fx, "good.wav", 0.3);

    let bad_handle = fx.scheduler.submit(garbage.clone(), ProductSet::ALL);
    let good_handle = fx.scheduler.submit(good.clone(), ProductSet::ALL);

    match bad_handle.wait() {
        JobState::Failed(reason) => assert!(!reason.is_empty()),
        other => panic!("expected Failed, got {other:?}"),
    }
    assert_eq!(good_handle.wait(), JobState::Done);
    assert!(fx.store.get(&good).is_some());
}

#[test]
fn progress_counts_up_to_the_batch_total() {
    let (backend, gate) = GateBackend::new();
    let fx = fixture(2, backend);

    let handles: Vec<_> = (0..5)
        .map(|i| {
            let id = gated_identity(&fx, &format!("take-{i}.mp3"));
            fx.scheduler.submit(id, ProductSet::ALL)
        })
        .collect();

    for _ in 0..5 {
        gate.send(()).unwrap();
    }
    for handle in &handles {
        assert_eq!(handle.wait(), JobState::Done);
    }

    let progress: Vec<(usize, usize)> = fx
        .events
        .try_iter()
        .filter_map(|e| match e {
            EngineEvent::Progress {
                completed, total, ..
            } => Some((completed, total)),
            _ => None,
        })
        .collect();

    assert_eq!(
        progress,
        vec![(1, 5), (2, 5), (3, 5), (4, 5), (5, 5)]
    );
}

#[test]
fn batch_counters_reset_once_a_batch_drains() {
    let fx = fixture(1, Arc::new(NoBackend));

    let first = wav_identity(&fx, "first.wav", 0.2);
    fx.scheduler.submit(first, ProductSet::ALL).wait();

    let second = wav_identity(&fx, "second.wav", 0.2);
    fx.scheduler.submit(second, ProductSet::ALL).wait();

    let progress: Vec<(usize, usize)> = fx
        .events
        .try_iter()
        .filter_map(|e| match e {
            EngineEvent::Progress {
                completed, total, ..
            } => Some((completed, total)),
            _ => None,
        })
        .collect();
    assert_eq!(progress, vec![(1, 1), (1, 1)]);
}

#[test]
fn in_flight_drops_to_zero_when_idle() {
    let fx = fixture(2, Arc::new(NoBackend));
    let id = wav_identity(&fx, "take.wav", 0.2);

    let handle = fx.scheduler.submit(id, ProductSet::ALL);
    handle.wait();

    // finish_job runs before the waiter wakes, but give the counter a
    // beat anyway.
    for _ in 0..100 {
        if fx.scheduler.in_flight() == 0 {
            return;
        }
        thread::sleep(Duration::from_millis(1));
    }
    panic!("in-flight table never drained");
}
