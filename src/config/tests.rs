use super::load::{default_cache_root, default_config_path, resolve_config_path};
use super::schema::*;
use crate::matcher::MatchAlgorithm;
use std::sync::{Mutex, OnceLock};

static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

fn env_lock() -> std::sync::MutexGuard<'static, ()> {
    ENV_LOCK.get_or_init(|| Mutex::new(())).lock().unwrap()
}

struct EnvGuard {
    key: &'static str,
    old: Option<std::ffi::OsString>,
}

impl EnvGuard {
    fn set(key: &'static str, val: &str) -> Self {
        let old = std::env::var_os(key);
        unsafe {
            std::env::set_var(key, val);
        }
        Self { key, old }
    }

    fn remove(key: &'static str) -> Self {
        let old = std::env::var_os(key);
        unsafe {
            std::env::remove_var(key);
        }
        Self { key, old }
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        match self.old.take() {
            Some(v) => unsafe {
                std::env::set_var(self.key, v);
            },
            None => unsafe {
                std::env::remove_var(self.key);
            },
        }
    }
}

#[test]
fn resolve_config_path_prefers_woodshed_config_path() {
    let _lock = env_lock();
    let _g1 = EnvGuard::set("WOODSHED_CONFIG_PATH", "/tmp/woodshed-test-config.toml");
    assert_eq!(
        resolve_config_path().unwrap(),
        std::path::PathBuf::from("/tmp/woodshed-test-config.toml")
    );
}

#[test]
fn default_config_path_prefers_xdg_config_home() {
    let _lock = env_lock();
    let _g1 = EnvGuard::set("XDG_CONFIG_HOME", "/tmp/xdg-config-home");
    let _g2 = EnvGuard::set("HOME", "/tmp/home-should-not-win");

    let p = default_config_path().unwrap();
    assert_eq!(
        p,
        std::path::PathBuf::from("/tmp/xdg-config-home")
            .join("woodshed")
            .join("config.toml")
    );
}

#[test]
fn default_config_path_falls_back_to_home_dot_config() {
    let _lock = env_lock();
    let _g1 = EnvGuard::remove("XDG_CONFIG_HOME");
    let _g2 = EnvGuard::set("HOME", "/tmp/home-dir");

    let p = default_config_path().unwrap();
    assert_eq!(
        p,
        std::path::PathBuf::from("/tmp/home-dir")
            .join(".config")
            .join("woodshed")
            .join("config.toml")
    );
}

#[test]
fn default_cache_root_prefers_xdg_cache_home() {
    let _lock = env_lock();
    let _g1 = EnvGuard::set("XDG_CACHE_HOME", "/tmp/xdg-cache-home");
    let _g2 = EnvGuard::set("HOME", "/tmp/home-should-not-win");

    assert_eq!(
        default_cache_root(),
        std::path::PathBuf::from("/tmp/xdg-cache-home").join("woodshed")
    );
}

#[test]
fn defaults_pass_validation() {
    let settings = Settings::default();
    assert!(settings.validate().is_ok());
    assert_eq!(settings.peaks.columns, 800);
    assert_eq!(settings.fingerprint.frame_ms, 100);
    assert_eq!(settings.fingerprint.bands, 12);
    assert!(matches!(
        settings.matching.algorithm,
        MatchAlgorithm::AlignedCosine
    ));
}

#[test]
fn validate_rejects_nonsense() {
    let mut settings = Settings::default();
    settings.workers.count = Some(0);
    assert!(settings.validate().is_err());

    let mut settings = Settings::default();
    settings.fingerprint.min_hz = 10_000.0;
    assert!(settings.validate().is_err());

    let mut settings = Settings::default();
    settings.matching.low_confidence = 0.9;
    assert!(settings.validate().is_err());

    let mut settings = Settings::default();
    settings.peaks.columns = 0;
    assert!(settings.validate().is_err());
}

#[test]
fn settings_load_from_config_file() {
    let _lock = env_lock();

    let dir = tempfile::tempdir().unwrap();
    let cfg_path = dir.path().join("config.toml");
    std::fs::write(
        &cfg_path,
        r#"
[cache]
root = "/tmp/woodshed-cache"

[workers]
count = 2

[peaks]
columns = 400

[fingerprint]
frame_ms = 50
bands = 16
min_hz = 40.0
max_hz = 12000.0

[matching]
algorithm = "band_profile"
high_confidence = 0.8
low_confidence = 0.2

[library]
extensions = ["wav"]
recursive = false
"#,
    )
    .unwrap();

    let _g1 = EnvGuard::set("WOODSHED_CONFIG_PATH", cfg_path.to_str().unwrap());
    let _g2 = EnvGuard::remove("WOODSHED__WORKERS__COUNT");

    let s = Settings::load().unwrap();
    assert_eq!(
        s.cache.root.as_deref(),
        Some(std::path::Path::new("/tmp/woodshed-cache"))
    );
    assert_eq!(s.workers.count, Some(2));
    assert_eq!(s.peaks.columns, 400);
    assert_eq!(s.fingerprint.frame_ms, 50);
    assert_eq!(s.fingerprint.bands, 16);
    assert!(matches!(s.matching.algorithm, MatchAlgorithm::BandProfile));
    assert_eq!(s.matching.high_confidence, 0.8);
    assert_eq!(s.library.extensions, vec!["wav".to_string()]);
    assert!(!s.library.recursive);
}

#[test]
fn settings_env_overrides_config_file() {
    let _lock = env_lock();

    let dir = tempfile::tempdir().unwrap();
    let cfg_path = dir.path().join("config.toml");
    std::fs::write(
        &cfg_path,
        r#"
[peaks]
columns = 400
"#,
    )
    .unwrap();

    let _g1 = EnvGuard::set("WOODSHED_CONFIG_PATH", cfg_path.to_str().unwrap());
    let _g2 = EnvGuard::set("WOODSHED__PEAKS__COLUMNS", "123");

    let s = Settings::load().unwrap();
    assert_eq!(s.peaks.columns, 123);
}

#[test]
fn confidence_bands_honor_custom_cutoffs() {
    let mut matching = MatchSettings::default();
    matching.high_confidence = 0.9;
    matching.low_confidence = 0.5;

    use crate::matcher::Confidence;
    assert_eq!(matching.band(0.95), Confidence::High);
    assert_eq!(matching.band(0.6), Confidence::Medium);
    assert_eq!(matching.band(0.2), Confidence::Low);
}
