use std::{env, path::PathBuf};

use super::schema::Settings;

/// Configuration loading helpers.
///
/// `Settings::load` tries environment variables first (prefix
/// `WOODSHED__`), then an optional config file and falls back to struct
/// defaults.
impl Settings {
    /// Load settings from environment and optional config file.
    pub fn load() -> Result<Self, ::config::ConfigError> {
        let config_path = resolve_config_path();

        let mut builder = ::config::Config::builder();

        if let Some(path) = &config_path {
            builder = builder.add_source(::config::File::from(path.as_path()).required(false));
        }

        builder = builder.add_source(
            ::config::Environment::with_prefix("WOODSHED")
                .separator("__")
                .try_parsing(true),
        );

        let cfg = builder.build()?;
        let settings: Settings = cfg.try_deserialize()?;
        Ok(settings)
    }

    /// Perform basic validation checks on loaded settings.
    pub fn validate(&self) -> Result<(), String> {
        if let Some(count) = self.workers.count {
            if count == 0 {
                return Err("workers.count must be >= 1".to_string());
            }
        }
        if self.peaks.columns == 0 {
            return Err("peaks.columns must be >= 1".to_string());
        }
        if self.fingerprint.frame_ms == 0 {
            return Err("fingerprint.frame_ms must be >= 1".to_string());
        }
        if self.fingerprint.bands == 0 {
            return Err("fingerprint.bands must be >= 1".to_string());
        }
        if self.fingerprint.min_hz <= 0.0 || self.fingerprint.min_hz >= self.fingerprint.max_hz {
            return Err("fingerprint.min_hz must be positive and below max_hz".to_string());
        }
        if self.matching.low_confidence > self.matching.high_confidence {
            return Err("matching.low_confidence must not exceed high_confidence".to_string());
        }
        if self.matching.max_alignment_offsets == 0 {
            return Err("matching.max_alignment_offsets must be >= 1".to_string());
        }
        Ok(())
    }
}

/// Resolve the config path from `WOODSHED_CONFIG_PATH` or XDG defaults.
pub fn resolve_config_path() -> Option<PathBuf> {
    if let Some(p) = env::var_os("WOODSHED_CONFIG_PATH") {
        let p = PathBuf::from(p);
        return Some(p);
    }
    default_config_path()
}

/// Compute the default config path under
/// `$XDG_CONFIG_HOME/woodshed/config.toml` or
/// `~/.config/woodshed/config.toml` when `XDG_CONFIG_HOME` is not set.
pub fn default_config_path() -> Option<PathBuf> {
    let config_home = if let Some(xdg) = env::var_os("XDG_CONFIG_HOME") {
        Some(PathBuf::from(xdg))
    } else if let Some(home) = env::var_os("HOME") {
        Some(PathBuf::from(home).join(".config"))
    } else {
        None
    };

    config_home.map(|d| d.join("woodshed").join("config.toml"))
}

/// Compute the default cache root under `$XDG_CACHE_HOME/woodshed` or
/// `~/.cache/woodshed` when `XDG_CACHE_HOME` is not set, falling back to
/// a relative `.woodshed-cache` when no home is known.
pub fn default_cache_root() -> PathBuf {
    let cache_home = if let Some(xdg) = env::var_os("XDG_CACHE_HOME") {
        Some(PathBuf::from(xdg))
    } else if let Some(home) = env::var_os("HOME") {
        Some(PathBuf::from(home).join(".cache"))
    } else {
        None
    };

    match cache_home {
        Some(d) => d.join("woodshed"),
        None => PathBuf::from(".woodshed-cache"),
    }
}
