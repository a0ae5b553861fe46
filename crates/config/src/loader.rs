use std::{
    path::{Path, PathBuf},
    sync::{Mutex, PoisonError},
};

use tracing::{debug, warn};

use crate::{env_subst::substitute_env, schema::ParlorConfig};

/// Standard config file names, checked in order.
const CONFIG_FILENAMES: &[&str] = &["parlor.toml", "parlor.yaml", "parlor.yml", "parlor.json"];

/// Override for the config directory, set via `set_config_dir()`.
static CONFIG_DIR_OVERRIDE: Mutex<Option<PathBuf>> = Mutex::new(None);

/// Set a custom config directory. When set, discovery only looks in this
/// directory and the default file is written there.
pub fn set_config_dir(path: PathBuf) {
    *CONFIG_DIR_OVERRIDE
        .lock()
        .unwrap_or_else(PoisonError::into_inner) = Some(path);
}

/// Clear the config directory override, restoring default discovery.
pub fn clear_config_dir() {
    *CONFIG_DIR_OVERRIDE
        .lock()
        .unwrap_or_else(PoisonError::into_inner) = None;
}

fn config_dir_override() -> Option<PathBuf> {
    CONFIG_DIR_OVERRIDE
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .clone()
}

/// Load config from the given path (any supported format).
pub fn load_config(path: &Path) -> anyhow::Result<ParlorConfig> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("failed to read {}: {e}", path.display()))?;
    let raw = substitute_env(&raw);
    let mut config = parse_config(&raw, path)?;
    apply_env_overrides(&mut config, |k| std::env::var(k).ok());
    Ok(config)
}

/// Discover and load config from standard locations.
///
/// Search order:
/// 1. `./parlor.{toml,yaml,yml,json}` (project-local)
/// 2. `~/.config/parlor/parlor.{toml,yaml,yml,json}` (user-global)
///
/// Falls back to `ParlorConfig::default()` (plus env overrides) when nothing
/// is found or the file does not parse.
pub fn discover_and_load() -> ParlorConfig {
    let Some(path) = find_config_file() else {
        debug!("no config file found, writing default config");
        let mut config = ParlorConfig::default();
        if let Err(e) = write_default_config(&config) {
            warn!(error = %e, "failed to write default config file");
        }
        apply_env_overrides(&mut config, |k| std::env::var(k).ok());
        return config;
    };

    debug!(path = %path.display(), "loading config");
    match load_config(&path) {
        Ok(cfg) => cfg,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "failed to load config, using defaults");
            let mut config = ParlorConfig::default();
            apply_env_overrides(&mut config, |k| std::env::var(k).ok());
            config
        },
    }
}

/// Apply `PARLOR_*` overrides on top of a parsed config.
///
/// `PARLOR_HOST_URL` replaces the server base URL and
/// `PARLOR_RENEW_THRESHOLD_SECS` the renewal threshold (ignored unless it
/// parses as an integer).
pub fn apply_env_overrides(config: &mut ParlorConfig, env: impl Fn(&str) -> Option<String>) {
    if let Some(url) = env("PARLOR_HOST_URL").filter(|u| !u.trim().is_empty()) {
        config.server.base_url = url.trim().to_string();
    }
    if let Some(raw) = env("PARLOR_RENEW_THRESHOLD_SECS") {
        match raw.trim().parse() {
            Ok(secs) => config.auth.renew_threshold_secs = secs,
            Err(_) => warn!(value = %raw, "ignoring non-numeric PARLOR_RENEW_THRESHOLD_SECS"),
        }
    }
}

/// Find the first config file in standard locations.
///
/// When a config dir override is set, only that directory is searched.
fn find_config_file() -> Option<PathBuf> {
    if let Some(dir) = config_dir_override() {
        return CONFIG_FILENAMES
            .iter()
            .map(|name| dir.join(name))
            .find(|p| p.exists());
    }

    if let Some(p) = CONFIG_FILENAMES
        .iter()
        .map(PathBuf::from)
        .find(|p| p.exists())
    {
        return Some(p);
    }

    let dir = home_dir()?.join(".config").join("parlor");
    CONFIG_FILENAMES
        .iter()
        .map(|name| dir.join(name))
        .find(|p| p.exists())
}

/// Returns the config directory: override, or `~/.config/parlor/`.
pub fn config_dir() -> Option<PathBuf> {
    if let Some(dir) = config_dir_override() {
        return Some(dir);
    }
    home_dir().map(|h| h.join(".config").join("parlor"))
}

/// Returns the data directory: `~/.parlor/`.
pub fn data_dir() -> PathBuf {
    home_dir()
        .map(|h| h.join(".parlor"))
        .unwrap_or_else(|| PathBuf::from(".parlor"))
}

fn home_dir() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| d.home_dir().to_path_buf())
}

fn find_or_default_config_path() -> PathBuf {
    if let Some(path) = find_config_file() {
        return path;
    }
    config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("parlor.toml")
}

/// Write the default config file. Only called when no config file exists yet.
fn write_default_config(config: &ParlorConfig) -> anyhow::Result<()> {
    let path = find_or_default_config_path();
    if path.exists() {
        return Ok(());
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str =
        toml::to_string_pretty(config).map_err(|e| anyhow::anyhow!("serialize config: {e}"))?;
    std::fs::write(&path, &toml_str)?;
    debug!(path = %path.display(), "wrote default config file");
    Ok(())
}

fn parse_config(raw: &str, path: &Path) -> anyhow::Result<ParlorConfig> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");

    match ext {
        "toml" => Ok(toml::from_str(raw)?),
        "yaml" | "yml" => Ok(serde_yaml::from_str(raw)?),
        "json" => Ok(serde_json::from_str(raw)?),
        _ => anyhow::bail!("unsupported config format: .{ext}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_yaml_and_json() {
        let dir = tempfile::tempdir().unwrap();

        let yaml = dir.path().join("parlor.yaml");
        std::fs::write(&yaml, "server:\n  base_url: http://yaml.local\n").unwrap();
        assert_eq!(load_config(&yaml).unwrap().server.base_url, "http://yaml.local");

        let json = dir.path().join("parlor.json");
        std::fs::write(&json, r#"{"auth":{"login_path":"/signin"}}"#).unwrap();
        let cfg = load_config(&json).unwrap();
        assert_eq!(cfg.auth.login_path, "/signin");
        assert_eq!(cfg.auth.renew_path, "/user/renew-token");
    }

    #[test]
    fn rejects_unknown_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("parlor.ini");
        std::fs::write(&path, "x=1").unwrap();
        assert!(load_config(&path).is_err());
    }

    #[test]
    fn env_overrides_apply() {
        let mut cfg = ParlorConfig::default();
        apply_env_overrides(&mut cfg, |k| match k {
            "PARLOR_HOST_URL" => Some(" https://chat.example ".into()),
            "PARLOR_RENEW_THRESHOLD_SECS" => Some("30".into()),
            _ => None,
        });
        assert_eq!(cfg.server.base_url, "https://chat.example");
        assert_eq!(cfg.auth.renew_threshold_secs, 30);
    }

    #[test]
    fn bad_threshold_override_is_ignored() {
        let mut cfg = ParlorConfig::default();
        apply_env_overrides(&mut cfg, |k| {
            (k == "PARLOR_RENEW_THRESHOLD_SECS").then(|| "soon".to_string())
        });
        assert_eq!(cfg.auth.renew_threshold_secs, 180);
    }

    // Single test touching the global override so parallel tests cannot race it.
    #[test]
    fn override_dir_discovery_and_default_file() {
        let dir = tempfile::tempdir().unwrap();
        set_config_dir(dir.path().to_path_buf());

        // Nothing there yet: defaults are returned and written out.
        let cfg = discover_and_load();
        assert_eq!(cfg.auth.renew_threshold_secs, 180);
        assert!(dir.path().join("parlor.toml").exists());

        // An existing file is read, not overwritten.
        std::fs::write(
            dir.path().join("parlor.toml"),
            "[server]\nbase_url = \"http://edited.local\"\n",
        )
        .unwrap();
        assert_eq!(discover_and_load().server.base_url, "http://edited.local");

        clear_config_dir();
    }
}
