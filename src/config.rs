use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::data::DEFAULT_CACHE_BUST_PARAM;
use crate::tags::ALL_TAGS;

const DEFAULT_ENV_PREFIX: &str = "POSTBOARD";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Config {
    #[serde(default)]
    pub feed: FeedConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FeedConfig {
    #[serde(default)]
    pub url: String,
    #[serde(default = "default_refresh_interval", with = "humantime_serde")]
    pub refresh_interval: Duration,
    #[serde(default = "default_timeout", with = "humantime_serde")]
    pub timeout: Duration,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_cache_bust_param")]
    pub cache_bust_param: String,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            refresh_interval: default_refresh_interval(),
            timeout: default_timeout(),
            user_agent: default_user_agent(),
            cache_bust_param: default_cache_bust_param(),
        }
    }
}

fn default_refresh_interval() -> Duration {
    Duration::from_secs(30)
}

fn default_timeout() -> Duration {
    Duration::from_secs(20)
}

fn default_user_agent() -> String {
    format!("postboard/{}", crate::VERSION)
}

fn default_cache_bust_param() -> String {
    DEFAULT_CACHE_BUST_PARAM.to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OutputConfig {
    #[serde(default = "default_output_path")]
    pub path: Option<PathBuf>,
    #[serde(default = "default_initial_filter")]
    pub initial_filter: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            path: default_output_path(),
            initial_filter: default_initial_filter(),
        }
    }
}

fn default_output_path() -> Option<PathBuf> {
    dirs::cache_dir().map(|dir| dir.join("postboard").join("index.html"))
}

fn default_initial_filter() -> String {
    ALL_TAGS.to_string()
}

#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    pub config_file: Option<PathBuf>,
    pub env_prefix: Option<String>,
}

pub fn load(options: LoadOptions) -> Result<Config> {
    let mut cfg = Config::default();

    if let Some(path) = options.config_file.as_ref() {
        if path.exists() {
            let from_file = read_config_file(path)?;
            cfg = merge_config(cfg, from_file);
        }
    } else if let Some(default_path) = default_config_path() {
        if default_path.exists() {
            let from_file = read_config_file(&default_path)?;
            cfg = merge_config(cfg, from_file);
        }
    }

    let prefix = options.env_prefix.as_deref().unwrap_or(DEFAULT_ENV_PREFIX);
    apply_env(&mut cfg, prefix);

    Ok(cfg)
}

fn read_config_file(path: &Path) -> Result<Config> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file at {}", path.display()))?;
    let config: Config = serde_yaml::from_str(&data)
        .with_context(|| format!("Failed to parse config file at {}", path.display()))?;
    Ok(config)
}

/// Values in `other` that differ from the defaults win.
fn merge_config(mut base: Config, other: Config) -> Config {
    let defaults = Config::default();

    if !other.feed.url.is_empty() {
        base.feed.url = other.feed.url;
    }
    if other.feed.refresh_interval != defaults.feed.refresh_interval
        && !other.feed.refresh_interval.is_zero()
    {
        base.feed.refresh_interval = other.feed.refresh_interval;
    }
    if other.feed.timeout != defaults.feed.timeout && !other.feed.timeout.is_zero() {
        base.feed.timeout = other.feed.timeout;
    }
    if !other.feed.user_agent.is_empty() && other.feed.user_agent != defaults.feed.user_agent {
        base.feed.user_agent = other.feed.user_agent;
    }
    if !other.feed.cache_bust_param.is_empty()
        && other.feed.cache_bust_param != defaults.feed.cache_bust_param
    {
        base.feed.cache_bust_param = other.feed.cache_bust_param;
    }

    if other.output.path.is_some() && other.output.path != defaults.output.path {
        base.output.path = other.output.path;
    }
    if !other.output.initial_filter.is_empty()
        && other.output.initial_filter != defaults.output.initial_filter
    {
        base.output.initial_filter = other.output.initial_filter;
    }

    base
}

/// Environment values are applied directly, so they can also restore a
/// default that the file changed.
fn apply_env(cfg: &mut Config, prefix: &str) {
    let mut map: HashMap<String, String> = HashMap::new();
    let upper_prefix = format!("{}_", prefix.to_uppercase());

    for (key, value) in env::vars() {
        if let Some(stripped) = key.strip_prefix(&upper_prefix) {
            let normalized = stripped.to_ascii_lowercase().replace("__", ".");
            map.insert(normalized, value);
        }
    }

    for (key, value) in map {
        apply_env_value(cfg, &key, value);
    }
}

fn apply_env_value(cfg: &mut Config, key: &str, value: String) {
    match key {
        "feed.url" => cfg.feed.url = value,
        "feed.refresh_interval" => {
            if let Ok(duration) = humantime::parse_duration(&value) {
                cfg.feed.refresh_interval = duration;
            }
        }
        "feed.timeout" => {
            if let Ok(duration) = humantime::parse_duration(&value) {
                cfg.feed.timeout = duration;
            }
        }
        "feed.user_agent" => cfg.feed.user_agent = value,
        "feed.cache_bust_param" => cfg.feed.cache_bust_param = value,
        "output.path" => cfg.output.path = Some(PathBuf::from(value)),
        "output.initial_filter" => cfg.output.initial_filter = value,
        _ => {}
    }
}

fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("postboard").join("config.yaml"))
}

/// Writes a config file with `url` set, keeping any other values already
/// present at `path`.
pub fn save_feed_url(path: Option<PathBuf>, url: &str) -> Result<PathBuf> {
    let url = url.trim();
    anyhow::ensure!(!url.is_empty(), "config: feed.url is required");

    let path = if let Some(path) = path {
        path
    } else {
        default_config_path().context("config: unable to determine default config path")?
    };

    let mut cfg = if path.exists() {
        read_config_file(&path)?
    } else {
        Config::default()
    };
    cfg.feed.url = url.to_string();

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("config: failed to create directory {}", parent.display()))?;
    }

    let contents = serde_yaml::to_string(&cfg).context("config: failed to serialize config")?;
    fs::write(&path, contents)
        .with_context(|| format!("config: failed to write file {}", path.display()))?;

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn isolated(path: PathBuf, prefix: &str) -> LoadOptions {
        LoadOptions {
            config_file: Some(path),
            env_prefix: Some(prefix.to_string()),
        }
    }

    #[test]
    fn load_defaults_without_files() {
        let dir = tempdir().unwrap();
        let cfg = load(isolated(dir.path().join("missing.yaml"), "POSTBOARD_TEST_NONE")).unwrap();
        assert_eq!(cfg.feed.refresh_interval, Duration::from_secs(30));
        assert_eq!(cfg.feed.cache_bust_param, "_");
        assert_eq!(cfg.output.initial_filter, "all");
        assert!(cfg.feed.url.is_empty());
    }

    #[test]
    fn reads_yaml_with_humantime_durations() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        fs::write(
            &path,
            "feed:\n  url: https://example.com/sheet.csv\n  refresh_interval: 1m 30s\noutput:\n  initial_filter: news\n",
        )
        .unwrap();
        let cfg = load(isolated(path, "POSTBOARD_TEST_FILE")).unwrap();
        assert_eq!(cfg.feed.url, "https://example.com/sheet.csv");
        assert_eq!(cfg.feed.refresh_interval, Duration::from_secs(90));
        assert_eq!(cfg.feed.timeout, Duration::from_secs(20));
        assert_eq!(cfg.output.initial_filter, "news");
    }

    #[test]
    fn save_feed_url_creates_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("config.yaml");
        save_feed_url(Some(path.clone()), " https://example.com/a.csv ").unwrap();
        let saved = read_config_file(&path).unwrap();
        assert_eq!(saved.feed.url, "https://example.com/a.csv");
        assert!(save_feed_url(Some(path), "  ").is_err());
    }

    #[test]
    fn env_overrides() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        fs::write(&path, "feed:\n  url: https://file.example/sheet.csv\n").unwrap();

        env::set_var("POSTBOARD_TEST_ENV_FEED__REFRESH_INTERVAL", "45s");
        env::set_var("POSTBOARD_TEST_ENV_OUTPUT__PATH", "/tmp/postboard.html");
        let cfg = load(isolated(path, "POSTBOARD_TEST_ENV")).unwrap();
        env::remove_var("POSTBOARD_TEST_ENV_FEED__REFRESH_INTERVAL");
        env::remove_var("POSTBOARD_TEST_ENV_OUTPUT__PATH");

        assert_eq!(cfg.feed.refresh_interval, Duration::from_secs(45));
        assert_eq!(cfg.feed.url, "https://file.example/sheet.csv");
        assert_eq!(cfg.output.path, Some(PathBuf::from("/tmp/postboard.html")));
    }

    #[test]
    fn env_can_restore_default_over_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        fs::write(&path, "feed:\n  refresh_interval: 90s\noutput:\n  initial_filter: news\n").unwrap();

        env::set_var("POSTBOARD_TEST_RESET_FEED__REFRESH_INTERVAL", "30s");
        env::set_var("POSTBOARD_TEST_RESET_OUTPUT__INITIAL_FILTER", "all");
        let cfg = load(isolated(path, "POSTBOARD_TEST_RESET")).unwrap();
        env::remove_var("POSTBOARD_TEST_RESET_FEED__REFRESH_INTERVAL");
        env::remove_var("POSTBOARD_TEST_RESET_OUTPUT__INITIAL_FILTER");

        assert_eq!(cfg.feed.refresh_interval, Duration::from_secs(30));
        assert_eq!(cfg.output.initial_filter, "all");
    }
}
