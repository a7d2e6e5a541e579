use serde::Deserialize;

use crate::error::{TrackerError, TrackerResult};

/// Tracking endpoint filename appended to the base URL when no explicit
/// tracker URL is configured.
pub const DEFAULT_TRACKER_ENDPOINT: &str = "matomo.php";
/// Script filename appended to the base URL when no explicit source URL is
/// configured.
pub const DEFAULT_SCRIPT_FILE: &str = "matomo.js";

/// User-supplied tracker options. Loaded from environment variables with the
/// prefix `MATOMO__` and optional TOML files, or built in code with
/// `..Default::default()` to merge over the defaults.
///
/// The `config` crate lowercases keys, so every camelCase alias also has its
/// lowercased form.
#[derive(Debug, Clone, Deserialize)]
pub struct TrackerOptions {
    /// Matomo installation root, e.g. `https://stats.example.com`.
    #[serde(default, alias = "urlBase", alias = "urlbase")]
    pub url_base: Option<String>,
    /// Site identifier, forwarded verbatim to `setSiteId`.
    #[serde(default = "default_site_id", alias = "siteId", alias = "siteid")]
    pub site_id: serde_json::Value,
    /// Overrides `${url_base}matomo.php`.
    #[serde(default, alias = "trackerUrl", alias = "trackerurl")]
    pub tracker_url: Option<String>,
    /// Overrides `${url_base}matomo.js`.
    #[serde(default, alias = "srcUrl", alias = "srcurl")]
    pub src_url: Option<String>,
}

/// Options after validation and default resolution. Never mutated once built.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackerConfig {
    /// Base URL, normalized to end with `/`.
    pub url_base: String,
    pub site_id: serde_json::Value,
    pub tracker_url: String,
    pub src_url: String,
}

fn default_site_id() -> serde_json::Value {
    serde_json::Value::from(1)
}

impl Default for TrackerOptions {
    fn default() -> Self {
        Self {
            url_base: None,
            site_id: default_site_id(),
            tracker_url: None,
            src_url: None,
        }
    }
}

impl TrackerOptions {
    pub fn new(url_base: impl Into<String>) -> Self {
        Self {
            url_base: Some(url_base.into()),
            ..Default::default()
        }
    }

    pub fn with_site_id(mut self, site_id: impl Into<serde_json::Value>) -> Self {
        self.site_id = site_id.into();
        self
    }

    pub fn with_tracker_url(mut self, tracker_url: impl Into<String>) -> Self {
        self.tracker_url = Some(tracker_url.into());
        self
    }

    pub fn with_src_url(mut self, src_url: impl Into<String>) -> Self {
        self.src_url = Some(src_url.into());
        self
    }

    /// Load options from `MATOMO__*` environment variables.
    pub fn load() -> TrackerResult<Self> {
        let builder = config::Config::builder().add_source(env_source());
        let config = builder.build()?;
        Ok(config.try_deserialize()?)
    }

    /// Load options from an optional TOML file, overridden by `MATOMO__*`
    /// environment variables.
    pub fn load_from(path: &str) -> TrackerResult<Self> {
        let builder = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(env_source());
        let config = builder.build()?;
        Ok(config.try_deserialize()?)
    }

    /// Validate and fill in derived URLs.
    pub fn resolve(&self) -> TrackerResult<TrackerConfig> {
        let base = self
            .url_base
            .as_deref()
            .map(str::trim)
            .filter(|b| !b.is_empty())
            .ok_or_else(|| TrackerError::Configuration("urlBase is required".into()))?;

        let url_base = normalize_base(base);
        let tracker_url = self
            .tracker_url
            .clone()
            .unwrap_or_else(|| format!("{url_base}{DEFAULT_TRACKER_ENDPOINT}"));
        let src_url = self
            .src_url
            .clone()
            .unwrap_or_else(|| format!("{url_base}{DEFAULT_SCRIPT_FILE}"));

        tracing::debug!(%url_base, %tracker_url, %src_url, "tracker options resolved");

        Ok(TrackerConfig {
            url_base,
            site_id: self.site_id.clone(),
            tracker_url,
            src_url,
        })
    }
}

fn env_source() -> config::Environment {
    config::Environment::with_prefix("MATOMO")
        .separator("__")
        .try_parsing(true)
}

fn normalize_base(base: &str) -> String {
    if base.ends_with('/') {
        base.to_string()
    } else {
        format!("{base}/")
    }
}
