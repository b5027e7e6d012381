//! Optimizer configuration loader and the per-invocation feature flag snapshot.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

/// File name searched for by [`OptimizerConfig::discover`].
pub const DEFAULT_CONFIG_FILE: &str = "html-optimizer.config.json";

const DEFAULT_CDN_TIMEOUT_MS: u64 = 1500;

/// Individually switchable rewrites applied by the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Feature {
    /// Master switch; every other feature is ignored while it is off.
    Optimization,
    /// Add `loading="lazy"` to images.
    LazyLoadImages,
    /// Add `defer` to non-critical external scripts.
    DeferJs,
    /// Wrap JPEG/PNG images in `<picture>` when a WebP derivative exists.
    WebpImages,
    /// Collapse whitespace and strip simple comments.
    MinifyHtml,
}

/// Snapshot of the feature switches, read once per optimized response.
///
/// Absent values deserialize as `false`, so an empty configuration is an identity transform.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct FeatureFlags {
    /// Overall switch for the optimizer.
    pub enabled: bool,
    /// Inject `loading="lazy"` into `<img>` tags.
    pub lazy_load_images: bool,
    /// Defer external scripts that are not on the critical allowlist.
    pub defer_js: bool,
    /// Offer WebP derivatives through `<picture>` elements.
    pub webp_images: bool,
    /// Minify the final markup.
    pub minify_html: bool,
}

impl FeatureFlags {
    /// Flags with the master switch and every individual pass turned on.
    pub fn all() -> Self {
        Self {
            enabled: true,
            lazy_load_images: true,
            defer_js: true,
            webp_images: true,
            minify_html: true,
        }
    }

    /// Read a single switch from the snapshot.
    pub fn is_enabled(&self, feature: Feature) -> bool {
        match feature {
            Feature::Optimization => self.enabled,
            Feature::LazyLoadImages => self.lazy_load_images,
            Feature::DeferJs => self.defer_js,
            Feature::WebpImages => self.webp_images,
            Feature::MinifyHtml => self.minify_html,
        }
    }

    /// Builder-style toggle for a single switch.
    pub fn with(mut self, feature: Feature, enabled: bool) -> Self {
        match feature {
            Feature::Optimization => self.enabled = enabled,
            Feature::LazyLoadImages => self.lazy_load_images = enabled,
            Feature::DeferJs => self.defer_js = enabled,
            Feature::WebpImages => self.webp_images = enabled,
            Feature::MinifyHtml => self.minify_html = enabled,
        }
        self
    }

    /// Returns `true` when at least one individual pass is switched on.
    pub fn any_pass_enabled(&self) -> bool {
        self.lazy_load_images || self.defer_js || self.webp_images || self.minify_html
    }
}

/// Discoverable optimizer configuration: feature flags plus derivative lookup settings.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct OptimizerConfig {
    /// Feature switches, stored flat alongside the lookup settings.
    #[serde(flatten)]
    pub flags: FeatureFlags,
    /// Local directory mirroring the CDN layout where derivatives are stored.
    pub derivatives_dir: Option<PathBuf>,
    /// Base URL of the content-delivery store holding derivatives.
    pub cdn_base_url: Option<String>,
    /// Upper bound on a single derivative lookup against the CDN.
    pub cdn_timeout_ms: Option<u64>,
}

impl OptimizerConfig {
    /// Attempt to load configuration from the provided directory.
    ///
    /// A missing or malformed file yields the default configuration, which disables every pass.
    pub fn discover(dir: &Path) -> Self {
        let candidate = dir.join(DEFAULT_CONFIG_FILE);
        if !candidate.is_file() {
            return Self::default();
        }

        match Self::from_path(&candidate) {
            Ok(config) => config,
            Err(err) => {
                log::warn!("ignoring optimizer configuration: {err:#}");
                Self::default()
            }
        }
    }

    /// Read configuration from a specific JSON file.
    pub fn from_path(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("failed to parse {}", path.display()))
    }

    /// Timeout applied to each CDN lookup.
    pub fn cdn_timeout(&self) -> Duration {
        Duration::from_millis(self.cdn_timeout_ms.unwrap_or(DEFAULT_CDN_TIMEOUT_MS))
    }
}
