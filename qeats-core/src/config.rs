//! Configuration types

use crate::geohash::{DEFAULT_PRECISION, MAX_PRECISION};
use crate::{ConfigError, QeatsError, QeatsResult};
use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// A time-of-day interval during which the serving radius is reduced.
/// Both ends are excluded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeakWindow {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl PeakWindow {
    pub fn new(start: NaiveTime, end: NaiveTime) -> Self {
        Self { start, end }
    }

    /// Whether `time` lies strictly inside the window.
    pub fn contains(&self, time: NaiveTime) -> bool {
        time > self.start && time < self.end
    }
}

/// Serving radius policy inputs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RadiusConfig {
    pub peak_radius_km: f64,
    pub normal_radius_km: f64,
    pub peak_windows: Vec<PeakWindow>,
}

impl Default for RadiusConfig {
    fn default() -> Self {
        Self {
            peak_radius_km: 3.0,
            normal_radius_km: 5.0,
            peak_windows: vec![
                window(8, 10),
                window(13, 14),
                window(19, 21),
            ],
        }
    }
}

fn window(start_hour: u32, end_hour: u32) -> PeakWindow {
    PeakWindow::new(
        NaiveTime::from_hms_opt(start_hour, 0, 0).unwrap_or(NaiveTime::MIN),
        NaiveTime::from_hms_opt(end_hour, 0, 0).unwrap_or(NaiveTime::MIN),
    )
}

/// Which request inputs participate in the proximity cache key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheKeyScope {
    /// Key on the origin cell only. Requests from the same cell share an
    /// entry even when their radius or time of day differ.
    #[default]
    Origin,
    /// Key on the origin cell, the radius and the hour of day.
    OriginRadiusHour,
}

/// Proximity cache settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    pub ttl_secs: u64,
    pub geohash_precision: usize,
    pub key_scope: CacheKeyScope,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            ttl_secs: 3600,
            geohash_precision: DEFAULT_PRECISION,
            key_scope: CacheKeyScope::Origin,
        }
    }
}

impl CacheSettings {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

/// Multi-criteria search settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Upper bound on a single criterion's run time.
    pub task_timeout_ms: u64,
    /// Match the attribute criterion against cuisines instead of sharing
    /// the restaurant-name lookup.
    pub match_cuisines: bool,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            task_timeout_ms: 5_000,
            match_cuisines: false,
        }
    }
}

impl SearchConfig {
    pub fn task_timeout(&self) -> Duration {
        Duration::from_millis(self.task_timeout_ms)
    }
}

/// Master configuration for the discovery engine.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    pub radius: RadiusConfig,
    pub cache: CacheSettings,
    pub search: SearchConfig,
}

impl DiscoveryConfig {
    /// Parse a TOML document. Missing sections and fields take their
    /// defaults. The result is validated.
    pub fn from_toml_str(source: &str) -> QeatsResult<Self> {
        let config: Self = toml::from_str(source).map_err(|e| ConfigError::Parse {
            reason: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Apply environment variable overrides on top of `self`.
    ///
    /// Environment variables:
    /// - `QEATS_PEAK_RADIUS_KM`
    /// - `QEATS_NORMAL_RADIUS_KM`
    /// - `QEATS_CACHE_TTL_SECS`
    /// - `QEATS_GEOHASH_PRECISION`
    /// - `QEATS_SEARCH_TIMEOUT_MS`
    /// - `QEATS_MATCH_CUISINES` (`true`/`false` in any case, or `1`/`0`)
    ///
    /// Unparseable values are ignored.
    pub fn with_env_overrides(mut self) -> Self {
        if let Some(v) = env_parse("QEATS_PEAK_RADIUS_KM") {
            self.radius.peak_radius_km = v;
        }
        if let Some(v) = env_parse("QEATS_NORMAL_RADIUS_KM") {
            self.radius.normal_radius_km = v;
        }
        if let Some(v) = env_parse("QEATS_CACHE_TTL_SECS") {
            self.cache.ttl_secs = v;
        }
        if let Some(v) = env_parse("QEATS_GEOHASH_PRECISION") {
            self.cache.geohash_precision = v;
        }
        if let Some(v) = env_parse("QEATS_SEARCH_TIMEOUT_MS") {
            self.search.task_timeout_ms = v;
        }
        if let Some(v) = std::env::var("QEATS_MATCH_CUISINES")
            .ok()
            .and_then(|s| parse_flag(&s))
        {
            self.search.match_cuisines = v;
        }
        self
    }

    /// Defaults with environment overrides applied.
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    /// Validate the configuration.
    ///
    /// Validates:
    /// - both radii are finite and positive
    /// - every peak window has `start < end`
    /// - ttl and task timeout are non-zero
    /// - geohash precision is within 1..=12
    pub fn validate(&self) -> QeatsResult<()> {
        for (field, radius) in [
            ("radius.peak_radius_km", self.radius.peak_radius_km),
            ("radius.normal_radius_km", self.radius.normal_radius_km),
        ] {
            if !radius.is_finite() || radius <= 0.0 {
                return Err(invalid(field, radius.to_string(), "radius must be positive"));
            }
        }

        for (i, w) in self.radius.peak_windows.iter().enumerate() {
            if w.start >= w.end {
                return Err(invalid(
                    &format!("radius.peak_windows[{}]", i),
                    format!("{}..{}", w.start, w.end),
                    "window start must be before its end",
                ));
            }
        }

        if self.cache.ttl_secs == 0 {
            return Err(invalid("cache.ttl_secs", "0".to_string(), "ttl must be positive"));
        }

        let precision = self.cache.geohash_precision;
        if precision == 0 || precision > MAX_PRECISION {
            return Err(invalid(
                "cache.geohash_precision",
                precision.to_string(),
                "precision must be between 1 and 12",
            ));
        }

        if self.search.task_timeout_ms == 0 {
            return Err(invalid(
                "search.task_timeout_ms",
                "0".to_string(),
                "task timeout must be positive",
            ));
        }

        Ok(())
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|s| s.parse().ok())
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim() {
        "1" => Some(true),
        "0" => Some(false),
        other => other.to_ascii_lowercase().parse().ok(),
    }
}

fn invalid(field: &str, value: String, reason: &str) -> QeatsError {
    QeatsError::Config(ConfigError::InvalidValue {
        field: field.to_string(),
        value,
        reason: reason.to_string(),
    })
}

// =============================================================================
// TESTS
// =============================================================================
