//! Declarative animation configuration
//!
//! [`AnimationConfig`] mirrors the animation attributes so an animation can
//! be described in TOML or JSON:
//!
//! ```toml
//! label = "blinker"
//! cycle = ["on", "off"]
//! cycle_count = 3
//! every = 0.25
//! ```

use crate::error::{AnimationError, Result};
use crate::value::AttrValue;
use serde::{Deserialize, Deserializer, Serialize};
use std::time::Duration;

/// Configuration for one animation
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnimationConfig {
    /// Name used in logs.
    pub label: Option<String>,
    /// Stop after this many frames.
    pub frame_count: Option<u64>,
    /// Stop after this many passes through `cycle` (ignored without a cycle).
    pub cycle_count: Option<u64>,
    /// Values handed to the frame producer in rotation.
    #[serde(deserialize_with = "deserialize_cycle")]
    pub cycle: Option<Vec<AttrValue>>,
    /// Wall-clock limit in seconds.
    pub duration_limit: Option<f64>,
    /// Pause between frames in seconds.
    #[serde(alias = "every")]
    pub frame_delay: Option<f64>,
    /// Start as soon as the content is attached.
    pub started: bool,
}

impl Default for AnimationConfig {
    fn default() -> Self {
        Self::infinite()
    }
}

/// Accept either a list or a single scalar for `cycle`
fn deserialize_cycle<'de, D>(deserializer: D) -> std::result::Result<Option<Vec<AttrValue>>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(AttrValue::deserialize(deserializer)?.into_cycle())
}

/// Convert seconds to a `Duration`, rejecting negative and non-finite input
pub(crate) fn duration_from_secs(name: &str, secs: f64) -> Result<Duration> {
    Duration::try_from_secs_f64(secs).map_err(|_| AnimationError::NegativeValue(name.to_string()))
}

impl AnimationConfig {
    /// Runs until stopped, as fast as the UI allows.
    pub fn infinite() -> Self {
        Self {
            label: None,
            frame_count: None,
            cycle_count: None,
            cycle: None,
            duration_limit: None,
            frame_delay: None,
            started: true,
        }
    }

    /// Exactly `count` frames.
    pub fn frames(count: u64) -> Self {
        Self::infinite().with_frame_count(count)
    }

    /// `count` passes through `values`.
    pub fn cycles<T: Into<AttrValue>>(values: Vec<T>, count: u64) -> Self {
        Self::infinite()
            .with_cycle(values.into_iter().map(Into::into).collect())
            .with_cycle_count(count)
    }

    /// Runs for `secs` seconds of wall-clock time.
    pub fn timed(secs: f64) -> Self {
        Self::infinite().with_duration_limit(secs)
    }

    /// Parse and validate a TOML document.
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(source).map_err(|e| AnimationError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Parse and validate a JSON document.
    pub fn from_json_str(source: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(source)
            .map_err(|e| AnimationError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check that all durations are usable.
    pub fn validate(&self) -> Result<()> {
        self.duration_limit()?;
        self.frame_delay()?;
        Ok(())
    }

    pub fn duration_limit(&self) -> Result<Option<Duration>> {
        self.duration_limit
            .map(|secs| duration_from_secs("duration_limit", secs))
            .transpose()
    }

    pub fn frame_delay(&self) -> Result<Option<Duration>> {
        self.frame_delay
            .map(|secs| duration_from_secs("frame_delay", secs))
            .transpose()
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_frame_count(mut self, count: u64) -> Self {
        self.frame_count = Some(count);
        self
    }

    pub fn with_cycle_count(mut self, count: u64) -> Self {
        self.cycle_count = Some(count);
        self
    }

    pub fn with_cycle(mut self, values: Vec<AttrValue>) -> Self {
        self.cycle = Some(values);
        self
    }

    pub fn with_duration_limit(mut self, secs: f64) -> Self {
        self.duration_limit = Some(secs);
        self
    }

    pub fn with_frame_delay(mut self, secs: f64) -> Self {
        self.frame_delay = Some(secs);
        self
    }

    /// Start paused; the animation waits for an explicit `start()`.
    pub fn paused(mut self) -> Self {
        self.started = false;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toml_config() {
        let config = AnimationConfig::from_toml_str(
            r#"
            label = "blinker"
            cycle = ["on", "off"]
            cycle_count = 3
            every = 0.25
            "#,
        )
        .unwrap();

        assert_eq!(config.label.as_deref(), Some("blinker"));
        assert_eq!(
            config.cycle,
            Some(vec![AttrValue::from("on"), AttrValue::from("off")])
        );
        assert_eq!(config.cycle_count, Some(3));
        assert_eq!(config.frame_delay().unwrap(), Some(Duration::from_millis(250)));
        assert!(config.started);
    }

    #[test]
    fn test_scalar_cycle_and_integer_seconds() {
        let config = AnimationConfig::from_toml_str(
            r#"
            cycle = "tick"
            duration_limit = 2
            started = false
            "#,
        )
        .unwrap();

        assert_eq!(config.cycle, Some(vec![AttrValue::from("tick")]));
        assert_eq!(config.duration_limit().unwrap(), Some(Duration::from_secs(2)));
        assert!(!config.started);
    }

    #[test]
    fn test_json_config() {
        let config =
            AnimationConfig::from_json_str(r#"{"frame_count": 10, "frame_delay": 0.01}"#).unwrap();
        assert_eq!(config.frame_count, Some(10));
        assert_eq!(config.frame_delay().unwrap(), Some(Duration::from_millis(10)));
        assert_eq!(config.cycle, None);
    }

    #[test]
    fn test_negative_duration_rejected() {
        let err = AnimationConfig::from_toml_str("duration_limit = -1.0").unwrap_err();
        assert!(matches!(err, AnimationError::NegativeValue(ref name) if name == "duration_limit"));

        let err = AnimationConfig::from_json_str(r#"{"frame_count": -3}"#).unwrap_err();
        assert!(matches!(err, AnimationError::ConfigParse(_)));
    }

    #[test]
    fn test_presets() {
        assert_eq!(AnimationConfig::frames(5).frame_count, Some(5));
        assert_eq!(AnimationConfig::timed(1.5).duration_limit, Some(1.5));
        let cycles = AnimationConfig::cycles(vec!["a", "b"], 2);
        assert_eq!(cycles.cycle_count, Some(2));
        assert_eq!(cycles.cycle.map(|c| c.len()), Some(2));
        assert!(!AnimationConfig::infinite().paused().started);
    }
}
