//! Event loop configuration.

use core_types::Millis;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Render cadence used when none is configured (about 60 frames per second).
pub const DEFAULT_FRAME_INTERVAL_MS: Millis = 16;

/// Errors produced while loading or validating an [`EventLoopConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The JSON could not be parsed
    #[error("invalid event loop config: {0}")]
    Parse(#[from] serde_json::Error),
    /// The render cadence was zero
    #[error("frame_interval_ms must be greater than zero")]
    ZeroFrameInterval,
    /// The microtask drain limit was zero
    #[error("max_microtasks_per_drain must be greater than zero")]
    ZeroDrainLimit,
}

/// Tunables for an [`EventLoop`](crate::EventLoop).
///
/// Every field has a default, so a partial JSON document is enough.
///
/// # Examples
///
/// ```
/// use event_loop::EventLoopConfig;
///
/// let config = EventLoopConfig::from_json(r#"{ "frame_interval_ms": 10 }"#).unwrap();
/// assert_eq!(config.frame_interval_ms, 10);
/// assert_eq!(config.first_frame_at(), 10);
/// assert_eq!(config.max_microtasks_per_drain, None);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventLoopConfig {
    /// Time between render passes
    pub frame_interval_ms: Millis,
    /// Offset of the first render pass from loop creation.
    /// Defaults to one frame interval.
    pub first_frame_at_ms: Option<Millis>,
    /// Upper bound on microtasks run by a single drain.
    /// `None` drains to empty.
    ///
    /// When the limit cuts a drain short, the leftover microtasks wait for the
    /// next drain and the iteration goes on to its macrotask and render pass.
    /// Microtasks then no longer take priority over macrotasks, so set this
    /// only to survive runaway microtask chains.
    pub max_microtasks_per_drain: Option<usize>,
}

impl Default for EventLoopConfig {
    fn default() -> Self {
        Self {
            frame_interval_ms: DEFAULT_FRAME_INTERVAL_MS,
            first_frame_at_ms: None,
            max_microtasks_per_drain: None,
        }
    }
}

impl EventLoopConfig {
    /// Parses and validates a JSON config document.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks the config for values the loop cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.frame_interval_ms == 0 {
            return Err(ConfigError::ZeroFrameInterval);
        }
        if self.max_microtasks_per_drain == Some(0) {
            return Err(ConfigError::ZeroDrainLimit);
        }
        Ok(())
    }

    /// Offset of the first render pass.
    pub fn first_frame_at(&self) -> Millis {
        self.first_frame_at_ms.unwrap_or(self.frame_interval_ms)
    }
}
