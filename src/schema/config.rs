/// Playback tuning — fade timings, cue volumes, and scene layout.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use super::story::{CueId, Position};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("RON deserialization error: {0}")]
    Ron(#[from] ron::error::SpannedError),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Top-level playback configuration. Every field has a default, so a RON
/// file only needs to name what it overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    /// Horizontal inset; the text wrap width is `render_width - padding`.
    pub padding: f32,
    /// Resting opacity of the mask that holds the page surfaces.
    pub mask_opacity: f32,
    /// Vertical offset of the mask inside the scene.
    pub mask_offset_y: f32,
    /// Fade-in of the whole scene on `start`.
    pub intro_fade_ms: u64,
    /// Drop a second input arriving before `end_frame`.
    pub debounce_same_frame: bool,
    pub reveal: RevealConfig,
    pub special: SpecialSequenceConfig,
    /// Blinking tap hint. `None` leaves it out of the scene.
    pub tip: Option<TipConfig>,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            padding: 20.0,
            mask_opacity: 0.8,
            mask_offset_y: 90.0,
            intro_fade_ms: 800,
            debounce_same_frame: true,
            reveal: RevealConfig::default(),
            special: SpecialSequenceConfig::default(),
            tip: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RevealConfig {
    pub fade_ms: u64,
    pub voice_volume: f32,
}

impl Default for RevealConfig {
    fn default() -> Self {
        Self {
            fade_ms: 500,
            voice_volume: 2.8,
        }
    }
}

impl RevealConfig {
    pub fn fade(&self) -> Duration {
        Duration::from_millis(self.fade_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpecialSequenceConfig {
    pub cue: CueId,
    pub cue_volume: f32,
    /// Sprite asset shown full-screen while the cue plays.
    pub overlay_asset: String,
    pub overlay_height: f32,
    /// Channel carrying the background music that gets ducked.
    pub ambient_channel: String,
    pub ambient_ducked_volume: f32,
    /// Volume the ambient channel returns to once the cue ends.
    /// `None` leaves it ducked.
    pub ambient_restore_volume: Option<f32>,
    pub fade_ms: u64,
    pub auto_advance_delay_ms: u64,
}

impl Default for SpecialSequenceConfig {
    fn default() -> Self {
        Self {
            cue: CueId::from("new_year"),
            cue_volume: 1.3,
            overlay_asset: "new_year".to_string(),
            overlay_height: 450.0,
            ambient_channel: "bgm".to_string(),
            ambient_ducked_volume: 0.5,
            ambient_restore_volume: None,
            fade_ms: 500,
            auto_advance_delay_ms: 500,
        }
    }
}

impl SpecialSequenceConfig {
    pub fn fade(&self) -> Duration {
        Duration::from_millis(self.fade_ms)
    }

    pub fn auto_advance_delay(&self) -> Duration {
        Duration::from_millis(self.auto_advance_delay_ms)
    }
}

/// The tap hint sitting in the mask's lower-right corner: a label plus a
/// sprite that blinks between full and zero opacity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TipConfig {
    pub label: String,
    pub asset: String,
    /// Distance from the right edge of the render width.
    pub inset_right: f32,
    /// Distance from the bottom of the target height.
    pub inset_bottom: f32,
    /// Sprite position inside the hint.
    pub sprite_offset: Position,
    /// Length of one fade leg.
    pub blink_ms: u64,
    /// Hold at full opacity before the first leg.
    pub blink_delay_ms: u64,
}

impl Default for TipConfig {
    fn default() -> Self {
        Self {
            label: "TOUCH".to_string(),
            asset: "snow".to_string(),
            inset_right: 110.0,
            inset_bottom: 240.0,
            sprite_offset: Position::new(30.0, -30.0),
            blink_ms: 1000,
            blink_delay_ms: 1200,
        }
    }
}

impl TipConfig {
    pub fn blink(&self) -> Duration {
        Duration::from_millis(self.blink_ms)
    }

    pub fn blink_delay(&self) -> Duration {
        Duration::from_millis(self.blink_delay_ms)
    }
}

impl PlaybackConfig {
    /// Load a config from a RON file.
    pub fn load_from_ron(path: &Path) -> Result<PlaybackConfig, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse_ron(&contents)
    }

    /// Parse a config from a RON string and validate it.
    pub fn parse_ron(input: &str) -> Result<PlaybackConfig, ConfigError> {
        let config: PlaybackConfig = ron::from_str(input)?;
        config.validate()?;
        Ok(config)
    }

    pub fn intro_fade(&self) -> Duration {
        Duration::from_millis(self.intro_fade_ms)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.mask_opacity) {
            return Err(ConfigError::Invalid(format!(
                "mask_opacity must be within 0..=1, got {}",
                self.mask_opacity
            )));
        }
        if self.padding < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "padding must not be negative, got {}",
                self.padding
            )));
        }
        let volumes = [
            ("reveal.voice_volume", Some(self.reveal.voice_volume)),
            ("special.cue_volume", Some(self.special.cue_volume)),
            ("special.ambient_ducked_volume", Some(self.special.ambient_ducked_volume)),
            ("special.ambient_restore_volume", self.special.ambient_restore_volume),
        ];
        for (name, volume) in volumes {
            if let Some(v) = volume {
                if v < 0.0 {
                    return Err(ConfigError::Invalid(format!(
                        "{} must not be negative, got {}",
                        name, v
                    )));
                }
            }
        }
        if self.special.cue.as_str().is_empty() {
            return Err(ConfigError::Invalid("special.cue must be named".to_string()));
        }
        if let Some(tip) = &self.tip {
            if tip.asset.is_empty() {
                return Err(ConfigError::Invalid("tip.asset must be named".to_string()));
            }
            if tip.blink_ms == 0 {
                return Err(ConfigError::Invalid("tip.blink_ms must be positive".to_string()));
            }
        }
        Ok(())
    }
}
