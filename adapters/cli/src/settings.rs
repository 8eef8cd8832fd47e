//! Runtime settings merged from built-in defaults, an optional TOML file and flags.

use std::{fs, path::Path, path::PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::provider::TriggerTarget;

const DEFAULT_PROBABILITIES: &str = "probabilities_risk.txt";
const DEFAULT_IMAGES_DIR: &str = "images";
const DEFAULT_TRIGGER_ADDR: &str = "127.0.0.1:1234";
const DEFAULT_WINDOW: (u32, u32) = (1280, 720);

/// Partial settings; every layer fills only the values it knows.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct SettingsLayer {
    pub(crate) probabilities: Option<PathBuf>,
    pub(crate) output_dir: Option<PathBuf>,
    pub(crate) images_dir: Option<PathBuf>,
    pub(crate) trigger_addr: Option<String>,
    pub(crate) trigger_enabled: Option<bool>,
    pub(crate) window_width: Option<u32>,
    pub(crate) window_height: Option<u32>,
    pub(crate) vsync: Option<bool>,
}

impl SettingsLayer {
    pub(crate) fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read configuration at {}", path.display()))?;
        Self::parse(&contents)
            .with_context(|| format!("failed to parse configuration at {}", path.display()))
    }

    fn parse(contents: &str) -> Result<Self> {
        toml::from_str(contents).context("invalid configuration toml")
    }

    /// Returns this layer with every value set in `overrides` replaced.
    #[must_use]
    pub(crate) fn overlay(self, overrides: Self) -> Self {
        Self {
            probabilities: overrides.probabilities.or(self.probabilities),
            output_dir: overrides.output_dir.or(self.output_dir),
            images_dir: overrides.images_dir.or(self.images_dir),
            trigger_addr: overrides.trigger_addr.or(self.trigger_addr),
            trigger_enabled: overrides.trigger_enabled.or(self.trigger_enabled),
            window_width: overrides.window_width.or(self.window_width),
            window_height: overrides.window_height.or(self.window_height),
            vsync: overrides.vsync.or(self.vsync),
        }
    }
}

/// Fully resolved runtime settings.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Settings {
    pub(crate) probabilities: PathBuf,
    pub(crate) output_dir: PathBuf,
    pub(crate) images_dir: PathBuf,
    pub(crate) trigger: TriggerTarget,
    pub(crate) window: (u32, u32),
    pub(crate) vsync: bool,
}

impl From<SettingsLayer> for Settings {
    fn from(layer: SettingsLayer) -> Self {
        let trigger = if layer.trigger_enabled.unwrap_or(true) {
            TriggerTarget::Tcp(
                layer
                    .trigger_addr
                    .unwrap_or_else(|| DEFAULT_TRIGGER_ADDR.to_owned()),
            )
        } else {
            TriggerTarget::Disabled
        };

        Self {
            probabilities: layer
                .probabilities
                .unwrap_or_else(|| PathBuf::from(DEFAULT_PROBABILITIES)),
            output_dir: layer.output_dir.unwrap_or_else(|| PathBuf::from(".")),
            images_dir: layer
                .images_dir
                .unwrap_or_else(|| PathBuf::from(DEFAULT_IMAGES_DIR)),
            trigger,
            window: (
                layer.window_width.unwrap_or(DEFAULT_WINDOW.0),
                layer.window_height.unwrap_or(DEFAULT_WINDOW.1),
            ),
            vsync: layer.vsync.unwrap_or(true),
        }
    }
}
