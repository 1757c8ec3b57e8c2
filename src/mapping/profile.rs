//! Mapping profile: the calibration artifact
//!
//! On disk a profile is a JSON object with the keys `name`, `guid`, `buttons`,
//! `axes`, `hats` and `baseline`. [`ProfileDocument`] mirrors that shape;
//! [`MappingProfile`] is the validated, typed form the runtime works with.
//!
//! Reading is lenient: entries that do not name a known control are dropped
//! with a warning instead of failing the whole file. Only unreadable files and
//! malformed JSON are errors, and callers usually fall back to
//! [`MappingProfile::empty`] in that case.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::error::ProfileError;
use super::names::{AxisName, ButtonName, DPAD};

/// Serialized shape of a profile file
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ProfileDocument {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub guid: Option<String>,
    #[serde(default)]
    pub buttons: BTreeMap<String, i64>,
    #[serde(default)]
    pub axes: BTreeMap<String, i64>,
    #[serde(default)]
    pub hats: BTreeMap<String, i64>,
    /// Raw axis index (as a string) to its resting value
    #[serde(default)]
    pub baseline: BTreeMap<String, f32>,
}

/// Semantic-name to raw-index mapping plus per-axis rest values
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MappingProfile {
    device_name: String,
    device_guid: Option<String>,
    buttons: BTreeMap<ButtonName, usize>,
    axes: BTreeMap<AxisName, usize>,
    digital_triggers: BTreeMap<AxisName, usize>,
    dpad: Option<usize>,
    baseline: BTreeMap<usize, f32>,
}

impl MappingProfile {
    pub fn new(device_name: impl Into<String>, device_guid: Option<String>) -> Self {
        Self {
            device_name: device_name.into(),
            device_guid,
            ..Self::default()
        }
    }

    /// Profile that maps nothing: every state it produces is all-false / all-zero
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn map_button(&mut self, name: ButtonName, index: usize) -> &mut Self {
        self.buttons.insert(name, index);
        self
    }

    pub fn map_axis(&mut self, name: AxisName, index: usize) -> &mut Self {
        self.axes.insert(name, index);
        self
    }

    /// Stores a trigger that the device exposes as a plain button
    pub fn map_digital_trigger(&mut self, name: AxisName, index: usize) -> &mut Self {
        if name.is_trigger() {
            self.digital_triggers.insert(name, index);
        } else {
            warn!("Ignoring digital mapping for non-trigger axis {}", name);
        }
        self
    }

    pub fn map_dpad(&mut self, hat: usize) -> &mut Self {
        self.dpad = Some(hat);
        self
    }

    pub fn set_baseline(&mut self, axis: usize, rest: f32) -> &mut Self {
        self.baseline.insert(axis, rest);
        self
    }

    pub fn device_name(&self) -> &str {
        &self.device_name
    }

    pub fn device_guid(&self) -> Option<&str> {
        self.device_guid.as_deref()
    }

    pub fn button(&self, name: ButtonName) -> Option<usize> {
        self.buttons.get(&name).copied()
    }

    pub fn axis(&self, name: AxisName) -> Option<usize> {
        self.axes.get(&name).copied()
    }

    pub fn digital_trigger(&self, name: AxisName) -> Option<usize> {
        self.digital_triggers.get(&name).copied()
    }

    pub fn dpad(&self) -> Option<usize> {
        self.dpad
    }

    /// Rest value of a raw axis; axes without an entry rest at 0.0
    pub fn baseline(&self, axis: usize) -> f32 {
        self.baseline.get(&axis).copied().unwrap_or(0.0)
    }

    pub fn is_empty(&self) -> bool {
        self.buttons.is_empty()
            && self.axes.is_empty()
            && self.digital_triggers.is_empty()
            && self.dpad.is_none()
    }

    /// Whether a device GUID disagrees with the one recorded at calibration
    ///
    /// Only a mismatch between two known GUIDs counts; a mismatch is worth a
    /// warning but never stops the mapping from being applied.
    pub fn guid_mismatch(&self, device_guid: Option<&str>) -> bool {
        match (self.device_guid.as_deref(), device_guid) {
            (Some(expected), Some(actual)) => expected != actual,
            _ => false,
        }
    }

    /// Builds a typed profile from a parsed document, dropping invalid entries
    pub fn from_document(document: ProfileDocument) -> Self {
        let mut profile = Self::new(document.name, document.guid);

        for (key, raw) in document.buttons {
            let Some(index) = valid_index("buttons", &key, raw) else {
                continue;
            };
            if let Ok(name) = key.parse::<ButtonName>() {
                profile.map_button(name, index);
            } else {
                match key.parse::<AxisName>() {
                    Ok(name) if name.is_trigger() => {
                        profile.map_digital_trigger(name, index);
                    }
                    _ => warn!("Dropping unknown button mapping '{}'", key),
                }
            }
        }

        for (key, raw) in document.axes {
            let Some(index) = valid_index("axes", &key, raw) else {
                continue;
            };
            match key.parse::<AxisName>() {
                Ok(name) => {
                    profile.map_axis(name, index);
                }
                Err(_) => warn!("Dropping unknown axis mapping '{}'", key),
            }
        }

        for (key, raw) in document.hats {
            let Some(index) = valid_index("hats", &key, raw) else {
                continue;
            };
            if key == DPAD {
                profile.map_dpad(index);
            } else {
                warn!("Dropping unknown hat mapping '{}'", key);
            }
        }

        for (key, rest) in document.baseline {
            match key.parse::<usize>() {
                Ok(axis) => {
                    profile.set_baseline(axis, rest);
                }
                Err(_) => warn!("Dropping baseline entry with non-numeric axis '{}'", key),
            }
        }

        debug!(
            "Profile '{}': {} buttons, {} axes, {} digital triggers, dpad {:?}, {} baseline entries",
            profile.device_name,
            profile.buttons.len(),
            profile.axes.len(),
            profile.digital_triggers.len(),
            profile.dpad,
            profile.baseline.len()
        );
        profile
    }

    pub fn to_document(&self) -> ProfileDocument {
        let mut buttons: BTreeMap<String, i64> = self
            .buttons
            .iter()
            .map(|(name, index)| (name.to_string(), *index as i64))
            .collect();
        buttons.extend(
            self.digital_triggers
                .iter()
                .map(|(name, index)| (name.to_string(), *index as i64)),
        );

        ProfileDocument {
            name: self.device_name.clone(),
            guid: self.device_guid.clone(),
            buttons,
            axes: self
                .axes
                .iter()
                .map(|(name, index)| (name.to_string(), *index as i64))
                .collect(),
            hats: self
                .dpad
                .map(|hat| (DPAD.to_string(), hat as i64))
                .into_iter()
                .collect(),
            baseline: self
                .baseline
                .iter()
                .map(|(axis, rest)| (axis.to_string(), *rest))
                .collect(),
        }
    }

    pub fn from_json(text: &str) -> Result<Self, ProfileError> {
        let document: ProfileDocument = serde_json::from_str(text).map_err(ProfileError::Parse)?;
        Ok(Self::from_document(document))
    }

    pub fn to_json_pretty(&self) -> Result<String, ProfileError> {
        serde_json::to_string_pretty(&self.to_document()).map_err(ProfileError::Serialize)
    }

    pub fn load(path: &Path) -> Result<Self, ProfileError> {
        let text = fs::read_to_string(path).map_err(|source| ProfileError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let profile = Self::from_json(&text)?;
        info!(
            "Loaded profile '{}' from {}",
            profile.device_name,
            path.display()
        );
        Ok(profile)
    }

    /// Loads a profile, falling back to [`MappingProfile::empty`] on any error
    pub fn load_or_empty(path: &Path) -> Self {
        match Self::load(path) {
            Ok(profile) => profile,
            Err(e) => {
                warn!("{}; continuing with an empty profile", e);
                Self::empty()
            }
        }
    }

    pub fn save(&self, path: &Path) -> Result<(), ProfileError> {
        let text = self.to_json_pretty()?;
        fs::write(path, text).map_err(|source| ProfileError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        info!("Saved profile '{}' to {}", self.device_name, path.display());
        Ok(())
    }
}

fn valid_index(section: &str, key: &str, raw: i64) -> Option<usize> {
    match usize::try_from(raw) {
        Ok(index) => Some(index),
        Err(_) => {
            warn!("Dropping {} entry '{}' with invalid index {}", section, key, raw);
            None
        }
    }
}
