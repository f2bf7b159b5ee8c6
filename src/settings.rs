//! Start-up configuration and remembered view preferences, both kept in
//! `localStorage` as JSON.

use serde::{Deserialize, Serialize};
use sonoscope_core::config::EngineConfig;
use sonoscope_core::coords::FreqScale;

const CONFIG_KEY: &str = "sonoscope.config";
const PREFS_KEY: &str = "sonoscope.prefs";

fn local_storage() -> Option<web_sys::Storage> {
    web_sys::window()?.local_storage().ok()?
}

/// Engine tuning, with any override from `localStorage` applied. A broken
/// override is logged and ignored.
pub fn load_engine_config() -> EngineConfig {
    let Some(json) = local_storage().and_then(|s| s.get_item(CONFIG_KEY).ok().flatten()) else {
        return EngineConfig::default();
    };
    match EngineConfig::from_json(&json) {
        Ok(config) => {
            log::info!("Using engine config override from {CONFIG_KEY}");
            config
        }
        Err(e) => {
            log::warn!("Ignoring {CONFIG_KEY}: {e}");
            EngineConfig::default()
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewPrefs {
    pub scale: FreqScale,
    pub playback_rate: f64,
}

impl Default for ViewPrefs {
    fn default() -> Self {
        Self { scale: FreqScale::Linear, playback_rate: 1.0 }
    }
}

pub fn load_prefs() -> ViewPrefs {
    local_storage()
        .and_then(|s| s.get_item(PREFS_KEY).ok().flatten())
        .and_then(|json| serde_json::from_str(&json).ok())
        .unwrap_or_default()
}

pub fn save_prefs(prefs: &ViewPrefs) {
    let Some(storage) = local_storage() else { return };
    match serde_json::to_string(prefs) {
        Ok(json) => {
            if let Err(e) = storage.set_item(PREFS_KEY, &json) {
                log::warn!("Could not save preferences: {e:?}");
            }
        }
        Err(e) => log::warn!("Could not encode preferences: {e}"),
    }
}
