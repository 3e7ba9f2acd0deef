//! Runtime configuration.
//!
//! Loads settings from config.json next to the executable at startup.
//! Provides the image conditioning record, injection options, locator
//! keywords, and the DevTools endpoint.

use serde::{Deserialize, Serialize};
use std::fs;
use std::sync::OnceLock;

/// Global configuration instance, initialized once at startup.
static CONFIG: OnceLock<SolverConfig> = OnceLock::new();

/// Complete solver configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SolverConfig {
    /// DevTools HTTP endpoint of the running browser
    #[serde(default = "default_devtools_url")]
    pub devtools_url: String,
    /// Optional substring filter to pick the target page by URL.
    /// When absent, the first open page is used.
    #[serde(default)]
    pub page_url_filter: Option<String>,

    /// Upscale factor applied before recognition (clamped to 2..=4)
    #[serde(default = "default_scale_factor")]
    pub scale_factor: u32,
    /// Whether to run the 3x3 median denoise pass
    #[serde(default = "default_denoise")]
    pub denoise: bool,
    /// Binarization threshold (clamped to 130..=145)
    #[serde(default = "default_threshold")]
    pub threshold: u8,

    /// Keywords matched against image id/src
    #[serde(default = "default_image_keywords")]
    pub image_keywords: Vec<String>,
    /// Keywords matched against input id/name/placeholder
    #[serde(default = "default_input_keywords")]
    pub input_keywords: Vec<String>,
    /// Keywords matched against submit control id/value/text
    #[serde(default = "default_submit_keywords")]
    pub submit_keywords: Vec<String>,
    /// Maximum frame nesting depth visited during the scan
    #[serde(default = "default_max_frame_depth")]
    pub max_frame_depth: u32,
    /// Seconds to wait for a manual pointer selection before giving up.
    /// None waits indefinitely.
    #[serde(default)]
    pub manual_pick_timeout_secs: Option<u64>,

    /// Type the code character by character instead of a single write
    #[serde(default)]
    pub simulate_typing: bool,
    /// Inter-keystroke delay range in milliseconds [min, max]
    #[serde(default = "default_typing_delay_ms")]
    pub typing_delay_ms: [u64; 2],
    /// Apply highlight styling to the input after injection
    #[serde(default = "default_true")]
    pub highlight_input: bool,
    /// Copy the recognized code to the system clipboard (best effort)
    #[serde(default = "default_true")]
    pub copy_to_clipboard: bool,
    /// Activate the submit control (or press Enter) after injection
    #[serde(default)]
    pub auto_submit: bool,

    /// Status overlay auto-dismiss delay after success (milliseconds)
    #[serde(default = "default_success_dismiss_ms")]
    pub success_dismiss_ms: u64,
    /// Status overlay auto-dismiss delay after failure (milliseconds)
    #[serde(default = "default_failure_dismiss_ms")]
    pub failure_dismiss_ms: u64,
}

fn default_devtools_url() -> String {
    "http://127.0.0.1:9222".to_string()
}

fn default_scale_factor() -> u32 {
    3
}

fn default_denoise() -> bool {
    true
}

fn default_threshold() -> u8 {
    135
}

fn default_image_keywords() -> Vec<String> {
    ["captcha", "code", "verify"].map(String::from).to_vec()
}

fn default_input_keywords() -> Vec<String> {
    ["captcha", "verify", "code"].map(String::from).to_vec()
}

fn default_submit_keywords() -> Vec<String> {
    ["submit", "login", "confirm"].map(String::from).to_vec()
}

fn default_max_frame_depth() -> u32 {
    8
}

fn default_typing_delay_ms() -> [u64; 2] {
    [30, 70]
}

fn default_true() -> bool {
    true
}

fn default_success_dismiss_ms() -> u64 {
    3000
}

fn default_failure_dismiss_ms() -> u64 {
    4000
}

impl Default for SolverConfig {
    fn default() -> Self {
        serde_json::from_str("{}").expect("empty config must deserialize")
    }
}

impl SolverConfig {
    /// Clamps tunables into the ranges the conditioning pipeline supports.
    fn clamp_ranges(mut self) -> Self {
        self.scale_factor = self.scale_factor.clamp(2, 4);
        self.threshold = self.threshold.clamp(130, 145);
        if self.typing_delay_ms[0] > self.typing_delay_ms[1] {
            self.typing_delay_ms.swap(0, 1);
        }
        self
    }
}

/// Loads configuration from config.json or returns defaults.
/// Looks for config.json in the same directory as the executable.
fn load_config() -> SolverConfig {
    let config_path = crate::paths::get_exe_dir().join("config.json");

    crate::log(&format!("Looking for config at: {}", config_path.display()));

    if config_path.exists() {
        match fs::read_to_string(&config_path) {
            Ok(contents) => match serde_json::from_str::<SolverConfig>(&contents) {
                Ok(config) => {
                    crate::log("Config loaded from config.json");
                    return config.clamp_ranges();
                }
                Err(e) => {
                    crate::log(&format!("Failed to parse config.json: {}. Using defaults.", e));
                }
            },
            Err(e) => {
                crate::log(&format!("Failed to read config.json: {}. Using defaults.", e));
            }
        }
    } else {
        crate::log("config.json not found. Using default config.");
    }

    SolverConfig::default().clamp_ranges()
}

/// Initializes the global configuration. Call once at startup.
pub fn init_config() {
    let _ = CONFIG.set(load_config());
}

/// Returns a reference to the global configuration.
/// Panics if called before init_config().
pub fn get_config() -> &'static SolverConfig {
    CONFIG
        .get()
        .expect("Config not initialized. Call init_config() first.")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SolverConfig::default();
        assert_eq!(config.scale_factor, 3);
        assert_eq!(config.threshold, 135);
        assert!(config.denoise);
        assert_eq!(config.typing_delay_ms, [30, 70]);
        assert!(config.manual_pick_timeout_secs.is_none());
        assert!(!config.auto_submit);
    }

    #[test]
    fn test_clamp_ranges() {
        let config: SolverConfig =
            serde_json::from_str(r#"{"scale_factor": 9, "threshold": 10}"#).unwrap();
        let config = config.clamp_ranges();
        assert_eq!(config.scale_factor, 4);
        assert_eq!(config.threshold, 130);
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let config: SolverConfig =
            serde_json::from_str(r#"{"simulate_typing": true}"#).unwrap();
        assert!(config.simulate_typing);
        assert_eq!(config.devtools_url, "http://127.0.0.1:9222");
        assert_eq!(config.success_dismiss_ms, 3000);
    }

    #[test]
    fn test_typing_delay_reordered() {
        let config: SolverConfig =
            serde_json::from_str(r#"{"typing_delay_ms": [70, 30]}"#).unwrap();
        let config = config.clamp_ranges();
        assert_eq!(config.typing_delay_ms, [30, 70]);
    }
}
