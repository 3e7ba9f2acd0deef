//! Recognition adapter.
//!
//! Wraps the external Tesseract engine: one-time setup, a single-line
//! alphanumeric recognition run, and output normalization. The engine is
//! a black box; everything it emits goes through `normalize` before the
//! session trusts it.

pub mod setup;

pub use setup::ensure_engine;

use anyhow::{Result, anyhow};
use image::GrayImage;
use tempfile::NamedTempFile;
use tokio::process::Command;

const CHAR_WHITELIST: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

/// Runs the engine on a conditioned binary image and returns the raw text.
///
/// Configured for an alphanumeric-only character set and single-text-line
/// segmentation. Temp files are released by RAII on every exit path.
pub async fn recognize(img: &GrayImage) -> Result<String> {
    let engine = ensure_engine().await?;

    let temp_input = NamedTempFile::with_suffix(".png")?;
    img.save(temp_input.path())?;

    let output = Command::new(&engine.executable)
        .arg(temp_input.path())
        .arg("stdout")
        .arg("--tessdata-dir")
        .arg(&engine.tessdata)
        .arg("-l")
        .arg("eng")
        .arg("--psm")
        .arg("7") // single text line
        .arg("-c")
        .arg(format!("tessedit_char_whitelist={}", CHAR_WHITELIST))
        .output()
        .await?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(anyhow!("Tesseract failed: {}", stderr));
    }

    Ok(String::from_utf8_lossy(&output.stdout).to_string())
}

/// Normalizes raw engine output to the characters the host form accepts:
/// ASCII alphanumerics only, everything else stripped. Idempotent.
pub fn normalize(raw: &str) -> String {
    raw.chars().filter(|c| c.is_ascii_alphanumeric()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_strips_noise() {
        assert_eq!(normalize("A b-3!"), "Ab3");
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let samples = ["A b-3!", "  x9 Z\n", "...", "abc123", ""];
        for s in samples {
            let once = normalize(s);
            assert_eq!(normalize(&once), once);
        }
    }

    #[test]
    fn test_normalize_drops_non_ascii() {
        assert_eq!(normalize("驗證碼: K7q"), "K7q");
    }

    #[test]
    fn test_normalize_empty_stays_empty() {
        assert_eq!(normalize("-- !!\n"), "");
    }
}
