//! Recognition engine setup.
//!
//! Locates a Tesseract installation and ensures the English model data is
//! present, downloading it from its fixed location when missing. Runs at
//! most once per process lifetime regardless of how many sessions run.

use anyhow::{Result, anyhow};
use std::fs;
use std::path::PathBuf;
use tokio::sync::OnceCell;

use crate::paths::get_engine_dir;

const TESSDATA_REPO: &str = "https://github.com/tesseract-ocr/tessdata/raw/main";

/// Resolved engine locations.
#[derive(Debug)]
pub struct EnginePaths {
    pub executable: PathBuf,
    pub tessdata: PathBuf,
}

static ENGINE: OnceCell<EnginePaths> = OnceCell::const_new();

/// Ensures the engine is available, resolving it exactly once per process.
/// Later callers get the cached paths without re-probing.
pub async fn ensure_engine() -> Result<&'static EnginePaths> {
    ENGINE
        .get_or_try_init(|| async {
            let executable = find_tesseract_executable()?;
            let tessdata = ensure_tessdata().await?;
            crate::log(&format!(
                "Recognition engine ready: {} (data: {})",
                executable.display(),
                tessdata.display()
            ));
            Ok(EnginePaths { executable, tessdata })
        })
        .await
}

/// Finds the Tesseract executable: PATH first, then well-known install
/// locations.
fn find_tesseract_executable() -> Result<PathBuf> {
    if let Ok(output) = std::process::Command::new("tesseract").arg("--version").output() {
        if output.status.success() {
            return Ok(PathBuf::from("tesseract"));
        }
    }

    let common_paths = [
        "/usr/bin/tesseract",
        "/usr/local/bin/tesseract",
        "/opt/homebrew/bin/tesseract",
        r"C:\Program Files\Tesseract-OCR\tesseract.exe",
        r"C:\Program Files (x86)\Tesseract-OCR\tesseract.exe",
    ];

    for path in &common_paths {
        let p = PathBuf::from(path);
        if p.exists() {
            return Ok(p);
        }
    }

    Err(anyhow!(
        "Tesseract not found. Install Tesseract-OCR and make sure it is on PATH."
    ))
}

/// Ensures eng.traineddata exists locally, downloading it when missing.
async fn ensure_tessdata() -> Result<PathBuf> {
    let tessdata_dir = get_engine_dir();
    let eng_path = tessdata_dir.join("eng.traineddata");

    if eng_path.exists() {
        return Ok(tessdata_dir);
    }

    // A system install may already carry the model.
    if let Some(system) = find_system_tessdata() {
        return Ok(system);
    }

    crate::log("eng.traineddata not found locally, downloading...");
    fs::create_dir_all(&tessdata_dir)?;

    let eng_url = format!("{}/eng.traineddata", TESSDATA_REPO);
    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(300))
        .build()?;

    let response = client
        .get(&eng_url)
        .header("User-Agent", "codefill")
        .send()
        .await?;

    if !response.status().is_success() {
        return Err(anyhow!(
            "Failed to download eng.traineddata: HTTP {}",
            response.status()
        ));
    }

    let bytes = response.bytes().await?;
    fs::write(&eng_path, &bytes)?;
    crate::log(&format!("Downloaded eng.traineddata ({} bytes)", bytes.len()));

    Ok(tessdata_dir)
}

/// Checks well-known system tessdata locations, including TESSDATA_PREFIX.
fn find_system_tessdata() -> Option<PathBuf> {
    let mut candidates: Vec<PathBuf> = vec![
        PathBuf::from("/usr/share/tesseract-ocr/5/tessdata"),
        PathBuf::from("/usr/share/tesseract-ocr/4.00/tessdata"),
        PathBuf::from("/usr/share/tessdata"),
        PathBuf::from("/usr/local/share/tessdata"),
        PathBuf::from(r"C:\Program Files\Tesseract-OCR\tessdata"),
    ];

    if let Ok(prefix) = std::env::var("TESSDATA_PREFIX") {
        candidates.insert(0, PathBuf::from(&prefix));
        candidates.insert(1, PathBuf::from(&prefix).join("tessdata"));
    }

    candidates
        .into_iter()
        .find(|p| p.join("eng.traineddata").exists())
}
