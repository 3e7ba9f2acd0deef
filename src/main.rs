//! codefill
//!
//! One-shot CAPTCHA auto-filler. Attaches to an already-open page in a
//! locally running Chromium over the DevTools protocol, locates the code
//! image and its input field (walking same-origin frames), conditions the
//! image, recognizes the code with Tesseract, and types it into the field
//! the way the page expects a person to.

mod conditioner;
mod config;
mod error;
mod injector;
mod locator;
mod page;
mod paths;
mod recognition;
mod session;

use anyhow::Result;
use chrono::Local;
use std::fs::OpenOptions;
use std::io::Write;

/// Logs a message to both console and log file with timestamp.
pub fn log(msg: &str) {
    let timestamp = Local::now().format("%H:%M:%S%.3f");
    let line = format!("[{}] {}\n", timestamp, msg);
    print!("{}", line);
    let log_path = paths::get_logs_dir().join("codefill.log");
    if let Ok(mut file) = OpenOptions::new().create(true).append(true).open(&log_path) {
        let _ = file.write_all(line.as_bytes());
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Log panics before the process dies.
    std::panic::set_hook(Box::new(|panic_info| {
        let msg = if let Some(s) = panic_info.payload().downcast_ref::<&str>() {
            s.to_string()
        } else if let Some(s) = panic_info.payload().downcast_ref::<String>() {
            s.clone()
        } else {
            "Unknown panic".to_string()
        };
        let location = panic_info
            .location()
            .map(|loc| format!(" at {}:{}:{}", loc.file(), loc.line(), loc.column()))
            .unwrap_or_default();
        eprintln!("[PANIC]{} {}", location, msg);
    }));

    paths::ensure_directories()?;
    config::init_config();
    let config = config::get_config();

    log(&format!("Connecting to browser at {}", config.devtools_url));
    let (_browser, driver) =
        page::PageDriver::connect(&config.devtools_url, config.page_url_filter.as_deref()).await?;

    // One session per invocation; re-run the tool to retry.
    match session::run_session(&driver, config).await {
        Ok(code) => {
            log(&format!("Done: {}", code));
            Ok(())
        }
        Err(e) => {
            log(&format!("Failed: {}", e));
            std::process::exit(1);
        }
    }
}
