//! Session controller.
//!
//! Sequences one solve run: locate → condition → recognize → inject, with
//! the status overlay driven through every phase. At most one session may
//! be live per process; `SessionGuard` is a fail-fast handle released on
//! drop, so no fault path can leave the process blocked.

use image::RgbaImage;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crate::conditioner::{ConditionParams, condition};
use crate::config::SolverConfig;
use crate::error::SolveError;
use crate::injector;
use crate::locator;
use crate::page::{ImageExtract, PageDriver};
use crate::recognition;

/// Phases of one solve session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Idle,
    Locating,
    AwaitingManualSelection,
    LoadingEngine,
    Conditioning,
    Recognizing,
    Injecting,
    Succeeded,
    Failed,
}

impl std::fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionPhase::Idle => write!(f, "Idle"),
            SessionPhase::Locating => write!(f, "Locating elements..."),
            SessionPhase::AwaitingManualSelection => write!(f, "Waiting for selection..."),
            SessionPhase::LoadingEngine => write!(f, "Loading recognition engine..."),
            SessionPhase::Conditioning => write!(f, "Conditioning image..."),
            SessionPhase::Recognizing => write!(f, "Recognizing..."),
            SessionPhase::Injecting => write!(f, "Filling in the code..."),
            SessionPhase::Succeeded => write!(f, "Done"),
            SessionPhase::Failed => write!(f, "Failed"),
        }
    }
}

/// Process-wide re-entry flag: true while any session is non-idle.
static SESSION_ACTIVE: AtomicBool = AtomicBool::new(false);

/// Exclusive session handle. Acquiring fails fast when a session is live;
/// the flag clears on drop, on every exit path.
pub struct SessionGuard {
    _private: (),
}

impl SessionGuard {
    pub fn acquire() -> Result<Self, SolveError> {
        if SESSION_ACTIVE.swap(true, Ordering::SeqCst) {
            return Err(SolveError::Busy);
        }
        Ok(Self { _private: () })
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        SESSION_ACTIVE.store(false, Ordering::SeqCst);
    }
}

/// Runs one complete session against the attached page.
///
/// Every component fault is caught here, shown on the overlay in error
/// styling, and terminates the session; the overlay auto-dismisses after
/// a short delay on success and a longer one on failure.
pub async fn run_session(driver: &PageDriver, config: &SolverConfig) -> Result<String, SolveError> {
    let _guard = SessionGuard::acquire()?;

    match run_steps(driver, config).await {
        Ok(code) => {
            set_phase(driver, SessionPhase::Succeeded, 1.0).await;
            let _ = driver
                .hud_update(&format!("Filled: {}", code), 1.0, false)
                .await;
            crate::log(&format!("Session succeeded: {}", code));
            tokio::time::sleep(Duration::from_millis(config.success_dismiss_ms)).await;
            let _ = driver.hud_remove().await;
            Ok(code)
        }
        Err(e) => {
            set_phase(driver, SessionPhase::Failed, 0.0).await;
            let _ = driver.hud_update(&format!("Error: {}", e), 0.0, true).await;
            crate::log(&format!("Session failed: {}", e));
            tokio::time::sleep(Duration::from_millis(config.failure_dismiss_ms)).await;
            let _ = driver.hud_remove().await;
            Err(e)
        }
    }
}

/// Updates the overlay for a phase transition. Overlay faults themselves
/// are not session faults.
async fn set_phase(driver: &PageDriver, phase: SessionPhase, progress: f64) {
    crate::log(&format!("Phase: {:?}", phase));
    if matches!(phase, SessionPhase::Succeeded | SessionPhase::Failed) {
        return; // terminal rendering is done by the caller with detail text
    }
    let _ = driver.hud_update(&phase.to_string(), progress, false).await;
}

async fn run_steps(driver: &PageDriver, config: &SolverConfig) -> Result<String, SolveError> {
    // Locate the three roles.
    set_phase(driver, SessionPhase::Locating, 0.1).await;
    let outcome = locator::scan(driver, config).await?;

    let timeout = config.manual_pick_timeout_secs.map(Duration::from_secs);
    for role in outcome.missing.clone() {
        set_phase(driver, SessionPhase::AwaitingManualSelection, 0.15).await;
        let _ = driver
            .hud_update(&format!("Click the {}", role), 0.15, false)
            .await;
        let bound = locator::wait_for_manual_pick(driver, role, &outcome.frames, timeout).await?;
        if !bound {
            return Err(SolveError::Locator(role));
        }
        crate::log(&format!("Manually bound the {}", role));
    }

    // Make sure the engine is ready before touching pixels.
    set_phase(driver, SessionPhase::LoadingEngine, 0.2).await;
    recognition::ensure_engine()
        .await
        .map_err(|e| SolveError::EngineLoad(e.to_string()))?;

    // Pull the image out of the page and normalize it.
    set_phase(driver, SessionPhase::Conditioning, 0.4).await;
    let source = extract_source_image(driver).await?;
    let params = ConditionParams {
        scale_factor: config.scale_factor,
        denoise: config.denoise,
        threshold: config.threshold,
    };
    let binary = condition(&source, &params);

    // Recognize and normalize the text.
    set_phase(driver, SessionPhase::Recognizing, 0.6).await;
    let raw = recognition::recognize(&binary)
        .await
        .map_err(|e| SolveError::EngineLoad(e.to_string()))?;
    let code = recognition::normalize(&raw);
    crate::log(&format!("Recognized {:?} -> {:?}", raw.trim(), code));
    if code.is_empty() {
        return Err(SolveError::Recognition);
    }
    set_phase(driver, SessionPhase::Recognizing, 0.8).await;

    // Write the code into the input.
    set_phase(driver, SessionPhase::Injecting, 0.9).await;
    injector::inject(driver, &code, config).await?;

    Ok(code)
}

/// Waits for the bound image to finish loading, then extracts its pixels.
async fn extract_source_image(driver: &PageDriver) -> Result<RgbaImage, SolveError> {
    while !driver.image_ready().await? {
        tokio::time::sleep(Duration::from_millis(100)).await;
    }

    match driver.extract_image().await? {
        ImageExtract::Png(bytes) => {
            let img = image::load_from_memory(&bytes)
                .map_err(|e| SolveError::Conditioning(format!("undecodable image data: {}", e)))?;
            Ok(img.to_rgba8())
        }
        ImageExtract::Blocked(error) => Err(SolveError::Conditioning(format!(
            "the image origin blocks pixel access ({})",
            error
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Single test for the guard: the flag is process-wide, so splitting
    // these assertions across tests would race under the parallel runner.
    #[test]
    fn test_guard_excludes_reentry_and_releases_on_drop() {
        let first = SessionGuard::acquire().expect("first acquire must succeed");

        // A second request is rejected without disturbing the live session.
        assert!(matches!(SessionGuard::acquire(), Err(SolveError::Busy)));
        assert!(SESSION_ACTIVE.load(Ordering::SeqCst), "active session must stay active");

        drop(first);
        assert!(!SESSION_ACTIVE.load(Ordering::SeqCst));

        // Released guard makes room for the next session.
        let second = SessionGuard::acquire().expect("acquire after release must succeed");
        drop(second);
    }

    #[test]
    fn test_phase_display_strings() {
        assert_eq!(SessionPhase::Idle.to_string(), "Idle");
        assert_eq!(SessionPhase::Recognizing.to_string(), "Recognizing...");
        assert_eq!(SessionPhase::Failed.to_string(), "Failed");
    }
}
