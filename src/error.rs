//! Session fault taxonomy.
//!
//! Every fault is terminal for the session: the controller catches it,
//! shows it on the status overlay, and the user must re-invoke.

use thiserror::Error;

use crate::locator::Role;

/// Faults a solve session can end with.
#[derive(Debug, Error)]
pub enum SolveError {
    /// A role could not be resolved automatically or manually.
    #[error("could not resolve {0} element")]
    Locator(Role),

    /// Pixel data of the source image is unreadable.
    #[error("cannot read image pixels: {0}")]
    Conditioning(String),

    /// The recognition engine could not be set up or executed.
    #[error("recognition engine unavailable: {0}")]
    EngineLoad(String),

    /// Recognition produced an empty code after normalization.
    /// Deliberately ambiguous between an unreadable image and a wrong
    /// target region.
    #[error("recognition produced no usable text")]
    Recognition,

    /// A session is already running; the new request is rejected, not queued.
    #[error("a session is already running")]
    Busy,

    /// The DevTools transport or page evaluation failed.
    #[error("page driver error: {0}")]
    Page(#[from] anyhow::Error),
}
