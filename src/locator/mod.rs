//! Element location across the document and its same-origin frames.
//!
//! Resolves up to three roles (code image, destination input, optional
//! submit control) by walking the frame tree breadth-first and evaluating
//! tiered rules in each reachable document. When the automated scan leaves
//! a required role open, the next pointer action in the page binds it
//! manually.

pub mod walk;

pub use walk::{FrameProbe, Reachability, walk_frames};

use anyhow::Result;
use std::time::{Duration, Instant};

use crate::config::SolverConfig;
use crate::page::{PageDriver, ScanRules, ScanTiers};

/// The three element roles a session needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Image,
    Input,
    Submit,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Image, Role::Input, Role::Submit];

    /// Registry key used on the page side.
    pub fn key(&self) -> &'static str {
        match self {
            Role::Image => "image",
            Role::Input => "input",
            Role::Submit => "submit",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Image => write!(f, "code image"),
            Role::Input => write!(f, "code input"),
            Role::Submit => write!(f, "submit control"),
        }
    }
}

/// Outcome of the automated scan.
#[derive(Debug)]
pub struct ScanOutcome {
    /// Reachable frame paths in visit order, for the manual picker
    pub frames: Vec<Vec<u32>>,
    /// Required roles the scan could not resolve
    pub missing: Vec<Role>,
    /// Whether a submit control was bound
    pub has_submit: bool,
}

struct DriverProbe<'a> {
    driver: &'a PageDriver,
}

impl FrameProbe for DriverProbe<'_> {
    async fn probe(&mut self, path: &[u32]) -> Result<Reachability> {
        let reply = self.driver.probe_frame(path).await?;
        Ok(if reply.reachable {
            Reachability::Reachable {
                doc_id: reply.doc_id,
                child_count: reply.child_count,
            }
        } else {
            Reachability::Unreachable
        })
    }
}

/// Per role, the frame index and tier of the best match so far.
/// Lower tier wins; the earliest-visited frame breaks ties.
pub(crate) fn pick_winners(tiers_by_frame: &[ScanTiers]) -> [Option<(usize, u8)>; 3] {
    let mut winners: [Option<(usize, u8)>; 3] = [None; 3];
    for (frame_idx, tiers) in tiers_by_frame.iter().enumerate() {
        for (slot, role) in Role::ALL.iter().enumerate() {
            let tier = tiers.tier_for(*role);
            if tier == 0 {
                continue;
            }
            let better = match winners[slot] {
                None => true,
                Some((_, best)) => tier < best,
            };
            if better {
                winners[slot] = Some((frame_idx, tier));
            }
        }
    }
    winners
}

/// Walks the frame tree, scans every reachable document, and commits the
/// best candidate per role.
pub async fn scan(driver: &PageDriver, config: &SolverConfig) -> Result<ScanOutcome> {
    let mut probe = DriverProbe { driver };
    let frames = walk_frames(&mut probe, config.max_frame_depth).await?;
    crate::log(&format!("Frame scan: {} reachable document(s)", frames.len()));

    let rules = ScanRules {
        image_keywords: &config.image_keywords,
        input_keywords: &config.input_keywords,
        submit_keywords: &config.submit_keywords,
    };

    let mut tiers_by_frame = Vec::with_capacity(frames.len());
    for path in &frames {
        tiers_by_frame.push(driver.scan_frame(path, &rules).await?);
    }

    let winners = pick_winners(&tiers_by_frame);
    let mut has_submit = false;
    let mut missing = Vec::new();

    for (slot, role) in Role::ALL.iter().enumerate() {
        match winners[slot] {
            Some((frame_idx, tier)) => {
                driver.commit_candidate(*role, &frames[frame_idx]).await?;
                crate::log(&format!(
                    "Resolved {} in frame {:?} (tier {})",
                    role, frames[frame_idx], tier
                ));
                if *role == Role::Submit {
                    has_submit = true;
                }
            }
            None => {
                // Submit is optional; the other roles go to manual fallback.
                if *role != Role::Submit {
                    missing.push(*role);
                }
            }
        }
    }

    Ok(ScanOutcome { frames, missing, has_submit })
}

/// Suspends until the user's next pointer action binds `role`, or until
/// the optional timeout expires. Returns false on timeout.
pub async fn wait_for_manual_pick(
    driver: &PageDriver,
    role: Role,
    frames: &[Vec<u32>],
    timeout: Option<Duration>,
) -> Result<bool> {
    driver.install_picker(frames).await?;
    crate::log(&format!("Waiting for manual selection of the {}...", role));

    let started = Instant::now();
    loop {
        if driver.poll_pick().await? {
            let bound = driver.bind_pick(role).await?;
            return Ok(bound);
        }
        if let Some(limit) = timeout {
            if started.elapsed() >= limit {
                driver.remove_picker().await?;
                crate::log(&format!("Manual selection of the {} timed out", role));
                return Ok(false);
            }
        }
        tokio::time::sleep(Duration::from_millis(200)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tiers(image: u8, input: u8, submit: u8) -> ScanTiers {
        ScanTiers { image, input, submit }
    }

    #[test]
    fn test_pick_winners_prefers_lower_tier() {
        let frames = [tiers(3, 0, 0), tiers(1, 2, 0)];
        let winners = pick_winners(&frames);
        assert_eq!(winners[0], Some((1, 1)), "tier 1 beats earlier tier 3");
        assert_eq!(winners[1], Some((1, 2)));
        assert_eq!(winners[2], None);
    }

    #[test]
    fn test_pick_winners_earliest_frame_breaks_ties() {
        let frames = [tiers(2, 0, 0), tiers(2, 0, 0)];
        let winners = pick_winners(&frames);
        assert_eq!(winners[0], Some((0, 2)));
    }

    #[test]
    fn test_pick_winners_empty_scan() {
        assert_eq!(pick_winners(&[]), [None; 3]);
    }

    #[test]
    fn test_role_keys_match_registry() {
        assert_eq!(Role::Image.key(), "image");
        assert_eq!(Role::Input.key(), "input");
        assert_eq!(Role::Submit.key(), "submit");
    }
}
