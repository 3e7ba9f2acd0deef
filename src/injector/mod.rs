//! Value injection.
//!
//! Writes the recognized code into the resolved input through every
//! applicable channel so that native handling, framework value trackers,
//! and legacy helper libraries all observe the change. Channel discovery
//! happens once per session; the plan is then applied unconditionally in
//! order. Exactly one write per session, no verification, no retry.

use anyhow::Result;
use rand::Rng;
use std::time::Duration;

use crate::config::SolverConfig;
use crate::page::PageDriver;

/// A write channel, in application order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    /// The value setter inherited from the base element type
    NativeSetter,
    /// The legacy DOM helper's value/event API, when present
    DelegatedHelper,
    /// The underlying attribute, for logic that inspects attributes
    Attribute,
    /// Bubbling input/keydown/keyup/change/blur burst
    EventBurst,
}

/// Builds the ordered channel plan from the capability probe.
pub fn plan_channels(helper_present: bool) -> Vec<Channel> {
    let mut plan = vec![Channel::NativeSetter];
    if helper_present {
        plan.push(Channel::DelegatedHelper);
    }
    plan.push(Channel::Attribute);
    plan.push(Channel::EventBurst);
    plan
}

/// Writes `text` into the bound input and runs the configured follow-ups.
pub async fn inject(driver: &PageDriver, text: &str, config: &SolverConfig) -> Result<()> {
    let helper_present = driver.has_helper().await?;
    let plan = plan_channels(helper_present);
    crate::log(&format!("Injection plan: {:?}", plan));

    driver.focus_input().await?;

    for channel in plan {
        match channel {
            Channel::NativeSetter => {
                if config.simulate_typing {
                    type_text(driver, text, config).await?;
                } else {
                    driver.set_value_native(text).await?;
                }
            }
            Channel::DelegatedHelper => driver.set_value_helper(text).await?,
            Channel::Attribute => driver.set_value_attribute(text).await?,
            Channel::EventBurst => driver.dispatch_events().await?,
        }
    }

    if config.highlight_input {
        driver.highlight_input().await?;
    }

    if config.copy_to_clipboard {
        copy_to_clipboard(text);
    }

    if config.auto_submit {
        if driver.activate_submit().await? {
            crate::log("Activated submit control");
        } else {
            driver.press_enter().await?;
            crate::log("No submit control bound, dispatched Enter on the input");
        }
    }

    Ok(())
}

/// Types the code character by character with a randomized delay, for
/// hosts suspected of rejecting instantaneous value changes.
async fn type_text(driver: &PageDriver, text: &str, config: &SolverConfig) -> Result<()> {
    let [min, max] = config.typing_delay_ms;
    driver.set_value_native("").await?;
    for ch in text.chars() {
        driver.type_char(ch).await?;
        let delay = rand::rng().random_range(min..=max);
        tokio::time::sleep(Duration::from_millis(delay)).await;
    }
    Ok(())
}

/// Best-effort clipboard copy; denial is logged, never fatal.
fn copy_to_clipboard(text: &str) {
    match arboard::Clipboard::new().and_then(|mut cb| cb.set_text(text.to_string())) {
        Ok(()) => crate::log("Code copied to clipboard"),
        Err(e) => crate::log(&format!("Clipboard unavailable: {}", e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plan_without_helper() {
        assert_eq!(
            plan_channels(false),
            vec![Channel::NativeSetter, Channel::Attribute, Channel::EventBurst]
        );
    }

    #[test]
    fn test_plan_with_helper_keeps_order() {
        assert_eq!(
            plan_channels(true),
            vec![
                Channel::NativeSetter,
                Channel::DelegatedHelper,
                Channel::Attribute,
                Channel::EventBurst
            ]
        );
    }
}
