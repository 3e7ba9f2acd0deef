//! DOM syscall layer over the DevTools protocol.
//!
//! `PageDriver` wraps a chromiumoxide page and exposes every document read
//! and write the solver needs as one method backed by one fixed JS function
//! (see `js.rs`). Arguments cross the boundary as a JSON record; results
//! come back typed through serde.

pub mod js;

use anyhow::{Context, Result, anyhow};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use chromiumoxide::{Browser, Page};
use futures::StreamExt;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::json;

use crate::locator::Role;

/// Outcome of probing one frame by index path.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameProbeReply {
    pub reachable: bool,
    /// Stable per-document identity token, 0 when unreachable
    pub doc_id: u64,
    pub child_count: u32,
}

/// Match tiers per role for one frame; 0 means no match.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct ScanTiers {
    pub image: u8,
    pub input: u8,
    pub submit: u8,
}

impl ScanTiers {
    pub fn tier_for(&self, role: Role) -> u8 {
        match role {
            Role::Image => self.image,
            Role::Input => self.input,
            Role::Submit => self.submit,
        }
    }
}

/// Result of pulling the code image out of the page.
pub enum ImageExtract {
    /// PNG bytes of the rendered source
    Png(Vec<u8>),
    /// The source taints the canvas; pixel access is blocked by its origin
    Blocked(String),
}

#[derive(Debug, Deserialize)]
struct ExtractReply {
    ok: bool,
    data: String,
    error: String,
}

/// Keyword lists shipped to the scan function.
#[derive(Debug, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanRules<'a> {
    pub image_keywords: &'a [String],
    pub input_keywords: &'a [String],
    pub submit_keywords: &'a [String],
}

pub struct PageDriver {
    page: Page,
}

impl PageDriver {
    /// Attaches to the running browser and picks the target page.
    ///
    /// Discovers the websocket endpoint from `<devtools_url>/json/version`,
    /// connects, and spawns the CDP event loop. When `page_filter` is set,
    /// the first page whose URL contains it wins; otherwise the first open
    /// page is used. The returned `Browser` must stay alive for the
    /// connection to survive.
    pub async fn connect(devtools_url: &str, page_filter: Option<&str>) -> Result<(Browser, Self)> {
        let json_url = format!("{}/json/version", devtools_url.trim_end_matches('/'));
        let version: serde_json::Value = reqwest::get(&json_url)
            .await
            .with_context(|| format!("DevTools endpoint unreachable: {}", json_url))?
            .json()
            .await
            .context("DevTools version reply was not JSON")?;
        let ws_url = version["webSocketDebuggerUrl"]
            .as_str()
            .ok_or_else(|| anyhow!("no webSocketDebuggerUrl in DevTools reply"))?
            .to_string();

        let (browser, mut handler) = Browser::connect(ws_url).await?;
        tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        let pages = browser.pages().await?;
        let mut target = None;
        for page in pages {
            let url = page.url().await?.unwrap_or_default();
            let matches = match page_filter {
                Some(filter) => url.contains(filter),
                None => true,
            };
            if matches {
                crate::log(&format!("Attached to page: {}", url));
                target = Some(page);
                break;
            }
        }
        let page = target.ok_or_else(|| anyhow!("no open page matched the configured filter"))?;

        let driver = Self { page };
        driver.call::<bool>(js::INIT_REGISTRY, json!(null)).await?;
        Ok((browser, driver))
    }

    /// Invokes one fixed JS function with a JSON argument record.
    async fn call<T: DeserializeOwned>(&self, func: &str, arg: serde_json::Value) -> Result<T> {
        let expr = format!("({})({})", func, arg);
        let result = self
            .page
            .evaluate(expr)
            .await
            .map_err(|e| anyhow!("page evaluation failed: {}", e))?;
        result
            .into_value::<T>()
            .map_err(|e| anyhow!("unexpected evaluation result: {}", e))
    }

    pub async fn probe_frame(&self, path: &[u32]) -> Result<FrameProbeReply> {
        self.call(js::PROBE_FRAME, json!({ "path": path })).await
    }

    pub async fn scan_frame(&self, path: &[u32], rules: &ScanRules<'_>) -> Result<ScanTiers> {
        let mut arg = serde_json::to_value(rules)?;
        arg["path"] = json!(path);
        self.call(js::SCAN_FRAME, arg).await
    }

    pub async fn commit_candidate(&self, role: Role, path: &[u32]) -> Result<bool> {
        self.call(js::COMMIT_CANDIDATE, json!({ "role": role.key(), "path": path }))
            .await
    }

    pub async fn install_picker(&self, paths: &[Vec<u32>]) -> Result<()> {
        self.call::<bool>(js::INSTALL_PICKER, json!({ "paths": paths }))
            .await?;
        Ok(())
    }

    pub async fn poll_pick(&self) -> Result<bool> {
        self.call(js::POLL_PICK, json!(null)).await
    }

    pub async fn bind_pick(&self, role: Role) -> Result<bool> {
        self.call(js::BIND_PICK, json!({ "role": role.key() })).await
    }

    pub async fn remove_picker(&self) -> Result<()> {
        self.call::<bool>(js::REMOVE_PICKER, json!(null)).await?;
        Ok(())
    }

    pub async fn image_ready(&self) -> Result<bool> {
        self.call(js::IMAGE_READY, json!(null)).await
    }

    /// Pulls the bound image out of the page as PNG bytes.
    pub async fn extract_image(&self) -> Result<ImageExtract> {
        let reply: ExtractReply = self.call(js::EXTRACT_IMAGE, json!(null)).await?;
        if !reply.ok {
            return Ok(ImageExtract::Blocked(reply.error));
        }
        let encoded = reply
            .data
            .split_once(',')
            .map(|(_, data)| data)
            .ok_or_else(|| anyhow!("malformed image data URL"))?;
        Ok(ImageExtract::Png(BASE64.decode(encoded)?))
    }

    pub async fn has_helper(&self) -> Result<bool> {
        self.call(js::HAS_HELPER, json!(null)).await
    }

    pub async fn focus_input(&self) -> Result<()> {
        self.call::<bool>(js::FOCUS_INPUT, json!(null)).await?;
        Ok(())
    }

    pub async fn set_value_native(&self, text: &str) -> Result<()> {
        self.call::<bool>(js::SET_VALUE_NATIVE, json!({ "text": text }))
            .await?;
        Ok(())
    }

    pub async fn set_value_helper(&self, text: &str) -> Result<()> {
        self.call::<bool>(js::SET_VALUE_HELPER, json!({ "text": text }))
            .await?;
        Ok(())
    }

    pub async fn set_value_attribute(&self, text: &str) -> Result<()> {
        self.call::<bool>(js::SET_ATTRIBUTE, json!({ "text": text }))
            .await?;
        Ok(())
    }

    pub async fn dispatch_events(&self) -> Result<()> {
        self.call::<bool>(js::DISPATCH_EVENTS, json!(null)).await?;
        Ok(())
    }

    pub async fn type_char(&self, ch: char) -> Result<()> {
        self.call::<bool>(js::TYPE_CHAR, json!({ "ch": ch.to_string() }))
            .await?;
        Ok(())
    }

    pub async fn highlight_input(&self) -> Result<()> {
        self.call::<bool>(js::HIGHLIGHT_INPUT, json!(null)).await?;
        Ok(())
    }

    /// Returns false when no submit control is bound.
    pub async fn activate_submit(&self) -> Result<bool> {
        self.call(js::ACTIVATE_SUBMIT, json!(null)).await
    }

    pub async fn press_enter(&self) -> Result<()> {
        self.call::<bool>(js::PRESS_ENTER, json!(null)).await?;
        Ok(())
    }

    pub async fn hud_update(&self, text: &str, progress: f64, error: bool) -> Result<()> {
        self.call::<bool>(
            js::HUD_UPDATE,
            json!({ "text": text, "progress": progress, "error": error }),
        )
        .await?;
        Ok(())
    }

    pub async fn hud_remove(&self) -> Result<()> {
        self.call::<bool>(js::HUD_REMOVE, json!(null)).await?;
        Ok(())
    }
}
