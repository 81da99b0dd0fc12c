// --- Action Helper Functions ---
// Side effects the reports screen performs outside the tracker.

use anyhow::{bail, Context, Result};
use log::info;

// Copy the full error text so it can be pasted into a support ticket
pub fn copy_to_clipboard(text: &str) -> Result<()> {
    let mut clipboard = arboard::Clipboard::new().context("Failed to access clipboard")?;
    clipboard
        .set_text(text.to_string())
        .context("Failed to write to clipboard")?;
    info!("Action: copied {} characters to clipboard", text.len());
    Ok(())
}

// Open the reporting site in the default browser
pub fn open_reporting_site(url: &str) -> Result<()> {
    let url = url.trim();
    if url.is_empty() {
        bail!("Reporting URL not configured");
    }
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        bail!("Reporting URL must be http or https: {}", url);
    }
    info!("Action: opening {}", url);
    opener::open_browser(url).with_context(|| format!("Failed to open {}", url))
}
