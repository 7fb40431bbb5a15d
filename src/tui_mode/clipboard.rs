use anyhow::{Context, Result};

/// Opens the system clipboard on first use and keeps it for the session,
/// so the copied text stays available while tabcalc runs.
#[derive(Default)]
pub struct TotalClipboard {
    inner: Option<arboard::Clipboard>,
}

impl TotalClipboard {
    pub fn set_text(&mut self, text: &str) -> Result<()> {
        if self.inner.is_none() {
            self.inner = Some(arboard::Clipboard::new().context("clipboard unavailable")?);
        }
        if let Some(clipboard) = self.inner.as_mut() {
            clipboard.set_text(text).context("failed to copy to clipboard")?;
        }
        Ok(())
    }
}
