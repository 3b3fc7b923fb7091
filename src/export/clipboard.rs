//! Clipboard Operations
//!
//! Copies session URLs to the system clipboard using the arboard crate.

use arboard::Clipboard;
use log::debug;
use thiserror::Error;

// ─────────────────────────────────────────────────────────────────────────────
// Clipboard Error
// ─────────────────────────────────────────────────────────────────────────────

/// Errors that can occur during clipboard operations.
#[derive(Debug, Error)]
pub enum ClipboardError {
    /// Failed to access clipboard
    #[error("Clipboard access error: {0}")]
    AccessError(String),
    /// Failed to set clipboard content
    #[error("Clipboard write error: {0}")]
    WriteError(String),
    /// Nothing worth copying
    #[error("Nothing to copy")]
    Empty,
}

impl From<arboard::Error> for ClipboardError {
    fn from(err: arboard::Error) -> Self {
        ClipboardError::WriteError(err.to_string())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Clipboard Operations
// ─────────────────────────────────────────────────────────────────────────────

/// Copy plain text to the clipboard.
pub fn copy_text_to_clipboard(text: &str) -> Result<(), ClipboardError> {
    if text.trim().is_empty() {
        return Err(ClipboardError::Empty);
    }
    let mut clipboard =
        Clipboard::new().map_err(|e| ClipboardError::AccessError(e.to_string()))?;
    clipboard.set_text(text.to_string())?;
    debug!("Copied {} bytes to clipboard", text.len());
    Ok(())
}

/// Copy a session URL. Blank sessions have nothing to copy.
pub fn copy_url_to_clipboard(url: &str) -> Result<(), ClipboardError> {
    if crate::url_utils::is_blank(url) {
        return Err(ClipboardError::Empty);
    }
    copy_text_to_clipboard(url)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clipboard_error_display() {
        let err = ClipboardError::AccessError("test".to_string());
        assert!(err.to_string().contains("access error"));

        let err = ClipboardError::WriteError("test".to_string());
        assert!(err.to_string().contains("write error"));
    }

    #[test]
    fn test_clipboard_error_is_std_error() {
        use std::error::Error as _;
        let err: Box<dyn std::error::Error> = Box::new(ClipboardError::Empty);
        assert_eq!(err.to_string(), "Nothing to copy");
        assert!(err.source().is_none());
    }

    #[test]
    fn test_blank_urls_are_not_copied() {
        assert!(matches!(
            copy_url_to_clipboard("about:blank"),
            Err(ClipboardError::Empty)
        ));
        assert!(matches!(copy_text_to_clipboard("  "), Err(ClipboardError::Empty)));
    }
}
