//! Session View Export Module for Tabshelf
//!
//! # Architecture
//!
//! - `html.rs` - Standalone HTML rendering of a session's current view
//! - `clipboard.rs` - Platform clipboard operations

pub mod clipboard;
pub mod html;

pub use clipboard::{copy_text_to_clipboard, copy_url_to_clipboard, ClipboardError};
pub use html::{export_session_to_file, html_escape, render_session_body, render_session_document};
