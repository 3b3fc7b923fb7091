//! Standalone HTML rendering of a session view
//!
//! Produces the markup a front end would mount for a session's current
//! render state: the sandboxed frame, provider embed markup, a link card or
//! the blocked placeholder. The document variant wraps that body with a
//! small themed stylesheet so it can be opened directly in a browser.

use crate::config::Theme;
use crate::error::{Error, Result};
use crate::render::{EmbedPayloadExecutor, RenderState};
use crate::resolver::LinkCardData;
use crate::session::Session;
use log::info;
use std::path::Path;

/// Render the body markup for `session`.
pub fn render_session_body(session: &Session, executor: &dyn EmbedPayloadExecutor) -> String {
    match session.render().state() {
        RenderState::Initial => {
            r#"<div class="placeholder"><p>Enter a URL to start browsing</p></div>"#.to_string()
        }
        RenderState::Loading => r#"<div class="placeholder"><div class="spinner"></div></div>"#.to_string(),
        RenderState::Iframe => match session.render().surface() {
            Some(surface) => format!(r#"<div class="frame">{}</div>"#, surface.to_html()),
            None => render_blocked(&session.url),
        },
        RenderState::Oembed(data) => format!(
            r#"<div class="oembed-container">{}</div>"#,
            executor.prepare(&data.html).to_html()
        ),
        RenderState::LinkCard(card) => render_link_card(card),
        RenderState::Blocked => render_blocked(&session.url),
    }
}

fn render_link_card(card: &LinkCardData) -> String {
    let mut html = String::from(r#"<div class="link-card">"#);
    if let Some(image) = &card.image_url {
        html.push_str(&format!(
            r#"<div class="link-card-image" style="background-image: url('{}')"></div>"#,
            html_escape(image)
        ));
    }
    html.push_str(r#"<div class="link-card-body">"#);
    if let Some(site) = &card.site_name {
        html.push_str(&format!(r#"<p class="site-name">{}</p>"#, html_escape(site)));
    }
    html.push_str(&format!("<h2>{}</h2>", html_escape(&card.title)));
    if let Some(description) = &card.description {
        html.push_str(&format!(
            r#"<p class="description">{}</p>"#,
            html_escape(description)
        ));
    }
    html.push_str(&format!(
        r#"<p class="url">{url}</p><a class="open-external" href="{url}" target="_blank" rel="noopener noreferrer">Open in New Tab</a></div></div>"#,
        url = html_escape(&card.url)
    ));
    html
}

fn render_blocked(url: &str) -> String {
    format!(
        r#"<div class="blocked"><h2>Content Blocked</h2><p>The website at <strong>{url}</strong> does not allow being displayed in this panel.</p><a class="open-external" href="{url}" target="_blank" rel="noopener noreferrer">Open in New Tab</a></div>"#,
        url = html_escape(url)
    )
}

/// Render a complete HTML document for `session`.
pub fn render_session_document(
    session: &Session,
    executor: &dyn EmbedPayloadExecutor,
    theme: Theme,
) -> String {
    let (background, foreground, muted) = match theme {
        Theme::Light => ("#fafafa", "#18181b", "#71717a"),
        Theme::Dark => ("#18181b", "#f4f4f5", "#a1a1aa"),
    };

    format!(
        r#"<!DOCTYPE html>
<html lang="en" class="{theme_class}">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <meta name="generator" content="Tabshelf">
    <title>{title}</title>
    <style>
body {{ margin: 0; font-family: -apple-system, 'Segoe UI', Helvetica, Arial, sans-serif; background: {background}; color: {foreground}; }}
.frame, .frame iframe {{ width: 100%; height: 100vh; border: 0; }}
.placeholder, .blocked, .oembed-container {{ display: flex; flex-direction: column; align-items: center; justify-content: center; min-height: 100vh; text-align: center; }}
.oembed-container iframe {{ width: 100%; max-width: 42rem; aspect-ratio: 16 / 9; }}
.link-card {{ max-width: 42rem; margin: 4rem auto; border-radius: 8px; overflow: hidden; border: 1px solid {muted}; }}
.link-card-image {{ height: 12rem; background-size: cover; background-position: center; }}
.link-card-body {{ padding: 1.5rem; }}
.site-name, .url {{ color: {muted}; font-size: 0.85rem; }}
.blocked h2 {{ color: #ef4444; }}
.open-external {{ display: inline-block; margin-top: 1.5rem; padding: 0.5rem 1rem; background: #2563eb; color: #fff; border-radius: 8px; text-decoration: none; }}
    </style>
</head>
<body>
{body}
</body>
</html>"#,
        theme_class = theme.label().to_lowercase(),
        title = html_escape(&session.title()),
        background = background,
        foreground = foreground,
        muted = muted,
        body = render_session_body(session, executor),
    )
}

/// Write the session document to `output_path`.
pub fn export_session_to_file(
    session: &Session,
    executor: &dyn EmbedPayloadExecutor,
    theme: Theme,
    output_path: &Path,
) -> Result<()> {
    let html = render_session_document(session, executor, theme);
    std::fs::write(output_path, html).map_err(|e| Error::FileWrite {
        path: output_path.to_path_buf(),
        source: e,
    })?;
    info!("Exported session view to {}", output_path.display());
    Ok(())
}

/// Escape text for HTML content and attribute values.
pub fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::{InertMarkup, ReinstantiateScripts};
    use crate::resolver::{OEmbedData, RenderDecision};
    use crate::session::SessionManager;
    use tempfile::TempDir;

    fn resolved(url: &str, decision: RenderDecision) -> SessionManager {
        let mut manager = SessionManager::new();
        let id = manager.new_session();
        let pending = manager.navigate(id, url).unwrap();
        manager.complete_resolution(&pending, decision);
        manager
    }

    #[test]
    fn test_html_escape() {
        assert_eq!(html_escape("<a href=\"x\">'&'</a>"), "&lt;a href=&quot;x&quot;&gt;&#39;&amp;&#39;&lt;/a&gt;");
    }

    #[test]
    fn test_initial_placeholder() {
        let mut manager = SessionManager::new();
        manager.new_session();
        let body = render_session_body(manager.active().unwrap(), &ReinstantiateScripts);
        assert!(body.contains("Enter a URL to start browsing"));
    }

    #[test]
    fn test_iframe_body_is_sandboxed() {
        let manager = resolved("https://docs.rs", RenderDecision::Iframe);
        let body = render_session_body(manager.active().unwrap(), &ReinstantiateScripts);
        assert!(body.contains("<iframe src=\"https://docs.rs\""));
        assert!(body.contains("allow-same-origin allow-scripts"));
        assert!(body.contains("referrerpolicy=\"no-referrer\""));
    }

    #[test]
    fn test_oembed_scripts_follow_executor() {
        let data = OEmbedData {
            html: "<blockquote>clip</blockquote><script src=\"https://w.example/embed.js\"></script>"
                .to_string(),
            ..Default::default()
        };
        let manager = resolved("https://vimeo.com/1", RenderDecision::Oembed(data));
        let session = manager.active().unwrap();

        let executed = render_session_body(session, &ReinstantiateScripts);
        assert!(executed.contains("<script src=\"https://w.example/embed.js\"></script>"));

        let inert = render_session_body(session, &InertMarkup);
        assert!(!inert.contains("<script"));
        assert!(inert.contains("<blockquote>clip</blockquote>"));
    }

    #[test]
    fn test_link_card_body_escapes_fields() {
        let card = LinkCardData {
            url: "https://example.com".to_string(),
            title: "Fish & <Chips>".to_string(),
            description: Some("Tasty".to_string()),
            image_url: None,
            site_name: Some("Example".to_string()),
        };
        let manager = resolved("https://example.com", RenderDecision::LinkCard(card));
        let body = render_session_body(manager.active().unwrap(), &ReinstantiateScripts);
        assert!(body.contains("<h2>Fish &amp; &lt;Chips&gt;</h2>"));
        assert!(body.contains("Example"));
        assert!(!body.contains("link-card-image"));
    }

    #[test]
    fn test_blocked_body() {
        let manager = resolved("https://example.com", RenderDecision::Blocked);
        let body = render_session_body(manager.active().unwrap(), &ReinstantiateScripts);
        assert!(body.contains("Content Blocked"));
        assert!(body.contains("https://example.com"));
    }

    #[test]
    fn test_document_and_export() {
        let manager = resolved("https://example.com", RenderDecision::Blocked);
        let session = manager.active().unwrap();
        let html = render_session_document(session, &InertMarkup, Theme::Light);
        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("<title>example.com</title>"));
        assert!(html.contains("class=\"light\""));

        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("view.html");
        export_session_to_file(session, &InertMarkup, Theme::Dark, &path).unwrap();
        assert!(std::fs::read_to_string(&path).unwrap().contains("class=\"dark\""));
    }
}
