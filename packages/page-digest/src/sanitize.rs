//! Content sanitizer: raw HTML → real meaningful content.
//!
//! Script, style and noscript subtrees are skipped before any text is
//! collected, so their contents never reach the output. The parser keeps
//! noscript children as raw markup text, so they are dropped with it. The
//! remaining text nodes are trimmed, joined with single spaces in document
//! order, and whitespace runs are collapsed.

use scraper::Html;
use tracing::debug;

use crate::error::{DigestError, Result};
use crate::types::document::{RawDocument, Rmc};

/// Elements whose text is never content.
const STRIPPED_ELEMENTS: &[&str] = &["script", "style", "noscript"];

/// Sanitize raw HTML (or plain text) into [`Rmc`].
///
/// Fails with [`DigestError::EmptyContent`] when nothing but whitespace
/// remains.
pub fn sanitize(raw: &str) -> Result<Rmc> {
    let document = Html::parse_document(raw);

    let mut pieces: Vec<&str> = Vec::new();
    for node in document.tree.root().descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };
        let inside_stripped = node.ancestors().any(|ancestor| {
            ancestor
                .value()
                .as_element()
                .is_some_and(|el| STRIPPED_ELEMENTS.contains(&el.name()))
        });
        if inside_stripped {
            continue;
        }
        let trimmed = text.trim();
        if !trimmed.is_empty() {
            pieces.push(trimmed);
        }
    }

    let content = collapse_whitespace(pieces.into_iter());
    debug!(
        raw_len = raw.len(),
        content_len = content.len(),
        "sanitized document"
    );
    finish(content)
}

/// Sanitize a fetched document, honouring a plain-text content type.
pub fn sanitize_document(document: &RawDocument) -> Result<Rmc> {
    let is_plain_text = document
        .content_type
        .as_deref()
        .is_some_and(|ct| ct.trim_start().starts_with("text/plain"));

    if is_plain_text {
        finish(collapse_whitespace(std::iter::once(document.body.as_str())))
    } else {
        sanitize(&document.body)
    }
}

fn collapse_whitespace<'a>(pieces: impl Iterator<Item = &'a str>) -> String {
    pieces
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

fn finish(content: String) -> Result<Rmc> {
    if content.is_empty() {
        return Err(DigestError::EmptyContent);
    }
    Ok(Rmc::new_unchecked(content))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_script_only_document_is_empty() {
        let err = sanitize("<html><body><script>x=1</script></body></html>").unwrap_err();
        assert!(matches!(err, DigestError::EmptyContent));
    }

    #[test]
    fn test_style_and_script_text_never_extracted() {
        let html = r#"
            <html>
              <head><style>body { color: red; }</style></head>
              <body>
                <h1>Title</h1>
                <script type="text/javascript">var secret = "hidden";</script>
                <p>Paragraph <b>bold</b> text.</p>
              </body>
            </html>
        "#;

        let rmc = sanitize(html).unwrap();

        assert_eq!(rmc.as_str(), "Title Paragraph bold text.");
        assert!(!rmc.contains("secret"));
        assert!(!rmc.contains("color"));
    }

    #[test]
    fn test_noscript_markup_never_extracted() {
        let html = r#"<p>Hello world.</p><noscript><img height="1" width="1" src="https://t.example/tr?id=1"/></noscript>"#;

        let rmc = sanitize(html).unwrap();

        assert_eq!(rmc.as_str(), "Hello world.");
        assert!(!rmc.contains("<img"));
    }

    #[test]
    fn test_whitespace_collapsed_in_document_order() {
        let html = "<div>  first\n\n  line </div><div>\tsecond</div>   <p>third</p>";
        let rmc = sanitize(html).unwrap();
        assert_eq!(rmc.as_str(), "first line second third");
    }

    #[test]
    fn test_whitespace_only_is_empty() {
        assert!(matches!(
            sanitize("<p>   </p>\n<div>\t</div>"),
            Err(DigestError::EmptyContent)
        ));
        assert!(matches!(sanitize(""), Err(DigestError::EmptyContent)));
    }

    #[test]
    fn test_plain_text_passes_through() {
        let rmc = sanitize("Just a sentence   with spaces.").unwrap();
        assert_eq!(rmc.as_str(), "Just a sentence with spaces.");
    }

    #[test]
    fn test_entities_decoded() {
        let rmc = sanitize("<p>Fish &amp; Chips &lt;3</p>").unwrap();
        assert_eq!(rmc.as_str(), "Fish & Chips <3");
    }

    #[test]
    fn test_plain_text_content_type_skips_html_parsing() {
        let doc = RawDocument::new("a <script> tag   is text here").with_content_type("text/plain");
        let rmc = sanitize_document(&doc).unwrap();
        assert_eq!(rmc.as_str(), "a <script> tag is text here");

        let html = RawDocument::new("<p>hello</p>").with_content_type("text/html; charset=utf-8");
        assert_eq!(sanitize_document(&html).unwrap().as_str(), "hello");
    }
}
