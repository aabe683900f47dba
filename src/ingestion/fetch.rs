//! Fetching source pages and extracting their readable text.

use reqwest::Client;
use scraper::{Html, Selector};
use tracing::debug;
use url::Url;

use crate::types::AskError;

/// Block-level elements whose text is collected paragraph by paragraph.
const BLOCK_SELECTOR: &str = "p, h1, h2, h3, h4, h5, h6, li, pre, blockquote, td";

/// A fetched page reduced to plain text. Lives only until chunking.
#[derive(Clone, Debug)]
pub struct PageDocument {
    pub url: Url,
    pub text: String,
}

/// Fetches `url` and extracts its visible text.
///
/// Non-success statuses and empty extractions are both errors; ingestion has
/// no partial-success contract, so the caller aborts the whole run.
pub async fn fetch_page(client: &Client, url: &Url) -> Result<PageDocument, AskError> {
    let response = client.get(url.clone()).send().await?.error_for_status()?;
    let body = response.text().await?;
    debug!(url = %url, bytes = body.len(), "fetched page");

    let text = extract_text(&body);
    if text.trim().is_empty() {
        return Err(AskError::EmptyDocument(url.clone()));
    }
    Ok(PageDocument {
        url: url.clone(),
        text,
    })
}

/// Reduces an HTML document to plain text.
///
/// Block elements become paragraphs separated by blank lines so the splitter
/// can prefer paragraph boundaries. Documents without block markup (plain
/// text served as HTML) fall back to the whole-document text.
pub fn extract_text(html: &str) -> String {
    let document = Html::parse_document(html);

    let mut paragraphs: Vec<String> = Vec::new();
    if let Ok(selector) = Selector::parse(BLOCK_SELECTOR) {
        for element in document.select(&selector) {
            // Skip containers so nested blocks (li > p) are not collected twice.
            if element
                .children()
                .filter_map(scraper::ElementRef::wrap)
                .any(|child| selector.matches(&child))
            {
                continue;
            }
            let text = collapse_whitespace(&element.text().collect::<String>());
            if !text.is_empty() {
                paragraphs.push(text);
            }
        }
    }

    if paragraphs.is_empty() {
        return collapse_whitespace(&document.root_element().text().collect::<String>());
    }
    paragraphs.join("\n\n")
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_paragraphs_in_document_order() {
        let html = r#"<html><head><title>t</title><style>p { color: red }</style></head>
            <body>
              <h1>Heading</h1>
              <p>First   paragraph
                 with wrapped lines.</p>
              <p>Second paragraph.</p>
              <script>var ignored = true;</script>
            </body></html>"#;

        let text = extract_text(html);
        assert_eq!(
            text,
            "Heading\n\nFirst paragraph with wrapped lines.\n\nSecond paragraph."
        );
        assert!(!text.contains("ignored"));
        assert!(!text.contains("color"));
    }

    #[test]
    fn nested_blocks_are_not_duplicated() {
        let html = "<ul><li><p>Only once.</p></li></ul>";
        assert_eq!(extract_text(html), "Only once.");
    }

    #[test]
    fn plain_text_bodies_fall_back_to_document_text() {
        let text = extract_text("The capital of France is Paris.");
        assert_eq!(text, "The capital of France is Paris.");
    }

    #[tokio::test]
    async fn fetch_propagates_http_errors() {
        let server = httpmock::MockServer::start_async().await;
        let missing = server.mock(|when, then| {
            when.path("/gone");
            then.status(404);
        });

        let client = Client::new();
        let url = Url::parse(&server.url("/gone")).unwrap();
        let result = fetch_page(&client, &url).await;

        missing.assert();
        assert!(matches!(result, Err(AskError::Http(_))));
    }

    #[tokio::test]
    async fn fetch_rejects_pages_with_no_text() {
        let server = httpmock::MockServer::start_async().await;
        server.mock(|when, then| {
            when.path("/empty");
            then.status(200).body("<html><body></body></html>");
        });

        let client = Client::new();
        let url = Url::parse(&server.url("/empty")).unwrap();
        let result = fetch_page(&client, &url).await;
        assert!(matches!(result, Err(AskError::EmptyDocument(_))));
    }
}
