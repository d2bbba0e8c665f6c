//! # page-summary
//!
//! Fetch a web page and summarize its head metadata for link previews:
//! title, description, author, keywords, site icon and OpenGraph images.
//!
//! ## Features
//!
//! - Single forward scan over the document head; stops at `</head>`
//! - OpenGraph tags take precedence over `<title>` and generic `<meta>` tags
//! - Relative image and icon URLs resolved against the page URL
//! - Streaming tokenizer, so only the head of large pages is downloaded
//! - Optional HTTP API server (`server` feature)
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use page_summary::PageSummary;
//!
//! #[tokio::main]
//! async fn main() -> page_summary::Result<()> {
//!     let summary = PageSummary::fetch("https://example.org").await?;
//!
//!     println!("Title: {:?}", summary.title);
//!     println!("Images: {}", summary.images.len());
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Parsing Local HTML
//!
//! ```rust
//! use page_summary::PageSummary;
//!
//! let html = r#"<html><head>
//!     <title>Hello</title>
//!     <meta property="og:image" content="/cover.png">
//! </head><body>World</body></html>"#;
//! let summary = PageSummary::from_html(html, "https://example.org/post");
//! assert_eq!(summary.title.as_deref(), Some("Hello"));
//! assert_eq!(summary.images[0].url.as_deref(), Some("https://example.org/cover.png"));
//! ```
//!
//! ## Without HTTP (parsing only)
//!
//! ```toml
//! [dependencies]
//! page-summary = { version = "1.0", default-features = false }
//! ```

mod error;
mod extract;
mod summary;
mod token;

#[cfg(feature = "http")]
mod http;

#[cfg(feature = "server")]
pub mod server;

pub use error::{Error, Result};
pub use extract::{
    MetaKey, SummaryExtractor, extract, extract_from_reader, parse_icon_sizes, resolve_meta_key,
    split_keywords,
};
pub use summary::{PageSummary, PreviewImage};
pub use token::{
    Attribute, HtmlTokenizer, ReaderTokens, Tag, Token, TokenError, tokenize, tokenize_str,
};

#[cfg(feature = "http")]
pub use http::{HttpOptions, PageStream, extract_from_stream, fetch};

use std::fs::File;
use std::path::Path;

impl PageSummary {
    /// Summarize an in-memory HTML document.
    ///
    /// `page_url` is the base for resolving relative image and icon URLs.
    pub fn from_html(html: &str, page_url: &str) -> Self {
        extract_from_reader(page_url, html.as_bytes())
    }

    /// Summarize an HTML file, reading only as far as the end of its head.
    pub fn from_file(path: impl AsRef<Path>, page_url: &str) -> Result<Self> {
        let file = File::open(path)?;
        Ok(extract_from_reader(page_url, file))
    }
}

#[cfg(feature = "http")]
impl PageSummary {
    /// Fetch a page with default options and summarize it.
    pub async fn fetch(url: &str) -> Result<Self> {
        Self::fetch_with_options(url, &HttpOptions::default()).await
    }

    /// Fetch a page with custom HTTP options and summarize it.
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// use std::time::Duration;
    /// use page_summary::{HttpOptions, PageSummary};
    ///
    /// #[tokio::main]
    /// async fn main() -> page_summary::Result<()> {
    ///     let options = HttpOptions::new()
    ///         .timeout(Duration::from_secs(5))
    ///         .user_agent("PreviewBot/1.0");
    ///
    ///     let summary = PageSummary::fetch_with_options("https://example.org", &options).await?;
    ///     println!("{:?}", summary.description);
    ///     Ok(())
    /// }
    /// ```
    pub async fn fetch_with_options(url: &str, options: &HttpOptions) -> Result<Self> {
        let stream = fetch(url, options).await?;
        Ok(extract_from_stream(url, stream).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::Write;

    #[test]
    fn test_from_html_stops_at_head() {
        let html = r#"
            <html>
            <head>
                <meta name="keywords" content="rust, html">
            </head>
            <body>
                <meta name="keywords" content="body">
            </body>
            </html>
        "#;

        let summary = PageSummary::from_html(html, "https://example.com/");
        assert_eq!(summary.keywords, vec!["rust", "html"]);
    }

    #[test]
    fn test_sample_document() {
        let html = include_str!("../test_data/sample.html");
        let summary =
            PageSummary::from_html(html, "https://blog.example.com/posts/streaming-tokenizer");

        assert_eq!(summary.page_type.as_deref(), Some("article"));
        assert_eq!(summary.site_name.as_deref(), Some("Example Engineering"));
        assert_eq!(
            summary.title.as_deref(),
            Some("Streaming Tokenizers in Practice")
        );
        assert_eq!(
            summary.description.as_deref(),
            Some("Why link previews only need the document head.")
        );
        assert_eq!(summary.author.as_deref(), Some("Jane Doe"));
        assert_eq!(summary.keywords, vec!["html", "tokenizer", "streaming", "rust"]);

        assert_eq!(summary.images.len(), 2);
        let cover = &summary.images[0];
        assert_eq!(
            cover.url.as_deref(),
            Some("https://blog.example.com/images/cover.jpg")
        );
        assert_eq!(cover.mime_type.as_deref(), Some("image/jpeg"));
        assert_eq!((cover.width, cover.height), (1200, 630));
        assert_eq!(cover.alt.as_deref(), Some("A river of angle brackets"));
        let thumb = &summary.images[1];
        assert_eq!(
            thumb.url.as_deref(),
            Some("https://blog.example.com/posts/thumbs/cover-small.jpg")
        );
        assert_eq!((thumb.width, thumb.height), (300, 158));
        assert_eq!(thumb.alt, None);

        let icon = summary.icon.unwrap();
        assert_eq!(
            icon.url.as_deref(),
            Some("https://blog.example.com/favicon-32.png")
        );
        assert_eq!(icon.mime_type.as_deref(), Some("image/png"));
        assert_eq!((icon.width, icon.height), (32, 32));
    }

    #[test]
    fn test_from_file() {
        let path = std::env::temp_dir().join(format!("page-summary-{}.html", std::process::id()));
        let mut file = File::create(&path).unwrap();
        write!(file, "<head><title>From disk</title></head>").unwrap();
        drop(file);

        let summary = PageSummary::from_file(&path, "https://example.com/").unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(summary.title.as_deref(), Some("From disk"));
    }

    #[test]
    fn test_from_missing_file() {
        let err = PageSummary::from_file("/definitely/not/here.html", "https://example.com/")
            .unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }
}
