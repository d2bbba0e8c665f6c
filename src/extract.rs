//! Summary extraction
//!
//! A single forward scan over a [`Token`] sequence that accumulates a
//! [`PageSummary`]. The scan stops at `</head>` or at the first error token,
//! whichever comes first; whatever was collected up to that point is the
//! result. Nothing in here fails: malformed attributes and unparsable numbers
//! only leave the affected field unset.

use std::io::Read;
use std::ops::ControlFlow;

use tracing::debug;
use url::Url;

use crate::summary::{PageSummary, PreviewImage, assign};
use crate::token::{self, Tag, Token, TokenError};

/// The summary field a `<meta>` element's content is written to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetaKey {
    Type,
    Url,
    SiteName,
    Title,
    Description,
    ImageUrl,
    ImageSecureUrl,
    ImageType,
    ImageWidth,
    ImageHeight,
    ImageAlt,
    Author,
    Keywords,
}

/// Open Graph properties in precedence order. `og:image` is the only entry
/// that starts a new image; the rest modify the latest one.
const OPENGRAPH_KEYS: &[(&str, MetaKey)] = &[
    ("og:type", MetaKey::Type),
    ("og:url", MetaKey::Url),
    ("og:site_name", MetaKey::SiteName),
    ("og:title", MetaKey::Title),
    ("og:description", MetaKey::Description),
    ("og:image", MetaKey::ImageUrl),
    ("og:image:secure_url", MetaKey::ImageSecureUrl),
    ("og:image:type", MetaKey::ImageType),
    ("og:image:width", MetaKey::ImageWidth),
    ("og:image:height", MetaKey::ImageHeight),
    ("og:image:alt", MetaKey::ImageAlt),
];

/// Pick the field for a `<meta>` element.
///
/// The `property` lookup runs first; a recognized `name` then overrides it.
/// `name="description"` only applies while no description has been set.
pub fn resolve_meta_key(
    property: Option<&str>,
    name: Option<&str>,
    has_description: bool,
) -> Option<MetaKey> {
    let by_property = property.and_then(|property| {
        OPENGRAPH_KEYS
            .iter()
            .find(|(og, _)| *og == property)
            .map(|(_, key)| *key)
    });

    let by_name = match name {
        Some("author") => Some(MetaKey::Author),
        Some("keywords") => Some(MetaKey::Keywords),
        Some("description") if !has_description => Some(MetaKey::Description),
        _ => None,
    };

    by_name.or(by_property)
}

/// Split a comma-delimited keywords list, trimming each piece.
pub fn split_keywords(content: &str) -> Vec<String> {
    content.split(',').map(|k| k.trim().to_string()).collect()
}

/// Parse an icon `sizes` value. The part before the first `x` is the height
/// and the part after it the width; each is `None` if it does not parse.
pub fn parse_icon_sizes(sizes: &str) -> Option<(Option<u32>, Option<u32>)> {
    let (height, width) = sizes.split_once('x')?;
    Some((height.parse().ok(), width.parse().ok()))
}

/// Incremental extractor state for one page.
///
/// Feed tokens with [`consume`](Self::consume) until it returns
/// [`ControlFlow::Break`], then take the result with
/// [`finish`](Self::finish).
#[derive(Debug)]
pub struct SummaryExtractor {
    page_url: String,
    base: Option<Url>,
    summary: PageSummary,
    in_title: bool,
    done: bool,
}

impl SummaryExtractor {
    pub fn new(page_url: &str) -> Self {
        Self {
            page_url: page_url.to_string(),
            base: Url::parse(page_url).ok(),
            summary: PageSummary::default(),
            in_title: false,
            done: false,
        }
    }

    /// The summary collected so far.
    pub fn summary(&self) -> &PageSummary {
        &self.summary
    }

    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Apply one token. Returns `Break` once the scan is over; tokens after
    /// that are ignored.
    pub fn consume(&mut self, token: Token) -> ControlFlow<()> {
        if self.done {
            return ControlFlow::Break(());
        }

        // Only the token right after `<title>` can supply the title text
        let after_title = std::mem::take(&mut self.in_title);

        match token {
            Token::Error(TokenError::Eof) => return self.stop("end of input"),
            Token::Error(err) => {
                debug!(page_url = %self.page_url, error = %err, "token stream failed, keeping partial summary");
                return self.stop("token error");
            }
            Token::EndTag(name) if name == "head" => return self.stop("end of head"),
            Token::Text(text) if after_title => {
                if self.summary.title.is_none() {
                    assign(&mut self.summary.title, &text);
                }
            }
            Token::StartTag(tag) | Token::SelfClosingTag(tag) => match tag.name.as_str() {
                "title" => self.in_title = true,
                "meta" => self.apply_meta(&tag),
                "link" => self.apply_link(&tag),
                _ => {}
            },
            _ => {}
        }

        ControlFlow::Continue(())
    }

    /// Take the summary, ending the scan.
    pub fn finish(self) -> PageSummary {
        self.summary
    }

    fn stop(&mut self, reason: &str) -> ControlFlow<()> {
        debug!(page_url = %self.page_url, reason, "summary extraction finished");
        self.done = true;
        ControlFlow::Break(())
    }

    fn apply_meta(&mut self, tag: &Tag) {
        // `og:image` opens a new image even when `name` picks another field
        if tag.get("property") == Some("og:image") {
            self.summary.images.push(PreviewImage::default());
        }

        let Some(key) = resolve_meta_key(
            tag.get("property"),
            tag.get("name"),
            self.summary.description.is_some(),
        ) else {
            return;
        };
        let content = tag.get("content").unwrap_or_default();
        let summary = &mut self.summary;

        match key {
            MetaKey::Type => assign(&mut summary.page_type, content),
            MetaKey::Url => assign(&mut summary.url, content),
            MetaKey::SiteName => assign(&mut summary.site_name, content),
            MetaKey::Author => assign(&mut summary.author, content),
            MetaKey::Description => assign(&mut summary.description, content),
            MetaKey::Title => {
                if !content.is_empty() {
                    assign(&mut summary.title, content);
                }
            }
            MetaKey::Keywords => summary.keywords = split_keywords(content),
            MetaKey::ImageUrl => {
                let url = resolve(self.base.as_ref(), content);
                if let Some(image) = summary.images.last_mut() {
                    assign(&mut image.url, &url);
                }
            }
            MetaKey::ImageSecureUrl => {
                let url = resolve(self.base.as_ref(), content);
                if let Some(image) = summary.images.last_mut() {
                    assign(&mut image.secure_url, &url);
                }
            }
            MetaKey::ImageType => {
                if let Some(image) = summary.images.last_mut() {
                    assign(&mut image.mime_type, content);
                }
            }
            MetaKey::ImageAlt => {
                if let Some(image) = summary.images.last_mut() {
                    assign(&mut image.alt, content);
                }
            }
            MetaKey::ImageWidth => {
                if let (Some(image), Ok(width)) = (summary.images.last_mut(), content.parse()) {
                    image.width = width;
                }
            }
            MetaKey::ImageHeight => {
                if let (Some(image), Ok(height)) = (summary.images.last_mut(), content.parse()) {
                    image.height = height;
                }
            }
        }
    }

    /// Every `<link>` starts a fresh icon. Attributes only fill it once
    /// `rel="icon"` has been seen earlier in the same tag.
    fn apply_link(&mut self, tag: &Tag) {
        let base = self.base.as_ref();
        let icon = self.summary.icon.insert(PreviewImage::default());
        let mut qualified = false;

        for attr in &tag.attrs {
            if attr.key == "rel" && attr.value == "icon" {
                qualified = true;
            }
            if !qualified {
                continue;
            }
            match attr.key.as_str() {
                "href" => assign(&mut icon.url, &resolve(base, &attr.value)),
                "type" => assign(&mut icon.mime_type, &attr.value),
                "sizes" => {
                    if let Some((height, width)) = parse_icon_sizes(&attr.value) {
                        if let Some(height) = height {
                            icon.height = height;
                        }
                        if let Some(width) = width {
                            icon.width = width;
                        }
                    }
                }
                "alt" => assign(&mut icon.alt, &attr.value),
                _ => {}
            }
        }
    }
}

/// Resolve `reference` against the page URL, keeping it as-is when either
/// side does not parse.
fn resolve(base: Option<&Url>, reference: &str) -> String {
    match base {
        Some(base) => base
            .join(reference)
            .map(|u| u.to_string())
            .unwrap_or_else(|_| reference.to_string()),
        None => reference.to_string(),
    }
}

/// Run the extractor over a token sequence.
///
/// # Example
/// ```
/// use page_summary::{extract, Tag, Token, TokenError};
///
/// let tokens = vec![
///     Token::StartTag(Tag::new("title")),
///     Token::Text("Hello".to_string()),
///     Token::Error(TokenError::Eof),
/// ];
/// let summary = extract("https://example.com/", tokens);
/// assert_eq!(summary.title.as_deref(), Some("Hello"));
/// ```
pub fn extract<I>(page_url: &str, tokens: I) -> PageSummary
where
    I: IntoIterator<Item = Token>,
{
    let mut extractor = SummaryExtractor::new(page_url);
    for token in tokens {
        if extractor.consume(token).is_break() {
            break;
        }
    }
    extractor.finish()
}

/// Tokenize a blocking reader and extract its summary. Reading stops as soon
/// as the document head ends.
pub fn extract_from_reader<R: Read>(page_url: &str, reader: R) -> PageSummary {
    extract(page_url, token::tokenize(reader))
}
