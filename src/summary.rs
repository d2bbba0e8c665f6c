//! Link-preview summary records
//!
//! [`PageSummary`] is what the extractor produces for one page; it serializes
//! to the JSON shape served by the summary API, omitting unset fields.

use serde::{Deserialize, Serialize};

/// A preview image (or site icon) discovered in the document head.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreviewImage {
    /// Absolute URL of the image, resolved against the page URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    /// Secure (HTTPS) URL of the image
    #[serde(
        default,
        rename = "secureURL",
        skip_serializing_if = "Option::is_none"
    )]
    pub secure_url: Option<String>,

    /// MIME type (e.g., "image/jpeg")
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,

    /// Width in pixels, 0 when unknown
    #[serde(default, skip_serializing_if = "is_zero")]
    pub width: u32,

    /// Height in pixels, 0 when unknown
    #[serde(default, skip_serializing_if = "is_zero")]
    pub height: u32,

    /// Alternative text description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alt: Option<String>,
}

impl PreviewImage {
    /// Create an image with the given URL and nothing else set.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
            ..Default::default()
        }
    }
}

/// Summary metadata for a web page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageSummary {
    /// The type of object from `og:type` (e.g., "website", "article")
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub page_type: Option<String>,

    /// The canonical URL from `og:url`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    /// Document title, or the non-empty `og:title`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    /// The name of the site
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub site_name: Option<String>,

    /// `og:description`, falling back to `<meta name="description">`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,

    /// Trimmed pieces of `<meta name="keywords">`, in source order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub keywords: Vec<String>,

    /// Icon from the last `<link rel="icon">`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<PreviewImage>,

    /// Open Graph images in document order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<PreviewImage>,
}

impl PageSummary {
    /// Create an empty summary.
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if nothing at all was extracted.
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

fn is_zero(value: &u32) -> bool {
    *value == 0
}

/// Store `value` in `field`, treating an empty string as unset.
pub(crate) fn assign(field: &mut Option<String>, value: &str) {
    *field = (!value.is_empty()).then(|| value.to_string());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_summary_serializes_to_empty_object() {
        let summary = PageSummary::new();
        assert!(summary.is_empty());
        assert_eq!(serde_json::to_string(&summary).unwrap(), "{}");
    }

    #[test]
    fn test_json_field_names() {
        let summary = PageSummary {
            page_type: Some("article".to_string()),
            site_name: Some("Example".to_string()),
            images: vec![PreviewImage {
                secure_url: Some("https://x.com/a.png".to_string()),
                mime_type: Some("image/png".to_string()),
                width: 100,
                ..PreviewImage::new("http://x.com/a.png")
            }],
            ..Default::default()
        };

        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["type"], "article");
        assert_eq!(json["siteName"], "Example");
        assert_eq!(json["images"][0]["secureURL"], "https://x.com/a.png");
        assert_eq!(json["images"][0]["type"], "image/png");
        assert_eq!(json["images"][0]["width"], 100);
        assert!(json["images"][0].get("height").is_none());
        assert!(json.get("keywords").is_none());
        assert!(json.get("icon").is_none());
    }

    #[test]
    fn test_deserialize_from_api_shape() {
        let json = r#"{"title":"T","keywords":["a","b"],"icon":{"url":"https://x.com/i.ico","height":16}}"#;
        let summary: PageSummary = serde_json::from_str(json).unwrap();
        assert_eq!(summary.title.as_deref(), Some("T"));
        assert_eq!(summary.keywords, vec!["a", "b"]);
        let icon = summary.icon.unwrap();
        assert_eq!(icon.height, 16);
        assert_eq!(icon.width, 0);
    }

    #[test]
    fn test_assign_treats_empty_as_unset() {
        let mut field = Some("old".to_string());
        assign(&mut field, "");
        assert_eq!(field, None);
        assign(&mut field, "new");
        assert_eq!(field.as_deref(), Some("new"));
    }
}
