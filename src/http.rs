//! HTTP fetcher for pages to summarize
//!
//! [`fetch`] makes a single GET request and hands back the body as a
//! [`PageStream`] only if the response is a successful HTML page.
//! [`extract_from_stream`] then tokenizes that body on the blocking pool as
//! it arrives, so a summary is complete as soon as `</head>` is read.

use std::io;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::time::Duration;

use bytes::Bytes;
use futures_util::StreamExt;
use futures_util::stream::BoxStream;
use reqwest::Client;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio_util::io::{StreamReader, SyncIoBridge};
use tracing::{debug, warn};
use url::Url;

use crate::error::{Error, Result};
use crate::extract::extract_from_reader;
use crate::summary::PageSummary;

const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_MAX_BODY_SIZE: usize = 10 * 1024 * 1024; // 10 MB
const HTML_MEDIA_TYPE: &str = "text/html";

/// Configuration for page requests.
#[derive(Debug, Clone)]
pub struct HttpOptions {
    /// Request timeout, covering connect and body reads
    pub timeout: Duration,

    /// Maximum number of body bytes read before the page is treated as
    /// ended. Default: 10 MB.
    pub max_body_size: usize,

    /// Block requests to private/internal IP addresses (SSRF protection).
    ///
    /// When enabled, requests to localhost, private networks (10.x, 172.16-31.x, 192.168.x),
    /// link-local addresses, and cloud metadata endpoints (169.254.x) are blocked.
    /// Default: true.
    pub block_private_ips: bool,

    /// User-Agent header
    pub user_agent: String,
}

impl Default for HttpOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            max_body_size: DEFAULT_MAX_BODY_SIZE,
            block_private_ips: true,
            user_agent: format!("page-summary/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl HttpOptions {
    /// Create a new HttpOptions with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the maximum number of body bytes to read.
    pub fn max_body_size(mut self, size: usize) -> Self {
        self.max_body_size = size;
        self
    }

    /// Set whether to block requests to private/internal IP addresses.
    ///
    /// **Security Note:** Disabling this exposes the fetcher to SSRF attacks
    /// if URLs come from untrusted clients.
    pub fn block_private_ips(mut self, block: bool) -> Self {
        self.block_private_ips = block;
        self
    }

    /// Set the User-Agent header.
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    fn build_client(&self) -> Result<Client> {
        let client = Client::builder()
            .timeout(self.timeout)
            .user_agent(&self.user_agent)
            .build()?;
        Ok(client)
    }
}

type BodyReader = StreamReader<BoxStream<'static, io::Result<Bytes>>, Bytes>;

/// Body of a fetched HTML page.
///
/// Owns the underlying connection; dropping the stream releases it whether
/// or not the body was read to the end.
pub struct PageStream {
    url: String,
    content_type: String,
    body: BodyReader,
    max_body_size: usize,
}

impl std::fmt::Debug for PageStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageStream")
            .field("url", &self.url)
            .field("content_type", &self.content_type)
            .field("max_body_size", &self.max_body_size)
            .finish_non_exhaustive()
    }
}

impl PageStream {
    /// The final URL after following redirects.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// The declared `Content-Type` header.
    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    /// The body as an async reader that ends at the body size limit.
    pub fn into_reader(self) -> impl AsyncRead + Send + Unpin + 'static {
        self.body.take(self.max_body_size as u64)
    }
}

/// Check if an IPv4 address is private/internal.
fn is_private_ipv4(ip: Ipv4Addr) -> bool {
    ip.is_loopback()                           // 127.0.0.0/8
        || ip.is_private()                     // 10.0.0.0/8, 172.16.0.0/12, 192.168.0.0/16
        || ip.is_link_local()                  // 169.254.0.0/16 (includes cloud metadata)
        || ip.is_broadcast()                   // 255.255.255.255
        || ip.is_unspecified()                 // 0.0.0.0
        || ip.is_documentation()               // 192.0.2.0/24, 198.51.100.0/24, 203.0.113.0/24
        || ip.octets()[0] == 0                 // 0.0.0.0/8
        || ip.octets()[0] >= 224 // Multicast and reserved (224.0.0.0+)
}

/// Check if an IPv6 address is private/internal.
fn is_private_ipv6(ip: Ipv6Addr) -> bool {
    ip.is_loopback()                           // ::1
        || ip.is_unspecified()                 // ::
        || ip.is_multicast()                   // ff00::/8
        // IPv4-mapped addresses (::ffff:0:0/96)
        || ip.to_ipv4_mapped().is_some_and(is_private_ipv4)
        // Unique local (fc00::/7)
        || (ip.segments()[0] & 0xfe00) == 0xfc00
        // Link-local (fe80::/10)
        || (ip.segments()[0] & 0xffc0) == 0xfe80
}

/// Check if an IP address is private/internal.
fn is_private_ip(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => is_private_ipv4(v4),
        IpAddr::V6(v6) => is_private_ipv6(v6),
    }
}

/// Validate URL for SSRF protection (async DNS resolution).
async fn validate_url_for_ssrf(url: &str) -> Result<()> {
    let parsed = Url::parse(url).map_err(|e| Error::InvalidUrl(e.to_string()))?;

    // Only allow http and https schemes
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(Error::InvalidUrl(format!(
            "unsupported scheme '{}', only http/https allowed",
            parsed.scheme()
        )));
    }

    let host = parsed
        .host_str()
        .ok_or_else(|| Error::InvalidUrl("missing host".to_string()))?;

    // Block obviously internal hostnames
    let host_lower = host.to_lowercase();
    if host_lower == "localhost"
        || host_lower.ends_with(".local")
        || host_lower.ends_with(".internal")
    {
        return Err(Error::SsrfBlocked(format!(
            "blocked request to internal host: {}",
            host
        )));
    }

    // Resolve hostname and check all IP addresses
    let port = parsed.port_or_known_default().unwrap_or(80);
    if let Ok(addrs) = tokio::net::lookup_host((host, port)).await {
        for addr in addrs {
            if is_private_ip(addr.ip()) {
                return Err(Error::SsrfBlocked(format!(
                    "blocked request to private IP: {} (resolved from {})",
                    addr.ip(),
                    host
                )));
            }
        }
    }
    // If DNS resolution fails, let reqwest report it

    Ok(())
}

fn is_html(content_type: &str) -> bool {
    content_type
        .get(..HTML_MEDIA_TYPE.len())
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case(HTML_MEDIA_TYPE))
}

/// Fetch `url` and return its body if it is a successful HTML response.
///
/// Fails on transport errors, on any status >= 400, and when the
/// `Content-Type` does not start with `text/html`. One attempt, no retries.
pub async fn fetch(url: &str, options: &HttpOptions) -> Result<PageStream> {
    if options.block_private_ips {
        validate_url_for_ssrf(url).await?;
    }

    debug!(url, "fetching page");
    let client = options.build_client()?;
    let response = client.get(url).send().await?;

    let status = response.status();
    if status.as_u16() >= 400 {
        debug!(url, status = status.as_u16(), "page request failed");
        return Err(Error::HttpStatus(status.as_u16()));
    }

    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    if !is_html(&content_type) {
        debug!(url, content_type = %content_type, "not an HTML page");
        return Err(Error::InvalidContentType(content_type));
    }

    let final_url = response.url().to_string();
    let body = response
        .bytes_stream()
        .map(|chunk| chunk.map_err(io::Error::other))
        .boxed();

    Ok(PageStream {
        url: final_url,
        content_type,
        body: StreamReader::new(body),
        max_body_size: options.max_body_size,
    })
}

/// Tokenize a fetched body as it arrives and extract its summary.
///
/// The tokenizer runs on the blocking pool, pulling body chunks through a
/// sync bridge. Reading stops at `</head>`; a failing body read ends the
/// scan with whatever was collected so far.
pub async fn extract_from_stream(page_url: &str, stream: PageStream) -> PageSummary {
    let reader = SyncIoBridge::new(stream.into_reader());
    let page_url = page_url.to_string();

    match tokio::task::spawn_blocking(move || extract_from_reader(&page_url, reader)).await {
        Ok(summary) => summary,
        Err(err) if err.is_panic() => std::panic::resume_unwind(err.into_panic()),
        Err(err) => {
            warn!(error = %err, "summary extraction was cancelled");
            PageSummary::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const PAGE: &str = r#"<!DOCTYPE html>
        <html>
        <head>
            <title>Mock Page</title>
            <meta property="og:image" content="/cover.jpg">
            <link rel="icon" href="favicon.ico">
        </head>
        <body><meta name="author" content="ignored"></body>
        </html>"#;

    fn local_options() -> HttpOptions {
        HttpOptions::new().block_private_ips(false)
    }

    async fn serve(template: ResponseTemplate) -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/page"))
            .respond_with(template)
            .mount(&server)
            .await;
        server
    }

    #[test]
    fn test_default_options() {
        let options = HttpOptions::default();
        assert_eq!(options.timeout, Duration::from_secs(DEFAULT_TIMEOUT_SECS));
        assert_eq!(options.max_body_size, DEFAULT_MAX_BODY_SIZE);
        assert!(options.block_private_ips);
        assert!(options.user_agent.starts_with("page-summary/"));
    }

    #[test]
    fn test_builder_pattern() {
        let options = HttpOptions::new()
            .timeout(Duration::from_secs(60))
            .max_body_size(1024)
            .block_private_ips(false)
            .user_agent("Custom Agent");

        assert_eq!(options.timeout, Duration::from_secs(60));
        assert_eq!(options.max_body_size, 1024);
        assert!(!options.block_private_ips);
        assert_eq!(options.user_agent, "Custom Agent");
    }

    fn assert_send<T: Send>(_: &T) {}

    #[test]
    fn test_fetch_futures_are_send() {
        // Handlers hand these futures to a multi-threaded runtime
        let options = local_options();
        assert_send(&fetch("https://example.com/", &options));
        assert_send(&PageSummary::fetch_with_options("https://example.com/", &options));
    }

    #[test]
    fn test_is_html() {
        assert!(is_html("text/html"));
        assert!(is_html("text/html; charset=utf-8"));
        assert!(is_html("Text/HTML"));
        assert!(!is_html("application/json"));
        assert!(!is_html("text/plain"));
        assert!(!is_html(""));
    }

    #[tokio::test]
    async fn test_fetch_html_page() {
        let server = serve(ResponseTemplate::new(200).set_body_raw(PAGE, "text/html; charset=utf-8")).await;
        let url = format!("{}/page", server.uri());

        let stream = fetch(&url, &local_options()).await.unwrap();
        assert_eq!(stream.url(), url);
        assert!(stream.content_type().starts_with("text/html"));
    }

    #[tokio::test]
    async fn test_fetch_rejects_error_status() {
        let server = serve(ResponseTemplate::new(404).set_body_raw(PAGE, "text/html")).await;
        let url = format!("{}/page", server.uri());

        let err = fetch(&url, &local_options()).await.unwrap_err();
        assert!(matches!(err, Error::HttpStatus(404)));
    }

    #[tokio::test]
    async fn test_fetch_rejects_non_html() {
        let server = serve(ResponseTemplate::new(200).set_body_raw("{}", "application/json")).await;
        let url = format!("{}/page", server.uri());

        let err = fetch(&url, &local_options()).await.unwrap_err();
        assert!(matches!(err, Error::InvalidContentType(ct) if ct == "application/json"));
    }

    #[tokio::test]
    async fn test_fetch_transport_error() {
        // Nothing listens on the discard port
        let err = fetch("http://127.0.0.1:9/page", &local_options())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Http(_)));
    }

    #[tokio::test]
    async fn test_fetch_blocks_local_server_by_default() {
        let server = serve(ResponseTemplate::new(200).set_body_raw(PAGE, "text/html")).await;
        let url = format!("{}/page", server.uri());

        let err = fetch(&url, &HttpOptions::default()).await.unwrap_err();
        assert!(matches!(err, Error::SsrfBlocked(_)));
    }

    #[tokio::test]
    async fn test_extract_from_stream() {
        let server = serve(ResponseTemplate::new(200).set_body_raw(PAGE, "text/html")).await;
        let url = format!("{}/page", server.uri());

        let stream = fetch(&url, &local_options()).await.unwrap();
        let summary = extract_from_stream(&url, stream).await;

        assert_eq!(summary.title.as_deref(), Some("Mock Page"));
        assert_eq!(
            summary.images[0].url.as_deref(),
            Some(format!("{}/cover.jpg", server.uri()).as_str())
        );
        assert_eq!(
            summary.icon.unwrap().url.as_deref(),
            Some(format!("{}/favicon.ico", server.uri()).as_str())
        );
        assert_eq!(summary.author, None);
    }

    #[tokio::test]
    async fn test_body_limit_ends_extraction() {
        let server = serve(ResponseTemplate::new(200).set_body_raw(PAGE, "text/html")).await;
        let url = format!("{}/page", server.uri());
        let cutoff = PAGE.find("<meta").unwrap();

        let stream = fetch(&url, &local_options().max_body_size(cutoff))
            .await
            .unwrap();
        let summary = extract_from_stream(&url, stream).await;

        assert_eq!(summary.title.as_deref(), Some("Mock Page"));
        assert!(summary.images.is_empty());
        assert_eq!(summary.icon, None);
    }

    #[tokio::test]
    async fn test_extract_from_stream_on_spawned_task() {
        let server = serve(ResponseTemplate::new(200).set_body_raw(PAGE, "text/html")).await;
        let url = format!("{}/page", server.uri());

        let stream = fetch(&url, &local_options()).await.unwrap();
        let task_url = url.clone();
        let summary = tokio::spawn(async move { extract_from_stream(&task_url, stream).await })
            .await
            .unwrap();

        assert_eq!(summary.title.as_deref(), Some("Mock Page"));
    }

    #[tokio::test]
    async fn test_ssrf_blocks_localhost() {
        let result = validate_url_for_ssrf("http://localhost/").await;
        assert!(result.unwrap_err().to_string().contains("internal host"));
    }

    #[tokio::test]
    async fn test_ssrf_blocks_private_ip() {
        let result = validate_url_for_ssrf("http://192.168.1.1/").await;
        assert!(result.unwrap_err().to_string().contains("private IP"));
    }

    #[tokio::test]
    async fn test_ssrf_blocks_metadata_endpoint() {
        let result = validate_url_for_ssrf("http://169.254.169.254/").await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_ssrf_blocks_internal_domain() {
        let result = validate_url_for_ssrf("http://server.local/").await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_ssrf_blocks_file_scheme() {
        let result = validate_url_for_ssrf("file:///etc/passwd").await;
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("unsupported scheme")
        );
    }

    #[test]
    fn test_private_ip_detection() {
        assert!(is_private_ipv4(Ipv4Addr::new(127, 0, 0, 1)));
        assert!(is_private_ipv4(Ipv4Addr::new(10, 0, 0, 1)));
        assert!(is_private_ipv4(Ipv4Addr::new(172, 16, 0, 1)));
        assert!(is_private_ipv4(Ipv4Addr::new(169, 254, 169, 254)));
        assert!(!is_private_ipv4(Ipv4Addr::new(8, 8, 8, 8)));
        assert!(is_private_ipv6(Ipv6Addr::LOCALHOST));
        assert!(is_private_ipv6("fe80::1".parse().unwrap()));
        assert!(is_private_ipv6("fc00::1".parse().unwrap()));
        assert!(!is_private_ipv6("2607:f8b0:4004:800::200e".parse().unwrap()));
    }
}
