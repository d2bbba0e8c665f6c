//! Page summary API server

use std::net::SocketAddr;
use std::time::Duration;

use clap::Parser;
use page_summary::HttpOptions;
use page_summary::server::{self, LogFormat};

#[derive(Parser)]
#[command(name = "page-summary-server")]
#[command(about = "Serve link-preview summaries of web pages over HTTP")]
#[command(version)]
struct Cli {
    /// Listen address
    #[arg(long, env = "ADDR", default_value = "0.0.0.0:80")]
    addr: SocketAddr,

    /// Timeout for fetching a page, in seconds
    #[arg(long, env = "FETCH_TIMEOUT_SECS", default_value_t = 10)]
    timeout_secs: u64,

    /// Maximum number of page bytes read per request
    #[arg(long, env = "MAX_BODY_SIZE", default_value_t = 10 * 1024 * 1024)]
    max_body_size: usize,

    /// User-Agent sent when fetching pages
    #[arg(long, env = "USER_AGENT")]
    user_agent: Option<String>,

    /// Allow fetching pages on private or loopback addresses
    #[arg(long, env = "ALLOW_PRIVATE_IPS")]
    allow_private_ips: bool,

    /// Log output format
    #[arg(long, env = "LOG_FORMAT", value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    server::init_logging(cli.log_format, "info")?;

    let mut options = HttpOptions::new()
        .timeout(Duration::from_secs(cli.timeout_secs))
        .max_body_size(cli.max_body_size)
        .block_private_ips(!cli.allow_private_ips);
    if let Some(user_agent) = cli.user_agent {
        options = options.user_agent(user_agent);
    }

    server::run(cli.addr, options).await
}
