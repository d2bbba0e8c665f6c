//! Example: Fetch and display the link-preview summary of a page

use page_summary::PageSummary;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let url = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "https://example.com".to_string());

    println!("Fetching: {}\n", url);

    let summary = PageSummary::fetch(&url).await?;

    println!("=== Summary ===");
    println!("Type: {:?}", summary.page_type);
    println!("URL: {:?}", summary.url);
    println!("Title: {:?}", summary.title);
    println!("Site name: {:?}", summary.site_name);
    println!("Description: {:?}", summary.description);
    println!("Author: {:?}", summary.author);
    println!("Keywords: {}", summary.keywords.join(", "));

    if let Some(icon) = &summary.icon {
        println!("Icon: {:?} ({}x{})", icon.url, icon.width, icon.height);
    }

    println!("\n=== Images ({}) ===", summary.images.len());
    for (i, img) in summary.images.iter().enumerate() {
        println!(
            "  [{}] {} ({}x{})",
            i,
            img.url.as_deref().unwrap_or("-"),
            img.width,
            img.height
        );
    }

    println!("\n=== JSON ===");
    println!("{}", serde_json::to_string_pretty(&summary)?);

    Ok(())
}
