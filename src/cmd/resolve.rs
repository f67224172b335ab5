use anyhow::Result;
use tokio_util::sync::CancellationToken;

use cinehub::{ExtractorRegistry, HttpClient, HubConfig, StreamClassifier};

pub async fn cmd_resolve(config: &HubConfig, url: &str) -> Result<()> {
    let classifier = StreamClassifier::new();

    println!("🔗 {url}");
    let Some(service) = classifier.service_for(url) else {
        println!("▶️  Directly playable");
        println!("{url}");
        return Ok(());
    };
    println!("🧩 Hosting page, extractor: {service}");

    let client = HttpClient::new()?.with_fetch_timeout(config.extract_timeout());
    let extractors = ExtractorRegistry::new(client);

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_interrupt.cancel();
        }
    });

    let result = extractors.resolve(service, url, &cancel).await?;
    println!("✅ Direct URL:");
    println!("{}", result.direct_url);

    Ok(())
}
