use anyhow::Result;

use cinehub::{HttpClient, HubConfig, ManifestRegistry, ManifestSource};

pub async fn cmd_providers(config: &HubConfig, all: bool, json: bool) -> Result<()> {
    let registry = ManifestRegistry::from_config(config, HttpClient::new()?);
    let snapshot = registry.refresh().await?;

    let providers: Vec<_> = if all {
        snapshot.providers.iter().collect()
    } else {
        snapshot.enabled().collect()
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&providers)?);
        return Ok(());
    }

    let source = match snapshot.source {
        ManifestSource::Remote => "remote",
        ManifestSource::Fallback => "local fallback",
    };
    println!(
        "📦 {} providers ({source}, fetched {})\n",
        providers.len(),
        snapshot.fetched_at.format("%Y-%m-%d %H:%M:%S UTC")
    );

    let width = providers.iter().map(|p| p.id.len()).max().unwrap_or(0);
    for p in providers {
        let marker = if p.enabled { "✅" } else { "⏸️ " };
        println!(
            "{marker} {:<width$}  {}  [{}] v{}",
            p.id, p.display_name, p.kind, p.version
        );
    }

    Ok(())
}
