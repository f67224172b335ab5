use anyhow::Result;

use cinehub::HubConfig;

pub async fn cmd_serve(config: HubConfig) -> Result<()> {
    cinehub::server::serve(config).await
}
