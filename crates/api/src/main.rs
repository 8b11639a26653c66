use anyhow::Context;

use estate_infra::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    estate_observability::init();

    let config = Config::from_env().context("failed to load configuration")?;
    estate_api::server::run(config).await
}
