//! `voxloop serve`: start the HTTP endpoint.

use voxloop_config::AppConfig;

pub async fn run(mut config: AppConfig, port_override: Option<u16>) -> anyhow::Result<()> {
    if let Some(port) = port_override {
        config.gateway.port = port;
    }

    println!("voxloop gateway");
    println!("   Listening: {}:{}", config.gateway.host, config.gateway.port);
    println!("   History:   {}", config.history.backend);

    voxloop_gateway::start(config)
        .await
        .map_err(|e| anyhow::anyhow!("Gateway failed: {e}"))
}
