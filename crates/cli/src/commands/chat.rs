//! `voxloop chat`: run a single turn from the terminal.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use voxloop_config::AppConfig;
use tracing::debug;
use voxloop_core::context::{RequestContext, UserInput};

pub async fn run(
    config: AppConfig,
    chat_id: String,
    date: Option<String>,
    images: Vec<PathBuf>,
    message: String,
) -> anyhow::Result<()> {
    let images = images
        .iter()
        .map(|p| encode_image(p))
        .collect::<anyhow::Result<Vec<_>>>()?;

    let agent = voxloop_gateway::build_agent(&config)
        .await
        .context("Failed to open history")?;

    debug!(chat_id = %chat_id, images = images.len(), "Running single turn");
    let date = date.unwrap_or_else(|| chrono::Local::now().to_rfc2822());
    let ctx = RequestContext::new(
        chat_id,
        UserInput {
            text: message,
            images,
        },
        date,
        Arc::new(config.process_defaults()),
    );

    let response = agent.run(&ctx).await?;
    println!("{response}");
    Ok(())
}

fn encode_image(path: &Path) -> anyhow::Result<String> {
    let bytes = std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    Ok(STANDARD.encode(bytes))
}
