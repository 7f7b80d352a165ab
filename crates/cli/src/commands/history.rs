//! `voxloop history`: print a stored transcript.

use voxloop_config::AppConfig;
use voxloop_core::history::HistoryStore;
use voxloop_core::message::ConversationId;

pub async fn run(config: AppConfig, chat_id: String) -> anyhow::Result<()> {
    let store = voxloop_history::open_backend(
        &config.history.backend,
        &config.history.resolved_path(),
    )
    .await?;

    let messages = store.get(&ConversationId::new(chat_id)).await?;
    println!("{}", serde_json::to_string_pretty(&messages)?);
    Ok(())
}
