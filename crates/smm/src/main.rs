use std::sync::Arc;

use tracing::{error, info};

use smm_core::{config::Config, store::ContentStore};
use smm_openai::ChatCompletionsClient;
use smm_sqlite::SqliteContentStore;

#[tokio::main]
async fn main() -> Result<(), smm_core::Error> {
    smm_core::logging::init("smm")?;

    let cfg = match Config::load() {
        Ok(cfg) => Arc::new(cfg),
        Err(e) => {
            error!("{e}");
            return Err(e);
        }
    };

    let store = Arc::new(SqliteContentStore::open(&cfg.database_path)?);
    let posts = store.count().await?;
    info!(posts, path = %cfg.database_path.display(), "post store ready");

    let backend = Arc::new(ChatCompletionsClient::new(
        cfg.ai_endpoint.clone(),
        cfg.openrouter_api_key.clone(),
        cfg.ai_model.clone(),
        cfg.ai_temperature,
    )?);
    info!(model = %cfg.ai_model, timeout_ms = cfg.ai_timeout.as_millis() as u64, "completion backend ready");

    smm_telegram::router::run_polling(cfg, store, backend)
        .await
        .map_err(|e| smm_core::Error::Transport(format!("telegram bot failed: {e}")))?;

    Ok(())
}
