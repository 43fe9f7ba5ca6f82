use analyst_server::{AppState, router};
use analyst_stock::AnalysisPipeline;
use analyst_utils::{Settings, logging};
use anyhow::{Context, Result};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let settings = Settings::load();
    logging::init_tracing_with_level(&settings.log_level);

    let pipeline =
        AnalysisPipeline::from_settings(&settings).context("Failed to build analysis pipeline")?;
    info!("Pipeline stages: {:?}", pipeline.stage_names());

    let app = router(AppState::new(pipeline, settings.static_dir.clone()));
    let listener = tokio::net::TcpListener::bind(&settings.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", settings.bind_addr))?;

    info!("Listening on {}", settings.bind_addr);
    axum::serve(listener, app).await.context("Server error")?;
    Ok(())
}
