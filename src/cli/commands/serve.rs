use anyhow::Context;
use std::sync::Arc;

use crate::app::{router, AppState};
use crate::config::AppConfig;
use crate::executor::ProcessRunner;
use crate::registry::HandlerRegistry;

pub async fn handle(config: AppConfig) -> anyhow::Result<()> {
    tracing::info!("Starting api-moduled in {:?} mode", config.environment);

    let registry = HandlerRegistry::build(&config.server.handler_dir);
    tracing::info!(
        "{} route(s) registered from {}",
        registry.len(),
        config.server.handler_dir.display()
    );
    for descriptor in registry.routes() {
        tracing::debug!(
            route = %descriptor.name,
            input_schema = descriptor.input_schema.is_some(),
            output_schema = descriptor.output_schema.is_some(),
            "route registered"
        );
    }

    let runner = Arc::new(ProcessRunner::new(config.exec.timeout));
    let bind_addr = config.listen_address();
    let app = router(AppState::new(config, registry, runner));

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;
    tracing::info!("listening on http://{}", bind_addr);

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
