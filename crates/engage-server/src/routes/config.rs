use axum::extract::State;
use axum::Json;
use engage_core::config::{Config, ConfigWarning};
use serde::Serialize;

use crate::error::AppError;
use crate::state::AppState;

#[derive(Serialize)]
pub struct ConfigView {
    pub config: Config,
    pub warnings: Vec<ConfigWarning>,
}

/// GET /api/config: the workspace's `.engage/config.yaml` plus validation
/// warnings. Read-only.
pub async fn get_config(State(app): State<AppState>) -> Result<Json<ConfigView>, AppError> {
    let root = app.root.clone();
    let view = tokio::task::spawn_blocking(move || {
        let config = Config::load(&root)?;
        let warnings = config.validate();
        Ok::<_, engage_core::EngageError>(ConfigView { config, warnings })
    })
    .await
    .map_err(|e| AppError(anyhow::anyhow!("task join error: {e}")))??;
    Ok(Json(view))
}
