use std::{future::Future, net::SocketAddr};

use axum::{http::HeaderValue, Router};
use configs::{AppConfig, CorsConfig};
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use crate::{errors::StartupError, routes, state::ServerState};

/// The configured origin, or very permissive when none is set.
pub fn build_cors(cfg: &CorsConfig) -> Result<CorsLayer, StartupError> {
    match cfg.allowed_origin.as_deref() {
        None => Ok(CorsLayer::very_permissive()),
        Some(origin) => {
            let origin = HeaderValue::from_str(origin)
                .map_err(|e| StartupError::InvalidConfig(format!("cors.allowed_origin {origin:?}: {e}")))?;
            Ok(CorsLayer::new().allow_origin(origin).allow_methods(Any).allow_headers(Any))
        }
    }
}

/// Prepare the data directory and assemble the router for `cfg`.
pub async fn build_app(cfg: &AppConfig) -> Result<Router, StartupError> {
    let storage = &cfg.storage;
    common::env::ensure_env(&storage.data_dir, &[&storage.users_file, &storage.reviews_file])
        .await
        .map_err(|e| StartupError::Runtime(e.to_string()))?;

    // 打开两个存储；此时尚未读取任何文件
    let state = ServerState::from_config(storage);
    let cors = build_cors(&cfg.cors)?;
    Ok(routes::build_router(state, cors))
}

/// Build the app and serve until `shutdown` resolves.
pub async fn run_until<F>(cfg: AppConfig, shutdown: F) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let app = build_app(&cfg).await?;

    // 绑定地址并启动服务
    let listener = tokio::net::TcpListener::bind((cfg.server.host.as_str(), cfg.server.port)).await?;
    let addr: SocketAddr = listener.local_addr()?;
    info!(
        %addr,
        users_file = %cfg.storage.users_file,
        reviews_file = %cfg.storage.reviews_file,
        layout = ?cfg.storage.review_layout,
        "starting review store server"
    );
    axum::serve(listener, app).with_graceful_shutdown(shutdown).await?;
    info!("server stopped");
    Ok(())
}

/// Public entry: serve until Ctrl+C.
pub async fn run(cfg: AppConfig) -> anyhow::Result<()> {
    run_until(cfg, async {
        let _ = tokio::signal::ctrl_c().await;
    })
    .await
}
