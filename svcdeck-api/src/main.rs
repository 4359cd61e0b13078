mod app;
mod settings;

use app::{app_router, AppState};
use dotenvy::dotenv;
use settings::JsonSettings;
use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use svcdeck_core::adapter::MemoryAdapter;
use svcdeck_core::{ControlSettings, ServiceManager, StaticPrivilege, DEFAULT_CACHE_TTL};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// 服务控制后端
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Backend {
    /// systemd / Windows SCM
    Native,
    /// 内存模拟主机，用于演示与前端联调
    Memory,
}

#[derive(Debug, Clone)]
struct ApiConfig {
    bind: SocketAddr,
    data_dir: PathBuf,
    api_token: Option<String>,
    backend: Backend,
    cache_ttl: Duration,
    /// CORS 允许的来源列表（空则允许所有）
    cors_origins: Vec<String>,
}

impl ApiConfig {
    fn from_env() -> Self {
        let bind = env::var("SD_BIND")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or_else(|| SocketAddr::from(([127, 0, 0, 1], 7878)));

        let data_dir = env::var("SD_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./data"));

        let api_token = env::var("SD_API_TOKEN")
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        let backend = match env::var("SD_BACKEND").as_deref().map(str::trim) {
            Ok("memory") => Backend::Memory,
            Ok("native") | Ok("") | Err(_) => Backend::Native,
            Ok(other) => {
                tracing::warn!(backend = other, "unknown SD_BACKEND, using native");
                Backend::Native
            }
        };

        let cache_ttl = env::var("SD_CACHE_TTL_MS")
            .ok()
            .and_then(|s| s.trim().parse::<u64>().ok())
            .map(Duration::from_millis)
            .unwrap_or(DEFAULT_CACHE_TTL);

        // 逗号分隔；空或 "*" 表示允许所有
        let cors_origins = env::var("SD_CORS_ORIGINS")
            .ok()
            .map(|s| {
                let trimmed = s.trim();
                if trimmed.is_empty() || trimmed == "*" {
                    vec![]
                } else {
                    trimmed
                        .split(',')
                        .filter(|t| !t.trim().is_empty())
                        .map(|t| t.trim().to_string())
                        .collect()
                }
            })
            .unwrap_or_default();

        Self {
            bind,
            data_dir,
            api_token,
            backend,
            cache_ttl,
            cors_origins,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 优先读取 .env（若存在）
    let _ = dotenv();
    init_tracing();

    let config = ApiConfig::from_env();
    let settings = Arc::new(JsonSettings::open(&config.data_dir)?);
    info!(path = %settings.path().display(), enabled = settings.service_control_enabled(), "loaded settings");

    let manager = match config.backend {
        Backend::Native => ServiceManager::native(settings),
        Backend::Memory => ServiceManager::new(
            Arc::new(MemoryAdapter::demo()),
            settings,
            Arc::new(StaticPrivilege::elevated()),
        ),
    }
    .with_cache_ttl(config.cache_ttl);
    let manager = Arc::new(manager);
    info!(
        backend = ?config.backend,
        elevation = %manager.elevation_status().await,
        "service manager ready"
    );
    if config.api_token.is_none() {
        tracing::warn!("SD_API_TOKEN not set; the API accepts unauthenticated requests");
    }

    let state = AppState {
        manager: manager.clone(),
        api_token: config.api_token.clone(),
    };
    let app = app_router(state, config.cors_origins.clone());
    let listener = tokio::net::TcpListener::bind(config.bind).await?;
    info!("starting API on {}", config.bind);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    manager.shutdown();
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}

fn init_tracing() {
    let fmt_layer = tracing_subscriber::fmt::layer().with_target(false);
    let filter =
        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into());
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .init();
}
