use std::sync::Arc;

use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

mod collector;
mod config;
mod formatter;
mod handlers;
mod models;
mod parser;
mod routes;
mod telnet;

use collector::{FetchOutcome, SignalCollector};
use config::AppConfig;
use formatter::JsonFormatter;
use models::SignalReading;
use telnet::TelnetSession;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let once = std::env::args().any(|arg| arg == "--once");

    let config = match AppConfig::from_env() {
        Ok(config) => config,
        // В однократном режиме неполная конфигурация тоже отдается как JSON
        Err(e) if once => {
            let path = std::env::var("TELNET_TARGET_PATH")
                .unwrap_or_else(|_| config::DEFAULT_TARGET_PATH.to_string());
            let reading = SignalReading::failed(path, format!("{:#}", e));
            println!("{}", JsonFormatter::to_json_compact(&reading)?);
            std::process::exit(2);
        }
        Err(e) => return Err(e),
    };

    // Режим одиночного опроса: один fetch, JSON в stdout, выход
    if once {
        return fetch_once(&config).await;
    }

    serve(config).await
}

async fn serve(config: AppConfig) -> Result<()> {
    let addr = format!("0.0.0.0:{}", config.server_port);
    let app = routes::create_router(Arc::new(config));

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Не удалось открыть порт {}", addr))?;

    tracing::info!("rx-signal сервер слушает http://{}", addr);
    axum::serve(listener, app)
        .await
        .context("HTTP сервер завершился с ошибкой")?;

    Ok(())
}

async fn fetch_once(config: &AppConfig) -> Result<()> {
    let session = TelnetSession::new(config.credentials.clone());
    let (reading, outcome) = SignalCollector::collect_with_outcome(&session, config).await;

    println!("{}", JsonFormatter::to_json_compact(&reading)?);

    // Коды выхода: 1 — значение не найдено в выводе, 3 — сбой telnet-сессии
    match outcome {
        FetchOutcome::Parsed => Ok(()),
        FetchOutcome::NotFound => std::process::exit(1),
        FetchOutcome::SessionFailed => std::process::exit(3),
    }
}
