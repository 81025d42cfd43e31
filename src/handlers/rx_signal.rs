use std::sync::Arc;

use axum::{extract::State, Json};

use crate::collector::SignalCollector;
use crate::config::AppConfig;
use crate::formatter::{JsonFormatter, SignalReadingJson};
use crate::telnet::TelnetSession;

/// GET /api/rx-signal — один опрос устройства на каждый запрос.
///
/// Всегда отвечает 200: сбои опроса уходят в поле error тела, а не в
/// HTTP-статус. Параллельные запросы независимы, каждый открывает свою
/// telnet-сессию.
pub async fn handle_rx_signal(State(config): State<Arc<AppConfig>>) -> Json<SignalReadingJson> {
    let session = TelnetSession::new(config.credentials.clone());
    let reading = SignalCollector::collect(&session, &config).await;

    if let Some(ref error) = reading.error {
        tracing::warn!(path = %reading.path, %error, "опрос rx-signal не удался");
    } else {
        tracing::debug!(path = %reading.path, rx_signal = ?reading.rx_signal, "опрос rx-signal выполнен");
    }

    Json(JsonFormatter::format_reading(&reading))
}
