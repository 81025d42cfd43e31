use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::SignalReading;

/// JSON-структура ответа /api/rx-signal. Отсутствующие значение и ошибка
/// сериализуются как null, а не пропадают из тела — фронтенд рассчитывает
/// на все четыре поля.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignalReadingJson {
    pub path: String,
    pub rx_signal: Option<f64>,
    pub timestamp: String,
    pub error: Option<String>,
}

pub struct JsonFormatter;

impl JsonFormatter {
    pub fn format_reading(reading: &SignalReading) -> SignalReadingJson {
        SignalReadingJson {
            path: reading.path.clone(),
            rx_signal: reading.rx_signal,
            timestamp: iso_timestamp(&reading.timestamp),
            error: reading.error.clone(),
        }
    }

    pub fn to_json_compact(reading: &SignalReading) -> anyhow::Result<String> {
        let json = Self::format_reading(reading);
        serde_json::to_string(&json)
            .map_err(|e| anyhow::anyhow!("Ошибка сериализации в JSON: {}", e))
    }
}

/// Текущее время UTC в ISO8601 с суффиксом Z
pub fn iso_now() -> String {
    iso_timestamp(&Utc::now())
}

fn iso_timestamp(ts: &DateTime<Utc>) -> String {
    ts.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
}
