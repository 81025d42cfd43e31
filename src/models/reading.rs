use chrono::{DateTime, Utc};

/// Результат одного опроса rx-signal. Создается заново на каждый запрос
/// и после создания не меняется.
///
/// Ровно одно из полей rx_signal/error заполнено: успешный разбор дает
/// значение без ошибки, любой сбой — текст ошибки без значения.
#[derive(Debug, Clone)]
pub struct SignalReading {
    /// Путь ONT, который опрашивался (всегда сконфигурированный,
    /// независимо от содержимого вывода устройства)
    pub path: String,
    /// Уровень принимаемого оптического сигнала, dBm
    pub rx_signal: Option<f64>,
    pub timestamp: DateTime<Utc>,
    pub error: Option<String>,
}

impl SignalReading {
    pub fn ok(path: String, value: f64) -> Self {
        Self {
            path,
            rx_signal: Some(value),
            timestamp: Utc::now(),
            error: None,
        }
    }

    pub fn failed(path: String, error: String) -> Self {
        Self {
            path,
            rx_signal: None,
            timestamp: Utc::now(),
            error: Some(error),
        }
    }
}
