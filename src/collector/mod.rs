use std::future::Future;

use crate::config::AppConfig;
use crate::models::SignalReading;
use crate::parser;
use crate::telnet::{TelnetError, TelnetSession};

/// Источник сырого вывода диагностической команды. Выделен в типаж,
/// чтобы в тестах подставлять скриптованный вывод вместо живой сессии.
pub trait RawOutputSource {
    fn fetch_raw_output(&self) -> impl Future<Output = Result<String, TelnetError>> + Send;
}

impl RawOutputSource for TelnetSession {
    fn fetch_raw_output(&self) -> impl Future<Output = Result<String, TelnetError>> + Send {
        TelnetSession::fetch_raw_output(self)
    }
}

/// Вид исхода одного опроса. Однократный режим превращает его в код
/// выхода процесса; HTTP-слою достаточно самого SignalReading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    Parsed,
    NotFound,
    SessionFailed,
}

/// Коллектор одного измерения: telnet-сессия плюс разбор вывода.
pub struct SignalCollector;

impl SignalCollector {
    /// Один цикл опроса: одна telnet-сессия, один разбор, без повторов.
    ///
    /// Никогда не возвращает ошибку наружу — любой сбой сессии или разбора
    /// превращается в SignalReading с заполненным полем error и пустым
    /// значением.
    pub async fn collect<S: RawOutputSource>(source: &S, config: &AppConfig) -> SignalReading {
        Self::collect_with_outcome(source, config).await.0
    }

    /// Как collect, но дополнительно сообщает вид исхода.
    pub async fn collect_with_outcome<S: RawOutputSource>(
        source: &S,
        config: &AppConfig,
    ) -> (SignalReading, FetchOutcome) {
        let path = config.target_path.clone();

        match source.fetch_raw_output().await {
            Ok(raw) => match parser::extract_signal(&raw, &config.target_path) {
                Some(value) => (SignalReading::ok(path, value), FetchOutcome::Parsed),
                None => (
                    SignalReading::failed(
                        path,
                        format!(
                            "rx-signal для пути {} не найден в выводе устройства",
                            config.target_path
                        ),
                    ),
                    FetchOutcome::NotFound,
                ),
            },
            Err(e) => (SignalReading::failed(path, e.to_string()), FetchOutcome::SessionFailed),
        }
    }
}
