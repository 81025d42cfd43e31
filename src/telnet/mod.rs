use thiserror::Error;

pub mod session;

pub use session::TelnetSession;

/// Классификация сбоев telnet-сессии. Все варианты восстановимы
/// на уровне одного запроса и никогда не роняют процесс.
#[derive(Debug, Clone, Error)]
pub enum TelnetError {
    #[error("Не удалось подключиться к устройству ({0})")]
    Connection(String),

    #[error("Устройство отклонило учетные данные")]
    Auth,

    #[error("Таймаут ожидания ответа устройства")]
    Timeout,
}
