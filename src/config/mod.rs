use std::env;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};

pub const DEFAULT_HOST: &str = "202.39.123.124";
pub const DEFAULT_TARGET_PATH: &str = "1/1/3/2/1";
const DEFAULT_TIMEOUT_SECS: u64 = 10;
const DEFAULT_SERVER_PORT: u16 = 8000;

/// Учетные данные и таймаут telnet-подключения к устройству.
///
/// Хост может содержать порт ("10.0.0.1:2323"), иначе используется
/// стандартный telnet-порт 23.
#[derive(Clone)]
pub struct TelnetCredentials {
    pub host: String,
    pub username: String,
    pub password: String,
    pub timeout_secs: u64,
}

impl TelnetCredentials {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

// Пароль не должен попадать в логи
impl fmt::Debug for TelnetCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TelnetCredentials")
            .field("host", &self.host)
            .field("username", &self.username)
            .field("password", &"***")
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

/// Конфигурация приложения. Загружается один раз при старте,
/// дальше только читается.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub credentials: TelnetCredentials,
    /// Путь ONT, для которого снимается rx-signal (например "1/1/3/2/1")
    pub target_path: String,
    pub server_port: u16,
}

impl AppConfig {
    /// Загружает конфигурацию из переменных окружения.
    ///
    /// TELNET_USERNAME и TELNET_PASSWORD обязательны — без них процесс
    /// не стартует. Остальные переменные имеют значения по умолчанию.
    pub fn from_env() -> Result<Self> {
        Self::load(|key| env::var(key).ok())
    }

    /// Загрузка с инъекцией источника переменных — тесты подставляют
    /// свою таблицу, не трогая окружение процесса.
    fn load(get: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let host = get("TELNET_HOST").unwrap_or_else(|| DEFAULT_HOST.to_string());
        let username = get("TELNET_USERNAME").context("Переменная TELNET_USERNAME не задана")?;
        let password = get("TELNET_PASSWORD").context("Переменная TELNET_PASSWORD не задана")?;
        let timeout_secs = parse_or_default(get("TELNET_TIMEOUT"), DEFAULT_TIMEOUT_SECS);
        let target_path =
            get("TELNET_TARGET_PATH").unwrap_or_else(|| DEFAULT_TARGET_PATH.to_string());
        let server_port = parse_or_default(get("SERVER_PORT"), DEFAULT_SERVER_PORT);

        Ok(Self {
            credentials: TelnetCredentials {
                host,
                username,
                password,
                timeout_secs,
            },
            target_path,
            server_port,
        })
    }
}

/// Парсит значение переменной окружения, при ошибке возвращает значение
/// по умолчанию.
fn parse_or_default<T: FromStr>(raw: Option<String>, default: T) -> T {
    raw.and_then(|s| s.trim().parse().ok()).unwrap_or(default)
}
