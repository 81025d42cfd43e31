use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::{timeout, Instant};

use crate::config::TelnetCredentials;

use super::TelnetError;

const TELNET_PORT: u16 = 23;

/// Сколько отказов (повторных приглашений login/password) допускается,
/// прежде чем сессия завершится с ошибкой аутентификации.
const MAX_LOGIN_ATTEMPTS: u32 = 3;

/// Отключает пагинацию вывода, если прошивка ее поддерживает
const DISABLE_PAGING_COMMAND: &str = "terminal length 0";
const SHOW_OPTICS_COMMAND: &str = "show equipment ont optics";

// Управляющие байты telnet-протокола (RFC 854)
const IAC: u8 = 255;
const DONT: u8 = 254;
const DO: u8 = 253;
const WONT: u8 = 252;
const WILL: u8 = 251;
const SB: u8 = 250;
const SE: u8 = 240;

/// Приглашения, которые драйвер различает в потоке от устройства.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Prompt {
    /// "login:" / "username:" — устройство ждет имя пользователя
    Login,
    /// "password:" — устройство ждет пароль
    Password,
    /// Командное приглашение ('#', '>' или '$' в конце строки)
    Shell,
}

const LOGIN_PROMPTS: [&str; 2] = ["login:", "username:"];
const SHELL_PROMPT_CHARS: [char; 3] = ['#', '>', '$'];

/// Определяет, каким из ожидаемых приглашений заканчивается накопленный
/// вывод. Сравнение идет по последней непустой строке без учета регистра.
fn match_prompt(text: &str, wanted: &[Prompt]) -> Option<Prompt> {
    let tail = text.trim_end();
    if tail.is_empty() {
        return None;
    }
    let last_line = tail.rsplit(['\n', '\r']).next().unwrap_or(tail);
    let lower = last_line.trim().to_ascii_lowercase();

    for &prompt in wanted {
        let hit = match prompt {
            Prompt::Login => LOGIN_PROMPTS.iter().any(|p| lower.ends_with(p)),
            Prompt::Password => lower.ends_with("password:"),
            Prompt::Shell => SHELL_PROMPT_CHARS.iter().any(|&c| lower.ends_with(c)),
        };
        if hit {
            return Some(prompt);
        }
    }
    None
}

#[derive(Default, Clone, Copy)]
enum IacState {
    #[default]
    Normal,
    /// Прочитан IAC, ждем байт команды
    Command,
    /// Прочитана команда-опция (DO/DONT/WILL/WONT), ждем байт опции
    Option(u8),
    /// Внутри субпереговоров (IAC SB ... IAC SE)
    Subneg,
    SubnegIac,
}

/// Вырезает IAC-последовательности из потока и накапливает обязательные
/// отказы на переговоры об опциях (DO -> WONT, WILL -> DONT).
///
/// Состояние переживает границы чтений: последовательность может быть
/// разрезана между двумя TCP-сегментами.
#[derive(Default)]
struct TelnetFilter {
    state: IacState,
}

impl TelnetFilter {
    fn filter(&mut self, input: &[u8], cleaned: &mut Vec<u8>, replies: &mut Vec<u8>) {
        for &byte in input {
            self.state = match self.state {
                IacState::Normal if byte == IAC => IacState::Command,
                IacState::Normal => {
                    cleaned.push(byte);
                    IacState::Normal
                }
                IacState::Command => match byte {
                    // IAC IAC — экранированный байт 255
                    IAC => {
                        cleaned.push(IAC);
                        IacState::Normal
                    }
                    DO | DONT | WILL | WONT => IacState::Option(byte),
                    SB => IacState::Subneg,
                    // NOP, GA и прочие двухбайтовые команды
                    _ => IacState::Normal,
                },
                IacState::Option(command) => {
                    match command {
                        DO => replies.extend_from_slice(&[IAC, WONT, byte]),
                        WILL => replies.extend_from_slice(&[IAC, DONT, byte]),
                        _ => {}
                    }
                    IacState::Normal
                }
                IacState::Subneg if byte == IAC => IacState::SubnegIac,
                IacState::Subneg => IacState::Subneg,
                IacState::SubnegIac if byte == SE => IacState::Normal,
                IacState::SubnegIac => IacState::Subneg,
            };
        }
    }
}

/// Открытое соединение одной сессии: сокет, IAC-фильтр и накопленный
/// текстовый вывод текущего этапа.
struct SessionIo {
    stream: TcpStream,
    filter: TelnetFilter,
    buf: String,
}

impl SessionIo {
    /// Читает из сокета, пока в буфере не появится одно из ожидаемых
    /// приглашений или не истечет дедлайн.
    async fn wait_prompt(
        &mut self,
        deadline: Instant,
        wanted: &[Prompt],
    ) -> Result<Prompt, TelnetError> {
        loop {
            if let Some(prompt) = match_prompt(&self.buf, wanted) {
                return Ok(prompt);
            }
            self.read_step(deadline).await?;
        }
    }

    /// Одно ограниченное дедлайном чтение с обработкой IAC.
    async fn read_step(&mut self, deadline: Instant) -> Result<(), TelnetError> {
        let remaining = deadline
            .checked_duration_since(Instant::now())
            .ok_or(TelnetError::Timeout)?;

        let mut chunk = [0u8; 1024];
        let n = match timeout(remaining, self.stream.read(&mut chunk)).await {
            Ok(Ok(0)) => {
                return Err(TelnetError::Connection(
                    "соединение закрыто устройством".to_string(),
                ))
            }
            Ok(Ok(n)) => n,
            Ok(Err(e)) => return Err(TelnetError::Connection(format!("ошибка чтения: {}", e))),
            Err(_) => return Err(TelnetError::Timeout),
        };

        let mut cleaned = Vec::with_capacity(n);
        let mut replies = Vec::new();
        self.filter.filter(&chunk[..n], &mut cleaned, &mut replies);

        if !replies.is_empty() {
            self.stream
                .write_all(&replies)
                .await
                .map_err(|e| TelnetError::Connection(format!("ошибка записи: {}", e)))?;
        }

        self.buf.push_str(&String::from_utf8_lossy(&cleaned));
        Ok(())
    }

    async fn send_line(&mut self, line: &str) -> Result<(), TelnetError> {
        let mut data = line.as_bytes().to_vec();
        data.push(b'\n');
        self.stream
            .write_all(&data)
            .await
            .map_err(|e| TelnetError::Connection(format!("ошибка записи: {}", e)))
    }
}

/// Драйвер одной telnet-сессии: подключение, логин, диагностическая команда,
/// чтение вывода до повторного появления приглашения, закрытие.
///
/// На каждый вызов открывается ровно одно TCP-соединение; закрывается оно
/// на любом пути выхода (drop у TcpStream закрывает сокет). Переиспользования
/// и пула соединений нет.
pub struct TelnetSession {
    credentials: TelnetCredentials,
}

impl TelnetSession {
    pub fn new(credentials: TelnetCredentials) -> Self {
        Self { credentials }
    }

    /// Полный цикл сессии: возвращает сырой текст вывода диагностической
    /// команды либо типизированную ошибку (connect/auth/timeout).
    pub async fn fetch_raw_output(&self) -> Result<String, TelnetError> {
        let stream = self.connect().await?;
        let mut io = SessionIo {
            stream,
            filter: TelnetFilter::default(),
            buf: String::new(),
        };

        let result = self.run(&mut io).await;

        // Вежливое завершение; при любом исходе сокет закроется на drop
        let _ = io.send_line("exit").await;
        let _ = io.stream.shutdown().await;

        result
    }

    async fn run(&self, io: &mut SessionIo) -> Result<String, TelnetError> {
        self.login(io).await?;
        self.execute_command(io, DISABLE_PAGING_COMMAND).await?;
        self.execute_command(io, SHOW_OPTICS_COMMAND).await
    }

    async fn connect(&self) -> Result<TcpStream, TelnetError> {
        let addr = self.target_addr();
        match timeout(self.credentials.timeout(), TcpStream::connect(&addr)).await {
            Ok(Ok(stream)) => Ok(stream),
            Ok(Err(e)) => Err(TelnetError::Connection(format!("{}: {}", addr, e))),
            Err(_) => Err(TelnetError::Connection(format!(
                "{}: таймаут подключения",
                addr
            ))),
        }
    }

    fn target_addr(&self) -> String {
        if self.credentials.host.contains(':') {
            self.credentials.host.clone()
        } else {
            format!("{}:{}", self.credentials.host, TELNET_PORT)
        }
    }

    /// Логин-рукопожатие. Некоторые устройства пропускают имя пользователя
    /// и сразу спрашивают пароль. Повторное появление login/password после
    /// отправки учетных данных считается отказом; после MAX_LOGIN_ATTEMPTS
    /// отказов сессия завершается с TelnetError::Auth.
    async fn login(&self, io: &mut SessionIo) -> Result<(), TelnetError> {
        let deadline = Instant::now() + self.credentials.timeout();
        let mut rejected = 0u32;

        io.buf.clear();
        let mut prompt = io
            .wait_prompt(deadline, &[Prompt::Login, Prompt::Password])
            .await?;

        loop {
            match prompt {
                Prompt::Login => {
                    io.send_line(&self.credentials.username).await?;
                    io.buf.clear();
                    prompt = io
                        .wait_prompt(deadline, &[Prompt::Shell, Prompt::Login, Prompt::Password])
                        .await?;
                    if prompt == Prompt::Login {
                        rejected += 1;
                        if rejected >= MAX_LOGIN_ATTEMPTS {
                            return Err(TelnetError::Auth);
                        }
                    }
                }
                Prompt::Password => {
                    io.send_line(&self.credentials.password).await?;
                    io.buf.clear();
                    prompt = io
                        .wait_prompt(deadline, &[Prompt::Shell, Prompt::Login, Prompt::Password])
                        .await?;
                    if prompt == Prompt::Shell {
                        return Ok(());
                    }
                    rejected += 1;
                    if rejected >= MAX_LOGIN_ATTEMPTS {
                        return Err(TelnetError::Auth);
                    }
                }
                Prompt::Shell => return Ok(()),
            }
        }
    }

    /// Отправляет команду и собирает вывод до повторного появления
    /// командного приглашения.
    async fn execute_command(
        &self,
        io: &mut SessionIo,
        command: &str,
    ) -> Result<String, TelnetError> {
        let deadline = Instant::now() + self.credentials.timeout();
        io.buf.clear();
        io.send_line(command).await?;
        io.wait_prompt(deadline, &[Prompt::Shell]).await?;
        Ok(std::mem::take(&mut io.buf))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    fn credentials_for(addr: std::net::SocketAddr, timeout_secs: u64) -> TelnetCredentials {
        TelnetCredentials {
            host: addr.to_string(),
            username: "admin".to_string(),
            password: "secret".to_string(),
            timeout_secs,
        }
    }

    async fn read_line(sock: &mut TcpStream) -> String {
        let mut line = Vec::new();
        let mut byte = [0u8; 1];
        loop {
            match sock.read(&mut byte).await {
                Ok(0) | Err(_) => break,
                Ok(_) => {
                    if byte[0] == b'\n' {
                        break;
                    }
                    line.push(byte[0]);
                }
            }
        }
        String::from_utf8_lossy(&line).into_owned()
    }

    #[test]
    fn match_prompt_detects_login_and_password() {
        assert_eq!(
            match_prompt("banner\r\nlogin: ", &[Prompt::Login, Prompt::Password]),
            Some(Prompt::Login)
        );
        assert_eq!(
            match_prompt("Username:", &[Prompt::Login]),
            Some(Prompt::Login)
        );
        assert_eq!(
            match_prompt("login ok\r\nPassword: ", &[Prompt::Login, Prompt::Password]),
            Some(Prompt::Password)
        );
    }

    #[test]
    fn match_prompt_detects_shell_prompt() {
        assert_eq!(match_prompt("output\r\nONT# ", &[Prompt::Shell]), Some(Prompt::Shell));
        assert_eq!(match_prompt("device> ", &[Prompt::Shell]), Some(Prompt::Shell));
        assert_eq!(match_prompt("still reading", &[Prompt::Shell]), None);
    }

    #[test]
    fn match_prompt_ignores_unwanted_kinds() {
        // На этапе чтения вывода login-подобный текст не должен срабатывать
        assert_eq!(match_prompt("last login: yesterday", &[Prompt::Shell]), None);
    }

    #[test]
    fn telnet_filter_answers_negotiation_and_strips_iac() {
        let mut filter = TelnetFilter::default();
        let mut cleaned = Vec::new();
        let mut replies = Vec::new();

        // IAC DO 1, "ab", IAC WILL 3, "c"
        let input = [IAC, DO, 1, b'a', b'b', IAC, WILL, 3, b'c'];
        filter.filter(&input, &mut cleaned, &mut replies);

        assert_eq!(cleaned, b"abc");
        assert_eq!(replies, vec![IAC, WONT, 1, IAC, DONT, 3]);
    }

    #[test]
    fn telnet_filter_handles_split_sequences() {
        let mut filter = TelnetFilter::default();
        let mut cleaned = Vec::new();
        let mut replies = Vec::new();

        // Последовательность разрезана между двумя чтениями
        filter.filter(&[b'x', IAC], &mut cleaned, &mut replies);
        filter.filter(&[DO, 24, b'y'], &mut cleaned, &mut replies);

        assert_eq!(cleaned, b"xy");
        assert_eq!(replies, vec![IAC, WONT, 24]);
    }

    #[tokio::test]
    async fn fetches_raw_output_from_scripted_device() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (mut sock, _) = listener.accept().await.unwrap();
            sock.write_all(b"login: ").await.unwrap();
            let _ = read_line(&mut sock).await; // username
            sock.write_all(b"Password: ").await.unwrap();
            let _ = read_line(&mut sock).await; // password
            sock.write_all(b"\r\nONT# ").await.unwrap();
            let _ = read_line(&mut sock).await; // terminal length 0
            sock.write_all(b"\r\nONT# ").await.unwrap();
            let _ = read_line(&mut sock).await; // show equipment ont optics
            sock.write_all(b"\r\n1/1/3/2/1  rx-signal: -19.2 dBm\r\nONT# ")
                .await
                .unwrap();
            let _ = read_line(&mut sock).await; // exit
        });

        let session = TelnetSession::new(credentials_for(addr, 5));
        let raw = session.fetch_raw_output().await.unwrap();
        assert!(raw.contains("rx-signal: -19.2"));
    }

    #[tokio::test]
    async fn repeated_password_prompt_is_auth_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (mut sock, _) = listener.accept().await.unwrap();
            sock.write_all(b"login: ").await.unwrap();
            let _ = read_line(&mut sock).await; // username
            // Устройство раз за разом переспрашивает пароль
            for _ in 0..4 {
                if sock.write_all(b"Password: ").await.is_err() {
                    break;
                }
                let _ = read_line(&mut sock).await;
            }
        });

        let session = TelnetSession::new(credentials_for(addr, 5));
        let err = session.fetch_raw_output().await.unwrap_err();
        assert!(matches!(err, TelnetError::Auth));
    }

    #[tokio::test]
    async fn silent_device_is_timeout_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            // Принимаем соединение и молчим
            let (_sock, _) = listener.accept().await.unwrap();
            tokio::time::sleep(std::time::Duration::from_secs(10)).await;
        });

        let session = TelnetSession::new(credentials_for(addr, 1));
        let err = session.fetch_raw_output().await.unwrap_err();
        assert!(matches!(err, TelnetError::Timeout));
    }

    #[tokio::test]
    async fn unreachable_device_is_connection_error() {
        // Занимаем порт и сразу освобождаем, чтобы подключаться было не к кому
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let session = TelnetSession::new(credentials_for(addr, 1));
        let err = session.fetch_raw_output().await.unwrap_err();
        assert!(matches!(err, TelnetError::Connection(_)));
    }
}
