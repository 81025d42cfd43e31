use once_cell::sync::Lazy;
use regex::Regex;

/// Паттерны значения rx, от специфичных к общим — формулировки
/// различаются между прошивками.
static RX_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)rx[-\s]?signal[^:]*:\s*([-+]?\d+(?:\.\d+)?)\s*(?:dBm)?",
        r"(?i)rx\s*(?:optical\s*power|power)[^:]*:\s*([-+]?\d+(?:\.\d+)?)\s*(?:dBm)?",
        r"(?i)\brx[:\s]\s*([-+]?\d+(?:\.\d+)?)\s*dBm",
        r"(?i)receive(?:d)?\s*power[^:]*:\s*([-+]?\d+(?:\.\d+)?)\s*(?:dBm)?",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

/// Запасной вариант: число с явной единицей dBm после токена пути
static FALLBACK_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)([-+]?\d+(?:\.\d+)?)\s*dBm").unwrap());

/// Извлекает rx-signal (dBm) для заданного пути ONT из сырого вывода
/// команды `show equipment ont optics`.
///
/// Разбор построчный: берется первая строка, которая содержит точный
/// токен пути и число при нем. Строки с путем, но без числа,
/// пропускаются. Если подходящей строки нет — None (восстановимое
/// состояние, не сбой).
pub fn extract_signal(raw: &str, target_path: &str) -> Option<f64> {
    for line in raw.lines() {
        let Some(path_end) = find_exact_path(line, target_path) else {
            continue;
        };
        if let Some(value) = extract_value(line, path_end) {
            return Some(value);
        }
    }
    None
}

/// Ищет точное вхождение токена пути в строке. Вхождение не засчитывается,
/// если путь продолжается цифрой или '/': "1/1/3/2/1" не должен совпадать
/// внутри "1/1/3/2/10" или "21/1/3/2/1". Возвращает байтовое смещение
/// конца токена.
fn find_exact_path(line: &str, path: &str) -> Option<usize> {
    if path.is_empty() {
        return None;
    }
    let bytes = line.as_bytes();
    let mut start = 0;
    while let Some(pos) = line[start..].find(path) {
        let begin = start + pos;
        let end = begin + path.len();
        let before_ok = begin == 0 || !is_path_byte(bytes[begin - 1]);
        let after_ok = end >= bytes.len() || !is_path_byte(bytes[end]);
        if before_ok && after_ok {
            return Some(end);
        }
        start = begin + 1;
    }
    None
}

fn is_path_byte(byte: u8) -> bool {
    byte.is_ascii_digit() || byte == b'/'
}

fn extract_value(line: &str, path_end: usize) -> Option<f64> {
    for pattern in RX_PATTERNS.iter() {
        if let Some(caps) = pattern.captures(line) {
            if let Ok(value) = caps[1].parse::<f64>() {
                return Some(value);
            }
        }
    }
    // Число ищем только после токена пути, чтобы не зацепить соседнюю колонку
    FALLBACK_PATTERN
        .captures(&line[path_end..])
        .and_then(|caps| caps[1].parse::<f64>().ok())
}
