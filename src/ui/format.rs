use chrono::{DateTime, NaiveDateTime};

/// 字节数格式化：1024 进制，单位随数量级走
pub fn format_size(bytes: u64) -> String {
    if bytes == 0 {
        return "0 Bytes".to_string();
    }
    const UNITS: [&str; 4] = ["Bytes", "KB", "MB", "GB"];
    let exp = ((bytes as f64).ln() / 1024f64.ln()).floor() as usize;
    let exp = exp.min(UNITS.len() - 1);
    let value = bytes as f64 / 1024f64.powi(exp as i32);
    // 去掉尾随零：1.00 -> 1, 1.50 -> 1.5
    let text = format!("{:.2}", value);
    let text = text.trim_end_matches('0').trim_end_matches('.');
    format!("{} {}", text, UNITS[exp])
}

/// ISO 时间串格式化为 `YYYY-MM-DD HH:MM`，缺失为 N/A，解析失败时原样返回
pub fn format_datetime(raw: Option<&str>) -> String {
    let Some(raw) = raw else {
        return "N/A".to_string();
    };
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return dt.format("%Y-%m-%d %H:%M").to_string();
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return dt.format("%Y-%m-%d %H:%M").to_string();
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
        return dt.format("%Y-%m-%d %H:%M").to_string();
    }
    raw.to_string()
}

/// 长文本截断（按字符计，保证 UTF-8 边界安全）
pub fn truncate_text(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let kept: String = text.chars().take(max_chars.saturating_sub(3)).collect();
    format!("{}...", kept)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_size_boundaries() {
        assert_eq!(format_size(0), "0 Bytes");
        assert_eq!(format_size(1), "1 Bytes");
        assert_eq!(format_size(1023), "1023 Bytes");
        assert_eq!(format_size(1024), "1 KB");
        assert_eq!(format_size(1536), "1.5 KB");
        assert_eq!(format_size(1048576), "1 MB");
        assert_eq!(format_size(1073741824), "1 GB");
    }

    #[test]
    fn test_format_size_trims_zeros() {
        // 2.25 MB 保留两位，1.50 KB 收敛为 1.5 KB
        assert_eq!(format_size(2359296), "2.25 MB");
        assert_eq!(format_size(1536 * 1024), "1.5 MB");
    }

    #[test]
    fn test_format_size_huge_values_stay_in_gb() {
        // 超过 GB 档之后不再升位
        assert_eq!(format_size(2 * 1024 * 1024 * 1024 * 1024), "2048 GB");
    }

    #[test]
    fn test_format_datetime() {
        assert_eq!(
            format_datetime(Some("2024-03-01T09:30:00Z")),
            "2024-03-01 09:30"
        );
        assert_eq!(
            format_datetime(Some("2024-03-01T09:30:00.123456")),
            "2024-03-01 09:30"
        );
        assert_eq!(format_datetime(Some("not-a-date")), "not-a-date");
        assert_eq!(format_datetime(None), "N/A");
    }

    #[test]
    fn test_truncate_text() {
        assert_eq!(truncate_text("short", 10), "short");
        assert_eq!(truncate_text("abcdefghij", 8), "abcde...");
        // 多字节字符不会被截断在字节中间
        assert_eq!(truncate_text("动量策略动量策略", 6), "动量策...");
    }
}
