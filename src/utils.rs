use crate::error::{EdfError, Result};

/// 检查字符串是否为有效的整数
pub fn is_integer_number(s: &str) -> bool {
    let s = s.trim();
    if s.is_empty() {
        return false;
    }

    let digits = s.strip_prefix('+').or_else(|| s.strip_prefix('-')).unwrap_or(s);
    !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit())
}

/// 检查字符串是否为有效的数字（包括浮点数）
pub fn is_number(s: &str) -> bool {
    let s = s.trim();
    if s.is_empty() {
        return false;
    }

    // 拒绝 "inf"/"nan" 之类 Rust 能解析但头部中不合法的写法
    s.chars().all(|c| c.is_ascii_digit() || matches!(c, '+' | '-' | '.' | 'e' | 'E'))
        && s.parse::<f64>().is_ok()
}

/// 把定长 ASCII 字段转换为去掉填充空格的字符串
pub fn field_str(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).trim().to_string()
}

/// 严格解析整数字段，失败时返回 `MalformedHeader`
pub fn parse_int_field(bytes: &[u8], name: &str) -> Result<i64> {
    let s = field_str(bytes);
    if !is_integer_number(&s) {
        return Err(EdfError::malformed(format!("{} is not an integer: {:?}", name, s)));
    }

    s.trim_start_matches('+')
        .parse::<i64>()
        .map_err(|_| EdfError::malformed(format!("{} is out of range: {:?}", name, s)))
}

/// 严格解析浮点字段，失败时返回 `MalformedHeader`
pub fn parse_float_field(bytes: &[u8], name: &str) -> Result<f64> {
    let s = field_str(bytes);
    if !is_number(&s) {
        return Err(EdfError::malformed(format!("{} is not a number: {:?}", name, s)));
    }

    s.parse::<f64>()
        .map_err(|_| EdfError::malformed(format!("{} is not a number: {:?}", name, s)))
}

/// 解析EDF时间字符串为100纳秒单位
pub fn parse_edf_time(s: &str) -> Result<i64> {
    let s = s.trim();

    if s.is_empty() {
        return Err(EdfError::malformed("Empty time string"));
    }

    // 处理符号
    let (negative, s) = if let Some(rest) = s.strip_prefix('-') {
        (true, rest)
    } else if let Some(rest) = s.strip_prefix('+') {
        (false, rest)
    } else {
        (false, s)
    };

    // 符号之后只允许 ASCII 数字和一个小数点
    if !s.chars().all(|c| c.is_ascii_digit() || c == '.') {
        return Err(EdfError::malformed(format!("Invalid time string: {:?}", s)));
    }

    let mut value = 0i64;

    if let Some(dot_pos) = s.find('.') {
        // 有小数部分
        let integer_part = &s[..dot_pos];
        let decimal_part = &s[dot_pos + 1..];

        if (integer_part.is_empty() && decimal_part.is_empty()) || decimal_part.contains('.') {
            return Err(EdfError::malformed(format!("Invalid time string: {:?}", s)));
        }

        // 解析整数部分
        if !integer_part.is_empty() {
            value += integer_part.parse::<i64>()
                .map_err(|_| EdfError::malformed("Invalid integer part"))?
                .checked_mul(crate::EDFLIB_TIME_DIMENSION)
                .ok_or_else(|| EdfError::malformed(format!("Time out of range: {:?}", s)))?;
        }

        // 解析小数部分（最多7位精度），此时已全部为 ASCII
        if !decimal_part.is_empty() {
            let decimal_str = &decimal_part[..decimal_part.len().min(7)];

            let decimal_value = decimal_str.parse::<i64>()
                .map_err(|_| EdfError::malformed("Invalid decimal part"))?;

            let scale = 10i64.pow(7 - decimal_str.len() as u32);
            value += decimal_value * scale;
        }
    } else {
        // 只有整数部分
        value = s.parse::<i64>()
            .map_err(|_| EdfError::malformed(format!("Invalid integer: {:?}", s)))?
            .checked_mul(crate::EDFLIB_TIME_DIMENSION)
            .ok_or_else(|| EdfError::malformed(format!("Time out of range: {:?}", s)))?;
    }

    if negative {
        value = -value;
    }

    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_integer_number() {
        assert!(is_integer_number("123"));
        assert!(is_integer_number("-456"));
        assert!(is_integer_number("+789"));
        assert!(is_integer_number("0"));
        assert!(is_integer_number("  42    "));
        assert!(!is_integer_number("12.34"));
        assert!(!is_integer_number("abc"));
        assert!(!is_integer_number("-"));
        assert!(!is_integer_number(""));
    }

    #[test]
    fn test_is_number() {
        assert!(is_number("-500.0"));
        assert!(is_number("1e-3"));
        assert!(!is_number("inf"));
        assert!(!is_number("NaN"));
        assert!(!is_number("12 34"));
    }

    #[test]
    fn test_parse_edf_time() {
        assert_eq!(parse_edf_time("1").unwrap(), 10_000_000);
        assert_eq!(parse_edf_time("1.5").unwrap(), 15_000_000);
        assert_eq!(parse_edf_time("-2.5").unwrap(), -25_000_000);
        assert_eq!(parse_edf_time("+0.0000001").unwrap(), 1);
        assert_eq!(parse_edf_time(".25").unwrap(), 2_500_000);
        assert!(parse_edf_time("1.x").is_err());
        assert!(parse_edf_time(".").is_err());
        assert!(parse_edf_time("1.2.3").is_err());
    }

    #[test]
    fn test_parse_edf_time_rejects_repeated_signs() {
        for s in ["--1", "+-1", "-+1", "--3.5", "1.-5", "-.+5"] {
            assert!(
                matches!(parse_edf_time(s), Err(EdfError::MalformedHeader(_))),
                "accepted {:?}",
                s
            );
        }
    }

    #[test]
    fn test_parse_edf_time_non_ascii() {
        // from_utf8_lossy 把 0xFF 变成 3 字节的 U+FFFD
        let s = field_str(b"1.12345\xFF");
        assert!(matches!(parse_edf_time(&s), Err(EdfError::MalformedHeader(_))));
        assert!(matches!(parse_edf_time("1.1234567\u{e9}"), Err(EdfError::MalformedHeader(_))));
        assert!(matches!(parse_edf_time("\u{e9}1"), Err(EdfError::MalformedHeader(_))));
    }

    #[test]
    fn test_strict_fields() {
        assert_eq!(parse_int_field(b"-2048   ", "digital minimum").unwrap(), -2048);
        assert_eq!(parse_float_field(b"500.0   ", "physical maximum").unwrap(), 500.0);
        assert!(matches!(
            parse_int_field(b"12a     ", "samples"),
            Err(EdfError::MalformedHeader(_))
        ));
        assert!(matches!(
            parse_float_field(b"        ", "physical minimum"),
            Err(EdfError::MalformedHeader(_))
        ));
    }
}
