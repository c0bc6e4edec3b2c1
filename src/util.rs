use unicode_width::UnicodeWidthStr;

/// Parse a string that may contain a formatted number.
///
/// Handles plain numbers ("123.45", "1e3"), thousands separators
/// ("1,234.56"), percentages ("15%" -> 0.15) and a leading currency symbol
/// ("$1,234", "-€12", "($5)").
pub fn parse_numeric(s: &str) -> Option<f64> {
    let trimmed = s.trim();

    if trimmed.is_empty() {
        return None;
    }

    if let Ok(n) = trimmed.parse::<f64>() {
        return Some(n).filter(|n| n.is_finite());
    }

    if let Some(without_pct) = trimmed.strip_suffix('%') {
        return parse_plain(without_pct.trim()).map(|n| n / 100.0);
    }

    // -$123 or ($123)
    let (is_negative, body) = if let Some(rest) = trimmed.strip_prefix('-') {
        (true, rest)
    } else if let Some(rest) = trimmed.strip_prefix('(').and_then(|r| r.strip_suffix(')')) {
        (true, rest)
    } else {
        (false, trimmed)
    };

    let body = body.trim();
    if let Some(without_symbol) = body.strip_prefix(['$', '€', '£', '¥']) {
        return parse_plain(without_symbol.trim()).map(|n| if is_negative { -n } else { n });
    }

    parse_plain(trimmed)
}

/// Parse after dropping thousands separators
fn parse_plain(s: &str) -> Option<f64> {
    let cleaned: String = s.chars().filter(|c| *c != ',').collect();
    cleaned.parse::<f64>().ok().filter(|n| n.is_finite())
}

/// Parse the leading integer of a string: optional sign, then digits.
/// Anything after the digits is ignored ("30 years" -> 30, "3.9" -> 3).
pub fn parse_leading_int(s: &str) -> Option<i64> {
    let s = s.trim_start();
    let (sign, digits) = match s.as_bytes().first() {
        Some(b'-') => (-1, &s[1..]),
        Some(b'+') => (1, &s[1..]),
        _ => (1, s),
    };

    let end = digits
        .bytes()
        .position(|b| !b.is_ascii_digit())
        .unwrap_or(digits.len());
    if end == 0 {
        return None;
    }

    digits[..end].parse::<i64>().ok().map(|n| sign * n)
}

/// Terminal display width of a string
pub fn display_width(s: &str) -> usize {
    UnicodeWidthStr::width(s)
}

/// Pad or truncate `s` to exactly `width` display columns
pub fn fit_to_width(s: &str, width: usize) -> String {
    let w = display_width(s);
    if w <= width {
        let mut out = s.to_string();
        out.push_str(&" ".repeat(width - w));
        return out;
    }

    let mut out = String::new();
    let mut used = 0;
    for c in s.chars() {
        let cw = unicode_width::UnicodeWidthChar::width(c).unwrap_or(0);
        if used + cw + 1 > width {
            break;
        }
        out.push(c);
        used += cw;
    }
    if width > 0 {
        out.push('…');
        used += 1;
    }
    out.push_str(&" ".repeat(width.saturating_sub(used)));
    out
}
