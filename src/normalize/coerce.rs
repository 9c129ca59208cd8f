//! Locale-tolerant numeric coercion
//!
//! Best-effort parsing of sensor cells: European decimal commas, thousands
//! separators, units and stray symbols. Anything ambiguous becomes `None`;
//! coercion never fails a row.

use crate::models::CellValue;

/// Coerce a raw cell into a finite number
pub fn coerce(value: &CellValue) -> Option<f64> {
    match value {
        CellValue::Missing => None,
        CellValue::Number(n) => n.is_finite().then_some(*n),
        CellValue::Text(text) => coerce_str(text),
    }
}

/// Coerce a raw string into a finite number
pub fn coerce_str(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();

    let normalized = if trimmed.contains(',') && !trimmed.contains('.') {
        // "7,2" is a decimal comma
        trimmed.replacen(',', ".", 1)
    } else {
        strip_thousands_separators(trimmed)
    };

    let residue: String = normalized
        .chars()
        .filter(|c| c.is_ascii_digit() || matches!(c, '.' | '-' | 'e' | 'E'))
        .collect();

    if residue.is_empty() || residue == "-" || residue == "." {
        return None;
    }

    residue.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Drop commas followed by exactly three digits and then a word boundary
fn strip_thousands_separators(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());

    for (i, &c) in chars.iter().enumerate() {
        if c == ',' && is_thousands_group(&chars[i + 1..]) {
            continue;
        }
        out.push(c);
    }

    out
}

fn is_thousands_group(rest: &[char]) -> bool {
    if rest.len() < 3 || !rest[..3].iter().all(|c| c.is_ascii_digit()) {
        return false;
    }
    // word boundary: end of input or a non-word character
    rest.get(3)
        .is_none_or(|c| !(c.is_ascii_alphanumeric() || *c == '_'))
}
