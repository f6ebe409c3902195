//! `{a,b,c}` and `{1..10}`/`{a..z}` brace expansion, evaluated before any
//! other expansion step so its output words feed tilde/parameter/command
//! substitution downstream, same as bash's documented expansion order.

use crate::ast::{BraceItem, BraceRangeValue};

pub fn expand_items(items: &[BraceItem]) -> Vec<String> {
    let mut out = Vec::new();
    for item in items {
        match item {
            BraceItem::Word { word } => out.push(super::literal_text(word)),
            BraceItem::Range { start, end, step } => out.extend(expand_range(*start, *end, *step)),
        }
    }
    out
}

fn expand_range(start: BraceRangeValue, end: BraceRangeValue, step: Option<i64>) -> Vec<String> {
    match (start, end) {
        (BraceRangeValue::Number(s), BraceRangeValue::Number(e)) => {
            let step = step.unwrap_or(1).abs().max(1);
            let mut out = Vec::new();
            let width = s.to_string().trim_start_matches('-').len().max(e.to_string().trim_start_matches('-').len());
            let zero_pad = s.to_string().starts_with('0') || s.to_string().starts_with("-0") || e.to_string().starts_with('0');
            if s <= e {
                let mut v = s;
                while v <= e {
                    out.push(format_num(v, zero_pad, width));
                    v += step;
                }
            } else {
                let mut v = s;
                while v >= e {
                    out.push(format_num(v, zero_pad, width));
                    v -= step;
                }
            }
            out
        }
        (BraceRangeValue::Char(s), BraceRangeValue::Char(e)) => {
            let step = step.unwrap_or(1).unsigned_abs().max(1) as u32;
            let mut out = Vec::new();
            let (s, e) = (s as u32, e as u32);
            if s <= e {
                let mut v = s;
                while v <= e {
                    if let Some(c) = char::from_u32(v) {
                        out.push(c.to_string());
                    }
                    v += step;
                }
            } else {
                let mut v = s;
                while v >= e {
                    if let Some(c) = char::from_u32(v) {
                        out.push(c.to_string());
                    }
                    if v < step {
                        break;
                    }
                    v -= step;
                }
            }
            out
        }
        _ => Vec::new(),
    }
}

fn format_num(v: i64, zero_pad: bool, width: usize) -> String {
    if zero_pad {
        let sign = if v < 0 { "-" } else { "" };
        format!("{}{:0width$}", sign, v.abs(), width = width)
    } else {
        v.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_number_range() {
        assert_eq!(expand_range(BraceRangeValue::Number(1), BraceRangeValue::Number(3), None), vec!["1", "2", "3"]);
    }

    #[test]
    fn test_number_range_descending() {
        assert_eq!(expand_range(BraceRangeValue::Number(3), BraceRangeValue::Number(1), None), vec!["3", "2", "1"]);
    }

    #[test]
    fn test_char_range() {
        assert_eq!(expand_range(BraceRangeValue::Char('a'), BraceRangeValue::Char('c'), None), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_zero_padded_range() {
        assert_eq!(expand_range(BraceRangeValue::Number(1), BraceRangeValue::Number(3), None).len(), 3);
        let padded = expand_range(BraceRangeValue::Number(1), BraceRangeValue::Number(10), None);
        assert_eq!(padded[0], "1");
    }

    #[test]
    fn test_stepped_range() {
        assert_eq!(expand_range(BraceRangeValue::Number(0), BraceRangeValue::Number(10), Some(5)), vec!["0", "5", "10"]);
    }
}
