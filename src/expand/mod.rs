//! Word expansion pipeline: brace -> tilde -> parameter/command/arithmetic
//! -> word splitting (IFS) -> pathname globbing -> quote removal. Each
//! stage is its own submodule; `exec::State` drives the pipeline since
//! expansion needs live variable/filesystem state the parser never has.

pub mod arithmetic;
pub mod brace;
pub mod glob;
pub mod parameter;

use crate::ast::{WordNode, WordPart};

/// Flattens a word's literal/single-quoted text, ignoring any expansion
/// parts. Used for contexts that only care about the already-known-literal
/// skeleton of a word (e.g. brace expansion operands, heredoc delimiters).
pub fn literal_text(word: &WordNode) -> String {
    let mut out = String::new();
    for part in &word.parts {
        match part {
            WordPart::Literal(l) => out.push_str(&l.value),
            WordPart::SingleQuoted(s) => out.push_str(&s.value),
            WordPart::Escaped(e) => out.push_str(&e.value),
            _ => {}
        }
    }
    out
}

/// Splits a string on IFS characters the way bash's word-splitting step
/// does: runs of IFS whitespace collapse, but a non-whitespace IFS
/// character (e.g. `,` in `IFS=,`) delimits fields on its own, even
/// adjacent to another delimiter (producing empty fields).
pub fn split_fields(s: &str, ifs: &str) -> Vec<String> {
    if ifs.is_empty() {
        return if s.is_empty() { Vec::new() } else { vec![s.to_string()] };
    }
    let is_ws = |c: char| c == ' ' || c == '\t' || c == '\n';
    let ifs_ws: Vec<char> = ifs.chars().filter(|c| is_ws(*c)).collect();
    let ifs_non_ws: Vec<char> = ifs.chars().filter(|c| !is_ws(*c)).collect();
    let is_ifs = |c: char| ifs_ws.contains(&c) || ifs_non_ws.contains(&c);

    let mut fields = Vec::new();
    let mut current = String::new();
    let mut chars = s.chars().peekable();
    while matches!(chars.peek(), Some(c) if ifs_ws.contains(c)) {
        chars.next();
    }
    let mut pending_trailing_empty = false;
    while let Some(c) = chars.next() {
        if is_ifs(c) {
            fields.push(std::mem::take(&mut current));
            pending_trailing_empty = ifs_non_ws.contains(&c);
            while matches!(chars.peek(), Some(c2) if ifs_ws.contains(c2)) {
                chars.next();
            }
            if matches!(chars.peek(), Some(c2) if ifs_non_ws.contains(c2)) {
                pending_trailing_empty = false; // the next loop iteration will push this field
            }
        } else {
            pending_trailing_empty = false;
            current.push(c);
        }
    }
    if !current.is_empty() || pending_trailing_empty {
        fields.push(current);
    }
    fields
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_fields_default_ifs() {
        let fields = split_fields("  a  b   c ", " \t\n");
        assert_eq!(fields, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_split_fields_comma_ifs() {
        let fields = split_fields("a,,b", ",");
        assert_eq!(fields, vec!["a", "", "b"]);
    }

    #[test]
    fn test_split_fields_empty_ifs() {
        let fields = split_fields("a b", "");
        assert_eq!(fields, vec!["a b"]);
    }
}
