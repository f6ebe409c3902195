//! Parses and evaluates `${...}` parameter expansions.
//!
//! Parsing happens once, at lex time, against the raw text captured between
//! the braces (quoting inside it has already been stripped of its outer
//! `${`/`}` delimiters by the lexer's balanced-bracket scan). Evaluation
//! happens later against the live variable table in `exec::State`.

use crate::ast::*;

pub fn parse_braced(inner: &str) -> Result<WordPart, String> {
    let mut chars: Vec<char> = inner.chars().collect();

    if chars.first() == Some(&'!') && chars.len() > 1 {
        // `${!var}` indirection, `${!prefix*}`/`${!prefix@}`, `${!arr[@]}`/`${!arr[*]}`
        let rest: String = chars[1..].iter().collect();
        if let Some(op) = try_array_keys(&rest) {
            return Ok(WordPart::ParameterExpansion(ParameterExpansionPart {
                parameter: op.array.clone(),
                operation: Some(ParameterOperation::ArrayKeys(op)),
            }));
        }
        if let Some(prefix) = rest.strip_suffix('*') {
            return Ok(mk(prefix, ParameterOperation::VarNamePrefix(VarNamePrefixOp { prefix: prefix.to_string(), star: true })));
        }
        if let Some(prefix) = rest.strip_suffix('@') {
            if is_identifier(prefix) {
                return Ok(mk(prefix, ParameterOperation::VarNamePrefix(VarNamePrefixOp { prefix: prefix.to_string(), star: false })));
            }
        }
        let (name, remainder) = split_name(&rest);
        let inner_op = parse_operation(&remainder)?;
        return Ok(mk(&name, ParameterOperation::Indirection(IndirectionOp { inner_op: inner_op.map(Box::new) })));
    }

    if chars.first() == Some(&'#') && chars.len() > 1 {
        let rest: String = chars[1..].iter().collect();
        // `${#}` (parameter "#") is handled by the len()==1 guard above;
        // anything else after `#` is treated as `${#name}` length.
        if is_identifier(&rest) || is_special_param(&rest) {
            return Ok(mk(&rest, ParameterOperation::Inner(InnerParameterOperation::Length(LengthOp))));
        }
    }

    let ((name, subscript), remainder) = split_name_with_subscript(&mut chars);
    let inner_op = parse_operation(&remainder)?;
    match (subscript, inner_op) {
        (Some(mut sub), op) => {
            sub.operation = op.map(Box::new);
            Ok(mk(&name, ParameterOperation::ArraySubscript(sub)))
        }
        (None, Some(op)) => Ok(mk(&name, ParameterOperation::Inner(op))),
        (None, None) => Ok(bare_param(&name)),
    }
}

fn bare_param(name: &str) -> WordPart {
    WordPart::ParameterExpansion(ParameterExpansionPart { parameter: name.to_string(), operation: None })
}

fn mk(name: &str, op: ParameterOperation) -> WordPart {
    WordPart::ParameterExpansion(ParameterExpansionPart { parameter: name.to_string(), operation: Some(op) })
}

fn is_identifier(s: &str) -> bool {
    !s.is_empty()
        && s.chars().next().map(|c| c.is_alphabetic() || c == '_').unwrap_or(false)
        && s.chars().all(|c| c.is_alphanumeric() || c == '_')
}

fn is_special_param(s: &str) -> bool {
    s.len() == 1 && "@*#?$!-0123456789".contains(s)
}

fn try_array_keys(s: &str) -> Option<ArrayKeysOp> {
    for suffix in ["[@]", "[*]"] {
        if let Some(array) = s.strip_suffix(suffix) {
            if is_identifier(array) {
                return Some(ArrayKeysOp { array: array.to_string(), star: suffix == "[*]" });
            }
        }
    }
    None
}

/// Splits a leading identifier (or single special-parameter char) from the
/// rest of the string, which may be an array subscript and/or an operation.
fn split_name(s: &str) -> (String, String) {
    let chars: Vec<char> = s.chars().collect();
    if chars.is_empty() {
        return (String::new(), String::new());
    }
    if chars[0].is_alphabetic() || chars[0] == '_' {
        let mut i = 1;
        while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_') {
            i += 1;
        }
        (chars[..i].iter().collect(), chars[i..].iter().collect())
    } else {
        (chars[0].to_string(), chars[1..].iter().collect())
    }
}

fn split_name_with_subscript(chars: &mut [char]) -> ((String, Option<ArraySubscriptOp>), String) {
    let s: String = chars.iter().collect();
    let (name, rest) = split_name(&s);
    if let Some(stripped) = rest.strip_prefix('[') {
        if let Some(close) = find_matching_bracket(stripped) {
            let index_text = &stripped[..close];
            let after = &stripped[close + 1..];
            let index = match index_text {
                "@" => ArraySubscriptIndex::All,
                "*" => ArraySubscriptIndex::AllConcat,
                _ => match crate::expand::arithmetic::parse(index_text) {
                    Ok(expr) => ArraySubscriptIndex::Expr(expr),
                    Err(_) => ArraySubscriptIndex::StringKey(index_text.to_string()),
                },
            };
            return ((name, Some(ArraySubscriptOp { index, operation: None })), after.to_string());
        }
    }
    ((name, None), rest)
}

fn find_matching_bracket(s: &str) -> Option<usize> {
    let mut depth = 1i32;
    for (i, c) in s.char_indices() {
        match c {
            '[' => depth += 1,
            ']' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

/// Parses the operation suffix following a parameter name (everything after
/// the name/subscript has been stripped).
fn parse_operation(s: &str) -> Result<Option<InnerParameterOperation>, String> {
    if s.is_empty() {
        return Ok(None);
    }
    let bytes: Vec<char> = s.chars().collect();
    macro_rules! word_of {
        ($t:expr) => {
            WordNode::literal($t)
        };
    }

    if let Some(rest) = s.strip_prefix(":-") {
        return Ok(Some(InnerParameterOperation::DefaultValue(DefaultValueOp { word: word_of!(rest), check_empty: true })));
    }
    if let Some(rest) = s.strip_prefix(":=") {
        return Ok(Some(InnerParameterOperation::AssignDefault(AssignDefaultOp { word: word_of!(rest), check_empty: true })));
    }
    if let Some(rest) = s.strip_prefix(":?") {
        return Ok(Some(InnerParameterOperation::ErrorIfUnset(ErrorIfUnsetOp {
            word: if rest.is_empty() { None } else { Some(word_of!(rest)) },
            check_empty: true,
        })));
    }
    if let Some(rest) = s.strip_prefix(":+") {
        return Ok(Some(InnerParameterOperation::UseAlternative(UseAlternativeOp { word: word_of!(rest), check_empty: true })));
    }
    if let Some(rest) = s.strip_prefix('-') {
        return Ok(Some(InnerParameterOperation::DefaultValue(DefaultValueOp { word: word_of!(rest), check_empty: false })));
    }
    if let Some(rest) = s.strip_prefix('=') {
        return Ok(Some(InnerParameterOperation::AssignDefault(AssignDefaultOp { word: word_of!(rest), check_empty: false })));
    }
    if let Some(rest) = s.strip_prefix('?') {
        return Ok(Some(InnerParameterOperation::ErrorIfUnset(ErrorIfUnsetOp {
            word: if rest.is_empty() { None } else { Some(word_of!(rest)) },
            check_empty: false,
        })));
    }
    if let Some(rest) = s.strip_prefix('+') {
        return Ok(Some(InnerParameterOperation::UseAlternative(UseAlternativeOp { word: word_of!(rest), check_empty: false })));
    }
    if s.starts_with(':') && bytes.len() > 1 {
        let rest = &s[1..];
        let parts: Vec<&str> = rest.splitn(2, ':').collect();
        let offset = crate::expand::arithmetic::parse(parts[0]).map_err(|e| e.to_string())?;
        let length = match parts.get(1) {
            Some(l) => Some(crate::expand::arithmetic::parse(l).map_err(|e| e.to_string())?),
            None => None,
        };
        return Ok(Some(InnerParameterOperation::Substring(SubstringOp { offset, length })));
    }
    if let Some(rest) = s.strip_prefix("##") {
        return Ok(Some(InnerParameterOperation::PatternRemoval(PatternRemovalOp {
            pattern: word_of!(rest),
            side: PatternRemovalSide::Prefix,
            greedy: true,
        })));
    }
    if let Some(rest) = s.strip_prefix('#') {
        return Ok(Some(InnerParameterOperation::PatternRemoval(PatternRemovalOp {
            pattern: word_of!(rest),
            side: PatternRemovalSide::Prefix,
            greedy: false,
        })));
    }
    if let Some(rest) = s.strip_prefix("%%") {
        return Ok(Some(InnerParameterOperation::PatternRemoval(PatternRemovalOp {
            pattern: word_of!(rest),
            side: PatternRemovalSide::Suffix,
            greedy: true,
        })));
    }
    if let Some(rest) = s.strip_prefix('%') {
        return Ok(Some(InnerParameterOperation::PatternRemoval(PatternRemovalOp {
            pattern: word_of!(rest),
            side: PatternRemovalSide::Suffix,
            greedy: false,
        })));
    }
    if let Some(rest) = s.strip_prefix("//") {
        return Ok(Some(parse_replacement(rest, true)));
    }
    if let Some(rest) = s.strip_prefix('/') {
        return Ok(Some(parse_replacement(rest, false)));
    }
    if let Some(rest) = s.strip_prefix("^^") {
        return Ok(Some(InnerParameterOperation::CaseModification(CaseModificationOp {
            direction: CaseDirection::Upper,
            all: true,
            pattern: non_empty_word(rest),
        })));
    }
    if let Some(rest) = s.strip_prefix('^') {
        return Ok(Some(InnerParameterOperation::CaseModification(CaseModificationOp {
            direction: CaseDirection::Upper,
            all: false,
            pattern: non_empty_word(rest),
        })));
    }
    if let Some(rest) = s.strip_prefix(",,") {
        return Ok(Some(InnerParameterOperation::CaseModification(CaseModificationOp {
            direction: CaseDirection::Lower,
            all: true,
            pattern: non_empty_word(rest),
        })));
    }
    if let Some(rest) = s.strip_prefix(',') {
        return Ok(Some(InnerParameterOperation::CaseModification(CaseModificationOp {
            direction: CaseDirection::Lower,
            all: false,
            pattern: non_empty_word(rest),
        })));
    }
    if let Some(rest) = s.strip_prefix('@') {
        let operator = match rest {
            "Q" => TransformOperator::Quote,
            "A" => TransformOperator::Assignment,
            "L" => TransformOperator::Length,
            "U" => TransformOperator::UpperFirst,
            "u" => TransformOperator::UpperFirst,
            "l" => TransformOperator::LowerFirst,
            _ => return Err(format!("bad substitution: @{rest}")),
        };
        return Ok(Some(InnerParameterOperation::Transform(TransformOp { operator })));
    }
    Err(format!("bad substitution: {s}"))
}

fn non_empty_word(s: &str) -> Option<WordNode> {
    if s.is_empty() {
        None
    } else {
        Some(WordNode::literal(s))
    }
}

fn parse_replacement(rest: &str, all: bool) -> InnerParameterOperation {
    let (anchor, rest) = if let Some(r) = rest.strip_prefix('#') {
        (Some(PatternAnchor::Start), r)
    } else if let Some(r) = rest.strip_prefix('%') {
        (Some(PatternAnchor::End), r)
    } else {
        (None, rest)
    };
    let mut parts = rest.splitn(2, '/');
    let pattern = parts.next().unwrap_or("");
    let replacement = parts.next();
    InnerParameterOperation::PatternReplacement(PatternReplacementOp {
        pattern: WordNode::literal(pattern),
        replacement: replacement.map(WordNode::literal),
        all,
        anchor,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn op_of(s: &str) -> WordPart {
        parse_braced(s).unwrap()
    }

    #[test]
    fn test_plain_name() {
        let p = op_of("foo");
        assert!(matches!(p, WordPart::ParameterExpansion(pe) if pe.parameter == "foo" && pe.operation.is_none()));
    }

    #[test]
    fn test_default_value() {
        let p = op_of("foo:-bar");
        match p {
            WordPart::ParameterExpansion(pe) => match pe.operation {
                Some(ParameterOperation::Inner(InnerParameterOperation::DefaultValue(d))) => assert!(d.check_empty),
                _ => panic!("wrong op"),
            },
            _ => panic!("wrong part"),
        }
    }

    #[test]
    fn test_length() {
        let p = op_of("#foo");
        assert!(matches!(p, WordPart::ParameterExpansion(pe) if matches!(pe.operation, Some(ParameterOperation::Inner(InnerParameterOperation::Length(_))))));
    }

    #[test]
    fn test_suffix_pattern_removal() {
        let p = op_of("foo%%.txt");
        assert!(matches!(p, WordPart::ParameterExpansion(pe) if matches!(pe.operation, Some(ParameterOperation::Inner(InnerParameterOperation::PatternRemoval(ref r))) if r.greedy)));
    }

    #[test]
    fn test_array_all() {
        let p = op_of("arr[@]");
        if let WordPart::ParameterExpansion(pe) = p {
            assert_eq!(pe.parameter, "arr");
            assert!(matches!(pe.operation, Some(ParameterOperation::ArraySubscript(ref s)) if matches!(s.index, ArraySubscriptIndex::All)));
        } else {
            panic!();
        }
    }

    #[test]
    fn test_indirection() {
        let p = op_of("!foo");
        assert!(matches!(p, WordPart::ParameterExpansion(pe) if matches!(pe.operation, Some(ParameterOperation::Indirection(_)))));
    }

    #[test]
    fn test_case_modification_upper_all() {
        let p = op_of("foo^^");
        assert!(matches!(p, WordPart::ParameterExpansion(pe) if matches!(pe.operation, Some(ParameterOperation::Inner(InnerParameterOperation::CaseModification(ref c))) if c.all)));
    }

    #[test]
    fn test_substring() {
        let p = op_of("foo:1:3");
        assert!(matches!(p, WordPart::ParameterExpansion(pe) if matches!(pe.operation, Some(ParameterOperation::Inner(InnerParameterOperation::Substring(_))))));
    }
}
