//! Parses and evaluates `[[ ... ]]` conditional expressions.
//!
//! Parsing happens once at parse time (on the raw word/operator sequence
//! the lexer captured between `[[` and `]]`); evaluation happens at
//! execution time against the current `State`, after each operand word has
//! gone through expansion but notably NOT word-splitting or globbing
//! (bash's own `[[` quoting rule).

use crate::ast::*;
use crate::exec::State;
use regex_lite::Regex;

/// Builds a `ConditionalExpressionNode` from the flat word/operator token
/// sequence between `[[` and `]]`. Operator words here are still plain
/// `WordNode`s from the lexer (e.g. `-f`, `==`, `&&`) since `[[` is not a
/// normal command and its operators aren't shell metacharacters.
pub fn parse_words(words: &[WordNode]) -> Result<ConditionalExpressionNode, String> {
    let mut p = CondParser { words, pos: 0 };
    let expr = p.parse_or()?;
    if p.pos != p.words.len() {
        return Err("trailing tokens in '[[ ]]'".to_string());
    }
    Ok(expr)
}

struct CondParser<'a> {
    words: &'a [WordNode],
    pos: usize,
}

fn text_of(w: &WordNode) -> String {
    let mut out = String::new();
    for p in &w.parts {
        match p {
            WordPart::Literal(l) => out.push_str(&l.value),
            WordPart::SingleQuoted(s) => out.push_str(&s.value),
            _ => {}
        }
    }
    out
}

impl<'a> CondParser<'a> {
    fn peek(&self) -> Option<&WordNode> {
        self.words.get(self.pos)
    }

    fn peek_text(&self) -> Option<String> {
        self.peek().map(text_of)
    }

    fn advance(&mut self) -> Option<WordNode> {
        let w = self.words.get(self.pos).cloned();
        if w.is_some() {
            self.pos += 1;
        }
        w
    }

    fn parse_or(&mut self) -> Result<ConditionalExpressionNode, String> {
        let mut left = self.parse_and()?;
        while matches!(self.peek_text().as_deref(), Some("||") | Some("-o")) {
            self.advance();
            let right = self.parse_and()?;
            left = ConditionalExpressionNode::Or(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<ConditionalExpressionNode, String> {
        let mut left = self.parse_unary_or_group()?;
        while matches!(self.peek_text().as_deref(), Some("&&") | Some("-a")) {
            self.advance();
            let right = self.parse_unary_or_group()?;
            left = ConditionalExpressionNode::And(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_unary_or_group(&mut self) -> Result<ConditionalExpressionNode, String> {
        if matches!(self.peek_text().as_deref(), Some("!")) {
            self.advance();
            let inner = self.parse_unary_or_group()?;
            return Ok(ConditionalExpressionNode::Not(Box::new(inner)));
        }
        if matches!(self.peek_text().as_deref(), Some("(")) {
            self.advance();
            let inner = self.parse_or()?;
            if !matches!(self.peek_text().as_deref(), Some(")")) {
                return Err("expected ')' in '[[ ]]'".to_string());
            }
            self.advance();
            return Ok(ConditionalExpressionNode::Group(Box::new(inner)));
        }
        if let Some(op) = self.peek_text().as_deref().and_then(unary_operator) {
            self.advance();
            let operand = self.advance().ok_or("expected operand after unary test operator")?;
            return Ok(ConditionalExpressionNode::Unary(CondUnaryNode { operator: op, operand }));
        }
        self.parse_binary_or_word()
    }

    fn parse_binary_or_word(&mut self) -> Result<ConditionalExpressionNode, String> {
        let left = self.advance().ok_or("expected operand in '[[ ]]'")?;
        if let Some(op_text) = self.peek_text() {
            if let Some(op) = binary_operator(&op_text) {
                self.advance();
                let right = self.advance().ok_or("expected right-hand operand")?;
                return Ok(ConditionalExpressionNode::Binary(CondBinaryNode { operator: op, left, right }));
            }
        }
        Ok(ConditionalExpressionNode::Word(left))
    }
}

fn unary_operator(s: &str) -> Option<CondUnaryOperator> {
    Some(match s {
        "-e" => CondUnaryOperator::Exists,
        "-f" => CondUnaryOperator::IsFile,
        "-d" => CondUnaryOperator::IsDir,
        "-L" | "-h" => CondUnaryOperator::IsSymlink,
        "-r" => CondUnaryOperator::Readable,
        "-w" => CondUnaryOperator::Writable,
        "-x" => CondUnaryOperator::Executable,
        "-s" => CondUnaryOperator::NonEmpty,
        "-z" => CondUnaryOperator::StringEmpty,
        "-n" => CondUnaryOperator::StringNonEmpty,
        "-v" => CondUnaryOperator::VarSet,
        _ => return None,
    })
}

fn binary_operator(s: &str) -> Option<CondBinaryOperator> {
    Some(match s {
        "=" => CondBinaryOperator::Eq,
        "==" => CondBinaryOperator::EqEq,
        "!=" => CondBinaryOperator::Ne,
        "=~" => CondBinaryOperator::Match,
        "<" => CondBinaryOperator::Lt,
        ">" => CondBinaryOperator::Gt,
        "-eq" => CondBinaryOperator::NumEq,
        "-ne" => CondBinaryOperator::NumNe,
        "-lt" => CondBinaryOperator::NumLt,
        "-le" => CondBinaryOperator::NumLe,
        "-gt" => CondBinaryOperator::NumGt,
        "-ge" => CondBinaryOperator::NumGe,
        _ => return None,
    })
}

pub async fn eval(expr: &ConditionalExpressionNode, state: &mut State) -> Result<bool, crate::error::ShellError> {
    match expr {
        ConditionalExpressionNode::Word(w) => {
            let s = state.expand_word_to_string(w).await?;
            Ok(!s.is_empty())
        }
        ConditionalExpressionNode::Not(inner) => Ok(!Box::pin(eval(inner, state)).await?),
        ConditionalExpressionNode::Group(inner) => Box::pin(eval(inner, state)).await,
        ConditionalExpressionNode::And(l, r) => {
            Ok(Box::pin(eval(l, state)).await? && Box::pin(eval(r, state)).await?)
        }
        ConditionalExpressionNode::Or(l, r) => {
            Ok(Box::pin(eval(l, state)).await? || Box::pin(eval(r, state)).await?)
        }
        ConditionalExpressionNode::Unary(u) => eval_unary(u, state).await,
        ConditionalExpressionNode::Binary(b) => eval_binary(b, state).await,
    }
}

async fn eval_unary(u: &CondUnaryNode, state: &mut State) -> Result<bool, crate::error::ShellError> {
    let operand = state.expand_word_to_string(&u.operand).await?;
    Ok(match u.operator {
        CondUnaryOperator::Exists => state.fs.exists(&state.resolve(&operand)).await,
        CondUnaryOperator::IsFile => state
            .fs
            .stat(&state.resolve(&operand))
            .await
            .map(|s| s.is_file)
            .unwrap_or(false),
        CondUnaryOperator::IsDir => state
            .fs
            .stat(&state.resolve(&operand))
            .await
            .map(|s| s.is_directory)
            .unwrap_or(false),
        CondUnaryOperator::IsSymlink => state
            .fs
            .lstat(&state.resolve(&operand))
            .await
            .map(|s| s.is_symlink)
            .unwrap_or(false),
        CondUnaryOperator::Readable | CondUnaryOperator::Writable | CondUnaryOperator::Executable => {
            state.fs.exists(&state.resolve(&operand)).await
        }
        CondUnaryOperator::NonEmpty => state
            .fs
            .stat(&state.resolve(&operand))
            .await
            .map(|s| s.size > 0)
            .unwrap_or(false),
        CondUnaryOperator::StringEmpty => operand.is_empty(),
        CondUnaryOperator::StringNonEmpty => !operand.is_empty(),
        CondUnaryOperator::VarSet => state.is_set(&operand),
    })
}

async fn eval_binary(b: &CondBinaryNode, state: &mut State) -> Result<bool, crate::error::ShellError> {
    let left = state.expand_word_to_string(&b.left).await?;
    let right = state.expand_word_to_string(&b.right).await?;
    Ok(match b.operator {
        CondBinaryOperator::Eq | CondBinaryOperator::EqEq => glob_match(&right, &left),
        CondBinaryOperator::Ne => !glob_match(&right, &left),
        CondBinaryOperator::Match => Regex::new(&right).map(|re| re.is_match(&left)).unwrap_or(false),
        CondBinaryOperator::Lt => left < right,
        CondBinaryOperator::Gt => left > right,
        CondBinaryOperator::NumEq => numeric(&left) == numeric(&right),
        CondBinaryOperator::NumNe => numeric(&left) != numeric(&right),
        CondBinaryOperator::NumLt => numeric(&left) < numeric(&right),
        CondBinaryOperator::NumLe => numeric(&left) <= numeric(&right),
        CondBinaryOperator::NumGt => numeric(&left) > numeric(&right),
        CondBinaryOperator::NumGe => numeric(&left) >= numeric(&right),
    })
}

fn numeric(s: &str) -> i64 {
    s.trim().parse().unwrap_or(0)
}

fn glob_match(pattern: &str, text: &str) -> bool {
    crate::expand::glob::matches_pattern(pattern, text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_binary() {
        let words = vec![WordNode::literal("foo"), WordNode::literal("=="), WordNode::literal("foo")];
        let expr = parse_words(&words).unwrap();
        assert!(matches!(expr, ConditionalExpressionNode::Binary(_)));
    }

    #[test]
    fn test_parse_unary() {
        let words = vec![WordNode::literal("-f"), WordNode::literal("/tmp/x")];
        let expr = parse_words(&words).unwrap();
        assert!(matches!(expr, ConditionalExpressionNode::Unary(_)));
    }

    #[test]
    fn test_parse_and_or() {
        let words = vec![
            WordNode::literal("-n"),
            WordNode::literal("a"),
            WordNode::literal("&&"),
            WordNode::literal("-z"),
            WordNode::literal("b"),
        ];
        let expr = parse_words(&words).unwrap();
        assert!(matches!(expr, ConditionalExpressionNode::And(_, _)));
    }

    #[test]
    fn test_parse_negation() {
        let words = vec![WordNode::literal("!"), WordNode::literal("-e"), WordNode::literal("/x")];
        let expr = parse_words(&words).unwrap();
        assert!(matches!(expr, ConditionalExpressionNode::Not(_)));
    }
}
