//! Single-pass lexer with a mode stack (normal, double-quote, heredoc-body),
//! producing a flat token stream the parser walks. Word scanning (quotes,
//! escapes, and the `$`/backtick/`<(`/`>(` expansion forms) happens here,
//! the same way bash's own tokenizer folds word- and quote-reading into one
//! pass instead of treating expansions as a separate grammar layer.

use crate::ast::*;
use crate::error::SyntaxError;
use std::collections::VecDeque;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Semicolon,
    DSemi,
    SemiAnd,
    SemiSemiAnd,
    AndAnd,
    OrOr,
    Pipe,
    PipeAmp,
    Amp,
    LParen,
    RParen,
    Newline,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Word(WordNode),
    Op(Op),
    Redirect(RedirectionNode),
    Eof,
}

pub struct Lexer<'a> {
    chars: Vec<char>,
    pos: usize,
    line: usize,
    column: usize,
    src: &'a str,
    pending_heredocs: VecDeque<(String, bool, bool)>, // (delimiter, strip_tabs, quoted)
}

pub fn tokenize(src: &str) -> Result<Vec<Token>, SyntaxError> {
    Lexer::new(src).run()
}

impl<'a> Lexer<'a> {
    pub fn new(src: &'a str) -> Self {
        Self {
            chars: src.chars().collect(),
            pos: 0,
            line: 1,
            column: 1,
            src,
            pending_heredocs: VecDeque::new(),
        }
    }

    fn position(&self) -> Position {
        Position {
            line: self.line,
            column: self.column,
            offset: self.pos,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.chars.get(self.pos).copied();
        if let Some(c) = c {
            self.pos += 1;
            if c == '\n' {
                self.line += 1;
                self.column = 1;
            } else {
                self.column += 1;
            }
        }
        c
    }

    fn err(&self, message: impl Into<String>) -> SyntaxError {
        SyntaxError::at(self.position(), message)
    }

    fn skip_inline_whitespace(&mut self) {
        while let Some(c) = self.peek() {
            if c == ' ' || c == '\t' {
                self.advance();
            } else if c == '\\' && self.peek_at(1) == Some('\n') {
                self.advance();
                self.advance();
            } else if c == '#' {
                while let Some(c) = self.peek() {
                    if c == '\n' {
                        break;
                    }
                    self.advance();
                }
            } else {
                break;
            }
        }
    }

    pub fn run(mut self) -> Result<Vec<Token>, SyntaxError> {
        let mut tokens = Vec::new();
        loop {
            self.skip_inline_whitespace();
            let Some(c) = self.peek() else {
                tokens.push(Token::Eof);
                break;
            };
            if c == '\n' {
                self.advance();
                self.consume_pending_heredocs(&mut tokens)?;
                tokens.push(Token::Op(Op::Newline));
                continue;
            }
            if c.is_ascii_digit() && self.looks_like_io_number() {
                let fd = self.read_io_number();
                self.read_redirection(&mut tokens, Some(fd))?;
                continue;
            }
            match c {
                ';' => {
                    self.advance();
                    if self.peek() == Some(';') {
                        self.advance();
                        if self.peek() == Some('&') {
                            self.advance();
                            tokens.push(Token::Op(Op::SemiSemiAnd));
                        } else {
                            tokens.push(Token::Op(Op::DSemi));
                        }
                    } else if self.peek() == Some('&') {
                        self.advance();
                        tokens.push(Token::Op(Op::SemiAnd));
                    } else {
                        tokens.push(Token::Op(Op::Semicolon));
                    }
                }
                '&' => {
                    self.advance();
                    if self.peek() == Some('&') {
                        self.advance();
                        tokens.push(Token::Op(Op::AndAnd));
                    } else if self.peek() == Some('>') {
                        // &> / &>>
                        self.advance();
                        let op = if self.peek() == Some('>') {
                            self.advance();
                            RedirectionOperator::AndDGreat
                        } else {
                            RedirectionOperator::AndGreat
                        };
                        let target = self.read_word(false)?;
                        tokens.push(Token::Redirect(RedirectionNode {
                            fd: None,
                            fd_variable: None,
                            operator: op,
                            target: RedirectionTarget::Word(target),
                        }));
                    } else {
                        tokens.push(Token::Op(Op::Amp));
                    }
                }
                '|' => {
                    self.advance();
                    if self.peek() == Some('|') {
                        self.advance();
                        tokens.push(Token::Op(Op::OrOr));
                    } else if self.peek() == Some('&') {
                        self.advance();
                        tokens.push(Token::Op(Op::PipeAmp));
                    } else {
                        tokens.push(Token::Op(Op::Pipe));
                    }
                }
                '(' => {
                    self.advance();
                    tokens.push(Token::Op(Op::LParen));
                }
                ')' => {
                    self.advance();
                    tokens.push(Token::Op(Op::RParen));
                }
                '(' if self.peek_at(1) == Some('(') => {
                    // `((` at command position always starts an arithmetic
                    // command; a literal nested subshell needs a space
                    // between its parens, same as real bash.
                    self.advance();
                    self.advance();
                    tokens.push(Token::Word(WordNode::literal("((")));
                }
                '<' | '>' if self.peek_at(1) == Some('(') => {
                    let direction = if c == '<' { ProcessDirection::Input } else { ProcessDirection::Output };
                    self.advance();
                    let inner = self.read_balanced("(", ")")?;
                    let body = crate::parser::parse(&inner).map_err(|e| self.err(e.to_string()))?;
                    tokens.push(Token::Word(WordNode::new(vec![WordPart::ProcessSubstitution(
                        ProcessSubstitutionPart { body, direction },
                    )])));
                }
                '<' | '>' => {
                    self.read_redirection(&mut tokens, None)?;
                }
                _ => {
                    let word = self.read_word(true)?;
                    tokens.push(Token::Word(word));
                }
            }
        }
        Ok(tokens)
    }

    fn looks_like_io_number(&self) -> bool {
        let mut i = self.pos;
        while matches!(self.chars.get(i), Some(c) if c.is_ascii_digit()) {
            i += 1;
        }
        matches!(self.chars.get(i), Some('<') | Some('>'))
    }

    fn read_io_number(&mut self) -> i32 {
        let start = self.pos;
        while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
            self.advance();
        }
        self.src_slice(start, self.pos).parse().unwrap_or(0)
    }

    fn src_slice(&self, start: usize, end: usize) -> String {
        self.chars[start..end].iter().collect()
    }

    fn read_redirection(&mut self, tokens: &mut Vec<Token>, fd: Option<i32>) -> Result<(), SyntaxError> {
        let c = self.advance().unwrap();
        let operator = if c == '<' {
            match self.peek() {
                Some('<') => {
                    self.advance();
                    if self.peek() == Some('-') {
                        self.advance();
                        RedirectionOperator::DLessDash
                    } else if self.peek() == Some('<') {
                        self.advance();
                        RedirectionOperator::TLess
                    } else {
                        RedirectionOperator::DLess
                    }
                }
                Some('>') => {
                    self.advance();
                    RedirectionOperator::LessGreat
                }
                Some('&') => {
                    self.advance();
                    RedirectionOperator::LessAnd
                }
                _ => RedirectionOperator::Less,
            }
        } else {
            match self.peek() {
                Some('>') => {
                    self.advance();
                    RedirectionOperator::DGreat
                }
                Some('&') => {
                    self.advance();
                    RedirectionOperator::GreatAnd
                }
                Some('|') => {
                    self.advance();
                    RedirectionOperator::Clobber
                }
                _ => RedirectionOperator::Great,
            }
        };

        if matches!(operator, RedirectionOperator::DLess | RedirectionOperator::DLessDash) {
            self.skip_inline_whitespace();
            let strip_tabs = matches!(operator, RedirectionOperator::DLessDash);
            let delim_word = self.read_word(false)?;
            let quoted = word_has_quotes(&delim_word);
            let delimiter = word_literal_text(&delim_word);
            self.pending_heredocs.push_back((delimiter.clone(), strip_tabs, quoted));
            tokens.push(Token::Redirect(RedirectionNode {
                fd,
                fd_variable: None,
                operator,
                target: RedirectionTarget::HereDoc(HereDocNode {
                    delimiter,
                    content: WordNode::default(),
                    strip_tabs,
                    quoted,
                }),
            }));
            return Ok(());
        }

        self.skip_inline_whitespace();
        let target = self.read_word(false)?;
        tokens.push(Token::Redirect(RedirectionNode {
            fd,
            fd_variable: None,
            operator,
            target: RedirectionTarget::Word(target),
        }));
        Ok(())
    }

    /// Reads raw lines until the heredoc delimiter for each pending heredoc
    /// registered since the last newline, in FIFO order, and patches the
    /// most recently emitted matching `Token::Redirect` entries.
    fn consume_pending_heredocs(&mut self, tokens: &mut [Token]) -> Result<(), SyntaxError> {
        while let Some((delimiter, strip_tabs, quoted)) = self.pending_heredocs.pop_front() {
            let mut lines = Vec::new();
            loop {
                if self.peek().is_none() {
                    return Err(self.err(format!("unexpected EOF while looking for heredoc delimiter '{}'", delimiter)));
                }
                let start = self.pos;
                while let Some(c) = self.peek() {
                    if c == '\n' {
                        break;
                    }
                    self.advance();
                }
                let mut line: String = self.src_slice(start, self.pos);
                if self.peek() == Some('\n') {
                    self.advance();
                }
                let trimmed = if strip_tabs { line.trim_start_matches('\t') } else { line.as_str() };
                if trimmed == delimiter {
                    break;
                }
                if strip_tabs {
                    line = trimmed.to_string();
                }
                lines.push(line);
            }
            let content_text = if lines.is_empty() { String::new() } else { format!("{}\n", lines.join("\n")) };
            let content = if quoted {
                WordNode::literal(content_text)
            } else {
                parse_double_quoted_content(&content_text)?
            };
            for tok in tokens.iter_mut().rev() {
                if let Token::Redirect(r) = tok {
                    if let RedirectionTarget::HereDoc(h) = &mut r.target {
                        if h.delimiter == delimiter && h.content.is_empty_literal() {
                            h.content = content;
                            break;
                        }
                    }
                }
            }
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Word scanning
    // ------------------------------------------------------------------

    /// Reads one word. `stop_at_operators` controls whether shell
    /// metacharacters end the word (true for normal command-position
    /// scanning, false for redirection targets/heredoc delimiters where
    /// only whitespace/newline ends the word).
    fn read_word(&mut self, stop_at_operators: bool) -> Result<WordNode, SyntaxError> {
        let mut parts = Vec::new();
        let mut literal = String::new();

        macro_rules! flush {
            () => {
                if !literal.is_empty() {
                    parts.push(WordPart::Literal(LiteralPart { value: std::mem::take(&mut literal) }));
                }
            };
        }

        loop {
            let Some(c) = self.peek() else { break };
            if c.is_whitespace() {
                break;
            }
            if stop_at_operators && "|&;()<>".contains(c) {
                break;
            }
            match c {
                '\'' => {
                    flush!();
                    parts.push(WordPart::SingleQuoted(self.read_single_quoted()?));
                }
                '"' => {
                    flush!();
                    parts.push(WordPart::DoubleQuoted(self.read_double_quoted()?));
                }
                '\\' => {
                    self.advance();
                    match self.advance() {
                        Some('\n') => {}
                        Some(escaped) => literal.push(escaped),
                        None => literal.push('\\'),
                    }
                }
                '$' => {
                    flush!();
                    parts.push(self.read_dollar()?);
                }
                '`' => {
                    flush!();
                    parts.push(self.read_backtick()?);
                }
                '[' if literal.is_empty() && parts.is_empty() && self.peek_at(1) == Some('[') => {
                    self.advance();
                    self.advance();
                    literal.push_str("[[");
                }
                '*' | '?' if !stop_at_operators => {
                    literal.push(c);
                    self.advance();
                }
                '*' | '?' | '[' => {
                    flush!();
                    let start = self.pos;
                    self.advance();
                    parts.push(WordPart::Glob(GlobPart {
                        pattern: self.src_slice(start, self.pos),
                    }));
                }
                '~' if literal.is_empty() && parts.is_empty() => {
                    self.advance();
                    let start = self.pos;
                    while matches!(self.peek(), Some(c) if c.is_alphanumeric() || c == '_' || c == '-') {
                        self.advance();
                    }
                    let user = self.src_slice(start, self.pos);
                    parts.push(WordPart::TildeExpansion(TildeExpansionPart {
                        user: if user.is_empty() { None } else { Some(user) },
                    }));
                }
                '{' if !matches!(self.peek_at(1), None | Some(' ') | Some('\t') | Some('\n')) => {
                    if let Some(brace) = self.try_read_brace_expansion()? {
                        flush!();
                        parts.push(brace);
                    } else {
                        literal.push(c);
                        self.advance();
                    }
                }
                '{' | '}' => {
                    literal.push(c);
                    self.advance();
                }
                _ => {
                    literal.push(c);
                    self.advance();
                }
            }
        }
        flush!();
        Ok(WordNode::new(parts))
    }

    fn read_single_quoted(&mut self) -> Result<SingleQuotedPart, SyntaxError> {
        self.advance(); // opening quote
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c == '\'' {
                break;
            }
            self.advance();
        }
        if self.peek() != Some('\'') {
            return Err(self.err("unterminated single-quoted string"));
        }
        let value = self.src_slice(start, self.pos);
        self.advance();
        Ok(SingleQuotedPart { value })
    }

    fn read_double_quoted(&mut self) -> Result<DoubleQuotedPart, SyntaxError> {
        self.advance(); // opening quote
        let mut parts = Vec::new();
        let mut literal = String::new();
        loop {
            let Some(c) = self.peek() else {
                return Err(self.err("unterminated double-quoted string"));
            };
            if c == '"' {
                self.advance();
                break;
            }
            match c {
                '\\' => {
                    self.advance();
                    match self.peek() {
                        Some(e @ ('$' | '`' | '"' | '\\' | '\n')) => {
                            self.advance();
                            if e != '\n' {
                                literal.push(e);
                            }
                        }
                        Some(other) => {
                            literal.push('\\');
                            literal.push(other);
                            self.advance();
                        }
                        None => literal.push('\\'),
                    }
                }
                '$' => {
                    if !literal.is_empty() {
                        parts.push(WordPart::Literal(LiteralPart { value: std::mem::take(&mut literal) }));
                    }
                    parts.push(self.read_dollar()?);
                }
                '`' => {
                    if !literal.is_empty() {
                        parts.push(WordPart::Literal(LiteralPart { value: std::mem::take(&mut literal) }));
                    }
                    parts.push(self.read_backtick()?);
                }
                _ => {
                    literal.push(c);
                    self.advance();
                }
            }
        }
        if !literal.is_empty() {
            parts.push(WordPart::Literal(LiteralPart { value: literal }));
        }
        Ok(DoubleQuotedPart { parts })
    }

    fn read_dollar(&mut self) -> Result<WordPart, SyntaxError> {
        self.advance(); // '$'
        match self.peek() {
            Some('(') => {
                if self.peek_at(1) == Some('(') {
                    let inner = self.read_balanced("((", "))")?;
                    let expr = crate::expand::arithmetic::parse(&inner).map_err(|e| self.err(e.to_string()))?;
                    Ok(WordPart::ArithmeticExpansion(ArithmeticExpansionPart { expression: expr }))
                } else {
                    let inner = self.read_balanced("(", ")")?;
                    let body = crate::parser::parse(&inner).map_err(|e| self.err(e.to_string()))?;
                    Ok(WordPart::CommandSubstitution(CommandSubstitutionPart { body, legacy: false }))
                }
            }
            Some('{') => {
                let inner = self.read_balanced("{", "}")?;
                self.parse_parameter_expansion(&inner)
            }
            Some(c) if c.is_alphabetic() || c == '_' => {
                let start = self.pos;
                while matches!(self.peek(), Some(c) if c.is_alphanumeric() || c == '_') {
                    self.advance();
                }
                let name = self.src_slice(start, self.pos);
                Ok(WordPart::ParameterExpansion(ParameterExpansionPart { parameter: name, operation: None }))
            }
            Some(c) if c.is_ascii_digit() || "@*#?$!-".contains(c) => {
                self.advance();
                Ok(WordPart::ParameterExpansion(ParameterExpansionPart { parameter: c.to_string(), operation: None }))
            }
            _ => Ok(WordPart::Literal(LiteralPart { value: "$".to_string() })),
        }
    }

    fn read_backtick(&mut self) -> Result<WordPart, SyntaxError> {
        self.advance();
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c == '`' {
                break;
            }
            if c == '\\' {
                self.advance();
            }
            self.advance();
        }
        if self.peek() != Some('`') {
            return Err(self.err("unterminated command substitution"));
        }
        let inner = self.src_slice(start, self.pos);
        self.advance();
        let body = crate::parser::parse(&inner).map_err(|e| self.err(e.to_string()))?;
        Ok(WordPart::CommandSubstitution(CommandSubstitutionPart { body, legacy: true }))
    }

    /// Reads text between a multi-char open/close pair with matching depth
    /// tracking, honoring nested quotes so an embedded `"` or `'` doesn't
    /// confuse the balance count.
    fn read_balanced(&mut self, open: &str, close: &str) -> Result<String, SyntaxError> {
        for _ in 0..open.len() {
            self.advance();
        }
        let start = self.pos;
        let mut depth = 1usize;
        loop {
            let Some(c) = self.peek() else {
                return Err(self.err(format!("unterminated '{}'", open)));
            };
            if c == '\'' {
                self.advance();
                while let Some(c) = self.peek() {
                    self.advance();
                    if c == '\'' {
                        break;
                    }
                }
                continue;
            }
            if c == '"' {
                self.advance();
                while let Some(c) = self.peek() {
                    if c == '\\' {
                        self.advance();
                        self.advance();
                        continue;
                    }
                    self.advance();
                    if c == '"' {
                        break;
                    }
                }
                continue;
            }
            if self.starts_with(open) && open != close {
                depth += 1;
                for _ in 0..open.len() {
                    self.advance();
                }
                continue;
            }
            if self.starts_with(close) {
                depth -= 1;
                if depth == 0 {
                    let text = self.src_slice(start, self.pos);
                    for _ in 0..close.len() {
                        self.advance();
                    }
                    return Ok(text);
                }
                for _ in 0..close.len() {
                    self.advance();
                }
                continue;
            }
            self.advance();
        }
    }

    fn starts_with(&self, s: &str) -> bool {
        let n = s.chars().count();
        self.src_slice(self.pos, (self.pos + n).min(self.chars.len())) == s
    }

    fn try_read_brace_expansion(&mut self) -> Result<Option<WordPart>, SyntaxError> {
        let save = (self.pos, self.line, self.column);
        let inner = match self.read_balanced("{", "}") {
            Ok(s) => s,
            Err(_) => {
                (self.pos, self.line, self.column) = save;
                return Ok(None);
            }
        };
        if !inner.contains(',') && !inner.contains("..") {
            (self.pos, self.line, self.column) = save;
            return Ok(None);
        }
        match parse_brace_items(&inner) {
            Some(items) => Ok(Some(WordPart::BraceExpansion(BraceExpansionPart { items }))),
            None => {
                (self.pos, self.line, self.column) = save;
                Ok(None)
            }
        }
    }

    fn parse_parameter_expansion(&mut self, inner: &str) -> Result<WordPart, SyntaxError> {
        crate::expand::parameter::parse_braced(inner).map_err(|e| self.err(e.to_string()))
    }
}

fn word_has_quotes(word: &WordNode) -> bool {
    word.parts
        .iter()
        .any(|p| matches!(p, WordPart::SingleQuoted(_) | WordPart::DoubleQuoted(_)))
}

fn word_literal_text(word: &WordNode) -> String {
    let mut out = String::new();
    for part in &word.parts {
        match part {
            WordPart::Literal(l) => out.push_str(&l.value),
            WordPart::SingleQuoted(s) => out.push_str(&s.value),
            WordPart::DoubleQuoted(d) => {
                for p in &d.parts {
                    if let WordPart::Literal(l) = p {
                        out.push_str(&l.value);
                    }
                }
            }
            _ => {}
        }
    }
    out
}

fn parse_double_quoted_content(text: &str) -> Result<WordNode, SyntaxError> {
    let synthetic = format!("\"{}\"", text.replace('\\', "\\\\").replace('"', "\\\""));
    let mut lexer = Lexer::new(&synthetic);
    let dq = lexer.read_double_quoted()?;
    Ok(WordNode::new(dq.parts))
}

fn parse_brace_items(inner: &str) -> Option<Vec<BraceItem>> {
    let parts = split_top_level(inner, ',');
    if parts.len() > 1 {
        let items = parts
            .into_iter()
            .map(|p| BraceItem::Word { word: WordNode::literal(p) })
            .collect();
        return Some(items);
    }
    if let Some((start, rest)) = inner.split_once("..") {
        let (end, step) = match rest.split_once("..") {
            Some((e, s)) => (e, s.parse::<i64>().ok()),
            None => (rest, None),
        };
        if let (Ok(s), Ok(e)) = (start.parse::<i64>(), end.parse::<i64>()) {
            return Some(vec![BraceItem::Range {
                start: BraceRangeValue::Number(s),
                end: BraceRangeValue::Number(e),
                step,
            }]);
        }
        if start.chars().count() == 1 && end.chars().count() == 1 {
            let sc = start.chars().next().unwrap();
            let ec = end.chars().next().unwrap();
            return Some(vec![BraceItem::Range {
                start: BraceRangeValue::Char(sc),
                end: BraceRangeValue::Char(ec),
                step,
            }]);
        }
    }
    None
}

fn split_top_level(s: &str, sep: char) -> Vec<String> {
    let mut depth = 0;
    let mut out = Vec::new();
    let mut current = String::new();
    for c in s.chars() {
        match c {
            '{' => {
                depth += 1;
                current.push(c);
            }
            '}' => {
                depth -= 1;
                current.push(c);
            }
            c if c == sep && depth == 0 => {
                out.push(std::mem::take(&mut current));
            }
            c => current.push(c),
        }
    }
    out.push(current);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_word() {
        let toks = tokenize("echo hello").unwrap();
        assert!(matches!(&toks[0], Token::Word(w) if word_literal_text(w) == "echo"));
        assert!(matches!(&toks[1], Token::Word(w) if word_literal_text(w) == "hello"));
        assert_eq!(toks[2], Token::Eof);
    }

    #[test]
    fn test_operators() {
        let toks = tokenize("a && b || c ; d").unwrap();
        assert!(toks.contains(&Token::Op(Op::AndAnd)));
        assert!(toks.contains(&Token::Op(Op::OrOr)));
        assert!(toks.contains(&Token::Op(Op::Semicolon)));
    }

    #[test]
    fn test_single_quotes_literal() {
        let toks = tokenize("echo 'a $b c'").unwrap();
        if let Token::Word(w) = &toks[1] {
            assert_eq!(w.parts.len(), 1);
            assert!(matches!(&w.parts[0], WordPart::SingleQuoted(s) if s.value == "a $b c"));
        } else {
            panic!("expected word");
        }
    }

    #[test]
    fn test_double_quotes_with_variable() {
        let toks = tokenize("echo \"hi $name\"").unwrap();
        if let Token::Word(w) = &toks[1] {
            if let WordPart::DoubleQuoted(dq) = &w.parts[0] {
                assert!(dq.parts.iter().any(|p| matches!(p, WordPart::ParameterExpansion(pe) if pe.parameter == "name")));
            } else {
                panic!("expected double-quoted part");
            }
        }
    }

    #[test]
    fn test_heredoc_basic() {
        let src = "cat <<EOF\nhello\nEOF\n";
        let toks = tokenize(src).unwrap();
        let has_redirect = toks.iter().any(|t| matches!(t, Token::Redirect(r) if matches!(&r.target, RedirectionTarget::HereDoc(h) if h.delimiter == "EOF")));
        assert!(has_redirect);
    }

    #[test]
    fn test_heredoc_dash_strips_tabs() {
        let src = "cat <<-EOF\n\thello\n\tEOF\n";
        let toks = tokenize(src).unwrap();
        for t in &toks {
            if let Token::Redirect(r) = t {
                if let RedirectionTarget::HereDoc(h) = &r.target {
                    let text = word_literal_text(&h.content);
                    assert_eq!(text.trim_end_matches('\n'), "hello");
                }
            }
        }
    }

    #[test]
    fn test_command_substitution() {
        let toks = tokenize("echo $(ls -l)").unwrap();
        if let Token::Word(w) = &toks[1] {
            assert!(matches!(&w.parts[0], WordPart::CommandSubstitution(_)));
        }
    }

    #[test]
    fn test_arithmetic_expansion() {
        let toks = tokenize("echo $((1+2))").unwrap();
        if let Token::Word(w) = &toks[1] {
            assert!(matches!(&w.parts[0], WordPart::ArithmeticExpansion(_)));
        }
    }

    #[test]
    fn test_brace_expansion_range() {
        let toks = tokenize("echo {1..3}").unwrap();
        if let Token::Word(w) = &toks[1] {
            assert!(matches!(&w.parts[0], WordPart::BraceExpansion(_)));
        }
    }

    #[test]
    fn test_redirection_operators() {
        let toks = tokenize("cmd > out.txt 2>&1").unwrap();
        assert!(toks.iter().any(|t| matches!(t, Token::Redirect(r) if r.operator == RedirectionOperator::Great)));
        assert!(toks.iter().any(|t| matches!(t, Token::Redirect(r) if r.operator == RedirectionOperator::GreatAnd && r.fd == Some(2))));
    }
}
