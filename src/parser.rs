//! Recursive-descent parser over the lexer's token stream, producing a
//! `ScriptNode`. Mirrors the grammar bash itself uses: a script is a list of
//! statements, a statement is pipelines joined by `&&`/`||`, a pipeline is
//! commands joined by `|`/`|&`, and a command is either simple or compound.

use crate::ast::*;
use crate::error::SyntaxError;
use crate::lexer::{tokenize, Op, Token};

pub fn parse(src: &str) -> Result<ScriptNode, SyntaxError> {
    let tokens = tokenize(src)?;
    let mut parser = Parser::new(tokens);
    parser.parse_script()
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

const RESERVED_WORDS: &[&str] = &[
    "if", "then", "elif", "else", "fi", "for", "while", "until", "do", "done", "case", "esac",
    "in", "function", "time", "select",
];

impl Parser {
    fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, pos: 0 }
    }

    fn peek(&self) -> &Token {
        self.tokens.get(self.pos).unwrap_or(&Token::Eof)
    }

    fn peek_at(&self, n: usize) -> &Token {
        self.tokens.get(self.pos + n).unwrap_or(&Token::Eof)
    }

    fn advance(&mut self) -> Token {
        let t = self.tokens.get(self.pos).cloned().unwrap_or(Token::Eof);
        if !matches!(t, Token::Eof) {
            self.pos += 1;
        }
        t
    }

    fn err(&self, message: impl Into<String>) -> SyntaxError {
        SyntaxError::at(Position::default(), message)
    }

    fn skip_terminators(&mut self) {
        while matches!(self.peek(), Token::Op(Op::Newline) | Token::Op(Op::Semicolon)) {
            self.advance();
        }
    }

    fn skip_newlines(&mut self) {
        while matches!(self.peek(), Token::Op(Op::Newline)) {
            self.advance();
        }
    }

    fn word_text(tok: &Token) -> Option<String> {
        match tok {
            Token::Word(w) => {
                if w.parts.len() == 1 {
                    if let WordPart::Literal(l) = &w.parts[0] {
                        return Some(l.value.clone());
                    }
                }
                None
            }
            _ => None,
        }
    }

    fn at_reserved(&self, word: &str) -> bool {
        matches!(Self::word_text(self.peek()), Some(w) if w == word)
    }

    fn eat_reserved(&mut self, word: &str) -> Result<(), SyntaxError> {
        if self.at_reserved(word) {
            self.advance();
            Ok(())
        } else {
            Err(self.err(format!("expected '{}'", word)))
        }
    }

    // ------------------------------------------------------------------
    // Script / statement list
    // ------------------------------------------------------------------

    fn parse_script(&mut self) -> Result<ScriptNode, SyntaxError> {
        let mut statements = Vec::new();
        self.skip_terminators();
        while !matches!(self.peek(), Token::Eof) {
            if self.at_block_end() {
                break;
            }
            statements.push(self.parse_statement()?);
            self.skip_terminators();
        }
        Ok(ScriptNode { statements })
    }

    fn at_block_end(&self) -> bool {
        matches!(
            Self::word_text(self.peek()),
            Some(w) if matches!(w.as_str(), "then" | "elif" | "else" | "fi" | "do" | "done" | "esac")
        ) || matches!(self.peek(), Token::Op(Op::RParen))
    }

    /// Parses statements up to (but not consuming) one of the given reserved words.
    fn parse_body_until(&mut self, stops: &[&str]) -> Result<Vec<StatementNode>, SyntaxError> {
        let mut statements = Vec::new();
        self.skip_terminators();
        loop {
            if matches!(self.peek(), Token::Eof) {
                return Err(self.err(format!("unexpected EOF, expected one of {:?}", stops)));
            }
            if let Some(w) = Self::word_text(self.peek()) {
                if stops.contains(&w.as_str()) {
                    break;
                }
            }
            statements.push(self.parse_statement()?);
            self.skip_terminators();
        }
        Ok(statements)
    }

    fn parse_statement(&mut self) -> Result<StatementNode, SyntaxError> {
        let mut pipelines = vec![self.parse_pipeline()?];
        let mut operators = Vec::new();
        loop {
            match self.peek() {
                Token::Op(Op::AndAnd) => {
                    self.advance();
                    self.skip_newlines();
                    operators.push(StatementOperator::And);
                    pipelines.push(self.parse_pipeline()?);
                }
                Token::Op(Op::OrOr) => {
                    self.advance();
                    self.skip_newlines();
                    operators.push(StatementOperator::Or);
                    pipelines.push(self.parse_pipeline()?);
                }
                _ => break,
            }
        }
        let background = if matches!(self.peek(), Token::Op(Op::Amp)) {
            self.advance();
            true
        } else {
            false
        };
        if matches!(self.peek(), Token::Op(Op::Semicolon)) {
            self.advance();
        }
        Ok(StatementNode { pipelines, operators, background })
    }

    fn parse_pipeline(&mut self) -> Result<PipelineNode, SyntaxError> {
        let negated = if self.at_reserved("!") {
            self.advance();
            true
        } else {
            false
        };
        let mut commands = vec![self.parse_command()?];
        let mut pipe_stderr = Vec::new();
        loop {
            match self.peek() {
                Token::Op(Op::Pipe) => {
                    self.advance();
                    self.skip_newlines();
                    pipe_stderr.push(false);
                    commands.push(self.parse_command()?);
                }
                Token::Op(Op::PipeAmp) => {
                    self.advance();
                    self.skip_newlines();
                    pipe_stderr.push(true);
                    commands.push(self.parse_command()?);
                }
                _ => break,
            }
        }
        Ok(PipelineNode { commands, negated, pipe_stderr })
    }

    // ------------------------------------------------------------------
    // Commands
    // ------------------------------------------------------------------

    fn parse_command(&mut self) -> Result<CommandNode, SyntaxError> {
        if self.at_reserved("time") {
            self.advance();
            return self.parse_command();
        }
        if let Some(w) = Self::word_text(self.peek()) {
            match w.as_str() {
                "if" => return Ok(CommandNode::Compound(CompoundCommandNode::If(self.parse_if()?))),
                "for" => return self.parse_for(),
                "while" => return Ok(CommandNode::Compound(CompoundCommandNode::While(self.parse_while()?))),
                "until" => return Ok(CommandNode::Compound(CompoundCommandNode::Until(self.parse_until()?))),
                "case" => return Ok(CommandNode::Compound(CompoundCommandNode::Case(self.parse_case()?))),
                "function" => return self.parse_function_keyword(),
                _ => {}
            }
        }
        match self.peek() {
            Token::Op(Op::LParen) => return self.parse_subshell(),
            _ => {}
        }
        if self.is_group_open() {
            return Ok(CommandNode::Compound(CompoundCommandNode::Group(self.parse_group()?)));
        }
        if self.is_arith_command_open() {
            return Ok(CommandNode::Compound(CompoundCommandNode::ArithmeticCommand(self.parse_arith_command()?)));
        }
        if self.is_conditional_open() {
            return Ok(CommandNode::Compound(CompoundCommandNode::ConditionalCommand(self.parse_conditional_command()?)));
        }
        if self.looks_like_function_def() {
            return self.parse_function_def();
        }
        Ok(CommandNode::Simple(self.parse_simple_command()?))
    }

    fn is_group_open(&self) -> bool {
        matches!(Self::word_text(self.peek()), Some(w) if w == "{")
    }

    fn is_arith_command_open(&self) -> bool {
        matches!(Self::word_text(self.peek()), Some(w) if w == "((")
    }

    fn is_conditional_open(&self) -> bool {
        matches!(Self::word_text(self.peek()), Some(w) if w == "[[")
    }

    fn looks_like_function_def(&self) -> bool {
        if let Some(name) = Self::word_text(self.peek()) {
            if !RESERVED_WORDS.contains(&name.as_str())
                && matches!(self.peek_at(1), Token::Op(Op::LParen))
                && matches!(self.peek_at(2), Token::Op(Op::RParen))
            {
                return true;
            }
        }
        false
    }

    fn parse_function_def(&mut self) -> Result<CommandNode, SyntaxError> {
        let name = Self::word_text(self.peek()).ok_or_else(|| self.err("expected function name"))?;
        self.advance(); // name
        self.advance(); // (
        self.advance(); // )
        self.skip_newlines();
        let body = self.parse_function_body()?;
        Ok(CommandNode::FunctionDef(FunctionDefNode { name, body: Box::new(body), redirections: Vec::new() }))
    }

    fn parse_function_keyword(&mut self) -> Result<CommandNode, SyntaxError> {
        self.advance(); // 'function'
        let name = Self::word_text(self.peek()).ok_or_else(|| self.err("expected function name"))?;
        self.advance();
        if matches!(self.peek(), Token::Op(Op::LParen)) && matches!(self.peek_at(1), Token::Op(Op::RParen)) {
            self.advance();
            self.advance();
        }
        self.skip_newlines();
        let body = self.parse_function_body()?;
        Ok(CommandNode::FunctionDef(FunctionDefNode { name, body: Box::new(body), redirections: Vec::new() }))
    }

    fn parse_function_body(&mut self) -> Result<CompoundCommandNode, SyntaxError> {
        if self.is_group_open() {
            Ok(CompoundCommandNode::Group(self.parse_group()?))
        } else if matches!(self.peek(), Token::Op(Op::LParen)) {
            match self.parse_subshell()? {
                CommandNode::Compound(c) => Ok(c),
                _ => unreachable!(),
            }
        } else {
            Err(self.err("expected '{' or '(' to start function body"))
        }
    }

    fn parse_if(&mut self) -> Result<IfNode, SyntaxError> {
        self.eat_reserved("if")?;
        let mut clauses = Vec::new();
        let condition = self.parse_body_until(&["then"])?;
        self.eat_reserved("then")?;
        let body = self.parse_body_until(&["elif", "else", "fi"])?;
        clauses.push(IfClause { condition, body });
        loop {
            if self.at_reserved("elif") {
                self.advance();
                let condition = self.parse_body_until(&["then"])?;
                self.eat_reserved("then")?;
                let body = self.parse_body_until(&["elif", "else", "fi"])?;
                clauses.push(IfClause { condition, body });
            } else {
                break;
            }
        }
        let else_body = if self.at_reserved("else") {
            self.advance();
            Some(self.parse_body_until(&["fi"])?)
        } else {
            None
        };
        self.eat_reserved("fi")?;
        Ok(IfNode { clauses, else_body, redirections: self.parse_trailing_redirections()? })
    }

    fn parse_while(&mut self) -> Result<WhileNode, SyntaxError> {
        self.eat_reserved("while")?;
        let condition = self.parse_body_until(&["do"])?;
        self.eat_reserved("do")?;
        let body = self.parse_body_until(&["done"])?;
        self.eat_reserved("done")?;
        Ok(WhileNode { condition, body, redirections: self.parse_trailing_redirections()? })
    }

    fn parse_until(&mut self) -> Result<UntilNode, SyntaxError> {
        self.eat_reserved("until")?;
        let condition = self.parse_body_until(&["do"])?;
        self.eat_reserved("do")?;
        let body = self.parse_body_until(&["done"])?;
        self.eat_reserved("done")?;
        Ok(UntilNode { condition, body, redirections: self.parse_trailing_redirections()? })
    }

    fn parse_for(&mut self) -> Result<CommandNode, SyntaxError> {
        self.eat_reserved("for")?;
        if self.at_reserved("((") {
            self.advance();
            let src = self.collect_double_paren_text()?;
            let (init, condition, update) = parse_c_style_for_clauses(&src).map_err(|m| self.err(m))?;
            self.skip_terminators();
            self.eat_reserved("do")?;
            let body = self.parse_body_until(&["done"])?;
            self.eat_reserved("done")?;
            return Ok(CommandNode::Compound(CompoundCommandNode::CStyleFor(CStyleForNode {
                init,
                condition,
                update,
                body,
                redirections: self.parse_trailing_redirections()?,
            })));
        }
        let variable = Self::word_text(self.peek()).ok_or_else(|| self.err("expected loop variable"))?;
        self.advance();
        self.skip_inline_newlines_and_semis();
        let words = if self.at_reserved("in") {
            self.advance();
            let mut words = Vec::new();
            while let Token::Word(w) = self.peek().clone() {
                words.push(w);
                self.advance();
            }
            self.skip_terminators();
            Some(words)
        } else {
            self.skip_terminators();
            None
        };
        self.eat_reserved("do")?;
        let body = self.parse_body_until(&["done"])?;
        self.eat_reserved("done")?;
        Ok(CommandNode::Compound(CompoundCommandNode::For(ForNode {
            variable,
            words,
            body,
            redirections: self.parse_trailing_redirections()?,
        })))
    }

    fn skip_inline_newlines_and_semis(&mut self) {
        while matches!(self.peek(), Token::Op(Op::Newline) | Token::Op(Op::Semicolon)) {
            self.advance();
        }
    }

    fn parse_case(&mut self) -> Result<CaseNode, SyntaxError> {
        self.eat_reserved("case")?;
        let word = match self.advance() {
            Token::Word(w) => w,
            _ => return Err(self.err("expected word after 'case'")),
        };
        self.skip_newlines();
        self.eat_reserved("in")?;
        self.skip_terminators();
        let mut items = Vec::new();
        while !self.at_reserved("esac") {
            if matches!(self.peek(), Token::Op(Op::LParen)) {
                self.advance();
            }
            let mut patterns = vec![self.expect_word()?];
            while matches!(self.peek(), Token::Op(Op::Pipe)) {
                self.advance();
                patterns.push(self.expect_word()?);
            }
            if matches!(self.peek(), Token::Op(Op::RParen)) {
                self.advance();
            } else {
                return Err(self.err("expected ')' in case pattern"));
            }
            self.skip_terminators();
            let body = self.parse_body_until_case_terminator()?;
            let terminator = match self.peek() {
                Token::Op(Op::SemiSemiAnd) => {
                    self.advance();
                    CaseTerminator::SemiSemiAnd
                }
                Token::Op(Op::SemiAnd) => {
                    self.advance();
                    CaseTerminator::SemiAnd
                }
                Token::Op(Op::DSemi) => {
                    self.advance();
                    CaseTerminator::DoubleSemi
                }
                _ => CaseTerminator::DoubleSemi,
            };
            items.push(CaseItemNode { patterns, body, terminator });
            self.skip_terminators();
        }
        self.eat_reserved("esac")?;
        Ok(CaseNode { word, items, redirections: self.parse_trailing_redirections()? })
    }

    fn parse_body_until_case_terminator(&mut self) -> Result<Vec<StatementNode>, SyntaxError> {
        let mut statements = Vec::new();
        self.skip_terminators();
        loop {
            if matches!(self.peek(), Token::Eof)
                || matches!(self.peek(), Token::Op(Op::DSemi) | Token::Op(Op::SemiAnd) | Token::Op(Op::SemiSemiAnd))
                || self.at_reserved("esac")
            {
                break;
            }
            statements.push(self.parse_statement()?);
            self.skip_terminators();
        }
        Ok(statements)
    }

    fn expect_word(&mut self) -> Result<WordNode, SyntaxError> {
        match self.advance() {
            Token::Word(w) => Ok(w),
            _ => Err(self.err("expected word")),
        }
    }

    fn parse_subshell(&mut self) -> Result<CommandNode, SyntaxError> {
        self.advance(); // (
        let body = self.parse_body_until_rparen()?;
        if !matches!(self.peek(), Token::Op(Op::RParen)) {
            return Err(self.err("expected ')'"));
        }
        self.advance();
        Ok(CommandNode::Compound(CompoundCommandNode::Subshell(SubshellNode {
            body,
            redirections: self.parse_trailing_redirections()?,
        })))
    }

    fn parse_body_until_rparen(&mut self) -> Result<Vec<StatementNode>, SyntaxError> {
        let mut statements = Vec::new();
        self.skip_terminators();
        while !matches!(self.peek(), Token::Op(Op::RParen) | Token::Eof) {
            statements.push(self.parse_statement()?);
            self.skip_terminators();
        }
        Ok(statements)
    }

    fn parse_group(&mut self) -> Result<GroupNode, SyntaxError> {
        self.advance(); // '{'
        let body = self.parse_body_until(&["}"])?;
        self.eat_reserved("}")?;
        Ok(GroupNode { body, redirections: self.parse_trailing_redirections()? })
    }

    fn is_double_paren_word(text: &str) -> bool {
        text == "(("
    }

    fn collect_double_paren_text(&mut self) -> Result<String, SyntaxError> {
        // The lexer tokenizes `((...))` inside `for` and arithmetic commands as
        // ordinary words/operators; reconstruct the source text between the
        // opening `((` and matching `))` by re-scanning raw tokens.
        let mut depth = 1i32;
        let mut parts = Vec::new();
        loop {
            match self.peek().clone() {
                Token::Eof => return Err(self.err("unterminated '(('")),
                Token::Op(Op::LParen) => {
                    depth += 1;
                    self.advance();
                    parts.push("(".to_string());
                }
                Token::Op(Op::RParen) => {
                    depth -= 1;
                    self.advance();
                    if depth == 0 {
                        // consume a second ')' closing the double-paren form
                        if matches!(self.peek(), Token::Op(Op::RParen)) {
                            self.advance();
                        }
                        break;
                    }
                    parts.push(")".to_string());
                }
                Token::Word(w) => {
                    self.advance();
                    parts.push(word_plain_text(&w));
                }
                Token::Op(op) => {
                    self.advance();
                    parts.push(op_text(op));
                }
                Token::Redirect(_) => {
                    self.advance();
                }
            }
        }
        Ok(parts.join(" "))
    }

    fn is_arith_command_open_consume(&mut self) -> bool {
        if self.at_reserved("((") {
            self.advance();
            true
        } else {
            false
        }
    }

    fn parse_arith_command(&mut self) -> Result<ArithmeticCommandNode, SyntaxError> {
        self.is_arith_command_open_consume();
        let src = self.collect_double_paren_text()?;
        let expression = crate::expand::arithmetic::parse(&src).map_err(|e| self.err(e.to_string()))?;
        Ok(ArithmeticCommandNode { expression, redirections: self.parse_trailing_redirections()? })
    }

    fn parse_conditional_command(&mut self) -> Result<ConditionalCommandNode, SyntaxError> {
        self.eat_reserved("[[")?;
        let mut words = Vec::new();
        let mut ops = Vec::new();
        loop {
            match self.peek().clone() {
                Token::Word(w) if Self::word_text(self.peek()).as_deref() == Some("]]") => {
                    let _ = w;
                    self.advance();
                    break;
                }
                Token::Eof => return Err(self.err("unterminated '[[ ]]'")),
                Token::Word(w) => {
                    self.advance();
                    words.push(w);
                }
                Token::Op(op) => {
                    self.advance();
                    ops.push(op_text(op));
                }
                Token::Redirect(_) => {
                    self.advance();
                }
            }
        }
        let expression = crate::exec::conditional::parse_words(&words).map_err(|m| self.err(m))?;
        Ok(ConditionalCommandNode { expression, redirections: self.parse_trailing_redirections()? })
    }

    fn parse_trailing_redirections(&mut self) -> Result<Vec<RedirectionNode>, SyntaxError> {
        let mut redirs = Vec::new();
        while let Token::Redirect(_) = self.peek() {
            if let Token::Redirect(r) = self.advance() {
                redirs.push(r);
            }
        }
        Ok(redirs)
    }

    fn parse_simple_command(&mut self) -> Result<SimpleCommandNode, SyntaxError> {
        let mut assignments = Vec::new();
        let mut redirections = Vec::new();
        let mut name = None;
        let mut args = Vec::new();

        loop {
            match self.peek().clone() {
                Token::Word(w) => {
                    if name.is_none() {
                        if let Some(assignment) = try_parse_assignment(&w) {
                            self.advance();
                            assignments.push(assignment);
                            continue;
                        }
                        name = Some(w);
                        self.advance();
                    } else {
                        args.push(w);
                        self.advance();
                    }
                }
                Token::Redirect(_) => {
                    if let Token::Redirect(r) = self.advance() {
                        redirections.push(r);
                    }
                }
                _ => break,
            }
        }

        if name.is_none() && assignments.is_empty() && redirections.is_empty() {
            return Err(self.err("expected command"));
        }

        Ok(SimpleCommandNode { assignments, name, args, redirections, line: None })
    }
}

fn op_text(op: Op) -> String {
    match op {
        Op::Semicolon => ";".into(),
        Op::DSemi => ";;".into(),
        Op::SemiAnd => ";&".into(),
        Op::SemiSemiAnd => ";;&".into(),
        Op::AndAnd => "&&".into(),
        Op::OrOr => "||".into(),
        Op::Pipe => "|".into(),
        Op::PipeAmp => "|&".into(),
        Op::Amp => "&".into(),
        Op::LParen => "(".into(),
        Op::RParen => ")".into(),
        Op::Newline => "\n".into(),
    }
}

fn word_plain_text(w: &WordNode) -> String {
    let mut out = String::new();
    for p in &w.parts {
        if let WordPart::Literal(l) = p {
            out.push_str(&l.value);
        }
    }
    out
}

/// `name=value`, `name+=value`, or `name[subscript]=value` at the start of
/// a simple command. The name (and subscript) must appear in the word's
/// leading literal chunk — bash itself doesn't allow expansions before the
/// `=`.
fn try_parse_assignment(word: &WordNode) -> Option<AssignmentNode> {
    let first = word.parts.first()?;
    let WordPart::Literal(lit) = first else { return None };
    let eq_pos = lit.value.find('=')?;
    let (name_part, rest_of_first) = lit.value.split_at(eq_pos);
    let rest_of_first = &rest_of_first[1..]; // drop '='
    let append = name_part.ends_with('+');
    let name_part = if append { &name_part[..name_part.len() - 1] } else { name_part };
    let (name, subscript) = if is_valid_identifier(name_part) {
        (name_part.to_string(), None)
    } else if let Some((n, s)) = parse_subscripted_name(name_part) {
        (n, Some(s))
    } else {
        return None;
    };
    let mut value_parts = Vec::new();
    if !rest_of_first.is_empty() {
        value_parts.push(WordPart::Literal(LiteralPart { value: rest_of_first.to_string() }));
    }
    value_parts.extend(word.parts.iter().skip(1).cloned());
    let value = if value_parts.is_empty() { None } else { Some(WordNode::new(value_parts)) };
    Some(AssignmentNode { name, value, append, array: None, subscript })
}

/// Splits `"name[subscript]"` into its parts, requiring the brackets to
/// consume the rest of the chunk (`m[a]`, not `m[a]x`).
fn parse_subscripted_name(name_part: &str) -> Option<(String, String)> {
    let open = name_part.find('[')?;
    if !name_part.ends_with(']') {
        return None;
    }
    let name = &name_part[..open];
    let subscript = &name_part[open + 1..name_part.len() - 1];
    if name.is_empty() || !is_valid_identifier(name) || subscript.is_empty() {
        return None;
    }
    Some((name.to_string(), subscript.to_string()))
}

fn is_valid_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || c == '_')
}

fn parse_c_style_for_clauses(
    src: &str,
) -> Result<(Option<ArithmeticExpressionNode>, Option<ArithmeticExpressionNode>, Option<ArithmeticExpressionNode>), String> {
    let segments: Vec<&str> = src.splitn(3, ';').collect();
    if segments.len() != 3 {
        return Err("expected 'init; cond; update' inside '(( ))'".to_string());
    }
    let parse_part = |s: &str| -> Result<Option<ArithmeticExpressionNode>, String> {
        let s = s.trim();
        if s.is_empty() {
            Ok(None)
        } else {
            crate::expand::arithmetic::parse(s).map(Some).map_err(|e| e.to_string())
        }
    };
    Ok((parse_part(segments[0])?, parse_part(segments[1])?, parse_part(segments[2])?))
}
