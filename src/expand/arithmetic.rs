//! Parser and evaluator for the `$(( ))` / `(( ))` arithmetic grammar.
//!
//! Parsing and evaluation are kept separate: the lexer/parser call
//! [`parse`] to build an [`ArithmeticExpressionNode`] at parse time; the
//! executor calls [`eval`] against the live variable table at run time.

use crate::ast::*;
use crate::error::ExpansionError;
use std::collections::HashMap;

// ============================================================================
// Parsing
// ============================================================================

pub fn parse(src: &str) -> Result<ArithmeticExpressionNode, ExpansionError> {
    let tokens = tokenize(src)?;
    let mut p = AParser { tokens, pos: 0 };
    let expr = p.parse_comma()?;
    if p.pos != p.tokens.len() {
        return Err(ExpansionError::Arithmetic {
            message: format!("unexpected trailing input near token {}", p.pos),
        });
    }
    Ok(ArithmeticExpressionNode { expression: expr })
}

#[derive(Debug, Clone, PartialEq)]
enum Tok {
    Num(i64),
    Ident(String),
    Op(&'static str),
    LParen,
    RParen,
    LBracket,
    RBracket,
    Question,
    Colon,
    Comma,
}

fn tokenize(src: &str) -> Result<Vec<Tok>, ExpansionError> {
    let chars: Vec<char> = src.chars().collect();
    let mut i = 0;
    let mut out = Vec::new();
    const OPS3: &[&str] = &["<<=", ">>="];
    const OPS2: &[&str] = &[
        "**", "==", "!=", "<=", ">=", "&&", "||", "<<", ">>", "+=", "-=", "*=", "/=", "%=", "&=",
        "|=", "^=", "++", "--",
    ];
    while i < chars.len() {
        let c = chars[i];
        if c.is_whitespace() {
            i += 1;
            continue;
        }
        if c == '(' {
            out.push(Tok::LParen);
            i += 1;
            continue;
        }
        if c == ')' {
            out.push(Tok::RParen);
            i += 1;
            continue;
        }
        if c == '[' {
            out.push(Tok::LBracket);
            i += 1;
            continue;
        }
        if c == ']' {
            out.push(Tok::RBracket);
            i += 1;
            continue;
        }
        if c == '?' {
            out.push(Tok::Question);
            i += 1;
            continue;
        }
        if c == ':' {
            out.push(Tok::Colon);
            i += 1;
            continue;
        }
        if c == ',' {
            out.push(Tok::Comma);
            i += 1;
            continue;
        }
        if c == '$' {
            // `$var` is allowed inside arithmetic; treat like bare var.
            i += 1;
            continue;
        }
        if c.is_ascii_digit() {
            let start = i;
            while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '#') {
                i += 1;
            }
            let text: String = chars[start..i].iter().collect();
            out.push(Tok::Num(parse_number(&text)?));
            continue;
        }
        if c.is_alphabetic() || c == '_' {
            let start = i;
            while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_') {
                i += 1;
            }
            out.push(Tok::Ident(chars[start..i].iter().collect()));
            continue;
        }
        let rest: String = chars[i..(i + 3).min(chars.len())].iter().collect();
        if let Some(op) = OPS3.iter().find(|o| rest.starts_with(**o)) {
            out.push(Tok::Op(op));
            i += op.len();
            continue;
        }
        let rest2: String = chars[i..(i + 2).min(chars.len())].iter().collect();
        if let Some(op) = OPS2.iter().find(|o| rest2.starts_with(**o)) {
            out.push(Tok::Op(op));
            i += op.len();
            continue;
        }
        const SINGLE: &str = "+-*/%<>=!&|^~";
        if SINGLE.contains(c) {
            let s: &'static str = match c {
                '+' => "+",
                '-' => "-",
                '*' => "*",
                '/' => "/",
                '%' => "%",
                '<' => "<",
                '>' => ">",
                '=' => "=",
                '!' => "!",
                '&' => "&",
                '|' => "|",
                '^' => "^",
                '~' => "~",
                _ => unreachable!(),
            };
            out.push(Tok::Op(s));
            i += 1;
            continue;
        }
        return Err(ExpansionError::Arithmetic {
            message: format!("unexpected character '{}'", c),
        });
    }
    Ok(out)
}

/// Parses decimal, `0x`/`0`-prefixed, and `base#number` radix literals.
fn parse_number(text: &str) -> Result<i64, ExpansionError> {
    if let Some((base, digits)) = text.split_once('#') {
        let radix: u32 = base.parse().map_err(|_| ExpansionError::Arithmetic {
            message: format!("invalid base in numeric literal '{}'", text),
        })?;
        return i64::from_str_radix(digits, radix).map_err(|_| ExpansionError::Arithmetic {
            message: format!("invalid digits for base {} in '{}'", radix, text),
        });
    }
    if let Some(hex) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        return i64::from_str_radix(hex, 16).map_err(|_| ExpansionError::Arithmetic {
            message: format!("invalid hex literal '{}'", text),
        });
    }
    if text.len() > 1 && text.starts_with('0') && text.chars().all(|c| c.is_ascii_digit()) {
        return i64::from_str_radix(text, 8).map_err(|_| ExpansionError::Arithmetic {
            message: format!("invalid octal literal '{}'", text),
        });
    }
    text.parse().map_err(|_| ExpansionError::Arithmetic {
        message: format!("invalid numeric literal '{}'", text),
    })
}

struct AParser {
    tokens: Vec<Tok>,
    pos: usize,
}

impl AParser {
    fn peek(&self) -> Option<&Tok> {
        self.tokens.get(self.pos)
    }

    fn bump(&mut self) -> Option<Tok> {
        let t = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        t
    }

    fn eat_op(&mut self, op: &str) -> bool {
        if matches!(self.peek(), Some(Tok::Op(o)) if *o == op) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn parse_comma(&mut self) -> Result<ArithExpr, ExpansionError> {
        let mut items = vec![self.parse_assignment()?];
        while matches!(self.peek(), Some(Tok::Comma)) {
            self.pos += 1;
            items.push(self.parse_assignment()?);
        }
        if items.len() == 1 {
            Ok(items.pop().unwrap())
        } else {
            Ok(ArithExpr::Comma(items))
        }
    }

    fn parse_assignment(&mut self) -> Result<ArithExpr, ExpansionError> {
        let start = self.pos;
        if let Some(Tok::Ident(name)) = self.peek().cloned() {
            let mut probe = self.pos + 1;
            let mut subscript = None;
            if matches!(self.tokens.get(probe), Some(Tok::LBracket)) {
                let save = self.pos;
                self.pos = probe + 1;
                let idx = self.parse_comma()?;
                if !matches!(self.peek(), Some(Tok::RBracket)) {
                    self.pos = save;
                } else {
                    self.pos += 1;
                    subscript = Some(Box::new(idx));
                    probe = self.pos;
                }
            }
            let assign_op = match self.tokens.get(probe) {
                Some(Tok::Op("=")) => Some(ArithAssignmentOperator::Assign),
                Some(Tok::Op("+=")) => Some(ArithAssignmentOperator::AddAssign),
                Some(Tok::Op("-=")) => Some(ArithAssignmentOperator::SubAssign),
                Some(Tok::Op("*=")) => Some(ArithAssignmentOperator::MulAssign),
                Some(Tok::Op("/=")) => Some(ArithAssignmentOperator::DivAssign),
                Some(Tok::Op("%=")) => Some(ArithAssignmentOperator::ModAssign),
                Some(Tok::Op("<<=")) => Some(ArithAssignmentOperator::LShiftAssign),
                Some(Tok::Op(">>=")) => Some(ArithAssignmentOperator::RShiftAssign),
                Some(Tok::Op("&=")) => Some(ArithAssignmentOperator::AndAssign),
                Some(Tok::Op("|=")) => Some(ArithAssignmentOperator::OrAssign),
                Some(Tok::Op("^=")) => Some(ArithAssignmentOperator::XorAssign),
                _ => None,
            };
            if let Some(operator) = assign_op {
                self.pos = probe + 1;
                let value = self.parse_assignment()?;
                return Ok(ArithExpr::Assignment(Box::new(ArithAssignmentNode {
                    operator,
                    variable: name,
                    subscript,
                    value,
                })));
            }
            self.pos = start;
        }
        self.parse_ternary()
    }

    fn parse_ternary(&mut self) -> Result<ArithExpr, ExpansionError> {
        let cond = self.parse_logical_or()?;
        if matches!(self.peek(), Some(Tok::Question)) {
            self.pos += 1;
            let consequent = self.parse_assignment()?;
            if !matches!(self.peek(), Some(Tok::Colon)) {
                return Err(ExpansionError::Arithmetic {
                    message: "expected ':' in ternary expression".to_string(),
                });
            }
            self.pos += 1;
            let alternate = self.parse_assignment()?;
            return Ok(ArithExpr::Ternary(Box::new(ArithTernaryNode {
                condition: cond,
                consequent,
                alternate,
            })));
        }
        Ok(cond)
    }

    fn parse_binop_level(
        &mut self,
        ops: &[(&str, ArithBinaryOperator)],
        next: fn(&mut Self) -> Result<ArithExpr, ExpansionError>,
    ) -> Result<ArithExpr, ExpansionError> {
        let mut left = next(self)?;
        loop {
            let matched = ops.iter().find(|(s, _)| self.eat_op(s));
            match matched {
                Some((_, op)) => {
                    let right = next(self)?;
                    left = ArithExpr::Binary(Box::new(ArithBinaryNode {
                        operator: *op,
                        left,
                        right,
                    }));
                }
                None => return Ok(left),
            }
        }
    }

    fn parse_logical_or(&mut self) -> Result<ArithExpr, ExpansionError> {
        self.parse_binop_level(&[("||", ArithBinaryOperator::LogOr)], Self::parse_logical_and)
    }
    fn parse_logical_and(&mut self) -> Result<ArithExpr, ExpansionError> {
        self.parse_binop_level(&[("&&", ArithBinaryOperator::LogAnd)], Self::parse_bit_or)
    }
    fn parse_bit_or(&mut self) -> Result<ArithExpr, ExpansionError> {
        self.parse_binop_level(&[("|", ArithBinaryOperator::BitOr)], Self::parse_bit_xor)
    }
    fn parse_bit_xor(&mut self) -> Result<ArithExpr, ExpansionError> {
        self.parse_binop_level(&[("^", ArithBinaryOperator::BitXor)], Self::parse_bit_and)
    }
    fn parse_bit_and(&mut self) -> Result<ArithExpr, ExpansionError> {
        self.parse_binop_level(&[("&", ArithBinaryOperator::BitAnd)], Self::parse_equality)
    }
    fn parse_equality(&mut self) -> Result<ArithExpr, ExpansionError> {
        self.parse_binop_level(
            &[("==", ArithBinaryOperator::Eq), ("!=", ArithBinaryOperator::Ne)],
            Self::parse_relational,
        )
    }
    fn parse_relational(&mut self) -> Result<ArithExpr, ExpansionError> {
        self.parse_binop_level(
            &[
                ("<=", ArithBinaryOperator::Le),
                (">=", ArithBinaryOperator::Ge),
                ("<", ArithBinaryOperator::Lt),
                (">", ArithBinaryOperator::Gt),
            ],
            Self::parse_shift,
        )
    }
    fn parse_shift(&mut self) -> Result<ArithExpr, ExpansionError> {
        self.parse_binop_level(
            &[("<<", ArithBinaryOperator::LShift), (">>", ArithBinaryOperator::RShift)],
            Self::parse_additive,
        )
    }
    fn parse_additive(&mut self) -> Result<ArithExpr, ExpansionError> {
        self.parse_binop_level(
            &[("+", ArithBinaryOperator::Add), ("-", ArithBinaryOperator::Sub)],
            Self::parse_multiplicative,
        )
    }
    fn parse_multiplicative(&mut self) -> Result<ArithExpr, ExpansionError> {
        self.parse_binop_level(
            &[
                ("*", ArithBinaryOperator::Mul),
                ("/", ArithBinaryOperator::Div),
                ("%", ArithBinaryOperator::Mod),
            ],
            Self::parse_power,
        )
    }
    fn parse_power(&mut self) -> Result<ArithExpr, ExpansionError> {
        let base = self.parse_unary()?;
        if self.eat_op("**") {
            let exp = self.parse_power()?;
            return Ok(ArithExpr::Binary(Box::new(ArithBinaryNode {
                operator: ArithBinaryOperator::Pow,
                left: base,
                right: exp,
            })));
        }
        Ok(base)
    }

    fn parse_unary(&mut self) -> Result<ArithExpr, ExpansionError> {
        if self.eat_op("++") {
            let operand = self.parse_unary()?;
            return Ok(ArithExpr::Unary(Box::new(ArithUnaryNode {
                operator: ArithUnaryOperator::PreInc,
                operand,
            })));
        }
        if self.eat_op("--") {
            let operand = self.parse_unary()?;
            return Ok(ArithExpr::Unary(Box::new(ArithUnaryNode {
                operator: ArithUnaryOperator::PreDec,
                operand,
            })));
        }
        if self.eat_op("-") {
            let operand = self.parse_unary()?;
            return Ok(ArithExpr::Unary(Box::new(ArithUnaryNode {
                operator: ArithUnaryOperator::Neg,
                operand,
            })));
        }
        if self.eat_op("+") {
            let operand = self.parse_unary()?;
            return Ok(ArithExpr::Unary(Box::new(ArithUnaryNode {
                operator: ArithUnaryOperator::Pos,
                operand,
            })));
        }
        if self.eat_op("!") {
            let operand = self.parse_unary()?;
            return Ok(ArithExpr::Unary(Box::new(ArithUnaryNode {
                operator: ArithUnaryOperator::Not,
                operand,
            })));
        }
        if self.eat_op("~") {
            let operand = self.parse_unary()?;
            return Ok(ArithExpr::Unary(Box::new(ArithUnaryNode {
                operator: ArithUnaryOperator::BitNot,
                operand,
            })));
        }
        self.parse_postfix()
    }

    fn parse_postfix(&mut self) -> Result<ArithExpr, ExpansionError> {
        let mut expr = self.parse_primary()?;
        loop {
            if self.eat_op("++") {
                expr = ArithExpr::Unary(Box::new(ArithUnaryNode {
                    operator: ArithUnaryOperator::PostInc,
                    operand: expr,
                }));
            } else if self.eat_op("--") {
                expr = ArithExpr::Unary(Box::new(ArithUnaryNode {
                    operator: ArithUnaryOperator::PostDec,
                    operand: expr,
                }));
            } else {
                break;
            }
        }
        Ok(expr)
    }

    fn parse_primary(&mut self) -> Result<ArithExpr, ExpansionError> {
        match self.bump() {
            Some(Tok::Num(n)) => Ok(ArithExpr::Number(n)),
            Some(Tok::Ident(name)) => {
                if matches!(self.peek(), Some(Tok::LBracket)) {
                    self.pos += 1;
                    let idx = self.parse_comma()?;
                    if !matches!(self.peek(), Some(Tok::RBracket)) {
                        return Err(ExpansionError::Arithmetic {
                            message: "expected ']'".to_string(),
                        });
                    }
                    self.pos += 1;
                    return Ok(ArithExpr::ArrayElement(ArithArrayElementNode {
                        array: name,
                        index: Box::new(idx),
                    }));
                }
                Ok(ArithExpr::Variable(name))
            }
            Some(Tok::LParen) => {
                let inner = self.parse_comma()?;
                if !matches!(self.peek(), Some(Tok::RParen)) {
                    return Err(ExpansionError::Arithmetic {
                        message: "expected ')'".to_string(),
                    });
                }
                self.pos += 1;
                Ok(ArithExpr::Group(Box::new(inner)))
            }
            other => Err(ExpansionError::Arithmetic {
                message: format!("unexpected token {:?}", other),
            }),
        }
    }
}

// ============================================================================
// Evaluation
// ============================================================================

/// Minimal variable access the evaluator needs; `exec::State` implements this.
pub trait ArithContext {
    fn get(&self, name: &str) -> Option<String>;
    fn get_index(&self, name: &str, index: i64) -> Option<String>;
    fn set(&mut self, name: &str, value: i64);
    fn set_index(&mut self, name: &str, index: i64, value: i64);
}

/// A small in-memory scratch context, used by tests and by the arithmetic
/// command evaluator when no shared `exec::State` is threaded through.
#[derive(Debug, Default, Clone)]
pub struct ScratchContext {
    pub vars: HashMap<String, i64>,
}

impl ArithContext for ScratchContext {
    fn get(&self, name: &str) -> Option<String> {
        self.vars.get(name).map(|v| v.to_string())
    }
    fn get_index(&self, _name: &str, _index: i64) -> Option<String> {
        None
    }
    fn set(&mut self, name: &str, value: i64) {
        self.vars.insert(name.to_string(), value);
    }
    fn set_index(&mut self, _name: &str, _index: i64, _value: i64) {}
}

fn to_int(s: &str) -> i64 {
    let s = s.trim();
    if s.is_empty() {
        0
    } else {
        parse_number(s).unwrap_or(0)
    }
}

pub fn eval(expr: &ArithmeticExpressionNode, ctx: &mut impl ArithContext) -> Result<i64, ExpansionError> {
    eval_expr(&expr.expression, ctx)
}

fn eval_expr(expr: &ArithExpr, ctx: &mut impl ArithContext) -> Result<i64, ExpansionError> {
    match expr {
        ArithExpr::Number(n) => Ok(*n),
        ArithExpr::Variable(name) => Ok(ctx.get(name).map(|v| to_int(&v)).unwrap_or(0)),
        ArithExpr::Group(inner) => eval_expr(inner, ctx),
        ArithExpr::Comma(items) => {
            let mut last = 0;
            for item in items {
                last = eval_expr(item, ctx)?;
            }
            Ok(last)
        }
        ArithExpr::ArrayElement(node) => {
            let idx = eval_expr(&node.index, ctx)?;
            Ok(ctx.get_index(&node.array, idx).map(|v| to_int(&v)).unwrap_or(0))
        }
        ArithExpr::Unary(node) => eval_unary(node, ctx),
        ArithExpr::Binary(node) => eval_binary(node, ctx),
        ArithExpr::Ternary(node) => {
            if eval_expr(&node.condition, ctx)? != 0 {
                eval_expr(&node.consequent, ctx)
            } else {
                eval_expr(&node.alternate, ctx)
            }
        }
        ArithExpr::Assignment(node) => eval_assignment(node, ctx),
    }
}

fn eval_unary(node: &ArithUnaryNode, ctx: &mut impl ArithContext) -> Result<i64, ExpansionError> {
    use ArithUnaryOperator::*;
    match node.operator {
        Neg => Ok(eval_expr(&node.operand, ctx)?.wrapping_neg()),
        Pos => eval_expr(&node.operand, ctx),
        Not => Ok(if eval_expr(&node.operand, ctx)? == 0 { 1 } else { 0 }),
        BitNot => Ok(!eval_expr(&node.operand, ctx)?),
        PreInc | PreDec | PostInc | PostDec => {
            let name = match &node.operand {
                ArithExpr::Variable(n) => n.clone(),
                _ => {
                    return Err(ExpansionError::Arithmetic {
                        message: "increment/decrement requires an lvalue".to_string(),
                    })
                }
            };
            let old = eval_expr(&node.operand, ctx)?;
            let new = if matches!(node.operator, PreInc | PostInc) {
                old.wrapping_add(1)
            } else {
                old.wrapping_sub(1)
            };
            ctx.set(&name, new);
            Ok(if matches!(node.operator, PreInc | PreDec) { new } else { old })
        }
    }
}

fn eval_binary(node: &ArithBinaryNode, ctx: &mut impl ArithContext) -> Result<i64, ExpansionError> {
    use ArithBinaryOperator::*;
    if matches!(node.operator, LogAnd) {
        let l = eval_expr(&node.left, ctx)?;
        if l == 0 {
            return Ok(0);
        }
        return Ok(if eval_expr(&node.right, ctx)? != 0 { 1 } else { 0 });
    }
    if matches!(node.operator, LogOr) {
        let l = eval_expr(&node.left, ctx)?;
        if l != 0 {
            return Ok(1);
        }
        return Ok(if eval_expr(&node.right, ctx)? != 0 { 1 } else { 0 });
    }
    let l = eval_expr(&node.left, ctx)?;
    let r = eval_expr(&node.right, ctx)?;
    Ok(match node.operator {
        Add => l.wrapping_add(r),
        Sub => l.wrapping_sub(r),
        Mul => l.wrapping_mul(r),
        Div => {
            if r == 0 {
                return Err(ExpansionError::Arithmetic {
                    message: "division by zero".to_string(),
                });
            }
            l.wrapping_div(r)
        }
        Mod => {
            if r == 0 {
                return Err(ExpansionError::Arithmetic {
                    message: "division by zero".to_string(),
                });
            }
            l.wrapping_rem(r)
        }
        Pow => {
            if r < 0 {
                0
            } else {
                l.wrapping_pow(r as u32)
            }
        }
        LShift => l.wrapping_shl(r as u32),
        RShift => l.wrapping_shr(r as u32),
        Lt => (l < r) as i64,
        Le => (l <= r) as i64,
        Gt => (l > r) as i64,
        Ge => (l >= r) as i64,
        Eq => (l == r) as i64,
        Ne => (l != r) as i64,
        BitAnd => l & r,
        BitOr => l | r,
        BitXor => l ^ r,
        LogAnd | LogOr => unreachable!(),
    })
}

fn eval_assignment(node: &ArithAssignmentNode, ctx: &mut impl ArithContext) -> Result<i64, ExpansionError> {
    let current = if let Some(sub) = &node.subscript {
        let idx = eval_expr(sub, ctx)?;
        ctx.get_index(&node.variable, idx).map(|v| to_int(&v)).unwrap_or(0)
    } else {
        ctx.get(&node.variable).map(|v| to_int(&v)).unwrap_or(0)
    };
    let rhs = eval_expr(&node.value, ctx)?;
    use ArithAssignmentOperator::*;
    let new = match node.operator {
        Assign => rhs,
        AddAssign => current.wrapping_add(rhs),
        SubAssign => current.wrapping_sub(rhs),
        MulAssign => current.wrapping_mul(rhs),
        DivAssign => {
            if rhs == 0 {
                return Err(ExpansionError::Arithmetic {
                    message: "division by zero".to_string(),
                });
            }
            current.wrapping_div(rhs)
        }
        ModAssign => {
            if rhs == 0 {
                return Err(ExpansionError::Arithmetic {
                    message: "division by zero".to_string(),
                });
            }
            current.wrapping_rem(rhs)
        }
        LShiftAssign => current.wrapping_shl(rhs as u32),
        RShiftAssign => current.wrapping_shr(rhs as u32),
        AndAssign => current & rhs,
        OrAssign => current | rhs,
        XorAssign => current ^ rhs,
    };
    if let Some(sub) = &node.subscript {
        let idx = eval_expr(sub, ctx)?;
        ctx.set_index(&node.variable, idx, new);
    } else {
        ctx.set(&node.variable, new);
    }
    Ok(new)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eval_str(s: &str, ctx: &mut ScratchContext) -> i64 {
        eval(&parse(s).unwrap(), ctx).unwrap()
    }

    #[test]
    fn test_basic_arithmetic() {
        let mut ctx = ScratchContext::default();
        assert_eq!(eval_str("1 + 2 * 3", &mut ctx), 7);
        assert_eq!(eval_str("(1 + 2) * 3", &mut ctx), 9);
        assert_eq!(eval_str("10 % 3", &mut ctx), 1);
        assert_eq!(eval_str("2 ** 10", &mut ctx), 1024);
    }

    #[test]
    fn test_ternary_and_logical() {
        let mut ctx = ScratchContext::default();
        assert_eq!(eval_str("1 ? 2 : 3", &mut ctx), 2);
        assert_eq!(eval_str("0 ? 2 : 3", &mut ctx), 3);
        assert_eq!(eval_str("1 && 0", &mut ctx), 0);
        assert_eq!(eval_str("1 || 0", &mut ctx), 1);
    }

    #[test]
    fn test_assignment_and_variable() {
        let mut ctx = ScratchContext::default();
        assert_eq!(eval_str("x = 5", &mut ctx), 5);
        assert_eq!(eval_str("x += 3", &mut ctx), 8);
        assert_eq!(ctx.get("x"), Some("8".to_string()));
    }

    #[test]
    fn test_pre_post_increment() {
        let mut ctx = ScratchContext::default();
        ctx.set("x", 5);
        assert_eq!(eval_str("x++", &mut ctx), 5);
        assert_eq!(ctx.get("x"), Some("6".to_string()));
        assert_eq!(eval_str("++x", &mut ctx), 7);
    }

    #[test]
    fn test_division_by_zero() {
        let mut ctx = ScratchContext::default();
        let result = eval(&parse("1 / 0").unwrap(), &mut ctx);
        assert!(result.is_err());
    }

    #[test]
    fn test_base_number_literals() {
        let mut ctx = ScratchContext::default();
        assert_eq!(eval_str("16#ff", &mut ctx), 255);
        assert_eq!(eval_str("2#1010", &mut ctx), 10);
        assert_eq!(eval_str("0x1F", &mut ctx), 31);
        assert_eq!(eval_str("010", &mut ctx), 8);
    }

    #[test]
    fn test_unset_variable_is_zero() {
        let mut ctx = ScratchContext::default();
        assert_eq!(eval_str("undefined_var + 1", &mut ctx), 1);
    }

    #[test]
    fn test_bitwise_and_shift() {
        let mut ctx = ScratchContext::default();
        assert_eq!(eval_str("6 & 3", &mut ctx), 2);
        assert_eq!(eval_str("6 | 1", &mut ctx), 7);
        assert_eq!(eval_str("5 ^ 1", &mut ctx), 4);
        assert_eq!(eval_str("1 << 4", &mut ctx), 16);
        assert_eq!(eval_str("256 >> 4", &mut ctx), 16);
    }

    #[test]
    fn test_overflow_wraps() {
        let mut ctx = ScratchContext::default();
        let max = i64::MAX;
        ctx.set("x", max);
        assert_eq!(eval_str("x + 1", &mut ctx), i64::MIN);
    }
}
