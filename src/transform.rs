//! AST transform pipeline and source serializer. Does not exist in the
//! teacher — built fresh to support transform-before-execute plugins and
//! the `parse(serialize(parse(s))) == parse(s)` round-trip contract,
//! reusing `serde_json::Value` for plugin metadata rather than inventing a
//! bespoke open-record type.

use crate::ast::*;
use serde_json::{Map, Value};

pub type Metadata = Map<String, Value>;

type Plugin = Box<dyn Fn(&ScriptNode, &Metadata) -> (ScriptNode, Metadata) + Send + Sync>;

#[derive(Default)]
pub struct TransformPipeline {
    plugins: Vec<Plugin>,
}

impl TransformPipeline {
    pub fn new() -> Self {
        Self { plugins: Vec::new() }
    }

    pub fn register(
        &mut self,
        plugin: impl Fn(&ScriptNode, &Metadata) -> (ScriptNode, Metadata) + Send + Sync + 'static,
    ) {
        self.plugins.push(Box::new(plugin));
    }

    /// Applies every registered plugin in order, shallow-merging each
    /// plugin's metadata delta into the running metadata object.
    pub fn apply(&self, ast: &ScriptNode) -> (ScriptNode, Metadata) {
        let mut current = ast.clone();
        let mut metadata = Metadata::new();
        for plugin in &self.plugins {
            let (next_ast, delta) = plugin(&current, &metadata);
            current = next_ast;
            for (k, v) in delta {
                metadata.insert(k, v);
            }
        }
        (current, metadata)
    }
}

pub struct TransformResult {
    pub script: String,
    pub ast: ScriptNode,
    pub metadata: Metadata,
}

/// Walks the AST back to source text. Not byte-identical to any particular
/// original spelling — only guaranteed to reparse to an equal AST.
pub fn serialize(script: &ScriptNode) -> String {
    script
        .statements
        .iter()
        .map(serialize_statement)
        .collect::<Vec<_>>()
        .join("\n")
}

fn serialize_statement(stmt: &StatementNode) -> String {
    let mut out = String::new();
    out.push_str(&serialize_pipeline(&stmt.pipelines[0]));
    for (op, pipeline) in stmt.operators.iter().zip(stmt.pipelines.iter().skip(1)) {
        let sep = match op {
            StatementOperator::And => " && ",
            StatementOperator::Or => " || ",
            StatementOperator::Semi => "; ",
        };
        out.push_str(sep);
        out.push_str(&serialize_pipeline(pipeline));
    }
    if stmt.background {
        out.push_str(" &");
    }
    out
}

fn serialize_pipeline(pipeline: &PipelineNode) -> String {
    let mut out = String::new();
    if pipeline.negated {
        out.push_str("! ");
    }
    for (i, command) in pipeline.commands.iter().enumerate() {
        if i > 0 {
            let stderr = pipeline.pipe_stderr.get(i - 1).copied().unwrap_or(false);
            out.push_str(if stderr { " |& " } else { " | " });
        }
        out.push_str(&serialize_command(command));
    }
    out
}

fn serialize_command(command: &CommandNode) -> String {
    match command {
        CommandNode::Simple(s) => serialize_simple_command(s),
        CommandNode::Compound(c) => serialize_compound_command(c),
        CommandNode::FunctionDef(f) => {
            format!("{}() {}", f.name, serialize_compound_command(&f.body))
        }
    }
}

fn serialize_simple_command(cmd: &SimpleCommandNode) -> String {
    let mut parts = Vec::new();
    for a in &cmd.assignments {
        parts.push(serialize_assignment(a));
    }
    if let Some(name) = &cmd.name {
        parts.push(serialize_word(name));
    }
    for arg in &cmd.args {
        parts.push(serialize_word(arg));
    }
    let mut out = parts.join(" ");
    for r in &cmd.redirections {
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(&serialize_redirection(r));
    }
    out
}

fn serialize_assignment(a: &AssignmentNode) -> String {
    let op = if a.append { "+=" } else { "=" };
    let name = match &a.subscript {
        Some(s) => format!("{}[{}]", a.name, s),
        None => a.name.clone(),
    };
    if let Some(items) = &a.array {
        let inner = items.iter().map(serialize_word).collect::<Vec<_>>().join(" ");
        format!("{name}{op}({inner})")
    } else {
        let value = a.value.as_ref().map(serialize_word).unwrap_or_default();
        format!("{name}{op}{value}")
    }
}

fn serialize_redirection(r: &RedirectionNode) -> String {
    let mut out = String::new();
    if let Some(var) = &r.fd_variable {
        out.push('{');
        out.push_str(var);
        out.push('}');
    } else if let Some(fd) = r.fd {
        out.push_str(&fd.to_string());
    }
    out.push_str(&r.operator.to_string());
    match &r.target {
        RedirectionTarget::Word(w) => out.push_str(&serialize_word(w)),
        RedirectionTarget::HereDoc(h) => {
            out.push_str(&h.delimiter);
            out.push('\n');
            out.push_str(&serialize_word(&h.content));
            out.push('\n');
            out.push_str(&h.delimiter);
        }
    }
    out
}

fn serialize_body(body: &[StatementNode]) -> String {
    body.iter().map(serialize_statement).collect::<Vec<_>>().join("; ")
}

fn serialize_compound_command(compound: &CompoundCommandNode) -> String {
    match compound {
        CompoundCommandNode::If(n) => {
            let mut out = String::new();
            for (i, clause) in n.clauses.iter().enumerate() {
                out.push_str(if i == 0 { "if " } else { "elif " });
                out.push_str(&serialize_body(&clause.condition));
                out.push_str("; then ");
                out.push_str(&serialize_body(&clause.body));
                out.push_str("; ");
            }
            if let Some(else_body) = &n.else_body {
                out.push_str("else ");
                out.push_str(&serialize_body(else_body));
                out.push_str("; ");
            }
            out.push_str("fi");
            out
        }
        CompoundCommandNode::For(n) => {
            let mut out = format!("for {} in ", n.variable);
            if let Some(words) = &n.words {
                out.push_str(&words.iter().map(serialize_word).collect::<Vec<_>>().join(" "));
            } else {
                out.push_str("\"$@\"");
            }
            out.push_str("; do ");
            out.push_str(&serialize_body(&n.body));
            out.push_str("; done");
            out
        }
        CompoundCommandNode::CStyleFor(n) => {
            let init = n.init.as_ref().map(serialize_arith).unwrap_or_default();
            let cond = n.condition.as_ref().map(serialize_arith).unwrap_or_default();
            let update = n.update.as_ref().map(serialize_arith).unwrap_or_default();
            format!(
                "for (({init}; {cond}; {update})); do {}; done",
                serialize_body(&n.body)
            )
        }
        CompoundCommandNode::While(n) => {
            format!("while {}; do {}; done", serialize_body(&n.condition), serialize_body(&n.body))
        }
        CompoundCommandNode::Until(n) => {
            format!("until {}; do {}; done", serialize_body(&n.condition), serialize_body(&n.body))
        }
        CompoundCommandNode::Case(n) => {
            let mut out = format!("case {} in ", serialize_word(&n.word));
            for item in &n.items {
                let patterns = item.patterns.iter().map(serialize_word).collect::<Vec<_>>().join("|");
                let term = match item.terminator {
                    CaseTerminator::DoubleSemi => ";;",
                    CaseTerminator::SemiAnd => ";&",
                    CaseTerminator::SemiSemiAnd => ";;&",
                };
                out.push_str(&format!("{patterns}) {} {term} ", serialize_body(&item.body)));
            }
            out.push_str("esac");
            out
        }
        CompoundCommandNode::Subshell(n) => format!("( {} )", serialize_body(&n.body)),
        CompoundCommandNode::Group(n) => format!("{{ {}; }}", serialize_body(&n.body)),
        CompoundCommandNode::ArithmeticCommand(n) => format!("(({}))", serialize_arith(&n.expression)),
        CompoundCommandNode::ConditionalCommand(n) => format!("[[ {} ]]", serialize_conditional(&n.expression)),
    }
}

fn serialize_conditional(expr: &ConditionalExpressionNode) -> String {
    match expr {
        ConditionalExpressionNode::Word(w) => serialize_word(w),
        ConditionalExpressionNode::Group(inner) => format!("( {} )", serialize_conditional(inner)),
        ConditionalExpressionNode::Not(inner) => format!("! {}", serialize_conditional(inner)),
        ConditionalExpressionNode::And(l, r) => {
            format!("{} && {}", serialize_conditional(l), serialize_conditional(r))
        }
        ConditionalExpressionNode::Or(l, r) => {
            format!("{} || {}", serialize_conditional(l), serialize_conditional(r))
        }
        ConditionalExpressionNode::Unary(u) => {
            let op = match u.operator {
                CondUnaryOperator::Exists => "-e",
                CondUnaryOperator::IsFile => "-f",
                CondUnaryOperator::IsDir => "-d",
                CondUnaryOperator::IsSymlink => "-L",
                CondUnaryOperator::Readable => "-r",
                CondUnaryOperator::Writable => "-w",
                CondUnaryOperator::Executable => "-x",
                CondUnaryOperator::NonEmpty => "-s",
                CondUnaryOperator::StringEmpty => "-z",
                CondUnaryOperator::StringNonEmpty => "-n",
                CondUnaryOperator::VarSet => "-v",
            };
            format!("{op} {}", serialize_word(&u.operand))
        }
        ConditionalExpressionNode::Binary(b) => {
            let op = match b.operator {
                CondBinaryOperator::Eq => "=",
                CondBinaryOperator::EqEq => "==",
                CondBinaryOperator::Ne => "!=",
                CondBinaryOperator::Match => "=~",
                CondBinaryOperator::Lt => "<",
                CondBinaryOperator::Gt => ">",
                CondBinaryOperator::NumEq => "-eq",
                CondBinaryOperator::NumNe => "-ne",
                CondBinaryOperator::NumLt => "-lt",
                CondBinaryOperator::NumLe => "-le",
                CondBinaryOperator::NumGt => "-gt",
                CondBinaryOperator::NumGe => "-ge",
            };
            format!("{} {op} {}", serialize_word(&b.left), serialize_word(&b.right))
        }
    }
}

fn serialize_arith(expr: &ArithmeticExpressionNode) -> String {
    serialize_arith_expr(&expr.expression)
}

fn serialize_arith_expr(expr: &ArithExpr) -> String {
    match expr {
        ArithExpr::Number(n) => n.to_string(),
        ArithExpr::Variable(v) => v.clone(),
        ArithExpr::Group(inner) => format!("({})", serialize_arith_expr(inner)),
        ArithExpr::Comma(items) => items.iter().map(serialize_arith_expr).collect::<Vec<_>>().join(", "),
        ArithExpr::ArrayElement(a) => format!("{}[{}]", a.array, serialize_arith_expr(&a.index)),
        ArithExpr::Unary(u) => {
            let operand = serialize_arith_expr(&u.operand);
            match u.operator {
                ArithUnaryOperator::Neg => format!("-{operand}"),
                ArithUnaryOperator::Pos => format!("+{operand}"),
                ArithUnaryOperator::Not => format!("!{operand}"),
                ArithUnaryOperator::BitNot => format!("~{operand}"),
                ArithUnaryOperator::PreInc => format!("++{operand}"),
                ArithUnaryOperator::PreDec => format!("--{operand}"),
                ArithUnaryOperator::PostInc => format!("{operand}++"),
                ArithUnaryOperator::PostDec => format!("{operand}--"),
            }
        }
        ArithExpr::Binary(b) => {
            let op = match b.operator {
                ArithBinaryOperator::Add => "+",
                ArithBinaryOperator::Sub => "-",
                ArithBinaryOperator::Mul => "*",
                ArithBinaryOperator::Div => "/",
                ArithBinaryOperator::Mod => "%",
                ArithBinaryOperator::Pow => "**",
                ArithBinaryOperator::LShift => "<<",
                ArithBinaryOperator::RShift => ">>",
                ArithBinaryOperator::Lt => "<",
                ArithBinaryOperator::Le => "<=",
                ArithBinaryOperator::Gt => ">",
                ArithBinaryOperator::Ge => ">=",
                ArithBinaryOperator::Eq => "==",
                ArithBinaryOperator::Ne => "!=",
                ArithBinaryOperator::BitAnd => "&",
                ArithBinaryOperator::BitOr => "|",
                ArithBinaryOperator::BitXor => "^",
                ArithBinaryOperator::LogAnd => "&&",
                ArithBinaryOperator::LogOr => "||",
            };
            format!("{} {op} {}", serialize_arith_expr(&b.left), serialize_arith_expr(&b.right))
        }
        ArithExpr::Ternary(t) => format!(
            "{} ? {} : {}",
            serialize_arith_expr(&t.condition),
            serialize_arith_expr(&t.consequent),
            serialize_arith_expr(&t.alternate)
        ),
        ArithExpr::Assignment(a) => {
            let op = match a.operator {
                ArithAssignmentOperator::Assign => "=",
                ArithAssignmentOperator::AddAssign => "+=",
                ArithAssignmentOperator::SubAssign => "-=",
                ArithAssignmentOperator::MulAssign => "*=",
                ArithAssignmentOperator::DivAssign => "/=",
                ArithAssignmentOperator::ModAssign => "%=",
                ArithAssignmentOperator::LShiftAssign => "<<=",
                ArithAssignmentOperator::RShiftAssign => ">>=",
                ArithAssignmentOperator::AndAssign => "&=",
                ArithAssignmentOperator::OrAssign => "|=",
                ArithAssignmentOperator::XorAssign => "^=",
            };
            let target = match &a.subscript {
                Some(sub) => format!("{}[{}]", a.variable, serialize_arith_expr(sub)),
                None => a.variable.clone(),
            };
            format!("{target} {op} {}", serialize_arith_expr(&a.value))
        }
    }
}

fn serialize_word(word: &WordNode) -> String {
    word.parts.iter().map(serialize_word_part).collect()
}

fn serialize_word_part(part: &WordPart) -> String {
    match part {
        WordPart::Literal(l) => l.value.clone(),
        WordPart::SingleQuoted(s) => format!("'{}'", s.value),
        WordPart::DoubleQuoted(d) => {
            format!("\"{}\"", d.parts.iter().map(serialize_word_part).collect::<String>())
        }
        WordPart::Escaped(e) => format!("\\{}", e.value),
        WordPart::ParameterExpansion(p) => serialize_parameter(p),
        WordPart::CommandSubstitution(c) => {
            let inner = serialize(&c.body);
            if c.legacy {
                format!("`{inner}`")
            } else {
                format!("$({inner})")
            }
        }
        WordPart::ArithmeticExpansion(a) => format!("$(({}))", serialize_arith(&a.expression)),
        WordPart::ProcessSubstitution(p) => {
            let inner = serialize(&p.body);
            match p.direction {
                ProcessDirection::Input => format!("<({inner})"),
                ProcessDirection::Output => format!(">({inner})"),
            }
        }
        WordPart::BraceExpansion(b) => {
            let items = b
                .items
                .iter()
                .map(|item| match item {
                    BraceItem::Word { word } => serialize_word(word),
                    BraceItem::Range { start, end, step } => {
                        let fmt_val = |v: &BraceRangeValue| match v {
                            BraceRangeValue::Number(n) => n.to_string(),
                            BraceRangeValue::Char(c) => c.to_string(),
                        };
                        match step {
                            Some(s) => format!("{}..{}..{s}", fmt_val(start), fmt_val(end)),
                            None => format!("{}..{}", fmt_val(start), fmt_val(end)),
                        }
                    }
                })
                .collect::<Vec<_>>()
                .join(",");
            format!("{{{items}}}")
        }
        WordPart::TildeExpansion(t) => match &t.user {
            Some(user) => format!("~{user}"),
            None => "~".to_string(),
        },
        WordPart::Glob(g) => g.pattern.clone(),
    }
}

fn serialize_parameter(p: &ParameterExpansionPart) -> String {
    match &p.operation {
        None => format!("${{{}}}", p.parameter),
        Some(op) => format!("${{{}{}}}", p.parameter, serialize_parameter_op(op)),
    }
}

fn serialize_parameter_op(op: &ParameterOperation) -> String {
    match op {
        ParameterOperation::Inner(inner) => serialize_inner_op(inner),
        ParameterOperation::Indirection(i) => match &i.inner_op {
            Some(inner) => format!("!{}", serialize_inner_op(inner)),
            None => String::new(),
        },
        ParameterOperation::ArrayKeys(k) => {
            format!("!{}[{}]", k.array, if k.star { "*" } else { "@" })
        }
        ParameterOperation::VarNamePrefix(v) => {
            format!("!{}{}", v.prefix, if v.star { "@" } else { "*" })
        }
        ParameterOperation::ArraySubscript(s) => {
            let idx = match &s.index {
                ArraySubscriptIndex::Expr(e) => serialize_arith(e),
                ArraySubscriptIndex::All => "@".to_string(),
                ArraySubscriptIndex::AllConcat => "*".to_string(),
                ArraySubscriptIndex::StringKey(k) => k.clone(),
            };
            let trailing = s.operation.as_ref().map(|o| serialize_inner_op(o)).unwrap_or_default();
            format!("[{idx}]{trailing}")
        }
    }
}

fn serialize_inner_op(op: &InnerParameterOperation) -> String {
    match op {
        InnerParameterOperation::DefaultValue(d) => {
            format!("{}{}", if d.check_empty { ":-" } else { "-" }, serialize_word(&d.word))
        }
        InnerParameterOperation::AssignDefault(d) => {
            format!("{}{}", if d.check_empty { ":=" } else { "=" }, serialize_word(&d.word))
        }
        InnerParameterOperation::ErrorIfUnset(d) => {
            let word = d.word.as_ref().map(serialize_word).unwrap_or_default();
            format!("{}{word}", if d.check_empty { ":?" } else { "?" })
        }
        InnerParameterOperation::UseAlternative(d) => {
            format!("{}{}", if d.check_empty { ":+" } else { "+" }, serialize_word(&d.word))
        }
        InnerParameterOperation::Length(_) => String::new(),
        InnerParameterOperation::Substring(s) => {
            let offset = serialize_arith(&s.offset);
            match &s.length {
                Some(len) => format!(":{offset}:{}", serialize_arith(len)),
                None => format!(":{offset}"),
            }
        }
        InnerParameterOperation::PatternRemoval(p) => {
            let marker = match (p.side, p.greedy) {
                (PatternRemovalSide::Prefix, false) => "#",
                (PatternRemovalSide::Prefix, true) => "##",
                (PatternRemovalSide::Suffix, false) => "%",
                (PatternRemovalSide::Suffix, true) => "%%",
            };
            format!("{marker}{}", serialize_word(&p.pattern))
        }
        InnerParameterOperation::PatternReplacement(p) => {
            let anchor = match p.anchor {
                Some(PatternAnchor::Start) => "/",
                Some(PatternAnchor::End) => "%",
                None => "",
            };
            let all = if p.all { "/" } else { "" };
            let replacement = p.replacement.as_ref().map(serialize_word).unwrap_or_default();
            format!("/{all}{anchor}{}/{replacement}", serialize_word(&p.pattern))
        }
        InnerParameterOperation::CaseModification(c) => {
            let marker = match c.direction {
                CaseDirection::Upper if c.all => "^^",
                CaseDirection::Upper => "^",
                CaseDirection::Lower if c.all => ",,",
                CaseDirection::Lower => ",",
            };
            let pattern = c.pattern.as_ref().map(serialize_word).unwrap_or_default();
            format!("{marker}{pattern}")
        }
        InnerParameterOperation::Transform(t) => {
            let letter = match t.operator {
                TransformOperator::Quote => "Q",
                TransformOperator::Assignment => "A",
                TransformOperator::Length => "a",
                TransformOperator::UpperFirst => "u",
                TransformOperator::LowerFirst => "l",
            };
            format!("@{letter}")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip(src: &str) {
        let first = crate::parser::parse(src).expect("first parse");
        let text = serialize(&first);
        let second = crate::parser::parse(&text).expect("reparse");
        assert_eq!(first, second, "round-trip mismatch for `{src}` -> `{text}`");
    }

    #[test]
    fn roundtrips_simple_command() {
        roundtrip("echo hello world");
    }

    #[test]
    fn roundtrips_pipeline_and_operators() {
        roundtrip("true && echo yes || echo no");
    }

    #[test]
    fn roundtrips_if_statement() {
        roundtrip("if true; then echo yes; else echo no; fi");
    }

    #[test]
    fn roundtrips_for_loop() {
        roundtrip("for i in a b c; do echo $i; done");
    }

    #[test]
    fn roundtrips_arithmetic_expansion() {
        roundtrip("echo $((1 + 2 * 3))");
    }

    #[test]
    fn transform_pipeline_merges_metadata() {
        let pipeline = {
            let mut p = TransformPipeline::new();
            p.register(|ast, _meta| {
                let mut delta = Metadata::new();
                delta.insert("visited".to_string(), Value::Bool(true));
                (ast.clone(), delta)
            });
            p
        };
        let ast = crate::parser::parse("echo hi").unwrap();
        let (_, metadata) = pipeline.apply(&ast);
        assert_eq!(metadata.get("visited"), Some(&Value::Bool(true)));
    }
}
