//! Execution engine: `State` (the live interpreter state) plus statement,
//! pipeline, and compound-command evaluation. Mirrors the shape of an
//! async tree-walking interpreter the way the teacher's
//! `interpreter/execution_engine.rs` does, trimmed to the state fields
//! `SPEC_FULL.md` actually calls for.

pub mod builtins;
pub mod conditional;
pub mod redirection;

use crate::ast::*;
use crate::commands::{CommandContext, CommandRegistry};
use crate::error::{CommandNotFound, ExpansionError, ShellError};
use crate::expand::arithmetic::ArithContext;
use crate::fs::FileSystem;
use indexmap::IndexMap;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Instant;

#[derive(Debug, Clone, PartialEq)]
pub enum Variable {
    Scalar(String),
    IndexedArray(Vec<String>),
    AssocArray(IndexMap<String, String>),
}

impl Variable {
    pub fn as_scalar(&self) -> String {
        match self {
            Variable::Scalar(s) => s.clone(),
            Variable::IndexedArray(a) => a.first().cloned().unwrap_or_default(),
            Variable::AssocArray(m) => m.values().next().cloned().unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ShellOptionFlags {
    pub errexit: bool,
    pub nounset: bool,
    pub pipefail: bool,
    pub xtrace: bool,
    pub verbose: bool,
    pub noclobber: bool,
    pub noglob: bool,
    pub noexec: bool,
    pub allexport: bool,
    pub posix: bool,
    pub nullglob: bool,
    pub failglob: bool,
    pub lastpipe: bool,
}

/// Control-flow signal threaded out of statement execution for `break`/
/// `continue`/`return`/`exit`, the way the teacher's interpreter uses a
/// side-channel enum instead of unwinding through `Result`'s error path
/// (which is reserved for real failures).
#[derive(Debug, Clone, PartialEq)]
pub enum Signal {
    None,
    Break(u32),
    Continue(u32),
    Return(i32),
    Exit(i32),
}

pub struct State {
    pub variables: HashMap<String, Variable>,
    pub exported_names: HashSet<String>,
    pub functions: HashMap<String, CompoundCommandNode>,
    pub cwd: String,
    pub options: ShellOptionFlags,
    pub last_exit_code: i32,
    pub pipestatus: Vec<i32>,
    pub positional: Vec<String>,
    pub pid: i32,
    pub fs: Arc<dyn FileSystem>,
    pub umask: u32,
    pub registry: Arc<CommandRegistry>,
    pub stdout: String,
    pub stderr: String,
    pub deadline: Option<Instant>,
    pub on_command: Option<Arc<dyn Fn(&str, &[String], i32) + Send + Sync>>,
    pub start_time: Instant,
}

impl State {
    pub fn new(fs: Arc<dyn FileSystem>, cwd: impl Into<String>, registry: Arc<CommandRegistry>) -> Self {
        Self {
            variables: HashMap::new(),
            exported_names: HashSet::new(),
            functions: HashMap::new(),
            cwd: cwd.into(),
            options: ShellOptionFlags::default(),
            last_exit_code: 0,
            pipestatus: Vec::new(),
            positional: Vec::new(),
            pid: 1,
            fs,
            umask: 0o022,
            registry,
            stdout: String::new(),
            stderr: String::new(),
            deadline: None,
            on_command: None,
            start_time: Instant::now(),
        }
    }

    pub fn resolve(&self, path: &str) -> String {
        self.fs.resolve_path(&self.cwd, path)
    }

    pub fn is_set(&self, name: &str) -> bool {
        self.variables.contains_key(name) || matches!(name, "?" | "$" | "#" | "@" | "*" | "0")
    }

    pub fn get_var(&self, name: &str) -> Option<String> {
        match name {
            "?" => Some(self.last_exit_code.to_string()),
            "$" => Some(self.pid.to_string()),
            "#" => Some(self.positional.len().to_string()),
            // Outside of field-splitting context `$@` collapses to the same
            // text `$*` does: positional parameters joined by the first
            // byte of IFS. The multi-field behavior of `$@` is handled
            // separately in `expand_word_to_fields`/`expand_double_quoted_fields`.
            "@" | "*" => Some(self.positional.join(&self.ifs_join_sep())),
            "RANDOM" => Some(rand::random::<u16>().to_string()),
            "SECONDS" => Some(self.start_time.elapsed().as_secs().to_string()),
            _ => {
                if let Ok(n) = name.parse::<usize>() {
                    if n == 0 {
                        return Some("vshbash".to_string());
                    }
                    return self.positional.get(n - 1).cloned();
                }
                self.variables.get(name).map(|v| v.as_scalar())
            }
        }
    }

    pub fn set_var(&mut self, name: &str, value: impl Into<String>) {
        self.variables.insert(name.to_string(), Variable::Scalar(value.into()));
    }

    /// Materializes the exported-variable set as the `env` map a peripheral
    /// command sees, the way a forked process only inherits exported names.
    fn env_snapshot(&self) -> HashMap<String, String> {
        self.exported_names
            .iter()
            .filter_map(|name| self.variables.get(name).map(|v| (name.clone(), v.as_scalar())))
            .collect()
    }

    fn ifs(&self) -> String {
        self.get_var("IFS").unwrap_or_else(|| " \t\n".to_string())
    }

    /// First byte of `IFS`, the separator `$*`/`${arr[*]}` join with.
    fn ifs_join_sep(&self) -> String {
        self.ifs().chars().next().map(|c| c.to_string()).unwrap_or_default()
    }

    fn deadline_hit(&self) -> bool {
        self.deadline.map(|d| Instant::now() >= d).unwrap_or(false)
    }

    // ------------------------------------------------------------------
    // Word expansion
    // ------------------------------------------------------------------

    /// Expands a word to a single string with no field-splitting or
    /// globbing — the context double quotes and assignments use.
    pub async fn expand_word_to_string(&mut self, word: &WordNode) -> Result<String, ShellError> {
        let mut out = String::new();
        for part in &word.parts {
            out.push_str(&self.expand_part(part, false).await?);
        }
        Ok(out)
    }

    /// Expands a word into final argv fields: parameter/command/arithmetic
    /// substitution, then IFS word-splitting of unquoted parts, then glob
    /// expansion of the result.
    pub async fn expand_word_to_fields(&mut self, word: &WordNode) -> Result<Vec<String>, ShellError> {
        if word.parts.len() == 1 {
            if let WordPart::BraceExpansion(b) = &word.parts[0] {
                let mut out = Vec::new();
                for item in crate::expand::brace::expand_items(&b.items) {
                    out.extend(self.glob_expand(&item).await?);
                }
                return Ok(out);
            }
        }

        let mut fields = vec![String::new()];
        for part in &word.parts {
            if is_bare_at(part) {
                splice_pieces(&mut fields, &self.positional.clone());
                continue;
            }
            if let WordPart::DoubleQuoted(d) = part {
                let inner = self.expand_double_quoted_fields(&d.parts).await?;
                splice_pieces(&mut fields, &inner);
                continue;
            }
            let quoted = matches!(part, WordPart::SingleQuoted(_));
            let splits_on_ws = !quoted && matches!(part, WordPart::ParameterExpansion(_) | WordPart::CommandSubstitution(_));
            let text = self.expand_part(part, false).await?;
            if splits_on_ws {
                let pieces = crate::expand::split_fields(&text, &self.ifs());
                splice_pieces(&mut fields, &pieces);
            } else if let Some(last) = fields.last_mut() {
                last.push_str(&text);
            }
        }

        let mut out = Vec::new();
        for field in fields {
            out.extend(self.glob_expand(&field).await?);
        }
        Ok(out)
    }

    /// Expands the parts inside a `"..."` word. A bare `$@`/`${@}` still
    /// explodes into one piece per positional parameter even though it's
    /// quoted (spec: `${@}` yields as many fields as positional params,
    /// even inside double quotes); every other part contributes a single
    /// glued, non-split text segment the way quoting normally behaves.
    async fn expand_double_quoted_fields(&mut self, parts: &[WordPart]) -> Result<Vec<String>, ShellError> {
        let mut fields = vec![String::new()];
        for part in parts {
            if is_bare_at(part) {
                splice_pieces(&mut fields, &self.positional.clone());
                continue;
            }
            let text = self.expand_part(part, true).await?;
            if let Some(last) = fields.last_mut() {
                last.push_str(&text);
            }
        }
        Ok(fields)
    }

    async fn glob_expand(&self, field: &str) -> Result<Vec<String>, ShellError> {
        if self.options.noglob || !crate::expand::glob::has_glob_chars(field) {
            return Ok(vec![field.to_string()]);
        }
        let (dir, pattern) = match field.rfind('/') {
            Some(i) => (&field[..=i], &field[i + 1..]),
            None => (".", field),
        };
        let dir_resolved = self.resolve(dir);
        let matches = crate::expand::glob::expand_in_dir(self.fs.as_ref(), &dir_resolved, pattern).await;
        if matches.is_empty() {
            if self.options.failglob {
                return Err(ExpansionError::Other { message: format!("no match: {field}") }.into());
            }
            if self.options.nullglob {
                return Ok(Vec::new());
            }
            return Ok(vec![field.to_string()]);
        }
        let prefix = if dir == "." { "".to_string() } else { dir.to_string() };
        Ok(matches.into_iter().map(|m| format!("{prefix}{m}")).collect())
    }

    fn expand_part<'a>(
        &'a mut self,
        part: &'a WordPart,
        _in_double_quotes: bool,
    ) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<String, ShellError>> + 'a>> {
        Box::pin(async move {
            Ok(match part {
                WordPart::Literal(l) => l.value.clone(),
                WordPart::Escaped(e) => e.value.clone(),
                WordPart::SingleQuoted(s) => s.value.clone(),
                WordPart::DoubleQuoted(d) => {
                    let mut out = String::new();
                    for p in &d.parts {
                        out.push_str(&self.expand_part(p, true).await?);
                    }
                    out
                }
                WordPart::ParameterExpansion(p) => self.expand_parameter(p).await?,
                WordPart::CommandSubstitution(c) => self.expand_command_substitution(c).await?,
                WordPart::ArithmeticExpansion(a) => crate::expand::arithmetic::eval(&a.expression, self)?.to_string(),
                WordPart::ProcessSubstitution(_) => String::new(), // no host FDs to allocate; no-op under Non-goals
                WordPart::BraceExpansion(b) => crate::expand::brace::expand_items(&b.items).join(" "),
                WordPart::TildeExpansion(t) => self.expand_tilde(t),
                WordPart::Glob(g) => g.pattern.clone(),
            })
        })
    }

    // ------------------------------------------------------------------
    // `${...}` parameter expansion
    // ------------------------------------------------------------------

    fn array_values(&self, name: &str) -> Option<Vec<String>> {
        if name == "PIPESTATUS" {
            return Some(self.pipestatus.iter().map(|c| c.to_string()).collect());
        }
        if name == "@" || name == "*" {
            return Some(self.positional.clone());
        }
        match self.variables.get(name) {
            Some(Variable::IndexedArray(a)) => Some(a.clone()),
            Some(Variable::AssocArray(m)) => Some(m.values().cloned().collect()),
            Some(Variable::Scalar(s)) => Some(vec![s.clone()]),
            None => None,
        }
    }

    /// Resolves a bare `$name`/`${name}` with no trailing operation,
    /// honoring `nounset`.
    fn read_parameter_value(&self, name: &str) -> Result<String, ShellError> {
        if name == "PIPESTATUS" {
            return Ok(self.pipestatus.first().map(|c| c.to_string()).unwrap_or_default());
        }
        if let Some(v) = self.get_var(name) {
            return Ok(v);
        }
        if self.options.nounset {
            return Err(ExpansionError::UnsetVariable { name: name.to_string() }.into());
        }
        Ok(String::new())
    }

    fn array_keys(&self, array: &str, _star: bool) -> String {
        match self.variables.get(array) {
            Some(Variable::IndexedArray(a)) => (0..a.len()).map(|i| i.to_string()).collect::<Vec<_>>().join(" "),
            Some(Variable::AssocArray(m)) => m.keys().cloned().collect::<Vec<_>>().join(" "),
            _ if array == "PIPESTATUS" => (0..self.pipestatus.len()).map(|i| i.to_string()).collect::<Vec<_>>().join(" "),
            _ => String::new(),
        }
    }

    fn var_name_prefix(&self, prefix: &str) -> String {
        let mut names: Vec<&String> = self.variables.keys().filter(|n| n.starts_with(prefix)).collect();
        names.sort();
        names.into_iter().cloned().collect::<Vec<_>>().join(" ")
    }

    pub async fn expand_parameter(&mut self, p: &ParameterExpansionPart) -> Result<String, ShellError> {
        match &p.operation {
            None => self.read_parameter_value(&p.parameter),
            Some(ParameterOperation::Inner(op)) => self.apply_inner_operation(&p.parameter, op).await,
            Some(ParameterOperation::ArraySubscript(sub)) => self.expand_array_subscript(&p.parameter, sub).await,
            Some(ParameterOperation::ArrayKeys(op)) => Ok(self.array_keys(&op.array, op.star)),
            Some(ParameterOperation::VarNamePrefix(op)) => Ok(self.var_name_prefix(&op.prefix)),
            Some(ParameterOperation::Indirection(op)) => self.expand_indirection(&p.parameter, op).await,
        }
    }

    async fn expand_indirection(&mut self, name: &str, op: &IndirectionOp) -> Result<String, ShellError> {
        let target = self.read_parameter_value(name)?;
        if target.is_empty() {
            return Ok(String::new());
        }
        match &op.inner_op {
            Some(inner) => self.apply_inner_operation(&target, inner).await,
            None => self.read_parameter_value(&target),
        }
    }

    async fn expand_array_subscript(&mut self, name: &str, sub: &ArraySubscriptOp) -> Result<String, ShellError> {
        let value = match &sub.index {
            ArraySubscriptIndex::All | ArraySubscriptIndex::AllConcat => {
                let items = self.array_values(name).unwrap_or_default();
                let sep = if matches!(sub.index, ArraySubscriptIndex::AllConcat) {
                    self.ifs_join_sep()
                } else {
                    " ".to_string()
                };
                items.join(&sep)
            }
            ArraySubscriptIndex::Expr(expr) => {
                let idx = crate::expand::arithmetic::eval(expr, self)?;
                match self.variables.get(name) {
                    Some(Variable::AssocArray(m)) => m.get(&idx.to_string()).cloned().unwrap_or_default(),
                    _ => self.array_values(name).and_then(|v| v.get(idx.max(0) as usize).cloned()).unwrap_or_default(),
                }
            }
            ArraySubscriptIndex::StringKey(key) => match self.variables.get(name) {
                Some(Variable::AssocArray(m)) => m.get(key).cloned().unwrap_or_default(),
                _ => String::new(),
            },
        };
        match &sub.operation {
            Some(op) => apply_operation_to_value(self, name, value, op).await,
            None => Ok(value),
        }
    }

    async fn apply_inner_operation(&mut self, name: &str, op: &InnerParameterOperation) -> Result<String, ShellError> {
        let current = self.read_parameter_value(name).unwrap_or_default();
        apply_operation_to_value(self, name, current, op).await
    }

    fn expand_tilde(&self, t: &TildeExpansionPart) -> String {
        if t.user.is_some() {
            format!("~{}", t.user.as_ref().unwrap())
        } else {
            self.get_var("HOME").unwrap_or_else(|| "/home/user".to_string())
        }
    }

    async fn expand_command_substitution(&mut self, c: &CommandSubstitutionPart) -> Result<String, ShellError> {
        let mut sub = self.snapshot();
        sub.run_script(&c.body).await?;
        self.last_exit_code = sub.last_exit_code;
        let mut out = sub.stdout;
        while out.ends_with('\n') {
            out.pop();
        }
        Ok(out)
    }

    /// A subshell/command-substitution snapshot: a full clone of variable
    /// and option state so neither writes back to the parent, matching the
    /// documented snapshot-only visibility rule.
    fn snapshot(&self) -> State {
        State {
            variables: self.variables.clone(),
            exported_names: self.exported_names.clone(),
            functions: self.functions.clone(),
            cwd: self.cwd.clone(),
            options: self.options.clone(),
            last_exit_code: self.last_exit_code,
            pipestatus: self.pipestatus.clone(),
            positional: self.positional.clone(),
            pid: self.pid,
            fs: self.fs.clone(),
            umask: self.umask,
            registry: self.registry.clone(),
            stdout: String::new(),
            stderr: String::new(),
            deadline: self.deadline,
            on_command: self.on_command.clone(),
            start_time: self.start_time,
        }
    }

    // ------------------------------------------------------------------
    // Statement / pipeline / command execution
    // ------------------------------------------------------------------

    pub async fn run_script(&mut self, script: &ScriptNode) -> Result<Signal, ShellError> {
        for stmt in &script.statements {
            let signal = self.run_statement(stmt).await?;
            if signal != Signal::None {
                return Ok(signal);
            }
        }
        Ok(Signal::None)
    }

    pub async fn run_statement(&mut self, stmt: &StatementNode) -> Result<Signal, ShellError> {
        if stmt.background {
            // cooperative single-threaded scheduler: run synchronously but
            // don't propagate its exit code as the statement's own.
            let saved = self.last_exit_code;
            self.run_pipeline(&stmt.pipelines[0]).await?;
            self.last_exit_code = saved;
            return Ok(Signal::None);
        }

        let mut iter = stmt.pipelines.iter();
        let first = iter.next().expect("statement always has >=1 pipeline");
        let mut signal = self.run_pipeline_checked(first).await?;
        let mut last_status = self.last_exit_code;

        for (op, pipeline) in stmt.operators.iter().zip(iter) {
            if signal != Signal::None {
                break;
            }
            let should_run = match op {
                StatementOperator::And => last_status == 0,
                StatementOperator::Or => last_status != 0,
                StatementOperator::Semi => true,
            };
            if !should_run {
                continue;
            }
            signal = self.run_pipeline_checked(pipeline).await?;
            last_status = self.last_exit_code;
        }
        Ok(signal)
    }

    async fn run_pipeline_checked(&mut self, pipeline: &PipelineNode) -> Result<Signal, ShellError> {
        let signal = self.run_pipeline(pipeline).await?;
        if self.options.errexit && self.last_exit_code != 0 && signal == Signal::None {
            return Ok(Signal::Exit(self.last_exit_code));
        }
        Ok(signal)
    }

    pub async fn run_pipeline(&mut self, pipeline: &PipelineNode) -> Result<Signal, ShellError> {
        if self.deadline_hit() {
            return Err(ShellError::Cancelled);
        }
        let mut statuses = Vec::with_capacity(pipeline.commands.len());
        let mut signal = Signal::None;
        let mut carried_stdin = String::new();

        for (i, command) in pipeline.commands.iter().enumerate() {
            let mut sub = self.snapshot();
            sub.stdout = carried_stdin.clone();
            let cmd_signal = sub.run_command_contained(command).await?;
            statuses.push(sub.last_exit_code);
            carried_stdin = std::mem::take(&mut sub.stdout);
            // `|&` merges this stage's stderr into the next stage's stdin
            // instead of letting it flow straight to the parent's stderr.
            if pipeline.pipe_stderr.get(i).copied().unwrap_or(false) {
                carried_stdin.push_str(&sub.stderr);
            } else {
                self.stderr.push_str(&sub.stderr);
            }
            self.variables = sub.variables;
            self.functions = sub.functions;
            self.cwd = sub.cwd;
            if cmd_signal != Signal::None {
                signal = cmd_signal;
            }
        }
        self.stdout.push_str(&carried_stdin);
        self.pipestatus = statuses.clone();
        let mut effective = *statuses.last().unwrap_or(&0);
        if self.options.pipefail {
            if let Some(nz) = statuses.iter().rev().find(|&&s| s != 0) {
                effective = *nz;
            }
        }
        if pipeline.negated {
            effective = if effective == 0 { 1 } else { 0 };
        }
        self.last_exit_code = effective;
        Ok(signal)
    }

    /// Runs a command the way a pipeline stage does: `CommandNotFound`,
    /// expansion, filesystem and redirection failures are lowered to a
    /// stderr diagnostic + exit code (per §7) instead of unwinding the
    /// whole script. `errexit` still takes effect afterwards, since it
    /// reads `last_exit_code` once this returns. `Cancelled` is the one
    /// error kind that keeps propagating — cancellation abandons the run.
    async fn run_command_contained(&mut self, command: &CommandNode) -> Result<Signal, ShellError> {
        match self.run_command(command).await {
            Ok(signal) => Ok(signal),
            Err(ShellError::Cancelled) => Err(ShellError::Cancelled),
            Err(e) => {
                self.last_exit_code = e.exit_code();
                self.stderr.push_str(&format!("{e}\n"));
                Ok(Signal::None)
            }
        }
    }

    pub async fn run_command(&mut self, command: &CommandNode) -> Result<Signal, ShellError> {
        match command {
            CommandNode::Simple(s) => self.run_simple_command(s).await,
            CommandNode::Compound(c) => self.run_compound_command(c).await,
            CommandNode::FunctionDef(f) => {
                self.functions.insert(f.name.clone(), (*f.body).clone());
                self.last_exit_code = 0;
                Ok(Signal::None)
            }
        }
    }

    async fn run_simple_command(&mut self, simple: &SimpleCommandNode) -> Result<Signal, ShellError> {
        if simple.name.is_none() {
            for a in &simple.assignments {
                self.apply_assignment(a).await?;
            }
            self.last_exit_code = 0;
            return Ok(Signal::None);
        }

        let name_word = simple.name.as_ref().unwrap();
        let name = self.expand_word_to_string(name_word).await?;
        let mut args = Vec::new();
        for arg in &simple.args {
            args.extend(self.expand_word_to_fields(arg).await?);
        }

        // function-local dynamic scope for assignments preceding a function call
        if self.functions.contains_key(&name) {
            let saved_vars: Vec<(String, Option<Variable>)> =
                simple.assignments.iter().map(|a| (a.name.clone(), self.variables.get(&a.name).cloned())).collect();
            for a in &simple.assignments {
                self.apply_assignment(a).await?;
            }
            let saved_positional = std::mem::replace(&mut self.positional, args.clone());
            let body = self.functions.get(&name).cloned().unwrap();
            let signal = self.run_compound_command(&body).await?;
            self.positional = saved_positional;
            for (name, old) in saved_vars {
                match old {
                    Some(v) => {
                        self.variables.insert(name, v);
                    }
                    None => {
                        self.variables.remove(&name);
                    }
                }
            }
            if let Some(cb) = &self.on_command {
                cb(&name_word_text(name_word), &args, self.last_exit_code);
            }
            return Ok(match signal {
                Signal::Return(code) => {
                    self.last_exit_code = code;
                    Signal::None
                }
                other => other,
            });
        }

        for a in &simple.assignments {
            self.apply_assignment_temporary(a).await?;
        }

        if args.is_empty() && name.is_empty() {
            self.last_exit_code = 0;
            return Ok(Signal::None);
        }

        let restore_fds = redirection::apply(self, &simple.redirections).await?;
        let result = builtins::dispatch(self, &name, &args).await;
        redirection::restore(self, restore_fds).await?;

        let signal = match result {
            Some(r) => r?,
            None => {
                let registry = self.registry.clone();
                match registry.get(&name) {
                    Some(cmd) => {
                        let stdin = std::mem::take(&mut self.stdout);
                        let ctx = CommandContext {
                            args: args.clone(),
                            stdin,
                            cwd: self.cwd.clone(),
                            env: self.env_snapshot(),
                            fs: self.fs.clone(),
                        };
                        let outcome = cmd.execute(ctx).await;
                        self.last_exit_code = outcome.exit_code;
                        self.stdout.push_str(&outcome.stdout);
                        self.stderr.push_str(&outcome.stderr);
                        Signal::None
                    }
                    None => {
                        // stderr gets the "name: command not found" line once,
                        // from the error's own Display impl in `Shell::exec`'s
                        // catch-all — pushing it here too would duplicate it.
                        self.last_exit_code = 127;
                        return Err(ShellError::CommandNotFound(CommandNotFound { name }));
                    }
                }
            }
        };
        if let Some(cb) = &self.on_command {
            cb(&name, &args, self.last_exit_code);
        }
        Ok(signal)
    }

    async fn apply_assignment(&mut self, a: &AssignmentNode) -> Result<(), ShellError> {
        if let Some(array_words) = &a.array {
            let mut values = Vec::new();
            for w in array_words {
                values.extend(self.expand_word_to_fields(w).await?);
            }
            self.variables.insert(a.name.clone(), Variable::IndexedArray(values));
            return Ok(());
        }
        let value = match &a.value {
            Some(w) => self.expand_word_to_string(w).await?,
            None => String::new(),
        };
        if let Some(subscript) = &a.subscript {
            self.assign_array_element(&a.name, subscript, value, a.append).await?;
            if self.options.allexport {
                self.exported_names.insert(a.name.clone());
            }
            return Ok(());
        }
        if a.append {
            let existing = self.get_var(&a.name).unwrap_or_default();
            self.variables.insert(a.name.clone(), Variable::Scalar(format!("{existing}{value}")));
        } else {
            self.variables.insert(a.name.clone(), Variable::Scalar(value));
        }
        if self.options.allexport {
            self.exported_names.insert(a.name.clone());
        }
        Ok(())
    }

    /// `NAME[subscript]=value`. Assoc-array targets (pre-declared via
    /// `declare -A`) treat the subscript as a literal key; everything else
    /// evaluates it as an arithmetic index into an indexed array, growing
    /// the array as needed, matching bash's own default-to-indexed rule.
    async fn assign_array_element(&mut self, name: &str, subscript: &str, value: String, append: bool) -> Result<(), ShellError> {
        let treat_as_assoc = matches!(self.variables.get(name), Some(Variable::AssocArray(_)));
        if treat_as_assoc {
            let final_value = match self.variables.get(name) {
                Some(Variable::AssocArray(m)) if append => {
                    format!("{}{}", m.get(subscript).cloned().unwrap_or_default(), value)
                }
                _ => value,
            };
            match self.variables.entry(name.to_string()).or_insert_with(|| Variable::AssocArray(IndexMap::new())) {
                Variable::AssocArray(m) => {
                    m.insert(subscript.to_string(), final_value);
                }
                other => {
                    let mut m = IndexMap::new();
                    m.insert(subscript.to_string(), final_value);
                    *other = Variable::AssocArray(m);
                }
            }
            return Ok(());
        }

        let idx_expr = crate::expand::arithmetic::parse(subscript)?;
        let idx = crate::expand::arithmetic::eval(&idx_expr, self)?.max(0) as usize;
        let final_value = match self.variables.get(name) {
            Some(Variable::IndexedArray(a)) if append => format!("{}{}", a.get(idx).cloned().unwrap_or_default(), value),
            Some(Variable::Scalar(s)) if append && idx == 0 => format!("{s}{value}"),
            _ => value,
        };
        match self.variables.entry(name.to_string()).or_insert_with(|| Variable::IndexedArray(Vec::new())) {
            Variable::IndexedArray(a) => {
                if a.len() <= idx {
                    a.resize(idx + 1, String::new());
                }
                a[idx] = final_value;
            }
            other => {
                let mut a = vec![String::new(); idx + 1];
                a[idx] = final_value;
                *other = Variable::IndexedArray(a);
            }
        }
        Ok(())
    }

    /// `VAR=val cmd` — applies for the duration of `cmd` only. Since this
    /// implementation executes each pipeline stage in its own state
    /// snapshot already, a plain assignment is equivalent here.
    async fn apply_assignment_temporary(&mut self, a: &AssignmentNode) -> Result<(), ShellError> {
        self.apply_assignment(a).await
    }

    async fn run_compound_command(&mut self, compound: &CompoundCommandNode) -> Result<Signal, ShellError> {
        match compound {
            CompoundCommandNode::If(n) => self.run_if(n).await,
            CompoundCommandNode::For(n) => self.run_for(n).await,
            CompoundCommandNode::CStyleFor(n) => self.run_c_style_for(n).await,
            CompoundCommandNode::While(n) => self.run_while(n, false).await,
            CompoundCommandNode::Until(n) => self.run_until(n).await,
            CompoundCommandNode::Case(n) => self.run_case(n).await,
            CompoundCommandNode::Subshell(n) => self.run_subshell(n).await,
            CompoundCommandNode::Group(n) => self.run_group(n).await,
            CompoundCommandNode::ArithmeticCommand(n) => {
                let v = crate::expand::arithmetic::eval(&n.expression, self)?;
                self.last_exit_code = if v == 0 { 1 } else { 0 };
                Ok(Signal::None)
            }
            CompoundCommandNode::ConditionalCommand(n) => {
                let result = conditional::eval(&n.expression, self).await?;
                self.last_exit_code = if result { 0 } else { 1 };
                Ok(Signal::None)
            }
        }
    }

    async fn run_body(&mut self, body: &[StatementNode]) -> Result<Signal, ShellError> {
        for stmt in body {
            let signal = Box::pin(self.run_statement(stmt)).await?;
            if signal != Signal::None {
                return Ok(signal);
            }
        }
        Ok(Signal::None)
    }

    async fn run_condition_in_errexit_carveout(&mut self, body: &[StatementNode]) -> Result<(bool, Signal), ShellError> {
        let saved = self.options.errexit;
        self.options.errexit = false;
        let mut signal = Signal::None;
        for stmt in body {
            signal = Box::pin(self.run_statement(stmt)).await?;
            if signal != Signal::None {
                break;
            }
        }
        self.options.errexit = saved;
        Ok((self.last_exit_code == 0, signal))
    }

    async fn run_if(&mut self, n: &IfNode) -> Result<Signal, ShellError> {
        for clause in &n.clauses {
            let (ok, signal) = self.run_condition_in_errexit_carveout(&clause.condition).await?;
            if signal != Signal::None {
                return Ok(signal);
            }
            if ok {
                return self.run_body(&clause.body).await;
            }
        }
        if let Some(else_body) = &n.else_body {
            return self.run_body(else_body).await;
        }
        self.last_exit_code = 0;
        Ok(Signal::None)
    }

    async fn run_while(&mut self, n: &WhileNode, until: bool) -> Result<Signal, ShellError> {
        loop {
            if self.deadline_hit() {
                return Err(ShellError::Cancelled);
            }
            let (ok, signal) = self.run_condition_in_errexit_carveout(&n.condition).await?;
            if signal != Signal::None {
                return Ok(signal);
            }
            let continue_loop = if until { !ok } else { ok };
            if !continue_loop {
                break;
            }
            let body_signal = self.run_body(&n.body).await?;
            match body_signal {
                Signal::Break(n) if n <= 1 => break,
                Signal::Break(n) => return Ok(Signal::Break(n - 1)),
                Signal::Continue(n) if n <= 1 => continue,
                Signal::Continue(n) => return Ok(Signal::Continue(n - 1)),
                Signal::None => {}
                other => return Ok(other),
            }
        }
        self.last_exit_code = 0;
        Ok(Signal::None)
    }

    async fn run_until(&mut self, n: &UntilNode) -> Result<Signal, ShellError> {
        let as_while = WhileNode { condition: n.condition.clone(), body: n.body.clone(), redirections: n.redirections.clone() };
        self.run_while(&as_while, true).await
    }

    async fn run_for(&mut self, n: &ForNode) -> Result<Signal, ShellError> {
        let items: Vec<String> = match &n.words {
            Some(words) => {
                let mut out = Vec::new();
                for w in words {
                    out.extend(self.expand_word_to_fields(w).await?);
                }
                out
            }
            None => self.positional.clone(),
        };
        for item in items {
            if self.deadline_hit() {
                return Err(ShellError::Cancelled);
            }
            self.set_var(&n.variable, item);
            let signal = self.run_body(&n.body).await?;
            match signal {
                Signal::Break(n) if n <= 1 => break,
                Signal::Break(n) => return Ok(Signal::Break(n - 1)),
                Signal::Continue(n) if n <= 1 => continue,
                Signal::Continue(n) => return Ok(Signal::Continue(n - 1)),
                Signal::None => {}
                other => return Ok(other),
            }
        }
        self.last_exit_code = 0;
        Ok(Signal::None)
    }

    async fn run_c_style_for(&mut self, n: &CStyleForNode) -> Result<Signal, ShellError> {
        if let Some(init) = &n.init {
            crate::expand::arithmetic::eval(init, self)?;
        }
        loop {
            if self.deadline_hit() {
                return Err(ShellError::Cancelled);
            }
            let cond_true = match &n.condition {
                Some(c) => crate::expand::arithmetic::eval(c, self)? != 0,
                None => true,
            };
            if !cond_true {
                break;
            }
            let signal = self.run_body(&n.body).await?;
            match signal {
                Signal::Break(n) if n <= 1 => break,
                Signal::Break(n) => return Ok(Signal::Break(n - 1)),
                Signal::Continue(n) if n <= 1 => {}
                Signal::Continue(n) => return Ok(Signal::Continue(n - 1)),
                Signal::None => {}
                other => return Ok(other),
            }
            if let Some(update) = &n.update {
                crate::expand::arithmetic::eval(update, self)?;
            }
        }
        self.last_exit_code = 0;
        Ok(Signal::None)
    }

    async fn run_case(&mut self, n: &CaseNode) -> Result<Signal, ShellError> {
        let subject = self.expand_word_to_string(&n.word).await?;
        let mut idx = 0;
        let mut matched_any = false;
        while idx < n.items.len() {
            let item = &n.items[idx];
            let mut is_match = matched_any; // fallthrough from `;&`/`;;&` re-enters unconditionally
            if !is_match {
                for pattern in &item.patterns {
                    let pat = self.expand_word_to_string(pattern).await?;
                    if crate::expand::glob::matches_pattern(&pat, &subject) {
                        is_match = true;
                        break;
                    }
                }
            }
            if is_match {
                let signal = self.run_body(&item.body).await?;
                if signal != Signal::None {
                    return Ok(signal);
                }
                match item.terminator {
                    CaseTerminator::DoubleSemi => return Ok(Signal::None),
                    CaseTerminator::SemiAnd => {
                        matched_any = true;
                        idx += 1;
                        continue;
                    }
                    CaseTerminator::SemiSemiAnd => {
                        matched_any = false;
                        idx += 1;
                        continue;
                    }
                }
            }
            idx += 1;
        }
        self.last_exit_code = 0;
        Ok(Signal::None)
    }

    async fn run_subshell(&mut self, n: &SubshellNode) -> Result<Signal, ShellError> {
        let mut sub = self.snapshot();
        let signal = sub.run_body(&n.body).await?;
        self.last_exit_code = sub.last_exit_code;
        self.stdout.push_str(&sub.stdout);
        self.stderr.push_str(&sub.stderr);
        Ok(match signal {
            Signal::Return(_) => Signal::None,
            other => other,
        })
    }

    async fn run_group(&mut self, n: &GroupNode) -> Result<Signal, ShellError> {
        self.run_body(&n.body).await
    }
}

impl ArithContext for State {
    fn get(&self, name: &str) -> Option<String> {
        self.get_var(name)
    }

    fn get_index(&self, array: &str, index: i64) -> Option<String> {
        match self.variables.get(array) {
            Some(Variable::IndexedArray(a)) => a.get(index.max(0) as usize).cloned(),
            Some(Variable::AssocArray(m)) => m.get(&index.to_string()).cloned(),
            _ => None,
        }
    }

    fn set(&mut self, name: &str, value: i64) {
        self.set_var(name, value.to_string());
    }

    fn set_index(&mut self, array: &str, index: i64, value: i64) {
        let entry = self.variables.entry(array.to_string()).or_insert_with(|| Variable::IndexedArray(Vec::new()));
        if let Variable::IndexedArray(a) = entry {
            let idx = index.max(0) as usize;
            if a.len() <= idx {
                a.resize(idx + 1, String::new());
            }
            a[idx] = value.to_string();
        }
    }
}

/// Evaluates the `InnerParameterOperation` suffix of a `${name<op>}` or
/// `${name[idx]<op>}` expansion against an already-resolved `current`
/// value. `name` is used only to decide unset-vs-empty for the
/// `:-`/`:=`/`:?`/`:+` family and for `AssignDefault`'s write-back.
async fn apply_operation_to_value(
    state: &mut State,
    name: &str,
    current: String,
    op: &InnerParameterOperation,
) -> Result<String, ShellError> {
    let is_unset = !state.is_set(name);
    match op {
        InnerParameterOperation::DefaultValue(d) => {
            let use_default = if d.check_empty { is_unset || current.is_empty() } else { is_unset };
            if use_default { state.expand_word_to_string(&d.word).await } else { Ok(current) }
        }
        InnerParameterOperation::AssignDefault(d) => {
            let use_default = if d.check_empty { is_unset || current.is_empty() } else { is_unset };
            if use_default {
                let value = state.expand_word_to_string(&d.word).await?;
                state.set_var(name, value.clone());
                Ok(value)
            } else {
                Ok(current)
            }
        }
        InnerParameterOperation::ErrorIfUnset(d) => {
            let trigger = if d.check_empty { is_unset || current.is_empty() } else { is_unset };
            if trigger {
                let message = match &d.word {
                    Some(w) => state.expand_word_to_string(w).await?,
                    None => "parameter null or not set".to_string(),
                };
                return Err(ExpansionError::UnsetVariable { name: format!("{name}: {message}") }.into());
            }
            Ok(current)
        }
        InnerParameterOperation::UseAlternative(d) => {
            let trigger = if d.check_empty { !is_unset && !current.is_empty() } else { !is_unset };
            if trigger { state.expand_word_to_string(&d.word).await } else { Ok(String::new()) }
        }
        InnerParameterOperation::Length(_) => Ok(current.chars().count().to_string()),
        InnerParameterOperation::Substring(s) => {
            let offset = crate::expand::arithmetic::eval(&s.offset, state)?;
            let chars: Vec<char> = current.chars().collect();
            let len = chars.len() as i64;
            let start = (if offset < 0 { len + offset } else { offset }).clamp(0, len) as usize;
            let end = match &s.length {
                Some(l) => {
                    let lv = crate::expand::arithmetic::eval(l, state)?;
                    let raw_end = if lv < 0 { len + lv } else { start as i64 + lv };
                    raw_end.clamp(start as i64, len) as usize
                }
                None => chars.len(),
            };
            Ok(chars[start..end].iter().collect())
        }
        InnerParameterOperation::PatternRemoval(p) => {
            let pattern = state.expand_word_to_string(&p.pattern).await?;
            Ok(crate::expand::glob::remove_pattern(&current, &pattern, p.side, p.greedy))
        }
        InnerParameterOperation::PatternReplacement(p) => {
            let pattern = state.expand_word_to_string(&p.pattern).await?;
            let replacement = match &p.replacement {
                Some(w) => state.expand_word_to_string(w).await?,
                None => String::new(),
            };
            Ok(crate::expand::glob::replace_pattern(&current, &pattern, &replacement, p.all, p.anchor))
        }
        InnerParameterOperation::CaseModification(c) => Ok(apply_case_modification(state, &current, c).await?),
        InnerParameterOperation::Transform(t) => Ok(apply_transform(&current, t.operator)),
    }
}

async fn apply_case_modification(state: &mut State, current: &str, c: &CaseModificationOp) -> Result<String, ShellError> {
    let pattern = match &c.pattern {
        Some(w) => Some(state.expand_word_to_string(w).await?),
        None => None,
    };
    let matches_char = |ch: char| -> bool {
        match &pattern {
            Some(p) => crate::expand::glob::matches_pattern(p, &ch.to_string()),
            None => true,
        }
    };
    let convert = |ch: char| -> char {
        match c.direction {
            CaseDirection::Upper => ch.to_ascii_uppercase(),
            CaseDirection::Lower => ch.to_ascii_lowercase(),
        }
    };
    if c.all {
        Ok(current.chars().map(|ch| if matches_char(ch) { convert(ch) } else { ch }).collect())
    } else {
        let mut chars = current.chars();
        match chars.next() {
            Some(first) => {
                let converted = if matches_char(first) { convert(first) } else { first };
                Ok(std::iter::once(converted).chain(chars).collect())
            }
            None => Ok(String::new()),
        }
    }
}

fn apply_transform(current: &str, op: TransformOperator) -> String {
    match op {
        TransformOperator::Quote => format!("'{}'", current.replace('\'', "'\\''")),
        TransformOperator::Assignment => format!("\"{}\"", current.replace('\\', "\\\\").replace('"', "\\\"")),
        TransformOperator::Length => current.chars().count().to_string(),
        TransformOperator::UpperFirst => {
            let mut chars = current.chars();
            match chars.next() {
                Some(c) => c.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        }
        TransformOperator::LowerFirst => {
            let mut chars = current.chars();
            match chars.next() {
                Some(c) => c.to_lowercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        }
    }
}

/// Matches a bare `$@`/`${@}` with no trailing operation — the one
/// parameter expansion that field-splits into one piece per positional
/// parameter regardless of surrounding quoting.
fn is_bare_at(part: &WordPart) -> bool {
    matches!(part, WordPart::ParameterExpansion(p) if p.parameter == "@" && p.operation.is_none())
}

/// Merges `pieces` into the in-progress field list the way IFS splitting
/// does: the first piece glues onto the current last field, the rest start
/// new fields. A no-op when `pieces` is empty (an unset/empty expansion
/// contributes nothing, not an empty field).
fn splice_pieces(fields: &mut Vec<String>, pieces: &[String]) {
    if pieces.is_empty() {
        return;
    }
    if let Some(last) = fields.last_mut() {
        last.push_str(&pieces[0]);
    }
    fields.extend(pieces[1..].iter().cloned());
}

fn name_word_text(w: &WordNode) -> String {
    let mut out = String::new();
    for p in &w.parts {
        if let WordPart::Literal(l) = p {
            out.push_str(&l.value);
        }
    }
    out
}
