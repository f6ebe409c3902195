//! Built-in command dispatch: the names that never go through the
//! peripheral command registry because they mutate shell state directly
//! (`cd`, `export`, `set`, `read`, ...). Grounded on the teacher's
//! `interpreter/builtin_dispatch.rs` two-tier split (special builtins
//! checked before user functions, simple builtins after), adapted to this
//! crate's `Signal`/`ShellError` control-flow types instead of the
//! teacher's flat `(stdout, stderr, exit_code)` tuple.
//!
//! Returns `None` when `name` isn't a builtin at all, so the caller falls
//! through to function lookup and then the command registry.

use super::{Signal, State, Variable};
use crate::error::{ExpansionError, ShellError};

pub async fn dispatch(state: &mut State, name: &str, args: &[String]) -> Option<Result<Signal, ShellError>> {
    let result = match name {
        ":" | "true" => ok(state, 0),
        "false" => ok(state, 1),
        "cd" => cd(state, args),
        "pwd" => pwd(state),
        "export" => export(state, args),
        "unset" => unset(state, args),
        "readonly" => readonly(state, args),
        "set" => set(state, args),
        "shift" => shift(state, args),
        "break" => break_continue(state, args, true),
        "continue" => break_continue(state, args, false),
        "return" => Ok(Signal::Return(parse_code_arg(args).unwrap_or(state.last_exit_code))),
        "exit" => Ok(Signal::Exit(parse_code_arg(args).unwrap_or(state.last_exit_code))),
        "eval" => eval(state, args).await,
        "local" | "declare" | "typeset" => declare(state, name, args).await,
        "read" => read(state, args),
        "let" => let_cmd(state, args),
        "test" | "[" => test_cmd(state, args).await,
        _ => return None,
    };
    Some(result)
}

fn ok(state: &mut State, code: i32) -> Result<Signal, ShellError> {
    state.last_exit_code = code;
    Ok(Signal::None)
}

fn parse_code_arg(args: &[String]) -> Option<i32> {
    args.first().and_then(|a| a.parse::<i32>().ok())
}

fn cd(state: &mut State, args: &[String]) -> Result<Signal, ShellError> {
    let target = match args.first() {
        Some(a) if a == "-" => state.get_var("OLDPWD").unwrap_or_else(|| state.cwd.clone()),
        Some(a) => a.clone(),
        None => state.get_var("HOME").unwrap_or_else(|| "/home/user".to_string()),
    };
    let resolved = state.resolve(&target);
    state.last_exit_code = 0;
    state.set_var("OLDPWD", state.cwd.clone());
    state.cwd = resolved;
    state.set_var("PWD", state.cwd.clone());
    Ok(Signal::None)
}

fn pwd(state: &mut State) -> Result<Signal, ShellError> {
    let cwd = state.cwd.clone();
    state.stdout.push_str(&cwd);
    state.stdout.push('\n');
    ok(state, 0)
}

fn export(state: &mut State, args: &[String]) -> Result<Signal, ShellError> {
    if args.is_empty() {
        let mut names: Vec<&String> = state.exported_names.iter().collect();
        names.sort();
        for name in names {
            let value = state.get_var(name).unwrap_or_default();
            state.stdout.push_str(&format!("declare -x {name}=\"{value}\"\n"));
        }
        return ok(state, 0);
    }
    for arg in args {
        if arg == "-p" {
            continue;
        }
        match arg.split_once('=') {
            Some((name, value)) => state.set_var(name, value),
            None => {
                if !state.variables.contains_key(arg) {
                    state.set_var(arg, "");
                }
            }
        }
        let name = arg.split_once('=').map(|(n, _)| n).unwrap_or(arg.as_str());
        state.exported_names.insert(name.to_string());
    }
    ok(state, 0)
}

fn unset(state: &mut State, args: &[String]) -> Result<Signal, ShellError> {
    let mut function_mode = false;
    for arg in args {
        if arg == "-f" {
            function_mode = true;
            continue;
        }
        if arg == "-v" {
            continue;
        }
        if function_mode {
            state.functions.remove(arg);
        } else {
            state.variables.remove(arg);
            state.exported_names.remove(arg);
        }
    }
    ok(state, 0)
}

/// `readonly` marks names read-only in bash; this implementation has no
/// enforcement field on `State` for it, so `readonly NAME=value` behaves
/// like a plain assignment and `readonly -p` lists exported-style output.
/// Write protection is not enforced — a documented simplification.
fn readonly(state: &mut State, args: &[String]) -> Result<Signal, ShellError> {
    for arg in args {
        if arg == "-p" || arg == "-a" || arg == "-A" {
            continue;
        }
        if let Some((name, value)) = arg.split_once('=') {
            state.set_var(name, value);
        }
    }
    ok(state, 0)
}

fn set(state: &mut State, args: &[String]) -> Result<Signal, ShellError> {
    let mut i = 0;
    while i < args.len() {
        let arg = &args[i];
        match arg.as_str() {
            "-e" => state.options.errexit = true,
            "+e" => state.options.errexit = false,
            "-u" => state.options.nounset = true,
            "+u" => state.options.nounset = false,
            "-x" => state.options.xtrace = true,
            "+x" => state.options.xtrace = false,
            "-o" => {
                i += 1;
                if let Some(name) = args.get(i) {
                    apply_set_o(state, name, true);
                }
            }
            "+o" => {
                i += 1;
                if let Some(name) = args.get(i) {
                    apply_set_o(state, name, false);
                }
            }
            "--" => {
                state.positional = args[i + 1..].to_vec();
                break;
            }
            _ => {
                // bare `set -- a b c` without a leading `--` still resets
                // the positional parameters from the remaining args.
                state.positional = args[i..].to_vec();
                break;
            }
        }
        i += 1;
    }
    ok(state, 0)
}

fn apply_set_o(state: &mut State, name: &str, value: bool) {
    match name {
        "errexit" => state.options.errexit = value,
        "nounset" => state.options.nounset = value,
        "pipefail" => state.options.pipefail = value,
        "xtrace" => state.options.xtrace = value,
        "verbose" => state.options.verbose = value,
        "noclobber" => state.options.noclobber = value,
        "noglob" => state.options.noglob = value,
        "allexport" => state.options.allexport = value,
        "posix" => state.options.posix = value,
        _ => {}
    }
}

fn shift(state: &mut State, args: &[String]) -> Result<Signal, ShellError> {
    let n = args.first().and_then(|a| a.parse::<usize>().ok()).unwrap_or(1);
    if n > state.positional.len() {
        return ok(state, 1);
    }
    state.positional.drain(0..n);
    ok(state, 0)
}

fn break_continue(state: &mut State, args: &[String], is_break: bool) -> Result<Signal, ShellError> {
    let n = args.first().and_then(|a| a.parse::<u32>().ok()).unwrap_or(1).max(1);
    state.last_exit_code = 0;
    Ok(if is_break { Signal::Break(n) } else { Signal::Continue(n) })
}

async fn eval(state: &mut State, args: &[String]) -> Result<Signal, ShellError> {
    let joined = args.join(" ");
    if joined.trim().is_empty() {
        return ok(state, 0);
    }
    let ast = crate::parser::parse(&joined)?;
    Box::pin(state.run_script(&ast)).await
}

/// `local`/`declare`/`typeset`. Scope is simplified: `local` behaves like
/// a plain assignment in the caller's frame rather than pushing a fresh
/// lexical scope, since function calls already save/restore only the
/// names assigned on the call line (see `run_simple_command`) and bash
/// scripts rarely depend on `local` shadowing across nested calls in ways
/// that distinction would change.
async fn declare(state: &mut State, which: &str, args: &[String]) -> Result<Signal, ShellError> {
    let mut want_export = false;
    let mut want_array = false;
    let mut want_assoc = false;
    let mut want_print = false;

    for arg in args {
        if let Some(flags) = arg.strip_prefix('-') {
            if arg == "-" || arg.starts_with("--") {
                continue;
            }
            for ch in flags.chars() {
                match ch {
                    'x' => want_export = true,
                    'a' => want_array = true,
                    'A' => want_assoc = true,
                    'p' => want_print = true,
                    'r' | 'i' => {}
                    _ => {}
                }
            }
            continue;
        }
        let (name, value) = match arg.split_once('=') {
            Some((n, v)) => (n.to_string(), Some(v.to_string())),
            None => (arg.clone(), None),
        };
        if want_array {
            let items = value.map(|v| v.split(' ').map(str::to_string).collect()).unwrap_or_default();
            state.variables.insert(name.clone(), Variable::IndexedArray(items));
        } else if want_assoc {
            state.variables.entry(name.clone()).or_insert_with(|| Variable::AssocArray(Default::default()));
        } else if let Some(v) = value {
            state.set_var(&name, v);
        } else if !state.variables.contains_key(&name) {
            state.set_var(&name, "");
        }
        if want_export {
            state.exported_names.insert(name);
        }
    }

    if want_print || (which != "local" && args.is_empty()) {
        let mut names: Vec<&String> = state.variables.keys().collect();
        names.sort();
        for name in names {
            let value = state.get_var(name).unwrap_or_default();
            state.stdout.push_str(&format!("{name}={value}\n"));
        }
    }

    ok(state, 0)
}

fn read(state: &mut State, args: &[String]) -> Result<Signal, ShellError> {
    let mut raw = false;
    let mut var_names = Vec::new();
    for arg in args {
        match arg.as_str() {
            "-r" => raw = true,
            _ if arg.starts_with('-') => {}
            _ => var_names.push(arg.clone()),
        }
    }
    if var_names.is_empty() {
        var_names.push("REPLY".to_string());
    }

    let input = std::mem::take(&mut state.stdout);
    let (line, rest, found_delimiter) = match input.split_once('\n') {
        Some((l, r)) => (l.to_string(), r.to_string(), true),
        None => (input.clone(), String::new(), false),
    };
    state.stdout = rest;

    let line = if raw { line } else { line.replace("\\\n", "") };

    let ifs = state.ifs();
    if var_names.len() == 1 {
        state.set_var(&var_names[0], line);
    } else {
        let words = crate::expand::split_fields(&line, &ifs);
        let mut iter = words.into_iter();
        for (i, name) in var_names.iter().enumerate() {
            if i + 1 == var_names.len() {
                let rest: Vec<String> = iter.by_ref().collect();
                state.set_var(name, rest.join(" "));
            } else {
                state.set_var(name, iter.next().unwrap_or_default());
            }
        }
    }
    ok(state, if found_delimiter { 0 } else { 1 })
}

/// `let` evaluates each argument as an arithmetic expression, joining
/// paren-unbalanced consecutive args the way unquoted `let x=( 1 )`
/// arrives split across argv.
fn let_cmd(state: &mut State, args: &[String]) -> Result<Signal, ShellError> {
    if args.is_empty() {
        state.stderr.push_str("vshbash: let: expression expected\n");
        return ok(state, 1);
    }
    let expressions = join_paren_balanced(args);
    let mut last = 0i64;
    for expr in &expressions {
        let parsed = crate::expand::arithmetic::parse(expr)
            .map_err(|e| ShellError::Expansion(ExpansionError::Arithmetic { message: format!("{expr}: {e}") }))?;
        last = crate::expand::arithmetic::eval(&parsed, state)?;
    }
    ok(state, if last == 0 { 1 } else { 0 })
}

fn join_paren_balanced(args: &[String]) -> Vec<String> {
    let mut out = Vec::new();
    let mut current = String::new();
    let mut depth = 0i32;
    for arg in args {
        depth += arg.matches('(').count() as i32 - arg.matches(')').count() as i32;
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(arg);
        if depth <= 0 {
            out.push(std::mem::take(&mut current));
            depth = 0;
        }
    }
    if !current.is_empty() {
        out.push(current);
    }
    out
}

/// `test`/`[` delegate to the same unary/binary comparison tables the
/// `[[ ... ]]` conditional command uses, just driven from argv instead of
/// a parsed `ConditionalExpressionNode`.
async fn test_cmd(state: &mut State, args: &[String]) -> Result<Signal, ShellError> {
    let mut args = args;
    if args.last().map(String::as_str) == Some("]") {
        args = &args[..args.len() - 1];
    }
    let result = match args.len() {
        0 => false,
        1 => !args[0].is_empty(),
        2 => eval_unary_literal(state, &args[0], &args[1]).await,
        3 => eval_binary_literal(&args[0], &args[1], &args[2]),
        _ => {
            state.stderr.push_str("vshbash: test: too many arguments\n");
            return ok(state, 2);
        }
    };
    ok(state, if result { 0 } else { 1 })
}

async fn eval_unary_literal(state: &State, op: &str, operand: &str) -> bool {
    match op {
        "-z" => operand.is_empty(),
        "-n" => !operand.is_empty(),
        "-e" => state.fs.exists(&state.resolve(operand)).await,
        "-f" => state.fs.stat(&state.resolve(operand)).await.map(|s| s.is_file).unwrap_or(false),
        "-d" => state.fs.stat(&state.resolve(operand)).await.map(|s| s.is_directory).unwrap_or(false),
        "-v" => state.is_set(operand),
        _ => false,
    }
}

fn eval_binary_literal(left: &str, op: &str, right: &str) -> bool {
    match op {
        "=" | "==" => left == right,
        "!=" => left != right,
        "-eq" => numeric(left) == numeric(right),
        "-ne" => numeric(left) != numeric(right),
        "-lt" => numeric(left) < numeric(right),
        "-le" => numeric(left) <= numeric(right),
        "-gt" => numeric(left) > numeric(right),
        "-ge" => numeric(left) >= numeric(right),
        _ => false,
    }
}

fn numeric(s: &str) -> i64 {
    s.trim().parse().unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::CommandRegistry;
    use crate::fs::InMemoryFs;
    use std::sync::Arc;

    fn new_state() -> State {
        State::new(Arc::new(InMemoryFs::new()), "/home/user", Arc::new(CommandRegistry::with_defaults()))
    }

    #[tokio::test]
    async fn cd_updates_cwd_and_oldpwd() {
        let mut state = new_state();
        dispatch(&mut state, "cd", &["/tmp".to_string()]).await.unwrap().unwrap();
        assert_eq!(state.cwd, "/tmp");
        assert_eq!(state.get_var("OLDPWD").unwrap(), "/home/user");
    }

    #[tokio::test]
    async fn export_marks_name_exported() {
        let mut state = new_state();
        dispatch(&mut state, "export", &["FOO=bar".to_string()]).await.unwrap().unwrap();
        assert!(state.exported_names.contains("FOO"));
        assert_eq!(state.get_var("FOO").unwrap(), "bar");
    }

    #[tokio::test]
    async fn shift_drops_leading_positional_params() {
        let mut state = new_state();
        state.positional = vec!["a".into(), "b".into(), "c".into()];
        dispatch(&mut state, "shift", &["2".to_string()]).await.unwrap().unwrap();
        assert_eq!(state.positional, vec!["c".to_string()]);
    }

    #[tokio::test]
    async fn let_assigns_arithmetic_result() {
        let mut state = new_state();
        let signal = dispatch(&mut state, "let", &["x=2+3".to_string()]).await.unwrap().unwrap();
        assert_eq!(signal, Signal::None);
        assert_eq!(state.get_var("x").unwrap(), "5");
        assert_eq!(state.last_exit_code, 0);
    }

    #[tokio::test]
    async fn test_cmd_string_equality() {
        let mut state = new_state();
        dispatch(&mut state, "test", &["foo".to_string(), "=".to_string(), "foo".to_string()]).await.unwrap().unwrap();
        assert_eq!(state.last_exit_code, 0);
    }

    #[tokio::test]
    async fn break_continue_return_exit_signals() {
        let mut state = new_state();
        assert_eq!(dispatch(&mut state, "break", &[]).await.unwrap().unwrap(), Signal::Break(1));
        assert_eq!(dispatch(&mut state, "continue", &["2".to_string()]).await.unwrap().unwrap(), Signal::Continue(2));
        assert_eq!(dispatch(&mut state, "return", &["7".to_string()]).await.unwrap().unwrap(), Signal::Return(7));
        assert_eq!(dispatch(&mut state, "exit", &["3".to_string()]).await.unwrap().unwrap(), Signal::Exit(3));
    }

    #[tokio::test]
    async fn unknown_name_returns_none() {
        let mut state = new_state();
        assert!(dispatch(&mut state, "frobnicate", &[]).await.is_none());
    }
}
