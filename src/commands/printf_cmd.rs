use super::{Command, CommandContext, CommandResult};
use async_trait::async_trait;

pub struct PrintfCommand;

#[async_trait]
impl Command for PrintfCommand {
    fn name(&self) -> &'static str {
        "printf"
    }

    async fn execute(&self, ctx: CommandContext) -> CommandResult {
        let Some(fmt) = ctx.args.first() else {
            return CommandResult::error("printf: usage: printf format [arguments]\n".to_string());
        };
        let args = &ctx.args[1..];
        let out = format_printf(fmt, args);
        CommandResult::success(out)
    }
}

fn format_printf(fmt: &str, args: &[String]) -> String {
    let mut out = String::new();
    let mut arg_idx = 0;
    let mut chars = fmt.chars().peekable();
    let consumes_arg = fmt.contains('%');
    loop {
        while let Some(c) = chars.next() {
            if c == '\\' {
                match chars.next() {
                    Some('n') => out.push('\n'),
                    Some('t') => out.push('\t'),
                    Some('r') => out.push('\r'),
                    Some('\\') => out.push('\\'),
                    Some(other) => {
                        out.push('\\');
                        out.push(other);
                    }
                    None => out.push('\\'),
                }
            } else if c == '%' {
                match chars.next() {
                    Some('%') => out.push('%'),
                    Some('s') => {
                        out.push_str(args.get(arg_idx).map(String::as_str).unwrap_or(""));
                        arg_idx += 1;
                    }
                    Some('d') | Some('i') => {
                        let v = args
                            .get(arg_idx)
                            .and_then(|a| a.parse::<i64>().ok())
                            .unwrap_or(0);
                        out.push_str(&v.to_string());
                        arg_idx += 1;
                    }
                    Some('f') => {
                        let v = args
                            .get(arg_idx)
                            .and_then(|a| a.parse::<f64>().ok())
                            .unwrap_or(0.0);
                        out.push_str(&format!("{v:.6}"));
                        arg_idx += 1;
                    }
                    Some(other) => {
                        out.push('%');
                        out.push(other);
                    }
                    None => out.push('%'),
                }
            } else {
                out.push(c);
            }
        }
        if !consumes_arg || arg_idx >= args.len() {
            break;
        }
        chars = fmt.chars().peekable();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::InMemoryFs;
    use std::collections::HashMap;
    use std::sync::Arc;

    fn ctx(args: Vec<&str>) -> CommandContext {
        CommandContext {
            args: args.into_iter().map(String::from).collect(),
            stdin: String::new(),
            cwd: "/".to_string(),
            env: HashMap::new(),
            fs: Arc::new(InMemoryFs::new()),
        }
    }

    #[tokio::test]
    async fn printf_substitutes_string() {
        let r = PrintfCommand.execute(ctx(vec!["hello %s\\n", "world"])).await;
        assert_eq!(r.stdout, "hello world\n");
    }

    #[tokio::test]
    async fn printf_repeats_format_for_extra_args() {
        let r = PrintfCommand
            .execute(ctx(vec!["%s\\n", "a", "b"]))
            .await;
        assert_eq!(r.stdout, "a\nb\n");
    }
}
