use super::{Command, CommandContext, CommandResult};
use async_trait::async_trait;

pub struct EchoCommand;

#[async_trait]
impl Command for EchoCommand {
    fn name(&self) -> &'static str {
        "echo"
    }

    async fn execute(&self, ctx: CommandContext) -> CommandResult {
        let args = &ctx.args;
        let mut no_newline = false;
        let mut interpret_escapes = false;
        let mut start = 0;

        while start < args.len() {
            match args[start].as_str() {
                "-n" => {
                    no_newline = true;
                    start += 1;
                }
                "-e" => {
                    interpret_escapes = true;
                    start += 1;
                }
                "-E" => {
                    interpret_escapes = false;
                    start += 1;
                }
                "-ne" | "-en" => {
                    no_newline = true;
                    interpret_escapes = true;
                    start += 1;
                }
                _ => break,
            }
        }

        let mut output = args[start..].join(" ");
        if interpret_escapes {
            let (text, stop) = process_escapes(&output);
            output = text;
            if stop {
                return CommandResult::success(output);
            }
        }
        if !no_newline {
            output.push('\n');
        }
        CommandResult::success(output)
    }
}

fn process_escapes(input: &str) -> (String, bool) {
    let chars: Vec<char> = input.chars().collect();
    let mut result = String::new();
    let mut i = 0;
    while i < chars.len() {
        if chars[i] != '\\' || i + 1 >= chars.len() {
            result.push(chars[i]);
            i += 1;
            continue;
        }
        match chars[i + 1] {
            '\\' => {
                result.push('\\');
                i += 2;
            }
            'n' => {
                result.push('\n');
                i += 2;
            }
            't' => {
                result.push('\t');
                i += 2;
            }
            'r' => {
                result.push('\r');
                i += 2;
            }
            'a' => {
                result.push('\x07');
                i += 2;
            }
            'c' => return (result, true),
            'x' => {
                let mut hex = String::new();
                let mut j = i + 2;
                while j < chars.len() && hex.len() < 2 && chars[j].is_ascii_hexdigit() {
                    hex.push(chars[j]);
                    j += 1;
                }
                if hex.is_empty() {
                    result.push_str("\\x");
                    i += 2;
                } else {
                    if let Some(c) = u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32) {
                        result.push(c);
                    }
                    i = j;
                }
            }
            other => {
                result.push('\\');
                result.push(other);
                i += 2;
            }
        }
    }
    (result, false)
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
    async fn echo_joins_args_with_space() {
        let r = EchoCommand.execute(ctx(vec!["a", "b"])).await;
        assert_eq!(r.stdout, "a b\n");
    }

    #[tokio::test]
    async fn echo_dash_n_suppresses_newline() {
        let r = EchoCommand.execute(ctx(vec!["-n", "hi"])).await;
        assert_eq!(r.stdout, "hi");
    }

    #[tokio::test]
    async fn echo_dash_e_interprets_escapes() {
        let r = EchoCommand.execute(ctx(vec!["-e", "a\\tb"])).await;
        assert_eq!(r.stdout, "a\tb\n");
    }
}
