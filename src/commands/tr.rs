use super::{Command, CommandContext, CommandResult};
use async_trait::async_trait;

pub struct TrCommand;

fn expand_set(spec: &str) -> Vec<char> {
    let chars: Vec<char> = spec.chars().collect();
    let mut out = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        if i + 2 < chars.len() && chars[i + 1] == '-' {
            let (start, end) = (chars[i] as u32, chars[i + 2] as u32);
            if start <= end {
                for c in start..=end {
                    if let Some(ch) = char::from_u32(c) {
                        out.push(ch);
                    }
                }
            }
            i += 3;
        } else {
            out.push(chars[i]);
            i += 1;
        }
    }
    out
}

#[async_trait]
impl Command for TrCommand {
    fn name(&self) -> &'static str {
        "tr"
    }

    async fn execute(&self, ctx: CommandContext) -> CommandResult {
        let mut delete = false;
        let mut squeeze = false;
        let mut positional = Vec::new();
        for arg in &ctx.args {
            match arg.as_str() {
                "-d" | "--delete" => delete = true,
                "-s" | "--squeeze-repeats" => squeeze = true,
                _ => positional.push(arg.clone()),
            }
        }

        if positional.is_empty() {
            return CommandResult::error("tr: missing operand\n".to_string());
        }
        let set1 = expand_set(&positional[0]);
        let set2 = positional.get(1).map(|s| expand_set(s));

        let mut out = String::new();
        let mut last: Option<char> = None;
        for c in ctx.stdin.chars() {
            if delete && set1.contains(&c) {
                continue;
            }
            let mapped = if !delete {
                match set1.iter().position(|&s| s == c) {
                    Some(idx) => match &set2 {
                        Some(s2) if !s2.is_empty() => *s2.get(idx).unwrap_or_else(|| s2.last().unwrap()),
                        _ => c,
                    },
                    None => c,
                }
            } else {
                c
            };
            if squeeze && last == Some(mapped) && (set2.as_ref().map(|s| s.contains(&mapped)).unwrap_or(set1.contains(&mapped))) {
                continue;
            }
            out.push(mapped);
            last = Some(mapped);
        }
        CommandResult::success(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::InMemoryFs;
    use std::collections::HashMap;
    use std::sync::Arc;

    fn ctx(args: Vec<&str>, stdin: &str) -> CommandContext {
        CommandContext {
            args: args.into_iter().map(String::from).collect(),
            stdin: stdin.to_string(),
            cwd: "/".to_string(),
            env: HashMap::new(),
            fs: Arc::new(InMemoryFs::new()),
        }
    }

    #[tokio::test]
    async fn tr_translates_characters() {
        let r = TrCommand.execute(ctx(vec!["a-z", "A-Z"], "hello\n")).await;
        assert_eq!(r.stdout, "HELLO\n");
    }

    #[tokio::test]
    async fn tr_deletes_characters() {
        let r = TrCommand.execute(ctx(vec!["-d", "l"], "hello\n")).await;
        assert_eq!(r.stdout, "heo\n");
    }
}
