use super::{Command, CommandContext, CommandResult};
use async_trait::async_trait;

pub struct HeadCommand;

#[async_trait]
impl Command for HeadCommand {
    fn name(&self) -> &'static str {
        "head"
    }

    async fn execute(&self, ctx: CommandContext) -> CommandResult {
        let mut count = 10usize;
        let mut files = Vec::new();
        let mut i = 0;
        while i < ctx.args.len() {
            let arg = &ctx.args[i];
            if arg == "-n" && i + 1 < ctx.args.len() {
                i += 1;
                count = ctx.args[i].parse().unwrap_or(10);
            } else if let Some(n) = arg.strip_prefix("-n") {
                count = n.parse().unwrap_or(10);
            } else if let Some(n) = arg.strip_prefix('-').filter(|s| s.chars().all(|c| c.is_ascii_digit())) {
                count = n.parse().unwrap_or(10);
            } else if !arg.starts_with('-') {
                files.push(arg.clone());
            }
            i += 1;
        }

        let multi = files.len() > 1;
        let mut stdout = String::new();
        let mut stderr = String::new();
        let mut exit_code = 0;

        let sources: Vec<(String, String)> = if files.is_empty() {
            vec![(String::new(), ctx.stdin.clone())]
        } else {
            let mut out = Vec::new();
            for f in &files {
                let path = ctx.fs.resolve_path(&ctx.cwd, f);
                match ctx.fs.read_file(&path).await {
                    Ok(c) => out.push((f.clone(), c)),
                    Err(_) => {
                        stderr.push_str(&format!("head: cannot open '{f}' for reading: No such file or directory\n"));
                        exit_code = 1;
                    }
                }
            }
            out
        };

        for (name, content) in &sources {
            if multi {
                stdout.push_str(&format!("==> {name} <==\n"));
            }
            for line in content.split_inclusive('\n').take(count) {
                stdout.push_str(line);
            }
        }
        CommandResult::with_exit_code(stdout, stderr, exit_code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::InMemoryFs;
    use std::collections::HashMap;
    use std::sync::Arc;

    #[tokio::test]
    async fn head_default_ten_lines() {
        let content: String = (1..=15).map(|i| format!("{i}\n")).collect();
        let ctx = CommandContext {
            args: vec![],
            stdin: content,
            cwd: "/".to_string(),
            env: HashMap::new(),
            fs: Arc::new(InMemoryFs::new()),
        };
        let r = HeadCommand.execute(ctx).await;
        assert_eq!(r.stdout.lines().count(), 10);
    }

    #[tokio::test]
    async fn head_dash_n_flag() {
        let ctx = CommandContext {
            args: vec!["-n".to_string(), "2".to_string()],
            stdin: "a\nb\nc\n".to_string(),
            cwd: "/".to_string(),
            env: HashMap::new(),
            fs: Arc::new(InMemoryFs::new()),
        };
        let r = HeadCommand.execute(ctx).await;
        assert_eq!(r.stdout, "a\nb\n");
    }
}
