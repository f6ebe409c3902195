use super::{Command, CommandContext, CommandResult};
use async_trait::async_trait;

pub struct UniqCommand;

#[async_trait]
impl Command for UniqCommand {
    fn name(&self) -> &'static str {
        "uniq"
    }

    async fn execute(&self, ctx: CommandContext) -> CommandResult {
        let mut count = false;
        let mut dup_only = false;
        let mut uniq_only = false;
        let mut files = Vec::new();
        for arg in &ctx.args {
            match arg.as_str() {
                "-c" | "--count" => count = true,
                "-d" | "--repeated" => dup_only = true,
                "-u" | "--unique" => uniq_only = true,
                _ if !arg.starts_with('-') => files.push(arg.clone()),
                _ => {}
            }
        }

        let content = if files.is_empty() {
            ctx.stdin.clone()
        } else {
            let path = ctx.fs.resolve_path(&ctx.cwd, &files[0]);
            match ctx.fs.read_file(&path).await {
                Ok(c) => c,
                Err(_) => {
                    return CommandResult::with_exit_code(String::new(), format!("uniq: {}: No such file or directory\n", files[0]), 1)
                }
            }
        };

        let mut stdout = String::new();
        let mut prev: Option<&str> = None;
        let mut run_count = 0usize;
        let mut flush = |prev: &str, n: usize, stdout: &mut String| {
            if (dup_only && n < 2) || (uniq_only && n > 1) {
                return;
            }
            if count {
                stdout.push_str(&format!("{n:>7} {prev}\n"));
            } else {
                stdout.push_str(prev);
                stdout.push('\n');
            }
        };

        for line in content.lines() {
            match prev {
                Some(p) if p == line => run_count += 1,
                Some(p) => {
                    flush(p, run_count, &mut stdout);
                    prev = Some(line);
                    run_count = 1;
                }
                None => {
                    prev = Some(line);
                    run_count = 1;
                }
            }
        }
        if let Some(p) = prev {
            flush(p, run_count, &mut stdout);
        }
        CommandResult::success(stdout)
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
    async fn uniq_collapses_adjacent_duplicates() {
        let r = UniqCommand.execute(ctx(vec![], "a\na\nb\nb\nb\nc\n")).await;
        assert_eq!(r.stdout, "a\nb\nc\n");
    }

    #[tokio::test]
    async fn uniq_dash_c_counts_occurrences() {
        let r = UniqCommand.execute(ctx(vec!["-c"], "a\na\nb\n")).await;
        assert_eq!(r.stdout, "      2 a\n      1 b\n");
    }
}
