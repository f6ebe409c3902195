use super::{Command, CommandContext, CommandResult};
use async_trait::async_trait;
use std::cmp::Ordering;

pub struct SortCommand;

#[async_trait]
impl Command for SortCommand {
    fn name(&self) -> &'static str {
        "sort"
    }

    async fn execute(&self, ctx: CommandContext) -> CommandResult {
        let mut reverse = false;
        let mut numeric = false;
        let mut unique = false;
        let mut files = Vec::new();
        for arg in &ctx.args {
            match arg.as_str() {
                "-r" | "--reverse" => reverse = true,
                "-n" | "--numeric-sort" => numeric = true,
                "-u" | "--unique" => unique = true,
                _ if !arg.starts_with('-') => files.push(arg.clone()),
                _ => {}
            }
        }

        let content = if files.is_empty() {
            ctx.stdin.clone()
        } else {
            let mut combined = String::new();
            for f in &files {
                let path = ctx.fs.resolve_path(&ctx.cwd, f);
                match ctx.fs.read_file(&path).await {
                    Ok(c) => combined.push_str(&c),
                    Err(_) => {
                        return CommandResult::with_exit_code(
                            String::new(),
                            format!("sort: cannot read: {f}: No such file or directory\n"),
                            2,
                        )
                    }
                }
            }
            combined
        };

        let had_trailing_nl = content.ends_with('\n');
        let mut lines: Vec<&str> = content.split('\n').collect();
        if had_trailing_nl {
            lines.pop();
        }

        if numeric {
            lines.sort_by(|a, b| {
                let na: f64 = a.trim().parse().unwrap_or(0.0);
                let nb: f64 = b.trim().parse().unwrap_or(0.0);
                na.partial_cmp(&nb).unwrap_or(Ordering::Equal)
            });
        } else {
            lines.sort();
        }
        if reverse {
            lines.reverse();
        }
        if unique {
            lines.dedup();
        }

        let mut stdout = lines.join("\n");
        if !lines.is_empty() {
            stdout.push('\n');
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
    async fn sort_lexicographic() {
        let r = SortCommand.execute(ctx(vec![], "banana\napple\ncherry\n")).await;
        assert_eq!(r.stdout, "apple\nbanana\ncherry\n");
    }

    #[tokio::test]
    async fn sort_numeric() {
        let r = SortCommand.execute(ctx(vec!["-n"], "10\n2\n1\n")).await;
        assert_eq!(r.stdout, "1\n2\n10\n");
    }

    #[tokio::test]
    async fn sort_unique_dedupes_adjacent() {
        let r = SortCommand.execute(ctx(vec!["-u"], "a\na\nb\n")).await;
        assert_eq!(r.stdout, "a\nb\n");
    }
}
