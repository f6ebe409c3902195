use super::{Command, CommandContext, CommandResult};
use async_trait::async_trait;

pub struct BasenameCommand;

#[async_trait]
impl Command for BasenameCommand {
    fn name(&self) -> &'static str {
        "basename"
    }

    async fn execute(&self, ctx: CommandContext) -> CommandResult {
        let Some(path) = ctx.args.first() else {
            return CommandResult::error("basename: missing operand\n".to_string());
        };
        let suffix = ctx.args.get(1);
        let trimmed = path.trim_end_matches('/');
        let mut base = trimmed.rsplit('/').next().unwrap_or(trimmed).to_string();
        if base.is_empty() {
            base = "/".to_string();
        }
        if let Some(suf) = suffix {
            if base != *suf {
                base = base.strip_suffix(suf.as_str()).unwrap_or(&base).to_string();
            }
        }
        CommandResult::success(format!("{base}\n"))
    }
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
    async fn basename_strips_directory() {
        let r = BasenameCommand.execute(ctx(vec!["/usr/bin/sort"])).await;
        assert_eq!(r.stdout, "sort\n");
    }

    #[tokio::test]
    async fn basename_strips_suffix() {
        let r = BasenameCommand.execute(ctx(vec!["/a/b/file.txt", ".txt"])).await;
        assert_eq!(r.stdout, "file\n");
    }
}
