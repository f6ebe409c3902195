use super::{Command, CommandContext, CommandResult};
use crate::fs::RmOptions;
use async_trait::async_trait;

pub struct RmCommand;

#[async_trait]
impl Command for RmCommand {
    fn name(&self) -> &'static str {
        "rm"
    }

    async fn execute(&self, ctx: CommandContext) -> CommandResult {
        let mut recursive = false;
        let mut force = false;
        let mut targets = Vec::new();
        for arg in &ctx.args {
            if let Some(flags) = arg.strip_prefix('-').filter(|_| arg.starts_with('-') && arg != "-") {
                for c in flags.chars() {
                    match c {
                        'r' | 'R' => recursive = true,
                        'f' => force = true,
                        _ => {}
                    }
                }
            } else {
                targets.push(arg.clone());
            }
        }
        if targets.is_empty() && !force {
            return CommandResult::error("rm: missing operand\n".to_string());
        }
        let mut stderr = String::new();
        let mut exit_code = 0;
        for target in &targets {
            let path = ctx.fs.resolve_path(&ctx.cwd, target);
            if let Err(e) = ctx.fs.rm(&path, &RmOptions { recursive, force }).await {
                if !force {
                    stderr.push_str(&format!("rm: cannot remove '{target}': {e}\n"));
                    exit_code = 1;
                }
            }
        }
        CommandResult::with_exit_code(String::new(), stderr, exit_code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::{FileSystem, InMemoryFs};
    use std::collections::HashMap;
    use std::sync::Arc;

    #[tokio::test]
    async fn rm_deletes_file() {
        let fs = Arc::new(InMemoryFs::new());
        fs.write_file("/a.txt", b"x").await.unwrap();
        let ctx = CommandContext {
            args: vec!["/a.txt".to_string()],
            stdin: String::new(),
            cwd: "/".to_string(),
            env: HashMap::new(),
            fs: fs.clone(),
        };
        let r = RmCommand.execute(ctx).await;
        assert_eq!(r.exit_code, 0);
        assert!(!fs.exists("/a.txt").await);
    }

    #[tokio::test]
    async fn rm_missing_target_without_force_errors() {
        let ctx = CommandContext {
            args: vec!["/missing".to_string()],
            stdin: String::new(),
            cwd: "/".to_string(),
            env: HashMap::new(),
            fs: Arc::new(InMemoryFs::new()),
        };
        let r = RmCommand.execute(ctx).await;
        assert_eq!(r.exit_code, 1);
    }
}
