use super::{Command, CommandContext, CommandResult};
use crate::fs::MkdirOptions;
use async_trait::async_trait;

pub struct MkdirCommand;

#[async_trait]
impl Command for MkdirCommand {
    fn name(&self) -> &'static str {
        "mkdir"
    }

    async fn execute(&self, ctx: CommandContext) -> CommandResult {
        let mut recursive = false;
        let mut dirs = Vec::new();
        for arg in &ctx.args {
            match arg.as_str() {
                "-p" | "--parents" => recursive = true,
                _ if !arg.starts_with('-') => dirs.push(arg.clone()),
                _ => {}
            }
        }
        if dirs.is_empty() {
            return CommandResult::error("mkdir: missing operand\n".to_string());
        }
        let mut stderr = String::new();
        let mut exit_code = 0;
        for dir in &dirs {
            let path = ctx.fs.resolve_path(&ctx.cwd, dir);
            if let Err(e) = ctx.fs.mkdir(&path, &MkdirOptions { recursive }).await {
                stderr.push_str(&format!("mkdir: cannot create directory '{dir}': {e}\n"));
                exit_code = 1;
            }
        }
        CommandResult::with_exit_code(String::new(), stderr, exit_code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::InMemoryFs;
    use crate::fs::types::FileSystem;
    use std::collections::HashMap;
    use std::sync::Arc;

    #[tokio::test]
    async fn mkdir_creates_directory() {
        let fs = Arc::new(InMemoryFs::new());
        let ctx = CommandContext {
            args: vec!["/d".to_string()],
            stdin: String::new(),
            cwd: "/".to_string(),
            env: HashMap::new(),
            fs: fs.clone(),
        };
        let r = MkdirCommand.execute(ctx).await;
        assert_eq!(r.exit_code, 0);
        assert!(fs.exists("/d").await);
    }

    #[tokio::test]
    async fn mkdir_dash_p_creates_parents() {
        let fs = Arc::new(InMemoryFs::new());
        let ctx = CommandContext {
            args: vec!["-p".to_string(), "/a/b/c".to_string()],
            stdin: String::new(),
            cwd: "/".to_string(),
            env: HashMap::new(),
            fs: fs.clone(),
        };
        let r = MkdirCommand.execute(ctx).await;
        assert_eq!(r.exit_code, 0);
        assert!(fs.exists("/a/b/c").await);
    }
}
