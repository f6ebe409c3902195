use super::{Command, CommandContext, CommandResult};
use async_trait::async_trait;
use std::time::SystemTime;

pub struct TouchCommand;

#[async_trait]
impl Command for TouchCommand {
    fn name(&self) -> &'static str {
        "touch"
    }

    async fn execute(&self, ctx: CommandContext) -> CommandResult {
        let files: Vec<&String> = ctx.args.iter().filter(|a| !a.starts_with('-')).collect();
        if files.is_empty() {
            return CommandResult::error("touch: missing file operand\n".to_string());
        }
        let mut stderr = String::new();
        let mut exit_code = 0;
        for file in files {
            let path = ctx.fs.resolve_path(&ctx.cwd, file);
            if ctx.fs.exists(&path).await {
                if let Err(e) = ctx.fs.utimes(&path, SystemTime::now()).await {
                    stderr.push_str(&format!("touch: cannot touch '{file}': {e}\n"));
                    exit_code = 1;
                }
            } else if let Err(e) = ctx.fs.write_file(&path, b"").await {
                stderr.push_str(&format!("touch: cannot touch '{file}': {e}\n"));
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
    async fn touch_creates_empty_file() {
        let fs = Arc::new(InMemoryFs::new());
        let ctx = CommandContext {
            args: vec!["/new.txt".to_string()],
            stdin: String::new(),
            cwd: "/".to_string(),
            env: HashMap::new(),
            fs: fs.clone(),
        };
        let r = TouchCommand.execute(ctx).await;
        assert_eq!(r.exit_code, 0);
        assert!(fs.exists("/new.txt").await);
    }
}
