use super::{Command, CommandContext, CommandResult};
use async_trait::async_trait;

pub struct MvCommand;

#[async_trait]
impl Command for MvCommand {
    fn name(&self) -> &'static str {
        "mv"
    }

    async fn execute(&self, ctx: CommandContext) -> CommandResult {
        let positional: Vec<&String> = ctx.args.iter().filter(|a| !a.starts_with('-')).collect();
        if positional.len() < 2 {
            return CommandResult::error("mv: missing file operand\n".to_string());
        }
        let dest = positional.last().unwrap();
        let dest_path = ctx.fs.resolve_path(&ctx.cwd, dest);
        let sources = &positional[..positional.len() - 1];
        let mut stderr = String::new();
        let mut exit_code = 0;
        for src in sources {
            let src_path = ctx.fs.resolve_path(&ctx.cwd, src);
            let target = if sources.len() > 1 {
                format!("{}/{}", dest_path.trim_end_matches('/'), src.rsplit('/').next().unwrap_or(src))
            } else {
                dest_path.clone()
            };
            if let Err(e) = ctx.fs.mv(&src_path, &target).await {
                stderr.push_str(&format!("mv: cannot move '{src}': {e}\n"));
                exit_code = 1;
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
    async fn mv_renames_file() {
        let fs = Arc::new(InMemoryFs::new());
        fs.write_file("/a.txt", b"hi").await.unwrap();
        let ctx = CommandContext {
            args: vec!["/a.txt".to_string(), "/b.txt".to_string()],
            stdin: String::new(),
            cwd: "/".to_string(),
            env: HashMap::new(),
            fs: fs.clone(),
        };
        let r = MvCommand.execute(ctx).await;
        assert_eq!(r.exit_code, 0);
        assert!(!fs.exists("/a.txt").await);
        assert!(fs.exists("/b.txt").await);
    }
}
