use super::{Command, CommandContext, CommandResult};
use async_trait::async_trait;

pub struct ReadlinkCommand;

#[async_trait]
impl Command for ReadlinkCommand {
    fn name(&self) -> &'static str {
        "readlink"
    }

    async fn execute(&self, ctx: CommandContext) -> CommandResult {
        let mut canonicalize = false;
        let mut files = Vec::new();
        for arg in &ctx.args {
            match arg.as_str() {
                "-f" | "--canonicalize" => canonicalize = true,
                _ => files.push(arg.clone()),
            }
        }
        let Some(file) = files.first() else {
            return CommandResult::error("readlink: missing operand\n".to_string());
        };
        let path = ctx.fs.resolve_path(&ctx.cwd, file);
        if canonicalize {
            match ctx.fs.realpath(&path).await {
                Ok(resolved) => CommandResult::success(format!("{resolved}\n")),
                Err(e) => CommandResult::error(format!("readlink: {file}: {e}\n")),
            }
        } else {
            match ctx.fs.readlink(&path).await {
                Ok(target) => CommandResult::success(format!("{target}\n")),
                Err(e) => CommandResult::error(format!("readlink: {file}: {e}\n")),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::{FileSystem, InMemoryFs};
    use std::collections::HashMap;
    use std::sync::Arc;

    #[tokio::test]
    async fn readlink_missing_operand_errors() {
        let fs = Arc::new(InMemoryFs::new());
        let ctx = CommandContext {
            args: vec![],
            stdin: String::new(),
            cwd: "/".to_string(),
            env: HashMap::new(),
            fs,
        };
        let r = ReadlinkCommand.execute(ctx).await;
        assert_eq!(r.exit_code, 1);
    }

    #[tokio::test]
    async fn readlink_resolves_symlink() {
        let fs = Arc::new(InMemoryFs::new());
        fs.write_file("/target.txt", b"hi").await.unwrap();
        fs.symlink("/target.txt", "/link.txt").await.unwrap();
        let ctx = CommandContext {
            args: vec!["/link.txt".to_string()],
            stdin: String::new(),
            cwd: "/".to_string(),
            env: HashMap::new(),
            fs: fs.clone(),
        };
        let r = ReadlinkCommand.execute(ctx).await;
        assert_eq!(r.exit_code, 0);
        assert_eq!(r.stdout.trim(), "/target.txt");
    }
}
