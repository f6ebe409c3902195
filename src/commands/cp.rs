use super::{Command, CommandContext, CommandResult};
use crate::fs::CpOptions;
use async_trait::async_trait;

pub struct CpCommand;

#[async_trait]
impl Command for CpCommand {
    fn name(&self) -> &'static str {
        "cp"
    }

    async fn execute(&self, ctx: CommandContext) -> CommandResult {
        let mut recursive = false;
        let mut positional = Vec::new();
        for arg in &ctx.args {
            match arg.as_str() {
                "-r" | "-R" | "--recursive" => recursive = true,
                _ if !arg.starts_with('-') => positional.push(arg.clone()),
                _ => {}
            }
        }
        if positional.len() < 2 {
            return CommandResult::error("cp: missing file operand\n".to_string());
        }
        let dest = positional.pop().unwrap();
        let dest_path = ctx.fs.resolve_path(&ctx.cwd, &dest);
        let mut stderr = String::new();
        let mut exit_code = 0;
        for src in &positional {
            let src_path = ctx.fs.resolve_path(&ctx.cwd, src);
            let target = if positional.len() > 1 {
                format!("{}/{}", dest_path.trim_end_matches('/'), src.rsplit('/').next().unwrap_or(src))
            } else {
                dest_path.clone()
            };
            if let Err(e) = ctx.fs.cp(&src_path, &target, &CpOptions { recursive }).await {
                stderr.push_str(&format!("cp: cannot copy '{src}': {e}\n"));
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
    async fn cp_copies_file() {
        let fs = Arc::new(InMemoryFs::new());
        fs.write_file("/a.txt", b"hi").await.unwrap();
        let ctx = CommandContext {
            args: vec!["/a.txt".to_string(), "/b.txt".to_string()],
            stdin: String::new(),
            cwd: "/".to_string(),
            env: HashMap::new(),
            fs: fs.clone(),
        };
        let r = CpCommand.execute(ctx).await;
        assert_eq!(r.exit_code, 0);
        assert_eq!(fs.read_file("/b.txt").await.unwrap(), "hi");
    }
}
