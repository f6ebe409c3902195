use super::{Command, CommandContext, CommandResult};
use async_trait::async_trait;

pub struct DirnameCommand;

#[async_trait]
impl Command for DirnameCommand {
    fn name(&self) -> &'static str {
        "dirname"
    }

    async fn execute(&self, ctx: CommandContext) -> CommandResult {
        let Some(path) = ctx.args.first() else {
            return CommandResult::error("dirname: missing operand\n".to_string());
        };
        let trimmed = path.trim_end_matches('/');
        let dir = match trimmed.rfind('/') {
            Some(0) => "/",
            Some(i) => &trimmed[..i],
            None => ".",
        };
        CommandResult::success(format!("{dir}\n"))
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
    async fn dirname_strips_basename() {
        let r = DirnameCommand.execute(ctx(vec!["/usr/bin/sort"])).await;
        assert_eq!(r.stdout, "/usr/bin\n");
    }

    #[tokio::test]
    async fn dirname_no_slash_returns_dot() {
        let r = DirnameCommand.execute(ctx(vec!["file.txt"])).await;
        assert_eq!(r.stdout, ".\n");
    }
}
