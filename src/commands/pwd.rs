use super::{Command, CommandContext, CommandResult};
use async_trait::async_trait;

pub struct PwdCommand;

#[async_trait]
impl Command for PwdCommand {
    fn name(&self) -> &'static str {
        "pwd"
    }

    async fn execute(&self, ctx: CommandContext) -> CommandResult {
        CommandResult::success(format!("{}\n", ctx.cwd))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::InMemoryFs;
    use std::collections::HashMap;
    use std::sync::Arc;

    #[tokio::test]
    async fn pwd_prints_cwd() {
        let ctx = CommandContext {
            args: vec![],
            stdin: String::new(),
            cwd: "/home/user".to_string(),
            env: HashMap::new(),
            fs: Arc::new(InMemoryFs::new()),
        };
        let r = PwdCommand.execute(ctx).await;
        assert_eq!(r.stdout, "/home/user\n");
    }
}
