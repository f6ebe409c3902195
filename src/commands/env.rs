use super::{Command, CommandContext, CommandResult};
use async_trait::async_trait;

pub struct EnvCommand;

#[async_trait]
impl Command for EnvCommand {
    fn name(&self) -> &'static str {
        "env"
    }

    async fn execute(&self, ctx: CommandContext) -> CommandResult {
        let mut pairs: Vec<(&String, &String)> = ctx.env.iter().collect();
        pairs.sort_by(|a, b| a.0.cmp(b.0));
        let mut out = String::new();
        for (k, v) in pairs {
            out.push_str(&format!("{k}={v}\n"));
        }
        CommandResult::success(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::InMemoryFs;
    use std::collections::HashMap;
    use std::sync::Arc;

    #[tokio::test]
    async fn env_prints_sorted_pairs() {
        let mut env = HashMap::new();
        env.insert("B".to_string(), "2".to_string());
        env.insert("A".to_string(), "1".to_string());
        let ctx = CommandContext {
            args: vec![],
            stdin: String::new(),
            cwd: "/".to_string(),
            env,
            fs: Arc::new(InMemoryFs::new()),
        };
        let r = EnvCommand.execute(ctx).await;
        assert_eq!(r.stdout, "A=1\nB=2\n");
    }
}
