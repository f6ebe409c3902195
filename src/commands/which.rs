use super::{Command, CommandContext, CommandResult};
use async_trait::async_trait;

pub struct WhichCommand;

#[async_trait]
impl Command for WhichCommand {
    fn name(&self) -> &'static str {
        "which"
    }

    async fn execute(&self, ctx: CommandContext) -> CommandResult {
        if ctx.args.is_empty() {
            return CommandResult::error("which: missing operand\n".to_string());
        }
        let mut out = String::new();
        let mut exit_code = 0;
        for name in &ctx.args {
            if BUILTIN_NAMES.contains(&name.as_str()) {
                out.push_str(&format!("{name}: shell builtin\n"));
            } else {
                out.push_str(&format!("{name} not found\n"));
                exit_code = 1;
            }
        }
        CommandResult::with_exit_code(out, String::new(), exit_code)
    }
}

const BUILTIN_NAMES: &[&str] = &[
    ":", "true", "false", "cd", "pwd", "export", "unset", "readonly", "set", "shift", "break",
    "continue", "return", "exit", "eval", "local", "declare", "read", "let", "test", "[",
];

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::InMemoryFs;
    use std::collections::HashMap;
    use std::sync::Arc;

    #[tokio::test]
    async fn which_reports_builtin() {
        let ctx = CommandContext {
            args: vec!["cd".to_string()],
            stdin: String::new(),
            cwd: "/".to_string(),
            env: HashMap::new(),
            fs: Arc::new(InMemoryFs::new()),
        };
        let r = WhichCommand.execute(ctx).await;
        assert_eq!(r.exit_code, 0);
        assert!(r.stdout.contains("shell builtin"));
    }

    #[tokio::test]
    async fn which_reports_not_found() {
        let ctx = CommandContext {
            args: vec!["nope".to_string()],
            stdin: String::new(),
            cwd: "/".to_string(),
            env: HashMap::new(),
            fs: Arc::new(InMemoryFs::new()),
        };
        let r = WhichCommand.execute(ctx).await;
        assert_eq!(r.exit_code, 1);
    }
}
