use super::registry::CommandRegistry;
use super::{Command, CommandContext, CommandResult};
use async_trait::async_trait;

/// Builds argument lists from stdin and invokes another registered command
/// directly. Unlike a real `xargs`, this never re-enters the shell parser —
/// the target must be one of the peripheral commands already in the
/// registry, not an arbitrary pipeline.
pub struct XargsCommand;

#[async_trait]
impl Command for XargsCommand {
    fn name(&self) -> &'static str {
        "xargs"
    }

    async fn execute(&self, ctx: CommandContext) -> CommandResult {
        if ctx.args.is_empty() {
            return CommandResult::error("xargs: missing command\n".to_string());
        }
        let target_name = &ctx.args[0];
        let fixed_args = &ctx.args[1..];
        let stdin_args: Vec<String> = ctx
            .stdin
            .split_whitespace()
            .map(String::from)
            .collect();

        let registry = CommandRegistry::with_defaults();
        let Some(cmd) = registry.get(target_name) else {
            return CommandResult::error(format!("xargs: {target_name}: No such command\n"));
        };

        let mut args = fixed_args.to_vec();
        args.extend(stdin_args);

        let sub_ctx = CommandContext {
            args,
            stdin: String::new(),
            cwd: ctx.cwd,
            env: ctx.env,
            fs: ctx.fs,
        };
        cmd.execute(sub_ctx).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::InMemoryFs;
    use std::collections::HashMap;
    use std::sync::Arc;

    #[tokio::test]
    async fn xargs_passes_stdin_words_as_args() {
        let ctx = CommandContext {
            args: vec!["echo".to_string()],
            stdin: "a b c".to_string(),
            cwd: "/".to_string(),
            env: HashMap::new(),
            fs: Arc::new(InMemoryFs::new()),
        };
        let r = XargsCommand.execute(ctx).await;
        assert_eq!(r.stdout, "a b c\n");
    }

    #[tokio::test]
    async fn xargs_unknown_command_errors() {
        let ctx = CommandContext {
            args: vec!["nope".to_string()],
            stdin: String::new(),
            cwd: "/".to_string(),
            env: HashMap::new(),
            fs: Arc::new(InMemoryFs::new()),
        };
        let r = XargsCommand.execute(ctx).await;
        assert_eq!(r.exit_code, 1);
    }
}
