//! Shared `Command` trait and execution context for the peripheral command
//! set (`echo`, `cat`, `grep`, ...), separate from the builtins that must
//! mutate shell state directly (`cd`, `export`, `declare`, ...).

use crate::fs::FileSystem;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct CommandResult {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

impl CommandResult {
    pub fn success(stdout: String) -> Self {
        Self { stdout, stderr: String::new(), exit_code: 0 }
    }

    pub fn error(stderr: String) -> Self {
        Self { stdout: String::new(), stderr, exit_code: 1 }
    }

    pub fn with_exit_code(stdout: String, stderr: String, exit_code: i32) -> Self {
        Self { stdout, stderr, exit_code }
    }
}

pub struct CommandContext {
    pub args: Vec<String>,
    pub stdin: String,
    pub cwd: String,
    pub env: HashMap<String, String>,
    pub fs: Arc<dyn FileSystem>,
}

#[async_trait]
pub trait Command: Send + Sync {
    fn name(&self) -> &'static str;
    async fn execute(&self, ctx: CommandContext) -> CommandResult;
}
