//! Shell environment: ties the lexer/parser, executor, virtual filesystem
//! and command registry together behind the public embedding API. Adapted
//! from the teacher's `bash::Bash`/`BashOptions`, renamed to match the
//! `Shell`/`ShellOptions` naming the embedding API specifies.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::commands::CommandRegistry;
use crate::exec::{Signal, State};
use crate::fs::{FileSystem, FsError, InMemoryFs, InitialFiles, MkdirOptions};
use crate::transform::{Metadata, TransformPipeline, TransformResult};

/// Options for creating a shell environment.
#[derive(Default)]
pub struct ShellOptions {
    /// Initial files to seed the virtual filesystem with.
    pub files: Option<InitialFiles>,
    /// Working directory.
    pub cwd: Option<String>,
    /// Environment variables.
    pub env: Option<HashMap<String, String>>,
    /// File system instance (defaults to `InMemoryFs`).
    pub fs: Option<Arc<dyn FileSystem>>,
    /// PID surrogate returned by `$$` (default 1).
    pub pid: Option<i32>,
}

/// Per-execution options.
#[derive(Default)]
pub struct ExecOptions {
    /// Temporary environment variables for this execution only.
    pub env: Option<HashMap<String, String>>,
    /// Maximum wall-clock time before the run is cancelled (`exit_code = 130`).
    pub timeout: Option<Duration>,
}

#[derive(Debug, Clone, Default)]
pub struct ExecResult {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
    pub env: HashMap<String, String>,
}

pub struct Shell {
    pub fs: Arc<dyn FileSystem>,
    state: State,
    transforms: TransformPipeline,
}

impl Shell {
    pub async fn new(options: ShellOptions) -> Self {
        let use_default_layout = options.cwd.is_none();
        let cwd = options.cwd.unwrap_or_else(|| "/home/user".to_string());

        let fs: Arc<dyn FileSystem> = options.fs.unwrap_or_else(|| {
            Arc::new(match &options.files {
                Some(files) => InMemoryFs::with_files(files),
                None => InMemoryFs::new(),
            })
        });

        let mut env = HashMap::new();
        env.insert("HOME".to_string(), if use_default_layout { "/home/user" } else { "/" }.to_string());
        env.insert("PATH".to_string(), "/usr/bin:/bin".to_string());
        env.insert("IFS".to_string(), " \t\n".to_string());
        env.insert("OSTYPE".to_string(), "linux-gnu".to_string());
        env.insert("PWD".to_string(), cwd.clone());
        env.insert("OLDPWD".to_string(), cwd.clone());

        let mut exported: HashSet<String> = ["HOME", "PATH", "PWD", "OLDPWD"].into_iter().map(String::from).collect();
        if let Some(user_env) = options.env {
            for (k, v) in user_env {
                exported.insert(k.clone());
                env.insert(k, v);
            }
        }

        init_filesystem(&*fs, use_default_layout).await;
        let _ = fs.mkdir(&cwd, &MkdirOptions { recursive: true }).await;

        let registry = Arc::new(CommandRegistry::with_defaults());
        let mut state = State::new(fs.clone(), cwd, registry);
        for (k, v) in env {
            state.set_var(&k, v);
        }
        state.exported_names = exported;
        state.pid = options.pid.unwrap_or(1);

        Self { fs, state, transforms: TransformPipeline::new() }
    }

    /// Installs or overrides a peripheral command.
    pub fn register_command(&mut self, cmd: Box<dyn crate::commands::Command>) {
        let registry = Arc::get_mut(&mut self.state.registry)
            .expect("register_command called while a script is executing");
        registry.register(cmd);
    }

    /// Installs a transform applied before every subsequent `exec`.
    pub fn register_transform_plugin(
        &mut self,
        plugin: impl Fn(&crate::ast::ScriptNode, &Metadata) -> (crate::ast::ScriptNode, Metadata) + Send + Sync + 'static,
    ) {
        self.transforms.register(plugin);
    }

    /// Parses, transforms and serializes a script without executing it.
    pub fn transform(&self, script: &str) -> Result<TransformResult, crate::error::SyntaxError> {
        let ast = crate::parser::parse(script)?;
        let (ast, metadata) = self.transforms.apply(&ast);
        let text = crate::transform::serialize(&ast);
        Ok(TransformResult { script: text, ast, metadata })
    }

    pub async fn exec(&mut self, script: &str, options: Option<ExecOptions>) -> ExecResult {
        let trimmed = script.trim();
        if trimmed.is_empty() {
            return ExecResult { exit_code: 0, ..Default::default() };
        }

        let opts = options.unwrap_or_default();
        let saved_vars: Vec<(String, Option<String>)> = opts
            .env
            .as_ref()
            .map(|e| e.keys().map(|k| (k.clone(), self.state.get_var(k))).collect())
            .unwrap_or_default();
        if let Some(env) = &opts.env {
            for (k, v) in env {
                self.state.set_var(k, v.clone());
            }
        }
        self.state.deadline = opts.timeout.map(|d| Instant::now() + d);

        let ast = match crate::parser::parse(script) {
            Ok(ast) => ast,
            Err(e) => {
                return ExecResult {
                    stdout: String::new(),
                    stderr: format!("vshbash: syntax error: {e}\n"),
                    exit_code: 2,
                    env: self.env_map(),
                };
            }
        };
        let (ast, _metadata) = self.transforms.apply(&ast);

        self.state.stdout.clear();
        self.state.stderr.clear();
        let run = self.state.run_script(&ast).await;

        let result = match run {
            Ok(Signal::Exit(code)) => ExecResult {
                stdout: std::mem::take(&mut self.state.stdout),
                stderr: std::mem::take(&mut self.state.stderr),
                exit_code: code,
                env: self.env_map(),
            },
            Ok(_) => ExecResult {
                stdout: std::mem::take(&mut self.state.stdout),
                stderr: std::mem::take(&mut self.state.stderr),
                exit_code: self.state.last_exit_code,
                env: self.env_map(),
            },
            Err(e) => ExecResult {
                stdout: std::mem::take(&mut self.state.stdout),
                stderr: format!("{stderr}{e}\n", stderr = std::mem::take(&mut self.state.stderr)),
                exit_code: e.exit_code(),
                env: self.env_map(),
            },
        };

        for (k, old) in saved_vars {
            match old {
                Some(v) => self.state.set_var(&k, v),
                None => {
                    self.state.variables.remove(&k);
                }
            }
        }
        self.state.deadline = None;
        result
    }

    pub async fn read_file(&self, path: &str) -> Result<String, FsError> {
        let resolved = self.state.resolve(path);
        self.fs.read_file(&resolved).await
    }

    pub async fn write_file(&self, path: &str, content: &str) -> Result<(), FsError> {
        let resolved = self.state.resolve(path);
        self.fs.write_file(&resolved, content.as_bytes()).await
    }

    pub fn get_cwd(&self) -> &str {
        &self.state.cwd
    }

    pub fn get_env(&self) -> HashMap<String, String> {
        self.env_map()
    }

    fn env_map(&self) -> HashMap<String, String> {
        self.state
            .exported_names
            .iter()
            .filter_map(|name| self.state.get_var(name).map(|v| (name.clone(), v)))
            .collect()
    }
}

async fn init_filesystem(fs: &dyn FileSystem, use_default_layout: bool) {
    let _ = fs.mkdir("/bin", &MkdirOptions { recursive: true }).await;
    let _ = fs.mkdir("/usr/bin", &MkdirOptions { recursive: true }).await;

    if use_default_layout {
        let _ = fs.mkdir("/home/user", &MkdirOptions { recursive: true }).await;
        let _ = fs.mkdir("/tmp", &MkdirOptions { recursive: true }).await;
    }

    let _ = fs.mkdir("/dev", &MkdirOptions { recursive: true }).await;
    let _ = fs.write_file("/dev/null", b"").await;
    let _ = fs.write_file("/dev/zero", b"").await;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn shell_new_default_layout() {
        let shell = Shell::new(ShellOptions::default()).await;
        assert_eq!(shell.get_cwd(), "/home/user");
        assert_eq!(shell.get_env().get("HOME"), Some(&"/home/user".to_string()));
    }

    #[tokio::test]
    async fn shell_exec_echo() {
        let mut shell = Shell::new(ShellOptions::default()).await;
        let result = shell.exec("echo hello world", None).await;
        assert_eq!(result.stdout, "hello world\n");
        assert_eq!(result.exit_code, 0);
    }

    #[tokio::test]
    async fn shell_exec_syntax_error_exits_two() {
        let mut shell = Shell::new(ShellOptions::default()).await;
        let result = shell.exec("if then", None).await;
        assert_eq!(result.exit_code, 2);
    }

    #[tokio::test]
    async fn shell_exec_exit_code_propagates() {
        let mut shell = Shell::new(ShellOptions::default()).await;
        let result = shell.exec("exit 42", None).await;
        assert_eq!(result.exit_code, 42);
    }

    #[tokio::test]
    async fn shell_exec_and_or() {
        let mut shell = Shell::new(ShellOptions::default()).await;
        let result = shell.exec("true && echo yes", None).await;
        assert_eq!(result.stdout, "yes\n");
        let result = shell.exec("false || echo fallback", None).await;
        assert_eq!(result.stdout, "fallback\n");
    }
}
