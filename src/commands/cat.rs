use super::{Command, CommandContext, CommandResult};
use async_trait::async_trait;

pub struct CatCommand;

#[async_trait]
impl Command for CatCommand {
    fn name(&self) -> &'static str {
        "cat"
    }

    async fn execute(&self, ctx: CommandContext) -> CommandResult {
        let mut number_lines = false;
        let mut files = Vec::new();
        for arg in &ctx.args {
            match arg.as_str() {
                "-n" | "--number" => number_lines = true,
                _ if arg == "-" || !arg.starts_with('-') => files.push(arg.clone()),
                _ => {}
            }
        }
        if files.is_empty() {
            files.push("-".to_string());
        }

        let mut stdout = String::new();
        let mut stderr = String::new();
        let mut exit_code = 0;
        let mut line_no = 1usize;

        for file in &files {
            let content = if file == "-" {
                ctx.stdin.clone()
            } else {
                let path = ctx.fs.resolve_path(&ctx.cwd, file);
                match ctx.fs.read_file(&path).await {
                    Ok(c) => c,
                    Err(_) => {
                        stderr.push_str(&format!("cat: {file}: No such file or directory\n"));
                        exit_code = 1;
                        continue;
                    }
                }
            };
            if number_lines {
                let ends_nl = content.ends_with('\n');
                let mut lines: Vec<&str> = content.split('\n').collect();
                if ends_nl {
                    lines.pop();
                }
                for line in lines {
                    stdout.push_str(&format!("{:>6}\t{}\n", line_no, line));
                    line_no += 1;
                }
            } else {
                stdout.push_str(&content);
            }
        }
        CommandResult::with_exit_code(stdout, stderr, exit_code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::{FileSystem, InMemoryFs};
    use std::collections::HashMap;
    use std::sync::Arc;

    #[tokio::test]
    async fn cat_reads_file_contents() {
        let fs = Arc::new(InMemoryFs::new());
        fs.write_file("/a.txt", b"hello\n").await.unwrap();
        let ctx = CommandContext {
            args: vec!["a.txt".to_string()],
            stdin: String::new(),
            cwd: "/".to_string(),
            env: HashMap::new(),
            fs,
        };
        let r = CatCommand.execute(ctx).await;
        assert_eq!(r.stdout, "hello\n");
        assert_eq!(r.exit_code, 0);
    }

    #[tokio::test]
    async fn cat_missing_file_errors() {
        let ctx = CommandContext {
            args: vec!["missing.txt".to_string()],
            stdin: String::new(),
            cwd: "/".to_string(),
            env: HashMap::new(),
            fs: Arc::new(InMemoryFs::new()),
        };
        let r = CatCommand.execute(ctx).await;
        assert_eq!(r.exit_code, 1);
        assert!(r.stderr.contains("No such file"));
    }
}
