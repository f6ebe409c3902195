use super::{Command, CommandContext, CommandResult};
use async_trait::async_trait;

pub struct WcCommand;

fn counts(content: &str) -> (usize, usize, usize) {
    let lines = content.matches('\n').count();
    let words = content.split_whitespace().count();
    let bytes = content.len();
    (lines, words, bytes)
}

#[async_trait]
impl Command for WcCommand {
    fn name(&self) -> &'static str {
        "wc"
    }

    async fn execute(&self, ctx: CommandContext) -> CommandResult {
        let mut show_lines = false;
        let mut show_words = false;
        let mut show_bytes = false;
        let mut files = Vec::new();
        for arg in &ctx.args {
            match arg.as_str() {
                "-l" | "--lines" => show_lines = true,
                "-w" | "--words" => show_words = true,
                "-c" | "--bytes" => show_bytes = true,
                _ if !arg.starts_with('-') => files.push(arg.clone()),
                _ => {}
            }
        }
        if !show_lines && !show_words && !show_bytes {
            show_lines = true;
            show_words = true;
            show_bytes = true;
        }

        let mut stdout = String::new();
        let mut stderr = String::new();
        let mut exit_code = 0;
        let mut totals = (0usize, 0usize, 0usize);
        let multi = files.len() > 1;

        let sources: Vec<(String, Option<String>)> = if files.is_empty() {
            vec![("".to_string(), Some(ctx.stdin.clone()))]
        } else {
            let mut out = Vec::new();
            for f in &files {
                let path = ctx.fs.resolve_path(&ctx.cwd, f);
                match ctx.fs.read_file(&path).await {
                    Ok(c) => out.push((f.clone(), Some(c))),
                    Err(_) => {
                        stderr.push_str(&format!("wc: {f}: No such file or directory\n"));
                        exit_code = 1;
                        out.push((f.clone(), None));
                    }
                }
            }
            out
        };

        for (name, content) in &sources {
            let Some(content) = content else { continue };
            let (l, w, b) = counts(content);
            totals.0 += l;
            totals.1 += w;
            totals.2 += b;
            stdout.push_str(&format_line(show_lines, show_words, show_bytes, l, w, b, name));
        }
        if multi {
            stdout.push_str(&format_line(show_lines, show_words, show_bytes, totals.0, totals.1, totals.2, "total"));
        }
        CommandResult::with_exit_code(stdout, stderr, exit_code)
    }
}

fn format_line(show_l: bool, show_w: bool, show_b: bool, l: usize, w: usize, b: usize, name: &str) -> String {
    let mut parts = Vec::new();
    if show_l {
        parts.push(format!("{l:>7}"));
    }
    if show_w {
        parts.push(format!("{w:>7}"));
    }
    if show_b {
        parts.push(format!("{b:>7}"));
    }
    if !name.is_empty() {
        parts.push(format!(" {name}"));
    }
    format!("{}\n", parts.join(""))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::InMemoryFs;
    use std::collections::HashMap;
    use std::sync::Arc;

    #[tokio::test]
    async fn wc_counts_lines_words_bytes_from_stdin() {
        let ctx = CommandContext {
            args: vec![],
            stdin: "one two\nthree\n".to_string(),
            cwd: "/".to_string(),
            env: HashMap::new(),
            fs: Arc::new(InMemoryFs::new()),
        };
        let r = WcCommand.execute(ctx).await;
        assert!(r.stdout.contains("2"));
        assert!(r.stdout.contains("3"));
    }

    #[tokio::test]
    async fn wc_dash_l_only_lines() {
        let ctx = CommandContext {
            args: vec!["-l".to_string()],
            stdin: "a\nb\nc\n".to_string(),
            cwd: "/".to_string(),
            env: HashMap::new(),
            fs: Arc::new(InMemoryFs::new()),
        };
        let r = WcCommand.execute(ctx).await;
        assert_eq!(r.stdout.trim(), "3");
    }
}
