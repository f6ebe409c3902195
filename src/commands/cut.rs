use super::{Command, CommandContext, CommandResult};
use async_trait::async_trait;

pub struct CutCommand;

enum Selector {
    Field(usize),
    Range(usize, Option<usize>),
}

fn parse_list(spec: &str) -> Vec<Selector> {
    let mut out = Vec::new();
    for part in spec.split(',') {
        if let Some((a, b)) = part.split_once('-') {
            let start: usize = a.trim().parse().unwrap_or(1);
            let end = if b.trim().is_empty() { None } else { b.trim().parse().ok() };
            out.push(Selector::Range(start, end));
        } else if let Ok(n) = part.trim().parse() {
            out.push(Selector::Field(n));
        }
    }
    out
}

fn selected_indices(selectors: &[Selector], len: usize) -> Vec<usize> {
    let mut idx = Vec::new();
    for s in selectors {
        match s {
            Selector::Field(n) => idx.push(*n),
            Selector::Range(start, end) => {
                let end = end.unwrap_or(len);
                for n in *start..=end.max(*start) {
                    idx.push(n);
                }
            }
        }
    }
    idx.sort_unstable();
    idx.dedup();
    idx
}

#[async_trait]
impl Command for CutCommand {
    fn name(&self) -> &'static str {
        "cut"
    }

    async fn execute(&self, ctx: CommandContext) -> CommandResult {
        let mut delimiter = "\t".to_string();
        let mut fields_spec: Option<String> = None;
        let mut files = Vec::new();
        let mut i = 0;
        while i < ctx.args.len() {
            let arg = &ctx.args[i];
            if let Some(d) = arg.strip_prefix("-d") {
                delimiter = if d.is_empty() {
                    i += 1;
                    ctx.args.get(i).cloned().unwrap_or_default()
                } else {
                    d.to_string()
                };
            } else if let Some(f) = arg.strip_prefix("-f") {
                fields_spec = Some(if f.is_empty() {
                    i += 1;
                    ctx.args.get(i).cloned().unwrap_or_default()
                } else {
                    f.to_string()
                });
            } else if !arg.starts_with('-') {
                files.push(arg.clone());
            }
            i += 1;
        }

        let Some(spec) = fields_spec else {
            return CommandResult::error("cut: you must specify a list of fields\n".to_string());
        };
        let selectors = parse_list(&spec);

        let content = if files.is_empty() {
            ctx.stdin.clone()
        } else {
            let mut combined = String::new();
            for f in &files {
                let path = ctx.fs.resolve_path(&ctx.cwd, f);
                match ctx.fs.read_file(&path).await {
                    Ok(c) => combined.push_str(&c),
                    Err(_) => {
                        return CommandResult::with_exit_code(String::new(), format!("cut: {f}: No such file or directory\n"), 1)
                    }
                }
            }
            combined
        };

        let mut stdout = String::new();
        for line in content.lines() {
            let parts: Vec<&str> = line.split(&delimiter).collect();
            let indices = selected_indices(&selectors, parts.len());
            let selected: Vec<&str> = indices.iter().filter_map(|&n| parts.get(n - 1).copied()).collect();
            stdout.push_str(&selected.join(&delimiter));
            stdout.push('\n');
        }
        CommandResult::success(stdout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::InMemoryFs;
    use std::collections::HashMap;
    use std::sync::Arc;

    fn ctx(args: Vec<&str>, stdin: &str) -> CommandContext {
        CommandContext {
            args: args.into_iter().map(String::from).collect(),
            stdin: stdin.to_string(),
            cwd: "/".to_string(),
            env: HashMap::new(),
            fs: Arc::new(InMemoryFs::new()),
        }
    }

    #[tokio::test]
    async fn cut_selects_field_by_delimiter() {
        let r = CutCommand.execute(ctx(vec!["-d", ",", "-f", "2"], "a,b,c\n1,2,3\n")).await;
        assert_eq!(r.stdout, "b\n2\n");
    }

    #[tokio::test]
    async fn cut_selects_range() {
        let r = CutCommand.execute(ctx(vec!["-d", ",", "-f", "1-2"], "a,b,c\n")).await;
        assert_eq!(r.stdout, "a,b\n");
    }
}
