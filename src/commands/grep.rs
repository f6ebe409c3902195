use super::{Command, CommandContext, CommandResult};
use async_trait::async_trait;
use regex_lite::{Regex, RegexBuilder};

pub struct GrepCommand;

#[derive(Default)]
struct GrepOptions {
    pattern: String,
    ignore_case: bool,
    invert_match: bool,
    count_only: bool,
    files_with_matches: bool,
    line_number: bool,
    only_matching: bool,
    fixed_strings: bool,
    files: Vec<String>,
}

fn parse_args(args: &[String]) -> Result<GrepOptions, String> {
    let mut opts = GrepOptions::default();
    let mut positional = Vec::new();
    let mut i = 0;
    while i < args.len() {
        let arg = &args[i];
        match arg.as_str() {
            "-e" if i + 1 < args.len() => {
                i += 1;
                opts.pattern = args[i].clone();
            }
            "-i" | "--ignore-case" => opts.ignore_case = true,
            "-v" | "--invert-match" => opts.invert_match = true,
            "-c" | "--count" => opts.count_only = true,
            "-l" | "--files-with-matches" => opts.files_with_matches = true,
            "-n" | "--line-number" => opts.line_number = true,
            "-o" | "--only-matching" => opts.only_matching = true,
            "-F" | "--fixed-strings" => opts.fixed_strings = true,
            "-E" | "--extended-regexp" => {}
            _ if !arg.starts_with('-') => positional.push(arg.clone()),
            _ => {}
        }
        i += 1;
    }
    if opts.pattern.is_empty() {
        if positional.is_empty() {
            return Err("grep: no pattern specified".to_string());
        }
        opts.pattern = positional.remove(0);
    }
    opts.files = positional;
    Ok(opts)
}

#[async_trait]
impl Command for GrepCommand {
    fn name(&self) -> &'static str {
        "grep"
    }

    async fn execute(&self, ctx: CommandContext) -> CommandResult {
        let opts = match parse_args(&ctx.args) {
            Ok(o) => o,
            Err(e) => return CommandResult::error(format!("{e}\n")),
        };

        let pattern_src = if opts.fixed_strings { regex_lite::escape(&opts.pattern) } else { opts.pattern.clone() };
        let re = match RegexBuilder::new(&pattern_src).case_insensitive(opts.ignore_case).build() {
            Ok(r) => r,
            Err(e) => return CommandResult::error(format!("grep: {e}\n")),
        };

        let sources: Vec<(String, String)> = if opts.files.is_empty() {
            vec![("-".to_string(), ctx.stdin.clone())]
        } else {
            let mut out = Vec::new();
            for f in &opts.files {
                let path = ctx.fs.resolve_path(&ctx.cwd, f);
                match ctx.fs.read_file(&path).await {
                    Ok(c) => out.push((f.clone(), c)),
                    Err(_) => return CommandResult::with_exit_code(
                        String::new(),
                        format!("grep: {f}: No such file or directory\n"),
                        2,
                    ),
                }
            }
            out
        };

        let multi_file = sources.len() > 1;
        let mut stdout = String::new();
        let mut any_match = false;

        for (name, content) in &sources {
            let mut match_count = 0usize;
            let mut file_matched = false;
            for (idx, line) in content.lines().enumerate() {
                let is_match = re.is_match(line) != opts.invert_match;
                if !is_match {
                    continue;
                }
                match_count += 1;
                file_matched = true;
                any_match = true;
                if opts.count_only || opts.files_with_matches {
                    continue;
                }
                let prefix = if multi_file { format!("{name}:") } else { String::new() };
                let line_prefix = if opts.line_number { format!("{}:", idx + 1) } else { String::new() };
                if opts.only_matching {
                    for m in re.find_iter(line) {
                        stdout.push_str(&format!("{prefix}{line_prefix}{}\n", m.as_str()));
                    }
                } else {
                    stdout.push_str(&format!("{prefix}{line_prefix}{line}\n"));
                }
            }
            if opts.files_with_matches && file_matched {
                stdout.push_str(&format!("{name}\n"));
            }
            if opts.count_only {
                let prefix = if multi_file { format!("{name}:") } else { String::new() };
                stdout.push_str(&format!("{prefix}{match_count}\n"));
            }
        }

        CommandResult::with_exit_code(stdout, String::new(), if any_match { 0 } else { 1 })
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
    async fn grep_matches_lines_from_stdin() {
        let r = GrepCommand.execute(ctx(vec!["foo"], "foo\nbar\nfoobar\n")).await;
        assert_eq!(r.stdout, "foo\nfoobar\n");
        assert_eq!(r.exit_code, 0);
    }

    #[tokio::test]
    async fn grep_invert_match() {
        let r = GrepCommand.execute(ctx(vec!["-v", "foo"], "foo\nbar\n")).await;
        assert_eq!(r.stdout, "bar\n");
    }

    #[tokio::test]
    async fn grep_no_match_exits_nonzero() {
        let r = GrepCommand.execute(ctx(vec!["zzz"], "foo\n")).await;
        assert_eq!(r.exit_code, 1);
        assert!(r.stdout.is_empty());
    }
}
