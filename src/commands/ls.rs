use super::{Command, CommandContext, CommandResult};
use async_trait::async_trait;

pub struct LsCommand;

fn format_mode(mode: u32, is_dir: bool, is_link: bool) -> String {
    let kind = if is_link { 'l' } else if is_dir { 'd' } else { '-' };
    let bits = [
        (0o400, 'r'), (0o200, 'w'), (0o100, 'x'),
        (0o040, 'r'), (0o020, 'w'), (0o010, 'x'),
        (0o004, 'r'), (0o002, 'w'), (0o001, 'x'),
    ];
    let perms: String = bits.iter().map(|(bit, ch)| if mode & bit != 0 { *ch } else { '-' }).collect();
    format!("{kind}{perms}")
}

#[async_trait]
impl Command for LsCommand {
    fn name(&self) -> &'static str {
        "ls"
    }

    async fn execute(&self, ctx: CommandContext) -> CommandResult {
        let mut long = false;
        let mut all = false;
        let mut targets = Vec::new();
        for arg in &ctx.args {
            if let Some(flags) = arg.strip_prefix('-').filter(|_| arg.starts_with('-') && arg != "-") {
                for c in flags.chars() {
                    match c {
                        'l' => long = true,
                        'a' => all = true,
                        _ => {}
                    }
                }
            } else {
                targets.push(arg.clone());
            }
        }
        if targets.is_empty() {
            targets.push(".".to_string());
        }

        let mut stdout = String::new();
        let mut stderr = String::new();
        let mut exit_code = 0;

        for target in &targets {
            let path = ctx.fs.resolve_path(&ctx.cwd, target);
            let mut entries = match ctx.fs.readdir(&path).await {
                Ok(e) => e,
                Err(_) => {
                    stderr.push_str(&format!("ls: cannot access '{target}': No such file or directory\n"));
                    exit_code = 1;
                    continue;
                }
            };
            entries.sort();
            if !all {
                entries.retain(|e| !e.starts_with('.'));
            }
            if targets.len() > 1 {
                stdout.push_str(&format!("{target}:\n"));
            }
            for name in &entries {
                if long {
                    let full = format!("{}/{}", path.trim_end_matches('/'), name);
                    let stat = ctx.fs.lstat(&full).await;
                    match stat {
                        Ok(s) => {
                            let mode_str = format_mode(s.mode, s.is_directory, s.is_symlink);
                            stdout.push_str(&format!("{mode_str} {:>8} {name}\n", s.size));
                        }
                        Err(_) => stdout.push_str(&format!("?????????? {name}\n")),
                    }
                } else {
                    stdout.push_str(name);
                    stdout.push('\n');
                }
            }
        }
        CommandResult::with_exit_code(stdout, stderr, exit_code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::{FileSystem, InMemoryFs, MkdirOptions};
    use std::collections::HashMap;
    use std::sync::Arc;

    #[tokio::test]
    async fn ls_lists_directory_entries() {
        let fs = Arc::new(InMemoryFs::new());
        fs.mkdir("/d", &MkdirOptions::default()).await.unwrap();
        fs.write_file("/d/b.txt", b"x").await.unwrap();
        fs.write_file("/d/a.txt", b"x").await.unwrap();
        let ctx = CommandContext {
            args: vec!["/d".to_string()],
            stdin: String::new(),
            cwd: "/".to_string(),
            env: HashMap::new(),
            fs,
        };
        let r = LsCommand.execute(ctx).await;
        assert_eq!(r.stdout, "a.txt\nb.txt\n");
    }

    #[tokio::test]
    async fn ls_hides_dotfiles_without_a() {
        let fs = Arc::new(InMemoryFs::new());
        fs.write_file("/.hidden", b"x").await.unwrap();
        fs.write_file("/visible", b"x").await.unwrap();
        let ctx = CommandContext {
            args: vec!["/".to_string()],
            stdin: String::new(),
            cwd: "/".to_string(),
            env: HashMap::new(),
            fs,
        };
        let r = LsCommand.execute(ctx).await;
        assert_eq!(r.stdout, "visible\n");
    }
}
