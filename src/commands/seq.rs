use super::{Command, CommandContext, CommandResult};
use async_trait::async_trait;

pub struct SeqCommand;

#[async_trait]
impl Command for SeqCommand {
    fn name(&self) -> &'static str {
        "seq"
    }

    async fn execute(&self, ctx: CommandContext) -> CommandResult {
        let nums: Vec<f64> = ctx.args.iter().filter_map(|a| a.parse().ok()).collect();
        let (start, step, end) = match nums.len() {
            1 => (1.0, 1.0, nums[0]),
            2 => (nums[0], 1.0, nums[1]),
            3 => (nums[0], nums[1], nums[2]),
            _ => return CommandResult::error("seq: missing operand\n".to_string()),
        };
        if step == 0.0 {
            return CommandResult::error("seq: invalid Zero increment\n".to_string());
        }
        let mut out = String::new();
        let mut v = start;
        if step > 0.0 {
            while v <= end {
                out.push_str(&format_num(v));
                out.push('\n');
                v += step;
            }
        } else {
            while v >= end {
                out.push_str(&format_num(v));
                out.push('\n');
                v += step;
            }
        }
        CommandResult::success(out)
    }
}

fn format_num(v: f64) -> String {
    if v.fract() == 0.0 {
        format!("{}", v as i64)
    } else {
        format!("{v}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::InMemoryFs;
    use std::collections::HashMap;
    use std::sync::Arc;

    fn ctx(args: Vec<&str>) -> CommandContext {
        CommandContext {
            args: args.into_iter().map(String::from).collect(),
            stdin: String::new(),
            cwd: "/".to_string(),
            env: HashMap::new(),
            fs: Arc::new(InMemoryFs::new()),
        }
    }

    #[tokio::test]
    async fn seq_single_arg_from_one() {
        let r = SeqCommand.execute(ctx(vec!["3"])).await;
        assert_eq!(r.stdout, "1\n2\n3\n");
    }

    #[tokio::test]
    async fn seq_with_step() {
        let r = SeqCommand.execute(ctx(vec!["0", "2", "6"])).await;
        assert_eq!(r.stdout, "0\n2\n4\n6\n");
    }
}
