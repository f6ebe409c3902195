//! The peripheral command set: external-style utilities (`echo`, `grep`,
//! `sort`, ...) that run over the virtual filesystem. Looked up by
//! [`CommandRegistry`] when a simple command name isn't a shell builtin.

pub mod basename;
pub mod cat;
pub mod cp;
pub mod cut;
pub mod dirname;
pub mod echo;
pub mod env;
pub mod grep;
pub mod head;
pub mod ls;
pub mod mkdir;
pub mod mv;
pub mod printf_cmd;
pub mod pwd;
pub mod readlink;
pub mod registry;
pub mod rm;
pub mod seq;
pub mod sort;
pub mod tail;
pub mod touch;
pub mod tr;
pub mod types;
pub mod uniq;
pub mod wc;
pub mod which;
pub mod xargs;

pub use registry::CommandRegistry;
pub use types::{Command, CommandContext, CommandResult};
