use super::types::Command;
use std::collections::HashMap;

pub struct CommandRegistry {
    commands: HashMap<String, Box<dyn Command>>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self { commands: HashMap::new() }
    }

    pub fn register(&mut self, cmd: Box<dyn Command>) {
        self.commands.insert(cmd.name().to_string(), cmd);
    }

    pub fn get(&self, name: &str) -> Option<&dyn Command> {
        self.commands.get(name).map(|c| c.as_ref())
    }

    pub fn names(&self) -> Vec<&str> {
        self.commands.keys().map(|s| s.as_str()).collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.commands.contains_key(name)
    }

    /// Populates the registry with the full peripheral command set.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(super::echo::EchoCommand));
        registry.register(Box::new(super::printf_cmd::PrintfCommand));
        registry.register(Box::new(super::cat::CatCommand));
        registry.register(Box::new(super::pwd::PwdCommand));
        registry.register(Box::new(super::ls::LsCommand));
        registry.register(Box::new(super::grep::GrepCommand));
        registry.register(Box::new(super::wc::WcCommand));
        registry.register(Box::new(super::sort::SortCommand));
        registry.register(Box::new(super::head::HeadCommand));
        registry.register(Box::new(super::tail::TailCommand));
        registry.register(Box::new(super::cut::CutCommand));
        registry.register(Box::new(super::tr::TrCommand));
        registry.register(Box::new(super::uniq::UniqCommand));
        registry.register(Box::new(super::mkdir::MkdirCommand));
        registry.register(Box::new(super::rm::RmCommand));
        registry.register(Box::new(super::cp::CpCommand));
        registry.register(Box::new(super::mv::MvCommand));
        registry.register(Box::new(super::touch::TouchCommand));
        registry.register(Box::new(super::basename::BasenameCommand));
        registry.register(Box::new(super::dirname::DirnameCommand));
        registry.register(Box::new(super::seq::SeqCommand));
        registry.register(Box::new(super::env::EnvCommand));
        registry.register(Box::new(super::which::WhichCommand));
        registry.register(Box::new(super::readlink::ReadlinkCommand));
        registry.register(Box::new(super::xargs::XargsCommand));
        registry
    }
}

impl Default for CommandRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}
