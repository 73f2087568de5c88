use clap::Command;
use std::collections::BTreeMap;
use std::fmt;

use crate::errors::{Result, ScmcError};

/// Groups shown in the command listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CommandCategory {
    Core,
    Cloud,
    Server,
}

impl CommandCategory {
    /// Returns all category variants in display order.
    pub fn all() -> &'static [CommandCategory] {
        &[
            CommandCategory::Core,
            CommandCategory::Cloud,
            CommandCategory::Server,
        ]
    }
}

impl fmt::Display for CommandCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandCategory::Core => write!(f, "core"),
            CommandCategory::Cloud => write!(f, "cloud"),
            CommandCategory::Server => write!(f, "server"),
        }
    }
}

/// Metadata for a registered command.
#[derive(Debug, Clone)]
pub struct CommandMeta {
    pub name: String,
    pub category: CommandCategory,
    pub description: String,
    pub aliases: Vec<String>,
    pub command: Command,
}

/// Registered subcommands, attached to the root on `build_root`.
pub struct CommandRegistry {
    commands: BTreeMap<String, CommandMeta>,
    root: Command,
}

impl CommandRegistry {
    pub fn new(root: Command) -> Self {
        Self {
            commands: BTreeMap::new(),
            root,
        }
    }

    /// Registers a command. Names and aliases must be unique.
    pub fn register(&mut self, meta: CommandMeta) -> Result<()> {
        let taken = |name: &str| {
            self.commands
                .values()
                .any(|m| m.name == name || m.aliases.iter().any(|a| a == name))
        };
        if let Some(name) = std::iter::once(&meta.name)
            .chain(meta.aliases.iter())
            .find(|n| taken(n.as_str()))
        {
            return Err(ScmcError::Command(format!("duplicate command name: {}", name)));
        }
        self.commands.insert(meta.name.clone(), meta);
        Ok(())
    }

    /// Returns all commands in the given category, sorted by name.
    pub fn get_by_category(&self, cat: CommandCategory) -> Vec<&CommandMeta> {
        self.commands
            .values()
            .filter(|m| m.category == cat)
            .collect()
    }

    /// Command listing grouped by category, for the root help footer.
    pub fn overview(&self) -> String {
        let mut out = String::new();
        for cat in CommandCategory::all() {
            let cmds = self.get_by_category(*cat);
            if cmds.is_empty() {
                continue;
            }
            out.push_str(&format!("\n{}:\n", cat));
            for cmd in cmds {
                out.push_str(&format!("  {:<20} {}\n", cmd.name, cmd.description));
            }
        }
        out
    }

    /// Consumes the registry and builds the final clap Command with all subcommands attached.
    pub fn build_root(self) -> Command {
        let listing = self.overview();
        let mut root = self.root.after_help(listing);
        for (_, meta) in self.commands {
            let mut command = meta.command;
            for alias in meta.aliases {
                command = command.visible_alias(alias);
            }
            root = root.subcommand(command);
        }
        root
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Returns a sorted list of all registered command names.
    pub fn command_names(&self) -> Vec<String> {
        self.commands.keys().cloned().collect()
    }
}

/// Builder for constructing `CommandMeta` instances.
pub struct CommandBuilder {
    name: String,
    category: Option<CommandCategory>,
    description: String,
    aliases: Vec<String>,
    command: Command,
}

impl CommandBuilder {
    /// Creates a builder from an existing clap Command, extracting name and description.
    pub fn from_clap(cmd: Command) -> Self {
        let name = cmd.get_name().to_string();
        let description = cmd
            .get_about()
            .map(|s| s.to_string())
            .unwrap_or_default();
        Self {
            name,
            category: None,
            description,
            aliases: Vec::new(),
            command: cmd,
        }
    }

    pub fn category(mut self, cat: CommandCategory) -> Self {
        self.category = Some(cat);
        self
    }

    pub fn aliases(mut self, aliases: &[&str]) -> Self {
        self.aliases = aliases.iter().map(|s| s.to_string()).collect();
        self
    }

    /// Builds the `CommandMeta`. Defaults category to `Core` if not set.
    pub fn build(self) -> CommandMeta {
        CommandMeta {
            name: self.name,
            category: self.category.unwrap_or(CommandCategory::Core),
            description: self.description,
            aliases: self.aliases,
            command: self.command,
        }
    }
}
