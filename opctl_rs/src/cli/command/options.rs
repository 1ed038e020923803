//! Declarative option schema for leaf commands.
//!
//! A command declares its options as a list of [`OptionSpec`]s; the parser
//! turns each one into a `clap::Arg` when the command is bound.

use clap::{Arg, ArgAction, value_parser};

/// Value type of an option.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionType {
    String,
    Boolean,
    Number,
    Array,
}

/// One declared option (or positional) of a command.
#[derive(Debug, Clone)]
pub struct OptionSpec {
    pub name: String,
    pub kind: OptionType,
    pub description: String,
    pub alias: Vec<String>,
    pub requires_arg: bool,
    pub default: Option<String>,
    pub deprecated: bool,
    pub hidden: bool,
    pub positional: bool,
}

impl OptionSpec {
    fn new(name: impl Into<String>, kind: OptionType) -> Self {
        Self {
            name: name.into(),
            kind,
            description: String::new(),
            alias: Vec::new(),
            requires_arg: false,
            default: None,
            deprecated: false,
            hidden: false,
            positional: false,
        }
    }

    pub fn string(name: impl Into<String>) -> Self {
        Self::new(name, OptionType::String)
    }

    pub fn boolean(name: impl Into<String>) -> Self {
        Self::new(name, OptionType::Boolean)
    }

    pub fn number(name: impl Into<String>) -> Self {
        Self::new(name, OptionType::Number)
    }

    pub fn array(name: impl Into<String>) -> Self {
        Self::new(name, OptionType::Array)
    }

    /// A positional string argument, e.g. `delete [deployment]`.
    pub fn positional(name: impl Into<String>) -> Self {
        Self {
            positional: true,
            ..Self::new(name, OptionType::String)
        }
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.alias.push(alias.into());
        self
    }

    pub fn requires_arg(mut self) -> Self {
        self.requires_arg = true;
        self
    }

    pub fn default_value(mut self, value: impl Into<String>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn deprecated(mut self) -> Self {
        self.deprecated = true;
        self
    }

    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    /// Build the `clap::Arg` this spec stands for.
    pub(crate) fn to_arg(&self) -> Arg {
        let mut arg = Arg::new(self.name.clone()).hide(self.hidden);

        let help = if self.deprecated {
            format!("{} [deprecated]", self.description)
        } else {
            self.description.clone()
        };
        if !help.trim().is_empty() {
            arg = arg.help(help.trim().to_string());
        }

        if self.positional {
            arg = arg.action(ArgAction::Set).required(false);
            if let Some(default) = &self.default {
                arg = arg.default_value(default.clone());
            }
            return arg;
        }

        arg = arg.long(self.name.clone());
        let mut short_taken = false;
        for alias in &self.alias {
            let mut chars = alias.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) if !short_taken => {
                    arg = arg.short(c);
                    short_taken = true;
                }
                (Some(c), None) => arg = arg.short_alias(c),
                _ => arg = arg.alias(alias.clone()),
            }
        }

        arg = match self.kind {
            OptionType::Boolean => arg
                .action(ArgAction::Set)
                .value_parser(value_parser!(bool))
                .num_args(0..=1)
                .require_equals(true)
                .default_missing_value("true")
                .default_value(self.default.clone().unwrap_or_else(|| "false".to_string())),
            OptionType::Number => arg
                .action(ArgAction::Set)
                .value_parser(value_parser!(f64))
                .num_args(1),
            OptionType::Array => arg.action(ArgAction::Append).num_args(1..),
            OptionType::String if self.requires_arg => arg.action(ArgAction::Set).num_args(1),
            OptionType::String => arg
                .action(ArgAction::Set)
                .num_args(0..=1)
                .default_missing_value(""),
        };

        if self.kind != OptionType::Boolean
            && let Some(default) = &self.default
        {
            arg = arg.default_value(default.clone());
        }
        arg
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_char_alias_becomes_short() {
        let arg = OptionSpec::string("config").alias("c").requires_arg().to_arg();
        assert_eq!(arg.get_short(), Some('c'));
        assert_eq!(arg.get_long(), Some("config"));
    }

    #[test]
    fn test_positional_has_no_long_flag() {
        let arg = OptionSpec::positional("deployment").to_arg();
        assert!(arg.get_long().is_none());
        assert!(arg.is_positional());
    }

    #[test]
    fn test_hidden_and_deprecated_flags() {
        let spec = OptionSpec::boolean("legacy").hidden().deprecated();
        let arg = spec.to_arg();
        assert!(arg.is_hide_set());
        assert!(
            arg.get_help()
                .map(|h| h.to_string().contains("[deprecated]"))
                .unwrap_or(false)
        );
    }
}
