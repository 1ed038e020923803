//! Argument parser built from the sealed command registry.
//!
//! This module turns `opctl <namespace>... <command> [options]` into a
//! [`ParsedInvocation`]: the resolved command path, the global options and
//! the clap matches of the innermost command.
//!
//! # Module Structure
//!
//! - [`build`] - clap command tree and global options
//! - [`helpers`] - suggestions and clap error conversion
//!
//! # Usage
//!
//! ```rust
//! use opctl::cli::command::CommandDefinition;
//! use opctl::cli::parser::{CliParser, ParseOutcome};
//! use opctl::cli::registry::{CommandRegistry, RegistrationEntry};
//!
//! let mut registry = CommandRegistry::new("Operator CLI");
//! registry
//!     .define([RegistrationEntry::new(
//!         "whoami",
//!         CommandDefinition::new("Show the current identity", |_| async { Ok(()) }),
//!     )])
//!     .unwrap();
//! registry.register_all().unwrap();
//!
//! let parser = CliParser::new(registry, "opctl", "0.4.2").unwrap();
//! match parser.parse(&["whoami".to_string()]).unwrap() {
//!     ParseOutcome::Invoke(invocation) => assert_eq!(invocation.path.key(), "whoami"),
//!     ParseOutcome::Display(_) => unreachable!(),
//! }
//! ```

mod build;
mod helpers;

use clap::error::ErrorKind as ClapErrorKind;
use clap::{ArgMatches, Command};

use crate::cli::command::{CommandDefinition, GlobalOptions, Metadata};
use crate::cli::registry::{CommandPath, CommandRegistry, NamespaceTree, Node, NodeKind};
use crate::errors::{CommandLineArgsError, RegistrationError};
use crate::taxonomy::HelpSource;

use helpers::{args_error_from_clap, is_flag, suggest_similar_command};

/// What the parse resolved to.
#[derive(Debug, Clone)]
pub enum Target {
    /// A leaf command with a handler.
    Command(CommandDefinition),
    /// A namespace invoked without a subcommand; shows its own help.
    Namespace(Metadata),
    /// The program invoked with no command at all.
    Root,
}

/// A successfully parsed command line, ready for the dispatch pipeline.
#[derive(Debug, Clone)]
pub struct ParsedInvocation {
    pub path: CommandPath,
    pub global: GlobalOptions,
    pub matches: ArgMatches,
    pub target: Target,
}

#[derive(Debug, Clone)]
pub enum ParseOutcome {
    /// Help or version text; print it and exit successfully.
    Display(String),
    Invoke(ParsedInvocation),
}

/// Parser over a sealed command tree.
#[derive(Debug, Clone)]
pub struct CliParser {
    program: String,
    version: String,
    command: Command,
    tree: NamespaceTree,
}

impl CliParser {
    /// Fails with [`RegistrationError::NotSealed`] unless `register_all` has run.
    pub fn new(
        registry: CommandRegistry,
        program: impl Into<String>,
        version: impl Into<String>,
    ) -> Result<Self, RegistrationError> {
        let tree = registry.into_tree()?;
        let program = program.into();
        let command = build::root_command(&program, tree.root());
        Ok(Self {
            program,
            version: version.into(),
            command,
            tree,
        })
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn tree(&self) -> &NamespaceTree {
        &self.tree
    }

    /// Parse `argv` (without the program name).
    pub fn parse(&self, argv: &[String]) -> Result<ParseOutcome, CommandLineArgsError> {
        let matches = match self.try_parse(argv) {
            Ok(matches) => matches,
            Err(err) => {
                return match err.kind() {
                    ClapErrorKind::DisplayHelp
                    | ClapErrorKind::DisplayHelpOnMissingArgumentOrSubcommand => {
                        Ok(ParseOutcome::Display(err.render().to_string()))
                    }
                    _ => Err(args_error_from_clap(&err)),
                };
            }
        };

        let mut node = self.tree.root();
        let mut current = &matches;
        while let Some((name, sub)) = current.subcommand() {
            match node.child(name) {
                Some(child) => {
                    node = child;
                    current = sub;
                }
                None => return Err(unknown_command(node, name)),
            }
        }

        let global = GlobalOptions::from_matches(current)?;
        if global.version {
            return Ok(ParseOutcome::Display(self.version.clone()));
        }

        let target = match &node.kind {
            NodeKind::Command(def) => Target::Command(def.clone()),
            NodeKind::Namespace(_) if node.path.is_root() => Target::Root,
            NodeKind::Namespace(def) => Target::Namespace(def.metadata.clone()),
        };

        Ok(ParseOutcome::Invoke(ParsedInvocation {
            path: node.path.clone(),
            global,
            matches: current.clone(),
            target,
        }))
    }

    /// Help text for a bound path; root help for anything else.
    pub fn help_for(&self, path: &CommandPath) -> String {
        if !path.is_root() && self.tree.get(path).is_some() {
            let mut argv = path.tokens().to_vec();
            argv.push("--help".to_string());
            if let Some(help) = self.help_from_parse(&argv) {
                return help;
            }
        }
        let mut root = self.command.clone();
        root.render_help().to_string()
    }

    /// Help for whatever `argv` was aimed at: re-parse with `--help` appended,
    /// falling back to the deepest namespace or command that was recognized.
    pub fn contextual_help(&self, argv: &[String]) -> String {
        let mut with_help = argv.to_vec();
        with_help.push("--help".to_string());
        if let Some(help) = self.help_from_parse(&with_help) {
            return help;
        }
        self.help_for(&self.deepest_known(argv))
    }

    fn help_from_parse(&self, argv: &[String]) -> Option<String> {
        match self.try_parse(argv) {
            Err(err) if err.kind() == ClapErrorKind::DisplayHelp => Some(err.render().to_string()),
            _ => None,
        }
    }

    fn deepest_known(&self, argv: &[String]) -> CommandPath {
        let mut node = self.tree.root();
        for token in argv.iter().filter(|t| !is_flag(t)) {
            match node.child(token) {
                Some(child) => node = child,
                None => break,
            }
        }
        node.path.clone()
    }

    fn try_parse(&self, argv: &[String]) -> Result<ArgMatches, clap::Error> {
        let full = std::iter::once(self.program.clone()).chain(argv.iter().cloned());
        self.command.clone().try_get_matches_from(full)
    }
}

impl HelpSource for CliParser {
    fn contextual_help(&self, argv: &[String]) -> String {
        CliParser::contextual_help(self, argv)
    }
}

fn unknown_command(node: &Node, token: &str) -> CommandLineArgsError {
    let path = node.path.child(token);
    let mut message = format!("Unknown command: {}.", path.key());
    let visible = node
        .children()
        .iter()
        .filter(|c| !c.metadata().hidden)
        .map(|c| c.name.as_str());
    if let Some(suggestion) = suggest_similar_command(token, visible) {
        message.push_str(&format!("\nDid you mean `{}`?", node.path.child(suggestion)));
    }
    CommandLineArgsError::new(message).with_telemetry_message("Unknown command")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::command::{AliasDefinition, NamespaceDefinition, OptionSpec};
    use crate::cli::registry::RegistrationEntry;

    fn noop(description: &str) -> CommandDefinition {
        CommandDefinition::new(description, |_| async { Ok(()) })
    }

    fn parser() -> CliParser {
        let mut registry = CommandRegistry::new("Operator CLI");
        registry
            .define([
                RegistrationEntry::new("kv", NamespaceDefinition::new("Manage KV namespaces")),
                RegistrationEntry::new(
                    "kv list",
                    noop("List namespaces").arg(OptionSpec::boolean("json").describe("Emit JSON")),
                ),
                RegistrationEntry::new(
                    "kv get",
                    noop("Read a key").arg(OptionSpec::positional("key")),
                ),
                RegistrationEntry::new("telemetry", NamespaceDefinition::new("Manage telemetry")),
                RegistrationEntry::new("telemetry status", noop("Show telemetry status")),
                RegistrationEntry::new("metrics", AliasDefinition::new("telemetry")),
                RegistrationEntry::new("dev", noop("Start a local server")),
                RegistrationEntry::new("secret-debug", noop("Internal").hidden()),
            ])
            .unwrap();
        registry.register_namespace("kv").unwrap();
        registry.register_all().unwrap();
        CliParser::new(registry, "opctl", "0.4.2").unwrap()
    }

    fn args(raw: &str) -> Vec<String> {
        raw.split_whitespace().map(str::to_string).collect()
    }

    fn invoke(parser: &CliParser, raw: &str) -> ParsedInvocation {
        match parser.parse(&args(raw)).unwrap() {
            ParseOutcome::Invoke(invocation) => invocation,
            ParseOutcome::Display(text) => panic!("expected invocation, got display:\n{text}"),
        }
    }

    #[test]
    fn test_parse_before_seal_is_rejected() {
        let registry = CommandRegistry::new("Operator CLI");
        let err = CliParser::new(registry, "opctl", "0.4.2").unwrap_err();
        assert_eq!(err, RegistrationError::NotSealed);
    }

    #[test]
    fn test_leaf_resolves_with_options() {
        let parser = parser();
        let invocation = invoke(&parser, "kv list --json");
        assert_eq!(invocation.path.key(), "kv list");
        assert!(matches!(invocation.target, Target::Command(_)));
        assert_eq!(invocation.matches.get_one::<bool>("json"), Some(&true));
    }

    #[test]
    fn test_positional_option() {
        let invocation = invoke(&parser(), "kv get my-key");
        assert_eq!(
            invocation.matches.get_one::<String>("key").map(String::as_str),
            Some("my-key")
        );
    }

    #[test]
    fn test_alias_resolves_to_target() {
        let invocation = invoke(&parser(), "metrics status");
        assert_eq!(invocation.path.key(), "telemetry status");
    }

    #[test]
    fn test_namespace_without_subcommand() {
        let invocation = invoke(&parser(), "kv");
        assert!(matches!(invocation.target, Target::Namespace(_)));
    }

    #[test]
    fn test_root_without_command() {
        let invocation = invoke(&parser(), "");
        assert!(matches!(invocation.target, Target::Root));
        assert!(invocation.path.is_root());
    }

    #[test]
    fn test_unknown_top_level_command() {
        let err = parser().parse(&args("bogus-command")).unwrap_err();
        assert_eq!(err.message(), "Unknown command: bogus-command.");
        assert_eq!(err.telemetry_message(), Some("Unknown command"));
    }

    #[test]
    fn test_unknown_nested_command_suggests() {
        let err = parser().parse(&args("kv lst")).unwrap_err();
        assert!(err.message().starts_with("Unknown command: kv lst."));
        assert!(err.message().contains("Did you mean `kv list`?"));
    }

    #[test]
    fn test_hidden_commands_are_not_suggested() {
        let err = parser().parse(&args("secret-debag")).unwrap_err();
        assert!(!err.message().contains("Did you mean"));
        // but still bound
        let invocation = invoke(&parser(), "secret-debug");
        assert_eq!(invocation.path.key(), "secret-debug");
    }

    #[test]
    fn test_unknown_flag_is_args_error() {
        let err = parser().parse(&args("kv list --nope")).unwrap_err();
        assert!(err.message().contains("--nope"), "{}", err.message());
        assert!(!err.message().starts_with("error:"));
    }

    #[test]
    fn test_help_and_version_are_display() {
        let parser = parser();
        match parser.parse(&args("kv --help")).unwrap() {
            ParseOutcome::Display(text) => assert!(text.contains("list")),
            other => panic!("unexpected {other:?}"),
        }
        match parser.parse(&args("-v")).unwrap() {
            ParseOutcome::Display(text) => assert_eq!(text, "0.4.2"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_hidden_command_absent_from_help() {
        let help = parser().help_for(&CommandPath::root());
        assert!(help.contains("telemetry"));
        assert!(!help.contains("secret-debug"));
    }

    #[test]
    fn test_global_options_collect_every_occurrence() {
        let invocation = invoke(&parser(), "dev --config a.toml --config b.toml -e staging");
        assert_eq!(invocation.global.config.len(), 2);
        assert_eq!(invocation.global.env(), Some("staging"));
    }

    #[test]
    fn test_invalid_log_level() {
        let err = parser().parse(&args("dev --log-level loud")).unwrap_err();
        assert!(err.message().contains("loud"));
    }

    #[test]
    fn test_contextual_help_falls_back_to_known_namespace() {
        let parser = parser();
        let help = parser.contextual_help(&args("kv list --nope"));
        assert!(help.contains("Usage"));
        assert!(help.contains("--json"));
    }
}
