//! Building the clap command tree from the bound namespace tree.

use clap::builder::PossibleValuesParser;
use clap::{Arg, ArgAction, Command, value_parser};

use crate::cli::registry::{Node, NodeKind};
use crate::logging::LOG_LEVELS;

/// Options accepted by every command.
pub(super) fn global_args() -> Vec<Arg> {
    vec![
        Arg::new("cwd")
            .long("cwd")
            .value_name("DIR")
            .help("Run as if opctl was started in DIR instead of the current working directory")
            .action(ArgAction::Append)
            .num_args(1)
            .global(true),
        Arg::new("config")
            .short('c')
            .long("config")
            .value_name("PATH")
            .help("Path to the opctl.toml configuration file")
            .action(ArgAction::Append)
            .num_args(1)
            .global(true),
        Arg::new("env")
            .short('e')
            .long("env")
            .value_name("NAME")
            .help("Environment to use for operations, and for selecting .env files")
            .action(ArgAction::Append)
            .num_args(1)
            .global(true),
        Arg::new("log-level")
            .long("log-level")
            .value_name("LEVEL")
            .help("Verbosity of diagnostic logging")
            .value_parser(PossibleValuesParser::new(LOG_LEVELS.iter().copied()))
            .action(ArgAction::Set)
            .global(true),
        Arg::new("version")
            .short('v')
            .long("version")
            .help("Show version number")
            .action(ArgAction::SetTrue)
            .global(true),
        Arg::new("experimental-json-config")
            .short('j')
            .long("experimental-json-config")
            .help("Experimental: support JSON configuration files [deprecated]")
            .action(ArgAction::Set)
            .value_parser(value_parser!(bool))
            .num_args(0..=1)
            .require_equals(true)
            .default_missing_value("true")
            .default_value("true")
            .hide(true)
            .global(true),
        Arg::new("experimental-provision")
            .long("experimental-provision")
            .alias("x-provision")
            .help("Experimental: automatically provision resources on deploy")
            .action(ArgAction::SetTrue)
            .hide(true)
            .global(true),
    ]
}

/// The root command: global options plus every top-level node.
pub(super) fn root_command(program: &str, root: &Node) -> Command {
    let cmd = Command::new(program.to_string())
        .about(root.metadata().description.clone())
        .disable_version_flag(true)
        .args(global_args());
    attach_children(cmd, root)
}

fn node_command(node: &Node) -> Command {
    let metadata = node.metadata();
    let about = if metadata.deprecated {
        format!("{} [deprecated]", metadata.description)
    } else {
        metadata.description.clone()
    };

    let cmd = Command::new(node.name.clone())
        .about(about)
        .hide(metadata.hidden)
        .aliases(node.aliases.clone());

    match &node.kind {
        NodeKind::Command(def) => def.args.iter().fold(cmd, |cmd, spec| cmd.arg(spec.to_arg())),
        NodeKind::Namespace(_) => attach_children(cmd, node),
    }
}

/// Namespaces accept unknown tokens as external subcommands so the dispatcher
/// can answer with "Unknown command" and a suggestion.
fn attach_children(cmd: Command, node: &Node) -> Command {
    let cmd = cmd
        .allow_external_subcommands(true)
        .disable_help_subcommand(true);
    node.children()
        .iter()
        .fold(cmd, |cmd, child| cmd.subcommand(node_command(child)))
}
