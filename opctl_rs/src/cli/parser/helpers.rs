//! Helper functions for command parsing.
//!
//! - Command suggestion via Levenshtein distance
//! - Turning clap errors into [`CommandLineArgsError`]

use strsim::levenshtein;

use crate::errors::CommandLineArgsError;

/// Suggest a similar command name using Levenshtein distance.
/// Returns Some(suggestion) if a close match is found (distance <= 2).
pub(super) fn suggest_similar_command<'a>(
    input: &str,
    candidates: impl IntoIterator<Item = &'a str>,
) -> Option<&'a str> {
    let input_lower = input.to_lowercase();
    let mut best_match: Option<(&str, usize)> = None;

    for cmd in candidates {
        let distance = levenshtein(&input_lower, cmd);
        if distance > 2 {
            continue;
        }
        match best_match {
            Some((_, best_dist)) if distance >= best_dist => {}
            _ => best_match = Some((cmd, distance)),
        }
    }

    best_match.map(|(cmd, _)| cmd)
}

/// First line of clap's rendered error, without the `error: ` prefix.
pub(super) fn args_error_from_clap(err: &clap::Error) -> CommandLineArgsError {
    let rendered = err.render().to_string();
    let first = rendered.lines().next().unwrap_or_default().trim();
    let message = first.strip_prefix("error: ").unwrap_or(first);
    CommandLineArgsError::new(message).with_telemetry_message(format!("{:?}", err.kind()))
}

/// Whether a token is a flag rather than a positional.
pub(super) fn is_flag(token: &str) -> bool {
    token.starts_with('-') && token.len() > 1
}
