use crate::cli::command::{AliasDefinition, NamespaceDefinition, ResolvedOptions};
use crate::cli::dispatch::Runtime;
use crate::cli::registry::RegistrationEntry;
use crate::config::ProjectConfig;
use crate::telemetry::{DecisionSource, decide, permission};

use super::runtime_command;

pub(super) fn entries(rt: &Runtime) -> Vec<RegistrationEntry> {
    vec![
        RegistrationEntry::new(
            "telemetry",
            NamespaceDefinition::new("Configure whether opctl collects telemetry"),
        ),
        RegistrationEntry::new(
            "telemetry status",
            runtime_command(rt, "Check whether telemetry collection is enabled", status),
        ),
        RegistrationEntry::new(
            "telemetry enable",
            runtime_command(rt, "Enable telemetry collection", |rt, _| set(rt, true)),
        ),
        RegistrationEntry::new(
            "telemetry disable",
            runtime_command(rt, "Disable telemetry collection", |rt, _| set(rt, false)),
        ),
        RegistrationEntry::new("metrics", AliasDefinition::new("telemetry")),
    ]
}

async fn status(rt: Runtime, opts: ResolvedOptions) -> anyhow::Result<()> {
    let project = match ProjectConfig::read(opts.global.config(), opts.cwd()) {
        Ok(snapshot) => snapshot,
        Err(err) => {
            tracing::debug!("ignoring unreadable project config: {err:#}");
            Default::default()
        }
    };
    let decision = decide(project.config.send_metrics, rt.env.as_ref(), &rt.config_home);

    let state = if decision.enabled { "Enabled" } else { "Disabled" };
    let reason = match decision.source {
        DecisionSource::Environment => {
            " (set by the OPCTL_SEND_METRICS environment variable)".to_string()
        }
        DecisionSource::ProjectConfig => match &project.path {
            Some(path) => format!(" (set by send_metrics in {})", path.display()),
            None => " (set by send_metrics in the project config)".to_string(),
        },
        DecisionSource::UserPermission | DecisionSource::Default => String::new(),
    };
    rt.output.log(&format!("Status: {state}{reason}"));
    rt.output.log("");
    rt.output.log(&format!(
        "To configure telemetry globally on this machine, run `{0} telemetry disable` or `{0} telemetry enable`.",
        rt.program
    ));
    rt.output.log("Set `send_metrics` in opctl.toml to override this for a single project.");
    Ok(())
}

async fn set(rt: Runtime, enabled: bool) -> anyhow::Result<()> {
    permission::write(&rt.config_home, enabled)?;
    if enabled {
        rt.output.success("Status: Enabled");
        rt.output.log(
            "opctl is now collecting telemetry about your usage. Thank you for helping make opctl better.",
        );
    } else {
        rt.output.success("Status: Disabled");
        rt.output.log("opctl is no longer collecting telemetry.");
    }
    Ok(())
}
