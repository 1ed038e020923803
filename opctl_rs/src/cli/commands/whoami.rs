use crate::cli::command::{OptionSpec, ResolvedOptions};
use crate::cli::dispatch::Runtime;
use crate::cli::registry::RegistrationEntry;

use super::runtime_command;

pub(super) fn entries(rt: &Runtime) -> Vec<RegistrationEntry> {
    vec![RegistrationEntry::new(
        "whoami",
        runtime_command(rt, "Retrieve your user information", whoami).arg(
            OptionSpec::string("account")
                .requires_arg()
                .describe("Show membership information for the given account (id or name)"),
        ),
    )]
}

async fn whoami(rt: Runtime, opts: ResolvedOptions) -> anyhow::Result<()> {
    match rt.identity.whoami().await? {
        Some(identity) => identity.print(&rt.output, opts.get_string("account").as_deref()),
        None => rt.output.log(
            "You are not authenticated. Set OPCTL_API_TOKEN, or OPCTL_API_KEY and OPCTL_EMAIL, to authenticate.",
        ),
    }
    Ok(())
}
