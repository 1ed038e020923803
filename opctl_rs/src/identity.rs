//! Who the CLI is acting as.
//!
//! The remote API client is an external collaborator; this module only knows
//! how credentials arrive through the environment and how to describe the
//! current identity for `whoami` and authentication-error hints.

use std::sync::Arc;

use anyhow::Result;
use futures::FutureExt;
use futures::future::BoxFuture;

use crate::env::EnvStore;
use crate::output::Output;

/// Credentials supplied through environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnvAuth {
    ApiToken { token: String },
    GlobalKey { key: String, email: String },
}

/// `OPCTL_API_TOKEN` wins over the `OPCTL_API_KEY` + `OPCTL_EMAIL` pair.
pub fn auth_from_env(env: &dyn EnvStore) -> Option<EnvAuth> {
    if let Some(token) = env.get("OPCTL_API_TOKEN").filter(|t| !t.is_empty()) {
        return Some(EnvAuth::ApiToken { token });
    }
    match (env.get("OPCTL_API_KEY"), env.get("OPCTL_EMAIL")) {
        (Some(key), Some(email)) if !key.is_empty() && !email.is_empty() => {
            Some(EnvAuth::GlobalKey { key, email })
        }
        _ => None,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub method: &'static str,
    pub email: Option<String>,
    pub accounts: Vec<Account>,
}

impl Identity {
    /// Print the identity, flagging `account_tag` when it is not accessible.
    pub fn print(&self, output: &Output, account_tag: Option<&str>) {
        match &self.email {
            Some(email) => output.log(&format!(
                "You are logged in with {}, associated with the email {}.",
                self.method, email
            )),
            None => output.log(&format!("You are logged in with {}.", self.method)),
        }
        for account in &self.accounts {
            output.log(&format!("  {} ({})", account.name, account.id));
        }
        if let Some(tag) = account_tag
            && !self.accounts.iter().any(|a| a.id == tag)
        {
            output.warn(&format!(
                "You are trying to use account {tag}, which this identity cannot access."
            ));
        }
    }
}

/// Identity lookup used by `whoami` and by authentication-error recovery.
pub trait IdentityLookup: Send + Sync {
    fn whoami(&self) -> BoxFuture<'_, Result<Option<Identity>>>;
}

/// Identity derived from environment credentials only.
pub struct EnvIdentity {
    env: Arc<dyn EnvStore>,
}

impl EnvIdentity {
    pub fn new(env: Arc<dyn EnvStore>) -> Self {
        Self { env }
    }
}

impl IdentityLookup for EnvIdentity {
    fn whoami(&self) -> BoxFuture<'_, Result<Option<Identity>>> {
        async move {
            let Some(auth) = auth_from_env(self.env.as_ref()) else {
                return Ok(None);
            };
            let (method, email) = match auth {
                EnvAuth::ApiToken { .. } => ("an API Token", self.env.get("OPCTL_EMAIL")),
                EnvAuth::GlobalKey { email, .. } => ("a Global API Key", Some(email)),
            };
            let accounts = self
                .env
                .get("OPCTL_ACCOUNT_ID")
                .filter(|id| !id.is_empty())
                .map(|id| Account {
                    name: "(from OPCTL_ACCOUNT_ID)".to_string(),
                    id,
                })
                .into_iter()
                .collect();
            Ok(Some(Identity {
                method,
                email,
                accounts,
            }))
        }
        .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::MemoryEnv;

    #[test]
    fn test_token_beats_global_key() {
        let env = MemoryEnv::from_pairs([
            ("OPCTL_API_TOKEN", "tok"),
            ("OPCTL_API_KEY", "key"),
            ("OPCTL_EMAIL", "me@example.com"),
        ]);
        assert_eq!(
            auth_from_env(&env),
            Some(EnvAuth::ApiToken {
                token: "tok".into()
            })
        );
    }

    #[test]
    fn test_key_requires_email() {
        let env = MemoryEnv::from_pairs([("OPCTL_API_KEY", "key")]);
        assert_eq!(auth_from_env(&env), None);
    }

    #[tokio::test]
    async fn test_env_identity_lists_account() {
        let env: Arc<dyn EnvStore> = Arc::new(MemoryEnv::from_pairs([
            ("OPCTL_API_TOKEN", "tok"),
            ("OPCTL_ACCOUNT_ID", "abc123"),
        ]));
        let identity = EnvIdentity::new(env).whoami().await.unwrap().unwrap();
        assert_eq!(identity.method, "an API Token");
        assert_eq!(identity.accounts[0].id, "abc123");

        let (output, captured) = Output::captured();
        identity.print(&output, Some("other"));
        assert!(captured.stdout().contains("You are logged in with an API Token."));
        assert!(captured.stderr().contains("account other"));
    }
}
