//! End-to-end CLI tests for the `opctl` binary.

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use tempfile::TempDir;

/// `opctl` with an isolated config home and no inherited credentials.
fn opctl(home: &TempDir) -> Command {
    let mut cmd = cargo_bin_cmd!("opctl");
    cmd.env("OPCTL_CONFIG_HOME", home.path())
        .env("OPCTL_SEND_METRICS", "false")
        .env_remove("OPCTL_METRICS_URL")
        .env_remove("OPCTL_API_TOKEN")
        .env_remove("OPCTL_API_KEY")
        .env_remove("OPCTL_EMAIL")
        .env_remove("OPCTL_ACCOUNT_ID")
        .env_remove("OPCTL_OUTPUT_FILE_PATH")
        .env_remove("OPCTL_OUTPUT_FILE_DIRECTORY")
        .env_remove("OPCTL_CRASH_REPORT_PATH");
    cmd
}

// ============================================
// Basic CLI Tests
// ============================================

mod cli_basics {
    use super::*;

    #[test]
    fn shows_help() {
        let home = TempDir::new().unwrap();
        opctl(&home)
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("opctl"))
            .stdout(predicate::str::contains("telemetry"))
            .stdout(predicate::str::contains("whoami"));
    }

    #[test]
    fn bare_program_prints_root_help() {
        let home = TempDir::new().unwrap();
        opctl(&home)
            .assert()
            .success()
            .stdout(predicate::str::contains("telemetry"));
    }

    #[test]
    fn shows_version() {
        let home = TempDir::new().unwrap();
        opctl(&home)
            .arg("-v")
            .assert()
            .success()
            .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
    }

    #[test]
    fn namespace_without_subcommand_prints_its_help() {
        let home = TempDir::new().unwrap();
        opctl(&home)
            .arg("telemetry")
            .assert()
            .success()
            .stdout(predicate::str::contains("status"))
            .stdout(predicate::str::contains("disable"));
    }
}

// ============================================
// Argument Errors
// ============================================

mod argument_errors {
    use super::*;

    #[test]
    fn unknown_command_fails_with_suggestion() {
        let home = TempDir::new().unwrap();
        opctl(&home)
            .arg("telemetri")
            .assert()
            .failure()
            .code(1)
            .stderr(predicate::str::contains("Unknown command: telemetri."))
            .stderr(predicate::str::contains("Did you mean `telemetry`?"));
    }

    #[test]
    fn repeated_config_is_rejected() {
        let home = TempDir::new().unwrap();
        opctl(&home)
            .args(["telemetry", "status", "--config", "a.toml", "--config", "b.toml"])
            .assert()
            .failure()
            .stderr(predicate::str::contains(
                "Cannot specify `--config` more than once",
            ));
    }

    #[test]
    fn missing_cwd_directory_is_a_user_error() {
        let home = TempDir::new().unwrap();
        opctl(&home)
            .args(["telemetry", "status", "--cwd", "definitely/not/here"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("--cwd does not exist"))
            .stderr(predicate::str::contains("possible bug").not());
    }

    #[test]
    fn invalid_log_level_is_rejected() {
        let home = TempDir::new().unwrap();
        opctl(&home)
            .args(["whoami", "--log-level", "loud"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("loud"));
    }
}

// ============================================
// Built-in Commands
// ============================================

mod builtins {
    use super::*;

    #[test]
    fn telemetry_status_reports_environment_override() {
        let home = TempDir::new().unwrap();
        opctl(&home)
            .args(["telemetry", "status"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Status: Disabled"))
            .stdout(predicate::str::contains("OPCTL_SEND_METRICS"));
    }

    #[test]
    fn malformed_proxy_does_not_block_commands() {
        let home = TempDir::new().unwrap();
        opctl(&home)
            .env("OPCTL_METRICS_URL", "https://metrics.example.com/events")
            .env("HTTPS_PROXY", "http://[::1")
            .env("https_proxy", "http://[::1")
            .arg("whoami")
            .assert()
            .success()
            .stdout(predicate::str::contains("You are not authenticated."));
    }

    #[test]
    fn telemetry_disable_persists_permission() {
        let home = TempDir::new().unwrap();
        opctl(&home)
            .args(["telemetry", "disable"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Status: Disabled"));

        opctl(&home)
            .env_remove("OPCTL_SEND_METRICS")
            .args(["metrics", "status"])
            .current_dir(home.path())
            .assert()
            .success()
            .stdout(predicate::str::contains("Status: Disabled"));
    }

    #[test]
    fn whoami_without_credentials() {
        let home = TempDir::new().unwrap();
        opctl(&home)
            .arg("whoami")
            .assert()
            .success()
            .stdout(predicate::str::contains("You are not authenticated."));
    }

    #[test]
    fn whoami_with_api_token() {
        let home = TempDir::new().unwrap();
        opctl(&home)
            .env("OPCTL_API_TOKEN", "secret-token")
            .arg("whoami")
            .assert()
            .success()
            .stdout(predicate::str::contains("You are logged in with an API Token."))
            .stdout(predicate::str::contains("secret-token").not());
    }

    #[test]
    fn session_recording_writes_output_file() {
        let home = TempDir::new().unwrap();
        let output_file = home.path().join("session.jsonl");
        opctl(&home)
            .env("OPCTL_OUTPUT_FILE_PATH", &output_file)
            .args(["telemetry", "status"])
            .assert()
            .success();

        let recorded = std::fs::read_to_string(&output_file).unwrap();
        assert!(recorded.contains("\"telemetry\""));
        assert!(recorded.contains("\"status\""));
    }
}
