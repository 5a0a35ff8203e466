use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::cli::CliArgs;
use crate::github::client::DEFAULT_API_URL;
use crate::sync::{SyncOptions, MAX_DAYS};

pub const TOKEN_ENV: &str = "GITHUB_TOKEN";
pub const DEFAULT_PROJECT_ID: &str = "PVT_kwHOAF93fM4Axts3";
pub const DEFAULT_DAYS: u32 = 30;
pub const DEFAULT_INBOX_OPTION: &str = "Inbox";

#[derive(Debug, Deserialize, Default)]
pub struct AppConfig {
    pub github: Option<GitHubConfig>,
    pub sync: Option<SyncConfig>,
}

#[derive(Debug, Deserialize, Default)]
pub struct GitHubConfig {
    pub token: Option<String>,
    pub api_url: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
pub struct SyncConfig {
    pub project_id: Option<String>,
    pub days: Option<u32>,
    pub status_field: Option<String>,
    pub inbox_option: Option<String>,
}

/// Fully resolved run settings. The token lives here and nowhere else.
#[derive(Debug)]
pub struct Settings {
    pub token: String,
    pub api_url: String,
    pub sync: SyncOptions,
}

fn config_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".inbox-sync")
        .join("config.toml")
}

pub fn load_config() -> Result<AppConfig> {
    load_config_from(&config_path())
}

pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    if !path.exists() {
        return Ok(AppConfig::default());
    }
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config from {}", path.display()))?;
    let config: AppConfig = toml::from_str(&contents)
        .with_context(|| format!("Failed to parse {}", path.display()))?;
    Ok(config)
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

impl AppConfig {
    /// Merge file values, CLI overrides and the environment token.
    /// Precedence: CLI, then config file, then environment, then defaults.
    pub fn resolve(self, args: &CliArgs, env_token: Option<String>) -> Result<Settings> {
        let github = self.github.unwrap_or_default();
        let sync = self.sync.unwrap_or_default();

        let Some(token) = non_empty(github.token).or_else(|| non_empty(env_token)) else {
            bail!("No GitHub token. Set github.token in ~/.inbox-sync/config.toml or export {TOKEN_ENV}");
        };

        let project_id = non_empty(args.project.clone())
            .or_else(|| non_empty(sync.project_id))
            .unwrap_or_else(|| DEFAULT_PROJECT_ID.to_string());

        let days = args.days.or(sync.days).unwrap_or(DEFAULT_DAYS);
        if days > MAX_DAYS {
            bail!("sync.days must be at most {MAX_DAYS}, got {days}");
        }

        Ok(Settings {
            token,
            api_url: non_empty(github.api_url).unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            sync: SyncOptions {
                project_id,
                days,
                status_field: non_empty(sync.status_field),
                inbox_option: non_empty(sync.inbox_option)
                    .unwrap_or_else(|| DEFAULT_INBOX_OPTION.to_string()),
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config_from(&dir.path().join("config.toml")).unwrap();
        assert!(config.github.is_none());
        assert!(config.sync.is_none());
    }

    #[test]
    fn parses_full_config() {
        let file = write_config(
            r#"
[github]
token = "ghp_file"
api_url = "https://ghe.example.com/api"

[sync]
project_id = "PVT_file"
days = 7
status_field = "Stage"
inbox_option = "Triage"
"#,
        );
        let settings = load_config_from(file.path())
            .unwrap()
            .resolve(&CliArgs::default(), None)
            .unwrap();
        assert_eq!(settings.token, "ghp_file");
        assert_eq!(settings.api_url, "https://ghe.example.com/api");
        assert_eq!(settings.sync.project_id, "PVT_file");
        assert_eq!(settings.sync.days, 7);
        assert_eq!(settings.sync.status_field.as_deref(), Some("Stage"));
        assert_eq!(settings.sync.inbox_option, "Triage");
    }

    #[test]
    fn invalid_toml_is_an_error() {
        let file = write_config("[sync]\ndays = \"thirty\"\n");
        let err = load_config_from(file.path()).unwrap_err();
        assert!(err.to_string().contains("Failed to parse"));
    }

    #[test]
    fn env_token_and_defaults_fill_gaps() {
        let settings = AppConfig::default()
            .resolve(&CliArgs::default(), Some("ghp_env".into()))
            .unwrap();
        assert_eq!(settings.token, "ghp_env");
        assert_eq!(settings.api_url, DEFAULT_API_URL);
        assert_eq!(settings.sync.project_id, DEFAULT_PROJECT_ID);
        assert_eq!(settings.sync.days, DEFAULT_DAYS);
        assert_eq!(settings.sync.status_field, None);
        assert_eq!(settings.sync.inbox_option, "Inbox");
    }

    #[test]
    fn file_token_beats_env_token() {
        let config = AppConfig {
            github: Some(GitHubConfig {
                token: Some("ghp_file".into()),
                api_url: None,
            }),
            sync: None,
        };
        let settings = config
            .resolve(&CliArgs::default(), Some("ghp_env".into()))
            .unwrap();
        assert_eq!(settings.token, "ghp_file");
    }

    #[test]
    fn blank_tokens_count_as_missing() {
        let config = AppConfig {
            github: Some(GitHubConfig {
                token: Some("  ".into()),
                api_url: None,
            }),
            sync: None,
        };
        let err = config
            .resolve(&CliArgs::default(), Some(String::new()))
            .unwrap_err();
        assert!(err.to_string().contains(TOKEN_ENV));
    }

    #[test]
    fn oversized_days_in_file_is_rejected() {
        let file = write_config("[sync]\ndays = 4000000000\n");
        let err = load_config_from(file.path())
            .unwrap()
            .resolve(&CliArgs::default(), Some("t".into()))
            .unwrap_err();
        assert!(err.to_string().contains("at most 36500"));
    }

    #[test]
    fn cli_overrides_file() {
        let config = AppConfig {
            github: None,
            sync: Some(SyncConfig {
                project_id: Some("PVT_file".into()),
                days: Some(7),
                ..Default::default()
            }),
        };
        let args = CliArgs {
            project: Some("PVT_cli".into()),
            days: Some(3),
            help: false,
        };
        let settings = config.resolve(&args, Some("t".into())).unwrap();
        assert_eq!(settings.sync.project_id, "PVT_cli");
        assert_eq!(settings.sync.days, 3);
    }
}
