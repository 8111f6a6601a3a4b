use anyhow::{Context, Result};
use datavibe_core::config::{
    ClientConfig, IdentityConfig, API_TIMEOUT_VAR, API_URL_VAR, SUPABASE_ANON_KEY_VAR,
    SUPABASE_URL_VAR,
};
use directories::BaseDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
    User,
    Directory(PathBuf),
}

/// Values from `datavibe.yaml`. Every field is optional; environment
/// variables win over anything set here.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppSettings {
    #[serde(default)]
    pub api_url: Option<String>,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    #[serde(default)]
    pub supabase_url: Option<String>,
    #[serde(default)]
    pub supabase_anon_key: Option<String>,
}

impl AppSettings {
    pub fn client_config(&self) -> ClientConfig {
        self.client_config_with(|name| std::env::var(name).ok())
    }

    pub fn identity_config(&self) -> Option<IdentityConfig> {
        self.identity_config_with(|name| std::env::var(name).ok())
    }

    pub fn client_config_with(&self, env: impl Fn(&str) -> Option<String>) -> ClientConfig {
        ClientConfig::resolve(
            prefer(env(API_URL_VAR), self.api_url.clone()),
            prefer(
                env(API_TIMEOUT_VAR),
                self.timeout_secs.map(|secs| secs.to_string()),
            ),
        )
    }

    pub fn identity_config_with(
        &self,
        env: impl Fn(&str) -> Option<String>,
    ) -> Option<IdentityConfig> {
        IdentityConfig::resolve(
            prefer(env(SUPABASE_URL_VAR), self.supabase_url.clone()),
            prefer(env(SUPABASE_ANON_KEY_VAR), self.supabase_anon_key.clone()),
        )
    }
}

fn prefer(primary: Option<String>, fallback: Option<String>) -> Option<String> {
    primary
        .filter(|value| !value.trim().is_empty())
        .or(fallback)
}

/// Read the first settings file found for `scope`. A missing file yields
/// defaults; an undecodable one is logged and ignored.
pub async fn load_app_settings(scope: &Scope) -> Result<AppSettings> {
    for path in settings_candidates(scope) {
        match tokio::fs::read_to_string(&path).await {
            Ok(contents) => match parse_app_settings(&contents) {
                Ok(settings) => return Ok(settings),
                Err(err) => {
                    warn!(error = ?err, "failed to decode {}", path.display());
                    return Ok(AppSettings::default());
                }
            },
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => continue,
            Err(err) => {
                return Err(err).with_context(|| format!("failed to read {}", path.display()))
            }
        }
    }
    Ok(AppSettings::default())
}

fn parse_app_settings(contents: &str) -> Result<AppSettings> {
    if contents.trim().is_empty() {
        return Ok(AppSettings::default());
    }
    let raw: RawConfig = serde_yaml::from_str(contents)?;
    Ok(raw.app.unwrap_or_default())
}

fn settings_candidates(scope: &Scope) -> Vec<PathBuf> {
    let dir = match scope {
        Scope::User => config_dir(),
        Scope::Directory(path) => path.clone(),
    };
    vec![dir.join("datavibe.yaml"), dir.join("datavibe.yml")]
}

pub fn config_dir() -> PathBuf {
    if let Some(base) = BaseDirs::new() {
        base.config_dir().join("datavibe")
    } else {
        Path::new(".datavibe").to_path_buf()
    }
}

#[derive(Debug, Deserialize)]
struct RawConfig {
    #[serde(default)]
    app: Option<AppSettings>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::time::Duration;
    use tempfile::TempDir;

    fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[tokio::test]
    async fn reads_app_section_from_yaml() {
        let dir = TempDir::new().expect("temp dir");
        std::fs::write(
            dir.path().join("datavibe.yaml"),
            "app:\n  api_url: https://api.example.com/\n  timeout_secs: 5\n  supabase_url: https://demo.supabase.co\n  supabase_anon_key: anon\n",
        )
        .expect("write");

        let settings = load_app_settings(&Scope::Directory(dir.path().to_path_buf()))
            .await
            .expect("load");
        let client = settings.client_config_with(env_from(&[]));
        assert_eq!(client.base_url, "https://api.example.com");
        assert_eq!(client.timeout, Duration::from_secs(5));
        let identity = settings
            .identity_config_with(env_from(&[]))
            .expect("identity configured");
        assert_eq!(identity.url, "https://demo.supabase.co");
    }

    #[tokio::test]
    async fn missing_file_yields_defaults() {
        let dir = TempDir::new().expect("temp dir");
        let settings = load_app_settings(&Scope::Directory(dir.path().to_path_buf()))
            .await
            .expect("load");
        assert_eq!(settings, AppSettings::default());
        assert_eq!(
            settings.client_config_with(env_from(&[])),
            ClientConfig::default()
        );
        assert!(settings.identity_config_with(env_from(&[])).is_none());
    }

    #[tokio::test]
    async fn corrupt_file_is_ignored() {
        let dir = TempDir::new().expect("temp dir");
        std::fs::write(dir.path().join("datavibe.yml"), "app: [unterminated").expect("write");
        let settings = load_app_settings(&Scope::Directory(dir.path().to_path_buf()))
            .await
            .expect("load");
        assert_eq!(settings, AppSettings::default());
    }

    #[test]
    fn environment_takes_precedence() {
        let settings = AppSettings {
            api_url: Some("https://from-file".into()),
            timeout_secs: Some(5),
            supabase_url: Some("https://file.supabase.co".into()),
            supabase_anon_key: Some("file-key".into()),
        };
        let env = env_from(&[
            (API_URL_VAR, "https://from-env"),
            (SUPABASE_URL_VAR, "https://env.supabase.co"),
            (SUPABASE_ANON_KEY_VAR, " "),
        ]);
        let client = settings.client_config_with(&env);
        assert_eq!(client.base_url, "https://from-env");
        assert_eq!(client.timeout, Duration::from_secs(5));

        let identity = settings.identity_config_with(&env).expect("identity");
        assert_eq!(identity.url, "https://env.supabase.co");
        assert_eq!(identity.anon_key, "file-key");
    }
}
