use crate::formatter::DEFAULT_DATE_FORMAT;
use crate::planner::{BatchOptions, LogOptions};
use crate::sanitize::InvalidCharPolicy;
use crate::txlog::{LogMode, DEFAULT_LOG_FILE_NAME, DEFAULT_SEPARATOR};
use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub separator: String,
    pub log_file_name: String,
    pub date_format: String,
    pub require_file_exist: bool,
    pub restrict: InvalidCharPolicy,
    pub append_log: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            separator: DEFAULT_SEPARATOR.to_string(),
            log_file_name: DEFAULT_LOG_FILE_NAME.to_string(),
            date_format: DEFAULT_DATE_FORMAT.to_string(),
            require_file_exist: true,
            restrict: InvalidCharPolicy::Auto,
            append_log: false,
        }
    }
}

impl AppConfig {
    pub fn batch_options(&self) -> BatchOptions {
        BatchOptions {
            log: LogOptions {
                enabled: true,
                file_name: self.log_file_name.clone(),
                separator: self.separator.clone(),
                mode: if self.append_log {
                    LogMode::Append
                } else {
                    LogMode::Overwrite
                },
            },
            date_format: self.date_format.clone(),
            require_file_exist: self.require_file_exist,
            restrict: self.restrict,
            ..BatchOptions::default()
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppPaths {
    pub config_dir: PathBuf,
    pub config_path: PathBuf,
}

pub fn app_paths() -> Result<AppPaths> {
    let proj = ProjectDirs::from("com", "batch-renamer", "batch-renamer")
        .context("OS標準設定ディレクトリを取得できませんでした")?;
    let config_dir = proj.config_dir().to_path_buf();
    Ok(AppPaths {
        config_path: config_dir.join("config.toml"),
        config_dir,
    })
}

pub fn load_config() -> Result<AppConfig> {
    let paths = app_paths()?;
    if !paths.config_path.exists() {
        return Ok(AppConfig::default());
    }

    let raw = fs::read_to_string(&paths.config_path).with_context(|| {
        format!(
            "設定ファイルを読めませんでした: {}",
            paths.config_path.display()
        )
    })?;

    parse_config(&raw)
}

pub fn parse_config(raw: &str) -> Result<AppConfig> {
    toml::from_str::<AppConfig>(raw).context("設定ファイルのパースに失敗しました")
}

pub fn save_config(config: &AppConfig) -> Result<PathBuf> {
    let paths = app_paths()?;
    fs::create_dir_all(&paths.config_dir).with_context(|| {
        format!(
            "設定ディレクトリを作成できませんでした: {}",
            paths.config_dir.display()
        )
    })?;
    let body = toml::to_string_pretty(config).context("設定のシリアライズに失敗しました")?;
    fs::write(&paths.config_path, body).with_context(|| {
        format!(
            "設定ファイルを書き込めませんでした: {}",
            paths.config_path.display()
        )
    })?;
    Ok(paths.config_path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_config_fills_defaults() {
        let config = parse_config("separator = \";\"\nrestrict = \"windows\"\n").expect("parse");
        assert_eq!(config.separator, ";");
        assert_eq!(config.restrict, InvalidCharPolicy::Windows);
        assert_eq!(config.log_file_name, DEFAULT_LOG_FILE_NAME);
        assert!(config.require_file_exist);
    }

    #[test]
    fn config_round_trips_through_toml() {
        let config = AppConfig {
            append_log: true,
            ..AppConfig::default()
        };
        let body = toml::to_string_pretty(&config).expect("serialize");
        assert_eq!(parse_config(&body).expect("parse"), config);
    }

    #[test]
    fn batch_options_carry_config_values() {
        let config = AppConfig {
            separator: "#".to_string(),
            append_log: true,
            require_file_exist: false,
            ..AppConfig::default()
        };
        let options = config.batch_options();
        assert_eq!(options.log.separator, "#");
        assert_eq!(options.log.mode, LogMode::Append);
        assert!(!options.require_file_exist);
        assert!(options.template.is_none());
    }

    #[test]
    fn unknown_restrict_value_is_rejected() {
        let err = parse_config("restrict = \"dos\"\n").expect_err("must fail");
        assert!(err.to_string().contains("設定ファイルのパースに失敗しました"));
    }
}
