use std::env::VarError;
use std::path::PathBuf;

use super::{ConfigError, SiteConfig};
use crate::publish::S3Settings;
use crate::scrapers::http_scraper::DEFAULT_USER_AGENT;

#[derive(Debug, Clone)]
pub struct Settings {
    pub site: SiteConfig,
    pub concurrency: usize,
    pub user_agent: String,
    pub brand_id: i64,
    pub archive_after_import: bool,
    /// Import is skipped when unset.
    pub database_url: Option<String>,
    /// Upload is skipped when unset.
    pub s3: Option<S3Settings>,
}

/// Loads `.env` (if present) and builds settings from the process environment.
pub fn load_settings() -> Result<Settings, ConfigError> {
    dotenvy::dotenv().ok();
    build_settings(|key| std::env::var(key))
}

/// Builds settings from an arbitrary variable lookup so tests can use a map.
pub fn build_settings<F>(lookup: F) -> Result<Settings, ConfigError>
where
    F: Fn(&str) -> Result<String, VarError>,
{
    let optional = |var: &str| -> Option<String> {
        lookup(var).ok().map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
    };

    let parse_usize = |var: &str| -> Result<Option<usize>, ConfigError> {
        optional(var)
            .map(|raw| {
                raw.parse::<usize>().map_err(|e| ConfigError::InvalidEnvVar {
                    var: var.to_string(),
                    reason: e.to_string(),
                })
            })
            .transpose()
    };

    let mut site = match optional("BEADCRAWL_SITE_CONFIG") {
        Some(path) => SiteConfig::load(path)?,
        None => SiteConfig::preset(
            &optional("BEADCRAWL_SITE").unwrap_or_else(|| "miyuki_directory".to_string()),
        )?,
    };

    if let Some(output) = optional("BEADCRAWL_OUTPUT") {
        site.output_path = PathBuf::from(output);
    }
    if let Some(max_pages) = parse_usize("BEADCRAWL_MAX_PAGES")? {
        if max_pages == 0 {
            return Err(ConfigError::InvalidEnvVar {
                var: "BEADCRAWL_MAX_PAGES".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        site.max_pages = Some(max_pages);
    }

    let concurrency = parse_usize("BEADCRAWL_CONCURRENCY")?.unwrap_or(8).max(1);
    let user_agent =
        optional("BEADCRAWL_USER_AGENT").unwrap_or_else(|| DEFAULT_USER_AGENT.to_string());

    let brand_id = match optional("BEADCRAWL_BRAND_ID") {
        Some(raw) => raw.parse::<i64>().map_err(|e| ConfigError::InvalidEnvVar {
            var: "BEADCRAWL_BRAND_ID".to_string(),
            reason: e.to_string(),
        })?,
        None => 1,
    };

    let archive_after_import = match optional("BEADCRAWL_ARCHIVE_AFTER_IMPORT") {
        Some(raw) => parse_bool("BEADCRAWL_ARCHIVE_AFTER_IMPORT", &raw)?,
        None => false,
    };

    Ok(Settings {
        site,
        concurrency,
        user_agent,
        brand_id,
        archive_after_import,
        database_url: optional("DATABASE_URL"),
        s3: S3Settings::from_lookup(&lookup),
    })
}

fn parse_bool(var: &str, raw: &str) -> Result<bool, ConfigError> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: format!("expected a boolean, got `{}`", other),
        }),
    }
}
