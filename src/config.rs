//! Run configuration
//!
//! Settings come from three layers, highest precedence first:
//! command-line flags, environment (`AWS_PROFILE`, `AWS_REGION`,
//! `AWS_DEFAULT_REGION`), and an optional TOML file. They are resolved once
//! into a validated `RunSettings` before anything talks to AWS.

use crate::error::{CompareError, ConfigError, Result};
use crate::pricing::Discounts;
use crate::region::Region;
use crate::sizing::fudge_factor_from_percent;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

pub const DEFAULT_AWS_DISCOUNT_PERCENT: f64 = 23.0;
pub const DEFAULT_FARGATE_DISCOUNT_PERCENT: f64 = 33.0;
pub const DEFAULT_CPU_FUDGE_PERCENT: f64 = 0.0;

const LOCAL_CONFIG_FILE: &str = ".fargate-compare.toml";

/// Defaults read from the config file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub region: Option<String>,
    pub filename: Option<String>,
    pub cpu_fudge: Option<f64>,
    pub aws_discount: Option<f64>,
    pub fargate_discount: Option<f64>,
}

impl Config {
    /// Load `path`, or the first config found in the usual places
    ///
    /// Looks for `.fargate-compare.toml` in the current directory, then
    /// `<config dir>/fargate-compare/config.toml`. No file means defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = match path {
            Some(p) => p.to_path_buf(),
            None => {
                let local = PathBuf::from(LOCAL_CONFIG_FILE);
                if local.exists() {
                    local
                } else {
                    dirs::config_dir()
                        .map(|d| d.join("fargate-compare").join("config.toml"))
                        .unwrap_or(local)
                }
            }
        };

        if !config_path.exists() {
            if path.is_some() {
                tracing::warn!(
                    "Config file not found: {}, using defaults",
                    config_path.display()
                );
            }
            return Ok(Config::default());
        }

        let content = std::fs::read_to_string(&config_path)?;
        toml::from_str(&content).map_err(|e| {
            ConfigError::ParseError(format!("{}: {}", config_path.display(), e)).into()
        })
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::ParseError(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Config file with every default spelled out
    pub fn with_defaults() -> Self {
        Self {
            region: None,
            filename: None,
            cpu_fudge: Some(DEFAULT_CPU_FUDGE_PERCENT),
            aws_discount: Some(DEFAULT_AWS_DISCOUNT_PERCENT),
            fargate_discount: Some(DEFAULT_FARGATE_DISCOUNT_PERCENT),
        }
    }
}

/// Write a starter config file
pub fn init_config(output: &Path) -> Result<()> {
    Config::with_defaults().save(output)?;
    println!("Created config file: {}", output.display());
    Ok(())
}

/// Values taken from the process environment
#[derive(Debug, Clone, Default)]
pub struct Environment {
    pub profile: Option<String>,
    pub region: Option<String>,
}

impl Environment {
    pub fn from_process() -> Self {
        let var = |name: &str| std::env::var(name).ok().filter(|v| !v.trim().is_empty());
        Self {
            profile: var("AWS_PROFILE"),
            region: var("AWS_REGION").or_else(|| var("AWS_DEFAULT_REGION")),
        }
    }
}

/// Settings given on the command line; `None` means not given
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub filename: Option<String>,
    pub region: Option<String>,
    pub cpu_fudge: Option<f64>,
    pub aws_discount: Option<f64>,
    pub fargate_discount: Option<f64>,
}

/// Fully resolved and validated settings for one run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSettings {
    pub output: PathBuf,
    pub region: Region,
    pub cpu_fudge_percent: f64,
    /// Multiplier derived from `cpu_fudge_percent` (5% -> 1.05)
    pub fudge_factor: f64,
    /// Fractions, not percentages
    pub discounts: Discounts,
}

fn xlsx_suffix() -> &'static Regex {
    static SUFFIX: OnceLock<Regex> = OnceLock::new();
    SUFFIX.get_or_init(|| Regex::new(r"(?i)\.xlsx$").expect("static regex"))
}

/// Append `.xlsx` unless the name already ends in it (any case)
pub fn with_xlsx_suffix(filename: &str) -> String {
    if xlsx_suffix().is_match(filename) {
        filename.to_string()
    } else {
        format!("{}.xlsx", filename)
    }
}

/// Check a 0-100 percentage
pub fn validate_percent(field: &str, value: f64) -> Result<f64> {
    if !value.is_finite() || !(0.0..=100.0).contains(&value) {
        return Err(CompareError::Validation {
            field: field.to_string(),
            reason: format!("must be a percentage between 0 and 100, got {}", value),
        });
    }
    Ok(value)
}

impl RunSettings {
    pub fn resolve(cli: CliOverrides, file: &Config, env: &Environment) -> Result<Self> {
        let region_code = cli
            .region
            .or_else(|| env.region.clone())
            .or_else(|| file.region.clone())
            .ok_or_else(|| ConfigError::MissingField("region (use --region or AWS_REGION)".to_string()))?;
        let region: Region = region_code.parse()?;

        let filename = cli
            .filename
            .or_else(|| file.filename.clone())
            .unwrap_or_else(|| {
                format!("{}-ECS", env.profile.as_deref().unwrap_or("default"))
            });

        let cpu_fudge_percent = validate_percent(
            "cpu_fudge",
            cli.cpu_fudge
                .or(file.cpu_fudge)
                .unwrap_or(DEFAULT_CPU_FUDGE_PERCENT),
        )?;
        let aws_discount = validate_percent(
            "aws_discount",
            cli.aws_discount
                .or(file.aws_discount)
                .unwrap_or(DEFAULT_AWS_DISCOUNT_PERCENT),
        )?;
        let fargate_discount = validate_percent(
            "fargate_discount",
            cli.fargate_discount
                .or(file.fargate_discount)
                .unwrap_or(DEFAULT_FARGATE_DISCOUNT_PERCENT),
        )?;

        Ok(Self {
            output: PathBuf::from(with_xlsx_suffix(&filename)),
            region,
            cpu_fudge_percent,
            fudge_factor: fudge_factor_from_percent(cpu_fudge_percent),
            discounts: Discounts {
                ec2: aws_discount / 100.0,
                fargate: fargate_discount / 100.0,
            },
        })
    }
}
