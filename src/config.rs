use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

use crate::pricing::{ModelPrice, PricingTable};
use crate::prompts::{AnalyzeOptions, MAX_NGRAM, StopWords, StopwordLanguage};
use crate::utils::NumberFormatOptions;

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub analysis: AnalysisConfig,
    pub prompts: PromptsConfig,
    pub formatting: FormattingConfig,
    pub logging: LoggingConfig,
    pub pricing: PricingConfig,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(default)]
pub struct AnalysisConfig {
    /// IANA zone for calendar bucketing; empty means the system zone.
    pub timezone: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct PromptsConfig {
    pub min_n: usize,
    pub max_n: usize,
    pub min_count: u64,
    pub remove_stopwords: bool,
    pub limit: usize,
    pub stopword_language: StopwordLanguage,
    pub extra_stopwords: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct FormattingConfig {
    pub number_comma: bool,
    pub number_human: bool,
    pub locale: String,
    pub decimal_places: usize,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(default)]
pub struct PricingConfig {
    pub overrides: BTreeMap<String, ModelPrice>,
}

impl Default for PromptsConfig {
    fn default() -> Self {
        let defaults = AnalyzeOptions::default();
        Self {
            min_n: defaults.min_n,
            max_n: defaults.max_n,
            min_count: defaults.min_count,
            remove_stopwords: defaults.remove_stopwords,
            limit: defaults.limit,
            stopword_language: StopwordLanguage::default(),
            extra_stopwords: Vec::new(),
        }
    }
}

impl Default for FormattingConfig {
    fn default() -> Self {
        Self {
            number_comma: false,
            number_human: false,
            locale: "en".to_string(),
            decimal_places: 2,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
        }
    }
}

/// Reject n-gram ranges the phrase engine cannot serve.
pub fn check_ngram_range(min_n: usize, max_n: usize) -> Result<()> {
    if min_n == 0 {
        anyhow::bail!("min-n must be at least 1");
    }
    if max_n > MAX_NGRAM {
        anyhow::bail!("max-n must be at most {MAX_NGRAM}, got {max_n}");
    }
    if max_n < min_n {
        anyhow::bail!("max-n ({max_n}) must not be smaller than min-n ({min_n})");
    }
    Ok(())
}

impl PromptsConfig {
    pub fn validate(&self) -> Result<()> {
        check_ngram_range(self.min_n, self.max_n)
    }

    pub fn analyze_options(&self) -> AnalyzeOptions {
        AnalyzeOptions {
            min_n: self.min_n,
            max_n: self.max_n,
            min_count: self.min_count,
            remove_stopwords: self.remove_stopwords,
            limit: self.limit,
            stopwords: StopWords::new(self.stopword_language).with_extra(&self.extra_stopwords),
        }
    }
}

impl FormattingConfig {
    pub fn number_format(&self) -> NumberFormatOptions {
        NumberFormatOptions {
            use_comma: self.number_comma,
            use_human: self.number_human,
            locale: self.locale.clone(),
            decimal_places: self.decimal_places,
        }
    }
}

impl PricingConfig {
    pub fn table(&self) -> PricingTable {
        PricingTable::with_overrides(self.overrides.clone())
    }
}

thread_local! {
    static TEST_CONFIG_PATH: RefCell<Option<PathBuf>> = const { RefCell::new(None) };
}

#[cfg(test)]
pub fn set_test_config_path(path: PathBuf) {
    TEST_CONFIG_PATH.with(|p| *p.borrow_mut() = Some(path));
}

impl Config {
    pub fn config_path() -> Result<PathBuf> {
        #[cfg(test)]
        {
            if let Some(path) = TEST_CONFIG_PATH.with(|p| p.borrow().clone()) {
                return Ok(path);
            }
        }

        Ok(dirs::home_dir()
            .context("Could not find home directory")?
            .join(".convostats.toml"))
    }

    pub fn load() -> Result<Option<Config>> {
        let config_path = Self::config_path()?;

        if !config_path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(&config_path).context("Failed to read config file")?;

        let config: Config = toml::from_str(&content).context("Failed to parse config file")?;
        config
            .prompts
            .validate()
            .context("Invalid [prompts] section in config file")?;

        Ok(Some(config))
    }

    pub fn save(&self, silent: bool) -> Result<()> {
        let config_path = Self::config_path()?;
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;

        fs::write(&config_path, content).context("Failed to write config file")?;

        if !silent {
            println!("✅ Configuration saved to: {}", config_path.display());
        }

        Ok(())
    }

    /// Configured zone name, `None` when the system zone should be used.
    pub fn timezone(&self) -> Option<&str> {
        Some(self.analysis.timezone.trim()).filter(|tz| !tz.is_empty())
    }
}

// CLI helper functions
pub fn create_default_config(overwrite: bool) -> Result<()> {
    let config = Config::default();
    if !std::fs::exists(Config::config_path()?)? || overwrite {
        config.save(true)?;

        println!("📝 Created default configuration file.");
        println!("📍 Adjust it with:");
        println!("   convostats config set timezone Europe/Stockholm");
        println!("or");
        println!("   {}", Config::config_path()?.display());
    } else {
        println!("Configuration already exists.  Pass `--overwrite` to overwrite.");
    }

    Ok(())
}

pub fn show_config() -> Result<()> {
    match Config::load()? {
        Some(config) => {
            println!("🔧 Current configuration:");
            println!(
                "   Time Zone: {}",
                config.timezone().unwrap_or("system default")
            );
            println!(
                "   N-gram Range: {}..={}",
                config.prompts.min_n, config.prompts.max_n
            );
            println!("   Min Count: {}", config.prompts.min_count);
            println!("   Result Limit: {}", config.prompts.limit);
            println!("   Remove Stop Words: {}", config.prompts.remove_stopwords);
            println!(
                "   Stop Word Language: {}",
                match config.prompts.stopword_language {
                    StopwordLanguage::Swedish => "sv",
                    StopwordLanguage::English => "en",
                }
            );
            println!("   Number Comma: {}", config.formatting.number_comma);
            println!("   Number Human: {}", config.formatting.number_human);
            println!("   Locale: {}", config.formatting.locale);
            println!("   Decimal Places: {}", config.formatting.decimal_places);
            println!("   Log Level: {}", config.logging.level);
            println!("   Price Overrides: {}", config.pricing.overrides.len());
        }
        None => {
            println!("❌ No configuration file found.");
            println!("   Run 'convostats config init' to create one.");
        }
    }
    Ok(())
}

fn parse_bool(value: &str) -> Result<bool> {
    value
        .parse::<bool>()
        .context("Invalid boolean value. Use 'true' or 'false'")
}

fn parse_count<T: std::str::FromStr>(value: &str) -> Result<T>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    value.parse::<T>().context("Invalid number value")
}

pub fn set_config_value(key: &str, value: &str) -> Result<()> {
    let mut config = Config::load()?.unwrap_or_default();

    match key {
        "timezone" => {
            if !value.is_empty() {
                value
                    .parse::<chrono_tz::Tz>()
                    .map_err(|e| anyhow::anyhow!("Invalid time zone '{value}': {e}"))?;
            }
            config.analysis.timezone = value.to_string();
        }
        "min-n" => config.prompts.min_n = parse_count(value)?,
        "max-n" => config.prompts.max_n = parse_count(value)?,
        "min-count" => config.prompts.min_count = parse_count(value)?,
        "limit" => config.prompts.limit = parse_count(value)?,
        "remove-stopwords" => config.prompts.remove_stopwords = parse_bool(value)?,
        "stopword-language" => {
            config.prompts.stopword_language = match value {
                "sv" => StopwordLanguage::Swedish,
                "en" => StopwordLanguage::English,
                _ => anyhow::bail!("Invalid stop word language. Use 'sv' or 'en'"),
            };
        }
        "extra-stopwords" => {
            config.prompts.extra_stopwords = value
                .split(',')
                .map(str::trim)
                .filter(|w| !w.is_empty())
                .map(str::to_string)
                .collect();
        }
        "number-comma" => config.formatting.number_comma = parse_bool(value)?,
        "number-human" => config.formatting.number_human = parse_bool(value)?,
        "locale" => {
            config.formatting.locale = value.to_string();
        }
        "decimal-places" => config.formatting.decimal_places = parse_count(value)?,
        "log-level" => {
            config.logging.level = value.to_string();
        }
        _ => anyhow::bail!("Unknown config key: {}", key),
    }
    config.prompts.validate()?;

    config.save(false)?;
    Ok(())
}
