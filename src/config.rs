use anyhow::{anyhow, Result};
use config::Config;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// APNIC extended delegation report
pub const DEFAULT_REGISTRY_FEED_URL: &str =
    "http://www.apnic.net/stats/apnic/delegated-apnic-extended-latest";

/// iCloud Private Relay egress ranges
pub const DEFAULT_VENDOR_FEED_URL: &str = "https://mask-api.icloud.com/egress-ip-ranges.csv";

pub const DEFAULT_COUNTRY_CODE: &str = "JP";

/// Output path, relative to the directory holding the executable
pub const DEFAULT_OUTPUT_PATH: &str = "conf/nginx-ipfilter-jp.conf";

pub const DEFAULT_CLIENT_IDENTIFIER: &str =
    "NGINX-IPFILTER-JP-Client/0.1 (https://github.com/kacchan822/nginx-ipfilter)";

const CONFIG_FILE_NAME: &str = "nginx-ipfilter.toml";

const EXAMPLE_CONFIG: &str = r#"### nginx-ipfilter configuration file

### feeds
# registry_feed_url = "http://www.apnic.net/stats/apnic/delegated-apnic-extended-latest"
# vendor_feed_url = "https://mask-api.icloud.com/egress-ip-ranges.csv"

### two-letter country code to extract
# country_code = "JP"

### allow-list destination; relative paths are resolved against the program directory
# output_path = "conf/nginx-ipfilter-jp.conf"

### User-Agent sent with every feed request
# client_identifier = "NGINX-IPFILTER-JP-Client/0.1 (https://github.com/kacchan822/nginx-ipfilter)"

### "multi" (registry + vendor feed) or "single" (registry feed only)
# variant = "multi"
"#;

/// Which feeds a run pulls from
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PipelineVariant {
    /// Registry delegation feed only
    Single,
    /// Registry delegation feed followed by the vendor egress feed
    #[default]
    Multi,
}

impl fmt::Display for PipelineVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineVariant::Single => write!(f, "single"),
            PipelineVariant::Multi => write!(f, "multi"),
        }
    }
}

impl FromStr for PipelineVariant {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "single" | "single-source" => Ok(PipelineVariant::Single),
            "multi" | "multi-source" => Ok(PipelineVariant::Multi),
            other => Err(format!(
                "Unknown pipeline variant '{}'. Valid variants: single, multi",
                other
            )),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct IpfilterConfig {
    /// URL of the registry delegation report
    pub registry_feed_url: String,

    /// URL of the vendor egress range CSV
    pub vendor_feed_url: String,

    /// Country code records are filtered to (upper case)
    pub target_country_code: String,

    /// Destination of the generated allow-list
    pub output_path: PathBuf,

    /// Value of the User-Agent header on feed requests
    pub client_identifier: String,

    pub variant: PipelineVariant,

    /// Configuration file the values were read from, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config_file: Option<PathBuf>,
}

impl Default for IpfilterConfig {
    fn default() -> Self {
        Self {
            registry_feed_url: DEFAULT_REGISTRY_FEED_URL.to_string(),
            vendor_feed_url: DEFAULT_VENDOR_FEED_URL.to_string(),
            target_country_code: DEFAULT_COUNTRY_CODE.to_string(),
            output_path: resolve_output_path(DEFAULT_OUTPUT_PATH),
            client_identifier: DEFAULT_CLIENT_IDENTIFIER.to_string(),
            variant: PipelineVariant::default(),
            config_file: None,
        }
    }
}

impl IpfilterConfig {
    /// Load the configuration from an optional TOML file and the environment.
    ///
    /// Without an explicit path, `$XDG_CONFIG_HOME/nginx-ipfilter.toml` (or the
    /// platform equivalent) is read when present. Environment variables prefixed
    /// with `IPFILTER_` override file values, e.g. `IPFILTER_COUNTRY_CODE=JP`.
    /// Anything left unset falls back to the built-in defaults.
    pub fn new(path: &Option<String>) -> Result<IpfilterConfig> {
        let mut builder = Config::builder();
        let mut config_file = None;

        match path {
            Some(p) => {
                let path = Path::new(p.as_str());
                if !path.exists() {
                    return Err(anyhow!("Config file {} does not exist", p));
                }
                let path_str = path
                    .to_str()
                    .ok_or_else(|| anyhow!("Could not convert path to string"))?;
                builder = builder.add_source(config::File::with_name(path_str));
                config_file = Some(path.to_path_buf());
            }
            None => {
                if let Some(default_path) = Self::config_file_path() {
                    if default_path.exists() {
                        let path_str = default_path
                            .to_str()
                            .ok_or_else(|| anyhow!("Could not convert path to string"))?;
                        builder = builder.add_source(config::File::with_name(path_str));
                        config_file = Some(default_path);
                    }
                }
            }
        }

        // E.g., `IPFILTER_COUNTRY_CODE=JP ./nginx-ipfilter` sets the country code
        builder = builder.add_source(config::Environment::with_prefix("IPFILTER"));

        let settings = builder
            .build()
            .map_err(|e| anyhow!("Failed to build configuration: {}", e))?;

        let values = settings
            .try_deserialize::<HashMap<String, String>>()
            .map_err(|e| anyhow!("Failed to deserialize configuration: {}", e))?;

        let mut config = Self::from_map(&values)?;
        config.config_file = config_file;
        Ok(config)
    }

    /// Build a configuration from flat key/value settings, applying defaults
    /// for missing keys.
    pub fn from_map(values: &HashMap<String, String>) -> Result<IpfilterConfig> {
        let mut config = IpfilterConfig::default();

        if let Some(url) = values.get("registry_feed_url") {
            config.registry_feed_url = non_empty("registry_feed_url", url)?;
        }
        if let Some(url) = values.get("vendor_feed_url") {
            config.vendor_feed_url = non_empty("vendor_feed_url", url)?;
        }
        if let Some(code) = values.get("country_code") {
            config.target_country_code = parse_country_code(code)?;
        }
        if let Some(path) = values.get("output_path") {
            config.output_path = resolve_output_path(&non_empty("output_path", path)?);
        }
        if let Some(ident) = values.get("client_identifier") {
            config.client_identifier = non_empty("client_identifier", ident)?;
        }
        if let Some(variant) = values.get("variant") {
            config.variant = variant.parse().map_err(|e: String| anyhow!(e))?;
        }

        Ok(config)
    }

    /// Default location of the configuration file, if the platform has a config dir
    pub fn config_file_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join(CONFIG_FILE_NAME))
    }

    /// Commented template listing every recognized key
    pub fn example_config() -> &'static str {
        EXAMPLE_CONFIG
    }

    /// Display configuration summary
    pub fn summary(&self) -> String {
        let config_file = self
            .config_file
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "(none, using defaults)".to_string());
        [
            format!("Config File:        {}", config_file),
            format!("Registry Feed:      {}", self.registry_feed_url),
            format!("Vendor Feed:        {}", self.vendor_feed_url),
            format!("Country Code:       {}", self.target_country_code),
            format!("Output Path:        {}", self.output_path.display()),
            format!("Client Identifier:  {}", self.client_identifier),
            format!("Variant:            {}", self.variant),
        ]
        .join("\n")
    }
}

/// Directory holding the running executable, or `.` when it cannot be determined
pub fn program_dir() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Absolute paths are kept; relative ones are placed under [`program_dir`].
pub fn resolve_output_path(raw: &str) -> PathBuf {
    let path = PathBuf::from(raw);
    if path.is_absolute() {
        path
    } else {
        program_dir().join(path)
    }
}

fn non_empty(key: &str, value: &str) -> Result<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(anyhow!("Configuration value '{}' must not be empty", key));
    }
    Ok(value.to_string())
}

fn parse_country_code(raw: &str) -> Result<String> {
    let code = raw.trim().to_uppercase();
    if code.len() != 2 || !code.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(anyhow!(
            "Invalid country code '{}': expected a two-letter ISO 3166-1 code",
            raw
        ));
    }
    Ok(code)
}
