//! Layered configuration resolution
//!
//! Settings come from exactly one of four sources, highest priority first:
//!
//! 1. an explicit mapping handed to [`ConfigResolver::with_settings`]
//! 2. an explicit file given to [`ConfigResolver::with_config_path`]
//! 3. the first existing file of the search list
//!    (see [`ConfigResolver::default_search_paths`])
//! 4. `EXCHANGE_*` environment variables
//!
//! The selected source must be complete on its own. Fields are never merged
//! across sources, and an incomplete source is an error rather than a reason
//! to look further down the list.

use crate::error::{ExMailerError, Result};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, info};

pub const ENV_DOMAIN: &str = "EXCHANGE_DOMAIN";
pub const ENV_USER: &str = "EXCHANGE_USER";
pub const ENV_PASS: &str = "EXCHANGE_PASS";
pub const ENV_SERVER: &str = "EXCHANGE_SERVER";
pub const ENV_EMAIL_DOMAIN: &str = "EXCHANGE_EMAIL_DOMAIN";
pub const ENV_AUTH_TYPE: &str = "EXCHANGE_AUTH_TYPE";
pub const ENV_SAVE_COPY: &str = "EXCHANGE_SAVE_COPY";

const NO_SOURCE_HELP: &str = "No configuration source found. Provide settings programmatically, \
pass a config file path, place exmailer.json/exmailer.yaml in the current directory or \
~/.config/exmailer/, or set the EXCHANGE_* environment variables";

/// Authentication scheme used by the transport
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthType {
    #[default]
    Ntlm,
    Basic,
}

impl AuthType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthType::Ntlm => "NTLM",
            AuthType::Basic => "BASIC",
        }
    }
}

impl fmt::Display for AuthType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AuthType {
    type Err = ExMailerError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "NTLM" => Ok(AuthType::Ntlm),
            "BASIC" => Ok(AuthType::Basic),
            _ => Err(ExMailerError::Config(format!(
                "Invalid auth_type '{}'. Valid values: NTLM, BASIC",
                s
            ))),
        }
    }
}

/// Fully resolved connection settings
#[derive(Clone, PartialEq, Eq)]
pub struct Settings {
    domain: String,
    username: String,
    password: String,
    server: String,
    email_domain: String,
    auth_type: AuthType,
    save_copy: bool,
}

impl Settings {
    pub fn domain(&self) -> &str {
        &self.domain
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn password(&self) -> &str {
        &self.password
    }

    pub fn server(&self) -> &str {
        &self.server
    }

    pub fn email_domain(&self) -> &str {
        &self.email_domain
    }

    pub fn auth_type(&self) -> AuthType {
        self.auth_type
    }

    /// Whether a copy of each sent message goes to Sent Items
    pub fn save_copy(&self) -> bool {
        self.save_copy
    }

    /// Down-level logon name, `DOMAIN\user`
    pub fn login_name(&self) -> String {
        format!("{}\\{}", self.domain, self.username)
    }

    /// Mailbox address the messages are sent from
    pub fn primary_address(&self) -> String {
        format!("{}@{}", self.username, self.email_domain)
    }

    pub fn ews_endpoint(&self) -> String {
        format!("https://{}/EWS/Exchange.asmx", self.server)
    }
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("domain", &self.domain)
            .field("username", &self.username)
            .field("password", &"********")
            .field("server", &self.server)
            .field("email_domain", &self.email_domain)
            .field("auth_type", &self.auth_type)
            .field("save_copy", &self.save_copy)
            .finish()
    }
}

/// Where the resolved settings came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    Explicit,
    File(PathBuf),
    Discovered(PathBuf),
    Environment,
}

impl fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigSource::Explicit => f.write_str("programmatic settings"),
            ConfigSource::File(path) => write!(f, "config file {}", path.display()),
            ConfigSource::Discovered(path) => {
                write!(f, "discovered config file {}", path.display())
            }
            ConfigSource::Environment => f.write_str("environment variables"),
        }
    }
}

/// A boolean as it may appear in JSON, YAML, a mapping or the environment
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum BoolLiteral {
    Bool(bool),
    Int(i64),
    Text(String),
}

impl BoolLiteral {
    fn parse(&self, field: &str) -> Result<bool> {
        let invalid = |value: String| ExMailerError::InvalidBoolean {
            field: field.to_string(),
            value,
        };

        match self {
            BoolLiteral::Bool(b) => Ok(*b),
            BoolLiteral::Int(1) => Ok(true),
            BoolLiteral::Int(0) => Ok(false),
            BoolLiteral::Int(n) => Err(invalid(n.to_string())),
            BoolLiteral::Text(s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "yes" | "1" => Ok(true),
                "false" | "no" | "0" => Ok(false),
                _ => Err(invalid(s.clone())),
            },
        }
    }
}

/// Accepted key spellings per field, the first one present wins
const KEY_ALIASES: [(&str, &[&str]); 7] = [
    ("domain", &["domain", "exchange_domain", "ad_domain"]),
    ("username", &["username", "user", "exchange_user"]),
    ("password", &["password", "pass", "exchange_pass"]),
    ("server", &["server", "exchange_server", "host"]),
    ("email_domain", &["email_domain", "domain_name", "smtp_domain"]),
    ("auth_type", &["auth_type", "authentication", "auth"]),
    ("save_copy", &["save_copy", "save", "save_sent"]),
];

/// Environment variables read by [`ConfigResolver::new`]
const ENV_KEYS: [&str; 7] = [
    ENV_DOMAIN,
    ENV_USER,
    ENV_PASS,
    ENV_SERVER,
    ENV_EMAIL_DOMAIN,
    ENV_AUTH_TYPE,
    ENV_SAVE_COPY,
];

/// Rename aliased keys to their field names and drop everything else
fn normalize_keys(mut map: Map<String, Value>) -> Map<String, Value> {
    KEY_ALIASES
        .iter()
        .filter_map(|(field, aliases)| {
            aliases
                .iter()
                .find_map(|alias| map.remove(*alias))
                .map(|value| (field.to_string(), value))
        })
        .collect()
}

/// One source's view of the settings, before validation
#[derive(Debug, Default, Deserialize)]
struct RawSettings {
    #[serde(default)]
    domain: Option<String>,
    #[serde(default)]
    username: Option<String>,
    #[serde(default)]
    password: Option<String>,
    #[serde(default)]
    server: Option<String>,
    #[serde(default)]
    email_domain: Option<String>,
    #[serde(default)]
    auth_type: Option<String>,
    #[serde(default)]
    save_copy: Option<BoolLiteral>,
}

impl RawSettings {
    fn from_map(map: Map<String, Value>) -> serde_json::Result<Self> {
        serde_json::from_value(Value::Object(normalize_keys(map)))
    }

    fn is_empty(&self) -> bool {
        self.domain.is_none()
            && self.username.is_none()
            && self.password.is_none()
            && self.server.is_none()
            && self.email_domain.is_none()
            && self.auth_type.is_none()
            && self.save_copy.is_none()
    }

    fn into_settings(self, source: &ConfigSource) -> Result<Settings> {
        let mut missing = Vec::new();
        let mut required = |name: &str, value: Option<String>| match value {
            Some(v) if !v.trim().is_empty() => v,
            _ => {
                missing.push(name.to_string());
                String::new()
            }
        };

        let domain = required("domain", self.domain);
        let username = required("username", self.username);
        let password = required("password", self.password);
        let server = required("server", self.server);
        let email_domain = required("email_domain", self.email_domain);

        if !missing.is_empty() {
            return Err(ExMailerError::MissingFields {
                origin: source.to_string(),
                fields: missing,
            });
        }

        let auth_type = match self.auth_type.as_deref().map(str::trim) {
            None | Some("") => AuthType::default(),
            Some(value) => value.parse()?,
        };

        let save_copy = match &self.save_copy {
            Some(literal) => literal.parse("save_copy")?,
            None => false,
        };

        Ok(Settings {
            domain,
            username,
            password,
            server,
            email_domain,
            auth_type,
            save_copy,
        })
    }
}

/// Resolves [`Settings`] from the highest-priority non-empty source
#[derive(Debug, Clone)]
pub struct ConfigResolver {
    explicit: Option<Map<String, Value>>,
    config_path: Option<PathBuf>,
    search_paths: Vec<PathBuf>,
    env: HashMap<String, String>,
    home: Option<PathBuf>,
}

impl ConfigResolver {
    /// Resolver over the process environment, current directory and home
    pub fn new() -> Self {
        let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        let home = dirs::home_dir();

        Self {
            explicit: None,
            config_path: None,
            search_paths: Self::default_search_paths(&cwd, home.as_deref()),
            env: ENV_KEYS
                .iter()
                .filter_map(|key| std::env::var(key).ok().map(|value| (key.to_string(), value)))
                .collect(),
            home,
        }
    }

    /// Resolver with no sources at all
    pub fn empty() -> Self {
        Self {
            explicit: None,
            config_path: None,
            search_paths: Vec::new(),
            env: HashMap::new(),
            home: None,
        }
    }

    /// Candidate files probed when no explicit source is given, in order
    pub fn default_search_paths(cwd: &Path, home: Option<&Path>) -> Vec<PathBuf> {
        let mut paths = vec![cwd.join("exmailer.json"), cwd.join("exmailer.yaml")];

        if let Some(home) = home {
            let config_dir = home.join(".config").join("exmailer");
            paths.push(config_dir.join("config.json"));
            paths.push(config_dir.join("config.yaml"));
            paths.push(home.join(".exmailer.json"));
            paths.push(home.join(".exmailer.yaml"));
        }

        paths
    }

    pub fn with_settings<I, K, V>(mut self, entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        let map = entries
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        self.explicit = Some(map);
        self
    }

    pub fn with_config_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_path = Some(path.into());
        self
    }

    pub fn with_search_paths(mut self, paths: Vec<PathBuf>) -> Self {
        self.search_paths = paths;
        self
    }

    pub fn with_env<I, K, V>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.env = vars.into_iter().map(|(k, v)| (k.into(), v.into())).collect();
        self
    }

    /// Produce the settings, or fail naming what is wrong with the chosen source
    pub fn resolve(&self) -> Result<Settings> {
        let (source, raw) = self.select_source()?;
        let settings = raw.into_settings(&source)?;

        info!("Loaded configuration from {}", source);
        debug!("Resolved settings: {:?}", settings);

        Ok(settings)
    }

    fn select_source(&self) -> Result<(ConfigSource, RawSettings)> {
        if let Some(map) = self.explicit.as_ref().filter(|m| !m.is_empty()) {
            let raw = RawSettings::from_map(map.clone()).map_err(|e| {
                ExMailerError::Config(format!("Invalid programmatic settings: {}", e))
            })?;
            return Ok((ConfigSource::Explicit, raw));
        }

        if let Some(path) = &self.config_path {
            let path = self.expand_home(path);
            if !path.is_file() {
                return Err(ExMailerError::Config(format!(
                    "Config file not found: {}",
                    path.display()
                )));
            }
            let raw = load_file(&path)?;
            return Ok((ConfigSource::File(path), raw));
        }

        if let Some(path) = self.search_paths.iter().find(|p| p.is_file()) {
            let raw = load_file(path)?;
            return Ok((ConfigSource::Discovered(path.clone()), raw));
        }

        if let Some(raw) = self.env_settings() {
            return Ok((ConfigSource::Environment, raw));
        }

        Err(ExMailerError::Config(NO_SOURCE_HELP.to_string()))
    }

    fn env_settings(&self) -> Option<RawSettings> {
        let get = |key: &str| {
            self.env
                .get(key)
                .filter(|value| !value.trim().is_empty())
                .cloned()
        };

        let raw = RawSettings {
            domain: get(ENV_DOMAIN),
            username: get(ENV_USER),
            password: get(ENV_PASS),
            server: get(ENV_SERVER),
            email_domain: get(ENV_EMAIL_DOMAIN),
            auth_type: get(ENV_AUTH_TYPE),
            save_copy: get(ENV_SAVE_COPY).map(BoolLiteral::Text),
        };

        if raw.is_empty() {
            None
        } else {
            Some(raw)
        }
    }

    fn expand_home(&self, path: &Path) -> PathBuf {
        match (path.strip_prefix("~"), &self.home) {
            (Ok(rest), Some(home)) => home.join(rest),
            _ => path.to_path_buf(),
        }
    }
}

impl Default for ConfigResolver {
    fn default() -> Self {
        Self::new()
    }
}

/// Read a JSON or YAML settings file, picked by extension
fn load_file(path: &Path) -> Result<RawSettings> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        ExMailerError::Config(format!(
            "Failed to read config file {}: {}",
            path.display(),
            e
        ))
    })?;

    if content.trim().is_empty() {
        return Ok(RawSettings::default());
    }

    let is_yaml = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| matches!(ext.to_ascii_lowercase().as_str(), "yaml" | "yml"))
        .unwrap_or(false);

    let value: Value = if is_yaml {
        serde_yaml::from_str(&content).map_err(|e| {
            ExMailerError::Config(format!("Invalid YAML in {}: {}", path.display(), e))
        })?
    } else {
        serde_json::from_str(&content).map_err(|e| {
            ExMailerError::Config(format!("Invalid JSON in {}: {}", path.display(), e))
        })?
    };

    match value {
        Value::Null => Ok(RawSettings::default()),
        Value::Object(map) => RawSettings::from_map(map).map_err(|e| {
            ExMailerError::Config(format!("Invalid settings in {}: {}", path.display(), e))
        }),
        _ => Err(not_a_mapping(path)),
    }
}

fn not_a_mapping(path: &Path) -> ExMailerError {
    ExMailerError::Config(format!(
        "Invalid configuration in {}: expected a mapping of settings",
        path.display()
    ))
}
