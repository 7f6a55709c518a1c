use lk_client::SecretString;
use std::collections::HashMap;
use std::env;
use std::str::FromStr;
use thiserror::Error;

/// Deployment environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Staging => "staging",
            Environment::Production => "production",
        }
    }
}

impl FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "development" => Ok(Environment::Development),
            "staging" => Ok(Environment::Staging),
            "production" => Ok(Environment::Production),
            _ => Err(format!("Invalid environment: {s}")),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid value for {var}: {reason}")]
    InvalidValue { var: String, reason: String },
}

/// Service configuration, loaded once at startup and passed to components
/// explicitly. Never mutated after construction.
#[derive(Debug, Clone)]
pub struct Config {
    pub environment: Environment,
    pub debug: bool,
    pub host: String,
    pub port: u16,

    // Platform connection
    pub livekit_ws_url: String,
    pub livekit_api_url: String,
    pub livekit_api_key: String,
    pub livekit_api_secret: SecretString,

    // Agent dispatch
    pub agent_name: String,
    pub dispatch_cache_ttl_seconds: u64,

    // Security
    pub trusted_hosts: Vec<String>,
    pub max_token_ttl_minutes: i64,
    pub default_token_ttl_minutes: i64,
    pub cors_allow_origins: Vec<String>,
    pub cors_allow_credentials: bool,
    pub cors_allow_methods: Vec<String>,
    pub cors_allow_headers: Vec<String>,

    // Input limits
    pub max_room_name_length: usize,
    pub max_identity_length: usize,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a HashMap (for testing).
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let environment = match vars.get("ENVIRONMENT") {
            Some(v) => v
                .parse()
                .map_err(|reason| ConfigError::InvalidValue {
                    var: "ENVIRONMENT".to_string(),
                    reason,
                })?,
            None => Environment::Development,
        };

        let debug = parse_bool(vars, "DEBUG", false)?;
        let host = vars
            .get("HOST")
            .cloned()
            .unwrap_or_else(|| "0.0.0.0".to_string());
        let port = parse_int::<u16>(vars, "PORT", 8000, 1, u16::MAX as i64)?;

        // Platform credentials are mandatory; refuse to start without them.
        let livekit_ws_url = required_url(vars, "LIVEKIT_WS_URL")?;
        let livekit_api_url = required_url(vars, "LIVEKIT_URL")?;
        let livekit_api_key = required(vars, "LIVEKIT_API_KEY")?;
        let livekit_api_secret = SecretString::from(required(vars, "LIVEKIT_API_SECRET")?);

        let agent_name = vars
            .get("AGENT_NAME")
            .cloned()
            .unwrap_or_else(|| "py-agent".to_string());

        let trusted_hosts = parse_list(vars.get("TRUSTED_HOSTS"));
        let max_token_ttl_minutes = parse_int(vars, "MAX_TOKEN_TTL_MINUTES", 1440, 1, 10_080)?;
        let default_token_ttl_minutes =
            parse_int(vars, "DEFAULT_TOKEN_TTL_MINUTES", 60, 1, 1440)?;

        if default_token_ttl_minutes > max_token_ttl_minutes {
            return Err(ConfigError::InvalidValue {
                var: "DEFAULT_TOKEN_TTL_MINUTES".to_string(),
                reason: format!(
                    "default TTL {default_token_ttl_minutes} exceeds maximum {max_token_ttl_minutes}"
                ),
            });
        }

        let cors_allow_origins = parse_list(vars.get("CORS_ALLOW_ORIGINS"));
        let cors_allow_credentials = parse_bool(vars, "CORS_ALLOW_CREDENTIALS", true)?;
        let cors_allow_methods = parse_list(vars.get("CORS_ALLOW_METHODS"));
        let cors_allow_headers = parse_list(vars.get("CORS_ALLOW_HEADERS"));

        let dispatch_cache_ttl_seconds =
            parse_int::<u64>(vars, "DISPATCH_CACHE_TTL_SECONDS", 3, 1, 60)?;
        let max_room_name_length =
            parse_int::<usize>(vars, "MAX_ROOM_NAME_LENGTH", 100, 1, 255)?;
        let max_identity_length = parse_int::<usize>(vars, "MAX_IDENTITY_LENGTH", 100, 1, 255)?;

        Ok(Config {
            environment,
            debug,
            host,
            port,
            livekit_ws_url,
            livekit_api_url,
            livekit_api_key,
            livekit_api_secret,
            agent_name,
            dispatch_cache_ttl_seconds,
            trusted_hosts,
            max_token_ttl_minutes,
            default_token_ttl_minutes,
            cors_allow_origins,
            cors_allow_credentials,
            cors_allow_methods,
            cors_allow_headers,
            max_room_name_length,
            max_identity_length,
        })
    }

    /// Bind address for the HTTP listener.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn required(vars: &HashMap<String, String>, name: &str) -> Result<String, ConfigError> {
    vars.get(name)
        .filter(|v| !v.trim().is_empty())
        .cloned()
        .ok_or_else(|| ConfigError::MissingEnvVar(name.to_string()))
}

fn required_url(vars: &HashMap<String, String>, name: &str) -> Result<String, ConfigError> {
    let value = required(vars, name)?;
    let valid_scheme = ["ws://", "wss://", "http://", "https://"]
        .iter()
        .any(|scheme| value.starts_with(scheme));
    if !valid_scheme {
        return Err(ConfigError::InvalidValue {
            var: name.to_string(),
            reason: format!("invalid URL format: {value}"),
        });
    }
    Ok(value)
}

fn parse_bool(
    vars: &HashMap<String, String>,
    name: &str,
    default: bool,
) -> Result<bool, ConfigError> {
    match vars.get(name) {
        None => Ok(default),
        Some(v) => match v.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" => Ok(true),
            "false" | "0" | "no" => Ok(false),
            other => Err(ConfigError::InvalidValue {
                var: name.to_string(),
                reason: format!("expected a boolean, got {other:?}"),
            }),
        },
    }
}

fn parse_int<T>(
    vars: &HashMap<String, String>,
    name: &str,
    default: T,
    min: i64,
    max: i64,
) -> Result<T, ConfigError>
where
    T: Copy + TryFrom<i64>,
{
    let raw = match vars.get(name) {
        None => return Ok(default),
        Some(v) => v,
    };

    let parsed: i64 = raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
        var: name.to_string(),
        reason: format!("expected an integer, got {raw:?}"),
    })?;

    if parsed < min || parsed > max {
        return Err(ConfigError::InvalidValue {
            var: name.to_string(),
            reason: format!("{parsed} is outside the allowed range {min}..={max}"),
        });
    }

    T::try_from(parsed).map_err(|_| ConfigError::InvalidValue {
        var: name.to_string(),
        reason: format!("{parsed} does not fit the target type"),
    })
}

/// Parse a comma-separated list, treating `*` (or absence) as the wildcard
/// singleton.
fn parse_list(value: Option<&String>) -> Vec<String> {
    match value {
        None => vec!["*".to_string()],
        Some(v) if v.trim() == "*" => vec!["*".to_string()],
        Some(v) => v
            .split(',')
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .map(str::to_string)
            .collect(),
    }
}
