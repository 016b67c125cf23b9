use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};

use crate::workflows::quotes::{Ruleset, SolarCostFallback};

const DEFAULT_TOKEN_TTL_MINUTES: i64 = 24 * 60;
const DEFAULT_CODE_TTL_MINUTES: i64 = 10;
const DEFAULT_CODE_MAX_ATTEMPTS: u32 = 5;
/// Upper bound for any configured lifetime (one year).
const MAX_TTL_MINUTES: i64 = 365 * 24 * 60;
const DEFAULT_PUBLIC_URL: &str = "http://localhost:5173";
const DEFAULT_MAIL_FROM: &str = "SolarVerify <noreply@solarverify.co.uk>";

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub magic_link: MagicLinkConfig,
    pub mail: MailConfig,
    pub pricing: PricingConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
        let log_format = match env::var("APP_LOG_FORMAT") {
            Ok(raw) => LogFormat::parse(&raw).ok_or(ConfigError::InvalidValue {
                var: "APP_LOG_FORMAT",
                value: raw,
            })?,
            Err(_) => LogFormat::Compact,
        };

        let (signing_secret, secret_generated) = match env::var("APP_TOKEN_SECRET") {
            Ok(secret) if !secret.trim().is_empty() => (secret, false),
            _ if environment == AppEnvironment::Production => {
                return Err(ConfigError::MissingSecret)
            }
            _ => (ephemeral_secret(), true),
        };

        let magic_link = MagicLinkConfig {
            signing_secret,
            secret_generated,
            token_ttl_minutes: ttl_minutes("APP_TOKEN_TTL_MINUTES", DEFAULT_TOKEN_TTL_MINUTES)?,
            public_url: env::var("APP_PUBLIC_URL")
                .unwrap_or_else(|_| DEFAULT_PUBLIC_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            code_ttl_minutes: ttl_minutes("APP_CODE_TTL_MINUTES", DEFAULT_CODE_TTL_MINUTES)?,
            code_max_attempts: attempt_limit("APP_CODE_MAX_ATTEMPTS", DEFAULT_CODE_MAX_ATTEMPTS)?,
        };

        let mail = MailConfig {
            resend_api_key: env::var("RESEND_API_KEY")
                .ok()
                .filter(|key| !key.trim().is_empty()),
            from_address: env::var("APP_MAIL_FROM")
                .unwrap_or_else(|_| DEFAULT_MAIL_FROM.to_string()),
        };

        let ruleset =
            env::var("APP_PRICING_RULESET").unwrap_or_else(|_| Ruleset::CANONICAL.to_string());
        if Ruleset::named(&ruleset).is_none() {
            return Err(ConfigError::UnknownRuleset(ruleset));
        }
        let solar_fallback = match env::var("APP_NEGATIVE_SOLAR_POLICY") {
            Ok(raw) => SolarCostFallback::parse(&raw).ok_or(ConfigError::InvalidValue {
                var: "APP_NEGATIVE_SOLAR_POLICY",
                value: raw,
            })?,
            Err(_) => SolarCostFallback::default(),
        };

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig {
                log_level,
                log_format,
            },
            magic_link,
            mail,
            pricing: PricingConfig {
                ruleset,
                solar_fallback,
            },
        })
    }
}

fn ephemeral_secret() -> String {
    format!(
        "{}{}",
        uuid::Uuid::new_v4().simple(),
        uuid::Uuid::new_v4().simple()
    )
}

fn positive_number(var: &'static str, default: i64) -> Result<i64, ConfigError> {
    match env::var(var) {
        Ok(raw) => match raw.trim().parse::<i64>() {
            Ok(value) if value > 0 => Ok(value),
            _ => Err(ConfigError::InvalidValue { var, value: raw }),
        },
        Err(_) => Ok(default),
    }
}

fn ttl_minutes(var: &'static str, default: i64) -> Result<i64, ConfigError> {
    let minutes = positive_number(var, default)?;
    if minutes > MAX_TTL_MINUTES {
        return Err(ConfigError::InvalidValue {
            var,
            value: minutes.to_string(),
        });
    }
    Ok(minutes)
}

fn attempt_limit(var: &'static str, default: u32) -> Result<u32, ConfigError> {
    let limit = positive_number(var, i64::from(default))?;
    u32::try_from(limit).map_err(|_| ConfigError::InvalidValue {
        var,
        value: limit.to_string(),
    })
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
    pub log_format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Compact,
    Full,
}

impl LogFormat {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Some(Self::Compact),
            "full" => Some(Self::Full),
            _ => None,
        }
    }
}

/// Magic-link and verification-code policy.
#[derive(Clone)]
pub struct MagicLinkConfig {
    pub signing_secret: String,
    /// True when no secret was configured and one was generated for this process.
    pub secret_generated: bool,
    pub token_ttl_minutes: i64,
    pub public_url: String,
    pub code_ttl_minutes: i64,
    pub code_max_attempts: u32,
}

impl fmt::Debug for MagicLinkConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MagicLinkConfig")
            .field("signing_secret", &"<redacted>")
            .field("secret_generated", &self.secret_generated)
            .field("token_ttl_minutes", &self.token_ttl_minutes)
            .field("public_url", &self.public_url)
            .field("code_ttl_minutes", &self.code_ttl_minutes)
            .field("code_max_attempts", &self.code_max_attempts)
            .finish()
    }
}

/// Outbound mail settings. Without an API key the server logs instead of sending.
#[derive(Clone)]
pub struct MailConfig {
    pub resend_api_key: Option<String>,
    pub from_address: String,
}

impl fmt::Debug for MailConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MailConfig")
            .field(
                "resend_api_key",
                &self.resend_api_key.as_ref().map(|_| "<redacted>"),
            )
            .field("from_address", &self.from_address)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct PricingConfig {
    pub ruleset: String,
    pub solar_fallback: SolarCostFallback,
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidValue { var: &'static str, value: String },
    MissingSecret,
    UnknownRuleset(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidValue { var, value } => {
                write!(f, "{var} has an unsupported value '{value}'")
            }
            ConfigError::MissingSecret => {
                write!(f, "APP_TOKEN_SECRET must be set in production")
            }
            ConfigError::UnknownRuleset(name) => {
                write!(f, "APP_PRICING_RULESET '{name}' is not a known ruleset")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            _ => None,
        }
    }
}
