use secrecy::SecretString;
use serde::Deserialize;
use service_core::config as core_config;
use service_core::error::AppError;
use std::env;
use std::str::FromStr;

#[derive(Debug, Clone, Deserialize)]
pub struct DirectoryConfig {
    #[serde(flatten)]
    pub common: core_config::Config,
    pub environment: Environment,
    pub service_name: String,
    pub service_version: String,
    pub log_level: String,
    pub otlp_endpoint: Option<String>,
    pub mongodb: MongoConfig,
    pub identity: IdentityConfig,
    pub smtp: SmtpConfig,
    pub workflow: WorkflowConfig,
    pub security: SecurityConfig,
    pub swagger: SwaggerConfig,
    pub rate_limit: RateLimitConfig,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Dev,
    Prod,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MongoConfig {
    pub uri: String,
    pub database: String,
    pub timeout_seconds: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IdentityConfig {
    pub endpoint: String,
    pub project_id: String,
    pub api_key: SecretString,
    pub timeout_seconds: u64,
    pub max_retries: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SmtpConfig {
    pub enabled: bool,
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: SecretString,
    pub from_email: String,
    pub from_name: String,
    pub timeout_seconds: u64,
    pub max_retries: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WorkflowConfig {
    pub admin_email: String,
    pub app_base_url: String,
    pub phone_country_code: String,
    pub diocese_data_path: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SecurityConfig {
    pub allowed_origins: Vec<String>,
    pub session_cookie_secure: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SwaggerConfig {
    pub enabled: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitConfig {
    pub signup_attempts: u32,
    pub signup_window_seconds: u64,
    pub login_attempts: u32,
    pub login_window_seconds: u64,
    pub global_ip_limit: u32,
    pub global_ip_window_seconds: u64,
}

impl DirectoryConfig {
    pub fn from_env() -> Result<Self, AppError> {
        let common_config = core_config::Config::load()?;

        let env_str = env::var("ENVIRONMENT").unwrap_or_else(|_| "dev".to_string());
        let environment: Environment = env_str
            .parse()
            .map_err(|e: String| AppError::ConfigError(anyhow::anyhow!(e)))?;

        let is_prod = environment == Environment::Prod;

        let config = DirectoryConfig {
            common: common_config,
            environment: environment.clone(),
            service_name: get_env("SERVICE_NAME", Some("directory-service"), is_prod)?,
            service_version: get_env("SERVICE_VERSION", Some(env!("CARGO_PKG_VERSION")), is_prod)?,
            log_level: get_env("LOG_LEVEL", Some("info"), is_prod)?,
            otlp_endpoint: get_optional_env("OTLP_ENDPOINT"),
            mongodb: MongoConfig {
                uri: get_env("MONGODB_URI", Some("mongodb://localhost:27017"), is_prod)?,
                database: get_env("MONGODB_DATABASE", Some("diocese_directory"), is_prod)?,
                timeout_seconds: parse_env("MONGODB_TIMEOUT_SECONDS", "5", is_prod)?,
            },
            identity: IdentityConfig {
                endpoint: get_env("IDENTITY_ENDPOINT", Some("http://localhost/v1"), is_prod)?
                    .trim_end_matches('/')
                    .to_string(),
                project_id: get_env("IDENTITY_PROJECT_ID", Some("directory-dev"), is_prod)?,
                api_key: SecretString::new(get_env("IDENTITY_API_KEY", Some(""), is_prod)?),
                timeout_seconds: parse_env("IDENTITY_TIMEOUT_SECONDS", "10", is_prod)?,
                max_retries: parse_env("IDENTITY_MAX_RETRIES", "2", is_prod)?,
            },
            smtp: SmtpConfig {
                enabled: parse_env("SMTP_ENABLED", "false", is_prod)?,
                host: get_env("SMTP_HOST", Some("smtp.gmail.com"), is_prod)?,
                port: parse_env("SMTP_PORT", "587", is_prod)?,
                user: get_env("SMTP_USER", Some(""), is_prod)?,
                password: SecretString::new(get_env("SMTP_PASSWORD", Some(""), is_prod)?),
                from_email: get_env("SMTP_FROM_EMAIL", Some("no-reply@localhost"), is_prod)?,
                from_name: get_env("SMTP_FROM_NAME", Some("Diocese Directory"), is_prod)?,
                timeout_seconds: parse_env("SMTP_TIMEOUT_SECONDS", "10", is_prod)?,
                max_retries: parse_env("EMAIL_MAX_RETRIES", "0", is_prod)?,
            },
            workflow: WorkflowConfig {
                admin_email: get_env("ADMIN_EMAIL", Some("admin@localhost"), is_prod)?,
                app_base_url: get_env("APP_BASE_URL", Some("http://localhost:3000"), is_prod)?
                    .trim_end_matches('/')
                    .to_string(),
                phone_country_code: get_env("PHONE_COUNTRY_CODE", Some("+91"), is_prod)?,
                diocese_data_path: get_optional_env("DIOCESE_DATA_PATH"),
            },
            security: SecurityConfig {
                allowed_origins: get_env(
                    "ALLOWED_ORIGINS",
                    Some("http://localhost:3000"),
                    is_prod,
                )?
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
                session_cookie_secure: parse_env("SESSION_COOKIE_SECURE", "false", is_prod)?,
            },
            swagger: SwaggerConfig {
                enabled: parse_env("ENABLE_SWAGGER", "true", is_prod)?,
            },
            rate_limit: RateLimitConfig {
                signup_attempts: parse_env("RATE_LIMIT_SIGNUP_ATTEMPTS", "5", is_prod)?,
                signup_window_seconds: parse_env("RATE_LIMIT_SIGNUP_WINDOW_SECONDS", "3600", is_prod)?,
                login_attempts: parse_env("RATE_LIMIT_LOGIN_ATTEMPTS", "10", is_prod)?,
                login_window_seconds: parse_env("RATE_LIMIT_LOGIN_WINDOW_SECONDS", "300", is_prod)?,
                global_ip_limit: parse_env("RATE_LIMIT_GLOBAL_IP_LIMIT", "300", is_prod)?,
                global_ip_window_seconds: parse_env(
                    "RATE_LIMIT_GLOBAL_IP_WINDOW_SECONDS",
                    "60",
                    is_prod,
                )?,
            },
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if self.common.port == 0 {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "PORT must be greater than 0"
            )));
        }

        if self.workflow.admin_email.trim().is_empty() {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "ADMIN_EMAIL must not be empty"
            )));
        }

        let base = &self.workflow.app_base_url;
        if !(base.starts_with("http://") || base.starts_with("https://")) {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "APP_BASE_URL must be an absolute http(s) URL, got '{}'",
                base
            )));
        }

        if !self.workflow.phone_country_code.starts_with('+') {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "PHONE_COUNTRY_CODE must start with '+'"
            )));
        }

        if self.environment == Environment::Prod {
            if self.security.allowed_origins.iter().any(|o| o == "*") {
                return Err(AppError::ConfigError(anyhow::anyhow!(
                    "Wildcard CORS origin not allowed in production"
                )));
            }

            if !self.security.session_cookie_secure {
                tracing::warn!("SESSION_COOKIE_SECURE is off in production");
            }

            if self.swagger.enabled {
                tracing::warn!("Swagger UI is publicly accessible in production");
            }
        }

        Ok(())
    }
}

fn get_env(key: &str, default: Option<&str>, is_prod: bool) -> Result<String, AppError> {
    match env::var(key) {
        Ok(val) => Ok(val),
        Err(_) => {
            if is_prod {
                Err(AppError::ConfigError(anyhow::anyhow!(format!(
                    "{} is required in production but not set",
                    key
                ))))
            } else if let Some(def) = default {
                Ok(def.to_string())
            } else {
                Err(AppError::ConfigError(anyhow::anyhow!(format!(
                    "{} is required but not set",
                    key
                ))))
            }
        }
    }
}

fn get_optional_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_env<T>(key: &str, default: &str, is_prod: bool) -> Result<T, AppError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    parse_value(key, &get_env(key, Some(default), is_prod)?)
}

fn parse_value<T>(key: &str, raw: &str) -> Result<T, AppError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim().parse().map_err(|e: T::Err| {
        AppError::ConfigError(anyhow::anyhow!("Invalid value for {}: {}", key, e))
    })
}

impl FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "dev" => Ok(Environment::Dev),
            "prod" => Ok(Environment::Prod),
            _ => Err(format!("Invalid environment: {}", s)),
        }
    }
}
