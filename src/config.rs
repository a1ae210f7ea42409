use std::env;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;
use tracing::warn;

pub const DEFAULT_SESSION_SECRET: &str = "calendar-app-secret";
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 10 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{name} has an invalid value '{value}': {reason}")]
    Invalid {
        name: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Clone, Debug)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub from: String,
    pub recipients: Vec<String>,
}

#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub bind_addr: SocketAddr,
    pub session_secret: String,
    pub session_ttl: Duration,
    pub disk_mount_path: PathBuf,
    pub max_upload_bytes: u64,
    pub admin_signup_ip: IpAddr,
    /// `Some` only when email is switched on and fully configured.
    pub smtp: Option<SmtpConfig>,
    pub dispatch_interval: Duration,
    pub dispatch_item_delay: Duration,
    pub seed_demo_data: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: "sqlite://calendar.db?mode=rwc".to_string(),
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 3000)),
            session_secret: DEFAULT_SESSION_SECRET.to_string(),
            session_ttl: Duration::from_secs(86_400),
            disk_mount_path: PathBuf::from("./persistent_uploads"),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            admin_signup_ip: IpAddr::V4(Ipv4Addr::LOCALHOST),
            smtp: None,
            dispatch_interval: Duration::from_secs(60),
            dispatch_item_delay: Duration::from_millis(500),
            seed_demo_data: false,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds the config from any variable source; `from_env` passes the
    /// process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Config::default();
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let session_secret = match get("SESSION_SECRET") {
            Some(secret) => secret,
            None => {
                warn!("SESSION_SECRET is not set; using the built-in development secret");
                defaults.session_secret
            }
        };

        let disk_mount_path = match get("DISK_MOUNT_PATH").or_else(|| get("RENDER_DISK_MOUNT_PATH")) {
            Some(path) => PathBuf::from(path),
            None => {
                warn!(
                    "DISK_MOUNT_PATH is not set; falling back to {}",
                    defaults.disk_mount_path.display()
                );
                defaults.disk_mount_path
            }
        };

        let email_enabled = parse_bool("EMAIL_NOTIFICATIONS_ENABLED", get("EMAIL_NOTIFICATIONS_ENABLED"))?
            .unwrap_or(false);
        let smtp = if email_enabled {
            smtp_from_lookup(&get)?
        } else {
            None
        };

        Ok(Self {
            database_url: get("DATABASE_URL").unwrap_or(defaults.database_url),
            bind_addr: parse("BIND_ADDR", get("BIND_ADDR"))?.unwrap_or(defaults.bind_addr),
            session_secret,
            session_ttl: parse::<u64>("SESSION_TTL_SECS", get("SESSION_TTL_SECS"))?
                .map(Duration::from_secs)
                .unwrap_or(defaults.session_ttl),
            disk_mount_path,
            max_upload_bytes: parse("MAX_UPLOAD_BYTES", get("MAX_UPLOAD_BYTES"))?
                .unwrap_or(defaults.max_upload_bytes),
            admin_signup_ip: parse("ADMIN_SIGNUP_IP", get("ADMIN_SIGNUP_IP"))?
                .unwrap_or(defaults.admin_signup_ip),
            smtp,
            dispatch_interval: parse::<u64>("DISPATCH_INTERVAL_SECS", get("DISPATCH_INTERVAL_SECS"))?
                .map(Duration::from_secs)
                .unwrap_or(defaults.dispatch_interval),
            dispatch_item_delay: parse::<u64>("DISPATCH_ITEM_DELAY_MS", get("DISPATCH_ITEM_DELAY_MS"))?
                .map(Duration::from_millis)
                .unwrap_or(defaults.dispatch_item_delay),
            seed_demo_data: parse_bool("SEED_DEMO_DATA", get("SEED_DEMO_DATA"))?.unwrap_or(false),
        })
    }

    pub fn email_enabled(&self) -> bool {
        self.smtp.is_some()
    }
}

fn smtp_from_lookup<G>(get: &G) -> Result<Option<SmtpConfig>, ConfigError>
where
    G: Fn(&str) -> Option<String>,
{
    let (Some(host), Some(username), Some(password)) =
        (get("EMAIL_HOST"), get("EMAIL_USER"), get("EMAIL_PASS"))
    else {
        warn!("Email notifications are enabled but EMAIL_HOST/EMAIL_USER/EMAIL_PASS are incomplete; email stays disabled");
        return Ok(None);
    };

    let recipients: Vec<String> = get("NOTIFICATION_RECIPIENTS")
        .map(|raw| {
            raw.split(',')
                .map(|r| r.trim().to_string())
                .filter(|r| !r.is_empty())
                .collect()
        })
        .unwrap_or_default();
    if recipients.is_empty() {
        warn!("NOTIFICATION_RECIPIENTS is empty; emails will be skipped");
    }

    let from = get("EMAIL_FROM").unwrap_or_else(|| format!("Calendar App <{}>", username));

    Ok(Some(SmtpConfig {
        host,
        port: parse("EMAIL_PORT", get("EMAIL_PORT"))?.unwrap_or(587),
        username,
        password,
        from,
        recipients,
    }))
}

fn parse<T>(name: &'static str, value: Option<String>) -> Result<Option<T>, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value
        .map(|v| {
            v.trim().parse::<T>().map_err(|e| ConfigError::Invalid {
                name,
                value: v.clone(),
                reason: e.to_string(),
            })
        })
        .transpose()
}

fn parse_bool(name: &'static str, value: Option<String>) -> Result<Option<bool>, ConfigError> {
    value
        .map(|v| match v.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" => Ok(true),
            "false" | "0" | "no" => Ok(false),
            _ => Err(ConfigError::Invalid {
                name,
                value: v.clone(),
                reason: "expected true or false".to_string(),
            }),
        })
        .transpose()
}
