use std::net::IpAddr;

use subtle::ConstantTimeEq;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub host: IpAddr,
    pub port: u16,
    pub base_url: String,
    pub max_body_size: usize,
    pub log_level: String,
    pub admin_credentials: Vec<AdminCredential>,
    pub admin_email: Option<String>,
    pub smtp: Option<SmtpConfig>,
}

/// One entry of the admin allow-list, sourced from ADMIN_CREDENTIALS
/// ("alice:secret,bob:hunter2") at startup.
#[derive(Debug, Clone)]
pub struct AdminCredential {
    pub username: String,
    pub password: String,
}

impl AdminCredential {
    /// Constant-time comparison of both fields.
    pub fn matches(&self, username: &str, password: &str) -> bool {
        let user_ok: bool = self.username.as_bytes().ct_eq(username.as_bytes()).into();
        let pass_ok: bool = self.password.as_bytes().ct_eq(password.as_bytes()).into();
        user_ok && pass_ok
    }
}

#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub pass: String,
    pub from: String,
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        let database_url = env_required("DATABASE_URL")?;
        let jwt_secret = env_required("JWT_SECRET")?;

        let host: IpAddr = env_or("SERVICEDESK_HOST", "0.0.0.0")
            .parse()
            .map_err(|e| format!("Invalid SERVICEDESK_HOST: {e}"))?;

        let port: u16 = env_or("SERVICEDESK_PORT", "3000")
            .parse()
            .map_err(|e| format!("Invalid SERVICEDESK_PORT: {e}"))?;

        let base_url = env_or("SERVICEDESK_BASE_URL", &format!("http://{host}:{port}"));

        let max_body_size: usize = env_or("SERVICEDESK_MAX_BODY_SIZE", "1048576")
            .parse()
            .map_err(|e| format!("Invalid SERVICEDESK_MAX_BODY_SIZE: {e}"))?;

        let log_level = env_or("SERVICEDESK_LOG_LEVEL", "info");

        let admin_credentials = parse_admin_credentials(&env_or("ADMIN_CREDENTIALS", ""))?;

        let admin_email = std::env::var("ADMIN_EMAIL").ok().filter(|s| !s.is_empty());

        let smtp = match (
            std::env::var("SMTP_HOST").ok(),
            std::env::var("SMTP_PORT").ok(),
            std::env::var("SMTP_USER").ok(),
            std::env::var("SMTP_PASS").ok(),
            std::env::var("SMTP_FROM").ok(),
        ) {
            (Some(host), Some(port), Some(user), Some(pass), Some(from)) => Some(SmtpConfig {
                host,
                port: port.parse().map_err(|e| format!("Invalid SMTP_PORT: {e}"))?,
                user,
                pass,
                from,
            }),
            _ => None,
        };

        Ok(Config {
            database_url,
            jwt_secret,
            host,
            port,
            base_url,
            max_body_size,
            log_level,
            admin_credentials,
            admin_email,
            smtp,
        })
    }

    pub fn check_admin_credentials(&self, username: &str, password: &str) -> bool {
        self.admin_credentials
            .iter()
            .any(|cred| cred.matches(username, password))
    }
}

pub fn parse_admin_credentials(raw: &str) -> Result<Vec<AdminCredential>, String> {
    raw.split(',')
        .filter(|s| !s.trim().is_empty())
        .map(|pair| {
            let (username, password) = pair
                .trim()
                .split_once(':')
                .ok_or_else(|| format!("Invalid ADMIN_CREDENTIALS entry '{}'", pair.trim()))?;
            if username.is_empty() || password.is_empty() {
                return Err(format!("Invalid ADMIN_CREDENTIALS entry '{}'", pair.trim()));
            }
            Ok(AdminCredential {
                username: username.to_string(),
                password: password.to_string(),
            })
        })
        .collect()
}

fn env_required(key: &str) -> Result<String, String> {
    std::env::var(key).map_err(|_| format!("Missing required environment variable: {key}"))
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}
