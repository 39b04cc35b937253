use std::str::FromStr;

use anyhow::Context;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
    /// Tokens with fewer seconds than this left are reissued by the session layer.
    pub renew_threshold_seconds: i64,
    pub renewed_ttl_minutes: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub from_name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub jwt: JwtConfig,
    pub smtp: SmtpConfig,
    pub frontend_url: String,
    pub cors_origins: Vec<String>,
    pub cookie_secure: bool,
    pub session_idle_minutes: i64,
    pub admin_role_id: i32,
    pub default_role_id: i32,
    pub verification_ttl_minutes: i64,
    pub reset_ttl_minutes: i64,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get_or = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let database_url = match lookup("DATABASE_URL") {
            Some(url) => url,
            None => format!(
                "postgres://{}:{}@{}:{}/{}",
                lookup("PG_USER").context("DATABASE_URL or PG_USER must be set")?,
                get_or("PG_PASSWORD", ""),
                get_or("PG_HOST", "localhost"),
                parsed_or(&lookup, "PG_PORT", 5432u16),
                lookup("PG_DATABASE").context("DATABASE_URL or PG_DATABASE must be set")?,
            ),
        };

        let jwt = JwtConfig {
            secret: lookup("JWT_SECRET").context("JWT_SECRET must be set")?,
            issuer: get_or("JWT_ISSUER", "accounts"),
            audience: get_or("JWT_AUDIENCE", "accounts-users"),
            ttl_minutes: parsed_or(&lookup, "JWT_TTL_MINUTES", 60 * 24 * 30),
            renew_threshold_seconds: parsed_or(&lookup, "JWT_RENEW_THRESHOLD_SECONDS", 180),
            renewed_ttl_minutes: parsed_or(&lookup, "JWT_RENEWED_TTL_MINUTES", 10),
        };

        let smtp = SmtpConfig {
            host: get_or("SMTP_HOST", "smtp.gmail.com"),
            port: parsed_or(&lookup, "SMTP_PORT", 465),
            username: get_or("EMAIL_USER", ""),
            password: get_or("EMAIL_PASS", ""),
            from_name: get_or("MAIL_FROM_NAME", "Support"),
        };

        let cors_origins = get_or("CORS_ORIGINS", "http://localhost:5173")
            .split(',')
            .map(str::trim)
            .filter(|o| !o.is_empty())
            .map(String::from)
            .collect();

        Ok(Self {
            database_url,
            jwt,
            smtp,
            frontend_url: get_or("FRONTEND_URL", "http://localhost:5173")
                .trim_end_matches('/')
                .to_string(),
            cors_origins,
            cookie_secure: parsed_or(&lookup, "COOKIE_SECURE", false),
            session_idle_minutes: parsed_or(&lookup, "SESSION_IDLE_MINUTES", 10),
            admin_role_id: parsed_or(&lookup, "ADMIN_ROLE_ID", 1),
            default_role_id: parsed_or(&lookup, "DEFAULT_ROLE_ID", 2),
            verification_ttl_minutes: parsed_or(&lookup, "VERIFICATION_TTL_MINUTES", 60),
            reset_ttl_minutes: parsed_or(&lookup, "RESET_TTL_MINUTES", 60),
        })
    }
}

fn parsed_or<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    lookup(key)
        .and_then(|v| v.trim().parse::<T>().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_are_applied() {
        let cfg = AppConfig::from_lookup(lookup_from(&[
            ("DATABASE_URL", "postgres://u:p@db/app"),
            ("JWT_SECRET", "s3cret"),
        ]))
        .expect("config");

        assert_eq!(cfg.database_url, "postgres://u:p@db/app");
        assert_eq!(cfg.jwt.ttl_minutes, 43_200);
        assert_eq!(cfg.jwt.renew_threshold_seconds, 180);
        assert_eq!(cfg.jwt.renewed_ttl_minutes, 10);
        assert_eq!(cfg.session_idle_minutes, 10);
        assert_eq!(cfg.admin_role_id, 1);
        assert_eq!(cfg.smtp.port, 465);
        assert!(!cfg.cookie_secure);
        assert_eq!(cfg.cors_origins, vec!["http://localhost:5173".to_string()]);
    }

    #[test]
    fn database_url_is_composed_from_pg_parts() {
        let cfg = AppConfig::from_lookup(lookup_from(&[
            ("PG_USER", "app"),
            ("PG_PASSWORD", "pw"),
            ("PG_HOST", "10.0.0.5"),
            ("PG_DATABASE", "accounts"),
            ("JWT_SECRET", "s3cret"),
        ]))
        .expect("config");

        assert_eq!(cfg.database_url, "postgres://app:pw@10.0.0.5:5432/accounts");
    }

    #[test]
    fn missing_jwt_secret_is_an_error() {
        let err = AppConfig::from_lookup(lookup_from(&[("DATABASE_URL", "postgres://x/y")]))
            .unwrap_err();
        assert!(err.to_string().contains("JWT_SECRET"));
    }

    #[test]
    fn lists_and_flags_are_parsed() {
        let cfg = AppConfig::from_lookup(lookup_from(&[
            ("DATABASE_URL", "postgres://x/y"),
            ("JWT_SECRET", "s"),
            ("CORS_ORIGINS", "http://a.test, http://b.test ,"),
            ("COOKIE_SECURE", "true"),
            ("FRONTEND_URL", "https://app.test/"),
            ("SESSION_IDLE_MINUTES", "not-a-number"),
        ]))
        .expect("config");

        assert_eq!(cfg.cors_origins, vec!["http://a.test", "http://b.test"]);
        assert!(cfg.cookie_secure);
        assert_eq!(cfg.frontend_url, "https://app.test");
        assert_eq!(cfg.session_idle_minutes, 10);
    }
}
