//! Process configuration read from the environment once at startup.

use anyhow::{Context, Result};

pub const DEFAULT_HTTP_PORT: u16 = 5001;
pub const DEFAULT_MAIL_FROM: &str = "tsak0007@student.monash.edu";
pub const DEFAULT_SENDGRID_API_BASE: &str = "https://api.sendgrid.com";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub http_port: u16,
    pub mail_from: String,
    pub sendgrid_api_key: Option<String>,
    pub sendgrid_api_base: String,
    pub seed_on_start: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            http_port: DEFAULT_HTTP_PORT,
            mail_from: DEFAULT_MAIL_FROM.to_string(),
            sendgrid_api_key: None,
            sendgrid_api_base: DEFAULT_SENDGRID_API_BASE.to_string(),
            seed_on_start: false,
        }
    }
}

fn parse_bool(v: &str) -> Option<bool> {
    match v.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    /// Build from any key lookup; unset or blank keys keep their defaults.
    pub fn from_lookup<F: Fn(&str) -> Option<String>>(get: F) -> Result<Self> {
        let get = |k: &str| get(k).filter(|v| !v.trim().is_empty());
        let mut cfg = AppConfig::default();
        if let Some(p) = get("GLOBAL_PLATE_HTTP_PORT") {
            cfg.http_port = p.trim().parse().with_context(|| format!("GLOBAL_PLATE_HTTP_PORT is not a port: {}", p))?;
        }
        if let Some(from) = get("GLOBAL_PLATE_MAIL_FROM") { cfg.mail_from = from.trim().to_string(); }
        cfg.sendgrid_api_key = get("SENDGRID_API_KEY").map(|k| k.trim().to_string());
        if let Some(base) = get("SENDGRID_API_BASE") { cfg.sendgrid_api_base = base.trim().trim_end_matches('/').to_string(); }
        if let Some(s) = get("GLOBAL_PLATE_SEED") {
            cfg.seed_on_start = parse_bool(&s).with_context(|| format!("GLOBAL_PLATE_SEED is not a boolean: {}", s))?;
        }
        Ok(cfg)
    }
}
