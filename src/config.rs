use std::env;

use uuid::Uuid;

use crate::engine::assignments::MAX_PAGE_SIZE;
use crate::error::AppError;
use crate::state::DEFAULT_PAGE_SIZE;

#[derive(Debug, Clone)]
pub struct Config {
    pub http_port: u16,
    pub log_level: String,
    pub event_buffer_size: usize,
    pub default_page_size: usize,
    pub cors_allow_origin: Option<String>,
    pub dev_session: Option<DevSession>,
}

/// A session seeded at startup for local use, from `DEV_SESSION_TOKEN` and
/// `DEV_COMPANY_ID`.
#[derive(Debug, Clone)]
pub struct DevSession {
    pub token: String,
    pub company_id: Uuid,
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        let _ = dotenvy::dotenv();

        let default_page_size =
            check_page_size(parse_or_default("DEFAULT_PAGE_SIZE", DEFAULT_PAGE_SIZE)?)?;
        let event_buffer_size =
            check_event_buffer_size(parse_or_default("EVENT_BUFFER_SIZE", 1024)?)?;

        Ok(Self {
            http_port: parse_or_default("HTTP_PORT", 3000)?,
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            event_buffer_size,
            default_page_size,
            cors_allow_origin: env::var("CORS_ALLOW_ORIGIN").ok(),
            dev_session: dev_session()?,
        })
    }
}

fn check_page_size(size: usize) -> Result<usize, AppError> {
    if size == 0 || size > MAX_PAGE_SIZE {
        return Err(AppError::Internal(format!("invalid DEFAULT_PAGE_SIZE: {size}")));
    }
    Ok(size)
}

/// The broadcast channel behind the event feed cannot be created with zero
/// capacity.
fn check_event_buffer_size(size: usize) -> Result<usize, AppError> {
    if size == 0 {
        return Err(AppError::Internal(format!("invalid EVENT_BUFFER_SIZE: {size}")));
    }
    Ok(size)
}

fn dev_session() -> Result<Option<DevSession>, AppError> {
    let token = match env::var("DEV_SESSION_TOKEN") {
        Ok(token) if !token.trim().is_empty() => token,
        _ => return Ok(None),
    };

    let company_id = match env::var("DEV_COMPANY_ID") {
        Ok(raw) => raw
            .parse::<Uuid>()
            .map_err(|err| AppError::Internal(format!("invalid DEV_COMPANY_ID: {err}")))?,
        Err(_) => {
            return Err(AppError::Internal(
                "DEV_SESSION_TOKEN requires DEV_COMPANY_ID".to_string(),
            ))
        }
    };

    Ok(Some(DevSession { token, company_id }))
}

fn parse_or_default<T>(key: &str, default: T) -> Result<T, AppError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .parse::<T>()
            .map_err(|err| AppError::Internal(format!("invalid {key}: {err}"))),
        Err(_) => Ok(default),
    }
}
