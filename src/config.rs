//! Configuration for townhall
//!
//! CLI arguments and environment variable handling using clap. Every flag
//! can also be set through the environment (and a `.env` file).

use clap::Parser;
use std::net::SocketAddr;
use uuid::Uuid;

use crate::auth::JwtValidator;
use crate::services::PageLimits;
use crate::types::CivicError;

/// Townhall - civic engagement service
///
/// Petitions, polls, official responses and per-location reports.
#[derive(Parser, Debug, Clone)]
#[command(name = "townhall")]
#[command(about = "Civic engagement service: petitions, polls and official responses")]
pub struct Args {
    /// Unique node identifier for this instance
    #[arg(long, env = "NODE_ID", default_value_t = Uuid::new_v4())]
    pub node_id: Uuid,

    /// Address to listen on
    #[arg(long, env = "LISTEN", default_value = "0.0.0.0:5000")]
    pub listen: SocketAddr,

    /// MongoDB connection URI
    #[arg(long, env = "MONGODB_URI", default_value = "mongodb://localhost:27017")]
    pub mongodb_uri: String,

    /// MongoDB database name
    #[arg(long, env = "MONGODB_DB", default_value = "townhall")]
    pub mongodb_db: String,

    /// Keep records in process memory instead of MongoDB
    #[arg(long, env = "MEMORY_STORE", default_value = "false")]
    pub memory_store: bool,

    /// JWT secret for verifying identity assertions
    #[arg(long, env = "JWT_SECRET")]
    pub jwt_secret: Option<String>,

    /// Lifetime of issued tokens in seconds
    #[arg(long, env = "JWT_EXPIRY_SECONDS", default_value = "3600")]
    pub jwt_expiry_seconds: u64,

    /// Enable development mode (insecure fallback secret)
    #[arg(long, env = "DEV_MODE", default_value = "false")]
    pub dev_mode: bool,

    /// Log level used when RUST_LOG is not set
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Emit logs as JSON lines
    #[arg(long, env = "LOG_JSON", default_value = "false")]
    pub log_json: bool,

    /// Petitions per page when the client does not ask
    #[arg(long, env = "DEFAULT_PAGE_SIZE", default_value = "10")]
    pub default_page_size: u64,

    /// Upper bound on petitions per page
    #[arg(long, env = "MAX_PAGE_SIZE", default_value = "100")]
    pub max_page_size: u64,

    /// Largest accepted request body
    #[arg(long, env = "MAX_BODY_BYTES", default_value = "65536")]
    pub max_body_bytes: usize,
}

impl Args {
    /// Identity assertion verifier; the insecure dev secret is only used in dev mode
    pub fn jwt_validator(&self) -> Result<JwtValidator, CivicError> {
        match (&self.jwt_secret, self.dev_mode) {
            (Some(secret), _) => JwtValidator::new(secret.clone(), self.jwt_expiry_seconds),
            (None, true) => Ok(JwtValidator::new_dev()),
            (None, false) => Err(CivicError::Config(
                "JWT_SECRET is required in production mode".into(),
            )),
        }
    }

    pub fn page_limits(&self) -> PageLimits {
        PageLimits {
            default: self.default_page_size,
            max: self.max_page_size,
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if !self.dev_mode && self.jwt_secret.is_none() {
            return Err("JWT_SECRET is required in production mode".to_string());
        }

        if self.default_page_size == 0 || self.max_page_size == 0 {
            return Err("Page sizes must be greater than zero".to_string());
        }

        if self.default_page_size > self.max_page_size {
            return Err("DEFAULT_PAGE_SIZE must be less than or equal to MAX_PAGE_SIZE".to_string());
        }

        if self.max_body_bytes == 0 {
            return Err("MAX_BODY_BYTES must be greater than zero".to_string());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(extra: &[&str]) -> Args {
        let mut argv = vec!["townhall"];
        argv.extend_from_slice(extra);
        Args::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_defaults() {
        let args = parse(&["--dev-mode"]);
        assert_eq!(args.listen.port(), 5000);
        assert_eq!(args.mongodb_db, "townhall");
        assert_eq!(args.page_limits(), PageLimits { default: 10, max: 100 });
        assert_eq!(args.max_body_bytes, 64 * 1024);
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_production_requires_secret() {
        let args = parse(&[]);
        assert!(args.validate().is_err());
        assert!(args.jwt_validator().is_err());

        let args = parse(&["--jwt-secret", "a-production-secret-that-is-long-enough"]);
        assert!(args.validate().is_ok());
        assert!(args.jwt_validator().is_ok());
    }

    #[test]
    fn test_dev_mode_falls_back() {
        let args = parse(&["--dev-mode"]);
        assert!(args.jwt_validator().is_ok());

        let args = parse(&["--dev-mode", "--jwt-secret", "short"]);
        assert!(args.jwt_validator().is_err());
    }

    #[test]
    fn test_page_size_bounds() {
        let args = parse(&["--dev-mode", "--default-page-size", "0"]);
        assert!(args.validate().is_err());

        let args = parse(&["--dev-mode", "--default-page-size", "50", "--max-page-size", "20"]);
        assert!(args.validate().is_err());
    }
}
