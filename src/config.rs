//! Server configuration
//!
//! No config file and no environment variables: defaults, overridden by a
//! single optional positional port argument.

use std::path::PathBuf;
use std::time::Duration;

use tracing::warn;

use crate::error::AppError;
use crate::message::DEFAULT_WELCOME;
use crate::registry::DEFAULT_CAPACITY;

/// Default listen port
pub const DEFAULT_PORT: u16 = 8989;

/// Event funnel buffer size
pub const CHANNEL_BUFFER_SIZE: usize = 256;

/// Printed when more than one argument is given
pub const USAGE: &str = "[USAGE]: ./TCPChat $port";

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    /// Concurrently admitted connections
    pub capacity: usize,
    /// Recreated empty at every start
    pub transcript_path: PathBuf,
    pub welcome_path: PathBuf,
    /// Idle limit for a single line read; `None` never times out
    pub read_timeout: Option<Duration>,
    pub channel_buffer: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            capacity: DEFAULT_CAPACITY,
            transcript_path: PathBuf::from("txtfiles/data.txt"),
            welcome_path: PathBuf::from("txtfiles/welcome.txt"),
            read_timeout: None,
            channel_buffer: CHANNEL_BUFFER_SIZE,
        }
    }
}

impl ServerConfig {
    /// Address the listener binds to
    pub fn bind_addr(&self) -> String {
        format!("0.0.0.0:{}", self.port)
    }

    /// Read the welcome banner, falling back to the built-in one
    ///
    /// One trailing newline is stripped so the client types right after it.
    pub async fn load_welcome(&self) -> String {
        match tokio::fs::read_to_string(&self.welcome_path).await {
            Ok(text) => text.strip_suffix('\n').unwrap_or(&text).to_string(),
            Err(e) => {
                warn!(
                    "Welcome banner {} unavailable ({}), using built-in banner",
                    self.welcome_path.display(),
                    e
                );
                DEFAULT_WELCOME.to_string()
            }
        }
    }
}

/// Outcome of command line parsing
#[derive(Debug)]
pub struct ParsedArgs {
    pub config: ServerConfig,
    /// Too many arguments were given; print `USAGE` and carry on
    pub usage_hint: bool,
}

/// Parse the arguments following the program name
///
/// Zero arguments keep the default port, one sets it, more than one keeps
/// the default and asks for a usage hint.
pub fn parse_args<I>(args: I) -> Result<ParsedArgs, AppError>
where
    I: IntoIterator<Item = String>,
{
    let args: Vec<String> = args.into_iter().collect();
    let mut config = ServerConfig::default();

    let usage_hint = match args.as_slice() {
        [] => false,
        [port] => {
            config.port = port
                .parse()
                .map_err(|_| AppError::InvalidPort(port.clone()))?;
            false
        }
        _ => true,
    };

    Ok(ParsedArgs { config, usage_hint })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_no_args_uses_default_port() {
        let parsed = parse_args(args(&[])).unwrap();
        assert_eq!(parsed.config.port, 8989);
        assert!(!parsed.usage_hint);
    }

    #[test]
    fn test_single_port_argument() {
        let parsed = parse_args(args(&["2525"])).unwrap();
        assert_eq!(parsed.config.port, 2525);
        assert_eq!(parsed.config.bind_addr(), "0.0.0.0:2525");
    }

    #[test]
    fn test_too_many_args_keeps_default() {
        let parsed = parse_args(args(&["2525", "extra"])).unwrap();
        assert_eq!(parsed.config.port, DEFAULT_PORT);
        assert!(parsed.usage_hint);
    }

    #[test]
    fn test_bad_port_is_an_error() {
        let err = parse_args(args(&["chat"])).unwrap_err();
        assert!(matches!(err, AppError::InvalidPort(p) if p == "chat"));
    }

    #[test]
    fn test_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.capacity, 10);
        assert!(config.read_timeout.is_none());
        assert_eq!(config.transcript_path, PathBuf::from("txtfiles/data.txt"));
    }

    #[tokio::test]
    async fn test_missing_welcome_falls_back() {
        let config = ServerConfig {
            welcome_path: std::env::temp_dir().join(format!("no_such_{}", uuid::Uuid::new_v4())),
            ..ServerConfig::default()
        };
        assert_eq!(config.load_welcome().await, DEFAULT_WELCOME);
    }

    #[tokio::test]
    async fn test_welcome_trailing_newline_stripped() {
        let path = std::env::temp_dir().join(format!("welcome_{}.txt", uuid::Uuid::new_v4()));
        tokio::fs::write(&path, "Hi!\n[ENTER YOUR NAME]: \n").await.unwrap();
        let config = ServerConfig {
            welcome_path: path,
            ..ServerConfig::default()
        };
        assert_eq!(config.load_welcome().await, "Hi!\n[ENTER YOUR NAME]: ");
    }
}
