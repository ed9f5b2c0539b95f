use std::{env, net::SocketAddr, str::FromStr};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingVar(String),
    #[error("Invalid environment variable format for {0}: {1}")]
    InvalidVar(String, String),
}

/// Which family of stores backs the board.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Backend {
    /// S3 for images, DynamoDB for records.
    Aws,
    /// In-process stores; everything is lost on restart.
    Memory,
}

impl FromStr for Backend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "aws" => Ok(Backend::Aws),
            "memory" => Ok(Backend::Memory),
            other => Err(format!("expected 'aws' or 'memory', got '{}'", other)),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub backend: Backend,
    pub meme_bucket_name: String,
    pub meme_table_name: String,
    pub aws_region: String,
    // Optional endpoint for LocalStack
    pub localstack_endpoint: Option<String>,
    /// Prefix for public image URLs, e.g. a CDN in front of the bucket.
    pub public_base_url: Option<String>,
    pub max_upload_bytes: usize,
}

pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

impl Config {
    /// Loads configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        // Load .env file if present (ignores errors, relies on env vars otherwise)
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds a config from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let bind_address_str = lookup("BIND_ADDRESS").unwrap_or_else(|| "0.0.0.0:3000".to_string());
        let bind_address = SocketAddr::from_str(&bind_address_str)
            .map_err(|e| ConfigError::InvalidVar("BIND_ADDRESS".into(), e.to_string()))?;

        let backend = match lookup("MEME_BACKEND") {
            Some(raw) => raw
                .parse::<Backend>()
                .map_err(|e| ConfigError::InvalidVar("MEME_BACKEND".into(), e))?,
            None => Backend::Aws,
        };

        let meme_bucket_name = match (lookup("MEME_BUCKET_NAME"), backend) {
            (Some(name), _) => name,
            (None, Backend::Memory) => "memes".to_string(),
            (None, Backend::Aws) => return Err(ConfigError::MissingVar("MEME_BUCKET_NAME".into())),
        };

        let meme_table_name = lookup("MEME_TABLE_NAME").unwrap_or_else(|| "memes".to_string());

        let aws_region = lookup("AWS_DEFAULT_REGION").unwrap_or_else(|| "ca-central-1".to_string());

        let localstack_endpoint = lookup("AWS_ENDPOINT_URL");
        let public_base_url = lookup("MEME_PUBLIC_BASE_URL").map(|url| url.trim_end_matches('/').to_string());

        let max_upload_bytes = match lookup("MEME_MAX_UPLOAD_BYTES") {
            Some(raw) => raw
                .parse::<usize>()
                .map_err(|e| ConfigError::InvalidVar("MEME_MAX_UPLOAD_BYTES".into(), e.to_string()))?,
            None => DEFAULT_MAX_UPLOAD_BYTES,
        };

        Ok(Config {
            bind_address,
            backend,
            meme_bucket_name,
            meme_table_name,
            aws_region,
            localstack_endpoint,
            public_base_url,
            max_upload_bytes,
        })
    }
}
