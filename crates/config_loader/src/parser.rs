//! Catalog parsing
//!
//! Supports TOML (primary) and JSON.

use contracts::{Catalog, ContractError};

/// Catalog file format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// TOML (recommended)
    Toml,
    Json,
}

impl ConfigFormat {
    /// Infer format from a file extension
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "toml" => Some(Self::Toml),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// Parse TOML catalog
pub fn parse_toml(content: &str) -> Result<Catalog, ContractError> {
    toml::from_str(content).map_err(|e| ContractError::ConfigParse {
        message: format!("TOML parse error: {e}"),
        source: Some(Box::new(e)),
    })
}

/// Parse JSON catalog
pub fn parse_json(content: &str) -> Result<Catalog, ContractError> {
    serde_json::from_str(content).map_err(|e| ContractError::ConfigParse {
        message: format!("JSON parse error: {e}"),
        source: Some(Box::new(e)),
    })
}

/// Parse according to format
pub fn parse(content: &str, format: ConfigFormat) -> Result<Catalog, ContractError> {
    match format {
        ConfigFormat::Toml => parse_toml(content),
        ConfigFormat::Json => parse_json(content),
    }
}
