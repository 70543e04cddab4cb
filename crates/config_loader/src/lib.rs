//! # Config Loader
//!
//! Catalog loading and parsing module.
//!
//! Responsibilities:
//! - Parse TOML/JSON catalog files
//! - Validate catalog legality
//! - Provide the built-in catalog
//!
//! # Example
//!
//! ```no_run
//! use config_loader::CatalogLoader;
//! use std::path::Path;
//!
//! let catalog = CatalogLoader::load_from_path(Path::new("catalog.toml")).unwrap();
//! println!("Maps: {:?}", catalog.maps);
//! ```

mod parser;
mod validator;

pub use contracts::Catalog;
pub use parser::ConfigFormat;

use contracts::ContractError;
use std::path::Path;

const DEFAULT_CATALOG: &str = include_str!("default_catalog.toml");

/// Catalog loader
///
/// Provides static methods to load the catalog from files or strings.
pub struct CatalogLoader;

impl CatalogLoader {
    /// Built-in catalog (vehicles, Town01..Town10HD, five weather presets)
    pub fn builtin() -> Result<Catalog, ContractError> {
        Self::load_from_str(DEFAULT_CATALOG, ConfigFormat::Toml)
    }

    /// Load the catalog from `path`, or the built-in one when `path` is `None`
    pub fn load(path: Option<&Path>) -> Result<Catalog, ContractError> {
        match path {
            Some(path) => Self::load_from_path(path),
            None => Self::builtin(),
        }
    }

    /// Load catalog from file path
    ///
    /// Automatically detects format from file extension (.toml / .json).
    ///
    /// # Errors
    /// - File read failure
    /// - Unsupported format
    /// - Parse failure
    /// - Validation failure
    pub fn load_from_path(path: &Path) -> Result<Catalog, ContractError> {
        let format = Self::detect_format(path)?;
        let content = std::fs::read_to_string(path)?;
        Self::load_from_str(&content, format)
    }

    /// Load catalog from string
    pub fn load_from_str(content: &str, format: ConfigFormat) -> Result<Catalog, ContractError> {
        let catalog = parser::parse(content, format)?;
        validator::validate(&catalog)?;
        Ok(catalog)
    }

    /// Serialize catalog to TOML string
    pub fn to_toml(catalog: &Catalog) -> Result<String, ContractError> {
        toml::to_string_pretty(catalog)
            .map_err(|e| ContractError::config_parse(format!("TOML serialize error: {e}")))
    }

    /// Serialize catalog to JSON string
    pub fn to_json(catalog: &Catalog) -> Result<String, ContractError> {
        serde_json::to_string_pretty(catalog)
            .map_err(|e| ContractError::config_parse(format!("JSON serialize error: {e}")))
    }

    /// Infer format from file extension
    fn detect_format(path: &Path) -> Result<ConfigFormat, ContractError> {
        let ext = path.extension().and_then(|e| e.to_str()).ok_or_else(|| {
            ContractError::config_parse("cannot determine file format from extension")
        })?;

        ConfigFormat::from_extension(ext).ok_or_else(|| {
            ContractError::config_parse(format!("unsupported config format: .{ext}"))
        })
    }
}
