//! Configuration types for the ETL pipeline.
//!
//! This module provides configuration options using the builder pattern
//! for flexible and ergonomic pipeline setup.

use phonenumber::country;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Configuration for one pipeline run.
///
/// Use [`EtlConfig::builder()`] to create a new configuration
/// with fluent API.
///
/// # Example
///
/// ```rust,ignore
/// use retail_etl::config::EtlConfig;
///
/// let config = EtlConfig::builder()
///     .data_dir("data")
///     .output_dir("output")
///     .phone_region("IN")
///     .build()?;
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EtlConfig {
    /// Directory holding the three raw CSV sources.
    /// Default: "data"
    pub data_dir: PathBuf,

    /// File name of the raw customers source.
    /// Default: "customers_raw.csv"
    pub customers_file: String,

    /// File name of the raw products source.
    /// Default: "products_raw.csv"
    pub products_file: String,

    /// File name of the raw sales source.
    /// Default: "sales_raw.csv"
    pub sales_file: String,

    /// Directory for derived artifacts and the quality report.
    /// Default: "output"
    pub output_dir: PathBuf,

    /// File name of the derived orders artifact.
    /// Default: "orders.csv"
    pub orders_file: String,

    /// File name of the derived order items artifact.
    /// Default: "order_items.csv"
    pub order_items_file: String,

    /// File name of the text quality report.
    /// Default: "data_quality_report.txt"
    pub report_file: String,

    /// ISO 3166 region used to interpret phone numbers without a country code.
    /// Default: "IN"
    pub phone_region: String,

    /// Path of the SQLite database file.
    /// Default: "output/retail.db"
    pub database_path: PathBuf,

    /// How many times a store connection is attempted before giving up.
    /// Default: 1 (no retry)
    pub connect_attempts: u32,

    /// Pause between connection attempts, in milliseconds.
    /// Default: 500
    pub connect_backoff_ms: u64,

    /// Whether to write the derived orders/order items CSV artifacts.
    /// Default: true
    pub write_artifacts: bool,

    /// Run every stage except the load; the store is never opened.
    /// Default: false
    #[serde(default)]
    pub dry_run: bool,
}

impl Default for EtlConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            customers_file: "customers_raw.csv".to_string(),
            products_file: "products_raw.csv".to_string(),
            sales_file: "sales_raw.csv".to_string(),
            output_dir: PathBuf::from("output"),
            orders_file: "orders.csv".to_string(),
            order_items_file: "order_items.csv".to_string(),
            report_file: "data_quality_report.txt".to_string(),
            phone_region: "IN".to_string(),
            database_path: PathBuf::from("output/retail.db"),
            connect_attempts: 1,
            connect_backoff_ms: 500,
            write_artifacts: true,
            dry_run: false,
        }
    }
}

impl EtlConfig {
    /// Create a new configuration builder.
    pub fn builder() -> EtlConfigBuilder {
        EtlConfigBuilder::default()
    }

    /// Validate the configuration and return errors if invalid.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        self.region()?;

        if self.connect_attempts == 0 {
            return Err(ConfigValidationError::InvalidConnectAttempts(
                self.connect_attempts,
            ));
        }

        for (field, value) in [
            ("customers_file", &self.customers_file),
            ("products_file", &self.products_file),
            ("sales_file", &self.sales_file),
            ("orders_file", &self.orders_file),
            ("order_items_file", &self.order_items_file),
            ("report_file", &self.report_file),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigValidationError::EmptyFileName(field.to_string()));
            }
        }

        Ok(())
    }

    /// Phone region parsed into the numbering-plan identifier.
    pub fn region(&self) -> Result<country::Id, ConfigValidationError> {
        self.phone_region
            .trim()
            .to_ascii_uppercase()
            .parse::<country::Id>()
            .map_err(|_| ConfigValidationError::UnknownRegion(self.phone_region.clone()))
    }

    pub fn customers_path(&self) -> PathBuf {
        self.data_dir.join(&self.customers_file)
    }

    pub fn products_path(&self) -> PathBuf {
        self.data_dir.join(&self.products_file)
    }

    pub fn sales_path(&self) -> PathBuf {
        self.data_dir.join(&self.sales_file)
    }

    pub fn connect_backoff(&self) -> Duration {
        Duration::from_millis(self.connect_backoff_ms)
    }
}

/// Errors that can occur during configuration validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("Unknown phone region '{0}' (expected an ISO 3166 code such as IN)")]
    UnknownRegion(String),

    #[error("Invalid connect attempts: {0} (must be at least 1)")]
    InvalidConnectAttempts(u32),

    #[error("File name for '{0}' must not be empty")]
    EmptyFileName(String),
}

/// Builder for [`EtlConfig`] with fluent API.
#[derive(Debug, Default)]
pub struct EtlConfigBuilder {
    data_dir: Option<PathBuf>,
    customers_file: Option<String>,
    products_file: Option<String>,
    sales_file: Option<String>,
    output_dir: Option<PathBuf>,
    orders_file: Option<String>,
    order_items_file: Option<String>,
    report_file: Option<String>,
    phone_region: Option<String>,
    database_path: Option<PathBuf>,
    connect_attempts: Option<u32>,
    connect_backoff_ms: Option<u64>,
    write_artifacts: Option<bool>,
    dry_run: Option<bool>,
}

impl EtlConfigBuilder {
    /// Set the directory holding the raw sources.
    pub fn data_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.data_dir = Some(path.into());
        self
    }

    pub fn customers_file(mut self, name: impl Into<String>) -> Self {
        self.customers_file = Some(name.into());
        self
    }

    pub fn products_file(mut self, name: impl Into<String>) -> Self {
        self.products_file = Some(name.into());
        self
    }

    pub fn sales_file(mut self, name: impl Into<String>) -> Self {
        self.sales_file = Some(name.into());
        self
    }

    /// Set the output directory for artifacts and reports.
    pub fn output_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(path.into());
        self
    }

    pub fn orders_file(mut self, name: impl Into<String>) -> Self {
        self.orders_file = Some(name.into());
        self
    }

    pub fn order_items_file(mut self, name: impl Into<String>) -> Self {
        self.order_items_file = Some(name.into());
        self
    }

    pub fn report_file(mut self, name: impl Into<String>) -> Self {
        self.report_file = Some(name.into());
        self
    }

    /// Set the default phone region (ISO 3166 alpha-2).
    pub fn phone_region(mut self, region: impl Into<String>) -> Self {
        self.phone_region = Some(region.into());
        self
    }

    /// Set the SQLite database path.
    ///
    /// When not set, the database lives in the output directory.
    pub fn database_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.database_path = Some(path.into());
        self
    }

    /// Set how many connection attempts a table load makes.
    pub fn connect_attempts(mut self, attempts: u32) -> Self {
        self.connect_attempts = Some(attempts);
        self
    }

    pub fn connect_backoff_ms(mut self, millis: u64) -> Self {
        self.connect_backoff_ms = Some(millis);
        self
    }

    /// Enable or disable writing the derived CSV artifacts.
    pub fn write_artifacts(mut self, write: bool) -> Self {
        self.write_artifacts = Some(write);
        self
    }

    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = Some(dry_run);
        self
    }

    /// Build the configuration.
    ///
    /// Returns a validated `EtlConfig` or an error if validation fails.
    pub fn build(self) -> Result<EtlConfig, ConfigValidationError> {
        let defaults = EtlConfig::default();
        let output_dir = self.output_dir.unwrap_or(defaults.output_dir);
        let database_path = self
            .database_path
            .unwrap_or_else(|| output_dir.join("retail.db"));

        let config = EtlConfig {
            data_dir: self.data_dir.unwrap_or(defaults.data_dir),
            customers_file: self.customers_file.unwrap_or(defaults.customers_file),
            products_file: self.products_file.unwrap_or(defaults.products_file),
            sales_file: self.sales_file.unwrap_or(defaults.sales_file),
            output_dir,
            orders_file: self.orders_file.unwrap_or(defaults.orders_file),
            order_items_file: self.order_items_file.unwrap_or(defaults.order_items_file),
            report_file: self.report_file.unwrap_or(defaults.report_file),
            phone_region: self.phone_region.unwrap_or(defaults.phone_region),
            database_path,
            connect_attempts: self.connect_attempts.unwrap_or(defaults.connect_attempts),
            connect_backoff_ms: self
                .connect_backoff_ms
                .unwrap_or(defaults.connect_backoff_ms),
            write_artifacts: self.write_artifacts.unwrap_or(defaults.write_artifacts),
            dry_run: self.dry_run.unwrap_or(defaults.dry_run),
        };

        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EtlConfig::default();
        assert_eq!(config.phone_region, "IN");
        assert_eq!(config.connect_attempts, 1);
        assert!(config.write_artifacts);
        assert!(!config.dry_run);
        assert_eq!(config.customers_path(), PathBuf::from("data/customers_raw.csv"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder_places_database_in_output_dir() {
        let config = EtlConfig::builder().output_dir("out").build().unwrap();
        assert_eq!(config.database_path, PathBuf::from("out/retail.db"));
    }

    #[test]
    fn test_builder_custom_values() {
        let config = EtlConfig::builder()
            .data_dir("raw")
            .sales_file("pos.csv")
            .phone_region("gb")
            .connect_attempts(3)
            .write_artifacts(false)
            .build()
            .unwrap();

        assert_eq!(config.sales_path(), PathBuf::from("raw/pos.csv"));
        assert_eq!(config.region().unwrap(), country::Id::GB);
        assert_eq!(config.connect_attempts, 3);
        assert!(!config.write_artifacts);
    }

    #[test]
    fn test_validation_unknown_region() {
        let result = EtlConfig::builder().phone_region("XX1").build();
        assert!(matches!(
            result.unwrap_err(),
            ConfigValidationError::UnknownRegion(_)
        ));
    }

    #[test]
    fn test_validation_zero_attempts() {
        let result = EtlConfig::builder().connect_attempts(0).build();
        assert!(matches!(
            result.unwrap_err(),
            ConfigValidationError::InvalidConnectAttempts(0)
        ));
    }

    #[test]
    fn test_config_from_json() {
        let json = r#"{
            "data_dir": "raw",
            "customers_file": "c.csv",
            "products_file": "p.csv",
            "sales_file": "s.csv",
            "output_dir": "out",
            "orders_file": "o.csv",
            "order_items_file": "oi.csv",
            "report_file": "r.txt",
            "phone_region": "IN",
            "database_path": "out/etl.db",
            "connect_attempts": 2,
            "connect_backoff_ms": 10,
            "write_artifacts": false
        }"#;

        let config: EtlConfig = serde_json::from_str(json).expect("Should deserialize");
        assert_eq!(config.products_path(), PathBuf::from("raw/p.csv"));
        assert_eq!(config.connect_backoff(), Duration::from_millis(10));
        assert!(config.validate().is_ok());
        assert!(!config.dry_run);
    }
}
