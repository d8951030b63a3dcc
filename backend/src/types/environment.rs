//! Environment configuration for different deployment stages

use std::env;
use std::time::Duration;

use aws_config::{retry::RetryConfig, timeout::TimeoutConfig, BehaviorVersion};
use portal_storage::CatalogTables;
use strum::Display;

/// Secret used to sign development tokens when `JWT_SECRET` is unset
const DEVELOPMENT_JWT_SECRET: &str = "industry-portal-development-secret";

/// Application environment configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum Environment {
    /// Production environment
    Production,
    /// Staging environment
    Staging,
    /// Development environment (uses `LocalStack`)
    Development,
}

impl Environment {
    /// Creates an Environment from the `APP_ENV` environment variable
    ///
    /// Defaults to development when unset.
    ///
    /// # Panics
    ///
    /// Panics if `APP_ENV` contains an invalid value
    #[must_use]
    pub fn from_env() -> Self {
        let env = env::var("APP_ENV")
            .unwrap_or_else(|_| "development".to_string())
            .trim()
            .to_lowercase();

        match env.as_str() {
            "production" => Self::Production,
            "staging" => Self::Staging,
            "development" => Self::Development,
            _ => panic!("Invalid environment: {env}"),
        }
    }

    /// Prefix shared by every catalog table name
    ///
    /// # Panics
    ///
    /// Panics if `TABLE_PREFIX` is not set outside development
    #[must_use]
    pub fn table_prefix(&self) -> String {
        match self {
            Self::Production | Self::Staging => {
                env::var("TABLE_PREFIX").expect("TABLE_PREFIX environment variable is not set")
            }
            Self::Development => {
                env::var("TABLE_PREFIX").unwrap_or_else(|_| "industry-portal-dev".to_string())
            }
        }
    }

    /// Table and index names of the catalog
    #[must_use]
    pub fn catalog_tables(&self) -> CatalogTables {
        CatalogTables::with_prefix(&self.table_prefix())
    }

    /// Returns the S3 bucket name holding documents
    ///
    /// # Panics
    ///
    /// Panics if the `S3_BUCKET_NAME` environment variable is not set outside development
    #[must_use]
    pub fn s3_bucket(&self) -> String {
        match self {
            Self::Production | Self::Staging => {
                env::var("S3_BUCKET_NAME").expect("S3_BUCKET_NAME environment variable is not set")
            }
            Self::Development => env::var("S3_BUCKET_NAME")
                .unwrap_or_else(|_| "industry-portal-documents".to_string()),
        }
    }

    /// HMAC secret for access tokens
    ///
    /// Development falls back to a fixed secret; other stages must set `JWT_SECRET`.
    #[must_use]
    pub fn jwt_secret(&self) -> Option<String> {
        match self {
            Self::Production | Self::Staging => env::var("JWT_SECRET").ok(),
            Self::Development => Some(
                env::var("JWT_SECRET").unwrap_or_else(|_| DEVELOPMENT_JWT_SECRET.to_string()),
            ),
        }
    }

    /// Whether to show API docs
    #[must_use]
    pub const fn show_api_docs(&self) -> bool {
        matches!(self, Self::Development | Self::Staging)
    }

    /// Whether logs are emitted as JSON for the Datadog agent
    #[must_use]
    pub const fn json_logs(&self) -> bool {
        matches!(self, Self::Production | Self::Staging)
    }

    /// Returns the endpoint URL to use for AWS services
    #[must_use]
    pub const fn override_aws_endpoint_url(&self) -> Option<&str> {
        match self {
            // Regular AWS endpoints for production and staging
            Self::Production | Self::Staging => None,
            // LocalStack endpoint for development
            Self::Development => Some("http://localhost:4566"),
        }
    }

    /// AWS configuration with retry and timeout settings
    pub async fn aws_config(&self) -> aws_config::SdkConfig {
        let retry_config = RetryConfig::standard()
            .with_max_attempts(3)
            .with_initial_backoff(Duration::from_millis(50));

        let timeout_config = TimeoutConfig::builder()
            .operation_timeout(Duration::from_secs(30))
            .build();

        let mut config_builder = aws_config::load_defaults(BehaviorVersion::latest())
            .await
            .to_builder()
            .retry_config(retry_config)
            .timeout_config(timeout_config);

        if let Some(endpoint_url) = self.override_aws_endpoint_url() {
            config_builder = config_builder.endpoint_url(endpoint_url);
        }

        config_builder.build()
    }

    /// AWS S3 service configuration
    pub async fn s3_client_config(&self) -> aws_sdk_s3::Config {
        let aws_config = self.aws_config().await;
        let s3_config: aws_sdk_s3::Config = (&aws_config).into();
        let mut builder = s3_config.to_builder();

        // LocalStack only serves path-style bucket addressing
        if matches!(self, Self::Development) {
            builder.set_force_path_style(Some(true));
        }

        builder.build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_environment_from_env() {
        // Test development (default)
        env::remove_var("APP_ENV");
        assert_eq!(Environment::from_env(), Environment::Development);

        env::set_var("APP_ENV", " Staging ");
        assert_eq!(Environment::from_env(), Environment::Staging);

        env::set_var("APP_ENV", "production");
        assert_eq!(Environment::from_env(), Environment::Production);

        env::remove_var("APP_ENV");
    }

    #[test]
    #[serial]
    #[should_panic(expected = "Invalid environment: invalid")]
    fn test_invalid_environment() {
        env::set_var("APP_ENV", "invalid");
        let _ = Environment::from_env();
    }

    #[test]
    #[serial]
    fn test_development_defaults() {
        env::remove_var("TABLE_PREFIX");
        env::remove_var("JWT_SECRET");
        env::remove_var("S3_BUCKET_NAME");

        let env = Environment::Development;
        assert_eq!(
            env.catalog_tables().industries,
            "industry-portal-dev-industries"
        );
        assert_eq!(env.s3_bucket(), "industry-portal-documents");
        assert_eq!(env.jwt_secret().as_deref(), Some(DEVELOPMENT_JWT_SECRET));
    }

    #[test]
    #[serial]
    fn test_production_requires_secret() {
        env::remove_var("JWT_SECRET");
        assert_eq!(Environment::Production.jwt_secret(), None);

        env::set_var("JWT_SECRET", "prod-secret");
        assert_eq!(
            Environment::Production.jwt_secret().as_deref(),
            Some("prod-secret")
        );
        env::remove_var("JWT_SECRET");
    }

    #[test]
    #[serial]
    fn test_table_prefix_override() {
        env::set_var("TABLE_PREFIX", "portal-test");
        assert_eq!(
            Environment::Development.catalog_tables().solutions,
            "portal-test-solutions"
        );
        env::remove_var("TABLE_PREFIX");
    }

    #[test]
    fn test_api_docs_hidden_in_production() {
        assert!(Environment::Development.show_api_docs());
        assert!(Environment::Staging.show_api_docs());
        assert!(!Environment::Production.show_api_docs());
    }
}
