//! Configuration module
//!
//! Handles CLI configuration such as the API URL.

/// CLI configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// URL of the Jobline API
    pub api_url: String,
}
