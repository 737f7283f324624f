//! Error types for the Zabbix provider.

use thiserror::Error;

/// Errors reported by a [`ZabbixApi`](crate::api::ZabbixApi) implementation.
///
/// These are surfaced to the host unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    /// The server answered with a JSON-RPC error object.
    #[error("Error {code}: {message} {data}")]
    Rpc {
        /// JSON-RPC error code.
        code: i64,
        /// Short error message.
        message: String,
        /// Server supplied detail.
        data: String,
    },

    /// Login was rejected.
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// The request never produced a response.
    #[error("Transport error: {0}")]
    Transport(String),
}

impl ApiError {
    /// Build an RPC error with the given code, message and detail.
    pub fn rpc(code: i64, message: impl Into<String>, data: impl Into<String>) -> Self {
        Self::Rpc {
            code,
            message: message.into(),
            data: data.into(),
        }
    }
}

/// Errors that can occur while serving provider operations.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// An error returned by the Zabbix API client, passed through as-is.
    #[error(transparent)]
    Api(#[from] ApiError),

    /// A lookup that must match a single record matched several.
    #[error("multiple {0} found")]
    MultipleFound(String),

    /// A create call succeeded without returning the new identity.
    #[error("{0} returned no id")]
    MissingId(String),

    /// A configuration error occurred.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The requested resource or data source type is unknown.
    #[error("Unknown resource type: {0}")]
    UnknownResource(String),

    /// Invalid request from the host.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl ProviderError {
    /// Whether this error originated in the remote API client.
    pub fn is_api(&self) -> bool {
        matches!(self, Self::Api(_))
    }
}
