//! Zabbix Provider
//!
//! An infrastructure-as-code provider that manages Zabbix users, user groups
//! and proxies, and exposes each of them as a read-only data source.
//!
//! # Overview
//!
//! The crate provides:
//!
//! - **ProviderService trait**: The interface the host drives (validate, plan, CRUD, import)
//! - **ZabbixProvider**: The provider itself, generic over the API client
//! - **ZabbixApi trait**: Typed access to the Zabbix API methods the provider uses
//! - **Schema types**: Attribute and block schemas with value validators
//! - **Error types**: API errors pass through to the host unchanged
//! - **Logging**: Integration with `tracing` for structured logging
//! - **Testing**: A provider harness and an in-memory Zabbix server
//!
//! # Quick Start
//!
//! ```ignore
//! use zabbix_provider::{init_logging, ProviderService, ZabbixProvider};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     init_logging();
//!
//!     // `client` is any `ZabbixApi` implementation
//!     let provider = ZabbixProvider::new(client);
//!     provider
//!         .configure(json!({
//!             "url": "https://zabbix.example.com/api_jsonrpc.php",
//!             "username": "Admin",
//!             "password": "zabbix"
//!         }))
//!         .await?;
//!
//!     let state = provider
//!         .create(
//!             "zabbix_proxy",
//!             json!({"name": "proxy-eu", "operating_mode": 0}),
//!         )
//!         .await?;
//!     println!("created proxy {}", state["id"]);
//!     Ok(())
//! }
//! ```
//!
//! # Resources
//!
//! | type | Zabbix object |
//! |---|---|
//! | `zabbix_user` | `user` |
//! | `zabbix_user_group` | `usergroup` |
//! | `zabbix_proxy` | `proxy` |
//!
//! Each type is also a data source: `zabbix_user` is looked up by `username`,
//! the others by `name`. A lookup matching more than one object fails; one
//! matching nothing yields a state with an empty `id`.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod api;
pub mod config;
pub mod error;
pub mod logging;
pub mod plan;
pub mod provider;
pub mod resource_data;
pub mod resources;
pub mod schema;
pub mod service;
pub mod testing;
pub mod types;
pub mod validation;

// Re-export main types at crate root
pub use api::ZabbixApi;
pub use config::ProviderConfig;
pub use error::{ApiError, ProviderError};
pub use logging::{init_logging, init_logging_with_default, try_init_logging};
pub use provider::ZabbixProvider;
pub use schema::ProviderSchema;
pub use service::ProviderService;
pub use types::{AttributeChange, ImportedResource, PlanResult, ProviderMetadata};
pub use validation::{validate, validate_result};

// Re-export async_trait for client implementations
pub use async_trait::async_trait;

// Re-export commonly used external types
pub use serde_json;
pub use tracing;
