//! The Zabbix API client contract.
//!
//! The provider never talks JSON-RPC itself. It builds the typed request
//! structs below and hands them to a [`ZabbixApi`] implementation supplied by
//! the embedding binary. Field names follow the Zabbix API object
//! definitions so implementations can serialize the structs directly.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::config::ProviderConfig;
use crate::error::ApiError;

/// Proxy operating mode: the proxy connects to the server.
pub const OPERATING_MODE_ACTIVE: i64 = 0;
/// Proxy operating mode: the server connects to the proxy.
pub const OPERATING_MODE_PASSIVE: i64 = 1;

/// TLS bit: no encryption.
pub const TLS_NO_ENCRYPTION: i64 = 1;
/// TLS bit: pre-shared key.
pub const TLS_PSK: i64 = 2;
/// TLS bit: certificate.
pub const TLS_CERTIFICATE: i64 = 4;

/// Parameters of a `*.get` call.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Params(Map<String, Value>);

impl Params {
    /// Create an empty parameter set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a top-level parameter.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    /// Add an exact-match condition to the `filter` parameter.
    pub fn with_filter(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        let filter = self
            .0
            .entry("filter")
            .or_insert_with(|| Value::Object(Map::new()));
        if let Value::Object(conditions) = filter {
            conditions.insert(key.into(), value.into());
        }
        self
    }

    /// Get a top-level parameter.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// The `filter` conditions, if any.
    pub fn filter(&self) -> Option<&Map<String, Value>> {
        self.0.get("filter").and_then(Value::as_object)
    }
}

/// Reference to a user group, as attached to a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserGroupId {
    /// User group ID.
    #[serde(rename = "usrgrpid")]
    pub user_group_id: String,
}

/// A Zabbix user.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct User {
    /// User ID; empty on create.
    #[serde(rename = "userid", default, skip_serializing_if = "String::is_empty")]
    pub user_id: String,
    /// Login name.
    pub username: String,
    /// Password; never returned by the API.
    #[serde(rename = "passwd", default, skip_serializing_if = "String::is_empty")]
    pub password: String,
    /// Role ID.
    #[serde(rename = "roleid")]
    pub role_id: String,
    /// First name.
    #[serde(default)]
    pub name: String,
    /// Surname.
    #[serde(default)]
    pub surname: String,
    /// Groups the user belongs to.
    #[serde(rename = "usrgrps", default)]
    pub groups: Vec<UserGroupId>,
}

/// A host group permission granted to a user group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserGroupPermission {
    /// Host group ID.
    pub id: String,
    /// Access level: 0 denied, 2 read-only, 3 read-write.
    pub permission: i64,
}

/// A Zabbix user group.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct UserGroup {
    /// User group ID; empty on create.
    #[serde(rename = "usrgrpid", default, skip_serializing_if = "String::is_empty")]
    pub user_group_id: String,
    /// Group name.
    pub name: String,
    /// 0 disabled, 1 enabled.
    #[serde(default)]
    pub debug_mode: i64,
    /// 0 system default, 1 internal, 2 LDAP, 3 disabled.
    #[serde(default)]
    pub gui_access: i64,
    /// 0 enabled, 1 disabled.
    #[serde(rename = "users_status", default)]
    pub status: i64,
    /// Host group permissions, in the order they were given.
    #[serde(rename = "hostgroup_rights", default)]
    pub permissions: Vec<UserGroupPermission>,
}

/// A Zabbix proxy.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Proxy {
    /// Proxy ID; empty on create.
    #[serde(rename = "proxyid", default, skip_serializing_if = "String::is_empty")]
    pub proxy_id: String,
    /// Proxy name.
    pub name: String,
    /// [`OPERATING_MODE_ACTIVE`] or [`OPERATING_MODE_PASSIVE`].
    pub operating_mode: i64,
    /// Free-form description.
    #[serde(default)]
    pub description: String,
    /// Connections to the proxy: one of the `TLS_*` values.
    #[serde(default)]
    pub tls_connect: i64,
    /// Connections from the proxy: bitmask of the `TLS_*` values.
    #[serde(default)]
    pub tls_accept: i64,
    /// Certificate issuer.
    #[serde(default)]
    pub tls_issuer: String,
    /// Certificate subject.
    #[serde(default)]
    pub tls_subject: String,
    /// PSK identity, sent in clear text.
    #[serde(default)]
    pub tls_psk_identity: String,
    /// Pre-shared key, at least 32 hex digits.
    #[serde(default)]
    pub tls_psk: String,
    /// Comma-delimited IP addresses or DNS names of an active proxy.
    #[serde(default)]
    pub proxy_address: String,
}

/// Typed access to the Zabbix API methods the provider uses.
///
/// Create calls return the IDs assigned by the server, in request order.
/// Errors are reported to the host unchanged.
#[async_trait]
pub trait ZabbixApi: Send + Sync + 'static {
    /// Point the client at the configured server and authenticate.
    async fn login(&self, config: &ProviderConfig) -> Result<(), ApiError>;

    /// `user.create`
    async fn users_create(&self, users: Vec<User>) -> Result<Vec<String>, ApiError>;
    /// `user.get`
    async fn users_get(&self, params: Params) -> Result<Vec<User>, ApiError>;
    /// `user.update`
    async fn users_update(&self, users: Vec<User>) -> Result<(), ApiError>;
    /// `user.delete`
    async fn users_delete_by_ids(&self, ids: Vec<String>) -> Result<(), ApiError>;

    /// `usergroup.create`
    async fn user_groups_create(&self, groups: Vec<UserGroup>) -> Result<Vec<String>, ApiError>;
    /// `usergroup.get`
    async fn user_groups_get(&self, params: Params) -> Result<Vec<UserGroup>, ApiError>;
    /// `usergroup.update`
    async fn user_groups_update(&self, groups: Vec<UserGroup>) -> Result<(), ApiError>;
    /// `usergroup.delete`
    async fn user_groups_delete_by_ids(&self, ids: Vec<String>) -> Result<(), ApiError>;

    /// `proxy.create`
    async fn proxies_create(&self, proxies: Vec<Proxy>) -> Result<Vec<String>, ApiError>;
    /// `proxy.get`
    async fn proxies_get(&self, params: Params) -> Result<Vec<Proxy>, ApiError>;
    /// `proxy.update`
    async fn proxies_update(&self, proxies: Vec<Proxy>) -> Result<(), ApiError>;
    /// `proxy.delete`
    async fn proxies_delete_by_ids(&self, ids: Vec<String>) -> Result<(), ApiError>;
}
