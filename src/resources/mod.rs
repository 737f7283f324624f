//! Resource handlers.
//!
//! Every Zabbix entity is exposed twice under the same type name: as a managed
//! resource and as a read-only data source. Each handler only translates
//! between [`ResourceData`] and the typed structs of [`crate::api`].

use async_trait::async_trait;
use serde_json::Value;

use crate::api::ZabbixApi;
use crate::error::ProviderError;
use crate::resource_data::ResourceData;
use crate::schema::{Attribute, Schema, ValueValidator};

pub mod proxy;
pub mod user;
pub mod user_group;

pub use proxy::ProxyResource;
pub use user::UserResource;
pub use user_group::UserGroupResource;

/// CRUD handlers for one Zabbix entity.
#[async_trait]
pub trait Resource: Send + Sync {
    /// Type name shared by the resource and its data source.
    fn type_name(&self) -> &'static str;

    /// Schema of the managed resource.
    fn schema(&self) -> Schema;

    /// Schema of the data source.
    fn data_source_schema(&self) -> Schema;

    /// Create the remote object, record its identity and refresh the state.
    async fn create(&self, api: &dyn ZabbixApi, data: &mut ResourceData)
        -> Result<(), ProviderError>;

    /// Refresh the state from the remote object with the stored identity.
    async fn read(&self, api: &dyn ZabbixApi, data: &mut ResourceData)
        -> Result<(), ProviderError>;

    /// Push the local state to the remote object and refresh.
    async fn update(&self, api: &dyn ZabbixApi, data: &mut ResourceData)
        -> Result<(), ProviderError>;

    /// Delete the remote object with the stored identity.
    async fn delete(&self, api: &dyn ZabbixApi, data: &mut ResourceData)
        -> Result<(), ProviderError>;

    /// Look up an existing object by the data source's lookup attributes.
    async fn read_data_source(
        &self,
        api: &dyn ZabbixApi,
        data: &mut ResourceData,
    ) -> Result<(), ProviderError>;
}

/// All handlers served by the provider.
pub fn all() -> Vec<Box<dyn Resource>> {
    vec![
        Box::new(UserResource),
        Box::new(UserGroupResource),
        Box::new(ProxyResource),
    ]
}

/// Reduce a lookup result to at most one record.
///
/// Zero records yields `None`; more than one is an error.
pub(crate) fn single<T>(kind: &str, mut found: Vec<T>) -> Result<Option<T>, ProviderError> {
    match found.len() {
        0 => Ok(None),
        1 => Ok(found.pop()),
        _ => Err(ProviderError::MultipleFound(kind.to_string())),
    }
}

/// Build a `filter` from the lookup attributes that hold a value.
pub(crate) fn lookup_filter(
    data: &ResourceData,
    kind: &str,
    lookups: &[&str],
) -> Result<crate::api::Params, ProviderError> {
    let mut params = crate::api::Params::new();
    let mut any = false;
    for key in lookups {
        if let Some(value) = data.get_ok(key) {
            params = params.with_filter(*key, value.clone());
            any = true;
        }
    }
    if !any {
        return Err(ProviderError::InvalidRequest(format!(
            "no {} lookup attribute",
            kind
        )));
    }
    Ok(params)
}

/// A required, non-blank string attribute.
pub(crate) fn required_name(description: &str) -> Attribute {
    Attribute::required_string()
        .with_description(description)
        .with_validator(ValueValidator::StringIsNotWhiteSpace)
}

/// An optional integer attribute restricted to `min..=max`, with a default.
pub(crate) fn enum_int(description: &str, min: i64, max: i64, default: i64) -> Attribute {
    Attribute::optional_int64()
        .with_description(description)
        .with_default(Value::from(default))
        .with_validator(ValueValidator::int_between(min, max))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_single() {
        assert_eq!(single::<u8>("users", vec![]).unwrap(), None);
        assert_eq!(single("users", vec![1]).unwrap(), Some(1));

        let err = single("users", vec![1, 2]).unwrap_err();
        assert_eq!(err.to_string(), "multiple users found");
    }

    #[test]
    fn test_lookup_filter() {
        let data = ResourceData::new(&Schema::v0(), json!({"name": "proxy-1"})).unwrap();
        let params = lookup_filter(&data, "proxy", &["name"]).unwrap();
        assert_eq!(params.filter().unwrap()["name"], "proxy-1");

        let data = ResourceData::new(&Schema::v0(), json!({"name": ""})).unwrap();
        let err = lookup_filter(&data, "proxy", &["name"]).unwrap_err();
        assert_eq!(err.to_string(), "Invalid request: no proxy lookup attribute");
    }

    #[test]
    fn test_type_names_unique() {
        let mut names: Vec<_> = all().iter().map(|r| r.type_name()).collect();
        names.sort();
        names.dedup();
        assert_eq!(names, vec!["zabbix_proxy", "zabbix_user", "zabbix_user_group"]);
    }
}
