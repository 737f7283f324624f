//! `zabbix_proxy`: active and passive Zabbix proxies.

use async_trait::async_trait;
use tracing::{debug, trace};

use super::{enum_int, lookup_filter, required_name, single, Resource};
use crate::api::{Params, Proxy, ZabbixApi, TLS_NO_ENCRYPTION};
use crate::error::ProviderError;
use crate::resource_data::ResourceData;
use crate::schema::{Attribute, Schema, ValueValidator};

/// Handler for `zabbix_proxy`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProxyResource;

fn proxy_from_data(data: &ResourceData) -> Proxy {
    Proxy {
        proxy_id: data.id().to_string(),
        name: data.get_string("name"),
        operating_mode: data.get_int("operating_mode"),
        description: data.get_string("description"),
        tls_connect: data.get_int("tls_connect"),
        tls_accept: data.get_int("tls_accept"),
        tls_issuer: data.get_string("tls_issuer"),
        tls_subject: data.get_string("tls_subject"),
        tls_psk_identity: data.get_string("tls_psk_identity"),
        tls_psk: data.get_string("tls_psk"),
        proxy_address: data.get_string("proxy_address"),
    }
}

async fn lookup(
    api: &dyn ZabbixApi,
    data: &mut ResourceData,
    params: Params,
) -> Result<(), ProviderError> {
    debug!(params = ?params, "Lookup of proxy");

    let proxies = api.proxies_get(params).await?;

    let proxy = match single("proxies", proxies)? {
        Some(proxy) => proxy,
        None => {
            data.set_id("");
            return Ok(());
        },
    };

    debug!(id = %proxy.proxy_id, name = %proxy.name, "Got proxy");

    data.set_id(proxy.proxy_id);
    data.set("name", proxy.name);
    data.set("operating_mode", proxy.operating_mode);
    data.set("description", proxy.description);
    data.set("tls_connect", proxy.tls_connect);
    data.set("tls_accept", proxy.tls_accept);
    data.set("tls_issuer", proxy.tls_issuer);
    data.set("tls_subject", proxy.tls_subject);
    data.set("tls_psk_identity", proxy.tls_psk_identity);
    data.set("tls_psk", proxy.tls_psk);
    data.set("proxy_address", proxy.proxy_address);

    Ok(())
}

#[async_trait]
impl Resource for ProxyResource {
    fn type_name(&self) -> &'static str {
        "zabbix_proxy"
    }

    fn schema(&self) -> Schema {
        Schema::v0()
            .with_attribute("id", Attribute::computed_string())
            .with_attribute("name", required_name("Name of the proxy."))
            .with_attribute(
                "operating_mode",
                Attribute::required_int64()
                    .with_description("Type of proxy. Possible values: 0 - active proxy; 1 - passive proxy.")
                    .with_validator(ValueValidator::int_between(0, 1)),
            )
            .with_attribute(
                "description",
                Attribute::optional_string().with_description("Description of the proxy."),
            )
            .with_attribute(
                "tls_connect",
                enum_int(
                    "Connections to host. Possible values: 1 - (default) No encryption; 2 - PSK; 4 - certificate.",
                    1,
                    4,
                    TLS_NO_ENCRYPTION,
                ),
            )
            .with_attribute(
                "tls_accept",
                enum_int(
                    "Connections from host. Bitmask of: 1 - (default) No encryption; 2 - PSK; 4 - certificate.",
                    1,
                    7,
                    TLS_NO_ENCRYPTION,
                ),
            )
            .with_attribute(
                "tls_issuer",
                Attribute::optional_string().with_description("Certificate issuer."),
            )
            .with_attribute(
                "tls_subject",
                Attribute::optional_string().with_description("Certificate subject."),
            )
            .with_attribute(
                "tls_psk_identity",
                Attribute::optional_string().with_description(
                    "PSK identity. Transmitted unencrypted; required if tls_connect is PSK or tls_accept has the PSK bit.",
                ),
            )
            .with_attribute(
                "tls_psk",
                Attribute::optional_string()
                    .with_description(
                        "The preshared key, at least 32 hex digits. Required if tls_connect is PSK or tls_accept has the PSK bit.",
                    )
                    .sensitive(),
            )
            .with_attribute(
                "proxy_address",
                Attribute::optional_string().with_description(
                    "Comma-delimited IP addresses or DNS names of active Zabbix proxy.",
                ),
            )
    }

    fn data_source_schema(&self) -> Schema {
        Schema::v0()
            .with_attribute("name", required_name("Name of the proxy."))
            .with_attribute("id", Attribute::computed_string())
            .with_attribute("operating_mode", Attribute::computed_int64())
            .with_attribute("description", Attribute::computed_string())
            .with_attribute("tls_connect", Attribute::computed_int64())
            .with_attribute("tls_accept", Attribute::computed_int64())
            .with_attribute("tls_issuer", Attribute::computed_string())
            .with_attribute("tls_subject", Attribute::computed_string())
            .with_attribute("tls_psk_identity", Attribute::computed_string())
            .with_attribute("tls_psk", Attribute::computed_string().sensitive())
            .with_attribute("proxy_address", Attribute::computed_string())
    }

    async fn create(
        &self,
        api: &dyn ZabbixApi,
        data: &mut ResourceData,
    ) -> Result<(), ProviderError> {
        let ids = api.proxies_create(vec![proxy_from_data(data)]).await?;
        let id = ids
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::MissingId("proxy.create".to_string()))?;

        trace!(id = %id, "created proxy");

        data.set_id(id);
        self.read(api, data).await
    }

    async fn read(&self, api: &dyn ZabbixApi, data: &mut ResourceData) -> Result<(), ProviderError> {
        debug!(id = %data.id(), "Lookup of proxy with id");
        let params = Params::new().with("proxyids", data.id());
        lookup(api, data, params).await
    }

    async fn update(
        &self,
        api: &dyn ZabbixApi,
        data: &mut ResourceData,
    ) -> Result<(), ProviderError> {
        api.proxies_update(vec![proxy_from_data(data)]).await?;
        self.read(api, data).await
    }

    async fn delete(
        &self,
        api: &dyn ZabbixApi,
        data: &mut ResourceData,
    ) -> Result<(), ProviderError> {
        api.proxies_delete_by_ids(vec![data.id().to_string()])
            .await?;
        Ok(())
    }

    async fn read_data_source(
        &self,
        api: &dyn ZabbixApi,
        data: &mut ResourceData,
    ) -> Result<(), ProviderError> {
        let params = lookup_filter(data, "proxy", &["name"])?;
        lookup(api, data, params).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{OPERATING_MODE_ACTIVE, OPERATING_MODE_PASSIVE, TLS_CERTIFICATE, TLS_PSK};
    use crate::testing::InMemoryZabbix;
    use crate::validation::validate;
    use serde_json::{json, Value};

    fn load(state: Value) -> ResourceData {
        ResourceData::new(&ProxyResource.schema(), state).unwrap()
    }

    #[test]
    fn test_schema_validation() {
        let schema = ProxyResource.schema();
        assert!(validate(&schema, &json!({"name": "proxy-1", "operating_mode": 0})).is_empty());

        let diagnostics = validate(&schema, &json!({"name": "proxy-1"}));
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].attribute.as_deref(), Some("operating_mode"));

        let diagnostics = validate(
            &schema,
            &json!({"name": "proxy-1", "operating_mode": 2, "tls_accept": 8, "tls_connect": 0}),
        );
        assert_eq!(diagnostics.len(), 3);

        assert!(schema.attribute("tls_psk").unwrap().flags.sensitive);
    }

    #[test]
    fn test_tls_defaults() {
        let proxy = proxy_from_data(&load(json!({"name": "proxy-1", "operating_mode": 0})));
        assert_eq!(proxy.tls_connect, TLS_NO_ENCRYPTION);
        assert_eq!(proxy.tls_accept, TLS_NO_ENCRYPTION);
        assert_eq!(proxy.description, "");
    }

    #[test]
    fn test_data_source_schema_exposes_fields() {
        let schema = ProxyResource.data_source_schema();
        assert!(schema.attribute("name").unwrap().flags.required);
        for name in ["proxy_address", "tls_issuer", "operating_mode", "id"] {
            assert!(schema.attribute(name).unwrap().flags.computed, "{}", name);
        }
        assert!(schema.attribute("tls_psk").unwrap().flags.sensitive);
    }

    #[tokio::test]
    async fn test_create_then_read_round_trip() {
        let api = InMemoryZabbix::new();
        let config = json!({
            "name": "proxy-eu",
            "operating_mode": OPERATING_MODE_PASSIVE,
            "description": "EU datacenter",
            "tls_connect": TLS_PSK,
            "tls_accept": TLS_PSK | TLS_CERTIFICATE,
            "tls_psk_identity": "eu-proxy",
            "tls_psk": "0123456789abcdef0123456789abcdef",
            "proxy_address": "10.0.0.5,proxy.eu.local"
        });
        let mut data = load(config.clone());

        ProxyResource.create(&api, &mut data).await.unwrap();

        assert!(!data.id().is_empty());
        let state = data.into_state();
        for (key, value) in config.as_object().unwrap() {
            assert_eq!(&state[key], value, "{}", key);
        }
        assert_eq!(state["tls_issuer"], "");
    }

    #[tokio::test]
    async fn test_read_zero_matches_clears_identity() {
        let api = InMemoryZabbix::new();
        let mut data = load(json!({"id": "10500", "name": "gone", "operating_mode": 0}));

        ProxyResource.read(&api, &mut data).await.unwrap();
        assert_eq!(data.id(), "");
    }

    #[tokio::test]
    async fn test_data_source() {
        let proxy = Proxy {
            name: "proxy-us".to_string(),
            operating_mode: OPERATING_MODE_ACTIVE,
            proxy_address: "10.1.0.5".to_string(),
            ..Default::default()
        };
        let schema = ProxyResource.data_source_schema();

        let api = InMemoryZabbix::new().with_proxy(proxy.clone());
        let mut data = ResourceData::new(&schema, json!({"name": "proxy-us"})).unwrap();
        ProxyResource.read_data_source(&api, &mut data).await.unwrap();
        assert_eq!(data.get_string("proxy_address"), "10.1.0.5");

        let mut data = ResourceData::new(&schema, json!({"name": ""})).unwrap();
        let err = ProxyResource
            .read_data_source(&api, &mut data)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("no proxy lookup attribute"));

        let api = api.with_proxy(proxy);
        let mut data = ResourceData::new(&schema, json!({"name": "proxy-us"})).unwrap();
        let err = ProxyResource
            .read_data_source(&api, &mut data)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "multiple proxies found");
    }

    #[tokio::test]
    async fn test_update_and_delete() {
        let api = InMemoryZabbix::new();
        let mut data = load(json!({"name": "proxy-1", "operating_mode": 0}));
        ProxyResource.create(&api, &mut data).await.unwrap();

        data.set("proxy_address", "192.0.2.10");
        ProxyResource.update(&api, &mut data).await.unwrap();
        assert_eq!(api.proxies()[0].proxy_address, "192.0.2.10");
        assert_eq!(data.get_string("proxy_address"), "192.0.2.10");

        ProxyResource.delete(&api, &mut data).await.unwrap();
        assert!(api.proxies().is_empty());
    }
}
