//! `zabbix_user_group`: user groups and their host group permissions.

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::{debug, trace};

use super::{enum_int, lookup_filter, required_name, single, Resource};
use crate::api::{Params, UserGroup, UserGroupPermission, ZabbixApi};
use crate::error::ProviderError;
use crate::resource_data::ResourceData;
use crate::schema::{Attribute, Block, NestedBlock, Schema, ValueValidator};
use crate::validation::as_int64;

/// Handler for `zabbix_user_group`.
#[derive(Debug, Clone, Copy, Default)]
pub struct UserGroupResource;

fn host_permission_block() -> NestedBlock {
    NestedBlock::list(
        Block::new()
            .with_description("Permission of the group on one host group.")
            .with_attribute(
                "id",
                Attribute::required_string().with_description("Host group ID."),
            )
            .with_attribute(
                "permission",
                Attribute::required_int64()
                    .with_description("Access level: 0 denied, 2 read-only, 3 read-write.")
                    .with_validator(ValueValidator::int_between(0, 3)),
            ),
    )
    .computed()
}

/// Translate the `host_permission` list into request objects, keeping order.
fn host_permissions(data: &ResourceData) -> Vec<UserGroupPermission> {
    data.get_blocks("host_permission")
        .into_iter()
        .map(|entry| UserGroupPermission {
            id: entry
                .get("id")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            permission: entry
                .get("permission")
                .and_then(as_int64)
                .unwrap_or_default(),
        })
        .collect()
}

fn user_group_from_data(data: &ResourceData) -> UserGroup {
    UserGroup {
        user_group_id: data.id().to_string(),
        name: data.get_string("name"),
        debug_mode: data.get_int("debug_mode"),
        gui_access: data.get_int("gui_access"),
        status: data.get_int("status"),
        permissions: host_permissions(data),
    }
}

async fn lookup(
    api: &dyn ZabbixApi,
    data: &mut ResourceData,
    params: Params,
) -> Result<(), ProviderError> {
    let groups = api
        .user_groups_get(params.with("selectHostGroupRights", "extend"))
        .await?;

    let group = match single("user groups", groups)? {
        Some(group) => group,
        None => {
            data.set_id("");
            return Ok(());
        },
    };

    debug!(id = %group.user_group_id, name = %group.name, "Got user group");

    data.set_id(group.user_group_id);
    data.set("name", group.name);
    data.set("debug_mode", group.debug_mode);
    data.set("gui_access", group.gui_access);
    data.set("status", group.status);
    data.set(
        "host_permission",
        group
            .permissions
            .into_iter()
            .map(|p| json!({"id": p.id, "permission": p.permission}))
            .collect::<Vec<_>>(),
    );

    Ok(())
}

#[async_trait]
impl Resource for UserGroupResource {
    fn type_name(&self) -> &'static str {
        "zabbix_user_group"
    }

    fn schema(&self) -> Schema {
        Schema::v0()
            .with_attribute("id", Attribute::computed_string())
            .with_attribute("name", required_name("Name of the user group."))
            .with_attribute(
                "debug_mode",
                enum_int("Whether debug mode is enabled or disabled.", 0, 1, 0),
            )
            .with_attribute(
                "gui_access",
                enum_int(
                    "Frontend authentication method of the users in the group.",
                    0,
                    3,
                    0,
                ),
            )
            .with_attribute(
                "status",
                enum_int(
                    "Whether the user group is enabled or disabled. For deprovisioned users, the user group cannot be enabled.",
                    0,
                    1,
                    0,
                ),
            )
            .with_block("host_permission", host_permission_block())
    }

    fn data_source_schema(&self) -> Schema {
        Schema::v0()
            .with_attribute("name", required_name("Name of the user group."))
            .with_attribute("id", Attribute::computed_string())
            .with_attribute("debug_mode", Attribute::computed_int64())
            .with_attribute("gui_access", Attribute::computed_int64())
            .with_attribute("status", Attribute::computed_int64())
            .with_block("host_permission", host_permission_block())
    }

    async fn create(
        &self,
        api: &dyn ZabbixApi,
        data: &mut ResourceData,
    ) -> Result<(), ProviderError> {
        let ids = api
            .user_groups_create(vec![user_group_from_data(data)])
            .await?;
        let id = ids
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::MissingId("usergroup.create".to_string()))?;

        trace!(id = %id, "created user group");

        data.set_id(id);
        self.read(api, data).await
    }

    async fn read(&self, api: &dyn ZabbixApi, data: &mut ResourceData) -> Result<(), ProviderError> {
        debug!(id = %data.id(), "Lookup of user group");
        let params = Params::new().with("usrgrpids", data.id());
        lookup(api, data, params).await
    }

    async fn update(
        &self,
        api: &dyn ZabbixApi,
        data: &mut ResourceData,
    ) -> Result<(), ProviderError> {
        api.user_groups_update(vec![user_group_from_data(data)])
            .await?;
        self.read(api, data).await
    }

    async fn delete(
        &self,
        api: &dyn ZabbixApi,
        data: &mut ResourceData,
    ) -> Result<(), ProviderError> {
        api.user_groups_delete_by_ids(vec![data.id().to_string()])
            .await?;
        Ok(())
    }

    async fn read_data_source(
        &self,
        api: &dyn ZabbixApi,
        data: &mut ResourceData,
    ) -> Result<(), ProviderError> {
        let params = lookup_filter(data, "user group", &["name"])?;
        debug!(params = ?params, "performing user group data lookup");
        lookup(api, data, params).await
    }
}
