//! `zabbix_user`: Zabbix frontend users.

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, trace};

use super::{lookup_filter, required_name, single, Resource};
use crate::api::{Params, User, UserGroupId, ZabbixApi};
use crate::error::ProviderError;
use crate::resource_data::ResourceData;
use crate::schema::{Attribute, AttributeFlags, AttributeType, Schema, ValueValidator};

/// Handler for `zabbix_user`.
#[derive(Debug, Clone, Copy, Default)]
pub struct UserResource;

fn optional_text(description: &str) -> Attribute {
    Attribute::optional_string()
        .with_description(description)
        .with_validator(ValueValidator::StringIsNotWhiteSpace)
}

fn groups_attribute(flags: AttributeFlags) -> Attribute {
    Attribute::new(AttributeType::set(AttributeType::String), flags)
        .with_description("IDs of the user groups the user belongs to.")
}

fn user_from_data(data: &ResourceData) -> User {
    User {
        user_id: data.id().to_string(),
        username: data.get_string("username"),
        password: data.get_string("password"),
        role_id: data.get_string("roleid"),
        name: data.get_string("name"),
        surname: data.get_string("surname"),
        groups: data
            .get_string_set("groups")
            .into_iter()
            .map(|user_group_id| UserGroupId { user_group_id })
            .collect(),
    }
}

async fn lookup(
    api: &dyn ZabbixApi,
    data: &mut ResourceData,
    params: Params,
) -> Result<(), ProviderError> {
    let users = api.users_get(params.with("selectUsrgrps", "extend")).await?;

    let user = match single("users", users)? {
        Some(user) => user,
        None => {
            data.set_id("");
            return Ok(());
        },
    };

    debug!(id = %user.user_id, username = %user.username, "Got user");

    data.set_id(user.user_id);
    data.set("username", user.username);
    data.set("roleid", user.role_id);
    data.set("name", user.name);
    data.set("surname", user.surname);
    data.set(
        "groups",
        user.groups
            .into_iter()
            .map(|g| Value::String(g.user_group_id))
            .collect::<Vec<_>>(),
    );

    Ok(())
}

#[async_trait]
impl Resource for UserResource {
    fn type_name(&self) -> &'static str {
        "zabbix_user"
    }

    fn schema(&self) -> Schema {
        Schema::v0()
            .with_attribute("id", Attribute::computed_string())
            .with_attribute("username", required_name("User's name."))
            .with_attribute(
                "password",
                optional_text("User's password.").sensitive(),
            )
            .with_attribute("roleid", required_name("Role ID of the user."))
            .with_attribute("name", optional_text("Name of the user."))
            .with_attribute("surname", optional_text("Surname of the user."))
            .with_attribute("groups", groups_attribute(AttributeFlags::optional_computed()))
    }

    fn data_source_schema(&self) -> Schema {
        Schema::v0()
            .with_attribute("username", required_name("User's name."))
            .with_attribute("id", Attribute::computed_string())
            .with_attribute("roleid", Attribute::computed_string())
            .with_attribute("name", Attribute::computed_string())
            .with_attribute("surname", Attribute::computed_string())
            .with_attribute("groups", groups_attribute(AttributeFlags::computed()))
    }

    async fn create(
        &self,
        api: &dyn ZabbixApi,
        data: &mut ResourceData,
    ) -> Result<(), ProviderError> {
        let ids = api.users_create(vec![user_from_data(data)]).await?;
        let id = ids
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::MissingId("user.create".to_string()))?;

        trace!(id = %id, "created user");

        data.set_id(id);
        self.read(api, data).await
    }

    async fn read(&self, api: &dyn ZabbixApi, data: &mut ResourceData) -> Result<(), ProviderError> {
        debug!(id = %data.id(), "Lookup of user");
        let params = Params::new().with("userids", data.id());
        lookup(api, data, params).await
    }

    async fn update(
        &self,
        api: &dyn ZabbixApi,
        data: &mut ResourceData,
    ) -> Result<(), ProviderError> {
        api.users_update(vec![user_from_data(data)]).await?;
        self.read(api, data).await
    }

    async fn delete(
        &self,
        api: &dyn ZabbixApi,
        data: &mut ResourceData,
    ) -> Result<(), ProviderError> {
        api.users_delete_by_ids(vec![data.id().to_string()]).await?;
        Ok(())
    }

    async fn read_data_source(
        &self,
        api: &dyn ZabbixApi,
        data: &mut ResourceData,
    ) -> Result<(), ProviderError> {
        let params = lookup_filter(data, "user", &["username"])?;
        debug!(params = ?params, "performing user data lookup");
        lookup(api, data, params).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ApiError;
    use crate::testing::InMemoryZabbix;
    use crate::validation::validate;
    use serde_json::json;

    fn load(state: Value) -> ResourceData {
        ResourceData::new(&UserResource.schema(), state).unwrap()
    }

    fn seeded(username: &str) -> User {
        User {
            username: username.to_string(),
            role_id: "1".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_schema_validation() {
        let schema = UserResource.schema();
        assert!(validate(&schema, &json!({"username": "jdoe", "roleid": "1"})).is_empty());

        let diagnostics = validate(&schema, &json!({"username": " ", "roleid": "1"}));
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].attribute.as_deref(), Some("username"));

        assert!(schema.attribute("password").unwrap().flags.sensitive);
        assert!(schema.attribute("groups").unwrap().flags.computed);
    }

    #[test]
    fn test_request_mapping() {
        let data = load(json!({
            "id": "5",
            "username": "jdoe",
            "password": "s3cret",
            "roleid": "2",
            "name": "John",
            "groups": ["7", "8", "7"]
        }));

        let user = user_from_data(&data);
        assert_eq!(user.user_id, "5");
        assert_eq!(user.password, "s3cret");
        assert_eq!(user.role_id, "2");
        assert_eq!(user.surname, "");
        assert_eq!(
            user.groups,
            vec![
                UserGroupId {
                    user_group_id: "7".to_string()
                },
                UserGroupId {
                    user_group_id: "8".to_string()
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_create_then_read_round_trip() {
        let api = InMemoryZabbix::new();
        let mut data = load(json!({
            "username": "jdoe",
            "password": "s3cret",
            "roleid": "2",
            "name": "John",
            "surname": "Doe",
            "groups": ["7"]
        }));

        UserResource.create(&api, &mut data).await.unwrap();

        assert!(!data.id().is_empty());
        assert_eq!(data.get_string("username"), "jdoe");
        assert_eq!(data.get_string("surname"), "Doe");
        assert_eq!(data.get_string_set("groups"), vec!["7"]);
        // the API never returns passwords; the configured value stays
        assert_eq!(data.get_string("password"), "s3cret");
        assert_eq!(api.users()[0].password, "s3cret");
    }

    #[tokio::test]
    async fn test_read_zero_matches_clears_identity() {
        let api = InMemoryZabbix::new();
        let mut data = load(json!({"id": "404", "username": "gone", "roleid": "1"}));

        UserResource.read(&api, &mut data).await.unwrap();
        assert_eq!(data.id(), "");
    }

    #[tokio::test]
    async fn test_data_source_multiple_matches_fails() {
        let api = InMemoryZabbix::new()
            .with_user(seeded("dup"))
            .with_user(seeded("dup"));
        let mut data = ResourceData::new(
            &UserResource.data_source_schema(),
            json!({"username": "dup"}),
        )
        .unwrap();

        let err = UserResource
            .read_data_source(&api, &mut data)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "multiple users found");
    }

    #[tokio::test]
    async fn test_data_source_lookup() {
        let api = InMemoryZabbix::new().with_user(User {
            name: "Zabbix".to_string(),
            ..seeded("Admin")
        });
        let mut data = ResourceData::new(
            &UserResource.data_source_schema(),
            json!({"username": "Admin"}),
        )
        .unwrap();

        UserResource.read_data_source(&api, &mut data).await.unwrap();
        assert!(!data.id().is_empty());
        assert_eq!(data.get_string("name"), "Zabbix");
        assert_eq!(data.get_string("roleid"), "1");
    }

    #[tokio::test]
    async fn test_update_and_delete() {
        let api = InMemoryZabbix::new();
        let mut data = load(json!({"username": "jdoe", "roleid": "2"}));
        UserResource.create(&api, &mut data).await.unwrap();

        data.set("surname", "Roe");
        UserResource.update(&api, &mut data).await.unwrap();
        assert_eq!(api.users()[0].surname, "Roe");

        UserResource.delete(&api, &mut data).await.unwrap();
        assert!(api.users().is_empty());
    }

    #[tokio::test]
    async fn test_api_errors_pass_through() {
        let api = InMemoryZabbix::new();
        api.fail_next(ApiError::rpc(-32602, "Invalid params.", "Incorrect role."));
        let mut data = load(json!({"username": "jdoe", "roleid": "99"}));

        let err = UserResource.create(&api, &mut data).await.unwrap_err();
        assert_eq!(err.to_string(), "Error -32602: Invalid params. Incorrect role.");
        assert_eq!(data.id(), "");
    }
}
