//! An in-memory [`ZabbixApi`] for tests.

use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

use crate::api::{Params, Proxy, User, UserGroup, ZabbixApi};
use crate::config::ProviderConfig;
use crate::error::ApiError;

const INVALID_PARAMS: i64 = -32602;
const APPLICATION_ERROR: i64 = -32500;
const NO_SUCH_OBJECT: &str = "No permissions to referred object or it does not exist!";

/// A record kept by [`InMemoryZabbix`].
trait Stored: Clone + Serialize {
    /// Key of the identity in the serialized record.
    const ID_FIELD: &'static str;
    /// `*.get` parameter restricting the result to some identities.
    const ID_PARAM: &'static str;
    /// Prefix of the duplicate-name error.
    const LABEL: &'static str;

    fn id(&self) -> &str;
    fn set_id(&mut self, id: String);
    fn name(&self) -> &str;
}

impl Stored for User {
    const ID_FIELD: &'static str = "userid";
    const ID_PARAM: &'static str = "userids";
    const LABEL: &'static str = "User with username";

    fn id(&self) -> &str {
        &self.user_id
    }

    fn set_id(&mut self, id: String) {
        self.user_id = id;
    }

    fn name(&self) -> &str {
        &self.username
    }
}

impl Stored for UserGroup {
    const ID_FIELD: &'static str = "usrgrpid";
    const ID_PARAM: &'static str = "usrgrpids";
    const LABEL: &'static str = "User group";

    fn id(&self) -> &str {
        &self.user_group_id
    }

    fn set_id(&mut self, id: String) {
        self.user_group_id = id;
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl Stored for Proxy {
    const ID_FIELD: &'static str = "proxyid";
    const ID_PARAM: &'static str = "proxyids";
    const LABEL: &'static str = "Proxy";

    fn id(&self) -> &str {
        &self.proxy_id
    }

    fn set_id(&mut self, id: String) {
        self.proxy_id = id;
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[derive(Debug, Default)]
struct Store {
    users: Vec<User>,
    user_groups: Vec<UserGroup>,
    proxies: Vec<Proxy>,
    last_id: u64,
    failure: Option<ApiError>,
    credentials: Option<(String, String)>,
    calls: Vec<String>,
}

impl Store {
    fn allocate_id(&mut self) -> String {
        self.last_id += 1;
        self.last_id.to_string()
    }
}

/// A Zabbix server held in memory.
///
/// Objects get sequential numeric IDs. Names are unique per object kind, and
/// `*.get` honours the ID parameters, `filter`, and the `select*` options the
/// provider relies on. Passwords are stored but never returned.
#[derive(Debug, Default)]
pub struct InMemoryZabbix {
    store: Mutex<Store>,
}

impl InMemoryZabbix {
    /// Create an empty server that accepts any credentials.
    pub fn new() -> Self {
        Self::default()
    }

    /// Only accept logins with the given user name and password.
    pub fn with_credentials(self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.lock().credentials = Some((username.into(), password.into()));
        self
    }

    /// Seed a user. Name uniqueness is not checked.
    pub fn with_user(self, user: User) -> Self {
        self.seed(user, |store| &mut store.users)
    }

    /// Seed a user group. Name uniqueness is not checked.
    pub fn with_user_group(self, group: UserGroup) -> Self {
        self.seed(group, |store| &mut store.user_groups)
    }

    /// Seed a proxy. Name uniqueness is not checked.
    pub fn with_proxy(self, proxy: Proxy) -> Self {
        self.seed(proxy, |store| &mut store.proxies)
    }

    /// Make the next API call fail with `error`.
    pub fn fail_next(&self, error: ApiError) {
        self.lock().failure = Some(error);
    }

    /// Stored users, passwords included.
    pub fn users(&self) -> Vec<User> {
        self.lock().users.clone()
    }

    /// Stored user groups.
    pub fn user_groups(&self) -> Vec<UserGroup> {
        self.lock().user_groups.clone()
    }

    /// Stored proxies.
    pub fn proxies(&self) -> Vec<Proxy> {
        self.lock().proxies.clone()
    }

    /// Names of the API methods called so far, in order.
    pub fn calls(&self) -> Vec<String> {
        self.lock().calls.clone()
    }

    fn lock(&self) -> MutexGuard<'_, Store> {
        self.store.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn seed<T: Stored>(self, mut record: T, records: fn(&mut Store) -> &mut Vec<T>) -> Self {
        {
            let mut store = self.lock();
            let id = store.allocate_id();
            record.set_id(id);
            records(&mut *store).push(record);
        }
        self
    }

    /// Record the call and consume any injected failure.
    fn begin(&self, method: &str) -> Result<MutexGuard<'_, Store>, ApiError> {
        let mut store = self.lock();
        store.calls.push(method.to_string());
        match store.failure.take() {
            Some(error) => Err(error),
            None => Ok(store),
        }
    }
}

fn matches<T: Stored>(record: &T, params: &Params) -> bool {
    let encoded = match serde_json::to_value(record) {
        Ok(Value::Object(encoded)) => encoded,
        _ => return false,
    };

    if let Some(wanted) = params.get(T::ID_PARAM) {
        let id = encoded
            .get(T::ID_FIELD)
            .and_then(Value::as_str)
            .unwrap_or_default();
        let hit = match wanted {
            Value::String(wanted) => wanted == id,
            Value::Array(wanted) => wanted.iter().any(|w| w.as_str() == Some(id)),
            _ => false,
        };
        if !hit {
            return false;
        }
    }

    params.filter().map_or(true, |filter| {
        filter
            .iter()
            .all(|(key, value)| encoded.get(key) == Some(value))
    })
}

fn get<T: Stored>(records: &[T], params: &Params) -> Vec<T> {
    records
        .iter()
        .filter(|record| matches(*record, params))
        .cloned()
        .collect()
}

fn create<T: Stored>(
    last_id: &mut u64,
    records: &mut Vec<T>,
    new: Vec<T>,
) -> Result<Vec<String>, ApiError> {
    for (i, record) in new.iter().enumerate() {
        let taken = records.iter().any(|r| r.name() == record.name())
            || new[..i].iter().any(|r| r.name() == record.name());
        if taken {
            return Err(ApiError::rpc(
                INVALID_PARAMS,
                "Invalid params.",
                format!("{} \"{}\" already exists.", T::LABEL, record.name()),
            ));
        }
    }

    let mut ids = Vec::with_capacity(new.len());
    for mut record in new {
        *last_id += 1;
        let id = last_id.to_string();
        record.set_id(id.clone());
        records.push(record);
        ids.push(id);
    }
    Ok(ids)
}

fn update<T: Stored>(records: &mut [T], changes: Vec<T>) -> Result<(), ApiError> {
    for change in &changes {
        if !records.iter().any(|r| r.id() == change.id()) {
            return Err(ApiError::rpc(APPLICATION_ERROR, "Application error.", NO_SUCH_OBJECT));
        }
    }
    for change in changes {
        for record in records.iter_mut() {
            if record.id() == change.id() {
                *record = change.clone();
            }
        }
    }
    Ok(())
}

fn delete<T: Stored>(records: &mut Vec<T>, ids: Vec<String>) -> Result<(), ApiError> {
    if ids.is_empty() {
        return Err(ApiError::rpc(INVALID_PARAMS, "Invalid params.", "Empty input parameter."));
    }
    if !ids.iter().all(|id| records.iter().any(|r| r.id() == id)) {
        return Err(ApiError::rpc(APPLICATION_ERROR, "Application error.", NO_SUCH_OBJECT));
    }
    records.retain(|r| !ids.iter().any(|id| id == r.id()));
    Ok(())
}

#[async_trait]
impl ZabbixApi for InMemoryZabbix {
    async fn login(&self, config: &ProviderConfig) -> Result<(), ApiError> {
        let store = self.begin("user.login")?;
        match &store.credentials {
            Some((username, password))
                if *username != config.username || *password != config.password =>
            {
                Err(ApiError::Authentication(
                    "Incorrect user name or password or account is temporarily blocked."
                        .to_string(),
                ))
            },
            _ => Ok(()),
        }
    }

    async fn users_create(&self, users: Vec<User>) -> Result<Vec<String>, ApiError> {
        let mut guard = self.begin("user.create")?;
        let store = &mut *guard;
        create(&mut store.last_id, &mut store.users, users)
    }

    async fn users_get(&self, params: Params) -> Result<Vec<User>, ApiError> {
        let store = self.begin("user.get")?;
        let with_groups = params.get("selectUsrgrps").is_some();
        Ok(get(&store.users, &params)
            .into_iter()
            .map(|mut user| {
                user.password.clear();
                if !with_groups {
                    user.groups.clear();
                }
                user
            })
            .collect())
    }

    async fn users_update(&self, users: Vec<User>) -> Result<(), ApiError> {
        let mut store = self.begin("user.update")?;
        let users: Vec<User> = users
            .into_iter()
            .map(|mut user| {
                if user.password.is_empty() {
                    if let Some(stored) = store.users.iter().find(|u| u.user_id == user.user_id) {
                        user.password = stored.password.clone();
                    }
                }
                user
            })
            .collect();
        update(&mut store.users, users)
    }

    async fn users_delete_by_ids(&self, ids: Vec<String>) -> Result<(), ApiError> {
        let mut store = self.begin("user.delete")?;
        delete(&mut store.users, ids)
    }

    async fn user_groups_create(&self, groups: Vec<UserGroup>) -> Result<Vec<String>, ApiError> {
        let mut guard = self.begin("usergroup.create")?;
        let store = &mut *guard;
        create(&mut store.last_id, &mut store.user_groups, groups)
    }

    async fn user_groups_get(&self, params: Params) -> Result<Vec<UserGroup>, ApiError> {
        let store = self.begin("usergroup.get")?;
        let with_rights = params.get("selectHostGroupRights").is_some();
        Ok(get(&store.user_groups, &params)
            .into_iter()
            .map(|mut group| {
                if !with_rights {
                    group.permissions.clear();
                }
                group
            })
            .collect())
    }

    async fn user_groups_update(&self, groups: Vec<UserGroup>) -> Result<(), ApiError> {
        let mut store = self.begin("usergroup.update")?;
        update(&mut store.user_groups, groups)
    }

    async fn user_groups_delete_by_ids(&self, ids: Vec<String>) -> Result<(), ApiError> {
        let mut store = self.begin("usergroup.delete")?;
        delete(&mut store.user_groups, ids)
    }

    async fn proxies_create(&self, proxies: Vec<Proxy>) -> Result<Vec<String>, ApiError> {
        let mut guard = self.begin("proxy.create")?;
        let store = &mut *guard;
        create(&mut store.last_id, &mut store.proxies, proxies)
    }

    async fn proxies_get(&self, params: Params) -> Result<Vec<Proxy>, ApiError> {
        let store = self.begin("proxy.get")?;
        Ok(get(&store.proxies, &params))
    }

    async fn proxies_update(&self, proxies: Vec<Proxy>) -> Result<(), ApiError> {
        let mut store = self.begin("proxy.update")?;
        update(&mut store.proxies, proxies)
    }

    async fn proxies_delete_by_ids(&self, ids: Vec<String>) -> Result<(), ApiError> {
        let mut store = self.begin("proxy.delete")?;
        delete(&mut store.proxies, ids)
    }
}
