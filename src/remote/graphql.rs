//! AppSync GraphQL record store.
//!
//! Speaks the Amplify conflict-detection dialect:
//!
//! - `list<Models>(limit, nextToken) { items { ... } nextToken }`
//! - `get<Model>(id)`
//! - `create<Model>(input)`, `update<Model>(input)`, `delete<Model>(input)`,
//!   where update and delete carry `_version` in their input
//!
//! A stale `_version` comes back as a `ConflictUnhandled` error.

use serde::Deserialize;
use serde_json::json;
use tracing::{debug, trace};

use super::{Page, RemoteStore};
use crate::config::{Auth, EnvironmentConfig, Session, DEFAULT_PAGE_SIZE};
use crate::error::{Error, Result};
use crate::model::record::{DELETED, ID, LAST_CHANGED_AT, VERSION};
use crate::model::{ModelSchema, Record, BOOKKEEPING_FIELDS};

const CONFLICT_ERROR: &str = "ConflictUnhandled";
const UNAUTHORIZED_ERROR: &str = "UnauthorizedException";

/// Record store backed by an AppSync GraphQL API.
#[derive(Debug, Clone)]
pub struct GraphqlStore {
    client: reqwest::Client,
    endpoint: String,
    auth: Auth,
    model: String,
    fields: Vec<String>,
    page_size: usize,
    versioned: bool,
}

impl GraphqlStore {
    /// Store for `schema`'s model at `endpoint`, authenticated with `session`.
    #[must_use]
    pub fn new(endpoint: impl Into<String>, session: &Session, schema: &ModelSchema) -> Self {
        let mut fields: Vec<String> = schema.field_names().map(String::from).collect();
        if !fields.iter().any(|f| f == ID) {
            fields.insert(0, ID.to_string());
        }

        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
            auth: session.auth().clone(),
            model: schema.name.clone(),
            fields,
            page_size: DEFAULT_PAGE_SIZE,
            versioned: true,
        }
    }

    /// Store for one configured environment. The environment's API key, if
    /// any, replaces the session's credentials.
    #[must_use]
    pub fn for_environment(
        config: &EnvironmentConfig,
        session: &Session,
        schema: &ModelSchema,
    ) -> Self {
        let store = Self::new(&config.endpoint, session, schema).with_versioning(config.versioned);
        match &config.api_key {
            Some(key) => store.with_auth(Auth::ApiKey(key.clone())),
            None => store,
        }
    }

    #[must_use]
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Whether the API tracks `_version`, `_deleted` and `_lastChangedAt`.
    #[must_use]
    pub fn with_versioning(mut self, versioned: bool) -> Self {
        self.versioned = versioned;
        self
    }

    #[must_use]
    pub fn with_auth(mut self, auth: Auth) -> Self {
        self.auth = auth;
        self
    }

    fn selection(&self) -> String {
        let mut selection = self.fields.join(" ");
        if self.versioned {
            for field in [VERSION, DELETED, LAST_CHANGED_AT] {
                if !self.fields.iter().any(|f| f == field) {
                    selection.push(' ');
                    selection.push_str(field);
                }
            }
        }
        selection
    }

    fn list_query(&self) -> String {
        format!(
            "query List($limit: Int, $nextToken: String) {{ list{plural}(limit: $limit, nextToken: $nextToken) {{ items {{ {selection} }} nextToken }} }}",
            plural = pluralize(&self.model),
            selection = self.selection(),
        )
    }

    fn get_query(&self) -> String {
        format!(
            "query Get($id: ID!) {{ get{model}(id: $id) {{ {selection} }} }}",
            model = self.model,
            selection = self.selection(),
        )
    }

    fn mutation(&self, op: &str) -> String {
        format!(
            "mutation {op}($input: {op}{model}Input!) {{ {verb}{model}(input: $input) {{ id }} }}",
            model = self.model,
            verb = op.to_lowercase(),
        )
    }

    /// Input object for create and update: data fields only.
    fn input(&self, record: &Record, version: Option<i64>) -> serde_json::Value {
        let mut input = record.without(BOOKKEEPING_FIELDS).to_json();
        if self.versioned {
            if let (Some(v), Some(obj)) = (version, input.as_object_mut()) {
                obj.insert(VERSION.to_string(), json!(v));
            }
        }
        input
    }

    /// Run one GraphQL request and return its `data`.
    ///
    /// `target` names the record a mutation writes, for conflict reporting.
    async fn execute(
        &self,
        query: &str,
        variables: serde_json::Value,
        target: Option<(&str, Option<i64>)>,
    ) -> Result<serde_json::Value> {
        trace!(model = %self.model, query, "graphql request");

        let request = self.client.post(&self.endpoint).json(&json!({
            "query": query,
            "variables": variables,
        }));
        let request = match &self.auth {
            Auth::ApiKey(key) => request.header("x-api-key", key),
            Auth::Bearer(token) => request.header("Authorization", token),
        };

        let response = request.send().await?;
        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(Error::SessionExpired);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Remote(format!("GraphQL endpoint returned {status}: {body}")));
        }

        let body: GraphqlResponse = response
            .json()
            .await
            .map_err(|e| Error::Remote(format!("Failed to parse GraphQL response: {e}")))?;

        if !body.errors.is_empty() {
            return Err(self.map_errors(body.errors, target));
        }
        body.data
            .ok_or_else(|| Error::Remote("GraphQL response has no data".into()))
    }

    fn map_errors(&self, errors: Vec<GraphqlError>, target: Option<(&str, Option<i64>)>) -> Error {
        let kind = |name: &str| errors.iter().any(|e| e.error_type.as_deref() == Some(name));

        if kind(UNAUTHORIZED_ERROR) {
            return Error::SessionExpired;
        }
        if kind(CONFLICT_ERROR) {
            let (id, version) = target.unwrap_or_default();
            return Error::VersionConflict {
                model: self.model.clone(),
                id: id.to_string(),
                version,
            };
        }

        let messages: Vec<String> = errors
            .into_iter()
            .map(|e| match e.error_type {
                Some(kind) => format!("{kind}: {}", e.message),
                None => e.message,
            })
            .collect();
        Error::Remote(messages.join("; "))
    }

    async fn write(
        &self,
        op: &str,
        input: serde_json::Value,
        target: Option<(&str, Option<i64>)>,
    ) -> Result<String> {
        let data = self
            .execute(&self.mutation(op), json!({ "input": input }), target)
            .await?;
        let field = format!("{}{}", op.to_lowercase(), self.model);
        data[field.as_str()][ID]
            .as_str()
            .map(String::from)
            .ok_or_else(|| Error::Remote(format!("{field} returned no id")))
    }
}

#[derive(Debug, Deserialize)]
struct GraphqlResponse {
    #[serde(default)]
    data: Option<serde_json::Value>,
    #[serde(default)]
    errors: Vec<GraphqlError>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GraphqlError {
    #[serde(default)]
    message: String,
    #[serde(default)]
    error_type: Option<String>,
}

impl RemoteStore for GraphqlStore {
    fn model(&self) -> &str {
        &self.model
    }

    async fn list_page(&self, cursor: Option<&str>) -> Result<Page> {
        let variables = json!({ "limit": self.page_size, "nextToken": cursor });
        let data = self.execute(&self.list_query(), variables, None).await?;

        let field = format!("list{}", pluralize(&self.model));
        let connection = data
            .get(&field)
            .filter(|c| !c.is_null())
            .ok_or_else(|| Error::Remote(format!("{field} returned null")))?;

        let records: Vec<Record> = connection
            .get("items")
            .and_then(serde_json::Value::as_array)
            .map(|items| items.iter().cloned().filter_map(Record::from_json).collect())
            .unwrap_or_default();
        let next_cursor = connection["nextToken"].as_str().map(String::from);
        debug!(model = %self.model, count = records.len(), more = next_cursor.is_some(), "listed page");

        Ok(Page {
            records,
            next_cursor,
        })
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<Record>> {
        let data = self.execute(&self.get_query(), json!({ "id": id }), None).await?;
        let field = format!("get{}", self.model);
        Ok(data.get(&field).cloned().and_then(Record::from_json))
    }

    async fn create(&self, record: &Record) -> Result<String> {
        self.write("Create", self.input(record, None), None).await
    }

    async fn update(&self, record: &Record, version: Option<i64>) -> Result<()> {
        let id = record
            .id()
            .ok_or_else(|| Error::InvalidArgument("update requires an id".into()))?;
        self.write("Update", self.input(record, version), Some((&id, version)))
            .await
            .map(drop)
    }

    async fn delete(&self, id: &str, version: Option<i64>) -> Result<()> {
        let mut input = json!({ "id": id });
        if let (true, Some(v)) = (self.versioned, version) {
            input[VERSION] = json!(v);
        }
        self.write("Delete", input, Some((id, version)))
            .await
            .map(drop)
    }
}

/// English plural of a model name, as Amplify names its list queries.
fn pluralize(name: &str) -> String {
    let lower = name.to_ascii_lowercase();
    let consonant_y = lower.ends_with('y')
        && !matches!(lower.chars().rev().nth(1), Some('a' | 'e' | 'i' | 'o' | 'u'));

    if consonant_y && name.len() > 1 {
        format!("{}ies", &name[..name.len() - 1])
    } else if ["s", "x", "z", "ch", "sh"].iter().any(|s| lower.ends_with(s)) {
        format!("{name}es")
    } else {
        format!("{name}s")
    }
}
