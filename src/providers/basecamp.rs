//! Basecamp 3: projects, to-dos, messages, people, schedules and webhooks.
//!
//! Unlike the other plugins each operation is its own [`ActionDescriptor`]
//! with its own schema, so there is no `action` discriminant.

use std::sync::{Arc, OnceLock};

use serde_json::{json, Map, Value};

use crate::{
    client::{Config, RestClient},
    descriptor::{handler, ActionDescriptor, PluginDescriptor},
    dispatch::{req, require, RequiredParam},
    errors::{Result, ResultExt},
    http::{ApiProfile, ApiRequest, Auth},
    params::Params,
    schema::{FieldSchema, FieldType, InputSchema},
};

pub const PROFILE: ApiProfile = ApiProfile {
    label: "Basecamp",
    base_url: "https://3.basecampapi.com",
    error_pointers: &["/error", "/message", "/errors"],
};

const AUTH: &[RequiredParam] = &[req("account_id"), req("access_token")];

#[derive(Clone)]
pub struct BasecampClient {
    http: RestClient,
}

impl BasecampClient {
    /// Basecamp rejects requests without an identifying `User-Agent`; when
    /// `user_agent` is `None` the configured or default agent is sent.
    pub fn new(
        account_id: &str,
        access_token: &str,
        user_agent: Option<String>,
        cfg: &Config,
    ) -> Result<Self> {
        let base = format!("{}/{account_id}", PROFILE.base_url);
        let cfg = Config {
            user_agent: user_agent.or_else(|| cfg.user_agent.clone()),
            ..cfg.clone()
        };
        Ok(Self {
            http: RestClient::with_base(PROFILE, &base, Auth::bearer(access_token), &cfg)?,
        })
    }

    fn for_action(mut self, action: &str) -> Self {
        self.http = self.http.for_action(action);
        self
    }

    async fn get(&self, path: String) -> Result<Value> {
        self.http.send_json(ApiRequest::get(path)).await
    }

    async fn post(&self, path: String, body: Value) -> Result<Value> {
        self.http
            .send_json(ApiRequest::post(path).json_value(body))
            .await
    }

    pub async fn list_projects(&self) -> Result<Value> {
        self.get("/projects.json".into()).await
    }

    pub async fn get_project(&self, project_id: &str) -> Result<Value> {
        self.get(format!("/projects/{project_id}.json")).await
    }

    pub async fn create_project(&self, name: &str, description: Option<&str>) -> Result<Value> {
        self.post("/projects.json".into(), named(name, description))
            .await
    }

    pub async fn list_todo_lists(&self, project_id: &str) -> Result<Value> {
        self.get(format!("/projects/{project_id}/todolists.json"))
            .await
    }

    pub async fn create_todo_list(
        &self,
        project_id: &str,
        name: &str,
        description: Option<&str>,
    ) -> Result<Value> {
        self.post(
            format!("/projects/{project_id}/todolists.json"),
            named(name, description),
        )
        .await
    }

    pub async fn list_todos(&self, project_id: &str, todolist_id: &str) -> Result<Value> {
        self.get(format!(
            "/projects/{project_id}/todolists/{todolist_id}/todos.json"
        ))
        .await
    }

    pub async fn create_todo(
        &self,
        project_id: &str,
        todolist_id: &str,
        todo: &TodoFields,
    ) -> Result<Value> {
        self.post(
            format!("/projects/{project_id}/todolists/{todolist_id}/todos.json"),
            Value::Object(todo.to_body()),
        )
        .await
    }

    pub async fn update_todo(
        &self,
        project_id: &str,
        todolist_id: &str,
        todo_id: &str,
        todo: &TodoFields,
    ) -> Result<Value> {
        self.http
            .send_json(
                ApiRequest::put(format!(
                    "/projects/{project_id}/todolists/{todolist_id}/todos/{todo_id}.json"
                ))
                .json_value(Value::Object(todo.to_body())),
            )
            .await
    }

    pub async fn create_message(
        &self,
        project_id: &str,
        message_board_id: &str,
        subject: &str,
        content: &str,
    ) -> Result<Value> {
        self.post(
            format!("/projects/{project_id}/message_boards/{message_board_id}/messages.json"),
            json!({ "subject": subject, "content": content }),
        )
        .await
    }

    pub async fn list_people(&self) -> Result<Value> {
        self.get("/people.json".into()).await
    }

    pub async fn create_schedule_entry(
        &self,
        project_id: &str,
        schedule_id: &str,
        entry: &ScheduleEntry,
    ) -> Result<Value> {
        let mut body = Map::new();
        body.insert("summary".into(), json!(entry.summary));
        if let Some(description) = &entry.description {
            body.insert("description".into(), json!(description));
        }
        if let Some(starts_at) = &entry.starts_at {
            body.insert("starts_at".into(), json!(starts_at));
        }
        if let Some(ends_at) = &entry.ends_at {
            body.insert("ends_at".into(), json!(ends_at));
        }
        if let Some(all_day) = entry.all_day {
            body.insert("all_day".into(), json!(all_day));
        }
        self.post(
            format!("/projects/{project_id}/schedules/{schedule_id}/entries.json"),
            Value::Object(body),
        )
        .await
    }

    pub async fn list_webhooks(&self) -> Result<Value> {
        self.get("/webhooks.json".into()).await
    }

    pub async fn create_webhook(&self, url: &str, types: &[String], active: bool) -> Result<Value> {
        self.post(
            "/webhooks.json".into(),
            json!({ "active": active, "url": url, "types": types }),
        )
        .await
    }

    pub async fn delete_webhook(&self, webhook_id: &str) -> Result<()> {
        self.http
            .send_empty(ApiRequest::delete(format!("/webhooks/{webhook_id}.json")))
            .await
    }
}

fn named(name: &str, description: Option<&str>) -> Value {
    let mut body = json!({ "name": name });
    if let Some(description) = description {
        body["description"] = json!(description);
    }
    body
}

/// To-do fields. On update only the fields that are set are sent.
#[derive(Clone, Debug, Default)]
pub struct TodoFields {
    pub content: Option<String>,
    pub description: Option<String>,
    pub assignee_ids: Option<Vec<String>>,
    pub due_on: Option<String>,
    pub completed: Option<bool>,
}

impl TodoFields {
    fn from_params(params: &Params) -> Result<Self> {
        Ok(Self {
            content: params.opt_str("content")?,
            description: params.opt_str("description")?,
            assignee_ids: match params.opt_value("assignee_ids") {
                Some(_) => Some(params.string_list("assignee_ids")?),
                None => None,
            },
            due_on: params.opt_str("due_on")?,
            completed: params.opt_bool("completed")?,
        })
    }

    fn to_body(&self) -> Map<String, Value> {
        let mut body = Map::new();
        if let Some(content) = &self.content {
            body.insert("content".into(), json!(content));
        }
        if let Some(description) = &self.description {
            body.insert("description".into(), json!(description));
        }
        if let Some(ids) = self.assignee_ids.as_ref().filter(|ids| !ids.is_empty()) {
            body.insert("assignee_ids".into(), json!(ids));
        }
        if let Some(due_on) = &self.due_on {
            body.insert("due_on".into(), json!(due_on));
        }
        if let Some(completed) = self.completed {
            body.insert("completed".into(), json!(completed));
        }
        body
    }
}

#[derive(Clone, Debug, Default)]
pub struct ScheduleEntry {
    pub summary: String,
    pub description: Option<String>,
    pub starts_at: Option<String>,
    pub ends_at: Option<String>,
    pub all_day: Option<bool>,
}

/// Validate credentials plus the action's own parameters in one pass, then
/// build the client.
fn connect(
    action: &str,
    input: Value,
    required: &[RequiredParam],
    cfg: &Config,
) -> Result<(BasecampClient, Params)> {
    let params = Params::from_value(input)?;
    require(&params, &[AUTH, required].concat())?;
    let client = BasecampClient::new(
        &params.str("account_id")?,
        &params.str("access_token")?,
        params.opt_str("user_agent")?,
        cfg,
    )?
    .for_action(action);
    Ok((client, params))
}

async fn list_projects(input: Value, cfg: Config) -> Result<Value> {
    let (client, _) = connect("list_projects", input, &[], &cfg)?;
    client
        .list_projects()
        .await
        .context("Error listing Basecamp projects")
}

async fn get_project(input: Value, cfg: Config) -> Result<Value> {
    let (client, params) = connect("get_project", input, &[req("project_id")], &cfg)?;
    client
        .get_project(&params.str("project_id")?)
        .await
        .context("Error getting Basecamp project")
}

async fn create_project(input: Value, cfg: Config) -> Result<Value> {
    let (client, params) = connect("create_project", input, &[req("name")], &cfg)?;
    client
        .create_project(
            &params.str("name")?,
            params.opt_str("description")?.as_deref(),
        )
        .await
        .context("Error creating Basecamp project")
}

async fn list_todo_lists(input: Value, cfg: Config) -> Result<Value> {
    let (client, params) = connect("list_todo_lists", input, &[req("project_id")], &cfg)?;
    client
        .list_todo_lists(&params.str("project_id")?)
        .await
        .context("Error listing Basecamp to-do lists")
}

async fn create_todo_list(input: Value, cfg: Config) -> Result<Value> {
    let (client, params) = connect(
        "create_todo_list",
        input,
        &[req("project_id"), req("name")],
        &cfg,
    )?;
    client
        .create_todo_list(
            &params.str("project_id")?,
            &params.str("name")?,
            params.opt_str("description")?.as_deref(),
        )
        .await
        .context("Error creating Basecamp to-do list")
}

async fn list_todos(input: Value, cfg: Config) -> Result<Value> {
    let (client, params) = connect(
        "list_todos",
        input,
        &[req("project_id"), req("todolist_id")],
        &cfg,
    )?;
    client
        .list_todos(&params.str("project_id")?, &params.str("todolist_id")?)
        .await
        .context("Error listing Basecamp to-dos")
}

async fn create_todo(input: Value, cfg: Config) -> Result<Value> {
    let (client, params) = connect(
        "create_todo",
        input,
        &[req("project_id"), req("todolist_id"), req("content")],
        &cfg,
    )?;
    client
        .create_todo(
            &params.str("project_id")?,
            &params.str("todolist_id")?,
            &TodoFields::from_params(&params)?,
        )
        .await
        .context("Error creating Basecamp to-do")
}

async fn update_todo(input: Value, cfg: Config) -> Result<Value> {
    let (client, params) = connect(
        "update_todo",
        input,
        &[req("project_id"), req("todolist_id"), req("todo_id")],
        &cfg,
    )?;
    client
        .update_todo(
            &params.str("project_id")?,
            &params.str("todolist_id")?,
            &params.str("todo_id")?,
            &TodoFields::from_params(&params)?,
        )
        .await
        .context("Error updating Basecamp to-do")
}

async fn create_message(input: Value, cfg: Config) -> Result<Value> {
    let (client, params) = connect(
        "create_message",
        input,
        &[
            req("project_id"),
            req("message_board_id"),
            req("subject"),
            req("content"),
        ],
        &cfg,
    )?;
    client
        .create_message(
            &params.str("project_id")?,
            &params.str("message_board_id")?,
            &params.str("subject")?,
            &params.str("content")?,
        )
        .await
        .context("Error creating Basecamp message")
}

async fn list_people(input: Value, cfg: Config) -> Result<Value> {
    let (client, _) = connect("list_people", input, &[], &cfg)?;
    client
        .list_people()
        .await
        .context("Error listing Basecamp people")
}

async fn create_schedule_entry(input: Value, cfg: Config) -> Result<Value> {
    let (client, params) = connect(
        "create_schedule_entry",
        input,
        &[req("project_id"), req("schedule_id"), req("summary")],
        &cfg,
    )?;
    let entry = ScheduleEntry {
        summary: params.str("summary")?,
        description: params.opt_str("description")?,
        starts_at: params.opt_str("starts_at")?,
        ends_at: params.opt_str("ends_at")?,
        all_day: params.opt_bool("all_day")?,
    };
    client
        .create_schedule_entry(
            &params.str("project_id")?,
            &params.str("schedule_id")?,
            &entry,
        )
        .await
        .context("Error creating Basecamp schedule entry")
}

async fn list_webhooks(input: Value, cfg: Config) -> Result<Value> {
    let (client, _) = connect("list_webhooks", input, &[], &cfg)?;
    client
        .list_webhooks()
        .await
        .context("Error listing Basecamp webhooks")
}

async fn create_webhook(input: Value, cfg: Config) -> Result<Value> {
    let (client, params) = connect(
        "create_webhook",
        input,
        &[req("url"), RequiredParam::non_empty("types")],
        &cfg,
    )?;
    client
        .create_webhook(
            &params.str("url")?,
            &params.string_list("types")?,
            params.opt_bool("active")?.unwrap_or(true),
        )
        .await
        .context("Error creating Basecamp webhook")
}

async fn delete_webhook(input: Value, cfg: Config) -> Result<Value> {
    let (client, params) = connect("delete_webhook", input, &[req("webhook_id")], &cfg)?;
    client
        .delete_webhook(&params.str("webhook_id")?)
        .await
        .context("Error deleting Basecamp webhook")?;
    Ok(super::success("Webhook deleted successfully"))
}

fn credentials_schema() -> InputSchema {
    InputSchema::new()
        .required_field(
            FieldSchema::string("account_id")
                .title("Account ID")
                .description("Basecamp account id"),
        )
        .required_field(
            FieldSchema::string("access_token")
                .title("Access Token")
                .description("OAuth 2 access token"),
        )
        .field(
            FieldSchema::string("user_agent")
                .title("User Agent")
                .description("Identifying User-Agent, e.g. \"MyApp (me@example.com)\""),
        )
}

fn schema(required: Vec<FieldSchema>, optional: Vec<FieldSchema>) -> InputSchema {
    let schema = required
        .into_iter()
        .fold(credentials_schema(), InputSchema::required_field);
    optional.into_iter().fold(schema, InputSchema::field)
}

fn project_id() -> FieldSchema {
    FieldSchema::string("project_id").description("Project (bucket) id")
}

fn todolist_id() -> FieldSchema {
    FieldSchema::string("todolist_id").description("To-do list id")
}

fn todo_optional() -> Vec<FieldSchema> {
    vec![
        FieldSchema::string("description"),
        FieldSchema::array("assignee_ids", FieldType::String),
        FieldSchema::string("due_on").description("Due date, YYYY-MM-DD"),
    ]
}

pub fn descriptor() -> Arc<PluginDescriptor> {
    static DESCRIPTOR: OnceLock<Arc<PluginDescriptor>> = OnceLock::new();
    DESCRIPTOR.get_or_init(build_descriptor).clone()
}

fn build_descriptor() -> Arc<PluginDescriptor> {
    let mut update_optional = todo_optional();
    update_optional.push(FieldSchema::string("content"));
    update_optional.push(FieldSchema::boolean("completed"));

    let actions = vec![
        ActionDescriptor::new(
            "list_projects",
            "List all projects",
            schema(vec![], vec![]),
            handler(list_projects),
        ),
        ActionDescriptor::new(
            "get_project",
            "Get one project",
            schema(vec![project_id()], vec![]),
            handler(get_project),
        ),
        ActionDescriptor::new(
            "create_project",
            "Create a project",
            schema(
                vec![FieldSchema::string("name")],
                vec![FieldSchema::string("description")],
            ),
            handler(create_project),
        ),
        ActionDescriptor::new(
            "list_todo_lists",
            "List the to-do lists of a project",
            schema(vec![project_id()], vec![]),
            handler(list_todo_lists),
        ),
        ActionDescriptor::new(
            "create_todo_list",
            "Create a to-do list",
            schema(
                vec![project_id(), FieldSchema::string("name")],
                vec![FieldSchema::string("description")],
            ),
            handler(create_todo_list),
        ),
        ActionDescriptor::new(
            "list_todos",
            "List the to-dos of a list",
            schema(vec![project_id(), todolist_id()], vec![]),
            handler(list_todos),
        ),
        ActionDescriptor::new(
            "create_todo",
            "Create a to-do",
            schema(
                vec![project_id(), todolist_id(), FieldSchema::string("content")],
                todo_optional(),
            ),
            handler(create_todo),
        ),
        ActionDescriptor::new(
            "update_todo",
            "Update a to-do",
            schema(
                vec![project_id(), todolist_id(), FieldSchema::string("todo_id")],
                update_optional,
            ),
            handler(update_todo),
        ),
        ActionDescriptor::new(
            "create_message",
            "Post a message to a message board",
            schema(
                vec![
                    project_id(),
                    FieldSchema::string("message_board_id"),
                    FieldSchema::string("subject"),
                    FieldSchema::string("content").description("Rich text (HTML) body"),
                ],
                vec![],
            ),
            handler(create_message),
        ),
        ActionDescriptor::new(
            "list_people",
            "List everyone visible to the token",
            schema(vec![], vec![]),
            handler(list_people),
        ),
        ActionDescriptor::new(
            "create_schedule_entry",
            "Add an entry to a project schedule",
            schema(
                vec![
                    project_id(),
                    FieldSchema::string("schedule_id"),
                    FieldSchema::string("summary"),
                ],
                vec![
                    FieldSchema::string("description"),
                    FieldSchema::string("starts_at").description("ISO 8601 start"),
                    FieldSchema::string("ends_at").description("ISO 8601 end"),
                    FieldSchema::boolean("all_day"),
                ],
            ),
            handler(create_schedule_entry),
        ),
        ActionDescriptor::new(
            "list_webhooks",
            "List webhooks",
            schema(vec![], vec![]),
            handler(list_webhooks),
        ),
        ActionDescriptor::new(
            "create_webhook",
            "Create a webhook",
            schema(
                vec![
                    FieldSchema::string("url").description("HTTPS payload URL"),
                    FieldSchema::array("types", FieldType::String)
                        .description("Recording types, e.g. Todo, Message"),
                ],
                vec![FieldSchema::boolean("active").default_value(json!(true))],
            ),
            handler(create_webhook),
        ),
        ActionDescriptor::new(
            "delete_webhook",
            "Delete a webhook",
            schema(vec![FieldSchema::string("webhook_id")], vec![]),
            handler(delete_webhook),
        ),
    ];

    actions
        .into_iter()
        .fold(
            PluginDescriptor::builder("basecamp", "Basecamp")
                .description("Project management and team communication")
                .tags(&["project-management", "collaboration"])
                .documentation("https://github.com/basecamp/bc3-api")
                .input_schema(credentials_schema())
                .example(
                    json!({ "account_id": "999999999", "access_token": "your-token" }),
                    json!([{ "id": 2085958499, "name": "The Leto Laptop" }]),
                ),
            |builder, action| builder.action(action),
        )
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_action_requires_credentials() {
        let plugin = descriptor();
        assert_eq!(plugin.actions().len(), 14);
        for action in plugin.actions() {
            assert!(action.input_schema.required.starts_with(&["account_id", "access_token"]));
        }
    }

    #[test]
    fn connect_reports_credentials_and_params_together() {
        let err = connect(
            "get_project",
            json!({ "account_id": "1" }),
            &[req("project_id")],
            &Config::default(),
        )
        .err()
        .unwrap();
        assert_eq!(
            err.to_string(),
            "Missing required parameters: access_token, project_id"
        );
    }

    #[test]
    fn todo_update_sends_only_set_fields() {
        let fields = TodoFields {
            completed: Some(true),
            assignee_ids: Some(vec![]),
            ..Default::default()
        };
        assert_eq!(Value::Object(fields.to_body()), json!({ "completed": true }));
    }
}
