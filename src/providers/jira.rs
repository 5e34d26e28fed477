//! Jira Cloud REST v3: issues, comments, watchers, links and attachments.
//!
//! Every dispatched action first checks `/myself`; bad credentials surface as
//! `Invalid Jira Cloud authentication` before the real endpoint is touched.

use std::sync::{Arc, OnceLock};

use serde_json::{json, Map, Value};

use crate::{
    client::{unwrap_field, Config, RestClient},
    descriptor::PluginDescriptor,
    dispatch::{req, resolve, ActionKind, RequiredParam, ACTION_KEY},
    errors::{Error, Result},
    http::{ApiProfile, ApiRequest, Auth, MultipartPart},
    params::Params,
    schema::FieldSchema,
};

pub const PROFILE: ApiProfile = ApiProfile {
    label: "Jira Cloud",
    base_url: "https://your-domain.atlassian.net/rest/api/3",
    error_pointers: &["/errorMessages", "/message", "/error/message"],
};

const CREDENTIALS: &[RequiredParam] = &[req("instanceUrl"), req("email"), req("apiToken")];
const DEFAULT_MAX_RESULTS: u64 = 50;

crate::actions! {
    pub enum JiraAction {
        CreateIssue = "create_issue" => [req("projectId"), req("issueTypeId"), req("summary")],
        UpdateIssue = "update_issue" => [req("issueIdOrKey")],
        GetIssue = "get_issue" => [req("issueIdOrKey")],
        SearchIssues = "search_issues" => [req("jql")],
        AddComment = "add_comment" => [req("issueIdOrKey"), req("comment")],
        UpdateComment = "update_comment" => [req("issueIdOrKey"), req("commentId"), req("comment")],
        DeleteComment = "delete_comment" => [req("issueIdOrKey"), req("commentId")],
        GetComments = "get_comments" => [req("issueIdOrKey")],
        AssignIssue = "assign_issue" => [req("issueIdOrKey"), req("assignee")],
        AddWatcher = "add_watcher" => [req("issueIdOrKey"), req("accountId")],
        FindUser = "find_user" => [req("query")],
        LinkIssues = "link_issues" => [req("inwardIssueKey"), req("outwardIssueKey"), req("linkTypeId")],
        AddAttachment = "add_attachment" => [req("issueIdOrKey"), req("filename"), req("content")],
    }
}

/// Site credentials: instance URL plus an Atlassian account email and API token.
#[derive(Clone)]
pub struct JiraAuth {
    pub instance_url: String,
    pub email: String,
    pub api_token: String,
}

/// Issue fields accepted by create and update.
#[derive(Clone, Debug, Default)]
pub struct IssueFields {
    pub summary: Option<String>,
    pub description: Option<String>,
    pub assignee: Option<String>,
    pub priority: Option<String>,
    pub parent_key: Option<String>,
    /// Raw fields merged as-is (custom fields, labels, ...).
    pub extra: Map<String, Value>,
}

impl IssueFields {
    fn into_fields(self) -> Map<String, Value> {
        let mut fields = Map::new();
        if let Some(summary) = self.summary {
            fields.insert("summary".into(), json!(summary));
        }
        if let Some(assignee) = self.assignee {
            fields.insert("assignee".into(), json!({ "id": assignee }));
        }
        if let Some(priority) = self.priority {
            fields.insert("priority".into(), json!({ "id": priority }));
        }
        if let Some(description) = self.description {
            fields.insert("description".into(), adf_document(&description));
        }
        if let Some(parent) = self.parent_key {
            fields.insert("parent".into(), json!({ "key": parent }));
        }
        fields.extend(self.extra);
        fields
    }
}

/// Single-paragraph Atlassian Document Format body.
pub fn adf_document(text: &str) -> Value {
    json!({
        "type": "doc",
        "version": 1,
        "content": [{
            "type": "paragraph",
            "content": [{ "type": "text", "text": text }]
        }]
    })
}

#[derive(Clone)]
pub struct JiraClient {
    http: RestClient,
}

impl JiraClient {
    pub fn new(auth: &JiraAuth, cfg: &Config) -> Result<Self> {
        let base = format!("{}/rest/api/3", auth.instance_url.trim_end_matches('/'));
        Ok(Self {
            http: RestClient::with_base(
                PROFILE,
                &base,
                Auth::basic(&auth.email, &auth.api_token),
                cfg,
            )?,
        })
    }

    fn for_action(&self, action: JiraAction) -> Self {
        Self {
            http: self.http.for_action(action.name()),
        }
    }

    /// `true` when `/myself` answers successfully.
    pub async fn validate_auth(&self) -> bool {
        match self.get_current_user().await {
            Ok(_) => true,
            Err(_err) => {
                #[cfg(feature = "tracing")]
                tracing::info!(error = %_err, "jira credential check failed");
                false
            }
        }
    }

    pub async fn get_current_user(&self) -> Result<Value> {
        self.http.send_json(ApiRequest::get("/myself")).await
    }

    pub async fn get_projects(&self) -> Result<Value> {
        let page: Value = self.http.send_json(ApiRequest::get("/project/search")).await?;
        unwrap_field(page, "values")
    }

    pub async fn get_issue_types(&self, project_id: &str) -> Result<Value> {
        self.http
            .send_json(ApiRequest::get("/issuetype/project").query("projectId", project_id))
            .await
    }

    pub async fn get_priorities(&self) -> Result<Value> {
        self.http.send_json(ApiRequest::get("/priority")).await
    }

    pub async fn create_issue(
        &self,
        project_id: &str,
        issue_type_id: &str,
        fields: IssueFields,
    ) -> Result<Value> {
        let mut body = Map::new();
        body.insert("project".into(), json!({ "id": project_id }));
        body.insert("issuetype".into(), json!({ "id": issue_type_id }));
        body.extend(fields.into_fields());
        self.http
            .send_json(ApiRequest::post("/issue").json_value(json!({ "fields": body })))
            .await
    }

    /// Jira answers 204 on success, so the result is usually `null`.
    pub async fn update_issue(&self, issue: &str, fields: IssueFields) -> Result<Value> {
        self.http
            .send_value(
                ApiRequest::put(format!("/issue/{issue}"))
                    .json_value(json!({ "fields": fields.into_fields() })),
            )
            .await
    }

    pub async fn get_issue(&self, issue: &str) -> Result<Value> {
        self.http
            .send_json(ApiRequest::get(format!("/issue/{issue}")))
            .await
    }

    pub async fn search_issues(&self, jql: &str, max_results: Option<u64>) -> Result<Value> {
        let body = json!({
            "jql": jql,
            "maxResults": max_results.unwrap_or(DEFAULT_MAX_RESULTS),
        });
        let page: Value = self
            .http
            .send_json(ApiRequest::post("/search").json_value(body))
            .await?;
        unwrap_field(page, "issues")
    }

    pub async fn add_comment(&self, issue: &str, comment: &str) -> Result<Value> {
        self.http
            .send_json(
                ApiRequest::post(format!("/issue/{issue}/comment"))
                    .json_value(json!({ "body": adf_document(comment) })),
            )
            .await
    }

    pub async fn get_comments(&self, issue: &str) -> Result<Value> {
        let page: Value = self
            .http
            .send_json(ApiRequest::get(format!("/issue/{issue}/comment")))
            .await?;
        unwrap_field(page, "comments")
    }

    pub async fn update_comment(&self, issue: &str, comment_id: &str, comment: &str) -> Result<Value> {
        self.http
            .send_json(
                ApiRequest::put(format!("/issue/{issue}/comment/{comment_id}"))
                    .json_value(json!({ "body": adf_document(comment) })),
            )
            .await
    }

    pub async fn delete_comment(&self, issue: &str, comment_id: &str) -> Result<()> {
        self.http
            .send_empty(ApiRequest::delete(format!("/issue/{issue}/comment/{comment_id}")))
            .await
    }

    pub async fn assign_issue(&self, issue: &str, account_id: &str) -> Result<()> {
        self.http
            .send_empty(
                ApiRequest::put(format!("/issue/{issue}/assignee"))
                    .json_value(json!({ "accountId": account_id })),
            )
            .await
    }

    /// The watchers endpoint takes a bare JSON string as its body.
    pub async fn add_watcher(&self, issue: &str, account_id: &str) -> Result<()> {
        self.http
            .send_empty(
                ApiRequest::post(format!("/issue/{issue}/watchers")).json_value(json!(account_id)),
            )
            .await
    }

    pub async fn find_users(&self, query: &str) -> Result<Value> {
        self.http
            .send_json(ApiRequest::get("/user/search").query("query", query))
            .await
    }

    pub async fn link_issues(
        &self,
        inward: &str,
        outward: &str,
        link_type_id: &str,
        comment: Option<&str>,
    ) -> Result<()> {
        let mut body = json!({
            "inwardIssue": { "key": inward },
            "outwardIssue": { "key": outward },
            "type": { "id": link_type_id },
        });
        if let Some(comment) = comment {
            body["comment"] = json!({ "body": adf_document(comment) });
        }
        self.http
            .send_empty(ApiRequest::post("/issueLink").json_value(body))
            .await
    }

    pub async fn add_attachment(&self, issue: &str, filename: &str, content: &str) -> Result<Value> {
        let part = MultipartPart {
            name: "file".into(),
            file_name: Some(filename.to_string()),
            content_type: None,
            data: content.as_bytes().to_vec(),
        };
        self.http
            .send_json(
                ApiRequest::post(format!("/issue/{issue}/attachments"))
                    .header("X-Atlassian-Token", "no-check")
                    .multipart(vec![part]),
            )
            .await
    }
}

/// Keys consumed by `create_issue`; everything else (minus credentials) is a raw field.
const CREATE_KEYS: &[&str] = &[
    ACTION_KEY,
    "instanceUrl",
    "email",
    "apiToken",
    "projectId",
    "issueTypeId",
    "summary",
    "description",
    "assignee",
    "priority",
    "parentKey",
];

const UPDATE_KEYS: &[&str] = &[
    ACTION_KEY,
    "instanceUrl",
    "email",
    "apiToken",
    "issueIdOrKey",
    "summary",
    "description",
    "assignee",
    "priority",
];

fn issue_fields(params: &Params, consumed: &[&str]) -> Result<IssueFields> {
    Ok(IssueFields {
        summary: params.opt_str("summary")?,
        description: params.opt_str("description")?,
        assignee: params.opt_str("assignee")?,
        priority: params.opt_str("priority")?,
        parent_key: params.opt_str("parentKey")?,
        extra: params.without(consumed),
    })
}

/// Dispatch one Jira Cloud action.
pub async fn execute(input: Value, cfg: &Config) -> Result<Value> {
    let params = Params::from_value(input)?;
    let action: JiraAction = resolve(&params, CREDENTIALS)?;
    let auth = JiraAuth {
        instance_url: params.str("instanceUrl")?,
        email: params.str("email")?,
        api_token: params.str("apiToken")?,
    };
    let client = JiraClient::new(&auth, cfg)?;
    if !client.validate_auth().await {
        return Err(Error::invalid_auth(PROFILE.label));
    }
    let client = client.for_action(action);

    match action {
        JiraAction::CreateIssue => {
            let mut fields = issue_fields(&params, CREATE_KEYS)?;
            fields.summary = Some(params.str("summary")?);
            client
                .create_issue(&params.str("projectId")?, &params.str("issueTypeId")?, fields)
                .await
        }
        JiraAction::UpdateIssue => {
            let mut fields = issue_fields(&params, UPDATE_KEYS)?;
            fields.parent_key = None;
            client
                .update_issue(&params.str("issueIdOrKey")?, fields)
                .await
        }
        JiraAction::GetIssue => client.get_issue(&params.str("issueIdOrKey")?).await,
        JiraAction::SearchIssues => {
            client
                .search_issues(&params.str("jql")?, params.opt_u64("maxResults")?)
                .await
        }
        JiraAction::AddComment => {
            client
                .add_comment(&params.str("issueIdOrKey")?, &params.str("comment")?)
                .await
        }
        JiraAction::UpdateComment => {
            client
                .update_comment(
                    &params.str("issueIdOrKey")?,
                    &params.str("commentId")?,
                    &params.str("comment")?,
                )
                .await
        }
        JiraAction::DeleteComment => {
            let comment_id = params.str("commentId")?;
            client
                .delete_comment(&params.str("issueIdOrKey")?, &comment_id)
                .await?;
            Ok(super::success(format!("Comment {comment_id} deleted successfully")))
        }
        JiraAction::GetComments => client.get_comments(&params.str("issueIdOrKey")?).await,
        JiraAction::AssignIssue => {
            let issue = params.str("issueIdOrKey")?;
            let assignee = params.str("assignee")?;
            client.assign_issue(&issue, &assignee).await?;
            Ok(super::success(format!(
                "Issue {issue} assigned to user {assignee}"
            )))
        }
        JiraAction::AddWatcher => {
            let issue = params.str("issueIdOrKey")?;
            let account = params.str("accountId")?;
            client.add_watcher(&issue, &account).await?;
            Ok(super::success(format!(
                "User {account} added as watcher to issue {issue}"
            )))
        }
        JiraAction::FindUser => client.find_users(&params.str("query")?).await,
        JiraAction::LinkIssues => {
            let inward = params.str("inwardIssueKey")?;
            let outward = params.str("outwardIssueKey")?;
            let comment = params.opt_str("comment")?;
            client
                .link_issues(
                    &inward,
                    &outward,
                    &params.str("linkTypeId")?,
                    comment.as_deref(),
                )
                .await?;
            Ok(super::success(format!(
                "Issues {inward} and {outward} linked successfully"
            )))
        }
        JiraAction::AddAttachment => {
            client
                .add_attachment(
                    &params.str("issueIdOrKey")?,
                    &params.str("filename")?,
                    &params.str("content")?,
                )
                .await
        }
    }
}

pub fn descriptor() -> Arc<PluginDescriptor> {
    static DESCRIPTOR: OnceLock<Arc<PluginDescriptor>> = OnceLock::new();
    DESCRIPTOR.get_or_init(build_descriptor).clone()
}

fn build_descriptor() -> Arc<PluginDescriptor> {
    use JiraAction as A;
    let issue_actions = [
        A::UpdateIssue,
        A::GetIssue,
        A::AddComment,
        A::UpdateComment,
        A::DeleteComment,
        A::GetComments,
        A::AssignIssue,
        A::AddWatcher,
        A::AddAttachment,
    ]
    .map(A::name);

    let schema = super::mega_schema::<A>(vec![
        FieldSchema::string("instanceUrl")
            .title("Instance URL")
            .description("Your Jira Cloud instance URL (e.g., https://your-domain.atlassian.net)"),
        FieldSchema::string("email")
            .title("Email")
            .description("Email address associated with your Atlassian account"),
        FieldSchema::string("apiToken")
            .title("API Token")
            .description("API token generated from your Atlassian account"),
    ])
    .field(
        FieldSchema::string("projectId")
            .description("ID of the project")
            .shown_for(&[A::CreateIssue.name()]),
    )
    .field(
        FieldSchema::string("issueTypeId")
            .description("ID of the issue type")
            .shown_for(&[A::CreateIssue.name()]),
    )
    .field(
        FieldSchema::string("summary")
            .description("Issue summary")
            .shown_for(&[A::CreateIssue.name(), A::UpdateIssue.name()]),
    )
    .field(
        FieldSchema::string("description")
            .description("Issue description (plain text)")
            .shown_for(&[A::CreateIssue.name(), A::UpdateIssue.name()]),
    )
    .field(
        FieldSchema::string("assignee")
            .description("Account ID of the assignee")
            .shown_for(&[
                A::CreateIssue.name(),
                A::UpdateIssue.name(),
                A::AssignIssue.name(),
            ]),
    )
    .field(
        FieldSchema::string("priority")
            .description("ID of the priority")
            .shown_for(&[A::CreateIssue.name(), A::UpdateIssue.name()]),
    )
    .field(
        FieldSchema::string("parentKey")
            .description("Key of the parent issue (for subtasks)")
            .shown_for(&[A::CreateIssue.name()]),
    )
    .field(
        FieldSchema::string("issueIdOrKey")
            .description("ID or key of the issue")
            .shown_for(&issue_actions),
    )
    .field(
        FieldSchema::string("jql")
            .description("JQL query string")
            .shown_for(&[A::SearchIssues.name()]),
    )
    .field(
        FieldSchema::integer("maxResults")
            .description("Maximum number of results")
            .default_value(json!(DEFAULT_MAX_RESULTS))
            .shown_for(&[A::SearchIssues.name()]),
    )
    .field(
        FieldSchema::string("comment")
            .description("Comment text")
            .shown_for(&[
                A::AddComment.name(),
                A::UpdateComment.name(),
                A::LinkIssues.name(),
            ]),
    )
    .field(
        FieldSchema::string("commentId")
            .description("ID of the comment")
            .shown_for(&[A::UpdateComment.name(), A::DeleteComment.name()]),
    )
    .field(
        FieldSchema::string("accountId")
            .description("Account ID of the user")
            .shown_for(&[A::AddWatcher.name()]),
    )
    .field(
        FieldSchema::string("query")
            .description("Search string for users")
            .shown_for(&[A::FindUser.name()]),
    )
    .field(FieldSchema::string("inwardIssueKey").shown_for(&[A::LinkIssues.name()]))
    .field(FieldSchema::string("outwardIssueKey").shown_for(&[A::LinkIssues.name()]))
    .field(FieldSchema::string("linkTypeId").shown_for(&[A::LinkIssues.name()]))
    .field(FieldSchema::string("filename").shown_for(&[A::AddAttachment.name()]))
    .field(
        FieldSchema::string("content")
            .description("Attachment content")
            .shown_for(&[A::AddAttachment.name()]),
    );

    PluginDescriptor::builder("jira-cloud", "Jira Cloud")
        .description("Project and issue tracking for software teams")
        .tags(&["project-management", "issues", "atlassian"])
        .documentation("https://developer.atlassian.com/cloud/jira/platform/rest/v3/intro/")
        .input_schema(schema.clone())
        .example(
            json!({
                "action": "create_issue",
                "instanceUrl": "https://your-domain.atlassian.net",
                "email": "user@example.com",
                "apiToken": "your-api-token",
                "projectId": "10000",
                "issueTypeId": "10001",
                "summary": "Login button misaligned"
            }),
            json!({
                "id": "10002",
                "key": "PROJ-123",
                "self": "https://your-domain.atlassian.net/rest/api/3/issue/10002"
            }),
        )
        .action(super::mega_action(
            "jira-cloud",
            "Execute a Jira Cloud action",
            schema,
            |input, cfg| async move { execute(input, &cfg).await },
        ))
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issue_fields_wrap_ids_and_description() {
        let fields = IssueFields {
            summary: Some("Broken".into()),
            description: Some("Steps".into()),
            assignee: Some("acc-1".into()),
            priority: Some("3".into()),
            parent_key: Some("PROJ-1".into()),
            extra: Map::new(),
        }
        .into_fields();
        assert_eq!(fields["assignee"], json!({"id": "acc-1"}));
        assert_eq!(fields["priority"], json!({"id": "3"}));
        assert_eq!(fields["parent"], json!({"key": "PROJ-1"}));
        assert_eq!(
            fields["description"]["content"][0]["content"][0]["text"],
            "Steps"
        );
    }

    #[test]
    fn extra_fields_exclude_credentials() {
        let params = Params::from_value(json!({
            "action": "create_issue",
            "instanceUrl": "https://x.atlassian.net",
            "email": "a@b.c",
            "apiToken": "secret",
            "projectId": "1",
            "issueTypeId": "2",
            "summary": "s",
            "labels": ["bug"]
        }))
        .unwrap();
        let fields = issue_fields(&params, CREATE_KEYS).unwrap();
        assert_eq!(Value::Object(fields.extra), json!({"labels": ["bug"]}));
    }
}
