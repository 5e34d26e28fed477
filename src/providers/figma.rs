//! Figma REST: files, comments, renders, team libraries and webhooks.

use std::sync::{Arc, OnceLock};

use serde_json::{json, Value};

use crate::{
    client::{Config, RestClient},
    descriptor::PluginDescriptor,
    dispatch::{req, resolve, ActionKind, RequiredParam},
    errors::Result,
    http::{ApiProfile, ApiRequest, Auth},
    params::Params,
    schema::{FieldSchema, FieldType},
};

pub const PROFILE: ApiProfile = ApiProfile {
    label: "Figma",
    base_url: "https://api.figma.com",
    error_pointers: &["/message", "/err", "/error"],
};

const CREDENTIALS: &[RequiredParam] = &[req("token")];

crate::actions! {
    pub enum FigmaAction {
        GetFile = "get_file" => [req("fileKey")],
        GetFileComments = "get_file_comments" => [req("fileKey")],
        PostFileComment = "post_file_comment" => [req("fileKey"), req("message")],
        GetFileImages = "get_file_images" => [req("fileKey"), RequiredParam::non_empty("ids")],
        GetFileNodes = "get_file_nodes" => [req("fileKey"), RequiredParam::non_empty("ids")],
        GetTeamProjects = "get_team_projects" => [req("teamId")],
        GetProjectFiles = "get_project_files" => [req("projectId")],
        GetTeamComponents = "get_team_components" => [req("teamId")],
        GetFileComponents = "get_file_components" => [req("fileKey")],
        GetComponentSets = "get_component_sets" => [req("fileKey")],
        GetStyles = "get_styles" => [req("fileKey")],
        CreateWebhook = "create_webhook" => [req("teamId"), req("eventType"), req("endpoint")],
        DeleteWebhook = "delete_webhook" => [req("webhookId")],
    }
}

/// Render options for [`FigmaClient::get_file_images`].
#[derive(Clone, Debug, Default)]
pub struct ImageOptions {
    pub scale: Option<f64>,
    /// `jpg`, `png`, `svg` or `pdf`.
    pub format: Option<String>,
}

#[derive(Clone)]
pub struct FigmaClient {
    http: RestClient,
}

impl FigmaClient {
    pub fn new(token: &str, cfg: &Config) -> Result<Self> {
        Ok(Self {
            http: RestClient::new(PROFILE, Auth::bearer(token), cfg)?,
        })
    }

    fn for_action(mut self, action: FigmaAction) -> Self {
        self.http = self.http.for_action(action.name());
        self
    }

    async fn get(&self, path: String) -> Result<Value> {
        self.http.send_json(ApiRequest::get(path)).await
    }

    pub async fn get_file(&self, file_key: &str) -> Result<Value> {
        self.get(format!("/v1/files/{file_key}")).await
    }

    pub async fn get_file_comments(&self, file_key: &str) -> Result<Value> {
        self.get(format!("/v1/files/{file_key}/comments")).await
    }

    pub async fn post_file_comment(&self, file_key: &str, message: &str) -> Result<Value> {
        self.http
            .send_json(
                ApiRequest::post(format!("/v1/files/{file_key}/comments"))
                    .json_value(json!({ "message": message })),
            )
            .await
    }

    /// Render node ids to image URLs.
    pub async fn get_file_images(
        &self,
        file_key: &str,
        ids: &[String],
        opts: &ImageOptions,
    ) -> Result<Value> {
        let req = ApiRequest::get(format!("/v1/images/{file_key}"))
            .query("ids", ids.join(","))
            .query_opt("scale", opts.scale)
            .query_opt("format", opts.format.as_deref());
        self.http.send_json(req).await
    }

    pub async fn get_file_nodes(&self, file_key: &str, ids: &[String]) -> Result<Value> {
        self.http
            .send_json(
                ApiRequest::get(format!("/v1/files/{file_key}/nodes")).query("ids", ids.join(",")),
            )
            .await
    }

    pub async fn get_team_projects(&self, team_id: &str) -> Result<Value> {
        self.get(format!("/v1/teams/{team_id}/projects")).await
    }

    pub async fn get_project_files(&self, project_id: &str) -> Result<Value> {
        self.get(format!("/v1/projects/{project_id}/files")).await
    }

    pub async fn get_team_components(&self, team_id: &str) -> Result<Value> {
        self.get(format!("/v1/teams/{team_id}/components")).await
    }

    pub async fn get_file_components(&self, file_key: &str) -> Result<Value> {
        self.get(format!("/v1/files/{file_key}/components")).await
    }

    pub async fn get_component_sets(&self, file_key: &str) -> Result<Value> {
        self.get(format!("/v1/files/{file_key}/component_sets"))
            .await
    }

    pub async fn get_styles(&self, file_key: &str) -> Result<Value> {
        self.get(format!("/v1/files/{file_key}/styles")).await
    }

    /// Register a team webhook. A random passcode is generated when none is given.
    pub async fn create_webhook(
        &self,
        team_id: &str,
        event_type: &str,
        endpoint: &str,
        passcode: Option<String>,
    ) -> Result<Value> {
        let passcode =
            passcode.unwrap_or_else(|| format!("figma_passcode_{}", uuid::Uuid::new_v4().simple()));
        self.http
            .send_json(ApiRequest::post("/v2/webhooks").json_value(json!({
                "event_type": event_type,
                "team_id": team_id,
                "endpoint": endpoint,
                "passcode": passcode,
            })))
            .await
    }

    pub async fn delete_webhook(&self, webhook_id: &str) -> Result<()> {
        self.http
            .send_empty(ApiRequest::delete(format!("/v2/webhooks/{webhook_id}")))
            .await
    }
}

/// Dispatch one Figma action.
pub async fn execute(input: Value, cfg: &Config) -> Result<Value> {
    let params = Params::from_value(input)?;
    let action: FigmaAction = resolve(&params, CREDENTIALS)?;
    let client = FigmaClient::new(&params.str("token")?, cfg)?.for_action(action);

    match action {
        FigmaAction::GetFile => client.get_file(&params.str("fileKey")?).await,
        FigmaAction::GetFileComments => client.get_file_comments(&params.str("fileKey")?).await,
        FigmaAction::PostFileComment => {
            client
                .post_file_comment(&params.str("fileKey")?, &params.str("message")?)
                .await
        }
        FigmaAction::GetFileImages => {
            let opts = ImageOptions {
                scale: params.typed("scale")?,
                format: params.opt_str("format")?,
            };
            client
                .get_file_images(&params.str("fileKey")?, &params.string_list("ids")?, &opts)
                .await
        }
        FigmaAction::GetFileNodes => {
            client
                .get_file_nodes(&params.str("fileKey")?, &params.string_list("ids")?)
                .await
        }
        FigmaAction::GetTeamProjects => client.get_team_projects(&params.str("teamId")?).await,
        FigmaAction::GetProjectFiles => client.get_project_files(&params.str("projectId")?).await,
        FigmaAction::GetTeamComponents => {
            client.get_team_components(&params.str("teamId")?).await
        }
        FigmaAction::GetFileComponents => {
            client.get_file_components(&params.str("fileKey")?).await
        }
        FigmaAction::GetComponentSets => client.get_component_sets(&params.str("fileKey")?).await,
        FigmaAction::GetStyles => client.get_styles(&params.str("fileKey")?).await,
        FigmaAction::CreateWebhook => {
            client
                .create_webhook(
                    &params.str("teamId")?,
                    &params.str("eventType")?,
                    &params.str("endpoint")?,
                    params.opt_str("passcode")?,
                )
                .await
        }
        FigmaAction::DeleteWebhook => {
            client.delete_webhook(&params.str("webhookId")?).await?;
            Ok(super::success("Webhook deleted successfully"))
        }
    }
}

pub fn descriptor() -> Arc<PluginDescriptor> {
    static DESCRIPTOR: OnceLock<Arc<PluginDescriptor>> = OnceLock::new();
    DESCRIPTOR.get_or_init(build_descriptor).clone()
}

fn build_descriptor() -> Arc<PluginDescriptor> {
    use FigmaAction as A;
    let file_actions = [
        A::GetFile,
        A::GetFileComments,
        A::PostFileComment,
        A::GetFileImages,
        A::GetFileNodes,
        A::GetFileComponents,
        A::GetComponentSets,
        A::GetStyles,
    ]
    .map(A::name);

    let schema = super::mega_schema::<A>(vec![
        FieldSchema::string("token").description("Figma personal access token")
    ])
    .field(
        FieldSchema::string("fileKey")
            .description("Key of the Figma file (from the file URL)")
            .shown_for(&file_actions),
    )
    .field(
        FieldSchema::string("message")
            .description("Comment text")
            .shown_for(&[A::PostFileComment.name()]),
    )
    .field(
        FieldSchema::array("ids", FieldType::String)
            .description("Node ids")
            .shown_for(&[A::GetFileImages.name(), A::GetFileNodes.name()]),
    )
    .field(
        FieldSchema::number("scale")
            .description("Image scale between 0.01 and 4")
            .shown_for(&[A::GetFileImages.name()]),
    )
    .field(
        FieldSchema::string("format")
            .enumerated(&["jpg", "png", "svg", "pdf"])
            .shown_for(&[A::GetFileImages.name()]),
    )
    .field(FieldSchema::string("teamId").shown_for(&[
        A::GetTeamProjects.name(),
        A::GetTeamComponents.name(),
        A::CreateWebhook.name(),
    ]))
    .field(FieldSchema::string("projectId").shown_for(&[A::GetProjectFiles.name()]))
    .field(
        FieldSchema::string("eventType")
            .enumerated(&[
                "FILE_UPDATE",
                "FILE_VERSION_UPDATE",
                "FILE_DELETE",
                "LIBRARY_PUBLISH",
                "FILE_COMMENT",
            ])
            .shown_for(&[A::CreateWebhook.name()]),
    )
    .field(
        FieldSchema::string("endpoint")
            .description("URL that receives webhook deliveries")
            .shown_for(&[A::CreateWebhook.name()]),
    )
    .field(
        FieldSchema::string("passcode")
            .description("Passcode echoed back in deliveries; generated when omitted")
            .shown_for(&[A::CreateWebhook.name()]),
    )
    .field(FieldSchema::string("webhookId").shown_for(&[A::DeleteWebhook.name()]));

    PluginDescriptor::builder("figma", "Figma")
        .description("Collaborative interface design tool")
        .tags(&["design", "collaboration"])
        .documentation("https://www.figma.com/developers/api")
        .input_schema(schema.clone())
        .example(
            json!({ "action": "get_file", "token": "your-figma-token", "fileKey": "abc123" }),
            json!({ "name": "Design System", "lastModified": "2024-01-01T00:00:00Z" }),
        )
        .action(super::mega_action(
            "figma",
            "Execute a Figma action",
            schema,
            |input, cfg| async move { execute(input, &cfg).await },
        ))
        .build()
}
