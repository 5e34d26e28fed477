//! Google Drive v3: files, folders, content and sharing permissions.
//!
//! `list_files` and `search_files` return a single page; the raw
//! `nextPageToken` is passed through for the caller to continue.

use std::sync::{Arc, OnceLock};

use base64::Engine as _;
use serde::Deserialize;
use serde_json::{json, Map, Value};

use crate::{
    client::{Config, RestClient},
    descriptor::PluginDescriptor,
    dispatch::{req, resolve, ActionKind, RequiredParam},
    errors::{Error, Result},
    http::{ApiProfile, ApiRequest, Auth, MultipartPart},
    pagination::Page,
    params::Params,
    schema::FieldSchema,
};

pub const PROFILE: ApiProfile = ApiProfile {
    label: "Google Drive",
    base_url: "https://www.googleapis.com",
    error_pointers: &["/error/message", "/error_description", "/error"],
};

const CREDENTIALS: &[RequiredParam] = &[req("token")];
const FILES: &str = "/drive/v3/files";
const UPLOAD: &str = "/upload/drive/v3/files";
const FOLDER_MIME: &str = "application/vnd.google-apps.folder";
const DEFAULT_LIST_FIELDS: &str = "nextPageToken,files(id,kind,mimeType,name,trashed)";
const DEFAULT_FILE_FIELDS: &str = "id,name,mimeType,webViewLink,size,createdTime,modifiedTime";
const DEFAULT_PAGE_SIZE: u64 = 100;

crate::actions! {
    pub enum DriveAction {
        UploadFile = "upload_file" => [req("fileName"), req("file")],
        CreateFolder = "create_folder" => [req("folderName")],
        ListFiles = "list_files" => [req("folderId")],
        SearchFiles = "search_files" => [req("query")],
        GetFile = "get_file" => [req("fileId")],
        DeleteFile = "delete_file" => [req("fileId")],
        TrashFile = "trash_file" => [req("fileId")],
        MoveFile = "move_file" => [req("fileId"), req("destinationFolderId")],
        CopyFile = "copy_file" => [req("fileId")],
        CreateTextFile = "create_text_file" => [req("fileName"), req("content")],
        ReadFile = "read_file" => [req("fileId")],
        AddPermission = "add_permission" => [req("fileId"), req("type"), req("role")],
        DeletePermission = "delete_permission" => [req("fileId"), req("permissionId")],
        SetPublicAccess = "set_public_access" => [req("fileId"), req("role")],
        SaveFileAsPdf = "save_file_as_pdf" => [req("fileId")],
    }
}

/// Paging and filtering for file listings.
#[derive(Clone, Debug)]
pub struct ListOptions {
    pub include_trashed: bool,
    pub order_by: String,
    pub page_size: u64,
    pub page_token: Option<String>,
    pub fields: String,
}

impl Default for ListOptions {
    fn default() -> Self {
        Self {
            include_trashed: false,
            order_by: "name".into(),
            page_size: DEFAULT_PAGE_SIZE,
            page_token: None,
            fields: DEFAULT_LIST_FIELDS.into(),
        }
    }
}

/// A new sharing permission.
#[derive(Clone, Debug, Default)]
pub struct NewPermission {
    /// `user`, `group`, `domain` or `anyone`.
    pub kind: String,
    /// `owner`, `organizer`, `fileOrganizer`, `writer`, `commenter` or `reader`.
    pub role: String,
    pub email_address: Option<String>,
    pub domain: Option<String>,
    pub allow_file_discovery: bool,
    pub send_notification_email: bool,
    pub email_message: Option<String>,
    pub transfer_ownership: bool,
    pub move_to_new_owners_root: bool,
}

impl NewPermission {
    fn to_body(&self) -> Result<Value> {
        let mut body = Map::new();
        body.insert("type".into(), json!(self.kind));
        body.insert("role".into(), json!(self.role));
        match self.kind.as_str() {
            "user" | "group" => {
                let email = self.email_address.as_deref().ok_or_else(|| {
                    Error::validation("Email address is required for user or group permission type")
                })?;
                body.insert("emailAddress".into(), json!(email));
            }
            "domain" => {
                let domain = self.domain.as_deref().ok_or_else(|| {
                    Error::validation("Domain is required for domain permission type")
                })?;
                body.insert("domain".into(), json!(domain));
            }
            _ => {}
        }
        if matches!(self.kind.as_str(), "domain" | "anyone") {
            body.insert("allowFileDiscovery".into(), json!(self.allow_file_discovery));
        }
        Ok(Value::Object(body))
    }

    fn apply_query(&self, mut req: ApiRequest) -> ApiRequest {
        req = req.query("sendNotificationEmail", self.send_notification_email);
        if self.send_notification_email {
            req = req.query_opt("emailMessage", self.email_message.as_deref());
        }
        if self.role == "owner" {
            req = req
                .query("transferOwnership", self.transfer_ownership)
                .query("moveToNewOwnersRoot", self.move_to_new_owners_root);
        }
        req
    }
}

#[derive(Debug, Default, Deserialize)]
struct FileRef {
    #[serde(default)]
    name: String,
    #[serde(default)]
    parents: Vec<String>,
}

/// MIME type for a file extension, `application/octet-stream` when unknown.
pub fn mime_for_extension(ext: &str) -> String {
    mime_guess::from_ext(ext.trim().trim_start_matches('.'))
        .first_or_octet_stream()
        .to_string()
}

#[derive(Clone)]
pub struct DriveClient {
    http: RestClient,
    all_drives: bool,
}

impl DriveClient {
    pub fn new(token: &str, cfg: &Config) -> Result<Self> {
        Ok(Self {
            http: RestClient::new(PROFILE, Auth::bearer(token), cfg)?,
            all_drives: false,
        })
    }

    fn for_action(mut self, action: DriveAction) -> Self {
        self.http = self.http.for_action(action.name());
        self
    }

    /// Include shared drives in every request.
    pub fn with_shared_drives(mut self, enabled: bool) -> Self {
        self.all_drives = enabled;
        self
    }

    fn scoped(&self, req: ApiRequest) -> ApiRequest {
        req.query("supportsAllDrives", self.all_drives)
    }

    async fn upload(&self, metadata: Value, content_type: &str, data: Vec<u8>) -> Result<Value> {
        let parts = vec![
            MultipartPart {
                name: "Metadata".into(),
                file_name: None,
                content_type: Some("application/json".into()),
                data: serde_json::to_vec(&metadata)?,
            },
            MultipartPart {
                name: "Media".into(),
                file_name: None,
                content_type: Some(content_type.to_string()),
                data,
            },
        ];
        self.http
            .send_json(
                self.scoped(ApiRequest::post(UPLOAD).query("uploadType", "multipart"))
                    .multipart(parts),
            )
            .await
    }

    /// Upload base64-encoded content. The MIME type is derived from `extension`.
    pub async fn upload_file(
        &self,
        file_name: &str,
        base64_content: &str,
        extension: Option<&str>,
        parent: Option<&str>,
    ) -> Result<Value> {
        let data = base64::engine::general_purpose::STANDARD
            .decode(base64_content.trim())
            .map_err(|err| Error::validation(format!("file must be base64 encoded: {err}")))?;
        let mime = extension.map_or_else(
            || mime_guess::mime::APPLICATION_OCTET_STREAM.to_string(),
            mime_for_extension,
        );
        self.upload(file_metadata(file_name, &mime, parent), &mime, data)
            .await
    }

    pub async fn create_text_file(
        &self,
        file_name: &str,
        content: &str,
        parent: Option<&str>,
    ) -> Result<Value> {
        self.upload(
            file_metadata(file_name, "text/plain", parent),
            "text/plain",
            content.as_bytes().to_vec(),
        )
        .await
    }

    pub async fn create_folder(&self, name: &str, parent: Option<&str>) -> Result<Value> {
        self.http
            .send_json(
                self.scoped(ApiRequest::post(FILES))
                    .json_value(file_metadata(name, FOLDER_MIME, parent)),
            )
            .await
    }

    async fn list(&self, q: String, opts: &ListOptions) -> Result<Page<Value>> {
        let req = ApiRequest::get(FILES)
            .query("q", q)
            .query("fields", &opts.fields)
            .query("orderBy", &opts.order_by)
            .query("pageSize", opts.page_size)
            .query("includeItemsFromAllDrives", self.all_drives)
            .query_opt("pageToken", opts.page_token.as_deref());
        let body: Value = self.http.send_json(self.scoped(req)).await?;
        Page::from_body(body, "files", "/nextPageToken")
    }

    /// One page of the folder's children.
    pub async fn list_files_page(
        &self,
        folder_id: &str,
        opts: &ListOptions,
    ) -> Result<Page<Value>> {
        let mut q = format!("'{folder_id}' in parents");
        if !opts.include_trashed {
            q.push_str(" and trashed=false");
        }
        self.list(q, opts).await
    }

    /// One page of non-trashed files whose name contains `query`.
    pub async fn search_files_page(
        &self,
        query: &str,
        opts: &ListOptions,
    ) -> Result<Page<Value>> {
        let escaped = query.replace('\\', "\\\\").replace('\'', "\\'");
        self.list(format!("name contains '{escaped}' and trashed=false"), opts)
            .await
    }

    pub async fn get_file(&self, file_id: &str, fields: Option<&str>) -> Result<Value> {
        self.http
            .send_json(self.scoped(
                ApiRequest::get(format!("{FILES}/{file_id}"))
                    .query("fields", fields.unwrap_or(DEFAULT_FILE_FIELDS)),
            ))
            .await
    }

    async fn file_ref(&self, file_id: &str, fields: &str) -> Result<FileRef> {
        Ok(serde_json::from_value(
            self.get_file(file_id, Some(fields)).await?,
        )?)
    }

    pub async fn delete_file(&self, file_id: &str) -> Result<()> {
        self.http
            .send_empty(self.scoped(ApiRequest::delete(format!("{FILES}/{file_id}"))))
            .await
    }

    pub async fn trash_file(&self, file_id: &str) -> Result<Value> {
        self.http
            .send_json(
                self.scoped(ApiRequest::patch(format!("{FILES}/{file_id}")))
                    .json_value(json!({ "trashed": true })),
            )
            .await
    }

    /// Re-parent a file: its current parents are replaced by `destination`.
    pub async fn move_file(&self, file_id: &str, destination: &str) -> Result<Value> {
        let file = self.file_ref(file_id, "id,parents").await?;
        let req = ApiRequest::patch(format!("{FILES}/{file_id}"))
            .query("addParents", destination)
            .query_opt(
                "removeParents",
                Some(file.parents.join(",")).filter(|p| !p.is_empty()),
            )
            .json_value(json!({}));
        self.http.send_json(self.scoped(req)).await
    }

    pub async fn copy_file(
        &self,
        file_id: &str,
        name: Option<&str>,
        parent: Option<&str>,
    ) -> Result<Value> {
        let mut body = Map::new();
        if let Some(name) = name {
            body.insert("name".into(), json!(name));
        }
        if let Some(parent) = parent {
            body.insert("parents".into(), json!([parent]));
        }
        self.http
            .send_json(
                self.scoped(ApiRequest::post(format!("{FILES}/{file_id}/copy")))
                    .json_value(Value::Object(body)),
            )
            .await
    }

    /// Download the file content as UTF-8 text.
    pub async fn read_file(&self, file_id: &str) -> Result<String> {
        self.http
            .send_text(self.scoped(
                ApiRequest::get(format!("{FILES}/{file_id}")).query("alt", "media"),
            ))
            .await
    }

    pub async fn add_permission(&self, file_id: &str, permission: &NewPermission) -> Result<Value> {
        let body = permission.to_body()?;
        let req = permission.apply_query(self.scoped(ApiRequest::post(format!(
            "{FILES}/{file_id}/permissions"
        ))));
        self.http.send_json(req.json_value(body)).await
    }

    pub async fn delete_permission(&self, file_id: &str, permission_id: &str) -> Result<()> {
        self.http
            .send_empty(self.scoped(ApiRequest::delete(format!(
                "{FILES}/{file_id}/permissions/{permission_id}"
            ))))
            .await
    }

    /// Share with anyone holding the link.
    pub async fn set_public_access(&self, file_id: &str, role: &str) -> Result<Value> {
        let permission = NewPermission {
            kind: "anyone".into(),
            role: role.into(),
            ..Default::default()
        };
        self.add_permission(file_id, &permission).await
    }

    /// Copy the file as `<name>.pdf` with a PDF MIME type.
    pub async fn save_file_as_pdf(&self, file_id: &str, parent: Option<&str>) -> Result<Value> {
        let file = self.file_ref(file_id, "id,name").await?;
        let mut body = json!({
            "name": format!("{}.pdf", file.name),
            "mimeType": "application/pdf",
        });
        if let Some(parent) = parent {
            body["parents"] = json!([parent]);
        }
        self.http
            .send_json(
                self.scoped(ApiRequest::post(format!("{FILES}/{file_id}/copy")))
                    .json_value(body),
            )
            .await
    }
}

fn file_metadata(name: &str, mime: &str, parent: Option<&str>) -> Value {
    let mut meta = json!({ "name": name, "mimeType": mime });
    if let Some(parent) = parent {
        meta["parents"] = json!([parent]);
    }
    meta
}

/// Drive's `files.list` shape: `{files, nextPageToken}`, the token only when more remain.
fn file_list(page: Page<Value>) -> Value {
    let mut out = json!({ "files": page.items });
    if let Some(token) = page.next_page_token {
        out["nextPageToken"] = json!(token);
    }
    out
}

fn list_options(params: &Params) -> Result<ListOptions> {
    let defaults = ListOptions::default();
    Ok(ListOptions {
        include_trashed: params.opt_bool("includeTrashed")?.unwrap_or(false),
        order_by: params.opt_str("orderBy")?.unwrap_or(defaults.order_by),
        page_size: params.opt_u64("pageSize")?.unwrap_or(defaults.page_size),
        page_token: params.opt_str("pageToken")?,
        fields: params.opt_str("fields")?.unwrap_or(defaults.fields),
    })
}

/// Dispatch one Google Drive action.
pub async fn execute(input: Value, cfg: &Config) -> Result<Value> {
    let params = Params::from_value(input)?;
    let action: DriveAction = resolve(&params, CREDENTIALS)?;
    let client = DriveClient::new(&params.str("token")?, cfg)?
        .with_shared_drives(params.opt_bool("includeTeamDrives")?.unwrap_or(false))
        .for_action(action);
    let parent = params.opt_str("parentFolder")?;

    match action {
        DriveAction::UploadFile => {
            client
                .upload_file(
                    &params.str("fileName")?,
                    &params.str("file")?,
                    params.opt_str("fileExtension")?.as_deref(),
                    parent.as_deref(),
                )
                .await
        }
        DriveAction::CreateFolder => {
            client
                .create_folder(&params.str("folderName")?, parent.as_deref())
                .await
        }
        DriveAction::ListFiles => client
            .list_files_page(&params.str("folderId")?, &list_options(&params)?)
            .await
            .map(file_list),
        DriveAction::SearchFiles => client
            .search_files_page(&params.str("query")?, &list_options(&params)?)
            .await
            .map(file_list),
        DriveAction::GetFile => {
            client
                .get_file(&params.str("fileId")?, params.opt_str("fields")?.as_deref())
                .await
        }
        DriveAction::DeleteFile => {
            client.delete_file(&params.str("fileId")?).await?;
            Ok(super::success("File deleted successfully"))
        }
        DriveAction::TrashFile => client.trash_file(&params.str("fileId")?).await,
        DriveAction::MoveFile => {
            client
                .move_file(&params.str("fileId")?, &params.str("destinationFolderId")?)
                .await
        }
        DriveAction::CopyFile => {
            client
                .copy_file(
                    &params.str("fileId")?,
                    params.opt_str("name")?.as_deref(),
                    parent.as_deref(),
                )
                .await
        }
        DriveAction::CreateTextFile => {
            client
                .create_text_file(
                    &params.str("fileName")?,
                    &params.str("content")?,
                    parent.as_deref(),
                )
                .await
        }
        DriveAction::ReadFile => {
            let content = client.read_file(&params.str("fileId")?).await?;
            Ok(json!({ "content": content }))
        }
        DriveAction::AddPermission => {
            let permission = NewPermission {
                kind: params.str("type")?,
                role: params.str("role")?,
                email_address: params.opt_str("emailAddress")?,
                domain: params.opt_str("domain")?,
                allow_file_discovery: params.opt_bool("allowFileDiscovery")?.unwrap_or(false),
                send_notification_email: params
                    .opt_bool("sendNotificationEmail")?
                    .unwrap_or(false),
                email_message: params.opt_str("emailMessage")?,
                transfer_ownership: params.opt_bool("transferOwnership")?.unwrap_or(false),
                move_to_new_owners_root: params
                    .opt_bool("moveToNewOwnersRoot")?
                    .unwrap_or(false),
            };
            client
                .add_permission(&params.str("fileId")?, &permission)
                .await
        }
        DriveAction::DeletePermission => {
            client
                .delete_permission(&params.str("fileId")?, &params.str("permissionId")?)
                .await?;
            Ok(super::success("Permission deleted successfully"))
        }
        DriveAction::SetPublicAccess => {
            client
                .set_public_access(&params.str("fileId")?, &params.str("role")?)
                .await
        }
        DriveAction::SaveFileAsPdf => {
            client
                .save_file_as_pdf(&params.str("fileId")?, parent.as_deref())
                .await
        }
    }
}

pub fn descriptor() -> Arc<PluginDescriptor> {
    static DESCRIPTOR: OnceLock<Arc<PluginDescriptor>> = OnceLock::new();
    DESCRIPTOR.get_or_init(build_descriptor).clone()
}

fn build_descriptor() -> Arc<PluginDescriptor> {
    use DriveAction as A;
    let by_id = [
        A::GetFile,
        A::DeleteFile,
        A::TrashFile,
        A::MoveFile,
        A::CopyFile,
        A::ReadFile,
        A::AddPermission,
        A::DeletePermission,
        A::SetPublicAccess,
        A::SaveFileAsPdf,
    ]
    .map(A::name);
    let listings = [A::ListFiles.name(), A::SearchFiles.name()];
    let permission = [A::AddPermission.name()];

    let schema = super::mega_schema::<A>(vec![
        FieldSchema::string("token").description("Google OAuth access token")
    ])
    .field(
        FieldSchema::string("fileName")
            .shown_for(&[A::UploadFile.name(), A::CreateTextFile.name()]),
    )
    .field(
        FieldSchema::string("file")
            .description("Base64-encoded file content")
            .shown_for(&[A::UploadFile.name()]),
    )
    .field(
        FieldSchema::string("fileExtension")
            .description("Extension used to pick the MIME type, e.g. pdf")
            .shown_for(&[A::UploadFile.name()]),
    )
    .field(FieldSchema::string("folderName").shown_for(&[A::CreateFolder.name()]))
    .field(FieldSchema::string("parentFolder").shown_for(&[
        A::UploadFile.name(),
        A::CreateFolder.name(),
        A::CopyFile.name(),
        A::CreateTextFile.name(),
        A::SaveFileAsPdf.name(),
    ]))
    .field(FieldSchema::string("folderId").shown_for(&[A::ListFiles.name()]))
    .field(
        FieldSchema::string("query")
            .description("Text the file name must contain")
            .shown_for(&[A::SearchFiles.name()]),
    )
    .field(FieldSchema::boolean("includeTrashed").shown_for(&[A::ListFiles.name()]))
    .field(
        FieldSchema::string("orderBy")
            .default_value(json!("name"))
            .shown_for(&listings),
    )
    .field(
        FieldSchema::integer("pageSize")
            .default_value(json!(DEFAULT_PAGE_SIZE))
            .shown_for(&listings),
    )
    .field(FieldSchema::string("pageToken").shown_for(&listings))
    .field(
        FieldSchema::string("fields")
            .description("Partial response selector")
            .shown_for(&[A::ListFiles.name(), A::SearchFiles.name(), A::GetFile.name()]),
    )
    .field(FieldSchema::string("fileId").shown_for(&by_id))
    .field(FieldSchema::string("destinationFolderId").shown_for(&[A::MoveFile.name()]))
    .field(
        FieldSchema::string("name")
            .description("Name of the copy")
            .shown_for(&[A::CopyFile.name()]),
    )
    .field(
        FieldSchema::string("content")
            .description("Plain text content")
            .shown_for(&[A::CreateTextFile.name()]),
    )
    .field(
        FieldSchema::string("type")
            .enumerated(&["user", "group", "domain", "anyone"])
            .shown_for(&permission),
    )
    .field(
        FieldSchema::string("role")
            .enumerated(&["owner", "organizer", "fileOrganizer", "writer", "commenter", "reader"])
            .shown_for(&[A::AddPermission.name(), A::SetPublicAccess.name()]),
    )
    .field(
        FieldSchema::string("emailAddress")
            .description("Required for user and group permissions")
            .shown_for(&permission),
    )
    .field(
        FieldSchema::string("domain")
            .description("Required for domain permissions")
            .shown_for(&permission),
    )
    .field(FieldSchema::boolean("allowFileDiscovery").shown_for(&permission))
    .field(FieldSchema::boolean("sendNotificationEmail").shown_for(&permission))
    .field(FieldSchema::string("emailMessage").shown_for(&permission))
    .field(FieldSchema::boolean("transferOwnership").shown_for(&permission))
    .field(FieldSchema::boolean("moveToNewOwnersRoot").shown_for(&permission))
    .field(FieldSchema::string("permissionId").shown_for(&[A::DeletePermission.name()]))
    .field(
        FieldSchema::boolean("includeTeamDrives")
            .description("Include shared drives")
            .default_value(json!(false)),
    );

    PluginDescriptor::builder("google-drive", "Google Drive")
        .description("Cloud storage and file backup")
        .tags(&["storage", "files", "google"])
        .documentation("https://developers.google.com/drive/api/v3/reference")
        .input_schema(schema.clone())
        .example(
            json!({
                "action": "create_folder",
                "token": "your-google-token",
                "folderName": "Reports"
            }),
            json!({
                "kind": "drive#file",
                "id": "1a2b3c",
                "name": "Reports",
                "mimeType": FOLDER_MIME
            }),
        )
        .action(super::mega_action(
            "google-drive",
            "Execute a Google Drive action",
            schema,
            |input, cfg| async move { execute(input, &cfg).await },
        ))
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_permission_needs_email() {
        let permission = NewPermission {
            kind: "user".into(),
            role: "reader".into(),
            ..Default::default()
        };
        let err = permission.to_body().unwrap_err();
        assert_eq!(
            err.to_string(),
            "Email address is required for user or group permission type"
        );
    }

    #[test]
    fn anyone_permission_carries_discovery_flag() {
        let permission = NewPermission {
            kind: "anyone".into(),
            role: "reader".into(),
            ..Default::default()
        };
        assert_eq!(
            permission.to_body().unwrap(),
            json!({ "type": "anyone", "role": "reader", "allowFileDiscovery": false })
        );
    }

    #[test]
    fn mime_lookup_falls_back_to_octet_stream() {
        assert_eq!(mime_for_extension(".PDF"), "application/pdf");
        assert_eq!(mime_for_extension("weird"), "application/octet-stream");
    }

    #[test]
    fn mime_lookup_covers_the_full_database() {
        assert_eq!(mime_for_extension("webp"), "image/webp");
        assert_eq!(mime_for_extension("xls"), "application/vnd.ms-excel");
        assert_eq!(mime_for_extension("ppt"), "application/vnd.ms-powerpoint");
    }
}
