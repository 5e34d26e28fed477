//! Salesforce REST (v56.0): sObject CRUD, SOQL, composite and Bulk 2.0 upserts.

use std::sync::{Arc, OnceLock};

use serde::Deserialize;
use serde_json::{json, Map, Value};

use crate::{
    client::{Config, RestClient},
    descriptor::PluginDescriptor,
    dispatch::{req, resolve, ActionKind, RequiredParam},
    errors::{Error, Result},
    http::{ApiProfile, ApiRequest, Auth},
    params::Params,
    schema::FieldSchema,
};

pub const API_VERSION: &str = "v56.0";

pub const PROFILE: ApiProfile = ApiProfile {
    label: "Salesforce",
    base_url: "https://login.salesforce.com/services/data/v56.0",
    error_pointers: &["/0/message", "/message", "/error_description", "/error"],
};

const CREDENTIALS: &[RequiredParam] = &[req("access_token"), req("instance_url")];

crate::actions! {
    pub enum SalesforceAction {
        CreateObject = "create_object" => [req("object_name"), req("data")],
        UpdateObject = "update_object" => [req("object_name"), req("record_id"), req("data")],
        RunQuery = "run_query" => [req("query")],
        UpsertByExternalId = "upsert_by_external_id" => [req("object_name"), req("external_field"), req("records")],
        BulkUpsert = "bulk_upsert" => [req("object_name"), req("external_field"), req("csv_records")],
    }
}

#[derive(Debug, Deserialize)]
struct BulkJob {
    id: String,
}

#[derive(Clone)]
pub struct SalesforceClient {
    http: RestClient,
}

impl SalesforceClient {
    pub fn new(access_token: &str, instance_url: &str, cfg: &Config) -> Result<Self> {
        let base = format!(
            "{}/services/data/{API_VERSION}",
            instance_url.trim_end_matches('/')
        );
        Ok(Self {
            http: RestClient::with_base(PROFILE, &base, Auth::bearer(access_token), cfg)?,
        })
    }

    fn for_action(mut self, action: SalesforceAction) -> Self {
        self.http = self.http.for_action(action.name());
        self
    }

    /// `true` when the sObject catalogue is readable with these credentials.
    pub async fn validate_auth(&self) -> bool {
        match self.list_objects().await {
            Ok(_) => true,
            Err(_err) => {
                #[cfg(feature = "tracing")]
                tracing::info!(error = %_err, "salesforce credential check failed");
                false
            }
        }
    }

    pub async fn list_objects(&self) -> Result<Value> {
        self.http.send_json(ApiRequest::get("/sobjects")).await
    }

    pub async fn create_object(&self, object: &str, data: &Map<String, Value>) -> Result<Value> {
        self.http
            .send_json(ApiRequest::post(format!("/sobjects/{object}")).json(data)?)
            .await
    }

    pub async fn update_object(
        &self,
        object: &str,
        record_id: &str,
        data: &Map<String, Value>,
    ) -> Result<()> {
        self.http
            .send_empty(ApiRequest::patch(format!("/sobjects/{object}/{record_id}")).json(data)?)
            .await
    }

    pub async fn run_query(&self, soql: &str) -> Result<Value> {
        self.http
            .send_json(ApiRequest::get("/query").query("q", soql))
            .await
    }

    /// Composite upsert keyed by an external id field; returns per-record results.
    pub async fn upsert_by_external_id(
        &self,
        object: &str,
        external_field: &str,
        records: &[Value],
    ) -> Result<Value> {
        let records: Vec<Value> = records
            .iter()
            .map(|record| {
                let mut record = record.clone();
                if let Value::Object(map) = &mut record {
                    map.entry("attributes")
                        .or_insert_with(|| json!({ "type": object }));
                }
                record
            })
            .collect();
        self.http
            .send_json(
                ApiRequest::patch(format!("/composite/sobjects/{object}/{external_field}"))
                    .json_value(json!({ "allOrNone": false, "records": records })),
            )
            .await
    }

    /// Bulk API 2.0 upsert: open a job, upload the CSV, close it and report its state.
    pub async fn bulk_upsert(
        &self,
        object: &str,
        external_field: &str,
        csv: &str,
    ) -> Result<Value> {
        let job: BulkJob = self
            .http
            .send_json(ApiRequest::post("/jobs/ingest/").json_value(json!({
                "object": object,
                "externalIdFieldName": external_field,
                "contentType": "CSV",
                "operation": "upsert",
                "lineEnding": "LF",
            })))
            .await?;
        #[cfg(feature = "tracing")]
        tracing::debug!(job_id = %job.id, object, "bulk ingest job opened");

        self.http
            .send_empty(
                ApiRequest::put(format!("/jobs/ingest/{}/batches", job.id)).text("text/csv", csv),
            )
            .await?;
        self.http
            .send_empty(
                ApiRequest::patch(format!("/jobs/ingest/{}", job.id))
                    .json_value(json!({ "state": "UploadComplete" })),
            )
            .await?;
        self.http
            .send_json(ApiRequest::get(format!("/jobs/ingest/{}", job.id)))
            .await
    }
}

/// Dispatch one Salesforce action.
pub async fn execute(input: Value, cfg: &Config) -> Result<Value> {
    let params = Params::from_value(input)?;
    let action: SalesforceAction = resolve(&params, CREDENTIALS)?;
    let client = SalesforceClient::new(
        &params.str("access_token")?,
        &params.str("instance_url")?,
        cfg,
    )?
    .for_action(action);
    if !client.validate_auth().await {
        return Err(Error::invalid_auth(PROFILE.label));
    }

    match action {
        SalesforceAction::CreateObject => {
            client
                .create_object(&params.str("object_name")?, &params.object("data")?)
                .await
        }
        SalesforceAction::UpdateObject => {
            let record_id = params.str("record_id")?;
            client
                .update_object(&params.str("object_name")?, &record_id, &params.object("data")?)
                .await?;
            Ok(super::success(format!(
                "Record {record_id} updated successfully"
            )))
        }
        SalesforceAction::RunQuery => client.run_query(&params.str("query")?).await,
        SalesforceAction::UpsertByExternalId => {
            let wrapper = params.value("records")?;
            let records = wrapper
                .get("records")
                .and_then(Value::as_array)
                .ok_or_else(|| Error::validation("Records must contain a \"records\" array"))?;
            client
                .upsert_by_external_id(
                    &params.str("object_name")?,
                    &params.str("external_field")?,
                    records,
                )
                .await
        }
        SalesforceAction::BulkUpsert => {
            client
                .bulk_upsert(
                    &params.str("object_name")?,
                    &params.str("external_field")?,
                    &params.str("csv_records")?,
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
    use SalesforceAction as A;
    let schema = super::mega_schema::<A>(vec![
        FieldSchema::string("access_token")
            .title("Access Token")
            .description("OAuth access token"),
        FieldSchema::string("instance_url")
            .title("Instance URL")
            .description("Salesforce instance URL (e.g., https://your-instance.salesforce.com)"),
    ])
    .field(
        FieldSchema::string("object_name")
            .description("Salesforce Object Name (e.g., Account, Contact, Lead)")
            .shown_for(&[
                A::CreateObject.name(),
                A::UpdateObject.name(),
                A::UpsertByExternalId.name(),
                A::BulkUpsert.name(),
            ]),
    )
    .field(
        FieldSchema::object("data")
            .description("Object data (key-value pairs)")
            .shown_for(&[A::CreateObject.name(), A::UpdateObject.name()]),
    )
    .field(
        FieldSchema::string("record_id")
            .description("Record ID to update")
            .shown_for(&[A::UpdateObject.name()]),
    )
    .field(
        FieldSchema::string("query")
            .description("SOQL Query")
            .shown_for(&[A::RunQuery.name()]),
    )
    .field(
        FieldSchema::string("external_field")
            .description("External ID Field Name")
            .shown_for(&[A::UpsertByExternalId.name(), A::BulkUpsert.name()]),
    )
    .field(
        FieldSchema::object("records")
            .description("Records to upsert (must include \"records\" array)")
            .shown_for(&[A::UpsertByExternalId.name()]),
    )
    .field(
        FieldSchema::string("csv_records")
            .description("CSV Records for bulk upsert")
            .shown_for(&[A::BulkUpsert.name()]),
    );

    PluginDescriptor::builder("salesforce", "Salesforce")
        .description("CRM platform for sales, service and marketing records")
        .tags(&["crm", "sales"])
        .documentation("https://developer.salesforce.com/docs/atlas.en-us.api_rest.meta/api_rest/")
        .input_schema(schema.clone())
        .example(
            json!({
                "action": "create_object",
                "access_token": "your-access-token",
                "instance_url": "https://your-instance.salesforce.com",
                "object_name": "Account",
                "data": { "Name": "Acme" }
            }),
            json!({ "id": "001xx000003DGb2AAG", "success": true, "errors": [] }),
        )
        .action(super::mega_action(
            "salesforce",
            "Execute a Salesforce action",
            schema,
            |input, cfg| async move { execute(input, &cfg).await },
        ))
        .build()
}
