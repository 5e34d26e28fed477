//! Calendly v2: users, event types, scheduled events, invitees and webhooks.
//!
//! Listings return one page (`collection` plus `pagination`); callers pass the
//! `page_token` back to continue.

use std::sync::{Arc, OnceLock};

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::{
    client::{unwrap_field, Config, RestClient},
    descriptor::PluginDescriptor,
    dispatch::{req, resolve, ActionKind, RequiredParam},
    errors::Result,
    http::{ApiProfile, ApiRequest, Auth},
    pagination::Page,
    params::Params,
    schema::FieldSchema,
};

pub const PROFILE: ApiProfile = ApiProfile {
    label: "Calendly",
    base_url: "https://api.calendly.com",
    error_pointers: &["/message", "/title", "/error"],
};

const CREDENTIALS: &[RequiredParam] = &[req("token")];

crate::actions! {
    pub enum CalendlyAction {
        GetUser = "get_user" => [],
        ListEvents = "list_events" => [],
        GetEvent = "get_event" => [req("eventUuid")],
        ListScheduledEvents = "list_scheduled_events" => [],
        GetScheduledEvent = "get_scheduled_event" => [req("scheduledEventUuid")],
        ListInvitees = "list_invitees" => [req("scheduledEventUuid")],
        GetInvitee = "get_invitee" => [req("inviteeUuid")],
        CancelInvitee = "cancel_invitee" => [req("inviteeUuid")],
        ListWebhooks = "list_webhooks" => [],
        CreateWebhook = "create_webhook" => [req("url"), req("events"), req("scope")],
        DeleteWebhook = "delete_webhook" => [req("webhookUuid")],
    }
}

/// The subset of `/users/me` needed to scope listings.
#[derive(Clone, Debug, Deserialize)]
pub struct CurrentUser {
    pub uri: String,
    pub current_organization: String,
}

/// Pagination block returned with every collection.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Pagination {
    #[serde(default)]
    pub count: Option<u64>,
    #[serde(default)]
    pub next_page: Option<String>,
    #[serde(default)]
    pub previous_page: Option<String>,
    #[serde(default)]
    pub next_page_token: Option<String>,
    #[serde(default)]
    pub previous_page_token: Option<String>,
}

/// One page of a Calendly collection, in the shape the API returns it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Collection {
    pub collection: Vec<Value>,
    #[serde(default)]
    pub pagination: Pagination,
}

impl From<Collection> for Page<Value> {
    fn from(c: Collection) -> Self {
        Page::new(c.collection, c.pagination.next_page_token)
    }
}

/// Common paging and scoping options for listings.
#[derive(Clone, Debug, Default)]
pub struct ListOptions {
    /// Scope to the user's organization instead of the user.
    pub organization: bool,
    pub count: Option<u64>,
    pub page_token: Option<String>,
}

impl ListOptions {
    fn apply(&self, req: ApiRequest) -> ApiRequest {
        req.query_opt("count", self.count)
            .query_opt("page_token", self.page_token.as_deref())
    }
}

#[derive(Clone, Debug, Default)]
pub struct ScheduledEventFilter {
    pub min_start_time: Option<String>,
    pub max_start_time: Option<String>,
    pub status: Option<String>,
}

/// Accept either a bare UUID or a full resource URI.
pub fn uuid_from_uri(uri: &str) -> &str {
    uri.trim_end_matches('/').rsplit('/').next().unwrap_or(uri)
}

#[derive(Clone)]
pub struct CalendlyClient {
    http: RestClient,
}

impl CalendlyClient {
    pub fn new(token: &str, cfg: &Config) -> Result<Self> {
        Ok(Self {
            http: RestClient::new(PROFILE, Auth::bearer(token), cfg)?,
        })
    }

    fn for_action(mut self, action: CalendlyAction) -> Self {
        self.http = self.http.for_action(action.name());
        self
    }

    async fn resource(&self, req: ApiRequest) -> Result<Value> {
        let body: Value = self.http.send_json(req).await?;
        unwrap_field(body, "resource")
    }

    pub async fn get_user(&self) -> Result<Value> {
        self.resource(ApiRequest::get("/users/me")).await
    }

    pub async fn current_user(&self) -> Result<CurrentUser> {
        Ok(serde_json::from_value(self.get_user().await?)?)
    }

    async fn owner_uri(&self, organization: bool) -> Result<String> {
        let user = self.current_user().await?;
        Ok(if organization {
            user.current_organization
        } else {
            user.uri
        })
    }

    pub async fn list_event_types_page(&self, opts: &ListOptions) -> Result<Collection> {
        let owner = self.owner_uri(opts.organization).await?;
        self.http
            .send_json(opts.apply(ApiRequest::get("/event_types")).query("user", owner))
            .await
    }

    pub async fn get_event_type(&self, uuid: &str) -> Result<Value> {
        self.resource(ApiRequest::get(format!(
            "/event_types/{}",
            uuid_from_uri(uuid)
        )))
        .await
    }

    pub async fn list_scheduled_events_page(
        &self,
        opts: &ListOptions,
        filter: &ScheduledEventFilter,
    ) -> Result<Collection> {
        let owner = self.owner_uri(opts.organization).await?;
        let req = opts
            .apply(ApiRequest::get("/scheduled_events"))
            .query_opt("min_start_time", filter.min_start_time.as_deref())
            .query_opt("max_start_time", filter.max_start_time.as_deref())
            .query_opt("status", filter.status.as_deref())
            .query("user", owner);
        self.http.send_json(req).await
    }

    pub async fn get_scheduled_event(&self, uuid: &str) -> Result<Value> {
        self.resource(ApiRequest::get(format!(
            "/scheduled_events/{}",
            uuid_from_uri(uuid)
        )))
        .await
    }

    pub async fn list_invitees_page(
        &self,
        event_uuid: &str,
        opts: &ListOptions,
        email: Option<&str>,
        status: Option<&str>,
    ) -> Result<Collection> {
        let req = opts
            .apply(ApiRequest::get(format!(
                "/scheduled_events/{}/invitees",
                uuid_from_uri(event_uuid)
            )))
            .query_opt("email", email)
            .query_opt("status", status);
        self.http.send_json(req).await
    }

    pub async fn get_invitee(&self, uuid: &str) -> Result<Value> {
        self.resource(ApiRequest::get(format!("/invitees/{}", uuid_from_uri(uuid))))
            .await
    }

    pub async fn cancel_invitee(&self, uuid: &str, reason: Option<&str>) -> Result<()> {
        let body = match reason {
            Some(reason) => json!({ "reason": reason }),
            None => json!({}),
        };
        self.http
            .send_empty(
                ApiRequest::post(format!("/invitees/{}/cancellation", uuid_from_uri(uuid)))
                    .json_value(body),
            )
            .await
    }

    pub async fn list_webhooks_page(
        &self,
        opts: &ListOptions,
        scope: Option<&str>,
    ) -> Result<Collection> {
        let owner = self.owner_uri(opts.organization).await?;
        let owner_key = if opts.organization { "organization" } else { "user" };
        let req = opts
            .apply(ApiRequest::get("/webhook_subscriptions"))
            .query_opt("scope", scope)
            .query(owner_key, owner);
        self.http.send_json(req).await
    }

    pub async fn create_webhook(
        &self,
        url: &str,
        events: &[String],
        scope: &str,
        organization: bool,
    ) -> Result<Value> {
        let owner = self.owner_uri(organization).await?;
        let owner_key = if organization { "organization" } else { "user" };
        let mut body = json!({ "url": url, "events": events, "scope": scope });
        body[owner_key] = json!(owner);
        self.resource(ApiRequest::post("/webhook_subscriptions").json_value(body))
            .await
    }

    pub async fn delete_webhook(&self, uuid: &str) -> Result<()> {
        self.http
            .send_empty(ApiRequest::delete(format!(
                "/webhook_subscriptions/{}",
                uuid_from_uri(uuid)
            )))
            .await
    }
}

fn list_options(params: &Params) -> Result<ListOptions> {
    Ok(ListOptions {
        organization: params.opt_bool("organization")?.unwrap_or(false),
        count: params.opt_u64("count")?,
        page_token: params.opt_str("page_token")?,
    })
}

/// Dispatch one Calendly action.
pub async fn execute(input: Value, cfg: &Config) -> Result<Value> {
    let params = Params::from_value(input)?;
    let action: CalendlyAction = resolve(&params, CREDENTIALS)?;
    let client = CalendlyClient::new(&params.str("token")?, cfg)?.for_action(action);

    match action {
        CalendlyAction::GetUser => client.get_user().await,
        CalendlyAction::ListEvents => {
            let page = client.list_event_types_page(&list_options(&params)?).await?;
            Ok(serde_json::to_value(page)?)
        }
        CalendlyAction::GetEvent => client.get_event_type(&params.str("eventUuid")?).await,
        CalendlyAction::ListScheduledEvents => {
            let filter = ScheduledEventFilter {
                min_start_time: params.opt_str("min_start_time")?,
                max_start_time: params.opt_str("max_start_time")?,
                status: params.opt_str("status")?,
            };
            let page = client
                .list_scheduled_events_page(&list_options(&params)?, &filter)
                .await?;
            Ok(serde_json::to_value(page)?)
        }
        CalendlyAction::GetScheduledEvent => {
            client
                .get_scheduled_event(&params.str("scheduledEventUuid")?)
                .await
        }
        CalendlyAction::ListInvitees => {
            let page = client
                .list_invitees_page(
                    &params.str("scheduledEventUuid")?,
                    &list_options(&params)?,
                    params.opt_str("email")?.as_deref(),
                    params.opt_str("status")?.as_deref(),
                )
                .await?;
            Ok(serde_json::to_value(page)?)
        }
        CalendlyAction::GetInvitee => client.get_invitee(&params.str("inviteeUuid")?).await,
        CalendlyAction::CancelInvitee => {
            client
                .cancel_invitee(
                    &params.str("inviteeUuid")?,
                    params.opt_str("reason")?.as_deref(),
                )
                .await?;
            Ok(super::success("Invitee canceled successfully"))
        }
        CalendlyAction::ListWebhooks => {
            let page = client
                .list_webhooks_page(&list_options(&params)?, params.opt_str("scope")?.as_deref())
                .await?;
            Ok(serde_json::to_value(page)?)
        }
        CalendlyAction::CreateWebhook => {
            client
                .create_webhook(
                    &params.str("url")?,
                    &params.string_list("events")?,
                    &params.str("scope")?,
                    params.opt_bool("organization")?.unwrap_or(false),
                )
                .await
        }
        CalendlyAction::DeleteWebhook => {
            client.delete_webhook(&params.str("webhookUuid")?).await?;
            Ok(super::success("Webhook deleted successfully"))
        }
    }
}

pub fn descriptor() -> Arc<PluginDescriptor> {
    static DESCRIPTOR: OnceLock<Arc<PluginDescriptor>> = OnceLock::new();
    DESCRIPTOR.get_or_init(build_descriptor).clone()
}

fn build_descriptor() -> Arc<PluginDescriptor> {
    use CalendlyAction as A;
    let paged = [
        A::ListEvents,
        A::ListScheduledEvents,
        A::ListInvitees,
        A::ListWebhooks,
    ]
    .map(A::name);

    let schema = super::mega_schema::<A>(vec![
        FieldSchema::string("token").description("Calendly personal access token")
    ])
    .field(
        FieldSchema::boolean("organization")
            .description("Use organization scope instead of user scope")
            .default_value(json!(false))
            .shown_for(&[
                A::ListEvents.name(),
                A::ListScheduledEvents.name(),
                A::ListWebhooks.name(),
                A::CreateWebhook.name(),
            ]),
    )
    .field(
        FieldSchema::integer("count")
            .description("Number of results per page")
            .shown_for(&paged),
    )
    .field(
        FieldSchema::string("page_token")
            .description("Token for the next page of results")
            .shown_for(&paged),
    )
    .field(FieldSchema::string("eventUuid").shown_for(&[A::GetEvent.name()]))
    .field(
        FieldSchema::string("min_start_time")
            .description("ISO 8601 lower bound for event start")
            .shown_for(&[A::ListScheduledEvents.name()]),
    )
    .field(
        FieldSchema::string("max_start_time")
            .description("ISO 8601 upper bound for event start")
            .shown_for(&[A::ListScheduledEvents.name()]),
    )
    .field(
        FieldSchema::string("status")
            .enumerated(&["active", "canceled"])
            .shown_for(&[A::ListScheduledEvents.name(), A::ListInvitees.name()]),
    )
    .field(FieldSchema::string("scheduledEventUuid").shown_for(&[
        A::GetScheduledEvent.name(),
        A::ListInvitees.name(),
    ]))
    .field(FieldSchema::string("email").shown_for(&[A::ListInvitees.name()]))
    .field(FieldSchema::string("inviteeUuid").shown_for(&[
        A::GetInvitee.name(),
        A::CancelInvitee.name(),
    ]))
    .field(
        FieldSchema::string("reason")
            .description("Cancellation reason")
            .shown_for(&[A::CancelInvitee.name()]),
    )
    .field(
        FieldSchema::string("url")
            .description("Callback URL for webhook deliveries")
            .shown_for(&[A::CreateWebhook.name()]),
    )
    .field(
        FieldSchema::array("events", crate::schema::FieldType::String)
            .description("Events to subscribe to, e.g. invitee.created")
            .shown_for(&[A::CreateWebhook.name()]),
    )
    .field(
        FieldSchema::string("scope")
            .enumerated(&["user", "organization"])
            .shown_for(&[A::ListWebhooks.name(), A::CreateWebhook.name()]),
    )
    .field(FieldSchema::string("webhookUuid").shown_for(&[A::DeleteWebhook.name()]));

    PluginDescriptor::builder("calendly", "Calendly")
        .description("Scheduling platform for meetings and appointments")
        .tags(&["productivity", "scheduling", "calendar"])
        .documentation("https://developer.calendly.com/api-docs")
        .input_schema(schema.clone())
        .example(
            json!({ "action": "get_user", "token": "your-calendly-token" }),
            json!({
                "uri": "https://api.calendly.com/users/AAAAAAAAAAAAAAAA",
                "name": "John Doe",
                "current_organization": "https://api.calendly.com/organizations/ABCDEFGHIJKLMNOPQRST"
            }),
        )
        .action(super::mega_action(
            "calendly",
            "Execute a Calendly action",
            schema,
            |input, cfg| async move { execute(input, &cfg).await },
        ))
        .build()
}
