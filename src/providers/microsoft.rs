//! Microsoft 365 through Graph: Outlook calendar events and Dynamics contacts.

use std::sync::{Arc, OnceLock};

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::{
    client::{unwrap_field, Config, RestClient},
    descriptor::PluginDescriptor,
    dispatch::{req, resolve, ActionKind, RequiredParam},
    errors::Result,
    http::{ApiProfile, ApiRequest, Auth},
    params::Params,
    schema::{FieldSchema, FieldType},
};

pub const PROFILE: ApiProfile = ApiProfile {
    label: "Microsoft Graph",
    base_url: "https://graph.microsoft.com/v1.0",
    error_pointers: &["/error/message", "/message", "/error_description"],
};

const CREDENTIALS: &[RequiredParam] = &[req("token")];
const EVENT_FIELDS: &str = "id,subject,bodyPreview,start,end,location,organizer,attendees,isAllDay";
const DYNAMICS_BASE: &str = "/api/data/v9.2";

crate::actions! {
    pub enum MicrosoftAction {
        OutlookListEvents = "outlook_list_events" => [],
        OutlookGetEvent = "outlook_get_event" => [req("eventId")],
        OutlookCreateEvent = "outlook_create_event" => [req("subject"), req("body"), req("start"), req("end")],
        OutlookUpdateEvent = "outlook_update_event" => [req("eventId")],
        OutlookDeleteEvent = "outlook_delete_event" => [req("eventId")],
        DynamicsListContacts = "dynamics_list_contacts" => [],
        DynamicsGetContact = "dynamics_get_contact" => [req("contactId")],
        DynamicsCreateContact = "dynamics_create_contact" => [req("firstName"), req("lastName")],
        DynamicsUpdateContact = "dynamics_update_contact" => [req("contactId")],
        DynamicsDeleteContact = "dynamics_delete_contact" => [req("contactId")],
    }
}

#[derive(Debug, Default, Deserialize)]
struct Location {
    #[serde(rename = "displayName", default)]
    display_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Recipient {
    #[serde(rename = "emailAddress", default)]
    email_address: Value,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GraphEvent {
    id: String,
    #[serde(default)]
    subject: Option<String>,
    #[serde(default)]
    body_preview: Option<String>,
    #[serde(default)]
    start: Value,
    #[serde(default)]
    end: Value,
    #[serde(default)]
    location: Option<Location>,
    #[serde(default)]
    organizer: Option<Recipient>,
    #[serde(default)]
    attendees: Vec<Recipient>,
    #[serde(default)]
    is_all_day: bool,
}

/// Calendar event flattened to the fields callers use.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: String,
    pub subject: Option<String>,
    pub body_preview: Option<String>,
    pub start: Value,
    pub end: Value,
    pub location: Option<String>,
    pub organizer: Value,
    pub attendees: Vec<Value>,
    pub is_all_day: bool,
}

impl From<GraphEvent> for Event {
    fn from(e: GraphEvent) -> Self {
        Self {
            id: e.id,
            subject: e.subject,
            body_preview: e.body_preview,
            start: e.start,
            end: e.end,
            location: e.location.and_then(|l| l.display_name),
            organizer: e.organizer.map(|o| o.email_address).unwrap_or(Value::Null),
            attendees: e.attendees.into_iter().map(|a| a.email_address).collect(),
            is_all_day: e.is_all_day,
        }
    }
}

/// Fields of a new or updated event. Times are interpreted as UTC.
#[derive(Clone, Debug, Default)]
pub struct EventInput {
    pub subject: Option<String>,
    /// HTML body.
    pub body: Option<String>,
    pub start: Option<String>,
    pub end: Option<String>,
    pub location: Option<String>,
    pub attendees: Option<Vec<String>>,
    pub is_all_day: Option<bool>,
}

impl EventInput {
    fn from_params(params: &Params) -> Result<Self> {
        Ok(Self {
            subject: params.opt_str("subject")?,
            body: params.opt_str("body")?,
            start: params.opt_str("start")?,
            end: params.opt_str("end")?,
            location: params.opt_str("location")?,
            attendees: match params.opt_value("attendees") {
                Some(_) => Some(params.string_list("attendees")?),
                None => None,
            },
            is_all_day: params.opt_bool("isAllDay")?,
        })
    }

    fn to_body(&self) -> Value {
        let mut body = Map::new();
        if let Some(subject) = &self.subject {
            body.insert("subject".into(), json!(subject));
        }
        if let Some(content) = &self.body {
            body.insert(
                "body".into(),
                json!({ "contentType": "HTML", "content": content }),
            );
        }
        if let Some(start) = &self.start {
            body.insert("start".into(), json!({ "dateTime": start, "timeZone": "UTC" }));
        }
        if let Some(end) = &self.end {
            body.insert("end".into(), json!({ "dateTime": end, "timeZone": "UTC" }));
        }
        if let Some(location) = &self.location {
            body.insert("location".into(), json!({ "displayName": location }));
        }
        if let Some(attendees) = &self.attendees {
            let attendees: Vec<Value> = attendees
                .iter()
                .map(|email| json!({ "emailAddress": { "address": email }, "type": "required" }))
                .collect();
            body.insert("attendees".into(), Value::Array(attendees));
        }
        if let Some(all_day) = self.is_all_day {
            body.insert("isAllDay".into(), json!(all_day));
        }
        Value::Object(body)
    }
}

#[derive(Debug, Default, Deserialize)]
struct DynamicsContact {
    #[serde(default)]
    contactid: Option<String>,
    #[serde(default)]
    firstname: Option<String>,
    #[serde(default)]
    lastname: Option<String>,
    #[serde(default)]
    emailaddress1: Option<String>,
    #[serde(default)]
    telephone1: Option<String>,
    #[serde(default, rename = "_parentcustomerid_value")]
    parent_customer: Option<String>,
    #[serde(default)]
    jobtitle: Option<String>,
    #[serde(default)]
    address1_line1: Option<String>,
    #[serde(default)]
    address1_city: Option<String>,
    #[serde(default)]
    address1_stateorprovince: Option<String>,
    #[serde(default)]
    address1_postalcode: Option<String>,
    #[serde(default)]
    address1_country: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    #[serde(default)]
    pub street: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub postal_code: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Contact {
    pub id: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub company: Option<String>,
    pub job_title: Option<String>,
    pub address: Address,
}

impl From<DynamicsContact> for Contact {
    fn from(c: DynamicsContact) -> Self {
        Self {
            id: c.contactid,
            first_name: c.firstname,
            last_name: c.lastname,
            email: c.emailaddress1,
            phone: c.telephone1,
            company: c.parent_customer,
            job_title: c.jobtitle,
            address: Address {
                street: c.address1_line1,
                city: c.address1_city,
                state: c.address1_stateorprovince,
                postal_code: c.address1_postalcode,
                country: c.address1_country,
            },
        }
    }
}

/// Contact fields accepted on create and update; unset fields are not sent.
#[derive(Clone, Debug, Default)]
pub struct ContactInput {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub company: Option<String>,
    pub job_title: Option<String>,
    pub address: Option<Address>,
}

impl ContactInput {
    fn from_params(params: &Params) -> Result<Self> {
        Ok(Self {
            first_name: params.opt_str("firstName")?,
            last_name: params.opt_str("lastName")?,
            email: params.opt_str("email")?,
            phone: params.opt_str("phone")?,
            company: params.opt_str("company")?,
            job_title: params.opt_str("jobTitle")?,
            address: params.typed("address")?,
        })
    }

    fn to_body(&self) -> Value {
        let mut body = Map::new();
        let mut put = |key: &str, value: &Option<String>| {
            if let Some(v) = value.as_deref().filter(|v| !v.is_empty()) {
                body.insert(key.to_string(), json!(v));
            }
        };
        put("firstname", &self.first_name);
        put("lastname", &self.last_name);
        put("emailaddress1", &self.email);
        put("telephone1", &self.phone);
        put("_parentcustomerid_value", &self.company);
        put("jobtitle", &self.job_title);
        if let Some(address) = &self.address {
            put("address1_line1", &address.street);
            put("address1_city", &address.city);
            put("address1_stateorprovince", &address.state);
            put("address1_postalcode", &address.postal_code);
            put("address1_country", &address.country);
        }
        Value::Object(body)
    }
}

#[derive(Clone)]
pub struct MicrosoftClient {
    http: RestClient,
}

impl MicrosoftClient {
    pub fn new(token: &str, cfg: &Config) -> Result<Self> {
        Ok(Self {
            http: RestClient::new(PROFILE, Auth::bearer(token), cfg)?,
        })
    }

    fn for_action(mut self, action: MicrosoftAction) -> Self {
        self.http = self.http.for_action(action.name());
        self
    }

    pub async fn list_events(
        &self,
        start_date_time: Option<&str>,
        end_date_time: Option<&str>,
    ) -> Result<Vec<Event>> {
        let mut req = ApiRequest::get("/me/calendar/events");
        if let (Some(start), Some(end)) = (start_date_time, end_date_time) {
            req = req.query("startDateTime", start).query("endDateTime", end);
        }
        let body: Value = self.http.send_json(req.query("$select", EVENT_FIELDS)).await?;
        let events: Vec<GraphEvent> = serde_json::from_value(unwrap_field(body, "value")?)?;
        Ok(events.into_iter().map(Event::from).collect())
    }

    pub async fn get_event(&self, event_id: &str) -> Result<Event> {
        let event: GraphEvent = self
            .http
            .send_json(
                ApiRequest::get(format!("/me/calendar/events/{event_id}"))
                    .query("$select", EVENT_FIELDS),
            )
            .await?;
        Ok(event.into())
    }

    pub async fn create_event(&self, input: &EventInput) -> Result<Event> {
        let mut body = input.to_body();
        body["isAllDay"] = json!(input.is_all_day.unwrap_or(false));
        if body.get("attendees").is_none() {
            body["attendees"] = json!([]);
        }
        let event: GraphEvent = self
            .http
            .send_json(ApiRequest::post("/me/calendar/events").json_value(body))
            .await?;
        Ok(event.into())
    }

    pub async fn update_event(&self, event_id: &str, input: &EventInput) -> Result<Event> {
        let event: GraphEvent = self
            .http
            .send_json(
                ApiRequest::patch(format!("/me/calendar/events/{event_id}"))
                    .json_value(input.to_body()),
            )
            .await?;
        Ok(event.into())
    }

    pub async fn delete_event(&self, event_id: &str) -> Result<()> {
        self.http
            .send_empty(ApiRequest::delete(format!("/me/calendar/events/{event_id}")))
            .await
    }

    pub async fn list_contacts(&self, filter: Option<&str>, top: Option<u64>) -> Result<Vec<Contact>> {
        let req = ApiRequest::get(format!("{DYNAMICS_BASE}/contacts"))
            .query_opt("$filter", filter)
            .query_opt("$top", top);
        let body: Value = self.http.send_json(req).await?;
        let contacts: Vec<DynamicsContact> = serde_json::from_value(unwrap_field(body, "value")?)?;
        Ok(contacts.into_iter().map(Contact::from).collect())
    }

    pub async fn get_contact(&self, contact_id: &str) -> Result<Contact> {
        let contact: DynamicsContact = self
            .http
            .send_json(ApiRequest::get(format!("{DYNAMICS_BASE}/contacts({contact_id})")))
            .await?;
        Ok(contact.into())
    }

    pub async fn create_contact(&self, input: &ContactInput) -> Result<Contact> {
        let contact: DynamicsContact = self
            .http
            .send_json(
                ApiRequest::post(format!("{DYNAMICS_BASE}/contacts")).json_value(input.to_body()),
            )
            .await?;
        Ok(contact.into())
    }

    /// Patch the contact, then read it back.
    pub async fn update_contact(&self, contact_id: &str, input: &ContactInput) -> Result<Contact> {
        self.http
            .send_empty(
                ApiRequest::patch(format!("{DYNAMICS_BASE}/contacts({contact_id})"))
                    .json_value(input.to_body()),
            )
            .await?;
        self.get_contact(contact_id).await
    }

    pub async fn delete_contact(&self, contact_id: &str) -> Result<()> {
        self.http
            .send_empty(ApiRequest::delete(format!(
                "{DYNAMICS_BASE}/contacts({contact_id})"
            )))
            .await
    }
}

/// Dispatch one Microsoft Office action.
pub async fn execute(input: Value, cfg: &Config) -> Result<Value> {
    let params = Params::from_value(input)?;
    let action: MicrosoftAction = resolve(&params, CREDENTIALS)?;
    let client = MicrosoftClient::new(&params.str("token")?, cfg)?.for_action(action);

    let out = match action {
        MicrosoftAction::OutlookListEvents => {
            let events = client
                .list_events(
                    params.opt_str("startDateTime")?.as_deref(),
                    params.opt_str("endDateTime")?.as_deref(),
                )
                .await?;
            json!({ "events": events })
        }
        MicrosoftAction::OutlookGetEvent => {
            serde_json::to_value(client.get_event(&params.str("eventId")?).await?)?
        }
        MicrosoftAction::OutlookCreateEvent => serde_json::to_value(
            client
                .create_event(&EventInput::from_params(&params)?)
                .await?,
        )?,
        MicrosoftAction::OutlookUpdateEvent => serde_json::to_value(
            client
                .update_event(&params.str("eventId")?, &EventInput::from_params(&params)?)
                .await?,
        )?,
        MicrosoftAction::OutlookDeleteEvent => {
            client.delete_event(&params.str("eventId")?).await?;
            json!({ "success": true })
        }
        MicrosoftAction::DynamicsListContacts => {
            let contacts = client
                .list_contacts(params.opt_str("filter")?.as_deref(), params.opt_u64("top")?)
                .await?;
            json!({ "contacts": contacts })
        }
        MicrosoftAction::DynamicsGetContact => {
            serde_json::to_value(client.get_contact(&params.str("contactId")?).await?)?
        }
        MicrosoftAction::DynamicsCreateContact => serde_json::to_value(
            client
                .create_contact(&ContactInput::from_params(&params)?)
                .await?,
        )?,
        MicrosoftAction::DynamicsUpdateContact => serde_json::to_value(
            client
                .update_contact(
                    &params.str("contactId")?,
                    &ContactInput::from_params(&params)?,
                )
                .await?,
        )?,
        MicrosoftAction::DynamicsDeleteContact => {
            client.delete_contact(&params.str("contactId")?).await?;
            json!({ "success": true })
        }
    };
    Ok(out)
}

pub fn descriptor() -> Arc<PluginDescriptor> {
    static DESCRIPTOR: OnceLock<Arc<PluginDescriptor>> = OnceLock::new();
    DESCRIPTOR.get_or_init(build_descriptor).clone()
}

fn build_descriptor() -> Arc<PluginDescriptor> {
    use MicrosoftAction as A;
    let event_writes = [A::OutlookCreateEvent.name(), A::OutlookUpdateEvent.name()];
    let contact_writes = [
        A::DynamicsCreateContact.name(),
        A::DynamicsUpdateContact.name(),
    ];

    let schema = super::mega_schema::<A>(vec![
        FieldSchema::string("token").description("Microsoft Graph access token")
    ])
    .field(
        FieldSchema::string("startDateTime")
            .description("ISO 8601 start of the listing window")
            .shown_for(&[A::OutlookListEvents.name()]),
    )
    .field(
        FieldSchema::string("endDateTime")
            .description("ISO 8601 end of the listing window")
            .shown_for(&[A::OutlookListEvents.name()]),
    )
    .field(FieldSchema::string("eventId").shown_for(&[
        A::OutlookGetEvent.name(),
        A::OutlookUpdateEvent.name(),
        A::OutlookDeleteEvent.name(),
    ]))
    .field(FieldSchema::string("subject").shown_for(&event_writes))
    .field(
        FieldSchema::string("body")
            .description("HTML body of the event")
            .shown_for(&event_writes),
    )
    .field(FieldSchema::string("start").shown_for(&event_writes))
    .field(FieldSchema::string("end").shown_for(&event_writes))
    .field(FieldSchema::string("location").shown_for(&event_writes))
    .field(
        FieldSchema::array("attendees", FieldType::String)
            .description("Attendee email addresses")
            .shown_for(&event_writes),
    )
    .field(FieldSchema::boolean("isAllDay").shown_for(&event_writes))
    .field(
        FieldSchema::string("filter")
            .description("OData $filter expression")
            .shown_for(&[A::DynamicsListContacts.name()]),
    )
    .field(
        FieldSchema::integer("top")
            .description("Maximum number of records")
            .shown_for(&[A::DynamicsListContacts.name()]),
    )
    .field(FieldSchema::string("contactId").shown_for(&[
        A::DynamicsGetContact.name(),
        A::DynamicsUpdateContact.name(),
        A::DynamicsDeleteContact.name(),
    ]))
    .field(FieldSchema::string("firstName").shown_for(&contact_writes))
    .field(FieldSchema::string("lastName").shown_for(&contact_writes))
    .field(FieldSchema::string("email").shown_for(&contact_writes))
    .field(FieldSchema::string("phone").shown_for(&contact_writes))
    .field(
        FieldSchema::string("company")
            .description("Parent account id")
            .shown_for(&contact_writes),
    )
    .field(FieldSchema::string("jobTitle").shown_for(&contact_writes))
    .field(
        FieldSchema::object("address")
            .description("{street, city, state, postalCode, country}")
            .shown_for(&contact_writes),
    );

    PluginDescriptor::builder("microsoft-office", "Microsoft Office")
        .description("Outlook calendar and Dynamics CRM contacts through Microsoft Graph")
        .tags(&["productivity", "office", "crm"])
        .documentation("https://learn.microsoft.com/en-us/graph/overview")
        .input_schema(schema.clone())
        .example(
            json!({ "action": "outlook_list_events", "token": "your-graph-token" }),
            json!({ "events": [] }),
        )
        .action(super::mega_action(
            "microsoft-office",
            "Execute a Microsoft Office action",
            schema,
            |input, cfg| async move { execute(input, &cfg).await },
        ))
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn graph_event_flattens_nested_fields() {
        let wire: GraphEvent = serde_json::from_value(json!({
            "id": "evt1",
            "subject": "Standup",
            "location": {"displayName": "Room 1"},
            "organizer": {"emailAddress": {"address": "a@b.com"}},
            "attendees": [{"emailAddress": {"address": "c@d.com"}}],
            "isAllDay": false
        }))
        .unwrap();
        let event = Event::from(wire);
        assert_eq!(event.location.as_deref(), Some("Room 1"));
        assert_eq!(event.organizer, json!({"address": "a@b.com"}));
        assert_eq!(event.attendees, vec![json!({"address": "c@d.com"})]);
    }

    #[test]
    fn contact_body_skips_unset_fields() {
        let input = ContactInput {
            first_name: Some("Ada".into()),
            last_name: Some("Lovelace".into()),
            address: Some(Address {
                city: Some("London".into()),
                ..Default::default()
            }),
            ..Default::default()
        };
        assert_eq!(
            input.to_body(),
            json!({"firstname": "Ada", "lastname": "Lovelace", "address1_city": "London"})
        );
    }
}
