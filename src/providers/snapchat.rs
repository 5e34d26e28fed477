//! Snapchat Marketing API: ads, campaigns, creatives and ad accounts.
//!
//! Responses are decoded from the snake_case wire format into typed records
//! that serialize back out in camelCase.

use std::sync::{Arc, OnceLock};

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::{
    client::{unwrap_field, Config, RestClient},
    descriptor::PluginDescriptor,
    dispatch::{req, resolve, ActionKind, RequiredParam},
    errors::Result,
    http::{ApiProfile, ApiRequest, Auth},
    pagination::{query_param, take_items, Page},
    params::Params,
    schema::FieldSchema,
};

pub const PROFILE: ApiProfile = ApiProfile {
    label: "Snapchat",
    base_url: "https://adsapi.snapchat.com/v1",
    error_pointers: &["/error/message", "/debug_message", "/message"],
};

const CREDENTIALS: &[RequiredParam] = &[req("token")];
const DEFAULT_LIMIT: u64 = 50;

crate::actions! {
    pub enum SnapchatAction {
        CreateAd = "create_ad" => [
            req("adAccountId"), req("campaignId"), req("name"), req("status"), req("creativeId")
        ],
        CreateCampaign = "create_campaign" => [
            req("adAccountId"), req("name"), req("status"), req("objective")
        ],
        CreateCreative = "create_creative" => [
            req("adAccountId"), req("name"), req("type"), req("brandName"), req("headline"),
            req("topSnapMediaId")
        ],
        GetAds = "get_ads" => [req("adAccountId")],
        GetCampaigns = "get_campaigns" => [req("adAccountId")],
        GetAdAccounts = "get_ad_accounts" => [],
    }
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
struct AdStats {
    #[serde(default)]
    impressions: u64,
    #[serde(default)]
    swipes: u64,
    #[serde(default)]
    spends: u64,
}

#[derive(Debug, Deserialize)]
struct AdWire {
    id: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default, rename = "type")]
    kind: Option<String>,
    #[serde(default)]
    creative_url: Option<String>,
    #[serde(default)]
    start_time: Option<String>,
    #[serde(default)]
    end_time: Option<String>,
    #[serde(default)]
    daily_budget: Option<Value>,
    #[serde(default)]
    lifetime_budget: Option<Value>,
    #[serde(default)]
    stats: Option<AdStats>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Ad {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub creative_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub daily_budget: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lifetime_budget: Option<Value>,
    pub impressions: u64,
    pub swipes: u64,
    pub spends: u64,
}

impl From<AdWire> for Ad {
    fn from(w: AdWire) -> Self {
        let stats = w.stats.unwrap_or_default();
        Self {
            id: w.id,
            name: w.name,
            status: w.status,
            kind: w.kind,
            creative_url: w.creative_url,
            start_time: w.start_time,
            end_time: w.end_time,
            daily_budget: w.daily_budget,
            lifetime_budget: w.lifetime_budget,
            impressions: stats.impressions,
            swipes: stats.swipes,
            spends: stats.spends,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all(serialize = "camelCase", deserialize = "snake_case"))]
pub struct Campaign {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub daily_budget: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lifetime_budget: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub objective: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all(serialize = "camelCase", deserialize = "snake_case"))]
pub struct AdAccount {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub advertiser_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization_id: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all(serialize = "camelCase", deserialize = "snake_case"))]
pub struct Creative {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brand_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headline: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_snap_media_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_snap_crop_position: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub web_view_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_install_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub call_to_action: Option<String>,
}

/// Optional budget and flight dates shared by ads and campaigns.
#[derive(Clone, Debug, Default)]
pub struct Schedule {
    pub daily_budget: Option<Value>,
    pub lifetime_budget: Option<Value>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
}

impl Schedule {
    fn from_params(params: &Params) -> Result<Self> {
        Ok(Self {
            daily_budget: params.opt_value("dailyBudget"),
            lifetime_budget: params.opt_value("lifetimeBudget"),
            start_time: params.opt_str("startTime")?,
            end_time: params.opt_str("endTime")?,
        })
    }

    fn extend(&self, body: &mut Map<String, Value>) {
        if let Some(v) = &self.daily_budget {
            body.insert("daily_budget".into(), v.clone());
        }
        if let Some(v) = &self.lifetime_budget {
            body.insert("lifetime_budget".into(), v.clone());
        }
        if let Some(v) = &self.start_time {
            body.insert("start_time".into(), json!(v));
        }
        if let Some(v) = &self.end_time {
            body.insert("end_time".into(), json!(v));
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct NewCreative {
    pub name: String,
    /// `SNAP_AD`, `WEB_VIEW`, `APP_INSTALL`, ...
    pub kind: String,
    pub brand_name: String,
    pub headline: String,
    pub top_snap_media_id: String,
    pub web_view_url: Option<String>,
    pub app_install_url: Option<String>,
    pub call_to_action: Option<String>,
}

impl NewCreative {
    /// Destination URLs are only sent for the creative type that uses them.
    fn to_body(&self) -> Value {
        let mut body = Map::new();
        body.insert("name".into(), json!(self.name));
        body.insert("type".into(), json!(self.kind));
        body.insert("brand_name".into(), json!(self.brand_name));
        body.insert("headline".into(), json!(self.headline));
        body.insert("top_snap_media_id".into(), json!(self.top_snap_media_id));
        match (self.kind.as_str(), &self.web_view_url, &self.app_install_url) {
            ("WEB_VIEW", Some(url), _) => {
                body.insert("web_view_url".into(), json!(url));
            }
            ("APP_INSTALL", _, Some(url)) => {
                body.insert("app_install_url".into(), json!(url));
            }
            _ => {}
        }
        if let Some(cta) = &self.call_to_action {
            body.insert("call_to_action".into(), json!(cta));
        }
        Value::Object(body)
    }
}

#[derive(Clone)]
pub struct SnapchatClient {
    http: RestClient,
}

impl SnapchatClient {
    pub fn new(token: &str, cfg: &Config) -> Result<Self> {
        Ok(Self {
            http: RestClient::new(PROFILE, Auth::bearer(token), cfg)?,
        })
    }

    fn for_action(mut self, action: SnapchatAction) -> Self {
        self.http = self.http.for_action(action.name());
        self
    }

    async fn field<T: serde::de::DeserializeOwned>(
        &self,
        req: ApiRequest,
        envelope: &str,
    ) -> Result<T> {
        let body: Value = self.http.send_json(req).await?;
        Ok(serde_json::from_value(unwrap_field(body, envelope)?)?)
    }

    /// One list page; the token is the `cursor` of `paging.next_link`.
    async fn page<T: serde::de::DeserializeOwned>(
        &self,
        req: ApiRequest,
        envelope: &str,
    ) -> Result<Page<T>> {
        let mut body: Value = self.http.send_json(req).await?;
        let next = body
            .pointer("/paging/next_link")
            .and_then(Value::as_str)
            .and_then(|link| query_param(link, "cursor"));
        Ok(Page::new(take_items(&mut body, envelope)?, next))
    }

    pub async fn create_ad(
        &self,
        ad_account_id: &str,
        campaign_id: &str,
        name: &str,
        status: &str,
        creative_id: &str,
        schedule: &Schedule,
    ) -> Result<Ad> {
        let mut body = Map::new();
        body.insert("campaign_id".into(), json!(campaign_id));
        body.insert("name".into(), json!(name));
        body.insert("status".into(), json!(status));
        body.insert("creative_id".into(), json!(creative_id));
        schedule.extend(&mut body);
        let wire: AdWire = self
            .field(
                ApiRequest::post(format!("/adaccounts/{ad_account_id}/ads"))
                    .json_value(Value::Object(body)),
                "ad",
            )
            .await?;
        Ok(wire.into())
    }

    pub async fn create_campaign(
        &self,
        ad_account_id: &str,
        name: &str,
        status: &str,
        objective: &str,
        schedule: &Schedule,
    ) -> Result<Campaign> {
        let mut body = Map::new();
        body.insert("name".into(), json!(name));
        body.insert("status".into(), json!(status));
        body.insert("objective".into(), json!(objective));
        schedule.extend(&mut body);
        self.field(
            ApiRequest::post(format!("/adaccounts/{ad_account_id}/campaigns"))
                .json_value(Value::Object(body)),
            "campaign",
        )
        .await
    }

    pub async fn create_creative(
        &self,
        ad_account_id: &str,
        creative: &NewCreative,
    ) -> Result<Creative> {
        self.field(
            ApiRequest::post(format!("/adaccounts/{ad_account_id}/creatives"))
                .json_value(creative.to_body()),
            "creative",
        )
        .await
    }

    pub async fn get_ads_page(
        &self,
        ad_account_id: &str,
        campaign_id: Option<&str>,
        status: Option<&str>,
        limit: Option<u64>,
        cursor: Option<&str>,
    ) -> Result<Page<Ad>> {
        let req = ApiRequest::get(format!("/adaccounts/{ad_account_id}/ads"))
            .query("limit", limit.unwrap_or(DEFAULT_LIMIT))
            .query_opt("campaign_id", campaign_id)
            .query_opt("status", status)
            .query_opt("cursor", cursor);
        let ads: Page<AdWire> = self.page(req, "ads").await?;
        Ok(ads.map(Ad::from))
    }

    pub async fn get_campaigns_page(
        &self,
        ad_account_id: &str,
        status: Option<&str>,
        limit: Option<u64>,
        cursor: Option<&str>,
    ) -> Result<Page<Campaign>> {
        let req = ApiRequest::get(format!("/adaccounts/{ad_account_id}/campaigns"))
            .query("limit", limit.unwrap_or(DEFAULT_LIMIT))
            .query_opt("status", status)
            .query_opt("cursor", cursor);
        self.page(req, "campaigns").await
    }

    pub async fn get_ad_accounts_page(
        &self,
        limit: Option<u64>,
        cursor: Option<&str>,
    ) -> Result<Page<AdAccount>> {
        self.page(
            ApiRequest::get("/me/adaccounts")
                .query("limit", limit.unwrap_or(DEFAULT_LIMIT))
                .query_opt("cursor", cursor),
            "adaccounts",
        )
        .await
    }
}

/// Dispatch one Snapchat action.
pub async fn execute(input: Value, cfg: &Config) -> Result<Value> {
    let params = Params::from_value(input)?;
    let action: SnapchatAction = resolve(&params, CREDENTIALS)?;
    let client = SnapchatClient::new(&params.str("token")?, cfg)?.for_action(action);
    let limit = params.opt_u64("maxResults")?;
    let cursor = params.opt_str("cursor")?;

    let out = match action {
        SnapchatAction::CreateAd => serde_json::to_value(
            client
                .create_ad(
                    &params.str("adAccountId")?,
                    &params.str("campaignId")?,
                    &params.str("name")?,
                    &params.str("status")?,
                    &params.str("creativeId")?,
                    &Schedule::from_params(&params)?,
                )
                .await?,
        )?,
        SnapchatAction::CreateCampaign => serde_json::to_value(
            client
                .create_campaign(
                    &params.str("adAccountId")?,
                    &params.str("name")?,
                    &params.str("status")?,
                    &params.str("objective")?,
                    &Schedule::from_params(&params)?,
                )
                .await?,
        )?,
        SnapchatAction::CreateCreative => {
            let creative = NewCreative {
                name: params.str("name")?,
                kind: params.str("type")?,
                brand_name: params.str("brandName")?,
                headline: params.str("headline")?,
                top_snap_media_id: params.str("topSnapMediaId")?,
                web_view_url: params.opt_str("webViewUrl")?,
                app_install_url: params.opt_str("appInstallUrl")?,
                call_to_action: params.opt_str("callToAction")?,
            };
            serde_json::to_value(
                client
                    .create_creative(&params.str("adAccountId")?, &creative)
                    .await?,
            )?
        }
        SnapchatAction::GetAds => serde_json::to_value(
            client
                .get_ads_page(
                    &params.str("adAccountId")?,
                    params.opt_str("campaignId")?.as_deref(),
                    params.opt_str("status")?.as_deref(),
                    limit,
                    cursor.as_deref(),
                )
                .await?
                .items,
        )?,
        SnapchatAction::GetCampaigns => serde_json::to_value(
            client
                .get_campaigns_page(
                    &params.str("adAccountId")?,
                    params.opt_str("status")?.as_deref(),
                    limit,
                    cursor.as_deref(),
                )
                .await?
                .items,
        )?,
        SnapchatAction::GetAdAccounts => serde_json::to_value(
            client
                .get_ad_accounts_page(limit, cursor.as_deref())
                .await?
                .items,
        )?,
    };
    Ok(out)
}

pub fn descriptor() -> Arc<PluginDescriptor> {
    static DESCRIPTOR: OnceLock<Arc<PluginDescriptor>> = OnceLock::new();
    DESCRIPTOR.get_or_init(build_descriptor).clone()
}

fn build_descriptor() -> Arc<PluginDescriptor> {
    use SnapchatAction as A;
    let scheduled = [A::CreateAd.name(), A::CreateCampaign.name()];

    let schema = super::mega_schema::<A>(vec![
        FieldSchema::string("token").description("Snapchat Marketing API OAuth token")
    ])
    .field(FieldSchema::string("adAccountId").shown_for(&[
        A::CreateAd.name(),
        A::CreateCampaign.name(),
        A::CreateCreative.name(),
        A::GetAds.name(),
        A::GetCampaigns.name(),
    ]))
    .field(
        FieldSchema::string("campaignId")
            .shown_for(&[A::CreateAd.name(), A::GetAds.name()]),
    )
    .field(FieldSchema::string("name").shown_for(&[
        A::CreateAd.name(),
        A::CreateCampaign.name(),
        A::CreateCreative.name(),
    ]))
    .field(
        FieldSchema::string("status")
            .enumerated(&["ACTIVE", "PAUSED"])
            .shown_for(&[
                A::CreateAd.name(),
                A::CreateCampaign.name(),
                A::GetAds.name(),
                A::GetCampaigns.name(),
            ]),
    )
    .field(FieldSchema::string("creativeId").shown_for(&[A::CreateAd.name()]))
    .field(
        FieldSchema::number("dailyBudget")
            .description("Daily budget in micro-currency")
            .shown_for(&scheduled),
    )
    .field(
        FieldSchema::number("lifetimeBudget")
            .description("Lifetime budget in micro-currency")
            .shown_for(&scheduled),
    )
    .field(FieldSchema::string("startTime").shown_for(&scheduled))
    .field(FieldSchema::string("endTime").shown_for(&scheduled))
    .field(
        FieldSchema::string("objective")
            .enumerated(&["BRAND_AWARENESS", "APP_INSTALLS", "WEB_CONVERSION", "VIDEO_VIEWS"])
            .shown_for(&[A::CreateCampaign.name()]),
    )
    .field(
        FieldSchema::string("type")
            .enumerated(&["SNAP_AD", "WEB_VIEW", "APP_INSTALL", "DEEP_LINK"])
            .shown_for(&[A::CreateCreative.name()]),
    )
    .field(FieldSchema::string("brandName").shown_for(&[A::CreateCreative.name()]))
    .field(FieldSchema::string("headline").shown_for(&[A::CreateCreative.name()]))
    .field(FieldSchema::string("topSnapMediaId").shown_for(&[A::CreateCreative.name()]))
    .field(
        FieldSchema::string("webViewUrl")
            .description("Only used for WEB_VIEW creatives")
            .shown_for(&[A::CreateCreative.name()]),
    )
    .field(
        FieldSchema::string("appInstallUrl")
            .description("Only used for APP_INSTALL creatives")
            .shown_for(&[A::CreateCreative.name()]),
    )
    .field(FieldSchema::string("callToAction").shown_for(&[A::CreateCreative.name()]))
    .field(
        FieldSchema::number("maxResults")
            .default_value(json!(DEFAULT_LIMIT))
            .shown_for(&[
                A::GetAds.name(),
                A::GetCampaigns.name(),
                A::GetAdAccounts.name(),
            ]),
    )
    .field(
        FieldSchema::string("cursor")
            .description("Cursor from the previous page's next link")
            .shown_for(&[
                A::GetAds.name(),
                A::GetCampaigns.name(),
                A::GetAdAccounts.name(),
            ]),
    );

    PluginDescriptor::builder("snapchat", "Snapchat")
        .description("Manage Snapchat ad accounts, campaigns, ads and creatives")
        .tags(&["social", "advertising", "marketing"])
        .documentation("https://marketingapi.snapchat.com/docs/")
        .input_schema(schema.clone())
        .example(
            json!({ "action": "get_ad_accounts", "token": "your-snapchat-token" }),
            json!([{ "id": "acc_1", "name": "Main account", "currency": "USD" }]),
        )
        .action(super::mega_action(
            "snapchat",
            "Execute a Snapchat action",
            schema,
            |input, cfg| async move { execute(input, &cfg).await },
        ))
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ad_stats_default_to_zero() {
        let wire: AdWire = serde_json::from_value(json!({
            "id": "ad_1",
            "name": "Spring",
            "creative_url": "https://x"
        }))
        .unwrap();
        let ad = serde_json::to_value(Ad::from(wire)).unwrap();
        assert_eq!(
            ad,
            json!({
                "id": "ad_1",
                "name": "Spring",
                "creativeUrl": "https://x",
                "impressions": 0,
                "swipes": 0,
                "spends": 0
            })
        );
    }

    #[test]
    fn creative_urls_follow_type() {
        let creative = NewCreative {
            kind: "SNAP_AD".into(),
            web_view_url: Some("https://w".into()),
            ..Default::default()
        };
        assert!(creative.to_body().get("web_view_url").is_none());

        let creative = NewCreative {
            kind: "WEB_VIEW".into(),
            web_view_url: Some("https://w".into()),
            ..Default::default()
        };
        assert_eq!(creative.to_body()["web_view_url"], "https://w");
    }
}
