//! Pinterest v5: pins, boards, profile and search.

use std::sync::{Arc, OnceLock};

use serde_json::{json, Map, Value};

use crate::{
    client::{Config, RestClient},
    descriptor::PluginDescriptor,
    dispatch::{req, resolve, ActionKind, RequiredParam},
    errors::Result,
    http::{ApiProfile, ApiRequest, Auth},
    pagination::Page,
    params::Params,
    schema::FieldSchema,
};

pub const PROFILE: ApiProfile = ApiProfile {
    label: "Pinterest",
    base_url: "https://api.pinterest.com/v5",
    error_pointers: &["/message", "/error/message", "/error"],
};

const CREDENTIALS: &[RequiredParam] = &[req("token")];
const DEFAULT_PAGE_SIZE: u64 = 25;

crate::actions! {
    pub enum PinterestAction {
        CreatePin = "create_pin" => [req("boardId"), req("title"), req("imageUrl")],
        CreateBoard = "create_board" => [req("name")],
        GetBoardPins = "get_board_pins" => [req("boardId")],
        GetUserBoards = "get_user_boards" => [],
        GetUserProfile = "get_user_profile" => [],
        SearchPins = "search_pins" => [req("query")],
    }
}

/// Fields of a new pin. The image is always referenced by URL.
#[derive(Clone, Debug, Default)]
pub struct NewPin {
    pub board_id: String,
    pub title: String,
    pub image_url: String,
    pub description: Option<String>,
    pub link: Option<String>,
    pub alt_text: Option<String>,
}

impl NewPin {
    fn to_body(&self) -> Value {
        let mut body = Map::new();
        body.insert("board_id".into(), json!(self.board_id));
        body.insert("title".into(), json!(self.title));
        body.insert(
            "media_source".into(),
            json!({ "source_type": "image_url", "url": self.image_url }),
        );
        for (key, value) in [
            ("description", &self.description),
            ("link", &self.link),
            ("alt_text", &self.alt_text),
        ] {
            if let Some(value) = value {
                body.insert(key.into(), json!(value));
            }
        }
        Value::Object(body)
    }
}

/// Page size and the `bookmark` returned by the previous page.
#[derive(Clone, Debug, Default)]
pub struct PageRequest {
    pub page_size: Option<u64>,
    pub bookmark: Option<String>,
}

impl PageRequest {
    fn apply(&self, req: ApiRequest) -> ApiRequest {
        req.query("page_size", self.page_size.unwrap_or(DEFAULT_PAGE_SIZE))
            .query_opt("bookmark", self.bookmark.as_deref())
    }
}

#[derive(Clone)]
pub struct PinterestClient {
    http: RestClient,
}

impl PinterestClient {
    pub fn new(token: &str, cfg: &Config) -> Result<Self> {
        Ok(Self {
            http: RestClient::new(PROFILE, Auth::bearer(token), cfg)?,
        })
    }

    fn for_action(mut self, action: PinterestAction) -> Self {
        self.http = self.http.for_action(action.name());
        self
    }

    async fn items(&self, req: ApiRequest, page: &PageRequest) -> Result<Page<Value>> {
        let body: Value = self.http.send_json(page.apply(req)).await?;
        Page::from_body(body, "items", "/bookmark")
    }

    pub async fn create_pin(&self, pin: &NewPin) -> Result<Value> {
        self.http
            .send_json(ApiRequest::post("/pins").json_value(pin.to_body()))
            .await
    }

    pub async fn create_board(
        &self,
        name: &str,
        description: Option<&str>,
        privacy: Option<&str>,
    ) -> Result<Value> {
        let mut body = json!({ "name": name });
        if let Some(description) = description {
            body["description"] = json!(description);
        }
        if let Some(privacy) = privacy {
            body["privacy"] = json!(privacy);
        }
        self.http
            .send_json(ApiRequest::post("/boards").json_value(body))
            .await
    }

    pub async fn get_board_pins_page(
        &self,
        board_id: &str,
        page: &PageRequest,
    ) -> Result<Page<Value>> {
        self.items(ApiRequest::get(format!("/boards/{board_id}/pins")), page)
            .await
    }

    pub async fn get_user_boards_page(&self, page: &PageRequest) -> Result<Page<Value>> {
        self.items(ApiRequest::get("/boards"), page).await
    }

    pub async fn get_user_profile(&self) -> Result<Value> {
        self.http.send_json(ApiRequest::get("/user_account")).await
    }

    pub async fn search_pins_page(&self, query: &str, page: &PageRequest) -> Result<Page<Value>> {
        self.items(ApiRequest::get("/search/pins").query("query", query), page)
            .await
    }
}

/// Dispatch one Pinterest action.
pub async fn execute(input: Value, cfg: &Config) -> Result<Value> {
    let params = Params::from_value(input)?;
    let action: PinterestAction = resolve(&params, CREDENTIALS)?;
    let client = PinterestClient::new(&params.str("token")?, cfg)?.for_action(action);
    let page = PageRequest {
        page_size: params.opt_u64("maxResults")?,
        bookmark: params.opt_str("bookmark")?,
    };

    match action {
        PinterestAction::CreatePin => {
            let pin = NewPin {
                board_id: params.str("boardId")?,
                title: params.str("title")?,
                image_url: params.str("imageUrl")?,
                description: params.opt_str("description")?,
                link: params.opt_str("link")?,
                alt_text: params.opt_str("altText")?,
            };
            client.create_pin(&pin).await
        }
        PinterestAction::CreateBoard => {
            client
                .create_board(
                    &params.str("name")?,
                    params.opt_str("description")?.as_deref(),
                    params.opt_str("privacy")?.as_deref(),
                )
                .await
        }
        PinterestAction::GetBoardPins => {
            let pins = client
                .get_board_pins_page(&params.str("boardId")?, &page)
                .await?;
            Ok(Value::Array(pins.items))
        }
        PinterestAction::GetUserBoards => {
            Ok(Value::Array(client.get_user_boards_page(&page).await?.items))
        }
        PinterestAction::GetUserProfile => client.get_user_profile().await,
        PinterestAction::SearchPins => {
            let pins = client.search_pins_page(&params.str("query")?, &page).await?;
            Ok(Value::Array(pins.items))
        }
    }
}

pub fn descriptor() -> Arc<PluginDescriptor> {
    static DESCRIPTOR: OnceLock<Arc<PluginDescriptor>> = OnceLock::new();
    DESCRIPTOR.get_or_init(build_descriptor).clone()
}

fn build_descriptor() -> Arc<PluginDescriptor> {
    use PinterestAction as A;
    let create_pin = A::CreatePin.name();

    let schema = super::mega_schema::<A>(vec![
        FieldSchema::string("token").description("Pinterest API OAuth token")
    ])
    .field(
        FieldSchema::string("boardId")
            .description("Pinterest Board ID")
            .shown_for(&[create_pin, A::GetBoardPins.name()]),
    )
    .field(
        FieldSchema::string("title")
            .description("Title for the pin")
            .shown_for(&[create_pin]),
    )
    .field(
        FieldSchema::string("description")
            .description("Description for the pin or board")
            .shown_for(&[create_pin, A::CreateBoard.name()]),
    )
    .field(
        FieldSchema::string("imageUrl")
            .description("URL of the image to pin")
            .shown_for(&[create_pin]),
    )
    .field(
        FieldSchema::string("link")
            .description("Destination link for the pin")
            .shown_for(&[create_pin]),
    )
    .field(
        FieldSchema::string("altText")
            .description("Alternative text for the image")
            .shown_for(&[create_pin]),
    )
    .field(
        FieldSchema::string("name")
            .description("Name for the board")
            .shown_for(&[A::CreateBoard.name()]),
    )
    .field(
        FieldSchema::string("privacy")
            .enumerated(&["PUBLIC", "PROTECTED", "SECRET"])
            .description("Privacy setting for the board")
            .shown_for(&[A::CreateBoard.name()]),
    )
    .field(
        FieldSchema::string("query")
            .description("Search query")
            .shown_for(&[A::SearchPins.name()]),
    )
    .field(
        FieldSchema::number("maxResults")
            .description("Maximum number of results to return (default: 25)")
            .shown_for(&[
                A::GetBoardPins.name(),
                A::GetUserBoards.name(),
                A::SearchPins.name(),
            ]),
    )
    .field(
        FieldSchema::string("bookmark")
            .description("Bookmark returned with the previous page")
            .shown_for(&[
                A::GetBoardPins.name(),
                A::GetUserBoards.name(),
                A::SearchPins.name(),
            ]),
    );

    PluginDescriptor::builder("pinterest", "Pinterest")
        .description(
            "Visual discovery engine for finding ideas like recipes, home decor, style inspiration, and more",
        )
        .tags(&["social", "images"])
        .documentation("https://developers.pinterest.com/docs/")
        .input_schema(schema.clone())
        .example(
            json!({
                "action": "create_pin",
                "token": "your-pinterest-api-token",
                "boardId": "12345678",
                "title": "My Pinterest Pin",
                "imageUrl": "https://example.com/image.jpg",
                "link": "https://example.com"
            }),
            json!({
                "id": "pin-id-12345",
                "title": "My Pinterest Pin",
                "link": "https://example.com",
                "board_id": "12345678"
            }),
        )
        .action(super::mega_action(
            "pinterest",
            "Execute a Pinterest action",
            schema,
            |input, cfg| async move { execute(input, &cfg).await },
        ))
        .build()
}
