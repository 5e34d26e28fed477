//! Shopify Admin REST (2023-10): customers, products, orders, fulfillment, inventory.
//!
//! Responses are unwrapped from their resource envelope (`{"product": {...}}`).
//! Customer and product listings follow `Link: rel="next"` until exhausted.

use std::sync::{Arc, OnceLock};

use serde_json::{json, Value};

use crate::{
    client::{unwrap_field, Config, RestClient},
    descriptor::PluginDescriptor,
    dispatch::{req, resolve, ActionKind, RequiredParam},
    errors::Result,
    http::{ApiProfile, ApiRequest, Auth},
    pagination::{next_link, query_param},
    params::Params,
    schema::FieldSchema,
};

pub const API_VERSION: &str = "2023-10";
pub const ACCESS_TOKEN_HEADER: &str = "X-Shopify-Access-Token";

pub const PROFILE: ApiProfile = ApiProfile {
    label: "Shopify",
    base_url: "https://example.myshopify.com/admin/api/2023-10",
    error_pointers: &["/errors", "/error", "/message"],
};

const CREDENTIALS: &[RequiredParam] = &[req("shopName"), req("adminToken")];

crate::actions! {
    pub enum ShopifyAction {
        GetCustomer = "get_customer" => [req("customerId")],
        GetCustomers = "get_customers" => [],
        CreateCustomer = "create_customer" => [req("customerData")],
        UpdateCustomer = "update_customer" => [req("customerId"), req("customerData")],
        GetCustomerOrders = "get_customer_orders" => [req("customerId")],
        GetProduct = "get_product" => [req("productId")],
        GetProducts = "get_products" => [],
        CreateProduct = "create_product" => [req("productData")],
        UpdateProduct = "update_product" => [req("productId"), req("productData")],
        GetProductVariant = "get_product_variant" => [req("variantId")],
        UploadProductImage = "upload_product_image" => [req("productId"), req("productImage")],
        CreateOrder = "create_order" => [req("orderData")],
        UpdateOrder = "update_order" => [req("orderId"), req("orderData")],
        CloseOrder = "close_order" => [req("orderId")],
        CancelOrder = "cancel_order" => [req("orderId")],
        CreateDraftOrder = "create_draft_order" => [req("draftOrderData")],
        CreateTransaction = "create_transaction" => [req("orderId"), req("transactionData")],
        GetTransaction = "get_transaction" => [req("orderId"), req("transactionId")],
        GetTransactions = "get_transactions" => [req("orderId")],
        GetFulfillment = "get_fulfillment" => [req("orderId"), req("fulfillmentId")],
        GetFulfillments = "get_fulfillments" => [req("orderId")],
        CreateFulfillmentEvent = "create_fulfillment_event" => [req("orderId"), req("fulfillmentId"), req("fulfillmentEventData")],
        GetLocations = "get_locations" => [],
        AdjustInventoryLevel = "adjust_inventory_level" => [req("inventoryItemId"), req("locationId"), req("adjustment")],
        CreateCollect = "create_collect" => [req("collectData")],
        GetAsset = "get_asset" => [req("assetKey"), req("themeId")],
        ProcessWebhook = "process_webhook" => [req("webhookPayload")],
    }
}

/// Product listing filters.
#[derive(Clone, Debug, Default)]
pub struct ProductSearch {
    pub title: Option<String>,
    pub created_at_min: Option<String>,
    pub updated_at_min: Option<String>,
}

/// Image for `upload_product_image`: a public URL or base64 attachment.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProductImage {
    Src(String),
    Attachment(String),
}

impl ProductImage {
    /// URLs (anything starting with `http`) become `src`, the rest is an attachment.
    pub fn from_input(value: &str) -> Self {
        if value.starts_with("http") {
            ProductImage::Src(value.to_string())
        } else {
            ProductImage::Attachment(value.to_string())
        }
    }

    fn to_json(&self) -> Value {
        match self {
            ProductImage::Src(src) => json!({ "src": src }),
            ProductImage::Attachment(data) => json!({ "attachment": data }),
        }
    }
}

#[derive(Clone)]
pub struct ShopifyClient {
    http: RestClient,
}

impl ShopifyClient {
    pub fn new(shop_name: &str, admin_token: &str, cfg: &Config) -> Result<Self> {
        let base = format!("https://{shop_name}.myshopify.com/admin/api/{API_VERSION}");
        Ok(Self {
            http: RestClient::with_base(
                PROFILE,
                &base,
                Auth::header(ACCESS_TOKEN_HEADER, admin_token),
                cfg,
            )?,
        })
    }

    fn for_action(mut self, action: ShopifyAction) -> Self {
        self.http = self.http.for_action(action.name());
        self
    }

    async fn fetch(&self, req: ApiRequest, envelope: &str) -> Result<Value> {
        let body: Value = self.http.send_json(req).await?;
        unwrap_field(body, envelope)
    }

    /// Follow `rel="next"` links until the last page, concatenating `envelope` arrays.
    async fn list_all(
        &self,
        path: &str,
        envelope: &str,
        filters: Vec<(String, String)>,
    ) -> Result<Vec<Value>> {
        let mut items = Vec::new();
        let mut page_info: Option<String> = None;
        loop {
            let mut req = ApiRequest::get(path);
            req.query = filters.clone();
            let req = req.query_opt("page_info", page_info.as_deref());
            let page = self.http.send_json_with_headers::<Value>(req).await?;
            match unwrap_field(page.body, envelope)? {
                Value::Array(batch) => items.extend(batch),
                Value::Null => {}
                other => items.push(other),
            }
            page_info = next_link(&page.headers).and_then(|next| query_param(&next, "page_info"));
            if page_info.is_none() {
                break;
            }
            #[cfg(feature = "tracing")]
            tracing::debug!(path, fetched = items.len(), "following shopify next page");
        }
        Ok(items)
    }

    pub async fn get_customer(&self, id: &str) -> Result<Value> {
        self.fetch(ApiRequest::get(format!("/customers/{id}.json")), "customer")
            .await
    }

    pub async fn list_all_customers(&self) -> Result<Vec<Value>> {
        self.list_all("/customers.json", "customers", Vec::new()).await
    }

    pub async fn create_customer(&self, customer: Value) -> Result<Value> {
        self.fetch(
            ApiRequest::post("/customers.json").json_value(json!({ "customer": customer })),
            "customer",
        )
        .await
    }

    pub async fn update_customer(&self, id: &str, customer: Value) -> Result<Value> {
        self.fetch(
            ApiRequest::put(format!("/customers/{id}.json"))
                .json_value(json!({ "customer": customer })),
            "customer",
        )
        .await
    }

    pub async fn get_customer_orders(&self, id: &str) -> Result<Value> {
        self.fetch(
            ApiRequest::get(format!("/customers/{id}/orders.json")),
            "orders",
        )
        .await
    }

    pub async fn get_product(&self, id: &str) -> Result<Value> {
        self.fetch(ApiRequest::get(format!("/products/{id}.json")), "product")
            .await
    }

    pub async fn list_all_products(&self, search: &ProductSearch) -> Result<Vec<Value>> {
        let mut filters = Vec::new();
        if let Some(title) = &search.title {
            filters.push(("title".to_string(), title.clone()));
        }
        if let Some(min) = &search.created_at_min {
            filters.push(("created_at_min".to_string(), min.clone()));
        }
        if let Some(min) = &search.updated_at_min {
            filters.push(("updated_at_min".to_string(), min.clone()));
        }
        self.list_all("/products.json", "products", filters).await
    }

    pub async fn create_product(&self, product: Value) -> Result<Value> {
        self.fetch(
            ApiRequest::post("/products.json").json_value(json!({ "product": product })),
            "product",
        )
        .await
    }

    pub async fn update_product(&self, id: &str, product: Value) -> Result<Value> {
        self.fetch(
            ApiRequest::put(format!("/products/{id}.json"))
                .json_value(json!({ "product": product })),
            "product",
        )
        .await
    }

    pub async fn get_product_variant(&self, id: &str) -> Result<Value> {
        self.fetch(ApiRequest::get(format!("/variants/{id}.json")), "variant")
            .await
    }

    pub async fn upload_product_image(&self, product_id: &str, image: &ProductImage) -> Result<Value> {
        self.fetch(
            ApiRequest::post(format!("/products/{product_id}/images.json"))
                .json_value(json!({ "image": image.to_json() })),
            "image",
        )
        .await
    }

    pub async fn create_order(&self, order: Value) -> Result<Value> {
        self.fetch(
            ApiRequest::post("/orders.json").json_value(json!({ "order": order })),
            "order",
        )
        .await
    }

    pub async fn update_order(&self, id: &str, order: Value) -> Result<Value> {
        self.fetch(
            ApiRequest::put(format!("/orders/{id}.json")).json_value(json!({ "order": order })),
            "order",
        )
        .await
    }

    pub async fn close_order(&self, id: &str) -> Result<Value> {
        self.fetch(
            ApiRequest::post(format!("/orders/{id}/close.json")).json_value(json!({})),
            "order",
        )
        .await
    }

    pub async fn cancel_order(&self, id: &str) -> Result<Value> {
        self.fetch(
            ApiRequest::post(format!("/orders/{id}/cancel.json")).json_value(json!({})),
            "order",
        )
        .await
    }

    pub async fn create_draft_order(&self, draft: Value) -> Result<Value> {
        self.fetch(
            ApiRequest::post("/draft_orders.json").json_value(json!({ "draft_order": draft })),
            "draft_order",
        )
        .await
    }

    pub async fn create_transaction(&self, order_id: &str, transaction: Value) -> Result<Value> {
        self.fetch(
            ApiRequest::post(format!("/orders/{order_id}/transactions.json"))
                .json_value(json!({ "transaction": transaction })),
            "transaction",
        )
        .await
    }

    pub async fn get_transaction(&self, order_id: &str, id: &str) -> Result<Value> {
        self.fetch(
            ApiRequest::get(format!("/orders/{order_id}/transactions/{id}.json")),
            "transaction",
        )
        .await
    }

    pub async fn get_transactions(&self, order_id: &str) -> Result<Value> {
        self.fetch(
            ApiRequest::get(format!("/orders/{order_id}/transactions.json")),
            "transactions",
        )
        .await
    }

    pub async fn get_fulfillment(&self, order_id: &str, id: &str) -> Result<Value> {
        self.fetch(
            ApiRequest::get(format!("/orders/{order_id}/fulfillments/{id}.json")),
            "fulfillment",
        )
        .await
    }

    pub async fn get_fulfillments(&self, order_id: &str) -> Result<Value> {
        self.fetch(
            ApiRequest::get(format!("/orders/{order_id}/fulfillments.json")),
            "fulfillments",
        )
        .await
    }

    pub async fn create_fulfillment_event(
        &self,
        order_id: &str,
        fulfillment_id: &str,
        event: Value,
    ) -> Result<Value> {
        self.fetch(
            ApiRequest::post(format!(
                "/orders/{order_id}/fulfillments/{fulfillment_id}/events.json"
            ))
            .json_value(json!({ "event": event })),
            "fulfillment_event",
        )
        .await
    }

    pub async fn get_locations(&self) -> Result<Value> {
        self.fetch(ApiRequest::get("/locations.json"), "locations")
            .await
    }

    /// Returns the whole response body (`{"inventory_level": {...}}`).
    pub async fn adjust_inventory_level(
        &self,
        inventory_item_id: &str,
        location_id: &str,
        adjustment: i64,
    ) -> Result<Value> {
        let body = json!({
            "inventory_item_id": numeric_or_string(inventory_item_id),
            "location_id": numeric_or_string(location_id),
            "available_adjustment": adjustment,
        });
        self.http
            .send_json(ApiRequest::post("/inventory_levels/adjust.json").json_value(body))
            .await
    }

    pub async fn create_collect(&self, collect: Value) -> Result<Value> {
        self.fetch(
            ApiRequest::post("/collects.json").json_value(json!({ "collect": collect })),
            "collect",
        )
        .await
    }

    pub async fn get_asset(&self, theme_id: &str, key: &str) -> Result<Value> {
        self.fetch(
            ApiRequest::get(format!("/themes/{theme_id}/assets.json")).query("key", key),
            "asset",
        )
        .await
    }

    /// Subscribe `address` to a webhook topic; returns the new subscription id.
    pub async fn create_webhook(&self, topic: &str, address: &str) -> Result<Value> {
        let webhook = self
            .fetch(
                ApiRequest::post("/webhooks.json").json_value(json!({
                    "webhook": { "topic": topic, "address": address, "format": "json" }
                })),
                "webhook",
            )
            .await?;
        Ok(json!({ "id": webhook.get("id").cloned().unwrap_or(Value::Null) }))
    }

    pub async fn delete_webhook(&self, id: &str) -> Result<()> {
        self.http
            .send_empty(ApiRequest::delete(format!("/webhooks/{id}.json")))
            .await
    }
}

/// Shopify ids are numeric; keep them numeric in JSON bodies when they parse.
fn numeric_or_string(id: &str) -> Value {
    id.parse::<u64>().map(Value::from).unwrap_or_else(|_| json!(id))
}

/// Normalize an incoming webhook delivery; no network call is made.
pub fn process_webhook(payload: Value, topic: Option<String>) -> Value {
    json!({
        "topic": topic.unwrap_or_else(|| "unknown".to_string()),
        "data": payload,
    })
}

/// Dispatch one Shopify action.
pub async fn execute(input: Value, cfg: &Config) -> Result<Value> {
    let params = Params::from_value(input)?;
    let action: ShopifyAction = resolve(&params, CREDENTIALS)?;
    let client = ShopifyClient::new(&params.str("shopName")?, &params.str("adminToken")?, cfg)?
        .for_action(action);

    match action {
        ShopifyAction::GetCustomer => client.get_customer(&params.str("customerId")?).await,
        ShopifyAction::GetCustomers => client.list_all_customers().await.map(Value::Array),
        ShopifyAction::CreateCustomer => {
            client
                .create_customer(params.value("customerData")?)
                .await
        }
        ShopifyAction::UpdateCustomer => {
            client
                .update_customer(&params.str("customerId")?, params.value("customerData")?)
                .await
        }
        ShopifyAction::GetCustomerOrders => {
            client
                .get_customer_orders(&params.str("customerId")?)
                .await
        }
        ShopifyAction::GetProduct => client.get_product(&params.str("productId")?).await,
        ShopifyAction::GetProducts => {
            let search = ProductSearch {
                title: params.opt_str("productTitle")?,
                created_at_min: params.opt_str("createdAtMin")?,
                updated_at_min: params.opt_str("updatedAtMin")?,
            };
            client.list_all_products(&search).await.map(Value::Array)
        }
        ShopifyAction::CreateProduct => client.create_product(params.value("productData")?).await,
        ShopifyAction::UpdateProduct => {
            client
                .update_product(&params.str("productId")?, params.value("productData")?)
                .await
        }
        ShopifyAction::GetProductVariant => {
            client
                .get_product_variant(&params.str("variantId")?)
                .await
        }
        ShopifyAction::UploadProductImage => {
            let image = ProductImage::from_input(&params.str("productImage")?);
            client
                .upload_product_image(&params.str("productId")?, &image)
                .await
        }
        ShopifyAction::CreateOrder => client.create_order(params.value("orderData")?).await,
        ShopifyAction::UpdateOrder => {
            client
                .update_order(&params.str("orderId")?, params.value("orderData")?)
                .await
        }
        ShopifyAction::CloseOrder => client.close_order(&params.str("orderId")?).await,
        ShopifyAction::CancelOrder => client.cancel_order(&params.str("orderId")?).await,
        ShopifyAction::CreateDraftOrder => {
            client
                .create_draft_order(params.value("draftOrderData")?)
                .await
        }
        ShopifyAction::CreateTransaction => {
            client
                .create_transaction(&params.str("orderId")?, params.value("transactionData")?)
                .await
        }
        ShopifyAction::GetTransaction => {
            client
                .get_transaction(&params.str("orderId")?, &params.str("transactionId")?)
                .await
        }
        ShopifyAction::GetTransactions => client.get_transactions(&params.str("orderId")?).await,
        ShopifyAction::GetFulfillment => {
            client
                .get_fulfillment(&params.str("orderId")?, &params.str("fulfillmentId")?)
                .await
        }
        ShopifyAction::GetFulfillments => client.get_fulfillments(&params.str("orderId")?).await,
        ShopifyAction::CreateFulfillmentEvent => {
            client
                .create_fulfillment_event(
                    &params.str("orderId")?,
                    &params.str("fulfillmentId")?,
                    params.value("fulfillmentEventData")?,
                )
                .await
        }
        ShopifyAction::GetLocations => client.get_locations().await,
        ShopifyAction::AdjustInventoryLevel => {
            let adjustment = params.opt_i64("adjustment")?.unwrap_or_default();
            client
                .adjust_inventory_level(
                    &params.str("inventoryItemId")?,
                    &params.str("locationId")?,
                    adjustment,
                )
                .await
        }
        ShopifyAction::CreateCollect => client.create_collect(params.value("collectData")?).await,
        ShopifyAction::GetAsset => {
            client
                .get_asset(&params.str("themeId")?, &params.str("assetKey")?)
                .await
        }
        ShopifyAction::ProcessWebhook => Ok(process_webhook(
            params.value("webhookPayload")?,
            params.opt_str("webhookTopic")?,
        )),
    }
}

pub fn descriptor() -> Arc<PluginDescriptor> {
    static DESCRIPTOR: OnceLock<Arc<PluginDescriptor>> = OnceLock::new();
    DESCRIPTOR.get_or_init(build_descriptor).clone()
}

fn build_descriptor() -> Arc<PluginDescriptor> {
    use ShopifyAction as A;
    let order_actions = [
        A::UpdateOrder,
        A::CloseOrder,
        A::CancelOrder,
        A::CreateTransaction,
        A::GetTransaction,
        A::GetTransactions,
        A::GetFulfillment,
        A::GetFulfillments,
        A::CreateFulfillmentEvent,
    ]
    .map(A::name);

    let schema = super::mega_schema::<A>(vec![
        FieldSchema::string("shopName").description(
            "Your Shopify shop name (e.g., if your shop URL is example.myshopify.com, enter \"example\")",
        ),
        FieldSchema::string("adminToken").description("Admin API access token"),
    ])
    .field(FieldSchema::string("customerId").shown_for(&[
        A::GetCustomer.name(),
        A::UpdateCustomer.name(),
        A::GetCustomerOrders.name(),
    ]))
    .field(
        FieldSchema::object("customerData")
            .shown_for(&[A::CreateCustomer.name(), A::UpdateCustomer.name()]),
    )
    .field(FieldSchema::string("productId").shown_for(&[
        A::GetProduct.name(),
        A::UpdateProduct.name(),
        A::UploadProductImage.name(),
    ]))
    .field(
        FieldSchema::object("productData")
            .shown_for(&[A::CreateProduct.name(), A::UpdateProduct.name()]),
    )
    .field(
        FieldSchema::string("productTitle")
            .description("Filter products by title")
            .shown_for(&[A::GetProducts.name()]),
    )
    .field(FieldSchema::string("createdAtMin").shown_for(&[A::GetProducts.name()]))
    .field(FieldSchema::string("updatedAtMin").shown_for(&[A::GetProducts.name()]))
    .field(FieldSchema::string("variantId").shown_for(&[A::GetProductVariant.name()]))
    .field(
        FieldSchema::string("productImage")
            .description("Image URL or base64-encoded image data")
            .shown_for(&[A::UploadProductImage.name()]),
    )
    .field(FieldSchema::string("orderId").shown_for(&order_actions))
    .field(
        FieldSchema::object("orderData")
            .shown_for(&[A::CreateOrder.name(), A::UpdateOrder.name()]),
    )
    .field(FieldSchema::object("draftOrderData").shown_for(&[A::CreateDraftOrder.name()]))
    .field(FieldSchema::object("transactionData").shown_for(&[A::CreateTransaction.name()]))
    .field(FieldSchema::string("transactionId").shown_for(&[A::GetTransaction.name()]))
    .field(FieldSchema::string("fulfillmentId").shown_for(&[
        A::GetFulfillment.name(),
        A::CreateFulfillmentEvent.name(),
    ]))
    .field(
        FieldSchema::object("fulfillmentEventData")
            .shown_for(&[A::CreateFulfillmentEvent.name()]),
    )
    .field(FieldSchema::string("inventoryItemId").shown_for(&[A::AdjustInventoryLevel.name()]))
    .field(FieldSchema::string("locationId").shown_for(&[A::AdjustInventoryLevel.name()]))
    .field(
        FieldSchema::integer("adjustment")
            .description("Change in available quantity (may be negative)")
            .shown_for(&[A::AdjustInventoryLevel.name()]),
    )
    .field(FieldSchema::object("collectData").shown_for(&[A::CreateCollect.name()]))
    .field(FieldSchema::string("assetKey").shown_for(&[A::GetAsset.name()]))
    .field(FieldSchema::string("themeId").shown_for(&[A::GetAsset.name()]))
    .field(FieldSchema::object("webhookPayload").shown_for(&[A::ProcessWebhook.name()]))
    .field(
        FieldSchema::string("webhookTopic")
            .description("Webhook topic")
            .shown_for(&[A::ProcessWebhook.name()]),
    );

    PluginDescriptor::builder("shopify", "Shopify")
        .description("E-commerce platform for online stores")
        .tags(&["ecommerce", "store", "orders"])
        .documentation("https://shopify.dev/docs/api/admin-rest")
        .input_schema(schema.clone())
        .example(
            json!({
                "action": "get_products",
                "shopName": "your-shop",
                "adminToken": "shpat_xxx",
                "productTitle": "T-Shirt"
            }),
            json!([{ "id": 632910392, "title": "T-Shirt", "vendor": "Acme" }]),
        )
        .action(super::mega_action(
            "shopify",
            "Execute a Shopify action",
            schema,
            |input, cfg| async move { execute(input, &cfg).await },
        ))
        .build()
}
