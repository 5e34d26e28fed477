//! Stripe payments: customers, payment intents, subscriptions, products, prices.

use std::sync::{Arc, OnceLock};

use serde_json::{json, Map, Value};

use crate::{
    client::{Config, RestClient},
    descriptor::PluginDescriptor,
    dispatch::{req, resolve, ActionKind, RequiredParam},
    errors::Result,
    http::{ApiProfile, ApiRequest, Auth},
    pagination::{take_items, Page},
    params::Params,
    schema::FieldSchema,
};

pub const PROFILE: ApiProfile = ApiProfile {
    label: "Stripe",
    base_url: "https://api.stripe.com/v1",
    error_pointers: &["/error/message", "/message"],
};

const CREDENTIALS: &[RequiredParam] = &[req("token")];
const DEFAULT_LIST_LIMIT: u64 = 10;

crate::actions! {
    pub enum StripeAction {
        CreateCustomer = "create_customer" => [],
        CreatePaymentIntent = "create_payment_intent" => [req("amount"), req("currency")],
        CreateSubscription = "create_subscription" => [req("customer"), req("price")],
        CreateProduct = "create_product" => [req("name")],
        CreatePrice = "create_price" => [req("product"), req("unit_amount"), req("currency")],
        GetCustomer = "get_customer" => [req("customerId")],
        GetPaymentIntent = "get_payment_intent" => [req("paymentIntentId")],
        GetSubscription = "get_subscription" => [req("subscriptionId")],
        GetProduct = "get_product" => [req("productId")],
        GetPrice = "get_price" => [req("priceId")],
        ListCustomers = "list_customers" => [],
        ListPaymentIntents = "list_payment_intents" => [],
        ListSubscriptions = "list_subscriptions" => [],
        ListProducts = "list_products" => [],
        ListPrices = "list_prices" => [],
    }
}

/// Optional list filters shared by the `list_*` endpoints.
#[derive(Clone, Debug, Default)]
pub struct ListFilter {
    pub limit: Option<u64>,
    pub email: Option<String>,
    pub customer: Option<String>,
    pub product: Option<String>,
    pub status: Option<String>,
    pub active: Option<bool>,
    /// Cursor from a previous [`Page`]: the id of its last object.
    pub starting_after: Option<String>,
}

impl ListFilter {
    fn apply(&self, req: ApiRequest) -> ApiRequest {
        req.query("limit", self.limit.unwrap_or(DEFAULT_LIST_LIMIT))
            .query_opt("email", self.email.as_deref())
            .query_opt("customer", self.customer.as_deref())
            .query_opt("product", self.product.as_deref())
            .query_opt(
                "status",
                self.status.as_deref().filter(|status| *status != "all"),
            )
            .query_opt("active", self.active)
            .query_opt("starting_after", self.starting_after.as_deref())
    }
}

#[derive(Clone)]
pub struct StripeClient {
    http: RestClient,
}

impl StripeClient {
    pub fn new(token: &str, cfg: &Config) -> Result<Self> {
        Ok(Self {
            http: RestClient::new(PROFILE, Auth::bearer(token), cfg)?,
        })
    }

    fn for_action(mut self, action: StripeAction) -> Self {
        self.http = self.http.for_action(action.name());
        self
    }

    async fn create(&self, path: &str, body: &Map<String, Value>) -> Result<Value> {
        self.http
            .send_json(ApiRequest::post(path).form(form_pairs(body)))
            .await
    }

    /// One list page. The cursor is the last object's id while `has_more` holds.
    async fn list(&self, path: &str, filter: &ListFilter) -> Result<Page<Value>> {
        let mut body: Value = self
            .http
            .send_json(filter.apply(ApiRequest::get(path)))
            .await?;
        let has_more = body["has_more"].as_bool().unwrap_or(false);
        let items: Vec<Value> = take_items(&mut body, "data")?;
        let next = items
            .last()
            .filter(|_| has_more)
            .and_then(|last| last["id"].as_str())
            .map(str::to_string);
        Ok(Page::new(items, next))
    }

    pub async fn create_customer(&self, fields: &Map<String, Value>) -> Result<Value> {
        self.create("/customers", fields).await
    }

    pub async fn create_payment_intent(&self, fields: &Map<String, Value>) -> Result<Value> {
        self.create("/payment_intents", fields).await
    }

    /// Subscribe a customer to one price (`quantity` defaults to 1).
    pub async fn create_subscription(
        &self,
        customer: &str,
        price: &str,
        quantity: Option<u64>,
        metadata: Option<Value>,
    ) -> Result<Value> {
        let mut body = Map::new();
        body.insert("customer".into(), json!(customer));
        body.insert(
            "items".into(),
            json!([{ "price": price, "quantity": quantity.unwrap_or(1) }]),
        );
        if let Some(metadata) = metadata {
            body.insert("metadata".into(), metadata);
        }
        self.create("/subscriptions", &body).await
    }

    pub async fn create_product(&self, fields: &Map<String, Value>) -> Result<Value> {
        self.create("/products", fields).await
    }

    /// Create a price; `recurring.interval_count` defaults to 1 when an interval is given.
    pub async fn create_price(&self, fields: &Map<String, Value>) -> Result<Value> {
        let mut body = fields.clone();
        if let Some(Value::Object(recurring)) = body.get_mut("recurring") {
            if recurring.contains_key("interval") && !recurring.contains_key("interval_count") {
                recurring.insert("interval_count".into(), json!(1));
            }
        }
        self.create("/prices", &body).await
    }

    pub async fn get_customer(&self, id: &str) -> Result<Value> {
        self.http
            .send_json(ApiRequest::get(format!("/customers/{id}")))
            .await
    }

    pub async fn get_payment_intent(&self, id: &str) -> Result<Value> {
        self.http
            .send_json(ApiRequest::get(format!("/payment_intents/{id}")))
            .await
    }

    pub async fn get_subscription(&self, id: &str) -> Result<Value> {
        self.http
            .send_json(ApiRequest::get(format!("/subscriptions/{id}")))
            .await
    }

    pub async fn get_product(&self, id: &str) -> Result<Value> {
        self.http
            .send_json(ApiRequest::get(format!("/products/{id}")))
            .await
    }

    pub async fn get_price(&self, id: &str) -> Result<Value> {
        self.http
            .send_json(ApiRequest::get(format!("/prices/{id}")))
            .await
    }

    pub async fn list_customers_page(&self, filter: &ListFilter) -> Result<Page<Value>> {
        self.list("/customers", filter).await
    }

    pub async fn list_payment_intents_page(&self, filter: &ListFilter) -> Result<Page<Value>> {
        self.list("/payment_intents", filter).await
    }

    pub async fn list_subscriptions_page(&self, filter: &ListFilter) -> Result<Page<Value>> {
        self.list("/subscriptions", filter).await
    }

    pub async fn list_products_page(&self, filter: &ListFilter) -> Result<Page<Value>> {
        self.list("/products", filter).await
    }

    pub async fn list_prices_page(&self, filter: &ListFilter) -> Result<Page<Value>> {
        self.list("/prices", filter).await
    }
}

/// Flatten a JSON object into Stripe's bracketed form encoding
/// (`metadata[order]=1`, `items[0][price]=price_1`).
pub fn form_pairs(body: &Map<String, Value>) -> Vec<(String, String)> {
    let mut out = Vec::new();
    for (key, value) in body {
        push_form(key.clone(), value, &mut out);
    }
    out
}

fn push_form(key: String, value: &Value, out: &mut Vec<(String, String)>) {
    match value {
        Value::Null => {}
        Value::String(s) => out.push((key, s.clone())),
        Value::Bool(b) => out.push((key, b.to_string())),
        Value::Number(n) => out.push((key, n.to_string())),
        Value::Array(items) => {
            for (i, item) in items.iter().enumerate() {
                push_form(format!("{key}[{i}]"), item, out);
            }
        }
        Value::Object(map) => {
            for (k, v) in map {
                push_form(format!("{key}[{k}]"), v, out);
            }
        }
    }
}

fn pick(params: &Params, keys: &[&str]) -> Map<String, Value> {
    keys.iter()
        .filter_map(|k| params.opt_value(k).map(|v| (k.to_string(), v)))
        .collect()
}

fn list_filter(params: &Params) -> Result<ListFilter> {
    Ok(ListFilter {
        limit: params.opt_u64("limit")?,
        email: params.opt_str("email")?,
        customer: params.opt_str("customer")?,
        product: params.opt_str("product")?,
        status: params.opt_str("status")?,
        active: params.opt_bool("active")?,
        starting_after: params.opt_str("startingAfter")?,
    })
}

/// Dispatch one Stripe action.
pub async fn execute(input: Value, cfg: &Config) -> Result<Value> {
    let params = Params::from_value(input)?;
    let action: StripeAction = resolve(&params, CREDENTIALS)?;
    let client = StripeClient::new(&params.str("token")?, cfg)?.for_action(action);
    let filter = list_filter(&params)?;

    match action {
        StripeAction::CreateCustomer => {
            let fields = pick(
                &params,
                &["email", "name", "description", "phone", "address", "metadata"],
            );
            client.create_customer(&fields).await
        }
        StripeAction::CreatePaymentIntent => {
            let fields = pick(
                &params,
                &[
                    "amount",
                    "currency",
                    "description",
                    "customer",
                    "payment_method",
                    "receipt_email",
                    "metadata",
                ],
            );
            client.create_payment_intent(&fields).await
        }
        StripeAction::CreateSubscription => {
            client
                .create_subscription(
                    &params.str("customer")?,
                    &params.str("price")?,
                    params.opt_u64("quantity")?,
                    params.opt_value("metadata"),
                )
                .await
        }
        StripeAction::CreateProduct => {
            let fields = pick(&params, &["name", "description", "active", "metadata"]);
            client.create_product(&fields).await
        }
        StripeAction::CreatePrice => {
            let fields = pick(
                &params,
                &[
                    "product",
                    "unit_amount",
                    "currency",
                    "recurring",
                    "active",
                    "metadata",
                ],
            );
            client.create_price(&fields).await
        }
        StripeAction::GetCustomer => client.get_customer(&params.str("customerId")?).await,
        StripeAction::GetPaymentIntent => {
            client
                .get_payment_intent(&params.str("paymentIntentId")?)
                .await
        }
        StripeAction::GetSubscription => {
            client.get_subscription(&params.str("subscriptionId")?).await
        }
        StripeAction::GetProduct => client.get_product(&params.str("productId")?).await,
        StripeAction::GetPrice => client.get_price(&params.str("priceId")?).await,
        StripeAction::ListCustomers => {
            Ok(Value::Array(client.list_customers_page(&filter).await?.items))
        }
        StripeAction::ListPaymentIntents => {
            Ok(Value::Array(client.list_payment_intents_page(&filter).await?.items))
        }
        StripeAction::ListSubscriptions => {
            Ok(Value::Array(client.list_subscriptions_page(&filter).await?.items))
        }
        StripeAction::ListProducts => {
            Ok(Value::Array(client.list_products_page(&filter).await?.items))
        }
        StripeAction::ListPrices => Ok(Value::Array(client.list_prices_page(&filter).await?.items)),
    }
}

pub fn descriptor() -> Arc<PluginDescriptor> {
    static DESCRIPTOR: OnceLock<Arc<PluginDescriptor>> = OnceLock::new();
    DESCRIPTOR.get_or_init(build_descriptor).clone()
}

fn build_descriptor() -> Arc<PluginDescriptor> {
    use StripeAction as A;
    let n = |a: A| crate::dispatch::ActionKind::name(a);

    let schema = super::mega_schema::<A>(vec![
        FieldSchema::string("token").description("Stripe API secret key")
    ])
    .field(
        FieldSchema::string("email")
            .description("Customer email address")
            .shown_for(&[n(A::CreateCustomer), n(A::ListCustomers)]),
    )
    .field(
        FieldSchema::string("name")
            .description("Customer or product name")
            .shown_for(&[n(A::CreateCustomer), n(A::CreateProduct)]),
    )
    .field(
        FieldSchema::string("description")
            .description("Description for customer or product")
            .shown_for(&[
                n(A::CreateCustomer),
                n(A::CreatePaymentIntent),
                n(A::CreateProduct),
            ]),
    )
    .field(
        FieldSchema::string("phone")
            .description("Customer phone number")
            .shown_for(&[n(A::CreateCustomer)]),
    )
    .field(
        FieldSchema::object("address")
            .description("Customer address")
            .shown_for(&[n(A::CreateCustomer)]),
    )
    .field(
        FieldSchema::number("amount")
            .description("Amount in cents (e.g., 1000 = $10.00)")
            .shown_for(&[n(A::CreatePaymentIntent)]),
    )
    .field(
        FieldSchema::string("currency")
            .description("Three-letter ISO currency code (e.g., usd, eur)")
            .shown_for(&[n(A::CreatePaymentIntent), n(A::CreatePrice)]),
    )
    .field(
        FieldSchema::string("customer")
            .description("Customer ID")
            .shown_for(&[
                n(A::CreatePaymentIntent),
                n(A::CreateSubscription),
                n(A::ListPaymentIntents),
                n(A::ListSubscriptions),
            ]),
    )
    .field(
        FieldSchema::string("price")
            .description("Price ID for the subscription item")
            .shown_for(&[n(A::CreateSubscription)]),
    )
    .field(
        FieldSchema::integer("quantity")
            .description("Quantity for the subscription item")
            .default_value(json!(1))
            .shown_for(&[n(A::CreateSubscription)]),
    )
    .field(
        FieldSchema::string("product")
            .description("Product ID")
            .shown_for(&[n(A::CreatePrice), n(A::ListPrices)]),
    )
    .field(
        FieldSchema::integer("unit_amount")
            .description("Price in the smallest currency unit")
            .shown_for(&[n(A::CreatePrice)]),
    )
    .field(
        FieldSchema::object("recurring")
            .description("Recurring interval, e.g. {\"interval\": \"month\"}")
            .shown_for(&[n(A::CreatePrice)]),
    )
    .field(
        FieldSchema::boolean("active")
            .description("Whether the product or price is active")
            .shown_for(&[
                n(A::CreateProduct),
                n(A::CreatePrice),
                n(A::ListProducts),
                n(A::ListPrices),
            ]),
    )
    .field(FieldSchema::string("customerId").shown_for(&[n(A::GetCustomer)]))
    .field(FieldSchema::string("paymentIntentId").shown_for(&[n(A::GetPaymentIntent)]))
    .field(FieldSchema::string("subscriptionId").shown_for(&[n(A::GetSubscription)]))
    .field(FieldSchema::string("productId").shown_for(&[n(A::GetProduct)]))
    .field(FieldSchema::string("priceId").shown_for(&[n(A::GetPrice)]))
    .field(
        FieldSchema::string("status")
            .description("Subscription status filter")
            .enumerated(&["active", "past_due", "unpaid", "canceled", "incomplete", "trialing", "all"])
            .shown_for(&[n(A::ListSubscriptions)]),
    )
    .field(
        FieldSchema::integer("limit")
            .description("Maximum number of objects to return")
            .default_value(json!(DEFAULT_LIST_LIMIT))
            .shown_for(&[
                n(A::ListCustomers),
                n(A::ListPaymentIntents),
                n(A::ListSubscriptions),
                n(A::ListProducts),
                n(A::ListPrices),
            ]),
    )
    .field(
        FieldSchema::string("startingAfter")
            .description("Object id to continue listing after")
            .shown_for(&[
                n(A::ListCustomers),
                n(A::ListPaymentIntents),
                n(A::ListSubscriptions),
                n(A::ListProducts),
                n(A::ListPrices),
            ]),
    )
    .field(
        FieldSchema::object("metadata")
            .description("Set of key-value pairs for storing additional information")
            .shown_for(&[
                n(A::CreateCustomer),
                n(A::CreatePaymentIntent),
                n(A::CreateSubscription),
                n(A::CreateProduct),
                n(A::CreatePrice),
            ]),
    );

    PluginDescriptor::builder("stripe", "Stripe")
        .description("Payment processing platform for online businesses")
        .tags(&["payment", "finance", "billing"])
        .documentation("https://stripe.com/docs/api")
        .input_schema(schema.clone())
        .example(
            json!({
                "action": "create_payment_intent",
                "token": "sk_test_your_stripe_secret_key",
                "amount": 1000,
                "currency": "usd",
                "description": "Payment for order #1234"
            }),
            json!({
                "id": "pi_1234567890",
                "amount": 1000,
                "currency": "usd",
                "status": "requires_payment_method"
            }),
        )
        .action(super::mega_action(
            "stripe",
            "Execute a Stripe action",
            schema,
            |input, cfg| async move { execute(input, &cfg).await },
        ))
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn form_pairs_use_bracket_notation() {
        let body = json!({
            "customer": "cus_1",
            "items": [{"price": "price_1", "quantity": 2}],
            "metadata": {"order": "42"},
            "skip": null
        });
        let pairs = form_pairs(body.as_object().unwrap());
        assert_eq!(
            pairs,
            vec![
                ("customer".to_string(), "cus_1".to_string()),
                ("items[0][price]".to_string(), "price_1".to_string()),
                ("items[0][quantity]".to_string(), "2".to_string()),
                ("metadata[order]".to_string(), "42".to_string()),
            ]
        );
    }

    #[test]
    fn list_filter_omits_status_all() {
        let filter = ListFilter {
            status: Some("all".into()),
            ..Default::default()
        };
        let req = filter.apply(ApiRequest::get("/subscriptions"));
        assert_eq!(req.query, vec![("limit".to_string(), "10".to_string())]);
    }

    #[test]
    fn list_filter_sends_cursor() {
        let filter = ListFilter {
            limit: Some(2),
            starting_after: Some("cus_2".into()),
            ..Default::default()
        };
        let req = filter.apply(ApiRequest::get("/customers"));
        assert_eq!(
            req.query,
            vec![
                ("limit".to_string(), "2".to_string()),
                ("starting_after".to_string(), "cus_2".to_string()),
            ]
        );
    }
}
