//! Bundled provider plugins.
//!
//! Each module pairs a `…Client` adapter (one method per remote endpoint)
//! with an action enum, an `execute` dispatcher and a cached descriptor.

use std::sync::Arc;

use serde_json::{json, Value};

use crate::{
    descriptor::{handler, ActionDescriptor, PluginDescriptor},
    dispatch::{ActionKind, ACTION_KEY},
    schema::{FieldSchema, InputSchema},
};

pub mod basecamp;
pub mod calendly;
pub mod figma;
pub mod google_drive;
pub mod jira;
pub mod microsoft;
pub mod pinterest;
pub mod salesforce;
pub mod shopify;
pub mod snapchat;
pub mod stripe;

/// Every bundled plugin descriptor.
pub fn all() -> Vec<Arc<PluginDescriptor>> {
    vec![
        basecamp::descriptor(),
        calendly::descriptor(),
        figma::descriptor(),
        google_drive::descriptor(),
        jira::descriptor(),
        microsoft::descriptor(),
        pinterest::descriptor(),
        salesforce::descriptor(),
        shopify::descriptor(),
        snapchat::descriptor(),
        stripe::descriptor(),
    ]
}

/// `{success: true, message}` body returned by void endpoints.
pub(crate) fn success(message: impl Into<String>) -> Value {
    json!({ "success": true, "message": message.into() })
}

/// Required `action` enum field for a mega-plugin schema.
pub(crate) fn action_field<A: ActionKind>() -> FieldSchema {
    FieldSchema::string(ACTION_KEY)
        .title("Action")
        .description("The operation to perform")
        .enumerated(&A::names())
}

/// Base schema for a mega-plugin: the action selector plus credentials.
pub(crate) fn mega_schema<A: ActionKind>(credentials: Vec<FieldSchema>) -> InputSchema {
    credentials
        .into_iter()
        .fold(
            InputSchema::new().required_field(action_field::<A>()),
            InputSchema::required_field,
        )
}

/// The single dispatching action a mega-plugin exposes, named after the plugin.
pub(crate) fn mega_action<F, Fut>(
    id: &'static str,
    description: &'static str,
    schema: InputSchema,
    run: F,
) -> ActionDescriptor
where
    F: Fn(Value, crate::Config) -> Fut + Send + Sync + 'static,
    Fut: std::future::Future<Output = crate::Result<Value>> + Send + 'static,
{
    ActionDescriptor::new(id, description, schema, handler(run))
}
