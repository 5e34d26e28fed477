//! Action dispatch and HTTP adapters for third-party SaaS integrations.
//!
//! Every bundled plugin takes a JSON object `{ "action": ..., ...params }`,
//! validates it, performs exactly one logical remote operation and returns
//! JSON. Plugins are described by cached [`PluginDescriptor`]s and can be
//! collected into a caller-owned [`PluginRegistry`].
#![cfg_attr(docsrs, feature(doc_cfg))]
// Allow large error types - the Context variant boxes its source already
#![allow(clippy::result_large_err)]

/// Default User-Agent header value.
pub(crate) const DEFAULT_CLIENT_HEADER: &str = concat!("actionkit-rust/", env!("CARGO_PKG_VERSION"));

/// Default connection timeout (5 seconds).
pub const DEFAULT_CONNECT_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(5);

/// Default request timeout (60 seconds).
pub const DEFAULT_REQUEST_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(60);

mod client;
pub mod descriptor;
pub mod dispatch;
mod errors;
mod http;
pub mod pagination;
pub mod params;
pub mod providers;
mod registry;
pub mod schema;
mod telemetry;
pub mod testing;

pub use client::{unwrap_field, Config, RestClient, WithHeaders};
pub use descriptor::{
    handler, ActionDescriptor, ActionHandler, ActionManifest, BoxFuture, PluginDescriptor,
    PluginDescriptorBuilder, PluginManifest,
};
pub use dispatch::{ActionKind, RequiredParam, ACTION_KEY};
pub use errors::{
    Error, MissingParameters, ProviderError, Result, ResultExt, TransportError, TransportErrorKind,
    ValidationError,
};
pub use http::{
    ApiProfile, ApiRequest, Auth, Body, HeaderEntry, HeaderList, MultipartPart,
    DEFAULT_ERROR_POINTERS,
};
pub use pagination::Page;
pub use params::{Params, Presence};
pub use registry::PluginRegistry;
pub use schema::{FieldSchema, FieldType, InputSchema, VisibilityRule};
pub use telemetry::{HttpRequestMetrics, MetricsCallbacks, RequestContext};
