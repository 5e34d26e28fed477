//! Pagination helpers.
//!
//! Single-page adapters return a [`Page`] and leave the cursor to the caller.
//! Adapters named `list_all_*` drain every page before returning.

use reqwest::header::{HeaderMap, LINK};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;

use crate::errors::{Error, Result};

/// One page of results plus the opaque cursor for the next one.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_page_token: Option<String>,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, next_page_token: Option<String>) -> Self {
        Self {
            items,
            next_page_token: next_page_token.filter(|t| !t.is_empty()),
        }
    }

    pub fn has_more(&self) -> bool {
        self.next_page_token.is_some()
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            next_page_token: self.next_page_token,
        }
    }
}

impl<T: DeserializeOwned> Page<T> {
    /// Split a list response into the array under `field` and the string
    /// cursor at the JSON pointer `cursor`.
    pub fn from_body(mut body: Value, field: &str, cursor: &str) -> Result<Self> {
        let token = body
            .pointer(cursor)
            .and_then(Value::as_str)
            .map(str::to_string);
        let items = take_items(&mut body, field)?;
        Ok(Self::new(items, token))
    }
}

/// Move the array under `field` out of a list response.
pub fn take_items<T: DeserializeOwned>(body: &mut Value, field: &str) -> Result<Vec<T>> {
    match body.get_mut(field).map(Value::take) {
        Some(items @ Value::Array(_)) => Ok(serde_json::from_value(items)?),
        _ => Err(Error::validation(format!(
            "response is missing the `{field}` array"
        ))),
    }
}

/// URL of the `rel="next"` entry in an RFC 8288 `Link` header.
pub fn next_link(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(LINK)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .find_map(|entry| {
            let mut parts = entry.split(';');
            let target = parts.next()?.trim();
            let is_next = parts.any(|p| {
                let p = p.trim();
                p == "rel=\"next\"" || p == "rel=next"
            });
            if !is_next {
                return None;
            }
            let url = target.strip_prefix('<')?.strip_suffix('>')?;
            Some(url.to_string())
        })
}

/// Value of one query parameter in a URL (e.g. Shopify's `page_info`).
pub fn query_param(url: &str, name: &str) -> Option<String> {
    let parsed = url::Url::parse(url).ok()?;
    parsed
        .query_pairs()
        .find(|(k, _)| k == name)
        .map(|(_, v)| v.into_owned())
}
