use std::sync::Arc;

use actionkit::{providers, Config, Error, PluginRegistry};
use serde_json::{json, Value};

/// (plugin id, credentials that satisfy the plugin's base validation)
fn mega_plugins() -> Vec<(&'static str, Value)> {
    vec![
        ("calendly", json!({ "token": "t" })),
        ("figma", json!({ "token": "t" })),
        ("google-drive", json!({ "token": "t" })),
        (
            "jira-cloud",
            json!({ "instanceUrl": "https://x.atlassian.net", "email": "a@b.c", "apiToken": "t" }),
        ),
        ("microsoft-office", json!({ "token": "t" })),
        ("pinterest", json!({ "token": "t" })),
        (
            "salesforce",
            json!({ "access_token": "t", "instance_url": "https://x.my.salesforce.com" }),
        ),
        ("shopify", json!({ "shopName": "demo", "adminToken": "t" })),
        ("snapchat", json!({ "token": "t" })),
        ("stripe", json!({ "token": "t" })),
    ]
}

fn with_action(mut creds: Value, action: &str) -> Value {
    creds["action"] = json!(action);
    creds
}

#[tokio::test]
async fn every_mega_plugin_rejects_unknown_actions_before_any_request() {
    // Port 9 is discard; any request would fail with a transport error instead.
    let cfg = Config::default().with_base_url("http://127.0.0.1:9");
    let registry = PluginRegistry::with_builtin_plugins();

    for (id, creds) in mega_plugins() {
        let err = registry
            .execute(id, id, with_action(creds, "teleport"), &cfg)
            .await
            .unwrap_err();
        assert!(
            matches!(err, Error::UnsupportedAction(ref name) if name == "teleport"),
            "{id}: {err}"
        );
        assert_eq!(err.to_string(), "Unsupported action: teleport");
    }
}

#[tokio::test]
async fn missing_action_and_credentials_are_listed_together() {
    let registry = PluginRegistry::with_builtin_plugins();
    let cfg = Config::default();

    let err = registry
        .execute("stripe", "stripe", json!({}), &cfg)
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Missing required parameters: action, token");

    let err = registry
        .execute("jira-cloud", "jira-cloud", json!({ "email": "a@b.c" }), &cfg)
        .await
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "Missing required parameters: action, instanceUrl, apiToken"
    );
}

#[tokio::test]
async fn jira_create_issue_names_every_missing_field() {
    let input = json!({
        "action": "create_issue",
        "instanceUrl": "https://x.atlassian.net",
        "email": "a@b.c",
        "apiToken": "t",
        "summary": "   ",
    });
    let err = providers::jira::execute(input, &Config::default())
        .await
        .unwrap_err();
    match &err {
        Error::MissingParameters(missing) => {
            assert_eq!(missing.names, vec!["projectId", "issueTypeId", "summary"]);
        }
        other => panic!("unexpected error {other:?}"),
    }
    assert_eq!(
        err.to_string(),
        "Missing required parameters: projectId, issueTypeId, summary"
    );
}

#[tokio::test]
async fn single_missing_parameter_uses_singular_wording() {
    let input = json!({ "action": "get_customer", "token": "t", "customerId": null });
    let err = providers::stripe::execute(input, &Config::default())
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Missing required parameter: customerId");
}

#[tokio::test]
async fn figma_treats_empty_id_list_as_missing() {
    let input = json!({ "action": "get_file_images", "token": "t", "fileKey": "k", "ids": [] });
    let err = providers::figma::execute(input, &Config::default())
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Missing required parameter: ids");
}

#[tokio::test]
async fn non_object_input_is_a_validation_error() {
    let err = providers::calendly::execute(json!(["action"]), &Config::default())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Validation(_)), "{err:?}");
}

#[test]
fn descriptors_are_built_once() {
    for plugin in providers::all() {
        let again = PluginRegistry::with_builtin_plugins()
            .get(plugin.id)
            .unwrap();
        assert!(Arc::ptr_eq(&plugin, &again), "{} rebuilt", plugin.id);
        assert!(std::ptr::eq(plugin.actions(), again.actions()));
    }
}

#[test]
fn mega_plugins_expose_one_action_named_after_the_plugin() {
    let registry = PluginRegistry::with_builtin_plugins();
    for (id, _) in mega_plugins() {
        let plugin = registry.get(id).unwrap();
        let names: Vec<_> = plugin.actions().iter().map(|a| a.name).collect();
        assert_eq!(names, vec![id]);

        let schema = plugin.actions()[0].input_schema.to_json();
        assert_eq!(schema["required"][0], "action");
        assert!(
            schema["properties"]["action"]["enum"]
                .as_array()
                .is_some_and(|names| !names.is_empty()),
            "{id} has no action enum"
        );
    }
}

#[test]
fn basecamp_exposes_one_descriptor_per_operation() {
    let plugin = providers::basecamp::descriptor();
    let names: Vec<_> = plugin.actions().iter().map(|a| a.name).collect();
    assert!(names.contains(&"create_todo"));
    assert!(names.contains(&"delete_webhook"));
    assert!(plugin.action("basecamp").is_none());
}

#[test]
fn manifests_serialize_for_hosts() {
    let registry = PluginRegistry::with_builtin_plugins();
    let manifests = registry.manifests();
    assert_eq!(manifests.len(), registry.len());

    let stripe = manifests.iter().find(|m| m.id == "stripe").unwrap();
    let stripe = serde_json::to_value(stripe).unwrap();
    assert_eq!(stripe["id"], "stripe");
    assert_eq!(stripe["actions"][0]["name"], "stripe");
}
