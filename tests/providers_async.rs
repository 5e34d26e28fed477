use actionkit::providers::{calendly, figma, google_drive, microsoft, pinterest, snapchat};
use actionkit::testing::{recording_config, test_config};
use actionkit::{Error, PluginRegistry};
use serde_json::{json, Value};
use wiremock::matchers::{
    body_json, body_string_contains, header, method, path, query_param, query_param_is_missing,
};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn mount_calendly_user(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/users/me"))
        .and(header("authorization", "Bearer cal-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "resource": {
                "uri": "https://api.calendly.com/users/U1",
                "current_organization": "https://api.calendly.com/organizations/O1",
                "name": "Ada"
            }
        })))
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn calendly_list_events_scopes_to_current_user() {
    let server = MockServer::start().await;
    mount_calendly_user(&server).await;
    Mock::given(method("GET"))
        .and(path("/event_types"))
        .and(query_param("user", "https://api.calendly.com/users/U1"))
        .and(query_param("count", "5"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "collection": [{ "uri": "https://api.calendly.com/event_types/ET1" }],
            "pagination": { "count": 1, "next_page_token": "tok-2" }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let out = calendly::execute(
        json!({ "action": "list_events", "token": "cal-token", "count": 5 }),
        &test_config(&server.uri()),
    )
    .await
    .unwrap();
    assert_eq!(out["collection"][0]["uri"], "https://api.calendly.com/event_types/ET1");
    assert_eq!(out["pagination"]["next_page_token"], "tok-2");
}

#[tokio::test]
async fn calendly_organization_webhooks_use_organization_owner() {
    let server = MockServer::start().await;
    mount_calendly_user(&server).await;
    Mock::given(method("POST"))
        .and(path("/webhook_subscriptions"))
        .and(body_json(json!({
            "url": "https://hooks.example.com/calendly",
            "events": ["invitee.created", "invitee.canceled"],
            "scope": "organization",
            "organization": "https://api.calendly.com/organizations/O1"
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "resource": { "uri": "https://api.calendly.com/webhook_subscriptions/W1", "state": "active" }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let out = calendly::execute(
        json!({
            "action": "create_webhook",
            "token": "cal-token",
            "url": "https://hooks.example.com/calendly",
            "events": ["invitee.created", "invitee.canceled"],
            "scope": "organization",
            "organization": true,
        }),
        &test_config(&server.uri()),
    )
    .await
    .unwrap();
    assert_eq!(out["state"], "active");
}

#[tokio::test]
async fn calendly_cancel_accepts_full_invitee_uri() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/invitees/INV1/cancellation"))
        .and(body_json(json!({ "reason": "Double booked" })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "resource": {} })))
        .expect(1)
        .mount(&server)
        .await;

    let out = calendly::execute(
        json!({
            "action": "cancel_invitee",
            "token": "cal-token",
            "inviteeUuid": "https://api.calendly.com/invitees/INV1",
            "reason": "Double booked",
        }),
        &test_config(&server.uri()),
    )
    .await
    .unwrap();
    assert_eq!(
        out,
        json!({ "success": true, "message": "Invitee canceled successfully" })
    );
}

#[tokio::test]
async fn figma_images_join_node_ids() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/images/FILE1"))
        .and(query_param("ids", "1:2,3:4"))
        .and(query_param("format", "svg"))
        .and(query_param_is_missing("scale"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "err": null,
            "images": { "1:2": "https://s3/1.svg", "3:4": "https://s3/2.svg" }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let out = figma::execute(
        json!({
            "action": "get_file_images",
            "token": "fig",
            "fileKey": "FILE1",
            "ids": ["1:2", "3:4"],
            "format": "svg",
        }),
        &test_config(&server.uri()),
    )
    .await
    .unwrap();
    assert_eq!(out["images"]["3:4"], "https://s3/2.svg");
}

#[tokio::test]
async fn figma_webhook_gets_generated_passcode() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v2/webhooks"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "WH1" })))
        .expect(1)
        .mount(&server)
        .await;

    let out = figma::execute(
        json!({
            "action": "create_webhook",
            "token": "fig",
            "teamId": "T1",
            "eventType": "FILE_UPDATE",
            "endpoint": "https://hooks.example.com/figma",
        }),
        &test_config(&server.uri()),
    )
    .await
    .unwrap();
    assert_eq!(out["id"], "WH1");

    let requests = server.received_requests().await.unwrap();
    let body: Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(body["team_id"], "T1");
    assert_eq!(body["event_type"], "FILE_UPDATE");
    assert!(body["passcode"]
        .as_str()
        .is_some_and(|p| p.starts_with("figma_passcode_") && p.len() > "figma_passcode_".len()));
}

#[tokio::test]
async fn pinterest_create_pin_references_image_url() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/pins"))
        .and(body_json(json!({
            "board_id": "B1",
            "title": "Lamp",
            "media_source": { "source_type": "image_url", "url": "https://img.example.com/lamp.jpg" },
            "link": "https://shop.example.com/lamp"
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "id": "P1" })))
        .expect(1)
        .mount(&server)
        .await;

    let out = pinterest::execute(
        json!({
            "action": "create_pin",
            "token": "pin",
            "boardId": "B1",
            "title": "Lamp",
            "imageUrl": "https://img.example.com/lamp.jpg",
            "link": "https://shop.example.com/lamp",
        }),
        &test_config(&server.uri()),
    )
    .await
    .unwrap();
    assert_eq!(out["id"], "P1");
}

#[tokio::test]
async fn pinterest_search_returns_items() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search/pins"))
        .and(query_param("query", "desk lamp"))
        .and(query_param("page_size", "25"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [{ "id": "P1" }, { "id": "P2" }],
            "bookmark": "next"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let out = pinterest::execute(
        json!({ "action": "search_pins", "token": "pin", "query": "desk lamp" }),
        &test_config(&server.uri()),
    )
    .await
    .unwrap();
    assert_eq!(out, json!([{ "id": "P1" }, { "id": "P2" }]));
}

#[tokio::test]
async fn snapchat_ads_are_flattened_with_zeroed_stats() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/adaccounts/A1/ads"))
        .and(query_param("limit", "50"))
        .and(query_param("campaign_id", "C1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "request_status": "SUCCESS",
            "ads": [
                { "id": "ad1", "name": "Spring", "status": "ACTIVE", "stats": { "impressions": 120 } },
                { "id": "ad2", "name": "Summer", "status": "PAUSED" }
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let out = snapchat::execute(
        json!({ "action": "get_ads", "token": "snap", "adAccountId": "A1", "campaignId": "C1" }),
        &test_config(&server.uri()),
    )
    .await
    .unwrap();
    assert_eq!(
        out[0],
        json!({
            "id": "ad1",
            "name": "Spring",
            "status": "ACTIVE",
            "impressions": 120,
            "swipes": 0,
            "spends": 0
        })
    );
    assert_eq!(out[1]["impressions"], 0);
}

#[tokio::test]
async fn snapchat_web_view_creative_sends_its_url_only() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/adaccounts/A1/creatives"))
        .and(body_json(json!({
            "name": "Launch",
            "type": "WEB_VIEW",
            "brand_name": "Acme",
            "headline": "New",
            "top_snap_media_id": "M1",
            "web_view_url": "https://acme.example.com"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "creative": {
                "id": "CR1",
                "name": "Launch",
                "type": "WEB_VIEW",
                "brand_name": "Acme",
                "web_view_url": "https://acme.example.com"
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let out = snapchat::execute(
        json!({
            "action": "create_creative",
            "token": "snap",
            "adAccountId": "A1",
            "name": "Launch",
            "type": "WEB_VIEW",
            "brandName": "Acme",
            "headline": "New",
            "topSnapMediaId": "M1",
            "webViewUrl": "https://acme.example.com",
            "appInstallUrl": "https://apps.example.com/acme",
        }),
        &test_config(&server.uri()),
    )
    .await
    .unwrap();
    assert_eq!(out["brandName"], "Acme");
    assert_eq!(out["webViewUrl"], "https://acme.example.com");
}

#[tokio::test]
async fn microsoft_events_are_flattened() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/me/calendar/events"))
        .and(query_param("startDateTime", "2024-01-01T00:00:00Z"))
        .and(query_param("endDateTime", "2024-01-31T00:00:00Z"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "value": [{
                "id": "E1",
                "subject": "Standup",
                "start": { "dateTime": "2024-01-02T09:00:00", "timeZone": "UTC" },
                "end": { "dateTime": "2024-01-02T09:15:00", "timeZone": "UTC" },
                "location": { "displayName": "Room 1" },
                "organizer": { "emailAddress": { "address": "lead@example.com" } },
                "attendees": [{ "emailAddress": { "address": "dev@example.com" } }]
            }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let out = microsoft::execute(
        json!({
            "action": "outlook_list_events",
            "token": "graph",
            "startDateTime": "2024-01-01T00:00:00Z",
            "endDateTime": "2024-01-31T00:00:00Z",
        }),
        &test_config(&server.uri()),
    )
    .await
    .unwrap();
    let event = &out["events"][0];
    assert_eq!(event["location"], "Room 1");
    assert_eq!(event["organizer"]["address"], "lead@example.com");
    assert_eq!(event["attendees"][0]["address"], "dev@example.com");
    assert_eq!(event["isAllDay"], false);
}

#[tokio::test]
async fn microsoft_update_contact_patches_then_reads_back() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path("/api/data/v9.2/contacts(C1)"))
        .and(body_json(json!({ "jobtitle": "CTO" })))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/data/v9.2/contacts(C1)"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "contactid": "C1",
            "firstname": "Ada",
            "lastname": "Lovelace",
            "jobtitle": "CTO",
            "address1_city": "London"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let out = microsoft::execute(
        json!({ "action": "dynamics_update_contact", "token": "graph", "contactId": "C1", "jobTitle": "CTO" }),
        &test_config(&server.uri()),
    )
    .await
    .unwrap();
    assert_eq!(out["firstName"], "Ada");
    assert_eq!(out["jobTitle"], "CTO");
    assert_eq!(out["address"]["city"], "London");
}

#[tokio::test]
async fn microsoft_errors_name_the_graph_api_once() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/me/calendar/events/E404"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "error": { "code": "ErrorItemNotFound", "message": "The specified object was not found in the store." }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let err = microsoft::execute(
        json!({ "action": "outlook_delete_event", "token": "graph", "eventId": "E404" }),
        &test_config(&server.uri()),
    )
    .await
    .unwrap_err();
    assert_eq!(
        err.to_string(),
        "Microsoft Graph API error: The specified object was not found in the store."
    );
}

fn basecamp_input(extra: Value) -> Value {
    let mut input = json!({ "account_id": "999", "access_token": "bc-token" });
    if let (Value::Object(input), Value::Object(extra)) = (&mut input, extra) {
        input.extend(extra);
    }
    input
}

#[tokio::test]
async fn basecamp_create_todo_sends_identifying_user_agent() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/projects/1/todolists/2/todos.json"))
        .and(header("user-agent", "Acme Sync (ops@acme.example)"))
        .and(header("authorization", "Bearer bc-token"))
        .and(body_json(json!({
            "content": "Ship it",
            "assignee_ids": ["42"],
            "due_on": "2024-06-01"
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "id": 7, "content": "Ship it" })))
        .expect(1)
        .mount(&server)
        .await;

    let registry = PluginRegistry::with_builtin_plugins();
    let out = registry
        .execute(
            "basecamp",
            "create_todo",
            basecamp_input(json!({
                "user_agent": "Acme Sync (ops@acme.example)",
                "project_id": 1,
                "todolist_id": 2,
                "content": "Ship it",
                "assignee_ids": [42],
                "due_on": "2024-06-01",
            })),
            &test_config(&server.uri()),
        )
        .await
        .unwrap();
    assert_eq!(out["id"], 7);
}

#[tokio::test]
async fn basecamp_failures_are_wrapped_with_operation_context() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/projects/404.json"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({ "error": "Not found" })))
        .expect(1)
        .mount(&server)
        .await;

    let registry = PluginRegistry::with_builtin_plugins();
    let err = registry
        .execute(
            "basecamp",
            "get_project",
            basecamp_input(json!({ "project_id": "404" })),
            &test_config(&server.uri()),
        )
        .await
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "Error getting Basecamp project: Basecamp API error: Not found"
    );
    assert_eq!(err.status(), Some(404));
    assert!(matches!(err.root(), Error::Api(_)));
}

#[tokio::test]
async fn basecamp_delete_webhook_reports_success() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/webhooks/55.json"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let out = PluginRegistry::with_builtin_plugins()
        .execute(
            "basecamp",
            "delete_webhook",
            basecamp_input(json!({ "webhook_id": "55" })),
            &test_config(&server.uri()),
        )
        .await
        .unwrap();
    assert_eq!(out["success"], true);
}

#[tokio::test]
async fn drive_move_file_replaces_existing_parents() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/drive/v3/files/F1"))
        .and(query_param("fields", "id,parents"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "id": "F1", "parents": ["P0", "P1"] })),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .and(path("/drive/v3/files/F1"))
        .and(query_param("addParents", "D1"))
        .and(query_param("removeParents", "P0,P1"))
        .and(query_param("supportsAllDrives", "true"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "id": "F1", "parents": ["D1"] })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let out = google_drive::execute(
        json!({
            "action": "move_file",
            "token": "g",
            "fileId": "F1",
            "destinationFolderId": "D1",
            "includeTeamDrives": true,
        }),
        &test_config(&server.uri()),
    )
    .await
    .unwrap();
    assert_eq!(out["parents"], json!(["D1"]));
}

#[tokio::test]
async fn drive_upload_sends_metadata_and_media_parts() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/upload/drive/v3/files"))
        .and(query_param("uploadType", "multipart"))
        .and(body_string_contains("\"name\":\"notes.txt\""))
        .and(body_string_contains("\"parents\":[\"FOLDER\"]"))
        .and(body_string_contains("hello drive"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "NEW1" })))
        .expect(1)
        .mount(&server)
        .await;

    let out = google_drive::execute(
        json!({
            "action": "upload_file",
            "token": "g",
            "fileName": "notes.txt",
            "file": "aGVsbG8gZHJpdmU=",
            "fileExtension": "txt",
            "parentFolder": "FOLDER",
        }),
        &test_config(&server.uri()),
    )
    .await
    .unwrap();
    assert_eq!(out["id"], "NEW1");
}

#[tokio::test]
async fn drive_read_file_wraps_content() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/drive/v3/files/F9"))
        .and(query_param("alt", "media"))
        .respond_with(ResponseTemplate::new(200).set_body_string("line one\nline two"))
        .expect(1)
        .mount(&server)
        .await;

    let out = google_drive::execute(
        json!({ "action": "read_file", "token": "g", "fileId": "F9" }),
        &test_config(&server.uri()),
    )
    .await
    .unwrap();
    assert_eq!(out, json!({ "content": "line one\nline two" }));
}

#[tokio::test]
async fn drive_save_as_pdf_copies_with_pdf_name() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/drive/v3/files/DOC1"))
        .and(query_param("fields", "id,name"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "id": "DOC1", "name": "Q3 report" })),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/drive/v3/files/DOC1/copy"))
        .and(body_json(json!({ "name": "Q3 report.pdf", "mimeType": "application/pdf" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "PDF1" })))
        .expect(1)
        .mount(&server)
        .await;

    let out = google_drive::execute(
        json!({ "action": "save_file_as_pdf", "token": "g", "fileId": "DOC1" }),
        &test_config(&server.uri()),
    )
    .await
    .unwrap();
    assert_eq!(out["id"], "PDF1");
}

#[tokio::test]
async fn drive_domain_permission_requires_domain() {
    let cfg = test_config("http://127.0.0.1:9");
    let err = google_drive::execute(
        json!({ "action": "add_permission", "token": "g", "fileId": "F1", "type": "domain", "role": "reader" }),
        &cfg,
    )
    .await
    .unwrap_err();
    assert_eq!(err.to_string(), "Domain is required for domain permission type");
}

#[tokio::test]
async fn drive_public_access_grants_anyone() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/drive/v3/files/F1/permissions"))
        .and(query_param("sendNotificationEmail", "false"))
        .and(body_json(json!({ "type": "anyone", "role": "reader", "allowFileDiscovery": false })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "anyoneWithLink" })))
        .expect(1)
        .mount(&server)
        .await;

    let out = google_drive::execute(
        json!({ "action": "set_public_access", "token": "g", "fileId": "F1", "role": "reader" }),
        &test_config(&server.uri()),
    )
    .await
    .unwrap();
    assert_eq!(out["id"], "anyoneWithLink");
}

#[tokio::test]
async fn drive_list_files_returns_one_page_with_its_token() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/drive/v3/files"))
        .and(query_param("q", "'F1' in parents and trashed=false"))
        .and(query_param("pageToken", "tok-1"))
        .and(query_param("pageSize", "100"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "nextPageToken": "tok-2",
            "files": [{ "id": "a", "name": "a.txt" }, { "id": "b", "name": "b.txt" }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let out = google_drive::execute(
        json!({ "action": "list_files", "token": "g", "folderId": "F1", "pageToken": "tok-1" }),
        &test_config(&server.uri()),
    )
    .await
    .unwrap();
    assert_eq!(out["nextPageToken"], "tok-2");
    assert_eq!(out["files"].as_array().map(Vec::len), Some(2));
}

#[tokio::test]
async fn drive_search_escapes_quotes_and_ends_without_token() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/drive/v3/files"))
        .and(query_param("q", "name contains 'Bob\\'s notes' and trashed=false"))
        .and(query_param_is_missing("pageToken"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "files": [{ "id": "n1" }] })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = google_drive::DriveClient::new("g", &test_config(&server.uri())).unwrap();
    let page = client
        .search_files_page("Bob's notes", &google_drive::ListOptions::default())
        .await
        .unwrap();
    assert_eq!(page.items, vec![json!({ "id": "n1" })]);
    assert!(!page.has_more());
}

#[tokio::test]
async fn drive_upload_resolves_mime_from_extension() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/upload/drive/v3/files"))
        .and(body_string_contains("\"mimeType\":\"image/webp\""))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "IMG1" })))
        .expect(1)
        .mount(&server)
        .await;

    let out = google_drive::execute(
        json!({
            "action": "upload_file",
            "token": "g",
            "fileName": "cover.webp",
            "file": "UklGRg==",
            "fileExtension": "webp",
        }),
        &test_config(&server.uri()),
    )
    .await
    .unwrap();
    assert_eq!(out["id"], "IMG1");
}

#[tokio::test]
async fn pinterest_pages_carry_the_bookmark() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/boards/B1/pins"))
        .and(query_param("page_size", "2"))
        .and(query_param("bookmark", "bm-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [{ "id": "P3" }, { "id": "P4" }],
            "bookmark": "bm-2"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = pinterest::PinterestClient::new("pin", &test_config(&server.uri())).unwrap();
    let page = client
        .get_board_pins_page(
            "B1",
            &pinterest::PageRequest {
                page_size: Some(2),
                bookmark: Some("bm-1".into()),
            },
        )
        .await
        .unwrap();
    assert_eq!(page.items.len(), 2);
    assert_eq!(page.next_page_token.as_deref(), Some("bm-2"));
}

#[tokio::test]
async fn snapchat_pages_take_the_cursor_from_the_next_link() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/adaccounts/A1/campaigns"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "request_status": "SUCCESS",
            "campaigns": [{ "id": "C1", "name": "Launch", "status": "ACTIVE" }],
            "paging": {
                "next_link": "https://adsapi.snapchat.com/v1/adaccounts/A1/campaigns?limit=50&cursor=cur-2"
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = snapchat::SnapchatClient::new("snap", &test_config(&server.uri())).unwrap();
    let page = client
        .get_campaigns_page("A1", None, None, None)
        .await
        .unwrap();
    assert_eq!(page.items[0].id, "C1");
    assert_eq!(page.next_page_token.as_deref(), Some("cur-2"));
}

#[tokio::test]
async fn metrics_are_tagged_with_the_dispatched_action() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search/pins"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "items": [] })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/projects/9.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": 9 })))
        .mount(&server)
        .await;

    let (cfg, seen) = recording_config(&server.uri());
    pinterest::execute(
        json!({ "action": "search_pins", "token": "pin", "query": "lamp" }),
        &cfg,
    )
    .await
    .unwrap();
    PluginRegistry::with_builtin_plugins()
        .execute(
            "basecamp",
            "get_project",
            json!({ "account_id": "1", "access_token": "bc", "project_id": "9" }),
            &cfg,
        )
        .await
        .unwrap();

    let seen = seen.lock().unwrap();
    let actions: Vec<_> = seen.iter().map(|m| m.context.action.clone()).collect();
    assert_eq!(
        actions,
        vec![Some("search_pins".to_string()), Some("get_project".to_string())]
    );
}
