mod common;

use common::*;
use meta_graph_doctor::page::PAGE_SUBSCRIBED_FIELDS;
use serde_json::json;
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{method, path, query_param},
};

#[tokio::test]
async fn test_list_pages_with_tokens() {
    let mock_server = MockServer::start().await;
    // Arrange
    let client = client_for(&mock_server);

    Mock::given(method("GET"))
        .and(path("/v21.0/me/accounts"))
        .and(query_param("access_token", ACCESS_TOKEN))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{
                "id": PAGE_ID,
                "name": "Acme Shop",
                "access_token": PAGE_TOKEN,
                "category": "Retail",
                "tasks": ["MANAGE", "MESSAGING"]
            }]
        })))
        .mount(&mock_server)
        .await;

    // Act
    let pages = client.me().pages(ACCESS_TOKEN).await.unwrap();

    // Assert
    assert_eq!(pages.len(), 1);
    assert_eq!(pages[0].access_token, PAGE_TOKEN);
    assert!(pages[0].has_task("MESSAGING"));
}

#[tokio::test]
async fn test_profile() {
    let mock_server = MockServer::start().await;
    // Arrange
    let client = client_for(&mock_server);

    Mock::given(method("GET"))
        .and(path("/v21.0/me"))
        .and(query_param("fields", "id,name,category"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": PAGE_ID,
            "name": "Acme Shop",
            "category": "Retail"
        })))
        .mount(&mock_server)
        .await;

    // Act
    let profile = client.me().profile(PAGE_TOKEN).await.unwrap();

    // Assert
    assert!(profile.is_page());
    assert_eq!(profile.name, "Acme Shop");
}

#[tokio::test]
async fn test_page_subscribed_apps() {
    let mock_server = MockServer::start().await;
    // Arrange
    let client = client_for(&mock_server);

    Mock::given(method("GET"))
        .and(path(format!("/v21.0/{PAGE_ID}/subscribed_apps")))
        .and(query_param("access_token", PAGE_TOKEN))
        .and(query_param("fields", "id,name,subscribed_fields"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{
                "id": APP_ID,
                "name": "Doctor App",
                "subscribed_fields": ["messages", "messaging_postbacks"]
            }]
        })))
        .mount(&mock_server)
        .await;

    // Act
    let apps = client.page(PAGE_ID).subscribed_apps(PAGE_TOKEN).await.unwrap();

    // Assert
    assert_eq!(apps.len(), 1);
    assert!(apps[0].is_app(APP_ID));
    assert_eq!(apps[0].subscribed_fields, ["messages", "messaging_postbacks"]);
}

#[tokio::test]
async fn test_subscribe_page_sends_fields() {
    let mock_server = MockServer::start().await;
    // Arrange
    let client = client_for(&mock_server);

    Mock::given(method("POST"))
        .and(path(format!("/v21.0/{PAGE_ID}/subscribed_apps")))
        .and(query_param("access_token", PAGE_TOKEN))
        .and(query_param(
            "subscribed_fields",
            "messages,message_reactions,messaging_postbacks,message_reads,standby",
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true})))
        .expect(1)
        .mount(&mock_server)
        .await;

    // Act
    let result = client.page(PAGE_ID).subscribe(PAGE_TOKEN).await;

    // Assert
    assert!(result.is_ok());
    assert_eq!(PAGE_SUBSCRIBED_FIELDS.len(), 5);
}

#[tokio::test]
async fn test_subscribe_page_not_acknowledged() {
    let mock_server = MockServer::start().await;
    // Arrange
    let client = client_for(&mock_server);

    Mock::given(method("POST"))
        .and(path(format!("/v21.0/{PAGE_ID}/subscribed_apps")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": false})))
        .mount(&mock_server)
        .await;

    // Act
    let err = client.page(PAGE_ID).subscribe(PAGE_TOKEN).await.unwrap_err();

    // Assert
    assert_eq!(err.code(), Some(0));
    assert_eq!(
        err.as_graph().unwrap().message(),
        "Page subscribe returned success: false"
    );
}

#[tokio::test]
async fn test_instagram_account_linked() {
    let mock_server = MockServer::start().await;
    // Arrange
    let client = client_for(&mock_server);

    Mock::given(method("GET"))
        .and(path(format!("/v21.0/{PAGE_ID}")))
        .and(query_param("fields", "instagram_business_account{id,name,username}"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": PAGE_ID,
            "instagram_business_account": {"id": "17841400000000000", "username": "acme"}
        })))
        .mount(&mock_server)
        .await;

    // Act
    let account = client.page(PAGE_ID).instagram_account(PAGE_TOKEN).await.unwrap();

    // Assert
    let account = account.unwrap();
    assert_eq!(account.id, "17841400000000000");
    assert_eq!(account.username.as_deref(), Some("acme"));
}

#[tokio::test]
async fn test_instagram_account_not_linked() {
    let mock_server = MockServer::start().await;
    // Arrange
    let client = client_for(&mock_server);

    Mock::given(method("GET"))
        .and(path(format!("/v21.0/{PAGE_ID}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": PAGE_ID})))
        .mount(&mock_server)
        .await;

    // Act
    let account = client.page(PAGE_ID).instagram_account(PAGE_TOKEN).await.unwrap();

    // Assert
    assert_eq!(account, None);
}

#[tokio::test]
async fn test_instagram_permission_errors_mean_absent() {
    for code in [100, 200] {
        let mock_server = MockServer::start().await;
        // Arrange
        let client = client_for(&mock_server);

        Mock::given(method("GET"))
            .and(path(format!("/v21.0/{PAGE_ID}")))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": {
                    "message": "(#100) Tried accessing nonexisting field",
                    "type": "OAuthException",
                    "code": code,
                    "fbtrace_id": "AbCdEf"
                }
            })))
            .mount(&mock_server)
            .await;

        // Act
        let account = client.page(PAGE_ID).instagram_account(PAGE_TOKEN).await;

        // Assert
        assert_eq!(account.unwrap(), None, "code {code}");
    }
}

#[tokio::test]
async fn test_instagram_other_errors_propagate() {
    let mock_server = MockServer::start().await;
    // Arrange
    let client = client_for(&mock_server);

    Mock::given(method("GET"))
        .and(path(format!("/v21.0/{PAGE_ID}")))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": {
                "message": "Error validating access token",
                "type": "OAuthException",
                "code": 190,
                "error_subcode": 463
            }
        })))
        .mount(&mock_server)
        .await;

    // Act
    let err = client.page(PAGE_ID).instagram_account(PAGE_TOKEN).await.unwrap_err();

    // Assert
    assert_eq!(err.code(), Some(190));
    assert_eq!(err.as_graph().unwrap().subcode(), Some(463));
}

#[tokio::test]
async fn test_instagram_non_json_200_propagates() {
    let mock_server = MockServer::start().await;
    // Arrange
    let client = client_for(&mock_server);

    Mock::given(method("GET"))
        .and(path(format!("/v21.0/{PAGE_ID}")))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
        .mount(&mock_server)
        .await;

    // Act
    let result = client.page(PAGE_ID).instagram_account(PAGE_TOKEN).await;

    // Assert
    assert_eq!(result.unwrap_err().code(), Some(200));
}
