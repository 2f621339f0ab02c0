use assert_matches::assert_matches;
use pretty_assertions::assert_eq;
use quotebook_backend_client::ACCESS_TOKEN_KEY;
use quotebook_backend_client::ApiError;
use quotebook_backend_client::AuthClient;
use quotebook_backend_client::ClientConfig;
use quotebook_backend_client::CredentialStore;
use quotebook_backend_client::EntityGateway;
use quotebook_backend_client::HttpGateway;
use quotebook_backend_client::InMemoryCredentialStore;
use quotebook_backend_client::REFRESH_TOKEN_KEY;
use quotebook_backend_client::RequestBody;
use quotebook_backend_client::RequestExecutor;
use quotebook_backend_client::USER_ID_KEY;
use quotebook_backend_client::endpoints;
use quotebook_protocol::Story;
use quotebook_protocol::StoryDraft;
use quotebook_protocol::Theme;
use quotebook_protocol::TokenPair;
use quotebook_protocol::Visibility;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use wiremock::Mock;
use wiremock::MockServer;
use wiremock::ResponseTemplate;
use wiremock::matchers::body_string_contains;
use wiremock::matchers::header;
use wiremock::matchers::method;
use wiremock::matchers::path;
use wiremock::matchers::query_param;

fn tokens(access: &str, refresh: &str) -> TokenPair {
    TokenPair {
        access_token: access.to_string(),
        refresh_token: refresh.to_string(),
    }
}

fn executor_for(server: &MockServer, store: Arc<InMemoryCredentialStore>) -> Arc<RequestExecutor> {
    let config = ClientConfig::parse(&server.uri()).expect("config");
    Arc::new(RequestExecutor::new(&config, store).expect("executor"))
}

fn signed_in(server: &MockServer) -> (Arc<RequestExecutor>, Arc<InMemoryCredentialStore>) {
    let store = Arc::new(InMemoryCredentialStore::with_tokens(&tokens(
        "access-1",
        "refresh-1",
    )));
    (executor_for(server, Arc::clone(&store)), store)
}

fn story_json(id: &str) -> serde_json::Value {
    json!({
        "id": id,
        "ownerId": "u-1",
        "title": format!("story {id}"),
        "quote": "It was the best of times.",
        "bookTitle": "A Tale of Two Cities",
        "keywords": ["hope"],
        "visibility": "public",
    })
}

fn page_json(ids: &[&str], current_page: u32, total_pages: u32) -> serde_json::Value {
    json!({
        "success": true,
        "message": "",
        "data": ids.iter().map(|id| story_json(id)).collect::<Vec<_>>(),
        "pagination": {
            "currentPage": current_page,
            "totalPages": total_pages,
            "pageSize": 10,
            "totalItems": 25,
        },
    })
}

fn refresh_ok(access: &str, refresh: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "success": true,
        "message": "",
        "data": { "accessToken": access, "refreshToken": refresh },
    }))
}

fn unauthorized() -> ResponseTemplate {
    ResponseTemplate::new(401).set_body_json(json!({
        "success": false,
        "message": "token expired",
    }))
}

#[tokio::test]
async fn decodes_a_page_with_bearer_and_query() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/stories/public"))
        .and(header("authorization", "Bearer access-1"))
        .and(query_param("page", "2"))
        .and(query_param("pageSize", "10"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page_json(&["a", "b"], 2, 3)))
        .expect(1)
        .mount(&server)
        .await;

    let (executor, _store) = signed_in(&server);
    let page = executor
        .execute_page::<Story>(&endpoints::stories::public().with_page(2, 10))
        .await
        .expect("page");

    let ids: Vec<&str> = page.items.iter().map(|story| story.id.as_str()).collect();
    assert_eq!(ids, vec!["a", "b"]);
    assert_eq!(page.pagination.current_page, 2);
    assert!(!page.pagination.is_last_page());
}

#[tokio::test]
async fn unsuccessful_envelope_is_a_server_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/stories/me"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": false,
            "message": "account suspended",
        })))
        .mount(&server)
        .await;

    let (executor, _store) = signed_in(&server);
    let err = executor
        .execute_page::<Story>(&endpoints::stories::mine())
        .await
        .expect_err("should fail");
    assert_eq!(
        err,
        ApiError::Server {
            status: 200,
            message: "account suspended".to_string(),
        }
    );
}

#[tokio::test]
async fn non_success_status_uses_envelope_message() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/stories/missing"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "success": false,
            "message": "story not found",
        })))
        .mount(&server)
        .await;

    let (executor, _store) = signed_in(&server);
    let err = executor
        .execute_data::<Story>(
            &endpoints::stories::detail(&"missing".into()),
            &RequestBody::Empty,
        )
        .await
        .expect_err("should fail");
    assert_eq!(err.status(), Some(404));
    assert_eq!(err.to_string(), "server error 404: story not found");
}

#[tokio::test]
async fn undecodable_body_is_a_decoding_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/stories/me"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
        .mount(&server)
        .await;

    let (executor, _store) = signed_in(&server);
    let err = executor
        .execute_page::<Story>(&endpoints::stories::mine())
        .await
        .expect_err("should fail");
    assert_matches!(err, ApiError::Decoding(_));
}

#[tokio::test]
async fn missing_token_fails_without_network() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page_json(&[], 1, 1)))
        .expect(0)
        .mount(&server)
        .await;

    let executor = executor_for(&server, Arc::new(InMemoryCredentialStore::new()));
    let err = executor
        .execute_page::<Story>(&endpoints::stories::mine())
        .await
        .expect_err("should fail");
    assert_eq!(err, ApiError::Unauthorized);
}

#[tokio::test]
async fn expired_token_is_refreshed_and_request_replayed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/stories/me"))
        .and(header("authorization", "Bearer access-1"))
        .respond_with(unauthorized())
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .and(header("authorization", "Bearer refresh-1"))
        .and(body_string_contains("\"refreshToken\":\"refresh-1\""))
        .respond_with(refresh_ok("access-2", "refresh-2"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/stories/me"))
        .and(header("authorization", "Bearer access-2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page_json(&["a"], 1, 1)))
        .expect(1)
        .mount(&server)
        .await;

    let (executor, store) = signed_in(&server);
    let page = executor
        .execute_page::<Story>(&endpoints::stories::mine())
        .await
        .expect("page after refresh");

    assert_eq!(page.items.len(), 1);
    assert_eq!(
        store.token_pair().expect("tokens"),
        Some(tokens("access-2", "refresh-2"))
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn concurrent_401s_share_one_refresh() {
    let server = MockServer::start().await;
    Mock::given(header("authorization", "Bearer access-1"))
        .respond_with(unauthorized())
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .respond_with(refresh_ok("access-2", "refresh-2").set_delay(Duration::from_millis(200)))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(header("authorization", "Bearer access-2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page_json(&["a"], 1, 1)))
        .expect(2)
        .mount(&server)
        .await;

    let (executor, store) = signed_in(&server);
    let mine = endpoints::stories::mine();
    let public = endpoints::stories::public();
    let (first, second) = tokio::join!(
        executor.execute_page::<Story>(&mine),
        executor.execute_page::<Story>(&public),
    );

    assert!(first.is_ok(), "first call failed: {first:?}");
    assert!(second.is_ok(), "second call failed: {second:?}");
    assert_eq!(
        store.get(ACCESS_TOKEN_KEY).expect("get"),
        Some("access-2".to_string())
    );
    server.verify().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn rejected_refresh_fails_every_waiter_once() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(unauthorized())
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .respond_with(unauthorized().set_delay(Duration::from_millis(100)))
        .expect(1)
        .mount(&server)
        .await;

    let (executor, store) = signed_in(&server);
    let mine = endpoints::stories::mine();
    let public = endpoints::stories::public();
    let (first, second) = tokio::join!(
        executor.execute_page::<Story>(&mine),
        executor.execute_page::<Story>(&public),
    );

    assert_eq!(first.expect_err("first"), ApiError::Unauthorized);
    assert_eq!(second.expect_err("second"), ApiError::Unauthorized);
    assert_eq!(
        store.token_pair().expect("tokens"),
        Some(tokens("access-1", "refresh-1"))
    );
    server.verify().await;
}

#[tokio::test]
async fn retry_rejected_again_is_unauthorized() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/themes/me"))
        .respond_with(unauthorized())
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .respond_with(refresh_ok("access-2", "refresh-2"))
        .expect(1)
        .mount(&server)
        .await;

    let (executor, _store) = signed_in(&server);
    let err = executor
        .execute_page::<Theme>(&endpoints::themes::mine())
        .await
        .expect_err("should fail");
    assert_eq!(err, ApiError::Unauthorized);
}

#[tokio::test]
async fn public_endpoint_401_is_not_refreshed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "success": false,
            "message": "wrong password",
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .respond_with(refresh_ok("access-2", "refresh-2"))
        .expect(0)
        .mount(&server)
        .await;

    let (executor, _store) = signed_in(&server);
    let err = AuthClient::new(executor)
        .sign_in("reader@example.com", "hunter2")
        .await
        .expect_err("should fail");
    assert_eq!(
        err,
        ApiError::Server {
            status: 401,
            message: "wrong password".to_string(),
        }
    );
}

#[tokio::test]
async fn sign_in_stores_tokens_and_sign_out_clears_them() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .and(body_string_contains("reader@example.com"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "message": "welcome",
            "data": {
                "accessToken": "access-9",
                "refreshToken": "refresh-9",
                "user": { "id": "u-9", "nickname": "reader" },
            },
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/logout"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    let store = Arc::new(InMemoryCredentialStore::new());
    let auth = AuthClient::new(executor_for(&server, Arc::clone(&store)));
    let account = auth
        .sign_in("reader@example.com", "hunter2")
        .await
        .expect("sign in");

    assert_eq!(account.nickname.as_deref(), Some("reader"));
    assert_eq!(auth.current_user().map(|id| id.to_string()), Some("u-9".to_string()));
    assert_eq!(
        store.get(REFRESH_TOKEN_KEY).expect("get"),
        Some("refresh-9".to_string())
    );

    auth.sign_out().await.expect("sign out");
    assert_eq!(auth.current_user(), None);
    assert_eq!(store.get(USER_ID_KEY).expect("get"), None);
    assert_eq!(store.token_pair().expect("tokens"), None);
}

#[tokio::test]
async fn gateway_creates_story_from_multipart_form() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/stories"))
        .and(header("authorization", "Bearer access-1"))
        .and(body_string_contains("name=\"title\""))
        .and(body_string_contains("name=\"isPublic\""))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "success": true,
            "message": "created",
            "data": story_json("new"),
        })))
        .expect(1)
        .mount(&server)
        .await;

    let (executor, _store) = signed_in(&server);
    let gateway = HttpGateway::<Story>::new(executor);
    let draft = StoryDraft {
        title: "story new".to_string(),
        quote: "It was the best of times.".to_string(),
        book_title: "A Tale of Two Cities".to_string(),
        keywords: vec!["hope".to_string()],
        visibility: Visibility::Public,
        ..StoryDraft::default()
    };
    let created = gateway.create(&draft).await.expect("create");
    assert_eq!(created.id.as_str(), "new");
}

#[tokio::test]
async fn timed_out_request_is_a_network_error_and_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/stories/public"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(page_json(&["a"], 1, 1))
                .set_delay(Duration::from_secs(3)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let config = ClientConfig {
        request_timeout: Duration::from_millis(200),
        ..ClientConfig::parse(&server.uri()).expect("config")
    };
    let store = Arc::new(InMemoryCredentialStore::with_tokens(&tokens(
        "access-1",
        "refresh-1",
    )));
    let executor = RequestExecutor::new(&config, store).expect("executor");

    let err = executor
        .execute_page::<Story>(&endpoints::stories::public().with_page(1, 10))
        .await
        .expect_err("should time out");
    assert_matches!(err, ApiError::Network { timed_out: true, .. });
}
