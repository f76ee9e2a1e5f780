//! Token manager behavior against a mock Upwork token endpoint.

mod common;

use std::sync::Arc;

use proptest::prelude::*;
use serde_json::json;
use upwork_oauth::{
    ConfigStore, Endpoints, Error, FileConfigStore, TokenManager, TokenState,
};
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::{expired_tokens, manager, mount_refresh, token_body, valid_tokens};

#[tokio::test]
async fn test_exchange_code_persists_tokens() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/oauth2/token"))
        .and(body_string_contains("grant_type=authorization_code"))
        .and(body_string_contains("code=ABC"))
        .and(body_string_contains("client_id=client-123"))
        .and(body_string_contains("client_secret=secret-456"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body("T1", Some("R1"), 3600)))
        .expect(1)
        .mount(&server)
        .await;

    let (manager, store) = manager(&server, Some("ABC"), TokenState::default());
    let before = TokenState::now();

    manager.exchange_code_for_tokens().await.unwrap();

    let state = manager.token_state().await;
    assert_eq!(state.access_token.as_deref(), Some("T1"));
    assert_eq!(state.refresh_token.as_deref(), Some("R1"));
    assert!(state.expires_at >= before + 3600);
    assert!(state.expires_at <= TokenState::now() + 3600);

    assert_eq!(store.get("access_token").unwrap().as_deref(), Some("T1"));
    assert_eq!(store.get("refresh_token").unwrap().as_deref(), Some("R1"));
    assert_eq!(
        store.get("expires_at").unwrap(),
        Some(state.expires_at.to_string())
    );

    // The code is single-use, in memory and in the store
    assert!(!manager.status().await.has_auth_code);
    assert_eq!(store.get("auth_code").unwrap().as_deref(), Some(""));
    let err = manager.exchange_code_for_tokens().await.unwrap_err();
    assert!(matches!(err, Error::Configuration(_)));
}

#[tokio::test]
async fn test_exchange_defaults_expires_in() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/oauth2/token"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"access_token": "T1", "refresh_token": "R1"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let (manager, _) = manager(&server, Some("ABC"), TokenState::default());
    let before = TokenState::now();
    manager.exchange_code_for_tokens().await.unwrap();

    let state = manager.token_state().await;
    assert!(state.expires_at >= before + 3600);
    assert!(state.expires_at <= TokenState::now() + 3600);
}

#[tokio::test]
async fn test_exchange_rejected_leaves_state_untouched() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/oauth2/token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": "invalid_grant",
            "error_description": "Authorization code expired"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let (manager, store) = manager(&server, Some("ABC"), TokenState::default());
    let err = manager.exchange_code_for_tokens().await.unwrap_err();

    match &err {
        Error::AuthProvider { status, body } => {
            assert_eq!(*status, 400);
            assert!(body.contains("invalid_grant"));
        }
        other => panic!("expected provider error, got {other:?}"),
    }
    assert!(err.requires_reauthentication());
    assert_eq!(manager.token_state().await, TokenState::default());
    assert!(store.is_empty());
    // The code is kept for another attempt
    assert!(manager.status().await.has_auth_code);
}

#[tokio::test]
async fn test_exchange_without_refresh_token_is_invalid_response() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/oauth2/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body("T1", None, 3600)))
        .mount(&server)
        .await;

    let (manager, store) = manager(&server, Some("ABC"), TokenState::default());
    let err = manager.exchange_code_for_tokens().await.unwrap_err();
    assert!(matches!(err, Error::InvalidResponse(_)), "got {err:?}");
    assert!(store.is_empty());
}

#[tokio::test]
async fn test_malformed_token_body_is_invalid_response() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/oauth2/token"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let (manager, _) = manager(&server, None, expired_tokens("T1", "R1"));
    let err = manager.refresh_access_token().await.unwrap_err();
    assert!(matches!(err, Error::InvalidResponse(_)), "got {err:?}");
    assert_eq!(manager.token_state().await.access_token.as_deref(), Some("T1"));
}

#[tokio::test]
async fn test_refresh_keeps_refresh_token_when_not_rotated() {
    let server = MockServer::start().await;
    mount_refresh(&server, token_body("T2", None, 3600), 1).await;

    let (manager, store) = manager(&server, None, expired_tokens("T1", "R1"));
    manager.refresh_access_token().await.unwrap();

    let state = manager.token_state().await;
    assert_eq!(state.access_token.as_deref(), Some("T2"));
    assert_eq!(state.refresh_token.as_deref(), Some("R1"));
    assert!(!state.is_expired(60));
    assert_eq!(store.get("refresh_token").unwrap().as_deref(), Some("R1"));
    assert_eq!(store.get("access_token").unwrap().as_deref(), Some("T2"));
}

#[tokio::test]
async fn test_refresh_rotates_refresh_token() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/oauth2/token"))
        .and(body_string_contains("grant_type=refresh_token"))
        .and(body_string_contains("refresh_token=R1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body("T2", Some("R2"), 7200)))
        .expect(1)
        .mount(&server)
        .await;

    let (manager, store) = manager(&server, None, expired_tokens("T1", "R1"));
    manager.refresh_access_token().await.unwrap();

    let state = manager.token_state().await;
    assert_eq!(state.refresh_token.as_deref(), Some("R2"));
    assert!(state.expires_at >= TokenState::now() + 7100);
    assert_eq!(store.get("refresh_token").unwrap().as_deref(), Some("R2"));
}

#[tokio::test]
async fn test_refresh_rejected_keeps_old_tokens() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/oauth2/token"))
        .respond_with(ResponseTemplate::new(401).set_body_string("unauthorized"))
        .expect(1)
        .mount(&server)
        .await;

    let tokens = expired_tokens("T1", "R1");
    let (manager, store) = manager(&server, None, tokens.clone());

    let err = manager.ensure_token_valid().await.unwrap_err();
    assert_eq!(err.status(), Some(401));
    assert_eq!(manager.token_state().await, tokens);
    assert!(store.is_empty());
}

#[tokio::test]
async fn test_ensure_valid_token_makes_no_request() {
    let server = MockServer::start().await;
    mount_refresh(&server, token_body("T2", None, 3600), 0).await;

    let (manager, _) = manager(&server, None, valid_tokens("T1", "R1"));
    manager.ensure_token_valid().await.unwrap();
    assert_eq!(manager.access_token().await.unwrap(), "T1");
}

#[tokio::test]
async fn test_ensure_refreshes_inside_buffer() {
    let server = MockServer::start().await;
    mount_refresh(&server, token_body("T2", None, 3600), 1).await;

    let tokens = TokenState {
        access_token: Some("T1".into()),
        refresh_token: Some("R1".into()),
        expires_at: TokenState::now() + 30,
    };
    let (manager, _) = manager(&server, None, tokens);
    manager.ensure_token_valid().await.unwrap();
    assert_eq!(manager.access_token().await.unwrap(), "T2");
}

#[tokio::test]
async fn test_ensure_refreshes_when_access_token_missing() {
    let server = MockServer::start().await;
    mount_refresh(&server, token_body("T2", None, 3600), 1).await;

    let tokens = TokenState {
        access_token: None,
        refresh_token: Some("R1".into()),
        expires_at: 0,
    };
    let (manager, _) = manager(&server, None, tokens);
    manager.ensure_token_valid().await.unwrap();
    assert_eq!(manager.token_state().await.access_token.as_deref(), Some("T2"));
}

#[tokio::test]
async fn test_concurrent_ensure_refreshes_once() {
    let server = MockServer::start().await;
    mount_refresh(&server, token_body("T2", Some("R2"), 3600), 1).await;

    let (manager, _) = manager(&server, None, expired_tokens("T1", "R1"));

    let (a, b, c) = tokio::join!(
        manager.ensure_token_valid(),
        manager.ensure_token_valid(),
        manager.access_token(),
    );
    a.unwrap();
    b.unwrap();
    assert_eq!(c.unwrap(), "T2");
}

#[tokio::test]
async fn test_concurrent_ensure_across_tasks_refreshes_once() {
    let server = MockServer::start().await;
    mount_refresh(&server, token_body("T2", None, 3600), 1).await;

    let (manager, _) = manager(&server, None, expired_tokens("T1", "R1"));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let manager = Arc::clone(&manager);
            tokio::spawn(async move { manager.access_token().await })
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.await.unwrap().unwrap(), "T2");
    }
}

#[tokio::test]
async fn test_file_store_end_to_end() {
    let server = MockServer::start().await;
    mount_refresh(&server, token_body("T2", None, 3600), 1).await;

    let dir = tempfile::tempdir().unwrap();
    let config_path = dir.path().join("upwork.toml");
    std::fs::write(
        &config_path,
        r#"
[upwork]
client_id = "client-123"
client_secret = "secret-456"
redirect_uri = "https://example.com/callback"
access_token = "T1"
refresh_token = "R1"
expires_at = 1
"#,
    )
    .unwrap();

    let store = Arc::new(FileConfigStore::new(&config_path));
    let manager = TokenManager::from_store(store)
        .unwrap()
        .with_endpoints(Endpoints::with_base_url(&server.uri()));

    manager.ensure_token_valid().await.unwrap();

    // A fresh manager over the same file sees the refreshed token
    let reloaded = TokenManager::from_store(Arc::new(FileConfigStore::new(&config_path))).unwrap();
    let state = reloaded.token_state().await;
    assert_eq!(state.access_token.as_deref(), Some("T2"));
    assert_eq!(state.refresh_token.as_deref(), Some("R1"));
    assert_eq!(state, manager.token_state().await);

    let saved = std::fs::read_to_string(&config_path).unwrap();
    assert!(saved.contains("client_secret"));
}

#[tokio::test]
async fn test_spent_auth_code_not_replayed_after_restart() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/oauth2/token"))
        .and(body_string_contains("grant_type=authorization_code"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body("T1", Some("R1"), 3600)))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let config_path = dir.path().join("upwork.toml");
    std::fs::write(
        &config_path,
        r#"
[upwork]
client_id = "client-123"
client_secret = "secret-456"
redirect_uri = "https://example.com/callback"
auth_code = "ABC"
"#,
    )
    .unwrap();

    let manager = TokenManager::from_store(Arc::new(FileConfigStore::new(&config_path)))
        .unwrap()
        .with_endpoints(Endpoints::with_base_url(&server.uri()));
    assert!(manager.status().await.has_auth_code);
    manager.exchange_code_for_tokens().await.unwrap();

    let store = FileConfigStore::new(&config_path);
    assert_eq!(store.get("auth_code").unwrap().as_deref(), Some(""));
    assert_eq!(store.get("access_token").unwrap().as_deref(), Some("T1"));

    let restarted = TokenManager::from_store(Arc::new(store))
        .unwrap()
        .with_endpoints(Endpoints::with_base_url(&server.uri()));
    assert!(!restarted.status().await.has_auth_code);

    // A second login fails locally instead of sending the spent code
    let err = restarted.exchange_code_for_tokens().await.unwrap_err();
    assert!(matches!(err, Error::Configuration(_)), "got {err:?}");
}

proptest! {
    #[test]
    fn prop_is_expired_at_matches_arithmetic(
        expires_at in 0i64..4_000_000_000,
        now in 0i64..4_000_000_000,
        buffer in 0i64..100_000,
    ) {
        let state = TokenState {
            access_token: Some("T".into()),
            refresh_token: None,
            expires_at,
        };
        let expected = (now as i128) > (expires_at as i128) - (buffer as i128);
        prop_assert_eq!(state.is_expired_at(now, buffer), expected);
    }

    #[test]
    fn prop_larger_buffer_never_unexpires(
        expires_at in 0i64..4_000_000_000,
        now in 0i64..4_000_000_000,
        small in 0i64..10_000,
        extra in 0i64..10_000,
    ) {
        let state = TokenState {
            access_token: Some("T".into()),
            refresh_token: None,
            expires_at,
        };
        if state.is_expired_at(now, small) {
            prop_assert!(state.is_expired_at(now, small + extra));
        }
    }
}
