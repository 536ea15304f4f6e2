//! Integration tests for the session lifecycle.
//!
//! Verifies against a real in-process server:
//! - Valid credentials yield a session token usable for API calls.
//! - Rejected credentials and missing sessions surface as `Unauthorized`.
//! - Logout invalidates the local session.

use taskdeck::remote::{ClientError, RemoteTaskService};

/// Start the task server in-process and return its base URL.
async fn start_server() -> (String, tokio::task::JoinHandle<()>) {
    let (addr, handle) = taskdeck_server::server::start_server("127.0.0.1:0")
        .await
        .expect("failed to start task server");
    (format!("http://{addr}"), handle)
}

#[tokio::test]
async fn login_with_demo_credentials_enables_api_access() {
    let (url, _handle) = start_server().await;
    let remote = RemoteTaskService::new(&url).expect("client should build");

    let token = remote
        .login("admin", "1234")
        .await
        .expect("login should succeed");
    assert!(!token.is_empty(), "login should return a session token");
    assert_eq!(remote.token().as_deref(), Some(token.as_str()));

    // The session must now open protected endpoints.
    let tasks = remote.fetch_tasks().await.expect("fetch should succeed");
    assert!(tasks.is_empty(), "fresh server should have no tasks");
}

#[tokio::test]
async fn wrong_credentials_are_rejected() {
    let (url, _handle) = start_server().await;
    let remote = RemoteTaskService::new(&url).expect("client should build");

    let result = remote.login("admin", "wrong-password").await;
    assert!(
        matches!(result, Err(ClientError::Unauthorized)),
        "wrong password should be Unauthorized, got: {result:?}"
    );
    assert!(remote.token().is_none(), "no token should be remembered");

    let result = remote.login("mallory", "1234").await;
    assert!(
        matches!(result, Err(ClientError::Unauthorized)),
        "unknown user should be Unauthorized, got: {result:?}"
    );
}

#[tokio::test]
async fn protected_endpoints_require_a_session() {
    let (url, _handle) = start_server().await;
    let remote = RemoteTaskService::new(&url).expect("client should build");

    // No login: every protected call is turned away.
    let result = remote.fetch_tasks().await;
    assert!(
        matches!(result, Err(ClientError::Unauthorized)),
        "fetch without session should be Unauthorized, got: {result:?}"
    );
}

#[tokio::test]
async fn subscription_requires_a_session() {
    let (url, _handle) = start_server().await;
    let remote = RemoteTaskService::new(&url).expect("client should build");

    let result = remote.subscribe().await;
    assert!(
        matches!(result, Err(ClientError::Ws(_))),
        "upgrade without session should fail the handshake, got error: {:?}",
        result.err()
    );
}

#[tokio::test]
async fn logout_forgets_the_session() {
    let (url, _handle) = start_server().await;
    let remote = RemoteTaskService::new(&url).expect("client should build");

    remote
        .login("admin", "1234")
        .await
        .expect("login should succeed");
    remote.logout().await.expect("logout should succeed");
    assert!(remote.token().is_none(), "token should be forgotten");

    let result = remote.fetch_tasks().await;
    assert!(
        matches!(result, Err(ClientError::Unauthorized)),
        "fetch after logout should be Unauthorized, got: {result:?}"
    );
}

#[tokio::test]
async fn relogin_after_logout_restores_access() {
    let (url, _handle) = start_server().await;
    let remote = RemoteTaskService::new(&url).expect("client should build");

    remote
        .login("admin", "1234")
        .await
        .expect("first login should succeed");
    remote.logout().await.expect("logout should succeed");
    remote
        .login("admin", "1234")
        .await
        .expect("second login should succeed");

    remote
        .fetch_tasks()
        .await
        .expect("fetch should succeed again");
}
