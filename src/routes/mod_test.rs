use super::*;
use crate::backend::memory::MemoryBackend;
use crate::state::test_helpers::{TEST_ADMIN_EMAIL, TEST_ADMIN_PASSWORD};
use futures_util::{SinkExt, StreamExt};
use std::net::SocketAddr;
use tokio::time::{timeout, Duration};
use tokio_tungstenite::tungstenite::Message as WsMessage;

struct TestServer {
    addr: SocketAddr,
    backend: MemoryBackend,
    client: reqwest::Client,
}

impl TestServer {
    async fn spawn() -> Self {
        let backend = MemoryBackend::new();
        backend.add_account(TEST_ADMIN_EMAIL, TEST_ADMIN_PASSWORD);
        let state = AppState::new(
            std::sync::Arc::new(backend.clone()),
            std::sync::Arc::new(backend.clone()),
            TEST_ADMIN_EMAIL,
        );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind test listener");
        let addr = listener.local_addr().expect("local addr");
        tokio::spawn(async move {
            axum::serve(listener, app(state)).await.expect("test server failed");
        });

        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .expect("build http client");
        Self { addr, backend, client }
    }

    fn url(&self, path: &str) -> String {
        format!("http://{}{path}", self.addr)
    }

    /// Log in as admin and return the session cookie pair.
    async fn login(&self) -> String {
        let resp = self
            .client
            .post(self.url("/api/auth/login"))
            .json(&serde_json::json!({
                "email": TEST_ADMIN_EMAIL,
                "password": TEST_ADMIN_PASSWORD,
            }))
            .send()
            .await
            .expect("login request");
        assert_eq!(resp.status(), 200);
        let set_cookie = resp
            .headers()
            .get("set-cookie")
            .expect("session cookie set")
            .to_str()
            .expect("ascii cookie")
            .to_owned();
        set_cookie
            .split(';')
            .next()
            .expect("cookie pair")
            .to_owned()
    }

    async fn ws_ticket(&self, cookie: &str) -> String {
        let resp = self
            .client
            .post(self.url("/api/auth/ws-ticket"))
            .header("cookie", cookie)
            .send()
            .await
            .expect("ticket request");
        assert_eq!(resp.status(), 200);
        let body: serde_json::Value = resp.json().await.expect("ticket json");
        body["ticket"].as_str().expect("ticket string").to_owned()
    }
}

type WsStream = tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

async fn recv_json(ws: &mut WsStream) -> serde_json::Value {
    loop {
        let msg = timeout(Duration::from_secs(2), ws.next())
            .await
            .expect("ws receive timed out")
            .expect("ws closed unexpectedly")
            .expect("ws protocol error");
        if let WsMessage::Text(text) = msg {
            return serde_json::from_str(&text).expect("server message json");
        }
    }
}

async fn connect_ws(server: &TestServer, ticket: &str) -> WsStream {
    let url = format!("ws://{}/api/ws?ticket={ticket}", server.addr);
    let (ws, _) = tokio_tungstenite::connect_async(url).await.expect("ws connect");
    ws
}

// =============================================================================
// page guard
// =============================================================================

#[tokio::test]
async fn dashboard_redirects_anonymous_to_login() {
    let server = TestServer::spawn().await;
    let resp = server
        .client
        .get(server.url("/dashboard"))
        .send()
        .await
        .expect("dashboard request");
    assert_eq!(resp.status(), 307);
    assert_eq!(resp.headers().get("location").and_then(|v| v.to_str().ok()), Some("/login"));
}

#[tokio::test]
async fn dashboard_renders_for_admin_session() {
    let server = TestServer::spawn().await;
    let cookie = server.login().await;
    let resp = server
        .client
        .get(server.url("/dashboard"))
        .header("cookie", &cookie)
        .send()
        .await
        .expect("dashboard request");
    assert_eq!(resp.status(), 200);
    let body = resp.text().await.expect("page body");
    assert!(body.contains("Admin Dashboard"));
}

#[tokio::test]
async fn api_rejects_anonymous_user_listing() {
    let server = TestServer::spawn().await;
    let resp = server
        .client
        .get(server.url("/api/users"))
        .send()
        .await
        .expect("users request");
    assert_eq!(resp.status(), 401);
}

#[tokio::test]
async fn login_page_and_healthz_are_public() {
    let server = TestServer::spawn().await;
    assert_eq!(
        server.client.get(server.url("/login")).send().await.expect("login page").status(),
        200
    );
    assert_eq!(
        server.client.get(server.url("/healthz")).send().await.expect("healthz").status(),
        200
    );
}

#[tokio::test]
async fn wrong_password_gets_provider_message_and_no_cookie() {
    let server = TestServer::spawn().await;
    let resp = server
        .client
        .post(server.url("/api/auth/login"))
        .json(&serde_json::json!({ "email": TEST_ADMIN_EMAIL, "password": "nope" }))
        .send()
        .await
        .expect("login request");
    assert_eq!(resp.status(), 401);
    assert!(resp.headers().get("set-cookie").is_none());
    let body: serde_json::Value = resp.json().await.expect("error json");
    assert!(body["error"].as_str().expect("error string").contains("INVALID_LOGIN_CREDENTIALS"));
}

// =============================================================================
// live subscription, end to end
// =============================================================================

#[tokio::test]
async fn live_flow_select_snapshot_delete() {
    let server = TestServer::spawn().await;
    let uid = server.backend.add_user("a@x.com");
    let doomed = server.backend.add_task(&uid, "doomed", false);
    server.backend.add_task(&uid, "survivor", true);

    let cookie = server.login().await;
    let ticket = server.ws_ticket(&cookie).await;
    let mut ws = connect_ws(&server, &ticket).await;

    let connected = recv_json(&mut ws).await;
    assert_eq!(connected["type"], "connected");
    assert_eq!(connected["email"], TEST_ADMIN_EMAIL);

    ws.send(WsMessage::text(
        serde_json::json!({ "type": "select_user", "user_id": uid }).to_string(),
    ))
    .await
    .expect("send select");

    let selected = recv_json(&mut ws).await;
    assert_eq!(selected["type"], "selected");

    let snapshot = recv_json(&mut ws).await;
    assert_eq!(snapshot["type"], "tasks");
    assert_eq!(snapshot["tasks"].as_array().expect("tasks array").len(), 2);

    ws.send(WsMessage::text(
        serde_json::json!({ "type": "delete_task", "task_id": doomed }).to_string(),
    ))
    .await
    .expect("send delete");

    let deleted = recv_json(&mut ws).await;
    assert_eq!(deleted["type"], "task_deleted");

    let after = recv_json(&mut ws).await;
    assert_eq!(after["type"], "tasks");
    let remaining = after["tasks"].as_array().expect("tasks array");
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0]["title"], "survivor");
}

#[tokio::test]
async fn ws_ticket_is_rejected_on_reuse() {
    let server = TestServer::spawn().await;
    let cookie = server.login().await;
    let ticket = server.ws_ticket(&cookie).await;

    let _ws = connect_ws(&server, &ticket).await;
    let url = format!("ws://{}/api/ws?ticket={ticket}", server.addr);
    let err = tokio_tungstenite::connect_async(url).await;
    assert!(err.is_err(), "a consumed ticket must not authenticate again");
}

#[tokio::test]
async fn logout_closes_the_live_connection() {
    let server = TestServer::spawn().await;
    let cookie = server.login().await;
    let ticket = server.ws_ticket(&cookie).await;
    let mut ws = connect_ws(&server, &ticket).await;
    let _ = recv_json(&mut ws).await; // connected

    let resp = server
        .client
        .post(server.url("/api/auth/logout"))
        .header("cookie", &cookie)
        .send()
        .await
        .expect("logout request");
    assert_eq!(resp.status(), 204);

    // The revocation push must terminate the stream.
    let end = timeout(Duration::from_secs(2), async {
        loop {
            match ws.next().await {
                None => break,
                Some(Ok(WsMessage::Close(_))) => break,
                Some(Ok(_)) => {}
                Some(Err(_)) => break,
            }
        }
    })
    .await;
    assert!(end.is_ok(), "connection should close after logout");
}
