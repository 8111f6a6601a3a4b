use super::{test_runtime, Harness};
use datavibe::{run, AppContext, Command};
use datavibe_core::identity::{AuthSession, MockIdentityProvider, User};
use datavibe_core::{
    ApiClient, AuthBridge, ClientConfig, IdentityConfig, MockTransport, SessionFile,
    SessionStorage, TokenStore, TOKEN_STORAGE_KEY,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tempfile::TempDir;

fn session(token: &str) -> AuthSession {
    AuthSession::new(token, User::new("u1", "a@b.com"))
}

#[test]
fn sign_in_and_sign_out_drive_the_authorization_header() {
    let runtime = test_runtime();
    let harness = Harness::new(MockIdentityProvider::new());
    harness.provider.will_sign_in(Ok(session("T")));

    runtime.block_on(async {
        let _guard = harness.auth.mount().await;
        assert!(!harness.auth.loading());

        harness
            .auth
            .sign_in("a@b.com", "pw")
            .await
            .into_result()
            .expect("sign in");
        let _: Value = harness.api.get("/sessions").await.expect("list");
        let request = harness.transport.last_request().expect("request");
        assert_eq!(request.header("Authorization"), Some("Bearer T"));

        harness
            .auth
            .sign_out()
            .await
            .into_result()
            .expect("sign out");
        let _: Value = harness.api.get("/sessions").await.expect("list");
        let request = harness.transport.last_request().expect("request");
        assert!(!request.has_header("Authorization"));
    });
    assert_eq!(harness.storage.get_item(TOKEN_STORAGE_KEY), None);
}

#[test]
fn refreshed_token_is_used_by_the_next_request() {
    let runtime = test_runtime();
    let harness = Harness::new(MockIdentityProvider::new().with_session(session("old")));

    runtime.block_on(async {
        let _guard = harness.auth.mount().await;
        harness
            .provider
            .emit(datavibe_core::AuthEvent::new(
                datavibe_core::AuthEventKind::TokenRefreshed,
                Some(session("new")),
            ));
        let _: Value = harness.api.get("/auth/me").await.expect("me");
    });
    let request = harness.transport.last_request().expect("request");
    assert_eq!(request.header("Authorization"), Some("Bearer new"));
}

#[test]
fn persisted_session_is_restored_by_a_new_bridge() {
    let runtime = test_runtime();
    let dir = TempDir::new().expect("temp dir");
    let file = SessionFile::new(dir.path().join("session.json"));
    file.save(&session("saved").with_expiry(4_000_000_000))
        .expect("seed session file");

    let transport = MockTransport::new();
    let storage = SessionStorage::new();
    let identity = IdentityConfig::resolve(
        Some("https://demo.supabase.co".into()),
        Some("anon-key".into()),
    );
    let auth = AuthBridge::from_config(
        identity,
        Arc::new(transport.clone()),
        Arc::new(storage.clone()),
        Some(file),
    );
    let api = ApiClient::new(
        ClientConfig::default(),
        Arc::new(transport.clone()),
        Arc::new(storage.clone()),
    );

    runtime.block_on(async {
        let _guard = auth.mount().await;
        assert_eq!(auth.user().map(|user| user.id), Some("u1".to_string()));
        let _: Value = api.get("/auth/me").await.expect("me");
    });
    assert_eq!(storage.get_item(TOKEN_STORAGE_KEY).as_deref(), Some("saved"));
    let request = transport.last_request().expect("request");
    assert_eq!(request.url, "http://localhost:8000/auth/me");
    assert_eq!(request.header("Authorization"), Some("Bearer saved"));
}

#[test]
fn whoami_when_signed_out_only_asks_for_status() {
    let runtime = test_runtime();
    let harness = Harness::new(MockIdentityProvider::new());
    harness.transport.push_json(
        200,
        &json!({"configured": true, "supabase_url": "https://demo.supabase.co", "message": "Supabase authentication is configured"}),
    );

    let output = runtime.block_on(async {
        let ctx = AppContext::mount(harness.api.clone(), harness.auth.clone()).await;
        let mut out = Vec::new();
        run(Command::Whoami, &ctx, &mut out).await.expect("whoami");
        String::from_utf8(out).expect("utf8")
    });
    assert_eq!(
        output,
        "Local session: not signed in\nBackend auth: Supabase authentication is configured\n"
    );
    assert_eq!(harness.transport.request_count(), 1);
}
