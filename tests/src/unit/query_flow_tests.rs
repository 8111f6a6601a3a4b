use super::{test_runtime, Harness};
use datavibe_core::identity::{AuthSession, MockIdentityProvider, User};
use datavibe_core::models::{CreateSessionRequest, ExecuteQueryRequest, QueryPreviewRequest};
use datavibe_core::{ErrorKind, HttpResponse};
use serde_json::{json, Value};

fn body_of(request: &datavibe_core::HttpRequest) -> Value {
    serde_json::from_str(request.body.as_deref().expect("body")).expect("json body")
}

#[test]
fn connect_preview_execute() {
    let runtime = test_runtime();
    let harness = Harness::new(
        MockIdentityProvider::new()
            .with_session(AuthSession::new("T", User::new("u1", "a@b.com"))),
    );
    harness
        .transport
        .push_json(
            200,
            &json!({"session_id": "s-42", "success": true, "message": "Connected"}),
        )
        .push_json(
            200,
            &json!({
                "query_id": "q-7",
                "sql_generated": "SELECT count(*) FROM orders",
                "explanation": "Counts orders",
                "warnings": ["Full table scan"],
                "confidence": 0.75
            }),
        )
        .push_json(
            200,
            &json!({
                "success": true,
                "data": [{"count": 12}],
                "columns": ["count"],
                "row_count": 1,
                "explanation": "There are 12 orders",
                "follow_up_suggestions": ["Group by month"]
            }),
        );

    let result = runtime.block_on(async {
        let _guard = harness.auth.mount().await;
        let created = harness
            .api
            .create_session(
                &CreateSessionRequest::new("postgresql://localhost/shop").with_name("shop"),
            )
            .await
            .expect("create session");
        let preview = harness
            .api
            .preview_query(&QueryPreviewRequest {
                session_id: created.session_id.clone(),
                prompt: "how many orders?".into(),
            })
            .await
            .expect("preview");
        harness
            .api
            .execute_query(&ExecuteQueryRequest::confirmed(
                created.session_id,
                &preview,
            ))
            .await
            .expect("execute")
    });

    assert_eq!(result.row_count, 1);
    assert_eq!(result.data[0]["count"], json!(12));

    let requests = harness.transport.requests();
    let urls: Vec<&str> = requests.iter().map(|r| r.url.as_str()).collect();
    assert_eq!(
        urls,
        vec![
            "https://api.test/sessions/create",
            "https://api.test/query/preview",
            "https://api.test/query/execute",
        ]
    );
    assert!(requests
        .iter()
        .all(|r| r.header("Authorization") == Some("Bearer T")));
    assert_eq!(
        body_of(&requests[0]),
        json!({"connection_string": "postgresql://localhost/shop", "name": "shop"})
    );
    assert_eq!(
        body_of(&requests[1]),
        json!({"session_id": "s-42", "prompt": "how many orders?"})
    );
    assert_eq!(
        body_of(&requests[2]),
        json!({
            "session_id": "s-42",
            "query_id": "q-7",
            "sql_query": "SELECT count(*) FROM orders",
            "confirm_execution": true
        })
    );
}

#[test]
fn failures_keep_their_kind_and_message() {
    let runtime = test_runtime();
    let harness = Harness::new(MockIdentityProvider::new());
    harness
        .transport
        .push_failure("connection refused")
        .push_response(HttpResponse::new(502, "<html>bad gateway</html>"))
        .push_json(401, &json!({"detail": "Invalid or expired token"}));

    runtime.block_on(async {
        let _guard = harness.auth.mount().await;

        let err = harness.api.list_sessions().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Transport);
        assert_eq!(err.message(), "connection refused");

        let err = harness.api.list_sessions().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Status);
        assert_eq!(err.message(), "HTTP 502: Bad Gateway");

        let err = harness.api.current_user().await.unwrap_err();
        assert!(err.is_unauthorized());
        assert_eq!(err.message(), "Invalid or expired token");
    });
}
