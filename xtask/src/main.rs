use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use datavibe_core::identity::{AuthSession, MockIdentityProvider, User};
use datavibe_core::models::{CreateSessionRequest, ExecuteQueryRequest, QueryPreviewRequest};
use datavibe_core::{
    telemetry, ApiClient, AuthBridge, ClientConfig, IdentityProvider, MockTransport,
    SessionStorage,
};
use serde_json::json;
use std::sync::Arc;
use tokio::runtime::Runtime;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "xtask", version, about = "Automation helpers for DataVibe")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the sign-in, preview and execute flow against in-process doubles.
    Smoke,
}

fn main() -> Result<()> {
    telemetry::init_tracing(EnvFilter::new("info"))?;
    let cli = Cli::parse();

    match cli.command {
        Commands::Smoke => smoke_test(),
    }
}

fn smoke_test() -> Result<()> {
    let runtime = Runtime::new()?;
    let transport = MockTransport::new();
    transport
        .push_json(200, &json!({"session_id": "smoke", "success": true, "message": "Connected"}))
        .push_json(
            200,
            &json!({
                "query_id": "q1",
                "sql_generated": "SELECT 1 AS one",
                "explanation": "Constant query",
                "warnings": [],
                "confidence": 1.0
            }),
        )
        .push_json(
            200,
            &json!({
                "success": true,
                "data": [{"one": 1}],
                "columns": ["one"],
                "row_count": 1,
                "explanation": "",
                "follow_up_suggestions": []
            }),
        );
    let provider = Arc::new(MockIdentityProvider::new());
    provider.will_sign_in(Ok(AuthSession::new(
        "smoke-token",
        User::new("smoke-user", "smoke@datavibe.test"),
    )));

    let storage = Arc::new(SessionStorage::new());
    let api = ApiClient::new(
        ClientConfig::default(),
        Arc::new(transport.clone()),
        storage.clone(),
    );
    let auth = AuthBridge::new(Some(provider as Arc<dyn IdentityProvider>), storage);

    let result = runtime.block_on(async {
        let _guard = auth.mount().await;
        auth.sign_in("smoke@datavibe.test", "smoke").await.into_result()?;
        let created = api
            .create_session(&CreateSessionRequest::new("sqlite://:memory:"))
            .await?;
        let preview = api
            .preview_query(&QueryPreviewRequest {
                session_id: created.session_id.clone(),
                prompt: "select one".into(),
            })
            .await?;
        let result = api
            .execute_query(&ExecuteQueryRequest::confirmed(created.session_id, &preview))
            .await?;
        anyhow::Ok(result)
    })?;

    let authorized = transport
        .requests()
        .iter()
        .all(|request| request.header("Authorization") == Some("Bearer smoke-token"));
    if !authorized {
        bail!("smoke requests were sent without the signed-in token");
    }
    info!(
        "requests" = transport.request_count(),
        "rows" = result.row_count,
        "smoke test flow completed"
    );

    Ok(())
}
