use crate::console::{render_pairs, render_table};
use crate::context::AppContext;
use anyhow::{bail, Result};
use clap::{Subcommand, ValueEnum};
use datavibe_core::models::{
    ApprovalRequest, AuditLogQuery, CreateSessionRequest, Environment, ExecuteQueryRequest,
    QueryPreviewRequest, RejectionRequest, SchemaProposalRequest, TestConnectionRequest,
};
use std::io::Write;

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Create an account with the identity provider.
    Signup {
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Sign in with email and password.
    Login {
        email: String,
        #[arg(long)]
        password: String,
    },
    Logout,
    /// Send a password reset email.
    ResetPassword { email: String },
    /// Show the signed-in user as seen locally and by the backend.
    Whoami,
    /// Check that a database is reachable without opening a session.
    TestConnection {
        connection_string: String,
        #[arg(long, default_value = "Test Connection")]
        name: String,
    },
    /// Open a database session.
    Connect {
        connection_string: String,
        #[arg(long)]
        name: Option<String>,
    },
    Sessions,
    Disconnect { session_id: String },
    /// Translate a question to SQL, optionally running it.
    Ask {
        session_id: String,
        prompt: String,
        #[arg(long)]
        execute: bool,
        /// Run this SQL instead of the generated statement.
        #[arg(long, requires = "execute")]
        sql: Option<String>,
    },
    Providers,
    /// Propose a schema change described in natural language.
    Propose {
        session_id: String,
        description: String,
        #[arg(long, value_enum, default_value_t = Target::Development)]
        environment: Target,
    },
    /// List schema proposals, or show one.
    Proposals { proposal_id: Option<String> },
    Approve {
        proposal_id: String,
        #[arg(long)]
        execute_now: bool,
        #[arg(long)]
        session: Option<String>,
    },
    Reject {
        proposal_id: String,
        #[arg(long)]
        reason: String,
    },
    /// Show audit logs, optionally for one session, or summary statistics.
    Audit {
        #[arg(long)]
        limit: Option<u32>,
        #[arg(long)]
        event_type: Option<String>,
        #[arg(long, conflicts_with_all = ["limit", "event_type"])]
        session: Option<String>,
        #[arg(long, conflicts_with = "session")]
        stats: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Target {
    Development,
    Production,
}

impl From<Target> for Environment {
    fn from(target: Target) -> Self {
        match target {
            Target::Development => Environment::Development,
            Target::Production => Environment::Production,
        }
    }
}

pub async fn run(command: Command, ctx: &AppContext, out: &mut dyn Write) -> Result<()> {
    match command {
        Command::Signup { email, password } => {
            match ctx.auth.sign_up(&email, &password).await.into_session()? {
                Some(session) => {
                    writeln!(out, "Signed up and signed in as {}", session.user.id)?
                }
                None => writeln!(out, "Check {email} to confirm your account")?,
            }
        }
        Command::Login { email, password } => {
            ctx.auth.sign_in(&email, &password).await.into_result()?;
            let user = ctx.auth.user().map(|user| user.id).unwrap_or_default();
            writeln!(out, "Signed in as {user}")?;
        }
        Command::Logout => {
            ctx.auth.sign_out().await.into_result()?;
            writeln!(out, "Signed out")?;
        }
        Command::ResetPassword { email } => {
            ctx.auth.reset_password(&email).await.into_result()?;
            writeln!(out, "Password reset email sent to {email}")?;
        }
        Command::Whoami => whoami(ctx, out).await?,
        Command::TestConnection {
            connection_string,
            name,
        } => {
            let result = ctx
                .api
                .test_connection(&TestConnectionRequest {
                    connection_string,
                    name,
                })
                .await?;
            let mut pairs = vec![
                ("success", result.success.to_string()),
                ("message", result.message),
            ];
            if let Some(provider) = result.provider {
                pairs.push(("provider", provider));
            }
            out.write_all(render_pairs(&pairs).as_bytes())?;
        }
        Command::Connect {
            connection_string,
            name,
        } => {
            let mut request = CreateSessionRequest::new(connection_string);
            if let Some(name) = name {
                request = request.with_name(name);
            }
            let created = ctx.api.create_session(&request).await?;
            if !created.success {
                bail!("{}", created.message);
            }
            writeln!(out, "Session {}", created.session_id)?;
        }
        Command::Sessions => {
            let sessions = ctx.api.list_sessions().await?;
            if sessions.is_empty() {
                writeln!(out, "No active sessions")?;
            }
            for session in sessions {
                writeln!(
                    out,
                    "{}  {}  {}",
                    session.session_id,
                    session.provider.as_deref().unwrap_or("-"),
                    session.created_at.as_deref().unwrap_or("-"),
                )?;
            }
        }
        Command::Disconnect { session_id } => {
            let closed = ctx.api.destroy_session(&session_id).await?;
            writeln!(out, "{}", closed.message)?;
        }
        Command::Ask {
            session_id,
            prompt,
            execute,
            sql,
        } => ask(ctx, out, session_id, prompt, execute, sql).await?,
        Command::Providers => {
            let info = ctx.api.providers_info().await?;
            writeln!(out, "{}", serde_json::to_string_pretty(&info)?)?;
        }
        Command::Propose {
            session_id,
            description,
            environment,
        } => {
            let response = ctx
                .api
                .propose_schema_change(&SchemaProposalRequest {
                    natural_language: description,
                    session_id,
                    environment: environment.into(),
                })
                .await?;
            if !response.success {
                bail!(
                    "{}",
                    response.message.unwrap_or_else(|| "Proposal failed".into())
                );
            }
            if let Some(id) = &response.proposal_id {
                writeln!(out, "Proposal {id}")?;
            }
            if let Some(sql) = &response.migration_sql {
                writeln!(out, "{sql}")?;
            }
            for warning in &response.warnings {
                writeln!(out, "warning: {warning}")?;
            }
        }
        Command::Proposals { proposal_id } => match proposal_id {
            Some(id) => {
                let detail = ctx.api.schema_proposal(&id).await?;
                let proposal = detail.proposal;
                let pairs = vec![
                    ("id", proposal.id),
                    ("status", proposal.status.unwrap_or_default()),
                    ("environment", proposal.environment.unwrap_or_default()),
                    ("request", proposal.natural_language.unwrap_or_default()),
                    ("sql", proposal.migration_sql.unwrap_or_default()),
                ];
                out.write_all(render_pairs(&pairs).as_bytes())?;
            }
            None => {
                let list = ctx.api.list_schema_proposals().await?;
                for proposal in list.proposals {
                    writeln!(
                        out,
                        "{}  {}  {}",
                        proposal.id,
                        proposal.status.as_deref().unwrap_or("-"),
                        proposal.natural_language.as_deref().unwrap_or(""),
                    )?;
                }
            }
        },
        Command::Approve {
            proposal_id,
            execute_now,
            session,
        } => {
            let decision = ctx
                .api
                .approve_proposal(
                    &proposal_id,
                    &ApprovalRequest {
                        execute_immediately: execute_now,
                        session_id: session,
                    },
                )
                .await?;
            writeln!(
                out,
                "{}",
                decision.message.unwrap_or_else(|| "Approved".into())
            )?;
        }
        Command::Reject {
            proposal_id,
            reason,
        } => {
            let decision = ctx
                .api
                .reject_proposal(&proposal_id, &RejectionRequest { reason })
                .await?;
            writeln!(
                out,
                "{}",
                decision.message.unwrap_or_else(|| "Rejected".into())
            )?;
        }
        Command::Audit {
            limit,
            event_type,
            session,
            stats,
        } => {
            if stats {
                let statistics = ctx.api.audit_statistics().await?;
                writeln!(
                    out,
                    "{}",
                    serde_json::to_string_pretty(&statistics.statistics)?
                )?;
                return Ok(());
            }
            let logs = match session {
                Some(session_id) => ctx.api.session_audit_logs(&session_id).await?,
                None => {
                    ctx.api
                        .audit_logs(&AuditLogQuery { limit, event_type })
                        .await?
                }
            };
            for entry in logs.logs {
                writeln!(
                    out,
                    "{}  {}  {}",
                    entry.timestamp.as_deref().unwrap_or("-"),
                    entry.event_type,
                    entry.user_id.as_deref().unwrap_or("-"),
                )?;
            }
        }
    }
    Ok(())
}

async fn whoami(ctx: &AppContext, out: &mut dyn Write) -> Result<()> {
    match ctx.auth.user() {
        Some(user) => writeln!(
            out,
            "Local session: {} ({})",
            user.id,
            user.email.as_deref().unwrap_or("no email")
        )?,
        None => writeln!(out, "Local session: not signed in")?,
    }
    let status = ctx.api.auth_status().await?;
    writeln!(out, "Backend auth: {}", status.message)?;
    if ctx.auth.session().is_none() {
        return Ok(());
    }
    let profile = ctx.api.current_user().await?;
    let probe = ctx.api.test_protected().await?;
    let pairs = vec![
        ("user", profile.user_id),
        ("email", profile.email.unwrap_or_default()),
        ("role", profile.role.unwrap_or_default()),
        ("protected", probe.message),
    ];
    out.write_all(render_pairs(&pairs).as_bytes())?;
    Ok(())
}

async fn ask(
    ctx: &AppContext,
    out: &mut dyn Write,
    session_id: String,
    prompt: String,
    execute: bool,
    sql: Option<String>,
) -> Result<()> {
    let preview = ctx
        .api
        .preview_query(&QueryPreviewRequest {
            session_id: session_id.clone(),
            prompt,
        })
        .await?;
    writeln!(out, "{}", preview.sql_generated)?;
    if !preview.explanation.is_empty() {
        writeln!(out, "-- {}", preview.explanation)?;
    }
    writeln!(out, "-- confidence {:.0}%", preview.confidence * 100.0)?;
    for warning in &preview.warnings {
        writeln!(out, "warning: {warning}")?;
    }
    if !execute {
        return Ok(());
    }

    let mut request = ExecuteQueryRequest::confirmed(session_id, &preview);
    if let Some(sql) = sql {
        request = request.with_sql(sql);
    }
    let result = ctx.api.execute_query(&request).await?;
    if !result.success {
        bail!("{}", result.explanation);
    }
    out.write_all(render_table(&result.columns, &result.data).as_bytes())?;
    writeln!(out, "({} rows)", result.row_count)?;
    Ok(())
}
