use clap::Parser;
use datavibe::{load_app_settings, run, AppContext, Command, Scope};
use datavibe_core::{telemetry, SessionFile};
use std::path::PathBuf;
use std::process::ExitCode;
use tokio::runtime::Runtime;

#[derive(Parser, Debug)]
#[command(name = "datavibe", version, about = "Ask your database questions in plain language")]
struct Cli {
    #[command(subcommand)]
    command: Command,
    /// Directory holding datavibe.yaml, instead of the user config directory.
    #[arg(long, global = true)]
    config_dir: Option<PathBuf>,
    /// Where the signed-in session is kept between runs.
    #[arg(long, global = true)]
    session_file: Option<PathBuf>,
}

fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    if let Err(err) = telemetry::init_tracing(telemetry::default_filter()) {
        eprintln!("warning: logging unavailable: {err}");
    }

    let cli = Cli::parse();
    match execute(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn execute(cli: Cli) -> anyhow::Result<()> {
    let runtime = Runtime::new()?;
    runtime.block_on(async move {
        let scope = cli
            .config_dir
            .map(Scope::Directory)
            .unwrap_or(Scope::User);
        let settings = load_app_settings(&scope).await?;
        let session_file = cli
            .session_file
            .map(SessionFile::new)
            .unwrap_or_else(SessionFile::default_location);
        let ctx = AppContext::from_settings(&settings, session_file).await?;
        let mut stdout = std::io::stdout();
        run(cli.command, &ctx, &mut stdout).await
    })
}
