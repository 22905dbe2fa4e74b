// Gateway command-line client
//
// Signs in, shows the current profile, or uploads a document and follows it
// through processing. Configuration comes from `GATEWAY_*` variables (a
// `.env` file is loaded first) and can be overridden by flags.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use futures::StreamExt;

use gateway_client::{
    ClientOptions, FailureCause, GatewayClient, GatewayError, UploadFile, UploadState, UserId,
};

#[derive(Parser, Debug)]
#[command(name = "gateway-client")]
#[command(version, about = "Command-line client for the document gateway", long_about = None)]
struct Cli {
    /// Backend origin
    #[arg(long, global = true, env = "GATEWAY_BASE_URL")]
    base_url: Option<String>,

    /// Account email; signs in before running the command
    #[arg(long, global = true, env = "GATEWAY_EMAIL")]
    email: Option<String>,

    /// Account password
    #[arg(long, global = true, env = "GATEWAY_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Sign in and print the profile
    Login,

    /// Print the signed-in profile
    Me,

    /// Upload a document and wait until it is processed
    Upload(UploadArgs),
}

#[derive(Args, Debug)]
struct UploadArgs {
    /// File to upload (pdf, docx, txt, md)
    path: PathBuf,

    /// Owner of the document; defaults to the signed-in user
    #[arg(long)]
    user_id: Option<u64>,

    /// Delay between status polls, in milliseconds
    #[arg(long)]
    interval_ms: Option<u64>,

    /// Give up after this many milliseconds
    #[arg(long)]
    timeout_ms: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env file is fine
    let _ = dotenvy::dotenv();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let mut options = ClientOptions::from_env().context("Invalid GATEWAY_* configuration")?;
    if let Some(url) = cli.base_url {
        options.base_url = url;
    }
    let client = GatewayClient::new(options)?;

    if let (Some(email), Some(password)) = (cli.email, cli.password) {
        client
            .login(email, password)
            .await
            .context("Sign-in failed")?;
    }

    match cli.command {
        Command::Login => {
            let Some(profile) = client.current_user() else {
                bail!("--email and --password (or GATEWAY_EMAIL / GATEWAY_PASSWORD) are required");
            };
            println!("Signed in as {} (user {})", profile.email, profile.id);
        }
        Command::Me => {
            let profile = client.fetch_me().await.context("Could not load profile")?;
            println!(
                "{} <{}> user {}{}",
                profile.full_name.as_deref().unwrap_or("-"),
                profile.email,
                profile.id,
                profile.role.map(|r| format!(" ({r})")).unwrap_or_default()
            );
        }
        Command::Upload(args) => upload(&client, args).await?,
    }

    Ok(())
}

async fn upload(client: &GatewayClient, args: UploadArgs) -> Result<()> {
    let user_id = match (args.user_id, client.current_user()) {
        (Some(id), _) => UserId::new(id),
        (None, Some(profile)) => profile.id,
        (None, None) => bail!("--user-id is required when not signed in"),
    };

    let mut poll = client.options().poll_options();
    if let Some(ms) = args.interval_ms {
        poll = poll.with_interval(Duration::from_millis(ms));
    }
    if let Some(ms) = args.timeout_ms {
        poll = poll.with_timeout(Duration::from_millis(ms));
    }

    let file = UploadFile::from_path(&args.path)
        .await
        .with_context(|| format!("Could not read {}", args.path.display()))?;
    let mut session = client.upload_with(file, user_id, poll)?;

    let mut progress = Box::pin(session.progress_stream());
    let mut state = session.watch_state();
    let reporter = tokio::spawn(async move {
        while let Some(pct) = progress.next().await {
            log::info!("Uploaded {pct}%");
        }
        while state.changed().await.is_ok() {
            let current = *state.borrow_and_update();
            if let UploadState::Polling { document_id } = current {
                log::info!("Document {document_id} accepted; waiting for processing");
            }
        }
    });

    let result = session.wait().await;
    reporter.abort();

    match result.and_then(|doc| doc.into_ready()) {
        Ok(doc) => {
            println!(
                "Document {} ready: {} page(s), {} chunk(s)",
                doc.id,
                doc.page_count.map_or_else(|| "?".to_string(), |p| p.to_string()),
                doc.chunks.len()
            );
            Ok(())
        }
        Err(e) => {
            eprintln!("{}", guidance(&e));
            Err(e.into())
        }
    }
}

/// What the user should do next for a failed upload
fn guidance(err: &GatewayError) -> &'static str {
    match err.failure_cause() {
        FailureCause::Timeout => {
            "The document is still processing. Check back later with its id."
        }
        FailureCause::Processing => "The backend could not process this file. Check the file and upload it again.",
        FailureCause::Transport => "The request failed. Check the connection and retry.",
        FailureCause::Auth => "Your session has ended. Sign in again.",
        FailureCause::Cancelled => "The upload was cancelled.",
    }
}
