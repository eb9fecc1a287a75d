use std::path::PathBuf;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use reqwest::cookie::Jar;
use scores::export::{scores_csv, sort_scores};
use scores::report::{number_fr, stat_cards};
use scores::{LoginForm, ScoreForm, ScoreLoader, ScoreView, ScoresClient, ScoresError, SortDirection, SortField, TableSort, ValidationError};
use serde_json::Value;
use session::config::{DEFAULT_API_URL, DEFAULT_REFRESH_INTERVAL_SECS, DEFAULT_SITE_URL};
use session::{AuthContext, AuthError, ConfigError, FileStorage, Navigator, SessionConfig, SessionEvent, SessionService, TokenStore};
use tracing_subscriber::EnvFilter;

const DEFAULT_TOKEN_FILE: &str = ".salary-session.json";
/// Location reported to the session layer; expired sessions point back here.
const CLI_LOCATION: &str = "/admin/dashboard";

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error(transparent)]
    Scores(#[from] ScoresError),
    #[error("not signed in; run `salary-cli login` first")]
    NotSignedIn,
    #[error("invalid input: {0}")]
    Invalid(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid JSON payload: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<Vec<ValidationError>> for CliError {
    fn from(errors: Vec<ValidationError>) -> Self {
        let joined = errors.iter().map(ToString::to_string).collect::<Vec<_>>().join("; ");
        Self::Invalid(joined)
    }
}

#[derive(Parser, Debug)]
#[command(name = "salary-cli", about = "Salary coherence scoring and admin CLI")]
struct Cli {
    #[arg(long, env = "API_URL", default_value = DEFAULT_API_URL)]
    api_url: String,

    #[arg(long, env = "SITE_URL", default_value = DEFAULT_SITE_URL)]
    site_url: String,

    /// Where the signed-in session is kept between runs.
    #[arg(long, env = "SALARY_TOKEN_FILE", default_value = DEFAULT_TOKEN_FILE)]
    token_file: PathBuf,

    #[arg(long, env = "AUTH_REFRESH_INTERVAL_SECS", default_value_t = DEFAULT_REFRESH_INTERVAL_SECS)]
    refresh_interval_secs: u64,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Sign in as an admin.
    Login(LoginArgs),
    Logout,
    /// Resolve the stored session, renewing it once if expired.
    Status,
    /// Submit a salary for scoring.
    Analyze(AnalyzeArgs),
    Scores(ScoresCommand),
    /// Stay signed in, refreshing in the background until Ctrl-C.
    Watch,
}

#[derive(Args, Debug)]
struct LoginArgs {
    #[arg(long, env = "ADMIN_EMAIL")]
    email: String,
    #[arg(long, env = "ADMIN_PASSWORD", hide_env_values = true)]
    password: String,
}

#[derive(Args, Debug)]
struct AnalyzeArgs {
    #[arg(long)]
    location: String,
    #[arg(long)]
    compensation: String,
    #[arg(long)]
    total_xp: String,
    #[arg(long)]
    email: String,
    #[arg(long)]
    company_xp: Option<String>,
    #[arg(long, default_value_t = false)]
    consent: bool,
}

#[derive(Args, Debug)]
struct ScoresCommand {
    #[command(subcommand)]
    command: ScoresSubcommand,
}

#[derive(Subcommand, Debug)]
enum ScoresSubcommand {
    /// All submitted scores (admin).
    List {
        #[arg(long, default_value = "createdAt")]
        sort: SortField,
        #[arg(long, default_value = "desc")]
        dir: SortDirection,
    },
    /// Headline figures (admin).
    Stats,
    /// CSV export of all scores (admin).
    Export {
        #[arg(long, help = "Output file, stdout when omitted")]
        output: Option<PathBuf>,
    },
    /// One score breakdown. Ctrl-C cancels the fetch.
    Get { id: String },
    /// Previous submissions for an email.
    Lookup { email: String },
}

/// There is no page to move to; an expired session is reported instead.
struct TerminalNavigator;

impl Navigator for TerminalNavigator {
    fn current_location(&self) -> String {
        CLI_LOCATION.to_owned()
    }

    fn navigate(&self, location: &str) {
        tracing::warn!(%location, "session expired; sign in again with `salary-cli login`");
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let session = build_session(&cli)?;
    let client = ScoresClient::from_config(session.config())?;

    match cli.command {
        Command::Login(args) => run_login(&session, args).await,
        Command::Logout => {
            session.logout().await;
            println!("signed out");
            Ok(())
        }
        Command::Status => run_status(session, &cli.token_file).await,
        Command::Analyze(args) => run_analyze(&client, &session, args).await,
        Command::Scores(scores) => run_scores(&client, &session, scores).await,
        Command::Watch => run_watch(session).await,
    }
}

fn build_session(cli: &Cli) -> Result<SessionService, CliError> {
    let mut config = SessionConfig::new(&cli.api_url, &cli.site_url)?;
    config.refresh_interval = std::time::Duration::from_secs(cli.refresh_interval_secs);
    let store = TokenStore::new(
        Arc::new(FileStorage::new(&cli.token_file)),
        Arc::new(Jar::default()),
        config.site_url.clone(),
    );
    Ok(SessionService::new(config, store, Arc::new(TerminalNavigator))?)
}

fn require_token(session: &SessionService) -> Result<(), CliError> {
    if session.token_store().get_token().is_none() {
        return Err(CliError::NotSignedIn);
    }
    Ok(())
}

async fn run_login(session: &SessionService, args: LoginArgs) -> Result<(), CliError> {
    let form = LoginForm { email: args.email, password: args.password, redirect: None };
    let credentials = form.validate()?;
    let token = session.login(&credentials).await?;
    println!("signed in (expires in {}s)", token.expires_in);
    Ok(())
}

async fn run_status(session: SessionService, token_file: &std::path::Path) -> Result<(), CliError> {
    let context = AuthContext::new(session);
    let state = context.init().await;
    print_json(&serde_json::json!({
        "authenticated": state.is_authenticated,
        "token_file": token_file.display().to_string(),
    }))
}

async fn run_analyze(client: &ScoresClient, session: &SessionService, args: AnalyzeArgs) -> Result<(), CliError> {
    let form = ScoreForm {
        location: args.location,
        compensation: args.compensation,
        total_xp: args.total_xp,
        email: args.email,
        company_xp: args.company_xp.unwrap_or_default(),
        consent: args.consent.then(|| "on".to_owned()),
    };
    let input = form.validate()?;
    let created = client.analyze(&input).await?;
    let mut url = session.config().site_url.clone();
    url.set_path(&format!("/scores/{}", created.id));
    println!("{}\t{url}", created.id);
    Ok(())
}

async fn run_scores(client: &ScoresClient, session: &SessionService, scores: ScoresCommand) -> Result<(), CliError> {
    match scores.command {
        ScoresSubcommand::List { sort, dir } => {
            require_token(session)?;
            let mut all = client.all(session).await?;
            sort_scores(&mut all, TableSort { field: sort, direction: dir });
            print_json(&serde_json::to_value(&all)?)
        }
        ScoresSubcommand::Stats => {
            require_token(session)?;
            let stats = client.stats(session).await?;
            for card in stat_cards(&stats) {
                println!("{}: {}", card.title, card.value);
            }
            Ok(())
        }
        ScoresSubcommand::Export { output } => {
            require_token(session)?;
            let all = client.all(session).await?;
            let csv = scores_csv(&all);
            match output {
                Some(path) => {
                    std::fs::write(&path, csv)?;
                    eprintln!("wrote {} rows to {}", all.len(), path.display());
                }
                None => println!("{csv}"),
            }
            Ok(())
        }
        ScoresSubcommand::Get { id } => {
            let loader = ScoreLoader::new(client.clone());
            let load = loader.load(&id);
            tokio::pin!(load);
            let record = tokio::select! {
                outcome = &mut load => outcome?,
                _ = tokio::signal::ctrl_c() => {
                    loader.cancel();
                    load.await?
                }
            };
            println!("{}", render_view(&ScoreView::from_output(&record.output)));
            Ok(())
        }
        ScoresSubcommand::Lookup { email } => {
            let matches = client.by_email(&email).await?;
            let rows: Vec<Value> = matches
                .iter()
                .map(|m| serde_json::json!({ "id": m.id, "input": m.input }))
                .collect();
            print_json(&Value::Array(rows))
        }
    }
}

async fn run_watch(session: SessionService) -> Result<(), CliError> {
    let mut events = session.subscribe();
    let context = AuthContext::new(session);
    if !context.init().await.is_authenticated {
        return Err(CliError::NotSignedIn);
    }
    let mut state = context.subscribe();
    eprintln!("session active; refreshing in the background (Ctrl-C to stop)");

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => return Ok(()),
            event = events.recv() => {
                if let Ok(SessionEvent::Refreshed) = event {
                    tracing::info!("session refreshed");
                }
            }
            changed = state.changed() => {
                if changed.is_err() || !state.borrow_and_update().is_authenticated {
                    return Err(AuthError::SessionExpired.into());
                }
            }
        }
    }
}

fn render_view(view: &ScoreView) -> String {
    let mut lines = vec![
        view.title.clone(),
        view.description.clone(),
        format!(
            "score: {}/10 (average {}/10)",
            number_fr(view.user_score10),
            number_fr(view.mean_score10)
        ),
        format!("gap: {} vs expected {}, {} ({})", view.gap.actual, view.gap.predicted, view.gap.difference, view.gap.comment),
        format!("position: {} (percentile {})", view.rank_label, number_fr(view.percentile)),
    ];
    if let Some(advice) = &view.advice {
        lines.push(format!("advice: {advice}"));
    }
    lines.join("\n")
}

fn print_json(value: &Value) -> Result<(), CliError> {
    let rendered = serde_json::to_string_pretty(value)?;
    println!("{rendered}");
    Ok(())
}

#[cfg(test)]
#[path = "main_test.rs"]
mod tests;
