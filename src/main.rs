use clap::{Args as ClapArgs, Parser, Subcommand};
use color_eyre::{eyre::eyre, Result};
use orgdash::api::{CollectingNotifier, Notification};
use orgdash::cache::{CacheResult, CacheSource};
use orgdash::config::Config;
use orgdash::dashboard::{Dashboard, Id, ListParams, Resource, SummaryPeriod, UploadFile};
use orgdash::error::ApiError;
use orgdash::logging;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

#[derive(Parser, Debug)]
#[command(name = "orgdash")]
#[command(about = "Command-line client for the organization dashboard")]
#[command(version)]
struct Args {
  /// Path to config file (default: ./orgdash.yaml, then $XDG_CONFIG_HOME/orgdash/config.yaml)
  #[arg(short, long, global = true)]
  config: Option<PathBuf>,

  /// Log debug output to stderr
  #[arg(short, long, global = true)]
  verbose: bool,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Log in and store the issued tokens
  Login {
    #[arg(long)]
    email: String,
    #[arg(long, env = "ORGDASH_PASSWORD", hide_env_values = true)]
    password: String,
  },
  /// End the session, locally even if the backend is unreachable
  Logout,
  /// Show whether a session is stored
  Status,
  Events {
    #[command(subcommand)]
    action: ResourceAction,
  },
  Members {
    #[command(subcommand)]
    action: ResourceAction,
  },
  News {
    #[command(subcommand)]
    action: ResourceAction,
  },
  /// Meeting minutes
  Minutes {
    #[command(subcommand)]
    action: ResourceAction,
  },
  Finance {
    #[command(subcommand)]
    action: FinanceAction,
  },
  /// Upload a file
  Upload {
    path: PathBuf,
    #[arg(long)]
    folder: Option<String>,
  },
}

#[derive(Subcommand, Debug)]
enum ResourceAction {
  List(ListArgs),
  Get {
    id: String,
  },
  Create {
    /// JSON body, or @path to read it from a file
    #[arg(long)]
    data: String,
  },
  Update {
    id: String,
    /// JSON body, or @path to read it from a file
    #[arg(long)]
    data: String,
  },
  Delete {
    id: String,
  },
}

#[derive(ClapArgs, Debug)]
struct ListArgs {
  #[arg(long, default_value_t = 1)]
  page: u32,
  #[arg(long, default_value_t = orgdash::dashboard::DEFAULT_PAGE_SIZE)]
  limit: u32,
  #[arg(long)]
  search: Option<String>,
  /// Extra query filter, e.g. --filter status=upcoming
  #[arg(long = "filter", value_parser = parse_key_value)]
  filters: Vec<(String, String)>,
  /// Walk every page instead of returning one
  #[arg(long)]
  all: bool,
}

#[derive(Subcommand, Debug)]
enum FinanceAction {
  #[command(flatten)]
  Transactions(ResourceAction),
  /// Income, expense and balance totals
  Summary {
    #[arg(long)]
    from: Option<String>,
    #[arg(long)]
    to: Option<String>,
  },
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();
  let config = Config::load(args.config.as_deref())?;

  let forced = args.verbose.then_some("orgdash=debug");
  let level = config.log.level.as_deref().unwrap_or("orgdash=warn");
  let _guard = logging::init(forced, level, config.log.dir.as_deref())?;

  let notifier = Arc::new(CollectingNotifier::new());
  let dashboard = Dashboard::from_config(&config, notifier.clone())?;

  let cancel = CancellationToken::new();
  let on_interrupt = cancel.clone();
  tokio::spawn(async move {
    if tokio::signal::ctrl_c().await.is_ok() {
      on_interrupt.cancel();
    }
  });

  let result = run(&dashboard, args.command, &cancel).await;
  report_notifications(&notifier);

  match result {
    Ok(output) => {
      println!("{}", serde_json::to_string_pretty(&output)?);
      Ok(())
    }
    Err(e) if is_cancelled(&e) => {
      eprintln!("Cancelled");
      std::process::exit(130);
    }
    Err(e) => Err(e),
  }
}

async fn run(dashboard: &Dashboard, command: Command, cancel: &CancellationToken) -> Result<Value> {
  match command {
    Command::Login { email, password } => {
      let outcome = dashboard.auth().login(&email, &password, cancel).await?;
      Ok(serde_json::to_value(outcome)?)
    }
    Command::Logout => {
      dashboard.auth().logout(cancel).await?;
      Ok(json!({ "logged_out": true }))
    }
    Command::Status => {
      let status = dashboard.auth().status();
      Ok(json!({ "api": dashboard.api().root(), "session": status }))
    }
    Command::Events { action } => run_resource(dashboard.events(), action, cancel).await,
    Command::Members { action } => run_resource(dashboard.members(), action, cancel).await,
    Command::News { action } => run_resource(dashboard.news(), action, cancel).await,
    Command::Minutes { action } => run_resource(dashboard.meeting_minutes(), action, cancel).await,
    Command::Finance { action } => match action {
      FinanceAction::Transactions(action) => {
        run_resource(dashboard.finance().transactions(), action, cancel).await
      }
      FinanceAction::Summary { from, to } => {
        let summary = dashboard
          .finance()
          .summary(&SummaryPeriod { from, to }, cancel)
          .await?;
        Ok(serde_json::to_value(summary)?)
      }
    },
    Command::Upload { path, folder } => {
      let file = UploadFile::from_path(&path).await?;
      let uploaded = dashboard
        .uploads()
        .upload(file, folder.as_deref(), cancel)
        .await?;
      Ok(serde_json::to_value(uploaded)?)
    }
  }
}

async fn run_resource<T>(
  resource: Resource<'_, T>,
  action: ResourceAction,
  cancel: &CancellationToken,
) -> Result<Value>
where
  T: DeserializeOwned + Serialize,
{
  match action {
    ResourceAction::List(args) => {
      let mut params = ListParams::default().page(args.page).limit(args.limit);
      if let Some(search) = args.search {
        params = params.search(search);
      }
      for (key, value) in args.filters {
        params = params.filter(key, value);
      }

      if args.all {
        return Ok(serde_json::to_value(resource.list_all(&params, cancel).await?)?);
      }

      let result = resource.list_cached(&params, cancel).await?;
      report_source(&result);
      Ok(serde_json::to_value(result.data)?)
    }
    ResourceAction::Get { id } => {
      let item = resource.get(&Id::from(id.as_str()), cancel).await?;
      Ok(serde_json::to_value(item)?)
    }
    ResourceAction::Create { data } => {
      let body = read_body(&data)?;
      let item = resource.create(&body, cancel).await?;
      Ok(serde_json::to_value(item)?)
    }
    ResourceAction::Update { id, data } => {
      let body = read_body(&data)?;
      let item = resource.update(&Id::from(id.as_str()), &body, cancel).await?;
      Ok(serde_json::to_value(item)?)
    }
    ResourceAction::Delete { id } => {
      resource.delete(&Id::from(id.as_str()), cancel).await?;
      Ok(json!({ "deleted": id }))
    }
  }
}

/// Inline JSON, or `@path` to a JSON file.
fn read_body(data: &str) -> Result<Value> {
  let text = match data.strip_prefix('@') {
    Some(path) => std::fs::read_to_string(Path::new(path))
      .map_err(|e| eyre!("Failed to read {}: {}", path, e))?,
    None => data.to_string(),
  };
  serde_json::from_str(&text).map_err(|e| eyre!("Invalid JSON body: {}", e))
}

fn parse_key_value(s: &str) -> std::result::Result<(String, String), String> {
  match s.split_once('=') {
    Some((key, value)) if !key.trim().is_empty() => {
      Ok((key.trim().to_string(), value.trim().to_string()))
    }
    _ => Err(format!("expected key=value, got {:?}", s)),
  }
}

fn report_source<T>(result: &CacheResult<T>) {
  match (result.source, result.cached_at) {
    (CacheSource::Offline, Some(cached_at)) => eprintln!(
      "Backend unreachable, showing data cached at {}",
      cached_at.format("%Y-%m-%d %H:%M:%S UTC")
    ),
    (CacheSource::Unavailable, _) => eprintln!("Backend unreachable and nothing cached"),
    _ => {}
  }
}

/// Print each distinct notification once; retries repeat them.
fn report_notifications(notifier: &CollectingNotifier) {
  let mut seen = Vec::new();
  for notification in notifier.drain() {
    if seen.contains(&notification) {
      continue;
    }
    match &notification {
      Notification::ServerError { status, message } => {
        eprintln!("Server error ({}): {}", status, message)
      }
      Notification::AuthFailed { .. } => {
        eprintln!("Session expired. Run `orgdash login` to sign in again.")
      }
    }
    seen.push(notification);
  }
}

fn is_cancelled(err: &color_eyre::Report) -> bool {
  err
    .downcast_ref::<ApiError>()
    .is_some_and(ApiError::is_cancelled)
}
