//! meta-graph-doctor
//!
//! Command line front end: diagnoses a Meta app's WhatsApp, Page and Instagram
//! webhook setup, repairs subscriptions, and manages the stored credential set.

#![deny(clippy::all)]

use std::{
    path::PathBuf,
    process::ExitCode,
    sync::Arc,
    time::{Duration, SystemTime, UNIX_EPOCH},
};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use meta_graph_doctor::{
    client::{DEFAULT_API_VERSION, DEFAULT_BASE_URL},
    diagnose::{Diagnosis, Report, Severity},
    guard::{guard, Route},
    storage::{FileStorage, KeyValueStorage, MemoryStorage, UnavailableStorage},
    store::{ModeSwitch, Tiers},
    Client, CredentialStore, StorageMode,
};

#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
struct Config {
    /// Meta app ID
    #[arg(long, env = "META_APP_ID", global = true)]
    app_id: Option<String>,

    /// Meta app secret
    #[arg(long, env = "META_APP_SECRET", global = true, hide_env_values = true)]
    app_secret: Option<String>,

    /// User or system-user access token to diagnose
    #[arg(long, env = "META_ACCESS_TOKEN", global = true, hide_env_values = true)]
    token: Option<String>,

    /// Move the stored credentials to this tier before running the command
    #[arg(long, env = "META_STORAGE_MODE", global = true)]
    storage_mode: Option<StorageMode>,

    /// Local credential file, instead of the platform config directory
    #[arg(long, env = "META_STORAGE_FILE", global = true)]
    storage_file: Option<PathBuf>,

    /// Graph API version, with or without the leading "v"
    #[arg(long, env = "META_GRAPH_API_VERSION", global = true, default_value = DEFAULT_API_VERSION)]
    api_version: String,

    /// Graph API host
    #[arg(long, env = "META_GRAPH_BASE_URL", global = true, default_value = DEFAULT_BASE_URL)]
    base_url: String,

    /// Timeout in seconds for each Graph API call
    #[arg(long, env = "META_HTTP_TIMEOUT_SECS", global = true, default_value_t = 30)]
    timeout_secs: u64,

    /// Sign every call with appsecret_proof
    #[arg(long, env = "META_APPSECRET_PROOF", global = true)]
    appsecret_proof: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Diagnose the token, the app's webhooks, WABAs and Pages
    Check,

    /// Subscribe the app to a WhatsApp Business Account's webhooks
    SubscribeWaba {
        waba_id: String,
    },

    /// Subscribe the app to a Page's webhooks
    SubscribePage {
        page_id: String,
    },

    /// Show or manage the stored credential set
    Credentials {
        #[command(subcommand)]
        action: CredentialsAction,
    },
}

#[derive(Debug, Subcommand)]
enum CredentialsAction {
    /// Print the current credential set, secrets masked
    Show,
    /// Persist the current credential set into the active tier
    Save,
    /// Remove the credential set from every tier
    Forget,
    /// Move the credential set to another tier
    Mode { mode: StorageMode },
}

impl Config {
    fn tiers(&self) -> Tiers {
        let local: Arc<dyn KeyValueStorage> =
            match self.storage_file.clone().or_else(FileStorage::default_path) {
                Some(path) => Arc::new(FileStorage::new(path)),
                None => {
                    warn!("no config directory found, local storage disabled");
                    Arc::new(UnavailableStorage)
                }
            };

        Tiers::new(Arc::new(MemoryStorage::new()), local)
    }

    /// Values given on the command line or in the environment win over stored ones.
    fn apply_overrides(&self, store: &mut CredentialStore) {
        if let Some(app_id) = &self.app_id {
            store.set_app_id(app_id.as_str());
        }
        if let Some(app_secret) = &self.app_secret {
            store.set_app_secret(app_secret.as_str());
        }
        if let Some(token) = &self.token {
            store.set_token(token.as_str());
        }
    }

    fn client(&self, store: &CredentialStore) -> Result<Client> {
        let mut builder = Client::builder()
            .api_version(self.api_version.as_str())
            .base_url(self.base_url.as_str())
            .timeout(Duration::from_secs(self.timeout_secs));

        if self.appsecret_proof {
            builder = builder.app_secret(store.app_secret());
        }

        builder.build().context("failed to build the Graph API client")
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    init_logging();

    let config = Config::parse();
    let mut store = CredentialStore::open(config.tiers());
    config.apply_overrides(&mut store);

    if let Some(mode) = config.storage_mode {
        switch_mode(&mut store, mode)?;
    }

    match &config.command {
        Command::Check => {
            let client = ready_client(&config, &store)?;
            let report = Diagnosis::run(&client, store.credentials()).await;

            let now = unix_now()?;
            print_report(&report, now);
            if report.severity(now) == Severity::Error {
                return Ok(ExitCode::FAILURE);
            }
        }
        Command::SubscribeWaba { waba_id } => {
            let client = ready_client(&config, &store)?;
            client
                .waba(waba_id.as_str())
                .subscribe(store.token())
                .await
                .with_context(|| format!("failed to subscribe WABA {waba_id}"))?;
            println!("Subscribed the app to WABA {waba_id}");
        }
        Command::SubscribePage { page_id } => {
            let client = ready_client(&config, &store)?;
            let pages = client
                .me()
                .pages(store.token())
                .await
                .context("failed to list Pages")?;
            let Some(page) = pages.into_iter().find(|page| &page.id == page_id) else {
                bail!("Page {page_id} is not among the Pages this token can manage");
            };

            client
                .page(page.id.as_str())
                .subscribe(&page.access_token)
                .await
                .with_context(|| format!("failed to subscribe Page {page_id}"))?;
            println!("Subscribed the app to Page {} ({page_id})", page.name);
        }
        Command::Credentials { action } => credentials(&config, &mut store, action)?,
    }

    Ok(ExitCode::SUCCESS)
}

fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("meta_graph_doctor=info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn ready_client(config: &Config, store: &CredentialStore) -> Result<Client> {
    if guard(Route::Dashboard, store) == Route::Credentials {
        bail!(
            "credentials are incomplete: pass --app-id, --app-secret and --token \
             (or META_APP_ID, META_APP_SECRET, META_ACCESS_TOKEN), or save them first"
        );
    }
    config.client(store)
}

fn credentials(config: &Config, store: &mut CredentialStore, action: &CredentialsAction) -> Result<()> {
    match action {
        CredentialsAction::Show => {
            println!("app id:       {}", or_unset(store.app_id()));
            println!("app secret:   {}", mask(store.app_secret()));
            println!("access token: {}", mask(store.token()));
            println!("storage mode: {}", store.storage_mode());
            if let Some(path) = config.storage_file.clone().or_else(FileStorage::default_path) {
                println!("local file:   {}", path.display());
            }
            println!("ready:        {}", store.is_ready());
        }
        CredentialsAction::Save => {
            if store.storage_mode() == StorageMode::None {
                bail!("storage mode is none; choose a tier with `credentials mode session|local`");
            }
            store.save_to_storage();
            info!(tier = %store.storage_mode(), "credentials saved");
        }
        CredentialsAction::Forget => {
            store.clear();
            println!("Credentials removed from every tier");
        }
        CredentialsAction::Mode { mode } => switch_mode(store, *mode)?,
    }
    Ok(())
}

fn switch_mode(store: &mut CredentialStore, mode: StorageMode) -> Result<()> {
    match store.set_storage_mode(mode) {
        ModeSwitch::Unchanged => println!("Storage mode is already {mode}"),
        ModeSwitch::Switched => println!("Storage mode is now {mode}"),
        ModeSwitch::Aborted => bail!(
            "could not write the {mode} tier; credentials stay in {}",
            store.storage_mode()
        ),
    }
    Ok(())
}

fn print_report(report: &Report, now: i64) {
    if let Ok(token) = &report.token {
        println!("Token: {} for app {}", or_unset(&token.r#type), or_unset(&token.app_id));
        if !token.scopes.is_empty() {
            println!("Scopes: {}", token.scopes.join(", "));
        }
    }

    if let Ok(businesses) = &report.businesses {
        for business in businesses {
            let wabas = business.wabas.as_ref().map(Vec::len).unwrap_or_default();
            println!("Business {} ({}): {wabas} WABA(s)", business.business.name, business.business.id);
        }
    }
    if let Ok(pages) = &report.pages {
        println!("Pages: {}", pages.len());
    }

    println!();
    for finding in report.findings(now) {
        println!("{finding}");
    }
    println!();
    println!("Overall: {}", report.severity(now));
}

fn unix_now() -> Result<i64> {
    unix_seconds(SystemTime::now())
}

fn unix_seconds(time: SystemTime) -> Result<i64> {
    let elapsed = time
        .duration_since(UNIX_EPOCH)
        .context("system clock is before the UNIX epoch")?;
    i64::try_from(elapsed.as_secs()).context("system clock is out of range")
}

fn or_unset(value: &str) -> &str {
    if value.is_empty() {
        "(not set)"
    } else {
        value
    }
}

/// Keeps the first four characters of a secret.
fn mask(secret: &str) -> String {
    if secret.is_empty() {
        return "(not set)".to_owned();
    }
    let head: String = secret.chars().take(4).collect();
    format!("{head}********")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn masks_secrets() {
        assert_eq!(mask(""), "(not set)");
        assert_eq!(mask("EAABsecret"), "EAAB********");
        assert_eq!(mask("ab"), "ab********");
    }

    #[test]
    fn clock_conversion() {
        assert_eq!(unix_seconds(UNIX_EPOCH + Duration::from_secs(1_700_000_000)).unwrap(), 1_700_000_000);
        assert!(unix_seconds(UNIX_EPOCH - Duration::from_secs(1)).is_err());
        assert!(unix_now().unwrap() > 0);
    }

    #[test]
    fn parses_subcommands() {
        let config = Config::try_parse_from([
            "meta-graph-doctor",
            "--app-id",
            "1",
            "credentials",
            "mode",
            "local",
        ])
        .unwrap();

        assert_eq!(config.app_id.as_deref(), Some("1"));
        assert!(matches!(
            config.command,
            Command::Credentials {
                action: CredentialsAction::Mode {
                    mode: StorageMode::Local
                }
            }
        ));
    }

    #[test]
    fn overrides_win_over_stored_values() {
        let config = Config::try_parse_from([
            "meta-graph-doctor",
            "--token",
            "fresh",
            "check",
        ])
        .unwrap();
        let tiers = Tiers::new(Arc::new(MemoryStorage::new()), Arc::new(MemoryStorage::new()));
        let mut store = CredentialStore::open(tiers);
        store.set_app_id("1");
        store.set_token("stale");

        config.apply_overrides(&mut store);

        assert_eq!(store.app_id(), "1");
        assert_eq!(store.token(), "fresh");
    }
}
