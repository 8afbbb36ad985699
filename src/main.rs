//! daybrief CLI.
//!
//! Commands:
//!   auth            Run the Google OAuth consent flow and store tokens
//!   show            Print today's brief (generating it if absent)
//!   toggle <id>     Flip the completed flag on one brief item

use std::sync::Arc;

use daybrief::brief::{BriefAssembler, BriefStore};
use daybrief::config::AppConfig;
use daybrief::db::BriefDb;
use daybrief::error::BriefError;
use daybrief::google_api::auth::GoogleIdentity;
use daybrief::google_api::calendar::GoogleCalendarClient;
use daybrief::google_api::gmail::GmailClient;
use daybrief::google_api::{GoogleApiError, IdentityClient, TokenProvider, SCOPES};
use daybrief::intelligence::GeminiClient;
use daybrief::services::{CalendarSource, EmailSource};

/// Identity stand-in when no OAuth client is configured. Refresh attempts
/// fail with a typed error; stored tokens still work until they expire.
struct UnconfiguredIdentity;

#[async_trait::async_trait]
impl IdentityClient for UnconfiguredIdentity {
    async fn request_access_token(&self, _scopes: &[&str]) -> Result<String, GoogleApiError> {
        Err(GoogleApiError::NotConfigured)
    }
}

#[tokio::main]
async fn main() {
    env_logger::init();

    let args: Vec<String> = std::env::args().collect();
    let command = args.get(1).map(String::as_str).unwrap_or("show");

    let result = match command {
        "auth" => run_auth().await,
        "show" => run_show().await,
        "toggle" => match args.get(2) {
            Some(item_id) => run_toggle(item_id).await,
            None => {
                eprintln!("Usage: daybrief toggle <item-id>");
                std::process::exit(2);
            }
        },
        other => {
            eprintln!("Unknown command: {}", other);
            eprintln!("Usage: daybrief [auth | show | toggle <item-id>]");
            std::process::exit(2);
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        eprintln!("{}", e.recovery_suggestion());
        std::process::exit(1);
    }
}

fn identity_for(config: &AppConfig, refresh_token: Option<String>) -> Arc<dyn IdentityClient> {
    match GoogleIdentity::new(
        config.google_client_id.clone(),
        config.google_client_secret.clone(),
        refresh_token,
    ) {
        Ok(identity) => Arc::new(identity),
        Err(_) => Arc::new(UnconfiguredIdentity),
    }
}

fn build_store(config: &AppConfig, db: Arc<BriefDb>) -> Result<BriefStore, BriefError> {
    let refresh_token = db
        .get_user(config.user_id())?
        .and_then(|p| p.refresh_token);

    let tokens = Arc::new(TokenProvider::new(
        db.clone(),
        identity_for(config, refresh_token),
    ));
    let llm = Arc::new(GeminiClient::new(config.gemini_api_key.clone()));

    let emails = EmailSource::new(
        Arc::new(GmailClient::new()),
        tokens.clone(),
        db.clone(),
        config.important_senders.clone(),
    );
    let events = CalendarSource::new(
        Arc::new(GoogleCalendarClient::new()),
        tokens,
        db.clone(),
    );

    let assembler = Arc::new(BriefAssembler::new(emails, events, llm));
    Ok(BriefStore::new(db, assembler))
}

async fn run_auth() -> Result<(), BriefError> {
    let config = AppConfig::load();
    let db = Arc::new(BriefDb::open()?);

    let identity = GoogleIdentity::new(
        config.google_client_id.clone(),
        config.google_client_secret.clone(),
        None,
    )
    .map_err(|_| {
        BriefError::Config("googleClientId missing from ~/.daybrief/config.json".to_string())
    })?;

    let outcome = identity.run_consent_flow(SCOPES).await?;

    let user_id = config.user_id();
    db.upsert_user(user_id, Some(&outcome.email), None, None)?;
    db.save_access_token(user_id, &outcome.access_token)?;
    if let Some(ref refresh_token) = outcome.refresh_token {
        db.save_refresh_token(user_id, refresh_token)?;
    }

    println!("Connected as {}", outcome.email);
    Ok(())
}

async fn run_show() -> Result<(), BriefError> {
    let config = AppConfig::load();
    let db = Arc::new(BriefDb::open()?);

    if db.get_user(config.user_id())?.is_none() {
        return Err(BriefError::NotAuthenticated);
    }

    let store = build_store(&config, db)?;
    let brief = store.get_or_create(config.user_id()).await?;

    println!(
        "{}",
        serde_json::to_string_pretty(&brief).map_err(daybrief::db::DbError::from)?
    );
    Ok(())
}

async fn run_toggle(item_id: &str) -> Result<(), BriefError> {
    let config = AppConfig::load();
    let db = Arc::new(BriefDb::open()?);

    let store = build_store(&config, db)?;
    match store.toggle_item(config.user_id(), item_id)? {
        Some(brief) => println!(
            "{} of {} items completed",
            brief.completed_count, brief.total_count
        ),
        None => println!("No brief for today yet; run `daybrief show` first."),
    }
    Ok(())
}
