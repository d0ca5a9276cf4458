//! # parley-sim
//!
//! Scripted two-user run against the configured database: two client
//! instances sign up, link, exchange a text and a file, post a story, and
//! read each other's side.

use std::sync::Arc;

use parley_client::reply::{HttpReplyClient, NoReply};
use parley_client::{ClientConfig, SessionManager};
use parley_store::Database;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // -----------------------------------------------------------------------
    // 1. Initialize tracing (respects RUST_LOG env var)
    // -----------------------------------------------------------------------
    parley_client::init_tracing();

    info!(
        "Starting {} simulation v{}",
        parley_shared::constants::APP_NAME,
        env!("CARGO_PKG_VERSION")
    );

    // -----------------------------------------------------------------------
    // 2. Load configuration and open two handles on the same store
    // -----------------------------------------------------------------------
    let config = ClientConfig::from_env();
    info!(?config, "Loaded configuration");

    let shared: Arc<Database> = Arc::new(config.open_database()?);
    let mut ann = SessionManager::bootstrap(Arc::clone(&shared))?;
    if ann.current_account().is_some() {
        ann.log_out()?;
    }
    let mut bob = SessionManager::new(Arc::clone(&shared));

    // -----------------------------------------------------------------------
    // 3. Play the script
    // -----------------------------------------------------------------------
    let suffix = chrono::Utc::now().timestamp_millis();
    let ann_account = ann.sign_up(&format!("ann-{suffix}"), "secret")?;
    let bob_account = bob.sign_up(&format!("bob-{suffix}"), "secret")?;
    info!(ann = %ann_account.uid, bob = %bob_account.uid, "accounts created");

    ann.add_contact(bob_account.uid.as_str(), "Bob")?;
    ann.send_text(&bob_account.uid, "Hi Bob!")?;

    let sample = std::env::temp_dir().join(format!("parley-sample-{suffix}.txt"));
    tokio::fs::write(&sample, b"a small document").await?;
    ann.send_file(&bob_account.uid, &sample).await?;
    tokio::fs::remove_file(&sample).await?;

    let (_, reply) = match config.reply.clone() {
        Some(reply_config) => {
            let client = HttpReplyClient::new(reply_config);
            bob.send_text_with_reply(&ann_account.uid, "Hello Ann", &client)
                .await?
        }
        None => {
            bob.send_text_with_reply(&ann_account.uid, "Hello Ann", &NoReply)
                .await?
        }
    };
    if let Some(reply) = reply {
        info!(id = reply.id, "automated reply delivered");
    }

    ann.post_story("data:image/png;base64,iVBORw0KGgo=")?;

    // -----------------------------------------------------------------------
    // 4. Report what each side sees
    // -----------------------------------------------------------------------
    ann.refresh()?;
    bob.refresh()?;

    for (label, session) in [("ann", &ann), ("bob", &bob)] {
        for convo in session.conversations() {
            info!(
                side = label,
                counterpart = %convo.counterpart,
                messages = convo.messages.len(),
                last = %convo.last_message,
                "conversation"
            );
        }
    }
    let groups = bob.story_groups();
    info!(groups = groups.len(), "bob's story feed");

    Ok(())
}
