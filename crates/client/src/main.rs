//! livechat-tail - follow a chat session from the terminal
//!
//! Opens the realtime channel for a session and prints merchant messages,
//! connection status changes and queued errors until Ctrl-C.
//!
//! The session id comes from the first argument or `LIVECHAT_SESSION_ID`;
//! without one a new session is started through the API.

use anyhow::Context;
use livechat_client::{logging, LiveChat, WidgetConfig};
use livechat_shared::SessionId;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init_tracing("livechat_client=info");

    let config = WidgetConfig::from_env().context("invalid LIVECHAT_* configuration")?;
    let chat = LiveChat::native(config);

    let session = match std::env::args()
        .nth(1)
        .or_else(|| std::env::var("LIVECHAT_SESSION_ID").ok())
    {
        Some(id) => {
            let session = SessionId::new(id);
            chat.attach_session(session.clone());
            session
        }
        None => chat
            .start_session()
            .await
            .map_err(|e| anyhow::anyhow!("{}: {}", e.message, e.detail))
            .context("could not start a chat session")?,
    };
    println!("session {session}");

    let mut status = chat.state().watch_status();
    let mut messages = chat.state().subscribe_messages();
    let mut errors = chat.errors().subscribe();

    chat.set_widget_open(true);
    if let Err(e) = chat.load_history().await {
        tracing::warn!(error = %e.detail, "history unavailable");
    }
    for message in chat.state().messages().messages() {
        println!("[{}] {:?}: {}", message.created_at, message.sender, message.text);
    }

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            changed = status.changed() => {
                if changed.is_err() {
                    break;
                }
                let current = *status.borrow_and_update();
                println!("-- {current}");
            }
            Ok(message) = messages.recv() => {
                println!("[{}] {:?}: {}", message.created_at, message.sender, message.text);
            }
            Ok(error) = errors.recv() => {
                eprintln!("!! {} ({}): {} [{}]", error.message, error.code, error.detail, error.action_label());
            }
        }
    }

    chat.shutdown();
    Ok(())
}
