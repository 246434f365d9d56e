//! Primary channel driver: bidirectional socket with client heartbeat.

use std::sync::Arc;

use livechat_shared::{parse_frame, ConnectionStatus, Frame, Probe, PING_TOKEN, PONG_TOKEN};

use super::channel::DriverContext;
use super::heartbeat::Heartbeat;
use super::reconnect::ReconnectPolicy;
use crate::transport::{SocketConnection, TransportError};

pub(crate) async fn run(ctx: Arc<DriverContext>, mut policy: ReconnectPolicy) {
    loop {
        if ctx.is_closed() {
            return;
        }
        ctx.set_status(ConnectionStatus::Connecting);

        let failure = match ctx.transports.open_socket(&ctx.url).await {
            Ok(mut socket) => {
                policy.reset();
                ctx.set_status(ConnectionStatus::Connected);
                tracing::info!(session = %ctx.session, transport = "websocket", "realtime channel connected");
                let failure = pump(&ctx, socket.as_mut()).await;
                tracing::info!(session = %ctx.session, transport = "websocket", "realtime channel dropped");
                failure
            }
            Err(e) => {
                tracing::warn!(
                    session = %ctx.session,
                    status = e.status(),
                    error = %e,
                    "websocket open failed"
                );
                Some(e)
            }
        };

        if !ctx.wait_before_retry(&mut policy, failure).await {
            return;
        }
    }
}

enum Step {
    Beat,
    Inbound(Option<Result<String, TransportError>>),
}

/// Drive one open socket until it closes. Returns the failure, or `None`
/// when the server closed cleanly.
async fn pump(ctx: &DriverContext, socket: &mut dyn SocketConnection) -> Option<TransportError> {
    let mut heartbeat = Heartbeat::start(ctx.heartbeat_interval);

    loop {
        let step = tokio::select! {
            _ = heartbeat.tick() => Step::Beat,
            inbound = socket.next_text() => Step::Inbound(inbound),
        };

        match step {
            Step::Beat => {
                tracing::trace!(session = %ctx.session, "heartbeat");
                if let Err(e) = socket.send_text(PING_TOKEN.to_string()).await {
                    return Some(e);
                }
            }
            Step::Inbound(None) => return None,
            Step::Inbound(Some(Err(e))) => return Some(e),
            Step::Inbound(Some(Ok(text))) => match parse_frame(&text) {
                Ok(Frame::Probe(Probe::Ping)) => {
                    if let Err(e) = socket.send_text(PONG_TOKEN.to_string()).await {
                        return Some(e);
                    }
                }
                Ok(Frame::Probe(Probe::Pong)) => {}
                Ok(Frame::Event(event)) => ctx.emit(event),
                Err(e) => {
                    tracing::warn!(session = %ctx.session, error = %e, "dropping inbound frame");
                }
            },
        }
    }
}
