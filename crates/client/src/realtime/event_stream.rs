//! Fallback channel driver: server-push stream, no client heartbeat.

use std::sync::Arc;

use livechat_shared::{parse_named_event, ConnectionStatus};

use super::channel::DriverContext;
use super::reconnect::ReconnectPolicy;
use crate::transport::{EventStream, TransportError};

pub(crate) async fn run(ctx: Arc<DriverContext>, mut policy: ReconnectPolicy) {
    loop {
        if ctx.is_closed() {
            return;
        }
        ctx.set_status(ConnectionStatus::Connecting);

        let failure = match ctx.transports.open_event_stream(&ctx.url).await {
            Ok(mut stream) => {
                policy.reset();
                ctx.set_status(ConnectionStatus::Connected);
                tracing::info!(session = %ctx.session, transport = "event_stream", "realtime channel connected");
                let failure = pump(&ctx, stream.as_mut()).await;
                tracing::info!(session = %ctx.session, transport = "event_stream", "realtime channel dropped");
                failure
            }
            Err(e) => {
                tracing::warn!(
                    session = %ctx.session,
                    status = e.status(),
                    error = %e,
                    "event stream open failed"
                );
                Some(e)
            }
        };

        if !ctx.wait_before_retry(&mut policy, failure).await {
            return;
        }
    }
}

async fn pump(ctx: &DriverContext, stream: &mut dyn EventStream) -> Option<TransportError> {
    while let Some(next) = stream.next_event().await {
        let sse = match next {
            Ok(sse) => sse,
            Err(e) => return Some(e),
        };
        match parse_named_event(&sse.event, &sse.data) {
            Ok(Some(event)) => ctx.emit(event),
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(
                    session = %ctx.session,
                    event = %sse.event,
                    error = %e,
                    "dropping server-push event"
                );
            }
        }
    }
    None
}
