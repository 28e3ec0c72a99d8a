//! Bot runtime — ties channels, the session map, and the dispatcher together.

pub mod routes;
pub mod sessions;

use std::sync::Arc;

use futures::StreamExt;

use crate::channels::{ChannelManager, IncomingMessage};
use crate::error::Error;
use crate::funnel::{Dispatched, Dispatcher};

pub use routes::{StatusState, status_routes};
pub use sessions::SessionStore;

/// The funnel bot: reads messages from every channel and answers them.
pub struct FunnelBot {
    dispatcher: Arc<Dispatcher>,
    sessions: Arc<SessionStore>,
    channels: Arc<ChannelManager>,
}

impl FunnelBot {
    pub fn new(
        dispatcher: Arc<Dispatcher>,
        sessions: Arc<SessionStore>,
        channels: ChannelManager,
    ) -> Self {
        Self {
            dispatcher,
            sessions,
            channels: Arc::new(channels),
        }
    }

    /// Dispatch one message against its session.
    pub async fn handle(&self, message: &IncomingMessage) -> Dispatched {
        let event = message.to_event();
        let session = self.sessions.get_or_create(&event.session_id).await;
        let mut session = session.lock().await;

        tracing::info!(
            session_id = %event.session_id,
            kind = ?message.kind,
            state = %session.state,
            "Handling message"
        );

        self.dispatcher.dispatch(&mut session, &event).await
    }

    /// Run until every channel stream ends or Ctrl+C is received.
    pub async fn run(self) -> Result<(), Error> {
        let mut message_stream = self.channels.start_all().await?;

        tracing::info!(channels = ?self.channels.names(), "Funnel bot ready and listening");

        loop {
            let message = tokio::select! {
                biased;
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("Ctrl+C received, shutting down...");
                    break;
                }
                msg = message_stream.next() => {
                    match msg {
                        Some(m) => m,
                        None => {
                            tracing::info!("All channel streams ended, shutting down...");
                            break;
                        }
                    }
                }
            };

            let dispatched = self.handle(&message).await;
            if let Some(ref lead) = dispatched.lead {
                tracing::info!(lead_id = %lead.id, session_id = %lead.session_id, "Lead captured");
            }

            if let Err(e) = self
                .channels
                .respond(&message, dispatched.reply.into())
                .await
            {
                tracing::warn!(channel = %message.channel, "Failed to deliver response: {}", e);
            }
        }

        tracing::info!("Funnel bot shutting down...");
        self.channels.shutdown_all().await?;

        Ok(())
    }
}
