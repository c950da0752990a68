//! Request runtime
//!
//! Glues one webhook delivery together: tokenize, check out the session,
//! transition, persist or delete, release the lock, then hand effects to the
//! dispatcher.

mod dispatcher;
pub mod traits;

#[cfg(test)]
pub mod testing;

pub use dispatcher::Dispatcher;
pub use traits::*;

use crate::gateway::{GatewayRequest, Reply};
use crate::menu::MenuRegistry;
use crate::session::{SessionStore, StoreError};
use crate::state_machine::{advance, redisplay, tokenize, Effect, Input};
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Outcome of one webhook delivery
pub struct Delivery {
    pub reply: Reply,
    /// Background task running this delivery's effects, if any
    #[allow(dead_code)] // Used in tests
    pub effects: Option<JoinHandle<()>>,
}

pub struct UssdRuntime {
    registry: Arc<MenuRegistry>,
    sessions: Arc<SessionStore>,
    dispatcher: Dispatcher,
}

impl UssdRuntime {
    pub fn new(
        registry: Arc<MenuRegistry>,
        sessions: Arc<SessionStore>,
        dispatcher: Dispatcher,
    ) -> Self {
        Self {
            registry,
            sessions,
            dispatcher,
        }
    }

    pub fn sessions(&self) -> &Arc<SessionStore> {
        &self.sessions
    }

    /// Handle one delivery. Never fails: store errors become the apology.
    pub async fn handle(&self, request: &GatewayRequest) -> Delivery {
        let input = tokenize(&request.text);

        match self.step(request, &input).await {
            Ok((reply, effects)) => Delivery {
                effects: self.dispatcher.dispatch(&request.session_id, effects),
                reply,
            },
            Err(e) => {
                tracing::error!(
                    session_id = %request.session_id,
                    error = %e,
                    "Session store failure"
                );
                Delivery {
                    reply: Reply::apology(),
                    effects: None,
                }
            }
        }
    }

    /// The locked part of a delivery; the lease drops before effects run
    async fn step(
        &self,
        request: &GatewayRequest,
        input: &Input,
    ) -> Result<(Reply, Vec<Effect>), StoreError> {
        let mut lease = self
            .sessions
            .checkout(&request.session_id, &request.phone_number)
            .await?;

        let session = lease.session();
        let replay = input.is_replay(session.inputs_seen);
        let result = if replay {
            redisplay(&self.registry, &session.state)
        } else {
            advance(&self.registry, &session.state, &session.phone, &input.token)
        };

        tracing::info!(
            session_id = %request.session_id,
            service_code = %request.service_code,
            menu = %result.new_state.menu,
            step = result.new_state.step,
            depth = input.depth,
            replay,
            terminal = result.is_terminal(),
            "USSD transition"
        );

        if result.is_terminal() {
            lease.remove().await?;
        } else {
            let session = lease.session_mut();
            session.state = result.new_state;
            session.inputs_seen = session.inputs_seen.max(input.depth);
            lease.save().await?;
        }

        Ok((result.reply, result.effects))
    }
}
