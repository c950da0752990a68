//! Side-effect dispatcher
//!
//! Runs effect descriptors against the collaborators after the reply has been
//! computed and the session lock released. One attempt each, in order; a
//! failure is logged and never stops the remaining effects.

use super::traits::{CollaboratorError, Notifier, Registrar, TradeLedger};
use crate::state_machine::Effect;
use std::sync::Arc;
use tokio::task::JoinHandle;

#[derive(Clone)]
pub struct Dispatcher {
    registrar: Arc<dyn Registrar>,
    ledger: Arc<dyn TradeLedger>,
    notifier: Arc<dyn Notifier>,
}

impl Dispatcher {
    pub fn new(
        registrar: Arc<dyn Registrar>,
        ledger: Arc<dyn TradeLedger>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            registrar,
            ledger,
            notifier,
        }
    }

    /// Fire and forget. The handle is only useful to tests and shutdown.
    pub fn dispatch(&self, session_id: &str, effects: Vec<Effect>) -> Option<JoinHandle<()>> {
        if effects.is_empty() {
            return None;
        }
        let dispatcher = self.clone();
        let session_id = session_id.to_string();
        Some(tokio::spawn(async move {
            dispatcher.run(&session_id, &effects).await;
        }))
    }

    /// Execute effects in order, returning how many failed
    pub async fn run(&self, session_id: &str, effects: &[Effect]) -> usize {
        let mut failures = 0;
        for effect in effects {
            match self.execute(effect).await {
                Ok(()) => {
                    tracing::debug!(session_id = %session_id, effect = effect.kind(), "Effect completed");
                }
                Err(e) => {
                    failures += 1;
                    tracing::warn!(
                        session_id = %session_id,
                        effect = effect.kind(),
                        error = %e,
                        "Effect failed"
                    );
                }
            }
        }
        failures
    }

    async fn execute(&self, effect: &Effect) -> Result<(), CollaboratorError> {
        match effect {
            Effect::Register {
                kind,
                fields,
                phone,
            } => self.registrar.register(*kind, fields, phone).await,
            Effect::PlaceOrder { fields, phone } => self.ledger.record_order(fields, phone).await,
            Effect::Notify { phone, message } => self.notifier.notify(phone, message).await,
        }
    }
}
