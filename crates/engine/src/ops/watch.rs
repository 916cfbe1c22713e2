use tokio::sync::broadcast::{self, error::RecvError};

use crate::{EngineError, ResultEngine, Settlement, SettlementResult, calculator};

use super::Engine;

/// Stream of snapshots of one settlement.
///
/// Created by [`Engine::watch_settlement`]. The first call to
/// [`next`](SettlementWatcher::next) returns the current state, every later
/// call waits for the next committed change. Dropping the watcher
/// unsubscribes it.
pub struct SettlementWatcher {
    engine: Engine,
    settlement_id: String,
    changes: broadcast::Receiver<String>,
    primed: bool,
    finished: bool,
}

impl Engine {
    /// Subscribe to the snapshots of `settlement_id`.
    pub async fn watch_settlement(&self, settlement_id: &str) -> ResultEngine<SettlementWatcher> {
        // Subscribe before checking existence so no change is missed.
        let changes = self.changes.subscribe();
        self.settlement(settlement_id).await?;

        Ok(SettlementWatcher {
            engine: self.clone(),
            settlement_id: settlement_id.to_string(),
            changes,
            primed: false,
            finished: false,
        })
    }
}

impl SettlementWatcher {
    /// Wait for the next snapshot. `None` once the settlement was deleted.
    pub async fn next(&mut self) -> Option<ResultEngine<Settlement>> {
        if self.finished {
            return None;
        }
        if self.primed {
            self.wait_for_change().await?;
        }
        self.primed = true;

        match self.engine.settlement(&self.settlement_id).await {
            Err(EngineError::KeyNotFound(_)) => {
                tracing::debug!(settlement_id = %self.settlement_id, "watched settlement is gone");
                self.finished = true;
                None
            }
            snapshot => Some(snapshot),
        }
    }

    /// [`next`](SettlementWatcher::next) followed by [`compute`](crate::compute).
    pub async fn next_result(&mut self) -> Option<ResultEngine<SettlementResult>> {
        self.next()
            .await
            .map(|snapshot| snapshot.map(|settlement| calculator::compute(&settlement)))
    }

    async fn wait_for_change(&mut self) -> Option<()> {
        loop {
            match self.changes.recv().await {
                Ok(id) if id == self.settlement_id => return Some(()),
                Ok(_) => continue,
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(
                        settlement_id = %self.settlement_id,
                        skipped,
                        "watcher lagged behind, reloading"
                    );
                    return Some(());
                }
                // The watcher's own engine handle keeps a sender alive, so the
                // channel can't close under it.
                Err(RecvError::Closed) => {
                    self.finished = true;
                    return None;
                }
            }
        }
    }
}
