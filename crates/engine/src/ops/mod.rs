use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveValue, DatabaseConnection, DatabaseTransaction, EntityTrait, QueryFilter, QuerySelect,
    prelude::*,
};
use tokio::sync::broadcast;

use crate::{EngineError, ResultEngine};

mod currencies;
mod items;
mod participants;
mod settlements;
mod watch;

pub use watch::SettlementWatcher;

/// Default number of change notifications a slow watcher may fall behind
/// before it starts skipping (it then reloads once).
const DEFAULT_NOTIFICATION_CAPACITY: usize = 64;

/// Run a block inside a DB transaction, committing on success and rolling back on error.
macro_rules! with_tx {
    ($self:expr, |$tx:ident| $body:expr) => {{
        let $tx = $self.database.begin().await?;
        let result = $body;
        match result {
            Ok(value) => {
                $tx.commit().await?;
                Ok(value)
            }
            Err(err) => Err(err),
        }
    }};
}

pub(crate) use with_tx;

/// Generates a `require_*_in_settlement` method returning the row of a child
/// entity, or `KeyNotFound` when it belongs to another settlement (or to none).
macro_rules! impl_target_in_settlement {
    ($require_fn:ident, $entity:path, $model:path, $settlement_col:expr, $err_msg:literal) => {
        pub(super) async fn $require_fn(
            &self,
            db: &DatabaseTransaction,
            settlement_id: &str,
            target_id: &str,
        ) -> ResultEngine<$model> {
            <$entity>::find_by_id(target_id.to_string())
                .filter($settlement_col.eq(settlement_id.to_string()))
                .one(db)
                .await?
                .ok_or_else(|| EngineError::KeyNotFound($err_msg.to_string()))
        }
    };
}

pub(crate) use impl_target_in_settlement;

/// Storage side of the engine.
///
/// `Engine` persists settlements and their parts, assembles
/// [`Settlement`](crate::Settlement) snapshots and tells
/// [`SettlementWatcher`]s when a settlement changed. Every mutation runs in a
/// single DB transaction and notifies only after it committed, so a watcher
/// never observes a half-applied change.
#[derive(Clone, Debug)]
pub struct Engine {
    database: DatabaseConnection,
    changes: broadcast::Sender<String>,
}

impl Engine {
    /// Return a builder for `Engine`. Help to build the struct.
    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }

    pub(super) async fn require_settlement(
        &self,
        db: &DatabaseTransaction,
        settlement_id: &str,
    ) -> ResultEngine<crate::settlements::Model> {
        crate::settlements::Entity::find_by_id(settlement_id.to_string())
            .one(db)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("settlement not exists".to_string()))
    }

    /// Mark the settlement as modified at `now`.
    pub(super) async fn touch_updated_at(
        &self,
        db: &DatabaseTransaction,
        settlement_id: &str,
        now: DateTime<Utc>,
    ) -> ResultEngine<()> {
        let model = crate::settlements::ActiveModel {
            id: ActiveValue::Set(settlement_id.to_string()),
            updated_at: ActiveValue::Set(now),
            ..Default::default()
        };
        model.update(db).await?;
        Ok(())
    }

    /// Pass `result` through, notifying watchers of `settlement_id` when it
    /// is a committed change.
    pub(super) fn committed<T>(
        &self,
        settlement_id: &str,
        result: ResultEngine<T>,
    ) -> ResultEngine<T> {
        if result.is_ok() {
            self.notify(settlement_id);
        }
        result
    }

    /// Publish that `settlement_id` has a new committed state.
    pub(super) fn notify(&self, settlement_id: &str) {
        // Sending fails only when nobody is watching.
        let watchers = self.changes.send(settlement_id.to_string()).unwrap_or(0);
        tracing::trace!(settlement_id, watchers, "settlement changed");
    }
}

/// Next free `position` among the rows of `E` owned by `owner_id`.
pub(super) async fn next_position<E>(
    db: &DatabaseTransaction,
    owner_column: E::Column,
    owner_id: &str,
    position_column: E::Column,
) -> ResultEngine<i64>
where
    E: EntityTrait,
{
    let max: Option<Option<i64>> = E::find()
        .filter(owner_column.eq(owner_id.to_string()))
        .select_only()
        .column_as(position_column.max(), "max_position")
        .into_tuple()
        .one(db)
        .await?;
    Ok(max.flatten().unwrap_or(0) + 1)
}

/// The builder for `Engine`
#[derive(Default)]
pub struct EngineBuilder {
    database: DatabaseConnection,
    notification_capacity: Option<usize>,
}

impl EngineBuilder {
    /// Pass the required database
    pub fn database(mut self, db: DatabaseConnection) -> EngineBuilder {
        self.database = db;
        self
    }

    /// How many change notifications are buffered per watcher.
    pub fn notification_capacity(mut self, capacity: usize) -> EngineBuilder {
        self.notification_capacity = Some(capacity);
        self
    }

    /// Construct `Engine`
    pub async fn build(self) -> ResultEngine<Engine> {
        let capacity = self
            .notification_capacity
            .unwrap_or(DEFAULT_NOTIFICATION_CAPACITY)
            .max(1);
        let (changes, _) = broadcast::channel(capacity);
        Ok(Engine {
            database: self.database,
            changes,
        })
    }
}
