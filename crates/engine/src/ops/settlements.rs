use std::collections::HashMap;

use chrono::Utc;
use sea_orm::{
    ActiveValue, DatabaseTransaction, JoinType, QueryFilter, QueryOrder, QuerySelect, Statement,
    TransactionTrait, prelude::*,
};

use crate::{
    Participant, ResultEngine, Settlement, SettlementListItem, SettlementResult, SettlementRows,
    benefited, calculator, currencies, items, participants, settlements,
};

use super::{Engine, with_tx};
use crate::util::normalize_required_name;

impl Engine {
    /// Create an empty settlement and return its id.
    pub async fn new_settlement(&self, name: &str) -> ResultEngine<String> {
        let name = normalize_required_name(name, "settlement")?;
        let settlement = Settlement::new(name, Utc::now());
        let model: settlements::ActiveModel = (&settlement).into();

        with_tx!(self, |db_tx| {
            model.insert(&db_tx).await?;
            tracing::debug!(settlement_id = %settlement.id, "settlement created");
            Ok(settlement.id)
        })
    }

    /// List settlements, most recently accessed first.
    pub async fn settlements(&self) -> ResultEngine<Vec<SettlementListItem>> {
        with_tx!(self, |db_tx| {
            let models = settlements::Entity::find()
                .order_by_desc(settlements::Column::LastAccessedAt)
                .order_by_asc(settlements::Column::Id)
                .all(&db_tx)
                .await?;

            let mut participants_by_settlement: HashMap<String, Vec<Participant>> =
                HashMap::new();
            for model in participants::Entity::find()
                .order_by_asc(participants::Column::SettlementId)
                .order_by_asc(participants::Column::Position)
                .all(&db_tx)
                .await?
            {
                participants_by_settlement
                    .entry(model.settlement_id.clone())
                    .or_default()
                    .push(model.into());
            }

            Ok(models
                .into_iter()
                .map(|model| SettlementListItem {
                    participants: participants_by_settlement
                        .remove(&model.id)
                        .unwrap_or_default(),
                    id: model.id,
                    name: model.name,
                    last_accessed_at: model.last_accessed_at,
                })
                .collect())
        })
    }

    /// Load a consistent snapshot of a settlement and resolve it into an
    /// aggregate.
    pub async fn settlement(&self, settlement_id: &str) -> ResultEngine<Settlement> {
        let rows = with_tx!(self, |db_tx| {
            self.settlement_rows(&db_tx, settlement_id).await
        })?;
        Settlement::try_from(rows)
    }

    /// Load a settlement and compute its result.
    pub async fn settlement_result(&self, settlement_id: &str) -> ResultEngine<SettlementResult> {
        let settlement = self.settlement(settlement_id).await?;
        Ok(calculator::compute(&settlement))
    }

    /// Rename a settlement.
    pub async fn rename_settlement(&self, settlement_id: &str, name: &str) -> ResultEngine<()> {
        let name = normalize_required_name(name, "settlement")?;
        let result = with_tx!(self, |db_tx| {
            self.require_settlement(&db_tx, settlement_id).await?;
            let model = settlements::ActiveModel {
                id: ActiveValue::Set(settlement_id.to_string()),
                name: ActiveValue::Set(name),
                updated_at: ActiveValue::Set(Utc::now()),
                ..Default::default()
            };
            model.update(&db_tx).await?;
            Ok(())
        });
        self.committed(settlement_id, result)
    }

    /// Record that the settlement was opened now. Moves it to the top of
    /// [`Engine::settlements`].
    pub async fn touch_settlement(&self, settlement_id: &str) -> ResultEngine<()> {
        let result = with_tx!(self, |db_tx| {
            self.require_settlement(&db_tx, settlement_id).await?;
            let model = settlements::ActiveModel {
                id: ActiveValue::Set(settlement_id.to_string()),
                last_accessed_at: ActiveValue::Set(Utc::now()),
                ..Default::default()
            };
            model.update(&db_tx).await?;
            Ok(())
        });
        self.committed(settlement_id, result)
    }

    /// Delete a settlement together with every participant, currency, item and
    /// benefit row it owns.
    pub async fn delete_settlement(&self, settlement_id: &str) -> ResultEngine<()> {
        let result = with_tx!(self, |db_tx| {
            self.require_settlement(&db_tx, settlement_id).await?;

            // Children are removed explicitly, the schema cascades only where
            // SQLite foreign keys are enabled.
            let backend = self.database.get_database_backend();

            // 1) benefit rows of the settlement's items
            db_tx
                .execute(Statement::from_sql_and_values(
                    backend,
                    "DELETE FROM benefited WHERE item_id IN (SELECT id FROM items WHERE settlement_id = ?);",
                    vec![settlement_id.into()],
                ))
                .await?;

            // 2) items, currencies, participants
            for table in ["items", "currencies", "participants"] {
                db_tx
                    .execute(Statement::from_sql_and_values(
                        backend,
                        format!("DELETE FROM {table} WHERE settlement_id = ?;"),
                        vec![settlement_id.into()],
                    ))
                    .await?;
            }

            // 3) settlement
            settlements::Entity::delete_by_id(settlement_id.to_string())
                .exec(&db_tx)
                .await?;

            tracing::debug!(settlement_id, "settlement deleted");
            Ok(())
        });
        self.committed(settlement_id, result)
    }

    pub(super) async fn settlement_rows(
        &self,
        db: &DatabaseTransaction,
        settlement_id: &str,
    ) -> ResultEngine<SettlementRows> {
        let settlement = self.require_settlement(db, settlement_id).await?;

        let participants = participants::Entity::find()
            .filter(participants::Column::SettlementId.eq(settlement_id.to_string()))
            .order_by_asc(participants::Column::Position)
            .all(db)
            .await?;
        let currencies = currencies::Entity::find()
            .filter(currencies::Column::SettlementId.eq(settlement_id.to_string()))
            .order_by_asc(currencies::Column::Position)
            .all(db)
            .await?;
        let items = items::Entity::find()
            .filter(items::Column::SettlementId.eq(settlement_id.to_string()))
            .order_by_asc(items::Column::Position)
            .all(db)
            .await?;
        let benefited = benefited::Entity::find()
            .join(JoinType::InnerJoin, benefited::Relation::Items.def())
            .filter(items::Column::SettlementId.eq(settlement_id.to_string()))
            .order_by_asc(benefited::Column::ItemId)
            .order_by_asc(benefited::Column::Position)
            .all(db)
            .await?;

        Ok(SettlementRows {
            settlement,
            participants,
            currencies,
            items,
            benefited,
        })
    }
}
