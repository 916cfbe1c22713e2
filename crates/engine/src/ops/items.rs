use chrono::Utc;
use sea_orm::{
    ActiveValue, DatabaseTransaction, QueryFilter, Statement, TransactionTrait, prelude::*,
};

use crate::{
    EngineError, Item, ItemDraft, ResultEngine, benefited, items,
    util::{
        model_quantity, new_id, normalize_required_name, validate_native_total, validate_price,
    },
};

use super::{Engine, impl_target_in_settlement, next_position, with_tx};

impl Engine {
    impl_target_in_settlement!(
        require_item_in_settlement,
        items::Entity,
        items::Model,
        items::Column::SettlementId,
        "item not exists"
    );

    /// Return a resolved item of a settlement.
    pub async fn item(&self, settlement_id: &str, item_id: &str) -> ResultEngine<Item> {
        self.settlement(settlement_id)
            .await?
            .items
            .into_iter()
            .find(|item| item.id == item_id)
            .ok_or_else(|| EngineError::KeyNotFound("item not exists".to_string()))
    }

    /// Add an item to a settlement.
    ///
    /// Payer, currency and beneficiaries must already belong to the settlement.
    /// Duplicate beneficiary ids are collapsed.
    pub async fn new_item(&self, settlement_id: &str, draft: ItemDraft) -> ResultEngine<String> {
        let name = normalize_required_name(&draft.name, "item")?;
        validate_price(&name, draft.price)?;
        let beneficiaries = draft.unique_benefited_ids();

        let result = with_tx!(self, |db_tx| {
            self.require_settlement(&db_tx, settlement_id).await?;
            let rate = self
                .check_item_references(&db_tx, settlement_id, &draft, &beneficiaries)
                .await?;
            validate_native_total(&name, draft.price, rate, draft.quantity)?;

            let item_id = new_id();
            let position = next_position::<items::Entity>(
                &db_tx,
                items::Column::SettlementId,
                settlement_id,
                items::Column::Position,
            )
            .await?;
            let model = items::ActiveModel {
                id: ActiveValue::Set(item_id.clone()),
                settlement_id: ActiveValue::Set(settlement_id.to_string()),
                name: ActiveValue::Set(name),
                price: ActiveValue::Set(draft.price),
                quantity: ActiveValue::Set(i64::from(draft.quantity)),
                payer_id: ActiveValue::Set(draft.payer_id.clone()),
                currency_id: ActiveValue::Set(draft.currency_id.clone()),
                position: ActiveValue::Set(position),
            };
            model.insert(&db_tx).await?;
            insert_benefited(&db_tx, &item_id, &beneficiaries).await?;
            self.touch_updated_at(&db_tx, settlement_id, Utc::now())
                .await?;

            tracing::debug!(settlement_id, item_id, beneficiaries = beneficiaries.len(), "item created");
            Ok(item_id)
        });
        self.committed(settlement_id, result)
    }

    /// Overwrite an item with `draft`. The benefit set is replaced as a whole.
    pub async fn update_item(
        &self,
        settlement_id: &str,
        item_id: &str,
        draft: ItemDraft,
    ) -> ResultEngine<()> {
        let name = normalize_required_name(&draft.name, "item")?;
        validate_price(&name, draft.price)?;
        let beneficiaries = draft.unique_benefited_ids();

        let result = with_tx!(self, |db_tx| {
            self.require_item_in_settlement(&db_tx, settlement_id, item_id)
                .await?;
            let rate = self
                .check_item_references(&db_tx, settlement_id, &draft, &beneficiaries)
                .await?;
            validate_native_total(&name, draft.price, rate, draft.quantity)?;

            let model = items::ActiveModel {
                id: ActiveValue::Set(item_id.to_string()),
                name: ActiveValue::Set(name),
                price: ActiveValue::Set(draft.price),
                quantity: ActiveValue::Set(i64::from(draft.quantity)),
                payer_id: ActiveValue::Set(draft.payer_id.clone()),
                currency_id: ActiveValue::Set(draft.currency_id.clone()),
                ..Default::default()
            };
            model.update(&db_tx).await?;

            self.delete_benefited(&db_tx, item_id).await?;
            insert_benefited(&db_tx, item_id, &beneficiaries).await?;
            self.touch_updated_at(&db_tx, settlement_id, Utc::now())
                .await?;

            tracing::debug!(settlement_id, item_id, "item updated");
            Ok(())
        });
        self.committed(settlement_id, result)
    }

    /// Delete an item and its benefit rows.
    pub async fn delete_item(&self, settlement_id: &str, item_id: &str) -> ResultEngine<()> {
        let result = with_tx!(self, |db_tx| {
            self.require_item_in_settlement(&db_tx, settlement_id, item_id)
                .await?;

            self.delete_benefited(&db_tx, item_id).await?;
            items::Entity::delete_by_id(item_id.to_string())
                .exec(&db_tx)
                .await?;
            self.touch_updated_at(&db_tx, settlement_id, Utc::now())
                .await?;

            tracing::debug!(settlement_id, item_id, "item deleted");
            Ok(())
        });
        self.committed(settlement_id, result)
    }

    async fn delete_benefited(&self, db: &DatabaseTransaction, item_id: &str) -> ResultEngine<()> {
        db.execute(Statement::from_sql_and_values(
            self.database.get_database_backend(),
            "DELETE FROM benefited WHERE item_id = ?;",
            vec![item_id.into()],
        ))
        .await?;
        Ok(())
    }

    async fn check_item_references(
        &self,
        db: &DatabaseTransaction,
        settlement_id: &str,
        draft: &ItemDraft,
        beneficiaries: &[String],
    ) -> ResultEngine<f64> {
        if let Some(payer_id) = &draft.payer_id {
            self.require_participant_in_settlement(db, settlement_id, payer_id)
                .await?;
        }
        let rate = match &draft.currency_id {
            Some(currency_id) => {
                self.require_currency_in_settlement(db, settlement_id, currency_id)
                    .await?
                    .rate
            }
            None => 1.0,
        };
        for participant_id in beneficiaries {
            self.require_participant_in_settlement(db, settlement_id, participant_id)
                .await?;
        }
        Ok(rate)
    }

    /// Reject a new rate that would push an item priced in `currency_id`
    /// past [`MAX_NATIVE_TOTAL`](crate::MAX_NATIVE_TOTAL).
    pub(super) async fn check_items_with_rate(
        &self,
        db: &DatabaseTransaction,
        settlement_id: &str,
        currency_id: &str,
        rate: f64,
    ) -> ResultEngine<()> {
        let priced = items::Entity::find()
            .filter(items::Column::SettlementId.eq(settlement_id.to_string()))
            .filter(items::Column::CurrencyId.eq(currency_id.to_string()))
            .all(db)
            .await?;
        for model in priced {
            let quantity = model_quantity(&model.id, model.quantity)?;
            validate_native_total(&model.name, model.price, rate, quantity)?;
        }
        Ok(())
    }
}

async fn insert_benefited(
    db: &DatabaseTransaction,
    item_id: &str,
    participant_ids: &[String],
) -> ResultEngine<()> {
    if participant_ids.is_empty() {
        return Ok(());
    }
    let rows = participant_ids
        .iter()
        .zip(1_i64..)
        .map(|(participant_id, position)| benefited::ActiveModel {
            item_id: ActiveValue::Set(item_id.to_string()),
            participant_id: ActiveValue::Set(participant_id.clone()),
            position: ActiveValue::Set(position),
        });
    benefited::Entity::insert_many(rows).exec(db).await?;
    Ok(())
}
