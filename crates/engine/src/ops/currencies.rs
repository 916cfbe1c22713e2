use chrono::Utc;
use sea_orm::{
    ActiveValue, DatabaseTransaction, QueryFilter, QueryOrder, Statement, TransactionTrait,
    prelude::*,
};

use crate::{
    Currency, EngineError, ResultEngine, currencies,
    util::{normalize_required_name, validate_rate},
};

use super::{Engine, impl_target_in_settlement, next_position, with_tx};

impl Engine {
    impl_target_in_settlement!(
        require_currency_in_settlement,
        currencies::Entity,
        currencies::Model,
        currencies::Column::SettlementId,
        "currency not exists"
    );

    /// Currencies declared in a settlement, in insertion order.
    pub async fn currencies(&self, settlement_id: &str) -> ResultEngine<Vec<Currency>> {
        with_tx!(self, |db_tx| {
            self.require_settlement(&db_tx, settlement_id).await?;
            currencies::Entity::find()
                .filter(currencies::Column::SettlementId.eq(settlement_id.to_string()))
                .order_by_asc(currencies::Column::Position)
                .all(&db_tx)
                .await?
                .into_iter()
                .map(Currency::try_from)
                .collect::<ResultEngine<Vec<Currency>>>()
        })
    }

    pub async fn currency(&self, settlement_id: &str, currency_id: &str) -> ResultEngine<Currency> {
        with_tx!(self, |db_tx| {
            let model = self
                .require_currency_in_settlement(&db_tx, settlement_id, currency_id)
                .await?;
            Currency::try_from(model)
        })
    }

    /// Declare a currency with its rate to native units.
    pub async fn new_currency(
        &self,
        settlement_id: &str,
        symbol: &str,
        rate: f64,
    ) -> ResultEngine<String> {
        let symbol = normalize_required_name(symbol, "currency")?;
        let currency = Currency::new(symbol, rate)?;

        let result = with_tx!(self, |db_tx| {
            self.require_settlement(&db_tx, settlement_id).await?;
            self.ensure_symbol_free(&db_tx, settlement_id, &currency.symbol, None)
                .await?;

            let mut model: currencies::ActiveModel = (&currency).into();
            model.settlement_id = ActiveValue::Set(settlement_id.to_string());
            model.position = ActiveValue::Set(
                next_position::<currencies::Entity>(
                    &db_tx,
                    currencies::Column::SettlementId,
                    settlement_id,
                    currencies::Column::Position,
                )
                .await?,
            );
            model.insert(&db_tx).await?;
            self.touch_updated_at(&db_tx, settlement_id, Utc::now())
                .await?;

            tracing::debug!(settlement_id, currency_id = %currency.id, symbol = %currency.symbol, "currency created");
            Ok(currency.id)
        });
        self.committed(settlement_id, result)
    }

    /// Change the symbol and rate of a currency. Items priced in it pick up
    /// the new rate on the next computation.
    pub async fn update_currency(
        &self,
        settlement_id: &str,
        currency_id: &str,
        symbol: &str,
        rate: f64,
    ) -> ResultEngine<()> {
        let symbol = normalize_required_name(symbol, "currency")?;
        validate_rate(&symbol, rate)?;

        let result = with_tx!(self, |db_tx| {
            self.require_currency_in_settlement(&db_tx, settlement_id, currency_id)
                .await?;
            self.ensure_symbol_free(&db_tx, settlement_id, &symbol, Some(currency_id))
                .await?;
            self.check_items_with_rate(&db_tx, settlement_id, currency_id, rate)
                .await?;

            let model = currencies::ActiveModel {
                id: ActiveValue::Set(currency_id.to_string()),
                symbol: ActiveValue::Set(symbol),
                rate: ActiveValue::Set(rate),
                ..Default::default()
            };
            model.update(&db_tx).await?;
            self.touch_updated_at(&db_tx, settlement_id, Utc::now())
                .await?;
            Ok(())
        });
        self.committed(settlement_id, result)
    }

    /// Delete a currency. Items priced in it fall back to native units.
    pub async fn delete_currency(&self, settlement_id: &str, currency_id: &str) -> ResultEngine<()> {
        let result = with_tx!(self, |db_tx| {
            self.require_currency_in_settlement(&db_tx, settlement_id, currency_id)
                .await?;

            db_tx
                .execute(Statement::from_sql_and_values(
                    self.database.get_database_backend(),
                    "UPDATE items SET currency_id = NULL WHERE settlement_id = ? AND currency_id = ?;",
                    vec![settlement_id.into(), currency_id.into()],
                ))
                .await?;
            currencies::Entity::delete_by_id(currency_id.to_string())
                .exec(&db_tx)
                .await?;
            self.touch_updated_at(&db_tx, settlement_id, Utc::now())
                .await?;

            tracing::debug!(settlement_id, currency_id, "currency deleted");
            Ok(())
        });
        self.committed(settlement_id, result)
    }

    async fn ensure_symbol_free(
        &self,
        db: &DatabaseTransaction,
        settlement_id: &str,
        symbol: &str,
        except_id: Option<&str>,
    ) -> ResultEngine<()> {
        let mut query = currencies::Entity::find()
            .filter(currencies::Column::SettlementId.eq(settlement_id.to_string()))
            .filter(currencies::Column::Symbol.eq(symbol.to_string()));
        if let Some(id) = except_id {
            query = query.filter(currencies::Column::Id.ne(id.to_string()));
        }
        if query.one(db).await?.is_some() {
            return Err(EngineError::ExistingKey(symbol.to_string()));
        }
        Ok(())
    }
}
