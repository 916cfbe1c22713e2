use chrono::Utc;
use sea_orm::{
    ActiveValue, DatabaseTransaction, QueryFilter, QueryOrder, Statement, TransactionTrait,
    prelude::*,
};

use crate::{EngineError, Participant, ResultEngine, participants, util::normalize_required_name};

use super::{Engine, impl_target_in_settlement, next_position, with_tx};

impl Engine {
    impl_target_in_settlement!(
        require_participant_in_settlement,
        participants::Entity,
        participants::Model,
        participants::Column::SettlementId,
        "participant not exists"
    );

    /// Participants of a settlement, in insertion order.
    pub async fn participants(&self, settlement_id: &str) -> ResultEngine<Vec<Participant>> {
        with_tx!(self, |db_tx| {
            self.require_settlement(&db_tx, settlement_id).await?;
            let models = participants::Entity::find()
                .filter(participants::Column::SettlementId.eq(settlement_id.to_string()))
                .order_by_asc(participants::Column::Position)
                .all(&db_tx)
                .await?;
            Ok(models.into_iter().map(Participant::from).collect())
        })
    }

    /// Return a participant snapshot from DB.
    pub async fn participant(
        &self,
        settlement_id: &str,
        participant_id: &str,
    ) -> ResultEngine<Participant> {
        with_tx!(self, |db_tx| {
            let model = self
                .require_participant_in_settlement(&db_tx, settlement_id, participant_id)
                .await?;
            Ok(Participant::from(model))
        })
    }

    /// Add a participant to a settlement. Names are unique per settlement.
    pub async fn new_participant(&self, settlement_id: &str, name: &str) -> ResultEngine<String> {
        let name = normalize_required_name(name, "participant")?;
        let result = with_tx!(self, |db_tx| {
            self.require_settlement(&db_tx, settlement_id).await?;
            self.ensure_participant_name_free(&db_tx, settlement_id, &name, None)
                .await?;

            let participant = Participant::new(name);
            let mut model: participants::ActiveModel = (&participant).into();
            model.settlement_id = ActiveValue::Set(settlement_id.to_string());
            model.position = ActiveValue::Set(
                next_position::<participants::Entity>(
                    &db_tx,
                    participants::Column::SettlementId,
                    settlement_id,
                    participants::Column::Position,
                )
                .await?,
            );
            model.insert(&db_tx).await?;
            self.touch_updated_at(&db_tx, settlement_id, Utc::now())
                .await?;

            tracing::debug!(settlement_id, participant_id = %participant.id, "participant created");
            Ok(participant.id)
        });
        self.committed(settlement_id, result)
    }

    /// Rename a participant.
    pub async fn rename_participant(
        &self,
        settlement_id: &str,
        participant_id: &str,
        new_name: &str,
    ) -> ResultEngine<()> {
        let new_name = normalize_required_name(new_name, "participant")?;
        let result = with_tx!(self, |db_tx| {
            self.require_participant_in_settlement(&db_tx, settlement_id, participant_id)
                .await?;
            self.ensure_participant_name_free(&db_tx, settlement_id, &new_name, Some(participant_id))
                .await?;

            let model = participants::ActiveModel {
                id: ActiveValue::Set(participant_id.to_string()),
                name: ActiveValue::Set(new_name),
                ..Default::default()
            };
            model.update(&db_tx).await?;
            self.touch_updated_at(&db_tx, settlement_id, Utc::now())
                .await?;
            Ok(())
        });
        self.committed(settlement_id, result)
    }

    /// Delete a participant.
    ///
    /// Items they paid for revert to no payer and they are removed from every
    /// benefit set; the items themselves are kept.
    pub async fn delete_participant(
        &self,
        settlement_id: &str,
        participant_id: &str,
    ) -> ResultEngine<()> {
        let result = with_tx!(self, |db_tx| {
            self.require_participant_in_settlement(&db_tx, settlement_id, participant_id)
                .await?;

            let backend = self.database.get_database_backend();
            db_tx
                .execute(Statement::from_sql_and_values(
                    backend,
                    "UPDATE items SET payer_id = NULL WHERE settlement_id = ? AND payer_id = ?;",
                    vec![settlement_id.into(), participant_id.into()],
                ))
                .await?;
            db_tx
                .execute(Statement::from_sql_and_values(
                    backend,
                    "DELETE FROM benefited WHERE participant_id = ?;",
                    vec![participant_id.into()],
                ))
                .await?;
            participants::Entity::delete_by_id(participant_id.to_string())
                .exec(&db_tx)
                .await?;
            self.touch_updated_at(&db_tx, settlement_id, Utc::now())
                .await?;

            tracing::debug!(settlement_id, participant_id, "participant deleted");
            Ok(())
        });
        self.committed(settlement_id, result)
    }

    async fn ensure_participant_name_free(
        &self,
        db: &DatabaseTransaction,
        settlement_id: &str,
        name: &str,
        except_id: Option<&str>,
    ) -> ResultEngine<()> {
        let mut query = participants::Entity::find()
            .filter(participants::Column::SettlementId.eq(settlement_id.to_string()))
            .filter(participants::Column::Name.eq(name.to_string()));
        if let Some(id) = except_id {
            query = query.filter(participants::Column::Id.ne(id.to_string()));
        }
        if query.one(db).await?.is_some() {
            return Err(EngineError::ExistingKey(name.to_string()));
        }
        Ok(())
    }
}
