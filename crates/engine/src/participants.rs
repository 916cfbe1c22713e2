//! The module contains `Participant` struct and its storage model.

use sea_orm::entity::{ActiveValue, prelude::*};
use serde::{Deserialize, Serialize};

use crate::util::new_id;

/// A person sharing the expenses of a settlement.
///
/// Inside an aggregate every `Participant` is an owned copy: items embed their
/// payer and beneficiaries by value, so nothing aliases the settlement's own
/// participant list.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Participant {
    pub id: String,
    pub name: String,
}

impl Participant {
    pub fn new(name: String) -> Self {
        Self { id: new_id(), name }
    }

    pub fn with_id(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "participants")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub settlement_id: String,
    pub name: String,
    pub position: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::settlements::Entity",
        from = "Column::SettlementId",
        to = "super::settlements::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Settlements,
}

impl Related<super::settlements::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Settlements.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for Participant {
    fn from(value: Model) -> Self {
        Self {
            id: value.id,
            name: value.name,
        }
    }
}

impl From<&Participant> for ActiveModel {
    fn from(value: &Participant) -> Self {
        Self {
            id: ActiveValue::Set(value.id.clone()),
            settlement_id: ActiveValue::NotSet,
            name: ActiveValue::Set(value.name.clone()),
            position: ActiveValue::NotSet,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_participants_get_distinct_ids() {
        let alice = Participant::new("Alice".to_string());
        let other_alice = Participant::new("Alice".to_string());

        assert_eq!(alice.name, other_alice.name);
        assert_ne!(alice.id, other_alice.id);
    }

    #[test]
    fn model_maps_to_participant() {
        let model = Model {
            id: "p1".to_string(),
            settlement_id: "s1".to_string(),
            name: "Alice".to_string(),
            position: 3,
        };

        assert_eq!(Participant::from(model), Participant::with_id("p1", "Alice"));
    }
}
