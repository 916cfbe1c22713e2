//! The `Settlement` aggregate and its storage model.
//!
//! A `Settlement` is a read view: it is assembled from stored rows (see
//! [`SettlementRows`](crate::SettlementRows)) every time something changes and
//! it is never mutated in place. Changes go through [`Engine`](crate::Engine)
//! on single rows, then a fresh aggregate is loaded.

use chrono::{DateTime, Utc};
use sea_orm::entity::{ActiveValue, prelude::*};
use serde::{Deserialize, Serialize};

use crate::{Currency, Item, Participant, util::new_id};

/// One shared-expense session among a fixed group of participants.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Settlement {
    pub id: String,
    pub name: String,
    pub items: Vec<Item>,
    pub participants: Vec<Participant>,
    pub currencies: Vec<Currency>,
    pub updated_at: DateTime<Utc>,
    pub last_accessed_at: DateTime<Utc>,
}

impl Settlement {
    /// An empty settlement, created and accessed at `now`.
    pub fn new(name: String, now: DateTime<Utc>) -> Self {
        Self {
            id: new_id(),
            name,
            items: Vec::new(),
            participants: Vec::new(),
            currencies: Vec::new(),
            updated_at: now,
            last_accessed_at: now,
        }
    }
}

/// Lightweight row used to list settlements.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementListItem {
    pub id: String,
    pub name: String,
    pub participants: Vec<Participant>,
    pub last_accessed_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "settlements")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub name: String,
    pub updated_at: DateTimeUtc,
    pub last_accessed_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::participants::Entity")]
    Participants,
    #[sea_orm(has_many = "super::currencies::Entity")]
    Currencies,
    #[sea_orm(has_many = "super::items::Entity")]
    Items,
}

impl Related<super::participants::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Participants.def()
    }
}

impl Related<super::currencies::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Currencies.def()
    }
}

impl Related<super::items::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Items.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Settlement> for ActiveModel {
    fn from(value: &Settlement) -> Self {
        Self {
            id: ActiveValue::Set(value.id.clone()),
            name: ActiveValue::Set(value.name.clone()),
            updated_at: ActiveValue::Set(value.updated_at),
            last_accessed_at: ActiveValue::Set(value.last_accessed_at),
        }
    }
}
