//! Foreign currencies declared inside a settlement.
//!
//! A settlement has a single implicit *native* unit: every amount that ends up
//! in a [`SettlementResult`](crate::SettlementResult) is expressed in it.
//! Items bought in another currency point to a `Currency` whose `rate` tells
//! how many native units one foreign unit is worth. Rates are supplied by the
//! user and never looked up.

use sea_orm::entity::{ActiveValue, prelude::*};
use serde::{Deserialize, Serialize};

use crate::{ResultEngine, util::new_id, util::validate_rate};

/// A user supplied exchange rate.
///
/// `rate = 150.0` means 1 unit of this currency is worth 150 native units.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Currency {
    pub id: String,
    pub symbol: String,
    pub rate: f64,
}

impl Currency {
    /// Build a new currency, rejecting rates that are not strictly positive.
    pub fn new(symbol: String, rate: f64) -> ResultEngine<Self> {
        validate_rate(&symbol, rate)?;
        Ok(Self {
            id: new_id(),
            symbol,
            rate,
        })
    }

    pub fn with_id(id: impl Into<String>, symbol: impl Into<String>, rate: f64) -> Self {
        Self {
            id: id.into(),
            symbol: symbol.into(),
            rate,
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "currencies")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub settlement_id: String,
    pub symbol: String,
    pub rate: f64,
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

impl TryFrom<Model> for Currency {
    type Error = crate::EngineError;

    fn try_from(value: Model) -> Result<Self, Self::Error> {
        validate_rate(&value.symbol, value.rate)?;
        Ok(Self {
            id: value.id,
            symbol: value.symbol,
            rate: value.rate,
        })
    }
}

impl From<&Currency> for ActiveModel {
    fn from(value: &Currency) -> Self {
        Self {
            id: ActiveValue::Set(value.id.clone()),
            settlement_id: ActiveValue::NotSet,
            symbol: ActiveValue::Set(value.symbol.clone()),
            rate: ActiveValue::Set(value.rate),
            position: ActiveValue::NotSet,
        }
    }
}
