//! Purchased items and the draft used to create or update them.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::{Currency, Participant};

/// A single purchase inside a settlement.
///
/// `price` is expressed in `currency` (or in the native unit when `currency`
/// is `None`). The cost of the item is split between `benefited`; an empty
/// benefit set means nobody carries the cost.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: String,
    pub name: String,
    pub price: f64,
    pub quantity: u32,
    pub payer: Option<Participant>,
    pub currency: Option<Currency>,
    pub benefited: Vec<Participant>,
}

impl Item {
    /// Native units per item unit. Items without a currency are native.
    #[must_use]
    pub fn rate(&self) -> f64 {
        self.currency.as_ref().map_or(1.0, |currency| currency.rate)
    }

    /// Full cost of the item converted to native units, before any rounding.
    #[must_use]
    pub fn native_total(&self) -> f64 {
        self.price * self.rate() * f64::from(self.quantity)
    }

    #[must_use]
    pub fn is_paid_by(&self, participant_id: &str) -> bool {
        self.payer
            .as_ref()
            .is_some_and(|payer| payer.id == participant_id)
    }

    #[must_use]
    pub fn is_benefited_by(&self, participant_id: &str) -> bool {
        self.benefited
            .iter()
            .any(|participant| participant.id == participant_id)
    }
}

/// Input for [`Engine::new_item`](crate::Engine::new_item) and
/// [`Engine::update_item`](crate::Engine::update_item).
///
/// References are plain ids; the engine checks that each one belongs to the
/// target settlement before writing anything.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ItemDraft {
    pub name: String,
    pub price: f64,
    pub quantity: u32,
    pub payer_id: Option<String>,
    pub currency_id: Option<String>,
    pub benefited_ids: Vec<String>,
}

impl ItemDraft {
    pub fn new(name: impl Into<String>, price: f64, quantity: u32) -> Self {
        Self {
            name: name.into(),
            price,
            quantity,
            ..Default::default()
        }
    }

    pub fn payer(mut self, participant_id: impl Into<String>) -> Self {
        self.payer_id = Some(participant_id.into());
        self
    }

    pub fn currency(mut self, currency_id: impl Into<String>) -> Self {
        self.currency_id = Some(currency_id.into());
        self
    }

    pub fn benefited<I, S>(mut self, participant_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.benefited_ids = participant_ids.into_iter().map(Into::into).collect();
        self
    }

    /// Beneficiary ids without duplicates, first occurrence wins.
    pub(crate) fn unique_benefited_ids(&self) -> Vec<String> {
        let mut unique: Vec<String> = Vec::with_capacity(self.benefited_ids.len());
        for id in &self.benefited_ids {
            if !unique.contains(id) {
                unique.push(id.clone());
            }
        }
        unique
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "items")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub settlement_id: String,
    pub name: String,
    pub price: f64,
    pub quantity: i64,
    pub payer_id: Option<String>,
    pub currency_id: Option<String>,
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
    #[sea_orm(
        belongs_to = "super::participants::Entity",
        from = "Column::PayerId",
        to = "super::participants::Column::Id",
        on_update = "NoAction",
        on_delete = "SetNull"
    )]
    Payer,
    #[sea_orm(
        belongs_to = "super::currencies::Entity",
        from = "Column::CurrencyId",
        to = "super::currencies::Column::Id",
        on_update = "NoAction",
        on_delete = "SetNull"
    )]
    Currencies,
}

impl Related<super::settlements::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Settlements.def()
    }
}

impl Related<super::participants::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Payer.def()
    }
}

impl Related<super::currencies::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Currencies.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(currency: Option<Currency>) -> Item {
        Item {
            id: "i1".to_string(),
            name: "Dinner".to_string(),
            price: 12.5,
            quantity: 2,
            payer: Some(Participant::with_id("p1", "Alice")),
            currency,
            benefited: vec![
                Participant::with_id("p1", "Alice"),
                Participant::with_id("p2", "Bob"),
            ],
        }
    }

    #[test]
    fn native_total_defaults_to_rate_one() {
        assert_eq!(item(None).rate(), 1.0);
        assert_eq!(item(None).native_total(), 25.0);
    }

    #[test]
    fn native_total_applies_rate() {
        let item = item(Some(Currency::with_id("c1", "USD", 150.0)));
        assert_eq!(item.native_total(), 3750.0);
    }

    #[test]
    fn payer_and_beneficiaries_match_by_id() {
        let item = item(None);
        assert!(item.is_paid_by("p1"));
        assert!(!item.is_paid_by("p2"));
        assert!(item.is_benefited_by("p2"));
        assert!(!item.is_benefited_by("p3"));
    }

    #[test]
    fn draft_collapses_duplicate_beneficiaries() {
        let draft = ItemDraft::new("Taxi", 30.0, 1)
            .payer("p1")
            .benefited(["p2", "p1", "p2", "p3", "p1"]);

        assert_eq!(draft.payer_id.as_deref(), Some("p1"));
        assert_eq!(draft.unique_benefited_ids(), vec!["p2", "p1", "p3"]);
    }
}
