//! Turns stored rows into a fully resolved [`Settlement`].
//!
//! Nothing here computes money: payer, currency and beneficiary ids are
//! replaced by owned copies of the entities they point to. A reference that
//! does not resolve inside the same settlement is a broken invariant of the
//! store and fails loudly with [`EngineError::BrokenReference`].

use std::collections::HashMap;

use crate::{
    Currency, EngineError, Item, Participant, ResultEngine, Settlement, benefited, currencies,
    items, participants, settlements,
    util::{model_quantity, validate_native_total},
};

/// Every row belonging to one settlement, as loaded from the store.
///
/// Collections are expected in display order (the `position` column); the
/// assembled aggregate keeps that order.
#[derive(Clone, Debug, PartialEq)]
pub struct SettlementRows {
    pub settlement: settlements::Model,
    pub participants: Vec<participants::Model>,
    pub currencies: Vec<currencies::Model>,
    pub items: Vec<items::Model>,
    pub benefited: Vec<benefited::Model>,
}

impl TryFrom<SettlementRows> for Settlement {
    type Error = EngineError;

    fn try_from(rows: SettlementRows) -> Result<Self, Self::Error> {
        let settlement_id = rows.settlement.id.clone();

        let participants: Vec<Participant> =
            rows.participants.into_iter().map(Participant::from).collect();
        let currencies = rows
            .currencies
            .into_iter()
            .map(Currency::try_from)
            .collect::<ResultEngine<Vec<Currency>>>()?;

        let participants_by_id: HashMap<&str, &Participant> = participants
            .iter()
            .map(|participant| (participant.id.as_str(), participant))
            .collect();
        let currencies_by_id: HashMap<&str, &Currency> = currencies
            .iter()
            .map(|currency| (currency.id.as_str(), currency))
            .collect();

        let mut benefited_by_item: HashMap<&str, Vec<&benefited::Model>> = HashMap::new();
        for row in &rows.benefited {
            benefited_by_item
                .entry(row.item_id.as_str())
                .or_default()
                .push(row);
        }
        for entries in benefited_by_item.values_mut() {
            entries.sort_by_key(|row| row.position);
        }

        let resolve_participant = |id: &str, role: &str, item_id: &str| {
            participants_by_id
                .get(id)
                .map(|participant| (*participant).clone())
                .ok_or_else(|| {
                    EngineError::BrokenReference(format!(
                        "{role} '{id}' of item '{item_id}' is not a participant of settlement '{settlement_id}'"
                    ))
                })
        };

        let mut items = Vec::with_capacity(rows.items.len());
        for model in &rows.items {
            let payer = model
                .payer_id
                .as_deref()
                .map(|id| resolve_participant(id, "payer", &model.id))
                .transpose()?;

            let currency = model
                .currency_id
                .as_deref()
                .map(|id| {
                    currencies_by_id
                        .get(id)
                        .map(|currency| (*currency).clone())
                        .ok_or_else(|| {
                            EngineError::BrokenReference(format!(
                                "currency '{id}' of item '{}' is not declared in settlement '{settlement_id}'",
                                model.id
                            ))
                        })
                })
                .transpose()?;

            let benefited = benefited_by_item
                .get(model.id.as_str())
                .map(|entries| {
                    entries
                        .iter()
                        .map(|row| resolve_participant(&row.participant_id, "beneficiary", &model.id))
                        .collect::<ResultEngine<Vec<Participant>>>()
                })
                .transpose()?
                .unwrap_or_default();

            let quantity = model_quantity(&model.id, model.quantity)?;
            let rate = currency.as_ref().map_or(1.0, |currency| currency.rate);
            validate_native_total(&model.name, model.price, rate, quantity)?;

            items.push(Item {
                id: model.id.clone(),
                name: model.name.clone(),
                price: model.price,
                quantity,
                payer,
                currency,
                benefited,
            });
        }

        Ok(Settlement {
            id: rows.settlement.id,
            name: rows.settlement.name,
            items,
            participants,
            currencies,
            updated_at: rows.settlement.updated_at,
            last_accessed_at: rows.settlement.last_accessed_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;

    fn settlement_model() -> settlements::Model {
        settlements::Model {
            id: "s1".to_string(),
            name: "Trip".to_string(),
            updated_at: Utc.timestamp_opt(10, 0).unwrap(),
            last_accessed_at: Utc.timestamp_opt(20, 0).unwrap(),
        }
    }

    fn participant(id: &str, name: &str, position: i64) -> participants::Model {
        participants::Model {
            id: id.to_string(),
            settlement_id: "s1".to_string(),
            name: name.to_string(),
            position,
        }
    }

    fn item(id: &str, payer_id: Option<&str>, currency_id: Option<&str>) -> items::Model {
        items::Model {
            id: id.to_string(),
            settlement_id: "s1".to_string(),
            name: format!("item {id}"),
            price: 100.0,
            quantity: 2,
            payer_id: payer_id.map(str::to_string),
            currency_id: currency_id.map(str::to_string),
            position: 1,
        }
    }

    fn benefit(item_id: &str, participant_id: &str, position: i64) -> benefited::Model {
        benefited::Model {
            item_id: item_id.to_string(),
            participant_id: participant_id.to_string(),
            position,
        }
    }

    fn rows() -> SettlementRows {
        SettlementRows {
            settlement: settlement_model(),
            participants: vec![participant("p1", "Alice", 1), participant("p2", "Bob", 2)],
            currencies: vec![currencies::Model {
                id: "c1".to_string(),
                settlement_id: "s1".to_string(),
                symbol: "USD".to_string(),
                rate: 150.0,
                position: 1,
            }],
            items: vec![item("i1", Some("p1"), Some("c1")), item("i2", None, None)],
            benefited: vec![
                benefit("i1", "p2", 2),
                benefit("i1", "p1", 1),
                benefit("i2", "p2", 1),
            ],
        }
    }

    #[test]
    fn resolves_references_into_owned_copies() {
        let settlement = Settlement::try_from(rows()).unwrap();

        assert_eq!(settlement.id, "s1");
        assert_eq!(settlement.participants.len(), 2);
        assert_eq!(settlement.currencies.len(), 1);
        assert_eq!(settlement.last_accessed_at, Utc.timestamp_opt(20, 0).unwrap());

        let first = &settlement.items[0];
        assert_eq!(first.payer, Some(Participant::with_id("p1", "Alice")));
        assert_eq!(first.currency, Some(Currency::with_id("c1", "USD", 150.0)));
        assert_eq!(
            first.benefited,
            vec![
                Participant::with_id("p1", "Alice"),
                Participant::with_id("p2", "Bob")
            ]
        );
        assert_eq!(first.quantity, 2);

        let second = &settlement.items[1];
        assert!(second.payer.is_none());
        assert!(second.currency.is_none());
        assert_eq!(second.benefited, vec![Participant::with_id("p2", "Bob")]);
    }

    #[test]
    fn item_without_benefit_rows_has_empty_set() {
        let mut rows = rows();
        rows.benefited.clear();

        let settlement = Settlement::try_from(rows).unwrap();
        assert!(settlement.items.iter().all(|item| item.benefited.is_empty()));
    }

    #[test]
    fn dangling_payer_is_a_broken_reference() {
        let mut rows = rows();
        rows.items[1].payer_id = Some("ghost".to_string());

        assert_eq!(
            Settlement::try_from(rows),
            Err(EngineError::BrokenReference(
                "payer 'ghost' of item 'i2' is not a participant of settlement 's1'".to_string()
            ))
        );
    }

    #[test]
    fn dangling_currency_is_a_broken_reference() {
        let mut rows = rows();
        rows.items[1].currency_id = Some("JPY".to_string());

        assert!(matches!(
            Settlement::try_from(rows),
            Err(EngineError::BrokenReference(_))
        ));
    }

    #[test]
    fn dangling_beneficiary_is_a_broken_reference() {
        let mut rows = rows();
        rows.benefited.push(benefit("i2", "p3", 2));

        assert_eq!(
            Settlement::try_from(rows),
            Err(EngineError::BrokenReference(
                "beneficiary 'p3' of item 'i2' is not a participant of settlement 's1'".to_string()
            ))
        );
    }

    #[test]
    fn stored_invalid_rate_is_rejected() {
        let mut rows = rows();
        rows.currencies[0].rate = 0.0;

        assert!(matches!(
            Settlement::try_from(rows),
            Err(EngineError::InvalidRate(_))
        ));
    }

    #[test]
    fn stored_cost_past_the_native_cap_is_rejected() {
        let mut rows = rows();
        rows.items[0].price = 1e13;

        assert!(matches!(
            Settlement::try_from(rows),
            Err(EngineError::InvalidAmount(_))
        ));
    }
}
