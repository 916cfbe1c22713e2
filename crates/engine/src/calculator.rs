//! Cost splitting.
//!
//! [`compute`] turns a [`Settlement`] into a [`SettlementResult`]. It is a pure
//! function: no I/O, no cached state, the same aggregate always produces the
//! same result, so it can be called once per snapshot from any thread.
//!
//! ## Rounding
//!
//! Intermediate values are `f64`, every value that reaches the result is an
//! integer number of native units:
//!
//! - each beneficiary's share of an item is floored on its own;
//! - a participant's payments are summed first and floored once.
//!
//! The two rules don't cancel out, so the differences of all participants
//! rarely add up to zero. The residual is reported as
//! [`SettlementResult::surplus`] and never redistributed.
//!
//! Stored costs are capped at [`MAX_NATIVE_TOTAL`](crate::MAX_NATIVE_TOTAL).
//! An aggregate built by hand can still exceed it; sums then saturate at
//! `i64::MIN`/`i64::MAX` instead of wrapping.

use serde::{Deserialize, Serialize};

use crate::{EngineError, Item, Participant, ResultEngine, Settlement};

/// Per-participant outcome of a settlement.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementResultDetail {
    pub participant: Participant,
    /// Sum of the participant's floored shares.
    pub expenditures: i64,
    /// Floored total of what the participant paid.
    pub payments: i64,
    /// `expenditures - payments`.
    pub differences: i64,
    /// `(item name, share)` for every item the participant benefits from, in
    /// item order.
    pub items: Vec<(String, i64)>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementResult {
    /// Sum of every detail's `differences`.
    pub surplus: i64,
    /// One detail per participant, in participant order.
    pub details: Vec<SettlementResultDetail>,
}

impl SettlementResult {
    pub fn detail_for(&self, participant_id: &str) -> Option<&SettlementResultDetail> {
        self.details
            .iter()
            .find(|detail| detail.participant.id == participant_id)
    }

    /// [`detail_for`](SettlementResult::detail_for), failing with
    /// [`EngineError::KeyNotFound`] for an unknown participant.
    pub fn require_detail(&self, participant_id: &str) -> ResultEngine<&SettlementResultDetail> {
        self.detail_for(participant_id)
            .ok_or_else(|| EngineError::KeyNotFound("participant not exists".to_string()))
    }
}

/// Split every item of `settlement` between its beneficiaries and balance it
/// against what each participant paid.
#[must_use]
pub fn compute(settlement: &Settlement) -> SettlementResult {
    let details: Vec<SettlementResultDetail> = settlement
        .participants
        .iter()
        .map(|participant| detail(participant, &settlement.items))
        .collect();

    let surplus = details
        .iter()
        .map(|detail| detail.differences)
        .fold(0_i64, i64::saturating_add);

    SettlementResult { surplus, details }
}

fn detail(participant: &Participant, items: &[Item]) -> SettlementResultDetail {
    let shares: Vec<(String, i64)> = items
        .iter()
        .filter(|item| item.is_benefited_by(&participant.id))
        .filter_map(|item| share(item).map(|share| (item.name.clone(), share)))
        .collect();

    let expenditures = shares
        .iter()
        .map(|(_, share)| *share)
        .fold(0_i64, i64::saturating_add);

    let paid = items
        .iter()
        .filter(|item| item.is_paid_by(&participant.id))
        .fold(0.0_f64, |total, item| total + item.native_total());
    let payments = floor_to_units(paid);

    SettlementResultDetail {
        participant: participant.clone(),
        expenditures,
        payments,
        differences: expenditures.saturating_sub(payments),
        items: shares,
    }
}

/// Floored share of one beneficiary, `None` when nobody benefits from the
/// item (the cost is then carried by no one).
fn share(item: &Item) -> Option<i64> {
    if item.benefited.is_empty() {
        return None;
    }
    Some(floor_to_units(item.native_total() / item.benefited.len() as f64))
}

fn floor_to_units(value: f64) -> i64 {
    value.floor() as i64
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::Currency;

    fn participants() -> (Participant, Participant, Participant) {
        (
            Participant::with_id("p1", "participant1"),
            Participant::with_id("p2", "participant2"),
            Participant::with_id("p3", "participant3"),
        )
    }

    fn item(
        name: &str,
        price: f64,
        quantity: u32,
        payer: Option<&Participant>,
        currency: Option<&Currency>,
        benefited: &[&Participant],
    ) -> Item {
        Item {
            id: format!("id-{name}"),
            name: name.to_string(),
            price,
            quantity,
            payer: payer.cloned(),
            currency: currency.cloned(),
            benefited: benefited.iter().map(|p| (*p).clone()).collect(),
        }
    }

    fn settlement(items: Vec<Item>, participants: Vec<Participant>) -> Settlement {
        let mut settlement = Settlement::new(
            "settlement".to_string(),
            Utc.timestamp_opt(0, 0).unwrap(),
        );
        settlement.items = items;
        settlement.participants = participants;
        settlement
    }

    fn assert_detail(
        detail: &SettlementResultDetail,
        participant: &Participant,
        (expenditures, payments, differences): (i64, i64, i64),
        items: &[(&str, i64)],
    ) {
        assert_eq!(&detail.participant, participant);
        assert_eq!(detail.expenditures, expenditures);
        assert_eq!(detail.payments, payments);
        assert_eq!(detail.differences, differences);
        let items: Vec<(String, i64)> = items
            .iter()
            .map(|(name, share)| (name.to_string(), *share))
            .collect();
        assert_eq!(detail.items, items);
    }

    #[test]
    fn single_item_split_between_two() {
        let (p1, p2, _) = participants();
        let s = settlement(
            vec![item("item1", 100.0, 1, Some(&p1), None, &[&p1, &p2])],
            vec![p1.clone(), p2.clone()],
        );

        let result = compute(&s);

        assert_eq!(result.surplus, 0);
        assert_detail(&result.details[0], &p1, (50, 100, 50), &[("item1", 50)]);
        assert_detail(&result.details[1], &p2, (50, 0, -50), &[("item1", 50)]);
    }

    #[test]
    fn foreign_currency_is_converted() {
        let (p1, _, _) = participants();
        let usd = Currency::with_id("c1", "USD", 150.0);
        let s = settlement(
            vec![item("item1", 10.0, 1, Some(&p1), Some(&usd), &[&p1])],
            vec![p1.clone()],
        );

        let result = compute(&s);

        assert_eq!(result.surplus, 0);
        assert_detail(&result.details[0], &p1, (1500, 1500, 0), &[("item1", 1500)]);
    }

    #[test]
    fn mixed_benefit_sets_leave_a_surplus() {
        let (p1, p2, p3) = participants();
        let usd = Currency::with_id("c1", "USD", 150.0);
        let s = settlement(
            vec![
                item("item1", 100.0, 2, Some(&p1), None, &[&p1, &p2, &p3]),
                item("item2", 200.0, 1, Some(&p2), Some(&usd), &[&p1, &p2, &p3]),
                item("item3", 500.0, 1, Some(&p3), None, &[&p2, &p3]),
            ],
            vec![p1.clone(), p2.clone(), p3.clone()],
        );

        let result = compute(&s);

        assert_eq!(result.surplus, -2);
        assert_eq!(result.details.len(), 3);
        assert_detail(
            &result.details[0],
            &p1,
            (10066, 200, 9866),
            &[("item1", 66), ("item2", 10000)],
        );
        assert_detail(
            &result.details[1],
            &p2,
            (10316, 30000, -19684),
            &[("item1", 66), ("item2", 10000), ("item3", 250)],
        );
        assert_detail(
            &result.details[2],
            &p3,
            (10316, 500, 9816),
            &[("item1", 66), ("item2", 10000), ("item3", 250)],
        );
    }

    #[test]
    fn missing_currency_behaves_like_rate_one() {
        let (p1, p2, p3) = participants();
        let native = Currency::with_id("c1", "JPY", 1.0);
        let build = |currency: Option<&Currency>| {
            settlement(
                vec![
                    item("item1", 99.99, 3, Some(&p1), currency, &[&p1, &p2, &p3]),
                    item("item2", 10.0, 7, Some(&p2), currency, &[&p3]),
                ],
                vec![p1.clone(), p2.clone(), p3.clone()],
            )
        };

        assert_eq!(compute(&build(None)), compute(&build(Some(&native))));
    }

    #[test]
    fn item_without_beneficiaries_is_skipped() {
        let (p1, p2, _) = participants();
        let s = settlement(
            vec![
                item("orphan", 300.0, 1, Some(&p1), None, &[]),
                item("shared", 10.0, 1, Some(&p2), None, &[&p1, &p2]),
            ],
            vec![p1.clone(), p2.clone()],
        );

        let result = compute(&s);

        // The payer still paid for the orphan item, nobody carries its cost.
        assert_detail(&result.details[0], &p1, (5, 300, -295), &[("shared", 5)]);
        assert_detail(&result.details[1], &p2, (5, 10, -5), &[("shared", 5)]);
        assert_eq!(result.surplus, -300);
    }

    #[test]
    fn item_without_payer_is_not_paid_by_anyone() {
        let (p1, p2, _) = participants();
        let s = settlement(
            vec![item("gift", 41.0, 1, None, None, &[&p1, &p2])],
            vec![p1.clone(), p2.clone()],
        );

        let result = compute(&s);

        assert!(result.details.iter().all(|detail| detail.payments == 0));
        assert_eq!(result.surplus, 40);
    }

    #[test]
    fn payments_are_floored_once_on_the_total() {
        let (p1, p2, _) = participants();
        let s = settlement(
            vec![
                item("a", 0.6, 1, Some(&p1), None, &[&p2]),
                item("b", 0.6, 1, Some(&p1), None, &[&p2]),
            ],
            vec![p1.clone(), p2.clone()],
        );

        let result = compute(&s);

        // 0.6 + 0.6 floors to 1, two floored 0.6 would give 0.
        assert_eq!(result.details[0].payments, 1);
        assert_eq!(result.details[1].expenditures, 0);
    }

    #[test]
    fn empty_settlement_has_empty_result() {
        let result = compute(&settlement(Vec::new(), Vec::new()));
        assert_eq!(result, SettlementResult::default());
    }

    #[test]
    fn compute_is_repeatable() {
        let (p1, p2, p3) = participants();
        let s = settlement(
            vec![item("item1", 33.33, 3, Some(&p3), None, &[&p1, &p2, &p3])],
            vec![p1, p2, p3],
        );

        let first = compute(&s);
        for _ in 0..5 {
            assert_eq!(compute(&s), first);
        }
    }

    #[test]
    fn detail_for_finds_participant() {
        let (p1, p2, _) = participants();
        let s = settlement(
            vec![item("item1", 100.0, 1, Some(&p1), None, &[&p1, &p2])],
            vec![p1, p2],
        );

        let result = compute(&s);

        assert_eq!(result.detail_for("p2").map(|d| d.differences), Some(-50));
        assert!(result.detail_for("nobody").is_none());
    }

    #[test]
    fn require_detail_rejects_unknown_participant() {
        let (p1, _, _) = participants();
        let s = settlement(
            vec![item("item1", 100.0, 1, Some(&p1), None, &[&p1])],
            vec![p1],
        );

        let result = compute(&s);

        assert_eq!(result.require_detail("p1").map(|d| d.payments), Ok(100));
        assert_eq!(
            result.require_detail("nobody"),
            Err(EngineError::KeyNotFound("participant not exists".to_string()))
        );
    }

    #[test]
    fn oversized_costs_saturate_instead_of_overflowing() {
        let (p1, p2, _) = participants();
        let s = settlement(
            vec![
                item("huge1", 6e18, 1, None, None, &[&p1]),
                item("huge2", 6e18, 1, None, None, &[&p1]),
                item("paid", 1e20, 1, Some(&p2), None, &[]),
            ],
            vec![p1.clone(), p2.clone()],
        );

        let result = compute(&s);

        assert_detail(
            &result.details[0],
            &p1,
            (i64::MAX, 0, i64::MAX),
            &[("huge1", 6_000_000_000_000_000_000), ("huge2", 6_000_000_000_000_000_000)],
        );
        assert_eq!(result.details[1].payments, i64::MAX);
        assert_eq!(result.details[1].differences, -i64::MAX);
        assert_eq!(result.surplus, 0);
    }
}
