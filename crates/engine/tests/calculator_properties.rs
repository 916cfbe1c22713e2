use chrono::{TimeZone, Utc};
use proptest::prelude::*;

use engine::{Currency, Item, Participant, Settlement, compute};

fn settlement(
    member_count: usize,
    prices: &[u32],
    quantities: &[u32],
    payer_indexes: &[usize],
    benefit_masks: &[usize],
    rate: Option<f64>,
) -> Settlement {
    let participants: Vec<Participant> = (0..member_count)
        .map(|idx| Participant::with_id(format!("p{idx}"), format!("participant{idx}")))
        .collect();
    let currency = rate.map(|rate| Currency::with_id("c1", "FX", rate));

    let items = prices
        .iter()
        .enumerate()
        .map(|(idx, cents)| {
            let mask = benefit_masks.get(idx).copied().unwrap_or(0);
            let benefited = participants
                .iter()
                .enumerate()
                .filter(|(member, _)| mask & (1 << member) != 0)
                .map(|(_, participant)| participant.clone())
                .collect();
            let payer = payer_indexes
                .get(idx)
                .map(|payer_idx| participants[payer_idx % member_count].clone());
            Item {
                id: format!("i{idx}"),
                name: format!("item{idx}"),
                price: f64::from(*cents) / 100.0,
                quantity: quantities.get(idx).copied().unwrap_or(1),
                payer,
                currency: if idx % 2 == 0 { currency.clone() } else { None },
                benefited,
            }
        })
        .collect();

    let mut settlement = Settlement::new("props".to_string(), Utc.timestamp_opt(0, 0).unwrap());
    settlement.participants = participants;
    settlement.items = items;
    settlement
}

proptest! {
    #[test]
    fn expenditures_are_the_sum_of_shares(
        member_count in 1usize..=6,
        prices in prop::collection::vec(0u32..=1_000_000, 0..=20),
        quantities in prop::collection::vec(0u32..=10, 0..=20),
        payer_indexes in prop::collection::vec(0usize..=5, 0..=20),
        benefit_masks in prop::collection::vec(0usize..=63, 0..=20),
        rate in prop::option::of(0.01f64..=500.0),
    ) {
        let settlement = settlement(member_count, &prices, &quantities, &payer_indexes, &benefit_masks, rate);
        let result = compute(&settlement);

        prop_assert_eq!(result.details.len(), member_count);
        for detail in &result.details {
            let shares: i64 = detail.items.iter().map(|(_, share)| share).sum();
            prop_assert_eq!(detail.expenditures, shares);
            prop_assert_eq!(detail.differences, detail.expenditures - detail.payments);
            prop_assert!(detail.payments >= 0);
        }
    }

    #[test]
    fn surplus_is_the_sum_of_differences(
        member_count in 1usize..=6,
        prices in prop::collection::vec(0u32..=1_000_000, 0..=20),
        quantities in prop::collection::vec(0u32..=10, 0..=20),
        payer_indexes in prop::collection::vec(0usize..=5, 0..=20),
        benefit_masks in prop::collection::vec(0usize..=63, 0..=20),
        rate in prop::option::of(0.01f64..=500.0),
    ) {
        let settlement = settlement(member_count, &prices, &quantities, &payer_indexes, &benefit_masks, rate);
        let result = compute(&settlement);

        let differences: i64 = result.details.iter().map(|detail| detail.differences).sum();
        prop_assert_eq!(result.surplus, differences);
    }

    #[test]
    fn compute_is_idempotent(
        member_count in 1usize..=6,
        prices in prop::collection::vec(0u32..=1_000_000, 0..=20),
        payer_indexes in prop::collection::vec(0usize..=5, 0..=20),
        benefit_masks in prop::collection::vec(0usize..=63, 0..=20),
    ) {
        let settlement = settlement(member_count, &prices, &[], &payer_indexes, &benefit_masks, Some(1.5));
        prop_assert_eq!(compute(&settlement), compute(&settlement));
    }

    #[test]
    fn native_currency_matches_missing_currency(
        member_count in 1usize..=6,
        prices in prop::collection::vec(0u32..=1_000_000, 0..=20),
        payer_indexes in prop::collection::vec(0usize..=5, 0..=20),
        benefit_masks in prop::collection::vec(0usize..=63, 0..=20),
    ) {
        let with_rate_one = settlement(member_count, &prices, &[], &payer_indexes, &benefit_masks, Some(1.0));
        let without = settlement(member_count, &prices, &[], &payer_indexes, &benefit_masks, None);
        prop_assert_eq!(compute(&with_rate_one), compute(&without));
    }
}
