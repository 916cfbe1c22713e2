//! Plain text output of the CLI.

use std::fmt::Write;

use engine::{Item, Settlement, SettlementListItem, SettlementResult, SettlementResultDetail};

pub fn settlement_list(settlements: &[SettlementListItem]) -> String {
    let mut out = String::new();
    for settlement in settlements {
        let names: Vec<&str> = settlement
            .participants
            .iter()
            .map(|participant| participant.name.as_str())
            .collect();
        let _ = writeln!(
            out,
            "{}  {}  [{}]  last opened {}",
            settlement.id,
            settlement.name,
            names.join(", "),
            settlement.last_accessed_at.to_rfc3339()
        );
    }
    out
}

pub fn settlement(settlement: &Settlement) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{} ({})", settlement.name, settlement.id);

    let _ = writeln!(out, "participants:");
    for participant in &settlement.participants {
        let _ = writeln!(out, "  {}  {}", participant.id, participant.name);
    }

    let _ = writeln!(out, "currencies:");
    for currency in &settlement.currencies {
        let _ = writeln!(
            out,
            "  {}  {} = {}",
            currency.id, currency.symbol, currency.rate
        );
    }

    let _ = writeln!(out, "items:");
    for item in &settlement.items {
        let _ = writeln!(out, "  {}  {}", item.id, item_line(item));
    }
    out
}

fn item_line(item: &Item) -> String {
    let symbol = item
        .currency
        .as_ref()
        .map_or("", |currency| currency.symbol.as_str());
    let payer = item
        .payer
        .as_ref()
        .map_or("-", |payer| payer.name.as_str());
    let benefited: Vec<&str> = item
        .benefited
        .iter()
        .map(|participant| participant.name.as_str())
        .collect();
    format!(
        "{} {}{} x{} paid by {} for [{}]",
        item.name,
        item.price,
        symbol,
        item.quantity,
        payer,
        benefited.join(", ")
    )
}

/// Result table of every participant followed by the surplus.
pub fn result(result: &SettlementResult) -> String {
    let mut out = String::new();
    for detail in &result.details {
        out.push_str(&detail_text(detail));
    }
    let _ = writeln!(out, "surplus {}", result.surplus);
    out
}

pub fn detail_text(detail: &SettlementResultDetail) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{}: expenditures {} payments {} differences {}",
        detail.participant.name, detail.expenditures, detail.payments, detail.differences
    );
    for (name, share) in &detail.items {
        let _ = writeln!(out, "  {name} {share}");
    }
    out
}

#[cfg(test)]
mod tests {
    use engine::Participant;

    use super::*;

    fn sample() -> SettlementResult {
        SettlementResult {
            surplus: 0,
            details: vec![
                SettlementResultDetail {
                    participant: Participant::with_id("p1", "Alice"),
                    expenditures: 50,
                    payments: 100,
                    differences: 50,
                    items: vec![("Dinner".to_string(), 50)],
                },
                SettlementResultDetail {
                    participant: Participant::with_id("p2", "Bob"),
                    expenditures: 50,
                    payments: 0,
                    differences: -50,
                    items: vec![("Dinner".to_string(), 50)],
                },
            ],
        }
    }

    #[test]
    fn full_result_ends_with_surplus() {
        let text = result(&sample());
        assert_eq!(
            text,
            "Alice: expenditures 50 payments 100 differences 50\n  Dinner 50\n\
             Bob: expenditures 50 payments 0 differences -50\n  Dinner 50\n\
             surplus 0\n"
        );
    }

    #[test]
    fn single_participant_result() {
        let sample = sample();
        let text = detail_text(&sample.details[1]);
        assert_eq!(text, "Bob: expenditures 50 payments 0 differences -50\n  Dinner 50\n");
    }
}
