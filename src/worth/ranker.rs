use super::{ItemKey, ItemWorthLine};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

/// Turn raw item counts into an ordered breakdown capped at `budget`.
///
/// Steps:
/// 1. Bare global keys are dropped when a sub-keyed entry of the same global
///    has a positive count (the bare entry is a provider-side aggregate).
/// 2. Entries with no positive count, unit worth or total are dropped.
/// 3. Lines are ordered by unit worth, then total worth, both descending, then
///    by label so the output is fully deterministic.
/// 4. The whole sorted sequence is clamped against `budget`: lines that fit
///    are kept whole, the first that does not is reduced to the largest whole
///    amount that still fits, and the scan continues so cheaper lines can use
///    what is left.
/// 5. `limit` truncates the clamped result.
pub fn rank_breakdown<F>(
    counts: &HashMap<ItemKey, u64>,
    unit_worth: F,
    budget: Decimal,
    limit: Option<usize>,
) -> Vec<ItemWorthLine>
where
    F: Fn(&ItemKey) -> Option<Decimal>,
{
    if budget <= Decimal::ZERO || counts.is_empty() {
        return Vec::new();
    }

    let aggregated = globals_with_sub_keys(counts);

    let mut lines: Vec<ItemWorthLine> = counts
        .iter()
        .filter(|(key, amount)| **amount > 0 && !is_derived_aggregate(key, &aggregated))
        .filter_map(|(key, amount)| {
            let worth_each = unit_worth(key)?;
            ItemWorthLine::new(key.label(), *amount, worth_each)
        })
        .collect();

    lines.sort_by(rank_order);

    let mut clamped = clamp_to_budget(lines, budget);
    if let Some(limit) = limit {
        clamped.truncate(limit);
    }
    clamped
}

fn globals_with_sub_keys(counts: &HashMap<ItemKey, u64>) -> HashSet<&str> {
    counts
        .iter()
        .filter(|(key, amount)| **amount > 0 && !key.global.is_empty() && key.has_sub())
        .map(|(key, _)| key.global.as_str())
        .collect()
}

fn is_derived_aggregate(key: &ItemKey, aggregated: &HashSet<&str>) -> bool {
    !key.global.is_empty() && !key.has_sub() && aggregated.contains(key.global.as_str())
}

fn rank_order(a: &ItemWorthLine, b: &ItemWorthLine) -> Ordering {
    b.worth_each()
        .cmp(&a.worth_each())
        .then_with(|| b.worth_total().cmp(&a.worth_total()))
        .then_with(|| a.key().cmp(b.key()))
}

fn clamp_to_budget(sorted: Vec<ItemWorthLine>, budget: Decimal) -> Vec<ItemWorthLine> {
    let mut remaining = budget;
    let mut out = Vec::with_capacity(sorted.len());

    for line in sorted {
        // Every line is strictly positive, so nothing fits once the budget is spent.
        if remaining <= Decimal::ZERO {
            break;
        }

        if line.worth_total() <= remaining {
            remaining -= line.worth_total();
            out.push(line);
            continue;
        }

        let Some(amount) = fitting_amount(remaining, &line) else {
            continue;
        };
        let Some(partial) = line.with_amount(amount) else {
            continue;
        };
        if partial.worth_total() > remaining {
            continue;
        }

        remaining -= partial.worth_total();
        out.push(partial);
    }

    out
}

/// Largest whole amount of `line` whose total fits in `remaining`, truncated
/// toward zero and never above the line's own amount.
fn fitting_amount(remaining: Decimal, line: &ItemWorthLine) -> Option<u64> {
    let whole = remaining.checked_div(line.worth_each())?.trunc();
    let amount = whole.to_u64()?.min(line.amount());
    (amount > 0).then_some(amount)
}
