//! Item selection heuristic: which item to move, given a target amount
//! to shed and the receiver's capability set.
//!
//! Prefers the largest single item that does not overshoot the target,
//! to minimize the number of rounds needed to converge and avoid
//! oscillation. When nothing fits under the target, falls back to the
//! globally lightest capability-compatible item; when nothing is
//! compatible at all, reports no candidate and the round aborts.

use std::collections::HashSet;

use crate::ledger::Item;

/// Pick the item to transfer.
///
/// Pool: items with `magnitude <= shed_amount` whose requirements are a
/// subset of `receiver_capabilities`. The winner minimizes
/// `|magnitude - shed_amount|`, ties broken by ledger order. An empty
/// pool falls back to the lightest compatible item.
pub fn select_item_to_shed<'a>(
    items: &'a [Item],
    shed_amount: f64,
    receiver_capabilities: &HashSet<String>,
) -> Option<&'a Item> {
    let compatible = || {
        items
            .iter()
            .filter(|item| item.compatible_with(receiver_capabilities))
    };

    let best_under_target = compatible()
        .filter(|item| item.magnitude <= shed_amount)
        .fold(None::<&Item>, |best, item| match best {
            Some(current)
                if (current.magnitude - shed_amount).abs()
                    <= (item.magnitude - shed_amount).abs() =>
            {
                Some(current)
            }
            _ => Some(item),
        });

    if best_under_target.is_some() {
        return best_under_target;
    }

    // Nothing fits under the target: lightest compatible item, if any.
    compatible().fold(None::<&Item>, |best, item| match best {
        Some(current) if current.magnitude <= item.magnitude => Some(current),
        _ => Some(item),
    })
}
