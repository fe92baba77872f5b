//! Summary statistics over a penalty list.

use serde::Serialize;

use crate::model::{Amount, Penalty, PenaltyStatus};

/// Totals shown on the dashboard. Recomputed from the full list every time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    pub total_penalties: usize,
    pub total_amount: Amount,
    pub pending_amount: Amount,
    pub paid_amount: Amount,
    pub disputed_amount: Amount,
}

impl Stats {
    /// Amount held by penalties without a recognised status.
    #[must_use]
    pub fn unclassified_amount(&self) -> Amount {
        self.total_amount - self.pending_amount - self.paid_amount - self.disputed_amount
    }
}

/// Count and sum `penalties`. Missing amounts count as zero.
#[must_use]
pub fn summarize(penalties: &[Penalty]) -> Stats {
    penalties
        .iter()
        .fold(Stats::default(), |mut stats, penalty| {
            let amount = penalty.fields.amount();
            stats.total_penalties += 1;
            stats.total_amount = stats.total_amount + amount;
            match penalty.fields.status {
                Some(PenaltyStatus::Pending) => stats.pending_amount = stats.pending_amount + amount,
                Some(PenaltyStatus::Paid) => stats.paid_amount = stats.paid_amount + amount,
                Some(PenaltyStatus::Disputed) => {
                    stats.disputed_amount = stats.disputed_amount + amount;
                }
                None => {}
            }
            stats
        })
}
