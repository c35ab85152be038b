//! Fraud heuristic over the member population.
//!
//! A coarse first-pass filter: members sitting on a large point balance with
//! an empty wallet are flagged for manual review. There is no scoring and no
//! time-window analysis.

use serde::Deserialize;
use tracing::warn;

use crate::Amount;
use crate::engine::Member;

/// Thresholds for the points-hoarding check.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct FraudThresholds {
    /// Flag when the point balance is strictly above this.
    pub min_points: u64,
    /// Flag when the wallet is at or below this.
    pub max_wallet: Amount,
}

impl Default for FraudThresholds {
    fn default() -> Self {
        Self {
            min_points: 50_000,
            max_wallet: Amount::ZERO,
        }
    }
}

impl FraudThresholds {
    pub fn is_suspicious(&self, member: &Member) -> bool {
        member.points > self.min_points && member.wallet <= self.max_wallet
    }
}

#[derive(Debug, Clone)]
pub struct FraudReport {
    pub total_members: usize,
    pub suspicious_count: usize,
    pub suspicious: Vec<Member>,
}

pub fn scan<'a>(
    members: impl IntoIterator<Item = &'a Member>,
    thresholds: &FraudThresholds,
) -> FraudReport {
    let mut total_members = 0;
    let mut suspicious = Vec::new();

    for member in members {
        total_members += 1;
        if thresholds.is_suspicious(member) {
            warn!(
                member = %member.membership_no,
                points = member.points,
                wallet = %member.wallet,
                "member flagged by fraud heuristic"
            );
            suspicious.push(member.clone());
        }
    }

    FraudReport {
        total_members,
        suspicious_count: suspicious.len(),
        suspicious,
    }
}
