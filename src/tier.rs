//! Tier assignment strategies.
//!
//! Two rules exist for re-tiering a member after a purchase: by rolling
//! spend, or by point balance. Which one applies is a configuration choice.

use serde::Deserialize;

use crate::engine::Member;
use crate::model::Tier;
use crate::policy::TierPolicy;

pub trait TierStrategy: Send + Sync {
    /// Tier the member should hold given their current balances.
    fn assign(&self, member: &Member, policy: &TierPolicy) -> Tier;
}

/// Highest tier whose spend floor the member's rolling spend has reached.
///
/// Pure function of rolling spend. Spend never decays, so across
/// settlements the result never goes down.
#[derive(Debug, Default, Clone, Copy)]
pub struct SpendBasedTierStrategy;

impl TierStrategy for SpendBasedTierStrategy {
    fn assign(&self, member: &Member, policy: &TierPolicy) -> Tier {
        Tier::ALL
            .into_iter()
            .rev()
            .find(|tier| member.rolling_spend >= policy.rules(*tier).spend_floor)
            .unwrap_or(Tier::Gold)
    }
}

/// Promote from the current tier while the point balance reaches the
/// tier's upgrade threshold. Never demotes.
#[derive(Debug, Default, Clone, Copy)]
pub struct PointsBasedTierStrategy;

impl TierStrategy for PointsBasedTierStrategy {
    fn assign(&self, member: &Member, policy: &TierPolicy) -> Tier {
        let mut tier = member.tier;
        while let (Some(threshold), Some(next)) = (policy.rules(tier).upgrade_points, tier.next()) {
            if member.points < threshold {
                break;
            }
            tier = next;
        }
        tier
    }
}

/// Configuration selector for the tier strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TierStrategyKind {
    #[default]
    Spend,
    Points,
}

impl TierStrategyKind {
    pub fn build(self) -> Box<dyn TierStrategy> {
        match self {
            TierStrategyKind::Spend => Box::new(SpendBasedTierStrategy),
            TierStrategyKind::Points => Box::new(PointsBasedTierStrategy),
        }
    }
}
