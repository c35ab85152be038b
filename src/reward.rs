//! Reward catalog and eligibility rules.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate};
use dashmap::DashMap;
use thiserror::Error;

use crate::Amount;
use crate::engine::{Member, RedemptionError};
use crate::model::{MemberId, ParseError, RewardId, Tier};

/// Rolling spend every member needs before any reward unlocks.
pub const DEFAULT_ENGAGEMENT_FLOOR: i64 = 750;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TierRequirement {
    Any,
    Only(Tier),
}

impl TierRequirement {
    pub fn admits(self, tier: Tier) -> bool {
        match self {
            TierRequirement::Any => true,
            TierRequirement::Only(required) => required == tier,
        }
    }
}

impl FromStr for TierRequirement {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("any") {
            return Ok(TierRequirement::Any);
        }
        s.parse().map(TierRequirement::Only)
    }
}

impl fmt::Display for TierRequirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TierRequirement::Any => f.write_str("ANY"),
            TierRequirement::Only(tier) => write!(f, "{tier}"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Reward {
    pub id: RewardId,
    pub name: String,
    pub points_required: u64,
    pub tier_required: TierRequirement,
    pub max_redemptions_per_month: Option<u32>,
    pub blackout_dates: Vec<NaiveDate>,
    pub vip_table_required: bool,
}

/// First clause a member failed, in evaluation order.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum Ineligible {
    #[error("needs {required} points, has {balance}")]
    InsufficientPoints { balance: u64, required: u64 },
    #[error("reserved for {required} members, member is {actual}")]
    TierMismatch { required: TierRequirement, actual: Tier },
    #[error("rolling spend {spend} below engagement floor {floor}")]
    BelowEngagementFloor { spend: Amount, floor: Amount },
    #[error("requires an active VIP table booking")]
    VipTableRequired,
}

/// Check eligibility clause by clause, stopping at the first failure.
pub fn check(member: &Member, reward: &Reward, engagement_floor: Amount) -> Result<(), Ineligible> {
    if member.points < reward.points_required {
        return Err(Ineligible::InsufficientPoints {
            balance: member.points,
            required: reward.points_required,
        });
    }
    if !reward.tier_required.admits(member.tier) {
        return Err(Ineligible::TierMismatch {
            required: reward.tier_required,
            actual: member.tier,
        });
    }
    if member.rolling_spend < engagement_floor {
        return Err(Ineligible::BelowEngagementFloor {
            spend: member.rolling_spend,
            floor: engagement_floor,
        });
    }
    if reward.vip_table_required && !member.vip_booking {
        return Err(Ineligible::VipTableRequired);
    }
    Ok(())
}

pub fn eligible(member: &Member, reward: &Reward, engagement_floor: Amount) -> bool {
    check(member, reward, engagement_floor).is_ok()
}

/// Everything a redemption on `on` must satisfy beyond plain eligibility.
pub fn check_redemption(
    member: &Member,
    reward: &Reward,
    engagement_floor: Amount,
    on: NaiveDate,
    redeemed_this_month: u32,
) -> Result<(), RedemptionError> {
    check(member, reward, engagement_floor)?;
    if reward.blackout_dates.contains(&on) {
        return Err(RedemptionError::Blackout(reward.id.clone(), on));
    }
    if let Some(cap) = reward.max_redemptions_per_month {
        if redeemed_this_month >= cap {
            return Err(RedemptionError::MonthlyCapReached(reward.id.clone(), cap));
        }
    }
    Ok(())
}

#[derive(Debug, Default)]
pub struct RewardCatalog {
    rewards: HashMap<RewardId, Reward>,
}

impl RewardCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, reward: Reward) {
        self.rewards.insert(reward.id.clone(), reward);
    }

    pub fn get(&self, id: &str) -> Option<&Reward> {
        self.rewards.get(id)
    }

    pub fn len(&self) -> usize {
        self.rewards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rewards.is_empty()
    }
}

impl FromIterator<Reward> for RewardCatalog {
    fn from_iter<I: IntoIterator<Item = Reward>>(iter: I) -> Self {
        let mut catalog = RewardCatalog::new();
        for reward in iter {
            catalog.insert(reward);
        }
        catalog
    }
}

/// Redemption counts per member, reward and calendar month.
#[derive(Debug, Default)]
pub struct RedemptionLog {
    counts: DashMap<(MemberId, RewardId, i32, u32), u32>,
}

impl RedemptionLog {
    pub fn count(&self, member: &str, reward: &str, on: NaiveDate) -> u32 {
        self.counts
            .get(&Self::key(member, reward, on))
            .map(|count| *count)
            .unwrap_or(0)
    }

    pub fn record(&self, member: &str, reward: &str, on: NaiveDate) {
        *self.counts.entry(Self::key(member, reward, on)).or_insert(0) += 1;
    }

    fn key(member: &str, reward: &str, on: NaiveDate) -> (MemberId, RewardId, i32, u32) {
        (member.to_string(), reward.to_string(), on.year(), on.month())
    }
}
