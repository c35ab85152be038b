//! Tier policy table and point accrual.
//!
//! The policy is plain configuration: it is built once (from defaults or a
//! config file), validated, and handed to the engine. Nothing here mutates.

use serde::Deserialize;
use thiserror::Error;

use crate::Amount;
use crate::amount::Rate;
use crate::campaign::Multiplier;
use crate::model::{Channel, PaymentMethod, Tier};

#[derive(Debug, Error, PartialEq)]
pub enum PolicyError {
    #[error("{0}: discount must be below 100%")]
    DiscountOutOfRange(Tier),
    #[error("{0}: accrual rate must be positive")]
    NonPositiveAccrualRate(Tier),
    #[error("{0}: fees must not be negative")]
    NegativeFee(Tier),
    #[error("{0}: spend floor must not be below the previous tier's")]
    SpendFloorOutOfOrder(Tier),
    #[error("gold spend floor must be zero, found {0}")]
    GoldFloorNotZero(Amount),
    #[error("point value must not be negative")]
    NegativePointValue,
}

/// Fixed per-transaction fees.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct FeeSchedule {
    pub pos_cash: Amount,
    pub web_wallet: Amount,
    pub app_wallet: Amount,
}

impl Default for FeeSchedule {
    fn default() -> Self {
        Self {
            pos_cash: Amount::from_float(2.00),
            web_wallet: Amount::from_float(3.00),
            app_wallet: Amount::from_float(1.50),
        }
    }
}

impl FeeSchedule {
    /// Fee charged for `method` on `channel`. Points purchases are free.
    /// Wallet payments outside the app pay the web wallet fee.
    pub fn fee(&self, method: PaymentMethod, channel: Channel) -> Amount {
        match (method, channel) {
            (PaymentMethod::Points, _) => Amount::ZERO,
            (PaymentMethod::Cash, _) => self.pos_cash,
            (PaymentMethod::Wallet, Channel::App) => self.app_wallet,
            (PaymentMethod::Wallet, _) => self.web_wallet,
        }
    }

    fn is_valid(&self) -> bool {
        !(self.pos_cash.is_negative()
            || self.web_wallet.is_negative()
            || self.app_wallet.is_negative())
    }
}

fn default_accrual_rate() -> Amount {
    Amount::from_whole(15)
}

/// Rules applied to members of one tier.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TierRules {
    pub discount: Rate,
    #[serde(default)]
    pub fees: FeeSchedule,
    /// Currency spent per point earned.
    #[serde(default = "default_accrual_rate")]
    pub accrual_rate: Amount,
    /// Point balance that promotes to the next tier under the points strategy.
    #[serde(default)]
    pub upgrade_points: Option<u64>,
    /// Rolling spend at which a member enters this tier under the spend strategy.
    pub spend_floor: Amount,
}

impl TierRules {
    fn new(discount: u32, upgrade_points: Option<u64>, spend_floor: i64) -> Self {
        Self {
            discount: Rate::from_scaled(discount),
            fees: FeeSchedule::default(),
            accrual_rate: default_accrual_rate(),
            upgrade_points,
            spend_floor: Amount::from_whole(spend_floor),
        }
    }
}

/// Per-tier rules for the whole program.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct TierPolicy {
    pub gold: TierRules,
    pub silver: TierRules,
    pub black: TierRules,
    /// Currency value of a single point when quoting balances.
    pub point_value: Amount,
}

impl Default for TierPolicy {
    fn default() -> Self {
        Self {
            gold: TierRules::new(1_000, Some(10_000), 0),
            silver: TierRules::new(1_500, Some(20_000), 7_500),
            black: TierRules::new(2_500, None, 20_000),
            point_value: Amount::from_float(0.286),
        }
    }
}

impl TierPolicy {
    pub fn rules(&self, tier: Tier) -> &TierRules {
        match tier {
            Tier::Gold => &self.gold,
            Tier::Silver => &self.silver,
            Tier::Black => &self.black,
        }
    }

    pub fn validate(&self) -> Result<(), PolicyError> {
        if !self.gold.spend_floor.is_zero() {
            return Err(PolicyError::GoldFloorNotZero(self.gold.spend_floor));
        }
        if self.point_value.is_negative() {
            return Err(PolicyError::NegativePointValue);
        }

        let mut previous_floor = Amount::ZERO;
        for tier in Tier::ALL {
            let rules = self.rules(tier);
            if f64::from(rules.discount) >= 1.0 {
                return Err(PolicyError::DiscountOutOfRange(tier));
            }
            if !rules.accrual_rate.is_positive() {
                return Err(PolicyError::NonPositiveAccrualRate(tier));
            }
            if !rules.fees.is_valid() {
                return Err(PolicyError::NegativeFee(tier));
            }
            if rules.spend_floor < previous_floor {
                return Err(PolicyError::SpendFloorOutOfOrder(tier));
            }
            previous_floor = rules.spend_floor;
        }
        Ok(())
    }

    /// Currency value of a points balance.
    pub fn points_value(&self, points: u64) -> Amount {
        self.point_value.times(points)
    }
}

/// Points earned on a net spend: `floor(net / accrual_rate)`, scaled by any
/// campaign `boost`.
///
/// A manual override replaces the boosted accrual only when it is larger;
/// it can never reduce what the member earns.
pub fn accrue(
    net: Amount,
    accrual_rate: Amount,
    boost: Multiplier,
    points_override: Option<u64>,
) -> u64 {
    let computed = boost.apply(net.whole_units_of(accrual_rate));
    match points_override {
        Some(granted) if granted > computed => granted,
        _ => computed,
    }
}
