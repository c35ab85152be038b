//! Error types for settlement and the operations around it.

use chrono::NaiveDate;
use thiserror::Error;

use super::CouponCode;
use crate::Amount;
use crate::model::{MemberId, MemberRef, RewardId};
use crate::reward::Ineligible;

/// Top-level error returned by [`Engine`](super::Engine) operations.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("member {0} not found")]
    MemberNotFound(MemberRef),

    #[error("reward {0} not found")]
    RewardNotFound(RewardId),

    #[error("invalid credential for member {0}")]
    InvalidCredential(MemberId),

    #[error("top-up amount must be positive, got {0}")]
    NonPositiveTopUp(Amount),

    #[error("top-up of {amount} overflows the wallet of member {member}")]
    TopUpOverflow { member: MemberId, amount: Amount },

    #[error("settlement failed: {0}")]
    Settlement(#[from] SettlementError),

    #[error("coupon rejected: {0}")]
    Coupon(#[from] CouponError),

    #[error("reward redemption failed: {0}")]
    Redemption(#[from] RedemptionError),

    #[error("{0}")]
    Store(#[from] StoreError),
}

/// Business-rule rejection of a purchase. The member is left untouched.
#[derive(Debug, Error)]
pub enum SettlementError {
    #[error("insufficient points for {member}: balance {balance}, required {required}")]
    InsufficientPoints {
        member: MemberId,
        balance: u64,
        required: u64,
    },

    #[error("insufficient wallet funds for {member}: balance {balance}, required {required}")]
    InsufficientWalletFunds {
        member: MemberId,
        balance: Amount,
        required: Amount,
    },

    #[error("purchase amount must be positive")]
    NonPositiveAmount,

    #[error("request {0} was already settled")]
    DuplicateRequest(String),

    #[error("purchase amounts overflow the balances of member {0}")]
    AmountOverflow(MemberId),
}

#[derive(Debug, Error)]
pub enum CouponError {
    #[error("coupon {0} not found")]
    NotFound(CouponCode),

    #[error("coupon {code} belongs to member {owner}, not {presented}")]
    MemberMismatch {
        code: CouponCode,
        owner: MemberId,
        presented: MemberId,
    },

    #[error("coupon {0} was already redeemed")]
    AlreadyRedeemed(CouponCode),
}

#[derive(Debug, Error)]
pub enum RedemptionError {
    #[error("not eligible: {0}")]
    Ineligible(#[from] Ineligible),

    #[error("reward {0} is blacked out on {1}")]
    Blackout(RewardId, NaiveDate),

    #[error("reward {0} already redeemed {1} times this month")]
    MonthlyCapReached(RewardId, u32),
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("membership number {0} is already registered")]
    DuplicateMembershipNo(MemberId),

    #[error("phone {0} is already registered")]
    DuplicatePhone(String),

    #[error("member {member} has a negative {field} of {value}")]
    NegativeBalance {
        member: MemberId,
        field: &'static str,
        value: Amount,
    },
}
