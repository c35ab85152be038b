//! Core domain types for the loyalty engine.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::Amount;
use crate::amount::Rate;
use crate::engine::CouponCode;

/// Membership number, unique and immutable once issued.
pub type MemberId = String;

/// Reward identifier.
pub type RewardId = String;

/// Errors decoding domain values from their external string form.
///
/// These indicate a corrupted record or a malformed request and are never
/// coerced to a default.
#[derive(Debug, Error, PartialEq)]
pub enum ParseError {
    #[error("unknown tier '{0}'")]
    UnknownTier(String),
    #[error("unknown payment method '{0}'")]
    UnknownPaymentMethod(String),
    #[error("unknown channel '{0}'")]
    UnknownChannel(String),
}

/// Membership rank, ordered from lowest to highest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Tier {
    Gold,
    Silver,
    Black,
}

impl Tier {
    pub const ALL: [Tier; 3] = [Tier::Gold, Tier::Silver, Tier::Black];

    /// The next tier up, if any.
    pub fn next(self) -> Option<Tier> {
        match self {
            Tier::Gold => Some(Tier::Silver),
            Tier::Silver => Some(Tier::Black),
            Tier::Black => None,
        }
    }
}

impl FromStr for Tier {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gold" => Ok(Tier::Gold),
            "silver" => Ok(Tier::Silver),
            "black" => Ok(Tier::Black),
            _ => Err(ParseError::UnknownTier(s.to_string())),
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Tier::Gold => "Gold",
            Tier::Silver => "Silver",
            Tier::Black => "Black",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PaymentMethod {
    Cash,
    Wallet,
    Points,
}

impl FromStr for PaymentMethod {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cash" => Ok(PaymentMethod::Cash),
            "wallet" => Ok(PaymentMethod::Wallet),
            "points" => Ok(PaymentMethod::Points),
            _ => Err(ParseError::UnknownPaymentMethod(s.to_string())),
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PaymentMethod::Cash => "CASH",
            PaymentMethod::Wallet => "WALLET",
            PaymentMethod::Points => "POINTS",
        };
        f.write_str(name)
    }
}

/// Where a purchase was rung up. Selects the wallet fee.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Channel {
    #[default]
    Pos,
    Web,
    App,
}

impl FromStr for Channel {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pos" => Ok(Channel::Pos),
            "web" => Ok(Channel::Web),
            "app" => Ok(Channel::App),
            _ => Err(ParseError::UnknownChannel(s.to_string())),
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Channel::Pos => "POS",
            Channel::Web => "WEB",
            Channel::App => "APP",
        };
        f.write_str(name)
    }
}

/// Stable key a caller may use to address a member.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MemberRef {
    MembershipNo(MemberId),
    Phone(String),
}

impl fmt::Display for MemberRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MemberRef::MembershipNo(id) => write!(f, "{id}"),
            MemberRef::Phone(phone) => write!(f, "phone {phone}"),
        }
    }
}

/// How a purchase is paid, together with what is owed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tender {
    /// Gross price paid at the till.
    Cash(Amount),
    /// Gross price debited from the stored-value wallet.
    Wallet(Amount),
    /// Number of points the item costs.
    Points(u64),
}

impl Tender {
    pub fn method(&self) -> PaymentMethod {
        match self {
            Tender::Cash(_) => PaymentMethod::Cash,
            Tender::Wallet(_) => PaymentMethod::Wallet,
            Tender::Points(_) => PaymentMethod::Points,
        }
    }

    /// Gross currency amount; zero for points purchases.
    pub fn gross(&self) -> Amount {
        match self {
            Tender::Cash(gross) | Tender::Wallet(gross) => *gross,
            Tender::Points(_) => Amount::ZERO,
        }
    }
}

/// A purchase to settle against one member.
#[derive(Clone)]
pub struct PurchaseRequest {
    pub member: MemberRef,
    pub pin: String,
    pub tender: Tender,
    pub channel: Channel,
    /// Operator-granted points; only used when larger than the computed accrual.
    pub points_override: Option<u64>,
    /// Caller-supplied key, unique per member; a key that already settled
    /// for the member is rejected.
    pub idempotency_key: Option<String>,
    /// Product bought, matched against targeted brand campaigns.
    pub product: Option<String>,
}

impl PurchaseRequest {
    pub fn new(member: MemberRef, pin: impl Into<String>, tender: Tender) -> Self {
        Self {
            member,
            pin: pin.into(),
            tender,
            channel: Channel::default(),
            points_override: None,
            idempotency_key: None,
            product: None,
        }
    }

    pub fn with_channel(mut self, channel: Channel) -> Self {
        self.channel = channel;
        self
    }

    pub fn with_points_override(mut self, points: u64) -> Self {
        self.points_override = Some(points);
        self
    }

    pub fn with_idempotency_key(mut self, key: impl Into<String>) -> Self {
        self.idempotency_key = Some(key.into());
        self
    }

    pub fn with_product(mut self, product: impl Into<String>) -> Self {
        self.product = Some(product.into());
        self
    }
}

impl fmt::Debug for PurchaseRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PurchaseRequest")
            .field("member", &self.member)
            .field("tender", &self.tender)
            .field("channel", &self.channel)
            .field("points_override", &self.points_override)
            .field("idempotency_key", &self.idempotency_key)
            .field("product", &self.product)
            .finish_non_exhaustive()
    }
}

/// Append-only record of one settled purchase or points redemption.
#[derive(Debug, Clone)]
pub struct Transaction {
    pub id: Uuid,
    pub member: MemberId,
    pub club: Option<String>,
    pub method: PaymentMethod,
    pub channel: Channel,
    pub gross: Amount,
    pub net: Amount,
    pub fee: Amount,
    pub points_earned: u64,
    pub points_spent: u64,
    /// Brand campaign that boosted the accrual, if any.
    pub brand_applied: Option<String>,
    /// Whether the purchase accrues points. False for points-paid purchases
    /// and reward redemptions.
    pub reward_eligible: bool,
    pub timestamp: DateTime<Utc>,
}

/// Outcome of a successful settlement, handed back to the till.
#[derive(Debug, Clone)]
pub struct Receipt {
    pub transaction: Uuid,
    pub membership_no: MemberId,
    pub gross: Amount,
    pub discount: Rate,
    pub net: Amount,
    pub fee: Amount,
    pub points_earned: u64,
    pub points_spent: u64,
    pub total_points: u64,
    /// Currency value of `total_points`.
    pub points_value: Amount,
    pub wallet_balance: Amount,
    pub tier: Tier,
    pub tier_changed: bool,
    pub brand_applied: Option<String>,
    pub coupon: CouponCode,
}
