use chrono::{DateTime, Utc};

use crate::Amount;
use crate::credential::{CredentialError, PinHash};
use crate::model::{MemberId, Tier};

/// Points granted to every new member.
pub const WELCOME_POINTS: u64 = 100;

/// A loyalty member and their economic state.
///
/// Balances are only changed through settlement or administrative top-up;
/// both check their preconditions before touching any field.
#[derive(Debug, Clone)]
pub struct Member {
    pub membership_no: MemberId,
    pub phone: String,
    pub tier: Tier,
    pub points: u64,
    pub wallet: Amount,
    pub rolling_spend: Amount,
    pub vip_booking: bool,
    pub club_home: Option<String>,
    pub pin: PinHash,
    pub last_active: DateTime<Utc>,
}

impl Member {
    /// New Gold member holding the welcome points. Hashes `pin`.
    pub fn new(
        membership_no: impl Into<MemberId>,
        phone: impl Into<String>,
        pin: &str,
    ) -> Result<Self, CredentialError> {
        Ok(Self {
            membership_no: membership_no.into(),
            phone: phone.into(),
            tier: Tier::Gold,
            points: WELCOME_POINTS,
            wallet: Amount::ZERO,
            rolling_spend: Amount::ZERO,
            vip_booking: false,
            club_home: None,
            pin: PinHash::new(pin)?,
            last_active: Utc::now(),
        })
    }

    pub fn with_tier(mut self, tier: Tier) -> Self {
        self.tier = tier;
        self
    }

    pub fn with_points(mut self, points: u64) -> Self {
        self.points = points;
        self
    }

    pub fn with_wallet(mut self, wallet: Amount) -> Self {
        self.wallet = wallet;
        self
    }

    pub fn with_rolling_spend(mut self, spend: Amount) -> Self {
        self.rolling_spend = spend;
        self
    }

    pub fn with_vip_booking(mut self, vip_booking: bool) -> Self {
        self.vip_booking = vip_booking;
        self
    }

    pub fn with_club_home(mut self, club: impl Into<String>) -> Self {
        self.club_home = Some(club.into());
        self
    }

    pub fn touch(&mut self, at: DateTime<Utc>) {
        self.last_active = at;
    }
}
