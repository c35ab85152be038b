//! Single-use coupons issued with every receipt.

use std::fmt;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use uuid::Uuid;

use super::CouponError;
use crate::model::MemberId;

const CODE_LEN: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CouponCode(String);

impl CouponCode {
    fn generate() -> Self {
        let mut code = Uuid::new_v4().simple().to_string();
        code.truncate(CODE_LEN);
        CouponCode(code.to_ascii_uppercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Codes are case-insensitive as typed at the till.
impl From<&str> for CouponCode {
    fn from(value: &str) -> Self {
        CouponCode(value.trim().to_ascii_uppercase())
    }
}

impl fmt::Display for CouponCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone)]
struct CouponRecord {
    owner: MemberId,
    issued_at: DateTime<Utc>,
    redeemed_at: Option<DateTime<Utc>>,
}

/// Ledger of issued coupons and their redemption state. Entries are never
/// evicted; the book lives as long as its engine.
#[derive(Debug, Default)]
pub struct CouponBook {
    coupons: DashMap<CouponCode, CouponRecord>,
}

impl CouponBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue a fresh code to `owner`. Codes are never reused.
    pub fn issue(&self, owner: &str, at: DateTime<Utc>) -> CouponCode {
        loop {
            let code = CouponCode::generate();
            if let Entry::Vacant(slot) = self.coupons.entry(code.clone()) {
                slot.insert(CouponRecord {
                    owner: owner.to_string(),
                    issued_at: at,
                    redeemed_at: None,
                });
                return code;
            }
        }
    }

    pub fn redeem(
        &self,
        code: &CouponCode,
        member: &str,
        at: DateTime<Utc>,
    ) -> Result<(), CouponError> {
        let mut record = self
            .coupons
            .get_mut(code)
            .ok_or_else(|| CouponError::NotFound(code.clone()))?;

        if record.owner != member {
            return Err(CouponError::MemberMismatch {
                code: code.clone(),
                owner: record.owner.clone(),
                presented: member.to_string(),
            });
        }

        if record.redeemed_at.is_some() {
            return Err(CouponError::AlreadyRedeemed(code.clone()));
        }

        record.redeemed_at = Some(at);
        Ok(())
    }

    pub fn issued_at(&self, code: &CouponCode) -> Option<DateTime<Utc>> {
        self.coupons.get(code).map(|record| record.issued_at)
    }

    pub fn is_redeemed(&self, code: &CouponCode) -> bool {
        self.coupons
            .get(code)
            .is_some_and(|record| record.redeemed_at.is_some())
    }

    pub fn len(&self) -> usize {
        self.coupons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.coupons.is_empty()
    }
}
