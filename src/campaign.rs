//! Brand campaigns that boost point accrual.
//!
//! A campaign runs over an inclusive date window and may target a single
//! product. While it runs, the points computed on a matching purchase are
//! multiplied before any manual override is considered.

use chrono::NaiveDate;
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
#[error("multiplier {0} must be a finite number of at least 1")]
pub struct MultiplierError(pub f64);

#[derive(Debug, Error, PartialEq)]
pub enum CampaignError {
    #[error("campaign {0}: ends before it starts")]
    EmptyWindow(String),
}

/// Points multiplier, stored in hundredths (`150` is 1.5x).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Deserialize)]
#[serde(try_from = "f64")]
pub struct Multiplier(u32);

impl Multiplier {
    const SCALE: u32 = 100;

    pub const ONE: Multiplier = Multiplier(Self::SCALE);

    pub fn from_factor(value: f64) -> Result<Self, MultiplierError> {
        if !value.is_finite() || value < 1.0 || value > f64::from(u32::MAX / Self::SCALE) {
            return Err(MultiplierError(value));
        }
        Ok(Multiplier((value * f64::from(Self::SCALE)).round() as u32))
    }

    /// Boosted point count, floored and saturating.
    pub fn apply(self, points: u64) -> u64 {
        let boosted = u128::from(points) * u128::from(self.0) / u128::from(Self::SCALE);
        u64::try_from(boosted).unwrap_or(u64::MAX)
    }
}

impl Default for Multiplier {
    fn default() -> Self {
        Multiplier::ONE
    }
}

impl TryFrom<f64> for Multiplier {
    type Error = MultiplierError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Multiplier::from_factor(value)
    }
}

/// A sponsored accrual boost.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BrandCampaign {
    pub brand_name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub multiplier: Multiplier,
    /// Product the campaign is limited to; `None` boosts every purchase.
    #[serde(default)]
    pub target_product: Option<String>,
}

impl BrandCampaign {
    pub fn is_running(&self, on: NaiveDate) -> bool {
        self.start_date <= on && on <= self.end_date
    }

    /// Whether a purchase of `product` on `on` earns the boost.
    pub fn applies(&self, product: Option<&str>, on: NaiveDate) -> bool {
        if !self.is_running(on) {
            return false;
        }
        match &self.target_product {
            None => true,
            Some(target) => product.is_some_and(|p| p.eq_ignore_ascii_case(target)),
        }
    }
}

/// The applicable campaign with the largest multiplier. Ties go to the one
/// listed first.
pub fn best<'a>(
    campaigns: &'a [BrandCampaign],
    product: Option<&str>,
    on: NaiveDate,
) -> Option<&'a BrandCampaign> {
    campaigns
        .iter()
        .filter(|campaign| campaign.applies(product, on))
        .rev()
        .max_by_key(|campaign| campaign.multiplier)
}

pub fn validate(campaigns: &[BrandCampaign]) -> Result<(), CampaignError> {
    for campaign in campaigns {
        if campaign.end_date < campaign.start_date {
            return Err(CampaignError::EmptyWindow(campaign.brand_name.clone()));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, d).unwrap()
    }

    fn campaign(brand: &str, factor: f64, product: Option<&str>) -> BrandCampaign {
        BrandCampaign {
            brand_name: brand.to_string(),
            start_date: day(1),
            end_date: day(30),
            multiplier: Multiplier::from_factor(factor).unwrap(),
            target_product: product.map(str::to_string),
        }
    }

    #[test]
    fn multiplier_floors_boosted_points() {
        assert_eq!(Multiplier::from_factor(2.0).unwrap().apply(3), 6);
        assert_eq!(Multiplier::from_factor(1.5).unwrap().apply(3), 4);
        assert_eq!(Multiplier::ONE.apply(7), 7);
    }

    #[test]
    fn multiplier_rejects_shrinking_factors() {
        assert_eq!(Multiplier::from_factor(0.5), Err(MultiplierError(0.5)));
        assert!(Multiplier::from_factor(f64::NAN).is_err());
        assert!(Multiplier::from_factor(1.0).is_ok());
    }

    #[test]
    fn window_is_inclusive() {
        let vodka = campaign("Vodka Royale", 2.0, None);
        assert!(vodka.applies(None, day(1)));
        assert!(vodka.applies(None, day(30)));
        let day_before = NaiveDate::from_ymd_opt(2026, 9, 30).unwrap();
        assert!(!vodka.applies(None, day_before));
        assert!(!vodka.applies(None, day(31)));
    }

    #[test]
    fn targeted_campaign_needs_matching_product() {
        let wine = campaign("Chill Wine Co", 1.5, Some("Wine"));
        assert!(wine.applies(Some("wine"), day(10)));
        assert!(!wine.applies(Some("Vodka"), day(10)));
        assert!(!wine.applies(None, day(10)));
    }

    #[test]
    fn best_picks_largest_multiplier() {
        let campaigns = vec![
            campaign("Chill Wine Co", 1.5, None),
            campaign("Vodka Royale", 2.0, None),
            campaign("Also Double", 2.0, None),
        ];
        let chosen = best(&campaigns, None, day(5)).unwrap();
        assert_eq!(chosen.brand_name, "Vodka Royale");
        assert!(best(&campaigns, None, day(31)).is_none());
    }

    #[test]
    fn validate_rejects_inverted_window() {
        let mut inverted = campaign("Vodka Royale", 2.0, None);
        inverted.end_date = day(1);
        inverted.start_date = day(2);
        assert_eq!(
            validate(&[inverted]),
            Err(CampaignError::EmptyWindow("Vodka Royale".to_string()))
        );
    }
}
