//! Settlement planning.
//!
//! A purchase is settled in two steps. [`plan`] reads the member and decides
//! every figure, failing on any unmet precondition. [`Settlement::apply`]
//! then writes those figures and cannot fail, so a rejected purchase never
//! leaves a member half-updated.

use chrono::{DateTime, Utc};

use super::{Member, SettlementError};
use crate::Amount;
use crate::amount::Rate;
use crate::campaign::{BrandCampaign, Multiplier};
use crate::model::{Channel, PaymentMethod, PurchaseRequest, Tender};
use crate::policy::{TierPolicy, accrue};
use crate::tier::TierStrategy;

/// Every figure of a purchase that passed its preconditions.
#[derive(Debug, Clone, PartialEq)]
pub struct Settlement {
    pub method: PaymentMethod,
    pub channel: Channel,
    pub gross: Amount,
    pub discount: Rate,
    pub net: Amount,
    pub fee: Amount,
    pub wallet_debit: Amount,
    pub points_earned: u64,
    pub points_spent: u64,
    /// Rolling spend once the purchase is counted.
    pub rolling_spend: Amount,
    pub brand_applied: Option<String>,
}

/// Plan a purchase for `member`. `campaign` is the brand campaign running
/// for this purchase, if any; it only affects cash and wallet accrual.
pub fn plan(
    member: &Member,
    request: &PurchaseRequest,
    policy: &TierPolicy,
    campaign: Option<&BrandCampaign>,
) -> Result<Settlement, SettlementError> {
    match request.tender {
        Tender::Points(required) => {
            if required == 0 {
                return Err(SettlementError::NonPositiveAmount);
            }
            if member.points < required {
                return Err(SettlementError::InsufficientPoints {
                    member: member.membership_no.clone(),
                    balance: member.points,
                    required,
                });
            }
            Ok(Settlement {
                method: PaymentMethod::Points,
                channel: request.channel,
                gross: Amount::ZERO,
                discount: Rate::ZERO,
                net: Amount::ZERO,
                fee: Amount::ZERO,
                wallet_debit: Amount::ZERO,
                points_earned: 0,
                points_spent: required,
                rolling_spend: member.rolling_spend,
                brand_applied: None,
            })
        }
        Tender::Cash(gross) | Tender::Wallet(gross) => {
            if !gross.is_positive() {
                return Err(SettlementError::NonPositiveAmount);
            }

            let overflow = || SettlementError::AmountOverflow(member.membership_no.clone());
            let method = request.tender.method();
            let rules = policy.rules(member.tier);
            let net = gross.discounted(rules.discount);
            let fee = rules.fees.fee(method, request.channel);
            let rolling_spend = member
                .rolling_spend
                .checked_add(gross)
                .ok_or_else(overflow)?;

            let wallet_debit = if method == PaymentMethod::Wallet {
                let required = net.checked_add(fee).ok_or_else(overflow)?;
                if member.wallet < required {
                    return Err(SettlementError::InsufficientWalletFunds {
                        member: member.membership_no.clone(),
                        balance: member.wallet,
                        required,
                    });
                }
                required
            } else {
                Amount::ZERO
            };

            let boost = campaign.map_or(Multiplier::ONE, |c| c.multiplier);
            Ok(Settlement {
                method,
                channel: request.channel,
                gross,
                discount: rules.discount,
                net,
                fee,
                wallet_debit,
                points_earned: accrue(net, rules.accrual_rate, boost, request.points_override),
                points_spent: 0,
                rolling_spend,
                brand_applied: campaign.map(|c| c.brand_name.clone()),
            })
        }
    }
}

impl Settlement {
    /// Write the planned figures to `member`, which must be the member the
    /// plan was made for, unchanged since. Returns whether the tier changed.
    pub fn apply(
        &self,
        member: &mut Member,
        strategy: &dyn TierStrategy,
        policy: &TierPolicy,
        at: DateTime<Utc>,
    ) -> bool {
        member.points -= self.points_spent;
        member.wallet -= self.wallet_debit;

        let mut tier_changed = false;
        if self.accrues() {
            member.points = member.points.saturating_add(self.points_earned);
            member.rolling_spend = self.rolling_spend;
            let tier = strategy.assign(member, policy);
            tier_changed = tier != member.tier;
            member.tier = tier;
        }

        member.touch(at);
        tier_changed
    }

    /// Cash and wallet purchases earn points and count toward spend.
    pub fn accrues(&self) -> bool {
        self.method != PaymentMethod::Points
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{MemberRef, Tier};
    use crate::tier::SpendBasedTierStrategy;
    use chrono::NaiveDate;

    fn gold_member() -> Member {
        Member::new("TGVIG100001", "0810000001", "1001")
            .unwrap()
            .with_points(100)
            .with_wallet(Amount::from_whole(100))
    }

    fn request(tender: Tender) -> PurchaseRequest {
        let member = MemberRef::MembershipNo("TGVIG100001".to_string());
        PurchaseRequest::new(member, "1001", tender)
    }

    fn plan_default(member: &Member, tender: Tender) -> Result<Settlement, SettlementError> {
        plan(member, &request(tender), &TierPolicy::default(), None)
    }

    #[test]
    fn cash_plan_discounts_and_accrues() {
        let plan = plan_default(&gold_member(), Tender::Cash(Amount::from_whole(50))).unwrap();
        assert_eq!(plan.net, Amount::from_whole(45));
        assert_eq!(plan.fee, Amount::from_whole(2));
        assert_eq!(plan.wallet_debit, Amount::ZERO);
        assert_eq!(plan.points_earned, 3);
        assert_eq!(plan.points_spent, 0);
        assert_eq!(plan.rolling_spend, Amount::from_whole(50));
        assert_eq!(plan.brand_applied, None);
    }

    #[test]
    fn wallet_plan_debits_net_plus_fee() {
        let plan = plan_default(&gold_member(), Tender::Wallet(Amount::from_whole(50))).unwrap();
        assert_eq!(plan.fee, Amount::from_whole(3));
        assert_eq!(plan.wallet_debit, Amount::from_whole(48));
    }

    #[test]
    fn app_wallet_uses_app_fee() {
        let req = request(Tender::Wallet(Amount::from_whole(50))).with_channel(Channel::App);
        let plan = plan(&gold_member(), &req, &TierPolicy::default(), None).unwrap();
        assert_eq!(plan.fee, Amount::from_float(1.5));
    }

    #[test]
    fn wallet_exactly_covering_debit_succeeds() {
        let member = gold_member().with_wallet(Amount::from_whole(48));
        let tender = Tender::Wallet(Amount::from_whole(50));
        assert!(plan_default(&member, tender).is_ok());
    }

    #[test]
    fn wallet_short_by_fee_fails() {
        let member = gold_member().with_wallet(Amount::from_float(47.99));
        let result = plan_default(&member, Tender::Wallet(Amount::from_whole(50)));
        assert!(matches!(
            result,
            Err(SettlementError::InsufficientWalletFunds { .. })
        ));
    }

    #[test]
    fn points_plan_checks_balance() {
        let member = gold_member().with_points(40);
        let result = plan_default(&member, Tender::Points(50));
        assert!(matches!(
            result,
            Err(SettlementError::InsufficientPoints {
                balance: 40,
                required: 50,
                ..
            })
        ));
    }

    #[test]
    fn non_positive_amounts_rejected() {
        let member = gold_member();
        for tender in [
            Tender::Cash(Amount::ZERO),
            Tender::Wallet(Amount::from_whole(-5)),
            Tender::Points(0),
        ] {
            assert!(matches!(
                plan_default(&member, tender),
                Err(SettlementError::NonPositiveAmount)
            ));
        }
    }

    #[test]
    fn spend_overflow_is_rejected() {
        let member = gold_member().with_rolling_spend(Amount::from_whole(1));
        let result = plan_default(&member, Tender::Cash(Amount::from_float(1e15)));
        assert!(matches!(result, Err(SettlementError::AmountOverflow(_))));
    }

    #[test]
    fn wallet_debit_overflow_is_rejected() {
        let mut policy = TierPolicy::default();
        policy.gold.discount = Rate::ZERO;
        let member = gold_member().with_wallet(Amount::from_scaled(i64::MAX));
        let tender = Tender::Wallet(Amount::from_scaled(i64::MAX));
        let result = plan(&member, &request(tender), &policy, None);
        assert!(matches!(result, Err(SettlementError::AmountOverflow(_))));
    }

    #[test]
    fn campaign_boosts_cash_accrual() {
        let campaign = BrandCampaign {
            brand_name: "Vodka Royale".to_string(),
            start_date: NaiveDate::from_ymd_opt(2026, 10, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2026, 10, 31).unwrap(),
            multiplier: Multiplier::from_factor(2.0).unwrap(),
            target_product: None,
        };
        let policy = TierPolicy::default();
        let member = gold_member();

        let req = request(Tender::Cash(Amount::from_whole(50)));
        let boosted = plan(&member, &req, &policy, Some(&campaign)).unwrap();
        assert_eq!(boosted.points_earned, 6);
        assert_eq!(boosted.brand_applied.as_deref(), Some("Vodka Royale"));

        let req = request(Tender::Points(10));
        let redeemed = plan(&member, &req, &policy, Some(&campaign)).unwrap();
        assert_eq!(redeemed.brand_applied, None);
    }

    #[test]
    fn apply_points_plan_leaves_spend_and_tier() {
        let mut member = gold_member().with_rolling_spend(Amount::from_whole(7_499));
        let policy = TierPolicy::default();
        let plan = plan_default(&member, Tender::Points(60)).unwrap();

        let changed = plan.apply(&mut member, &SpendBasedTierStrategy, &policy, Utc::now());
        assert!(!changed);
        assert_eq!(member.points, 40);
        assert_eq!(member.wallet, Amount::from_whole(100));
        assert_eq!(member.rolling_spend, Amount::from_whole(7_499));
    }

    #[test]
    fn apply_advances_spend_before_retiering() {
        let mut member = gold_member().with_rolling_spend(Amount::from_whole(7_499));
        let policy = TierPolicy::default();
        let plan = plan_default(&member, Tender::Cash(Amount::from_whole(1))).unwrap();

        let changed = plan.apply(&mut member, &SpendBasedTierStrategy, &policy, Utc::now());
        assert!(changed);
        assert_eq!(member.tier, Tier::Silver);
        assert_eq!(member.rolling_spend, Amount::from_whole(7_500));
    }
}
