//! Loyalty settlement engine.
//!
//! The engine settles purchases against member balances, redeems coupons and
//! rewards, and answers eligibility and fraud queries. Every operation that
//! changes a member holds that member's lock for its whole duration, so
//! operations on one member are serialized while different members proceed
//! in parallel. Also supports async stream of purchase requests.

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use dashmap::DashSet;
use tokio_stream::{Stream, StreamExt};
use tracing::{debug, info};
use uuid::Uuid;

use crate::Amount;
use crate::campaign::{self, BrandCampaign};
use crate::config::EngineConfig;
use crate::fraud::{self, FraudReport, FraudThresholds};
use crate::model::{
    Channel, MemberId, MemberRef, PaymentMethod, PurchaseRequest, Receipt, Transaction,
};
use crate::policy::TierPolicy;
use crate::reward::{self, RedemptionLog, RewardCatalog};
use crate::tier::TierStrategy;

mod state;
pub use state::{Member, WELCOME_POINTS};

mod error;
pub use error::{CouponError, EngineError, RedemptionError, SettlementError, StoreError};

mod coupon;
pub use coupon::{CouponBook, CouponCode};

mod journal;
pub use journal::{Journal, TransactionSink};

mod settlement;
pub use settlement::Settlement;

mod store;
pub use store::{MemberHandle, MemberStore};

/// The loyalty settlement engine.
///
/// Holds the member registry and the injected program rules.
pub struct Engine {
    members: MemberStore,
    rewards: RewardCatalog,
    policy: TierPolicy,
    strategy: Box<dyn TierStrategy>,
    engagement_floor: Amount,
    fraud: FraudThresholds,
    campaigns: Vec<BrandCampaign>,
    sink: Arc<dyn TransactionSink>,
    coupons: CouponBook,
    redemptions: RedemptionLog,
    /// Idempotency keys of settled purchases, scoped to their member. Kept
    /// for the engine's lifetime, like issued coupons.
    settled_keys: DashSet<(MemberId, String)>,
}

/// Public API
impl Engine {
    /// Engine recording transactions into a private in-memory journal.
    pub fn new(config: EngineConfig) -> Self {
        Self::with_sink(config, Arc::new(Journal::new()))
    }

    pub fn with_sink(config: EngineConfig, sink: Arc<dyn TransactionSink>) -> Self {
        info!(
            strategy = ?config.tier_strategy,
            engagement_floor = %config.engagement_floor,
            campaigns = config.campaigns.len(),
            "loyalty engine initialized"
        );
        Self {
            members: MemberStore::new(),
            rewards: RewardCatalog::new(),
            policy: config.policy,
            strategy: config.tier_strategy.build(),
            engagement_floor: config.engagement_floor,
            fraud: config.fraud,
            campaigns: config.campaigns,
            sink,
            coupons: CouponBook::new(),
            redemptions: RedemptionLog::default(),
            settled_keys: DashSet::new(),
        }
    }

    pub fn with_rewards(mut self, rewards: RewardCatalog) -> Self {
        self.rewards = rewards;
        self
    }

    pub fn register(&self, member: Member) -> Result<(), EngineError> {
        let id = member.membership_no.clone();
        self.members.insert(member)?;
        debug!(member = %id, "member registered");
        Ok(())
    }

    pub fn members(&self) -> &MemberStore {
        &self.members
    }

    pub fn policy(&self) -> &TierPolicy {
        &self.policy
    }

    pub fn coupons(&self) -> &CouponBook {
        &self.coupons
    }

    /// Copy of one member's current state.
    pub async fn member(&self, member: &MemberRef) -> Option<Member> {
        let handle = self.members.resolve(member)?;
        let snapshot = handle.lock().await.clone();
        Some(snapshot)
    }

    /// Run the engine with the given purchase stream
    pub async fn run(&self, mut stream: impl Stream<Item = PurchaseRequest> + Unpin) {
        while let Some(request) = stream.next().await {
            // a rejected purchase should not stop the engine; it is logged in `settle`
            let _ = self.settle(request).await;
        }
    }

    /// Settle one purchase atomically against the member's balances.
    pub async fn settle(&self, request: PurchaseRequest) -> Result<Receipt, EngineError> {
        let result = self.apply_purchase(&request).await;
        Self::log_result(&request, &result);
        result
    }

    /// Credit the member's wallet.
    pub async fn top_up(&self, member: &MemberRef, amount: Amount) -> Result<Amount, EngineError> {
        if !amount.is_positive() {
            return Err(EngineError::NonPositiveTopUp(amount));
        }

        let handle = self.resolve(member)?;
        let mut member = handle.lock().await;
        let Some(balance) = member.wallet.checked_add(amount) else {
            return Err(EngineError::TopUpOverflow {
                member: member.membership_no.clone(),
                amount,
            });
        };
        member.wallet = balance;

        info!(
            member = %member.membership_no,
            amount = %amount,
            balance = %member.wallet,
            "wallet topped up"
        );
        Ok(member.wallet)
    }

    /// Redeem a coupon issued on an earlier receipt. Each coupon works once,
    /// and only for the member it was issued to.
    pub async fn redeem_coupon(
        &self,
        member: &MemberRef,
        code: &CouponCode,
    ) -> Result<(), EngineError> {
        let handle = self.resolve(member)?;
        let mut member = handle.lock().await;
        let now = Utc::now();

        self.coupons.redeem(code, &member.membership_no, now)?;
        member.touch(now);

        info!(member = %member.membership_no, coupon = %code, "coupon redeemed");
        Ok(())
    }

    pub async fn is_eligible(
        &self,
        member: &MemberRef,
        reward_id: &str,
    ) -> Result<bool, EngineError> {
        let reward = self
            .rewards
            .get(reward_id)
            .ok_or_else(|| EngineError::RewardNotFound(reward_id.to_string()))?;
        let handle = self.resolve(member)?;
        let member = handle.lock().await;

        let eligible = reward::eligible(&member, reward, self.engagement_floor);
        debug!(
            member = %member.membership_no,
            reward = %reward.id,
            eligible,
            "reward eligibility checked"
        );
        Ok(eligible)
    }

    /// Spend points on a catalog reward on the given day.
    pub async fn redeem_reward(
        &self,
        member: &MemberRef,
        pin: &str,
        reward_id: &str,
        on: NaiveDate,
    ) -> Result<Transaction, EngineError> {
        let reward = self
            .rewards
            .get(reward_id)
            .ok_or_else(|| EngineError::RewardNotFound(reward_id.to_string()))?;
        let handle = self.resolve(member)?;
        let mut member = handle.lock().await;

        if !member.pin.verify(pin) {
            return Err(EngineError::InvalidCredential(member.membership_no.clone()));
        }

        let redeemed = self.redemptions.count(&member.membership_no, &reward.id, on);
        reward::check_redemption(&member, reward, self.engagement_floor, on, redeemed)?;

        let now = Utc::now();
        member.points -= reward.points_required;
        member.touch(now);
        self.redemptions.record(&member.membership_no, &reward.id, on);

        let transaction = Transaction {
            id: Uuid::new_v4(),
            member: member.membership_no.clone(),
            club: member.club_home.clone(),
            method: PaymentMethod::Points,
            channel: Channel::default(),
            gross: Amount::ZERO,
            net: Amount::ZERO,
            fee: Amount::ZERO,
            points_earned: 0,
            points_spent: reward.points_required,
            brand_applied: None,
            reward_eligible: false,
            timestamp: now,
        };
        self.sink.append(transaction.clone());

        info!(
            member = %member.membership_no,
            reward = %reward.id,
            points = reward.points_required,
            balance = member.points,
            "reward redeemed"
        );
        Ok(transaction)
    }

    /// Flag members holding many points with an empty wallet.
    pub async fn scan_for_fraud(&self) -> FraudReport {
        let members = self.members.snapshot().await;
        let report = fraud::scan(&members, &self.fraud);
        info!(
            total = report.total_members,
            suspicious = report.suspicious_count,
            "fraud scan complete"
        );
        report
    }
}

/// Private API
impl Engine {
    fn resolve(&self, member: &MemberRef) -> Result<MemberHandle, EngineError> {
        self.members
            .resolve(member)
            .ok_or_else(|| EngineError::MemberNotFound(member.clone()))
    }

    /// Apply a purchase:
    /// - Verify the PIN before anything else
    /// - Plan every figure, failing on any unmet precondition
    /// - Claim the idempotency key, if any
    /// - Apply the plan, record the transaction, issue the coupon
    async fn apply_purchase(&self, request: &PurchaseRequest) -> Result<Receipt, EngineError> {
        let handle = self.resolve(&request.member)?;
        let mut member = handle.lock().await;

        if !member.pin.verify(&request.pin) {
            return Err(EngineError::InvalidCredential(member.membership_no.clone()));
        }

        let now = Utc::now();
        let campaign = campaign::best(
            &self.campaigns,
            request.product.as_deref(),
            now.date_naive(),
        );
        let plan = settlement::plan(&member, request, &self.policy, campaign)?;

        if let Some(key) = &request.idempotency_key {
            let scoped = (member.membership_no.clone(), key.clone());
            if !self.settled_keys.insert(scoped) {
                return Err(SettlementError::DuplicateRequest(key.clone()).into());
            }
        }

        let tier_changed = plan.apply(&mut member, self.strategy.as_ref(), &self.policy, now);

        let transaction = Transaction {
            id: Uuid::new_v4(),
            member: member.membership_no.clone(),
            club: member.club_home.clone(),
            method: plan.method,
            channel: plan.channel,
            gross: plan.gross,
            net: plan.net,
            fee: plan.fee,
            points_earned: plan.points_earned,
            points_spent: plan.points_spent,
            brand_applied: plan.brand_applied.clone(),
            reward_eligible: plan.accrues(),
            timestamp: now,
        };
        let transaction_id = transaction.id;
        self.sink.append(transaction);

        let coupon = self.coupons.issue(&member.membership_no, now);

        if tier_changed {
            info!(member = %member.membership_no, tier = %member.tier, "tier changed");
        }

        Ok(Receipt {
            transaction: transaction_id,
            membership_no: member.membership_no.clone(),
            gross: plan.gross,
            discount: plan.discount,
            net: plan.net,
            fee: plan.fee,
            points_earned: plan.points_earned,
            points_spent: plan.points_spent,
            total_points: member.points,
            points_value: self.policy.points_value(member.points),
            wallet_balance: member.wallet,
            tier: member.tier,
            tier_changed,
            brand_applied: plan.brand_applied,
            coupon,
        })
    }

    /// Small helper to log `settle` results
    fn log_result(request: &PurchaseRequest, result: &Result<Receipt, EngineError>) {
        let method = request.tender.method();
        match result {
            Ok(receipt) => {
                info!(
                    member = %receipt.membership_no,
                    method = %method,
                    gross = %receipt.gross,
                    net = %receipt.net,
                    fee = %receipt.fee,
                    points_earned = receipt.points_earned,
                    points_spent = receipt.points_spent,
                    tier = %receipt.tier,
                    "purchase settled"
                );
            }
            Err(e) => {
                info!(
                    member = %request.member,
                    method = %method,
                    reason = %e,
                    "purchase skipped"
                );
            }
        }
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}
