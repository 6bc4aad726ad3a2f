use super::checkout::CheckoutFlow;
use super::initiator::Initiation;
use crate::domain::payment::{Currency, PaymentMethod, PaymentRequest, PaymentStatus};
use crate::error::{PaymentError, Result};
use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BillingCycle {
    Monthly,
    Annual,
}

impl BillingCycle {
    /// Length of one paid period.
    pub fn period(self) -> Duration {
        match self {
            BillingCycle::Monthly => Duration::days(30),
            BillingCycle::Annual => Duration::days(365),
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s {
            "monthly" => Some(BillingCycle::Monthly),
            "annual" => Some(BillingCycle::Annual),
            _ => None,
        }
    }
}

impl fmt::Display for BillingCycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BillingCycle::Monthly => write!(f, "monthly"),
            BillingCycle::Annual => write!(f, "annual"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkuLimit {
    Limited(u32),
    Unlimited,
}

impl Serialize for SkuLimit {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        match self {
            SkuLimit::Limited(n) => serializer.serialize_u32(*n),
            SkuLimit::Unlimited => serializer.serialize_str("unlimited"),
        }
    }
}

/// A vendor subscription tier, priced in KES.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubscriptionPlan {
    pub id: &'static str,
    pub name: &'static str,
    pub monthly_kes: Decimal,
    pub annual_discount_pct: Decimal,
    pub sku_limit: SkuLimit,
}

impl SubscriptionPlan {
    /// Amount due for one billing period.
    pub fn price(&self, cycle: BillingCycle) -> Decimal {
        match cycle {
            BillingCycle::Monthly => self.monthly_kes,
            BillingCycle::Annual => {
                let yearly = self.monthly_kes * dec!(12);
                (yearly - yearly * self.annual_discount_pct / dec!(100)).round_dp(2)
            }
        }
    }
}

pub fn plans() -> Vec<SubscriptionPlan> {
    let plan = |id, name, monthly_kes, sku_limit| SubscriptionPlan {
        id,
        name,
        monthly_kes,
        annual_discount_pct: dec!(10),
        sku_limit,
    };
    vec![
        plan("basic", "Basic Vendor", dec!(2000), SkuLimit::Limited(50)),
        plan("bronze", "Bronze Vendor", dec!(3500), SkuLimit::Limited(150)),
        plan("silver", "Silver Vendor", dec!(5500), SkuLimit::Limited(500)),
        plan("gold", "Gold Vendor", dec!(7500), SkuLimit::Limited(1000)),
        plan("platinum", "Platinum Vendor", dec!(12000), SkuLimit::Unlimited),
    ]
}

pub fn find_plan(plan_id: &str) -> Option<SubscriptionPlan> {
    plans().into_iter().find(|p| p.id == plan_id)
}

/// A started plan purchase. `initiation` says whether to redirect or poll.
#[derive(Debug, Clone, PartialEq)]
pub struct SubscriptionIntent {
    pub intent_id: String,
    pub vendor_id: String,
    pub plan: SubscriptionPlan,
    pub cycle: BillingCycle,
    pub amount: Decimal,
    pub initiation: Initiation,
}

/// A plan whose payment has settled.
#[derive(Debug, Clone, PartialEq)]
pub struct ActiveSubscription {
    pub vendor_id: String,
    pub plan: SubscriptionPlan,
    pub cycle: BillingCycle,
    pub payment_id: String,
    pub amount: Decimal,
    pub activated_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Turns plan selections into payments, and settled payments into active
/// subscriptions.
pub struct SubscriptionIntents<'a> {
    flow: &'a CheckoutFlow,
}

impl<'a> SubscriptionIntents<'a> {
    pub fn new(flow: &'a CheckoutFlow) -> Self {
        Self { flow }
    }

    pub async fn create(
        &self,
        vendor_id: &str,
        plan_id: &str,
        cycle: BillingCycle,
        method: PaymentMethod,
        payer_contact: &str,
    ) -> Result<SubscriptionIntent> {
        if vendor_id.trim().is_empty() {
            return Err(PaymentError::ValidationError(
                "Vendor id must not be empty".to_string(),
            ));
        }
        let plan = find_plan(plan_id).ok_or_else(|| {
            PaymentError::ValidationError(format!("Unknown subscription plan '{}'", plan_id))
        })?;

        let amount = plan.price(cycle);
        let request = PaymentRequest {
            order_reference: order_reference(vendor_id, plan.id, cycle),
            amount,
            currency: Currency::Kes,
            method,
            payer_contact: payer_contact.to_string(),
        };

        let initiation = self.flow.initiator().initiate(&request).await?;
        let intent_id = initiation.record().id.clone();
        info!(
            vendor_id,
            plan = plan.id,
            %cycle,
            %amount,
            intent_id = %intent_id,
            "subscription intent created"
        );

        Ok(SubscriptionIntent {
            intent_id,
            vendor_id: vendor_id.to_string(),
            plan,
            cycle,
            amount,
            initiation,
        })
    }

    /// Activates the subscription paid for by `intent_id`.
    ///
    /// The payment must belong to `vendor_id`, match its plan's price and be
    /// `completed`; anything still pending or declined is rejected.
    pub async fn confirm(&self, vendor_id: &str, intent_id: &str) -> Result<ActiveSubscription> {
        let record = self.flow.verify(intent_id).await?;

        let (plan, cycle) = parse_order_reference(&record.order_reference, vendor_id)
            .ok_or_else(|| {
                PaymentError::ValidationError(format!(
                    "Payment {} is not a subscription payment for vendor {}",
                    intent_id, vendor_id
                ))
            })?;

        let amount = plan.price(cycle);
        if record.currency != Currency::Kes || record.amount.value() != amount {
            return Err(PaymentError::ValidationError(format!(
                "Payment {} of {} {} does not match the {} {} price of {} KES",
                intent_id,
                record.amount.value(),
                record.currency,
                plan.id,
                cycle,
                amount
            )));
        }

        if record.status != PaymentStatus::Completed {
            return Err(PaymentError::ValidationError(format!(
                "Subscription payment {} is {}, not completed",
                intent_id, record.status
            )));
        }

        let activated_at = record.updated_at;
        info!(vendor_id, plan = plan.id, %cycle, payment_id = intent_id, "subscription activated");
        Ok(ActiveSubscription {
            vendor_id: vendor_id.to_string(),
            plan,
            cycle,
            payment_id: record.id,
            amount,
            activated_at,
            expires_at: activated_at + cycle.period(),
        })
    }
}

fn order_reference(vendor_id: &str, plan_id: &str, cycle: BillingCycle) -> String {
    format!("sub_{}_{}_{}", vendor_id, plan_id, cycle)
}

/// Recovers plan and cycle from `sub_<vendor>_<plan>_<cycle>`. Vendor ids may
/// contain underscores; plan ids and cycles never do.
fn parse_order_reference(
    order_reference: &str,
    vendor_id: &str,
) -> Option<(SubscriptionPlan, BillingCycle)> {
    let rest = order_reference.strip_prefix("sub_")?;
    let mut parts = rest.rsplitn(3, '_');
    let cycle = BillingCycle::parse(parts.next()?)?;
    let plan = find_plan(parts.next()?)?;
    (parts.next()? == vendor_id).then_some((plan, cycle))
}
