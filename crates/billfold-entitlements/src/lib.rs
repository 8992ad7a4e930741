//! Tier → entitlement mapping.
//!
//! Translates the mirrored subscription tier into feature flags and
//! record-count ceilings. Every check here is advisory, for gating UI;
//! authoritative enforcement happens server-side at the point of
//! persistence. The engine never contacts the payment processor; it only
//! reads the mirrored subscription record, defaulting to the free tier
//! when none exists.

use std::collections::BTreeMap;

use billfold_api::{SubscriptionRecord, Tier};
use once_cell::sync::Lazy;

/// A resource ceiling. `Unlimited` means no ceiling applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quota {
    Limited(u32),
    Unlimited,
}

impl Quota {
    /// True iff a record may be created given the current count.
    pub fn allows(self, current_count: u32) -> bool {
        match self {
            Quota::Unlimited => true,
            Quota::Limited(ceiling) => current_count < ceiling,
        }
    }
}

/// Record kinds with per-tier ceilings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Invoice,
    Client,
}

/// The closed set of gated features.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Feature {
    Invoicing,
    ClientDirectory,
    PdfExport,
    RecurringInvoices,
    CustomBranding,
    PaymentReminders,
    TeamMembers,
    ApiAccess,
    PrioritySupport,
}

/// Ceilings and features unlocked by a tier.
#[derive(Debug, Clone)]
pub struct TierEntitlements {
    pub invoices: Quota,
    pub clients: Quota,
    pub features: &'static [Feature],
}

impl TierEntitlements {
    pub fn quota(&self, kind: ResourceKind) -> Quota {
        match kind {
            ResourceKind::Invoice => self.invoices,
            ResourceKind::Client => self.clients,
        }
    }
}

const FREE_FEATURES: &[Feature] = &[
    Feature::Invoicing,
    Feature::ClientDirectory,
    Feature::PdfExport,
];

const PRO_FEATURES: &[Feature] = &[
    Feature::Invoicing,
    Feature::ClientDirectory,
    Feature::PdfExport,
    Feature::RecurringInvoices,
    Feature::CustomBranding,
    Feature::PaymentReminders,
];

const BUSINESS_FEATURES: &[Feature] = &[
    Feature::Invoicing,
    Feature::ClientDirectory,
    Feature::PdfExport,
    Feature::RecurringInvoices,
    Feature::CustomBranding,
    Feature::PaymentReminders,
    Feature::TeamMembers,
    Feature::ApiAccess,
    Feature::PrioritySupport,
];

static TIER_TABLE: Lazy<BTreeMap<Tier, TierEntitlements>> = Lazy::new(|| {
    BTreeMap::from([
        (
            Tier::Free,
            TierEntitlements {
                invoices: Quota::Limited(5),
                clients: Quota::Limited(10),
                features: FREE_FEATURES,
            },
        ),
        (
            Tier::Pro,
            TierEntitlements {
                invoices: Quota::Unlimited,
                clients: Quota::Unlimited,
                features: PRO_FEATURES,
            },
        ),
        (
            Tier::Business,
            TierEntitlements {
                invoices: Quota::Unlimited,
                clients: Quota::Unlimited,
                features: BUSINESS_FEATURES,
            },
        ),
    ])
});

/// Entitlements for a tier.
pub fn entitlements_for(tier: Tier) -> &'static TierEntitlements {
    &TIER_TABLE[&tier]
}

/// Tier of a mirrored subscription record; free when the record is absent
/// or the subscription is not active.
pub fn resolve_tier(record: Option<&SubscriptionRecord>) -> Tier {
    match record {
        Some(record) if record.subscribed => record.tier,
        _ => Tier::Free,
    }
}

/// Advisory ceiling check: may another record of this kind be created?
pub fn can_create(tier: Tier, kind: ResourceKind, current_count: u32) -> bool {
    entitlements_for(tier).quota(kind).allows(current_count)
}

/// Cumulative feature membership under free < pro < business.
pub fn has_feature(tier: Tier, feature: Feature) -> bool {
    entitlements_for(tier).features.contains(&feature)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(tier: Tier, subscribed: bool) -> SubscriptionRecord {
        SubscriptionRecord {
            user_id: "user-1".to_string(),
            tier,
            subscribed,
            period_end_ms: None,
            billing_ref: None,
        }
    }

    #[test]
    fn free_tier_invoice_ceiling() {
        assert!(can_create(Tier::Free, ResourceKind::Invoice, 4));
        assert!(!can_create(Tier::Free, ResourceKind::Invoice, 5));
        assert!(!can_create(Tier::Free, ResourceKind::Invoice, 6));
    }

    #[test]
    fn free_tier_client_ceiling() {
        assert!(can_create(Tier::Free, ResourceKind::Client, 9));
        assert!(!can_create(Tier::Free, ResourceKind::Client, 10));
    }

    #[test]
    fn paid_tiers_are_unlimited() {
        assert!(can_create(Tier::Pro, ResourceKind::Invoice, 999_999));
        assert!(can_create(Tier::Business, ResourceKind::Client, 999_999));
    }

    #[test]
    fn features_are_cumulative() {
        assert!(has_feature(Tier::Free, Feature::Invoicing));
        assert!(!has_feature(Tier::Free, Feature::RecurringInvoices));

        assert!(has_feature(Tier::Pro, Feature::Invoicing));
        assert!(has_feature(Tier::Pro, Feature::RecurringInvoices));
        assert!(!has_feature(Tier::Pro, Feature::ApiAccess));

        assert!(has_feature(Tier::Business, Feature::ApiAccess));
        assert!(has_feature(Tier::Business, Feature::RecurringInvoices));
    }

    #[test]
    fn higher_tiers_include_lower_tier_features() {
        let tiers = [Tier::Free, Tier::Pro, Tier::Business];
        for pair in tiers.windows(2) {
            for feature in entitlements_for(pair[0]).features {
                assert!(
                    has_feature(pair[1], *feature),
                    "{:?} missing {feature:?} from {:?}",
                    pair[1],
                    pair[0]
                );
            }
        }
    }

    #[test]
    fn tier_order_is_total() {
        assert!(Tier::Free < Tier::Pro);
        assert!(Tier::Pro < Tier::Business);
    }

    #[test]
    fn missing_or_inactive_subscription_resolves_free() {
        assert_eq!(resolve_tier(None), Tier::Free);
        assert_eq!(resolve_tier(Some(&record(Tier::Pro, false))), Tier::Free);
        assert_eq!(resolve_tier(Some(&record(Tier::Pro, true))), Tier::Pro);
        assert_eq!(
            resolve_tier(Some(&record(Tier::Business, true))),
            Tier::Business
        );
    }
}
