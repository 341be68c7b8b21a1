//! # Dispute Fee Split
//!
//! A challenger escrows half the quoted dispute fee when challenging. When
//! the submitter escalates, the fee is quoted again and settled as follows:
//!
//! - **Same asset**: the submitter tops up to the new total. If the
//!   challenger's half already exceeds the new total, the excess goes back to
//!   the challenger.
//! - **Asset changed**: the submitter pays the full new fee and the
//!   challenger's half is refunded in the old asset.
//!
//! Either way the arbitrator receives exactly the current total.

use accord_core::{Amount, AssetId};
use serde::{Deserialize, Serialize};

use crate::service::DisputeFees;

/// How a dispute's fee is funded and paid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeePlan {
    /// Asset paid to the arbitrator.
    pub asset: AssetId,
    /// Amount paid to the arbitrator.
    pub total: Amount,
    /// Amount pulled from the submitter.
    pub submitter_share: Amount,
    /// Escrowed challenger fee returned to the challenger, with its asset.
    pub challenger_refund: Option<(AssetId, Amount)>,
}

impl FeePlan {
    /// Plan the fee for a dispute given what the challenger escrowed.
    pub fn for_dispute(
        challenger_asset: &AssetId,
        challenger_paid: Amount,
        current: &DisputeFees,
    ) -> Self {
        if *challenger_asset == current.asset {
            let excess = challenger_paid.saturating_sub(current.amount);
            Self {
                asset: current.asset.clone(),
                total: current.amount,
                submitter_share: current.amount.saturating_sub(challenger_paid),
                challenger_refund: (excess > 0).then(|| (challenger_asset.clone(), excess)),
            }
        } else {
            Self {
                asset: current.asset.clone(),
                total: current.amount,
                submitter_share: current.amount,
                challenger_refund: (challenger_paid > 0)
                    .then(|| (challenger_asset.clone(), challenger_paid)),
            }
        }
    }

    /// Missing amount the submitter must provide; shown before disputing.
    pub fn missing_fees(&self) -> Amount {
        self.submitter_share
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn asset(s: &str) -> AssetId {
        AssetId::new(s).unwrap()
    }

    fn fees(a: &str, amount: Amount) -> DisputeFees {
        DisputeFees {
            asset: asset(a),
            amount,
        }
    }

    #[test]
    fn half_rounds_down() {
        assert_eq!(fees("FEE", 11).half(), 5);
    }

    #[test]
    fn unchanged_fees_submitter_pays_remainder() {
        let plan = FeePlan::for_dispute(&asset("FEE"), 5, &fees("FEE", 10));
        assert_eq!(plan.submitter_share, 5);
        assert_eq!(plan.total, 10);
        assert!(plan.challenger_refund.is_none());
    }

    #[test]
    fn odd_fee_submitter_covers_rounding() {
        let plan = FeePlan::for_dispute(&asset("FEE"), 5, &fees("FEE", 11));
        assert_eq!(plan.missing_fees(), 6);
    }

    #[test]
    fn raised_fee_same_asset() {
        let plan = FeePlan::for_dispute(&asset("FEE"), 5, &fees("FEE", 30));
        assert_eq!(plan.submitter_share, 25);
        assert!(plan.challenger_refund.is_none());
    }

    #[test]
    fn lowered_fee_refunds_challenger_excess() {
        let plan = FeePlan::for_dispute(&asset("FEE"), 5, &fees("FEE", 3));
        assert_eq!(plan.submitter_share, 0);
        assert_eq!(plan.total, 3);
        assert_eq!(plan.challenger_refund, Some((asset("FEE"), 2)));
    }

    #[test]
    fn changed_asset_submitter_pays_all_and_challenger_refunded() {
        let plan = FeePlan::for_dispute(&asset("FEE"), 5, &fees("NEW", 40));
        assert_eq!(plan.asset, asset("NEW"));
        assert_eq!(plan.submitter_share, 40);
        assert_eq!(plan.challenger_refund, Some((asset("FEE"), 5)));
    }
}
