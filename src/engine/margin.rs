//! Liquidity-tier margin curves.
//!
//! A tier charges its base fraction up to `base_position_notional`; above it
//! the fraction grows by [`MARGIN_FRACTION_STEP_PPM`] per `step_notional` of
//! extra notional, saturating at 1.

use crate::domain::{Decimal, LiquidityTier};
use serde::Serialize;

/// Fraction added per full step of notional above the base threshold, in ppm.
pub const MARGIN_FRACTION_STEP_PPM: u32 = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MarginKind {
    Initial,
    Maintenance,
}

/// Fraction charged at or below the tier's base notional.
pub fn base_margin_fraction(tier: &LiquidityTier, kind: MarginKind) -> Decimal {
    let initial = Decimal::from_ppm(tier.initial_margin_ppm);
    let base = match kind {
        MarginKind::Initial => initial,
        MarginKind::Maintenance => initial * Decimal::from_ppm(tier.maintenance_fraction_ppm),
    };
    base.min(Decimal::one())
}

/// Margin fraction for a position of the given notional. The sign of `notional` is ignored.
pub fn margin_fraction(notional: Decimal, tier: &LiquidityTier, kind: MarginKind) -> Decimal {
    let notional = notional.abs();
    let base = base_margin_fraction(tier, kind);
    if notional <= tier.base_position_notional || !tier.step_notional.is_positive() {
        return base;
    }
    // Overflow only happens far past the notional where the curve saturates.
    notional
        .checked_sub(tier.base_position_notional)
        .and_then(|extra| extra.checked_div(tier.step_notional))
        .and_then(|steps| steps.checked_mul(Decimal::from_ppm(MARGIN_FRACTION_STEP_PPM)))
        .and_then(|growth| base.checked_add(growth))
        .map_or(Decimal::one(), |fraction| fraction.min(Decimal::one()))
}

/// Notional at which the curve reaches 1, or `None` for a flat curve below 1
/// or one that only reaches 1 past the largest representable notional.
pub fn max_notional(tier: &LiquidityTier, kind: MarginKind) -> Option<Decimal> {
    let base = base_margin_fraction(tier, kind);
    if base >= Decimal::one() {
        return Some(Decimal::zero());
    }
    if !tier.step_notional.is_positive() {
        return None;
    }
    let steps = (Decimal::one() - base) / Decimal::from_ppm(MARGIN_FRACTION_STEP_PPM);
    steps
        .checked_mul(tier.step_notional)
        .and_then(|extra| tier.base_position_notional.checked_add(extra))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarginRequirement {
    pub initial: Decimal,
    pub maintenance: Decimal,
}

/// Notional and margin for one position at the current oracle price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionRisk {
    pub signed_notional: Decimal,
    pub initial_fraction: Decimal,
    pub maintenance_fraction: Decimal,
    pub requirement: MarginRequirement,
}

pub fn position_risk(signed_size: Decimal, oracle_price: Decimal, tier: &LiquidityTier) -> PositionRisk {
    let signed_notional = signed_size * oracle_price;
    let notional = signed_notional.abs();
    let initial_fraction = margin_fraction(notional, tier, MarginKind::Initial);
    let maintenance_fraction = margin_fraction(notional, tier, MarginKind::Maintenance);
    PositionRisk {
        signed_notional,
        initial_fraction,
        maintenance_fraction,
        requirement: MarginRequirement {
            initial: notional * initial_fraction,
            maintenance: notional * maintenance_fraction,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::LiquidityTierId;
    use rust_decimal::Decimal as RustDecimal;
    use rust_decimal_macros::dec;

    fn tier() -> LiquidityTier {
        LiquidityTier {
            id: LiquidityTierId(0),
            name: "Large-Cap".to_string(),
            initial_margin_ppm: 50_000,
            maintenance_fraction_ppm: 600_000,
            base_position_notional: Decimal::from(1_000_000),
            step_notional: Decimal::from(1_000_000),
            open_interest_lower_cap: None,
            open_interest_upper_cap: None,
        }
    }

    #[test]
    fn test_base_fractions() {
        let tier = tier();
        assert_eq!(base_margin_fraction(&tier, MarginKind::Initial), dec!(0.05).into());
        assert_eq!(base_margin_fraction(&tier, MarginKind::Maintenance), dec!(0.03).into());
    }

    #[test]
    fn test_fraction_flat_up_to_base_notional() {
        let tier = tier();
        assert_eq!(
            margin_fraction(Decimal::from(10), &tier, MarginKind::Initial),
            dec!(0.05).into()
        );
        assert_eq!(
            margin_fraction(Decimal::from(1_000_000), &tier, MarginKind::Initial),
            dec!(0.05).into()
        );
    }

    #[test]
    fn test_fraction_grows_per_step() {
        let tier = tier();
        assert_eq!(
            margin_fraction(Decimal::from(3_000_000), &tier, MarginKind::Initial),
            dec!(0.07).into()
        );
        assert_eq!(
            margin_fraction(Decimal::from(1_500_000), &tier, MarginKind::Maintenance),
            dec!(0.035).into()
        );
    }

    #[test]
    fn test_fraction_caps_at_one() {
        let tier = tier();
        let huge = Decimal::from(1_000_000_000_000);
        assert_eq!(margin_fraction(huge, &tier, MarginKind::Initial), Decimal::one());
        assert_eq!(margin_fraction(huge, &tier, MarginKind::Maintenance), Decimal::one());
    }

    #[test]
    fn test_tiny_step_saturates_instead_of_overflowing() {
        let mut tier = tier();
        tier.step_notional = Decimal::from(RustDecimal::new(1, 20));
        let notional = Decimal::from(1_000_000_000_000_000);
        assert_eq!(margin_fraction(notional, &tier, MarginKind::Initial), Decimal::one());
        assert_eq!(margin_fraction(notional, &tier, MarginKind::Maintenance), Decimal::one());
        assert_eq!(
            margin_fraction(Decimal::from(RustDecimal::MAX), &tier, MarginKind::Initial),
            Decimal::one()
        );
    }

    #[test]
    fn test_max_notional_beyond_range() {
        let mut tier = tier();
        tier.step_notional = Decimal::from(RustDecimal::MAX);
        assert_eq!(max_notional(&tier, MarginKind::Initial), None);
        // Just under one full step above the base fraction.
        let fraction = margin_fraction(Decimal::from(RustDecimal::MAX), &tier, MarginKind::Initial);
        assert!(fraction > Decimal::from(dec!(0.05)));
        assert!(fraction <= Decimal::from(dec!(0.06)));
    }

    #[test]
    fn test_flat_curve_without_step() {
        let mut tier = tier();
        tier.step_notional = Decimal::zero();
        assert_eq!(
            margin_fraction(Decimal::from(50_000_000), &tier, MarginKind::Initial),
            dec!(0.05).into()
        );
        assert_eq!(max_notional(&tier, MarginKind::Initial), None);
    }

    #[test]
    fn test_max_notional_reaches_one() {
        let tier = tier();
        let max = max_notional(&tier, MarginKind::Initial).unwrap();
        assert_eq!(max, Decimal::from(96_000_000));
        assert_eq!(margin_fraction(max, &tier, MarginKind::Initial), Decimal::one());
    }

    #[test]
    fn test_position_risk_short() {
        let tier = tier();
        let risk = position_risk(Decimal::from(-2), Decimal::from(1_000), &tier);
        assert_eq!(risk.signed_notional, Decimal::from(-2_000));
        assert_eq!(risk.requirement.initial, Decimal::from(100));
        assert_eq!(risk.requirement.maintenance, Decimal::from(60));
    }
}
