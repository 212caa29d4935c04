//! Pure drop-table arithmetic.
//!
//! Chances are independent weights. Tier totals are summed for reporting only
//! and never normalized.

/// Tier names in report order.
pub const TIERS: [&str; 4] = ["Fodder", "Normal", "Elite", "MiniBoss"];

/// Sum of entry chances for one tier.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TierTotal {
    pub tier: &'static str,
    pub entries: usize,
    pub total: f64,
}

pub fn tier_total(tier: &'static str, chances: &[f64]) -> TierTotal {
    TierTotal {
        tier,
        entries: chances.len(),
        total: chances.iter().sum(),
    }
}

/// Highest tier total, floored at zero.
pub fn max_tier_total(totals: &[TierTotal]) -> f64 {
    totals
        .iter()
        .map(|tier| tier.total)
        .fold(0.0, f64::max)
}

/// True when no tier has a positive total.
pub fn is_effectively_empty(totals: &[TierTotal]) -> bool {
    totals.iter().all(|tier| tier.total <= 0.0)
}

/// Format a chance with at most three decimals and no trailing zeros.
pub fn fmt_chance(value: f64) -> String {
    let fixed = format!("{value:.3}");
    let trimmed = fixed.trim_end_matches('0').trim_end_matches('.');
    match trimmed {
        "" | "-0" => "0".to_string(),
        other => other.to_string(),
    }
}
