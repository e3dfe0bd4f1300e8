//! Rent adjustment: fixed-factor and index-ratio recalculation.
//!
//! The fixed factor multiplies the current amount; the index ratio starts
//! from [`Contract::base_amount`]. Both round to cents with banker's
//! rounding, and on success move the last payment date to the adjustment
//! date and append one [`HistoryEntry`].
//!
//! The index-ratio method never fails silently. Every call ends in an
//! [`AdjustmentOutcome`]; only `Applied` mutates the contract.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::index_series::IndexSeries;
use crate::provider::ProviderError;
use crate::types::{AdjustmentMethod, Contract, Factor, HistoryEntry, IndexKind, Money};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

const IPC_FIXED_FACTOR: Factor = dec!(1.10);
const ICL_FIXED_FACTOR: Factor = dec!(1.12);
const AMOUNT_DECIMALS: u32 = 2;

// ---------------------------------------------------------------------------
// Outcome types
// ---------------------------------------------------------------------------

/// Result of an index-ratio adjustment attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "kebab-case")]
pub enum AdjustmentOutcome {
    /// Contract updated; carries the appended history entry.
    Applied(HistoryEntry),
    /// Series reachable but lacking a usable value. Contract untouched.
    NoData { reason: String },
    /// Provider failed. Contract untouched.
    Unavailable { reason: String },
}

impl AdjustmentOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, AdjustmentOutcome::Applied(_))
    }

    pub fn entry(&self) -> Option<&HistoryEntry> {
        match self {
            AdjustmentOutcome::Applied(entry) => Some(entry),
            _ => None,
        }
    }

    pub fn skip_reason(&self) -> Option<&str> {
        match self {
            AdjustmentOutcome::Applied(_) => None,
            AdjustmentOutcome::NoData { reason } | AdjustmentOutcome::Unavailable { reason } => {
                Some(reason)
            }
        }
    }
}

/// The two index values an index-ratio adjustment is computed from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexRatio {
    pub start_value: Decimal,
    pub current_value: Decimal,
}

impl IndexRatio {
    pub fn factor(&self) -> Option<Factor> {
        if self.start_value.is_zero() {
            None
        } else {
            Some(self.current_value / self.start_value)
        }
    }
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Constant factor applied by the fixed-factor method.
pub fn fixed_factor(kind: IndexKind) -> Factor {
    match kind {
        IndexKind::Ipc => IPC_FIXED_FACTOR,
        IndexKind::Icl => ICL_FIXED_FACTOR,
    }
}

/// `base × factor`, rounded to cents.
pub fn adjusted_amount(base: Money, factor: Factor) -> Money {
    (base * factor).round_dp(AMOUNT_DECIMALS)
}

/// Apply the fixed factor for the contract's index kind as of `today`.
pub fn apply_fixed(contract: &mut Contract, today: NaiveDate) -> HistoryEntry {
    let factor = fixed_factor(contract.index_kind);
    let base = contract.amount;
    record(contract, base, factor, AdjustmentMethod::FixedFactor, today)
}

/// Look up the start-date and today values of a series.
///
/// `Err` carries the reason the ratio cannot be formed.
pub fn index_ratio(
    series: &IndexSeries,
    start: NaiveDate,
    today: NaiveDate,
) -> Result<IndexRatio, String> {
    if series.is_empty() {
        return Err("index series is empty".into());
    }
    let start_value = series
        .value_at(start)
        .ok_or_else(|| format!("no index value on or before contract start {start}"))?;
    let current_value = series
        .value_at(today)
        .ok_or_else(|| format!("no index value on or before {today}"))?;
    if start_value.is_zero() {
        return Err(format!("index value at {start} is zero"));
    }
    Ok(IndexRatio {
        start_value,
        current_value,
    })
}

/// Apply the index ratio between the contract start and `today`.
pub fn apply_index_ratio(
    contract: &mut Contract,
    series: &IndexSeries,
    today: NaiveDate,
) -> AdjustmentOutcome {
    let ratio = match index_ratio(series, contract.start_date, today) {
        Ok(ratio) => ratio,
        Err(reason) => return AdjustmentOutcome::NoData { reason },
    };
    match ratio.factor() {
        Some(factor) => {
            let base = contract.base_amount();
            let entry = record(contract, base, factor, AdjustmentMethod::IndexRatio, today);
            AdjustmentOutcome::Applied(entry)
        }
        None => AdjustmentOutcome::NoData {
            reason: "index value at contract start is zero".into(),
        },
    }
}

/// Index-ratio adjustment given the provider's fetch result.
pub fn apply_fetched(
    contract: &mut Contract,
    fetched: Result<IndexSeries, ProviderError>,
    today: NaiveDate,
) -> AdjustmentOutcome {
    match fetched {
        Ok(series) => apply_index_ratio(contract, &series, today),
        Err(err) => AdjustmentOutcome::Unavailable {
            reason: err.to_string(),
        },
    }
}

// ---------------------------------------------------------------------------
// Internals
// ---------------------------------------------------------------------------

fn record(
    contract: &mut Contract,
    base: Money,
    factor: Factor,
    method: AdjustmentMethod,
    today: NaiveDate,
) -> HistoryEntry {
    let previous_amount = contract.amount;
    let new_amount = adjusted_amount(base, factor);

    let entry = HistoryEntry {
        date: today,
        index_kind: contract.index_kind,
        previous_amount,
        new_amount,
        method,
        factor: Some(factor),
    };

    contract.amount = new_amount;
    contract.last_payment = Some(today);
    contract.history.push(entry.clone());
    entry
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index_series::IndexPoint;
    use crate::types::AdjustmentMode;
    use pretty_assertions::assert_eq;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn sample_contract(kind: IndexKind, mode: AdjustmentMode) -> Contract {
        Contract {
            tenant: "Ana".to_string(),
            amount: dec!(1000),
            original_amount: dec!(1000),
            index_kind: kind,
            mode,
            start_date: d(2024, 1, 1),
            last_payment: Some(d(2024, 1, 1)),
            period_months: 6,
            history: Vec::new(),
            owner: "ana".to_string(),
        }
    }

    fn series() -> IndexSeries {
        IndexSeries::new(vec![
            IndexPoint { date: d(2023, 12, 1), value: dec!(200) },
            IndexPoint { date: d(2024, 6, 1), value: dec!(250) },
            IndexPoint { date: d(2024, 7, 1), value: dec!(260) },
        ])
    }

    #[test]
    fn test_fixed_ipc_adds_ten_percent() {
        let mut c = sample_contract(IndexKind::Ipc, AdjustmentMode::Cumulative);
        let today = d(2024, 7, 1);
        let entry = apply_fixed(&mut c, today);
        assert_eq!(c.amount, dec!(1100.00));
        assert_eq!(entry.previous_amount, dec!(1000));
        assert_eq!(entry.new_amount, dec!(1100.00));
        assert_eq!(c.last_payment, Some(today));
        assert_eq!(c.history.len(), 1);
        assert_eq!(entry.method, AdjustmentMethod::FixedFactor);
    }

    #[test]
    fn test_fixed_icl_adds_twelve_percent_and_compounds() {
        let mut c = sample_contract(IndexKind::Icl, AdjustmentMode::Cumulative);
        apply_fixed(&mut c, d(2024, 7, 1));
        apply_fixed(&mut c, d(2025, 1, 1));
        // 1000 * 1.12 = 1120; 1120 * 1.12 = 1254.40
        assert_eq!(c.amount, dec!(1254.40));
        assert_eq!(c.history.len(), 2);
        assert_eq!(c.history[1].previous_amount, dec!(1120.00));
    }

    #[test]
    fn test_fixed_factor_ignores_mode_and_compounds() {
        let mut c = sample_contract(IndexKind::Ipc, AdjustmentMode::FromOriginal);
        apply_fixed(&mut c, d(2024, 7, 1));
        let second = apply_fixed(&mut c, d(2025, 1, 1));
        assert_eq!(second.previous_amount, dec!(1100.00));
        assert_eq!(second.new_amount, dec!(1210.00));
        assert_eq!(c.amount, dec!(1210.00));
        assert_eq!(c.original_amount, dec!(1000));
    }

    #[test]
    fn test_rounding_is_to_cents() {
        assert_eq!(adjusted_amount(dec!(333.33), dec!(1.10)), dec!(366.66));
        assert_eq!(adjusted_amount(dec!(0.05), dec!(1.1)), dec!(0.06));
    }

    #[test]
    fn test_index_ratio_applies_value_ratio() {
        let mut c = sample_contract(IndexKind::Icl, AdjustmentMode::Cumulative);
        let outcome = apply_index_ratio(&mut c, &series(), d(2024, 6, 15));
        // base 1000 * 250 / 200
        assert!(outcome.is_applied());
        assert_eq!(c.amount, dec!(1250.00));
        assert_eq!(outcome.entry().unwrap().factor, Some(dec!(1.25)));
        assert_eq!(outcome.entry().unwrap().method, AdjustmentMethod::IndexRatio);
    }

    #[test]
    fn test_index_ratio_from_original_uses_signed_amount() {
        let mut c = sample_contract(IndexKind::Ipc, AdjustmentMode::FromOriginal);
        c.amount = dec!(1500);
        apply_index_ratio(&mut c, &series(), d(2024, 7, 2));
        assert_eq!(c.amount, dec!(1300.00));
        assert_eq!(c.history[0].previous_amount, dec!(1500));
    }

    #[test]
    fn test_index_ratio_is_deterministic() {
        let mut a = sample_contract(IndexKind::Icl, AdjustmentMode::Cumulative);
        let mut b = a.clone();
        let today = d(2024, 7, 10);
        let first = apply_index_ratio(&mut a, &series(), today);
        let second = apply_index_ratio(&mut b, &series(), today);
        assert_eq!(first, second);
        assert_eq!(a, b);
    }

    #[test]
    fn test_empty_series_is_no_data_and_no_mutation() {
        let mut c = sample_contract(IndexKind::Ipc, AdjustmentMode::Cumulative);
        let before = c.clone();
        let outcome = apply_index_ratio(&mut c, &IndexSeries::default(), d(2024, 7, 1));
        assert!(matches!(outcome, AdjustmentOutcome::NoData { .. }));
        assert_eq!(c, before);
    }

    #[test]
    fn test_start_before_series_is_no_data() {
        let mut c = sample_contract(IndexKind::Ipc, AdjustmentMode::Cumulative);
        c.start_date = d(2020, 1, 1);
        let before = c.clone();
        let outcome = apply_index_ratio(&mut c, &series(), d(2024, 7, 1));
        assert!(outcome.skip_reason().unwrap().contains("contract start"));
        assert_eq!(c, before);
    }

    #[test]
    fn test_zero_start_value_is_no_data() {
        let zero = IndexSeries::new(vec![IndexPoint { date: d(2023, 1, 1), value: Decimal::ZERO }]);
        let mut c = sample_contract(IndexKind::Ipc, AdjustmentMode::Cumulative);
        let outcome = apply_index_ratio(&mut c, &zero, d(2024, 7, 1));
        assert!(matches!(outcome, AdjustmentOutcome::NoData { .. }));
        assert!(c.history.is_empty());
    }

    #[test]
    fn test_provider_failure_is_unavailable() {
        let mut c = sample_contract(IndexKind::Ipc, AdjustmentMode::Cumulative);
        let err = ProviderError::new("http_non_200", Some(503), "service unavailable");
        let outcome = apply_fetched(&mut c, Err(err), d(2024, 7, 1));
        assert!(matches!(outcome, AdjustmentOutcome::Unavailable { .. }));
        assert_eq!(c.amount, dec!(1000));
        assert!(c.history.is_empty());
    }
}
