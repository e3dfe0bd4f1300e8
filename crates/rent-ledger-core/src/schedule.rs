//! Due-date arithmetic and payment-status classification.
//!
//! A contract falls due `period_months` calendar months after its last
//! payment. The remaining days until that date put the contract in one of
//! three buckets: overdue, due soon (within [`DUE_SOON_WINDOW_DAYS`]), or
//! current. A contract whose last payment date is unknown is treated as
//! current.

use chrono::{Months, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::RentLedgerError;
use crate::RentLedgerResult;

/// Days before the due date at which a contract starts showing as due soon.
pub const DUE_SOON_WINDOW_DAYS: i64 = 60;

/// Payment status bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PaymentStatus {
    Current,
    DueSoon,
    Overdue,
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaymentStatus::Current => write!(f, "current"),
            PaymentStatus::DueSoon => write!(f, "due-soon"),
            PaymentStatus::Overdue => write!(f, "overdue"),
        }
    }
}

/// Status together with the dates it was derived from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusReport {
    pub status: PaymentStatus,
    /// Absent when the last payment date is unknown
    pub due_date: Option<NaiveDate>,
    pub days_remaining: Option<i64>,
}

/// Add calendar months, clamping the day to the end of shorter months
/// (Jan 31 + 1 month = Feb 28/29).
pub fn add_months(date: NaiveDate, months: u32) -> RentLedgerResult<NaiveDate> {
    date.checked_add_months(Months::new(months))
        .ok_or_else(|| RentLedgerError::DateError(format!("{date} + {months} months overflows")))
}

/// Date the next payment is due.
pub fn due_date(last_payment: NaiveDate, period_months: u32) -> RentLedgerResult<NaiveDate> {
    add_months(last_payment, period_months)
}

/// Bucket a signed day count.
pub fn status_for_days_remaining(days_remaining: i64) -> PaymentStatus {
    if days_remaining < 0 {
        PaymentStatus::Overdue
    } else if days_remaining <= DUE_SOON_WINDOW_DAYS {
        PaymentStatus::DueSoon
    } else {
        PaymentStatus::Current
    }
}

/// Classify a contract's payment status as of `today`.
///
/// Fails open: a missing last payment date, or one whose due date cannot be
/// computed, reports [`PaymentStatus::Current`].
pub fn classify(
    last_payment: Option<NaiveDate>,
    period_months: u32,
    today: NaiveDate,
) -> StatusReport {
    let due = last_payment.and_then(|last| due_date(last, period_months).ok());
    match due {
        Some(due) => {
            let days_remaining = (due - today).num_days();
            StatusReport {
                status: status_for_days_remaining(days_remaining),
                due_date: Some(due),
                days_remaining: Some(days_remaining),
            }
        }
        None => StatusReport {
            status: PaymentStatus::Current,
            due_date: None,
            days_remaining: None,
        },
    }
}

/// Convenience over [`classify`] for raw `YYYY-MM-DD` strings.
pub fn classify_str(
    last_payment: Option<&str>,
    period_months: u32,
    today: NaiveDate,
) -> StatusReport {
    let parsed = last_payment
        .and_then(|s| NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").ok());
    classify(parsed, period_months, today)
}
