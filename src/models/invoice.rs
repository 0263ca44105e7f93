//! Invoice records with lien tracking.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::api::{Cents, CustomerId, InvoiceId, JobId};

use super::enums::{InvoiceStatus, PaymentMethod};

/// Days after `invoice_date` at which an unpaid lien-eligible invoice
/// becomes warning-due.
pub const LIEN_WARNING_DAYS: i64 = 45;

/// A customer invoice for a job.
///
/// `total()` is always `amount + late_fee`; `paid_amount` never exceeds it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Invoice {
    pub id: InvoiceId,
    pub job_id: JobId,
    pub customer_id: CustomerId,
    /// Unique, formatted INV-YEAR-SEQ.
    pub invoice_number: String,
    pub amount: Cents,
    pub late_fee: Cents,
    pub invoice_date: NaiveDate,
    pub due_date: NaiveDate,
    pub status: InvoiceStatus,
    pub payment_method: Option<PaymentMethod>,
    pub paid_at: Option<DateTime<Utc>>,
    pub paid_amount: Cents,
    pub reminder_count: u32,
    pub last_reminder_sent: Option<DateTime<Utc>>,
    pub lien_eligible: bool,
    /// Timestamp of the 45-day lien warning; must precede any filing.
    pub lien_warning_sent: Option<DateTime<Utc>>,
    pub lien_filed_date: Option<NaiveDate>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Invoice {
    /// Total owed: amount + late fee.
    pub fn total(&self) -> Cents {
        self.amount + self.late_fee
    }

    pub fn balance(&self) -> Cents {
        self.total() - self.paid_amount
    }

    pub fn is_fully_paid(&self) -> bool {
        self.paid_amount >= self.total()
    }

    /// Whether a lien warning is due as of `today`.
    ///
    /// Anchor is `invoice_date`: an open lien-eligible invoice 45 or more
    /// days old that has not yet been warned.
    pub fn lien_warning_due(&self, today: NaiveDate) -> bool {
        self.lien_eligible
            && self.status.is_open()
            && self.lien_warning_sent.is_none()
            && (today - self.invoice_date).num_days() >= LIEN_WARNING_DAYS
    }

    /// Whether a lien may be filed: eligibility plus a prior warning.
    pub fn can_file_lien(&self) -> bool {
        self.lien_eligible && self.lien_warning_sent.is_some() && self.status.is_open()
    }

    /// Check the record-level invariants (I6).
    pub fn check_invariants(&self) -> Result<(), String> {
        if self.paid_amount > self.total() {
            return Err(format!(
                "paid_amount {} exceeds total {}",
                self.paid_amount,
                self.total()
            ));
        }
        if self.lien_filed_date.is_some() && !(self.lien_eligible && self.lien_warning_sent.is_some())
        {
            return Err("lien filed without eligibility and prior warning".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn invoice() -> Invoice {
        let now = Utc::now();
        Invoice {
            id: InvoiceId::new(),
            job_id: JobId::new(),
            customer_id: CustomerId::new(),
            invoice_number: "INV-2025-0001".to_string(),
            amount: Cents::new(20_000),
            late_fee: Cents::zero(),
            invoice_date: NaiveDate::from_ymd_opt(2025, 5, 1).unwrap(),
            due_date: NaiveDate::from_ymd_opt(2025, 5, 31).unwrap(),
            status: InvoiceStatus::Sent,
            payment_method: None,
            paid_at: None,
            paid_amount: Cents::zero(),
            reminder_count: 0,
            last_reminder_sent: None,
            lien_eligible: true,
            lien_warning_sent: None,
            lien_filed_date: None,
            notes: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn total_is_amount_plus_late_fee() {
        let mut inv = invoice();
        inv.late_fee = Cents::new(1_500);
        assert_eq!(inv.total(), Cents::new(21_500));
        assert_eq!(inv.balance(), Cents::new(21_500));
    }

    #[test]
    fn lien_warning_due_45_days_after_invoice_date() {
        let inv = invoice();
        let day_44 = NaiveDate::from_ymd_opt(2025, 6, 14).unwrap();
        let day_45 = NaiveDate::from_ymd_opt(2025, 6, 15).unwrap();
        assert!(!inv.lien_warning_due(day_44));
        assert!(inv.lien_warning_due(day_45));
    }

    #[test]
    fn lien_filing_requires_warning() {
        let mut inv = invoice();
        assert!(!inv.can_file_lien());
        inv.lien_warning_sent = Some(Utc::now());
        assert!(inv.can_file_lien());

        inv.lien_filed_date = Some(NaiveDate::from_ymd_opt(2025, 7, 1).unwrap());
        assert!(inv.check_invariants().is_ok());

        inv.lien_warning_sent = None;
        assert!(inv.check_invariants().is_err());
    }

    #[test]
    fn overpayment_violates_invariant() {
        let mut inv = invoice();
        inv.paid_amount = Cents::new(20_001);
        assert!(inv.check_invariants().is_err());
    }
}
