//! Invoice lifecycle and lien-deadline tracking.
//!
//! The lien clock is anchored at `invoice_date`: an open lien-eligible
//! invoice becomes warning-due 45 days later; filing requires the warning
//! to have gone out first.

use chrono::{Datelike, Duration, NaiveDate, Utc};
use std::sync::Arc;

use crate::api::{Cents, InvoiceId, JobId, MessageId};
use crate::db::repository::FullRepository;
use crate::models::{Invoice, InvoiceStatus, JobStatus, PaymentMethod, SentMessage};

use super::error::{ServiceError, ServiceResult};

/// Default payment terms in days.
const NET_DAYS: i64 = 30;

pub struct InvoiceService {
    repository: Arc<dyn FullRepository>,
}

impl InvoiceService {
    pub fn new(repository: Arc<dyn FullRepository>) -> Self {
        Self { repository }
    }

    /// Create a draft invoice for a completed job. Amount comes from the
    /// job's price snapshot; lien eligibility from the offering.
    pub async fn create_for_job(&self, job_id: JobId) -> ServiceResult<Invoice> {
        let job = self.repository.get_job(job_id).await?;
        if !matches!(job.status, JobStatus::Completed | JobStatus::Closed) {
            return Err(ServiceError::StateRejection(format!(
                "cannot invoice a job in status {}",
                job.status
            )));
        }
        let offering = self.repository.get_offering(job.service_offering_id).await?;
        let amount = match job.price_snapshot {
            Some(price) => price,
            None => {
                let property = self.repository.get_property(job.property_id).await?;
                offering.price_for(property.zone_count)
            }
        };

        let today = Utc::now().date_naive();
        let year = today.year();
        let sequence = self.repository.last_invoice_sequence(year).await? + 1;

        let now = Utc::now();
        let invoice = Invoice {
            id: InvoiceId::new(),
            job_id,
            customer_id: job.customer_id,
            invoice_number: format!("INV-{}-{:04}", year, sequence),
            amount,
            late_fee: Cents::zero(),
            invoice_date: today,
            due_date: today + Duration::days(NET_DAYS),
            status: InvoiceStatus::Draft,
            payment_method: None,
            paid_at: None,
            paid_amount: Cents::zero(),
            reminder_count: 0,
            last_reminder_sent: None,
            lien_eligible: offering.lien_eligible,
            lien_warning_sent: None,
            lien_filed_date: None,
            notes: None,
            created_at: now,
            updated_at: now,
        };
        self.repository.insert_invoice(&invoice).await?;
        Ok(invoice)
    }

    /// Move an invoice along its lifecycle, rejecting illegal moves.
    pub async fn set_status(
        &self,
        invoice_id: InvoiceId,
        next: InvoiceStatus,
    ) -> ServiceResult<Invoice> {
        let mut invoice = self.repository.get_invoice(invoice_id).await?;
        if !invoice.status.can_transition_to(next) {
            return Err(ServiceError::StateRejection(format!(
                "illegal invoice transition {} -> {}",
                invoice.status, next
            )));
        }
        invoice.status = next;
        invoice.updated_at = Utc::now();
        self.repository.update_invoice(&invoice).await?;
        Ok(invoice)
    }

    /// Record a payment; the repository enforces `paid_amount <= total`.
    pub async fn record_payment(
        &self,
        invoice_id: InvoiceId,
        amount: Cents,
        method: PaymentMethod,
    ) -> ServiceResult<Invoice> {
        Ok(self.repository.record_payment(invoice_id, amount, method).await?)
    }

    /// Apply a late fee to an open invoice and mark it overdue.
    pub async fn apply_late_fee(
        &self,
        invoice_id: InvoiceId,
        fee: Cents,
    ) -> ServiceResult<Invoice> {
        if fee.value() < 0 {
            return Err(ServiceError::Validation("late fee must be non-negative".to_string()));
        }
        let mut invoice = self.repository.get_invoice(invoice_id).await?;
        if !invoice.status.is_open() {
            return Err(ServiceError::StateRejection(format!(
                "invoice in status {} cannot take a late fee",
                invoice.status
            )));
        }
        invoice.late_fee = invoice.late_fee + fee;
        if invoice.status.can_transition_to(InvoiceStatus::Overdue) {
            invoice.status = InvoiceStatus::Overdue;
        }
        invoice.updated_at = Utc::now();
        self.repository.update_invoice(&invoice).await?;
        Ok(invoice)
    }

    /// Send 45-day lien warnings for every invoice that is due one as of
    /// `today`. Records the notification per customer; delivery itself is
    /// the SMS provider's job. Returns the invoices warned.
    pub async fn send_due_lien_warnings(&self, today: NaiveDate) -> ServiceResult<Vec<Invoice>> {
        let due = self.repository.list_lien_warning_due(today).await?;
        let mut warned = Vec::with_capacity(due.len());
        for mut invoice in due {
            invoice.lien_warning_sent = Some(Utc::now());
            invoice.updated_at = Utc::now();
            self.repository.update_invoice(&invoice).await?;

            let customer = self.repository.get_customer(invoice.customer_id).await?;
            if let Some(phone) = customer.phone {
                self.repository
                    .insert_sent_message(&SentMessage {
                        id: MessageId::new(),
                        recipient_phone: phone,
                        body: format!(
                            "Notice: invoice {} is 45 days past its issue date and \
                             eligible for a mechanic's lien filing.",
                            invoice.invoice_number
                        ),
                        related_job_id: Some(invoice.job_id),
                        sent_at: Utc::now(),
                    })
                    .await?;
            }
            warned.push(invoice);
        }
        Ok(warned)
    }

    /// File a lien. Requires eligibility and a previously sent warning.
    pub async fn file_lien(
        &self,
        invoice_id: InvoiceId,
        filed_date: NaiveDate,
    ) -> ServiceResult<Invoice> {
        let mut invoice = self.repository.get_invoice(invoice_id).await?;
        if !invoice.can_file_lien() {
            return Err(ServiceError::StateRejection(
                "lien filing requires eligibility, an open balance, and a prior warning"
                    .to_string(),
            ));
        }
        invoice.lien_filed_date = Some(filed_date);
        invoice.updated_at = Utc::now();
        self.repository.update_invoice(&invoice).await?;
        Ok(invoice)
    }
}
