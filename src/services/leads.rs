//! Lead intake and lead-to-customer conversion.

use chrono::Utc;
use std::sync::Arc;

use crate::api::{CustomerId, LeadId};
use crate::db::repository::FullRepository;
use crate::models::contact::{normalize_phone, validate_zip};
use crate::models::{Customer, Lead, LeadSource};

use super::error::{ServiceError, ServiceResult};

pub struct LeadService {
    repository: Arc<dyn FullRepository>,
}

impl LeadService {
    pub fn new(repository: Arc<dyn FullRepository>) -> Self {
        Self { repository }
    }

    /// Create a lead, normalizing the phone and validating the zip.
    pub async fn create_lead(
        &self,
        name: &str,
        phone: Option<&str>,
        email: Option<&str>,
        zip_code: Option<&str>,
        source: LeadSource,
        notes: Option<String>,
    ) -> ServiceResult<Lead> {
        if name.trim().is_empty() {
            return Err(ServiceError::Validation("lead name must not be empty".to_string()));
        }
        if let Some(zip) = zip_code {
            if !validate_zip(zip) {
                return Err(ServiceError::Validation(format!("invalid zip code: {}", zip)));
            }
        }

        let lead = Lead {
            id: LeadId::new(),
            name: name.trim().to_string(),
            phone: phone.map(normalize_phone),
            email: email.map(str::to_string),
            zip_code: zip_code.map(str::to_string),
            source,
            notes,
            converted_customer_id: None,
            created_at: Utc::now(),
        };
        self.repository.insert_lead(&lead).await?;
        Ok(lead)
    }

    /// Convert a lead into a customer. A lead converts exactly once;
    /// converting again is a state rejection.
    pub async fn convert(&self, lead_id: LeadId) -> ServiceResult<Customer> {
        let lead = self.repository.get_lead(lead_id).await?;
        if lead.is_converted() {
            return Err(ServiceError::StateRejection(format!(
                "lead {} already converted",
                lead_id
            )));
        }

        let (first_name, last_name) = split_name(&lead.name);
        let now = Utc::now();
        let customer = Customer {
            id: CustomerId::new(),
            first_name,
            last_name,
            email: lead.email.clone(),
            phone: lead.phone.clone(),
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        Ok(self.repository.convert_lead(lead_id, &customer).await?)
    }
}

fn split_name(full: &str) -> (String, String) {
    match full.split_once(' ') {
        Some((first, rest)) => (first.to_string(), rest.to_string()),
        None => (full.to_string(), String::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_names() {
        assert_eq!(split_name("Ada Lovelace"), ("Ada".into(), "Lovelace".into()));
        assert_eq!(split_name("Cher"), ("Cher".into(), String::new()));
        assert_eq!(
            split_name("Mary Jo van der Berg"),
            ("Mary".into(), "Jo van der Berg".into())
        );
    }
}
