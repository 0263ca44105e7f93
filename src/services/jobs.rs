//! Job lifecycle: creation, approval, and status transitions.

use chrono::Utc;
use std::sync::Arc;

use crate::api::{CustomerId, JobId, PropertyId, ServiceOfferingId, StaffId};
use crate::db::repository::{FullRepository, JobTransition};
use crate::models::{Job, JobPriority, JobStatus, JobStatusHistory};

use super::error::{ServiceError, ServiceResult};

pub struct JobService {
    repository: Arc<dyn FullRepository>,
}

impl JobService {
    pub fn new(repository: Arc<dyn FullRepository>) -> Self {
        Self { repository }
    }

    /// Create a requested job against a property and a catalog offering.
    /// Duration, equipment, staffing, buffer, and the price snapshot all
    /// derive from the offering and the property's zone count.
    pub async fn create_job(
        &self,
        customer_id: CustomerId,
        property_id: PropertyId,
        offering_id: ServiceOfferingId,
        priority: JobPriority,
    ) -> ServiceResult<Job> {
        let property = self.repository.get_property(property_id).await?;
        if property.customer_id != customer_id {
            return Err(ServiceError::Validation(
                "property belongs to a different customer".to_string(),
            ));
        }
        let offering = self.repository.get_offering(offering_id).await?;
        if !offering.is_active {
            return Err(ServiceError::StateRejection(
                "service offering is not active".to_string(),
            ));
        }

        let now = Utc::now();
        let job = Job {
            id: JobId::new(),
            customer_id,
            property_id,
            service_offering_id: offering_id,
            category: offering.category,
            status: JobStatus::Requested,
            priority,
            estimated_duration_minutes: offering.duration_for(property.zone_count),
            equipment_required: offering.equipment_required.clone(),
            staff_required: offering.staffing_required,
            buffer_minutes: offering.buffer_minutes,
            preferred_time_start: None,
            preferred_time_end: None,
            price_snapshot: Some(offering.price_for(property.zone_count)),
            notes: None,
            created_at: now,
            updated_at: now,
        };
        self.repository.insert_job(&job).await?;
        Ok(job)
    }

    /// Approve a requested job, making it schedulable.
    pub async fn approve(&self, job_id: JobId, actor: Option<StaffId>) -> ServiceResult<Job> {
        self.transition(job_id, JobStatus::Approved, actor, None).await
    }

    pub async fn start(&self, job_id: JobId, actor: Option<StaffId>) -> ServiceResult<Job> {
        self.transition(job_id, JobStatus::InProgress, actor, None).await
    }

    pub async fn complete(&self, job_id: JobId, actor: Option<StaffId>) -> ServiceResult<Job> {
        self.transition(job_id, JobStatus::Completed, actor, None).await
    }

    pub async fn close(&self, job_id: JobId, actor: Option<StaffId>) -> ServiceResult<Job> {
        self.transition(job_id, JobStatus::Closed, actor, None).await
    }

    pub async fn cancel(
        &self,
        job_id: JobId,
        actor: Option<StaffId>,
        reason: Option<String>,
    ) -> ServiceResult<Job> {
        self.transition(job_id, JobStatus::Cancelled, actor, reason).await
    }

    async fn transition(
        &self,
        job_id: JobId,
        next: JobStatus,
        actor: Option<StaffId>,
        notes: Option<String>,
    ) -> ServiceResult<Job> {
        Ok(self
            .repository
            .transition_job(&JobTransition {
                job_id,
                next_status: next,
                actor,
                notes,
            })
            .await?)
    }

    pub async fn status_history(&self, job_id: JobId) -> ServiceResult<Vec<JobStatusHistory>> {
        Ok(self.repository.fetch_status_history(job_id).await?)
    }
}
