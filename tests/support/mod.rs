//! Shared fixtures for the integration tests.
//!
//! Each test binary compiles its own copy; not every helper is used
//! everywhere.
#![allow(dead_code)]

use chrono::{NaiveDate, NaiveTime, Utc};
use std::sync::Arc;

use fieldops_rust::api::{
    Cents, CustomerId, GeoPoint, JobId, PropertyId, ServiceOfferingId, StaffId,
};
use fieldops_rust::db::repository::FullRepository;
use fieldops_rust::db::LocalRepository;
use fieldops_rust::models::{
    Customer, Job, JobCategory, JobPriority, JobStatus, PricingModel, Property, PropertyType,
    ServiceOffering, Staff, StaffAvailability, StaffRole, SystemType,
};
use fieldops_rust::scheduler::travel::{GreatCircleEstimator, TravelTimeEstimator};
use fieldops_rust::services::{
    ConflictResolutionService, EmergencyService, InvoiceService, JobService, LeadService,
    ReassignmentService, ScheduleClearService, ScheduleGenerationService,
};

pub const SEED: u64 = 42;

pub fn test_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 6, 16).expect("valid date")
}

pub fn hm(hour: u32, minute: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(hour, minute, 0).expect("valid time")
}

/// An in-memory world: repository plus service constructors.
pub struct TestWorld {
    pub repo: Arc<dyn FullRepository>,
    pub travel: Arc<dyn TravelTimeEstimator>,
}

impl TestWorld {
    pub fn new() -> Self {
        Self {
            repo: Arc::new(LocalRepository::new()),
            travel: Arc::new(GreatCircleEstimator::default()),
        }
    }

    pub fn generation(&self) -> ScheduleGenerationService {
        ScheduleGenerationService::new(Arc::clone(&self.repo), Arc::clone(&self.travel))
            .with_seed(SEED)
    }

    pub fn emergency(&self) -> EmergencyService {
        EmergencyService::new(Arc::clone(&self.repo), Arc::clone(&self.travel))
    }

    pub fn reassignment(&self) -> ReassignmentService {
        ReassignmentService::new(Arc::clone(&self.repo), Arc::clone(&self.travel))
    }

    pub fn conflicts(&self) -> ConflictResolutionService {
        ConflictResolutionService::new(Arc::clone(&self.repo))
    }

    pub fn clearing(&self) -> ScheduleClearService {
        ScheduleClearService::new(Arc::clone(&self.repo))
    }

    pub fn jobs(&self) -> JobService {
        JobService::new(Arc::clone(&self.repo))
    }

    pub fn invoices(&self) -> InvoiceService {
        InvoiceService::new(Arc::clone(&self.repo))
    }

    pub fn leads(&self) -> LeadService {
        LeadService::new(Arc::clone(&self.repo))
    }

    pub async fn seed_customer(&self, name: &str) -> CustomerId {
        let now = Utc::now();
        let customer = Customer {
            id: CustomerId::new(),
            first_name: name.to_string(),
            last_name: "Customer".to_string(),
            email: None,
            phone: Some("(612) 555-0100".to_string()),
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        self.repo.insert_customer(&customer).await.expect("insert customer");
        customer.id
    }

    pub async fn seed_property(
        &self,
        customer_id: CustomerId,
        city: &str,
        lat: f64,
        lng: f64,
    ) -> PropertyId {
        let now = Utc::now();
        let property = Property {
            id: PropertyId::new(),
            customer_id,
            address: "123 Main St".to_string(),
            city: city.to_string(),
            state: "MN".to_string(),
            zip_code: Some("55401".to_string()),
            location: Some(GeoPoint {
                latitude: lat,
                longitude: lng,
            }),
            zone_count: Some(6),
            system_type: SystemType::Standard,
            property_type: PropertyType::Residential,
            is_primary: true,
            access_notes: None,
            created_at: now,
            updated_at: now,
        };
        self.repo.insert_property(&property).await.expect("insert property");
        property.id
    }

    pub async fn seed_offering(
        &self,
        name: &str,
        category: JobCategory,
        duration_minutes: u32,
        equipment: &[&str],
    ) -> ServiceOfferingId {
        let now = Utc::now();
        let offering = ServiceOffering {
            id: ServiceOfferingId::new(),
            name: name.to_string(),
            category,
            description: None,
            pricing_model: PricingModel::Flat,
            base_price: Cents::new(15_000),
            price_per_zone: Cents::zero(),
            base_duration_minutes: duration_minutes,
            duration_per_zone_minutes: 0,
            staffing_required: 1,
            equipment_required: equipment.iter().map(|s| s.to_string()).collect(),
            buffer_minutes: 10,
            lien_eligible: true,
            requires_prepay: false,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        self.repo.insert_offering(&offering).await.expect("insert offering");
        offering.id
    }

    pub async fn seed_tech(
        &self,
        name: &str,
        lat: f64,
        lng: f64,
        equipment: &[&str],
        date: NaiveDate,
    ) -> StaffId {
        let now = Utc::now();
        let staff = Staff {
            id: StaffId::new(),
            name: name.to_string(),
            role: StaffRole::Tech,
            skill_level: 2,
            certifications: vec![],
            assigned_equipment: equipment.iter().map(|s| s.to_string()).collect(),
            start_location: Some(GeoPoint {
                latitude: lat,
                longitude: lng,
            }),
            email: None,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        self.repo.insert_staff(&staff).await.expect("insert staff");
        self.repo
            .upsert_availability(&StaffAvailability::standard_day(staff.id, date))
            .await
            .expect("insert availability");
        staff.id
    }

    /// Seed a tech with a custom working window and no lunch.
    pub async fn seed_tech_with_window(
        &self,
        name: &str,
        equipment: &[&str],
        date: NaiveDate,
        window_start: NaiveTime,
        window_end: NaiveTime,
    ) -> StaffId {
        let staff_id = self.seed_tech(name, 44.98, -93.26, equipment, date).await;
        self.repo
            .upsert_availability(&StaffAvailability {
                staff_id,
                date,
                window_start,
                window_end,
                lunch_start: None,
                lunch_duration_minutes: 0,
                is_available: true,
            })
            .await
            .expect("custom availability");
        staff_id
    }

    /// Seed an approved single-tech job ready for scheduling.
    pub async fn seed_approved_job(
        &self,
        city: &str,
        lat: f64,
        lng: f64,
        duration_minutes: u32,
        equipment: &[&str],
        priority: u8,
    ) -> JobId {
        let customer_id = self.seed_customer("Test").await;
        let property_id = self.seed_property(customer_id, city, lat, lng).await;
        let offering_id = self
            .seed_offering("Winterization", JobCategory::Seasonal, duration_minutes, equipment)
            .await;

        let now = Utc::now();
        let job = Job {
            id: JobId::new(),
            customer_id,
            property_id,
            service_offering_id: offering_id,
            category: JobCategory::Seasonal,
            status: JobStatus::Requested,
            priority: JobPriority::new(priority),
            estimated_duration_minutes: duration_minutes,
            equipment_required: equipment.iter().map(|s| s.to_string()).collect(),
            staff_required: 1,
            buffer_minutes: 10,
            preferred_time_start: Some(hm(9, 0)),
            preferred_time_end: Some(hm(16, 0)),
            price_snapshot: Some(Cents::new(15_000)),
            notes: None,
            created_at: now,
            updated_at: now,
        };
        self.repo.insert_job(&job).await.expect("insert job");
        self.jobs().approve(job.id, None).await.expect("approve job");
        job.id
    }
}
