//! Postgres repository implementation using Diesel.
//!
//! ## Features
//!
//! - Connection pooling with r2d2
//! - Automatic retry for transient failures
//! - Connection health monitoring
//! - Automatic migration execution
//! - Per-date advisory locks around schedule mutations
//!
//! ## Configuration
//!
//! Environment variables:
//! - `DATABASE_URL` or `PG_DATABASE_URL`: Connection string (required)
//! - `PG_POOL_MAX`: Maximum pool size (default: 10)
//! - `PG_POOL_MIN`: Minimum pool size (default: 1)
//! - `PG_CONN_TIMEOUT_SEC`: Connection timeout in seconds (default: 30)
//! - `PG_IDLE_TIMEOUT_SEC`: Idle connection timeout in seconds (default: 600)
//! - `PG_MAX_RETRIES`: Maximum retry attempts for transient failures (default: 3)
//! - `PG_RETRY_DELAY_MS`: Initial retry delay in milliseconds (default: 100)

use async_trait::async_trait;
use chrono::{Datelike, NaiveDate, Utc};
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool};
use diesel::sql_query;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tokio::task;

use crate::api::{
    AppointmentId, Cents, CustomerId, InvoiceId, JobId, LeadId, PropertyId, ServiceOfferingId,
    StaffId,
};
use crate::db::checksum::snapshot_checksum;
use crate::db::repository::{
    CatalogRepository, CustomerRepository, ErrorContext, FullRepository, InvoiceRepository,
    JobRepository, JobTransition, MessageRepository, RepositoryError, RepositoryResult,
    ScheduleMutation, ScheduleRepository, StaffRepository,
};
use crate::db::validation::{validate_day_state, DayState};
use crate::models::{
    Appointment, AppointmentStatus, Customer, Invoice, InvoiceStatus, Job, JobStatus,
    JobStatusHistory, Lead, PaymentMethod, Property, ScheduleClearAudit, ScheduleReassignment,
    ScheduleSnapshot, SentMessage, ServiceOffering, Staff, StaffAvailability, WaitlistEntry,
};

mod models;
mod schema;

use models::*;
use schema::*;

type PgPool = Pool<ConnectionManager<PgConnection>>;

const MIGRATIONS: EmbeddedMigrations = embed_migrations!("src/db/repositories/postgres/migrations");

/// Configuration for connecting to Postgres.
#[derive(Debug, Clone)]
pub struct PostgresConfig {
    /// Database connection URL
    pub database_url: String,
    /// Maximum number of connections in the pool
    pub max_pool_size: u32,
    /// Minimum number of connections in the pool
    pub min_pool_size: u32,
    /// Connection timeout in seconds
    pub connection_timeout_sec: u64,
    /// Idle connection timeout in seconds
    pub idle_timeout_sec: u64,
    /// Maximum number of retry attempts for transient failures
    pub max_retries: u32,
    /// Initial retry delay in milliseconds (doubles with each retry)
    pub retry_delay_ms: u64,
}

impl Default for PostgresConfig {
    fn default() -> Self {
        Self {
            database_url: String::new(),
            max_pool_size: 10,
            min_pool_size: 1,
            connection_timeout_sec: 30,
            idle_timeout_sec: 600,
            max_retries: 3,
            retry_delay_ms: 100,
        }
    }
}

impl PostgresConfig {
    /// Create configuration from environment variables.
    pub fn from_env() -> Result<Self, String> {
        let database_url = std::env::var("DATABASE_URL")
            .or_else(|_| std::env::var("PG_DATABASE_URL"))
            .map_err(|_| "DATABASE_URL or PG_DATABASE_URL must be set".to_string())?;

        let parse = |key: &str, default: u64| {
            std::env::var(key)
                .ok()
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(default)
        };

        Ok(Self {
            database_url,
            max_pool_size: parse("PG_POOL_MAX", 10) as u32,
            min_pool_size: parse("PG_POOL_MIN", 1) as u32,
            connection_timeout_sec: parse("PG_CONN_TIMEOUT_SEC", 30),
            idle_timeout_sec: parse("PG_IDLE_TIMEOUT_SEC", 600),
            max_retries: parse("PG_MAX_RETRIES", 3) as u32,
            retry_delay_ms: parse("PG_RETRY_DELAY_MS", 100),
        })
    }

    /// Create a new configuration with a database URL.
    pub fn with_url(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            ..Default::default()
        }
    }
}

/// Pool health statistics.
#[derive(Debug, Clone, Default)]
pub struct PoolStats {
    /// Number of connections currently in use
    pub connections_in_use: u32,
    /// Number of idle connections
    pub idle_connections: u32,
    /// Total number of connections in the pool
    pub total_connections: u32,
    /// Maximum pool size
    pub max_size: u32,
    /// Total successful queries executed
    pub total_queries: u64,
    /// Total failed queries
    pub failed_queries: u64,
    /// Total retried operations
    pub retried_operations: u64,
}

/// Diesel-backed repository for Postgres.
#[derive(Clone)]
pub struct PostgresRepository {
    pool: PgPool,
    config: PostgresConfig,
    total_queries: std::sync::Arc<AtomicU64>,
    failed_queries: std::sync::Arc<AtomicU64>,
    retried_operations: std::sync::Arc<AtomicU64>,
}

impl PostgresRepository {
    /// Create a new repository and run pending migrations.
    pub fn new(config: PostgresConfig) -> RepositoryResult<Self> {
        let manager = ConnectionManager::<PgConnection>::new(&config.database_url);

        let pool = Pool::builder()
            .max_size(config.max_pool_size)
            .min_idle(Some(config.min_pool_size))
            .connection_timeout(Duration::from_secs(config.connection_timeout_sec))
            .idle_timeout(Some(Duration::from_secs(config.idle_timeout_sec)))
            .test_on_check_out(true)
            .build(manager)
            .map_err(|e| {
                RepositoryError::connection_with_context(
                    e.to_string(),
                    ErrorContext::new("create_pool")
                        .with_details(format!("max_size={}", config.max_pool_size)),
                )
            })?;

        {
            let mut conn = pool.get().map_err(|e| {
                RepositoryError::connection_with_context(
                    e.to_string(),
                    ErrorContext::new("get_connection_for_migrations"),
                )
            })?;
            Self::run_migrations(&mut conn)?;
        }

        Ok(Self {
            pool,
            config,
            total_queries: std::sync::Arc::new(AtomicU64::new(0)),
            failed_queries: std::sync::Arc::new(AtomicU64::new(0)),
            retried_operations: std::sync::Arc::new(AtomicU64::new(0)),
        })
    }

    fn run_migrations(conn: &mut PgConnection) -> RepositoryResult<()> {
        conn.run_pending_migrations(MIGRATIONS).map_err(|e| {
            RepositoryError::internal_with_context(
                format!("Migration failed: {}", e),
                ErrorContext::new("run_migrations"),
            )
        })?;
        Ok(())
    }

    /// Execute a database operation with automatic retry for transient
    /// failures: connection errors, timeouts, serialization failures.
    async fn with_conn<T, F>(&self, f: F) -> RepositoryResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut PgConnection) -> RepositoryResult<T> + Send + 'static + Clone,
    {
        let pool = self.pool.clone();
        let max_retries = self.config.max_retries;
        let retry_delay_ms = self.config.retry_delay_ms;
        let total_queries = self.total_queries.clone();
        let failed_queries = self.failed_queries.clone();
        let retried_operations = self.retried_operations.clone();

        task::spawn_blocking(move || {
            let mut last_error = None;
            let mut retry_delay = Duration::from_millis(retry_delay_ms);

            for attempt in 0..=max_retries {
                if attempt > 0 {
                    retried_operations.fetch_add(1, Ordering::Relaxed);
                    std::thread::sleep(retry_delay);
                    retry_delay *= 2;
                }

                let mut conn = match pool.get() {
                    Ok(c) => c,
                    Err(e) => {
                        let err = RepositoryError::connection_with_context(
                            e.to_string(),
                            ErrorContext::new("get_connection")
                                .with_details(format!("attempt={}", attempt + 1))
                                .retryable(),
                        );
                        if attempt < max_retries {
                            last_error = Some(err);
                            continue;
                        }
                        failed_queries.fetch_add(1, Ordering::Relaxed);
                        return Err(err);
                    }
                };

                total_queries.fetch_add(1, Ordering::Relaxed);
                match f.clone()(&mut conn) {
                    Ok(result) => return Ok(result),
                    Err(e) if e.is_retryable() && attempt < max_retries => {
                        last_error = Some(e);
                        continue;
                    }
                    Err(e) => {
                        failed_queries.fetch_add(1, Ordering::Relaxed);
                        return Err(e);
                    }
                }
            }

            failed_queries.fetch_add(1, Ordering::Relaxed);
            Err(last_error.unwrap_or_else(|| {
                RepositoryError::internal("Max retries exceeded with no error captured")
            }))
        })
        .await
        .map_err(|e| {
            RepositoryError::internal_with_context(
                format!("Task join error: {}", e),
                ErrorContext::new("spawn_blocking"),
            )
        })?
    }

    /// Get pool health statistics.
    pub fn get_pool_stats(&self) -> PoolStats {
        let state = self.pool.state();
        PoolStats {
            connections_in_use: state.connections - state.idle_connections,
            idle_connections: state.idle_connections,
            total_connections: state.connections,
            max_size: self.config.max_pool_size,
            total_queries: self.total_queries.load(Ordering::Relaxed),
            failed_queries: self.failed_queries.load(Ordering::Relaxed),
            retried_operations: self.retried_operations.load(Ordering::Relaxed),
        }
    }

    /// Check if the database connection is healthy.
    pub async fn is_healthy(&self) -> bool {
        self.health_check().await.unwrap_or(false)
    }

    /// Get detailed health information: (is_healthy, latency_ms, error).
    pub async fn health_check_detailed(&self) -> (bool, Option<u64>, Option<String>) {
        let start = Instant::now();
        match self.health_check().await {
            Ok(true) => (true, Some(start.elapsed().as_millis() as u64), None),
            Ok(false) => (
                false,
                Some(start.elapsed().as_millis() as u64),
                Some("Health check returned false".to_string()),
            ),
            Err(e) => (
                false,
                Some(start.elapsed().as_millis() as u64),
                Some(e.to_string()),
            ),
        }
    }
}

/// Take the transaction-scoped advisory lock for a date. Released at
/// commit/rollback; serializes writers per date while reads bypass it.
fn lock_date(conn: &mut PgConnection, date: NaiveDate) -> RepositoryResult<()> {
    // Key space: a fixed tag in the high bits plus the day number.
    let key = (0x5C4E_D000i64 << 32) | i64::from(date.num_days_from_ce());
    sql_query(format!("SELECT pg_advisory_xact_lock({})", key))
        .execute(conn)
        .map(|_| ())
        .map_err(RepositoryError::from)
}

/// Apply one job transition with history, enforcing the legal graph.
fn transition_job_tx(
    conn: &mut PgConnection,
    transition: &JobTransition,
) -> RepositoryResult<Option<Job>> {
    let row: JobRow = jobs::table
        .find(transition.job_id.value())
        .first(conn)
        .optional()?
        .ok_or_else(|| RepositoryError::not_found("job not found"))?;
    let job: Job = row.try_into()?;

    if job.status == transition.next_status {
        return Ok(None);
    }
    if !job.status.can_transition_to(transition.next_status) {
        return Err(RepositoryError::state_rejection_with_context(
            format!(
                "illegal job transition {} -> {}",
                job.status, transition.next_status
            ),
            ErrorContext::new("transition_job")
                .with_entity("job")
                .with_entity_id(transition.job_id),
        ));
    }

    diesel::update(jobs::table.find(transition.job_id.value()))
        .set(jobs::status.eq(transition.next_status.as_str()))
        .execute(conn)?;

    let entry = JobStatusHistory::record(
        transition.job_id,
        Some(job.status),
        transition.next_status,
        transition.actor,
        transition.notes.clone(),
    );
    diesel::insert_into(job_status_history::table)
        .values(JobStatusHistoryRow::from(&entry))
        .execute(conn)?;

    let mut updated = job;
    updated.status = transition.next_status;
    Ok(Some(updated))
}

/// Load the staged state of a date and check the schedule invariants.
fn validate_day_tx(conn: &mut PgConnection, date: NaiveDate) -> RepositoryResult<()> {
    let appointment_rows: Vec<AppointmentRow> = appointments::table
        .filter(appointments::date.eq(date))
        .load(conn)?;
    let mut day_appointments = Vec::with_capacity(appointment_rows.len());
    for row in appointment_rows {
        day_appointments.push(Appointment::try_from(row)?);
    }

    let job_ids: Vec<uuid::Uuid> = day_appointments.iter().map(|a| a.job_id.value()).collect();
    let staff_ids: Vec<uuid::Uuid> = day_appointments.iter().map(|a| a.staff_id.value()).collect();

    let job_rows: Vec<JobRow> = jobs::table
        .filter(jobs::id.eq_any(&job_ids))
        .load(conn)?;
    let mut day_jobs = HashMap::new();
    for row in job_rows {
        let job: Job = row.try_into()?;
        day_jobs.insert(job.id, job);
    }

    let staff_rows: Vec<StaffRow> = staff::table
        .filter(staff::id.eq_any(&staff_ids))
        .load(conn)?;
    let mut day_staff = HashMap::new();
    for row in staff_rows {
        let member: Staff = row.try_into()?;
        day_staff.insert(member.id, member);
    }

    let availability_rows: Vec<StaffAvailabilityRow> = staff_availability::table
        .filter(staff_availability::date.eq(date))
        .load(conn)?;
    let availability: HashMap<StaffId, StaffAvailability> = availability_rows
        .into_iter()
        .map(StaffAvailability::from)
        .map(|a| (a.staff_id, a))
        .collect();

    // Global live-appointment counts for the referenced jobs.
    let mut live_counts: HashMap<JobId, usize> = HashMap::new();
    let live_rows: Vec<AppointmentRow> = appointments::table
        .filter(appointments::job_id.eq_any(&job_ids))
        .filter(appointments::status.ne(AppointmentStatus::Cancelled.as_str()))
        .load(conn)?;
    for row in live_rows {
        *live_counts.entry(JobId(row.job_id)).or_default() += 1;
    }

    let state = DayState {
        date,
        appointments: day_appointments,
        jobs: day_jobs,
        staff: day_staff,
        availability,
        live_counts,
    };
    validate_day_state(&state).map_err(|message| {
        RepositoryError::state_rejection_with_context(message, ErrorContext::new("validate_day"))
    })
}

#[async_trait]
impl CustomerRepository for PostgresRepository {
    async fn get_customer(&self, id: CustomerId) -> RepositoryResult<Customer> {
        self.with_conn(move |conn| {
            let row: CustomerRow = customers::table
                .find(id.value())
                .first(conn)
                .optional()?
                .ok_or_else(|| RepositoryError::not_found("customer not found"))?;
            Ok(row.into())
        })
        .await
    }

    async fn insert_customer(&self, customer: &Customer) -> RepositoryResult<()> {
        let row = CustomerRow::from(customer);
        self.with_conn(move |conn| {
            diesel::insert_into(customers::table)
                .values(row.clone())
                .execute(conn)?;
            Ok(())
        })
        .await
    }

    async fn get_property(&self, id: PropertyId) -> RepositoryResult<Property> {
        self.with_conn(move |conn| {
            let row: PropertyRow = properties::table
                .find(id.value())
                .first(conn)
                .optional()?
                .ok_or_else(|| RepositoryError::not_found("property not found"))?;
            row.try_into()
        })
        .await
    }

    async fn insert_property(&self, property: &Property) -> RepositoryResult<()> {
        property.validate().map_err(RepositoryError::validation)?;
        let row = PropertyRow::from(property);
        self.with_conn(move |conn| {
            conn.transaction(|conn| {
                if row.is_primary {
                    diesel::update(
                        properties::table.filter(properties::customer_id.eq(row.customer_id)),
                    )
                    .set(properties::is_primary.eq(false))
                    .execute(conn)?;
                }
                diesel::insert_into(properties::table)
                    .values(row.clone())
                    .execute(conn)?;
                Ok(())
            })
        })
        .await
    }

    async fn list_customer_properties(&self, id: CustomerId) -> RepositoryResult<Vec<Property>> {
        self.with_conn(move |conn| {
            let rows: Vec<PropertyRow> = properties::table
                .filter(properties::customer_id.eq(id.value()))
                .load(conn)?;
            rows.into_iter().map(Property::try_from).collect()
        })
        .await
    }

    async fn set_primary_property(
        &self,
        customer_id: CustomerId,
        property_id: PropertyId,
    ) -> RepositoryResult<()> {
        self.with_conn(move |conn| {
            conn.transaction(|conn| {
                let row: PropertyRow = properties::table
                    .find(property_id.value())
                    .first(conn)
                    .optional()?
                    .ok_or_else(|| RepositoryError::not_found("property not found"))?;
                if row.customer_id != customer_id.value() {
                    return Err(RepositoryError::state_rejection(
                        "property belongs to a different customer",
                    ));
                }
                diesel::update(
                    properties::table.filter(properties::customer_id.eq(customer_id.value())),
                )
                .set(properties::is_primary.eq(false))
                .execute(conn)?;
                diesel::update(properties::table.find(property_id.value()))
                    .set(properties::is_primary.eq(true))
                    .execute(conn)?;
                Ok(())
            })
        })
        .await
    }

    async fn get_lead(&self, id: LeadId) -> RepositoryResult<Lead> {
        self.with_conn(move |conn| {
            let row: LeadRow = leads::table
                .find(id.value())
                .first(conn)
                .optional()?
                .ok_or_else(|| RepositoryError::not_found("lead not found"))?;
            row.try_into()
        })
        .await
    }

    async fn insert_lead(&self, lead: &Lead) -> RepositoryResult<()> {
        let row = LeadRow::from(lead);
        self.with_conn(move |conn| {
            diesel::insert_into(leads::table)
                .values(row.clone())
                .execute(conn)?;
            Ok(())
        })
        .await
    }

    async fn convert_lead(&self, id: LeadId, customer: &Customer) -> RepositoryResult<Customer> {
        let customer = customer.clone();
        self.with_conn(move |conn| {
            conn.transaction(|conn| {
                let row: LeadRow = leads::table
                    .find(id.value())
                    .first(conn)
                    .optional()?
                    .ok_or_else(|| RepositoryError::not_found("lead not found"))?;
                if row.converted_customer_id.is_some() {
                    return Err(RepositoryError::state_rejection_with_context(
                        "lead already converted",
                        ErrorContext::new("convert_lead")
                            .with_entity("lead")
                            .with_entity_id(id),
                    ));
                }
                diesel::insert_into(customers::table)
                    .values(CustomerRow::from(&customer))
                    .execute(conn)?;
                diesel::update(leads::table.find(id.value()))
                    .set(leads::converted_customer_id.eq(Some(customer.id.value())))
                    .execute(conn)?;
                Ok(customer.clone())
            })
        })
        .await
    }
}

#[async_trait]
impl CatalogRepository for PostgresRepository {
    async fn get_offering(&self, id: ServiceOfferingId) -> RepositoryResult<ServiceOffering> {
        self.with_conn(move |conn| {
            let row: ServiceOfferingRow = service_offerings::table
                .find(id.value())
                .first(conn)
                .optional()?
                .ok_or_else(|| RepositoryError::not_found("service offering not found"))?;
            row.try_into()
        })
        .await
    }

    async fn insert_offering(&self, offering: &ServiceOffering) -> RepositoryResult<()> {
        let row = ServiceOfferingRow::from(offering);
        self.with_conn(move |conn| {
            diesel::insert_into(service_offerings::table)
                .values(row.clone())
                .execute(conn)?;
            Ok(())
        })
        .await
    }

    async fn list_active_offerings(&self) -> RepositoryResult<Vec<ServiceOffering>> {
        self.with_conn(move |conn| {
            let rows: Vec<ServiceOfferingRow> = service_offerings::table
                .filter(service_offerings::is_active.eq(true))
                .load(conn)?;
            rows.into_iter().map(ServiceOffering::try_from).collect()
        })
        .await
    }
}

#[async_trait]
impl StaffRepository for PostgresRepository {
    async fn get_staff(&self, id: StaffId) -> RepositoryResult<Staff> {
        self.with_conn(move |conn| {
            let row: StaffRow = staff::table
                .find(id.value())
                .first(conn)
                .optional()?
                .ok_or_else(|| RepositoryError::not_found("staff not found"))?;
            row.try_into()
        })
        .await
    }

    async fn insert_staff(&self, member: &Staff) -> RepositoryResult<()> {
        let row = StaffRow::from(member);
        self.with_conn(move |conn| {
            diesel::insert_into(staff::table)
                .values(row.clone())
                .execute(conn)?;
            Ok(())
        })
        .await
    }

    async fn list_active_techs(&self) -> RepositoryResult<Vec<Staff>> {
        self.with_conn(move |conn| {
            let rows: Vec<StaffRow> = staff::table
                .filter(staff::is_active.eq(true))
                .filter(staff::role.eq("tech"))
                .order(staff::name.asc())
                .load(conn)?;
            rows.into_iter().map(Staff::try_from).collect()
        })
        .await
    }

    async fn get_availability(
        &self,
        staff_id: StaffId,
        date: NaiveDate,
    ) -> RepositoryResult<Option<StaffAvailability>> {
        self.with_conn(move |conn| {
            let row: Option<StaffAvailabilityRow> = staff_availability::table
                .find((staff_id.value(), date))
                .first(conn)
                .optional()?;
            Ok(row.map(StaffAvailability::from))
        })
        .await
    }

    async fn upsert_availability(&self, availability: &StaffAvailability) -> RepositoryResult<()> {
        availability.validate().map_err(RepositoryError::validation)?;
        let row = StaffAvailabilityRow::from(availability);
        self.with_conn(move |conn| {
            diesel::insert_into(staff_availability::table)
                .values(row.clone())
                .on_conflict((staff_availability::staff_id, staff_availability::date))
                .do_update()
                .set(row.clone())
                .execute(conn)?;
            Ok(())
        })
        .await
    }

    async fn list_available_staff(
        &self,
        date: NaiveDate,
    ) -> RepositoryResult<Vec<(Staff, StaffAvailability)>> {
        self.with_conn(move |conn| {
            let rows: Vec<(StaffRow, StaffAvailabilityRow)> = staff::table
                .inner_join(staff_availability::table)
                .filter(staff_availability::date.eq(date))
                .filter(staff_availability::is_available.eq(true))
                .filter(staff::is_active.eq(true))
                .filter(staff::role.eq("tech"))
                .order(staff::name.asc())
                .load(conn)?;
            rows.into_iter()
                .map(|(s, a)| Ok((Staff::try_from(s)?, StaffAvailability::from(a))))
                .collect()
        })
        .await
    }
}

#[async_trait]
impl JobRepository for PostgresRepository {
    async fn get_job(&self, id: JobId) -> RepositoryResult<Job> {
        self.with_conn(move |conn| {
            let row: JobRow = jobs::table
                .find(id.value())
                .first(conn)
                .optional()?
                .ok_or_else(|| RepositoryError::not_found("job not found"))?;
            row.try_into()
        })
        .await
    }

    async fn insert_job(&self, job: &Job) -> RepositoryResult<()> {
        let row = JobRow::from(job);
        let history = JobStatusHistoryRow::from(&JobStatusHistory::record(
            job.id,
            None,
            job.status,
            None,
            None,
        ));
        self.with_conn(move |conn| {
            conn.transaction(|conn| {
                diesel::insert_into(jobs::table)
                    .values(row.clone())
                    .execute(conn)?;
                diesel::insert_into(job_status_history::table)
                    .values(history.clone())
                    .execute(conn)?;
                Ok(())
            })
        })
        .await
    }

    async fn list_jobs_by_status(&self, status: JobStatus) -> RepositoryResult<Vec<Job>> {
        self.with_conn(move |conn| {
            let rows: Vec<JobRow> = jobs::table
                .filter(jobs::status.eq(status.as_str()))
                .order(jobs::created_at.asc())
                .load(conn)?;
            rows.into_iter().map(Job::try_from).collect()
        })
        .await
    }

    async fn transition_job(&self, transition: &JobTransition) -> RepositoryResult<Job> {
        let transition = transition.clone();
        self.with_conn(move |conn| {
            conn.transaction(|conn| match transition_job_tx(conn, &transition)? {
                Some(job) => Ok(job),
                None => {
                    let row: JobRow = jobs::table.find(transition.job_id.value()).first(conn)?;
                    row.try_into()
                }
            })
        })
        .await
    }

    async fn set_job_priority(
        &self,
        id: JobId,
        priority: crate::models::JobPriority,
    ) -> RepositoryResult<()> {
        self.with_conn(move |conn| {
            let updated = diesel::update(jobs::table.find(id.value()))
                .set(jobs::priority.eq(i16::from(priority.value())))
                .execute(conn)?;
            if updated == 0 {
                return Err(RepositoryError::not_found("job not found"));
            }
            Ok(())
        })
        .await
    }

    async fn fetch_status_history(&self, id: JobId) -> RepositoryResult<Vec<JobStatusHistory>> {
        self.with_conn(move |conn| {
            let rows: Vec<JobStatusHistoryRow> = job_status_history::table
                .filter(job_status_history::job_id.eq(id.value()))
                .order(job_status_history::changed_at.asc())
                .load(conn)?;
            rows.into_iter().map(JobStatusHistory::try_from).collect()
        })
        .await
    }
}

#[async_trait]
impl ScheduleRepository for PostgresRepository {
    async fn get_appointment(&self, id: AppointmentId) -> RepositoryResult<Appointment> {
        self.with_conn(move |conn| {
            let row: AppointmentRow = appointments::table
                .find(id.value())
                .first(conn)
                .optional()?
                .ok_or_else(|| RepositoryError::not_found("appointment not found"))?;
            row.try_into()
        })
        .await
    }

    async fn list_appointments_for_date(
        &self,
        date: NaiveDate,
    ) -> RepositoryResult<Vec<Appointment>> {
        self.with_conn(move |conn| {
            let rows: Vec<AppointmentRow> = appointments::table
                .filter(appointments::date.eq(date))
                .order((appointments::staff_id.asc(), appointments::route_order.asc()))
                .load(conn)?;
            rows.into_iter().map(Appointment::try_from).collect()
        })
        .await
    }

    async fn list_staff_appointments(
        &self,
        staff_id: StaffId,
        date: NaiveDate,
    ) -> RepositoryResult<Vec<Appointment>> {
        self.with_conn(move |conn| {
            let rows: Vec<AppointmentRow> = appointments::table
                .filter(appointments::staff_id.eq(staff_id.value()))
                .filter(appointments::date.eq(date))
                .order(appointments::route_order.asc())
                .load(conn)?;
            rows.into_iter().map(Appointment::try_from).collect()
        })
        .await
    }

    async fn list_waitlist_for_date(
        &self,
        date: NaiveDate,
    ) -> RepositoryResult<Vec<WaitlistEntry>> {
        self.with_conn(move |conn| {
            let rows: Vec<WaitlistRow> = schedule_waitlist::table
                .filter(schedule_waitlist::preferred_date.eq(date))
                .order((
                    schedule_waitlist::priority.desc(),
                    schedule_waitlist::created_at.asc(),
                ))
                .load(conn)?;
            Ok(rows.into_iter().map(WaitlistEntry::from).collect())
        })
        .await
    }

    async fn apply_schedule_mutation(
        &self,
        date: NaiveDate,
        mutation: ScheduleMutation,
    ) -> RepositoryResult<()> {
        if mutation.is_empty() {
            return Ok(());
        }
        self.with_conn(move |conn| {
            conn.transaction(|conn| {
                lock_date(conn, date)?;

                if let Some(staff_id) = mutation.mark_staff_unavailable {
                    let default_row = StaffAvailabilityRow::from(&{
                        let mut row = StaffAvailability::standard_day(staff_id, date);
                        row.is_available = false;
                        row
                    });
                    diesel::insert_into(staff_availability::table)
                        .values(default_row)
                        .on_conflict((staff_availability::staff_id, staff_availability::date))
                        .do_update()
                        .set(staff_availability::is_available.eq(false))
                        .execute(conn)?;
                }

                for (appointment_id, reason) in &mutation.cancel_appointments {
                    let row: AppointmentRow = appointments::table
                        .find(appointment_id.value())
                        .first(conn)
                        .optional()?
                        .ok_or_else(|| RepositoryError::not_found("appointment not found"))?;
                    let appt: Appointment = row.try_into()?;
                    if !appt.status.is_cancellable() {
                        return Err(RepositoryError::state_rejection_with_context(
                            format!("appointment in status {} cannot be cancelled", appt.status),
                            ErrorContext::new("cancel_appointment")
                                .with_entity("appointment")
                                .with_entity_id(*appointment_id),
                        ));
                    }
                    diesel::update(appointments::table.find(appointment_id.value()))
                        .set((
                            appointments::status.eq(AppointmentStatus::Cancelled.as_str()),
                            appointments::cancelled_at.eq(Some(Utc::now())),
                            appointments::cancellation_reason.eq(Some(reason.clone())),
                        ))
                        .execute(conn)?;
                }

                for appointment_id in &mutation.delete_appointments {
                    let deleted = diesel::delete(appointments::table.find(appointment_id.value()))
                        .execute(conn)?;
                    if deleted == 0 {
                        return Err(RepositoryError::not_found("appointment not found"));
                    }
                }

                for appt in &mutation.insert_appointments {
                    if appt.date != date {
                        return Err(RepositoryError::validation(format!(
                            "appointment date {} does not match mutation date {}",
                            appt.date, date
                        )));
                    }
                    diesel::insert_into(appointments::table)
                        .values(AppointmentRow::from(appt))
                        .execute(conn)?;
                }

                for transition in &mutation.job_transitions {
                    let _ = transition_job_tx(conn, transition)?;
                }

                for entry in &mutation.add_waitlist {
                    diesel::insert_into(schedule_waitlist::table)
                        .values(WaitlistRow::from(entry))
                        .execute(conn)?;
                }
                for entry_id in &mutation.remove_waitlist {
                    diesel::delete(schedule_waitlist::table.find(entry_id.value()))
                        .execute(conn)?;
                }

                if let Some(record) = &mutation.record_reassignment {
                    diesel::insert_into(schedule_reassignments::table)
                        .values(ReassignmentRow::from(record))
                        .execute(conn)?;
                }

                validate_day_tx(conn, date)
            })
        })
        .await
    }

    async fn clear_day(
        &self,
        date: NaiveDate,
        cleared_by: Option<StaffId>,
        notes: Option<String>,
    ) -> RepositoryResult<ScheduleClearAudit> {
        self.with_conn(move |conn| {
            conn.transaction(|conn| {
                lock_date(conn, date)?;

                let rows: Vec<AppointmentRow> = appointments::table
                    .filter(appointments::date.eq(date))
                    .load(conn)?;
                let mut day = Vec::with_capacity(rows.len());
                for row in rows {
                    day.push(Appointment::try_from(row)?);
                }

                let snapshot = ScheduleSnapshot::capture(date, &day);
                let blob = snapshot.to_json();
                let checksum = snapshot_checksum(&blob);

                let mut jobs_reset = Vec::new();
                for appt in &day {
                    let job_row: Option<JobRow> =
                        jobs::table.find(appt.job_id.value()).first(conn).optional()?;
                    if let Some(job_row) = job_row {
                        let job: Job = job_row.try_into()?;
                        if job.status == JobStatus::Scheduled && !jobs_reset.contains(&job.id) {
                            let _ = transition_job_tx(
                                conn,
                                &JobTransition {
                                    job_id: job.id,
                                    next_status: JobStatus::Approved,
                                    actor: cleared_by,
                                    notes: Some("schedule cleared".to_string()),
                                },
                            )?;
                            jobs_reset.push(job.id);
                        }
                    }
                    diesel::delete(appointments::table.find(appt.id.value())).execute(conn)?;
                }

                let audit = ScheduleClearAudit {
                    id: crate::api::ClearAuditId::new(),
                    schedule_date: date,
                    appointments_data: blob,
                    snapshot_checksum: checksum,
                    jobs_reset,
                    appointment_count: day.len() as i32,
                    cleared_by,
                    cleared_at: Utc::now(),
                    notes: notes.clone(),
                };
                diesel::insert_into(schedule_clear_audit::table)
                    .values(ClearAuditRow::from(&audit))
                    .execute(conn)?;

                validate_day_tx(conn, date)?;
                Ok(audit)
            })
        })
        .await
    }

    async fn get_clear_audit(
        &self,
        id: crate::api::ClearAuditId,
    ) -> RepositoryResult<ScheduleClearAudit> {
        self.with_conn(move |conn| {
            let row: ClearAuditRow = schedule_clear_audit::table
                .find(id.value())
                .first(conn)
                .optional()?
                .ok_or_else(|| RepositoryError::not_found("clear audit not found"))?;
            Ok(row.into())
        })
        .await
    }

    async fn list_recent_clears(
        &self,
        limit: usize,
    ) -> RepositoryResult<Vec<ScheduleClearAudit>> {
        self.with_conn(move |conn| {
            let rows: Vec<ClearAuditRow> = schedule_clear_audit::table
                .order(schedule_clear_audit::cleared_at.desc())
                .limit(limit as i64)
                .load(conn)?;
            Ok(rows.into_iter().map(ScheduleClearAudit::from).collect())
        })
        .await
    }

    async fn list_reassignments(
        &self,
        date: NaiveDate,
    ) -> RepositoryResult<Vec<ScheduleReassignment>> {
        self.with_conn(move |conn| {
            let rows: Vec<ReassignmentRow> = schedule_reassignments::table
                .filter(schedule_reassignments::reassignment_date.eq(date))
                .order(schedule_reassignments::created_at.asc())
                .load(conn)?;
            Ok(rows.into_iter().map(ScheduleReassignment::from).collect())
        })
        .await
    }
}

#[async_trait]
impl InvoiceRepository for PostgresRepository {
    async fn get_invoice(&self, id: InvoiceId) -> RepositoryResult<Invoice> {
        self.with_conn(move |conn| {
            let row: InvoiceRow = invoices::table
                .find(id.value())
                .first(conn)
                .optional()?
                .ok_or_else(|| RepositoryError::not_found("invoice not found"))?;
            row.try_into()
        })
        .await
    }

    async fn insert_invoice(&self, invoice: &Invoice) -> RepositoryResult<()> {
        invoice
            .check_invariants()
            .map_err(RepositoryError::validation)?;
        let row = InvoiceRow::from(invoice);
        self.with_conn(move |conn| {
            diesel::insert_into(invoices::table)
                .values(row.clone())
                .execute(conn)?;
            Ok(())
        })
        .await
    }

    async fn update_invoice(&self, invoice: &Invoice) -> RepositoryResult<()> {
        invoice
            .check_invariants()
            .map_err(RepositoryError::validation)?;
        let row = InvoiceRow::from(invoice);
        self.with_conn(move |conn| {
            let updated = diesel::update(invoices::table.find(row.id))
                .set(row.clone())
                .execute(conn)?;
            if updated == 0 {
                return Err(RepositoryError::not_found("invoice not found"));
            }
            Ok(())
        })
        .await
    }

    async fn record_payment(
        &self,
        id: InvoiceId,
        amount: Cents,
        method: PaymentMethod,
    ) -> RepositoryResult<Invoice> {
        if amount.value() <= 0 {
            return Err(RepositoryError::validation("payment amount must be positive"));
        }
        self.with_conn(move |conn| {
            conn.transaction(|conn| {
                let row: InvoiceRow = invoices::table
                    .find(id.value())
                    .for_update()
                    .first(conn)
                    .optional()?
                    .ok_or_else(|| RepositoryError::not_found("invoice not found"))?;
                let mut invoice: Invoice = row.try_into()?;

                if !invoice.status.is_open() {
                    return Err(RepositoryError::state_rejection(format!(
                        "invoice in status {} accepts no payments",
                        invoice.status
                    )));
                }
                let new_paid = invoice.paid_amount + amount;
                if new_paid > invoice.total() {
                    return Err(RepositoryError::validation(format!(
                        "payment would exceed total: {} > {}",
                        new_paid,
                        invoice.total()
                    )));
                }

                invoice.paid_amount = new_paid;
                invoice.payment_method = Some(method);
                if invoice.is_fully_paid() {
                    invoice.status = InvoiceStatus::Paid;
                    invoice.paid_at = Some(Utc::now());
                } else {
                    invoice.status = InvoiceStatus::PartiallyPaid;
                }

                diesel::update(invoices::table.find(id.value()))
                    .set(InvoiceRow::from(&invoice))
                    .execute(conn)?;
                Ok(invoice)
            })
        })
        .await
    }

    async fn list_lien_warning_due(&self, today: NaiveDate) -> RepositoryResult<Vec<Invoice>> {
        self.with_conn(move |conn| {
            let cutoff = today - chrono::Duration::days(crate::models::invoice::LIEN_WARNING_DAYS);
            let rows: Vec<InvoiceRow> = invoices::table
                .filter(invoices::lien_eligible.eq(true))
                .filter(invoices::lien_warning_sent.is_null())
                .filter(invoices::invoice_date.le(cutoff))
                .filter(invoices::status.ne_all(vec![
                    InvoiceStatus::Paid.as_str(),
                    InvoiceStatus::Void.as_str(),
                ]))
                .load(conn)?;
            rows.into_iter().map(Invoice::try_from).collect()
        })
        .await
    }

    async fn last_invoice_sequence(&self, year: i32) -> RepositoryResult<u32> {
        self.with_conn(move |conn| {
            let prefix = format!("INV-{}-", year);
            let numbers: Vec<String> = invoices::table
                .select(invoices::invoice_number)
                .filter(invoices::invoice_number.like(format!("{}%", prefix)))
                .load(conn)?;
            Ok(numbers
                .iter()
                .filter_map(|n| n.strip_prefix(&prefix))
                .filter_map(|seq| seq.parse::<u32>().ok())
                .max()
                .unwrap_or(0))
        })
        .await
    }
}

#[async_trait]
impl MessageRepository for PostgresRepository {
    async fn insert_sent_message(&self, message: &SentMessage) -> RepositoryResult<()> {
        let message = message.clone();
        self.with_conn(move |conn| {
            diesel::insert_into(sent_messages::table)
                .values((
                    sent_messages::id.eq(message.id.value()),
                    sent_messages::recipient_phone.eq(message.recipient_phone.clone()),
                    sent_messages::body.eq(message.body.clone()),
                    sent_messages::related_job_id.eq(message.related_job_id.map(|j| j.value())),
                    sent_messages::sent_at.eq(message.sent_at),
                ))
                .execute(conn)?;
            Ok(())
        })
        .await
    }
}

#[async_trait]
impl FullRepository for PostgresRepository {
    async fn health_check(&self) -> RepositoryResult<bool> {
        self.with_conn(|conn| {
            sql_query("SELECT 1")
                .execute(conn)
                .map(|_| true)
                .map_err(RepositoryError::from)
        })
        .await
    }
}
