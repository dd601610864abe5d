use crate::entities::job_execution;
use crate::errors::LincError;
use crate::settings::Settings;
use crate::storage::{self, Tenants};
use chrono::Utc;
use sea_orm::{ActiveModelTrait, ConnectionTrait, DatabaseConnection, EntityTrait, Set};
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{error, info};

/// Maintenance work run against every tenant database.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaintenanceJob {
    CleanupExpiredTokens,
    PurgeAuditLogs { retention_days: i64 },
}

impl MaintenanceJob {
    pub fn name(&self) -> &'static str {
        match self {
            MaintenanceJob::CleanupExpiredTokens => "cleanup_expired_tokens",
            MaintenanceJob::PurgeAuditLogs { .. } => "purge_audit_logs",
        }
    }

    fn schedule(&self) -> &'static str {
        match self {
            // hourly
            MaintenanceJob::CleanupExpiredTokens => "0 0 * * * *",
            // daily at 03:00
            MaintenanceJob::PurgeAuditLogs { .. } => "0 0 3 * * *",
        }
    }

    /// Jobs enabled by `settings`. The audit purge only runs when a
    /// retention period is configured.
    pub fn enabled(settings: &Settings) -> Vec<MaintenanceJob> {
        let mut jobs = vec![MaintenanceJob::CleanupExpiredTokens];
        if let Some(retention_days) = settings.audit.retention_days {
            jobs.push(MaintenanceJob::PurgeAuditLogs { retention_days });
        }
        jobs
    }

    async fn execute(&self, db: &impl ConnectionTrait) -> Result<u64, LincError> {
        match *self {
            MaintenanceJob::CleanupExpiredTokens => storage::tokens::cleanup_expired(db).await,
            MaintenanceJob::PurgeAuditLogs { retention_days } => {
                storage::audit::purge_older_than(db, retention_days).await
            }
        }
    }
}

/// Initialize and start the job scheduler with all background tasks
pub async fn init_scheduler(
    tenants: Tenants,
    settings: &Settings,
) -> Result<JobScheduler, LincError> {
    let sched = JobScheduler::new()
        .await
        .map_err(|e| LincError::Other(format!("Failed to create job scheduler: {}", e)))?;

    let jobs = MaintenanceJob::enabled(settings);
    for job in &jobs {
        let job = *job;
        let tenants = tenants.clone();
        let scheduled = Job::new_async(job.schedule(), move |_uuid, _l| {
            let tenants = tenants.clone();
            Box::pin(async move {
                for (country, db) in tenants.iter() {
                    info!(job = job.name(), %country, "running scheduled job");
                    if let Err(e) = run_recorded(db, job).await {
                        error!(job = job.name(), %country, error = %e, "scheduled job failed");
                    }
                }
            })
        })
        .map_err(|e| LincError::Other(format!("Failed to create {} job: {}", job.name(), e)))?;

        sched
            .add(scheduled)
            .await
            .map_err(|e| LincError::Other(format!("Failed to add {} job: {}", job.name(), e)))?;
    }

    sched
        .start()
        .await
        .map_err(|e| LincError::Other(format!("Failed to start job scheduler: {}", e)))?;

    info!("Job scheduler started with {} jobs", jobs.len());

    Ok(sched)
}

/// Run `job` once on `db`, recording the run in `job_executions`.
pub async fn run_recorded(db: &DatabaseConnection, job: MaintenanceJob) -> Result<u64, LincError> {
    let execution_id = start_job_execution(db, job.name()).await?;

    match job.execute(db).await {
        Ok(count) => {
            info!(job = job.name(), records = count, "job completed");
            complete_job_execution(db, execution_id, true, None, Some(count as i64)).await?;
            Ok(count)
        }
        Err(e) => {
            complete_job_execution(db, execution_id, false, Some(e.to_string()), None).await?;
            Err(e)
        }
    }
}

/// Record the start of a job execution
pub async fn start_job_execution(
    db: &impl ConnectionTrait,
    job_name: &str,
) -> Result<i64, LincError> {
    let execution = job_execution::ActiveModel {
        job_name: Set(job_name.to_string()),
        started_at: Set(Utc::now().timestamp()),
        completed_at: Set(None),
        success: Set(None),
        error_message: Set(None),
        records_processed: Set(None),
        ..Default::default()
    };

    let result = execution.insert(db).await?;
    Ok(result.id)
}

/// Record the completion of a job execution
pub async fn complete_job_execution(
    db: &impl ConnectionTrait,
    execution_id: i64,
    success: bool,
    error_message: Option<String>,
    records_processed: Option<i64>,
) -> Result<(), LincError> {
    if let Some(execution) = job_execution::Entity::find_by_id(execution_id).one(db).await? {
        let mut active: job_execution::ActiveModel = execution.into();
        active.completed_at = Set(Some(Utc::now().timestamp()));
        active.success = Set(Some(success));
        active.error_message = Set(error_message);
        active.records_processed = Set(records_processed);
        active.update(db).await?;
    }

    Ok(())
}

/// Manually trigger a job by name against one tenant
pub async fn trigger_job_manually(
    db: &DatabaseConnection,
    job_name: &str,
    settings: &Settings,
) -> Result<u64, LincError> {
    info!("Manually triggering job: {}", job_name);
    let job = match job_name {
        "cleanup_expired_tokens" => MaintenanceJob::CleanupExpiredTokens,
        "purge_audit_logs" => MaintenanceJob::PurgeAuditLogs {
            retention_days: settings.audit.retention_days.ok_or_else(|| {
                LincError::BadRequest("audit.retention_days is not configured".to_string())
            })?,
        },
        _ => {
            return Err(LincError::BadRequest(format!("Unknown job name: {}", job_name)));
        }
    };
    run_recorded(db, job).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_audit_purge_only_with_retention() {
        let mut settings = Settings::default();
        assert_eq!(
            MaintenanceJob::enabled(&settings),
            vec![MaintenanceJob::CleanupExpiredTokens]
        );

        settings.audit.retention_days = Some(30);
        let jobs = MaintenanceJob::enabled(&settings);
        assert_eq!(jobs.len(), 2);
        assert_eq!(jobs[1].name(), "purge_audit_logs");
    }

    #[test]
    fn test_schedules_are_six_field_cron() {
        for job in [
            MaintenanceJob::CleanupExpiredTokens,
            MaintenanceJob::PurgeAuditLogs { retention_days: 1 },
        ] {
            assert_eq!(job.schedule().split_whitespace().count(), 6);
        }
    }
}
