// Job board queries for SurrealDB.
//
// Records are keyed by the same UUID that is stored in their `_id` field, so
// lookups go through `type::thing` and reads omit the SurrealDB record id.

use anyhow::{Context, Result};
use serde_json::{Map, Value};
use tracing::debug;

use crate::db::connection::Db;
use crate::db::schema::*;
use crate::types::{ApplicationId, JobId};

/// Storage for job postings and the applications made to them.
#[derive(Debug, Clone)]
pub struct JobBoardStore {
    db: Db,
}

impl JobBoardStore {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    /// Insert a job from a client body. Any client supplied `_id` is replaced.
    pub async fn create_job(&self, body: Map<String, Value>) -> Result<InsertResult> {
        let id = JobId::generate();
        let job = JobDocument::from_body(id.clone(), body).context("invalid job document")?;
        let content = serde_json::to_value(&job)?;

        self.db
            .query("CREATE type::thing('job', $id) CONTENT $content RETURN NONE")
            .bind(("id", id.to_string()))
            .bind(("content", content))
            .await?
            .check()?;

        debug!(job_id = %id, "Created job");
        Ok(InsertResult {
            acknowledged: true,
            inserted_id: id.into_inner(),
        })
    }

    pub async fn get_job(&self, id: &str) -> Result<Option<JobDocument>> {
        let mut res = self
            .db
            .query("SELECT * OMIT id FROM type::thing('job', $id)")
            .bind(("id", id.to_string()))
            .await?;

        let jobs: Vec<JobDocument> = res.take(0)?;
        Ok(jobs.into_iter().next())
    }

    /// All jobs, or only those posted by `hr_email`.
    pub async fn list_jobs(&self, hr_email: Option<&str>) -> Result<Vec<JobDocument>> {
        let mut res = match hr_email {
            Some(email) => {
                self.db
                    .query("SELECT * OMIT id FROM job WHERE hr_email = $email")
                    .bind(("email", email.to_string()))
                    .await?
            }
            None => self.db.query("SELECT * OMIT id FROM job").await?,
        };

        let jobs: Vec<JobDocument> = res.take(0)?;
        Ok(jobs)
    }

    /// Jobs posted by `hr_email`, each with the number of applications it has.
    pub async fn list_jobs_with_application_counts(
        &self,
        hr_email: &str,
    ) -> Result<Vec<JobWithApplicationCount>> {
        let jobs = self.list_jobs(Some(hr_email)).await?;

        let mut counted = Vec::with_capacity(jobs.len());
        for job in jobs {
            let application_count = self.count_applications(job.id.as_str()).await?;
            counted.push(JobWithApplicationCount {
                job,
                application_count,
            });
        }
        Ok(counted)
    }

    async fn count_applications(&self, job_id: &str) -> Result<u64> {
        let mut res = self
            .db
            .query("SELECT count() AS total FROM application WHERE jobId = $job_id GROUP ALL")
            .bind(("job_id", job_id.to_string()))
            .await?;

        let row: Option<CountRow> = res.take(0)?;
        Ok(row.map(|r| r.total).unwrap_or(0))
    }

    pub async fn list_applications_for_job(&self, job_id: &str) -> Result<Vec<ApplicationDocument>> {
        let mut res = self
            .db
            .query("SELECT * OMIT id FROM application WHERE jobId = $job_id")
            .bind(("job_id", job_id.to_string()))
            .await?;

        let applications: Vec<ApplicationDocument> = res.take(0)?;
        Ok(applications)
    }

    /// Applications made by `applicant`, each carrying the company, title and
    /// logo of the job it targets. Applications whose job is gone are returned
    /// as stored.
    pub async fn list_applications_by_applicant(
        &self,
        applicant: &str,
    ) -> Result<Vec<ApplicationDocument>> {
        let mut res = self
            .db
            .query("SELECT * OMIT id FROM application WHERE applicant = $applicant")
            .bind(("applicant", applicant.to_string()))
            .await?;

        let mut applications: Vec<ApplicationDocument> = res.take(0)?;
        for application in applications.iter_mut() {
            let Some(job_id) = application.job_id.clone() else {
                continue;
            };
            if let Some(job) = self.get_job(&job_id).await? {
                application.enrich_with(&job);
            }
        }
        Ok(applications)
    }

    pub async fn create_application(&self, body: Map<String, Value>) -> Result<InsertResult> {
        let id = ApplicationId::generate();
        let application = ApplicationDocument::from_body(id.clone(), body)
            .context("invalid application document")?;
        let content = serde_json::to_value(&application)?;

        self.db
            .query("CREATE type::thing('application', $id) CONTENT $content RETURN NONE")
            .bind(("id", id.to_string()))
            .bind(("content", content))
            .await?
            .check()?;

        debug!(application_id = %id, job_id = ?application.job_id, "Created application");
        Ok(InsertResult {
            acknowledged: true,
            inserted_id: id.into_inner(),
        })
    }

    /// Delete an application. The count comes from the rows the delete itself
    /// removed, so concurrent deletes of one id report it once.
    pub async fn delete_application(&self, id: &str) -> Result<DeleteResult> {
        let mut res = self
            .db
            .query("DELETE type::thing('application', $id) RETURN BEFORE")
            .bind(("id", id.to_string()))
            .await?;

        let removed: Vec<StatusRow> = res.take(0)?;
        let deleted_count = removed.len() as u64;

        debug!(application_id = %id, deleted_count, "Deleted application");
        Ok(DeleteResult {
            acknowledged: true,
            deleted_count,
        })
    }

    /// Set an application's `status`. Unknown ids match nothing and create
    /// nothing.
    pub async fn update_application_status(&self, id: &str, status: &str) -> Result<UpdateResult> {
        let mut res = self
            .db
            .query("UPDATE type::thing('application', $id) MERGE { status: $status } RETURN BEFORE")
            .bind(("id", id.to_string()))
            .bind(("status", status.to_string()))
            .await?;

        let before: Vec<StatusRow> = res.take(0)?;
        let modified_count = before
            .iter()
            .filter(|row| row.status.as_deref() != Some(status))
            .count() as u64;

        Ok(UpdateResult {
            acknowledged: true,
            matched_count: before.len() as u64,
            modified_count,
        })
    }
}
