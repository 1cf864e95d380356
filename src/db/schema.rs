//! Document shapes for the `job` and `application` tables.
//!
//! Both are open documents: the fields the server reads are typed, everything
//! else a client sends is kept in `fields` and returned untouched.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::types::{ApplicationId, JobId};

/// Keys the server owns on every document; stripped from client bodies.
const SERVER_KEYS: [&str; 2] = ["_id", "id"];

fn into_document<T: serde::de::DeserializeOwned>(
    id: &str,
    mut body: Map<String, Value>,
) -> Result<T, serde_json::Error> {
    for key in SERVER_KEYS {
        body.remove(key);
    }
    body.insert("_id".to_string(), Value::from(id));
    serde_json::from_value(Value::Object(body))
}

/// A job posting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobDocument {
    #[serde(rename = "_id")]
    pub id: JobId,
    /// Email of the recruiter who owns the posting
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hr_email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company_logo: Option<String>,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl JobDocument {
    /// Build a document from a client body, assigning `id`.
    pub fn from_body(id: JobId, body: Map<String, Value>) -> Result<Self, serde_json::Error> {
        into_document(id.as_str(), body)
    }
}

/// A job posting together with how many applications reference it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobWithApplicationCount {
    #[serde(flatten)]
    pub job: JobDocument,
    pub application_count: u64,
}

/// An application to a job posting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplicationDocument {
    #[serde(rename = "_id")]
    pub id: ApplicationId,
    /// `_id` of the job applied to
    #[serde(rename = "jobId", default, skip_serializing_if = "Option::is_none")]
    pub job_id: Option<String>,
    /// Email of the applicant
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub applicant: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl ApplicationDocument {
    /// Build a document from a client body, assigning `id`.
    pub fn from_body(
        id: ApplicationId,
        body: Map<String, Value>,
    ) -> Result<Self, serde_json::Error> {
        into_document(id.as_str(), body)
    }

    /// Copy the job's display fields onto this application.
    pub fn enrich_with(&mut self, job: &JobDocument) {
        let display = [
            ("company", &job.company),
            ("title", &job.title),
            ("company_logo", &job.company_logo),
        ];
        for (name, value) in display {
            if let Some(value) = value {
                self.fields.insert(name.to_string(), Value::from(value.clone()));
            }
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct CountRow {
    pub total: u64,
}

/// The part of a stored application a write needs to report on.
#[derive(Debug, Deserialize)]
pub(crate) struct StatusRow {
    #[serde(default)]
    pub status: Option<String>,
}

/// Mongo-style acknowledgement for inserts, kept for client compatibility.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InsertResult {
    pub acknowledged: bool,
    pub inserted_id: String,
}

/// Mongo-style acknowledgement for deletes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteResult {
    pub acknowledged: bool,
    pub deleted_count: u64,
}

/// Mongo-style acknowledgement for updates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateResult {
    pub acknowledged: bool,
    pub matched_count: u64,
    pub modified_count: u64,
}
