// Job Domain Model

use crate::domain::error::{DomainError, Result};
use crate::domain::section::{SectionCursor, SectionId, SectionResult};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Job ID (UUID v4)
pub type JobId = String;

/// Youngest supported test taker
pub const MIN_AGE: u8 = 12;

/// Oldest supported test taker
pub const MAX_AGE: u8 = 18;

/// Generation backend selected for a job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    /// Locally reachable model service
    #[serde(alias = "ollama")]
    Local,
    /// Remote API requiring a credential
    #[serde(alias = "deepseek")]
    Cloud,
}

impl Provider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Local => "local",
            Provider::Cloud => "cloud",
        }
    }
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provider {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "local" | "ollama" => Ok(Provider::Local),
            "cloud" | "deepseek" => Ok(Provider::Cloud),
            _ => Err(DomainError::ValidationError(
                "Provider must be either 'local' or 'cloud'".to_string(),
            )),
        }
    }
}

/// Job Status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Generating,
    Completed,
    Failed,
}

impl JobStatus {
    /// Completed and Failed are absorbing states
    pub fn is_terminal(&self) -> bool {
        !matches!(self, JobStatus::Generating)
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobStatus::Generating => write!(f, "generating"),
            JobStatus::Completed => write!(f, "completed"),
            JobStatus::Failed => write!(f, "failed"),
        }
    }
}

/// Job Entity - one per generation request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRecord {
    pub id: JobId,
    pub age: u8,
    pub provider: Provider,

    pub status: JobStatus,
    pub current_section: SectionCursor,
    pub progress_message: String,

    pub created_at: i64,           // epoch ms
    pub completed_at: Option<i64>, // epoch ms, set once on entering a terminal state

    pub artifact_ref: Option<String>,
    pub sections: Vec<SectionResult>,
}

impl JobRecord {
    /// Check that `age` lies in [MIN_AGE, MAX_AGE]
    pub fn validate_age(age: i64) -> Result<u8> {
        if age < MIN_AGE as i64 || age > MAX_AGE as i64 {
            return Err(DomainError::InvalidAge {
                min: MIN_AGE,
                max: MAX_AGE,
            });
        }
        Ok(age as u8)
    }

    /// Create a new job
    ///
    /// # Arguments
    ///
    /// * `id` - Unique job ID (injected, not generated)
    /// * `created_at` - Creation timestamp in epoch ms (injected, not system time)
    /// * `age` - Target age of the test takers, validated to [12, 18]
    /// * `provider` - Backend that will generate every section
    pub fn new(
        id: impl Into<String>,
        created_at: i64,
        age: i64,
        provider: Provider,
    ) -> Result<Self> {
        let age = Self::validate_age(age)?;
        Ok(Self {
            id: id.into(),
            age,
            provider,
            status: JobStatus::Generating,
            current_section: SectionCursor::Section1,
            progress_message: format!("Queued: 0/{} sections completed", SectionId::COUNT),
            created_at,
            completed_at: None,
            artifact_ref: None,
            sections: Vec::with_capacity(SectionId::COUNT),
        })
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Append the result of the pending section and advance the cursor
    pub fn record_section(&mut self, result: SectionResult) -> Result<()> {
        self.ensure_generating("SECTION_COMPLETED")?;

        let expected = self.current_section.section().ok_or_else(|| {
            DomainError::InvalidStateTransition {
                from: self.current_section.to_string(),
                to: result.section.to_string(),
            }
        })?;
        if expected != result.section {
            return Err(DomainError::SectionOutOfOrder {
                expected: expected.to_string(),
                actual: result.section.to_string(),
            });
        }

        self.progress_message = format!(
            "Completed section {}/{}: {}",
            expected.index() + 1,
            SectionId::COUNT,
            expected.name()
        );
        self.current_section = SectionCursor::after(expected);
        self.sections.push(result);
        Ok(())
    }

    /// Transition to Completed with the persisted artifact reference
    pub fn complete(&mut self, artifact_ref: impl Into<String>, now_millis: i64) -> Result<()> {
        self.ensure_generating("COMPLETED")?;
        if self.current_section != SectionCursor::Completed {
            return Err(DomainError::InvalidStateTransition {
                from: self.current_section.to_string(),
                to: "COMPLETED".to_string(),
            });
        }
        self.status = JobStatus::Completed;
        self.artifact_ref = Some(artifact_ref.into());
        self.completed_at = Some(now_millis);
        self.progress_message = "Test generated successfully".to_string();
        Ok(())
    }

    /// Transition to Failed, keeping the sections produced so far
    pub fn fail(&mut self, reason: impl Into<String>, now_millis: i64) -> Result<()> {
        self.ensure_generating("FAILED")?;
        self.status = JobStatus::Failed;
        self.completed_at = Some(now_millis);
        self.progress_message = reason.into();
        Ok(())
    }

    /// Structural invariants of a record (used by tests and debug assertions)
    pub fn invariants_hold(&self) -> bool {
        let ordered = self
            .sections
            .iter()
            .enumerate()
            .all(|(i, s)| s.section.index() == i);
        let artifact_matches = self.artifact_ref.is_some() == (self.status == JobStatus::Completed);
        let completion_matches = self.completed_at.is_some() == self.status.is_terminal();

        ordered
            && artifact_matches
            && completion_matches
            && self.sections.len() == self.current_section.ordinal()
    }

    fn ensure_generating(&self, to: &str) -> Result<()> {
        if self.status != JobStatus::Generating {
            return Err(DomainError::InvalidStateTransition {
                from: self.status.to_string().to_uppercase(),
                to: to.to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn section(id: SectionId) -> SectionResult {
        SectionResult {
            section: id,
            content: format!("{}\nQuestion 1", id.descriptor().header),
        }
    }

    fn fully_generated() -> JobRecord {
        let mut job = JobRecord::new("job-1", 1_000, 15, Provider::Local).unwrap();
        for id in SectionId::ALL {
            job.record_section(section(id)).unwrap();
        }
        job
    }

    #[test]
    fn test_age_bounds() {
        assert!(JobRecord::new("a", 0, MIN_AGE as i64, Provider::Local).is_ok());
        assert!(JobRecord::new("b", 0, MAX_AGE as i64, Provider::Cloud).is_ok());

        for age in [MIN_AGE as i64 - 1, MAX_AGE as i64 + 1] {
            let err = JobRecord::new("c", 0, age, Provider::Local).unwrap_err();
            assert!(matches!(err, DomainError::InvalidAge { .. }));
            assert_eq!(err.to_string(), "Age must be between 12 and 18");
        }
    }

    #[test]
    fn test_complete_before_last_section_is_rejected() {
        let mut job = JobRecord::new("job-1", 1_000, 15, Provider::Local).unwrap();
        job.record_section(section(SectionId::Section1)).unwrap();
        let message = job.progress_message.clone();

        let err = job.complete("/tmp/out.txt", 2_000).unwrap_err();
        assert!(matches!(err, DomainError::InvalidStateTransition { .. }));

        assert_eq!(job.status, JobStatus::Generating);
        assert!(job.completed_at.is_none());
        assert!(job.artifact_ref.is_none());
        assert_eq!(job.progress_message, message);
        assert!(job.invariants_hold());
    }

    #[test]
    fn test_out_of_order_section_is_rejected() {
        let mut job = JobRecord::new("job-1", 1_000, 15, Provider::Local).unwrap();

        let err = job.record_section(section(SectionId::Section2)).unwrap_err();
        assert!(matches!(err, DomainError::SectionOutOfOrder { .. }));
        assert_eq!(job.current_section, SectionCursor::Section1);
        assert!(job.sections.is_empty());
    }

    #[test]
    fn test_completed_job_rejects_further_transitions() {
        let mut job = fully_generated();
        job.complete("/tmp/out.txt", 2_000).unwrap();
        assert!(job.invariants_hold());

        let err = job.fail("late failure", 3_000).unwrap_err();
        match err {
            DomainError::InvalidStateTransition { from, to } => {
                assert_eq!(from, "COMPLETED");
                assert_eq!(to, "FAILED");
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert!(job.complete("/tmp/other.txt", 3_000).is_err());

        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(job.completed_at, Some(2_000));
        assert_eq!(job.artifact_ref.as_deref(), Some("/tmp/out.txt"));
        assert_eq!(job.progress_message, "Test generated successfully");
        assert!(job.invariants_hold());
    }

    #[test]
    fn test_failed_job_rejects_further_transitions() {
        let mut job = JobRecord::new("job-1", 1_000, 15, Provider::Local).unwrap();
        job.fail("backend down", 2_000).unwrap();

        let err = job.record_section(section(SectionId::Section1)).unwrap_err();
        assert!(matches!(err, DomainError::InvalidStateTransition { .. }));
        assert!(job.fail("again", 3_000).is_err());
        assert!(job.complete("/tmp/out.txt", 3_000).is_err());

        assert_eq!(job.status, JobStatus::Failed);
        assert_eq!(job.completed_at, Some(2_000));
        assert_eq!(job.progress_message, "backend down");
        assert!(job.sections.is_empty());
        assert!(job.invariants_hold());
    }
}
