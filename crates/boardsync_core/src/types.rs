//! Core type definitions: identifiers, job kinds and the job lifecycle.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Unique identifier for a sync job.
///
/// Job IDs are assigned by the store, start at 1 and are never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub u64);

impl JobId {
    /// Creates a new job ID.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw ID value.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "job:{}", self.0)
    }
}

/// Store-assigned row identifier of a synchronized record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(pub u64);

impl RecordId {
    /// Creates a new record ID.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw ID value.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rec:{}", self.0)
    }
}

/// Kinds of records pulled from a board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    /// Property cards.
    Property,
    /// Inheritance confinement cards.
    InheritanceConfinement,
    /// Supportive document cards.
    SupportiveDoc,
}

impl RecordKind {
    /// All record kinds, in attachment collection order.
    pub const ALL: [RecordKind; 3] = [
        RecordKind::Property,
        RecordKind::InheritanceConfinement,
        RecordKind::SupportiveDoc,
    ];

    /// The job kind that synchronizes this record kind.
    #[must_use]
    pub const fn job_kind(self) -> JobKind {
        match self {
            RecordKind::Property => JobKind::Properties,
            RecordKind::InheritanceConfinement => JobKind::InheritanceConfinements,
            RecordKind::SupportiveDoc => JobKind::SupportiveDocs,
        }
    }

    /// Stable name, shared with the job kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        self.job_kind().as_str()
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kinds of synchronization jobs.
///
/// Every record kind has its own job kind. `Attachments` mirrors the
/// attachments of already-synchronized records into blob storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    /// Synchronize property records.
    Properties,
    /// Synchronize inheritance confinement records.
    InheritanceConfinements,
    /// Synchronize supportive document records.
    SupportiveDocs,
    /// Mirror record attachments into blob storage.
    Attachments,
}

impl JobKind {
    /// All job kinds.
    pub const ALL: [JobKind; 4] = [
        JobKind::Properties,
        JobKind::InheritanceConfinements,
        JobKind::SupportiveDocs,
        JobKind::Attachments,
    ];

    /// Stable wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            JobKind::Properties => "properties",
            JobKind::InheritanceConfinements => "inheritance_confinements",
            JobKind::SupportiveDocs => "supportive_docs",
            JobKind::Attachments => "attachments",
        }
    }

    /// The record kind this job synchronizes, if it is a record job.
    #[must_use]
    pub const fn record_kind(self) -> Option<RecordKind> {
        match self {
            JobKind::Properties => Some(RecordKind::Property),
            JobKind::InheritanceConfinements => Some(RecordKind::InheritanceConfinement),
            JobKind::SupportiveDocs => Some(RecordKind::SupportiveDoc),
            JobKind::Attachments => None,
        }
    }
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown job kind.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown job kind: {0}")]
pub struct UnknownJobKind(pub String);

impl FromStr for JobKind {
    type Err = UnknownJobKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "properties" => Ok(JobKind::Properties),
            "inheritance_confinements" | "inhconfs" => Ok(JobKind::InheritanceConfinements),
            "supportive_docs" | "supportivedocs" => Ok(JobKind::SupportiveDocs),
            "attachments" => Ok(JobKind::Attachments),
            other => Err(UnknownJobKind(other.to_string())),
        }
    }
}

/// Lifecycle state of a job.
///
/// ```text
/// queued ──► running ──► completed
///               │
///               └──────► cancelled
/// ```
///
/// A stale active job may also be moved straight to `cancelled` when it is
/// reconciled during admission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    /// Admitted, not yet started.
    Queued,
    /// The run is in progress.
    Running,
    /// The run finished. Partial failure is reported through the error count.
    Completed,
    /// The run was cancelled or abandoned.
    Cancelled,
}

impl JobState {
    /// Returns true for states that block admission of another job.
    #[must_use]
    pub const fn is_active(self) -> bool {
        matches!(self, JobState::Queued | JobState::Running)
    }

    /// Returns true for final states.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        !self.is_active()
    }

    /// Returns true if the lifecycle allows moving to `next`.
    #[must_use]
    pub const fn can_transition_to(self, next: JobState) -> bool {
        matches!(
            (self, next),
            (JobState::Queued, JobState::Running)
                | (JobState::Queued, JobState::Cancelled)
                | (JobState::Running, JobState::Completed)
                | (JobState::Running, JobState::Cancelled)
        )
    }

    /// Stable wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            JobState::Queued => "queued",
            JobState::Running => "running",
            JobState::Completed => "completed",
            JobState::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A synchronization job row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    /// Job identifier.
    pub id: JobId,
    /// What the job synchronizes.
    pub kind: JobKind,
    /// Current lifecycle state.
    pub state: JobState,
    /// Items the run handled successfully.
    pub processed: u64,
    /// Failures counted during the run.
    pub errors: u64,
    /// When the job was admitted.
    pub started_at: DateTime<Utc>,
    /// When the job reached a terminal state.
    pub completed_at: Option<DateTime<Utc>>,
}

impl Job {
    /// Creates a freshly admitted job.
    #[must_use]
    pub fn queued(id: JobId, kind: JobKind, started_at: DateTime<Utc>) -> Self {
        Self {
            id,
            kind,
            state: JobState::Queued,
            processed: 0,
            errors: 0,
            started_at,
            completed_at: None,
        }
    }

    /// Returns true while the job blocks admission of its kind.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.state.is_active()
    }

    /// Moves the job to `next`, returning false if the lifecycle forbids it.
    pub fn transition(&mut self, next: JobState) -> bool {
        if !self.state.can_transition_to(next) {
            return false;
        }
        self.state = next;
        true
    }

    /// Moves the job to a terminal state and records its final counters.
    ///
    /// Returns false and leaves the job untouched if the transition is not allowed.
    pub fn finish(
        &mut self,
        state: JobState,
        processed: u64,
        errors: u64,
        at: DateTime<Utc>,
    ) -> bool {
        if !state.is_terminal() || !self.transition(state) {
            return false;
        }
        self.processed = processed;
        self.errors = errors;
        self.completed_at = Some(at);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_kind_round_trips_names() {
        for kind in JobKind::ALL {
            assert_eq!(kind.as_str().parse::<JobKind>().unwrap(), kind);
        }
        assert_eq!(
            "inhconfs".parse::<JobKind>().unwrap(),
            JobKind::InheritanceConfinements
        );
        assert!("cards".parse::<JobKind>().is_err());
    }

    #[test]
    fn record_kind_mapping() {
        for kind in RecordKind::ALL {
            assert_eq!(kind.job_kind().record_kind(), Some(kind));
        }
        assert_eq!(JobKind::Attachments.record_kind(), None);
    }

    #[test]
    fn state_transitions() {
        use JobState::*;
        assert!(Queued.can_transition_to(Running));
        assert!(Running.can_transition_to(Completed));
        assert!(Running.can_transition_to(Cancelled));
        assert!(Queued.can_transition_to(Cancelled));
        assert!(!Completed.can_transition_to(Running));
        assert!(!Cancelled.can_transition_to(Completed));
        assert!(!Queued.can_transition_to(Completed));
        assert!(Queued.is_active() && Running.is_active());
        assert!(Completed.is_terminal() && Cancelled.is_terminal());
    }

    #[test]
    fn finish_sets_counters_once() {
        let now = Utc::now();
        let mut job = Job::queued(JobId::new(1), JobKind::Properties, now);
        assert!(!job.finish(JobState::Completed, 1, 0, now));

        assert!(job.transition(JobState::Running));
        assert!(job.finish(JobState::Completed, 3, 1, now));
        assert_eq!(job.processed, 3);
        assert_eq!(job.errors, 1);
        assert_eq!(job.completed_at, Some(now));

        assert!(!job.finish(JobState::Cancelled, 9, 9, now));
        assert_eq!(job.state, JobState::Completed);
        assert_eq!(job.processed, 3);
    }
}
