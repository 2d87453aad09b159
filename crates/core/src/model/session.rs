use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::model::enrollment::EnrollmentNo;
use crate::model::ids::{DifficultyId, DomainId, SessionId, SubDomainId};

/// Stored value of the grading columns until a session is submitted.
pub const UNGRADED: i64 = -1;

#[derive(Debug, Error, Clone, PartialEq)]
#[non_exhaustive]
pub enum GradeError {
    #[error("score percentage must be a finite number, got {0}")]
    NonFiniteScore(f64),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("invalid session status: {0}")]
pub struct ParseStatusError(pub String);

//
// ─── STATUS ────────────────────────────────────────────────────────────────────
//

/// Lifecycle status of a practice session.
///
/// A session is born `Active`; `Submitted` and `ForceEnded` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SessionStatus {
    Active,
    Submitted,
    #[serde(rename = "Force End")]
    ForceEnded,
}

impl SessionStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            SessionStatus::Active => "Active",
            SessionStatus::Submitted => "Submitted",
            SessionStatus::ForceEnded => "Force End",
        }
    }

    #[must_use]
    pub fn is_terminal(self) -> bool {
        !matches!(self, SessionStatus::Active)
    }

    /// Whether the state machine allows moving from `self` to `next`.
    #[must_use]
    pub fn can_transition_to(self, next: SessionStatus) -> bool {
        matches!(
            (self, next),
            (SessionStatus::Active, SessionStatus::Submitted | SessionStatus::ForceEnded)
        )
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SessionStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Active" => Ok(SessionStatus::Active),
            "Submitted" => Ok(SessionStatus::Submitted),
            "Force End" => Ok(SessionStatus::ForceEnded),
            other => Err(ParseStatusError(other.to_string())),
        }
    }
}

/// Lookup row tying a session to its student and lifecycle status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStatusRecord {
    pub session_id: SessionId,
    pub enrollment_no: EnrollmentNo,
    pub status: SessionStatus,
}

//
// ─── GRADE ─────────────────────────────────────────────────────────────────────
//

/// Client-reported results of a finished session.
///
/// Counts and score are taken as given; nothing here checks them against the
/// number of questions that were issued.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionGrade {
    questions_attempted: i64,
    questions_correct: i64,
    score_percent: f64,
    feedback: String,
}

impl SessionGrade {
    /// # Errors
    ///
    /// Returns `GradeError::NonFiniteScore` for NaN or infinite scores, which
    /// cannot be persisted.
    pub fn new(
        questions_attempted: i64,
        questions_correct: i64,
        score_percent: f64,
        feedback: impl Into<String>,
    ) -> Result<Self, GradeError> {
        if !score_percent.is_finite() {
            return Err(GradeError::NonFiniteScore(score_percent));
        }
        Ok(Self {
            questions_attempted,
            questions_correct,
            score_percent,
            feedback: feedback.into(),
        })
    }

    #[must_use]
    pub fn questions_attempted(&self) -> i64 {
        self.questions_attempted
    }

    #[must_use]
    pub fn questions_correct(&self) -> i64 {
        self.questions_correct
    }

    #[must_use]
    pub fn score_percent(&self) -> f64 {
        self.score_percent
    }

    #[must_use]
    pub fn feedback(&self) -> &str {
        &self.feedback
    }
}

//
// ─── SESSION ───────────────────────────────────────────────────────────────────
//

/// Everything needed to open a session; the ledger assigns the id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPracticeSession {
    pub enrollment_no: EnrollmentNo,
    pub domain_id: DomainId,
    pub sub_domain_id: SubDomainId,
    pub difficulty_id: DifficultyId,
    pub start_time: DateTime<Utc>,
}

/// Persisted practice session row.
#[derive(Debug, Clone, PartialEq)]
pub struct PracticeSession {
    id: SessionId,
    domain_id: DomainId,
    sub_domain_id: SubDomainId,
    difficulty_id: DifficultyId,
    start_time: DateTime<Utc>,
    end_time: Option<DateTime<Utc>>,
    grade: Option<SessionGrade>,
}

impl PracticeSession {
    /// A freshly opened, ungraded session.
    #[must_use]
    pub fn opened(id: SessionId, new: &NewPracticeSession) -> Self {
        Self {
            id,
            domain_id: new.domain_id,
            sub_domain_id: new.sub_domain_id,
            difficulty_id: new.difficulty_id,
            start_time: new.start_time,
            end_time: None,
            grade: None,
        }
    }

    /// Rehydrate a session from storage.
    #[must_use]
    pub fn from_persisted(
        id: SessionId,
        domain_id: DomainId,
        sub_domain_id: SubDomainId,
        difficulty_id: DifficultyId,
        start_time: DateTime<Utc>,
        end_time: Option<DateTime<Utc>>,
        grade: Option<SessionGrade>,
    ) -> Self {
        Self {
            id,
            domain_id,
            sub_domain_id,
            difficulty_id,
            start_time,
            end_time,
            grade,
        }
    }

    /// Overwrite the grading fields with submitted results.
    pub fn apply_grade(&mut self, grade: SessionGrade, end_time: DateTime<Utc>) {
        self.grade = Some(grade);
        self.end_time = Some(end_time);
    }

    #[must_use]
    pub fn id(&self) -> SessionId {
        self.id
    }

    #[must_use]
    pub fn domain_id(&self) -> DomainId {
        self.domain_id
    }

    #[must_use]
    pub fn sub_domain_id(&self) -> SubDomainId {
        self.sub_domain_id
    }

    #[must_use]
    pub fn difficulty_id(&self) -> DifficultyId {
        self.difficulty_id
    }

    #[must_use]
    pub fn start_time(&self) -> DateTime<Utc> {
        self.start_time
    }

    #[must_use]
    pub fn end_time(&self) -> Option<DateTime<Utc>> {
        self.end_time
    }

    #[must_use]
    pub fn grade(&self) -> Option<&SessionGrade> {
        self.grade.as_ref()
    }

    #[must_use]
    pub fn is_graded(&self) -> bool {
        self.grade.is_some()
    }

    /// Attempted count as stored, `UNGRADED` until submit.
    #[must_use]
    pub fn questions_attempted(&self) -> i64 {
        self.grade
            .as_ref()
            .map_or(UNGRADED, SessionGrade::questions_attempted)
    }

    /// Correct count as stored, `UNGRADED` until submit.
    #[must_use]
    pub fn questions_correct(&self) -> i64 {
        self.grade
            .as_ref()
            .map_or(UNGRADED, SessionGrade::questions_correct)
    }

    /// Score percentage as stored, `UNGRADED` until submit.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn score_earned(&self) -> f64 {
        self.grade
            .as_ref()
            .map_or(UNGRADED as f64, SessionGrade::score_percent)
    }

    #[must_use]
    pub fn feedback(&self) -> &str {
        self.grade.as_ref().map_or("", SessionGrade::feedback)
    }
}
