use std::sync::Arc;

use chrono::Duration;
use serde::Serialize;
use tracing::{info, warn};

use portal_core::Clock;
use portal_core::model::{EnrollmentNo, NewPracticeSession, SessionId};
use storage::repository::{QuestionRepository, SessionEntry, SessionLedger, StorageError};

use super::selector::{QuestionBatch, QuestionSelector};
use crate::error::SessionError;
use crate::request::{ForceEndSession, IssueBatch, SubmitSession};

/// Tunables for practice sessions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PracticeConfig {
    /// Added to the request time to get a session's recorded start, covering
    /// the time it takes the batch to reach the student.
    pub start_offset: Duration,
}

impl Default for PracticeConfig {
    fn default() -> Self {
        Self {
            start_offset: Duration::seconds(5),
        }
    }
}

/// Result of opening a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IssuedBatch {
    pub questions: QuestionBatch,
    pub practice_session_id: SessionId,
}

/// Opens, grades and abandons practice sessions.
#[derive(Clone)]
pub struct PracticeSessionService {
    clock: Clock,
    config: PracticeConfig,
    selector: QuestionSelector,
    ledger: Arc<dyn SessionLedger>,
}

/// Storage `NotFound` on a conditional close is the caller's problem, not
/// an infrastructure failure.
fn close_err(session_id: SessionId, e: StorageError) -> SessionError {
    match e {
        StorageError::NotFound => SessionError::NotFound { session_id },
        other => SessionError::Transaction(other),
    }
}

impl PracticeSessionService {
    #[must_use]
    pub fn new(
        clock: Clock,
        questions: Arc<dyn QuestionRepository>,
        ledger: Arc<dyn SessionLedger>,
    ) -> Self {
        Self {
            clock,
            config: PracticeConfig::default(),
            selector: QuestionSelector::new(questions),
            ledger,
        }
    }

    #[must_use]
    pub fn with_config(mut self, config: PracticeConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub fn config(&self) -> PracticeConfig {
        self.config
    }

    /// Select a batch and open a fresh `Active` session for it.
    ///
    /// Every call opens a new session; a previous unfinished one is left as is.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Transaction` if the question store or either
    /// ledger write fails. Nothing is persisted in that case.
    /// `SessionError::StartTimeOverflow` if the configured offset pushes the
    /// start time out of range.
    pub async fn issue_batch(&self, req: IssueBatch) -> Result<IssuedBatch, SessionError> {
        let questions = self
            .selector
            .select_batch(req.kind, req.format_id, req.last_attempted, req.count)
            .await?;

        let new = NewPracticeSession {
            enrollment_no: req.enrollment_no,
            domain_id: req.domain_id,
            sub_domain_id: req.sub_domain_id,
            difficulty_id: req.difficulty_id,
            start_time: self
                .clock
                .now()
                .checked_add_signed(self.config.start_offset)
                .ok_or(SessionError::StartTimeOverflow {
                    offset: self.config.start_offset,
                })?,
        };
        let session_id = self.ledger.open_session(&new).await.map_err(|e| {
            warn!(error = %e, enrollment_no = %new.enrollment_no, "failed to open practice session");
            SessionError::Transaction(e)
        })?;

        info!(
            %session_id,
            enrollment_no = %new.enrollment_no,
            format_id = %req.format_id,
            kind = %req.kind,
            count = questions.len(),
            "practice session opened"
        );

        Ok(IssuedBatch {
            questions,
            practice_session_id: session_id,
        })
    }

    /// Record the client's grade and mark the session `Submitted`.
    ///
    /// The grade is stored as reported; it is not checked against the batch.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NotFound` if the session is not `Active`, or
    /// `SessionError::Transaction` if the write fails.
    pub async fn submit(&self, req: SubmitSession) -> Result<(), SessionError> {
        let session_id = req.session_id;
        self.ledger
            .submit_session(session_id, &req.grade, self.clock.now())
            .await
            .map_err(|e| close_err(session_id, e))?;

        info!(
            %session_id,
            attempted = req.grade.questions_attempted(),
            correct = req.grade.questions_correct(),
            score = req.grade.score_percent(),
            "practice session submitted"
        );
        Ok(())
    }

    /// Abandon an `Active` session; its session row is removed.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NotFound` if the session is not `Active`, or
    /// `SessionError::Transaction` if the write fails.
    pub async fn force_end(&self, req: ForceEndSession) -> Result<(), SessionError> {
        let session_id = req.session_id;
        self.ledger
            .force_end_session(session_id)
            .await
            .map_err(|e| close_err(session_id, e))?;

        match &req.enrollment_no {
            Some(enrollment_no) => {
                info!(%session_id, %enrollment_no, "practice session force-ended");
            }
            None => info!(%session_id, "practice session force-ended"),
        }
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `SessionError::NotFound` if no session with this id was ever
    /// opened.
    pub async fn get_session(&self, session_id: SessionId) -> Result<SessionEntry, SessionError> {
        self.ledger
            .get_session(session_id)
            .await?
            .ok_or(SessionError::NotFound { session_id })
    }

    /// A student's sessions, newest first.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Transaction` on storage failures.
    pub async fn history(
        &self,
        enrollment_no: &EnrollmentNo,
        limit: u32,
    ) -> Result<Vec<SessionEntry>, SessionError> {
        Ok(self.ledger.list_sessions(enrollment_no, limit).await?)
    }
}
