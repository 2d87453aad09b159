use async_trait::async_trait;
use chrono::{DateTime, Utc};
use portal_core::model::{
    DifficultyId, DifficultyLevel, Domain, DomainId, EnrollmentNo, FormatId, FormatKind, Niche,
    NicheId, NewPracticeSession, PracticeSession, QuestionBase, QuestionError, QuestionFormat,
    QuestionHierarchy, QuestionId, QuestionParts, SessionGrade, SessionId, SessionStatus,
    SessionStatusRecord, SubDomain, SubDomainId,
};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// A question to be added to a format's pool; the store assigns the id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewQuestionRecord {
    pub kind: FormatKind,
    pub format_id: FormatId,
    pub question_text: String,
    pub answer: String,
    pub explanation: Option<String>,
    pub options: Vec<String>,
}

impl NewQuestionRecord {
    /// Attach a store-assigned id.
    #[must_use]
    pub fn into_parts(self, id: QuestionId) -> QuestionParts {
        QuestionParts {
            kind: self.kind,
            base: QuestionBase {
                format_id: self.format_id,
                id,
                question_text: self.question_text,
                answer: self.answer,
            },
            explanation: self.explanation,
            options: self.options,
        }
    }

    /// Check the record against the rules of its question shape.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError` if the record would not load back as a valid question.
    pub fn validate(&self) -> Result<(), QuestionError> {
        self.clone().into_parts(QuestionId::START).validate()
    }
}

/// A status row together with its session row.
///
/// `session` is `None` once the session has been force-ended and its row deleted.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionEntry {
    pub status: SessionStatusRecord,
    pub session: Option<PracticeSession>,
}

/// Read access to the question bank, partitioned by format.
#[async_trait]
pub trait QuestionRepository: Send + Sync {
    /// Fetch up to `limit` questions of `format_id` whose id is greater than
    /// `after`, ascending by id.
    ///
    /// Unknown formats yield an empty page.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the store cannot be queried.
    async fn fetch_page(
        &self,
        kind: FormatKind,
        format_id: FormatId,
        after: QuestionId,
        limit: u32,
    ) -> Result<Vec<QuestionParts>, StorageError>;

    /// Add a question to its format's pool.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Serialization` if the record fails validation,
    /// or other storage errors.
    async fn insert_question(&self, record: NewQuestionRecord) -> Result<QuestionId, StorageError>;
}

/// Durable record of practice sessions and their lifecycle status.
///
/// Every method that writes touches the session row and the status row in a
/// single all-or-nothing unit.
#[async_trait]
pub trait SessionLedger: Send + Sync {
    /// Create an ungraded session row and an `Active` status row.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if either write fails; nothing is persisted then.
    async fn open_session(&self, new: &NewPracticeSession) -> Result<SessionId, StorageError>;

    /// Mark an `Active` session `Submitted` and store its grade.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if no `Active` status row exists for `id`.
    async fn submit_session(
        &self,
        id: SessionId,
        grade: &SessionGrade,
        end_time: DateTime<Utc>,
    ) -> Result<(), StorageError>;

    /// Mark an `Active` session `Force End` and delete its session row.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if no `Active` status row exists for `id`.
    async fn force_end_session(&self, id: SessionId) -> Result<(), StorageError>;

    /// Fetch a session by id, `Ok(None)` when no status row exists.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on repository failures.
    async fn get_session(&self, id: SessionId) -> Result<Option<SessionEntry>, StorageError>;

    /// List a student's sessions, newest first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on repository failures.
    async fn list_sessions(
        &self,
        enrollment_no: &EnrollmentNo,
        limit: u32,
    ) -> Result<Vec<SessionEntry>, StorageError>;
}

/// Read-mostly question hierarchy reference data.
#[async_trait]
pub trait HierarchyRepository: Send + Sync {
    async fn list_domains(&self) -> Result<Vec<Domain>, StorageError>;

    async fn list_sub_domains(&self, domain_id: DomainId) -> Result<Vec<SubDomain>, StorageError>;

    async fn list_niches(&self, sub_domain_id: SubDomainId) -> Result<Vec<Niche>, StorageError>;

    async fn list_difficulty_levels(
        &self,
        niche_id: NicheId,
    ) -> Result<Vec<DifficultyLevel>, StorageError>;

    async fn list_formats(
        &self,
        difficulty_id: DifficultyId,
    ) -> Result<Vec<QuestionFormat>, StorageError>;

    /// Read every level of the hierarchy in one consistent snapshot.
    async fn hierarchy(&self) -> Result<QuestionHierarchy, StorageError>;

    /// Insert or update every node in `hierarchy` (used by seeding).
    async fn upsert_hierarchy(&self, hierarchy: &QuestionHierarchy) -> Result<(), StorageError>;
}

//
// ─── IN-MEMORY ─────────────────────────────────────────────────────────────────
//

#[derive(Default)]
struct LedgerState {
    next_id: u64,
    sessions: HashMap<SessionId, PracticeSession>,
    statuses: BTreeMap<SessionId, SessionStatusRecord>,
}

impl LedgerState {
    fn entry(&self, status: &SessionStatusRecord) -> SessionEntry {
        SessionEntry {
            status: status.clone(),
            session: self.sessions.get(&status.session_id).cloned(),
        }
    }

    fn close(&mut self, id: SessionId, next: SessionStatus) -> Result<(), StorageError> {
        let record = self
            .statuses
            .get_mut(&id)
            .filter(|r| r.status.can_transition_to(next))
            .ok_or(StorageError::NotFound)?;
        record.status = next;
        Ok(())
    }
}

#[derive(Default)]
struct QuestionBank {
    next_id: HashMap<FormatKind, u64>,
    pools: HashMap<FormatKind, BTreeMap<(FormatId, QuestionId), QuestionParts>>,
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    ledger: Arc<Mutex<LedgerState>>,
    questions: Arc<Mutex<QuestionBank>>,
    hierarchy: Arc<Mutex<QuestionHierarchy>>,
    fail_status_writes: Arc<AtomicBool>,
    fail_question_reads: Arc<AtomicBool>,
}

fn poisoned<E: std::fmt::Display>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every status-row write fail, after the session row was written.
    pub fn fail_status_writes(&self, fail: bool) {
        self.fail_status_writes.store(fail, Ordering::SeqCst);
    }

    /// Make every question read fail as if the store were unreachable.
    pub fn fail_question_reads(&self, fail: bool) {
        self.fail_question_reads.store(fail, Ordering::SeqCst);
    }

    /// Number of session rows currently stored.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Connection` if the lock is poisoned.
    pub fn session_row_count(&self) -> Result<usize, StorageError> {
        Ok(self.ledger.lock().map_err(poisoned)?.sessions.len())
    }
}

#[async_trait]
impl QuestionRepository for InMemoryRepository {
    async fn fetch_page(
        &self,
        kind: FormatKind,
        format_id: FormatId,
        after: QuestionId,
        limit: u32,
    ) -> Result<Vec<QuestionParts>, StorageError> {
        if self.fail_question_reads.load(Ordering::SeqCst) {
            return Err(StorageError::Connection("question store unavailable".into()));
        }
        let guard = self.questions.lock().map_err(poisoned)?;
        let Some(pool) = guard.pools.get(&kind) else {
            return Ok(Vec::new());
        };
        let limit = usize::try_from(limit).unwrap_or(usize::MAX);
        Ok(pool
            .range((format_id, after)..=(format_id, QuestionId::new(u64::MAX)))
            .filter(|((_, id), _)| *id > after)
            .take(limit)
            .map(|(_, parts)| parts.clone())
            .collect())
    }

    async fn insert_question(&self, record: NewQuestionRecord) -> Result<QuestionId, StorageError> {
        record
            .validate()
            .map_err(|e| StorageError::Serialization(e.to_string()))?;
        let mut guard = self.questions.lock().map_err(poisoned)?;
        let next = guard.next_id.entry(record.kind).or_insert(0);
        *next += 1;
        let id = QuestionId::new(*next);
        let kind = record.kind;
        let format_id = record.format_id;
        guard
            .pools
            .entry(kind)
            .or_default()
            .insert((format_id, id), record.into_parts(id));
        Ok(id)
    }
}

#[async_trait]
impl SessionLedger for InMemoryRepository {
    async fn open_session(&self, new: &NewPracticeSession) -> Result<SessionId, StorageError> {
        let mut guard = self.ledger.lock().map_err(poisoned)?;
        let id = SessionId::new(guard.next_id + 1);
        guard.sessions.insert(id, PracticeSession::opened(id, new));

        if self.fail_status_writes.load(Ordering::SeqCst) {
            guard.sessions.remove(&id);
            return Err(StorageError::Connection("status write failed".into()));
        }

        guard.statuses.insert(
            id,
            SessionStatusRecord {
                session_id: id,
                enrollment_no: new.enrollment_no.clone(),
                status: SessionStatus::Active,
            },
        );
        guard.next_id = id.value();
        Ok(id)
    }

    async fn submit_session(
        &self,
        id: SessionId,
        grade: &SessionGrade,
        end_time: DateTime<Utc>,
    ) -> Result<(), StorageError> {
        let mut guard = self.ledger.lock().map_err(poisoned)?;
        if !guard.sessions.contains_key(&id) {
            return Err(StorageError::NotFound);
        }
        guard.close(id, SessionStatus::Submitted)?;
        if let Some(session) = guard.sessions.get_mut(&id) {
            session.apply_grade(grade.clone(), end_time);
        }
        Ok(())
    }

    async fn force_end_session(&self, id: SessionId) -> Result<(), StorageError> {
        let mut guard = self.ledger.lock().map_err(poisoned)?;
        guard.close(id, SessionStatus::ForceEnded)?;
        guard.sessions.remove(&id);
        Ok(())
    }

    async fn get_session(&self, id: SessionId) -> Result<Option<SessionEntry>, StorageError> {
        let guard = self.ledger.lock().map_err(poisoned)?;
        Ok(guard.statuses.get(&id).map(|status| guard.entry(status)))
    }

    async fn list_sessions(
        &self,
        enrollment_no: &EnrollmentNo,
        limit: u32,
    ) -> Result<Vec<SessionEntry>, StorageError> {
        let guard = self.ledger.lock().map_err(poisoned)?;
        let limit = usize::try_from(limit).unwrap_or(usize::MAX);
        Ok(guard
            .statuses
            .values()
            .rev()
            .filter(|s| &s.enrollment_no == enrollment_no)
            .take(limit)
            .map(|s| guard.entry(s))
            .collect())
    }
}

#[async_trait]
impl HierarchyRepository for InMemoryRepository {
    async fn list_domains(&self) -> Result<Vec<Domain>, StorageError> {
        Ok(self.hierarchy.lock().map_err(poisoned)?.domains.clone())
    }

    async fn list_sub_domains(&self, domain_id: DomainId) -> Result<Vec<SubDomain>, StorageError> {
        let guard = self.hierarchy.lock().map_err(poisoned)?;
        Ok(guard
            .sub_domains
            .iter()
            .filter(|s| s.domain_id == domain_id)
            .cloned()
            .collect())
    }

    async fn list_niches(&self, sub_domain_id: SubDomainId) -> Result<Vec<Niche>, StorageError> {
        let guard = self.hierarchy.lock().map_err(poisoned)?;
        Ok(guard
            .niches
            .iter()
            .filter(|n| n.sub_domain_id == sub_domain_id)
            .cloned()
            .collect())
    }

    async fn list_difficulty_levels(
        &self,
        niche_id: NicheId,
    ) -> Result<Vec<DifficultyLevel>, StorageError> {
        let guard = self.hierarchy.lock().map_err(poisoned)?;
        Ok(guard
            .difficulty_levels
            .iter()
            .filter(|d| d.niche_id == niche_id)
            .cloned()
            .collect())
    }

    async fn list_formats(
        &self,
        difficulty_id: DifficultyId,
    ) -> Result<Vec<QuestionFormat>, StorageError> {
        let guard = self.hierarchy.lock().map_err(poisoned)?;
        Ok(guard
            .formats
            .iter()
            .filter(|f| f.difficulty_id == difficulty_id)
            .cloned()
            .collect())
    }

    async fn hierarchy(&self) -> Result<QuestionHierarchy, StorageError> {
        Ok(self.hierarchy.lock().map_err(poisoned)?.clone())
    }

    async fn upsert_hierarchy(&self, hierarchy: &QuestionHierarchy) -> Result<(), StorageError> {
        fn upsert<T: Clone, K: PartialEq>(into: &mut Vec<T>, from: &[T], key: impl Fn(&T) -> K) {
            for item in from {
                match into.iter_mut().find(|existing| key(existing) == key(item)) {
                    Some(existing) => *existing = item.clone(),
                    None => into.push(item.clone()),
                }
            }
        }

        let mut guard = self.hierarchy.lock().map_err(poisoned)?;
        upsert(&mut guard.domains, &hierarchy.domains, |d| d.id);
        upsert(&mut guard.sub_domains, &hierarchy.sub_domains, |s| s.id);
        upsert(&mut guard.niches, &hierarchy.niches, |n| n.id);
        upsert(
            &mut guard.difficulty_levels,
            &hierarchy.difficulty_levels,
            |d| d.id,
        );
        upsert(&mut guard.formats, &hierarchy.formats, |f| f.id);
        Ok(())
    }
}

/// Aggregates repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub questions: Arc<dyn QuestionRepository>,
    pub sessions: Arc<dyn SessionLedger>,
    pub hierarchy: Arc<dyn HierarchyRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        Self::from_in_memory(&InMemoryRepository::new())
    }

    /// Wrap an existing in-memory repository, keeping a handle for test hooks.
    #[must_use]
    pub fn from_in_memory(repo: &InMemoryRepository) -> Self {
        let questions: Arc<dyn QuestionRepository> = Arc::new(repo.clone());
        let sessions: Arc<dyn SessionLedger> = Arc::new(repo.clone());
        let hierarchy: Arc<dyn HierarchyRepository> = Arc::new(repo.clone());
        Self {
            questions,
            sessions,
            hierarchy,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use portal_core::model::{DifficultyId, DomainId, SubDomainId};
    use portal_core::time::fixed_now;

    fn enrollment() -> EnrollmentNo {
        EnrollmentNo::parse("0801CS221001").unwrap()
    }

    fn new_session() -> NewPracticeSession {
        NewPracticeSession {
            enrollment_no: enrollment(),
            domain_id: DomainId::new(1),
            sub_domain_id: SubDomainId::new(1),
            difficulty_id: DifficultyId::new(1),
            start_time: fixed_now(),
        }
    }

    fn tf(format: u64, text: &str) -> NewQuestionRecord {
        NewQuestionRecord {
            kind: FormatKind::TrueFalse,
            format_id: FormatId::new(format),
            question_text: text.into(),
            answer: "True".into(),
            explanation: None,
            options: Vec::new(),
        }
    }

    #[tokio::test]
    async fn fetch_page_respects_cursor_format_and_limit() {
        let repo = InMemoryRepository::new();
        for i in 1..=5 {
            repo.insert_question(tf(1, &format!("Q{i}"))).await.unwrap();
        }
        repo.insert_question(tf(2, "other format")).await.unwrap();

        let page = repo
            .fetch_page(FormatKind::TrueFalse, FormatId::new(1), QuestionId::new(2), 2)
            .await
            .unwrap();
        let ids: Vec<u64> = page.iter().map(|p| p.base.id.value()).collect();
        assert_eq!(ids, vec![3, 4]);

        let empty = repo
            .fetch_page(FormatKind::MultipleChoice, FormatId::new(1), QuestionId::START, 10)
            .await
            .unwrap();
        assert!(empty.is_empty());
    }

    #[tokio::test]
    async fn insert_rejects_invalid_mcq() {
        let repo = InMemoryRepository::new();
        let mut record = tf(1, "Pick one");
        record.kind = FormatKind::MultipleChoice;
        record.options = vec!["a".into(), "b".into()];
        let err = repo.insert_question(record).await.unwrap_err();
        assert!(matches!(err, StorageError::Serialization(_)));
    }

    #[tokio::test]
    async fn failed_status_write_leaves_no_session_row() {
        let repo = InMemoryRepository::new();
        repo.fail_status_writes(true);
        assert!(repo.open_session(&new_session()).await.is_err());
        assert_eq!(repo.session_row_count().unwrap(), 0);

        repo.fail_status_writes(false);
        let id = repo.open_session(&new_session()).await.unwrap();
        assert_eq!(id, SessionId::new(1));
    }

    #[tokio::test]
    async fn closing_twice_is_not_found() {
        let repo = InMemoryRepository::new();
        let id = repo.open_session(&new_session()).await.unwrap();
        repo.force_end_session(id).await.unwrap();

        let grade = SessionGrade::new(1, 1, 100.0, "").unwrap();
        assert!(matches!(
            repo.submit_session(id, &grade, fixed_now()).await,
            Err(StorageError::NotFound)
        ));
        assert!(matches!(
            repo.force_end_session(id).await,
            Err(StorageError::NotFound)
        ));

        let entry = repo.get_session(id).await.unwrap().unwrap();
        assert_eq!(entry.status.status, SessionStatus::ForceEnded);
        assert!(entry.session.is_none());
    }

    #[tokio::test]
    async fn list_sessions_is_newest_first_and_scoped_to_student() {
        let repo = InMemoryRepository::new();
        let first = repo.open_session(&new_session()).await.unwrap();
        let mut other = new_session();
        other.enrollment_no = EnrollmentNo::parse("0801IT221002").unwrap();
        repo.open_session(&other).await.unwrap();
        let third = repo.open_session(&new_session()).await.unwrap();

        let listed = repo.list_sessions(&enrollment(), 10).await.unwrap();
        let ids: Vec<SessionId> = listed.iter().map(|e| e.status.session_id).collect();
        assert_eq!(ids, vec![third, first]);
    }
}
