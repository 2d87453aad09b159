use chrono::{DateTime, Utc};
use portal_core::model::{
    DifficultyId, DomainId, EnrollmentNo, FormatId, FormatKind, PracticeSession, QuestionBase,
    QuestionId, QuestionParts, SessionGrade, SessionId, SessionStatus, SessionStatusRecord,
    SubDomainId,
};
use sqlx::Row;

use crate::repository::{SessionEntry, StorageError};

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

pub(crate) fn id_to_i64(field: &'static str, v: u64) -> Result<i64, StorageError> {
    i64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} overflow")))
}

pub(crate) fn id_from_i64(field: &'static str, v: i64) -> Result<u64, StorageError> {
    u64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} sign overflow")))
}

/// Storage table holding the pool for a question shape.
pub(crate) fn question_table(kind: FormatKind) -> &'static str {
    match kind {
        FormatKind::MultipleChoice => "mcq_questions",
        FormatKind::TrueFalse => "tf_questions",
        FormatKind::FillInBlank => "fib_questions",
        FormatKind::Text => "txt_questions",
    }
}

pub(crate) fn options_to_json(options: &[String]) -> Result<String, StorageError> {
    serde_json::to_string(options).map_err(ser)
}

pub(crate) fn map_question_row(
    kind: FormatKind,
    row: &sqlx::sqlite::SqliteRow,
) -> Result<QuestionParts, StorageError> {
    let options_json: String = row.try_get("options").map_err(ser)?;
    let options: Vec<String> = serde_json::from_str(&options_json).map_err(ser)?;

    Ok(QuestionParts {
        kind,
        base: QuestionBase {
            format_id: FormatId::new(id_from_i64(
                "format_id",
                row.try_get::<i64, _>("format_id").map_err(ser)?,
            )?),
            id: QuestionId::new(id_from_i64(
                "question_id",
                row.try_get::<i64, _>("id").map_err(ser)?,
            )?),
            question_text: row.try_get("question_text").map_err(ser)?,
            answer: row.try_get("answer").map_err(ser)?,
        },
        explanation: row.try_get("explanation").map_err(ser)?,
        options,
    })
}

/// Columns selected by `map_session_entry_row`, status table aliased `s`,
/// session table aliased `p`.
pub(crate) const SESSION_ENTRY_COLUMNS: &str = r"
    s.session_id, s.enrollment_no, s.status,
    p.session_id AS p_session_id, p.domain_id, p.sub_domain_id, p.difficulty_id,
    p.questions_attempted, p.questions_correct, p.score_earned,
    p.start_time, p.end_time, p.feedback
";

fn map_session_row(
    id: SessionId,
    row: &sqlx::sqlite::SqliteRow,
) -> Result<Option<PracticeSession>, StorageError> {
    // LEFT JOIN: a force-ended session has no row on the right.
    if row
        .try_get::<Option<i64>, _>("p_session_id")
        .map_err(ser)?
        .is_none()
    {
        return Ok(None);
    }

    let end_time: Option<DateTime<Utc>> = row.try_get("end_time").map_err(ser)?;
    // `end_time` is only written by submit, together with the grade.
    let grade = match end_time {
        Some(_) => Some(
            SessionGrade::new(
                row.try_get::<i64, _>("questions_attempted").map_err(ser)?,
                row.try_get::<i64, _>("questions_correct").map_err(ser)?,
                row.try_get::<f64, _>("score_earned").map_err(ser)?,
                row.try_get::<String, _>("feedback").map_err(ser)?,
            )
            .map_err(ser)?,
        ),
        None => None,
    };

    Ok(Some(PracticeSession::from_persisted(
        id,
        DomainId::new(id_from_i64(
            "domain_id",
            row.try_get::<i64, _>("domain_id").map_err(ser)?,
        )?),
        SubDomainId::new(id_from_i64(
            "sub_domain_id",
            row.try_get::<i64, _>("sub_domain_id").map_err(ser)?,
        )?),
        DifficultyId::new(id_from_i64(
            "difficulty_id",
            row.try_get::<i64, _>("difficulty_id").map_err(ser)?,
        )?),
        row.try_get("start_time").map_err(ser)?,
        end_time,
        grade,
    )))
}

pub(crate) fn map_session_entry_row(
    row: &sqlx::sqlite::SqliteRow,
) -> Result<SessionEntry, StorageError> {
    let session_id = SessionId::new(id_from_i64(
        "session_id",
        row.try_get::<i64, _>("session_id").map_err(ser)?,
    )?);
    let enrollment_no =
        EnrollmentNo::parse(row.try_get::<String, _>("enrollment_no").map_err(ser)?)
            .map_err(ser)?;
    let status = row
        .try_get::<String, _>("status")
        .map_err(ser)?
        .parse::<SessionStatus>()
        .map_err(ser)?;

    Ok(SessionEntry {
        status: SessionStatusRecord {
            session_id,
            enrollment_no,
            status,
        },
        session: map_session_row(session_id, row)?,
    })
}
