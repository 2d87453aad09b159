use async_trait::async_trait;
use chrono::{DateTime, Utc};
use portal_core::model::{EnrollmentNo, NewPracticeSession, SessionGrade, SessionId, SessionStatus};

use super::SqliteRepository;
use super::db_err;
use super::mapping::{SESSION_ENTRY_COLUMNS, id_from_i64, id_to_i64, map_session_entry_row};
use crate::repository::{SessionEntry, SessionLedger, StorageError};

/// Flip an `Active` status row to `next`; zero affected rows means the
/// session does not exist or is already closed.
async fn close_status(
    conn: &mut sqlx::SqliteConnection,
    id: i64,
    next: SessionStatus,
) -> Result<(), StorageError> {
    let res = sqlx::query(
        r"
        UPDATE practice_session_status
        SET status = ?1
        WHERE session_id = ?2 AND status = ?3
        ",
    )
    .bind(next.as_str())
    .bind(id)
    .bind(SessionStatus::Active.as_str())
    .execute(&mut *conn)
    .await
    .map_err(db_err)?;

    if res.rows_affected() == 0 {
        return Err(StorageError::NotFound);
    }
    Ok(())
}

#[async_trait]
impl SessionLedger for SqliteRepository {
    async fn open_session(&self, new: &NewPracticeSession) -> Result<SessionId, StorageError> {
        let mut tx = self.pool().begin().await.map_err(db_err)?;

        let res = sqlx::query(
            r"
            INSERT INTO practice_sessions (
                domain_id, sub_domain_id, difficulty_id,
                questions_attempted, questions_correct, score_earned,
                start_time, end_time, feedback
            )
            VALUES (?1, ?2, ?3, -1, -1, -1, ?4, NULL, '')
            ",
        )
        .bind(id_to_i64("domain_id", new.domain_id.value())?)
        .bind(id_to_i64("sub_domain_id", new.sub_domain_id.value())?)
        .bind(id_to_i64("difficulty_id", new.difficulty_id.value())?)
        .bind(new.start_time)
        .execute(&mut *tx)
        .await
        .map_err(db_err)?;
        let id = res.last_insert_rowid();

        sqlx::query(
            r"
            INSERT INTO practice_session_status (session_id, enrollment_no, status)
            VALUES (?1, ?2, ?3)
            ",
        )
        .bind(id)
        .bind(new.enrollment_no.as_str())
        .bind(SessionStatus::Active.as_str())
        .execute(&mut *tx)
        .await
        .map_err(db_err)?;

        tx.commit().await.map_err(db_err)?;
        Ok(SessionId::new(id_from_i64("session_id", id)?))
    }

    async fn submit_session(
        &self,
        id: SessionId,
        grade: &SessionGrade,
        end_time: DateTime<Utc>,
    ) -> Result<(), StorageError> {
        let id = id_to_i64("session_id", id.value())?;
        let mut tx = self.pool().begin().await.map_err(db_err)?;

        close_status(&mut *tx, id, SessionStatus::Submitted).await?;

        let res = sqlx::query(
            r"
            UPDATE practice_sessions
            SET questions_attempted = ?1,
                questions_correct = ?2,
                score_earned = ?3,
                end_time = ?4,
                feedback = ?5
            WHERE session_id = ?6
            ",
        )
        .bind(grade.questions_attempted())
        .bind(grade.questions_correct())
        .bind(grade.score_percent())
        .bind(end_time)
        .bind(grade.feedback())
        .bind(id)
        .execute(&mut *tx)
        .await
        .map_err(db_err)?;

        if res.rows_affected() == 0 {
            // Dropping `tx` rolls back the status flip.
            return Err(StorageError::NotFound);
        }

        tx.commit().await.map_err(db_err)?;
        Ok(())
    }

    async fn force_end_session(&self, id: SessionId) -> Result<(), StorageError> {
        let id = id_to_i64("session_id", id.value())?;
        let mut tx = self.pool().begin().await.map_err(db_err)?;

        close_status(&mut *tx, id, SessionStatus::ForceEnded).await?;

        sqlx::query("DELETE FROM practice_sessions WHERE session_id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;

        tx.commit().await.map_err(db_err)?;
        Ok(())
    }

    async fn get_session(&self, id: SessionId) -> Result<Option<SessionEntry>, StorageError> {
        let sql = format!(
            r"
            SELECT {SESSION_ENTRY_COLUMNS}
            FROM practice_session_status s
            LEFT JOIN practice_sessions p ON p.session_id = s.session_id
            WHERE s.session_id = ?1
            "
        );

        let row = sqlx::query(&sql)
            .bind(id_to_i64("session_id", id.value())?)
            .fetch_optional(self.pool())
            .await
            .map_err(db_err)?;

        row.as_ref().map(map_session_entry_row).transpose()
    }

    async fn list_sessions(
        &self,
        enrollment_no: &EnrollmentNo,
        limit: u32,
    ) -> Result<Vec<SessionEntry>, StorageError> {
        let sql = format!(
            r"
            SELECT {SESSION_ENTRY_COLUMNS}
            FROM practice_session_status s
            LEFT JOIN practice_sessions p ON p.session_id = s.session_id
            WHERE s.enrollment_no = ?1
            ORDER BY s.session_id DESC
            LIMIT ?2
            "
        );

        let rows = sqlx::query(&sql)
            .bind(enrollment_no.as_str())
            .bind(i64::from(limit))
            .fetch_all(self.pool())
            .await
            .map_err(db_err)?;

        rows.iter().map(map_session_entry_row).collect()
    }
}
