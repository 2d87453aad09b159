use async_trait::async_trait;
use chrono::Utc;
use portal_core::model::{FormatId, FormatKind, QuestionId, QuestionParts};

use super::SqliteRepository;
use super::db_err;
use super::mapping::{id_from_i64, id_to_i64, map_question_row, options_to_json, question_table};
use crate::repository::{NewQuestionRecord, QuestionRepository, StorageError};

#[async_trait]
impl QuestionRepository for SqliteRepository {
    async fn fetch_page(
        &self,
        kind: FormatKind,
        format_id: FormatId,
        after: QuestionId,
        limit: u32,
    ) -> Result<Vec<QuestionParts>, StorageError> {
        let table = question_table(kind);
        let sql = format!(
            r"
            SELECT id, format_id, question_text, answer, explanation, options
            FROM {table}
            WHERE format_id = ?1 AND id > ?2
            ORDER BY id ASC
            LIMIT ?3
            "
        );

        let rows = sqlx::query(&sql)
            .bind(id_to_i64("format_id", format_id.value())?)
            .bind(id_to_i64("after", after.value())?)
            .bind(i64::from(limit))
            .fetch_all(self.pool())
            .await
            .map_err(db_err)?;

        rows.iter().map(|row| map_question_row(kind, row)).collect()
    }

    async fn insert_question(&self, record: NewQuestionRecord) -> Result<QuestionId, StorageError> {
        record
            .validate()
            .map_err(|e| StorageError::Serialization(e.to_string()))?;

        let table = question_table(record.kind);
        let sql = format!(
            r"
            INSERT INTO {table} (format_id, question_text, answer, explanation, options, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "
        );

        let res = sqlx::query(&sql)
            .bind(id_to_i64("format_id", record.format_id.value())?)
            .bind(&record.question_text)
            .bind(&record.answer)
            .bind(record.explanation.as_deref())
            .bind(options_to_json(&record.options)?)
            .bind(Utc::now())
            .execute(self.pool())
            .await
            .map_err(db_err)?;

        Ok(QuestionId::new(id_from_i64(
            "question_id",
            res.last_insert_rowid(),
        )?))
    }
}
