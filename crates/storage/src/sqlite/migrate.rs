use chrono::Utc;
use sqlx::SqlitePool;

use super::SqliteInitError;

const QUESTION_TABLES: [&str; 4] = [
    "mcq_questions",
    "tf_questions",
    "fib_questions",
    "txt_questions",
];

/// Runs a single, consolidated migration for the current schema.
///
/// Creates the question hierarchy, the four question pools, and the practice
/// session ledger.
#[allow(clippy::too_many_lines)]
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), SqliteInitError> {
    async fn is_applied(pool: &SqlitePool, version: i64) -> Result<bool, sqlx::Error> {
        let row = sqlx::query("SELECT 1 FROM schema_migrations WHERE version = ?1")
            .bind(version)
            .fetch_optional(pool)
            .await?;
        Ok(row.is_some())
    }

    sqlx::query(
        r"
            CREATE TABLE IF NOT EXISTS schema_migrations (
                version INTEGER PRIMARY KEY,
                applied_at TEXT NOT NULL
            );
            ",
    )
    .execute(pool)
    .await?;

    // Version 1: full schema.
    if !is_applied(pool, 1).await? {
        let mut tx = pool.begin().await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS question_domains (
                    id INTEGER PRIMARY KEY,
                    name TEXT NOT NULL UNIQUE
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS question_sub_domains (
                    id INTEGER PRIMARY KEY,
                    name TEXT NOT NULL,
                    domain_id INTEGER NOT NULL,
                    FOREIGN KEY (domain_id) REFERENCES question_domains(id)
                        ON UPDATE CASCADE ON DELETE CASCADE
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS question_niches (
                    id INTEGER PRIMARY KEY,
                    name TEXT NOT NULL,
                    sub_domain_id INTEGER NOT NULL,
                    FOREIGN KEY (sub_domain_id) REFERENCES question_sub_domains(id)
                        ON UPDATE CASCADE ON DELETE CASCADE
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS question_difficulty_levels (
                    id INTEGER PRIMARY KEY,
                    level TEXT NOT NULL,
                    niche_id INTEGER NOT NULL,
                    FOREIGN KEY (niche_id) REFERENCES question_niches(id)
                        ON UPDATE CASCADE ON DELETE CASCADE
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS question_formats (
                    id INTEGER PRIMARY KEY,
                    kind TEXT NOT NULL CHECK (kind IN ('MCQ', 'TF', 'FIB', 'TXT')),
                    difficulty_id INTEGER NOT NULL,
                    FOREIGN KEY (difficulty_id) REFERENCES question_difficulty_levels(id)
                        ON UPDATE CASCADE ON DELETE CASCADE
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        // One pool per question shape; `options` is a JSON array (MCQ only).
        for table in QUESTION_TABLES {
            let ddl = format!(
                r"
                    CREATE TABLE IF NOT EXISTS {table} (
                        id INTEGER PRIMARY KEY AUTOINCREMENT,
                        format_id INTEGER NOT NULL,
                        question_text TEXT NOT NULL,
                        answer TEXT NOT NULL,
                        explanation TEXT,
                        options TEXT NOT NULL DEFAULT '[]',
                        updated_at TEXT NOT NULL,
                        FOREIGN KEY (format_id) REFERENCES question_formats(id)
                            ON UPDATE CASCADE ON DELETE CASCADE
                    );
                "
            );
            sqlx::query(&ddl).execute(&mut *tx).await?;

            let index = format!(
                "CREATE UNIQUE INDEX IF NOT EXISTS idx_{table}_format_id ON {table}(format_id, id);"
            );
            sqlx::query(&index).execute(&mut *tx).await?;
        }

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS practice_sessions (
                    session_id INTEGER PRIMARY KEY AUTOINCREMENT,
                    domain_id INTEGER NOT NULL,
                    sub_domain_id INTEGER NOT NULL,
                    difficulty_id INTEGER NOT NULL,
                    questions_attempted INTEGER NOT NULL DEFAULT -1,
                    questions_correct INTEGER NOT NULL DEFAULT -1,
                    score_earned REAL NOT NULL DEFAULT -1,
                    start_time TEXT NOT NULL,
                    end_time TEXT,
                    feedback TEXT NOT NULL DEFAULT ''
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        // No enforced foreign key: force-end deletes the session row but the
        // status row must remain.
        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS practice_session_status (
                    session_id INTEGER PRIMARY KEY,
                    enrollment_no TEXT NOT NULL CHECK (length(enrollment_no) = 12),
                    status TEXT NOT NULL DEFAULT 'Active'
                        CHECK (status IN ('Active', 'Submitted', 'Force End'))
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE INDEX IF NOT EXISTS idx_practice_session_status_enrollment
                    ON practice_session_status (enrollment_no, session_id);
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                INSERT INTO schema_migrations (version, applied_at)
                VALUES (?1, ?2)
                ON CONFLICT(version) DO NOTHING
            ",
        )
        .bind(1_i64)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
    }

    Ok(())
}
