use async_trait::async_trait;
use portal_core::model::{
    DifficultyId, DifficultyLevel, Domain, DomainId, FormatId, FormatKind, Niche, NicheId,
    QuestionFormat, QuestionHierarchy, SubDomain, SubDomainId,
};
use sqlx::Row;
use sqlx::sqlite::SqliteRow;

use super::SqliteRepository;
use super::db_err;
use super::mapping::{id_from_i64, id_to_i64, ser};
use crate::repository::{HierarchyRepository, StorageError};

fn col_id(row: &SqliteRow, name: &'static str) -> Result<u64, StorageError> {
    id_from_i64(name, row.try_get::<i64, _>(name).map_err(ser)?)
}

fn map_domain(row: &SqliteRow) -> Result<Domain, StorageError> {
    Ok(Domain {
        id: DomainId::new(col_id(row, "id")?),
        name: row.try_get("name").map_err(ser)?,
    })
}

fn map_sub_domain(row: &SqliteRow) -> Result<SubDomain, StorageError> {
    Ok(SubDomain {
        id: SubDomainId::new(col_id(row, "id")?),
        name: row.try_get("name").map_err(ser)?,
        domain_id: DomainId::new(col_id(row, "domain_id")?),
    })
}

fn map_niche(row: &SqliteRow) -> Result<Niche, StorageError> {
    Ok(Niche {
        id: NicheId::new(col_id(row, "id")?),
        name: row.try_get("name").map_err(ser)?,
        sub_domain_id: SubDomainId::new(col_id(row, "sub_domain_id")?),
    })
}

fn map_difficulty(row: &SqliteRow) -> Result<DifficultyLevel, StorageError> {
    Ok(DifficultyLevel {
        id: DifficultyId::new(col_id(row, "id")?),
        level: row.try_get("level").map_err(ser)?,
        niche_id: NicheId::new(col_id(row, "niche_id")?),
    })
}

fn map_format(row: &SqliteRow) -> Result<QuestionFormat, StorageError> {
    let kind: String = row.try_get("kind").map_err(ser)?;
    Ok(QuestionFormat {
        id: FormatId::new(col_id(row, "id")?),
        kind: kind.parse::<FormatKind>().map_err(ser)?,
        difficulty_id: DifficultyId::new(col_id(row, "difficulty_id")?),
    })
}

const DOMAINS_SQL: &str = "SELECT id, name FROM question_domains ORDER BY id";
const SUB_DOMAINS_SQL: &str = "SELECT id, name, domain_id FROM question_sub_domains";
const NICHES_SQL: &str = "SELECT id, name, sub_domain_id FROM question_niches";
const DIFFICULTIES_SQL: &str = "SELECT id, level, niche_id FROM question_difficulty_levels";
const FORMATS_SQL: &str = "SELECT id, kind, difficulty_id FROM question_formats";

#[async_trait]
impl HierarchyRepository for SqliteRepository {
    async fn list_domains(&self) -> Result<Vec<Domain>, StorageError> {
        let rows = sqlx::query(DOMAINS_SQL)
            .fetch_all(self.pool())
            .await
            .map_err(db_err)?;
        rows.iter().map(map_domain).collect()
    }

    async fn list_sub_domains(&self, domain_id: DomainId) -> Result<Vec<SubDomain>, StorageError> {
        let sql = format!("{SUB_DOMAINS_SQL} WHERE domain_id = ?1 ORDER BY id");
        let rows = sqlx::query(&sql)
            .bind(id_to_i64("domain_id", domain_id.value())?)
            .fetch_all(self.pool())
            .await
            .map_err(db_err)?;
        rows.iter().map(map_sub_domain).collect()
    }

    async fn list_niches(&self, sub_domain_id: SubDomainId) -> Result<Vec<Niche>, StorageError> {
        let sql = format!("{NICHES_SQL} WHERE sub_domain_id = ?1 ORDER BY id");
        let rows = sqlx::query(&sql)
            .bind(id_to_i64("sub_domain_id", sub_domain_id.value())?)
            .fetch_all(self.pool())
            .await
            .map_err(db_err)?;
        rows.iter().map(map_niche).collect()
    }

    async fn list_difficulty_levels(
        &self,
        niche_id: NicheId,
    ) -> Result<Vec<DifficultyLevel>, StorageError> {
        let sql = format!("{DIFFICULTIES_SQL} WHERE niche_id = ?1 ORDER BY id");
        let rows = sqlx::query(&sql)
            .bind(id_to_i64("niche_id", niche_id.value())?)
            .fetch_all(self.pool())
            .await
            .map_err(db_err)?;
        rows.iter().map(map_difficulty).collect()
    }

    async fn list_formats(
        &self,
        difficulty_id: DifficultyId,
    ) -> Result<Vec<QuestionFormat>, StorageError> {
        let sql = format!("{FORMATS_SQL} WHERE difficulty_id = ?1 ORDER BY id");
        let rows = sqlx::query(&sql)
            .bind(id_to_i64("difficulty_id", difficulty_id.value())?)
            .fetch_all(self.pool())
            .await
            .map_err(db_err)?;
        rows.iter().map(map_format).collect()
    }

    async fn hierarchy(&self) -> Result<QuestionHierarchy, StorageError> {
        let mut tx = self.pool().begin().await.map_err(db_err)?;

        let domains = sqlx::query(DOMAINS_SQL)
            .fetch_all(&mut *tx)
            .await
            .map_err(db_err)?;
        let sub_domains = sqlx::query(&format!("{SUB_DOMAINS_SQL} ORDER BY id"))
            .fetch_all(&mut *tx)
            .await
            .map_err(db_err)?;
        let niches = sqlx::query(&format!("{NICHES_SQL} ORDER BY id"))
            .fetch_all(&mut *tx)
            .await
            .map_err(db_err)?;
        let difficulty_levels = sqlx::query(&format!("{DIFFICULTIES_SQL} ORDER BY id"))
            .fetch_all(&mut *tx)
            .await
            .map_err(db_err)?;
        let formats = sqlx::query(&format!("{FORMATS_SQL} ORDER BY id"))
            .fetch_all(&mut *tx)
            .await
            .map_err(db_err)?;

        tx.commit().await.map_err(db_err)?;

        Ok(QuestionHierarchy {
            domains: domains.iter().map(map_domain).collect::<Result<_, _>>()?,
            sub_domains: sub_domains
                .iter()
                .map(map_sub_domain)
                .collect::<Result<_, _>>()?,
            niches: niches.iter().map(map_niche).collect::<Result<_, _>>()?,
            difficulty_levels: difficulty_levels
                .iter()
                .map(map_difficulty)
                .collect::<Result<_, _>>()?,
            formats: formats.iter().map(map_format).collect::<Result<_, _>>()?,
        })
    }

    async fn upsert_hierarchy(&self, hierarchy: &QuestionHierarchy) -> Result<(), StorageError> {
        let mut tx = self.pool().begin().await.map_err(db_err)?;

        for d in &hierarchy.domains {
            sqlx::query(
                r"
                INSERT INTO question_domains (id, name) VALUES (?1, ?2)
                ON CONFLICT(id) DO UPDATE SET name = excluded.name
                ",
            )
            .bind(id_to_i64("domain_id", d.id.value())?)
            .bind(&d.name)
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;
        }

        for s in &hierarchy.sub_domains {
            sqlx::query(
                r"
                INSERT INTO question_sub_domains (id, name, domain_id) VALUES (?1, ?2, ?3)
                ON CONFLICT(id) DO UPDATE SET
                    name = excluded.name,
                    domain_id = excluded.domain_id
                ",
            )
            .bind(id_to_i64("sub_domain_id", s.id.value())?)
            .bind(&s.name)
            .bind(id_to_i64("domain_id", s.domain_id.value())?)
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;
        }

        for n in &hierarchy.niches {
            sqlx::query(
                r"
                INSERT INTO question_niches (id, name, sub_domain_id) VALUES (?1, ?2, ?3)
                ON CONFLICT(id) DO UPDATE SET
                    name = excluded.name,
                    sub_domain_id = excluded.sub_domain_id
                ",
            )
            .bind(id_to_i64("niche_id", n.id.value())?)
            .bind(&n.name)
            .bind(id_to_i64("sub_domain_id", n.sub_domain_id.value())?)
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;
        }

        for d in &hierarchy.difficulty_levels {
            sqlx::query(
                r"
                INSERT INTO question_difficulty_levels (id, level, niche_id) VALUES (?1, ?2, ?3)
                ON CONFLICT(id) DO UPDATE SET
                    level = excluded.level,
                    niche_id = excluded.niche_id
                ",
            )
            .bind(id_to_i64("difficulty_id", d.id.value())?)
            .bind(&d.level)
            .bind(id_to_i64("niche_id", d.niche_id.value())?)
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;
        }

        for f in &hierarchy.formats {
            sqlx::query(
                r"
                INSERT INTO question_formats (id, kind, difficulty_id) VALUES (?1, ?2, ?3)
                ON CONFLICT(id) DO UPDATE SET
                    kind = excluded.kind,
                    difficulty_id = excluded.difficulty_id
                ",
            )
            .bind(id_to_i64("format_id", f.id.value())?)
            .bind(f.kind.as_str())
            .bind(id_to_i64("difficulty_id", f.difficulty_id.value())?)
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;
        }

        tx.commit().await.map_err(db_err)?;
        Ok(())
    }
}
