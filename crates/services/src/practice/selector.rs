use std::sync::Arc;

use serde::Serialize;
use tracing::debug;

use portal_core::model::{
    FillInBlankQuestion, FormatId, FormatKind, McqQuestion, QuestionCount, QuestionId,
    QuestionShape, TextQuestion, TrueFalseQuestion,
};
use storage::repository::QuestionRepository;

use crate::error::SessionError;

/// A batch of questions of a single shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum QuestionBatch {
    MultipleChoice(Vec<McqQuestion>),
    TrueFalse(Vec<TrueFalseQuestion>),
    FillInBlank(Vec<FillInBlankQuestion>),
    Text(Vec<TextQuestion>),
}

impl QuestionBatch {
    #[must_use]
    pub fn kind(&self) -> FormatKind {
        match self {
            QuestionBatch::MultipleChoice(_) => FormatKind::MultipleChoice,
            QuestionBatch::TrueFalse(_) => FormatKind::TrueFalse,
            QuestionBatch::FillInBlank(_) => FormatKind::FillInBlank,
            QuestionBatch::Text(_) => FormatKind::Text,
        }
    }

    /// Question ids in batch order.
    #[must_use]
    pub fn ids(&self) -> Vec<QuestionId> {
        fn ids_of<Q: QuestionShape>(qs: &[Q]) -> Vec<QuestionId> {
            qs.iter().map(QuestionShape::id).collect()
        }
        match self {
            QuestionBatch::MultipleChoice(qs) => ids_of(qs),
            QuestionBatch::TrueFalse(qs) => ids_of(qs),
            QuestionBatch::FillInBlank(qs) => ids_of(qs),
            QuestionBatch::Text(qs) => ids_of(qs),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            QuestionBatch::MultipleChoice(qs) => qs.len(),
            QuestionBatch::TrueFalse(qs) => qs.len(),
            QuestionBatch::FillInBlank(qs) => qs.len(),
            QuestionBatch::Text(qs) => qs.len(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Picks questions for a batch, preferring ones past the student's cursor.
#[derive(Clone)]
pub struct QuestionSelector {
    questions: Arc<dyn QuestionRepository>,
}

impl QuestionSelector {
    #[must_use]
    pub fn new(questions: Arc<dyn QuestionRepository>) -> Self {
        Self { questions }
    }

    /// Select up to `count` questions of shape `Q` from `format_id`.
    ///
    /// Questions after `after` come first. If the pool past the cursor runs
    /// short, the remainder is backfilled from the start of the pool, so a
    /// small pool can repeat questions within one batch.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Transaction` if either fetch fails and
    /// `SessionError::Question` if a stored row is not a valid `Q`. No
    /// partial batch is returned.
    pub async fn select<Q: QuestionShape>(
        &self,
        format_id: FormatId,
        after: QuestionId,
        count: QuestionCount,
    ) -> Result<Vec<Q>, SessionError> {
        let wanted = count.get();
        let mut rows = self
            .questions
            .fetch_page(Q::KIND, format_id, after, wanted)
            .await?;

        let fetched = u32::try_from(rows.len()).unwrap_or(u32::MAX);
        let remaining = wanted.saturating_sub(fetched);
        if remaining > 0 {
            debug!(
                %format_id,
                %after,
                fetched,
                remaining,
                "cursor page short, backfilling from pool start"
            );
            let backfill = self
                .questions
                .fetch_page(Q::KIND, format_id, QuestionId::START, remaining)
                .await?;
            rows.extend(backfill);
        }

        rows.into_iter()
            .map(Q::from_parts)
            .collect::<Result<Vec<_>, _>>()
            .map_err(SessionError::from)
    }

    /// Dispatch `select` on the shape named by `kind`.
    ///
    /// # Errors
    ///
    /// See [`QuestionSelector::select`].
    pub async fn select_batch(
        &self,
        kind: FormatKind,
        format_id: FormatId,
        after: QuestionId,
        count: QuestionCount,
    ) -> Result<QuestionBatch, SessionError> {
        Ok(match kind {
            FormatKind::MultipleChoice => {
                QuestionBatch::MultipleChoice(self.select(format_id, after, count).await?)
            }
            FormatKind::TrueFalse => {
                QuestionBatch::TrueFalse(self.select(format_id, after, count).await?)
            }
            FormatKind::FillInBlank => {
                QuestionBatch::FillInBlank(self.select(format_id, after, count).await?)
            }
            FormatKind::Text => QuestionBatch::Text(self.select(format_id, after, count).await?),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use storage::repository::{InMemoryRepository, NewQuestionRecord};

    async fn pool_of(kind: FormatKind, format: u64, n: u32) -> InMemoryRepository {
        let repo = InMemoryRepository::new();
        for i in 1..=n {
            repo.insert_question(NewQuestionRecord {
                kind,
                format_id: FormatId::new(format),
                question_text: format!("Q{i}"),
                answer: "True".into(),
                explanation: None,
                options: Vec::new(),
            })
            .await
            .unwrap();
        }
        repo
    }

    fn count(n: u32) -> QuestionCount {
        QuestionCount::new(n).unwrap()
    }

    #[tokio::test]
    async fn short_cursor_page_is_backfilled_from_start() {
        let repo = pool_of(FormatKind::TrueFalse, 1, 15).await;
        let selector = QuestionSelector::new(Arc::new(repo));

        let batch: Vec<TrueFalseQuestion> = selector
            .select(FormatId::new(1), QuestionId::new(12), count(10))
            .await
            .unwrap();
        let ids: Vec<u64> = batch.iter().map(|q| q.id().value()).collect();
        assert_eq!(ids, vec![13, 14, 15, 1, 2, 3, 4, 5, 6, 7]);
    }

    #[tokio::test]
    async fn no_backfill_when_cursor_page_is_full() {
        let repo = pool_of(FormatKind::Text, 2, 30).await;
        let selector = QuestionSelector::new(Arc::new(repo));

        let batch = selector
            .select_batch(FormatKind::Text, FormatId::new(2), QuestionId::new(5), count(10))
            .await
            .unwrap();
        assert_eq!(batch.kind(), FormatKind::Text);
        let ids: Vec<u64> = batch.ids().iter().map(|id| id.value()).collect();
        assert_eq!(ids, (6..=15).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn small_pool_repeats_questions_rather_than_failing() {
        let repo = pool_of(FormatKind::FillInBlank, 1, 4).await;
        let selector = QuestionSelector::new(Arc::new(repo));

        let batch: Vec<FillInBlankQuestion> = selector
            .select(FormatId::new(1), QuestionId::new(3), count(10))
            .await
            .unwrap();
        let ids: Vec<u64> = batch.iter().map(|q| q.id().value()).collect();
        assert_eq!(ids, vec![4, 1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn store_failure_aborts_selection() {
        let repo = pool_of(FormatKind::TrueFalse, 1, 3).await;
        repo.fail_question_reads(true);
        let selector = QuestionSelector::new(Arc::new(repo));

        let err = selector
            .select::<TrueFalseQuestion>(FormatId::new(1), QuestionId::START, count(1))
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::Transaction(_)));
    }
}
