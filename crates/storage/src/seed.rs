//! Demo reference data and questions for local development.

use portal_core::model::{
    DifficultyId, DifficultyLevel, Domain, DomainId, FormatId, FormatKind, Niche, NicheId,
    QuestionFormat, QuestionHierarchy, QuestionId, SubDomain, SubDomainId,
};

use crate::repository::{NewQuestionRecord, Storage, StorageError};

/// Outcome of a seeding run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub formats: usize,
    pub questions_inserted: usize,
    /// Formats that already held questions and were left untouched.
    pub formats_skipped: usize,
}

/// Aptitude > Quantitative > Probability > Easy, with one format per shape
/// (format ids 1..=4 in `FormatKind::ALL` order).
#[must_use]
pub fn demo_hierarchy() -> QuestionHierarchy {
    let domain = DomainId::new(1);
    let sub_domain = SubDomainId::new(1);
    let niche = NicheId::new(1);
    let difficulty = DifficultyId::new(1);

    QuestionHierarchy {
        domains: vec![
            Domain {
                id: domain,
                name: "Aptitude".into(),
            },
            Domain {
                id: DomainId::new(2),
                name: "General Knowledge".into(),
            },
        ],
        sub_domains: vec![SubDomain {
            id: sub_domain,
            name: "Quantitative".into(),
            domain_id: domain,
        }],
        niches: vec![Niche {
            id: niche,
            name: "Probability".into(),
            sub_domain_id: sub_domain,
        }],
        difficulty_levels: vec![DifficultyLevel {
            id: difficulty,
            level: "Easy".into(),
            niche_id: niche,
        }],
        formats: FormatKind::ALL
            .iter()
            .zip(1_u64..)
            .map(|(kind, id)| QuestionFormat {
                id: FormatId::new(id),
                kind: *kind,
                difficulty_id: difficulty,
            })
            .collect(),
    }
}

fn sample(kind: FormatKind, format_id: FormatId, n: usize) -> NewQuestionRecord {
    let (question_text, answer, explanation, options): (String, &str, Option<&str>, Vec<&str>) =
        match kind {
            FormatKind::MultipleChoice => (
                format!("Q{n}: What is the probability of getting a 6 on a fair die?"),
                "1/6",
                Some("A standard die has 6 faces, so the probability of a 6 is 1 out of 6."),
                vec!["1/6", "1/4", "1/3", "1/5"],
            ),
            FormatKind::TrueFalse => (
                format!("Q{n}: A fair coin is more likely to land heads after three tails."),
                "False",
                Some("Coin tosses are independent events."),
                Vec::new(),
            ),
            FormatKind::FillInBlank => (
                format!("Q{n}: Two fair dice can sum to 7 in ________ ways."),
                "6",
                None,
                Vec::new(),
            ),
            FormatKind::Text => (
                format!("Q{n}: Explain the difference between independent and exclusive events."),
                "Independent events do not affect each other; exclusive events cannot co-occur.",
                None,
                Vec::new(),
            ),
        };

    NewQuestionRecord {
        kind,
        format_id,
        question_text,
        answer: answer.into(),
        explanation: explanation.map(Into::into),
        options: options.into_iter().map(Into::into).collect(),
    }
}

/// Upsert the demo hierarchy and fill each empty demo format with
/// `per_format` questions. Formats that already hold questions are skipped,
/// so repeated runs do not duplicate the bank.
///
/// # Errors
///
/// Returns `StorageError` if any write fails.
pub async fn seed_demo(storage: &Storage, per_format: usize) -> Result<SeedReport, StorageError> {
    let hierarchy = demo_hierarchy();
    storage.hierarchy.upsert_hierarchy(&hierarchy).await?;

    let mut report = SeedReport {
        formats: hierarchy.formats.len(),
        ..SeedReport::default()
    };

    for format in &hierarchy.formats {
        let existing = storage
            .questions
            .fetch_page(format.kind, format.id, QuestionId::START, 1)
            .await?;
        if !existing.is_empty() {
            report.formats_skipped += 1;
            continue;
        }
        for n in 1..=per_format {
            storage
                .questions
                .insert_question(sample(format.kind, format.id, n))
                .await?;
            report.questions_inserted += 1;
        }
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn demo_hierarchy_has_one_format_per_shape() {
        let h = demo_hierarchy();
        let kinds: Vec<FormatKind> = h.formats.iter().map(|f| f.kind).collect();
        assert_eq!(kinds, FormatKind::ALL.to_vec());
        assert!(h.formats.iter().all(|f| f.difficulty_id == DifficultyId::new(1)));
    }

    #[tokio::test]
    async fn seeding_twice_does_not_duplicate_questions() {
        let storage = Storage::in_memory();
        let first = seed_demo(&storage, 3).await.unwrap();
        assert_eq!(first.questions_inserted, 12);

        let second = seed_demo(&storage, 3).await.unwrap();
        assert_eq!(second.questions_inserted, 0);
        assert_eq!(second.formats_skipped, 4);

        let page = storage
            .questions
            .fetch_page(
                FormatKind::MultipleChoice,
                FormatId::new(1),
                QuestionId::START,
                10,
            )
            .await
            .unwrap();
        assert_eq!(page.len(), 3);
        assert_eq!(page[0].options.len(), 4);
    }
}
