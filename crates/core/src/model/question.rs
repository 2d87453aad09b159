use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::model::ids::{FormatId, QuestionId};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuestionError {
    #[error("unknown question format kind: {0}")]
    UnknownKind(String),

    #[error("question count must be one of 1, 10, 30 or 60, got {0}")]
    InvalidCount(u32),

    #[error("question text cannot be empty")]
    EmptyText,

    #[error("question answer cannot be empty")]
    EmptyAnswer,

    #[error("MCQ questions must have exactly 4 options, got {0}")]
    InvalidOptionCount(usize),

    #[error("expected a {expected} question, got {found}")]
    KindMismatch { expected: FormatKind, found: FormatKind },
}

//
// ─── FORMAT KIND ───────────────────────────────────────────────────────────────
//

/// The four question shapes. Each maps to its own storage table and payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FormatKind {
    #[serde(rename = "MCQ")]
    MultipleChoice,
    #[serde(rename = "TF")]
    TrueFalse,
    #[serde(rename = "FIB")]
    FillInBlank,
    #[serde(rename = "TXT")]
    Text,
}

impl FormatKind {
    pub const ALL: [FormatKind; 4] = [
        FormatKind::MultipleChoice,
        FormatKind::TrueFalse,
        FormatKind::FillInBlank,
        FormatKind::Text,
    ];

    /// Wire/storage tag for the kind.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            FormatKind::MultipleChoice => "MCQ",
            FormatKind::TrueFalse => "TF",
            FormatKind::FillInBlank => "FIB",
            FormatKind::Text => "TXT",
        }
    }
}

impl fmt::Display for FormatKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FormatKind {
    type Err = QuestionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "MCQ" => Ok(FormatKind::MultipleChoice),
            "TF" => Ok(FormatKind::TrueFalse),
            "FIB" => Ok(FormatKind::FillInBlank),
            "TXT" => Ok(FormatKind::Text),
            other => Err(QuestionError::UnknownKind(other.to_string())),
        }
    }
}

//
// ─── QUESTION COUNT ────────────────────────────────────────────────────────────
//

/// Number of questions requested for one practice batch.
///
/// Only the sizes offered by the client are accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(into = "u32")]
pub struct QuestionCount(u32);

impl QuestionCount {
    pub const ALLOWED: [u32; 4] = [1, 10, 30, 60];

    /// # Errors
    ///
    /// Returns `QuestionError::InvalidCount` if `value` is not an allowed batch size.
    pub fn new(value: u32) -> Result<Self, QuestionError> {
        if Self::ALLOWED.contains(&value) {
            Ok(Self(value))
        } else {
            Err(QuestionError::InvalidCount(value))
        }
    }

    #[must_use]
    pub fn get(self) -> u32 {
        self.0
    }
}

impl From<QuestionCount> for u32 {
    fn from(value: QuestionCount) -> Self {
        value.0
    }
}

//
// ─── QUESTION SHAPES ───────────────────────────────────────────────────────────
//

/// Fields shared by every question shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionBase {
    #[serde(rename = "formatID")]
    pub format_id: FormatId,
    #[serde(rename = "questionID")]
    pub id: QuestionId,
    pub question_text: String,
    pub answer: String,
}

impl QuestionBase {
    fn validate(&self) -> Result<(), QuestionError> {
        if self.question_text.trim().is_empty() {
            return Err(QuestionError::EmptyText);
        }
        if self.answer.trim().is_empty() {
            return Err(QuestionError::EmptyAnswer);
        }
        Ok(())
    }
}

/// Storage-neutral shape of any question row.
///
/// Repositories read and write this; `QuestionShape` implementations convert
/// to and from their typed form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionParts {
    pub kind: FormatKind,
    pub base: QuestionBase,
    pub explanation: Option<String>,
    pub options: Vec<String>,
}

impl QuestionParts {
    fn expect_kind(&self, expected: FormatKind) -> Result<(), QuestionError> {
        if self.kind == expected {
            Ok(())
        } else {
            Err(QuestionError::KindMismatch {
                expected,
                found: self.kind,
            })
        }
    }

    /// Validate the row against the rules of its own kind.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError` if the row would not convert into its typed shape.
    pub fn validate(&self) -> Result<(), QuestionError> {
        match self.kind {
            FormatKind::MultipleChoice => McqQuestion::from_parts(self.clone()).map(drop),
            FormatKind::TrueFalse => TrueFalseQuestion::from_parts(self.clone()).map(drop),
            FormatKind::FillInBlank => FillInBlankQuestion::from_parts(self.clone()).map(drop),
            FormatKind::Text => TextQuestion::from_parts(self.clone()).map(drop),
        }
    }
}

/// Capability shared by the four question shapes.
///
/// Batch selection is written once against this trait and instantiated per
/// shape, chosen by the caller's `FormatKind` tag.
pub trait QuestionShape: Sized + Clone + Send + Sync + Serialize + 'static {
    const KIND: FormatKind;

    /// Build the typed question from a storage row.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError` if the row belongs to another kind or fails validation.
    fn from_parts(parts: QuestionParts) -> Result<Self, QuestionError>;

    fn into_parts(self) -> QuestionParts;

    fn base(&self) -> &QuestionBase;

    fn explanation(&self) -> Option<&str> {
        None
    }

    #[must_use]
    fn id(&self) -> QuestionId {
        self.base().id
    }
}

/// Multiple-choice question with exactly four options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct McqQuestion {
    #[serde(flatten)]
    pub base: QuestionBase,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
    pub options: Vec<String>,
}

pub const MCQ_OPTION_COUNT: usize = 4;

impl QuestionShape for McqQuestion {
    const KIND: FormatKind = FormatKind::MultipleChoice;

    fn from_parts(parts: QuestionParts) -> Result<Self, QuestionError> {
        parts.expect_kind(Self::KIND)?;
        parts.base.validate()?;
        if parts.options.len() != MCQ_OPTION_COUNT {
            return Err(QuestionError::InvalidOptionCount(parts.options.len()));
        }
        Ok(Self {
            base: parts.base,
            explanation: parts.explanation,
            options: parts.options,
        })
    }

    fn into_parts(self) -> QuestionParts {
        QuestionParts {
            kind: Self::KIND,
            base: self.base,
            explanation: self.explanation,
            options: self.options,
        }
    }

    fn base(&self) -> &QuestionBase {
        &self.base
    }

    fn explanation(&self) -> Option<&str> {
        self.explanation.as_deref()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrueFalseQuestion {
    #[serde(flatten)]
    pub base: QuestionBase,
    #[serde(default)]
    pub explanation: String,
}

impl QuestionShape for TrueFalseQuestion {
    const KIND: FormatKind = FormatKind::TrueFalse;

    fn from_parts(parts: QuestionParts) -> Result<Self, QuestionError> {
        parts.expect_kind(Self::KIND)?;
        parts.base.validate()?;
        Ok(Self {
            base: parts.base,
            explanation: parts.explanation.unwrap_or_default(),
        })
    }

    fn into_parts(self) -> QuestionParts {
        QuestionParts {
            kind: Self::KIND,
            base: self.base,
            explanation: Some(self.explanation),
            options: Vec::new(),
        }
    }

    fn base(&self) -> &QuestionBase {
        &self.base
    }

    fn explanation(&self) -> Option<&str> {
        Some(self.explanation.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FillInBlankQuestion {
    #[serde(flatten)]
    pub base: QuestionBase,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
}

impl QuestionShape for FillInBlankQuestion {
    const KIND: FormatKind = FormatKind::FillInBlank;

    fn from_parts(parts: QuestionParts) -> Result<Self, QuestionError> {
        parts.expect_kind(Self::KIND)?;
        parts.base.validate()?;
        Ok(Self {
            base: parts.base,
            explanation: parts.explanation,
        })
    }

    fn into_parts(self) -> QuestionParts {
        QuestionParts {
            kind: Self::KIND,
            base: self.base,
            explanation: self.explanation,
            options: Vec::new(),
        }
    }

    fn base(&self) -> &QuestionBase {
        &self.base
    }

    fn explanation(&self) -> Option<&str> {
        self.explanation.as_deref()
    }
}

/// Free-text question; the stored answer is a reference answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextQuestion {
    #[serde(flatten)]
    pub base: QuestionBase,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
}

impl QuestionShape for TextQuestion {
    const KIND: FormatKind = FormatKind::Text;

    fn from_parts(parts: QuestionParts) -> Result<Self, QuestionError> {
        parts.expect_kind(Self::KIND)?;
        parts.base.validate()?;
        Ok(Self {
            base: parts.base,
            explanation: parts.explanation,
        })
    }

    fn into_parts(self) -> QuestionParts {
        QuestionParts {
            kind: Self::KIND,
            base: self.base,
            explanation: self.explanation,
            options: Vec::new(),
        }
    }

    fn base(&self) -> &QuestionBase {
        &self.base
    }

    fn explanation(&self) -> Option<&str> {
        self.explanation.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base(id: u64) -> QuestionBase {
        QuestionBase {
            format_id: FormatId::new(3),
            id: QuestionId::new(id),
            question_text: "What is 2 + 2?".into(),
            answer: "4".into(),
        }
    }

    fn mcq_parts(options: usize) -> QuestionParts {
        QuestionParts {
            kind: FormatKind::MultipleChoice,
            base: base(1),
            explanation: None,
            options: (0..options).map(|i| i.to_string()).collect(),
        }
    }

    #[test]
    fn format_kind_parses_wire_tags() {
        for kind in FormatKind::ALL {
            assert_eq!(kind.as_str().parse::<FormatKind>().unwrap(), kind);
        }
        assert_eq!(
            "MCQS".parse::<FormatKind>(),
            Err(QuestionError::UnknownKind("MCQS".into()))
        );
    }

    #[test]
    fn question_count_accepts_only_offered_sizes() {
        for n in QuestionCount::ALLOWED {
            assert_eq!(QuestionCount::new(n).unwrap().get(), n);
        }
        assert_eq!(QuestionCount::new(0), Err(QuestionError::InvalidCount(0)));
        assert_eq!(QuestionCount::new(20), Err(QuestionError::InvalidCount(20)));
    }

    #[test]
    fn mcq_requires_four_options() {
        assert!(McqQuestion::from_parts(mcq_parts(4)).is_ok());
        assert_eq!(
            McqQuestion::from_parts(mcq_parts(3)),
            Err(QuestionError::InvalidOptionCount(3))
        );
    }

    #[test]
    fn shape_rejects_rows_of_another_kind() {
        let err = TrueFalseQuestion::from_parts(mcq_parts(4)).unwrap_err();
        assert_eq!(
            err,
            QuestionError::KindMismatch {
                expected: FormatKind::TrueFalse,
                found: FormatKind::MultipleChoice,
            }
        );
    }

    #[test]
    fn parts_validate_by_their_own_kind() {
        let mut parts = mcq_parts(4);
        parts.base.answer = "  ".into();
        assert_eq!(parts.validate(), Err(QuestionError::EmptyAnswer));
    }

    #[test]
    fn mcq_serializes_with_flattened_base() {
        let q = McqQuestion::from_parts(mcq_parts(4)).unwrap();
        let json = serde_json::to_value(&q).unwrap();
        assert_eq!(json["questionID"], 1);
        assert_eq!(json["formatID"], 3);
        assert_eq!(json["questionText"], "What is 2 + 2?");
        assert_eq!(json["options"].as_array().unwrap().len(), 4);
        assert!(json.get("explanation").is_none());
    }

    #[test]
    fn true_false_round_trips_through_parts() {
        let q = TrueFalseQuestion {
            base: base(9),
            explanation: "because".into(),
        };
        let back = TrueFalseQuestion::from_parts(q.clone().into_parts()).unwrap();
        assert_eq!(back, q);
        assert_eq!(back.id(), QuestionId::new(9));
    }
}
