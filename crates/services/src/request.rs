//! Wire-level requests and their validated forms.
//!
//! Each `*Request` mirrors the JSON body a client sends; `validate` turns it
//! into the typed command the lifecycle service accepts.

use serde::Deserialize;

use portal_core::model::{
    DifficultyId, DomainId, EnrollmentNo, FormatId, FormatKind, QuestionCount, QuestionId,
    SessionGrade, SessionId, SubDomainId,
};

use crate::error::ValidationError;

/// Largest id the store can hold; row ids are signed 64-bit integers.
pub const MAX_ID: u64 = i64::MAX as u64;

/// Reject ids no stored row can carry.
///
/// # Errors
///
/// Returns `ValidationError::IdOutOfRange` when `value` exceeds [`MAX_ID`].
pub fn checked_id(field: &'static str, value: u64) -> Result<u64, ValidationError> {
    if value > MAX_ID {
        return Err(ValidationError::IdOutOfRange { field, value });
    }
    Ok(value)
}

/// Body of a question batch request.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueBatchRequest {
    pub enrollment_no: String,
    #[serde(rename = "questionDomainID")]
    pub domain_id: u64,
    #[serde(rename = "questionSubDomainID")]
    pub sub_domain_id: u64,
    #[serde(rename = "questionDifficultyLevelID")]
    pub difficulty_id: u64,
    #[serde(rename = "questionFormatID")]
    pub format_id: u64,
    #[serde(rename = "questionFormat")]
    pub format_kind: String,
    pub question_count: u32,
    /// Zero (or absent) means the student has seen nothing yet.
    #[serde(rename = "lastAttemptedQuestionID", default)]
    pub last_attempted_id: u64,
}

/// A validated batch request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssueBatch {
    pub enrollment_no: EnrollmentNo,
    pub domain_id: DomainId,
    pub sub_domain_id: SubDomainId,
    pub difficulty_id: DifficultyId,
    pub format_id: FormatId,
    pub kind: FormatKind,
    pub count: QuestionCount,
    pub last_attempted: QuestionId,
}

impl IssueBatchRequest {
    /// # Errors
    ///
    /// Returns `ValidationError` for a malformed enrollment number, an unknown
    /// format kind, a count outside the allowed set, or an id past [`MAX_ID`].
    pub fn validate(self) -> Result<IssueBatch, ValidationError> {
        Ok(IssueBatch {
            enrollment_no: EnrollmentNo::parse(self.enrollment_no)?,
            domain_id: DomainId::new(checked_id("questionDomainID", self.domain_id)?),
            sub_domain_id: SubDomainId::new(checked_id(
                "questionSubDomainID",
                self.sub_domain_id,
            )?),
            difficulty_id: DifficultyId::new(checked_id(
                "questionDifficultyLevelID",
                self.difficulty_id,
            )?),
            format_id: FormatId::new(checked_id("questionFormatID", self.format_id)?),
            kind: self.format_kind.parse()?,
            count: QuestionCount::new(self.question_count)?,
            last_attempted: QuestionId::new(checked_id(
                "lastAttemptedQuestionID",
                self.last_attempted_id,
            )?),
        })
    }
}

/// Body of a graded session submit.
///
/// Counts and score are taken as the client computed them.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitSessionRequest {
    pub practice_session_id: u64,
    pub questions_attempted: i64,
    pub questions_correct: i64,
    #[serde(default)]
    pub feedbacks: String,
    pub score_earned_percentage: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SubmitSession {
    pub session_id: SessionId,
    pub grade: SessionGrade,
}

impl SubmitSessionRequest {
    /// # Errors
    ///
    /// Returns `ValidationError::Grade` for a non-finite score and
    /// `ValidationError::IdOutOfRange` for an id past [`MAX_ID`].
    pub fn validate(self) -> Result<SubmitSession, ValidationError> {
        Ok(SubmitSession {
            session_id: SessionId::new(checked_id(
                "practiceSessionId",
                self.practice_session_id,
            )?),
            grade: SessionGrade::new(
                self.questions_attempted,
                self.questions_correct,
                self.score_earned_percentage,
                self.feedbacks,
            )?,
        })
    }
}

/// Body of an abandon request.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForceEndSessionRequest {
    pub practice_session_id: u64,
    #[serde(default)]
    pub enrollment_no: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForceEndSession {
    pub session_id: SessionId,
    /// Carried for logging; ownership is not checked.
    pub enrollment_no: Option<EnrollmentNo>,
}

impl ForceEndSessionRequest {
    /// # Errors
    ///
    /// Returns `ValidationError::Enrollment` if an enrollment number is present
    /// but malformed, or `ValidationError::IdOutOfRange` for an id past
    /// [`MAX_ID`].
    pub fn validate(self) -> Result<ForceEndSession, ValidationError> {
        Ok(ForceEndSession {
            session_id: SessionId::new(checked_id(
                "practiceSessionId",
                self.practice_session_id,
            )?),
            enrollment_no: self.enrollment_no.map(EnrollmentNo::parse).transpose()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn batch_json(count: u32, format: &str) -> String {
        format!(
            r#"{{
                "enrollmentNo": "0801CS221001",
                "questionDomainID": 1,
                "questionSubDomainID": 2,
                "questionDifficultyLevelID": 3,
                "questionFormatID": 4,
                "questionFormat": "{format}",
                "questionCount": {count},
                "lastAttemptedQuestionID": 12
            }}"#
        )
    }

    #[test]
    fn issue_batch_request_parses_and_validates() {
        let req: IssueBatchRequest = serde_json::from_str(&batch_json(10, "MCQ")).unwrap();
        let batch = req.validate().unwrap();
        assert_eq!(batch.kind, FormatKind::MultipleChoice);
        assert_eq!(batch.count.get(), 10);
        assert_eq!(batch.format_id, FormatId::new(4));
        assert_eq!(batch.last_attempted, QuestionId::new(12));
    }

    #[test]
    fn issue_batch_rejects_bad_count_and_kind() {
        let req: IssueBatchRequest = serde_json::from_str(&batch_json(7, "MCQ")).unwrap();
        assert!(matches!(req.validate(), Err(ValidationError::Question(_))));

        let req: IssueBatchRequest = serde_json::from_str(&batch_json(10, "ESSAY")).unwrap();
        assert!(matches!(req.validate(), Err(ValidationError::Question(_))));
    }

    #[test]
    fn issue_batch_rejects_malformed_enrollment() {
        let mut req: IssueBatchRequest = serde_json::from_str(&batch_json(1, "TF")).unwrap();
        req.enrollment_no = "CS0801221001".into();
        assert!(matches!(req.validate(), Err(ValidationError::Enrollment(_))));
    }

    #[test]
    fn submit_accepts_counts_the_client_reports() {
        let req: SubmitSessionRequest = serde_json::from_str(
            r#"{"practiceSessionId": 9, "questionsAttempted": 8, "questionsCorrect": 6,
                "feedbacks": "ok", "scoreEarnedPercentage": 75.0}"#,
        )
        .unwrap();
        let submit = req.validate().unwrap();
        assert_eq!(submit.session_id, SessionId::new(9));
        assert_eq!(submit.grade.questions_attempted(), 8);
        assert_eq!(submit.grade.feedback(), "ok");
    }

    #[test]
    fn force_end_enrollment_is_optional() {
        let req: ForceEndSessionRequest =
            serde_json::from_str(r#"{"practiceSessionId": 3}"#).unwrap();
        let cmd = req.validate().unwrap();
        assert_eq!(cmd.session_id, SessionId::new(3));
        assert!(cmd.enrollment_no.is_none());
    }

    #[test]
    fn ids_past_the_signed_range_are_rejected() {
        let mut req: IssueBatchRequest = serde_json::from_str(&batch_json(10, "MCQ")).unwrap();
        req.last_attempted_id = u64::MAX;
        assert!(matches!(
            req.validate(),
            Err(ValidationError::IdOutOfRange {
                field: "lastAttemptedQuestionID",
                ..
            })
        ));

        let mut req: IssueBatchRequest = serde_json::from_str(&batch_json(10, "MCQ")).unwrap();
        req.domain_id = MAX_ID + 1;
        assert!(matches!(
            req.validate(),
            Err(ValidationError::IdOutOfRange { field: "questionDomainID", .. })
        ));

        let mut req: IssueBatchRequest = serde_json::from_str(&batch_json(10, "MCQ")).unwrap();
        req.format_id = MAX_ID;
        assert!(req.validate().is_ok());

        let req = SubmitSessionRequest {
            practice_session_id: u64::MAX,
            questions_attempted: 1,
            questions_correct: 1,
            feedbacks: String::new(),
            score_earned_percentage: 100.0,
        };
        assert!(matches!(
            req.validate(),
            Err(ValidationError::IdOutOfRange { .. })
        ));

        let req = ForceEndSessionRequest {
            practice_session_id: u64::MAX,
            enrollment_no: None,
        };
        assert!(matches!(
            req.validate(),
            Err(ValidationError::IdOutOfRange { .. })
        ));
    }
}
