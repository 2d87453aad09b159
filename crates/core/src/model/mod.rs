mod enrollment;
mod hierarchy;
mod ids;
mod question;
mod session;

pub use enrollment::{EnrollmentError, EnrollmentNo};
pub use hierarchy::{DifficultyLevel, Domain, Niche, QuestionFormat, QuestionHierarchy, SubDomain};
pub use ids::{
    DifficultyId, DomainId, FormatId, NicheId, ParseIdError, QuestionId, SessionId, SubDomainId,
};
pub use question::{
    FillInBlankQuestion, FormatKind, McqQuestion, QuestionBase, QuestionCount, QuestionError,
    QuestionParts, QuestionShape, TextQuestion, TrueFalseQuestion, MCQ_OPTION_COUNT,
};
pub use session::{
    GradeError, NewPracticeSession, ParseStatusError, PracticeSession, SessionGrade, SessionStatus,
    SessionStatusRecord, UNGRADED,
};
