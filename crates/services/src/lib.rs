#![forbid(unsafe_code)]

pub mod app_services;
pub mod error;
pub mod hierarchy_service;
pub mod practice;
pub mod request;

pub use portal_core::Clock;

pub use app_services::AppServices;
pub use error::{AppServicesError, HierarchyError, SessionError, ValidationError};
pub use hierarchy_service::HierarchyService;
pub use practice::{
    IssuedBatch, PracticeConfig, PracticeSessionService, QuestionBatch, QuestionSelector,
};
pub use request::{
    ForceEndSession, ForceEndSessionRequest, IssueBatch, IssueBatchRequest, MAX_ID,
    SubmitSession, SubmitSessionRequest, checked_id,
};
