//! API models for request and response payloads

pub mod assistant;
pub mod insights;
pub mod study_item;

pub use assistant::{AskRequest, AskResponse, SummaryResponse};
pub use insights::{DashboardResponse, LeaderboardQuery, StreakSummary};
pub use study_item::{
    CompletionOutcome, CompletionResponse, CreateStudyItemRequest, ItemKind, ItemScope,
    StudyItem, StudyItemQuery, UpdateStudyItemRequest,
};
