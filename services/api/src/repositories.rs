//! Repositories for database operations

pub mod study_item;
pub mod user;

pub use study_item::StudyItemRepository;
pub use user::UserRepository;
