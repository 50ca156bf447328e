//! Study item models for the API service

use std::{fmt, str::FromStr};

use chrono::{DateTime, NaiveDate, Utc};
use common::{StreakState, StreakTransition};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const MAX_TITLE_CHARS: usize = 200;
pub const MAX_DESCRIPTION_CHARS: usize = 2000;

/// Kind of study item. Only tasks count towards the streak.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    Task,
    Plan,
}

impl ItemKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemKind::Task => "task",
            ItemKind::Plan => "plan",
        }
    }

    /// Whether completing an item of this kind advances the streak
    pub fn counts_towards_streak(&self) -> bool {
        matches!(self, ItemKind::Task)
    }
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ItemKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "task" => Ok(ItemKind::Task),
            "plan" => Ok(ItemKind::Plan),
            _ => Err("type must be either 'task' or 'plan'".to_string()),
        }
    }
}

/// Which items a route operates on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemScope {
    /// `/study-items`
    Any,
    /// `/tasks` or `/plans`
    Only(ItemKind),
}

impl ItemScope {
    /// Kind filter for repository queries
    pub fn kind(&self) -> Option<ItemKind> {
        match self {
            ItemScope::Any => None,
            ItemScope::Only(kind) => Some(*kind),
        }
    }

    /// Narrow the scope with an optional `type` parameter
    pub fn narrow(&self, requested: Option<&str>) -> Result<ItemScope, String> {
        let Some(requested) = requested else {
            return Ok(*self);
        };
        let kind = requested.parse::<ItemKind>()?;
        match self {
            ItemScope::Any => Ok(ItemScope::Only(kind)),
            ItemScope::Only(own) if *own == kind => Ok(*self),
            ItemScope::Only(own) => Err(format!("type must be '{}' on this route", own)),
        }
    }

    /// Kind of a newly created item
    pub fn kind_for_create(&self, requested: Option<&str>) -> Result<ItemKind, String> {
        self.narrow(requested)?
            .kind()
            .ok_or_else(|| "type is required and must be either 'task' or 'plan'".to_string())
    }
}

/// Study item model
#[derive(Debug, Clone, Serialize)]
pub struct StudyItem {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub kind: ItemKind,
    pub completed: bool,
    pub completed_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Request body for item creation
#[derive(Debug, Clone, Deserialize)]
pub struct CreateStudyItemRequest {
    pub title: String,
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

/// Request body for item updates
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateStudyItemRequest {
    pub title: Option<String>,
    pub description: Option<String>,
}

/// Query parameters for item listing
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StudyItemQuery {
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

/// Trim and check a title
pub fn validate_title(title: &str) -> Result<String, String> {
    let title = title.trim();
    if title.is_empty() {
        return Err("title must not be empty".to_string());
    }
    if title.chars().count() > MAX_TITLE_CHARS {
        return Err(format!(
            "title must be at most {} characters",
            MAX_TITLE_CHARS
        ));
    }
    Ok(title.to_string())
}

/// Check a description. Blank descriptions are stored as NULL.
pub fn validate_description(description: Option<&str>) -> Result<Option<String>, String> {
    let Some(description) = description.map(str::trim).filter(|d| !d.is_empty()) else {
        return Ok(None);
    };
    if description.chars().count() > MAX_DESCRIPTION_CHARS {
        return Err(format!(
            "description must be at most {} characters",
            MAX_DESCRIPTION_CHARS
        ));
    }
    Ok(Some(description.to_string()))
}

/// Result of a completion attempt on an owned item
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompletionOutcome {
    /// The item was already complete; nothing changed
    AlreadyCompleted { streak: StreakState },
    /// The item was marked complete
    Completed {
        kind: ItemKind,
        streak: StreakState,
        transition: Option<StreakTransition>,
    },
}

/// Body returned by the complete endpoints
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompletionResponse {
    pub message: String,
    pub current_streak: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_completed_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub streak_transition: Option<StreakTransition>,
}

impl From<CompletionOutcome> for CompletionResponse {
    fn from(outcome: CompletionOutcome) -> Self {
        match outcome {
            CompletionOutcome::AlreadyCompleted { streak } => Self {
                message: "Item already completed".to_string(),
                current_streak: streak.current_streak,
                last_completed_date: None,
                streak_transition: None,
            },
            CompletionOutcome::Completed {
                streak, transition, ..
            } => Self {
                message: "Item completed".to_string(),
                current_streak: streak.current_streak,
                last_completed_date: streak.last_completed_date,
                streak_transition: transition,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_kind_parsing() {
        assert_eq!("task".parse::<ItemKind>(), Ok(ItemKind::Task));
        assert_eq!("plan".parse::<ItemKind>(), Ok(ItemKind::Plan));
        assert!("Task".parse::<ItemKind>().is_err());
        assert!("goal".parse::<ItemKind>().is_err());
        assert!(ItemKind::Task.counts_towards_streak());
        assert!(!ItemKind::Plan.counts_towards_streak());
    }

    #[test]
    fn test_scope_narrowing() {
        assert_eq!(ItemScope::Any.narrow(None), Ok(ItemScope::Any));
        assert_eq!(
            ItemScope::Any.narrow(Some("plan")),
            Ok(ItemScope::Only(ItemKind::Plan))
        );
        assert!(ItemScope::Any.narrow(Some("other")).is_err());

        let tasks = ItemScope::Only(ItemKind::Task);
        assert_eq!(tasks.narrow(Some("task")), Ok(tasks));
        assert!(tasks.narrow(Some("plan")).is_err());
    }

    #[test]
    fn test_kind_for_create() {
        assert!(ItemScope::Any.kind_for_create(None).is_err());
        assert_eq!(
            ItemScope::Any.kind_for_create(Some("task")),
            Ok(ItemKind::Task)
        );
        assert_eq!(
            ItemScope::Only(ItemKind::Plan).kind_for_create(None),
            Ok(ItemKind::Plan)
        );
    }

    #[test]
    fn test_title_validation() {
        assert_eq!(validate_title("  Read chapter 3 "), Ok("Read chapter 3".into()));
        assert!(validate_title("   ").is_err());
        assert!(validate_title(&"a".repeat(MAX_TITLE_CHARS)).is_ok());
        assert!(validate_title(&"a".repeat(MAX_TITLE_CHARS + 1)).is_err());
        // Counted in characters, not bytes
        assert!(validate_title(&"é".repeat(MAX_TITLE_CHARS)).is_ok());
    }

    #[test]
    fn test_description_validation() {
        assert_eq!(validate_description(None), Ok(None));
        assert_eq!(validate_description(Some("  ")), Ok(None));
        assert_eq!(validate_description(Some(" notes ")), Ok(Some("notes".into())));
        assert!(validate_description(Some(&"x".repeat(MAX_DESCRIPTION_CHARS + 1))).is_err());
    }

    #[test]
    fn test_completion_response_for_task() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 2).unwrap();
        let response = CompletionResponse::from(CompletionOutcome::Completed {
            kind: ItemKind::Task,
            streak: StreakState {
                current_streak: 2,
                last_completed_date: Some(date),
            },
            transition: Some(StreakTransition::Extended),
        });

        assert_eq!(
            serde_json::to_value(response).unwrap(),
            json!({
                "message": "Item completed",
                "current_streak": 2,
                "last_completed_date": "2024-03-02",
                "streak_transition": "extended",
            })
        );
    }

    #[test]
    fn test_completion_response_for_plan_omits_transition() {
        let response = CompletionResponse::from(CompletionOutcome::Completed {
            kind: ItemKind::Plan,
            streak: StreakState::default(),
            transition: None,
        });
        let value = serde_json::to_value(response).unwrap();

        assert_eq!(value["message"], "Item completed");
        assert_eq!(value["current_streak"], 0);
        assert!(value.get("streak_transition").is_none());
    }

    #[test]
    fn test_already_completed_response() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 2).unwrap();
        let response = CompletionResponse::from(CompletionOutcome::AlreadyCompleted {
            streak: StreakState {
                current_streak: 4,
                last_completed_date: Some(date),
            },
        });

        assert_eq!(
            serde_json::to_value(response).unwrap(),
            json!({"message": "Item already completed", "current_streak": 4})
        );
    }

    #[test]
    fn test_item_serializes_kind_as_type() {
        let item = StudyItem {
            id: Uuid::new_v4(),
            owner_id: Uuid::new_v4(),
            title: "Revise".into(),
            description: None,
            kind: ItemKind::Plan,
            completed: false,
            completed_date: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let value = serde_json::to_value(item).unwrap();

        assert_eq!(value["type"], "plan");
        assert!(value.get("kind").is_none());
    }
}
