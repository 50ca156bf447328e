//! Study item repository for database operations

use anyhow::{Context, Result, anyhow};
use chrono::NaiveDate;
use common::{StreakState, StreakTransition};
use sqlx::{PgPool, Row, postgres::PgRow};
use tracing::{debug, info};
use uuid::Uuid;

use crate::models::{CompletionOutcome, ItemKind, StudyItem, insights::ItemCounts};

const ITEM_COLUMNS: &str = "id, owner_id, title, description, kind, completed, completed_date, \
                            created_at, updated_at";

/// Changes applied by [`StudyItemRepository::update`]
#[derive(Debug, Clone, Default)]
pub struct ItemChanges {
    pub title: Option<String>,
    /// `Some(None)` clears the description
    pub description: Option<Option<String>>,
}

/// Study item repository for database operations
#[derive(Clone)]
pub struct StudyItemRepository {
    pool: PgPool,
}

fn item_from_row(row: &PgRow) -> Result<StudyItem> {
    let kind: String = row.try_get("kind")?;
    Ok(StudyItem {
        id: row.try_get("id")?,
        owner_id: row.try_get("owner_id")?,
        title: row.try_get("title")?,
        description: row.try_get("description")?,
        kind: kind.parse().map_err(|e: String| anyhow!(e))?,
        completed: row.try_get("completed")?,
        completed_date: row.try_get("completed_date")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

impl StudyItemRepository {
    /// Create a new study item repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a new incomplete item
    pub async fn create(
        &self,
        owner_id: Uuid,
        kind: ItemKind,
        title: &str,
        description: Option<&str>,
    ) -> Result<StudyItem> {
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO study_items (owner_id, kind, title, description)
            VALUES ($1, $2, $3, $4)
            RETURNING {ITEM_COLUMNS}
            "#
        ))
        .bind(owner_id)
        .bind(kind.as_str())
        .bind(title)
        .bind(description)
        .fetch_one(&self.pool)
        .await
        .context("Failed to insert study item")?;

        item_from_row(&row)
    }

    /// Items owned by `owner_id`, newest first
    pub async fn list(&self, owner_id: Uuid, kind: Option<ItemKind>) -> Result<Vec<StudyItem>> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {ITEM_COLUMNS}
            FROM study_items
            WHERE owner_id = $1 AND ($2::text IS NULL OR kind = $2)
            ORDER BY created_at DESC, id
            "#
        ))
        .bind(owner_id)
        .bind(kind.map(|k| k.as_str()))
        .fetch_all(&self.pool)
        .await
        .context("Failed to list study items")?;

        rows.iter().map(item_from_row).collect()
    }

    /// Find an owned item
    pub async fn find(
        &self,
        owner_id: Uuid,
        id: Uuid,
        kind: Option<ItemKind>,
    ) -> Result<Option<StudyItem>> {
        let row = sqlx::query(&format!(
            r#"
            SELECT {ITEM_COLUMNS}
            FROM study_items
            WHERE id = $1 AND owner_id = $2 AND ($3::text IS NULL OR kind = $3)
            "#
        ))
        .bind(id)
        .bind(owner_id)
        .bind(kind.map(|k| k.as_str()))
        .fetch_optional(&self.pool)
        .await
        .context("Failed to load study item")?;

        row.as_ref().map(item_from_row).transpose()
    }

    /// Update title and/or description of an owned item
    pub async fn update(
        &self,
        owner_id: Uuid,
        id: Uuid,
        kind: Option<ItemKind>,
        changes: &ItemChanges,
    ) -> Result<Option<StudyItem>> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE study_items
            SET title = COALESCE($4, title),
                description = CASE WHEN $5 THEN $6 ELSE description END,
                updated_at = NOW()
            WHERE id = $1 AND owner_id = $2 AND ($3::text IS NULL OR kind = $3)
            RETURNING {ITEM_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(owner_id)
        .bind(kind.map(|k| k.as_str()))
        .bind(changes.title.as_deref())
        .bind(changes.description.is_some())
        .bind(changes.description.clone().flatten())
        .fetch_optional(&self.pool)
        .await
        .context("Failed to update study item")?;

        row.as_ref().map(item_from_row).transpose()
    }

    /// Delete an owned item, returning whether it existed
    pub async fn delete(&self, owner_id: Uuid, id: Uuid, kind: Option<ItemKind>) -> Result<bool> {
        let result = sqlx::query(
            r#"
            DELETE FROM study_items
            WHERE id = $1 AND owner_id = $2 AND ($3::text IS NULL OR kind = $3)
            "#,
        )
        .bind(id)
        .bind(owner_id)
        .bind(kind.map(|k| k.as_str()))
        .execute(&self.pool)
        .await
        .context("Failed to delete study item")?;

        Ok(result.rows_affected() > 0)
    }

    /// Per-kind totals for the dashboard
    pub async fn counts(&self, owner_id: Uuid) -> Result<ItemCounts> {
        let row = sqlx::query(
            r#"
            SELECT
                COUNT(*) FILTER (WHERE kind = 'task') AS total_tasks,
                COUNT(*) FILTER (WHERE kind = 'task' AND completed) AS completed_tasks,
                COUNT(*) FILTER (WHERE kind = 'plan') AS total_plans,
                COUNT(*) FILTER (WHERE kind = 'plan' AND completed) AS completed_plans
            FROM study_items
            WHERE owner_id = $1
            "#,
        )
        .bind(owner_id)
        .fetch_one(&self.pool)
        .await
        .context("Failed to count study items")?;

        Ok(ItemCounts {
            total_tasks: row.try_get("total_tasks")?,
            completed_tasks: row.try_get("completed_tasks")?,
            total_plans: row.try_get("total_plans")?,
            completed_plans: row.try_get("completed_plans")?,
        })
    }

    /// Mark an owned item complete and advance the owner's streak for tasks
    ///
    /// Runs in one transaction. The owner's row is locked first, so
    /// concurrent completions by the same user are applied one after the
    /// other and each sees the streak written by the previous one. Returns
    /// `None` when the item does not exist for this owner.
    pub async fn complete(
        &self,
        owner_id: Uuid,
        id: Uuid,
        kind: Option<ItemKind>,
        today: NaiveDate,
    ) -> Result<Option<CompletionOutcome>> {
        let mut tx = self.pool.begin().await.context("Failed to begin transaction")?;

        let user = sqlx::query(
            r#"
            SELECT current_streak, last_completed_date
            FROM users
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(owner_id)
        .fetch_optional(&mut *tx)
        .await
        .context("Failed to lock user row")?;

        let Some(user) = user else {
            return Ok(None);
        };
        let streak = StreakState::from_stored(
            user.try_get("current_streak")?,
            user.try_get("last_completed_date")?,
        );

        let item = sqlx::query(
            r#"
            SELECT kind, completed
            FROM study_items
            WHERE id = $1 AND owner_id = $2 AND ($3::text IS NULL OR kind = $3)
            FOR UPDATE
            "#,
        )
        .bind(id)
        .bind(owner_id)
        .bind(kind.map(|k| k.as_str()))
        .fetch_optional(&mut *tx)
        .await
        .context("Failed to lock study item")?;

        let Some(item) = item else {
            return Ok(None);
        };
        if item.try_get::<bool, _>("completed")? {
            debug!("Item {} already completed", id);
            return Ok(Some(CompletionOutcome::AlreadyCompleted { streak }));
        }
        let item_kind: ItemKind = item
            .try_get::<String, _>("kind")?
            .parse()
            .map_err(|e: String| anyhow!(e))?;

        sqlx::query(
            r#"
            UPDATE study_items
            SET completed = TRUE, completed_date = $2, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(today)
        .execute(&mut *tx)
        .await
        .context("Failed to mark study item completed")?;

        let (streak, transition) = if item_kind.counts_towards_streak() {
            let (next, transition) = streak.apply(today);
            if transition != StreakTransition::Unchanged {
                sqlx::query(
                    r#"
                    UPDATE users
                    SET current_streak = $2, last_completed_date = $3, updated_at = NOW()
                    WHERE id = $1
                    "#,
                )
                .bind(owner_id)
                .bind(next.stored_streak())
                .bind(next.last_completed_date)
                .execute(&mut *tx)
                .await
                .context("Failed to store streak")?;
            }
            info!(
                "User {} streak {:?}: {} -> {}",
                owner_id, transition, streak.current_streak, next.current_streak
            );
            (next, Some(transition))
        } else {
            (streak, None)
        };

        tx.commit().await.context("Failed to commit completion")?;

        Ok(Some(CompletionOutcome::Completed {
            kind: item_kind,
            streak,
            transition,
        }))
    }
}


#[cfg(test)]
mod tests {
    //! Completion against a live database. Ignored by default:
    //! `cargo test -p api -- --ignored`.

    use super::*;
    use crate::repositories::UserRepository;
    use common::database::{DatabaseConfig, init_pool, run_migrations};

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    fn streak(current_streak: u32, last: NaiveDate) -> StreakState {
        StreakState {
            current_streak,
            last_completed_date: Some(last),
        }
    }

    async fn create_user(pool: &PgPool) -> Result<Uuid> {
        let row = sqlx::query(
            "INSERT INTO users (email, password_hash) VALUES ($1, 'unused') RETURNING id",
        )
        .bind(format!("completion_{}@test.com", Uuid::new_v4()))
        .fetch_one(pool)
        .await?;
        Ok(row.try_get::<Uuid, _>("id")?)
    }

    #[tokio::test]
    #[ignore = "requires a running PostgreSQL instance"]
    async fn test_complete_advances_streak_in_one_transaction() -> Result<()> {
        let pool = init_pool(&DatabaseConfig::from_env()?).await?;
        run_migrations(&pool).await?;

        let items = StudyItemRepository::new(pool.clone());
        let users = UserRepository::new(pool.clone());
        let owner = create_user(&pool).await?;
        let task_kind = Some(ItemKind::Task);

        let first = items.create(owner, ItemKind::Task, "Read chapter 1", None).await?;
        let plan = items.create(owner, ItemKind::Plan, "Exam week", None).await?;
        let second = items.create(owner, ItemKind::Task, "Read chapter 2", None).await?;

        assert_eq!(
            items.complete(owner, first.id, task_kind, date(10)).await?,
            Some(CompletionOutcome::Completed {
                kind: ItemKind::Task,
                streak: streak(1, date(10)),
                transition: Some(StreakTransition::Started),
            })
        );

        // Completing twice changes nothing
        assert_eq!(
            items.complete(owner, first.id, None, date(11)).await?,
            Some(CompletionOutcome::AlreadyCompleted {
                streak: streak(1, date(10)),
            })
        );

        // Plans do not count towards the streak
        assert_eq!(
            items.complete(owner, plan.id, Some(ItemKind::Plan), date(11)).await?,
            Some(CompletionOutcome::Completed {
                kind: ItemKind::Plan,
                streak: streak(1, date(10)),
                transition: None,
            })
        );

        // A task is invisible through the plan routes and stays incomplete
        assert_eq!(
            items.complete(owner, second.id, Some(ItemKind::Plan), date(11)).await?,
            None
        );
        assert!(!items.find(owner, second.id, None).await?.unwrap().completed);

        // Items of another user are not found
        let stranger = create_user(&pool).await?;
        assert_eq!(items.complete(stranger, second.id, None, date(11)).await?, None);

        assert_eq!(
            items.complete(owner, second.id, task_kind, date(11)).await?,
            Some(CompletionOutcome::Completed {
                kind: ItemKind::Task,
                streak: streak(2, date(11)),
                transition: Some(StreakTransition::Extended),
            })
        );

        // Same-day completions are serialized on the owner's row
        let mut handles = Vec::new();
        for n in 0..8 {
            let item = items
                .create(owner, ItemKind::Task, &format!("Exercise {}", n), None)
                .await?;
            let items = items.clone();
            handles.push(tokio::spawn(async move {
                items.complete(owner, item.id, task_kind, date(12)).await
            }));
        }

        let mut extended = 0;
        let mut unchanged = 0;
        for handle in handles {
            match handle.await?? {
                Some(CompletionOutcome::Completed {
                    transition: Some(StreakTransition::Extended),
                    ..
                }) => extended += 1,
                Some(CompletionOutcome::Completed {
                    transition: Some(StreakTransition::Unchanged),
                    streak: current,
                    ..
                }) => {
                    assert_eq!(current, streak(3, date(12)));
                    unchanged += 1;
                }
                other => panic!("unexpected outcome {:?}", other),
            }
        }
        assert_eq!((extended, unchanged), (1, 7));
        assert_eq!(users.streak(owner).await?, Some(streak(3, date(12))));

        // A gap resets the streak to one
        let late = items.create(owner, ItemKind::Task, "Catch up", None).await?;
        items.complete(owner, late.id, task_kind, date(20)).await?;
        assert_eq!(users.streak(owner).await?, Some(streak(1, date(20))));

        sqlx::query("DELETE FROM users WHERE id = ANY($1)")
            .bind(vec![owner, stranger])
            .execute(&pool)
            .await?;
        Ok(())
    }
}
