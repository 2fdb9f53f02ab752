use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use time::OffsetDateTime;

use crate::error::{Error, Result};
use crate::plan::progress::ProgressState;
use crate::plan::schedule::Schedule;

const SCHEMA: &[&str] = &["create table if not exists account (
        id integer primary key autoincrement,
        email text not null unique,
        password text not null,
        registration_date text not null,
        saved_schedule text not null default '{}',
        viewed_days text not null default '[]',
        watched_videos text not null default '{}',
        start_date text
    )"];

/// Create the planner tables if they do not exist yet.
pub async fn init_schema(pool: &SqlitePool) -> Result<()> {
    for statement in SCHEMA {
        sqlx::query(statement).execute(pool).await?;
    }
    Ok(())
}

/// The per-account plan document, loaded wholesale at session start and
/// written back field by field after each mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanDocument {
    /// Day buckets, string-keyed in storage and integer-keyed in core.
    pub saved_schedule: Schedule,
    pub viewed_days: Vec<u32>,
    pub watched_videos: BTreeMap<u32, Vec<usize>>,
    /// Absent until the first plan save.
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub start_date: Option<OffsetDateTime>,
    /// Write-once at account creation.
    #[serde(with = "time::serde::rfc3339")]
    pub registration_date: OffsetDateTime,
}

impl PlanDocument {
    pub fn progress(&self) -> ProgressState {
        ProgressState {
            start_date: self.start_date,
            viewed_days: self.viewed_days.iter().copied().collect(),
            watched: self.watched_videos.clone(),
        }
    }
}

/// Field-granular update for `PlanStore::save`: `None` fields are left
/// untouched in the stored document. Merge, not whole-document replace.
#[derive(Debug, Clone, Default)]
pub struct PlanPatch {
    pub saved_schedule: Option<Schedule>,
    pub viewed_days: Option<Vec<u32>>,
    pub watched_videos: Option<BTreeMap<u32, Vec<usize>>>,
    /// `Some(None)` explicitly clears the stored start date.
    pub start_date: Option<Option<OffsetDateTime>>,
}

impl PlanPatch {
    /// The progress fields of `progress`, leaving the schedule untouched.
    pub fn from_progress(progress: &ProgressState) -> Self {
        Self {
            saved_schedule: None,
            viewed_days: Some(progress.viewed_days.iter().copied().collect()),
            watched_videos: Some(progress.watched.clone()),
            start_date: Some(progress.start_date),
        }
    }

    /// Clears every plan field: schedule, progress and start date.
    pub fn delete_plan() -> Self {
        Self {
            saved_schedule: Some(Schedule::new()),
            viewed_days: Some(Vec::new()),
            watched_videos: Some(BTreeMap::new()),
            start_date: Some(None),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.saved_schedule.is_none()
            && self.viewed_days.is_none()
            && self.watched_videos.is_none()
            && self.start_date.is_none()
    }
}

/// Persistence contract for the per-account plan document.
///
/// `save` merges at top-level-field granularity and never writes partially:
/// a failed save leaves the stored document unchanged. Concurrent sessions
/// for one account race and the last save wins.
pub trait PlanStore: Send + Sync {
    fn load(&self, account_id: i64) -> impl Future<Output = Result<PlanDocument>> + Send;
    fn save(&self, account_id: i64, patch: PlanPatch) -> impl Future<Output = Result<()>> + Send;
}

/// Plan store on the account table: one row per account, JSON columns for
/// the mapping fields, a single `UPDATE` per save.
#[derive(Debug, Clone)]
pub struct SqlitePlanStore {
    pool: SqlitePool,
}

impl SqlitePlanStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct PlanRow {
    saved_schedule: String,
    viewed_days: String,
    watched_videos: String,
    start_date: Option<OffsetDateTime>,
    registration_date: OffsetDateTime,
}

impl TryFrom<PlanRow> for PlanDocument {
    type Error = Error;

    fn try_from(row: PlanRow) -> Result<Self> {
        let saved_schedule = serde_json::from_str(&row.saved_schedule)
            .map_err(|e| anyhow::anyhow!("corrupt saved_schedule field: {e}"))?;
        let viewed_days = serde_json::from_str(&row.viewed_days)
            .map_err(|e| anyhow::anyhow!("corrupt viewed_days field: {e}"))?;
        let watched_videos = serde_json::from_str(&row.watched_videos)
            .map_err(|e| anyhow::anyhow!("corrupt watched_videos field: {e}"))?;
        Ok(PlanDocument {
            saved_schedule,
            viewed_days,
            watched_videos,
            start_date: row.start_date,
            registration_date: row.registration_date,
        })
    }
}

impl PlanStore for SqlitePlanStore {
    async fn load(&self, account_id: i64) -> Result<PlanDocument> {
        let row = sqlx::query_as::<_, PlanRow>(
            "select saved_schedule, viewed_days, watched_videos, start_date, registration_date \
             from account where id = ?",
        )
        .bind(account_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| Error::NotFound(format!("no account document for id {account_id}")))?;
        row.try_into()
    }

    async fn save(&self, account_id: i64, patch: PlanPatch) -> Result<()> {
        if patch.is_empty() {
            return Ok(());
        }
        let saved_schedule = match &patch.saved_schedule {
            Some(schedule) => Some(
                serde_json::to_string(schedule)
                    .map_err(|e| anyhow::anyhow!("unencodable schedule: {e}"))?,
            ),
            None => None,
        };
        let viewed_days = match &patch.viewed_days {
            Some(days) => Some(
                serde_json::to_string(days)
                    .map_err(|e| anyhow::anyhow!("unencodable viewed days: {e}"))?,
            ),
            None => None,
        };
        let watched_videos = match &patch.watched_videos {
            Some(watched) => Some(
                serde_json::to_string(watched)
                    .map_err(|e| anyhow::anyhow!("unencodable watched videos: {e}"))?,
            ),
            None => None,
        };

        let mut builder = sqlx::QueryBuilder::<sqlx::Sqlite>::new("update account set ");
        {
            let mut fields = builder.separated(", ");
            if let Some(encoded) = saved_schedule {
                fields.push("saved_schedule = ").push_bind_unseparated(encoded);
            }
            if let Some(encoded) = viewed_days {
                fields.push("viewed_days = ").push_bind_unseparated(encoded);
            }
            if let Some(encoded) = watched_videos {
                fields.push("watched_videos = ").push_bind_unseparated(encoded);
            }
            if let Some(start_date) = patch.start_date {
                fields.push("start_date = ").push_bind_unseparated(start_date);
            }
        }
        builder.push(" where id = ").push_bind(account_id);

        let result = builder.build().execute(&self.pool).await?;
        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!(
                "no account document for id {account_id}"
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use super::*;
    use crate::account;
    use crate::plan::schedule::{Item, build_schedule};

    async fn test_store() -> (SqlitePlanStore, i64) {
        let pool = SqlitePool::connect("sqlite::memory:").await.unwrap();
        init_schema(&pool).await.unwrap();
        let account_id = account::create_account(&pool, "test@example.com", "secret")
            .await
            .unwrap();
        (SqlitePlanStore::new(pool), account_id)
    }

    fn sample_schedule() -> Schedule {
        let items: Vec<Item> = (0..7)
            .map(|i| Item {
                title: format!("video {i}"),
                length: 300 + i,
                url: format!("https://www.youtube.com/watch?v=vid{i}"),
            })
            .collect();
        build_schedule(&items, 3)
    }

    #[tokio::test]
    async fn load_unknown_account_is_not_found() {
        let (store, _) = test_store().await;
        assert!(matches!(store.load(999).await, Err(Error::NotFound(_))));
    }

    #[tokio::test]
    async fn new_account_has_empty_document() {
        let (store, id) = test_store().await;
        let doc = store.load(id).await.unwrap();
        assert!(doc.saved_schedule.is_empty());
        assert!(doc.viewed_days.is_empty());
        assert!(doc.watched_videos.is_empty());
        assert!(doc.start_date.is_none());
    }

    #[tokio::test]
    async fn schedule_round_trips_through_storage() {
        let (store, id) = test_store().await;
        let schedule = sample_schedule();
        let start = datetime!(2025-06-01 10:00 UTC);
        store
            .save(
                id,
                PlanPatch {
                    saved_schedule: Some(schedule.clone()),
                    viewed_days: Some(Vec::new()),
                    watched_videos: Some(BTreeMap::new()),
                    start_date: Some(Some(start)),
                },
            )
            .await
            .unwrap();

        let doc = store.load(id).await.unwrap();
        assert_eq!(doc.saved_schedule, schedule);
        assert_eq!(doc.start_date, Some(start));
    }

    #[tokio::test]
    async fn save_merges_at_field_granularity() {
        let (store, id) = test_store().await;
        let schedule = sample_schedule();
        store
            .save(
                id,
                PlanPatch {
                    saved_schedule: Some(schedule.clone()),
                    start_date: Some(Some(datetime!(2025-06-01 10:00 UTC))),
                    ..PlanPatch::default()
                },
            )
            .await
            .unwrap();

        // a watched-only patch must not touch the stored schedule
        let mut watched = BTreeMap::new();
        watched.insert(1, vec![0, 1]);
        store
            .save(
                id,
                PlanPatch {
                    watched_videos: Some(watched.clone()),
                    ..PlanPatch::default()
                },
            )
            .await
            .unwrap();

        let doc = store.load(id).await.unwrap();
        assert_eq!(doc.saved_schedule, schedule);
        assert_eq!(doc.watched_videos, watched);
        assert!(doc.start_date.is_some());
    }

    #[tokio::test]
    async fn delete_plan_clears_every_field() {
        let (store, id) = test_store().await;
        store
            .save(
                id,
                PlanPatch {
                    saved_schedule: Some(sample_schedule()),
                    viewed_days: Some(vec![1]),
                    watched_videos: Some(BTreeMap::from([(1, vec![0])])),
                    start_date: Some(Some(datetime!(2025-06-01 10:00 UTC))),
                },
            )
            .await
            .unwrap();

        store.save(id, PlanPatch::delete_plan()).await.unwrap();
        let doc = store.load(id).await.unwrap();
        assert!(doc.saved_schedule.is_empty());
        assert!(doc.viewed_days.is_empty());
        assert!(doc.watched_videos.is_empty());
        assert!(doc.start_date.is_none());
    }

    #[tokio::test]
    async fn save_to_unknown_account_is_not_found() {
        let (store, _) = test_store().await;
        let patch = PlanPatch {
            viewed_days: Some(vec![1]),
            ..PlanPatch::default()
        };
        assert!(matches!(store.save(999, patch).await, Err(Error::NotFound(_))));
    }

    #[tokio::test]
    async fn empty_patch_is_a_no_op() {
        let (store, id) = test_store().await;
        store.save(id, PlanPatch::default()).await.unwrap();
        let doc = store.load(id).await.unwrap();
        assert!(doc.saved_schedule.is_empty());
    }
}
