use serde::Serialize;
use sqlx::SqlitePool;
use time::OffsetDateTime;
use tracing::{info, warn};
use utoipa::ToSchema;

use crate::ai;
use crate::catalog::{self, CatalogClient, Link};
use crate::error::{Error, Result};
use crate::material::{self, ItemMaterial};
use crate::plan::progress::{DayStatus, ProgressState};
use crate::plan::schedule::{self, Item, Schedule};
use crate::store::{PlanDocument, PlanPatch, PlanStore};
use crate::transcript::TranscriptService;

/// The planner backend: the plan store plus the upstream collaborators,
/// injected once and shared by every session. Each operation loads the
/// account document wholesale, applies one user action and writes the
/// touched fields back; nothing runs in the background.
pub struct Planner<S: PlanStore> {
    pub pool: SqlitePool,
    store: S,
    catalog: CatalogClient,
    transcripts: TranscriptService,
}

/// Preview of a submitted link, shown before the plan is saved.
#[derive(Debug, Serialize, ToSchema)]
pub struct LinkPreview {
    pub video_count: usize,
    pub total_hours: f64,
    pub first_titles: Vec<String>,
}

impl LinkPreview {
    pub fn new(items: &[Item]) -> Self {
        Self {
            video_count: items.len(),
            total_hours: material::duration_hours(schedule::total_seconds(items)),
            first_titles: items.iter().take(5).map(|item| item.title.clone()).collect(),
        }
    }
}

/// One day of the plan as the user sees it.
#[derive(Debug, Serialize, ToSchema)]
pub struct DayView {
    pub day: u32,
    pub status: DayStatus,
    pub items: Vec<Item>,
    /// Watched item indices, a prefix of `items`.
    pub watched: Vec<usize>,
    pub total: usize,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DaySummary {
    pub day: u32,
    pub status: DayStatus,
    pub watched: usize,
    pub total: usize,
}

/// Whole-plan statistics for the profile page.
#[derive(Debug, Serialize, ToSchema)]
pub struct PlanOverview {
    pub current_day: u32,
    pub total_days: usize,
    pub viewed_days: usize,
    pub days: Vec<DaySummary>,
}

impl<S: PlanStore> Planner<S> {
    pub fn new(
        pool: SqlitePool,
        store: S,
        catalog: CatalogClient,
        transcripts: TranscriptService,
    ) -> Self {
        Self {
            pool,
            store,
            catalog,
            transcripts,
        }
    }

    /// Resolve a pasted link into its ordered item list.
    pub async fn submit_link(&self, url: &str) -> Result<Vec<Item>> {
        let items = match catalog::parse_link(url)? {
            Link::Playlist(id) => self.catalog.fetch_playlist(&id).await?,
            Link::Video(id) => vec![self.catalog.fetch_video(&id).await?],
        };
        if items.is_empty() {
            return Err(Error::NotFound("the playlist has no videos".to_string()));
        }
        Ok(items)
    }

    /// Save a new study plan: schedule the items, fix the start date and
    /// clear all previous progress. The old schedule is replaced wholesale,
    /// never merged.
    pub async fn save_plan(&self, account_id: i64, items: &[Item], days: u32) -> Result<Schedule> {
        if days == 0 {
            return Err(Error::InvalidInput("day count must be positive".to_string()));
        }
        if items.is_empty() {
            return Err(Error::InvalidInput(
                "no fetched videos to schedule".to_string(),
            ));
        }
        let schedule = schedule::build_schedule(items, days);
        self.store
            .save(
                account_id,
                PlanPatch {
                    saved_schedule: Some(schedule.clone()),
                    viewed_days: Some(Vec::new()),
                    watched_videos: Some(Default::default()),
                    start_date: Some(Some(OffsetDateTime::now_utc())),
                },
            )
            .await?;
        info!("saved a {days}-day plan with {} videos for account {account_id}", items.len());
        Ok(schedule)
    }

    /// The current day's videos and watch state.
    pub async fn today(&self, account_id: i64) -> Result<DayView> {
        let doc = self.load_active(account_id).await?;
        let progress = doc.progress();
        let current_day = progress.current_day(OffsetDateTime::now_utc());
        Ok(day_view(&doc.saved_schedule, &progress, current_day, current_day))
    }

    /// Every day's status plus plan statistics.
    pub async fn overview(&self, account_id: i64) -> Result<PlanOverview> {
        let doc = self.load_active(account_id).await?;
        let progress = doc.progress();
        let current_day = progress.current_day(OffsetDateTime::now_utc());
        let days = doc
            .saved_schedule
            .keys()
            .map(|&day| {
                let (watched, total) = progress.day_completion(&doc.saved_schedule, day);
                DaySummary {
                    day,
                    status: progress.day_status(&doc.saved_schedule, day, current_day),
                    watched,
                    total,
                }
            })
            .collect();
        Ok(PlanOverview {
            current_day,
            total_days: doc.saved_schedule.len(),
            viewed_days: doc.viewed_days.len(),
            days,
        })
    }

    /// Open a day: allowed once the current day reaches it, recorded in the
    /// viewed set.
    pub async fn view_day(&self, account_id: i64, day: u32) -> Result<DayView> {
        let doc = self.load_active(account_id).await?;
        let mut progress = doc.progress();
        let current_day = progress.current_day(OffsetDateTime::now_utc());
        if !ProgressState::is_day_unlocked(day, current_day) {
            return Err(Error::PermissionDenied(format!("day {day} is still locked")));
        }
        if !doc.saved_schedule.contains_key(&day) {
            return Err(Error::NotFound(format!("no schedule entry for day {day}")));
        }
        if progress.view_day(day) {
            self.store
                .save(account_id, PlanPatch::from_progress(&progress))
                .await?;
        }
        Ok(day_view(&doc.saved_schedule, &progress, day, current_day))
    }

    /// Mark one video of an unlocked day as watched. Re-marking a watched
    /// video changes nothing; marks ahead of the sequential unlock are
    /// rejected as no-ops.
    pub async fn mark_watched(&self, account_id: i64, day: u32, index: usize) -> Result<DayView> {
        let doc = self.load_active(account_id).await?;
        let mut progress = doc.progress();
        let current_day = progress.current_day(OffsetDateTime::now_utc());
        if !ProgressState::is_day_unlocked(day, current_day) {
            return Err(Error::PermissionDenied(format!("day {day} is still locked")));
        }
        if progress.mark_watched(&doc.saved_schedule, day, index)? {
            self.store
                .save(account_id, PlanPatch::from_progress(&progress))
                .await?;
        }
        Ok(day_view(&doc.saved_schedule, &progress, day, current_day))
    }

    /// Clear watch progress; the schedule and its start date survive.
    pub async fn reset_progress(&self, account_id: i64) -> Result<()> {
        let doc = self.load_active(account_id).await?;
        let mut progress = doc.progress();
        progress.reset();
        self.store
            .save(account_id, PlanPatch::from_progress(&progress))
            .await
    }

    /// Drop the schedule and all progress together.
    pub async fn delete_plan(&self, account_id: i64) -> Result<()> {
        self.store.save(account_id, PlanPatch::delete_plan()).await
    }

    /// Build the study document for an unlocked day: transcript, summary
    /// and quiz per video, fetched strictly one video after another. A
    /// missing upstream source degrades that block to its placeholder.
    pub async fn day_material(&self, account_id: i64, day: u32) -> Result<String> {
        let doc = self.load_active(account_id).await?;
        let progress = doc.progress();
        let current_day = progress.current_day(OffsetDateTime::now_utc());
        if !ProgressState::is_day_unlocked(day, current_day) {
            return Err(Error::PermissionDenied(format!("day {day} is still locked")));
        }
        let items = doc
            .saved_schedule
            .get(&day)
            .ok_or_else(|| Error::NotFound(format!("no schedule entry for day {day}")))?;
        if items.is_empty() {
            return Err(Error::NotFound(format!("no videos scheduled for day {day}")));
        }

        let mut materials = Vec::with_capacity(items.len());
        for item in items {
            materials.push(self.item_material(item).await);
        }
        Ok(material::render_day_material(day, items, &materials))
    }

    async fn item_material(&self, item: &Item) -> ItemMaterial {
        let Some(video_id) = catalog::extract_video_id(&item.url) else {
            warn!("no video id in stored url {}", item.url);
            return ItemMaterial::default();
        };
        let transcript = match self.transcripts.fetch_transcript(&video_id).await {
            Ok(text) => text,
            Err(e) => {
                warn!("transcript unavailable for '{}': {e}", item.title);
                return ItemMaterial::default();
            }
        };
        let summary = match ai::summarize(&transcript).await {
            Ok(summary) => Some(summary),
            Err(e) => {
                warn!("summary generation failed for '{}': {e}", item.title);
                None
            }
        };
        let quiz = match ai::generate_quiz(&transcript).await {
            Ok(quiz) => Some(quiz),
            Err(e) => {
                warn!("quiz generation failed for '{}': {e}", item.title);
                None
            }
        };
        ItemMaterial {
            transcript: Some(transcript),
            summary,
            quiz,
        }
    }

    async fn load_active(&self, account_id: i64) -> Result<PlanDocument> {
        let doc = self.store.load(account_id).await?;
        if doc.saved_schedule.is_empty() {
            return Err(Error::NotFound("no active study plan".to_string()));
        }
        Ok(doc)
    }
}

fn day_view(schedule: &Schedule, progress: &ProgressState, day: u32, current_day: u32) -> DayView {
    let items = schedule.get(&day).cloned().unwrap_or_default();
    let watched = progress.watched.get(&day).cloned().unwrap_or_default();
    let total = items.len();
    DayView {
        day,
        status: progress.day_status(schedule, day, current_day),
        items,
        watched,
        total,
    }
}
