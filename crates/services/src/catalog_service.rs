use std::sync::Arc;

use lesson_core::hierarchy::{self, Hierarchy};
use lesson_core::model::{Lesson, LessonId, LessonRecord, ProgressEntry};
use lesson_core::playback::LessonSource;
use serde::Serialize;

use crate::error::CatalogError;
use crate::progress_service::{ProgressService, completion_rollup, entries_by_id};

//
// ─── VIEWS ─────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LessonOverview {
    pub id: LessonId,
    pub name: String,
    pub duration_minutes: u32,
    pub percent_watched: u8,
    pub seconds_watched: f64,
    pub completed: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleOverview {
    pub name: String,
    pub cover: Option<String>,
    pub total_duration_minutes: u32,
    pub percent_complete: u8,
    pub lessons: Vec<LessonOverview>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AreaOverview {
    pub name: String,
    pub cover: Option<String>,
    pub lesson_count: usize,
    pub percent_complete: u8,
    pub modules: Vec<ModuleOverview>,
}

/// The content tree annotated with progress at every level.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogOverview {
    pub total_areas: usize,
    pub total_modules: usize,
    pub total_lessons: usize,
    pub percent_complete: u8,
    pub areas: Vec<AreaOverview>,
}

/// A recently watched lesson that still exists in the catalog.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContinueWatching {
    pub lesson_id: LessonId,
    pub name: String,
    pub module: String,
    pub area: String,
    pub progress: ProgressEntry,
}

//
// ─── SERVICE ───────────────────────────────────────────────────────────────────
//

/// Parse a JSON array of lesson records.
///
/// # Errors
///
/// Returns `CatalogError::Parse` if the input is not a JSON array of objects.
pub fn parse_records(json: &str) -> Result<Vec<LessonRecord>, CatalogError> {
    Ok(serde_json::from_str(json)?)
}

/// Builds the content tree and joins it with stored progress.
#[derive(Clone)]
pub struct CatalogService {
    progress: Arc<ProgressService>,
}

impl CatalogService {
    #[must_use]
    pub fn new(progress: Arc<ProgressService>) -> Self {
        Self { progress }
    }

    /// Group raw records into the Area → Module → Lesson tree.
    #[must_use]
    pub fn build(&self, records: &[LessonRecord]) -> Hierarchy {
        let tree = hierarchy::build(records);
        tracing::info!(
            areas = tree.total_areas,
            modules = tree.total_modules,
            lessons = tree.total_lessons,
            "catalog built"
        );
        tree
    }

    /// Annotate every node of `tree` with its completion rollup.
    ///
    /// All entries are fetched in one repository call. Each rollup counts the
    /// distinct lessons under its node, the same way `ProgressService::rollup`
    /// does.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Progress` if progress cannot be read.
    pub async fn overview(&self, tree: &Hierarchy) -> Result<CatalogOverview, CatalogError> {
        let ids: Vec<LessonId> = tree.lessons().map(|l| l.id().clone()).collect();
        let entries = entries_by_id(self.progress.get_many(&ids).await?);

        let areas = tree
            .areas
            .iter()
            .map(|area| {
                let modules = area
                    .modules()
                    .iter()
                    .map(|module| ModuleOverview {
                        name: module.name().to_string(),
                        cover: module.cover().map(str::to_owned),
                        total_duration_minutes: module.total_duration_minutes(),
                        percent_complete: completion_rollup(
                            module.lessons().iter().map(Lesson::id),
                            &entries,
                        ),
                        lessons: module
                            .lessons()
                            .iter()
                            .map(|lesson| lesson_overview(lesson, entries.get(lesson.id())))
                            .collect(),
                    })
                    .collect();
                AreaOverview {
                    name: area.name().to_string(),
                    cover: area.cover().map(str::to_owned),
                    lesson_count: area.lesson_count(),
                    percent_complete: completion_rollup(area.lessons().map(Lesson::id), &entries),
                    modules,
                }
            })
            .collect();

        Ok(CatalogOverview {
            total_areas: tree.total_areas,
            total_modules: tree.total_modules,
            total_lessons: tree.total_lessons,
            percent_complete: completion_rollup(tree.lessons().map(Lesson::id), &entries),
            areas,
        })
    }

    /// Recently watched lessons that are still part of `tree`, newest first.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Progress` if progress cannot be read.
    pub async fn continue_watching(
        &self,
        tree: &Hierarchy,
        limit: u32,
    ) -> Result<Vec<ContinueWatching>, CatalogError> {
        let recent = self.progress.recent(limit).await?;
        Ok(recent
            .into_iter()
            .filter_map(|progress| {
                let lesson = tree.lesson(progress.lesson_id())?;
                Some(ContinueWatching {
                    lesson_id: lesson.id().clone(),
                    name: lesson.name().to_string(),
                    module: lesson.module().to_string(),
                    area: lesson.area().to_string(),
                    progress,
                })
            })
            .collect())
    }

    /// Playback source for a lesson of `tree`.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::UnknownLesson` if the lesson is not in the tree.
    pub fn source_for(
        &self,
        tree: &Hierarchy,
        lesson_id: &LessonId,
    ) -> Result<LessonSource, CatalogError> {
        tree.lesson(lesson_id)
            .map(|l| LessonSource::new(l.id().clone(), l.video_ref()))
            .ok_or_else(|| CatalogError::UnknownLesson(lesson_id.clone()))
    }

    /// Source of the lesson after `lesson_id`, for auto-advance. `None` at the
    /// end of the catalog.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::UnknownLesson` if `lesson_id` is not in the tree.
    pub fn next_source(
        &self,
        tree: &Hierarchy,
        lesson_id: &LessonId,
    ) -> Result<Option<LessonSource>, CatalogError> {
        if tree.lesson(lesson_id).is_none() {
            return Err(CatalogError::UnknownLesson(lesson_id.clone()));
        }
        Ok(tree
            .next_lesson(lesson_id)
            .map(|l| LessonSource::new(l.id().clone(), l.video_ref())))
    }
}

fn lesson_overview(lesson: &Lesson, entry: Option<&ProgressEntry>) -> LessonOverview {
    LessonOverview {
        id: lesson.id().clone(),
        name: lesson.name().to_string(),
        duration_minutes: lesson.duration_minutes(),
        percent_watched: entry.map_or(0, ProgressEntry::percent_watched),
        seconds_watched: entry.map_or(0.0, ProgressEntry::seconds_watched),
        completed: entry.is_some_and(ProgressEntry::completed),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use lesson_core::time::fixed_clock;
    use storage::repository::InMemoryRepository;

    const RECORDS: &str = r#"[
        {"id": 1, "area": "Civil", "module": "Contracts", "subject": "Offer", "orderKey": "1", "videoRef": "v/1.mp4"},
        {"id": "2", "area": "Civil", "module": "Contracts", "subject": "Acceptance", "orderKey": 2, "videoRef": "v/2.mp4"},
        {"id": 3, "area": "Civil", "module": "Property", "subject": "Possession", "orderKey": "3", "videoRef": "v/3.mp4"},
        {"id": 4, "area": "Penal", "module": "Crimes", "subject": "Intent", "orderKey": "4", "videoRef": "v/4.mp4", "coverRef": "penal.png"}
    ]"#;

    fn fixture() -> (CatalogService, Arc<ProgressService>, Hierarchy) {
        let progress = Arc::new(ProgressService::new(
            fixed_clock(),
            Arc::new(InMemoryRepository::new()),
        ));
        let catalog = CatalogService::new(Arc::clone(&progress));
        let tree = catalog.build(&parse_records(RECORDS).unwrap());
        (catalog, progress, tree)
    }

    #[test]
    fn parses_mixed_id_types() {
        let records = parse_records(RECORDS).unwrap();
        assert_eq!(records.len(), 4);
        assert_eq!(records[0].id.as_str(), "1");
        assert_eq!(records[1].order(), 2);
        assert!(records[0].text_content.is_empty());
    }

    #[test]
    fn rejects_non_array_json() {
        assert!(matches!(
            parse_records(r#"{"id": 1}"#),
            Err(CatalogError::Parse(_))
        ));
    }

    #[tokio::test]
    async fn overview_rolls_up_from_lessons() {
        let (catalog, progress, tree) = fixture();
        progress.update(&LessonId::new("1"), 95.0, 100.0).await.unwrap();
        progress.update(&LessonId::new("2"), 30.0, 100.0).await.unwrap();
        progress.update(&LessonId::new("4"), 100.0, 100.0).await.unwrap();

        let view = catalog.overview(&tree).await.unwrap();
        assert_eq!(view.total_lessons, 4);
        assert_eq!(view.percent_complete, 50);

        let civil = &view.areas[0];
        assert_eq!(civil.lesson_count, 3);
        assert_eq!(civil.percent_complete, 33);
        assert_eq!(civil.modules[0].percent_complete, 50);
        assert_eq!(civil.modules[1].percent_complete, 0);
        assert_eq!(civil.modules[0].lessons[1].percent_watched, 30);
        assert!(!civil.modules[0].lessons[1].completed);

        let penal = &view.areas[1];
        assert_eq!(penal.cover.as_deref(), Some("penal.png"));
        assert_eq!(penal.percent_complete, 100);
    }

    #[tokio::test]
    async fn overview_matches_rollup_when_ids_repeat() {
        let (catalog, progress, _) = fixture();
        let tree = catalog.build(
            &parse_records(
                r#"[
                    {"id": 1, "area": "A", "module": "M", "orderKey": 1},
                    {"id": 1, "area": "A", "module": "M", "orderKey": 2},
                    {"id": 2, "area": "A", "module": "M", "orderKey": 3}
                ]"#,
            )
            .unwrap(),
        );
        progress.update(&LessonId::new("1"), 95.0, 100.0).await.unwrap();

        let view = catalog.overview(&tree).await.unwrap();
        let module = &tree.areas[0].modules()[0];
        assert_eq!(module.lessons().len(), 3);
        assert_eq!(view.areas[0].modules[0].percent_complete, 50);
        assert_eq!(
            view.areas[0].modules[0].percent_complete,
            progress.module_rollup(module).await.unwrap()
        );
        assert_eq!(
            view.areas[0].percent_complete,
            progress.area_rollup(&tree.areas[0]).await.unwrap()
        );
        assert_eq!(view.percent_complete, 50);
    }

    #[tokio::test]
    async fn continue_watching_skips_unknown_lessons() {
        let (catalog, progress, tree) = fixture();
        progress.update(&LessonId::new("3"), 20.0, 100.0).await.unwrap();
        progress.update(&LessonId::new("gone"), 20.0, 100.0).await.unwrap();

        let items = catalog.continue_watching(&tree, 10).await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].name, "Possession");
        assert_eq!(items[0].module, "Property");
    }

    #[test]
    fn next_source_crosses_areas() {
        let (catalog, _, tree) = fixture();
        let next = catalog
            .next_source(&tree, &LessonId::new("3"))
            .unwrap()
            .unwrap();
        assert_eq!(next.lesson_id.as_str(), "4");
        assert_eq!(next.video_ref, "v/4.mp4");
        assert!(catalog.next_source(&tree, &LessonId::new("4")).unwrap().is_none());
        assert!(matches!(
            catalog.next_source(&tree, &LessonId::new("404")),
            Err(CatalogError::UnknownLesson(_))
        ));
        assert_eq!(
            catalog.source_for(&tree, &LessonId::new("2")).unwrap().video_ref,
            "v/2.mp4"
        );
    }
}
