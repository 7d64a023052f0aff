//! Builds the Area → Module → Lesson tree from flat lesson rows.

use std::collections::HashMap;

use serde::Serialize;

use crate::model::{Area, Lesson, LessonId, LessonRecord, Module};

/// Approximate reading/speaking pace used for duration estimates.
pub const WORDS_PER_MINUTE: u32 = 150;

/// Floor applied to every lesson duration estimate.
pub const MIN_LESSON_MINUTES: u32 = 5;

//
// ─── DURATION ──────────────────────────────────────────────────────────────────
//

/// Number of whitespace-separated words in `text`.
#[must_use]
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Estimated lesson length: `max(5, round(words / 150))` minutes.
#[must_use]
pub fn estimate_duration_minutes(text: &str) -> u32 {
    let words = u32::try_from(word_count(text)).unwrap_or(u32::MAX);
    let half = WORDS_PER_MINUTE / 2;
    let rounded = words.saturating_add(half) / WORDS_PER_MINUTE;
    rounded.max(MIN_LESSON_MINUTES)
}

//
// ─── HIERARCHY ─────────────────────────────────────────────────────────────────
//

/// Ordered content tree with aggregate counts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Hierarchy {
    pub areas: Vec<Area>,
    pub total_areas: usize,
    pub total_modules: usize,
    pub total_lessons: usize,
}

impl Hierarchy {
    #[must_use]
    pub fn area(&self, name: &str) -> Option<&Area> {
        self.areas.iter().find(|a| a.name() == name)
    }

    #[must_use]
    pub fn module(&self, area: &str, name: &str) -> Option<&Module> {
        self.area(area).and_then(|a| a.module(name))
    }

    /// Every lesson in tree order.
    pub fn lessons(&self) -> impl Iterator<Item = &Lesson> {
        self.areas.iter().flat_map(Area::lessons)
    }

    #[must_use]
    pub fn lesson(&self, id: &LessonId) -> Option<&Lesson> {
        self.lessons().find(|l| l.id() == id)
    }

    /// The lesson that follows `id` in tree order, crossing module and area
    /// boundaries. `None` for the last lesson or an unknown id.
    #[must_use]
    pub fn next_lesson(&self, id: &LessonId) -> Option<&Lesson> {
        let mut lessons = self.lessons();
        lessons.by_ref().find(|l| l.id() == id)?;
        lessons.next()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.total_lessons == 0
    }
}

//
// ─── BUILDER ───────────────────────────────────────────────────────────────────
//

/// Area under construction plus its module-name lookup table.
struct AreaSlot {
    area: Area,
    modules: HashMap<String, usize>,
}

/// Build the content tree from raw lesson rows.
///
/// Rows are stable-sorted by their numeric ordering key first, so the result
/// depends only on the set of rows and their keys, never on input order
/// (rows with equal keys keep their relative order). Areas and modules appear
/// in the order their first lesson does. Grouping names are matched exactly,
/// including empty names.
#[must_use]
pub fn build(records: &[LessonRecord]) -> Hierarchy {
    let mut sorted: Vec<&LessonRecord> = records.iter().collect();
    sorted.sort_by_key(|r| r.order());

    let mut slots: Vec<AreaSlot> = Vec::new();
    let mut area_index: HashMap<&str, usize> = HashMap::new();
    let mut total_modules = 0_usize;

    for record in sorted.iter().copied() {
        let a_idx = *area_index.entry(record.area.as_str()).or_insert_with(|| {
            slots.push(AreaSlot {
                area: Area::new(record.area.clone(), record.cover().map(str::to_owned)),
                modules: HashMap::new(),
            });
            slots.len() - 1
        });
        let slot = &mut slots[a_idx];

        let m_idx = match slot.modules.get(record.module.as_str()) {
            Some(idx) => *idx,
            None => {
                let module = Module::new(
                    record.module.clone(),
                    record.area.clone(),
                    record.cover().map(str::to_owned),
                );
                let idx = slot.area.push_module(module);
                slot.modules.insert(record.module.clone(), idx);
                total_modules += 1;
                idx
            }
        };

        let lesson = Lesson::new(
            record.id.clone(),
            record.subject.clone(),
            record.module.clone(),
            record.area.clone(),
            record.video_ref.clone(),
            record.text_content.clone(),
            estimate_duration_minutes(&record.text_content),
        );
        slot.area.push_lesson(m_idx, lesson);
    }

    let areas: Vec<Area> = slots.into_iter().map(|s| s.area).collect();
    Hierarchy {
        total_areas: areas.len(),
        total_modules,
        total_lessons: sorted.len(),
        areas,
    }
}
