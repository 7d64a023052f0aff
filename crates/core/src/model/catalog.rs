use serde::Serialize;

use crate::model::ids::LessonId;

//
// ─── LESSON ────────────────────────────────────────────────────────────────────
//

/// A single playable unit inside a module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Lesson {
    id: LessonId,
    name: String,
    module: String,
    area: String,
    video_ref: String,
    text_content: String,
    duration_minutes: u32,
}

impl Lesson {
    pub(crate) fn new(
        id: LessonId,
        name: String,
        module: String,
        area: String,
        video_ref: String,
        text_content: String,
        duration_minutes: u32,
    ) -> Self {
        Self {
            id,
            name,
            module,
            area,
            video_ref,
            text_content,
            duration_minutes,
        }
    }

    #[must_use]
    pub fn id(&self) -> &LessonId {
        &self.id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn module(&self) -> &str {
        &self.module
    }

    #[must_use]
    pub fn area(&self) -> &str {
        &self.area
    }

    #[must_use]
    pub fn video_ref(&self) -> &str {
        &self.video_ref
    }

    #[must_use]
    pub fn text_content(&self) -> &str {
        &self.text_content
    }

    /// Estimated length in minutes. Advisory only, never below the floor.
    #[must_use]
    pub fn duration_minutes(&self) -> u32 {
        self.duration_minutes
    }
}

//
// ─── MODULE ────────────────────────────────────────────────────────────────────
//

/// Second-level grouping ("theme") inside an area.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Module {
    name: String,
    cover: Option<String>,
    area: String,
    lessons: Vec<Lesson>,
    total_duration_minutes: u32,
}

impl Module {
    pub(crate) fn new(name: String, area: String, cover: Option<String>) -> Self {
        Self {
            name,
            cover,
            area,
            lessons: Vec::new(),
            total_duration_minutes: 0,
        }
    }

    pub(crate) fn push_lesson(&mut self, lesson: Lesson) {
        self.total_duration_minutes = self
            .total_duration_minutes
            .saturating_add(lesson.duration_minutes());
        self.lessons.push(lesson);
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn cover(&self) -> Option<&str> {
        self.cover.as_deref()
    }

    /// Name of the owning area.
    #[must_use]
    pub fn area(&self) -> &str {
        &self.area
    }

    #[must_use]
    pub fn lessons(&self) -> &[Lesson] {
        &self.lessons
    }

    #[must_use]
    pub fn total_duration_minutes(&self) -> u32 {
        self.total_duration_minutes
    }
}

//
// ─── AREA ──────────────────────────────────────────────────────────────────────
//

/// Top-level subject grouping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Area {
    name: String,
    cover: Option<String>,
    modules: Vec<Module>,
    lesson_count: usize,
}

impl Area {
    pub(crate) fn new(name: String, cover: Option<String>) -> Self {
        Self {
            name,
            cover,
            modules: Vec::new(),
            lesson_count: 0,
        }
    }

    pub(crate) fn push_module(&mut self, module: Module) -> usize {
        self.modules.push(module);
        self.modules.len() - 1
    }

    pub(crate) fn push_lesson(&mut self, module_index: usize, lesson: Lesson) {
        self.modules[module_index].push_lesson(lesson);
        self.lesson_count += 1;
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn cover(&self) -> Option<&str> {
        self.cover.as_deref()
    }

    #[must_use]
    pub fn modules(&self) -> &[Module] {
        &self.modules
    }

    #[must_use]
    pub fn module(&self, name: &str) -> Option<&Module> {
        self.modules.iter().find(|m| m.name == name)
    }

    #[must_use]
    pub fn lesson_count(&self) -> usize {
        self.lesson_count
    }

    /// All lessons of the area, module by module.
    pub fn lessons(&self) -> impl Iterator<Item = &Lesson> {
        self.modules.iter().flat_map(|m| m.lessons.iter())
    }

    #[must_use]
    pub fn total_duration_minutes(&self) -> u32 {
        self.modules
            .iter()
            .fold(0_u32, |acc, m| acc.saturating_add(m.total_duration_minutes))
    }
}
