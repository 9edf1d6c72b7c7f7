use crate::models::{Note, Quiz};

/// One annotation on the merged, chronological timeline
#[derive(Debug, Clone, PartialEq)]
pub enum TimelineEntry {
    Note(Note),
    Quiz(Quiz),
}

impl TimelineEntry {
    pub fn timestamp(&self) -> f64 {
        match self {
            TimelineEntry::Note(note) => note.timestamp,
            TimelineEntry::Quiz(quiz) => quiz.timestamp,
        }
    }

    pub fn id(&self) -> i64 {
        match self {
            TimelineEntry::Note(note) => note.id,
            TimelineEntry::Quiz(quiz) => quiz.id,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            TimelineEntry::Note(_) => "note",
            TimelineEntry::Quiz(_) => "quiz",
        }
    }

    /// Note text or quiz question
    pub fn text(&self) -> &str {
        match self {
            TimelineEntry::Note(note) => &note.note,
            TimelineEntry::Quiz(quiz) => &quiz.question,
        }
    }
}

/// Notes then quizzes, stably sorted ascending by timestamp.
///
/// Entries with equal timestamps keep their order from that concatenation.
pub fn merge_timeline(notes: &[Note], quizzes: &[Quiz]) -> Vec<TimelineEntry> {
    let mut entries: Vec<TimelineEntry> = notes
        .iter()
        .cloned()
        .map(TimelineEntry::Note)
        .chain(quizzes.iter().cloned().map(TimelineEntry::Quiz))
        .collect();
    entries.sort_by(|a, b| a.timestamp().total_cmp(&b.timestamp()));
    entries
}

/// Render seconds as `m:ss`, e.g. `83.9` -> `1:23`
pub fn format_timestamp(seconds: f64) -> String {
    let total = if seconds.is_finite() && seconds > 0.0 {
        seconds.floor() as u64
    } else {
        0
    };
    format!("{}:{:02}", total / 60, total % 60)
}
