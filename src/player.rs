//! Playback state for one video: position, play/pause and the quiz overlay.
//!
//! The engine never touches a media element. A front end forwards media
//! events (`time_update`, `ended`, user clicks) and renders whatever state the
//! engine reports back.

use log::debug;

use crate::constants::QUIZ_TRIGGER_WINDOW;
use crate::models::{Note, Quiz, Video, VideoDetails};
use crate::timeline::{merge_timeline, TimelineEntry};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PlayerError {
    #[error("Close the open quiz before resuming playback")]
    QuizOpen,

    #[error("No quiz is open")]
    NoActiveQuiz,

    #[error("Quiz answer already submitted")]
    AlreadyAnswered,

    #[error("Select an answer before submitting")]
    NoSelection,

    #[error("Option {index} is out of range for {len} options")]
    OptionOutOfRange { index: usize, len: usize },
}

/// Answer state of the open quiz. Moves one way, from unanswered to answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuizAnswer {
    Unanswered { selected: Option<usize> },
    Answered { selected: usize },
}

/// Result revealed once an answer is submitted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuizFeedback {
    pub selected: usize,
    pub correct_answer: i64,
    pub is_correct: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ActiveQuiz {
    pub quiz: Quiz,
    pub answer: QuizAnswer,
}

impl ActiveQuiz {
    fn new(quiz: Quiz) -> Self {
        Self {
            quiz,
            answer: QuizAnswer::Unanswered { selected: None },
        }
    }

    /// Feedback for a submitted answer, `None` while unanswered
    pub fn feedback(&self) -> Option<QuizFeedback> {
        match self.answer {
            QuizAnswer::Answered { selected } => Some(QuizFeedback {
                selected,
                correct_answer: self.quiz.correct_answer,
                is_correct: self.quiz.is_correct(selected),
            }),
            QuizAnswer::Unanswered { .. } => None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct PlaybackEngine {
    video: Option<Video>,
    notes: Vec<Note>,
    quizzes: Vec<Quiz>,
    timeline: Vec<TimelineEntry>,
    position: f64,
    duration: Option<f64>,
    playing: bool,
    last_checked: f64,
    active_quiz: Option<ActiveQuiz>,
}

impl PlaybackEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start over with a freshly fetched video
    pub fn load(&mut self, details: VideoDetails) {
        *self = Self::default();
        self.duration = details.video.duration.filter(|d| d.is_finite() && *d > 0.0);
        self.video = Some(details.video);
        self.set_annotations(details.notes, details.quizzes);
    }

    /// Replace annotations after a refetch, keeping playback state
    pub fn refresh(&mut self, details: VideoDetails) {
        if self.duration.is_none() {
            self.duration = details.video.duration.filter(|d| d.is_finite() && *d > 0.0);
        }
        self.video = Some(details.video);
        self.set_annotations(details.notes, details.quizzes);
    }

    fn set_annotations(&mut self, notes: Vec<Note>, quizzes: Vec<Quiz>) {
        self.timeline = merge_timeline(&notes, &quizzes);
        self.notes = notes;
        self.quizzes = quizzes;
    }

    /// Media metadata finished loading
    pub fn set_duration(&mut self, duration: f64) {
        if duration.is_finite() && duration > 0.0 {
            self.duration = Some(duration);
        }
    }

    pub fn video(&self) -> Option<&Video> {
        self.video.as_ref()
    }

    pub fn notes(&self) -> &[Note] {
        &self.notes
    }

    pub fn quizzes(&self) -> &[Quiz] {
        &self.quizzes
    }

    pub fn timeline(&self) -> &[TimelineEntry] {
        &self.timeline
    }

    pub fn position(&self) -> f64 {
        self.position
    }

    pub fn duration(&self) -> Option<f64> {
        self.duration
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn active_quiz(&self) -> Option<&ActiveQuiz> {
        self.active_quiz.as_ref()
    }

    pub fn play(&mut self) -> Result<(), PlayerError> {
        if self.active_quiz.is_some() {
            return Err(PlayerError::QuizOpen);
        }
        self.playing = true;
        Ok(())
    }

    pub fn pause(&mut self) {
        self.playing = false;
    }

    pub fn toggle_play(&mut self) -> Result<bool, PlayerError> {
        if self.playing {
            self.pause();
        } else {
            self.play()?;
        }
        Ok(self.playing)
    }

    pub fn ended(&mut self) {
        self.playing = false;
        if let Some(duration) = self.duration {
            self.position = duration;
        }
    }

    fn clamp(&self, position: f64) -> f64 {
        let position = if position.is_finite() { position.max(0.0) } else { 0.0 };
        match self.duration {
            Some(duration) => position.min(duration),
            None => position,
        }
    }

    /// Periodic position report from the media element.
    ///
    /// Returns the id of a quiz that was opened by this update.
    pub fn time_update(&mut self, position: f64) -> Option<i64> {
        self.position = self.clamp(position);
        self.check_quiz_trigger()
    }

    /// Move the playhead directly. Triggers are only checked while playing.
    pub fn seek(&mut self, position: f64) -> Option<i64> {
        self.position = self.clamp(position);
        self.check_quiz_trigger()
    }

    /// Seek to a timeline entry
    pub fn jump_to(&mut self, timestamp: f64) -> Option<i64> {
        self.seek(timestamp)
    }

    // Checks run only after the position has moved more than the window since
    // the last check, so a fast jump can step over a quiz entirely.
    fn check_quiz_trigger(&mut self) -> Option<i64> {
        if !self.playing || (self.position - self.last_checked).abs() <= QUIZ_TRIGGER_WINDOW {
            return None;
        }

        let position = self.position;
        let last_checked = self.last_checked;
        self.last_checked = position;

        if self.active_quiz.is_some() {
            return None;
        }
        let quiz = self
            .quizzes
            .iter()
            .find(|quiz| {
                (quiz.timestamp - position).abs() <= QUIZ_TRIGGER_WINDOW
                    && quiz.timestamp > last_checked
            })?
            .clone();

        debug!("Quiz {} reached at {:.2}s", quiz.id, position);
        let id = quiz.id;
        self.active_quiz = Some(ActiveQuiz::new(quiz));
        self.playing = false;
        Some(id)
    }

    pub fn select_answer(&mut self, index: usize) -> Result<(), PlayerError> {
        let active = self.active_quiz.as_mut().ok_or(PlayerError::NoActiveQuiz)?;
        if let QuizAnswer::Answered { .. } = active.answer {
            return Err(PlayerError::AlreadyAnswered);
        }
        let len = active.quiz.options.len();
        if index >= len {
            return Err(PlayerError::OptionOutOfRange { index, len });
        }
        active.answer = QuizAnswer::Unanswered {
            selected: Some(index),
        };
        Ok(())
    }

    /// Lock in the selected option and reveal the correct one
    pub fn submit_answer(&mut self) -> Result<QuizFeedback, PlayerError> {
        let active = self.active_quiz.as_mut().ok_or(PlayerError::NoActiveQuiz)?;
        let selected = match active.answer {
            QuizAnswer::Unanswered {
                selected: Some(selected),
            } => selected,
            QuizAnswer::Unanswered { selected: None } => return Err(PlayerError::NoSelection),
            QuizAnswer::Answered { .. } => return Err(PlayerError::AlreadyAnswered),
        };
        active.answer = QuizAnswer::Answered { selected };
        active.feedback().ok_or(PlayerError::NoSelection)
    }

    /// Dismiss the quiz and resume playback, answered or not
    pub fn close_quiz(&mut self) -> Result<(), PlayerError> {
        let closed = self.active_quiz.take().ok_or(PlayerError::NoActiveQuiz)?;
        // A dismissed quiz stays behind the last check until the playhead moves back.
        self.last_checked = self.last_checked.max(closed.quiz.timestamp);
        self.playing = true;
        Ok(())
    }
}
