//! SQL text builders, one module per table.

pub mod ddl;
pub mod metadata;
pub mod notes;
pub mod quizzes;
pub mod videos;
