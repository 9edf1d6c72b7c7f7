use sea_query::Iden;

/// Metadata table - key-value store for database configuration
#[derive(Iden)]
pub enum Metadata {
    Table,
    Key,
    Value,
}

/// Videos table - one row per confirmed upload
#[derive(Iden)]
pub enum Videos {
    Table,
    Id,
    Title,
    Description,
    BlobUrl,
    Duration,
    CreatedAt,
}

/// Timestamp notes table - free-text annotations on a video
#[derive(Iden)]
pub enum TimestampNotes {
    Table,
    Id,
    VideoId,
    Timestamp,
    Note,
    CreatedAt,
}

/// Quizzes table - multiple-choice prompts on a video
#[derive(Iden)]
pub enum Quizzes {
    Table,
    Id,
    VideoId,
    Timestamp,
    Question,
    Options,
    CorrectAnswer,
    CreatedAt,
}
