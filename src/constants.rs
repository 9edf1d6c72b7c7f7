use rand::Rng;
use std::time::Duration;

/// Expected database schema version
/// All databases must use this version for compatibility
pub const EXPECTED_DB_VERSION: &str = "1";

/// Title recorded when an upload's client payload is missing or unreadable
pub const DEFAULT_VIDEO_TITLE: &str = "Untitled Video";

/// Video MIME types accepted for direct-to-storage uploads
pub const DEFAULT_ALLOWED_CONTENT_TYPES: [&str; 6] = [
    "video/mp4",
    "video/webm",
    "video/ogg",
    "video/quicktime",
    "video/x-msvideo",
    "video/x-matroska",
];

/// Largest file the upload form accepts (500 MiB)
pub const MAX_UPLOAD_BYTES: u64 = 500 * 1024 * 1024;

/// Default lifetime of a client upload token
pub const DEFAULT_TOKEN_TTL_SECS: u64 = 3600;

/// Longest configurable token lifetime (7 days)
pub const MAX_TOKEN_TTL_SECS: u64 = 7 * 24 * 3600;

/// Header carrying the storage provider's signature on completion callbacks
pub const BLOB_SIGNATURE_HEADER: &str = "x-blob-signature";

/// Environment variable holding the storage read-write secret
pub const BLOB_TOKEN_ENV: &str = "BLOB_READ_WRITE_TOKEN";

/// Half-width of the window around a quiz timestamp, in seconds. Also the
/// minimum position change between two trigger checks.
pub const QUIZ_TRIGGER_WINDOW: f64 = 0.5;

/// Number of metadata lookups after a finished transfer
pub const CONFIRM_ATTEMPTS: u32 = 3;

/// Fixed pause between metadata lookups
pub const CONFIRM_BACKOFF: Duration = Duration::from_secs(1);

/// Generate a random alphanumeric suffix for uploaded blob pathnames
pub fn generate_random_suffix() -> String {
    rand::thread_rng()
        .sample_iter(&rand::distributions::Alphanumeric)
        .take(12)
        .map(char::from)
        .collect::<String>()
}
