pub mod domain;
pub mod ports;
pub mod similarity;
pub mod streak;
pub mod sync;

pub use domain::{
    AyahKey, AyahKeyParseError, BookmarkSet, CustomVerse, RemoteProgress, Surah, SurahInfo,
    Translation, User, UserCredentials, UserProgress, Verse, SURAH_COUNT,
};
pub use ports::{PortError, PortResult, SpeechToTextService, StorageService, VerseSource};
pub use similarity::similarity;
pub use streak::{
    check_recitation, mark_read, strict_gate_satisfied, ReadOutcome, RecitationOutcome,
    FATIHA_AYAH_COUNT, FATIHA_SURAH, PASS_THRESHOLD,
};
pub use sync::{merge_bookmarks, merge_progress};
