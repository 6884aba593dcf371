//! services/api/src/web/rest.rs
//!
//! Contains the Axum handlers for the REST API endpoints and the master
//! definition for the OpenAPI specification.

use crate::web::state::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    Extension,
};
use chrono::{Local, NaiveDate};
use quran_tracker_core::{
    domain::{AyahKey, BookmarkSet, CustomVerse, RemoteProgress, Surah, UserProgress},
    streak, sync,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info};
use utoipa::{OpenApi, ToSchema};
use uuid::Uuid;

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        list_surahs_handler,
        get_surah_handler,
        get_progress_handler,
        mark_read_handler,
        sync_progress_handler,
        get_bookmarks_handler,
        put_bookmarks_handler,
        toggle_bookmark_handler,
        import_handler,
    ),
    components(
        schemas(
            SurahSummary,
            SurahResponse,
            VerseBody,
            TranslationBody,
            ProgressResponse,
            MarkReadRequest,
            MarkReadResponse,
            SyncRequest,
            SyncResponse,
            BookmarksRequest,
            BookmarksResponse,
            ToggleBookmarkRequest,
            ToggleBookmarkResponse,
            ImportResponse,
        )
    ),
    tags(
        (name = "Quran Tracker API", description = "API endpoints for reading, tracking, and recitation checks.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// API Response and Payload Structs
//=========================================================================================

/// Index entry for one surah.
#[derive(Serialize, ToSchema)]
pub struct SurahSummary {
    number: u32,
    name: String,
    english_name: String,
    ayah_count: u32,
    /// The user has imported a custom override for this surah.
    has_custom: bool,
}

#[derive(Serialize, ToSchema)]
pub struct TranslationBody {
    edition: String,
    text: String,
}

#[derive(Serialize, ToSchema)]
pub struct VerseBody {
    /// The verse's `"<surah>:<ayah>"` key.
    key: String,
    arabic_text: String,
    translations: Vec<TranslationBody>,
    audio_url: Option<String>,
}

/// One surah as rendered by the reader.
#[derive(Serialize, ToSchema)]
pub struct SurahResponse {
    number: u32,
    name: String,
    english_name: String,
    /// True when the ayahs come from the user's imported data.
    custom: bool,
    ayahs: Vec<VerseBody>,
}

/// The user's progress record plus derived tracker stats.
#[derive(Serialize, ToSchema)]
pub struct ProgressResponse {
    username: String,
    email: String,
    streak: u32,
    /// Number of distinct ayahs marked read.
    ayahs_read: usize,
    read_ayahs: Vec<String>,
    last_read_date: Option<NaiveDate>,
    last_fatiha_date: Option<NaiveDate>,
    /// Whether the strict-mode obligation is satisfied for today.
    strict_gate_satisfied: bool,
}

impl ProgressResponse {
    fn new(progress: &UserProgress, today: NaiveDate) -> Self {
        Self {
            username: progress.username.clone(),
            email: progress.email.clone(),
            streak: progress.streak,
            ayahs_read: progress.read_ayahs.len(),
            read_ayahs: progress.read_ayahs.iter().map(|k| k.to_string()).collect(),
            last_read_date: progress.last_read_date,
            last_fatiha_date: progress.last_fatiha_date,
            strict_gate_satisfied: streak::strict_gate_satisfied(progress, today),
        }
    }
}

#[derive(Deserialize, ToSchema)]
pub struct MarkReadRequest {
    /// `"<surah>:<ayah>"`.
    ayah_key: String,
}

#[derive(Serialize, ToSchema)]
pub struct MarkReadResponse {
    newly_read: bool,
    streak_incremented: bool,
    streak: u32,
}

/// The client's cached progress record; every field is optional.
#[derive(Deserialize, Default, ToSchema)]
pub struct SyncRequest {
    username: Option<String>,
    email: Option<String>,
    streak: Option<u32>,
    read_ayahs: Option<Vec<String>>,
    last_read_date: Option<NaiveDate>,
    last_fatiha_date: Option<NaiveDate>,
    bookmarks: Option<Vec<String>>,
}

#[derive(Serialize, ToSchema)]
pub struct SyncResponse {
    progress: ProgressResponse,
    bookmarks: Vec<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct BookmarksRequest {
    bookmarks: Vec<String>,
}

#[derive(Serialize, ToSchema)]
pub struct BookmarksResponse {
    bookmarks: Vec<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct ToggleBookmarkRequest {
    ayah_key: String,
}

#[derive(Serialize, ToSchema)]
pub struct ToggleBookmarkResponse {
    bookmarked: bool,
    bookmarks: Vec<String>,
}

#[derive(Serialize, ToSchema)]
pub struct ImportResponse {
    imported_ayahs: usize,
    imported_surahs: usize,
}

//=========================================================================================
// Shared Helpers
//=========================================================================================

type HandlerError = (StatusCode, String);

fn parse_key(raw: &str) -> Result<AyahKey, HandlerError> {
    raw.parse::<AyahKey>()
        .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))
}

fn parse_key_list(raw: &[String]) -> Result<BookmarkSet, HandlerError> {
    raw.iter().map(|s| parse_key(s)).collect()
}

fn internal(context: &str) -> HandlerError {
    (StatusCode::INTERNAL_SERVER_ERROR, context.to_string())
}

/// Loads the stored progress record, falling back to a fresh record seeded
/// from the user's account when none exists yet.
async fn load_progress(
    app_state: &AppState,
    user_id: Uuid,
) -> Result<UserProgress, HandlerError> {
    if let Some(progress) = app_state.db.get_progress(user_id).await.map_err(|e| {
        error!("Failed to load progress: {:?}", e);
        internal("Failed to load progress")
    })? {
        return Ok(progress);
    }

    let account = app_state.db.get_user(user_id).await.map_err(|e| {
        error!("Failed to load user account: {:?}", e);
        internal("Failed to load progress")
    })?;
    Ok(UserProgress::new(account.username, account.email))
}

fn surah_response(surah: Surah, custom: bool) -> SurahResponse {
    SurahResponse {
        number: surah.info.number,
        name: surah.info.name,
        english_name: surah.info.english_name,
        custom,
        ayahs: surah
            .verses
            .into_iter()
            .map(|verse| VerseBody {
                key: verse.key.to_string(),
                arabic_text: verse.arabic_text,
                translations: verse
                    .translations
                    .into_iter()
                    .map(|t| TranslationBody {
                        edition: t.edition,
                        text: t.text,
                    })
                    .collect(),
                audio_url: verse.audio_url,
            })
            .collect(),
    }
}

/// Parses the `surah|ayah|text` import format, one verse per line. Lines
/// that don't parse are skipped; extra `|` separators stay in the text.
pub fn parse_import(text: &str) -> Vec<CustomVerse> {
    text.lines()
        .filter_map(|line| {
            let mut parts = line.splitn(3, '|');
            let surah: u32 = parts.next()?.trim().parse().ok()?;
            let ayah: u32 = parts.next()?.trim().parse().ok()?;
            let verse_text = parts.next()?.trim();
            if verse_text.is_empty() {
                return None;
            }
            let key = AyahKey::new(surah, ayah).ok()?;
            Some(CustomVerse {
                key,
                text: verse_text.to_string(),
            })
        })
        .collect()
}

//=========================================================================================
// Surah Handlers
//=========================================================================================

/// List the 114-surah index.
#[utoipa::path(
    get,
    path = "/surahs",
    responses(
        (status = 200, description = "Surah index", body = [SurahSummary]),
        (status = 502, description = "Upstream verse API unavailable")
    )
)]
pub async fn list_surahs_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
) -> Result<impl IntoResponse, HandlerError> {
    let index = app_state.verses.surah_index().await.map_err(|e| {
        error!("Failed to fetch surah index: {:?}", e);
        (
            StatusCode::BAD_GATEWAY,
            "Failed to load the surah list; please retry.".to_string(),
        )
    })?;

    let custom_numbers = app_state
        .db
        .custom_surah_numbers(user_id)
        .await
        .map_err(|e| {
            error!("Failed to load custom surah numbers: {:?}", e);
            internal("Failed to load the surah list")
        })?;

    let summaries: Vec<SurahSummary> = index
        .into_iter()
        .map(|info| SurahSummary {
            has_custom: custom_numbers.contains(&info.number),
            number: info.number,
            name: info.name,
            english_name: info.english_name,
            ayah_count: info.ayah_count,
        })
        .collect();

    Ok(Json(summaries))
}

/// Fetch one surah with translations. The user's imported verses override
/// the upstream edition.
#[utoipa::path(
    get,
    path = "/surahs/{number}",
    params(("number" = u32, Path, description = "Surah number, 1-114")),
    responses(
        (status = 200, description = "The surah's verses", body = SurahResponse),
        (status = 404, description = "No such surah"),
        (status = 502, description = "Upstream verse API unavailable")
    )
)]
pub async fn get_surah_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Path(number): Path<u32>,
) -> Result<impl IntoResponse, HandlerError> {
    if number == 0 || number > quran_tracker_core::SURAH_COUNT {
        return Err((
            StatusCode::NOT_FOUND,
            format!("Surah {} does not exist", number),
        ));
    }

    let custom = app_state
        .db
        .get_custom_surah(user_id, number)
        .await
        .map_err(|e| {
            error!("Failed to load custom verses: {:?}", e);
            internal("Failed to load surah")
        })?;

    if !custom.is_empty() {
        let surah = Surah {
            info: quran_tracker_core::SurahInfo {
                number,
                name: format!("Surah {} (Custom)", number),
                english_name: format!("Custom Surah {}", number),
                ayah_count: custom.len() as u32,
            },
            verses: custom
                .into_iter()
                .map(|v| quran_tracker_core::Verse {
                    key: v.key,
                    arabic_text: v.text,
                    translations: Vec::new(),
                    audio_url: None,
                })
                .collect(),
        };
        return Ok(Json(surah_response(surah, true)));
    }

    let surah = app_state.verses.surah(number).await.map_err(|e| {
        error!("Failed to fetch surah {}: {:?}", number, e);
        (
            StatusCode::BAD_GATEWAY,
            "Failed to load the surah; please retry.".to_string(),
        )
    })?;

    Ok(Json(surah_response(surah, false)))
}

//=========================================================================================
// Progress Handlers
//=========================================================================================

/// Fetch the current progress record and tracker stats.
#[utoipa::path(
    get,
    path = "/progress",
    responses(
        (status = 200, description = "Current progress", body = ProgressResponse),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn get_progress_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
) -> Result<impl IntoResponse, HandlerError> {
    let progress = load_progress(&app_state, user_id).await?;
    let today = Local::now().date_naive();
    Ok(Json(ProgressResponse::new(&progress, today)))
}

/// Mark one ayah as read, advancing the daily streak machine.
#[utoipa::path(
    post,
    path = "/progress/read",
    request_body = MarkReadRequest,
    responses(
        (status = 200, description = "Read-marking applied", body = MarkReadResponse),
        (status = 400, description = "Invalid ayah key"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn mark_read_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Json(req): Json<MarkReadRequest>,
) -> Result<impl IntoResponse, HandlerError> {
    let key = parse_key(&req.ayah_key)?;
    let today = Local::now().date_naive();

    let mut progress = load_progress(&app_state, user_id).await?;
    let outcome = streak::mark_read(&mut progress, key, today);

    if outcome.newly_read {
        app_state
            .db
            .put_progress(user_id, &progress)
            .await
            .map_err(|e| {
                error!("Failed to persist progress: {:?}", e);
                internal("Failed to save progress")
            })?;
        info!(
            "User {} marked {} read (streak {})",
            user_id, key, progress.streak
        );
    }

    Ok(Json(MarkReadResponse {
        newly_read: outcome.newly_read,
        streak_incremented: outcome.streak_incremented,
        streak: progress.streak,
    }))
}

/// Reconcile the client's cached progress with the server's record.
///
/// The server copy is authoritative for every field it defines; with no
/// server record the client's cache is written through unchanged.
#[utoipa::path(
    post,
    path = "/progress/sync",
    request_body = SyncRequest,
    responses(
        (status = 200, description = "Merged progress", body = SyncResponse),
        (status = 400, description = "Invalid ayah key in the cached record"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn sync_progress_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Json(req): Json<SyncRequest>,
) -> Result<impl IntoResponse, HandlerError> {
    let cached = RemoteProgress {
        username: req.username,
        email: req.email,
        streak: req.streak,
        read_ayahs: req.read_ayahs.as_deref().map(parse_key_list).transpose()?,
        last_read_date: req.last_read_date,
        last_fatiha_date: req.last_fatiha_date,
        bookmarks: req.bookmarks.as_deref().map(parse_key_list).transpose()?,
    };

    let account = app_state.db.get_user(user_id).await.map_err(|e| {
        error!("Failed to load user account: {:?}", e);
        internal("Failed to sync progress")
    })?;

    // Fill the cache's gaps from the account, then let the server record win.
    let base = UserProgress::new(account.username, account.email);
    let local = sync::merge_progress(base, Some(&cached));

    let stored = app_state.db.get_progress(user_id).await.map_err(|e| {
        error!("Failed to load stored progress: {:?}", e);
        internal("Failed to sync progress")
    })?;
    let merged = sync::merge_progress(local, stored.as_ref().map(RemoteProgress::from).as_ref());

    app_state
        .db
        .put_progress(user_id, &merged)
        .await
        .map_err(|e| {
            error!("Failed to persist merged progress: {:?}", e);
            internal("Failed to sync progress")
        })?;

    // Bookmarks sync separately: the stored set overwrites the cache when it
    // exists; otherwise the cache is written through.
    let stored_bookmarks = app_state.db.get_bookmarks(user_id).await.map_err(|e| {
        error!("Failed to load bookmarks: {:?}", e);
        internal("Failed to sync progress")
    })?;
    let local_bookmarks = cached.bookmarks.clone().unwrap_or_default();
    let merged_bookmarks = match stored_bookmarks {
        Some(stored_set) => stored_set,
        None => {
            app_state
                .db
                .put_bookmarks(user_id, &local_bookmarks)
                .await
                .map_err(|e| {
                    error!("Failed to persist bookmarks: {:?}", e);
                    internal("Failed to sync progress")
                })?;
            local_bookmarks
        }
    };

    info!("Synced progress for user {}", user_id);
    let today = Local::now().date_naive();
    Ok(Json(SyncResponse {
        progress: ProgressResponse::new(&merged, today),
        bookmarks: merged_bookmarks.iter().map(|k| k.to_string()).collect(),
    }))
}

//=========================================================================================
// Bookmark Handlers
//=========================================================================================

/// Fetch the bookmark set.
#[utoipa::path(
    get,
    path = "/bookmarks",
    responses(
        (status = 200, description = "Current bookmarks", body = BookmarksResponse),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn get_bookmarks_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
) -> Result<impl IntoResponse, HandlerError> {
    let bookmarks = app_state
        .db
        .get_bookmarks(user_id)
        .await
        .map_err(|e| {
            error!("Failed to load bookmarks: {:?}", e);
            internal("Failed to load bookmarks")
        })?
        .unwrap_or_default();

    Ok(Json(BookmarksResponse {
        bookmarks: bookmarks.iter().map(|k| k.to_string()).collect(),
    }))
}

/// Replace the bookmark set wholesale (last writer wins).
#[utoipa::path(
    put,
    path = "/bookmarks",
    request_body = BookmarksRequest,
    responses(
        (status = 200, description = "Bookmarks replaced", body = BookmarksResponse),
        (status = 400, description = "Invalid ayah key"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn put_bookmarks_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Json(req): Json<BookmarksRequest>,
) -> Result<impl IntoResponse, HandlerError> {
    let bookmarks = parse_key_list(&req.bookmarks)?;
    app_state
        .db
        .put_bookmarks(user_id, &bookmarks)
        .await
        .map_err(|e| {
            error!("Failed to persist bookmarks: {:?}", e);
            internal("Failed to save bookmarks")
        })?;

    Ok(Json(BookmarksResponse {
        bookmarks: bookmarks.iter().map(|k| k.to_string()).collect(),
    }))
}

/// Add or remove a single bookmark.
#[utoipa::path(
    post,
    path = "/bookmarks/toggle",
    request_body = ToggleBookmarkRequest,
    responses(
        (status = 200, description = "Bookmark toggled", body = ToggleBookmarkResponse),
        (status = 400, description = "Invalid ayah key"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn toggle_bookmark_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Json(req): Json<ToggleBookmarkRequest>,
) -> Result<impl IntoResponse, HandlerError> {
    let key = parse_key(&req.ayah_key)?;

    let mut bookmarks = app_state
        .db
        .get_bookmarks(user_id)
        .await
        .map_err(|e| {
            error!("Failed to load bookmarks: {:?}", e);
            internal("Failed to toggle bookmark")
        })?
        .unwrap_or_default();

    let bookmarked = bookmarks.insert(key);
    if !bookmarked {
        bookmarks.remove(&key);
    }

    app_state
        .db
        .put_bookmarks(user_id, &bookmarks)
        .await
        .map_err(|e| {
            error!("Failed to persist bookmarks: {:?}", e);
            internal("Failed to toggle bookmark")
        })?;

    Ok(Json(ToggleBookmarkResponse {
        bookmarked,
        bookmarks: bookmarks.iter().map(|k| k.to_string()).collect(),
    }))
}

//=========================================================================================
// Import Handler
//=========================================================================================

/// Import custom verses in the `surah|ayah|text` line format.
#[utoipa::path(
    post,
    path = "/import",
    request_body(content = String, content_type = "text/plain",
        description = "One verse per line: surah|ayah|text"),
    responses(
        (status = 200, description = "Verses imported", body = ImportResponse),
        (status = 400, description = "No parsable lines"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn import_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    body: String,
) -> Result<impl IntoResponse, HandlerError> {
    let verses = parse_import(&body);
    if verses.is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            "Invalid format. Use: Surah|Ayah|Text".to_string(),
        ));
    }

    let surah_count = verses
        .iter()
        .map(|v| v.key.surah)
        .collect::<std::collections::BTreeSet<_>>()
        .len();

    app_state
        .db
        .put_custom_verses(user_id, &verses)
        .await
        .map_err(|e| {
            error!("Failed to persist custom verses: {:?}", e);
            internal("Failed to import verses")
        })?;

    info!(
        "User {} imported {} ayahs across {} surahs",
        user_id,
        verses.len(),
        surah_count
    );
    Ok(Json(ImportResponse {
        imported_ayahs: verses.len(),
        imported_surahs: surah_count,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn import_parses_well_formed_lines() {
        let text = "1|1|بِسْمِ اللَّهِ\n1|2|الْحَمْدُ لِلَّهِ";
        let verses = parse_import(text);
        assert_eq!(verses.len(), 2);
        assert_eq!(verses[0].key.to_string(), "1:1");
        assert_eq!(verses[1].text, "الْحَمْدُ لِلَّهِ");
    }

    #[test]
    fn import_keeps_extra_separators_in_the_text() {
        let verses = parse_import("2|5|first part | second part");
        assert_eq!(verses.len(), 1);
        assert_eq!(verses[0].text, "first part | second part");
    }

    #[test]
    fn import_skips_malformed_lines() {
        let text = "not a verse\n1|x|text\n115|1|out of range\n3|4|kept";
        let verses = parse_import(text);
        assert_eq!(verses.len(), 1);
        assert_eq!(verses[0].key.to_string(), "3:4");
    }

    #[test]
    fn import_of_garbage_yields_nothing() {
        assert!(parse_import("").is_empty());
        assert!(parse_import("a|b").is_empty());
        assert!(parse_import("1|2|").is_empty());
    }
}
