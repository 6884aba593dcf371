//! services/api/src/adapters/verse_api.rs
//!
//! This module contains the adapter for the alquran.cloud verse API. It
//! implements the `VerseSource` port from the `core` crate and keeps an
//! in-process cache of fetched surahs, since the corpus never changes.

use std::collections::HashMap;

use async_trait::async_trait;
use quran_tracker_core::domain::{AyahKey, Surah, SurahInfo, Translation, Verse, SURAH_COUNT};
use quran_tracker_core::ports::{PortError, PortResult, VerseSource};
use serde::Deserialize;
use tokio::sync::RwLock;
use tracing::info;

/// Arabic edition plus the two translations the reader renders.
const EDITIONS: &str = "quran-uthmani,en.asad,ur.jalandhry";

/// Per-ayah recitation audio, keyed by the corpus-global ayah number.
const AUDIO_CDN_BASE: &str = "https://cdn.islamic.network/quran/audio/128/ar.alafasy";

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements the `VerseSource` port against alquran.cloud.
pub struct AlQuranCloudAdapter {
    client: reqwest::Client,
    base_url: String,
    index_cache: RwLock<Option<Vec<SurahInfo>>>,
    surah_cache: RwLock<HashMap<u32, Surah>>,
}

impl AlQuranCloudAdapter {
    /// Creates a new `AlQuranCloudAdapter` for the given API base URL
    /// (e.g. `https://api.alquran.cloud/v1`).
    pub fn new(client: reqwest::Client, base_url: String) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            index_cache: RwLock::new(None),
            surah_cache: RwLock::new(HashMap::new()),
        }
    }

    async fn fetch_json<T: serde::de::DeserializeOwned>(&self, url: &str) -> PortResult<T> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| PortError::Unexpected(format!("Verse API request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(PortError::Unexpected(format!(
                "Verse API returned HTTP {} for {url}",
                response.status()
            )));
        }

        let envelope: ApiEnvelope<T> = response
            .json()
            .await
            .map_err(|e| PortError::Unexpected(format!("Verse API returned invalid JSON: {e}")))?;

        if envelope.code != 200 {
            return Err(PortError::Unexpected(format!(
                "Verse API error: {} ({})",
                envelope.status, envelope.code
            )));
        }

        Ok(envelope.data)
    }
}

//=========================================================================================
// Upstream Wire Types
//=========================================================================================

#[derive(Deserialize)]
struct ApiEnvelope<T> {
    code: u16,
    #[serde(default)]
    status: String,
    data: T,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SurahIndexEntry {
    number: u32,
    name: String,
    english_name: String,
    number_of_ayahs: u32,
}

impl SurahIndexEntry {
    fn to_domain(self) -> SurahInfo {
        SurahInfo {
            number: self.number,
            name: self.name,
            english_name: self.english_name,
            ayah_count: self.number_of_ayahs,
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct EditionSurah {
    name: String,
    english_name: String,
    ayahs: Vec<EditionAyah>,
    edition: EditionMeta,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct EditionAyah {
    /// Corpus-global ayah number, used for the audio CDN path.
    number: u64,
    number_in_surah: u32,
    text: String,
}

#[derive(Deserialize)]
struct EditionMeta {
    identifier: String,
}

/// Builds a domain [`Surah`] from the parallel editions the API returns:
/// the first edition is the Arabic text, the rest line up as translations.
fn assemble_surah(number: u32, editions: Vec<EditionSurah>) -> PortResult<Surah> {
    let mut editions = editions.into_iter();
    let arabic = editions
        .next()
        .ok_or_else(|| PortError::Unexpected("Verse API returned no editions".to_string()))?;
    let translations: Vec<EditionSurah> = editions.collect();

    let info = SurahInfo {
        number,
        name: arabic.name.clone(),
        english_name: arabic.english_name.clone(),
        ayah_count: arabic.ayahs.len() as u32,
    };

    let mut verses = Vec::with_capacity(arabic.ayahs.len());
    for (index, ayah) in arabic.ayahs.iter().enumerate() {
        let key = AyahKey::new(number, ayah.number_in_surah)
            .map_err(|e| PortError::Unexpected(format!("Verse API produced {e}")))?;

        let verse_translations = translations
            .iter()
            .filter_map(|edition| {
                edition.ayahs.get(index).map(|t| Translation {
                    edition: edition.edition.identifier.clone(),
                    text: t.text.clone(),
                })
            })
            .collect();

        verses.push(Verse {
            key,
            arabic_text: ayah.text.clone(),
            translations: verse_translations,
            audio_url: Some(format!("{AUDIO_CDN_BASE}/{}.mp3", ayah.number)),
        });
    }

    Ok(Surah { info, verses })
}

//=========================================================================================
// `VerseSource` Trait Implementation
//=========================================================================================

#[async_trait]
impl VerseSource for AlQuranCloudAdapter {
    async fn surah_index(&self) -> PortResult<Vec<SurahInfo>> {
        if let Some(cached) = self.index_cache.read().await.as_ref() {
            return Ok(cached.clone());
        }

        let url = format!("{}/surah", self.base_url);
        let entries: Vec<SurahIndexEntry> = self.fetch_json(&url).await?;
        let index: Vec<SurahInfo> = entries.into_iter().map(SurahIndexEntry::to_domain).collect();
        info!("Fetched surah index ({} entries)", index.len());

        *self.index_cache.write().await = Some(index.clone());
        Ok(index)
    }

    async fn surah(&self, number: u32) -> PortResult<Surah> {
        if number == 0 || number > SURAH_COUNT {
            return Err(PortError::NotFound(format!("Surah {} does not exist", number)));
        }

        if let Some(cached) = self.surah_cache.read().await.get(&number) {
            return Ok(cached.clone());
        }

        let url = format!("{}/surah/{}/editions/{}", self.base_url, number, EDITIONS);
        let editions: Vec<EditionSurah> = self.fetch_json(&url).await?;
        let surah = assemble_surah(number, editions)?;
        info!("Fetched surah {} ({} ayahs)", number, surah.verses.len());

        self.surah_cache.write().await.insert(number, surah.clone());
        Ok(surah)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EDITIONS_SAMPLE: &str = r#"{
        "code": 200,
        "status": "OK",
        "data": [
            {
                "number": 1,
                "name": "سُورَةُ ٱلْفَاتِحَةِ",
                "englishName": "Al-Faatiha",
                "englishNameTranslation": "The Opening",
                "numberOfAyahs": 2,
                "edition": { "identifier": "quran-uthmani" },
                "ayahs": [
                    { "number": 1, "numberInSurah": 1, "text": "بِسْمِ ٱللَّهِ" },
                    { "number": 2, "numberInSurah": 2, "text": "ٱلْحَمْدُ لِلَّهِ" }
                ]
            },
            {
                "number": 1,
                "name": "سُورَةُ ٱلْفَاتِحَةِ",
                "englishName": "Al-Faatiha",
                "englishNameTranslation": "The Opening",
                "numberOfAyahs": 2,
                "edition": { "identifier": "en.asad" },
                "ayahs": [
                    { "number": 1, "numberInSurah": 1, "text": "In the name of God" },
                    { "number": 2, "numberInSurah": 2, "text": "All praise is due to God" }
                ]
            }
        ]
    }"#;

    #[test]
    fn decodes_and_assembles_the_editions_payload() {
        let envelope: ApiEnvelope<Vec<EditionSurah>> =
            serde_json::from_str(EDITIONS_SAMPLE).unwrap();
        assert_eq!(envelope.code, 200);

        let surah = assemble_surah(1, envelope.data).unwrap();
        assert_eq!(surah.info.english_name, "Al-Faatiha");
        assert_eq!(surah.info.ayah_count, 2);
        assert_eq!(surah.verses.len(), 2);

        let first = &surah.verses[0];
        assert_eq!(first.key.to_string(), "1:1");
        assert_eq!(first.arabic_text, "بِسْمِ ٱللَّهِ");
        assert_eq!(first.translations.len(), 1);
        assert_eq!(first.translations[0].edition, "en.asad");
        assert_eq!(
            first.audio_url.as_deref(),
            Some("https://cdn.islamic.network/quran/audio/128/ar.alafasy/1.mp3")
        );
    }

    #[test]
    fn decodes_the_surah_index_payload() {
        let sample = r#"{
            "code": 200,
            "status": "OK",
            "data": [
                { "number": 1, "name": "سُورَةُ ٱلْفَاتِحَةِ", "englishName": "Al-Faatiha",
                  "englishNameTranslation": "The Opening", "numberOfAyahs": 7, "revelationType": "Meccan" }
            ]
        }"#;
        let envelope: ApiEnvelope<Vec<SurahIndexEntry>> = serde_json::from_str(sample).unwrap();
        let info = envelope.data.into_iter().next().unwrap().to_domain();
        assert_eq!(info.number, 1);
        assert_eq!(info.ayah_count, 7);
    }

    #[test]
    fn empty_edition_list_is_an_error() {
        assert!(assemble_surah(1, Vec::new()).is_err());
    }
}
