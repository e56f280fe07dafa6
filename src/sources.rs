//! External lookups: verse text from an alquran.cloud-style API, recitation
//! audio from an everyayah-style CDN. Both sit behind traits so the pipeline
//! can be driven by fakes in tests.

use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use async_trait::async_trait;
use futures_util::StreamExt as _;
use tokio::io::AsyncWriteExt as _;

use crate::{
    error::{VersereelError, VersereelResult},
    model::VerseRef,
};

/// Raw verse text as the corpus returns it; Arabic has not yet been through
/// orthography normalization.
#[derive(Clone, Debug)]
pub struct VerseText {
    pub arabic: String,
    pub translation: String,
    pub surah_name: String,
}

#[async_trait]
pub trait VerseCorpus: Send + Sync {
    /// Fails with a content-lookup error when the verse or its translation
    /// does not exist.
    async fn verse(&self, verse: VerseRef) -> VersereelResult<VerseText>;
}

#[async_trait]
pub trait RecitationSource: Send + Sync {
    /// Download one verse's recitation to `dest`, returning the written
    /// path. Fails with an asset-fetch error on timeout or missing audio.
    async fn fetch(&self, reciter: &str, verse: VerseRef, dest: &Path)
    -> VersereelResult<PathBuf>;
}

fn build_client(timeout_secs: u64) -> VersereelResult<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| VersereelError::Other(anyhow::Error::new(e)))
}

// -------------------------------------------------------------------------
// Verse text over HTTP

#[derive(serde::Deserialize)]
struct AyahEnvelope {
    code: i64,
    data: Vec<AyahEdition>,
}

#[derive(serde::Deserialize)]
struct AyahEdition {
    text: String,
    surah: Option<SurahInfo>,
}

#[derive(serde::Deserialize)]
struct SurahInfo {
    #[serde(rename = "englishName")]
    english_name: String,
}

pub struct HttpVerseCorpus {
    client: reqwest::Client,
    base_url: String,
    arabic_edition: String,
    translation_edition: String,
}

impl HttpVerseCorpus {
    pub fn new(
        base_url: &str,
        arabic_edition: &str,
        translation_edition: &str,
        timeout_secs: u64,
    ) -> VersereelResult<Self> {
        Ok(Self {
            client: build_client(timeout_secs)?,
            base_url: base_url.trim_end_matches('/').to_string(),
            arabic_edition: arabic_edition.to_string(),
            translation_edition: translation_edition.to_string(),
        })
    }

    fn verse_url(&self, verse: VerseRef) -> String {
        format!(
            "{}/ayah/{}:{}/editions/{},{}",
            self.base_url, verse.surah, verse.ayah, self.arabic_edition, self.translation_edition
        )
    }
}

#[async_trait]
impl VerseCorpus for HttpVerseCorpus {
    async fn verse(&self, verse: VerseRef) -> VersereelResult<VerseText> {
        let url = self.verse_url(verse);
        let response = self.client.get(&url).send().await.map_err(|e| {
            VersereelError::content_lookup(format!("verse {verse} request failed: {e}"))
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(VersereelError::content_lookup(format!(
                "verse {verse} not available ({status})"
            )));
        }

        let envelope: AyahEnvelope = response.json().await.map_err(|e| {
            VersereelError::content_lookup(format!("verse {verse} response unreadable: {e}"))
        })?;
        if envelope.code != 200 || envelope.data.len() < 2 {
            return Err(VersereelError::content_lookup(format!(
                "verse {verse} missing an edition in the corpus response"
            )));
        }

        let surah_name = envelope
            .data
            .iter()
            .find_map(|d| d.surah.as_ref())
            .map(|s| s.english_name.clone())
            .unwrap_or_default();
        let mut editions = envelope.data.into_iter();
        let arabic = editions.next().map(|d| d.text).unwrap_or_default();
        let translation = editions.next().map(|d| d.text).unwrap_or_default();

        if arabic.trim().is_empty() || translation.trim().is_empty() {
            return Err(VersereelError::content_lookup(format!(
                "verse {verse} has empty text in the corpus response"
            )));
        }

        Ok(VerseText {
            arabic,
            translation,
            surah_name,
        })
    }
}

// -------------------------------------------------------------------------
// Recitation audio over HTTP

pub struct HttpRecitationSource {
    client: reqwest::Client,
    base_url: String,
}

impl HttpRecitationSource {
    pub fn new(base_url: &str, timeout_secs: u64) -> VersereelResult<Self> {
        Ok(Self {
            client: build_client(timeout_secs)?,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn audio_url(&self, reciter: &str, verse: VerseRef) -> String {
        // CDN layout: surah and ayah zero-padded to three digits each.
        format!(
            "{}/{}/{:03}{:03}.mp3",
            self.base_url, reciter, verse.surah, verse.ayah
        )
    }
}

#[async_trait]
impl RecitationSource for HttpRecitationSource {
    async fn fetch(
        &self,
        reciter: &str,
        verse: VerseRef,
        dest: &Path,
    ) -> VersereelResult<PathBuf> {
        let url = self.audio_url(reciter, verse);
        let response = self.client.get(&url).send().await.map_err(|e| {
            VersereelError::asset_fetch(format!("audio for verse {verse} failed: {e}"))
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(VersereelError::asset_fetch(format!(
                "audio for verse {verse} not available from reciter '{reciter}' ({status})"
            )));
        }

        let mut file = tokio::fs::File::create(dest).await.map_err(|e| {
            VersereelError::asset_fetch(format!(
                "cannot create '{}' for verse {verse}: {e}",
                dest.display()
            ))
        })?;

        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| {
                VersereelError::asset_fetch(format!(
                    "audio stream for verse {verse} interrupted: {e}"
                ))
            })?;
            file.write_all(&chunk).await.map_err(|e| {
                VersereelError::asset_fetch(format!(
                    "cannot write '{}' for verse {verse}: {e}",
                    dest.display()
                ))
            })?;
        }
        file.flush().await.map_err(|e| {
            VersereelError::asset_fetch(format!(
                "cannot flush '{}' for verse {verse}: {e}",
                dest.display()
            ))
        })?;

        Ok(dest.to_path_buf())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verse_url_joins_reference_and_editions() {
        let corpus = HttpVerseCorpus::new(
            "https://api.example.com/v1/",
            "quran-uthmani",
            "en.sahih",
            30,
        )
        .unwrap();
        assert_eq!(
            corpus.verse_url(VerseRef { surah: 2, ayah: 255 }),
            "https://api.example.com/v1/ayah/2:255/editions/quran-uthmani,en.sahih"
        );
    }

    #[test]
    fn audio_url_zero_pads_surah_and_ayah() {
        let source = HttpRecitationSource::new("https://cdn.example.com/data/", 30).unwrap();
        assert_eq!(
            source.audio_url("Alafasy_128kbps", VerseRef { surah: 1, ayah: 1 }),
            "https://cdn.example.com/data/Alafasy_128kbps/001001.mp3"
        );
        assert_eq!(
            source.audio_url("Alafasy_128kbps", VerseRef { surah: 114, ayah: 6 }),
            "https://cdn.example.com/data/Alafasy_128kbps/114006.mp3"
        );
    }

    #[test]
    fn envelope_parses_the_editions_layout() {
        let json = r#"{
            "code": 200,
            "status": "OK",
            "data": [
                { "text": "arabic text", "surah": { "englishName": "Al-Faatiha" } },
                { "text": "translated text", "surah": { "englishName": "Al-Faatiha" } }
            ]
        }"#;
        let envelope: AyahEnvelope = serde_json::from_str(json).unwrap();
        assert_eq!(envelope.code, 200);
        assert_eq!(envelope.data.len(), 2);
        assert_eq!(envelope.data[0].text, "arabic text");
        assert_eq!(
            envelope.data[1].surah.as_ref().unwrap().english_name,
            "Al-Faatiha"
        );
    }
}
