//! Voice catalog — Silero model registry lookup and voice advertisement.
//!
//! The registry is the `tts_models` section of Silero's `models.yml`:
//!
//! ```text
//! tts_models:
//!   <language>:
//!     <model>:
//!       latest:
//!         package: https://models.silero.ai/models/tts/<language>/<model>.pt
//!         sample_rate: [8000, 24000, 48000]
//! ```

use std::collections::BTreeMap;

use serde::Deserialize;
use thiserror::Error;

pub const MODELS_YML_URL: &str =
    "https://raw.githubusercontent.com/snakers4/silero-models/master/models.yml";

pub const ATTRIBUTION_NAME: &str = "Silero";
pub const ATTRIBUTION_URL: &str = "https://github.com/snakers4/silero-models";

/// Name advertised for the single voice of a model without a speaker list.
pub const FALLBACK_VOICE: &str = "default";

/// Multilingual model that lives under its own registry language.
const MULTI_MODEL: &str = "multi_v2";
const MULTI_LANGUAGE: &str = "multi";

/// Catalog lookup error. All of these abort start-up.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("cannot parse model registry: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("language '{language}' not found in model registry; available: {}", .available.join(", "))]
    LanguageNotFound {
        language: String,
        available: Vec<String>,
    },

    #[error("model '{model}' not found for language '{language}'; available: {}", .available.join(", "))]
    ModelNotFound {
        model: String,
        language: String,
        available: Vec<String>,
    },

    #[error("model '{model}' has no package URL (JIT-only models are not supported)")]
    NoPackage { model: String },

    #[error("model '{model}' does not support sample rate {rate}; supported: {}", join_rates(.supported))]
    UnsupportedSampleRate {
        model: String,
        rate: u32,
        supported: Vec<u32>,
    },

    #[error("speaker '{speaker}' not found in model '{model}'; available: {}", .available.join(", "))]
    SpeakerNotFound {
        speaker: String,
        model: String,
        available: Vec<String>,
    },
}

fn join_rates(rates: &[u32]) -> String {
    rates
        .iter()
        .map(u32::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// ISO-639-1 code advertised to clients for a Silero language code.
pub fn advertised_language(code: &str) -> String {
    match code {
        "ua" => "uk".to_string(),
        other => other.to_string(),
    }
}

/// Registry language under which `model` is published.
pub fn registry_language<'a>(language: &'a str, model: &str) -> &'a str {
    if model == MULTI_MODEL {
        MULTI_LANGUAGE
    } else {
        language
    }
}

// ─── Registry ──────────────────────────────────────────────────────────────

/// Parsed `models.yml`. Sections other than `tts_models` are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ModelRegistry {
    #[serde(default)]
    tts_models: BTreeMap<String, BTreeMap<String, BTreeMap<String, ModelRelease>>>,
}

/// One release entry of a model.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ModelRelease {
    #[serde(default)]
    pub package: Option<String>,
    #[serde(default)]
    pub sample_rate: Option<SampleRates>,
}

/// `sample_rate` is either a single value or a list.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum SampleRates {
    One(u32),
    Many(Vec<u32>),
}

impl SampleRates {
    pub fn to_vec(&self) -> Vec<u32> {
        match self {
            Self::One(rate) => vec![*rate],
            Self::Many(rates) => rates.clone(),
        }
    }
}

/// A model package resolved from the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelPackage {
    pub language: String,
    pub model: String,
    pub url: String,
    /// Empty when the registry does not list rates.
    pub sample_rates: Vec<u32>,
}

impl ModelPackage {
    /// File name of the package inside the cache directory.
    pub fn filename(&self) -> &str {
        let path = self.url.split(['?', '#']).next().unwrap_or(&self.url);
        path.rsplit('/').find(|s| !s.is_empty()).unwrap_or(&self.model)
    }
}

impl ModelRegistry {
    pub fn parse(yaml: &str) -> Result<Self, CatalogError> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn languages(&self) -> Vec<String> {
        self.tts_models.keys().cloned().collect()
    }

    pub fn models(&self, language: &str) -> Vec<String> {
        self.tts_models
            .get(language)
            .map(|models| models.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Resolve the latest release of `model` for the configured `language`,
    /// checking that it ships a package and supports `sample_rate`.
    pub fn resolve(
        &self,
        language: &str,
        model: &str,
        sample_rate: u32,
    ) -> Result<ModelPackage, CatalogError> {
        let language = registry_language(language, model);

        let models = self
            .tts_models
            .get(language)
            .ok_or_else(|| CatalogError::LanguageNotFound {
                language: language.to_string(),
                available: self.languages(),
            })?;

        let versions = models.get(model).ok_or_else(|| CatalogError::ModelNotFound {
            model: model.to_string(),
            language: language.to_string(),
            available: self.models(language),
        })?;

        let release = versions.get("latest");
        let url = release
            .and_then(|r| r.package.as_deref())
            .filter(|url| !url.trim().is_empty())
            .ok_or_else(|| CatalogError::NoPackage {
                model: model.to_string(),
            })?;

        let sample_rates = release
            .and_then(|r| r.sample_rate.as_ref())
            .map(SampleRates::to_vec)
            .unwrap_or_default();
        if !sample_rates.is_empty() && !sample_rates.contains(&sample_rate) {
            return Err(CatalogError::UnsupportedSampleRate {
                model: model.to_string(),
                rate: sample_rate,
                supported: sample_rates,
            });
        }

        Ok(ModelPackage {
            language: language.to_string(),
            model: model.to_string(),
            url: url.trim().to_string(),
            sample_rates,
        })
    }
}

// ─── Catalog ───────────────────────────────────────────────────────────────

/// One (language, model, speaker) combination advertised to clients.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoiceDescriptor {
    pub name: String,
    pub description: String,
    /// ISO-639-1 code.
    pub language: String,
    pub model: String,
}

/// Everything the server advertises, built once after the model is loaded.
#[derive(Debug, Clone)]
pub struct VoiceCatalog {
    pub program_name: String,
    pub description: String,
    pub language: String,
    pub model: String,
    pub voices: Vec<VoiceDescriptor>,
    pub default_speaker: String,
    /// The model reported its own speakers.
    pub speakers_known: bool,
}

impl VoiceCatalog {
    /// Build the catalog from the speakers the loaded model reports.
    ///
    /// A requested speaker missing from a non-empty list is an error; with no
    /// request the first speaker becomes the default. Models without a
    /// speaker list are advertised as a single voice.
    pub fn build(
        language: &str,
        model: &str,
        requested: Option<&str>,
        speakers: &[String],
    ) -> Result<Self, CatalogError> {
        let lang = advertised_language(language);

        let (voices, default_speaker) = if speakers.is_empty() {
            let name = requested.unwrap_or(FALLBACK_VOICE).to_string();
            let voice = VoiceDescriptor {
                name: name.clone(),
                description: format!("Silero {lang} {model}"),
                language: lang.clone(),
                model: model.to_string(),
            };
            (vec![voice], name)
        } else {
            let default_speaker = match requested {
                Some(speaker) if speakers.iter().any(|s| s == speaker) => speaker.to_string(),
                Some(speaker) => {
                    return Err(CatalogError::SpeakerNotFound {
                        speaker: speaker.to_string(),
                        model: model.to_string(),
                        available: speakers.to_vec(),
                    });
                }
                None => speakers[0].clone(),
            };
            let voices = speakers
                .iter()
                .map(|speaker| VoiceDescriptor {
                    name: speaker.clone(),
                    description: speaker.clone(),
                    language: lang.clone(),
                    model: model.to_string(),
                })
                .collect();
            (voices, default_speaker)
        };

        Ok(Self {
            program_name: format!("silero-{lang}"),
            description: format!("Silero TTS {lang}"),
            language: lang,
            model: model.to_string(),
            voices,
            default_speaker,
            speakers_known: !speakers.is_empty(),
        })
    }

    pub fn contains(&self, speaker: &str) -> bool {
        self.voices.iter().any(|v| v.name == speaker)
    }

    /// Pick the speaker for one request. Unknown names fall back to the
    /// default speaker; the flag reports whether that happened.
    pub fn select_speaker<'a>(&'a self, requested: Option<&'a str>) -> (&'a str, bool) {
        match requested {
            Some(name) if self.speakers_known && self.contains(name) => (name, false),
            Some(name) => (self.default_speaker.as_str(), name != self.default_speaker),
            None => (self.default_speaker.as_str(), false),
        }
    }
}
