//! Per-connection Wyoming event handling.

use std::sync::Arc;
use std::time::Instant;

use tokio::io::{AsyncRead, AsyncWrite, BufReader};
use tracing::{debug, error, info, warn};

use wyoming_silero_core::catalog::{ATTRIBUTION_NAME, ATTRIBUTION_URL, VoiceCatalog};
use wyoming_silero_core::ssml::SsmlOverlay;
use wyoming_silero_core::text_prep;
use wyoming_silero_core::types::{AUDIO_CHUNK_BYTES, AudioFormat};
use wyoming_silero_core::wav;

use crate::engine::{SynthesisRequest, Synthesizer};
use crate::error::Result;
use crate::protocol::{
    self, Attribution, AudioChunk, AudioStart, AudioStop, Describe, ErrorEvent, Event, Eventable,
    Info, Synthesize, TtsProgram, TtsVoice,
};

/// Error code sent when a synthesis request fails.
pub const SYNTHESIS_FAILED: &str = "synthesis-failed";

const PREVIEW_CHARS: usize = 50;

/// Shared state for all connections: the advertised catalog, the engine and
/// the per-request settings.
pub struct SynthesisService {
    catalog: VoiceCatalog,
    synthesizer: Arc<dyn Synthesizer>,
    overlay: SsmlOverlay,
    sample_rate: u32,
    info: Info,
}

impl SynthesisService {
    pub fn new(
        catalog: VoiceCatalog,
        synthesizer: Arc<dyn Synthesizer>,
        overlay: SsmlOverlay,
        sample_rate: u32,
    ) -> Self {
        let info = build_info(&catalog);
        Self {
            catalog,
            synthesizer,
            overlay,
            sample_rate,
            info,
        }
    }

    /// Number normalization, then the SSML overlay.
    pub fn prepare_text(&self, text: &str) -> String {
        let normalized = text_prep::normalize_numbers(text, &self.catalog.language);
        self.overlay.apply(&normalized)
    }

    /// Serve events from one client until it disconnects.
    pub async fn handle_connection<S>(&self, stream: S) -> Result<()>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let (reader, mut writer) = tokio::io::split(stream);
        let mut reader = BufReader::new(reader);

        while let Some(event) = protocol::read_event(&mut reader).await? {
            if Describe::is_type(&event.event_type) {
                protocol::write_event(&mut writer, &self.info.event()).await?;
                debug!("sent info");
            } else if Synthesize::is_type(&event.event_type) {
                let request = match Synthesize::from_event(&event) {
                    Ok(request) => request,
                    Err(e) => {
                        warn!("malformed synthesize event: {e}");
                        continue;
                    }
                };
                for reply in self.synthesize(&request).await {
                    protocol::write_event(&mut writer, &reply).await?;
                }
            } else {
                debug!("ignoring event: {}", event.event_type);
            }
        }

        Ok(())
    }

    /// Events answering one `synthesize` request: the audio stream, or a
    /// single `error` event.
    pub async fn synthesize(&self, request: &Synthesize) -> Vec<Event> {
        let (speaker, fell_back) = self.catalog.select_speaker(request.requested_speaker());
        if fell_back {
            warn!(
                "unknown voice {:?}, using {speaker}",
                request.requested_speaker().unwrap_or_default()
            );
        }

        let format = AudioFormat::pcm16_mono(self.sample_rate);
        let text = request.text.trim();
        if text.is_empty() {
            debug!("empty text, sending empty audio");
            return audio_events(format, &[]);
        }

        let prepared = self.prepare_text(text);
        info!("synthesizing {:?} as {speaker}", preview(&prepared));
        debug!("prepared text: {prepared}");

        let started = Instant::now();
        let synthesis = SynthesisRequest {
            text: prepared,
            speaker: speaker.to_string(),
            sample_rate: self.sample_rate,
        };

        match self.synthesizer.synthesize(&synthesis).await {
            Ok(samples) => {
                let pcm = wav::pcm16_to_le_bytes(&wav::float_to_pcm16(&samples));
                info!(
                    "synthesized {:.2}s of audio ({} bytes) in {:.2}s",
                    wav::duration_secs(pcm.len(), &format),
                    pcm.len(),
                    started.elapsed().as_secs_f64()
                );
                audio_events(format, &pcm)
            }
            Err(e) => {
                error!("synthesis failed: {e}");
                vec![
                    ErrorEvent {
                        text: e.to_string(),
                        code: Some(SYNTHESIS_FAILED.to_string()),
                    }
                    .event(),
                ]
            }
        }
    }
}

fn audio_events(format: AudioFormat, pcm: &[u8]) -> Vec<Event> {
    let mut events = Vec::with_capacity(pcm.len() / AUDIO_CHUNK_BYTES + 3);
    events.push(
        AudioStart {
            rate: format.rate,
            width: format.width,
            channels: format.channels,
            timestamp: None,
        }
        .event(),
    );
    for chunk in pcm.chunks(AUDIO_CHUNK_BYTES) {
        events.push(
            AudioChunk {
                rate: format.rate,
                width: format.width,
                channels: format.channels,
                timestamp: None,
                audio: chunk.to_vec(),
            }
            .event(),
        );
    }
    events.push(AudioStop::default().event());
    events
}

fn preview(text: &str) -> String {
    let mut chars = text.chars();
    let head: String = chars.by_ref().take(PREVIEW_CHARS).collect();
    if chars.next().is_some() {
        format!("{head}...")
    } else {
        head
    }
}

fn attribution() -> Attribution {
    Attribution {
        name: ATTRIBUTION_NAME.to_string(),
        url: ATTRIBUTION_URL.to_string(),
    }
}

/// The `info` answer for `catalog`: one TTS program, one voice per speaker.
pub fn build_info(catalog: &VoiceCatalog) -> Info {
    let voices = catalog
        .voices
        .iter()
        .map(|voice| TtsVoice {
            name: voice.name.clone(),
            attribution: attribution(),
            installed: true,
            description: Some(voice.description.clone()),
            version: None,
            languages: vec![voice.language.clone()],
            speakers: None,
        })
        .collect();

    Info {
        tts: vec![TtsProgram {
            name: catalog.program_name.clone(),
            attribution: attribution(),
            installed: true,
            description: Some(catalog.description.clone()),
            version: Some(env!("CARGO_PKG_VERSION").to_string()),
            voices,
            supports_synthesize_streaming: false,
        }],
        ..Info::default()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::error::Error;
    use crate::protocol::SynthesizeVoice;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use wyoming_silero_core::ssml::ProsodyRate;

    /// Returns a fixed number of samples per call, failing on text "fail".
    pub(crate) struct FakeSynthesizer {
        pub speakers: Vec<String>,
        pub samples: usize,
        pub calls: Mutex<Vec<SynthesisRequest>>,
    }

    impl FakeSynthesizer {
        pub(crate) fn new(speakers: &[&str], samples: usize) -> Self {
            Self {
                speakers: speakers.iter().map(|s| s.to_string()).collect(),
                samples,
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl Synthesizer for FakeSynthesizer {
        fn speakers(&self) -> &[String] {
            &self.speakers
        }

        async fn synthesize(&self, request: &SynthesisRequest) -> Result<Vec<f32>> {
            self.calls.lock().unwrap().push(request.clone());
            if request.text.contains("fail") {
                return Err(Error::Synthesis("engine exploded".into()));
            }
            Ok(vec![0.5; self.samples])
        }
    }

    pub(crate) fn russian_service(fake: Arc<FakeSynthesizer>, overlay: SsmlOverlay) -> SynthesisService {
        let catalog = VoiceCatalog::build("ru", "v5_1_ru", Some("kseniya"), fake.speakers()).unwrap();
        SynthesisService::new(catalog, fake, overlay, 48_000)
    }

    fn synth(text: &str, voice: Option<&str>) -> Synthesize {
        Synthesize {
            text: text.into(),
            voice: voice.map(|name| SynthesizeVoice {
                name: Some(name.into()),
                ..SynthesizeVoice::default()
            }),
        }
    }

    #[tokio::test]
    async fn streams_audio_at_configured_rate() {
        let fake = Arc::new(FakeSynthesizer::new(&["aidar", "kseniya"], 3000));
        let service = russian_service(fake.clone(), SsmlOverlay::default());

        let events = service.synthesize(&synth("Привет", None)).await;
        let start = AudioStart::from_event(&events[0]).unwrap();
        assert_eq!((start.rate, start.width, start.channels), (48_000, 2, 1));

        // 3000 samples * 2 bytes = 6000 bytes -> 2048 + 2048 + 1904
        let chunks: Vec<_> = events[1..events.len() - 1]
            .iter()
            .map(|e| AudioChunk::from_event(e).unwrap())
            .collect();
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].audio.len(), 2048);
        assert_eq!(chunks[2].audio.len(), 1904);
        assert!(events.last().unwrap().is_type("audio-stop"));

        let calls = fake.calls.lock().unwrap();
        assert_eq!(calls[0].speaker, "kseniya");
        assert_eq!(calls[0].sample_rate, 48_000);
    }

    #[tokio::test]
    async fn empty_text_skips_engine() {
        let fake = Arc::new(FakeSynthesizer::new(&["kseniya"], 10));
        let service = russian_service(fake.clone(), SsmlOverlay::default());

        let events = service.synthesize(&synth("   ", None)).await;
        assert_eq!(events.len(), 2);
        assert!(events[0].is_type("audio-start"));
        assert!(events[1].is_type("audio-stop"));
        assert!(fake.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn failure_becomes_error_event() {
        let fake = Arc::new(FakeSynthesizer::new(&["kseniya"], 10));
        let service = russian_service(fake, SsmlOverlay::default());

        let events = service.synthesize(&synth("please fail", None)).await;
        assert_eq!(events.len(), 1);
        let err = ErrorEvent::from_event(&events[0]).unwrap();
        assert_eq!(err.code.as_deref(), Some(SYNTHESIS_FAILED));
        assert!(err.text.contains("engine exploded"));
    }

    #[tokio::test]
    async fn request_voice_selects_speaker_or_falls_back() {
        let fake = Arc::new(FakeSynthesizer::new(&["aidar", "kseniya"], 10));
        let service = russian_service(fake.clone(), SsmlOverlay::default());

        service.synthesize(&synth("да", Some("aidar"))).await;
        service.synthesize(&synth("да", Some("nobody"))).await;

        let calls = fake.calls.lock().unwrap();
        assert_eq!(calls[0].speaker, "aidar");
        assert_eq!(calls[1].speaker, "kseniya");
    }

    #[tokio::test]
    async fn text_is_normalized_then_overlaid() {
        let fake = Arc::new(FakeSynthesizer::new(&["kseniya"], 10));
        let overlay = SsmlOverlay::new(Some(ProsodyRate::Slow), None, None, None);
        let service = russian_service(fake.clone(), overlay);

        service.synthesize(&synth("5 котов", None)).await;

        let calls = fake.calls.lock().unwrap();
        assert_eq!(
            calls[0].text,
            r#"<speak><prosody rate="slow">пять котов</prosody></speak>"#
        );
    }

    #[test]
    fn info_advertises_catalog() {
        let catalog = VoiceCatalog::build("ua", "v4_ua", None, &["mykyta".to_string()]).unwrap();
        let info = build_info(&catalog);
        assert_eq!(info.tts.len(), 1);
        let program = &info.tts[0];
        assert!(program.installed);
        assert!(!program.supports_synthesize_streaming);
        assert_eq!(program.voices[0].name, "mykyta");
        assert_eq!(program.voices[0].languages, vec!["uk".to_string()]);
        assert_eq!(program.voices[0].attribution.name, "Silero");
    }

    #[tokio::test]
    async fn connection_survives_failed_request() {
        let fake = Arc::new(FakeSynthesizer::new(&["kseniya"], 100));
        let service = Arc::new(russian_service(fake, SsmlOverlay::default()));
        let (client, server) = tokio::io::duplex(64 * 1024);

        let task = {
            let service = service.clone();
            tokio::spawn(async move { service.handle_connection(server).await })
        };

        let (read_half, mut write_half) = tokio::io::split(client);
        let mut reader = BufReader::new(read_half);

        protocol::write_event(&mut write_half, &Event::new("ping")).await.unwrap();
        protocol::write_event(&mut write_half, &Describe {}.event()).await.unwrap();
        let info = protocol::read_event(&mut reader).await.unwrap().unwrap();
        assert!(Info::is_type(&info.event_type));
        assert_eq!(Info::from_event(&info).unwrap().tts[0].voices[0].languages, vec!["ru"]);

        protocol::write_event(&mut write_half, &synth("fail", None).event()).await.unwrap();
        let err = protocol::read_event(&mut reader).await.unwrap().unwrap();
        assert!(err.is_type("error"));

        protocol::write_event(&mut write_half, &synth("ok", None).event()).await.unwrap();
        let start = protocol::read_event(&mut reader).await.unwrap().unwrap();
        assert!(start.is_type("audio-start"));
        let chunk = protocol::read_event(&mut reader).await.unwrap().unwrap();
        assert_eq!(chunk.payload.map(|p| p.len()), Some(200));
        let stop = protocol::read_event(&mut reader).await.unwrap().unwrap();
        assert!(stop.is_type("audio-stop"));

        drop(write_half);
        drop(reader);
        task.await.unwrap().unwrap();
    }
}
