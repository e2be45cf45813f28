//! Wyoming event framing and the events this server speaks.
//!
//! Every event is one JSON header line, optionally followed by a JSON data
//! block and a binary payload:
//!
//! ```text
//! {"type":"audio-chunk","data_length":41,"payload_length":2048,"version":"1.5.4"}\n
//! {"rate":48000,"width":2,"channels":1}<2048 bytes of PCM>
//! ```
//!
//! Data given inline in the header is merged with the data block, the block
//! winning on conflicts.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::{Error, Result};

/// Protocol version written into every header.
pub const PROTOCOL_VERSION: &str = "1.5.4";

/// Longest header line accepted.
const MAX_HEADER_BYTES: u64 = 1024 * 1024;

/// Largest data block or payload accepted.
const MAX_BODY_BYTES: usize = 64 * 1024 * 1024;

/// One framed Wyoming event.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub event_type: String,
    pub data: Map<String, Value>,
    pub payload: Option<Vec<u8>>,
}

impl Event {
    pub fn new(event_type: impl Into<String>) -> Self {
        Self {
            event_type: event_type.into(),
            data: Map::new(),
            payload: None,
        }
    }

    pub fn with_data(mut self, data: Map<String, Value>) -> Self {
        self.data = data;
        self
    }

    pub fn with_payload(mut self, payload: Vec<u8>) -> Self {
        self.payload = Some(payload);
        self
    }

    pub fn is_type(&self, event_type: &str) -> bool {
        self.event_type == event_type
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct Header {
    #[serde(rename = "type")]
    event_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    data: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    data_length: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    payload_length: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    version: Option<String>,
}

/// Read the next event. `Ok(None)` on a clean end of stream.
pub async fn read_event<R>(reader: &mut R) -> Result<Option<Event>>
where
    R: AsyncBufRead + Unpin,
{
    let mut line = Vec::new();
    let n = (&mut *reader)
        .take(MAX_HEADER_BYTES)
        .read_until(b'\n', &mut line)
        .await?;
    if n == 0 {
        return Ok(None);
    }
    if n as u64 == MAX_HEADER_BYTES && line.last() != Some(&b'\n') {
        return Err(Error::Protocol("header line too long".into()));
    }

    let header: Header = serde_json::from_slice(&line)?;
    let mut data = header.data.unwrap_or_default();

    if let Some(len) = header.data_length.filter(|&len| len > 0) {
        let block = read_block(reader, len, "data").await?;
        let extra: Map<String, Value> = serde_json::from_slice(&block)?;
        data.extend(extra);
    }

    let payload = match header.payload_length.filter(|&len| len > 0) {
        Some(len) => Some(read_block(reader, len, "payload").await?),
        None => None,
    };

    Ok(Some(Event {
        event_type: header.event_type,
        data,
        payload,
    }))
}

async fn read_block<R>(reader: &mut R, len: usize, what: &str) -> Result<Vec<u8>>
where
    R: AsyncBufRead + Unpin,
{
    if len > MAX_BODY_BYTES {
        return Err(Error::Protocol(format!("{what} too large: {len} bytes")));
    }
    let mut buf = vec![0u8; len];
    reader.read_exact(&mut buf).await?;
    Ok(buf)
}

/// Write one event and flush.
pub async fn write_event<W>(writer: &mut W, event: &Event) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let data = if event.data.is_empty() {
        None
    } else {
        Some(serde_json::to_vec(&event.data)?)
    };
    let payload = event.payload.as_deref().filter(|p| !p.is_empty());

    let header = Header {
        event_type: event.event_type.clone(),
        data: None,
        data_length: data.as_ref().map(Vec::len),
        payload_length: payload.map(<[u8]>::len),
        version: Some(PROTOCOL_VERSION.to_string()),
    };

    let mut buf = serde_json::to_vec(&header)?;
    buf.push(b'\n');
    if let Some(data) = data {
        buf.extend_from_slice(&data);
    }
    if let Some(payload) = payload {
        buf.extend_from_slice(payload);
    }

    writer.write_all(&buf).await?;
    writer.flush().await?;
    Ok(())
}

// ─── Typed events ──────────────────────────────────────────────────────────

/// A typed view of an [`Event`].
pub trait Eventable: Sized {
    const TYPE: &'static str;

    fn event(&self) -> Event;

    fn from_event(event: &Event) -> Result<Self>;

    fn is_type(event_type: &str) -> bool {
        event_type == Self::TYPE
    }
}

fn to_data<T: Serialize>(value: &T) -> Map<String, Value> {
    match serde_json::to_value(value) {
        Ok(Value::Object(map)) => map,
        _ => Map::new(),
    }
}

fn from_data<T: DeserializeOwned>(event: &Event, expected: &str) -> Result<T> {
    if event.event_type != expected {
        return Err(Error::Protocol(format!(
            "expected '{expected}' event, got '{}'",
            event.event_type
        )));
    }
    Ok(serde_json::from_value(Value::Object(event.data.clone()))?)
}

macro_rules! data_event {
    ($ty:ty, $name:literal) => {
        impl Eventable for $ty {
            const TYPE: &'static str = $name;

            fn event(&self) -> Event {
                Event::new(Self::TYPE).with_data(to_data(self))
            }

            fn from_event(event: &Event) -> Result<Self> {
                from_data(event, Self::TYPE)
            }
        }
    };
}

/// Ask the server what it offers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Describe {}

/// Credit for a program or voice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attribution {
    pub name: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TtsVoiceSpeaker {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TtsVoice {
    pub name: String,
    pub attribution: Attribution,
    pub installed: bool,
    pub description: Option<String>,
    pub version: Option<String>,
    #[serde(default)]
    pub languages: Vec<String>,
    #[serde(default)]
    pub speakers: Option<Vec<TtsVoiceSpeaker>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TtsProgram {
    pub name: String,
    pub attribution: Attribution,
    pub installed: bool,
    pub description: Option<String>,
    pub version: Option<String>,
    #[serde(default)]
    pub voices: Vec<TtsVoice>,
    #[serde(default)]
    pub supports_synthesize_streaming: bool,
}

/// Answer to [`Describe`]. Only the TTS section is populated by this server.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Info {
    #[serde(default)]
    pub asr: Vec<Value>,
    #[serde(default)]
    pub tts: Vec<TtsProgram>,
    #[serde(default)]
    pub handle: Vec<Value>,
    #[serde(default)]
    pub intent: Vec<Value>,
    #[serde(default)]
    pub wake: Vec<Value>,
    #[serde(default)]
    pub mic: Vec<Value>,
    #[serde(default)]
    pub snd: Vec<Value>,
}

/// Voice selection attached to a synthesis request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SynthesizeVoice {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speaker: Option<String>,
}

/// Request to speak `text`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Synthesize {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voice: Option<SynthesizeVoice>,
}

impl Synthesize {
    /// Speaker requested by the client: voice name first, then speaker.
    pub fn requested_speaker(&self) -> Option<&str> {
        let voice = self.voice.as_ref()?;
        voice
            .name
            .as_deref()
            .or(voice.speaker.as_deref())
            .filter(|name| !name.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioStart {
    pub rate: u32,
    pub width: u16,
    pub channels: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<u64>,
}

/// Raw PCM; the format fields travel in the data block, the samples in the payload.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioChunk {
    pub rate: u32,
    pub width: u16,
    pub channels: u16,
    pub timestamp: Option<u64>,
    pub audio: Vec<u8>,
}

#[derive(Debug, Serialize, Deserialize)]
struct AudioChunkData {
    rate: u32,
    width: u16,
    channels: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    timestamp: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AudioStop {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<u64>,
}

/// Error reported to the client; the connection stays open.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorEvent {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

data_event!(Describe, "describe");
data_event!(Info, "info");
data_event!(Synthesize, "synthesize");
data_event!(AudioStart, "audio-start");
data_event!(AudioStop, "audio-stop");
data_event!(ErrorEvent, "error");

impl Eventable for AudioChunk {
    const TYPE: &'static str = "audio-chunk";

    fn event(&self) -> Event {
        let data = AudioChunkData {
            rate: self.rate,
            width: self.width,
            channels: self.channels,
            timestamp: self.timestamp,
        };
        Event::new(Self::TYPE)
            .with_data(to_data(&data))
            .with_payload(self.audio.clone())
    }

    fn from_event(event: &Event) -> Result<Self> {
        let data: AudioChunkData = from_data(event, Self::TYPE)?;
        Ok(Self {
            rate: data.rate,
            width: data.width,
            channels: data.channels,
            timestamp: data.timestamp,
            audio: event.payload.clone().unwrap_or_default(),
        })
    }
}
