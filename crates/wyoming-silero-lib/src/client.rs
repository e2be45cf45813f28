//! Minimal Wyoming client for poking a running server.

use tokio::io::{AsyncRead, AsyncWrite, BufReader};
use tokio::net::TcpStream;
use tracing::debug;

use wyoming_silero_core::config::Endpoint;
use wyoming_silero_core::types::AudioFormat;

use crate::error::{Error, Result};
use crate::protocol::{
    self, AudioChunk, AudioStart, AudioStop, Describe, ErrorEvent, Event, Eventable, Info,
    Synthesize, SynthesizeVoice,
};

type BoxedReader = Box<dyn AsyncRead + Unpin + Send>;
type BoxedWriter = Box<dyn AsyncWrite + Unpin + Send>;

/// Audio returned by one synthesis round trip.
#[derive(Debug, Clone)]
pub struct SynthesizedAudio {
    pub format: AudioFormat,
    /// Little-endian PCM as received.
    pub pcm: Vec<u8>,
}

pub struct WyomingClient {
    reader: BufReader<BoxedReader>,
    writer: BoxedWriter,
}

impl WyomingClient {
    pub async fn connect(endpoint: &Endpoint) -> Result<Self> {
        let (reader, writer): (BoxedReader, BoxedWriter) = match endpoint {
            Endpoint::Tcp { host, port } => {
                // a wildcard bind address is reachable on loopback
                let host = match host.as_str() {
                    "0.0.0.0" => "127.0.0.1",
                    "::" => "::1",
                    other => other,
                };
                let stream = TcpStream::connect((host, *port)).await?;
                let (r, w) = stream.into_split();
                (Box::new(r), Box::new(w))
            }
            #[cfg(unix)]
            Endpoint::Unix(path) => {
                let stream = tokio::net::UnixStream::connect(path).await?;
                let (r, w) = stream.into_split();
                (Box::new(r), Box::new(w))
            }
            #[cfg(not(unix))]
            Endpoint::Unix(path) => {
                return Err(Error::Protocol(format!(
                    "unix sockets are not supported here: {}",
                    path.display()
                )));
            }
        };
        debug!("connected to {endpoint}");
        Ok(Self {
            reader: BufReader::new(reader),
            writer,
        })
    }

    async fn send(&mut self, event: &Event) -> Result<()> {
        protocol::write_event(&mut self.writer, event).await
    }

    async fn next(&mut self) -> Result<Event> {
        protocol::read_event(&mut self.reader)
            .await?
            .ok_or_else(|| Error::Protocol("server closed the connection".into()))
    }

    /// Ask for the server's `info`.
    pub async fn describe(&mut self) -> Result<Info> {
        self.send(&Describe {}.event()).await?;
        loop {
            let event = self.next().await?;
            if Info::is_type(&event.event_type) {
                return Info::from_event(&event);
            }
            debug!("skipping {} while waiting for info", event.event_type);
        }
    }

    /// Synthesize `text`, optionally with a named voice, and collect the audio.
    pub async fn synthesize(&mut self, text: &str, voice: Option<&str>) -> Result<SynthesizedAudio> {
        let request = Synthesize {
            text: text.to_string(),
            voice: voice.map(|name| SynthesizeVoice {
                name: Some(name.to_string()),
                ..SynthesizeVoice::default()
            }),
        };
        self.send(&request.event()).await?;

        let mut format = None;
        let mut pcm = Vec::new();
        loop {
            let event = self.next().await?;
            if AudioStart::is_type(&event.event_type) {
                let start = AudioStart::from_event(&event)?;
                format = Some(AudioFormat {
                    rate: start.rate,
                    width: start.width,
                    channels: start.channels,
                });
            } else if AudioChunk::is_type(&event.event_type) {
                pcm.extend_from_slice(&AudioChunk::from_event(&event)?.audio);
            } else if AudioStop::is_type(&event.event_type) {
                let format = format
                    .ok_or_else(|| Error::Protocol("audio-stop before audio-start".into()))?;
                return Ok(SynthesizedAudio { format, pcm });
            } else if ErrorEvent::is_type(&event.event_type) {
                let err = ErrorEvent::from_event(&event)?;
                return Err(Error::Synthesis(err.text));
            } else {
                debug!("skipping {} during synthesis", event.event_type);
            }
        }
    }
}
