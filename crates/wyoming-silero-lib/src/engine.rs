//! Synthesis backends.
//!
//! The Silero models run in a separate engine service reached over HTTP;
//! the handler only sees the [`Synthesizer`] trait.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use wyoming_silero_core::catalog::ModelPackage;
use wyoming_silero_core::ssml::is_ssml;
use wyoming_silero_core::wav;

use crate::error::{Error, Result};

/// How long start-up waits for the engine to answer `/health`.
pub const HEALTH_TIMEOUT: Duration = Duration::from_secs(60);

const HEALTH_POLL: Duration = Duration::from_millis(500);

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Loading a package reads and unpacks the whole model.
const MODEL_LOAD_TIMEOUT: Duration = Duration::from_secs(300);

/// Upper bound for one `/synthesize` call.
const SYNTHESIS_TIMEOUT: Duration = Duration::from_secs(120);

/// One synthesis call: already normalized text, a resolved speaker and rate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynthesisRequest {
    pub text: String,
    pub speaker: String,
    pub sample_rate: u32,
}

#[async_trait]
pub trait Synthesizer: Send + Sync {
    /// Speakers the loaded model reports. Empty when it has no list.
    fn speakers(&self) -> &[String];

    /// Mono float samples in `[-1.0, 1.0]` at the requested rate.
    async fn synthesize(&self, request: &SynthesisRequest) -> Result<Vec<f32>>;
}

#[derive(Debug, Serialize)]
struct LoadModelBody<'a> {
    language: &'a str,
    model: &'a str,
    package: String,
}

#[derive(Debug, Deserialize)]
struct LoadModelReply {
    #[serde(default)]
    speakers: Vec<String>,
}

#[derive(Debug, Serialize)]
struct SynthesizeBody<'a> {
    model: &'a str,
    speaker: &'a str,
    sample_rate: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    ssml_text: Option<&'a str>,
}

impl<'a> SynthesizeBody<'a> {
    fn new(model: &'a str, request: &'a SynthesisRequest) -> Self {
        let ssml = is_ssml(&request.text);
        Self {
            model,
            speaker: &request.speaker,
            sample_rate: request.sample_rate,
            text: (!ssml).then_some(request.text.as_str()),
            ssml_text: ssml.then_some(request.text.as_str()),
        }
    }
}

/// HTTP client for the engine service with one model loaded.
pub struct RemoteEngine {
    client: reqwest::Client,
    base_url: String,
    model: String,
    speakers: Vec<String>,
    synthesis_timeout: Duration,
}

impl RemoteEngine {
    /// Wait for the engine, then load `package` from `package_path`.
    pub async fn connect(base_url: &str, package: &ModelPackage, package_path: &Path) -> Result<Self> {
        Self::connect_within(base_url, package, package_path, HEALTH_TIMEOUT).await
    }

    pub async fn connect_within(
        base_url: &str,
        package: &ModelPackage,
        package_path: &Path,
        health_timeout: Duration,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()?;
        let base_url = base_url.trim_end_matches('/').to_string();

        wait_for_health(&client, &base_url, health_timeout).await?;

        let body = LoadModelBody {
            language: &package.language,
            model: &package.model,
            package: package_path.display().to_string(),
        };
        let resp = client
            .post(format!("{base_url}/models"))
            .timeout(MODEL_LOAD_TIMEOUT)
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::Engine(format!("model load request failed: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(Error::Engine(format!(
                "engine refused model {}: {status} {text}",
                package.model
            )));
        }

        let reply: LoadModelReply = resp
            .json()
            .await
            .map_err(|e| Error::Engine(format!("bad model load reply: {e}")))?;

        info!(
            "engine loaded {} ({} speakers)",
            package.model,
            reply.speakers.len()
        );

        Ok(Self {
            client,
            base_url,
            model: package.model.clone(),
            speakers: reply.speakers,
            synthesis_timeout: SYNTHESIS_TIMEOUT,
        })
    }
}

async fn wait_for_health(client: &reqwest::Client, base_url: &str, timeout: Duration) -> Result<()> {
    let url = format!("{base_url}/health");
    let deadline = tokio::time::Instant::now() + timeout;

    loop {
        match client.get(&url).timeout(HEALTH_POLL * 2).send().await {
            Ok(resp) if resp.status().is_success() => return Ok(()),
            Ok(resp) => debug!("engine not ready: {}", resp.status()),
            Err(e) => debug!("engine not reachable: {e}"),
        }

        if tokio::time::Instant::now() + HEALTH_POLL > deadline {
            return Err(Error::Engine(format!(
                "engine at {base_url} did not become ready within {}s",
                timeout.as_secs()
            )));
        }
        tokio::time::sleep(HEALTH_POLL).await;
    }
}

#[async_trait]
impl Synthesizer for RemoteEngine {
    fn speakers(&self) -> &[String] {
        &self.speakers
    }

    async fn synthesize(&self, request: &SynthesisRequest) -> Result<Vec<f32>> {
        let body = SynthesizeBody::new(&self.model, request);
        debug!("engine: POST {} chars as {}", request.text.len(), request.speaker);

        let resp = self
            .client
            .post(format!("{}/synthesize", self.base_url))
            .timeout(self.synthesis_timeout)
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::Synthesis(format!("request failed: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(Error::Synthesis(format!("engine error {status}: {text}")));
        }

        let bytes = resp
            .bytes()
            .await
            .map_err(|e| Error::Synthesis(format!("stream error: {e}")))?;
        wav::f32_samples_from_le_bytes(&bytes).map_err(|e| Error::Synthesis(e.to_string()))
    }
}
