//! Wyoming listener: one task per accepted connection.

use std::future::Future;
use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::{debug, info, warn};

use wyoming_silero_core::config::Endpoint;

use crate::error::Result;
use crate::handler::SynthesisService;

/// A bound listener, ready to serve.
pub enum Listener {
    Tcp(TcpListener),
    #[cfg(unix)]
    Unix(tokio::net::UnixListener, std::path::PathBuf),
}

/// Bind `endpoint`. A stale Unix socket file is removed first.
pub async fn bind(endpoint: &Endpoint) -> Result<Listener> {
    match endpoint {
        Endpoint::Tcp { host, port } => {
            let listener = TcpListener::bind((host.as_str(), *port)).await?;
            Ok(Listener::Tcp(listener))
        }
        #[cfg(unix)]
        Endpoint::Unix(path) => {
            if path.exists() {
                debug!("removing stale socket {}", path.display());
                std::fs::remove_file(path)?;
            }
            let listener = tokio::net::UnixListener::bind(path)?;
            Ok(Listener::Unix(listener, path.clone()))
        }
        #[cfg(not(unix))]
        Endpoint::Unix(path) => Err(std::io::Error::new(
            std::io::ErrorKind::Unsupported,
            format!("unix sockets are not supported here: {}", path.display()),
        )
        .into()),
    }
}

impl Listener {
    /// Human-readable address, resolving an ephemeral TCP port.
    pub fn local_addr(&self) -> String {
        match self {
            Listener::Tcp(listener) => match listener.local_addr() {
                Ok(addr) => format!("tcp://{addr}"),
                Err(_) => "tcp://?".to_string(),
            },
            #[cfg(unix)]
            Listener::Unix(_, path) => format!("unix://{}", path.display()),
        }
    }

    /// Accept connections until `shutdown` resolves.
    pub async fn serve(
        self,
        service: Arc<SynthesisService>,
        shutdown: impl Future<Output = ()>,
    ) -> Result<()> {
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("shutting down");
                    break;
                }
                accepted = self.accept(&service) => {
                    if let Err(e) = accepted {
                        warn!("accept failed: {e}");
                    }
                }
            }
        }

        self.cleanup();
        Ok(())
    }

    fn cleanup(&self) {
        match self {
            Listener::Tcp(_) => {}
            #[cfg(unix)]
            Listener::Unix(_, path) => {
                let _ = std::fs::remove_file(path);
            }
        }
    }

    async fn accept(&self, service: &Arc<SynthesisService>) -> std::io::Result<()> {
        match self {
            Listener::Tcp(listener) => {
                let (stream, peer) = listener.accept().await?;
                let _ = stream.set_nodelay(true);
                spawn_connection(service.clone(), stream, peer.to_string());
            }
            #[cfg(unix)]
            Listener::Unix(listener, _) => {
                let (stream, _) = listener.accept().await?;
                spawn_connection(service.clone(), stream, "unix".to_string());
            }
        }
        Ok(())
    }
}

fn spawn_connection<S>(service: Arc<SynthesisService>, stream: S, peer: String)
where
    S: tokio::io::AsyncRead + tokio::io::AsyncWrite + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        debug!("client connected: {peer}");
        match service.handle_connection(stream).await {
            Ok(()) => debug!("client disconnected: {peer}"),
            Err(e) => warn!("connection {peer} closed: {e}"),
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::WyomingClient;
    use crate::handler::tests::{FakeSynthesizer, russian_service};
    use wyoming_silero_core::ssml::SsmlOverlay;

    async fn start(endpoint: Endpoint) -> (Endpoint, tokio::sync::oneshot::Sender<()>, tokio::task::JoinHandle<Result<()>>) {
        let fake = Arc::new(FakeSynthesizer::new(&["aidar", "kseniya"], 4800));
        let service = Arc::new(russian_service(fake, SsmlOverlay::default()));
        let listener = bind(&endpoint).await.unwrap();
        let endpoint = match &listener {
            Listener::Tcp(l) => Endpoint::Tcp {
                host: "127.0.0.1".into(),
                port: l.local_addr().unwrap().port(),
            },
            #[cfg(unix)]
            Listener::Unix(..) => endpoint,
        };
        let (tx, rx) = tokio::sync::oneshot::channel();
        let task = tokio::spawn(listener.serve(service, async move {
            let _ = rx.await;
        }));
        (endpoint, tx, task)
    }

    #[tokio::test]
    async fn tcp_round_trip() {
        let (endpoint, stop, task) = start(Endpoint::Tcp {
            host: "127.0.0.1".into(),
            port: 0,
        })
        .await;

        let mut client = WyomingClient::connect(&endpoint).await.unwrap();
        let info = client.describe().await.unwrap();
        assert_eq!(info.tts[0].voices.len(), 2);

        let audio = client.synthesize("Привет", None).await.unwrap();
        assert_eq!(audio.format.rate, 48_000);
        assert_eq!(audio.pcm.len(), 4800 * 2);

        // a second client is served concurrently with the first
        let mut other = WyomingClient::connect(&endpoint).await.unwrap();
        let audio = other.synthesize("да", Some("aidar")).await.unwrap();
        assert_eq!(audio.format.width, 2);

        stop.send(()).unwrap();
        task.await.unwrap().unwrap();
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn unix_socket_replaces_stale_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("silero.sock");
        std::fs::write(&path, b"stale").unwrap();

        let (endpoint, stop, task) = start(Endpoint::Unix(path.clone())).await;
        let mut client = WyomingClient::connect(&endpoint).await.unwrap();
        let audio = client.synthesize("", None).await.unwrap();
        assert!(audio.pcm.is_empty());

        stop.send(()).unwrap();
        task.await.unwrap().unwrap();
        assert!(!path.exists());
    }
}
