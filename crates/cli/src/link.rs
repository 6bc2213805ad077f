//! Link server transport: Socket.IO over Engine.IO long-polling.
//!
//! One background task per [`LinkMonitor`]. It opens an Engine.IO session,
//! joins the default namespace, long-polls for packets, answers pings, and
//! feeds Socket.IO events into a [`LinkViewer`] published on a watch channel.
//! A lost session shows as `Disconnected` and is re-opened after
//! [`RECONNECT_DELAY`]. Nothing is ever emitted to the server.
//!
//! `ureq` is blocking, so the loop runs under `spawn_blocking`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use repairdesk_core::link::packet::{
    decode_payload, decode_socket, encode_payload, EnginePacket, PacketError, SocketPacket,
};
use repairdesk_core::{LinkEvent, LinkViewer};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use ureq::http::Response;
use ureq::Body;

pub const RECONNECT_DELAY: Duration = Duration::from_secs(3);

/// Granularity at which a sleeping loop notices `stop`.
const STOP_POLL: Duration = Duration::from_millis(100);

/// Deadline for the handshake and for posts to the server.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(20);

/// The tunnel in front of the link server serves an HTML interstitial
/// unless this header is present.
const SKIP_WARNING_HEADER: &str = "ngrok-skip-browser-warning";

#[derive(Debug, thiserror::Error)]
pub enum LinkError {
    #[error("request failed: {0}")]
    Transport(#[from] ureq::Error),
    #[error("link server returned HTTP {0}")]
    Status(u16),
    #[error(transparent)]
    Packet(#[from] PacketError),
    #[error("link server did not open a session")]
    NoHandshake,
    #[error("link server closed the session")]
    Closed,
}

/// Handle to the background link connection.
///
/// Dropping the monitor (or calling [`LinkMonitor::stop`]) ends the
/// connection after the in-flight poll returns. A poll never outlasts the
/// server's `pingInterval + pingTimeout`; past that the session counts as lost.
pub struct LinkMonitor {
    rx: watch::Receiver<LinkViewer>,
    stop: Arc<AtomicBool>,
    task: Option<JoinHandle<()>>,
}

impl LinkMonitor {
    /// Start watching `url`. With no URL the viewer shows a configuration
    /// error and no connection is attempted.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(url: Option<&str>) -> LinkMonitor {
        let stop = Arc::new(AtomicBool::new(false));
        let Some(url) = url else {
            tracing::warn!("link server URL is not configured");
            let (_tx, rx) = watch::channel(LinkViewer::unconfigured());
            return LinkMonitor {
                rx,
                stop,
                task: None,
            };
        };

        let (tx, rx) = watch::channel(LinkViewer::connecting());
        let client = PollingClient::new(url);
        let flag = stop.clone();
        tracing::info!(url = %url, "starting link monitor");
        let task = tokio::task::spawn_blocking(move || run(client, tx, flag));
        LinkMonitor {
            rx,
            stop,
            task: Some(task),
        }
    }

    pub fn is_connecting(&self) -> bool {
        self.task.is_some()
    }

    pub fn subscribe(&self) -> watch::Receiver<LinkViewer> {
        self.rx.clone()
    }

    pub fn current(&self) -> LinkViewer {
        self.rx.borrow().clone()
    }

    pub fn stop(&self) {
        self.stop.store(true, Ordering::SeqCst);
    }
}

impl Drop for LinkMonitor {
    fn drop(&mut self) {
        self.stop();
    }
}

fn stopped(stop: &AtomicBool, tx: &watch::Sender<LinkViewer>) -> bool {
    stop.load(Ordering::SeqCst) || tx.is_closed()
}

fn run(client: PollingClient, tx: watch::Sender<LinkViewer>, stop: Arc<AtomicBool>) {
    while !stopped(&stop, &tx) {
        match client.session(&tx, &stop) {
            Ok(()) => break,
            Err(e) => {
                tracing::warn!(error = %e, "link connection lost");
                tx.send_modify(|v| v.apply(LinkEvent::Disconnect));
            }
        }
        let mut waited = Duration::ZERO;
        while waited < RECONNECT_DELAY && !stopped(&stop, &tx) {
            std::thread::sleep(STOP_POLL);
            waited += STOP_POLL;
        }
    }
    tracing::debug!("link monitor stopped");
}

struct PollingClient {
    agent: ureq::Agent,
    endpoint: String,
}

impl PollingClient {
    fn new(url: &str) -> Self {
        let config = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .build();
        PollingClient {
            agent: ureq::Agent::new_with_config(config),
            endpoint: format!(
                "{}/socket.io/?EIO=4&transport=polling",
                url.trim_end_matches('/')
            ),
        }
    }

    fn get(&self, url: &str, deadline: Duration) -> Result<String, LinkError> {
        let response = self
            .agent
            .get(url)
            .header(SKIP_WARNING_HEADER, "true")
            .config()
            .timeout_global(Some(deadline))
            .build()
            .call()?;
        read_body(response)
    }

    fn post(&self, url: &str, body: &str) -> Result<(), LinkError> {
        let response = self
            .agent
            .post(url)
            .header(SKIP_WARNING_HEADER, "true")
            .header("Content-Type", "text/plain;charset=UTF-8")
            .config()
            .timeout_global(Some(REQUEST_TIMEOUT))
            .build()
            .send(body)?;
        read_body(response).map(|_| ())
    }

    /// One Engine.IO session, from handshake until it ends.
    ///
    /// `Ok` only when asked to stop.
    fn session(&self, tx: &watch::Sender<LinkViewer>, stop: &AtomicBool) -> Result<(), LinkError> {
        let handshake = decode_payload(&self.get(&self.endpoint, REQUEST_TIMEOUT)?)?
            .into_iter()
            .find_map(|p| match p {
                EnginePacket::Open(h) => Some(h),
                _ => None,
            })
            .ok_or(LinkError::NoHandshake)?;
        tracing::debug!(sid = %handshake.sid, ping_interval = handshake.ping_interval, "link session opened");
        let poll_deadline =
            Duration::from_millis(handshake.ping_interval.saturating_add(handshake.ping_timeout));

        let url = format!("{}&sid={}", self.endpoint, handshake.sid);
        self.post(&url, &EnginePacket::Message(SocketPacket::connect().encode()).encode())?;

        loop {
            if stopped(stop, tx) {
                let bye = encode_payload(&[
                    EnginePacket::Message(SocketPacket::disconnect().encode()),
                    EnginePacket::Close,
                ]);
                if let Err(e) = self.post(&url, &bye) {
                    tracing::debug!(error = %e, "could not close link session cleanly");
                }
                return Ok(());
            }

            for packet in decode_payload(&self.get(&url, poll_deadline)?)? {
                match packet {
                    EnginePacket::Ping(data) => self.post(&url, &EnginePacket::Pong(data).encode())?,
                    EnginePacket::Message(data) => match decode_socket(&data) {
                        Ok(socket) => {
                            if let Some(event) = socket.into_link_event() {
                                let lost = event == LinkEvent::Disconnect;
                                tx.send_modify(|v| v.apply(event));
                                if lost {
                                    return Err(LinkError::Closed);
                                }
                            }
                        }
                        Err(e) => tracing::warn!(error = %e, "ignoring link packet"),
                    },
                    EnginePacket::Close => return Err(LinkError::Closed),
                    _ => {}
                }
            }
        }
    }
}

fn read_body(mut response: Response<Body>) -> Result<String, LinkError> {
    let status = response.status();
    if !status.is_success() {
        return Err(LinkError::Status(status.as_u16()));
    }
    Ok(response.body_mut().read_to_string()?)
}
