//! WhatsApp link status.
//!
//! The link server pushes a handful of events over Socket.IO; the viewer keeps
//! only the latest one, plus the QR image currently on screen. The transport
//! lives in the CLI; this module is the state machine and the wire codec.

pub mod packet;

use serde::Serialize;

/// Something the link server told us.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkEvent {
    /// Transport-level connect acknowledged.
    Connected,
    /// A new QR code to scan, as an image URL or data URI.
    Qr(String),
    Ready(String),
    Message(String),
    Disconnect,
}

/// What the viewer is showing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum LinkState {
    Connecting,
    AwaitingScan { image_url: String },
    Ready,
    Disconnected,
    InfoMessage { text: String },
}

/// Latest link state and the QR image on screen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LinkViewer {
    state: LinkState,
    qr_image: Option<String>,
    status: String,
}

impl Default for LinkViewer {
    fn default() -> Self {
        LinkViewer::connecting()
    }
}

impl LinkViewer {
    /// Before anything has arrived.
    pub fn connecting() -> Self {
        LinkViewer {
            state: LinkState::Connecting,
            qr_image: None,
            status: "Connecting to the link server...".to_string(),
        }
    }

    /// No link server configured. No connection is attempted.
    pub fn unconfigured() -> Self {
        let text = "Error: link server URL is not set (REPAIRDESK_LINK_URL).".to_string();
        LinkViewer {
            state: LinkState::InfoMessage { text: text.clone() },
            qr_image: None,
            status: text,
        }
    }

    pub fn state(&self) -> &LinkState {
        &self.state
    }

    pub fn qr_image(&self) -> Option<&str> {
        self.qr_image.as_deref()
    }

    /// One line describing the current state.
    pub fn status_line(&self) -> &str {
        &self.status
    }

    pub fn apply(&mut self, event: LinkEvent) {
        match event {
            LinkEvent::Connected => {
                self.state = LinkState::Connecting;
                self.status = "Server connected. Waiting for QR code...".to_string();
            }
            LinkEvent::Qr(url) => {
                self.qr_image = Some(url.clone());
                self.state = LinkState::AwaitingScan { image_url: url };
                self.status =
                    "Scan the QR code from Linked Devices in the WhatsApp app.".to_string();
            }
            LinkEvent::Ready(text) => {
                tracing::info!(message = %text, "whatsapp ready");
                self.qr_image = None;
                self.state = LinkState::Ready;
                self.status = "WhatsApp is ready.".to_string();
            }
            LinkEvent::Message(text) => {
                self.status = text.clone();
                self.state = LinkState::InfoMessage { text };
            }
            LinkEvent::Disconnect => {
                self.state = LinkState::Disconnected;
                self.status = "Connection lost. Reconnecting...".to_string();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn qr_then_ready_clears_image() {
        let mut v = LinkViewer::connecting();
        v.apply(LinkEvent::Connected);
        assert_eq!(v.state(), &LinkState::Connecting);
        v.apply(LinkEvent::Qr("data:image/png;base64,AAA".into()));
        assert_eq!(
            v.state(),
            &LinkState::AwaitingScan {
                image_url: "data:image/png;base64,AAA".into()
            }
        );
        assert_eq!(v.qr_image(), Some("data:image/png;base64,AAA"));
        v.apply(LinkEvent::Ready("ok".into()));
        assert_eq!(v.state(), &LinkState::Ready);
        assert_eq!(v.qr_image(), None);
    }

    #[test]
    fn message_keeps_qr_on_screen() {
        let mut v = LinkViewer::connecting();
        v.apply(LinkEvent::Qr("u1".into()));
        v.apply(LinkEvent::Message("Authenticating".into()));
        assert_eq!(
            v.state(),
            &LinkState::InfoMessage {
                text: "Authenticating".into()
            }
        );
        assert_eq!(v.status_line(), "Authenticating");
        assert_eq!(v.qr_image(), Some("u1"));
    }

    #[test]
    fn only_latest_event_is_kept() {
        let mut v = LinkViewer::connecting();
        v.apply(LinkEvent::Qr("u1".into()));
        v.apply(LinkEvent::Qr("u2".into()));
        v.apply(LinkEvent::Disconnect);
        assert_eq!(v.state(), &LinkState::Disconnected);
        assert_eq!(v.qr_image(), Some("u2"));
    }

    #[test]
    fn unconfigured_reports_error() {
        let v = LinkViewer::unconfigured();
        assert!(matches!(v.state(), LinkState::InfoMessage { .. }));
        assert!(v.status_line().contains("REPAIRDESK_LINK_URL"));
    }

    #[test]
    fn serializes_with_state_tag() {
        let mut v = LinkViewer::connecting();
        v.apply(LinkEvent::Qr("u1".into()));
        let json = serde_json::to_value(&v).unwrap();
        assert_eq!(json["state"]["state"], "awaiting_scan");
        assert_eq!(json["state"]["image_url"], "u1");
        assert_eq!(json["qr_image"], "u1");
    }
}
