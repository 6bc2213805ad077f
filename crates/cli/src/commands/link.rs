use std::time::Duration;

use repairdesk_core::LinkViewer;

use crate::link::LinkMonitor;

use super::Context;

/// Follow the WhatsApp link until Ctrl+C, printing each state change.
pub(crate) fn cmd_link(ctx: &Context) {
    let Some(url) = ctx.config.link_url.as_deref() else {
        ctx.fail(LinkViewer::unconfigured().status_line());
    };

    let rt = ctx.runtime();
    rt.block_on(async {
        let monitor = LinkMonitor::start(Some(url));
        let mut rx = monitor.subscribe();
        let mut last_line = String::new();
        loop {
            let viewer = rx.borrow_and_update().clone();
            if viewer.status_line() != last_line {
                last_line = viewer.status_line().to_string();
                ctx.say(&last_line);
                if let Some(image) = viewer.qr_image() {
                    ctx.say(&format!("QR: {}", image));
                }
                ctx.json(&serde_json::json!(viewer));
            }
            tokio::select! {
                changed = rx.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
                _ = tokio::signal::ctrl_c() => break,
            }
        }
        monitor.stop();
    });
    // The poll thread exits on its own once its request returns.
    rt.shutdown_timeout(Duration::from_millis(500));
}
