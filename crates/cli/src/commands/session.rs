use std::io::{BufRead, Write};

use super::Context;

pub(crate) fn cmd_login(ctx: &Context, secret: Option<String>) {
    let mut gate = ctx.gate();
    if !gate.is_configured() {
        ctx.fail(&repairdesk_core::GateError::NotConfigured.to_string());
    }

    let entered = match secret {
        Some(s) => s,
        None => {
            eprint!("Shared secret: ");
            let _ = std::io::stderr().flush();
            let mut input = String::new();
            if let Err(e) = std::io::stdin().lock().read_line(&mut input) {
                ctx.fail(&format!("could not read secret: {}", e));
            }
            input.trim_end_matches(['\r', '\n']).to_string()
        }
    };

    if let Err(e) = gate.login(&entered) {
        ctx.fail(&e.to_string());
    }
    ctx.say("Logged in.");
    ctx.json(&serde_json::json!({ "authenticated": true }));
}

pub(crate) fn cmd_logout(ctx: &Context) {
    let mut gate = ctx.gate();
    if let Err(e) = gate.logout() {
        ctx.fail(&e.to_string());
    }
    ctx.say("Logged out.");
    ctx.json(&serde_json::json!({ "authenticated": false }));
}
