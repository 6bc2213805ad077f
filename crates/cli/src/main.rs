mod commands;
mod config;
mod link;
mod serve;
mod session_file;
mod view;

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use crate::commands::{Context, EditArgs};
use crate::config::Config;

/// Output format for CLI responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    Text,
    Json,
}

/// Repair-shop service intake tracker.
#[derive(Parser)]
#[command(name = "repairdesk", version, about = "Repair-shop service intake tracker")]
struct Cli {
    /// Path to a TOML config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Use an in-memory record store instead of the hosted one
    #[arg(long, global = true)]
    memory: bool,

    /// Directory holding the session file (overrides REPAIRDESK_STATE_DIR)
    #[arg(long, global = true)]
    state_dir: Option<PathBuf>,

    /// Output format (text or json)
    #[arg(long, global = true, default_value = "text", value_enum)]
    output: OutputFormat,

    /// Suppress non-essential output
    #[arg(long, global = true)]
    quiet: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in with the shared secret (prompts when --secret is omitted)
    Login {
        #[arg(long)]
        secret: Option<String>,
    },

    /// Forget the saved session
    Logout,

    /// List services, split into active and history
    List {
        /// Match id, customer name, item names or damage descriptions
        #[arg(long, default_value = "")]
        search: String,
        /// Status label, or "all"
        #[arg(long)]
        status: Option<String>,
        /// Which list to print: active or history
        #[arg(long)]
        tab: Option<String>,
    },

    /// Record a new service
    Add {
        #[arg(long)]
        customer: String,
        #[arg(long)]
        phone: Option<String>,
        /// Deadline as YYYY-MM-DD
        #[arg(long)]
        deadline: Option<String>,
        /// Mark as high priority
        #[arg(long)]
        priority: bool,
        /// Item as "name|damage|notes"; repeat for several items
        #[arg(long = "item")]
        items: Vec<String>,
    },

    /// Edit an existing service's fields and items
    Edit {
        id: i64,
        #[arg(long)]
        customer: Option<String>,
        #[arg(long)]
        phone: Option<String>,
        /// Deadline as YYYY-MM-DD
        #[arg(long, conflicts_with = "clear_deadline")]
        deadline: Option<String>,
        #[arg(long)]
        clear_deadline: bool,
        /// Set or unset high priority
        #[arg(long)]
        priority: Option<bool>,
        /// Replace all items; repeat for several ("name|damage|notes")
        #[arg(long = "item")]
        items: Vec<String>,
        /// Remove the item at this 1-based position; may repeat
        #[arg(long = "remove-item")]
        remove_items: Vec<usize>,
    },

    /// Move a service to another status
    Status {
        id: i64,
        status: String,
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },

    /// Permanently delete a service
    Delete {
        id: i64,
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },

    /// Watch the WhatsApp link status until Ctrl+C
    Link,

    /// Start the HTTP API server
    Serve {
        /// Port to listen on
        #[arg(long, default_value = "8080")]
        port: u16,
        /// Path to TLS certificate PEM file (requires --tls-key)
        #[arg(long)]
        tls_cert: Option<PathBuf>,
        /// Path to TLS private key PEM file (requires --tls-cert)
        #[arg(long)]
        tls_key: Option<PathBuf>,
    },
}

fn init_tracing(default_level: &str, json: bool) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    let _ = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
}

fn main() {
    let cli = Cli::parse();

    let default_level = match cli.command {
        Commands::Serve { .. } => "info",
        _ => "warn",
    };
    init_tracing(default_level, cli.log_json);

    let mut config = match Config::load(cli.config.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            report_error(&e.to_string(), cli.output, cli.quiet);
            process::exit(1);
        }
    };
    if let Some(dir) = cli.state_dir {
        config.state_dir = dir;
    }
    let ctx = Context {
        config,
        memory: cli.memory,
        output: cli.output,
        quiet: cli.quiet,
    };

    match cli.command {
        Commands::Login { secret } => commands::cmd_login(&ctx, secret),
        Commands::Logout => commands::cmd_logout(&ctx),
        Commands::List {
            search,
            status,
            tab,
        } => {
            ctx.require_login();
            commands::cmd_list(&ctx, &search, status.as_deref(), tab.as_deref());
        }
        Commands::Add {
            customer,
            phone,
            deadline,
            priority,
            items,
        } => {
            ctx.require_login();
            commands::cmd_add(
                &ctx,
                &customer,
                phone.as_deref(),
                deadline.as_deref(),
                priority,
                &items,
            );
        }
        Commands::Edit {
            id,
            customer,
            phone,
            deadline,
            clear_deadline,
            priority,
            items,
            remove_items,
        } => {
            ctx.require_login();
            commands::cmd_edit(
                &ctx,
                id,
                EditArgs {
                    customer,
                    phone,
                    deadline,
                    clear_deadline,
                    priority,
                    items,
                    remove_items,
                },
            );
        }
        Commands::Status { id, status, yes } => {
            ctx.require_login();
            commands::cmd_status(&ctx, id, &status, yes);
        }
        Commands::Delete { id, yes } => {
            ctx.require_login();
            commands::cmd_delete(&ctx, id, yes);
        }
        Commands::Link => {
            ctx.require_login();
            commands::cmd_link(&ctx);
        }
        Commands::Serve {
            port,
            tls_cert,
            tls_key,
        } => {
            // Validate TLS flags: both must be provided or neither
            if tls_cert.is_some() != tls_key.is_some() {
                ctx.fail("--tls-cert and --tls-key must both be provided");
            }
            let store = match ctx.config.open_store(ctx.memory) {
                Ok(s) => s,
                Err(e) => ctx.fail(&e.to_string()),
            };
            let options = serve::ServeOptions {
                store,
                secret: ctx.config.shared_secret.clone(),
                link_url: ctx.config.link_url.clone(),
            };
            let rt = ctx.runtime();
            if let Err(e) = rt.block_on(serve::start_server(port, options, tls_cert, tls_key)) {
                ctx.fail(&format!("Server error: {}", e));
            }
        }
    }
}

pub(crate) fn report_error(msg: &str, output: OutputFormat, quiet: bool) {
    if quiet {
        return;
    }
    match output {
        OutputFormat::Text => eprintln!("error: {}", msg),
        OutputFormat::Json => {
            eprintln!("{}", serde_json::json!({ "error": msg }));
        }
    }
}
