//! Share Provisioner
//!
//! Command-line front end for provisioning a USB or NVMe device as a
//! network share on a NAS host.
//!
//! ```text
//! share-provisioner devices --class nvme
//! share-provisioner provision --class usb --device /dev/sdb --share-name media \
//!     --wipe --fs-type ext4 --confirm "WIPE /dev/sdb"
//! ```

use clap::{Args as ClapArgs, Parser, Subcommand};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use share_provisioner::client::views::{device_status_line, select_candidates};
use share_provisioner::{
    ApiClient, DashboardViews, DeviceClass, FormConfig, FsType, HttpClientConfig,
    HttpOperationClient, HttpViewRefresher, ProvisionRequest, ProvisioningForm, ReconcileConfig,
    Result, SessionConfig, SessionEvent, SessionPhase, SubmitOutcome, TerminalAcknowledger,
};

// =============================================================================
// CLI Arguments
// =============================================================================

/// Share Provisioner - turn a USB or NVMe device into a network share
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Dashboard API base URL
    #[arg(long, env = "NAS_API_URL", default_value = "http://127.0.0.1:8000")]
    api_url: String,

    /// Cookie header of an authenticated dashboard session
    #[arg(long, env = "NAS_SESSION_COOKIE", hide_env_values = true)]
    session_cookie: Option<String>,

    /// Timeout for the provisioning request in seconds
    #[arg(long, env = "NAS_REQUEST_TIMEOUT", default_value = "1800")]
    request_timeout_secs: u64,

    /// Per-view refresh budget after provisioning, in milliseconds
    #[arg(long, default_value = "8000")]
    refresh_timeout_ms: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "warn")]
    log_level: String,

    /// Output logs as JSON
    #[arg(long, env = "LOG_JSON")]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List provisioning candidates for a device class
    Devices {
        /// Device class: usb or nvme
        #[arg(long, default_value = "usb")]
        class: DeviceClass,
    },

    /// Provision a device as a network share
    Provision(ProvisionArgs),
}

#[derive(ClapArgs, Debug)]
struct ProvisionArgs {
    /// Device class: usb or nvme
    #[arg(long)]
    class: DeviceClass,

    /// Device path, e.g. /dev/sdb
    #[arg(long)]
    device: String,

    /// Share name
    #[arg(long)]
    share_name: String,

    /// Mountpoint (server default when omitted)
    #[arg(long)]
    mountpoint: Option<String>,

    /// Format the device before mounting
    #[arg(long)]
    format: bool,

    /// Delete all partitions and create one new partition
    #[arg(long)]
    wipe: bool,

    /// Filesystem for format or wipe: ext4 or exfat
    #[arg(long)]
    fs_type: Option<FsType>,

    /// Typed wipe confirmation, must read "WIPE <device>"
    #[arg(long)]
    confirm: Option<String>,
}

// =============================================================================
// Main
// =============================================================================

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let args = Args::parse();

    // Initialize logging
    init_logging(&args);

    info!("Starting Share Provisioner");
    info!("  Version: {}", share_provisioner::VERSION);
    info!("  API: {}", args.api_url);

    let http_config = HttpClientConfig {
        base_url: args.api_url.clone(),
        session_cookie: args.session_cookie.clone(),
        request_timeout: Duration::from_secs(args.request_timeout_secs),
        ..Default::default()
    };
    let api = ApiClient::new(&http_config)?;
    let views = Arc::new(HttpViewRefresher::new(api.clone(), Arc::new(DashboardViews::new())));

    match args.command {
        Command::Devices { class } => list_devices(&views, class).await,
        Command::Provision(ref provision) => {
            let config = FormConfig {
                session: SessionConfig::default(),
                reconcile: ReconcileConfig {
                    task_timeout: Duration::from_millis(args.refresh_timeout_ms),
                },
                ..Default::default()
            };
            let form = ProvisioningForm::new(
                provision.class,
                Arc::new(HttpOperationClient::new(api)),
                views,
                Arc::new(TerminalAcknowledger::new()),
                config,
            );
            run_provision(&form, provision).await
        }
    }
}

// =============================================================================
// Commands
// =============================================================================

async fn list_devices(views: &HttpViewRefresher, class: DeviceClass) -> Result<ExitCode> {
    let drives = match views.fetch_drives().await {
        Ok(drives) => drives,
        Err(e) => {
            eprintln!("{}", e);
            return Ok(ExitCode::FAILURE);
        }
    };

    let candidates = select_candidates(class, &drives);
    println!("{}", device_status_line(class, candidates.len()));
    for candidate in &candidates {
        let drive = &candidate.drive;
        println!(
            "  {:<40} {:<24} {:<8} {}",
            candidate.option_label(class),
            drive.model.as_deref().unwrap_or("-"),
            drive.fstype.as_deref().unwrap_or("-"),
            drive.mountpoint.as_deref().unwrap_or("-"),
        );
    }
    Ok(ExitCode::SUCCESS)
}

async fn run_provision(form: &ProvisioningForm, args: &ProvisionArgs) -> Result<ExitCode> {
    let request = ProvisionRequest::from_form(
        args.device.clone(),
        args.share_name.clone(),
        args.mountpoint.clone(),
        args.fs_type,
        args.format,
        args.wipe,
        args.confirm.clone(),
    );

    let renderer = tokio::spawn(render_events(form.subscribe()));
    let outcome = form.submit(request).await;
    renderer.abort();

    let code = match &outcome {
        SubmitOutcome::Blocked(rejection) => {
            match rejection.message() {
                Some(message) => eprintln!("{}", message),
                None => eprintln!("Aborted."),
            }
            ExitCode::from(2)
        }
        SubmitOutcome::Finished(snapshot) => {
            println!("{}", snapshot.render());
            if snapshot.phase == SessionPhase::Completed {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            }
        }
        SubmitOutcome::ReauthRequired => {
            if let Some(message) = outcome.message() {
                eprintln!("{}", message);
            }
            ExitCode::from(3)
        }
    };
    Ok(code)
}

/// Print live progress to stderr until the session ends
async fn render_events(mut events: broadcast::Receiver<SessionEvent>) {
    loop {
        match events.recv().await {
            Ok(SessionEvent::Started { title, steps, .. }) => {
                eprintln!("{}", title);
                if let Some(first) = steps.first() {
                    eprintln!("  [WAIT] {}", first);
                }
            }
            Ok(SessionEvent::StepAdvanced { label, .. }) => eprintln!("  [WAIT] {}", label),
            Ok(SessionEvent::ElapsedTick { seconds, .. }) if seconds % 30 == 0 => {
                eprintln!("  ... {}s", seconds)
            }
            Ok(SessionEvent::Reconciling { .. }) => eprintln!("  Refreshing dependent views"),
            Ok(event) if event.is_terminal() => break,
            Ok(_) => {}
            Err(broadcast::error::RecvError::Lagged(_)) => continue,
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

// =============================================================================
// Logging Setup
// =============================================================================

fn init_logging(args: &Args) {
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::WARN,
    };

    let mut filter = EnvFilter::from_default_env().add_directive(level.into());
    for directive in ["hyper=warn", "reqwest=warn", "rustls=warn"] {
        if let Ok(directive) = directive.parse() {
            filter = filter.add_directive(directive);
        }
    }

    if args.log_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
            .init();
    }
}
