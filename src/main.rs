use anyhow::Context;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use bids_uploader::config::{self, LoggingConfig};
use bids_uploader::prompt;
use bids_uploader::uploader::run_upload;
use bids_uploader::xnat::{MemoryXnat, XnatApi, XnatClient};

fn init_logging(cfg: &LoggingConfig) -> anyhow::Result<(WorkerGuard, WorkerGuard)> {
    // stdout + daily rotating file under the configured log dir
    std::fs::create_dir_all(&cfg.dir).with_context(|| format!("cannot create log dir {}", cfg.dir))?;
    let (stdout_nb, stdout_guard) = tracing_appender::non_blocking(std::io::stdout());
    let file_appender = tracing_appender::rolling::daily(&cfg.dir, "bids-uploader.log");
    let (file_nb, file_guard) = tracing_appender::non_blocking(file_appender);
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| cfg.filter.as_str().into());
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(stdout_nb))
        .with(tracing_subscriber::fmt::layer().with_ansi(false).with_writer(file_nb))
        .init();
    Ok((stdout_guard, file_guard))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration (embedded defaults -> bids-uploader.toml -> env/.env)
    let app_cfg = config::load()?;
    // Guards stay alive so the non-blocking writers flush on exit
    let _log_guards = init_logging(&app_cfg.logging)?;
    if !app_cfg.upload.dry_run && !app_cfg.xnat.url.starts_with("https://") {
        warn!("xnat.url {} is not https - credentials are sent in clear text", app_cfg.xnat.url);
    }

    let inputs = prompt::collect_inputs(app_cfg.upload.dry_run)?;

    let report = if app_cfg.upload.dry_run {
        info!("Dry run - nothing is sent to {}", app_cfg.xnat.url);
        let xnat = MemoryXnat::with_project(&inputs.project_id);
        let project = xnat.find_project(&inputs.project_id).await?;
        run_upload(&xnat, &project, &inputs.bids_root, &app_cfg.bids).await?
    } else {
        let credentials = inputs
            .credentials
            .as_ref()
            .context("credentials are required for a real upload")?;
        let xnat = XnatClient::connect(&app_cfg.xnat, credentials).await.context(
            "Unable to connect to the XNAT instance - check you have the correct url, username, and password",
        )?;
        let project = xnat.find_project(&inputs.project_id).await.with_context(|| {
            format!(
                "Unable to find project {} - check you have the correct Project ID",
                inputs.project_id
            )
        })?;
        info!("Project {} found", project.id);

        let result = run_upload(&xnat, &project, &inputs.bids_root, &app_cfg.bids).await;
        if let Err(e) = xnat.disconnect().await {
            warn!("Failed to close XNAT session: {}", e);
        }
        result?
    };

    if !report.is_success() {
        warn!(failures = report.failures.len(), "Upload completed with failures");
    }
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
