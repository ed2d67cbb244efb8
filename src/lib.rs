pub mod api;
pub mod artifacts;
pub mod config;
pub mod entities;
pub mod error;
pub mod host;
pub mod models;
pub mod security;
pub mod tui;
pub mod utils;
pub mod wizard;

use anyhow::Context;
use api::{HttpSubmitter, OfflineSubmitter, Submitter};
use artifacts::id_card::{Branding, SvgCardRenderer};
use config::AppConfig;
use entities::EntityKind;
use host::HostEnvironment;
use log::{error, info};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use utils::path_resolver::resolve_deployment_folder;
use wizard::{CompletionOutcome, NextOutcome, Progress};

const CONTRACT_TRANSCRIPT: &str = "wizard_contract_smoke_transcript.log";

/// Install the fern dispatch: JSON lines to `.log`, human-readable to `.txt`, optional stdout.
/// Returns the log directory.
pub fn init_logging(
    folder: Option<&Path>,
    level: log::LevelFilter,
    with_stdout: bool,
) -> anyhow::Result<PathBuf> {
    let log_dir = utils::path_resolver::resolve_log_folder(folder)?;

    let timestamp = chrono::Utc::now().format("%Y-%m-%d-%H%M%S");

    // JSON log file for structured parsing
    let json_log_file = log_dir.join(format!("mineops-wizard-{}.log", timestamp));

    // Human-readable log file (.txt)
    let txt_log_file = log_dir.join(format!("mineops-wizard-{}.txt", timestamp));

    let mut dispatch = fern::Dispatch::new().level(level);

    if with_stdout {
        dispatch = dispatch.chain(
            fern::Dispatch::new()
                .format(move |out, message, record| {
                    let timestamp_local = chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f");
                    let message_str = format!("{}", message);
                    let (phase, step, cleaned_message) =
                        utils::logging::parse_log_metadata(&message_str);
                    let txt_line = utils::logging::format_human_readable_log(
                        &timestamp_local.to_string(),
                        record.level(),
                        record.target(),
                        &cleaned_message,
                        phase.as_deref(),
                        step.as_deref(),
                    );
                    out.finish(format_args!("{}", txt_line));
                })
                .chain(std::io::stdout()),
        );
    }

    dispatch = dispatch
        .chain(
            fern::Dispatch::new()
                .format(move |out, message, record| {
                    let timestamp_utc = chrono::Utc::now().to_rfc3339();
                    let message_str = format!("{}", message);
                    let (phase, step, cleaned_message) =
                        utils::logging::parse_log_metadata(&message_str);
                    let json_line = utils::logging::format_json_log(
                        &timestamp_utc,
                        record.level(),
                        record.target(),
                        &cleaned_message,
                        phase.as_deref(),
                        step.as_deref(),
                    );
                    out.finish(format_args!("{}\n", json_line));
                })
                .chain(fern::log_file(json_log_file)?),
        )
        .chain(
            fern::Dispatch::new()
                .format(move |out, message, record| {
                    let timestamp_local = chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f");
                    let message_str = format!("{}", message);
                    let (phase, step, cleaned_message) =
                        utils::logging::parse_log_metadata(&message_str);
                    let txt_line = utils::logging::format_human_readable_log(
                        &timestamp_local.to_string(),
                        record.level(),
                        record.target(),
                        &cleaned_message,
                        phase.as_deref(),
                        step.as_deref(),
                    );
                    out.finish(format_args!("{}\n", txt_line));
                })
                .chain(fern::log_file(txt_log_file)?),
        );

    dispatch.apply()?;

    info!(
        "[PHASE: initialization] Logging initialized, log directory: {:?}",
        log_dir
    );
    Ok(log_dir)
}

fn init_logging_or_warn(cfg: &AppConfig, with_stdout: bool) -> PathBuf {
    match init_logging(cfg.log_folder().as_deref(), cfg.logging.level_filter(), with_stdout) {
        Ok(dir) => dir,
        Err(e) => {
            eprintln!("Failed to initialize logging: {}", e);
            resolve_deployment_folder()
        }
    }
}

fn build_submitter(
    cfg: &AppConfig,
    host: &HostEnvironment,
    offline: bool,
) -> anyhow::Result<Arc<dyn Submitter>> {
    if offline {
        info!("[PHASE: initialization] [STEP: submitter] Offline mode: submissions are accepted locally");
        return Ok(Arc::new(OfflineSubmitter::default()));
    }
    info!(
        "[PHASE: initialization] [STEP: submitter] API base URL: {}",
        cfg.api.base_url
    );
    Ok(Arc::new(HttpSubmitter::new(
        &cfg.api.base_url,
        cfg.api.timeout(),
        host.session(),
    )?))
}

/// Interactive terminal wizard.
pub fn run_tui(entity: EntityKind, cfg: &AppConfig, offline: bool) -> anyhow::Result<()> {
    // No stdout: it would corrupt the terminal UI.
    init_logging_or_warn(cfg, false);

    info!(
        "[PHASE: initialization] Terminal wizard starting at {} entity={}",
        chrono::Utc::now(),
        entity.as_id()
    );

    let storage_path = cfg.storage_path();
    info!(
        "[PHASE: initialization] [STEP: storage] Host storage: {:?}",
        storage_path
    );
    let host = HostEnvironment::file_backed(&storage_path)
        .with_context(|| format!("Failed to open host storage {}", storage_path.display()))?;
    let submitter = build_submitter(cfg, &host, offline)?;

    let result = tui::run(tui::TuiOptions {
        entity,
        host,
        submitter,
        branding: cfg.branding.clone(),
    });
    if let Err(e) = &result {
        error!("[PHASE: tui] [STEP: fatal] TUI exited with error: {:?}", e);
    }
    result
}

/// Non-interactive TUI smoke mode: one frame into an in-memory backend.
pub fn run_tui_smoke(entity: EntityKind, cfg: &AppConfig) -> anyhow::Result<()> {
    init_logging_or_warn(cfg, false);

    info!(
        "[PHASE: initialization] TUI smoke starting at {} entity={}",
        chrono::Utc::now(),
        entity.as_id()
    );

    match tui::smoke(entity, HostEnvironment::in_memory(), cfg.branding.clone()) {
        Ok(frame) => {
            for line in frame.lines() {
                log::debug!("[PHASE: tui] [STEP: smoke_frame] {}", line);
            }
            info!("[PHASE: tui] [STEP: smoke] Rendered {} lines", frame.lines().count());
            Ok(())
        }
        Err(e) => {
            error!("[PHASE: tui] [STEP: smoke] TUI smoke exited with error: {:?}", e);
            Err(e)
        }
    }
}

/// Drive every entity wizard with its sample data through an offline submitter until
/// the confirmation step. Returns the transcript.
pub async fn wizard_contract_smoke(branding: &Branding) -> anyhow::Result<Vec<String>> {
    let submitter = OfflineSubmitter::default();
    let renderer = SvgCardRenderer;
    let mut transcript = Vec::new();

    for kind in EntityKind::ALL {
        let mut controller = kind.controller();
        kind.fill_sample(&mut controller)
            .map_err(|e| anyhow::anyhow!("{}: sample data rejected: {}", kind, e))?;
        transcript.push(format!(
            "{}: start steps={} endpoint={}",
            kind,
            controller.schema().step_count(),
            controller.schema().endpoint
        ));

        let reference = loop {
            let artifact_lists: Vec<(&'static str, usize)> = controller
                .schema()
                .step(controller.current_step())
                .map(|step| {
                    step.fields
                        .iter()
                        .filter_map(|f| match f {
                            wizard::schema::StepField::List(l) if l.artifact_field().is_some() => {
                                Some(l.name)
                            }
                            _ => None,
                        })
                        .collect::<Vec<_>>()
                })
                .unwrap_or_default()
                .into_iter()
                .map(|name| (name, controller.state().fields().list(name).len()))
                .collect();
            for (list, count) in artifact_lists {
                for index in 0..count {
                    controller
                        .render_item_artifact(list, index, &renderer, branding)
                        .await
                        .map_err(|e| anyhow::anyhow!("{}: artifact {}[{}]: {}", kind, list, index, e))?;
                }
                transcript.push(format!("{}: rendered {} artifact(s) for {}", kind, count, list));
            }

            match controller.next_with(&submitter).await {
                Progress::Step(NextOutcome::Advanced { to }) => {
                    transcript.push(format!("{}: advanced to step {}", kind, to));
                }
                Progress::Completed(CompletionOutcome::Confirmed { reference_number }) => {
                    break reference_number;
                }
                other => anyhow::bail!("{}: unexpected outcome {:?}", kind, other),
            }
        };

        let prefix = format!("{}-", controller.schema().reference_prefix);
        if !reference.starts_with(&prefix) || !controller.is_confirmation() {
            anyhow::bail!("{}: bad confirmation state (reference {})", kind, reference);
        }
        transcript.push(format!("{}: confirmed reference={}", kind, reference));
    }

    let accepted = submitter.accepted();
    if accepted != EntityKind::ALL.len() as u64 {
        anyhow::bail!("expected {} submissions, got {}", EntityKind::ALL.len(), accepted);
    }
    transcript.push(format!("all entities confirmed ({} submissions)", accepted));
    Ok(transcript)
}

/// Contract smoke entry point. Writes the transcript next to the logs.
pub fn run_wizard_contract_smoke(cfg: &AppConfig) -> anyhow::Result<()> {
    let log_dir = init_logging_or_warn(cfg, true);

    info!(
        "[PHASE: initialization] Wizard contract smoke starting at {}",
        chrono::Utc::now()
    );

    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build();
    let result = match rt {
        Ok(rt) => rt.block_on(wizard_contract_smoke(&cfg.branding)),
        Err(e) => Err(anyhow::anyhow!(
            "Failed to create async runtime for contract smoke: {}",
            e
        )),
    };

    match result {
        Ok(transcript) => {
            for line in &transcript {
                info!("[PHASE: wizard] [STEP: contract_smoke] {}", line);
            }
            let path = log_dir.join(CONTRACT_TRANSCRIPT);
            std::fs::write(&path, transcript.join("\n") + "\n")
                .with_context(|| format!("Failed to write {}", path.display()))?;
            info!(
                "[PHASE: wizard] [STEP: contract_smoke] Transcript written to {:?}",
                path
            );
            Ok(())
        }
        Err(e) => {
            error!(
                "[PHASE: wizard] [STEP: contract_smoke] Smoke exited with error: {:?}",
                e
            );
            Err(e)
        }
    }
}
