// /////////////////////////////////////////////////////////////////////////////
// AP Platform
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! The command-line surface. With no HTTP/JSON API in this deployment
//! shape, every operator action an approver, an AP clerk, or an admin would
//! take goes through one of these subcommands instead.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use ap_domain::entities::{InvoiceSource, RuleVersionSource};
use ap_domain::services::ports::BlobStore;
use ap_domain::value_objects::{ApprovalAction, ApprovalChannel, ApprovalTaskId, InvoiceId, RuleVersionId};
use ap_domain::{ApError, Invoice};
use clap::{Parser, Subcommand};
use tracing::info;
use uuid::Uuid;

use crate::application::services::approval_service::InvoiceApprovalEffect;
use crate::application::services::{ApprovalService, AuditService, PipelineOrchestrator, RuleService};
use crate::infrastructure::adapters::MailboxPoller;
use crate::infrastructure::config::AppSettings;
use crate::infrastructure::repositories::{AuditRepository, InvoiceRecord, InvoiceRepository, SupportRepository};
use crate::infrastructure::scheduler::{PipelineEnqueuer, SchedulerService};

#[derive(Parser)]
#[command(name = "ap-platform")]
#[command(about = "Invoice ingestion, matching, fraud scoring, and approval routing")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Settings file layered over the compiled-in defaults (spec.md §6).
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbose logging (full span context, file/line numbers).
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Report what a command would do without persisting any change.
    #[arg(long, global = true)]
    pub dry_run: bool,
}

#[derive(Subcommand)]
pub enum Command {
    /// Start the job scheduler (mailbox poll, SLA sweep, compliance expiry,
    /// recurring-pattern detection, feedback analysis) and block until a
    /// shutdown signal arrives. The only long-running command.
    Serve,

    /// Ingests a single document from the local filesystem and runs it
    /// through the pipeline, the same as a mailbox attachment would be.
    Ingest {
        /// Path to the invoice document (pdf/png/jpg/jpeg).
        file: PathBuf,
    },

    /// Re-runs the pipeline for an invoice already on file, resuming from
    /// whatever status it's currently sitting at.
    Rematch {
        /// Invoice id (UUID).
        invoice_id: String,
    },

    /// Applies the approve/reject decision carried by a raw email-link
    /// token (spec.md §4.9).
    DecideToken {
        /// Raw token: `<task_uuid>:<approve|reject>:<opaque_uuid>`.
        token: String,
    },

    /// Records a web-channel approval for a task.
    Approve {
        /// Approval task id (UUID).
        task_id: String,
    },

    /// Records a web-channel rejection for a task.
    Reject {
        /// Approval task id (UUID).
        task_id: String,
    },

    /// Creates a draft rule version, creating the parent rule if it
    /// doesn't exist yet (spec.md §4.2).
    CreateRuleDraft {
        /// Rule type, e.g. `matching_tolerance`.
        rule_type: String,
        /// Human-readable rule name, used only when the rule doesn't exist yet.
        name: String,
        /// Version number for this draft.
        version: i32,
        /// Rule config as a JSON object literal.
        config: String,
    },

    /// Publishes a draft/in-review rule version, superseding whatever else
    /// is currently published for the same rule.
    PublishRule {
        /// Rule version id (UUID).
        version_id: String,
    },

    /// Rejects a draft/in-review rule version.
    RejectRule {
        /// Rule version id (UUID).
        version_id: String,
    },

    /// Prints the audit trail for one entity, oldest first.
    AuditTrail {
        /// Entity type, e.g. `invoice`, `rule_version`, `approval_task`.
        entity_type: String,
        /// Entity id as stored in `AuditLog::entity_id` (usually a UUID string).
        entity_id: String,
    },
}

/// Everything a command handler needs: one Arc per application service plus
/// the repositories/adapters no service wraps directly. Built once in
/// `main`, shared across whichever command ran and, for `serve`, across the
/// scheduler's jobs too.
pub struct AppContext {
    pub orchestrator: Arc<PipelineOrchestrator>,
    pub approval: Arc<ApprovalService>,
    pub rules: Arc<RuleService>,
    pub audit: Arc<AuditService>,
    pub invoices: Arc<InvoiceRepository>,
    pub support: Arc<SupportRepository>,
    pub audit_repo: Arc<AuditRepository>,
    pub blob: Arc<dyn BlobStore>,
    pub mailbox: Arc<MailboxPoller>,
    pub settings: Arc<AppSettings>,
}

fn parse_uuid(raw: &str, what: &str) -> Result<Uuid, ApError> {
    Uuid::parse_str(raw).map_err(|e| ApError::Validation(format!("invalid {what} id {raw:?}: {e}")))
}

/// Guesses a content type from the file extension. This deployment shape
/// has no OCR/sniffing library on hand, so it only needs to agree with the
/// `MailboxPoller`'s own ingestible set.
fn guess_content_type(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()).map(str::to_ascii_lowercase).as_deref() {
        Some("pdf") => "application/pdf",
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        _ => "application/octet-stream",
    }
}

pub async fn dispatch(cli: &Cli, ctx: &AppContext) -> Result<(), ApError> {
    match &cli.command {
        Command::Serve => run_serve(ctx).await,
        Command::Ingest { file } => run_ingest(ctx, file, cli.dry_run).await,
        Command::Rematch { invoice_id } => run_rematch(ctx, invoice_id).await,
        Command::DecideToken { token } => run_decide_token(ctx, token).await,
        Command::Approve { task_id } => run_manual_decision(ctx, task_id, ApprovalAction::Approve).await,
        Command::Reject { task_id } => run_manual_decision(ctx, task_id, ApprovalAction::Reject).await,
        Command::CreateRuleDraft { rule_type, name, version, config } => {
            run_create_rule_draft(ctx, rule_type, name, *version, config).await
        }
        Command::PublishRule { version_id } => run_publish_rule(ctx, version_id).await,
        Command::RejectRule { version_id } => run_reject_rule(ctx, version_id).await,
        Command::AuditTrail { entity_type, entity_id } => run_audit_trail(ctx, entity_type, entity_id).await,
    }
}

async fn run_serve(ctx: &AppContext) -> Result<(), ApError> {
    let enqueuer: Arc<dyn PipelineEnqueuer> = ctx.orchestrator.clone();
    let scheduler = SchedulerService::new(
        ctx.invoices.clone(),
        ctx.support.clone(),
        ctx.audit_repo.clone(),
        ctx.blob.clone(),
        ctx.mailbox.clone(),
        enqueuer,
        ctx.settings.clone(),
    )
    .await?;
    scheduler.start().await?;

    let coordinator = ap_bootstrap::shutdown::ShutdownCoordinator::new();
    let handle = coordinator.handle();
    tokio::spawn(async move {
        let signal_handler = ap_bootstrap::signals::create_signal_handler();
        signal_handler.wait_for_signal(Box::new(move || coordinator.trigger())).await;
    });

    handle.cancelled().await;
    info!("shutdown signal received, stopping");
    Ok(())
}

async fn run_ingest(ctx: &AppContext, file: &PathBuf, dry_run: bool) -> Result<(), ApError> {
    let bytes = tokio::fs::read(file).await.map_err(|e| ApError::Io(e.to_string()))?;
    let filename = file
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| ApError::Validation(format!("invalid file name: {}", file.display())))?
        .to_string();
    let content_type = guess_content_type(file);

    let mut invoice = Invoice::new_ingested(String::new(), filename.clone(), bytes.len() as i64, content_type.to_string(), InvoiceSource::Upload, None);
    let object_name = format!("invoices/{}/{}", invoice.id, filename);

    if dry_run {
        info!(invoice_id = %invoice.id, object_name, "dry run: would ingest and enqueue this invoice");
        return Ok(());
    }

    ctx.blob.ensure_bucket("invoices").await?;
    ctx.blob.upload("invoices", &object_name, bytes, content_type).await?;
    invoice.storage_path = object_name;

    let record = InvoiceRecord { invoice: invoice.clone(), line_items: Vec::new() };
    ctx.invoices.save(&record).await?;
    ctx.audit
        .record(None, "ingest_from_cli", "invoice", &invoice.id.to_string(), None, serde_json::to_value(&invoice).ok())
        .await?;

    ctx.orchestrator.enqueue(invoice.id).await?;
    info!(invoice_id = %invoice.id, "invoice ingested and enqueued");
    Ok(())
}

async fn run_rematch(ctx: &AppContext, invoice_id: &str) -> Result<(), ApError> {
    let id = InvoiceId::from_uuid(parse_uuid(invoice_id, "invoice")?);
    ctx.orchestrator.run(id).await?;
    info!(invoice_id = %id, "pipeline rerun complete");
    Ok(())
}

async fn run_decide_token(ctx: &AppContext, token: &str) -> Result<(), ApError> {
    let (invoice_id, effect) = ctx.approval.decide_by_token(token).await?;
    apply_effect_and_log(ctx, invoice_id, effect, "approval.decided_email").await
}

async fn run_manual_decision(ctx: &AppContext, task_id: &str, action: ApprovalAction) -> Result<(), ApError> {
    let task_id = ApprovalTaskId::from_uuid(parse_uuid(task_id, "approval task")?);
    let (invoice_id, effect) = ctx.approval.decide(task_id, action, ApprovalChannel::Web).await?;
    apply_effect_and_log(ctx, invoice_id, effect, "approval.decided_web").await
}

async fn apply_effect_and_log(ctx: &AppContext, invoice_id: InvoiceId, effect: InvoiceApprovalEffect, action: &str) -> Result<(), ApError> {
    let outcome = match effect {
        InvoiceApprovalEffect::None => "pending",
        InvoiceApprovalEffect::Approved => "approved",
        InvoiceApprovalEffect::Rejected => "rejected",
    };
    ctx.orchestrator.apply_approval_effect(invoice_id, effect).await?;
    ctx.audit
        .record(None, action, "invoice", &invoice_id.to_string(), None, Some(serde_json::Value::String(outcome.to_string())))
        .await?;
    info!(invoice_id = %invoice_id, outcome, "approval decision applied");
    Ok(())
}

async fn run_create_rule_draft(ctx: &AppContext, rule_type: &str, name: &str, version: i32, config: &str) -> Result<(), ApError> {
    let config: serde_json::Value = serde_json::from_str(config).map_err(|e| ApError::Validation(format!("invalid config JSON: {e}")))?;
    let rule = ctx.rules.ensure_rule(rule_type, name).await?;
    let draft = ctx.rules.create_draft(rule.id, version, config, RuleVersionSource::Manual).await?;
    info!(rule_id = %rule.id, version_id = %draft.id, "rule draft created");
    Ok(())
}

async fn run_publish_rule(ctx: &AppContext, version_id: &str) -> Result<(), ApError> {
    let id = RuleVersionId::from_uuid(parse_uuid(version_id, "rule version")?);
    let published = ctx.rules.publish(id).await?;
    ctx.audit
        .record(None, "rule_version.published", "rule_version", &id.to_string(), None, None)
        .await?;
    info!(version_id = %published.id, "rule version published");
    Ok(())
}

async fn run_reject_rule(ctx: &AppContext, version_id: &str) -> Result<(), ApError> {
    let id = RuleVersionId::from_uuid(parse_uuid(version_id, "rule version")?);
    let rejected = ctx.rules.reject(id).await?;
    ctx.audit
        .record(None, "rule_version.rejected", "rule_version", &id.to_string(), None, None)
        .await?;
    info!(version_id = %rejected.id, "rule version rejected");
    Ok(())
}

async fn run_audit_trail(ctx: &AppContext, entity_type: &str, entity_id: &str) -> Result<(), ApError> {
    let trail = ctx.audit.trail_for(entity_type, entity_id).await?;
    if trail.is_empty() {
        println!("no audit entries for {entity_type} {entity_id}");
        return Ok(());
    }
    for entry in trail {
        println!(
            "{}  {}  {} -> {}",
            entry.created_at.to_rfc3339(),
            entry.action,
            entry.before_state.as_ref().map(ToString::to_string).unwrap_or_else(|| "-".to_string()),
            entry.after_state.as_ref().map(ToString::to_string).unwrap_or_else(|| "-".to_string()),
        );
    }
    Ok(())
}
