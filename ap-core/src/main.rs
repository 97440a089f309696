// /////////////////////////////////////////////////////////////////////////////
// AP Platform
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # AP Platform CLI
//!
//! Entry point for the accounts-payable operations platform. Wires the
//! bootstrap layer (`ap_bootstrap`: config, logging, signals) to the
//! application services and infrastructure adapters built in this crate,
//! then dispatches whichever subcommand the operator (or a cron job, via
//! `serve`) asked for.
//!
//! There is no HTTP/JSON API surface in this deployment shape — this CLI
//! is the entire operator interface.

use std::path::PathBuf;
use std::sync::Arc;

use ap_bootstrap::config::{AppConfig, LogLevel};
use ap_bootstrap::exit_code::ExitCode;
use clap::Parser;
use tracing::error;

use ap_core::application::services::{
    ApprovalService, AuditService, DuplicateService, ExtractionService, FraudService, MatchingService,
    PipelineOrchestrator, RuleService,
};
use ap_domain::services::fraud_scoring::FraudThresholds;
use ap_domain::services::ports::{BlobStore, EmailPort, FxPort, LlmPort};
use ap_core::infrastructure::adapters::{
    FilesystemBlobStore, HmacTokenService, HttpLlmClient, LoggingEmailAdapter, MailboxPoller, SmtpEmailAdapter,
    StaticFxAdapter, StubLlmClient,
};
use ap_core::infrastructure::config::AppSettings;
use ap_core::infrastructure::repositories::{
    ApprovalRepository, AuditRepository, ExceptionRepository, ExtractionRepository, GoodsReceiptRepository,
    InvoiceRepository, MatchingRepository, PurchaseOrderRepository, RuleRepository, SupportRepository,
};
use ap_core::infrastructure;
use ap_core::presentation::cli::{AppContext, Cli};

fn build_blob_store(settings: &AppSettings) -> Arc<dyn BlobStore> {
    Arc::new(FilesystemBlobStore::new(settings.blob.root.clone()))
}

fn build_fx_adapter(settings: &AppSettings) -> Arc<dyn FxPort> {
    if settings.currency_rates.is_empty() {
        Arc::new(StaticFxAdapter::default_usd())
    } else {
        Arc::new(StaticFxAdapter::new(settings.reference_currency.clone(), settings.currency_rates.clone()))
    }
}

fn build_email_adapter(settings: &AppSettings) -> Result<Arc<dyn EmailPort>, ap_domain::ApError> {
    if !settings.email.enabled {
        return Ok(Arc::new(LoggingEmailAdapter::new()));
    }
    let relay = settings
        .email
        .smtp_relay
        .as_deref()
        .ok_or_else(|| ap_domain::ApError::Configuration("email.enabled is true but smtp_relay is unset".into()))?;
    let adapter = SmtpEmailAdapter::new(
        relay,
        settings.email.smtp_username.clone().unwrap_or_default(),
        settings.email.smtp_password.clone().unwrap_or_default(),
        settings.email.from_address.clone(),
    )?;
    Ok(Arc::new(adapter))
}

fn build_llm_client(settings: &AppSettings) -> Result<Arc<dyn LlmPort>, ap_domain::ApError> {
    if !settings.llm.enabled {
        return Ok(Arc::new(StubLlmClient::new()));
    }
    let endpoint = settings
        .llm
        .endpoint
        .clone()
        .ok_or_else(|| ap_domain::ApError::Configuration("llm.enabled is true but endpoint is unset".into()))?;
    let api_key = settings.llm.api_key.clone().unwrap_or_default();
    Ok(Arc::new(HttpLlmClient::new(endpoint, api_key, settings.llm.extract_model.clone(), settings.llm.narrate_model.clone())))
}

async fn build_context(settings: Arc<AppSettings>) -> Result<AppContext, ap_domain::ApError> {
    let pool = infrastructure::db::connect(&settings.database_url).await?;

    let invoices = Arc::new(InvoiceRepository::new(pool.clone()));
    let support = Arc::new(SupportRepository::new(pool.clone()));
    let audit_repo = Arc::new(AuditRepository::new(pool.clone()));
    let exceptions = Arc::new(ExceptionRepository::new(pool.clone()));
    let extraction_results = Arc::new(ExtractionRepository::new(pool.clone()));
    let goods_receipts = Arc::new(GoodsReceiptRepository::new(pool.clone()));
    let purchase_orders = Arc::new(PurchaseOrderRepository::new(pool.clone()));
    let matching_repo = Arc::new(MatchingRepository::new(pool.clone()));
    let rules_repo = Arc::new(RuleRepository::new(pool.clone()));
    let approvals_repo = Arc::new(ApprovalRepository::new(pool.clone()));

    let blob = build_blob_store(&settings);
    let fx = build_fx_adapter(&settings);
    let email = build_email_adapter(&settings)?;
    let llm = build_llm_client(&settings)?;
    let tokens = Arc::new(HmacTokenService::new(settings.approval.token_secret.as_bytes()));
    let mailbox = Arc::new(MailboxPoller::new(settings.mailbox_inbox_dir.clone().unwrap_or_else(|| "./mailbox".to_string())));

    let audit = Arc::new(AuditService::new(audit_repo.clone()));
    let rules = Arc::new(RuleService::new(rules_repo));
    let approval = Arc::new(ApprovalService::new(
        approvals_repo,
        tokens,
        email,
        settings.approval.role_directory.clone(),
        settings.approval.base_url.clone(),
        settings.approval.token_expire_hours,
    ));
    let duplicate = Arc::new(DuplicateService::new(invoices.clone(), exceptions.clone()));
    let fraud_thresholds =
        FraudThresholds { medium: settings.fraud_thresholds.medium, high: settings.fraud_thresholds.high, critical: settings.fraud_thresholds.critical };
    let fraud = Arc::new(FraudService::new(invoices.clone(), exceptions.clone(), fraud_thresholds));
    let extraction = Arc::new(ExtractionService::new(llm, extraction_results, support.clone()));
    let matching = Arc::new(MatchingService::new(purchase_orders, goods_receipts, matching_repo, exceptions));

    let orchestrator = Arc::new(PipelineOrchestrator::new(
        invoices.clone(),
        blob.clone(),
        fx,
        extraction,
        matching,
        fraud,
        duplicate,
        approval.clone(),
        rules.clone(),
        audit.clone(),
    ));

    Ok(AppContext { orchestrator, approval, rules, audit, invoices, support, audit_repo, blob, mailbox, settings })
}

fn log_level_for(verbose: bool) -> LogLevel {
    if verbose {
        LogLevel::Debug
    } else {
        LogLevel::Info
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let mut bootstrap_config_builder =
        AppConfig::builder().app_name("ap-platform").log_level(log_level_for(cli.verbose)).verbose(cli.verbose).dry_run(cli.dry_run);
    if let Some(path) = cli.config.clone() {
        bootstrap_config_builder = bootstrap_config_builder.config_path(path);
    }
    let bootstrap_config = bootstrap_config_builder.build();

    ap_bootstrap::logger::init(bootstrap_config.log_level(), bootstrap_config.is_verbose());

    let exit = match run(cli, &bootstrap_config).await {
        Ok(()) => ExitCode::Success,
        Err(e) => {
            error!(error = %e, "command failed");
            ExitCode::from_error(&e)
        }
    };
    std::process::exit(exit.as_i32());
}

async fn run(cli: Cli, bootstrap_config: &AppConfig) -> Result<(), ap_domain::ApError> {
    let settings = Arc::new(AppSettings::load(bootstrap_config.config_path().map(PathBuf::as_path))?);
    let ctx = build_context(settings).await?;
    ap_core::presentation::cli::dispatch(&cli, &ctx).await
}
