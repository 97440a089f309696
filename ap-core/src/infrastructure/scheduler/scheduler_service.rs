// /////////////////////////////////////////////////////////////////////////////
// AP Platform
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! The five periodic jobs named in spec.md §4.11, wired onto a single
//! `tokio-cron-scheduler::JobScheduler`. Each job runs to completion before
//! its next tick; missed ticks are not backfilled (the library's own
//! semantics, not something this module enforces).

use std::collections::HashMap;
use std::sync::Arc;

use ap_domain::entities::{InvoiceSource, VendorComplianceDocStatus};
use ap_domain::value_objects::InvoiceStatus;
use ap_domain::{AiFeedback, ApError, AuditLog, Invoice, RecurringInvoicePattern, RuleRecommendation, SlaAlert, SlaAlertSeverity};
use async_trait::async_trait;
use chrono::{DateTime, Datelike, Duration, Utc};
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{error, info};

use crate::infrastructure::adapters::MailboxPoller;
use crate::infrastructure::config::AppSettings;
use crate::infrastructure::repositories::{AuditRepository, InvoiceRepository, SupportRepository};
use ap_domain::services::BlobStore;

/// Pending statuses for the SLA sweep (spec.md §4.8): anything short of a
/// terminal outcome.
const PENDING_STATUSES: &[InvoiceStatus] = &[
    InvoiceStatus::Ingested,
    InvoiceStatus::Extracting,
    InvoiceStatus::Extracted,
    InvoiceStatus::Matching,
    InvoiceStatus::Matched,
    InvoiceStatus::Exception,
];

const RECURRING_CANDIDATE_DAYS: &[i64] = &[7, 14, 30, 60, 90];

/// Hands a newly-ingested invoice off to the processing pipeline. The
/// scheduler only discovers and stores the document; running the pipeline
/// stages is the application layer's job, implemented once the pipeline
/// orchestrator exists.
#[async_trait]
pub trait PipelineEnqueuer: Send + Sync {
    async fn enqueue(&self, invoice_id: ap_domain::value_objects::InvoiceId) -> Result<(), ApError>;
}

pub struct SchedulerService {
    scheduler: JobScheduler,
    invoices: Arc<InvoiceRepository>,
    support: Arc<SupportRepository>,
    audit: Arc<AuditRepository>,
    blob: Arc<dyn BlobStore>,
    mailbox: Arc<MailboxPoller>,
    enqueuer: Arc<dyn PipelineEnqueuer>,
    settings: Arc<AppSettings>,
}

impl SchedulerService {
    pub async fn new(
        invoices: Arc<InvoiceRepository>,
        support: Arc<SupportRepository>,
        audit: Arc<AuditRepository>,
        blob: Arc<dyn BlobStore>,
        mailbox: Arc<MailboxPoller>,
        enqueuer: Arc<dyn PipelineEnqueuer>,
        settings: Arc<AppSettings>,
    ) -> Result<Self, ApError> {
        let scheduler = JobScheduler::new().await.map_err(|e| ApError::Internal(e.to_string()))?;
        Ok(Self { scheduler, invoices, support, audit, blob, mailbox, enqueuer, settings })
    }

    pub async fn start(&self) -> Result<(), ApError> {
        if !self.settings.scheduler.enabled {
            info!("scheduler disabled by configuration, no jobs added");
            return Ok(());
        }

        self.add_mailbox_poll_job().await?;
        self.add_sla_sweep_job().await?;
        self.add_compliance_expiry_job().await?;
        self.add_recurring_pattern_job().await?;
        self.add_feedback_analysis_job().await?;

        self.scheduler.start().await.map_err(|e| ApError::Internal(e.to_string()))?;
        info!("scheduler started with 5 jobs");
        Ok(())
    }

    async fn add_mailbox_poll_job(&self) -> Result<(), ApError> {
        let mailbox = self.mailbox.clone();
        let blob = self.blob.clone();
        let invoices = self.invoices.clone();
        let audit = self.audit.clone();
        let enqueuer = self.enqueuer.clone();

        let job = Job::new_async(self.settings.scheduler.mailbox_poll_cron.as_str(), move |_uuid, _l| {
            let mailbox = mailbox.clone();
            let blob = blob.clone();
            let invoices = invoices.clone();
            let audit = audit.clone();
            let enqueuer = enqueuer.clone();
            Box::pin(async move {
                match mailbox.scan().await {
                    Ok(candidates) => {
                        for candidate in candidates {
                            if let Err(e) = ingest_candidate(&blob, &invoices, &audit, &enqueuer, candidate).await {
                                error!(error = %e, "failed to ingest mailbox attachment");
                            }
                        }
                    }
                    Err(e) => error!(error = %e, "mailbox poll failed"),
                }
            })
        })
        .map_err(|e| ApError::Internal(e.to_string()))?;

        self.scheduler.add(job).await.map_err(|e| ApError::Internal(e.to_string()))?;
        Ok(())
    }

    async fn add_sla_sweep_job(&self) -> Result<(), ApError> {
        let invoices = self.invoices.clone();
        let support = self.support.clone();
        let warning_days = self.settings.sla_warning_days_before;

        let job = Job::new_async(self.settings.scheduler.sla_sweep_cron.as_str(), move |_uuid, _l| {
            let invoices = invoices.clone();
            let support = support.clone();
            Box::pin(async move {
                if let Err(e) = run_sla_sweep(&invoices, &support, warning_days).await {
                    error!(error = %e, "sla sweep failed");
                }
            })
        })
        .map_err(|e| ApError::Internal(e.to_string()))?;

        self.scheduler.add(job).await.map_err(|e| ApError::Internal(e.to_string()))?;
        Ok(())
    }

    async fn add_compliance_expiry_job(&self) -> Result<(), ApError> {
        let support = self.support.clone();

        let job = Job::new_async(self.settings.scheduler.compliance_expiry_cron.as_str(), move |_uuid, _l| {
            let support = support.clone();
            Box::pin(async move {
                if let Err(e) = run_compliance_expiry(&support).await {
                    error!(error = %e, "compliance-doc expiry sweep failed");
                }
            })
        })
        .map_err(|e| ApError::Internal(e.to_string()))?;

        self.scheduler.add(job).await.map_err(|e| ApError::Internal(e.to_string()))?;
        Ok(())
    }

    async fn add_recurring_pattern_job(&self) -> Result<(), ApError> {
        let invoices = self.invoices.clone();
        let support = self.support.clone();

        let job = Job::new_async(self.settings.scheduler.recurring_pattern_cron.as_str(), move |_uuid, _l| {
            let invoices = invoices.clone();
            let support = support.clone();
            Box::pin(async move {
                if let Err(e) = run_recurring_pattern_detection(&invoices, &support).await {
                    error!(error = %e, "recurring-pattern detection failed");
                }
            })
        })
        .map_err(|e| ApError::Internal(e.to_string()))?;

        self.scheduler.add(job).await.map_err(|e| ApError::Internal(e.to_string()))?;
        Ok(())
    }

    async fn add_feedback_analysis_job(&self) -> Result<(), ApError> {
        let support = self.support.clone();

        let job = Job::new_async(self.settings.scheduler.feedback_analysis_cron.as_str(), move |_uuid, _l| {
            let support = support.clone();
            Box::pin(async move {
                if let Err(e) = run_feedback_analysis(&support).await {
                    error!(error = %e, "feedback analysis failed");
                }
            })
        })
        .map_err(|e| ApError::Internal(e.to_string()))?;

        self.scheduler.add(job).await.map_err(|e| ApError::Internal(e.to_string()))?;
        Ok(())
    }
}

async fn ingest_candidate(
    blob: &Arc<dyn BlobStore>,
    invoices: &Arc<InvoiceRepository>,
    audit: &Arc<AuditRepository>,
    enqueuer: &Arc<dyn PipelineEnqueuer>,
    candidate: crate::infrastructure::adapters::IngestCandidate,
) -> Result<(), ApError> {
    let invoice = Invoice::new_ingested(
        String::new(),
        candidate.filename.clone(),
        candidate.bytes.len() as i64,
        candidate.content_type.clone(),
        InvoiceSource::Email,
        candidate.sender.clone(),
    );

    let object_name = format!("invoices/{}/{}", invoice.id, candidate.filename);
    blob.ensure_bucket("invoices").await?;
    blob.upload("invoices", &object_name, candidate.bytes, &candidate.content_type).await?;

    let mut invoice = invoice;
    invoice.storage_path = object_name;

    let record = crate::infrastructure::repositories::InvoiceRecord { invoice: invoice.clone(), line_items: Vec::new() };
    invoices.save(&record).await?;

    audit
        .record(&AuditLog::record(
            None,
            candidate.sender.clone(),
            "ingest_from_email",
            "invoice",
            invoice.id.to_string(),
            None,
            serde_json::to_value(&invoice).ok(),
        ))
        .await?;

    enqueuer.enqueue(invoice.id).await?;
    Ok(())
}

async fn run_sla_sweep(invoices: &Arc<InvoiceRepository>, support: &Arc<SupportRepository>, warning_days: i64) -> Result<(), ApError> {
    let now = Utc::now();
    let pending = invoices.find_by_statuses(PENDING_STATUSES).await?;

    for record in pending {
        let Some(due_date) = record.invoice.due_date else { continue };
        let days_until_due = (due_date - now).num_days();

        let (alert_type, severity, message) = if days_until_due < 0 {
            ("sla_overdue", SlaAlertSeverity::Critical, format!("overdue by {} day(s)", -days_until_due))
        } else if days_until_due <= warning_days {
            ("sla_due_soon", SlaAlertSeverity::Warning, format!("due in {} day(s)", days_until_due))
        } else {
            continue;
        };

        let already_raised_today = support
            .find_sla_alerts_for_invoice(record.invoice.id)
            .await?
            .into_iter()
            .any(|a| a.alert_type == alert_type && same_utc_day(a.created_at, now));
        if already_raised_today {
            continue;
        }

        let alert = SlaAlert {
            id: ap_domain::value_objects::SlaAlertId::new(),
            invoice_id: record.invoice.id,
            alert_type: alert_type.to_string(),
            severity,
            message,
            acknowledged_at: None,
            created_at: now,
        };
        support.save_sla_alert(&alert).await?;
    }

    Ok(())
}

fn same_utc_day(a: DateTime<Utc>, b: DateTime<Utc>) -> bool {
    a.year() == b.year() && a.ordinal() == b.ordinal()
}

async fn run_compliance_expiry(support: &Arc<SupportRepository>) -> Result<(), ApError> {
    let now = Utc::now();
    let expired = support.find_expired_active_compliance_docs(now).await?;
    for mut doc in expired {
        doc.status = VendorComplianceDocStatus::Expired;
        support.save_compliance_doc(&doc).await?;
    }
    Ok(())
}

async fn run_recurring_pattern_detection(invoices: &Arc<InvoiceRepository>, support: &Arc<SupportRepository>) -> Result<(), ApError> {
    let since = Utc::now() - Duration::days(365);
    let approved = invoices.find_by_statuses(&[InvoiceStatus::Approved]).await?;

    let mut by_vendor: HashMap<_, Vec<_>> = HashMap::new();
    for record in approved {
        let Some(vendor_id) = record.invoice.vendor_id else { continue };
        if record.invoice.dedup_reference_date() < since {
            continue;
        }
        by_vendor.entry(vendor_id).or_default().push(record.invoice);
    }

    for (vendor_id, mut vendor_invoices) in by_vendor {
        if vendor_invoices.len() < 3 {
            continue;
        }
        vendor_invoices.sort_by_key(|inv| inv.dedup_reference_date());

        let intervals: Vec<i64> = vendor_invoices
            .windows(2)
            .map(|pair| (pair[1].dedup_reference_date() - pair[0].dedup_reference_date()).num_days())
            .collect();
        if intervals.is_empty() {
            continue;
        }

        let canonical = RECURRING_CANDIDATE_DAYS.iter().find(|&&freq| {
            let within_tolerance = intervals.iter().filter(|&&gap| {
                let lower = (freq as f64 * 0.8).floor() as i64;
                let upper = (freq as f64 * 1.2).ceil() as i64;
                gap >= lower && gap <= upper
            }).count();
            (within_tolerance as f64 / intervals.len() as f64) >= 0.6
        });

        let Some(&frequency_days) = canonical else { continue };

        let amounts: Vec<f64> = vendor_invoices.iter().filter_map(|inv| inv.total_amount).collect();
        let avg_amount = if amounts.is_empty() { 0.0 } else { amounts.iter().sum::<f64>() / amounts.len() as f64 };

        let mut existing = support.find_patterns_by_vendor(vendor_id).await?;
        let pattern = if let Some(mut found) = existing.pop() {
            found.frequency_days = frequency_days as i32;
            found.avg_amount = avg_amount;
            found.sample_count = vendor_invoices.len() as i32;
            found.last_seen_at = Utc::now();
            found.updated_at = Utc::now();
            found
        } else {
            let now = Utc::now();
            RecurringInvoicePattern {
                id: ap_domain::value_objects::RecurringInvoicePatternId::new(),
                vendor_id,
                frequency_days: frequency_days as i32,
                avg_amount,
                sample_count: vendor_invoices.len() as i32,
                last_seen_at: now,
                created_at: now,
                updated_at: now,
            }
        };
        support.save_pattern(&pattern).await?;
    }

    Ok(())
}

const FEEDBACK_RECOMMENDATION_THRESHOLD: usize = 3;

async fn run_feedback_analysis(support: &Arc<SupportRepository>) -> Result<(), ApError> {
    let since = Utc::now() - Duration::days(7);
    let feedback: Vec<AiFeedback> = support.list_ai_feedback().await?.into_iter().filter(|f| f.created_at >= since && !f.was_correct).collect();

    let mut grouped: HashMap<(String, String), usize> = HashMap::new();
    for item in &feedback {
        let field = item.field.clone().unwrap_or_default();
        *grouped.entry((item.feedback_type.clone(), field)).or_insert(0) += 1;
    }

    for ((feedback_type, field), count) in grouped {
        if count < FEEDBACK_RECOMMENDATION_THRESHOLD {
            continue;
        }
        let rationale = format!("{count} corrections of type \"{feedback_type}\" on field \"{field}\" in the last 7 days");
        let recommendation = RuleRecommendation::new_pending("matching_tolerance", field, feedback_type, count as i32, rationale);
        support.save_recommendation(&recommendation).await?;
    }

    Ok(())
}
