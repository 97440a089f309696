// /////////////////////////////////////////////////////////////////////////////
// AP Platform
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Persistence for the support entities: AI call accounting and reviewer
//! feedback, SLA alerts, recurring-invoice patterns, and rule
//! recommendations. Each is small enough that the generic `SqlRepository`
//! plus a couple of filtered scans is all any of them need.

use ap_domain::value_objects::{
    AiCallLogId, InvoiceId, RecurringInvoicePatternId, RuleRecommendationId, SlaAlertId, VendorComplianceDocId,
    VendorId,
};
use ap_domain::entities::{VendorComplianceDoc, VendorComplianceDocStatus};
use ap_domain::{
    AiCallLog, AiFeedback, ApError, RecurringInvoicePattern, RuleRecommendation, RuleRecommendationStatus,
    SlaAlert,
};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

use super::sql_repository::{SqlEntity, SqlRepository};

impl SqlEntity for AiCallLog {
    fn id_string(&self) -> String {
        self.id.to_string()
    }
    fn table_name() -> &'static str {
        "ai_call_logs"
    }
}

impl SqlEntity for AiFeedback {
    fn id_string(&self) -> String {
        self.id.to_string()
    }
    fn table_name() -> &'static str {
        "ai_feedback"
    }
}

impl SqlEntity for SlaAlert {
    fn id_string(&self) -> String {
        self.id.to_string()
    }
    fn table_name() -> &'static str {
        "sla_alerts"
    }
}

impl SqlEntity for RecurringInvoicePattern {
    fn id_string(&self) -> String {
        self.id.to_string()
    }
    fn table_name() -> &'static str {
        "recurring_invoice_patterns"
    }
}

impl SqlEntity for RuleRecommendation {
    fn id_string(&self) -> String {
        self.id.to_string()
    }
    fn table_name() -> &'static str {
        "rule_recommendations"
    }
}

impl SqlEntity for VendorComplianceDoc {
    fn id_string(&self) -> String {
        self.id.to_string()
    }
    fn table_name() -> &'static str {
        "vendor_compliance_docs"
    }
}

pub struct SupportRepository {
    ai_call_logs: SqlRepository<AiCallLog>,
    ai_feedback: SqlRepository<AiFeedback>,
    sla_alerts: SqlRepository<SlaAlert>,
    patterns: SqlRepository<RecurringInvoicePattern>,
    recommendations: SqlRepository<RuleRecommendation>,
    compliance_docs: SqlRepository<VendorComplianceDoc>,
}

impl SupportRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            ai_call_logs: SqlRepository::new(pool.clone()),
            ai_feedback: SqlRepository::new(pool.clone()),
            sla_alerts: SqlRepository::new(pool.clone()),
            patterns: SqlRepository::new(pool.clone()),
            recommendations: SqlRepository::new(pool.clone()),
            compliance_docs: SqlRepository::new(pool),
        }
    }

    pub async fn save_ai_call_log(&self, log: &AiCallLog) -> Result<(), ApError> {
        self.ai_call_logs.save(log).await
    }

    pub async fn find_ai_call_log_by_id(&self, id: AiCallLogId) -> Result<Option<AiCallLog>, ApError> {
        self.ai_call_logs.find_by_id(&id.to_string()).await
    }

    pub async fn find_ai_call_logs_by_invoice(&self, invoice_id: InvoiceId) -> Result<Vec<AiCallLog>, ApError> {
        Ok(self
            .ai_call_logs
            .list_all()
            .await?
            .into_iter()
            .filter(|l| l.invoice_id == Some(invoice_id))
            .collect())
    }

    pub async fn save_ai_feedback(&self, feedback: &AiFeedback) -> Result<(), ApError> {
        self.ai_feedback.save(feedback).await
    }

    /// All feedback rows, for the weekly feedback-analysis job's
    /// threshold-crossing scan (spec.md §4.11).
    pub async fn list_ai_feedback(&self) -> Result<Vec<AiFeedback>, ApError> {
        self.ai_feedback.list_all().await
    }

    pub async fn save_sla_alert(&self, alert: &SlaAlert) -> Result<(), ApError> {
        self.sla_alerts.save(alert).await
    }

    pub async fn find_unacknowledged_sla_alerts(&self) -> Result<Vec<SlaAlert>, ApError> {
        Ok(self.sla_alerts.list_all().await?.into_iter().filter(|a| !a.is_acknowledged()).collect())
    }

    pub async fn find_sla_alert_by_id(&self, id: SlaAlertId) -> Result<Option<SlaAlert>, ApError> {
        self.sla_alerts.find_by_id(&id.to_string()).await
    }

    /// All alerts raised for `invoice_id`, for the SLA sweep's
    /// one-per-`(invoice, type)`-per-day dedup check (spec.md §4.11).
    pub async fn find_sla_alerts_for_invoice(&self, invoice_id: InvoiceId) -> Result<Vec<SlaAlert>, ApError> {
        Ok(self.sla_alerts.list_all().await?.into_iter().filter(|a| a.invoice_id == invoice_id).collect())
    }

    pub async fn save_pattern(&self, pattern: &RecurringInvoicePattern) -> Result<(), ApError> {
        self.patterns.save(pattern).await
    }

    pub async fn find_pattern_by_id(&self, id: RecurringInvoicePatternId) -> Result<Option<RecurringInvoicePattern>, ApError> {
        self.patterns.find_by_id(&id.to_string()).await
    }

    pub async fn find_patterns_by_vendor(&self, vendor_id: VendorId) -> Result<Vec<RecurringInvoicePattern>, ApError> {
        Ok(self.patterns.list_all().await?.into_iter().filter(|p| p.vendor_id == vendor_id).collect())
    }

    pub async fn save_recommendation(&self, rec: &RuleRecommendation) -> Result<(), ApError> {
        self.recommendations.save(rec).await
    }

    pub async fn find_recommendation_by_id(&self, id: RuleRecommendationId) -> Result<Option<RuleRecommendation>, ApError> {
        self.recommendations.find_by_id(&id.to_string()).await
    }

    pub async fn find_pending_recommendations(&self) -> Result<Vec<RuleRecommendation>, ApError> {
        Ok(self
            .recommendations
            .list_all()
            .await?
            .into_iter()
            .filter(|r| r.status == RuleRecommendationStatus::Pending)
            .collect())
    }

    pub async fn save_compliance_doc(&self, doc: &VendorComplianceDoc) -> Result<(), ApError> {
        self.compliance_docs.save(doc).await
    }

    pub async fn find_compliance_doc_by_id(&self, id: VendorComplianceDocId) -> Result<Option<VendorComplianceDoc>, ApError> {
        self.compliance_docs.find_by_id(&id.to_string()).await
    }

    /// Rows past their expiry and still `approved`/`active`, for the weekly
    /// expiry sweep (spec.md §4.11).
    pub async fn find_expired_active_compliance_docs(
        &self,
        now: chrono::DateTime<chrono::Utc>,
    ) -> Result<Vec<VendorComplianceDoc>, ApError> {
        Ok(self.compliance_docs.list_all().await?.into_iter().filter(|d| d.is_expired_as_of(now)).collect())
    }
}
