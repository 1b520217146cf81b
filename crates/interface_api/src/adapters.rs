//! Adapters for the external collaborator ports
//!
//! The charge catalog and the notification sink belong to the surrounding
//! platform; these adapters are the deployment-level defaults. The catalog
//! reads a static JSON document (fee structures change a few times a year
//! and ship with configuration); the sink hands notifications to the log
//! pipeline the platform tails.

use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use tracing::info;

use core_kernel::{DomainPort, OperationMetadata, PortError};
use domain_billing::{CatalogCharge, ChargeCatalog};
use domain_reconciliation::{NotificationRequest, NotificationSink};

/// Charge catalog backed by a static JSON document
///
/// The document maps program class to its applicable charges:
///
/// ```json
/// { "grade-5": [ { "charge_type": "tuition", "amount": { ... }, "frequency": "annual" } ] }
/// ```
#[derive(Debug, Default)]
pub struct StaticChargeCatalog {
    charges: HashMap<String, Vec<CatalogCharge>>,
}

impl StaticChargeCatalog {
    /// An empty catalog; subjects bill from their plan totals alone
    pub fn empty() -> Self {
        Self::default()
    }

    /// Loads the catalog from a JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, PortError> {
        let raw = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            PortError::connection(format!(
                "cannot read charge catalog {}: {e}",
                path.as_ref().display()
            ))
        })?;
        let charges: HashMap<String, Vec<CatalogCharge>> = serde_json::from_str(&raw)
            .map_err(|e| PortError::validation(format!("malformed charge catalog: {e}")))?;

        info!(classes = charges.len(), "loaded charge catalog");
        Ok(Self { charges })
    }
}

impl DomainPort for StaticChargeCatalog {}

#[async_trait]
impl ChargeCatalog for StaticChargeCatalog {
    async fn get_applicable_charges(
        &self,
        program_class: &str,
        _metadata: Option<OperationMetadata>,
    ) -> Result<Vec<CatalogCharge>, PortError> {
        Ok(self
            .charges
            .get(program_class)
            .cloned()
            .unwrap_or_default())
    }
}

/// Notification sink that emits into the structured log pipeline
///
/// Delivery (push, SMS, in-app) is the platform's concern; the engine's
/// contract ends at handing over the request with its dedupe key.
#[derive(Debug, Default)]
pub struct LogNotificationSink;

impl LogNotificationSink {
    pub fn new() -> Self {
        Self
    }
}

impl DomainPort for LogNotificationSink {}

#[async_trait]
impl NotificationSink for LogNotificationSink {
    async fn create_notification(
        &self,
        request: NotificationRequest,
        _metadata: Option<OperationMetadata>,
    ) -> Result<(), PortError> {
        info!(
            subject = %request.subject_id,
            event = request.event.as_str(),
            priority = ?request.priority,
            dedupe_key = %request.dedupe_key,
            message = %request.message,
            "notification"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_empty_catalog_returns_nothing() {
        let catalog = StaticChargeCatalog::empty();
        let charges = catalog.get_applicable_charges("grade-5", None).await.unwrap();
        assert!(charges.is_empty());
    }

    #[tokio::test]
    async fn test_log_sink_accepts_requests() {
        let sink = LogNotificationSink::new();
        let request = NotificationRequest::new(
            core_kernel::SubjectId::new(),
            domain_reconciliation::ReconciliationEvent::Expiring,
            chrono::NaiveDate::from_ymd_opt(2024, 6, 29).unwrap(),
            "Enrollment ends tomorrow",
            domain_reconciliation::NotificationPriority::Normal,
        );
        assert!(sink.create_notification(request, None).await.is_ok());
    }
}
