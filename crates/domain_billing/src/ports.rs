//! Billing Domain Ports
//!
//! The charge catalog is an external collaborator: the platform's fee
//! structure per class/program lives outside this engine and is consumed
//! through the `ChargeCatalog` port. Adapters can be internal (database) or
//! external (API to the organization's fee management system).
//!
//! ```rust,ignore
//! use domain_billing::ports::ChargeCatalog;
//! use std::sync::Arc;
//!
//! pub struct SnapshotService {
//!     catalog: Arc<dyn ChargeCatalog>,
//! }
//!
//! impl SnapshotService {
//!     pub async fn expected_for(&self, class: &str) -> Result<Vec<CatalogCharge>, PortError> {
//!         self.catalog.get_applicable_charges(class, None).await
//!     }
//! }
//! ```

use async_trait::async_trait;

use core_kernel::{DomainPort, OperationMetadata, PortError};

use crate::snapshot::CatalogCharge;

/// Port for resolving the applicable charges of a program class
#[async_trait]
pub trait ChargeCatalog: DomainPort {
    /// Returns the charge-catalog entries applicable to a program class
    ///
    /// # Arguments
    ///
    /// * `program_class` - The subject's class or program
    /// * `metadata` - Optional operation metadata for tracing
    async fn get_applicable_charges(
        &self,
        program_class: &str,
        metadata: Option<OperationMetadata>,
    ) -> Result<Vec<CatalogCharge>, PortError>;
}

/// Mock implementation of ChargeCatalog for testing
///
/// Stores charges per program class in memory, useful for unit testing the
/// aggregator wiring without the external fee system.
#[cfg(any(test, feature = "mock"))]
pub mod mock {
    use super::*;
    use std::collections::HashMap;

    /// In-memory mock implementation of ChargeCatalog
    #[derive(Debug, Default)]
    pub struct MockChargeCatalog {
        charges: HashMap<String, Vec<CatalogCharge>>,
    }

    impl MockChargeCatalog {
        pub fn new() -> Self {
            Self::default()
        }

        /// Pre-populates charges for a program class
        pub fn with_charges(
            mut self,
            program_class: impl Into<String>,
            charges: Vec<CatalogCharge>,
        ) -> Self {
            self.charges.insert(program_class.into(), charges);
            self
        }
    }

    impl DomainPort for MockChargeCatalog {}

    #[async_trait]
    impl ChargeCatalog for MockChargeCatalog {
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
}
