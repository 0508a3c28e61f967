//! Baseline verification for fixity.
//!
//! This crate ties the walker, the hashing scheduler and the snapshot store
//! together into the two runs an auditor needs:
//!
//! - **Save** - walk the tree, hash every file, rebuild the snapshot
//! - **Check** - load the snapshot, walk and re-hash, then reconcile
//!
//! Reconciliation sorts every difference into one bucket: corrupt files
//! (digest changed), new files, missing files, plus new and missing folders.
//!
//! ```rust,no_run
//! use fixity_verify::{AuditConfig, Auditor};
//!
//! let config = AuditConfig::new("/srv/archive");
//! let auditor = Auditor::new(config).unwrap();
//!
//! auditor.save().unwrap();
//! // ... later ...
//! let outcome = auditor.check().unwrap();
//! for path in &outcome.report.corrupt {
//!     println!("Corrupt: {path}");
//! }
//! ```

mod engine;
mod reconcile;

pub use engine::{Auditor, CheckOutcome, SaveSummary, check, save};
pub use reconcile::reconcile;

// Re-export core types
pub use fixity_core::{AuditConfig, AuditError, HashAlgorithm, ReconciliationReport};
