//! Dependency auditing for slide-deck bundles.
//!
//! Detects library versions in bundled scripts (by file name or license
//! banner) and in `package.json`, and matches them against an advisory
//! database. Findings are advisory unless strict mode is on.

pub mod advisory;
pub mod auditor;
pub mod detect;
pub mod manifest;

pub use advisory::{Advisory, AdvisoryDb, Severity};
pub use auditor::{AuditConfig, AuditError, AuditReport, Auditor, Finding};
pub use detect::{detect_script, Component, Origin};
pub use manifest::manifest_components;
