//! Access (QR) code lifecycle: issuance with validity windows, status
//! derivation and bulk status changes.

pub mod issuer;
pub mod tracker;

pub use issuer::{EditRequest, IssueRequest, edit_code, issue_codes};
pub use tracker::{AccessCodeView, BulkActivationReport, BulkDeleteReport, status};
