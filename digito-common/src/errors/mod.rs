//! Error catalog and definitions for Digito
//!
//! This module provides the error catalog with unique error codes,
//! categorized by subsystem. Each error includes remediation steps and
//! documentation links. Subsystem error enums (`MetadataError`,
//! `AssembleError`, `PublishError`, `AlarmError`) map onto a catalog entry
//! through their `code()` method.
//!
//! # Error Code Ranges
//!
//! | Range      | Category    | Description                              |
//! |------------|-------------|------------------------------------------|
//! | E001-E099  | Config      | Configuration and environment errors     |
//! | E100-E199  | Metadata    | metadata.json loading and validation     |
//! | E200-E299  | Validation  | Automation document rule validation      |
//! | E300-E399  | Assembly    | Content assembly (snippets, builders)    |
//! | E400-E499  | Publish     | SSM document create/update               |
//! | E500-E599  | Alarm       | Alarm stack deployment and verification  |
//! | E600-E699  | Internal    | Internal/unexpected errors               |

pub mod catalog;

pub use catalog::{ErrorCategory, ErrorCode, ErrorEntry};
