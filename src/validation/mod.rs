/*!
 * Quality checks for translated game strings.
 *
 * - `placeholders`: format tokens must survive translation
 * - `markup`: rich-text tags must stay balanced
 * - `length`: blank translations and suspicious length ratios
 * - `service`: the `QualityChecker` that runs all rules and scores the result
 */

pub mod length;
pub mod markup;
pub mod placeholders;
pub mod service;

pub use service::{IssueKind, QualityChecker, QualityConfig, QualityIssue, Severity};
