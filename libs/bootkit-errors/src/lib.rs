//! Error model shared by the bootkit crates.
//!
//! HTTP-facing failures (authentication, access denial, validation) are
//! rendered as RFC 9457 Problem Details. This crate only holds the data
//! model and the static catalog; the `axum` feature adds `IntoResponse`.
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

pub mod catalog;
pub mod problem;

pub use catalog::ErrDef;
pub use problem::{APPLICATION_PROBLEM_JSON, Problem, ValidationViolation};

/// Attach the request path and optional trace id to a problem.
pub fn finalize(mut p: Problem, instance: &str, trace_id: Option<String>) -> Problem {
    p = p.with_instance(instance);
    if let Some(tid) = trace_id {
        p = p.with_trace_id(tid);
    }
    p
}
