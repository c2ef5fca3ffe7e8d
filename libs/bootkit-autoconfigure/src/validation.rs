//! Group-aware validation of handler inputs.
//!
//! A [`MethodValidator`] exists only when the application supplies a
//! [`ValidationGroupsProvider`]. For every call it asks the provider which
//! groups are active for the target, validates each group in order and turns
//! the collected failures into a 422 problem.

use std::sync::Arc;

use axum::response::{IntoResponse, Response};
use bootkit_errors::{Problem, ValidationViolation, catalog};
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationErrors, ValidationErrorsKind};

/// Group checked by `validator::Validate`.
pub const DEFAULT_GROUP: &str = "default";

/// Bound from the `validation` prefix.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationProperties {
    /// Stop at the first group that fails.
    pub fail_fast: bool,
}

/// Active validation groups for a call target such as `"orders::create"`.
pub trait ValidationGroupsProvider: Send + Sync {
    fn groups(&self, target: &str) -> Vec<String>;
}

/// The same groups for every target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticValidationGroups {
    groups: Vec<String>,
}

impl StaticValidationGroups {
    #[must_use]
    pub fn new<I, S>(groups: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            groups: groups.into_iter().map(Into::into).collect(),
        }
    }
}

impl Default for StaticValidationGroups {
    fn default() -> Self {
        Self::new([DEFAULT_GROUP])
    }
}

impl ValidationGroupsProvider for StaticValidationGroups {
    fn groups(&self, _target: &str) -> Vec<String> {
        self.groups.clone()
    }
}

/// Targets that skip validation entirely.
pub trait MethodValidationExcludeFilter: Send + Sync {
    fn is_excluded(&self, target: &str) -> bool;
}

/// Excludes every target starting with the given prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetPrefixExcludeFilter(pub String);

impl MethodValidationExcludeFilter for TargetPrefixExcludeFilter {
    fn is_excluded(&self, target: &str) -> bool {
        target.starts_with(self.0.as_str())
    }
}

/// Validation per named group. The default group delegates to
/// [`Validate`]; override `validate_group` to add constraints for other
/// groups.
pub trait GroupValidate: Validate {
    /// # Errors
    /// The constraint violations of `group`.
    fn validate_group(&self, group: &str) -> Result<(), ValidationErrors> {
        if group == DEFAULT_GROUP {
            self.validate()
        } else {
            Ok(())
        }
    }
}

/// Violations of one validated call.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("validation failed for {target}: {} violation(s)", violations.len())]
pub struct MethodValidationError {
    pub target: String,
    pub violations: Vec<ValidationViolation>,
}

impl MethodValidationError {
    pub fn to_problem(&self) -> Problem {
        catalog::VALIDATION_FAILED
            .as_problem(self.to_string())
            .with_errors(self.violations.clone())
    }
}

impl IntoResponse for MethodValidationError {
    fn into_response(self) -> Response {
        self.to_problem().into_response()
    }
}

fn flatten(prefix: &str, errors: &ValidationErrors, out: &mut Vec<ValidationViolation>) {
    for (field, kind) in errors.errors() {
        let field: &str = field;
        let path = if prefix.is_empty() {
            field.to_owned()
        } else {
            format!("{prefix}.{field}")
        };
        match kind {
            ValidationErrorsKind::Field(list) => {
                out.extend(list.iter().map(|e| ValidationViolation {
                    field: path.clone(),
                    message: e
                        .message
                        .as_ref()
                        .map_or_else(|| e.code.to_string(), ToString::to_string),
                    code: Some(e.code.to_string()),
                }));
            }
            ValidationErrorsKind::Struct(nested) => flatten(&path, nested, out),
            ValidationErrorsKind::List(items) => {
                for (index, nested) in items {
                    flatten(&format!("{path}[{index}]"), nested, out);
                }
            }
        }
    }
}

/// Entry point used by handlers before running business logic.
pub struct MethodValidator {
    groups: Arc<dyn ValidationGroupsProvider>,
    excludes: Vec<Arc<dyn MethodValidationExcludeFilter>>,
    fail_fast: bool,
}

impl std::fmt::Debug for MethodValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MethodValidator")
            .field("excludes", &self.excludes.len())
            .field("fail_fast", &self.fail_fast)
            .finish_non_exhaustive()
    }
}

impl MethodValidator {
    #[must_use]
    pub fn new(groups: Arc<dyn ValidationGroupsProvider>, props: &ValidationProperties) -> Self {
        Self {
            groups,
            excludes: Vec::new(),
            fail_fast: props.fail_fast,
        }
    }

    #[must_use]
    pub fn with_exclude_filter(mut self, filter: Arc<dyn MethodValidationExcludeFilter>) -> Self {
        self.excludes.push(filter);
        self
    }

    #[must_use]
    pub fn is_excluded(&self, target: &str) -> bool {
        self.excludes.iter().any(|f| f.is_excluded(target))
    }

    /// Validate `value` for a call to `target`.
    ///
    /// # Errors
    /// Returns the collected violations of every failing group, or of the
    /// first failing group with `fail_fast`.
    pub fn validate<T: GroupValidate>(
        &self,
        target: &str,
        value: &T,
    ) -> Result<(), MethodValidationError> {
        if self.is_excluded(target) {
            tracing::trace!(target, "validation skipped");
            return Ok(());
        }
        let mut violations = Vec::new();
        for group in self.groups.groups(target) {
            if let Err(errors) = value.validate_group(&group) {
                flatten("", &errors, &mut violations);
                if self.fail_fast {
                    break;
                }
            }
        }
        if violations.is_empty() {
            return Ok(());
        }
        tracing::debug!(target, count = violations.len(), "validation failed");
        Err(MethodValidationError {
            target: target.to_owned(),
            violations,
        })
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use validator::ValidationError;

    #[derive(Validate)]
    struct Address {
        #[validate(length(min = 1))]
        city: String,
    }

    #[derive(Validate)]
    struct NewOrder {
        #[validate(length(min = 3, message = "name too short"))]
        name: String,
        #[validate(range(min = 1))]
        quantity: u32,
        #[validate(nested)]
        address: Address,
    }

    impl GroupValidate for NewOrder {
        fn validate_group(&self, group: &str) -> Result<(), ValidationErrors> {
            match group {
                DEFAULT_GROUP => self.validate(),
                "bulk" if self.quantity < 100 => {
                    let mut errors = ValidationErrors::new();
                    errors.add("quantity", ValidationError::new("bulk_minimum"));
                    Err(errors)
                }
                _ => Ok(()),
            }
        }
    }

    fn order(name: &str, quantity: u32, city: &str) -> NewOrder {
        NewOrder {
            name: name.to_owned(),
            quantity,
            address: Address {
                city: city.to_owned(),
            },
        }
    }

    fn validator(groups: &[&str], fail_fast: bool) -> MethodValidator {
        MethodValidator::new(
            Arc::new(StaticValidationGroups::new(groups.iter().copied())),
            &ValidationProperties { fail_fast },
        )
    }

    #[test]
    fn valid_input_passes() {
        let v = validator(&[DEFAULT_GROUP], false);
        assert!(v.validate("orders::create", &order("widget", 2, "Oslo")).is_ok());
    }

    #[test]
    fn violations_carry_nested_paths_and_messages() {
        let v = validator(&[DEFAULT_GROUP], false);
        let err = v
            .validate("orders::create", &order("ab", 2, ""))
            .unwrap_err();
        let mut fields: Vec<_> = err.violations.iter().map(|x| x.field.as_str()).collect();
        fields.sort_unstable();
        assert_eq!(fields, vec!["address.city", "name"]);
        let name = err.violations.iter().find(|x| x.field == "name").unwrap();
        assert_eq!(name.message, "name too short");
    }

    #[test]
    fn every_active_group_is_checked_unless_fail_fast() {
        let input = order("ab", 2, "Oslo");
        let all = validator(&[DEFAULT_GROUP, "bulk"], false)
            .validate("orders::create", &input)
            .unwrap_err();
        assert_eq!(all.violations.len(), 2);

        let first = validator(&[DEFAULT_GROUP, "bulk"], true)
            .validate("orders::create", &input)
            .unwrap_err();
        assert_eq!(first.violations.len(), 1);
        assert_eq!(first.violations[0].field, "name");
    }

    #[test]
    fn excluded_targets_are_not_validated() {
        let v = validator(&[DEFAULT_GROUP], false)
            .with_exclude_filter(Arc::new(TargetPrefixExcludeFilter("internal::".to_owned())));
        assert!(v.validate("internal::import", &order("", 0, "")).is_ok());
        assert!(v.validate("orders::create", &order("", 0, "")).is_err());
    }

    #[test]
    fn renders_as_422_problem() {
        let err = validator(&[DEFAULT_GROUP], false)
            .validate("orders::create", &order("ab", 2, "Oslo"))
            .unwrap_err();
        let problem = err.to_problem();
        assert_eq!(problem.status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(problem.code, "VALIDATION_FAILED");
        assert_eq!(problem.errors.unwrap().len(), 1);
    }
}
