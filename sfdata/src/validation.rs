//! Precondition checks with either fail-fast or accumulate-all behaviour.
//!
//! A [`Validator`] is threaded through a chain of `require_*` steps. Each step
//! records its check name and outcome. In [`ValidationMode::FailFast`] the
//! first failing step returns `Err`; in [`ValidationMode::Accumulate`] every
//! failure is collected and the steps always return `Ok`.
//!
//! Messages are templates with positional `$1`, `$2` placeholders filled from
//! the failing test names, paths or allowed values.

use std::path::Path;
use thiserror::Error;

pub const MUTUALLY_EXCLUSIVE: &str = "$1 are mutually exclusive";
pub const ONE_REQUIRED: &str = "one of $1 must be specified";
pub const ALL_REQUIRED: &str = "all of $1 must be specified";
pub const NONE_ALLOWED: &str = "none of $1 can be specified";
pub const REQUIRED: &str = "$1 is required";
pub const ONE_OF: &str = "$1 must be one of: $2";
pub const DIRECTORY_EXISTS: &str = "$1 must be an existing directory";
pub const FILE_EXISTS: &str = "$1 must be an existing file";
pub const NOT_EXISTS: &str = "$1 must not be an existing file or directory";

/// A named test outcome.
#[derive(Debug, Clone, Copy)]
pub struct Test<'a> {
    pub name: &'a str,
    pub passed: bool,
}

impl<'a> Test<'a> {
    pub fn new(name: &'a str, passed: bool) -> Self {
        Self { name, passed }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationMode {
    /// Return the error from the first failing step.
    FailFast,
    /// Collect every failure; inspect with [`Validator::errors`].
    Accumulate,
}

#[derive(Error, Debug, Clone, PartialEq)]
#[error("{}", .errors.join("\n"))]
pub struct ValidationError {
    pub errors: Vec<String>,
}

#[derive(Debug)]
pub struct Validator {
    mode: ValidationMode,
    checks: Vec<(String, bool)>,
    errors: Vec<String>,
}

impl Validator {
    pub fn new(mode: ValidationMode) -> Self {
        Self {
            mode,
            checks: Vec::new(),
            errors: Vec::new(),
        }
    }

    pub fn fail_fast() -> Self {
        Self::new(ValidationMode::FailFast)
    }

    pub fn accumulate() -> Self {
        Self::new(ValidationMode::Accumulate)
    }

    pub fn mode(&self) -> ValidationMode {
        self.mode
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Every check run so far, in order, with its outcome.
    pub fn checks(&self) -> &[(String, bool)] {
        &self.checks
    }

    /// Fails if more than one test passed.
    pub fn require_mutually_exclusive(self, tests: &[Test]) -> Result<Self, ValidationError> {
        let passed = passed_count(tests) <= 1;
        self.record(joined(tests), passed, MUTUALLY_EXCLUSIVE, &[&joined(tests)])
    }

    /// Fails if no test passed.
    pub fn require_one_true(self, tests: &[Test]) -> Result<Self, ValidationError> {
        self.require_one_true_with(tests, ONE_REQUIRED)
    }

    pub fn require_one_true_with(
        self,
        tests: &[Test],
        template: &str,
    ) -> Result<Self, ValidationError> {
        let passed = passed_count(tests) > 0;
        self.record(joined(tests), passed, template, &[&joined(tests)])
    }

    /// Fails unless exactly one test passed.
    pub fn require_exactly_one_of(self, tests: &[Test]) -> Result<Self, ValidationError> {
        self.require_mutually_exclusive(tests)?
            .require_one_true(tests)
    }

    /// Fails unless every test passed.
    pub fn require_all(self, tests: &[Test]) -> Result<Self, ValidationError> {
        let passed = passed_count(tests) == tests.len();
        self.record(joined(tests), passed, ALL_REQUIRED, &[&joined(tests)])
    }

    /// Fails if any test passed.
    pub fn require_none(self, tests: &[Test]) -> Result<Self, ValidationError> {
        let passed = passed_count(tests) == 0;
        self.record(joined(tests), passed, NONE_ALLOWED, &[&joined(tests)])
    }

    pub fn require_true(self, name: &str, passed: bool) -> Result<Self, ValidationError> {
        self.require_true_with(name, passed, REQUIRED)
    }

    pub fn require_true_with(
        self,
        name: &str,
        passed: bool,
        template: &str,
    ) -> Result<Self, ValidationError> {
        self.record(name.to_string(), passed, template, &[name])
    }

    /// Fails unless `value` is one of `allowed`.
    pub fn require_one_of<T: PartialEq + std::fmt::Display>(
        self,
        name: &str,
        value: &T,
        allowed: &[T],
    ) -> Result<Self, ValidationError> {
        let passed = allowed.iter().any(|a| a == value);
        let listed = allowed
            .iter()
            .map(|a| a.to_string())
            .collect::<Vec<_>>()
            .join(", ");
        self.record(name.to_string(), passed, ONE_OF, &[name, &listed])
    }

    pub fn require_directory_exists(self, path: &Path) -> Result<Self, ValidationError> {
        let shown = path.display().to_string();
        let passed = path.is_dir();
        self.record(shown.clone(), passed, DIRECTORY_EXISTS, &[&shown])
    }

    pub fn require_file_exists(self, path: &Path) -> Result<Self, ValidationError> {
        let shown = path.display().to_string();
        let passed = path.is_file();
        self.record(shown.clone(), passed, FILE_EXISTS, &[&shown])
    }

    pub fn require_not_exists(self, path: &Path) -> Result<Self, ValidationError> {
        let shown = path.display().to_string();
        let passed = !path.exists();
        self.record(shown.clone(), passed, NOT_EXISTS, &[&shown])
    }

    /// Appends `message` unconditionally.
    pub fn fail(self, message: &str) -> Result<Self, ValidationError> {
        self.record(message.to_string(), false, message, &[])
    }

    /// Converts accumulated failures into a single error.
    ///
    /// `help` is placed before the failures when there are any.
    pub fn finish(self, help: Option<&str>) -> Result<(), ValidationError> {
        if self.errors.is_empty() {
            return Ok(());
        }
        let mut errors = self.errors;
        if let Some(help) = help {
            errors.insert(0, help.to_string());
        }
        Err(ValidationError { errors })
    }

    fn record(
        mut self,
        name: String,
        passed: bool,
        template: &str,
        replacements: &[&str],
    ) -> Result<Self, ValidationError> {
        self.checks.push((name, passed));
        if passed {
            return Ok(self);
        }

        let message = fill_template(template, replacements);
        log::debug!("validation failed: {}", message);
        match self.mode {
            ValidationMode::FailFast => Err(ValidationError {
                errors: vec![message],
            }),
            ValidationMode::Accumulate => {
                self.errors.push(message);
                Ok(self)
            }
        }
    }
}

/// Replaces `$1`..`$n` with the matching replacement in one left-to-right
/// pass; substituted text is never rescanned. Out-of-range placeholders are
/// left as written.
pub fn fill_template(template: &str, replacements: &[&str]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(dollar) = rest.find('$') {
        out.push_str(&rest[..dollar]);
        let after = &rest[dollar + 1..];
        let digits = after.len() - after.trim_start_matches(|c: char| c.is_ascii_digit()).len();
        let replacement = after[..digits]
            .parse::<usize>()
            .ok()
            .and_then(|n| n.checked_sub(1))
            .and_then(|i| replacements.get(i));
        match replacement {
            Some(r) => out.push_str(r),
            None => out.push_str(&rest[dollar..dollar + 1 + digits]),
        }
        rest = &after[digits..];
    }
    out.push_str(rest);
    out
}

fn passed_count(tests: &[Test]) -> usize {
    tests.iter().filter(|t| t.passed).count()
}

fn joined(tests: &[Test]) -> String {
    tests.iter().map(|t| t.name).collect::<Vec<_>>().join(", ")
}
