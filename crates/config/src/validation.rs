//! Section-level checks for configuration values
//!
//! `[loader]`, `[transport]` and `[sync]` each implement [`ConfigSection`];
//! [`Validator`] holds the shared field checks they are built from.

pub use crate::error::ValidationError;

/// A table of `config.toml` that knows how to check and override itself
pub trait ConfigSection: Default {
    /// Every problem with the section's values, or `Ok` when usable
    fn validate(&self) -> Result<(), Vec<ValidationError>>;

    /// Overlays `other` onto this section; `other` wins
    fn merge(&mut self, other: Self);

    /// The TOML table name, used as the prefix of field paths
    fn section_name(&self) -> &'static str;
}

/// Field checks shared by the sections
pub struct Validator;

impl Validator {
    /// Inclusive bounds check; the offending value is kept on the error
    pub fn in_range<T>(value: T, min: T, max: T, field: &str) -> Result<(), ValidationError>
    where
        T: PartialOrd + std::fmt::Display + Copy,
    {
        if (min..=max).contains(&value) {
            return Ok(());
        }
        Err(ValidationError::with_value(
            field,
            format!("must be between {} and {}", min, max),
            value,
        ))
    }

    /// Rejects empty and whitespace-only strings
    pub fn not_empty(value: &str, field: &str) -> Result<(), ValidationError> {
        match value.trim().is_empty() {
            true => Err(ValidationError::new(field, "must not be empty")),
            false => Ok(()),
        }
    }

    /// Keeps only the failures of a batch of checks
    pub fn collect_errors(
        results: Vec<Result<(), ValidationError>>,
    ) -> Result<(), Vec<ValidationError>> {
        let errors: Vec<_> = results.into_iter().filter_map(Result::err).collect();
        match errors.is_empty() {
            true => Ok(()),
            false => Err(errors),
        }
    }
}
