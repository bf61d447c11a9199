//! Name rules applied by the note service to notebook and stack names.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{CatalogError, Result};

pub const NAME_LEN_MIN: usize = 1;
pub const NAME_LEN_MAX: usize = 100;

/// No control characters anywhere, no leading/trailing whitespace, no line
/// or paragraph separators inside.
static NAME_PATTERN: Lazy<Option<Regex>> = Lazy::new(|| {
    match Regex::new(r"^[^\p{Cc}\p{Z}]([^\p{Cc}\p{Zl}\p{Zp}]{0,98}[^\p{Cc}\p{Z}])?$") {
        Ok(re) => Some(re),
        Err(e) => {
            log::error!("[validation] Failed to compile name pattern: {}", e);
            None
        }
    }
});

fn check(what: &str, name: &str) -> Result<()> {
    let len = name.chars().count();
    if len < NAME_LEN_MIN {
        return Err(CatalogError::InvalidName(format!("{} name is empty", what)));
    }
    if len > NAME_LEN_MAX {
        return Err(CatalogError::InvalidName(format!(
            "{} name is too long ({} characters, at most {} allowed)",
            what, len, NAME_LEN_MAX
        )));
    }
    match NAME_PATTERN.as_ref() {
        Some(re) if re.is_match(name) => Ok(()),
        Some(_) => Err(CatalogError::InvalidName(format!(
            "{} name \"{}\" has leading/trailing whitespace or forbidden characters",
            what, name
        ))),
        None => Err(CatalogError::Internal("name pattern unavailable".to_string())),
    }
}

pub fn validate_notebook_name(name: &str) -> Result<()> {
    check("notebook", name)
}

pub fn validate_stack_name(name: &str) -> Result<()> {
    check("stack", name)
}

/// Key used for case-insensitive name comparisons and ordering.
pub fn fold_name(name: &str) -> String {
    name.to_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_plain_names() {
        assert!(validate_notebook_name("Work").is_ok());
        assert!(validate_notebook_name("a").is_ok());
        assert!(validate_notebook_name("Travel plans 2024").is_ok());
        assert!(validate_notebook_name("회의록").is_ok());
    }

    #[test]
    fn test_rejects_empty() {
        assert!(matches!(validate_notebook_name(""), Err(CatalogError::InvalidName(_))));
    }

    #[test]
    fn test_length_bounds() {
        let max = "x".repeat(NAME_LEN_MAX);
        assert!(validate_notebook_name(&max).is_ok());
        let too_long = "x".repeat(NAME_LEN_MAX + 1);
        assert!(validate_notebook_name(&too_long).is_err());
    }

    #[test]
    fn test_rejects_surrounding_whitespace() {
        assert!(validate_notebook_name(" Work").is_err());
        assert!(validate_notebook_name("Work ").is_err());
        assert!(validate_stack_name("\tProjects").is_err());
    }

    #[test]
    fn test_rejects_control_and_separators() {
        assert!(validate_notebook_name("Wo\nrk").is_err());
        assert!(validate_notebook_name("Wo\u{2028}rk").is_err());
        assert!(validate_stack_name("A\u{0007}B").is_err());
    }

    #[test]
    fn test_inner_spaces_allowed() {
        assert!(validate_stack_name("My projects").is_ok());
    }

    #[test]
    fn test_fold_is_case_insensitive() {
        assert_eq!(fold_name("Work"), fold_name("wORK"));
    }
}
