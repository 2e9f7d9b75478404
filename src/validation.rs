//! Recipient address validation.
//!
//! Syntactic check only: no DNS or MX lookups are performed. Addresses with
//! non-ASCII characters (internationalized domains or local parts) are
//! rejected.

use thiserror::Error;

/// Maximum email length.
pub const MAX_EMAIL_LENGTH: usize = 254;

/// Minimum length of the final domain label.
const MIN_TLD_LENGTH: usize = 2;

/// Reasons an address is rejected.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EmailError {
    /// Address is empty.
    #[error("email address is empty")]
    Empty,

    /// Address is too long.
    #[error("email must be at most {MAX_EMAIL_LENGTH} characters")]
    TooLong,

    /// Address does not contain exactly one `@`.
    #[error("email must contain exactly one '@'")]
    AtSign,

    /// Local part is empty or has characters outside `[A-Za-z0-9._%+-]`.
    #[error("invalid local part")]
    LocalPart,

    /// Domain is empty or has characters outside `[A-Za-z0-9.-]`.
    #[error("invalid domain")]
    Domain,

    /// Final domain label is missing, too short or not alphabetic.
    #[error("invalid top-level domain")]
    TopLevelDomain,
}

fn is_local_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '%' | '+' | '-')
}

fn is_domain_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '.' | '-')
}

/// Validate the syntax of an email address.
///
/// Accepts `local@domain.tld` where the local part is one or more of
/// `[A-Za-z0-9._%+-]`, the domain is one or more of `[A-Za-z0-9.-]`, and the
/// label after the last dot is at least two ASCII letters. Addresses longer
/// than [`MAX_EMAIL_LENGTH`] are rejected even if the pattern would match.
///
/// # Examples
///
/// ```
/// use nudge::validation::validate_email;
///
/// assert!(validate_email("user@example.com").is_ok());
/// assert!(validate_email("user@example").is_err());
/// ```
pub fn validate_email(address: &str) -> Result<(), EmailError> {
    if address.is_empty() {
        return Err(EmailError::Empty);
    }

    if address.len() > MAX_EMAIL_LENGTH {
        return Err(EmailError::TooLong);
    }

    let (local, domain) = match address.split_once('@') {
        Some((local, domain)) if !domain.contains('@') => (local, domain),
        _ => return Err(EmailError::AtSign),
    };

    if local.is_empty() || !local.chars().all(is_local_char) {
        return Err(EmailError::LocalPart);
    }

    // The top-level label cannot contain a dot, so it always follows the last one.
    let (host, tld) = domain.rsplit_once('.').ok_or(EmailError::TopLevelDomain)?;

    if host.is_empty() || !host.chars().all(is_domain_char) {
        return Err(EmailError::Domain);
    }

    if tld.len() < MIN_TLD_LENGTH || !tld.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(EmailError::TopLevelDomain);
    }

    Ok(())
}

/// Check whether an address is syntactically valid.
pub fn is_valid_email(address: &str) -> bool {
    validate_email(address).is_ok()
}
