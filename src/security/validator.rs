use crate::error::{GitError, GitResult};
use crate::security::DANGEROUS_OPTION_PREFIXES;

/// Outcome of checking one candidate URL or argument
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// Safe to place on a command line; carries the trimmed value
    Accepted(String),
    /// Probable injection attempt
    Rejected { value: String, reason: String },
}

impl Verdict {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Verdict::Accepted(_))
    }

    pub fn into_result(self) -> GitResult<String> {
        match self {
            Verdict::Accepted(value) => Ok(value),
            Verdict::Rejected { value, reason } => Err(GitError::validation(value, reason)),
        }
    }
}

/// Rejects remote URLs and ref arguments that git would parse as options
#[derive(Debug, Clone)]
pub struct UrlValidator {
    enabled: bool,
}

impl UrlValidator {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Classify a candidate URL or argument
    ///
    /// The candidate is trimmed first. Every whitespace separated token is
    /// checked on its own so that concatenated options are each reported.
    /// With checking disabled the trimmed value is always accepted.
    pub fn validate(&self, candidate: &str) -> Verdict {
        let value = candidate.trim();

        if !self.enabled || value.is_empty() {
            return Verdict::Accepted(value.to_string());
        }

        let reasons: Vec<String> = value
            .split_whitespace()
            .filter_map(token_rejection)
            .collect();

        if reasons.is_empty() {
            Verdict::Accepted(value.to_string())
        } else {
            Verdict::Rejected {
                value: value.to_string(),
                reason: reasons.join("; "),
            }
        }
    }

    /// Validate and return the trimmed value, or a `GitError::Validation`
    pub fn check(&self, candidate: &str) -> GitResult<String> {
        self.validate(candidate).into_result()
    }
}

impl Default for UrlValidator {
    fn default() -> Self {
        Self::new(true)
    }
}

fn token_rejection(token: &str) -> Option<String> {
    if token.starts_with('`') {
        return Some(format!("'{}' starts with a backtick", token));
    }

    if !token.starts_with('-') {
        return None;
    }

    let option = token.split('=').next().unwrap_or(token);
    let known = DANGEROUS_OPTION_PREFIXES.iter().find(|prefix| {
        option == **prefix || (prefix.len() == 2 && !prefix.starts_with("--") && option.starts_with(**prefix))
    });

    Some(match known {
        Some(prefix) => format!("'{}' is the git option {}", token, prefix),
        None => format!("'{}' starts with '-' and would be read as an option", token),
    })
}
