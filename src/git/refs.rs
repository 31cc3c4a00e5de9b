use crate::error::{GitError, GitResult};
use std::fmt;
use std::str::FromStr;

/// Hex object name, SHA-1 (40) or SHA-256 (64), stored lowercase
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(String);

impl ObjectId {
    pub fn parse(hex: &str) -> GitResult<Self> {
        let hex = hex.trim();
        let valid_len = hex.len() == 40 || hex.len() == 64;
        if !valid_len || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(GitError::ParseError(format!("Invalid object id: {}", hex)));
        }
        Ok(ObjectId(hex.to_ascii_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn from_oid(oid: git2::Oid) -> Self {
        ObjectId(oid.to_string())
    }

    pub fn to_oid(&self) -> GitResult<git2::Oid> {
        git2::Oid::from_str(&self.0).map_err(|e| GitError::library("parse object id", e))
    }
}

impl FromStr for ObjectId {
    type Err = GitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ObjectId::parse(s)
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A local or remote-tracking branch. Remote-tracking names keep their
/// remote prefix (`origin/main`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Branch {
    pub name: String,
    pub id: ObjectId,
}

/// Shell-style glob on ref names: `*` matches any run of characters
/// (including `/`), `?` exactly one
pub fn glob_match(pattern: &str, text: &str) -> bool {
    let p: Vec<char> = pattern.chars().collect();
    let t: Vec<char> = text.chars().collect();

    let (mut pi, mut ti) = (0, 0);
    let mut star: Option<(usize, usize)> = None;

    while ti < t.len() {
        if pi < p.len() && (p[pi] == '?' || p[pi] == t[ti]) {
            pi += 1;
            ti += 1;
        } else if pi < p.len() && p[pi] == '*' {
            star = Some((pi, ti));
            pi += 1;
        } else if let Some((star_pi, star_ti)) = star {
            pi = star_pi + 1;
            ti = star_ti + 1;
            star = Some((star_pi, star_ti + 1));
        } else {
            return false;
        }
    }

    p[pi..].iter().all(|&c| c == '*')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_id_normalized() {
        let id = ObjectId::parse("ABCDEF0123456789ABCDEF0123456789ABCDEF01").unwrap();
        assert_eq!(id.as_str(), "abcdef0123456789abcdef0123456789abcdef01");
        assert_eq!(id, "abcdef0123456789abcdef0123456789abcdef01".parse().unwrap());
    }

    #[test]
    fn test_object_id_sha256() {
        assert!(ObjectId::parse(&"a".repeat(64)).is_ok());
    }

    #[test]
    fn test_object_id_rejects() {
        assert!(ObjectId::parse("abc").is_err());
        assert!(ObjectId::parse(&"g".repeat(40)).is_err());
        assert!(ObjectId::parse(&"a".repeat(41)).is_err());
    }

    #[test]
    fn test_oid_conversion() {
        let oid = git2::Oid::from_str("0123456789abcdef0123456789abcdef01234567").unwrap();
        let id = ObjectId::from_oid(oid);
        assert_eq!(id.to_oid().unwrap(), oid);
    }

    #[test]
    fn test_glob_match() {
        assert!(glob_match("*", "origin/feature/x"));
        assert!(glob_match("origin/*", "origin/main"));
        assert!(glob_match("feat?re-*", "feature-123"));
        assert!(glob_match("main", "main"));
        assert!(!glob_match("main", "mainline"));
        assert!(!glob_match("origin/*", "upstream/main"));
        assert!(glob_match("*/release-*", "origin/release-1.0"));
    }
}
