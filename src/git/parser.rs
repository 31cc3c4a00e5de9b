use crate::error::{GitError, GitResult};
use crate::git::refs::{Branch, ObjectId};
use std::collections::BTreeMap;

/// Parse `git ls-remote` output: `<id>\t<refname>` per line
///
/// Peeled tag entries (`refs/tags/v1^{}`) are kept under their own name.
pub fn parse_ls_remote(output: &str) -> GitResult<BTreeMap<String, ObjectId>> {
    let mut refs = BTreeMap::new();

    for line in output.lines() {
        if line.trim().is_empty() {
            continue;
        }

        let (id, name) = line
            .split_once('\t')
            .ok_or_else(|| GitError::ParseError(format!("Unexpected ls-remote line: {}", line)))?;

        refs.insert(name.trim().to_string(), ObjectId::parse(id)?);
    }

    Ok(refs)
}

/// Parse `git rev-list` output: one id per line
pub fn parse_rev_list(output: &str) -> GitResult<Vec<ObjectId>> {
    output
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(ObjectId::parse)
        .collect()
}

/// Parse `git branch -a -v --no-abbrev` output
///
/// Format: `* main 5e8b... subject` or `  remotes/origin/x 1a2b... subject`;
/// branches checked out in a linked worktree carry `+` instead of `*`.
/// Symbolic entries (`remotes/origin/HEAD -> origin/main`) and detached
/// HEAD lines are skipped; the `remotes/` prefix is dropped.
pub fn parse_branch_list(output: &str) -> GitResult<Vec<Branch>> {
    let mut branches = Vec::new();

    for line in output.lines() {
        let line = line.trim_start_matches(['*', '+']).trim();
        if line.is_empty() || line.starts_with('(') {
            continue;
        }

        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() < 2 || parts[1] == "->" {
            continue;
        }

        let name = parts[0].strip_prefix("remotes/").unwrap_or(parts[0]);
        branches.push(Branch {
            name: name.to_string(),
            id: ObjectId::parse(parts[1])?,
        });
    }

    Ok(branches)
}

/// Parse `git show-ref` output: `<id> <refname>` per line
pub fn parse_show_ref(output: &str) -> GitResult<Vec<(String, ObjectId)>> {
    let mut refs = Vec::new();

    for line in output.lines() {
        if line.trim().is_empty() {
            continue;
        }

        let (id, name) = line
            .split_once(' ')
            .ok_or_else(|| GitError::ParseError(format!("Unexpected show-ref line: {}", line)))?;

        refs.push((name.trim().to_string(), ObjectId::parse(id)?));
    }

    Ok(refs)
}
