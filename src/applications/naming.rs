//! Name normalization: mapping controller names back to application names.
//!
//! Deployment names arrive in several overlapping conventions. Helm prefixes
//! the release namespace (`jx-staging-myapp`), Helm 3 charts often stutter
//! the name (`myapp-myapp`), and Jenkins X prefixes its own organisation
//! (`jx-myapp`). The steps run in a fixed order:
//!
//! 1. strip every context prefix `p-` (typically the namespace),
//! 2. collapse a stuttered `X-X` to `X`,
//! 3. strip the `jx-` organisation prefix.
//!
//! Because the stutter check runs before the organisation prefix is removed,
//! `jx-foo-foo` normalizes to `foo-foo`, not `foo`.

/// Organisation prefix Jenkins X puts on its own charts.
pub const ORG_PREFIX: &str = "jx-";

const MAX_NAME_LENGTH: usize = 63;

/// Canonical application name for a raw deployment or selector name.
pub fn normalize(raw: &str, context_prefixes: &[&str]) -> String {
    let mut name = raw;
    for prefix in context_prefixes {
        if let Some(rest) = name
            .strip_prefix(prefix)
            .and_then(|rest| rest.strip_prefix('-'))
        {
            name = rest;
        }
    }

    let name = collapse_stutter(name);
    name.strip_prefix(ORG_PREFIX).unwrap_or(name).to_string()
}

/// Name used for edit environments, where namespace and organisation
/// prefixes never apply.
pub fn normalize_edit_name(raw: &str) -> String {
    collapse_stutter(raw).to_string()
}

/// `X-X` becomes `X`; anything else is returned unchanged.
fn collapse_stutter(name: &str) -> &str {
    if name.is_empty() {
        return name;
    }
    let mid = name.len() / 2;
    if name.as_bytes()[mid] != b'-' {
        return name;
    }
    // `-` is ASCII so both slice points are char boundaries
    let (first, rest) = (&name[..mid], &name[mid + 1..]);
    if first == rest {
        first
    } else {
        name
    }
}

/// Turns a repository name into a valid Kubernetes object name.
///
/// Letters and digits are lowercased and kept, any run of other characters
/// becomes a single `-`, and the result never starts or ends with `-`.
pub fn to_valid_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut pending_dash = false;
    for ch in name.chars() {
        if ch.is_alphanumeric() {
            if pending_dash && !out.is_empty() {
                out.push('-');
            }
            pending_dash = false;
            out.extend(ch.to_lowercase());
        } else {
            pending_dash = true;
        }
    }

    if out.len() > MAX_NAME_LENGTH {
        let mut end = MAX_NAME_LENGTH;
        while !out.is_char_boundary(end) {
            end -= 1;
        }
        out.truncate(end);
        while out.ends_with('-') {
            out.pop();
        }
    }
    out
}

/// Owner and repository name parsed out of a git URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitRepoRef {
    pub owner: String,
    pub name: String,
}

/// Parses `https://host/owner/name(.git)` and `git@host:owner/name(.git)`.
///
/// Nested groups (`https://gitlab.com/group/sub/name`) report the last two
/// path segments.
pub fn parse_git_url(url: &str) -> Option<GitRepoRef> {
    let url = url.trim();
    let path = if let Some((_, rest)) = url.split_once("://") {
        rest.split_once('/')?.1
    } else if let Some((_, rest)) = url.split_once(':') {
        rest
    } else {
        return None;
    };

    let path = path.trim_end_matches('/');
    let path = path.strip_suffix(".git").unwrap_or(path);
    let mut segments = path.rsplit('/').filter(|s| !s.is_empty());
    let name = segments.next()?;
    let owner = segments.next()?;
    Some(GitRepoRef {
        owner: owner.to_string(),
        name: name.to_string(),
    })
}
