//! Compile-time build metadata, populated by `build.rs` via `vergen-gitcl`
//! when building inside a git checkout. Falls back to `"unknown"` fields
//! otherwise (source tarball builds, shallow clones).

use time::OffsetDateTime;

#[derive(Debug, Clone)]
pub struct BuildInfo {
    pub branch: Option<&'static str>,
    pub commit_sha1: Option<&'static str>,
    pub commit_timestamp: Option<OffsetDateTime>,
    pub describe: Option<&'static str>,
}

impl BuildInfo {
    pub fn from_build() -> Self {
        BuildInfo {
            branch: option_env!("VERGEN_GIT_BRANCH"),
            commit_sha1: option_env!("VERGEN_GIT_SHA"),
            commit_timestamp: option_env!("VERGEN_GIT_COMMIT_TIMESTAMP")
                .and_then(|s| OffsetDateTime::parse(s, &time::format_description::well_known::Rfc3339).ok()),
            describe: option_env!("VERGEN_GIT_DESCRIBE"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_build_never_panics_without_a_git_checkout() {
        let info = BuildInfo::from_build();
        // No assertion on presence — the point is only that this doesn't panic
        // when VERGEN_* variables are absent (e.g. in a tarball build).
        let _ = info.branch;
    }
}
