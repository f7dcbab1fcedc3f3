//! Build metadata captured by vergen.

macro_rules! env_or_none {
    ($name:ident, $env:literal) => {
        pub const $name: &str = match option_env!($env) {
            Some(value) => value,
            None => "<none>",
        };
    };
}

pub const PACKAGE: &str = "podlink";
env_or_none!(VERSION, "VERGEN_BUILD_SEMVER");
env_or_none!(COMMIT_HASH, "VERGEN_GIT_SHA");
env_or_none!(BUILD_TIMESTAMP, "VERGEN_BUILD_TIMESTAMP");
env_or_none!(RUSTC_COMMIT_HASH, "VERGEN_RUSTC_COMMIT_HASH");

/// One-line description of this build for startup logs.
pub fn describe() -> String {
    format!("{PACKAGE} {VERSION} (commit {COMMIT_HASH}, built {BUILD_TIMESTAMP}, rustc {RUSTC_COMMIT_HASH})")
}
