fn main() {
    if let Err(err) = emit_git_variables() {
        println!("cargo:warning=vergen: {}", err);
    }
}

fn emit_git_variables() -> anyhow::Result<()> {
    println!("cargo::rerun-if-env-changed=OAS_NO_VERGEN");

    let has_vergen =
        !matches!(std::env::var_os("OAS_NO_VERGEN"), Some(x) if x != "false" && x != "0");

    anyhow::ensure!(has_vergen, "disabled via `OAS_NO_VERGEN`");

    // Building outside of a git checkout (e.g. from a source tarball) must
    // not fail the build; `fail_on_error` only governs a configured git repo
    // producing inconsistent data, not its absence.
    let mut builder = vergen_gitcl::GitclBuilder::default();
    builder.branch(true);
    builder.commit_timestamp(true);
    builder.commit_message(true);
    builder.describe(true, true, None);
    builder.sha(false);

    let gitcl = builder.build()?;

    vergen_gitcl::Emitter::default().fail_on_error().add_instructions(&gitcl)?.emit()
}
