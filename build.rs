use vergen_gitcl::{Emitter, GitclBuilder};

fn main() -> anyhow::Result<()> {
    // Without git metadata (e.g. a source tarball), vergen emits placeholder values and a warning.
    let git = GitclBuilder::default()
        .branch(true)
        .sha(true)
        .dirty(false)
        .build()?;

    Emitter::default().add_instructions(&git)?.emit()?;

    Ok(())
}
