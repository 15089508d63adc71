use std::path::Path;

/// Compile every root below `dir` and report whether all of them passed.
pub fn run(config: Option<&Path>, dir: &Path) -> Result<(), String> {
    let compiled = super::compile_all(config, dir)?;

    if !compiled.failed.is_empty() {
        return Err("compilation failed with errors".into());
    }

    let includes = compiled.pipeline.tracker().edge_count();
    println!("  All checks passed.");
    println!("  {} roots, {includes} includes", compiled.modules.len());

    Ok(())
}
