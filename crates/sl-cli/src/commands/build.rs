use std::fs;
use std::path::Path;

use sl_build::normalize_path;

/// Compile every root below `dir`, optionally writing one JSON unit per root into `out`.
pub fn run(config: Option<&Path>, dir: &Path, out: Option<&Path>) -> Result<(), String> {
    let compiled = super::compile_all(config, dir)?;
    let base = normalize_path(dir);

    if let Some(out) = out {
        for module in &compiled.modules {
            let relative = module.root().strip_prefix(&base).unwrap_or(module.root());
            let target = out.join(relative).with_extension("json");
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent).map_err(|e| format!("cannot create '{}': {e}", parent.display()))?;
            }
            let source = module.to_source().map_err(|e| e.to_string())?;
            fs::write(&target, source).map_err(|e| format!("cannot write '{}': {e}", target.display()))?;
        }
    }

    for module in &compiled.modules {
        let knots = module.artifact().knots.len();
        println!(
            "  {:<32} {knots:>3} knot{}",
            super::display_path(module.root(), &base),
            if knots == 1 { "" } else { "s" },
        );
    }
    println!();
    println!("  Built {} of {} roots.", compiled.modules.len(), compiled.modules.len() + compiled.failed.len());

    if compiled.failed.is_empty() {
        Ok(())
    } else {
        Err("compilation failed with errors".into())
    }
}
