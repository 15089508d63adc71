use std::path::Path;

use comfy_table::{ContentArrangement, Table};
use sl_build::normalize_path;

/// Print the include table, or the roots a change to `changed` would rebuild.
pub fn run(config: Option<&Path>, dir: &Path, changed: Option<&Path>) -> Result<(), String> {
    let compiled = super::compile_all(config, dir)?;
    let base = normalize_path(dir);
    let pipeline = &compiled.pipeline;

    if let Some(changed) = changed {
        let changed = normalize_path(changed);
        let roots = pipeline.roots_for_change(&changed);
        if roots.is_empty() {
            println!("  No roots depend on '{}'.", super::display_path(&changed, &base));
            return Ok(());
        }
        for root in &roots {
            println!("  {}", super::display_path(root, &base));
        }
        return Ok(());
    }

    let tracker = pipeline.tracker();
    if tracker.is_empty() {
        println!("  No includes found.");
        return Ok(());
    }

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Include", "Included by"]);

    for (included, roots) in tracker.dependents() {
        let roots = roots
            .iter()
            .map(|root| super::display_path(root, &base))
            .collect::<Vec<_>>()
            .join(", ");
        table.add_row(vec![super::display_path(included, &base), roots]);
    }

    println!("{table}");
    println!();
    println!("  {} includes across {} roots", tracker.edge_count(), tracker.roots().count());

    Ok(())
}
