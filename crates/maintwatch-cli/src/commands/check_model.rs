//! `maintwatch check-model`: load an artifact and run the self-check.

use std::path::Path;

use maintwatch_core::model::{PROBE_VECTOR, load_artifact, self_check};
use maintwatch_core::{FEATURE_LAYOUT, LayoutInfo};

pub fn run(path: &Path) {
    let classifier = match load_artifact(path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("FAIL  {}", path.display());
            super::fail("self-check", e);
        }
    };
    let probe = self_check(classifier.as_ref()).unwrap_or_else(|e| super::fail("self-check", e));

    let layout = LayoutInfo::current();
    println!("OK    {}", path.display());
    println!("  artifact:  {}", classifier.name());
    println!("  features:  {}", layout.feature_names.join(", "));
    println!("  probe:");
    for (name, value) in FEATURE_LAYOUT.iter().zip(PROBE_VECTOR) {
        println!("    {name:<16} {value}");
    }
    println!(
        "  decision:  maintenance_needed={}  score={}",
        probe.label,
        super::format_confidence(probe.score)
    );
}
