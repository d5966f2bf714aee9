use std::process::Command;

use anyhow::{Context, Result};

/// (package, features) pairs that must compile on their own.
const FEATURE_CHECKS: &[(&str, &[&str])] = &[
    ("momo-core", &[]),
    ("momo-core", &["test-utils"]),
    ("momo-infra", &[]),
    ("momo-infra", &["test-utils"]),
];

/// Check that the gated test helpers compile with and without their feature.
pub fn check_feature_matrix() -> Result<()> {
    println!("Checking {} feature combinations...", FEATURE_CHECKS.len());

    for (index, (package, features)) in FEATURE_CHECKS.iter().enumerate() {
        let joined = features.join(",");
        let label = if features.is_empty() {
            format!("{package} (default)")
        } else {
            format!("{package} [{joined}]")
        };

        println!("\n[{}/{}] cargo check -p {label}", index + 1, FEATURE_CHECKS.len());

        let mut command = Command::new("cargo");
        command.args(["check", "-p", *package]);
        if !features.is_empty() {
            command.args(["--features", joined.as_str()]);
        }

        let status =
            command.status().with_context(|| format!("Failed to run cargo check for {label}"))?;
        if !status.success() {
            anyhow::bail!("Feature combination {label} failed to compile");
        }

        println!("✅ {label} compiled successfully");
    }

    println!("\n✅ All {} feature combinations compile successfully!", FEATURE_CHECKS.len());
    Ok(())
}
