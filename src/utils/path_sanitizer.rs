// SPDX-License-Identifier: GPL-3.0-only
use anyhow::{Context, Result};
use std::path::Path;

/// Turn an application id into a directory name that is safe to create
/// inside the install directory.
///
/// Every character other than alphanumerics, `-`, `_` and `.` becomes `_`.
/// Names that would be hidden or refer to the current/parent directory are
/// rejected.
pub fn app_dir_name(id: &str) -> Result<String> {
    let sanitized: String = id
        .trim()
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '-' || c == '_' || c == '.' {
                c
            } else {
                '_'
            }
        })
        .collect();

    if sanitized.is_empty() {
        return Err(anyhow::anyhow!("Application id cannot be empty"));
    }

    if sanitized.len() > 255 {
        return Err(anyhow::anyhow!("Application id too long (max 255 characters)"));
    }

    if sanitized.starts_with('.') {
        return Err(anyhow::anyhow!("Application directory cannot start with '.': {}", sanitized));
    }

    Ok(sanitized)
}

/// Validate that an existing path is within a base directory
///
/// Canonicalizes both sides so symlinks and `..` cannot escape the base.
pub fn validate_path_within_base(path: &Path, base: &Path) -> Result<()> {
    let canonical_path = path.canonicalize()
        .context("Failed to canonicalize path")?;

    let canonical_base = base.canonicalize()
        .context("Failed to canonicalize base path")?;

    if canonical_path == canonical_base || !canonical_path.starts_with(&canonical_base) {
        return Err(anyhow::anyhow!(
            "Path {} is not inside base directory {}",
            canonical_path.display(),
            canonical_base.display()
        ));
    }

    Ok(())
}
