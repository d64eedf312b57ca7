//! Filesystem naming helpers for generated projects

use camino::{Utf8Path, Utf8PathBuf};

/// Fallback slug used when a project name has no usable characters
pub const EMPTY_SLUG: &str = "project";

/// Turn a project name into a filesystem-safe slug.
///
/// The name is lowercased; only alphanumerics, spaces, `-` and `_` are kept;
/// trailing spaces are trimmed; spaces and `-` become `_`.
pub fn slugify(name: &str) -> String {
    let kept: String = name
        .to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, ' ' | '-' | '_'))
        .collect();

    let slug = kept.trim_end().replace([' ', '-'], "_");

    if slug.trim_matches('_').is_empty() {
        EMPTY_SLUG.to_string()
    } else {
        slug
    }
}

/// Directory name for a generated project: `<id>_<slug>`
pub fn project_dir_name(project_id: &str, name: &str) -> String {
    format!("{}_{}", project_id, slugify(name))
}

/// Full destination directory for a generated project under `root`
pub fn project_destination(root: &Utf8Path, project_id: &str, name: &str) -> Utf8PathBuf {
    root.join(project_dir_name(project_id, name))
}
