//! Workspace path normalization

/// Working directory inside the sandbox; relative tool paths resolve here.
pub const SANDBOX_ROOT: &str = "/workspace";

/// Mount point of the host output directory inside the sandbox.
pub const EXPORT_DIR: &str = "/output";

/// Normalize `path` to be relative to [`SANDBOX_ROOT`].
///
/// Models pass `scene.py`, `/workspace/scene.py` and `workspace/scene.py`
/// interchangeably; all three become `scene.py`. The root itself (`workspace`,
/// `/workspace`, `/workspace/`) and the empty string become `.`.
///
/// This is a textual heuristic: `my_workspace/a.py` loses its `workspace/`
/// too and becomes `my_a.py`. Each prefix form is removed once, so a path
/// with the root name repeated inside it is not stable under a second pass:
/// `a/workspace/workspace/workspace/c` gives `aworkspace/c`, then `ac`.
pub fn workspace_path(path: &str) -> String {
    let p = path.strip_prefix('/').unwrap_or(path);
    let p = p.replacen("/workspace/", "", 1);
    let p = p.replacen("workspace/", "", 1);

    if p.is_empty() || p == "workspace" {
        ".".to_string()
    } else {
        p
    }
}

/// Quote a string for use as a single bash word.
pub fn shell_quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', r"'\''"))
}
