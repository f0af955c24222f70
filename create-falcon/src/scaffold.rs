//! Project scaffolding.
//!
//! A new project is a recursive copy of a template directory. The copied
//! `Cargo.toml` gets the project's name, and its `falcon-core` dependency is
//! rewritten to the absolute path of a local `falcon-core` crate so the new
//! project builds wherever it was created. Every other file is copied as is.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, trace};
use walkdir::WalkDir;

/// Name suggested by the interactive prompt.
pub const DEFAULT_PROJECT_NAME: &str = "my-falcon-app";

/// Package name used by the bundled template's manifest.
pub const TEMPLATE_PACKAGE_NAME: &str = "my-falcon-app";

/// Package name of the runtime crate new projects depend on.
pub const CORE_PACKAGE_NAME: &str = "falcon-core";

/// Why a project could not be created.
#[derive(Debug, Error)]
pub enum ScaffoldError {
    #[error("project name {0:?} may only include letters, numbers, underscores and hyphens")]
    InvalidName(String),

    #[error("directory {} already exists", .0.display())]
    TargetExists(PathBuf),

    #[error("template directory {} does not exist", .0.display())]
    TemplateMissing(PathBuf),

    #[error("no falcon-core crate found in {}", .0.display())]
    CoreMissing(PathBuf),

    #[error("failed to write {}: {source}", path.display())]
    Copy {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to read the template: {0}")]
    Walk(#[from] walkdir::Error),
}

pub type ScaffoldResult<T> = Result<T, ScaffoldError>;

/// What [`create_project`] wrote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scaffold {
    pub root: PathBuf,
    pub files: usize,
    pub directories: usize,
}

/// Check that `name` is non-empty and uses only ASCII letters, digits, `-`
/// and `_`.
pub fn validate_project_name(name: &str) -> ScaffoldResult<()> {
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');

    if valid {
        Ok(())
    } else {
        Err(ScaffoldError::InvalidName(name.to_string()))
    }
}

/// Resolve `core` to the absolute directory of the `falcon-core` crate.
///
/// The directory must hold a manifest declaring the `falcon-core` package.
pub fn locate_core(core: &Path) -> ScaffoldResult<PathBuf> {
    let missing = || ScaffoldError::CoreMissing(core.to_path_buf());
    let manifest = fs::read_to_string(core.join("Cargo.toml")).map_err(|_| missing())?;
    let package_line = format!("name = \"{CORE_PACKAGE_NAME}\"");
    if !manifest.lines().any(|line| line.trim() == package_line) {
        return Err(missing());
    }
    fs::canonicalize(core).map_err(|_| missing())
}

/// Copy `template` into a new directory at `target`, name the project
/// `name` and point its `falcon-core` dependency at the crate in `core`.
///
/// Nothing is written when the name is invalid, the template or the core
/// crate is missing, or `target` already exists.
pub fn create_project(
    name: &str,
    template: &Path,
    core: &Path,
    target: &Path,
) -> ScaffoldResult<Scaffold> {
    validate_project_name(name)?;
    if !template.is_dir() {
        return Err(ScaffoldError::TemplateMissing(template.to_path_buf()));
    }
    let core = locate_core(core)?;
    if target.exists() {
        return Err(ScaffoldError::TargetExists(target.to_path_buf()));
    }

    create_dir(target)?;
    let mut scaffold = Scaffold {
        root: target.to_path_buf(),
        files: 0,
        directories: 0,
    };

    for entry in WalkDir::new(template).min_depth(1).sort_by_file_name() {
        let entry = entry?;
        let Ok(relative) = entry.path().strip_prefix(template) else {
            continue;
        };
        let destination = target.join(relative);

        if entry.file_type().is_dir() {
            trace!(path = %destination.display(), "creating directory");
            create_dir(&destination)?;
            scaffold.directories += 1;
        } else {
            trace!(path = %destination.display(), "copying file");
            fs::copy(entry.path(), &destination).map_err(|source| ScaffoldError::Copy {
                path: destination.clone(),
                source,
            })?;
            scaffold.files += 1;
        }
    }

    configure_manifest(&target.join("Cargo.toml"), name, &core)?;

    debug!(
        root = %target.display(),
        core = %core.display(),
        files = scaffold.files,
        directories = scaffold.directories,
        "project created"
    );
    Ok(scaffold)
}

fn create_dir(path: &Path) -> ScaffoldResult<()> {
    fs::create_dir_all(path).map_err(|source| ScaffoldError::Copy {
        path: path.to_path_buf(),
        source,
    })
}

/// Rename the template's package and repoint its `falcon-core` dependency
/// in the copied manifest, if any.
fn configure_manifest(manifest: &Path, name: &str, core: &Path) -> ScaffoldResult<()> {
    if !manifest.is_file() {
        return Ok(());
    }

    let to_copy_error = |source| ScaffoldError::Copy {
        path: manifest.to_path_buf(),
        source,
    };
    let contents = fs::read_to_string(manifest).map_err(to_copy_error)?;
    let configured = rewrite_manifest(&contents, name, core);
    if configured != contents {
        fs::write(manifest, configured).map_err(to_copy_error)?;
    }
    Ok(())
}

fn rewrite_manifest(contents: &str, name: &str, core: &Path) -> String {
    let package_line = format!("name = \"{TEMPLATE_PACKAGE_NAME}\"");
    let dependency_line = format!(
        "{CORE_PACKAGE_NAME} = {{ path = {} }}",
        toml_string(&core.display().to_string())
    );

    let mut renamed = false;
    let mut lines: Vec<String> = contents
        .lines()
        .map(|line| {
            let trimmed = line.trim();
            if !renamed && trimmed == package_line {
                renamed = true;
                format!("name = \"{name}\"")
            } else if is_core_dependency(trimmed) {
                trace!(line = trimmed, "repointing the core dependency");
                dependency_line.clone()
            } else {
                line.to_string()
            }
        })
        .collect();

    if contents.ends_with('\n') {
        lines.push(String::new());
    }
    lines.join("\n")
}

fn is_core_dependency(line: &str) -> bool {
    line.strip_prefix(CORE_PACKAGE_NAME)
        .is_some_and(|rest| rest.trim_start().starts_with('='))
}

/// Quote `value` as a TOML basic string.
fn toml_string(value: &str) -> String {
    format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
}
