//! Create Falcon
//!
//! Scaffolds a new Falcon application by copying a template project. The
//! `create-falcon` binary wraps [`create_project`] with a prompt and styled
//! output; the library exposes the same operations for tooling and tests.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::path::Path;
//!
//! let scaffold = create_falcon::create_project(
//!     "my-falcon-app",
//!     Path::new("template"),
//!     Path::new("../falcon-core"),
//!     Path::new("my-falcon-app"),
//! )?;
//! println!("copied {} files", scaffold.files);
//! # Ok::<(), create_falcon::ScaffoldError>(())
//! ```

pub mod scaffold;

pub use scaffold::{
    create_project, locate_core, validate_project_name, Scaffold, ScaffoldError, ScaffoldResult,
    CORE_PACKAGE_NAME, DEFAULT_PROJECT_NAME,
};
