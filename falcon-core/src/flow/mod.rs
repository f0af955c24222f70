//! Control Flow
//!
//! Regions of the DOM whose structure follows reactive state:
//!
//! - [`create_for`]: a keyed list that moves existing nodes instead of
//!   rebuilding them
//! - [`create_show`]: a region that mounts one of two branches
//!
//! Both are anchored by comment markers and do their work in an effect, so
//! they only touch the DOM after the next checkpoint. Regions created while
//! another region re-renders are filled before the triggering write returns.

mod for_each;
mod show;

pub use for_each::{create_for, Keyed, EMPTY_ROW_MARKER, FOR_END_MARKER, FOR_START_MARKER};
pub use show::{create_show, SHOW_MARKER};
