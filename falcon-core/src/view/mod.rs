//! View Construction
//!
//! Turns tags, props and children into live DOM nodes wired to the reactive
//! graph. A binding that reads signals becomes an effect owned by whatever
//! scope was current while the view was built.

mod child;
mod element;
mod props;
mod render;

pub use child::Child;
pub use element::{create_element, element, Component, Tag};
pub use props::{AttrValue, Binding, Props, PRESENCE_ATTRIBUTES};
pub use render::render;

pub(crate) use child::{append_all, flatten};
