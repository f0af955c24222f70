//! Reactive stores.
//!
//! A store groups related state. Each field gets its own signal, so a reader
//! of one field does not re-run when another field changes.
//!
//! [`store!`](crate::store!) declares three types from one field list:
//!
//! - the state struct, a plain snapshot of every field
//! - the store, holding one signal per field, with a tracked getter per field
//! - the patch, with an `Option` per field, applied by `set` and `update`
//!
//! Reads go through the generated getters. The signals are private to the
//! module that declares the store, so code elsewhere can only change state
//! through `set` or `update`. Naming a field the state does not have is a
//! compile error.
//!
//! # Example
//!
//! ```rust
//! use falcon_core::reactive::Runtime;
//! use falcon_core::store;
//!
//! store! {
//!     #[derive(Debug, Clone, PartialEq)]
//!     pub struct Cart {
//!         items: u32,
//!         coupon: Option<String>,
//!     }
//!     pub struct CartStore;
//!     pub struct CartPatch;
//! }
//!
//! let runtime = Runtime::new();
//! let cart = CartStore::new(&runtime, Cart { items: 0, coupon: None });
//!
//! cart.update(|state| CartPatch { items: Some(state.items + 2), ..Default::default() });
//! assert_eq!(cart.items(), 2);
//! ```

use tracing::debug;

#[doc(hidden)]
pub fn __trace_patch(store: &str, applied: &[&str]) {
    if applied.is_empty() {
        debug!(store, "empty store patch");
    } else {
        debug!(store, fields = ?applied, "store patch applied");
    }
}

/// Declare a state struct, its reactive store and its patch type.
///
/// Every field type must be `Clone + PartialEq`.
#[macro_export]
macro_rules! store {
    (
        $(#[$meta:meta])*
        $vis:vis struct $state:ident {
            $( $(#[$field_meta:meta])* $field:ident : $ty:ty ),* $(,)?
        }
        $store_vis:vis struct $store:ident;
        $patch_vis:vis struct $patch:ident;
    ) => {
        $(#[$meta])*
        $vis struct $state {
            $( $(#[$field_meta])* pub $field: $ty, )*
        }

        /// A partial update; `None` fields are left unchanged.
        #[derive(Clone, Default)]
        $patch_vis struct $patch {
            $( pub $field: ::core::option::Option<$ty>, )*
        }

        #[derive(Clone)]
        $store_vis struct $store {
            $( $field: $crate::reactive::Signal<$ty>, )*
        }

        #[allow(dead_code)]
        impl $store {
            /// Create a store with one signal per field.
            pub fn new(runtime: &$crate::reactive::Runtime, initial: $state) -> Self {
                Self {
                    $( $field: $crate::reactive::Signal::new(runtime, initial.$field), )*
                }
            }

            $(
                /// Read the field, tracking the read.
                pub fn $field(&self) -> $ty {
                    self.$field.get()
                }
            )*

            /// The current values, read without tracking.
            pub fn snapshot(&self) -> $state {
                $state {
                    $( $field: self.$field.get_untracked(), )*
                }
            }

            /// Write every field the patch sets. Unchanged values do not notify.
            pub fn set(&self, patch: $patch) {
                let mut applied: ::std::vec::Vec<&'static str> = ::std::vec::Vec::new();
                $(
                    if let ::core::option::Option::Some(value) = patch.$field {
                        self.$field.set(value);
                        applied.push(::core::stringify!($field));
                    }
                )*
                $crate::store::__trace_patch(::core::stringify!($store), &applied);
            }

            /// Compute a patch from a snapshot of the current values and apply it.
            pub fn update(&self, f: impl FnOnce(&$state) -> $patch) {
                let patch = f(&self.snapshot());
                self.set(patch);
            }
        }
    };
}
