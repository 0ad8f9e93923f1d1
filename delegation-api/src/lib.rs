//! Delegation Provider API
//!
//! This crate defines the contract between provider crates and the
//! `delegation` registry. Provider authors depend on this crate, implement a
//! capability trait and declare their implementation so the host can discover
//! it without compile-time knowledge of the concrete type.
//!
//! # Example
//!
//! ```ignore
//! use delegation_api::prelude::*;
//!
//! pub trait Greeter: Named + Send + Sync {
//!     fn greet(&self, who: &str) -> String;
//! }
//!
//! impl Capability for dyn Greeter {
//!     const NAME: &'static str = "Greeter";
//! }
//!
//! struct English;
//!
//! impl Named for English {
//!     fn name(&self) -> &str {
//!         "en"
//!     }
//! }
//!
//! impl Greeter for English {
//!     fn greet(&self, who: &str) -> String {
//!         format!("Hello, {who}!")
//!     }
//! }
//!
//! declare_provider! {
//!     capability: dyn Greeter,
//!     id: "greeter.en",
//!     construct: || Ok(Arc::new(English) as Arc<dyn Greeter>),
//! }
//! ```

#![allow(clippy::module_name_repetitions)]

pub mod capability;
pub mod types;

pub use capability::{Capability, Named};
pub use types::*;

#[doc(hidden)]
pub use inventory;

inventory::collect!(Implementation);

/// Prelude module for convenient imports.
pub mod prelude {
	pub use crate::capability::{Capability, Named};
	pub use crate::declare_provider;
	pub use crate::types::{BoxError, ErasedInstance, Implementation, ImplementationId};

	pub use std::sync::Arc;
}

/// Iterate over every implementation declared with [`declare_provider!`] in
/// the linked binary.
///
/// The order follows link order and is not stable across builds.
pub fn declared() -> impl Iterator<Item = &'static Implementation> {
	inventory::iter::<Implementation>.into_iter()
}

/// Helper macro for declaring a provider.
///
/// The declaration is collected at link time and becomes visible to the
/// host through [`declared`]. The constructor takes no arguments and returns
/// the instance behind an `Arc` of the capability type.
///
/// # Example
///
/// ```ignore
/// declare_provider! {
///     capability: dyn Greeter,
///     id: "greeter.fr",
///     construct: || Ok(Arc::new(French) as Arc<dyn Greeter>),
/// }
/// ```
#[macro_export]
macro_rules! declare_provider {
	(
        capability: $cap:ty,
        id: $id:expr,
        construct: $construct:expr $(,)?
    ) => {
		$crate::inventory::submit! {
			$crate::Implementation::erased::<$cap>($id, {
				fn construct(
				) -> ::std::result::Result<$crate::ErasedInstance, $crate::BoxError> {
					let construct_fn: fn() -> ::std::result::Result<
						::std::sync::Arc<$cap>,
						$crate::BoxError,
					> = $construct;
					construct_fn()
						.map(|instance| ::std::boxed::Box::new(instance) as $crate::ErasedInstance)
				}
				construct
			})
		}
	};
}
