//! Capability-based provider discovery.
//!
//! Providers implement a capability (usually a trait) and are declared either
//! statically with [`declare_provider!`], in a compiled-in [`StaticSource`]
//! table, or in manifest files read by a [`ManifestSource`]. A [`Registry`]
//! finds every declared provider of a capability, builds each one exactly once
//! and hands out the shared instances:
//!
//! ```ignore
//! let registry = Registry::declared();
//!
//! for greeter in &registry.get_all::<dyn Greeter>()? {
//!     println!("{}", greeter.greet("world"));
//! }
//!
//! let french = registry.get::<dyn Greeter>("fr")?;
//! ```
//!
//! [`StaticSource`]: source::StaticSource
//! [`ManifestSource`]: source::ManifestSource

pub mod config;
pub mod source;

mod catalog;
mod error;
mod registry;

pub use catalog::Catalog;
pub use error::{InstantiationFailure, InvalidName, LookupError, SourceError};
pub use registry::{DuplicateNames, Iter, Providers, Registry};

pub use delegation_api::{
	declare_provider, BoxError, Capability, Implementation, ImplementationId, Named,
};
