//! Registration sources.
//!
//! A source answers one question: which implementations are declared for a
//! given capability? It never builds anything; the registry resolves the
//! returned identifiers against its [`Catalog`](crate::Catalog).

mod manifest;
mod table;

pub use manifest::{Manifest, ManifestSource, Provision};
pub use table::StaticSource;

use crate::error::SourceError;
use delegation_api::ImplementationId;
use std::sync::Arc;

/// Provider of declared implementation identifiers per capability.
pub trait RegistrationSource: Send + Sync {
	/// Identifiers declared for `capability`, in declaration order.
	///
	/// Must be safe to call repeatedly. An unknown capability yields an empty
	/// list, not an error.
	///
	/// # Errors
	/// Returns a [`SourceError`] if the declarations cannot be read at all.
	fn declarations_for(&self, capability: &str) -> Result<Vec<ImplementationId>, SourceError>;
}

impl<S: RegistrationSource + ?Sized> RegistrationSource for Box<S> {
	fn declarations_for(&self, capability: &str) -> Result<Vec<ImplementationId>, SourceError> {
		(**self).declarations_for(capability)
	}
}

impl<S: RegistrationSource + ?Sized> RegistrationSource for Arc<S> {
	fn declarations_for(&self, capability: &str) -> Result<Vec<ImplementationId>, SourceError> {
		(**self).declarations_for(capability)
	}
}

/// Declares every implementation submitted with
/// [`declare_provider!`](delegation_api::declare_provider), under the
/// capability it was submitted for.
#[derive(Debug, Clone, Copy, Default)]
pub struct DeclaredSource;

impl RegistrationSource for DeclaredSource {
	fn declarations_for(&self, capability: &str) -> Result<Vec<ImplementationId>, SourceError> {
		Ok(delegation_api::declared()
			.filter(|implementation| implementation.capability() == capability)
			.map(|implementation| implementation.id().clone())
			.collect())
	}
}

/// Concatenation of several sources, queried in order.
///
/// Identifiers declared by more than one source are all kept. The first
/// source that fails aborts the query.
#[derive(Default)]
pub struct CompositeSource {
	sources: Vec<Box<dyn RegistrationSource>>,
}

impl CompositeSource {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn push(&mut self, source: impl RegistrationSource + 'static) -> &mut Self {
		self.sources.push(Box::new(source));
		self
	}

	#[must_use]
	pub fn with(mut self, source: impl RegistrationSource + 'static) -> Self {
		self.push(source);
		self
	}

	pub fn len(&self) -> usize {
		self.sources.len()
	}

	pub fn is_empty(&self) -> bool {
		self.sources.is_empty()
	}
}

impl RegistrationSource for CompositeSource {
	fn declarations_for(&self, capability: &str) -> Result<Vec<ImplementationId>, SourceError> {
		let mut declarations = Vec::new();
		for source in &self.sources {
			declarations.extend(source.declarations_for(capability)?);
		}
		Ok(declarations)
	}
}
