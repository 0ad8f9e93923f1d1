use super::RegistrationSource;
use crate::error::SourceError;
use crate::Catalog;
use delegation_api::{Capability, ImplementationId};

/// A compiled-in declaration table, built by an initialization routine.
///
/// ```ignore
/// let source = StaticSource::new()
///     .declare::<dyn Greeter>("greeter.en")
///     .declare::<dyn Greeter>("greeter.fr");
/// ```
#[derive(Debug, Clone, Default)]
pub struct StaticSource {
	records: Vec<(String, ImplementationId)>,
}

impl StaticSource {
	pub fn new() -> Self {
		Self::default()
	}

	/// Declare `id` as an implementation of capability `C`.
	#[must_use]
	pub fn declare<C: Capability + ?Sized>(self, id: impl Into<ImplementationId>) -> Self {
		self.declare_for(C::NAME, id)
	}

	/// Declare `id` under a capability name.
	#[must_use]
	pub fn declare_for(mut self, capability: impl Into<String>, id: impl Into<ImplementationId>) -> Self {
		self.records.push((capability.into(), id.into()));
		self
	}

	/// Declare every implementation of `catalog` under the capability it was
	/// registered for, in registration order.
	pub fn from_catalog(catalog: &Catalog) -> Self {
		catalog.iter().fold(Self::new(), |source, implementation| {
			source.declare_for(implementation.capability(), implementation.id().clone())
		})
	}
}

impl RegistrationSource for StaticSource {
	fn declarations_for(&self, capability: &str) -> Result<Vec<ImplementationId>, SourceError> {
		Ok(self
			.records
			.iter()
			.filter(|(declared, _)| declared == capability)
			.map(|(_, id)| id.clone())
			.collect())
	}
}
