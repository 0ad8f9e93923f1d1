//! Constructor table for every implementation known to the process.

use delegation_api::{Implementation, ImplementationId};
use std::collections::HashMap;
use tracing::warn;

/// Implementations keyed by identifier, in registration order.
///
/// A [`RegistrationSource`](crate::source::RegistrationSource) only names
/// implementations; the catalog is where the registry finds out how to build
/// them.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
	implementations: Vec<Implementation>,
	index: HashMap<ImplementationId, usize>,
}

impl Catalog {
	/// Create a new empty catalog.
	pub fn new() -> Self {
		Self::default()
	}

	/// A catalog of every implementation declared with
	/// [`declare_provider!`](delegation_api::declare_provider) in this binary.
	pub fn declared() -> Self {
		delegation_api::declared().cloned().fold(Self::new(), Self::with)
	}

	/// Register an implementation, replacing any earlier one with the same
	/// identifier.
	pub fn register(&mut self, implementation: Implementation) -> &mut Self {
		let id = implementation.id().clone();
		if let Some(&position) = self.index.get(&id) {
			warn!(
				implementation = %id,
				capability = implementation.capability(),
				"Implementation registered twice, keeping the latest"
			);
			self.implementations[position] = implementation;
		} else {
			self.index.insert(id, self.implementations.len());
			self.implementations.push(implementation);
		}
		self
	}

	#[must_use]
	pub fn with(mut self, implementation: Implementation) -> Self {
		self.register(implementation);
		self
	}

	pub fn get(&self, id: &ImplementationId) -> Option<&Implementation> {
		self.index.get(id).map(|&position| &self.implementations[position])
	}

	pub fn iter(&self) -> impl Iterator<Item = &Implementation> {
		self.implementations.iter()
	}

	pub fn len(&self) -> usize {
		self.implementations.len()
	}

	pub fn is_empty(&self) -> bool {
		self.implementations.is_empty()
	}
}

impl Extend<Implementation> for Catalog {
	fn extend<T: IntoIterator<Item = Implementation>>(&mut self, iter: T) {
		for implementation in iter {
			self.register(implementation);
		}
	}
}

impl FromIterator<Implementation> for Catalog {
	fn from_iter<T: IntoIterator<Item = Implementation>>(iter: T) -> Self {
		let mut catalog = Self::new();
		catalog.extend(iter);
		catalog
	}
}
