//! Name index for capabilities whose providers are [`Named`].

use super::panic_message;
use super::providers::Providers;
use crate::error::{InvalidName, LookupError};
use delegation_api::{Capability, ImplementationId, Named};
use serde::Deserialize;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{debug, warn};

/// Which provider keeps a name that several providers declare.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DuplicateNames {
	/// The provider declared last wins.
	#[default]
	LastWins,
	/// The provider declared first wins.
	FirstWins,
}

pub(super) struct NameIndex<C: ?Sized> {
	by_name: Arc<HashMap<String, Arc<C>>>,
}

impl<C: ?Sized> Clone for NameIndex<C> {
	fn clone(&self) -> Self {
		Self {
			by_name: Arc::clone(&self.by_name),
		}
	}
}

impl<C: Capability + Named + ?Sized> NameIndex<C> {
	pub(super) fn build(providers: &Providers<C>, policy: DuplicateNames) -> Result<Self, LookupError> {
		let mut by_name: HashMap<String, (&ImplementationId, &Arc<C>)> =
			HashMap::with_capacity(providers.len());

		for (id, instance) in providers.entries() {
			let name = stable_name(&**instance).map_err(|reason| LookupError::InvalidProviderName {
				capability: C::NAME,
				implementation: id.clone(),
				reason,
			})?;

			match by_name.entry(name) {
				Entry::Occupied(mut entry) => {
					let (kept, dropped) = match policy {
						DuplicateNames::LastWins => (id, entry.get().0),
						DuplicateNames::FirstWins => (entry.get().0, id),
					};
					warn!(
						capability = C::NAME,
						provider.name = %entry.key(),
						kept = %kept,
						dropped = %dropped,
						"Several providers share a name"
					);
					if policy == DuplicateNames::LastWins {
						entry.insert((id, instance));
					}
				}
				Entry::Vacant(entry) => {
					entry.insert((id, instance));
				}
			}
		}

		debug!(capability = C::NAME, names = by_name.len(), "Built name index");
		Ok(Self {
			by_name: Arc::new(
				by_name
					.into_iter()
					.map(|(name, (_, instance))| (name, Arc::clone(instance)))
					.collect(),
			),
		})
	}

	pub(super) fn get(&self, name: &str) -> Option<&Arc<C>> {
		self.by_name.get(name)
	}

	pub(super) fn names(&self) -> Vec<String> {
		let mut names: Vec<_> = self.by_name.keys().cloned().collect();
		names.sort_unstable();
		names
	}
}

/// Read the provider's name twice and reject empty, changing or panicking
/// names.
fn stable_name<C: Named + ?Sized>(instance: &C) -> Result<String, InvalidName> {
	let read = || {
		panic::catch_unwind(AssertUnwindSafe(|| instance.name().to_owned()))
			.map_err(|payload| InvalidName::Panicked(panic_message(&*payload)))
	};

	let first = read()?;
	if first.trim().is_empty() {
		return Err(InvalidName::Empty);
	}
	let second = read()?;
	if second != first {
		return Err(InvalidName::Unstable { first, second });
	}
	Ok(first)
}
