use delegation_api::ImplementationId;
use std::fmt::{Debug, Formatter};
use std::sync::Arc;

pub(super) struct Provided<C: ?Sized> {
	pub(super) id: ImplementationId,
	pub(super) instance: Arc<C>,
}

/// The live providers of one capability, in declaration order.
///
/// Cloning is cheap and every clone refers to the same instances.
pub struct Providers<C: ?Sized> {
	entries: Arc<[Provided<C>]>,
}

impl<C: ?Sized> Providers<C> {
	pub(super) fn new(entries: Vec<Provided<C>>) -> Self {
		Self {
			entries: entries.into(),
		}
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	pub fn get(&self, index: usize) -> Option<&Arc<C>> {
		self.entries.get(index).map(|entry| &entry.instance)
	}

	pub fn iter(&self) -> Iter<'_, C> {
		Iter(self.entries.iter())
	}

	/// Implementation identifiers, aligned with [`Providers::iter`].
	pub fn ids(&self) -> impl ExactSizeIterator<Item = &ImplementationId> {
		self.entries.iter().map(|entry| &entry.id)
	}

	/// Identifier and instance pairs.
	pub fn entries(&self) -> impl ExactSizeIterator<Item = (&ImplementationId, &Arc<C>)> {
		self.entries.iter().map(|entry| (&entry.id, &entry.instance))
	}
}

impl<C: ?Sized> Clone for Providers<C> {
	fn clone(&self) -> Self {
		Self {
			entries: Arc::clone(&self.entries),
		}
	}
}

impl<C: ?Sized> Debug for Providers<C> {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		f.debug_list().entries(self.ids()).finish()
	}
}

impl<'a, C: ?Sized> IntoIterator for &'a Providers<C> {
	type Item = &'a Arc<C>;
	type IntoIter = Iter<'a, C>;

	fn into_iter(self) -> Self::IntoIter {
		self.iter()
	}
}

/// Iterator over the instances of [`Providers`].
pub struct Iter<'a, C: ?Sized>(std::slice::Iter<'a, Provided<C>>);

impl<'a, C: ?Sized> Iterator for Iter<'a, C> {
	type Item = &'a Arc<C>;

	fn next(&mut self) -> Option<Self::Item> {
		self.0.next().map(|entry| &entry.instance)
	}

	fn size_hint(&self) -> (usize, Option<usize>) {
		self.0.size_hint()
	}
}

impl<C: ?Sized> DoubleEndedIterator for Iter<'_, C> {
	fn next_back(&mut self) -> Option<Self::Item> {
		self.0.next_back().map(|entry| &entry.instance)
	}
}

impl<C: ?Sized> ExactSizeIterator for Iter<'_, C> {}
