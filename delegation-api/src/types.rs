//! Registration types shared by providers and the host.

use serde::{Deserialize, Serialize};
use std::any::{Any, TypeId};
use std::borrow::Cow;
use std::fmt::{Debug, Display, Formatter};
use std::sync::Arc;

use crate::capability::Capability;

/// Error type returned by provider constructors.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// A constructed provider with its capability type erased.
///
/// It always holds an `Arc<C>` where `C` is the capability the
/// [`Implementation`] was declared for.
pub type ErasedInstance = Box<dyn Any + Send + Sync>;

type StaticConstructor = fn() -> Result<ErasedInstance, BoxError>;
type DynamicConstructor = Arc<dyn Fn() -> Result<ErasedInstance, BoxError> + Send + Sync>;

/// Identifier of one concrete implementation, e.g. `greeter.en`.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImplementationId(Cow<'static, str>);

impl ImplementationId {
	pub const fn from_static(id: &'static str) -> Self {
		Self(Cow::Borrowed(id))
	}

	pub fn as_str(&self) -> &str {
		&self.0
	}
}

impl Display for ImplementationId {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		f.write_str(&self.0)
	}
}

impl Debug for ImplementationId {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		Debug::fmt(&*self.0, f)
	}
}

impl From<&'static str> for ImplementationId {
	fn from(id: &'static str) -> Self {
		Self::from_static(id)
	}
}

impl From<String> for ImplementationId {
	fn from(id: String) -> Self {
		Self(Cow::Owned(id))
	}
}

#[derive(Clone)]
enum Constructor {
	Static(StaticConstructor),
	Dynamic(DynamicConstructor),
}

/// A declared implementation: which capability it provides and how to build
/// it with no arguments.
#[derive(Clone)]
pub struct Implementation {
	id: ImplementationId,
	capability: &'static str,
	capability_type: fn() -> TypeId,
	construct: Constructor,
}

impl Implementation {
	/// Declare an implementation of `C` built by `construct`.
	///
	/// This is the form used by registrations assembled at runtime, for
	/// example by a module initialization routine or a test.
	pub fn new<C, F>(id: impl Into<ImplementationId>, construct: F) -> Self
	where
		C: Capability + ?Sized,
		F: Fn() -> Result<Arc<C>, BoxError> + Send + Sync + 'static,
	{
		Self {
			id: id.into(),
			capability: C::NAME,
			capability_type: TypeId::of::<C>,
			construct: Constructor::Dynamic(Arc::new(move || {
				construct().map(|instance| Box::new(instance) as ErasedInstance)
			})),
		}
	}

	/// Declare an implementation from an already type-erased constructor.
	///
	/// `construct` must box an `Arc<C>`. [`declare_provider!`](crate::declare_provider)
	/// generates such a constructor; prefer it over calling this directly.
	pub const fn erased<C>(id: &'static str, construct: StaticConstructor) -> Self
	where
		C: Capability + ?Sized,
	{
		Self {
			id: ImplementationId::from_static(id),
			capability: C::NAME,
			capability_type: TypeId::of::<C>,
			construct: Constructor::Static(construct),
		}
	}

	pub const fn id(&self) -> &ImplementationId {
		&self.id
	}

	/// Name of the capability this implementation was declared for.
	pub const fn capability(&self) -> &'static str {
		self.capability
	}

	/// Whether this implementation was declared for capability type `C`.
	pub fn provides<C: ?Sized + 'static>(&self) -> bool {
		(self.capability_type)() == TypeId::of::<C>()
	}

	/// Run the constructor.
	///
	/// # Errors
	/// Returns whatever error the provider's constructor reports.
	pub fn instantiate(&self) -> Result<ErasedInstance, BoxError> {
		match &self.construct {
			Constructor::Static(construct) => construct(),
			Constructor::Dynamic(construct) => construct(),
		}
	}
}

impl Debug for Implementation {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Implementation")
			.field("id", &self.id)
			.field("capability", &self.capability)
			.finish_non_exhaustive()
	}
}
