//! Provider registry: discovery, caching and named resolution.
//!
//! The registry consults its [`RegistrationSource`] the first time a
//! capability is requested, builds every declared implementation once and
//! keeps the result for as long as the registry lives. Each capability has its
//! own initialization cell, so building one capability never blocks lookups of
//! another.

mod named;
mod providers;

pub use named::DuplicateNames;
pub use providers::{Iter, Providers};

use crate::catalog::Catalog;
use crate::config::RegistryConfig;
use crate::error::{InstantiationFailure, LookupError};
use crate::source::{CompositeSource, DeclaredSource, ManifestSource, RegistrationSource};
use delegation_api::{Capability, ImplementationId, Named};
use named::NameIndex;
use providers::Provided;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, OnceLock, PoisonError, RwLock};
use tracing::{debug, error, info};

/// Cached outcome of discovering one capability.
struct Cell<C: ?Sized> {
	providers: OnceLock<Result<Providers<C>, LookupError>>,
	names: OnceLock<Result<NameIndex<C>, LookupError>>,
}

impl<C: ?Sized> Default for Cell<C> {
	fn default() -> Self {
		Self {
			providers: OnceLock::new(),
			names: OnceLock::new(),
		}
	}
}

/// Registry for discovering providers of capabilities.
///
/// Outcomes are final: once a capability's providers have been built, every
/// later call returns the same instances in the same order; once discovery of a
/// capability has failed, every later call returns the same error.
///
/// A provider constructor must not look up its own capability on the same
/// registry; the nested call would wait for its own initialization.
pub struct Registry {
	catalog: Catalog,
	source: Box<dyn RegistrationSource>,
	duplicates: DuplicateNames,
	cells: RwLock<HashMap<TypeId, Arc<dyn Any + Send + Sync>>>,
}

impl Registry {
	/// Create a registry that resolves the declarations of `source` against
	/// `catalog`.
	pub fn new(catalog: Catalog, source: impl RegistrationSource + 'static) -> Self {
		Self {
			catalog,
			source: Box::new(source),
			duplicates: DuplicateNames::default(),
			cells: RwLock::new(HashMap::new()),
		}
	}

	/// A registry over every implementation declared with
	/// [`declare_provider!`](delegation_api::declare_provider).
	pub fn declared() -> Self {
		Self::new(Catalog::declared(), DeclaredSource)
	}

	/// Build a registry from configuration.
	///
	/// Declarations come from [`declare_provider!`](delegation_api::declare_provider)
	/// first, then from the configured manifests.
	pub fn from_config(config: &RegistryConfig, catalog: Catalog) -> Self {
		let source = CompositeSource::new()
			.with(DeclaredSource)
			.with(ManifestSource::new(config.manifests.iter().cloned()));

		Self::new(catalog, source).with_duplicate_names(config.names.duplicates)
	}

	#[must_use]
	pub fn with_duplicate_names(mut self, policy: DuplicateNames) -> Self {
		self.duplicates = policy;
		self
	}

	pub const fn catalog(&self) -> &Catalog {
		&self.catalog
	}

	/// All providers of capability `C`, in declaration order.
	///
	/// The first call builds every declared implementation; concurrent first
	/// callers wait for that single build and receive the same instances. An
	/// undeclared capability yields an empty sequence.
	///
	/// # Errors
	/// Returns [`LookupError::SourceUnavailable`] if the declarations cannot be
	/// read and [`LookupError::ProviderInstantiation`] if any declared
	/// implementation cannot be built. Neither leaves a partial result behind.
	pub fn get_all<C: Capability + ?Sized>(&self) -> Result<Providers<C>, LookupError> {
		let cell = self.cell::<C>();
		if let Some(outcome) = cell.providers.get() {
			debug!(capability = C::NAME, "Using cached providers");
			return outcome.clone();
		}
		cell.providers.get_or_init(|| self.discover::<C>()).clone()
	}

	/// The provider of capability `C` named `name`.
	///
	/// # Errors
	/// Returns [`LookupError::NameNotFound`] if no provider has that name,
	/// [`LookupError::InvalidProviderName`] if a provider's name is empty or
	/// unstable, or any error of [`Registry::get_all`].
	pub fn get<C: Capability + Named + ?Sized>(&self, name: &str) -> Result<Arc<C>, LookupError> {
		self.name_index::<C>()?
			.get(name)
			.cloned()
			.ok_or_else(|| LookupError::NameNotFound {
				capability: C::NAME,
				name: name.to_owned(),
			})
	}

	/// Sorted names of all providers of capability `C`.
	///
	/// # Errors
	/// Same as [`Registry::get`], except that it never reports a missing name.
	pub fn names<C: Capability + Named + ?Sized>(&self) -> Result<Vec<String>, LookupError> {
		Ok(self.name_index::<C>()?.names())
	}

	fn name_index<C: Capability + Named + ?Sized>(&self) -> Result<NameIndex<C>, LookupError> {
		let providers = self.get_all::<C>()?;
		self.cell::<C>()
			.names
			.get_or_init(|| NameIndex::build(&providers, self.duplicates))
			.clone()
	}

	fn cell<C: Capability + ?Sized>(&self) -> Arc<Cell<C>> {
		let key = TypeId::of::<C>();
		let existing = self
			.cells
			.read()
			.unwrap_or_else(PoisonError::into_inner)
			.get(&key)
			.cloned();

		let cell = existing.unwrap_or_else(|| {
			Arc::clone(
				self.cells
					.write()
					.unwrap_or_else(PoisonError::into_inner)
					.entry(key)
					.or_insert_with(|| Arc::new(Cell::<C>::default()) as Arc<dyn Any + Send + Sync>),
			)
		});

		cell.downcast::<Cell<C>>()
			.unwrap_or_else(|_| unreachable!("cell for {} has a foreign type", C::NAME))
	}

	fn discover<C: Capability + ?Sized>(&self) -> Result<Providers<C>, LookupError> {
		let ids = self.source.declarations_for(C::NAME).map_err(|source| {
			let error = LookupError::SourceUnavailable {
				capability: C::NAME,
				source: Arc::new(source),
			};
			error!(capability = C::NAME, "{error}");
			error
		})?;

		let mut entries = Vec::with_capacity(ids.len());
		for id in ids {
			let instance = self.instantiate::<C>(&id).map_err(|reason| {
				let error = LookupError::ProviderInstantiation {
					capability: C::NAME,
					implementation: id.clone(),
					reason,
				};
				error!(capability = C::NAME, implementation = %id, "{error}");
				error
			})?;
			debug!(capability = C::NAME, implementation = %id, "Instantiated provider");
			entries.push(Provided { id, instance });
		}

		info!(
			capability = C::NAME,
			providers = entries.len(),
			"Discovered providers"
		);
		Ok(Providers::new(entries))
	}

	fn instantiate<C: Capability + ?Sized>(
		&self,
		id: &ImplementationId,
	) -> Result<Arc<C>, InstantiationFailure> {
		let implementation = self.catalog.get(id).ok_or(InstantiationFailure::Missing)?;
		let incompatible = || InstantiationFailure::IncompatibleContract {
			provided: implementation.capability(),
		};

		if !implementation.provides::<C>() {
			return Err(incompatible());
		}

		let instance = panic::catch_unwind(AssertUnwindSafe(|| implementation.instantiate()))
			.map_err(|payload| InstantiationFailure::Panicked(panic_message(&*payload)))?
			.map_err(|source| InstantiationFailure::Constructor(Arc::from(source)))?;

		instance
			.downcast::<Arc<C>>()
			.map(|instance| *instance)
			.map_err(|_| incompatible())
	}
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
	payload
		.downcast_ref::<&str>()
		.map(|message| (*message).to_owned())
		.or_else(|| payload.downcast_ref::<String>().cloned())
		.unwrap_or_else(|| String::from("non-string panic payload"))
}


#[cfg(test)]
mod tests {
	use super::*;
	use crate::error::{InvalidName, SourceError};
	use crate::source::StaticSource;
	use delegation_api::{declare_provider, Implementation};
	use std::sync::atomic::{AtomicUsize, Ordering};
	use std::sync::Barrier;
	use std::thread;
	use std::time::Duration;

	trait Greeter: Named + Send + Sync {
		fn greet(&self, who: &str) -> String;
	}

	impl Capability for dyn Greeter {
		const NAME: &'static str = "Greeter";
	}

	struct Greeting {
		name: &'static str,
		phrase: &'static str,
	}

	impl Named for Greeting {
		fn name(&self) -> &str {
			self.name
		}
	}

	impl Greeter for Greeting {
		fn greet(&self, who: &str) -> String {
			format!("{}, {who}!", self.phrase)
		}
	}

	/// A greeter whose name alternates between two values.
	struct Fickle(AtomicUsize);

	impl Named for Fickle {
		fn name(&self) -> &str {
			if self.0.fetch_add(1, Ordering::SeqCst) % 2 == 0 {
				"left"
			} else {
				"right"
			}
		}
	}

	impl Greeter for Fickle {
		fn greet(&self, who: &str) -> String {
			format!("Hm, {who}.")
		}
	}

	struct Mute(Arc<AtomicUsize>);

	impl Named for Mute {
		fn name(&self) -> &str {
			self.0.fetch_add(1, Ordering::SeqCst);
			panic!("name table unavailable")
		}
	}

	impl Greeter for Mute {
		fn greet(&self, _who: &str) -> String {
			String::new()
		}
	}

	trait Counter: Send + Sync {
		fn count(&self) -> usize;
	}

	impl Capability for dyn Counter {
		const NAME: &'static str = "Counter";
	}

	struct Zero;

	impl Counter for Zero {
		fn count(&self) -> usize {
			0
		}
	}

	fn greeter(id: &'static str, name: &'static str, phrase: &'static str) -> Implementation {
		Implementation::new::<dyn Greeter, _>(id, move || {
			Ok(Arc::new(Greeting { name, phrase }) as Arc<dyn Greeter>)
		})
	}

	fn counted(id: &'static str, name: &'static str, builds: &Arc<AtomicUsize>) -> Implementation {
		let builds = Arc::clone(builds);
		Implementation::new::<dyn Greeter, _>(id, move || {
			builds.fetch_add(1, Ordering::SeqCst);
			Ok(Arc::new(Greeting { name, phrase: "Hi" }) as Arc<dyn Greeter>)
		})
	}

	fn failing(id: &'static str, builds: &Arc<AtomicUsize>) -> Implementation {
		let builds = Arc::clone(builds);
		Implementation::new::<dyn Greeter, _>(id, move || {
			builds.fetch_add(1, Ordering::SeqCst);
			Err("greeting table is corrupt".into())
		})
	}

	/// A registry declaring every implementation, in order, under its own capability.
	fn registry(implementations: impl IntoIterator<Item = Implementation>) -> Registry {
		let catalog: Catalog = implementations.into_iter().collect();
		let source = StaticSource::from_catalog(&catalog);
		Registry::new(catalog, source)
	}

	fn english_and_french() -> Registry {
		registry([
			greeter("greeter.en", "en", "Hello"),
			greeter("greeter.fr", "fr", "Bonjour"),
		])
	}

	#[test]
	fn get_all_returns_every_declared_provider_in_order() {
		let registry = english_and_french();

		let providers = registry.get_all::<dyn Greeter>().unwrap();
		assert_eq!(providers.len(), 2);
		let greetings: Vec<_> = providers.iter().map(|greeter| greeter.greet("Ada")).collect();
		assert_eq!(greetings, ["Hello, Ada!", "Bonjour, Ada!"]);
		let ids: Vec<_> = providers.ids().map(ImplementationId::as_str).collect();
		assert_eq!(ids, ["greeter.en", "greeter.fr"]);
	}

	#[test]
	fn providers_are_built_once_and_shared() {
		let builds = Arc::new(AtomicUsize::new(0));
		let registry = registry([
			counted("greeter.a", "a", &builds),
			counted("greeter.b", "b", &builds),
		]);

		let first = registry.get_all::<dyn Greeter>().unwrap();
		let second = registry.get_all::<dyn Greeter>().unwrap();

		assert_eq!(builds.load(Ordering::SeqCst), 2);
		assert_eq!(first.len(), second.len());
		assert!(first.iter().zip(&second).all(|(a, b)| Arc::ptr_eq(a, b)));
	}

	#[test]
	fn undeclared_capability_yields_no_providers() {
		let registry = english_and_french();

		let counters = registry.get_all::<dyn Counter>().unwrap();
		assert!(counters.is_empty());
		assert!(counters.get(0).is_none());
	}

	#[test]
	fn named_lookup_resolves_exactly_one_provider() {
		let registry = english_and_french();

		let english = registry.get::<dyn Greeter>("en").unwrap();
		assert_eq!(english.name(), "en");
		assert_eq!(english.greet("Bob"), "Hello, Bob!");

		let all = registry.get_all::<dyn Greeter>().unwrap();
		assert!(Arc::ptr_eq(&english, all.get(0).unwrap()));

		let error = registry.get::<dyn Greeter>("de").err().unwrap();
		assert!(
			matches!(&error, LookupError::NameNotFound { capability: "Greeter", name } if name == "de"),
			"{error}"
		);
		assert_eq!(error.to_string(), "No provider of capability Greeter is named \"de\"");
	}

	#[test]
	fn every_discovered_name_resolves_to_a_provider_with_that_name() {
		let registry = english_and_french();

		for provider in &registry.get_all::<dyn Greeter>().unwrap() {
			let resolved = registry.get::<dyn Greeter>(provider.name()).unwrap();
			assert_eq!(resolved.name(), provider.name());
		}
	}

	#[test]
	fn missing_names_do_not_disturb_the_cache() {
		let registry = english_and_french();

		assert!(registry.get::<dyn Greeter>("xx").is_err());
		assert!(registry.get::<dyn Greeter>("fr").is_ok());
		assert_eq!(registry.names::<dyn Greeter>().unwrap(), ["en", "fr"]);
	}

	#[test]
	fn failing_constructor_aborts_discovery_for_good() {
		let builds = Arc::new(AtomicUsize::new(0));
		let registry = registry([
			counted("greeter.ok", "ok", &builds),
			failing("greeter.broken", &builds),
		]);

		let first = registry.get_all::<dyn Greeter>().unwrap_err();
		match &first {
			LookupError::ProviderInstantiation {
				capability,
				implementation,
				reason: InstantiationFailure::Constructor(_),
			} => {
				assert_eq!(*capability, "Greeter");
				assert_eq!(implementation.as_str(), "greeter.broken");
			}
			other => panic!("unexpected error: {other}"),
		}
		assert_eq!(
			first.to_string(),
			"Failed to instantiate provider greeter.broken of capability Greeter: constructor \
			 failed: greeting table is corrupt"
		);

		let second = registry.get_all::<dyn Greeter>().unwrap_err();
		assert_eq!(second.to_string(), first.to_string());
		assert!(registry.get::<dyn Greeter>("ok").is_err());
		assert_eq!(builds.load(Ordering::SeqCst), 2);
	}

	#[test]
	fn panicking_constructor_is_reported() {
		let registry = registry([Implementation::new::<dyn Greeter, _>("greeter.panic", || {
			panic!("greeter exploded")
		})]);

		let error = registry.get_all::<dyn Greeter>().unwrap_err();
		assert!(
			matches!(
				&error,
				LookupError::ProviderInstantiation { reason: InstantiationFailure::Panicked(message), .. }
					if message == "greeter exploded"
			),
			"{error}"
		);
	}

	#[test]
	fn undeclared_implementation_is_reported() {
		let catalog = Catalog::new().with(greeter("greeter.en", "en", "Hello"));
		let source = StaticSource::new()
			.declare::<dyn Greeter>("greeter.en")
			.declare::<dyn Greeter>("greeter.ghost");
		let registry = Registry::new(catalog, source);

		let error = registry.get_all::<dyn Greeter>().unwrap_err();
		assert!(
			matches!(
				&error,
				LookupError::ProviderInstantiation { implementation, reason: InstantiationFailure::Missing, .. }
					if implementation.as_str() == "greeter.ghost"
			),
			"{error}"
		);
	}

	#[test]
	fn implementation_of_another_capability_is_incompatible() {
		let catalog = Catalog::new()
			.with(Implementation::new::<dyn Counter, _>("counter.zero", || Ok(Arc::new(Zero) as Arc<dyn Counter>)));
		let source = StaticSource::new().declare::<dyn Greeter>("counter.zero");
		let registry = Registry::new(catalog, source);

		let error = registry.get_all::<dyn Greeter>().unwrap_err();
		assert!(
			matches!(
				&error,
				LookupError::ProviderInstantiation {
					reason: InstantiationFailure::IncompatibleContract { provided: "Counter" },
					..
				}
			),
			"{error}"
		);
	}

	#[test]
	fn unreadable_source_aborts_discovery() {
		struct Offline;

		impl RegistrationSource for Offline {
			fn declarations_for(&self, _capability: &str) -> Result<Vec<ImplementationId>, SourceError> {
				Err(SourceError::Other("declaration store offline".into()))
			}
		}

		let registry = Registry::new(Catalog::new(), Offline);

		let error = registry.get_all::<dyn Greeter>().unwrap_err();
		assert!(matches!(error, LookupError::SourceUnavailable { capability: "Greeter", .. }));
		assert_eq!(error.capability(), "Greeter");
		assert_eq!(
			error.to_string(),
			"Registration source unavailable for capability Greeter: declaration store offline"
		);
	}

	#[test]
	fn duplicate_names_resolve_deterministically() {
		let registry = registry([
			greeter("greeter.en", "en", "Hello"),
			greeter("greeter.en-gb", "en", "Good day"),
		]);

		let first = registry.get::<dyn Greeter>("en").unwrap();
		assert_eq!(first.greet("Ann"), "Good day, Ann!");
		for _ in 0..3 {
			assert!(Arc::ptr_eq(&first, &registry.get::<dyn Greeter>("en").unwrap()));
		}
		assert_eq!(registry.names::<dyn Greeter>().unwrap(), ["en"]);
	}

	#[test]
	fn first_wins_policy_keeps_the_earliest_provider() {
		let registry = registry([
			greeter("greeter.en", "en", "Hello"),
			greeter("greeter.en-gb", "en", "Good day"),
		])
		.with_duplicate_names(DuplicateNames::FirstWins);

		assert_eq!(registry.get::<dyn Greeter>("en").unwrap().greet("Ann"), "Hello, Ann!");
	}

	#[test]
	fn repeated_declarations_are_all_honored() {
		let builds = Arc::new(AtomicUsize::new(0));
		let catalog = Catalog::new().with(counted("greeter.twice", "twice", &builds));
		let source = StaticSource::new()
			.declare::<dyn Greeter>("greeter.twice")
			.declare::<dyn Greeter>("greeter.twice");
		let registry = Registry::new(catalog, source);

		let providers = registry.get_all::<dyn Greeter>().unwrap();
		assert_eq!(providers.len(), 2);
		assert!(!Arc::ptr_eq(providers.get(0).unwrap(), providers.get(1).unwrap()));
		assert_eq!(builds.load(Ordering::SeqCst), 2);
		assert!(registry.get::<dyn Greeter>("twice").is_ok());
	}

	#[test]
	fn empty_names_are_rejected_when_indexing() {
		let registry = registry([
			greeter("greeter.en", "en", "Hello"),
			greeter("greeter.anonymous", "", "..."),
		]);

		assert_eq!(registry.get_all::<dyn Greeter>().unwrap().len(), 2);

		let error = registry.get::<dyn Greeter>("en").err().unwrap();
		assert!(
			matches!(
				&error,
				LookupError::InvalidProviderName { implementation, reason: InvalidName::Empty, .. }
					if implementation.as_str() == "greeter.anonymous"
			),
			"{error}"
		);
		assert_eq!(
			registry.names::<dyn Greeter>().unwrap_err().to_string(),
			error.to_string()
		);
	}

	#[test]
	fn unstable_names_are_rejected_when_indexing() {
		let registry = registry([Implementation::new::<dyn Greeter, _>("greeter.fickle", || {
			Ok(Arc::new(Fickle(AtomicUsize::new(0))) as Arc<dyn Greeter>)
		})]);

		let error = registry.get::<dyn Greeter>("left").err().unwrap();
		assert!(
			matches!(
				&error,
				LookupError::InvalidProviderName { reason: InvalidName::Unstable { .. }, .. }
			),
			"{error}"
		);
	}

	#[test]
	fn panicking_names_are_rejected_once() {
		let calls = Arc::new(AtomicUsize::new(0));
		let registry = registry([Implementation::new::<dyn Greeter, _>("greeter.mute", {
			let calls = Arc::clone(&calls);
			move || Ok(Arc::new(Mute(Arc::clone(&calls))) as Arc<dyn Greeter>)
		})]);

		let first = registry.get::<dyn Greeter>("en").err().unwrap();
		let second = registry.get::<dyn Greeter>("fr").err().unwrap();

		assert!(
			matches!(
				&first,
				LookupError::InvalidProviderName { reason: InvalidName::Panicked(message), .. }
					if message == "name table unavailable"
			),
			"{first}"
		);
		assert_eq!(first.to_string(), second.to_string());
		assert_eq!(calls.load(Ordering::SeqCst), 1);
	}

	#[test]
	fn concurrent_first_callers_share_one_build() {
		const CALLERS: usize = 8;

		let builds = Arc::new(AtomicUsize::new(0));
		let slow_builds = Arc::clone(&builds);
		let registry = registry([Implementation::new::<dyn Greeter, _>("greeter.slow", move || {
			slow_builds.fetch_add(1, Ordering::SeqCst);
			thread::sleep(Duration::from_millis(25));
			Ok(Arc::new(Greeting { name: "slow", phrase: "Eventually" }) as Arc<dyn Greeter>)
		})]);
		let barrier = Barrier::new(CALLERS);

		let results: Vec<Providers<dyn Greeter>> = thread::scope(|scope| {
			let handles: Vec<_> = (0..CALLERS)
				.map(|_| {
					scope.spawn(|| {
						barrier.wait();
						registry.get_all::<dyn Greeter>().unwrap()
					})
				})
				.collect();
			handles.into_iter().map(|handle| handle.join().unwrap()).collect()
		});

		assert_eq!(builds.load(Ordering::SeqCst), 1);
		let reference = results[0].get(0).unwrap();
		for providers in &results {
			assert_eq!(providers.len(), 1);
			assert!(Arc::ptr_eq(reference, providers.get(0).unwrap()));
		}
	}

	#[test]
	fn constructors_may_look_up_other_capabilities() {
		static NESTED: OnceLock<Registry> = OnceLock::new();

		let registry = NESTED.get_or_init(|| {
			registry([
				Implementation::new::<dyn Counter, _>("counter.zero", || Ok(Arc::new(Zero) as Arc<dyn Counter>)),
				Implementation::new::<dyn Greeter, _>("greeter.counting", || {
					let counters = NESTED
						.get()
						.ok_or("registry not ready")?
						.get_all::<dyn Counter>()?;
					let phrase = if counters.iter().all(|counter| counter.count() == 0) {
						"Nothing to count"
					} else {
						"Counting"
					};
					Ok(Arc::new(Greeting { name: "counting", phrase }) as Arc<dyn Greeter>)
				}),
			])
		});

		let greeter = registry.get::<dyn Greeter>("counting").unwrap();
		assert_eq!(greeter.greet("Eve"), "Nothing to count, Eve!");
	}

	trait Clock: Named + Send + Sync {
		fn now(&self) -> u64;
	}

	impl Capability for dyn Clock {
		const NAME: &'static str = "Clock";
	}

	struct Frozen;

	impl Named for Frozen {
		fn name(&self) -> &str {
			"frozen"
		}
	}

	impl Clock for Frozen {
		fn now(&self) -> u64 {
			1_700_000_000
		}
	}

	declare_provider! {
		capability: dyn Clock,
		id: "clock.frozen",
		construct: || Ok(Arc::new(Frozen) as Arc<dyn Clock>),
	}

	#[test]
	fn statically_declared_providers_are_discovered() {
		let registry = Registry::declared();

		let clocks = registry.get_all::<dyn Clock>().unwrap();
		assert_eq!(clocks.len(), 1);
		assert_eq!(clocks.ids().next().unwrap().as_str(), "clock.frozen");
		assert_eq!(registry.get::<dyn Clock>("frozen").unwrap().now(), 1_700_000_000);
		assert!(registry.catalog().get(&ImplementationId::from("clock.frozen")).is_some());
	}
}
