//! Capability trait definitions.
//!
//! A capability is the abstract contract a provider satisfies. It is usually
//! a trait object type such as `dyn Greeter`; the registry looks providers up
//! by that type and hands them out as `Arc<dyn Greeter>`.

/// Marks a type as discoverable through the registry.
///
/// Implement it for the trait object type of the capability:
///
/// ```ignore
/// impl Capability for dyn Greeter {
///     const NAME: &'static str = "Greeter";
/// }
/// ```
pub trait Capability: Send + Sync + 'static {
	/// Stable name under which implementations of this capability are
	/// declared, both by [`declare_provider!`](crate::declare_provider) and in
	/// manifest files.
	const NAME: &'static str;
}

/// A provider that can be selected based on its name.
///
/// Capabilities that want name-based resolution use `Named` as a supertrait.
/// For example, a suite of command line tools may expose every tool through a
/// `Tool: Named` capability so a user can launch one by name.
///
/// Several providers of the same capability should not share a name. The
/// registry tolerates it, but which one wins is a policy of the host.
pub trait Named {
	/// Returns the friendly name of this provider.
	///
	/// Must be non-empty and return the same value every time it is called.
	fn name(&self) -> &str;
}
