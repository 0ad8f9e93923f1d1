//! Example providers demonstrating how to implement a delegation capability.
//!
//! The crate defines a `Greeter` capability with two statically declared
//! providers (`en` and `fr`) and a scripted provider whose greeting comes from
//! JSON configuration.

use delegation_api::{declare_provider, BoxError, Capability, Implementation, ImplementationId, Named};
use serde::Deserialize;
use std::sync::Arc;

/// Greets someone in a particular style.
pub trait Greeter: Named + Send + Sync {
	fn greet(&self, who: &str) -> String;
}

impl Capability for dyn Greeter {
	const NAME: &'static str = "Greeter";
}

// ============================================================================
// Statically declared greeters
// ============================================================================

struct English;

impl Named for English {
	fn name(&self) -> &str {
		"en"
	}
}

impl Greeter for English {
	fn greet(&self, who: &str) -> String {
		format!("Hello, {who}!")
	}
}

declare_provider! {
	capability: dyn Greeter,
	id: "greeter.en",
	construct: || Ok(Arc::new(English) as Arc<dyn Greeter>),
}

struct French;

impl Named for French {
	fn name(&self) -> &str {
		"fr"
	}
}

impl Greeter for French {
	fn greet(&self, who: &str) -> String {
		format!("Bonjour, {who} !")
	}
}

declare_provider! {
	capability: dyn Greeter,
	id: "greeter.fr",
	construct: || Ok(Arc::new(French) as Arc<dyn Greeter>),
}

// ============================================================================
// Scripted greeter
// ============================================================================

/// Configuration of a scripted greeter, loaded from JSON.
#[derive(Debug, Deserialize)]
struct ScriptedConfig {
	name: String,
	/// Greeting template; `{who}` is replaced by the person greeted.
	template: String,
}

struct Scripted(ScriptedConfig);

impl Named for Scripted {
	fn name(&self) -> &str {
		&self.0.name
	}
}

impl Greeter for Scripted {
	fn greet(&self, who: &str) -> String {
		self.0.template.replace("{who}", who)
	}
}

/// A greeter built from a JSON configuration such as
/// `{ "name": "pirate", "template": "Ahoy, {who}!" }`.
///
/// The configuration is parsed when the registry instantiates the provider,
/// so invalid JSON surfaces as an instantiation failure.
pub fn scripted(id: impl Into<ImplementationId>, config_json: impl Into<String>) -> Implementation {
	let config_json = config_json.into();
	Implementation::new::<dyn Greeter, _>(id, move || {
		let config: ScriptedConfig = serde_json::from_str(&config_json)?;
		if !config.template.contains("{who}") {
			return Err(BoxError::from(format!(
				"template of greeter {} never mentions {{who}}",
				config.name
			)));
		}
		Ok(Arc::new(Scripted(config)) as Arc<dyn Greeter>)
	})
}
