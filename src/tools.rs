//! Command line tools, each one a named provider of the `Tool` capability.

use anyhow::Context as _;
use delegation::config::RegistryConfig;
use delegation::source::Manifest;
use delegation::{declare_provider, Capability, Named, Registry};
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::PathBuf;
use std::sync::Arc;

/// Tool run when none is named on the command line.
pub const DEFAULT_TOOL: &str = "tools";

/// A tool that can be launched by name.
pub trait Tool: Named + Send + Sync {
	/// One-line summary shown by the `tools` tool.
	fn description(&self) -> &str;

	fn run(&self, context: &Context<'_>, args: &[String]) -> anyhow::Result<()>;
}

impl Capability for dyn Tool {
	const NAME: &'static str = "Tool";
}

pub struct Context<'a> {
	pub registry: &'a Registry,
	pub config: &'a RegistryConfig,
}

struct ListTools;

impl Named for ListTools {
	fn name(&self) -> &str {
		"tools"
	}
}

impl Tool for ListTools {
	fn description(&self) -> &str {
		"List the available tools"
	}

	fn run(&self, context: &Context<'_>, _args: &[String]) -> anyhow::Result<()> {
		print!("{}", render_tools(context.registry)?);
		Ok(())
	}
}

declare_provider! {
	capability: dyn Tool,
	id: "delegation.tools",
	construct: || Ok(Arc::new(ListTools) as Arc<dyn Tool>),
}

struct ShowManifests;

impl Named for ShowManifests {
	fn name(&self) -> &str {
		"manifests"
	}
}

impl Tool for ShowManifests {
	fn description(&self) -> &str {
		"Check the configured manifests and print their declarations (--json for JSON)"
	}

	fn run(&self, context: &Context<'_>, args: &[String]) -> anyhow::Result<()> {
		let json = args.iter().any(|arg| arg == "--json");
		print!("{}", render_manifests(&context.config.manifests, json)?);
		Ok(())
	}
}

declare_provider! {
	capability: dyn Tool,
	id: "delegation.manifests",
	construct: || Ok(Arc::new(ShowManifests) as Arc<dyn Tool>),
}

fn render_tools(registry: &Registry) -> anyhow::Result<String> {
	let mut out = String::new();
	for name in registry.names::<dyn Tool>()? {
		let tool = registry.get::<dyn Tool>(&name)?;
		writeln!(out, "{name:<12} {}", tool.description())?;
	}
	Ok(out)
}

fn render_manifests(paths: &[PathBuf], json: bool) -> anyhow::Result<String> {
	let mut manifests = Vec::with_capacity(paths.len());
	for path in paths {
		let manifest = Manifest::load(path)
			.with_context(|| format!("Failed to check manifest {}", path.display()))?;
		manifests.push((path.display().to_string(), manifest));
	}

	if json {
		let by_path: BTreeMap<_, _> = manifests.into_iter().collect();
		return Ok(serde_json::to_string_pretty(&by_path)? + "\n");
	}

	let mut out = String::new();
	for (path, manifest) in manifests {
		writeln!(out, "{path}")?;
		for provision in &manifest.provides {
			let ids: Vec<_> = provision
				.implementations
				.iter()
				.map(delegation::ImplementationId::as_str)
				.collect();
			writeln!(out, "  {}: {}", provision.capability, ids.join(", "))?;
		}
	}
	Ok(out)
}
