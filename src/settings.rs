//! Configuration (spec ambient stack): CLI flags merged over a config file
//! merged over built-in defaults, in that precedence order. Grounded on
//! `api/bin/chainflip-ingress-egress-tracker/src/settings.rs`'s
//! `TrackerOptions`/`Source` pattern, trimmed to this agent's much smaller
//! surface (one chain endpoint, one subnet path, one signing key file).

use std::collections::HashMap;
use std::path::PathBuf;

use clap::Parser;
use config::{Config, ConfigError, Environment, File, FileFormat, Map, Source, Value};
use serde::Deserialize;

#[derive(Parser, Debug, Clone, Default)]
#[clap(version, about = "Per-node subnet consensus agent")]
pub struct CommandLineOptions {
	/// Path to a TOML config file, merged under CLI flags and env vars.
	#[clap(long = "config-file")]
	pub config_file: Option<PathBuf>,

	#[clap(long = "chain.ws-endpoint")]
	chain_ws_endpoint: Option<String>,

	#[clap(long = "subnet-path")]
	subnet_path: Option<String>,

	#[clap(long = "signing-key-file")]
	signing_key_file: Option<PathBuf>,

	/// Overrides the chain's advertised block time. Mainly for local
	/// testing against a fast devnet; absent in production.
	#[clap(long = "block-secs-override")]
	block_secs_override: Option<u64>,
}

impl Source for CommandLineOptions {
	fn clone_into_box(&self) -> Box<dyn Source + Send + Sync> {
		Box::new(self.clone())
	}

	fn collect(&self) -> Result<Map<String, Value>, ConfigError> {
		let mut map: Map<String, Value> = HashMap::new();
		insert_opt(&mut map, "chain_ws_endpoint", &self.chain_ws_endpoint);
		insert_opt(&mut map, "subnet_path", &self.subnet_path);
		if let Some(path) = &self.signing_key_file {
			map.insert("signing_key_file".into(), path.to_string_lossy().into_owned().into());
		}
		if let Some(secs) = self.block_secs_override {
			map.insert("block_secs_override".into(), (secs as i64).into());
		}
		Ok(map)
	}
}

fn insert_opt(map: &mut Map<String, Value>, key: &str, value: &Option<String>) {
	if let Some(value) = value {
		map.insert(key.into(), value.clone().into());
	}
}

#[derive(Clone, Deserialize, Debug)]
pub struct Settings {
	/// Substrate WS endpoint for the `ChainClient` transport. The transport
	/// itself is out of scope here; this is carried through for whatever
	/// concrete client `main` wires up.
	pub chain_ws_endpoint: String,

	/// Dot-separated registration path identifying this node's subnet.
	pub subnet_path: String,

	pub signing_key_file: PathBuf,

	/// `None` defers to `ChainClient::block_secs`.
	pub block_secs_override: Option<u64>,
}

impl Settings {
	pub fn new(opts: CommandLineOptions) -> Result<Self, ConfigError> {
		let mut builder = Config::builder()
			.set_default("chain_ws_endpoint", "ws://localhost:9944")?
			.set_default("subnet_path", "default")?
			.set_default("signing_key_file", "/etc/subnet-consensus-agent/signing_key")?;

		if let Some(config_file) = &opts.config_file {
			builder = builder.add_source(File::new(&config_file.to_string_lossy(), FileFormat::Toml));
		}

		builder
			.add_source(Environment::default().prefix("SUBNET_AGENT").separator("__"))
			.add_source(opts)
			.build()?
			.try_deserialize()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn defaults_apply_when_nothing_else_is_set() {
		let settings = Settings::new(CommandLineOptions::default()).unwrap();
		assert_eq!(settings.chain_ws_endpoint, "ws://localhost:9944");
		assert_eq!(settings.subnet_path, "default");
		assert_eq!(settings.block_secs_override, None);
	}

	#[test]
	fn command_line_options_override_defaults() {
		let opts = CommandLineOptions {
			subnet_path: Some("subnet-a".to_string()),
			block_secs_override: Some(2),
			..Default::default()
		};
		let settings = Settings::new(opts).unwrap();
		assert_eq!(settings.subnet_path, "subnet-a");
		assert_eq!(settings.block_secs_override, Some(2));
	}
}
