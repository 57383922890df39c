//! Logging bootstrap. Grounded on the `tracing_subscriber::FmtSubscriber`
//! initialization used by the teacher's binaries (e.g.
//! `api/bin/chainflip-ingress-egress-tracker/src/main.rs`), which reads its
//! filter directives from `RUST_LOG` rather than a config file.

pub fn init() {
	tracing_subscriber::FmtSubscriber::builder()
		.with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
		.try_init()
		.expect("setting default subscriber failed");
}
