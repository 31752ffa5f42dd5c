use tracing_subscriber::EnvFilter;

/// Verbosity flags pick the default level; an explicit `RUST_LOG` wins.
pub fn init(verbose: u8) {
	let default = match verbose {
		0 => "info",
		1 => "debug",
		_ => "trace",
	};
	let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
	tracing_subscriber::fmt()
		.with_env_filter(filter)
		.with_target(true)
		.init();
}
