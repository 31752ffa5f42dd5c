use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "boxbooker")]
#[command(about = "Automated weekly class booking against a WodBuster-style box")]
#[command(version)]
pub struct Cli {
	/// Increase verbosity (-v debug, -vv trace)
	#[arg(short, long, action = clap::ArgAction::Count)]
	pub verbose: u8,

	/// Base URL of the box's booking site
	#[arg(long, value_name = "URL")]
	pub base_url: String,

	/// DevTools WebSocket endpoint of the browser to drive
	#[arg(
		long,
		value_name = "WS_URL",
		default_value = "ws://127.0.0.1:9222/devtools/browser"
	)]
	pub cdp_endpoint: String,

	/// 32-byte key for password-at-rest encryption
	#[arg(long, env = "BB_ENCRYPTION_KEY", hide_env_values = true)]
	pub encryption_key: String,

	/// Bind address for the health endpoint
	#[arg(long, value_name = "ADDR", default_value = "127.0.0.1:8080")]
	pub health_addr: String,
}
