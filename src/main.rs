mod types;
mod config;
mod files;
mod transform;
mod minify;
mod obfuscate;

use clap::Parser;
use color_print::*;

#[derive(clap::Parser)]
#[command(version, about, long_about = None, disable_help_subcommand = true)]
struct Cli {
	#[command(subcommand)]
	command: Command,
}

#[derive(clap::Subcommand, Clone)]
enum Command {
	/// Minify the bundled extension script in place
	Minify(minify::Args),
	/// Minify and obfuscate the extension script and the inline scripts of its webviews
	Obfuscate(obfuscate::Args),
}

#[tokio::main]
async fn main() {
	let cli = Cli::parse();

	let result = match cli.command {
		Command::Minify(args) => minify::run(args).await,
		Command::Obfuscate(args) => obfuscate::run(args).await,
	};

	if let Err(err) = result {
		ceprintln!("<r!><s>Error:</></> {:#}", err);
		std::process::exit(1); // general error
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use clap::CommandFactory;

	#[test]
	fn cli_is_well_formed() {
		Cli::command().debug_assert();
	}

	#[test]
	fn subcommands_need_no_arguments() {
		assert!(Cli::try_parse_from(["extpack", "minify"]).is_ok());
		assert!(Cli::try_parse_from(["extpack", "obfuscate"]).is_ok());
		assert!(Cli::try_parse_from(["extpack", "obfuscate", "--root", "plugin", "--config", "plugin/extpack.toml"]).is_ok());
		assert!(Cli::try_parse_from(["extpack"]).is_err());
	}
}
