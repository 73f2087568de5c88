use scmc_lib::cli::{create_root_command, CommandRegistry, GlobalArgs};
use scmc_lib::commands::{dispatch_command, register_commands, Services};
use scmc_lib::config::{Config, EnvConfig};
use scmc_lib::errors::{handle_command_error, handle_fatal, ScmcError};
use scmc_lib::signal::SignalHandler;

#[tokio::main]
async fn main() {
    // Step 1: Read the environment once
    let env = EnvConfig::get();

    // Step 2: Build the command tree and parse arguments
    let mut registry = CommandRegistry::new(create_root_command());
    if let Err(e) = register_commands(&mut registry) {
        handle_fatal(e);
    }
    let mut root = registry.build_root();
    let matches = root.get_matches_mut();
    let globals = GlobalArgs::from_matches(&matches);

    // Step 3: Load the config file
    let (config, config_path) =
        match Config::discover(globals.config_file.as_deref(), env.home_dir.as_deref()) {
            Ok(found) => found,
            Err(e) => {
                handle_command_error(&e);
                std::process::exit(1);
            }
        };

    // Step 4: Initialize the logger; the CLI flag wins over the file
    let level = globals.log_level.or(config.log_level).unwrap_or_default();
    scmc_lib::logger::init(level);
    if let Some(path) = &config_path {
        tracing::debug!(path = %path.display(), "loaded config file");
    }
    if let Err(e) = config.validate() {
        handle_command_error(&e);
        std::process::exit(1);
    }

    // Step 5: Spawn the signal handler
    let signal_handler = SignalHandler::new();
    let shutdown = signal_handler.token();
    tokio::spawn(async move {
        if let Err(e) = signal_handler.listen().await {
            tracing::error!("signal handler failed: {}", e);
        }
    });

    let services = Services::new(config, env, shutdown)
        .with_credential_flags(globals.username, globals.password);

    // Step 6: Dispatch to the subcommand handler
    match matches.subcommand() {
        Some((name, sub_matches)) => {
            tracing::debug!(command = name, "executing command");
            if let Err(e) = dispatch_command(name, sub_matches, &services).await {
                handle_command_error(&e);
                std::process::exit(1);
            }
        }
        None => {
            if let Err(e) = root.print_help() {
                handle_fatal(ScmcError::Io(e));
            }
        }
    }
}
