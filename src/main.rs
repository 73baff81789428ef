use clap::Parser;
use tasknote::cli::commands::Cli;
use tasknote::cli::handlers::{self, NoteEnv};
use tasknote::io::logging;

fn main() {
    let cli = Cli::parse();

    let env = match NoteEnv::from_cli(&cli) {
        Ok(env) => env,
        Err(e) => {
            eprintln!("error: {}", e);
            std::process::exit(1);
        }
    };

    let level = logging::resolve_level(cli.log_level.as_deref(), env.config.log.level.as_deref());
    if let Err(e) = logging::init_logging(&level, &logging::default_log_dir()) {
        eprintln!("warning: logging disabled: {}", e);
    }

    if let Err(e) = handlers::dispatch(cli, &env) {
        log::error!("event=command_failed error={}", e);
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}
