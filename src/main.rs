use std::process::ExitCode;

use clap::{CommandFactory, Parser};

use docmirror::cli::Cli;
use docmirror::{MirrorContext, Settings, StartupError, logging};

fn main() -> ExitCode {
    let cli = Cli::parse();

    let settings = match Settings::load().map_err(StartupError::from) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::FAILURE;
        }
    };

    logging::init_with_config(&settings.logging);

    match run(&cli, &settings) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            if let Some(StartupError::NotADirectory { .. }) = e.downcast_ref::<StartupError>() {
                eprintln!("{}", Cli::command().render_usage());
            }
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli, settings: &Settings) -> anyhow::Result<()> {
    let ctx = MirrorContext::from_settings(&cli.watch_path, &cli.output_path, settings)?;

    docmirror::log_event!(
        "startup",
        "entry file",
        "{} ({})",
        ctx.entry_file(),
        settings.rebuild.program
    );

    docmirror::run_watch(ctx, &settings.rebuild)?;
    Ok(())
}
