//! Purpose: Hold top-level CLI command dispatch for `taskdeck`.
//! Exports: `dispatch_command`.
//! Role: Keep `main.rs` focused on parse/bootstrap and delegate command execution.
//! Invariants: `serve` blocks on a multi-thread runtime until shutdown.

use super::*;

pub(super) fn dispatch_command(command: Command) -> Result<RunOutcome, Error> {
    match command {
        Command::Completion { shell } => {
            let mut cmd = Cli::command();
            clap_complete::aot::generate(shell, &mut cmd, "taskdeck", &mut io::stdout());
            Ok(RunOutcome::ok())
        }
        Command::Version => {
            emit_version_output();
            Ok(RunOutcome::ok())
        }
        Command::Serve(args) => {
            let config = serve_config_from_args(args)?;
            emit_serve_startup_guidance(&config);
            let runtime = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()
                .map_err(|err| {
                    Error::new(ErrorKind::Internal)
                        .with_message("failed to start runtime")
                        .with_source(err)
                })?;
            runtime.block_on(serve::serve(config))?;
            Ok(RunOutcome::ok())
        }
    }
}

fn emit_serve_startup_guidance(config: &serve::ServeConfig) {
    if !io::stderr().is_terminal() {
        return;
    }
    eprintln!("taskdeck serving http://{}", config.bind);
    eprintln!(
        "  page size: default {}, max {}",
        config.store.default_page_size, config.store.max_page_size
    );
    if config.enable_reset {
        eprintln!("  POST /v1/admin/reset is enabled");
    }
    eprintln!("  press Ctrl-C to stop; all records are discarded on exit");
}
