use colored::Colorize;
use orch_installer_core::{CancellationToken, Canceller, InstallerError};

/// Print the `Stage / Step / Error` block for a failed run.
pub fn print_installer_error(err: &InstallerError) {
    eprintln!();
    eprintln!("{}", "✗ Installation failed".red().bold());
    for line in err.to_string().lines() {
        eprintln!("  {}", line.red());
    }
}

/// First Ctrl-C stops new stages from starting, the second one cancels the
/// running step.
pub fn spawn_signal_handler(canceller: Canceller, ctx: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_err() {
            return;
        }
        canceller.cancel();
        tracing::warn!(
            "Interrupt received, finishing the current stage. Press Ctrl-C again to abort it."
        );

        if tokio::signal::ctrl_c().await.is_err() {
            return;
        }
        tracing::warn!("Second interrupt received, aborting the current step");
        ctx.cancel();
    });
}
