//! View command - live capture window.

use anyhow::{Result, bail};

use crate::ViewArgs;
use crate::session::Session;

/// Run the view command.
pub fn run(args: ViewArgs, threads: usize) -> Result<()> {
    let session = Session::resolve(&args.session, threads)?;
    let config = lapse_view::ViewerConfig {
        capture: session.capture,
        preset: session.preset,
        workers: session.workers,
        max_fps: session.max_fps,
    };

    let exit_code = lapse_view::run(config);
    if exit_code != 0 {
        bail!("viewer exited with code {exit_code}");
    }
    Ok(())
}
