//! Info command: prints the resolved session and the sampling graph.

use std::sync::Arc;

use anyhow::{Context, Result};
use lapse_core::PixelBuffer;
use lapse_graph::DelayDiffPreset;

use crate::InfoArgs;
use crate::session::Session;

pub fn run(args: InfoArgs, threads: usize) -> Result<()> {
    let session = Session::resolve(&args.session, threads)?;
    print!("{}", render(&session)?);
    Ok(())
}

/// Renders the session summary followed by every panel's subgraph.
///
/// The graph is built over a blank buffer, so no capture is started.
pub fn render(session: &Session) -> Result<String> {
    let capture = &session.capture;
    let (w, h) = capture.output_resolution();
    let input = Arc::new(PixelBuffer::rgba8(w, h));
    let preset = DelayDiffPreset::build(input, &session.preset).context("Failed to build graph")?;

    let mut out = String::new();
    let source = format!("{:?}", capture.source).to_lowercase();
    out.push_str(&format!("Source:     {source}\n"));
    out.push_str(&format!(
        "Area:       {}x{}+{}+{} on {}\n",
        capture.area.width, capture.area.height, capture.area.x, capture.area.y, capture.display
    ));
    out.push_str(&format!("Resolution: {w}x{h} @ {} fps\n", capture.framerate));
    out.push_str(&format!("Delay:      {} frames\n", session.preset.delay_frames));
    out.push_str(&format!(
        "Diff:       {:?}{}\n",
        session.preset.diff,
        if session.preset.gray_diff { " (gray)" } else { "" }
    ));
    let workers = if session.workers == 0 {
        "auto".to_string()
    } else {
        session.workers.to_string()
    };
    out.push_str(&format!("Workers:    {workers}\n"));
    out.push_str(&format!("Nodes:      {}\n\n", preset.graph.len()));
    out.push_str(&preset.describe()?);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{SessionArgs, SessionFile};
    use lapse_capture::Resolution;

    #[test]
    fn test_render_lists_panels() {
        let args = SessionArgs {
            synthetic: true,
            delay: Some(5),
            gray_diff: true,
            size: Some(Resolution { width: 64, height: 32 }),
            ..Default::default()
        };
        let session = Session::merge(SessionFile::default(), &args, 0).unwrap();
        let text = render(&session).unwrap();

        assert!(text.starts_with("Source:     synthetic\n"));
        assert!(text.contains("Resolution: 64x32 @ 30 fps"));
        assert!(text.contains("Delay:      5 frames"));
        assert!(text.contains("(gray)"));
        assert!(text.contains("Workers:    auto"));
        for panel in ["live:", "delayed:", "diff:"] {
            assert!(text.contains(panel), "{panel} missing in\n{text}");
        }
        assert!(text.contains("delay 5 frames"));
    }
}
