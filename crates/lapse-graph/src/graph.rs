//! The node arena: construction, size resolution, point evaluation and the
//! frame-finish pass.
//!
//! # Evaluation model
//!
//! Evaluation is pull-based. [`Graph::sample`] starts at a node (normally an
//! export) and recurses toward the imports for a single pixel. Nothing is
//! cached between nodes: a node reached through two downstream paths is
//! evaluated once per path.
//!
//! ```text
//!            +--> export(live) ------------------+
//! import ----+                                   +--> binary diff --> export(diff)
//!            +--> delay(30) --> export(delayed) -+
//! ```
//!
//! Sampling takes `&self` and may run on many threads at once. Advancing the
//! delay rings takes `&mut self` through [`Graph::finish_frame`], so it can
//! never overlap a sampling pass.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use lapse_core::PixelBuffer;
//! use lapse_graph::{Graph, ops::ToGray, ops::ToRgba};
//!
//! let input = Arc::new(PixelBuffer::filled(4, 4, [30, 60, 90, 255]));
//! let output = Arc::new(PixelBuffer::rgba8(4, 4));
//!
//! let mut graph = Graph::new();
//! let src = graph.import(input)?;
//! let gray = graph.unary(src, ToGray)?;
//! let rgba = graph.unary(gray, ToRgba)?;
//! let out = graph.export(output.clone(), rgba)?;
//!
//! graph.sample(out, 2, 1)?;
//! assert_eq!(output.pixel(2, 1), [60, 60, 60, 255]);
//! # Ok::<(), lapse_core::Error>(())
//! ```

use std::fmt::Write as _;
use std::sync::Arc;

use lapse_core::{Error, PixelBuffer, PixelEncoding, Result, Sample, SampleFormat};
use tracing::{debug, trace};

use crate::delay::DelayRing;
use crate::node::{BinaryNode, DelayNode, ExportNode, ImportNode, Node, NodeId, NodeKind, UnaryNode};
use crate::ops::{BinaryOp, UnaryOp};

/// Arena of nodes forming an acyclic sampling graph.
#[derive(Debug, Default)]
pub struct Graph {
    nodes: Vec<Node>,
    frames_finished: u64,
}

impl Graph {
    /// Creates an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of nodes.
    #[inline]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// True if no node has been added.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Number of completed finish passes.
    #[inline]
    pub fn frames_finished(&self) -> u64 {
        self.frames_finished
    }

    fn node(&self, id: NodeId) -> Result<&Node> {
        self.nodes.get(id.0).ok_or(Error::UnknownNode {
            id: id.0,
            len: self.nodes.len(),
        })
    }

    fn push(&mut self, node: Node) -> NodeId {
        let id = NodeId(self.nodes.len());
        debug!(id = %id, node = %node.label(), "graph: add node");
        self.nodes.push(node);
        id
    }

    fn check_encoding(context: &'static str, buffer: &PixelBuffer) -> Result<()> {
        if buffer.encoding() != PixelEncoding::Rgba8 {
            return Err(Error::unsupported_buffer(context, buffer.encoding()));
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Construction
    // ------------------------------------------------------------------

    /// Adds a node reading `buffer`.
    ///
    /// # Errors
    ///
    /// [`Error::UnsupportedBufferFormat`] unless the buffer is RGBA8.
    pub fn import(&mut self, buffer: Arc<PixelBuffer>) -> Result<NodeId> {
        Self::check_encoding("import", &buffer)?;
        Ok(self.push(Node::Import(ImportNode { buffer })))
    }

    /// Adds a node writing the output of `source` into `buffer`.
    ///
    /// # Errors
    ///
    /// - [`Error::UnsupportedBufferFormat`] unless the buffer is RGBA8
    /// - [`Error::ShapeMismatch`] if the buffer size differs from the size
    ///   `source` resolves to
    pub fn export(&mut self, buffer: Arc<PixelBuffer>, source: NodeId) -> Result<NodeId> {
        Self::check_encoding("export", &buffer)?;
        let size = self.resolve_size(source)?;
        if size != buffer.dimensions() {
            return Err(Error::shape_mismatch(size, buffer.dimensions()));
        }
        Ok(self.push(Node::Export(ExportNode { buffer, source })))
    }

    /// Adds a single-input operator node.
    pub fn unary(&mut self, source: NodeId, op: impl UnaryOp + 'static) -> Result<NodeId> {
        self.node(source)?;
        Ok(self.push(Node::Unary(UnaryNode {
            source,
            op: Box::new(op),
        })))
    }

    /// Adds a two-input operator node.
    ///
    /// # Errors
    ///
    /// [`Error::ShapeMismatch`] if `a` and `b` resolve to different sizes.
    pub fn binary(&mut self, a: NodeId, b: NodeId, op: impl BinaryOp + 'static) -> Result<NodeId> {
        let size_a = self.resolve_size(a)?;
        let size_b = self.resolve_size(b)?;
        if size_a != size_b {
            return Err(Error::shape_mismatch(size_a, size_b));
        }
        Ok(self.push(Node::Binary(BinaryNode {
            a,
            b,
            op: Box::new(op),
        })))
    }

    /// Adds a node returning the output of `source` from `frames` frames ago.
    ///
    /// The ring is sized from the resolved size of `source`, and its sample
    /// format is taken by sampling `source` once at (0, 0). The format is
    /// then fixed: later samples of another format fail with
    /// [`Error::FormatMismatch`]. The probe has the same side effects as
    /// sampling that pixel; they are overwritten by the first frame.
    ///
    /// `frames == 0` is a pass-through.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidDimensions`] for a zero-area source
    /// - any error raised while resolving or probing `source`
    pub fn delay(&mut self, source: NodeId, frames: usize) -> Result<NodeId> {
        let (width, height) = self.resolve_size(source)?;
        if width == 0 || height == 0 {
            return Err(Error::invalid_dimensions(width, height, "delay source has zero area"));
        }
        let format = self.sample(source, 0, 0)?.format;
        let ring = DelayRing::new(width, height, format, frames)?;
        Ok(self.push(Node::Delay(DelayNode { source, ring })))
    }

    // ------------------------------------------------------------------
    // Resolution and evaluation
    // ------------------------------------------------------------------

    /// Size of the image `id` produces.
    ///
    /// # Errors
    ///
    /// [`Error::ShapeMismatch`] if a binary node below `id` has inputs of
    /// different sizes, [`Error::UnknownNode`] for a foreign id.
    pub fn resolve_size(&self, id: NodeId) -> Result<(u32, u32)> {
        match self.node(id)? {
            Node::Import(n) => Ok(n.buffer.dimensions()),
            Node::Export(n) => self.resolve_size(n.source),
            Node::Unary(n) => self.resolve_size(n.source),
            Node::Delay(n) => self.resolve_size(n.source),
            Node::Binary(n) => {
                let a = self.resolve_size(n.a)?;
                let b = self.resolve_size(n.b)?;
                if a != b {
                    return Err(Error::shape_mismatch(a, b));
                }
                Ok(a)
            }
        }
    }

    /// Pulls the value of `id` at (x, y) through the graph.
    ///
    /// Export nodes on the way write their narrowed result into their
    /// buffer. Delay nodes store the fresh value and return the old one.
    ///
    /// # Errors
    ///
    /// [`Error::FormatMismatch`] when a node receives a sample it cannot
    /// interpret, or whatever an operator returns.
    ///
    /// [`Error::InvalidDimensions`] if (x, y) lies outside the size `id`
    /// resolves to. Every path ends at an import, which rejects the
    /// coordinate before any export or delay on the way is written.
    pub fn sample(&self, id: NodeId, x: u32, y: u32) -> Result<Sample> {
        match self.node(id)? {
            Node::Import(n) => {
                check_bounds(n.buffer.dimensions(), x, y)?;
                Ok(Sample::from_rgba8(n.buffer.pixel(x, y)))
            }
            Node::Export(n) => {
                check_bounds(n.buffer.dimensions(), x, y)?;
                let s = self.sample(n.source, x, y)?;
                s.expect_format(SampleFormat::Rgba, "export")?;
                n.buffer.set_pixel(x, y, s.to_rgba8());
                Ok(s)
            }
            Node::Unary(n) => {
                let s = self.sample(n.source, x, y)?;
                n.op.apply(s)
            }
            Node::Binary(n) => {
                let a = self.sample(n.a, x, y)?;
                let b = self.sample(n.b, x, y)?;
                n.op.apply(a, b)
            }
            Node::Delay(n) => {
                let fresh = self.sample(n.source, x, y)?;
                n.ring.exchange(x, y, &fresh)
            }
        }
    }

    // ------------------------------------------------------------------
    // Frame bookkeeping
    // ------------------------------------------------------------------

    /// Ids reachable from any of `roots`, roots included, in ascending order.
    pub fn reachable(&self, roots: &[NodeId]) -> Result<Vec<NodeId>> {
        let mut seen = vec![false; self.nodes.len()];
        let mut stack = Vec::with_capacity(roots.len());
        for &root in roots {
            self.node(root)?;
            stack.push(root);
        }
        while let Some(id) = stack.pop() {
            if seen[id.0] {
                continue;
            }
            seen[id.0] = true;
            stack.extend(self.nodes[id.0].inputs());
        }
        Ok(seen
            .iter()
            .enumerate()
            .filter(|(_, s)| **s)
            .map(|(i, _)| NodeId(i))
            .collect())
    }

    /// Ends a frame: advances every delay ring reachable from `roots`.
    ///
    /// Each delay advances once no matter how many paths or roots reach
    /// it. Call this once per frame, after every pixel of every root has
    /// been sampled. Taking `&mut self` rules out overlapping a sampling
    /// pass.
    ///
    /// # Errors
    ///
    /// [`Error::UnknownNode`] for a foreign root. Nothing advances in that
    /// case.
    pub fn finish_frame(&mut self, roots: &[NodeId]) -> Result<()> {
        let ids = self.reachable(roots)?;
        let mut advanced = 0usize;
        for id in ids {
            if let Node::Delay(n) = &mut self.nodes[id.0] {
                n.ring.advance();
                advanced += 1;
            }
        }
        self.frames_finished += 1;
        trace!(frame = self.frames_finished, delays = advanced, "graph: frame finished");
        Ok(())
    }

    // ------------------------------------------------------------------
    // Introspection
    // ------------------------------------------------------------------

    /// Variant of `id`.
    pub fn kind(&self, id: NodeId) -> Result<NodeKind> {
        Ok(self.node(id)?.kind())
    }

    /// Direct upstream ids of `id`.
    pub fn inputs(&self, id: NodeId) -> Result<Vec<NodeId>> {
        Ok(self.node(id)?.inputs())
    }

    /// Ring slot currently written by delay node `id`, `None` for other kinds.
    pub fn delay_position(&self, id: NodeId) -> Option<usize> {
        match self.nodes.get(id.0)? {
            Node::Delay(n) => Some(n.ring.position()),
            _ => None,
        }
    }

    /// Buffer bound to export node `id`.
    pub fn export_buffer(&self, id: NodeId) -> Option<&Arc<PixelBuffer>> {
        match self.nodes.get(id.0)? {
            Node::Export(n) => Some(&n.buffer),
            _ => None,
        }
    }

    /// Renders the subgraph under `root` as an indented tree.
    ///
    /// Shared nodes appear once per path, marked with `*` after their
    /// first appearance.
    ///
    /// ```text
    /// #5 export 8x8 [8x8]
    ///   #4 binary diff [8x8]
    ///     #1 export 8x8 [8x8]
    ///       #0 import 8x8 [8x8]
    /// ```
    pub fn describe(&self, root: NodeId) -> Result<String> {
        let mut out = String::new();
        let mut seen = vec![false; self.nodes.len()];
        self.describe_into(root, 0, &mut seen, &mut out)?;
        Ok(out)
    }

    fn describe_into(&self, id: NodeId, depth: usize, seen: &mut [bool], out: &mut String) -> Result<()> {
        let node = self.node(id)?;
        let (w, h) = self.resolve_size(id)?;
        let shared = if seen[id.0] { " *" } else { "" };
        seen[id.0] = true;
        // Writing to a String cannot fail.
        let _ = writeln!(out, "{:indent$}{} {} [{}x{}]{}", "", id, node.label(), w, h, shared, indent = depth * 2);
        for input in node.inputs() {
            self.describe_into(input, depth + 1, seen, out)?;
        }
        Ok(())
    }
}

fn check_bounds((width, height): (u32, u32), x: u32, y: u32) -> Result<()> {
    if x < width && y < height {
        Ok(())
    } else {
        Err(Error::invalid_dimensions(width, height, format!("pixel ({x}, {y}) out of bounds")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::{Diff, ToGray, unary_fn};
    use std::sync::Mutex;

    fn buf(w: u32, h: u32, px: [u8; 4]) -> Arc<PixelBuffer> {
        Arc::new(PixelBuffer::filled(w, h, px))
    }

    #[test]
    fn test_resolve_size_forwards() {
        let mut g = Graph::new();
        let src = g.import(buf(6, 3, [0; 4])).unwrap();
        let d = g.delay(src, 2).unwrap();
        let u = g.unary(d, ToGray).unwrap();
        assert_eq!(g.resolve_size(u).unwrap(), (6, 3));
        assert_eq!(g.resolve_size(u).unwrap(), g.resolve_size(u).unwrap());
    }

    #[test]
    fn test_binary_shape_mismatch() {
        let mut g = Graph::new();
        let a = g.import(buf(4, 4, [0; 4])).unwrap();
        let b = g.import(buf(4, 2, [0; 4])).unwrap();
        let err = g.binary(a, b, Diff).unwrap_err();
        assert!(matches!(err, Error::ShapeMismatch { a_height: 4, b_height: 2, .. }));
        assert_eq!(g.len(), 2);
    }

    #[test]
    fn test_export_size_checked() {
        let mut g = Graph::new();
        let a = g.import(buf(4, 4, [0; 4])).unwrap();
        let err = g.export(Arc::new(PixelBuffer::rgba8(3, 4)), a).unwrap_err();
        assert!(matches!(err, Error::ShapeMismatch { .. }));
    }

    #[test]
    fn test_unsupported_encodings() {
        let mut g = Graph::new();
        let gray = Arc::new(PixelBuffer::new(2, 2, PixelEncoding::Gray8));
        assert!(matches!(
            g.import(gray.clone()),
            Err(Error::UnsupportedBufferFormat { context: "import", .. })
        ));
        let src = g.import(buf(2, 2, [0; 4])).unwrap();
        assert!(matches!(
            g.export(Arc::new(PixelBuffer::new(2, 2, PixelEncoding::Rgb8)), src),
            Err(Error::UnsupportedBufferFormat { context: "export", .. })
        ));
    }

    #[test]
    fn test_unknown_node() {
        let mut other = Graph::new();
        let foreign = other.import(buf(1, 1, [0; 4])).unwrap();
        let mut g = Graph::new();
        assert!(matches!(g.unary(foreign, ToGray), Err(Error::UnknownNode { id: 0, len: 0 })));
        assert!(g.finish_frame(&[foreign]).is_err());
        assert_eq!(g.frames_finished(), 0);
    }

    #[test]
    fn test_export_writes_and_passes_through() {
        let mut g = Graph::new();
        let out = Arc::new(PixelBuffer::rgba8(2, 2));
        let src = g.import(buf(2, 2, [1, 2, 3, 4])).unwrap();
        let e = g.export(out.clone(), src).unwrap();
        let s = g.sample(e, 1, 1).unwrap();
        assert_eq!(s, Sample::rgba(1.0, 2.0, 3.0, 4.0));
        assert_eq!(out.pixel(1, 1), [1, 2, 3, 4]);
        assert_eq!(out.pixel(0, 0), [0, 0, 0, 0]);
    }

    #[test]
    fn test_export_rejects_gray() {
        let mut g = Graph::new();
        let src = g.import(buf(2, 2, [9; 4])).unwrap();
        let gray = g.unary(src, ToGray).unwrap();
        let e = g.export(Arc::new(PixelBuffer::rgba8(2, 2)), gray).unwrap();
        assert!(g.sample(e, 0, 0).unwrap_err().is_format_error());
    }

    #[test]
    fn test_binary_order_a_then_b() {
        let mut g = Graph::new();
        let a = g.import(buf(1, 1, [10, 0, 0, 255])).unwrap();
        let b = g.import(buf(1, 1, [50, 0, 0, 255])).unwrap();
        let d = g.binary(a, b, Diff).unwrap();
        assert_eq!(g.sample(d, 0, 0).unwrap().data[0], 215.0);
    }

    #[test]
    fn test_binary_evaluates_a_before_b() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let mut g = Graph::new();
        let src = g.import(buf(1, 1, [0; 4])).unwrap();
        let log = Arc::clone(&order);
        let ua = g
            .unary(src, unary_fn("a", move |s| {
                log.lock().unwrap().push("a");
                Ok(s)
            }))
            .unwrap();
        let log = Arc::clone(&order);
        let ub = g
            .unary(src, unary_fn("b", move |s| {
                log.lock().unwrap().push("b");
                Ok(s)
            }))
            .unwrap();
        let d = g.binary(ua, ub, Diff).unwrap();
        g.sample(d, 0, 0).unwrap();
        g.sample(d, 0, 0).unwrap();
        assert_eq!(*order.lock().unwrap(), ["a", "b", "a", "b"]);
    }

    #[test]
    fn test_sample_out_of_bounds_is_an_error() {
        let mut g = Graph::new();
        let pixels = Arc::new(PixelBuffer::rgba8(4, 4));
        pixels.set_pixel(1, 1, [7, 7, 7, 255]);
        let src = g.import(pixels).unwrap();
        let d = g.delay(src, 0).unwrap();
        let out = Arc::new(PixelBuffer::rgba8(4, 4));
        let e = g.export(Arc::clone(&out), d).unwrap();

        for (x, y) in [(4, 0), (5, 0), (0, 4), (u32::MAX, 0)] {
            let err = g.sample(e, x, y).unwrap_err();
            assert!(err.is_construction_error(), "({x}, {y}): {err}");
            assert!(g.sample(d, x, y).is_err());
        }
        // nothing aliased into (1, 1) or (0, 1)
        assert!(out.pixels().all(|px| px == [0; 4]));
        assert_eq!(g.sample(d, 0, 1).unwrap().to_rgba8(), [0, 0, 0, 0]);
        assert_eq!(g.sample(e, 1, 1).unwrap().to_rgba8(), [7, 7, 7, 255]);
        assert_eq!(out.pixel(1, 1), [7, 7, 7, 255]);
    }

    #[test]
    fn test_delay_probes_format() {
        let mut g = Graph::new();
        let src = g.import(buf(2, 2, [3; 4])).unwrap();
        let gray = g.unary(src, ToGray).unwrap();
        let d = g.delay(gray, 1).unwrap();
        assert_eq!(g.sample(d, 1, 1).unwrap().format, SampleFormat::Gray);
        assert!(g.describe(d).unwrap().contains("(gray)"));
    }

    #[test]
    fn test_finish_frame_counts_shared_delay_once() {
        let mut g = Graph::new();
        let src = g.import(buf(1, 1, [0; 4])).unwrap();
        let d = g.delay(src, 4).unwrap();
        let a = g.unary(d, unary_fn("id", Ok)).unwrap();
        let b = g.unary(d, unary_fn("id", Ok)).unwrap();
        let both = g.binary(a, b, Diff).unwrap();
        g.finish_frame(&[both, a, b, d]).unwrap();
        assert_eq!(g.delay_position(d), Some(1));
        assert_eq!(g.frames_finished(), 1);
        g.finish_frame(&[both]).unwrap();
        assert_eq!(g.delay_position(d), Some(2));
    }

    #[test]
    fn test_finish_frame_skips_unreachable_delay() {
        let mut g = Graph::new();
        let src = g.import(buf(1, 1, [0; 4])).unwrap();
        let d = g.delay(src, 2).unwrap();
        g.finish_frame(&[src]).unwrap();
        assert_eq!(g.delay_position(d), Some(0));
        assert_eq!(g.delay_position(src), None);
    }

    #[test]
    fn test_reachable_and_inputs() {
        let mut g = Graph::new();
        let a = g.import(buf(1, 1, [0; 4])).unwrap();
        let _unused = g.import(buf(1, 1, [0; 4])).unwrap();
        let u = g.unary(a, ToGray).unwrap();
        assert_eq!(g.reachable(&[u]).unwrap(), vec![a, u]);
        assert_eq!(g.inputs(u).unwrap(), vec![a]);
        assert_eq!(g.kind(u).unwrap(), NodeKind::Unary);
    }

    #[test]
    fn test_describe_marks_shared() {
        let mut g = Graph::new();
        let src = g.import(buf(2, 2, [0; 4])).unwrap();
        let both = g.binary(src, src, Diff).unwrap();
        let text = g.describe(both).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "#1 binary diff [2x2]");
        assert_eq!(lines[1], "  #0 import 2x2 [2x2]");
        assert_eq!(lines[2], "  #0 import 2x2 [2x2] *");
    }
}
