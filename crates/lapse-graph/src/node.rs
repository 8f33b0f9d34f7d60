//! Node records stored in the graph arena.
//!
//! Nodes refer to each other through [`NodeId`], an index into the arena of
//! the [`Graph`](crate::Graph) that created them. Every variant is fixed at
//! construction; the topology never changes afterwards.

use std::fmt;
use std::sync::Arc;

use lapse_core::PixelBuffer;

use crate::delay::DelayRing;
use crate::ops::{BinaryOp, UnaryOp};

/// Handle to a node inside one [`Graph`](crate::Graph).
///
/// Ids are only meaningful for the graph that produced them. A node can
/// only reference ids created before it, which keeps the graph acyclic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    /// Position of the node in the arena.
    #[inline]
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Variant tag of a node, for introspection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// Reads an external frame buffer.
    Import,
    /// Writes into an external frame buffer.
    Export,
    /// Single-input operator.
    Unary,
    /// Two-input operator.
    Binary,
    /// Multi-frame delay.
    Delay,
}

impl NodeKind {
    /// Lowercase name used in graph dumps.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Import => "import",
            Self::Export => "export",
            Self::Unary => "unary",
            Self::Binary => "binary",
            Self::Delay => "delay",
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

pub(crate) struct ImportNode {
    pub buffer: Arc<PixelBuffer>,
}

pub(crate) struct ExportNode {
    pub buffer: Arc<PixelBuffer>,
    pub source: NodeId,
}

pub(crate) struct UnaryNode {
    pub source: NodeId,
    pub op: Box<dyn UnaryOp>,
}

pub(crate) struct BinaryNode {
    pub a: NodeId,
    pub b: NodeId,
    pub op: Box<dyn BinaryOp>,
}

pub(crate) struct DelayNode {
    pub source: NodeId,
    pub ring: DelayRing,
}

pub(crate) enum Node {
    Import(ImportNode),
    Export(ExportNode),
    Unary(UnaryNode),
    Binary(BinaryNode),
    Delay(DelayNode),
}

impl Node {
    pub fn kind(&self) -> NodeKind {
        match self {
            Node::Import(_) => NodeKind::Import,
            Node::Export(_) => NodeKind::Export,
            Node::Unary(_) => NodeKind::Unary,
            Node::Binary(_) => NodeKind::Binary,
            Node::Delay(_) => NodeKind::Delay,
        }
    }

    /// Upstream ids in evaluation order (`a` before `b`).
    pub fn inputs(&self) -> Vec<NodeId> {
        match self {
            Node::Import(_) => Vec::new(),
            Node::Export(n) => vec![n.source],
            Node::Unary(n) => vec![n.source],
            Node::Binary(n) => vec![n.a, n.b],
            Node::Delay(n) => vec![n.source],
        }
    }

    /// One-line label for dumps, e.g. `unary to_gray`.
    pub fn label(&self) -> String {
        match self {
            Node::Import(n) => format!("import {}x{}", n.buffer.width(), n.buffer.height()),
            Node::Export(n) => format!("export {}x{}", n.buffer.width(), n.buffer.height()),
            Node::Unary(n) => format!("unary {}", n.op.name()),
            Node::Binary(n) => format!("binary {}", n.op.name()),
            Node::Delay(n) => format!("delay {} frames ({})", n.ring.delay(), n.ring.format()),
        }
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("kind", &self.kind())
            .field("inputs", &self.inputs())
            .field("label", &self.label())
            .finish()
    }
}
