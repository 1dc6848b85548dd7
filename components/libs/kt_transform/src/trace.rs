//! Structured trace events emitted by the transform graph.
//!
//! The graph never prints. Every notable step is turned into a [`TraceEvent`]
//! and handed to the [`TraceSink`] given at construction. Sinks only observe:
//! nothing they do can change a query result.

use std::fmt::{self, Debug, Display};
use std::sync::mpsc::Sender;

#[derive(Debug, Clone, PartialEq)]
pub enum TraceEvent {
    /// A transform without both a parent and a child stays in the collection
    /// but is left out of the graph.
    EdgeSkipped { name: Option<String> },
    Assembled { frames: usize, edges: usize },
    /// More than one forward edge ends on this frame.
    MultipleParents { frame: String, parents: usize },
    /// The forward edges contain a directed cycle.
    ForwardCycle,
    Rooted { root: String, frames: usize },
    PathFound { from: String, to: String, hops: usize },
    NoPath { from: String, to: String },
}

impl TraceEvent {
    /// Events worth a warning: the graph still answers, but rooting falls back
    /// to first-discovered-wins.
    pub fn is_hazard(&self) -> bool {
        matches!(
            self,
            TraceEvent::MultipleParents { .. } | TraceEvent::ForwardCycle
        )
    }
}

impl Display for TraceEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TraceEvent::EdgeSkipped { name: Some(name) } => {
                write!(f, "transform '{name}' has no parent/child pair, not a graph edge")
            }
            TraceEvent::EdgeSkipped { name: None } => {
                write!(f, "unnamed transform has no parent/child pair, not a graph edge")
            }
            TraceEvent::Assembled { frames, edges } => {
                write!(f, "assembled {frames} frames from {edges} edges")
            }
            TraceEvent::MultipleParents { frame, parents } => write!(
                f,
                "frame '{frame}' has {parents} forward parents, first discovered wins when rooting"
            ),
            TraceEvent::ForwardCycle => write!(f, "forward edges contain a cycle"),
            TraceEvent::Rooted { root, frames } => {
                write!(f, "rooted {frames} frames at '{root}'")
            }
            TraceEvent::PathFound { from, to, hops } => {
                write!(f, "path '{from}' -> '{to}' in {hops} hops")
            }
            TraceEvent::NoPath { from, to } => write!(f, "no path from '{from}' to '{to}'"),
        }
    }
}

/// Append-only destination for trace events.
pub trait TraceSink: Send + Sync + Debug {
    fn log(&self, event: &TraceEvent);
}

/// Forwards events to the `log` facade.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl TraceSink for LogSink {
    fn log(&self, event: &TraceEvent) {
        if event.is_hazard() {
            log::warn!("{event}");
        } else {
            log::debug!("{event}");
        }
    }
}

/// Drops everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl TraceSink for NullSink {
    fn log(&self, _event: &TraceEvent) {}
}

/// Sends every event down a channel. A closed receiver is not an error for
/// the graph; the event is dropped.
#[derive(Debug)]
pub struct ChannelSink {
    sender: Sender<TraceEvent>,
}

impl ChannelSink {
    pub fn new(sender: Sender<TraceEvent>) -> Self {
        Self { sender }
    }
}

impl TraceSink for ChannelSink {
    fn log(&self, event: &TraceEvent) {
        let _ = self.sender.send(event.clone());
    }
}
