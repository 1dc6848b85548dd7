//! Frame graph over rigid transforms.
//!
//! A [`TransformGraph`] is assembled once from an unordered list of
//! [`RigidTransform`] edges tagged with parent and child frames. It answers
//! point-to-point queries ([`TransformGraph::get`]) and expresses every frame
//! relative to any chosen frame ([`TransformGraph::root`]).
//!
//! ```
//! use kt_transform::{RigidTransform, TransformGraph};
//!
//! let graph = TransformGraph::new(
//!     [
//!         RigidTransform::new(0.5, 0.0, 0.0, 0.0, 0.0, 0.0).with_frames("base_link", "hand"),
//!         RigidTransform::new(1.0, 0.0, 0.5, 0.0, 0.0, 0.0).with_frames("hand", "box"),
//!     ],
//!     "base_link",
//! )
//! .unwrap();
//!
//! let base_to_box = graph.get("base_link", "box").unwrap();
//! assert_eq!(base_to_box.origin(), [1.5, 0.0, 0.5]);
//! ```

pub mod collection;
pub mod error;
pub mod graph;
pub mod topology;
pub mod trace;

#[cfg(test)]
mod test_utils;

use std::collections::HashMap;

/// Frame identifier strings
pub type FrameName = String;

/// Every frame of a graph expressed relative to one frame.
pub type RootedFrameMap = HashMap<FrameName, RigidTransform>;

pub use collection::RigidCollection;
pub use error::{TransformError, TransformResult};
pub use graph::{EdgeIndex, GraphEdge, TransformGraph, TransformGraphBuilder};
pub use topology::Topology;
pub use trace::{ChannelSink, LogSink, NullSink, TraceEvent, TraceSink};

pub use kt_rigid_payloads::{Direction, FrameAxes, HomogeneousMatrix, Pose, RigidTransform};
