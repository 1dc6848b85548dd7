use crate::collection::RigidCollection;
use crate::error::{TransformError, TransformResult};
use crate::topology::{self, Topology};
use crate::trace::{LogSink, TraceEvent, TraceSink};
use crate::{FrameName, RootedFrameMap};
use kt_rigid_payloads::{Direction, RigidTransform};
use std::borrow::Cow;
use std::collections::{HashMap, VecDeque};

/// Position of an edge in the graph's edge arena.
pub type EdgeIndex = usize;

type FrameIndex = usize;

/// One traversable edge. Every input transform yields two of them: the
/// transform itself, filed under its parent, and its inverse (flagged
/// [`Direction::Backward`]), filed under its child. Either way the edge
/// leads away from the frame it is filed under.
#[derive(Debug, Clone)]
pub struct GraphEdge {
    pub(crate) from: FrameIndex,
    pub(crate) to: FrameIndex,
    transform: RigidTransform,
}

impl GraphEdge {
    pub fn transform(&self) -> &RigidTransform {
        &self.transform
    }

    pub fn direction(&self) -> Direction {
        self.transform.direction()
    }
}

/// Frames, edges and per-frame buckets of outgoing edges, in insertion order.
#[derive(Debug, Default)]
struct IncidenceList {
    frames: Vec<FrameName>,
    frame_indices: HashMap<FrameName, FrameIndex>,
    edges: Vec<GraphEdge>,
    buckets: Vec<Vec<EdgeIndex>>,
}

impl IncidenceList {
    fn ensure_frame(&mut self, frame: &str) -> FrameIndex {
        if let Some(&index) = self.frame_indices.get(frame) {
            return index;
        }
        let index = self.frames.len();
        self.frames.push(frame.to_string());
        self.frame_indices.insert(frame.to_string(), index);
        self.buckets.push(Vec::new());
        index
    }

    fn link(&mut self, parent: &str, child: &str, transform: &RigidTransform) {
        let from = self.ensure_frame(parent);
        let to = self.ensure_frame(child);

        let forward = transform.clone().with_direction(Direction::Forward);
        let backward = forward.inverse();

        let forward_index = self.edges.len();
        self.edges.push(GraphEdge {
            from,
            to,
            transform: forward,
        });
        self.buckets[from].push(forward_index);

        self.edges.push(GraphEdge {
            from: to,
            to: from,
            transform: backward,
        });
        self.buckets[to].push(forward_index + 1);
    }

    fn index_of(&self, frame: &str) -> TransformResult<FrameIndex> {
        self.frame_indices
            .get(frame)
            .copied()
            .ok_or_else(|| TransformError::FrameNotFound(frame.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FrameState {
    Unvisited,
    Open,
    Closed,
}

/// Builder for [`TransformGraph`].
///
/// Without an explicit root, the graph roots itself at the first frame (in
/// edge order) that is never the child of an edge, or at the very first
/// frame when every frame has a parent.
#[derive(Debug, Default)]
pub struct TransformGraphBuilder {
    edges: Vec<RigidTransform>,
    root: Option<FrameName>,
    sink: Option<Box<dyn TraceSink>>,
}

impl TransformGraphBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn edge(mut self, edge: RigidTransform) -> Self {
        self.edges.push(edge);
        self
    }

    pub fn edges<I>(mut self, edges: I) -> Self
    where
        I: IntoIterator<Item = RigidTransform>,
    {
        self.edges.extend(edges);
        self
    }

    pub fn root(mut self, root: impl Into<FrameName>) -> Self {
        self.root = Some(root.into());
        self
    }

    /// Where trace events go. Defaults to [`LogSink`].
    pub fn sink(mut self, sink: impl TraceSink + 'static) -> Self {
        self.sink = Some(Box::new(sink));
        self
    }

    pub fn build(self) -> TransformResult<TransformGraph> {
        let sink = self.sink.unwrap_or_else(|| Box::new(LogSink));
        TransformGraph::assemble(self.edges, self.root.as_deref(), sink)
    }
}

/// Frame graph built once from an unordered list of transforms.
///
/// Point-to-point queries ([`get`](Self::get)) run a breadth-first search over
/// forward and inverse edges. Whole-graph queries ([`root`](Self::root)) are
/// answered from a map of every frame relative to the configured root, built
/// once by walking forward edges from the root, then corrected with one
/// multiplication per frame when another destination is asked for.
///
/// All queries take `&self` except those that change the configured root.
#[derive(Debug)]
pub struct TransformGraph {
    collection: RigidCollection,
    incidence: IncidenceList,
    topology: Topology,
    root: FrameIndex,
    rooted: RootedFrameMap,
    sink: Box<dyn TraceSink>,
}

impl TransformGraph {
    pub fn new<I>(edges: I, root: &str) -> TransformResult<Self>
    where
        I: IntoIterator<Item = RigidTransform>,
    {
        TransformGraphBuilder::new().edges(edges).root(root).build()
    }

    pub fn builder() -> TransformGraphBuilder {
        TransformGraphBuilder::new()
    }

    fn assemble(
        edges: Vec<RigidTransform>,
        root: Option<&str>,
        sink: Box<dyn TraceSink>,
    ) -> TransformResult<Self> {
        let collection = RigidCollection::from_transforms(edges)?;

        let mut incidence = IncidenceList::default();
        for transform in &collection {
            match (transform.parent(), transform.child()) {
                (Some(parent), Some(child)) => incidence.link(parent, child, transform),
                _ => sink.log(&TraceEvent::EdgeSkipped {
                    name: transform.name().map(str::to_string),
                }),
            }
        }
        sink.log(&TraceEvent::Assembled {
            frames: incidence.frames.len(),
            edges: incidence.edges.len() / 2,
        });

        let topology = topology::analyze(&incidence.frames, &incidence.edges);
        if topology.forward_cycle {
            sink.log(&TraceEvent::ForwardCycle);
        }
        for (frame, parents) in &topology.multiple_parents {
            sink.log(&TraceEvent::MultipleParents {
                frame: frame.clone(),
                parents: *parents,
            });
        }

        let root = match root {
            Some(root) => incidence.index_of(root)?,
            None => Self::infer_root(&incidence).ok_or(TransformError::EmptyGraph)?,
        };

        let mut graph = Self {
            collection,
            incidence,
            topology,
            root,
            rooted: RootedFrameMap::new(),
            sink,
        };
        graph.rooted = graph.build_rooted_map(root);
        Ok(graph)
    }

    fn infer_root(incidence: &IncidenceList) -> Option<FrameIndex> {
        let mut has_parent = vec![false; incidence.frames.len()];
        for edge in &incidence.edges {
            if edge.direction() == Direction::Forward {
                has_parent[edge.to] = true;
            }
        }
        has_parent
            .iter()
            .position(|&p| !p)
            .or_else(|| (!incidence.frames.is_empty()).then_some(0))
    }

    /// Transform taking coordinates in `end` to coordinates in `start`,
    /// tagged `start -> end`.
    pub fn get(&self, start: &str, end: &str) -> TransformResult<RigidTransform> {
        let path = self.find_path(start, end)?;
        let anchor = RigidTransform::identity().with_frames(start, start);
        Ok(path.iter().fold(anchor, |acc, &edge| {
            acc.compose(&self.incidence.edges[edge].transform)
        }))
    }

    /// Edges on the shortest path from `start` to `end`, in travel order.
    /// Among equally short paths the one using earlier-inserted edges wins.
    pub fn find_path(&self, start: &str, end: &str) -> TransformResult<Vec<EdgeIndex>> {
        let from = self.incidence.index_of(start)?;
        let to = self.incidence.index_of(end)?;
        if from == to {
            return Ok(Vec::new());
        }

        match self.search(from, to) {
            Some(path) => {
                self.sink.log(&TraceEvent::PathFound {
                    from: start.to_string(),
                    to: end.to_string(),
                    hops: path.len(),
                });
                Ok(path)
            }
            None => {
                self.sink.log(&TraceEvent::NoPath {
                    from: start.to_string(),
                    to: end.to_string(),
                });
                Err(TransformError::TransformNotFound {
                    from: start.to_string(),
                    to: end.to_string(),
                })
            }
        }
    }

    fn search(&self, from: FrameIndex, to: FrameIndex) -> Option<Vec<EdgeIndex>> {
        let frame_count = self.incidence.frames.len();
        let mut visited = vec![false; frame_count];
        let mut backpointer: Vec<Option<EdgeIndex>> = vec![None; frame_count];
        let mut open = VecDeque::from([from]);
        visited[from] = true;

        while let Some(current) = open.pop_front() {
            for &edge_index in &self.incidence.buckets[current] {
                let next = self.incidence.edges[edge_index].to;
                if visited[next] {
                    continue;
                }
                visited[next] = true;
                backpointer[next] = Some(edge_index);
                if next == to {
                    return Some(self.walk_back(&backpointer, to));
                }
                open.push_back(next);
            }
        }
        None
    }

    fn walk_back(&self, backpointer: &[Option<EdgeIndex>], end: FrameIndex) -> Vec<EdgeIndex> {
        let mut path = Vec::new();
        let mut current = end;
        // the start frame is the only visited frame without a backpointer
        while let Some(edge_index) = backpointer[current] {
            path.push(edge_index);
            current = self.incidence.edges[edge_index].from;
        }
        path.reverse();
        path
    }

    /// Every frame relative to `root_frame`, then re-expressed in
    /// `destination`.
    ///
    /// When `root_frame` differs from the configured root the cached map is
    /// rebuilt first, and only kept when `destination` can be answered from
    /// it. When `destination` is the root the cached map itself is returned.
    pub fn root(
        &mut self,
        destination: &str,
        root_frame: &str,
    ) -> TransformResult<Cow<'_, RootedFrameMap>> {
        let root = self.incidence.index_of(root_frame)?;
        if root != self.root {
            self.incidence.index_of(destination)?;
            let rooted = self.build_rooted_map(root);
            if !rooted.contains_key(destination) {
                return Err(TransformError::TransformNotFound {
                    from: root_frame.to_string(),
                    to: destination.to_string(),
                });
            }
            self.root = root;
            self.rooted = rooted;
        }
        self.root_into(destination)
    }

    /// Like [`root`](Self::root) but keeps the configured root.
    pub fn root_into(&self, destination: &str) -> TransformResult<Cow<'_, RootedFrameMap>> {
        if destination == self.root_frame() {
            return Ok(Cow::Borrowed(&self.rooted));
        }

        let Some(destination_from_root) = self.rooted.get(destination) else {
            self.incidence.index_of(destination)?;
            return Err(TransformError::TransformNotFound {
                from: self.root_frame().to_string(),
                to: destination.to_string(),
            });
        };

        let correction = destination_from_root.inverse();
        Ok(Cow::Owned(
            self.rooted
                .iter()
                .map(|(frame, transform)| (frame.clone(), correction.compose(transform)))
                .collect(),
        ))
    }

    /// The cached map of every frame relative to the configured root.
    pub fn rooted(&self) -> &RootedFrameMap {
        &self.rooted
    }

    pub fn root_frame(&self) -> &str {
        &self.incidence.frames[self.root]
    }

    /// Re-root the cached map. A no-op when `root_frame` is already the root.
    pub fn set_root(&mut self, root_frame: &str) -> TransformResult<()> {
        let root = self.incidence.index_of(root_frame)?;
        if root != self.root {
            self.root = root;
            self.rooted = self.build_rooted_map(root);
        }
        Ok(())
    }

    /// Walk forward edges from `root`, giving each newly reached frame its
    /// parent's rooted transform times the edge. A frame is pushed once when
    /// first reached (Open) and expanded once (Closed); a frame reached again
    /// keeps its first transform. On a tree of forward edges every frame has
    /// one way in, so the result is unique. On anything else the winner is
    /// decided by stack order over incidence order.
    fn build_rooted_map(&self, root: FrameIndex) -> RootedFrameMap {
        let frame_count = self.incidence.frames.len();
        let mut state = vec![FrameState::Unvisited; frame_count];
        let mut rooted: Vec<Option<RigidTransform>> = vec![None; frame_count];

        let root_name = &self.incidence.frames[root];
        rooted[root] = Some(RigidTransform::identity().with_frames(root_name, root_name));
        state[root] = FrameState::Open;
        let mut open = vec![root];

        while let Some(current) = open.pop() {
            if state[current] == FrameState::Closed {
                continue;
            }
            state[current] = FrameState::Closed;

            let Some(current_from_root) = rooted[current].clone() else {
                continue;
            };
            for &edge_index in &self.incidence.buckets[current] {
                let edge = &self.incidence.edges[edge_index];
                if edge.direction() != Direction::Forward || state[edge.to] != FrameState::Unvisited
                {
                    continue;
                }
                rooted[edge.to] = Some(current_from_root.compose(&edge.transform));
                state[edge.to] = FrameState::Open;
                open.push(edge.to);
            }
        }

        let map: RootedFrameMap = self
            .incidence
            .frames
            .iter()
            .zip(rooted)
            .filter_map(|(frame, transform)| transform.map(|t| (frame.clone(), t)))
            .collect();

        self.sink.log(&TraceEvent::Rooted {
            root: root_name.clone(),
            frames: map.len(),
        });
        map
    }

    /// Named transform lookup, delegated to the collection.
    pub fn lookup(&self, name: &str) -> TransformResult<Option<&RigidTransform>> {
        self.collection.lookup(name)
    }

    pub fn collection(&self) -> &RigidCollection {
        &self.collection
    }

    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    /// Frames in the order they first appeared in the edge list.
    pub fn frames(&self) -> impl Iterator<Item = &str> {
        self.incidence.frames.iter().map(String::as_str)
    }

    pub fn contains_frame(&self, frame: &str) -> bool {
        self.incidence.frame_indices.contains_key(frame)
    }

    pub fn frame_count(&self) -> usize {
        self.incidence.frames.len()
    }

    /// Number of input transforms that became edges.
    pub fn edge_count(&self) -> usize {
        self.incidence.edges.len() / 2
    }

    pub fn edge(&self, index: EdgeIndex) -> Option<&GraphEdge> {
        self.incidence.edges.get(index)
    }

    /// Edges leaving `frame`, forward and inverse, in insertion order.
    pub fn incident_edges(&self, frame: &str) -> TransformResult<Vec<&GraphEdge>> {
        let index = self.incidence.index_of(frame)?;
        Ok(self.incidence.buckets[index]
            .iter()
            .map(|&edge| &self.incidence.edges[edge])
            .collect())
    }
}
