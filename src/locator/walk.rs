//! Frame-tree traversal.
//!
//! Explicit breadth-first walk over frame index paths. Each node is probed
//! through the `FrameProbe` trait and reports either a reachable document
//! (with a stable identity token) or unreachable (the cross-origin case,
//! normal control flow). A visited set on document identity plus a depth
//! bound guarantees termination even on frame graphs with back-references.

use anyhow::Result;
use std::collections::{HashSet, VecDeque};

/// What probing one frame node yielded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reachability {
    Reachable { doc_id: u64, child_count: u32 },
    Unreachable,
}

/// Source of frame probes; the page driver in production, a synthetic
/// graph in tests.
pub trait FrameProbe {
    async fn probe(&mut self, path: &[u32]) -> Result<Reachability>;
}

/// Walks the frame tree breadth-first from the top document and returns
/// the index paths of every reachable document, each visited at most once.
pub async fn walk_frames<P: FrameProbe>(probe: &mut P, max_depth: u32) -> Result<Vec<Vec<u32>>> {
    let mut visited: HashSet<u64> = HashSet::new();
    let mut reachable: Vec<Vec<u32>> = Vec::new();
    let mut queue: VecDeque<Vec<u32>> = VecDeque::new();
    queue.push_back(Vec::new());

    while let Some(path) = queue.pop_front() {
        let Reachability::Reachable { doc_id, child_count } = probe.probe(&path).await? else {
            continue;
        };
        if !visited.insert(doc_id) {
            continue;
        }
        if (path.len() as u32) < max_depth {
            for i in 0..child_count {
                let mut child = path.clone();
                child.push(i);
                queue.push_back(child);
            }
        }
        reachable.push(path);
    }

    Ok(reachable)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    /// Synthetic frame graph keyed by index path. Paths not present are
    /// unreachable. Counts how often each path is probed.
    struct FakeProbe {
        nodes: HashMap<Vec<u32>, (u64, u32)>,
        probes: HashMap<Vec<u32>, u32>,
    }

    impl FakeProbe {
        fn new(nodes: &[(&[u32], u64, u32)]) -> Self {
            Self {
                nodes: nodes
                    .iter()
                    .map(|(p, id, c)| (p.to_vec(), (*id, *c)))
                    .collect(),
                probes: HashMap::new(),
            }
        }
    }

    impl FrameProbe for FakeProbe {
        async fn probe(&mut self, path: &[u32]) -> Result<Reachability> {
            *self.probes.entry(path.to_vec()).or_insert(0) += 1;
            Ok(match self.nodes.get(path) {
                Some(&(doc_id, child_count)) => Reachability::Reachable { doc_id, child_count },
                None => Reachability::Unreachable,
            })
        }
    }

    #[tokio::test]
    async fn test_walk_simple_tree() {
        let mut probe = FakeProbe::new(&[
            (&[], 1, 2),
            (&[0], 2, 0),
            (&[1], 3, 1),
            (&[1, 0], 4, 0),
        ]);
        let frames = walk_frames(&mut probe, 8).await.unwrap();
        assert_eq!(
            frames,
            vec![vec![], vec![0], vec![1], vec![1, 0]],
            "breadth-first order expected"
        );
    }

    #[tokio::test]
    async fn test_walk_skips_unreachable_and_continues() {
        // Child [0] is cross-origin; [1] still gets visited.
        let mut probe = FakeProbe::new(&[(&[], 1, 2), (&[1], 2, 0)]);
        let frames = walk_frames(&mut probe, 8).await.unwrap();
        assert_eq!(frames, vec![vec![], vec![1]]);
    }

    #[tokio::test]
    async fn test_walk_visits_self_referencing_frame_once() {
        // [0] presents the top document again (same doc id): it must not
        // be expanded a second time.
        let mut probe = FakeProbe::new(&[(&[], 1, 1), (&[0], 1, 1)]);
        let frames = walk_frames(&mut probe, 8).await.unwrap();
        assert_eq!(frames, vec![Vec::<u32>::new()]);
        // The aliasing path is probed but never re-enqueued through it.
        assert_eq!(probe.probes[&vec![0u32]], 1);
    }

    #[tokio::test]
    async fn test_walk_respects_depth_bound() {
        // Infinite chain of distinct documents; the depth bound terminates it.
        struct ChainProbe;
        impl FrameProbe for ChainProbe {
            async fn probe(&mut self, path: &[u32]) -> Result<Reachability> {
                Ok(Reachability::Reachable {
                    doc_id: path.len() as u64 + 1,
                    child_count: 1,
                })
            }
        }
        let frames = walk_frames(&mut ChainProbe, 3).await.unwrap();
        assert_eq!(frames.len(), 4); // depths 0..=3
        assert_eq!(frames.last().unwrap().len(), 3);
    }
}
