//! Image connectivity graph built from accepted pairwise alignments.
//!
//! Nodes are input positions; `sources[pos]` gives the source index.

use panorama_core::Homography;
use panorama_features::PairwiseTransform;

use crate::ReferenceChoice;

#[derive(Clone, Debug)]
struct Edge {
    /// Input positions of `transform.from` and `transform.to`.
    from: usize,
    to: usize,
    transform: PairwiseTransform,
}

/// Undirected graph of successfully aligned pairs, weighted by inlier count.
#[derive(Clone, Debug)]
pub struct ConnectivityGraph {
    sources: Vec<usize>,
    edges: Vec<Edge>,
}

/// Placement of every node relative to the reference, with the tree edges used.
#[derive(Clone, Debug)]
pub struct ChainedTransforms {
    /// `reference_from_source` per input position.
    pub reference_from: Vec<Homography>,
    /// Tree edges in the order Prim added them.
    pub edges: Vec<PairwiseTransform>,
}

impl ConnectivityGraph {
    /// Transforms whose endpoints are not in `sources` are ignored.
    pub fn new(sources: Vec<usize>, transforms: Vec<PairwiseTransform>) -> Self {
        let position = |s: usize| sources.iter().position(|&x| x == s);
        let edges = transforms
            .into_iter()
            .filter_map(|t| {
                let from = position(t.from)?;
                let to = position(t.to)?;
                (from != to).then_some(Edge {
                    from,
                    to,
                    transform: t,
                })
            })
            .collect();
        Self { sources, edges }
    }

    pub fn node_count(&self) -> usize {
        self.sources.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn degree(&self, pos: usize) -> usize {
        self.edges
            .iter()
            .filter(|e| e.from == pos || e.to == pos)
            .count()
    }

    pub fn total_inliers(&self, pos: usize) -> usize {
        self.edges
            .iter()
            .filter(|e| e.from == pos || e.to == pos)
            .map(|e| e.transform.inliers)
            .sum()
    }

    /// Connected components as input positions, each ascending, ordered by
    /// their smallest source index.
    pub fn components(&self) -> Vec<Vec<usize>> {
        let n = self.sources.len();
        let mut parent: Vec<usize> = (0..n).collect();
        fn find(parent: &mut [usize], mut x: usize) -> usize {
            while parent[x] != x {
                parent[x] = parent[parent[x]];
                x = parent[x];
            }
            x
        }
        for e in &self.edges {
            let (a, b) = (find(&mut parent, e.from), find(&mut parent, e.to));
            if a != b {
                parent[a.max(b)] = a.min(b);
            }
        }

        let mut groups: Vec<Vec<usize>> = Vec::new();
        let mut root_group: Vec<Option<usize>> = vec![None; n];
        for pos in 0..n {
            let root = find(&mut parent, pos);
            match root_group[root] {
                Some(g) => groups[g].push(pos),
                None => {
                    root_group[root] = Some(groups.len());
                    groups.push(vec![pos]);
                }
            }
        }
        groups.sort_by_key(|g| g.iter().map(|&p| self.sources[p]).min());
        groups
    }

    /// Same as [`Self::components`], expressed in source indices.
    pub fn component_sources(&self) -> Vec<Vec<usize>> {
        self.components()
            .into_iter()
            .map(|g| {
                let mut s: Vec<usize> = g.into_iter().map(|p| self.sources[p]).collect();
                s.sort_unstable();
                s
            })
            .collect()
    }

    /// Input position of the reference image, `None` if `Index(i)` names an
    /// unknown source.
    pub fn reference(&self, choice: ReferenceChoice) -> Option<usize> {
        let n = self.sources.len();
        match choice {
            ReferenceChoice::First => (n > 0).then_some(0),
            ReferenceChoice::Index(i) => self.sources.iter().position(|&s| s == i),
            ReferenceChoice::MostConnected => (0..n).max_by(|&a, &b| {
                self.degree(a)
                    .cmp(&self.degree(b))
                    .then(self.total_inliers(a).cmp(&self.total_inliers(b)))
                    .then(self.sources[b].cmp(&self.sources[a]))
            }),
        }
    }

    /// Chain transforms outward from `reference` along a maximum spanning tree.
    ///
    /// Returns `None` if a node is unreachable or an edge cannot be inverted.
    pub fn chain_from(&self, reference: usize) -> Option<ChainedTransforms> {
        let n = self.sources.len();
        let mut reference_from: Vec<Option<Homography>> = vec![None; n];
        reference_from[reference] = Some(Homography::identity());
        let mut edges = Vec::with_capacity(n.saturating_sub(1));

        for _ in 1..n {
            // Strongest edge leaving the tree; ties to the lowest (new, tree) positions.
            let mut best: Option<(&Edge, usize, usize)> = None;
            for e in &self.edges {
                let (inside, outside) =
                    match (reference_from[e.from].is_some(), reference_from[e.to].is_some()) {
                        (true, false) => (e.from, e.to),
                        (false, true) => (e.to, e.from),
                        _ => continue,
                    };
                let better = match best {
                    None => true,
                    Some((b, b_in, b_out)) => {
                        e.transform.inliers > b.transform.inliers
                            || (e.transform.inliers == b.transform.inliers
                                && (outside, inside) < (b_out, b_in))
                    }
                };
                if better {
                    best = Some((e, inside, outside));
                }
            }

            let (edge, inside, outside) = best?;
            // inside_from_outside, inverting when the edge points the other way.
            let inside_from_outside = if edge.from == outside {
                edge.transform.homography
            } else {
                edge.transform.homography.inverse()?
            };
            let parent = reference_from[inside]?;
            reference_from[outside] = Some(parent.then_after(&inside_from_outside)?);
            edges.push(edge.transform.clone());
        }

        let reference_from = reference_from.into_iter().collect::<Option<Vec<_>>>()?;
        Some(ChainedTransforms {
            reference_from,
            edges,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Point2;

    fn shift(from: usize, to: usize, dx: f64, inliers: usize) -> PairwiseTransform {
        PairwiseTransform {
            from,
            to,
            homography: Homography::translation(dx, 0.0),
            matches: inliers + 10,
            inliers,
            confidence: 1.0,
        }
    }

    #[test]
    fn components_are_grouped_and_sorted() {
        let g = ConnectivityGraph::new(
            vec![4, 0, 3, 1],
            vec![shift(4, 3, 1.0, 20), shift(0, 1, 1.0, 20)],
        );
        assert_eq!(g.component_sources(), vec![vec![0, 1], vec![3, 4]]);
        assert_eq!(g.components(), vec![vec![1, 3], vec![0, 2]]);
    }

    #[test]
    fn most_connected_prefers_degree_then_inliers() {
        let g = ConnectivityGraph::new(
            vec![0, 1, 2],
            vec![shift(0, 1, -100.0, 30), shift(1, 2, -100.0, 25)],
        );
        assert_eq!(g.reference(ReferenceChoice::MostConnected), Some(1));
        assert_eq!(g.reference(ReferenceChoice::First), Some(0));
        assert_eq!(g.reference(ReferenceChoice::Index(2)), Some(2));
        assert_eq!(g.reference(ReferenceChoice::Index(7)), None);

        let tie = ConnectivityGraph::new(vec![5, 6], vec![shift(5, 6, 1.0, 30)]);
        assert_eq!(tie.reference(ReferenceChoice::MostConnected), Some(0));
    }

    #[test]
    fn chaining_composes_and_inverts_edges() {
        // 0 -> 1 maps x to x - 100 (image 1 sits 100px right of image 0);
        // 2 -> 1 maps x to x + 100 (image 2 sits 100px right of image 1).
        let g = ConnectivityGraph::new(
            vec![0, 1, 2],
            vec![shift(0, 1, -100.0, 30), shift(2, 1, 100.0, 25)],
        );
        let chain = g.chain_from(0).expect("connected");
        let p = Point2::new(10.0, 5.0);
        let in_ref = |pos: usize| chain.reference_from[pos].apply(p);
        assert!((in_ref(0).x - 10.0).abs() < 1e-9);
        assert!((in_ref(1).x - 110.0).abs() < 1e-9);
        assert!((in_ref(2).x - 210.0).abs() < 1e-9);
        assert_eq!(chain.edges.len(), 2);
        assert_eq!(chain.edges[0].inliers, 30);
    }

    #[test]
    fn spanning_tree_keeps_strongest_edges() {
        let weak = PairwiseTransform {
            homography: Homography::translation(-999.0, 0.0),
            ..shift(0, 2, 0.0, 5)
        };
        let g = ConnectivityGraph::new(
            vec![0, 1, 2],
            vec![shift(0, 1, -100.0, 40), shift(1, 2, -100.0, 40), weak],
        );
        let chain = g.chain_from(0).expect("connected");
        let x = chain.reference_from[2].apply(Point2::new(0.0, 0.0)).x;
        assert!((x - 200.0).abs() < 1e-9, "x = {x}");
    }

    #[test]
    fn unreachable_nodes_fail_to_chain() {
        let g = ConnectivityGraph::new(vec![0, 1, 2], vec![shift(0, 1, 1.0, 20)]);
        assert!(g.chain_from(0).is_none());
    }
}
