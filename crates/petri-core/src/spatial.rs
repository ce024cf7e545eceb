use crate::agent::Agent;
use rstar::{PointDistance, RTree, RTreeObject, AABB};

/// An agent's footprint: a disc of radius `size` around its position.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AgentLocation {
    /// Index into the slice the tree was built from.
    pub index: usize,
    pub position: [f64; 2],
    pub radius: f64,
}

impl AgentLocation {
    fn center_distance_2(&self, point: &[f64; 2]) -> f64 {
        let dx = self.position[0] - point[0];
        let dy = self.position[1] - point[1];
        dx * dx + dy * dy
    }
}

impl RTreeObject for AgentLocation {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        let [x, y] = self.position;
        let r = self.radius;
        AABB::from_corners([x - r, y - r], [x + r, y + r])
    }
}

impl PointDistance for AgentLocation {
    fn distance_2(&self, point: &[f64; 2]) -> f64 {
        let gap = (self.center_distance_2(point).sqrt() - self.radius).max(0.0);
        gap * gap
    }

    fn contains_point(&self, point: &[f64; 2]) -> bool {
        self.center_distance_2(point) <= self.radius * self.radius
    }
}

/// Build an R*-tree over the living agents via bulk_load (O(n log n)).
pub fn build_index(agents: &[Agent]) -> RTree<AgentLocation> {
    let locations = agents
        .iter()
        .enumerate()
        .filter(|(_, a)| a.is_alive())
        .map(|(index, a)| AgentLocation {
            index,
            position: a.position(),
            radius: a.traits().size,
        })
        .collect();
    RTree::bulk_load(locations)
}

/// Indices of agents whose centre is within `radius` of `center`, ascending.
/// Uses an AABB envelope query then filters by Euclidean distance.
pub fn query_within(tree: &RTree<AgentLocation>, center: [f64; 2], radius: f64) -> Vec<usize> {
    if radius.is_nan() || radius < 0.0 {
        return Vec::new();
    }
    let envelope = AABB::from_corners(
        [center[0] - radius, center[1] - radius],
        [center[0] + radius, center[1] + radius],
    );
    let r_sq = radius * radius;
    let mut hits: Vec<usize> = tree
        .locate_in_envelope_intersecting(&envelope)
        .filter(|loc| loc.center_distance_2(&center) <= r_sq)
        .map(|loc| loc.index)
        .collect();
    hits.sort_unstable();
    hits
}

/// Index of the agent whose disc covers `point`, preferring the nearest
/// centre and then the lowest index.
pub fn locate_at(tree: &RTree<AgentLocation>, point: [f64; 2]) -> Option<usize> {
    tree.locate_all_at_point(&point)
        .min_by(|a, b| {
            a.center_distance_2(&point)
                .total_cmp(&b.center_distance_2(&point))
                .then(a.index.cmp(&b.index))
        })
        .map(|loc| loc.index)
}
