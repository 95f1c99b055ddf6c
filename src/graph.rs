use crate::contour::{region_pixels, BoundingBox, Contour};
use crate::error::{Error, InvariantViolation};
use rayon::prelude::*;

/// Id of a region: the flattened index (`y * width + x`) of its first pixel.
pub type RegionId = usize;

const REMOVED: usize = usize::MAX;

/// Directed adjacency record. Each undirected adjacency is stored once in both regions.
#[derive(Debug, Clone, PartialEq)]
pub struct Edge {
    /// Neighboring region.
    pub target: RegionId,
    /// Last computed merge cost. Only meaningful while `cost_fresh` is set.
    pub cost: f32,
    /// Length of the shared border in unit pixel edges.
    pub boundary: u32,
    // Reset whenever either endpoint changes, the cost is recomputed at the next pass.
    pub(crate) cost_fresh: bool,
}

impl Edge {
    pub(crate) fn stale(target: RegionId, boundary: u32) -> Self {
        Self {
            target,
            cost: 0f32,
            boundary,
            cost_fresh: false,
        }
    }
    pub fn is_cost_fresh(&self) -> bool {
        self.cost_fresh
    }
}

/// Connected set of pixels with its geometry and criterion attributes.
///
/// `area`, `perimeter`, `bbox` and `contour` are maintained by the merge step, `attributes` by the
/// criterion.
#[derive(Debug, Clone)]
pub struct Region<A> {
    pub id: RegionId,
    /// Number of pixels
    pub area: u32,
    /// Number of unit edges between the region and anything else, image border included
    pub perimeter: u32,
    pub bbox: BoundingBox,
    /// Outer boundary starting at the pixel `id`
    pub contour: Contour,
    pub attributes: A,
    // Per pass flag: false once the region took part in a merge during the current pass.
    pub(crate) valid: bool,
    pub(crate) expired: bool,
    pub(crate) edges: Vec<Edge>,
}

impl<A> Region<A> {
    fn single_pixel(id: RegionId, width: usize, height: usize, attributes: A) -> Self {
        let (x, y) = (id % width, id / width);
        let mut edges = Vec::with_capacity(4);
        if y > 0 {
            edges.push(Edge::stale(id - width, 1));
        }
        if x + 1 < width {
            edges.push(Edge::stale(id + 1, 1));
        }
        if y + 1 < height {
            edges.push(Edge::stale(id + width, 1));
        }
        if x > 0 {
            edges.push(Edge::stale(id - 1, 1));
        }
        Self {
            id,
            area: 1,
            perimeter: 4,
            bbox: BoundingBox::from_pixel(id, width),
            contour: Contour::single_pixel(),
            attributes,
            valid: true,
            expired: false,
            edges,
        }
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }
    pub fn find_edge(&self, target: RegionId) -> Option<&Edge> {
        self.edges.iter().find(|edge| edge.target == target)
    }
    #[inline]
    pub(crate) fn edge_position(&self, target: RegionId) -> Option<usize> {
        self.edges.iter().position(|edge| edge.target == target)
    }
    pub(crate) fn find_edge_mut(&mut self, target: RegionId) -> Option<&mut Edge> {
        self.edges.iter_mut().find(|edge| edge.target == target)
    }
    pub(crate) fn remove_edge(&mut self, target: RegionId) -> Option<Edge> {
        self.edge_position(target).map(|pos| self.edges.remove(pos))
    }
    pub fn is_expired(&self) -> bool {
        self.expired
    }
    /// Pixels of the region in raster order, recovered from the contour.
    pub fn pixels(&self, image_width: usize) -> Vec<usize> {
        region_pixels(self.id, &self.bbox, &self.contour, image_width)
    }
}

/// Region adjacency graph.
///
/// Regions live in a vector compacted after every pass. Neighbors are referred to by id and
/// resolved through `positions`, so a reference to an absorbed region resolves to `None`.
#[derive(Debug)]
pub struct Graph<A> {
    regions: Vec<Region<A>>,
    positions: Vec<usize>,
    width: usize,
    height: usize,
}

impl<A> Graph<A> {
    /// One region per pixel, 4-connected, neighbors ordered top, right, bottom, left.
    pub fn from_attributes(attributes: Vec<A>, width: usize, height: usize) -> Result<Self, Error>
    where
        A: Send,
    {
        if width == 0 || height == 0 {
            return Err(Error::ZeroDimension { width, height });
        }
        if attributes.len() != width * height {
            return Err(InvariantViolation::AttributeCount {
                expected: width * height,
                actual: attributes.len(),
            }
            .into());
        }
        let regions: Vec<Region<A>> = attributes
            .into_par_iter()
            .enumerate()
            .map(|(id, attributes)| Region::single_pixel(id, width, height, attributes))
            .collect();
        Ok(Self {
            regions,
            positions: (0..width * height).collect(),
            width,
            height,
        })
    }

    #[inline(always)]
    pub fn width(&self) -> usize {
        self.width
    }
    #[inline(always)]
    pub fn height(&self) -> usize {
        self.height
    }
    /// Number of regions, including the ones expired during the running pass.
    pub fn len(&self) -> usize {
        self.regions.len()
    }
    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }
    /// Regions ordered by increasing id.
    pub fn regions(&self) -> &[Region<A>] {
        &self.regions
    }
    pub(crate) fn regions_mut(&mut self) -> &mut [Region<A>] {
        &mut self.regions
    }

    /// Slot of a region present in the vector, expired or not.
    #[inline]
    pub(crate) fn position(&self, id: RegionId) -> Option<usize> {
        match self.positions.get(id) {
            Some(&pos) if pos != REMOVED => Some(pos),
            _ => None,
        }
    }

    /// Live region with this id. Absorbed regions resolve to `None`.
    pub fn get(&self, id: RegionId) -> Option<&Region<A>> {
        self.position(id)
            .map(|pos| &self.regions[pos])
            .filter(|region| !region.expired)
    }

    pub(crate) fn get_mut(&mut self, id: RegionId) -> Option<&mut Region<A>> {
        let pos = self.position(id)?;
        Some(&mut self.regions[pos]).filter(|region| !region.expired)
    }

    /// Two distinct regions borrowed mutably at once.
    pub(crate) fn pair_mut(
        &mut self,
        a: RegionId,
        b: RegionId,
    ) -> Result<(&mut Region<A>, &mut Region<A>), Error> {
        let pos_a = self.position(a).ok_or(InvariantViolation::MissingRegion(a))?;
        let pos_b = self.position(b).ok_or(InvariantViolation::MissingRegion(b))?;
        debug_assert_ne!(pos_a, pos_b);
        if pos_a < pos_b {
            let (head, tail) = self.regions.split_at_mut(pos_b);
            Ok((&mut head[pos_a], &mut tail[0]))
        } else {
            let (head, tail) = self.regions.split_at_mut(pos_a);
            Ok((&mut tail[0], &mut head[pos_b]))
        }
    }

    /// Drops the expired regions, returns how many were removed.
    pub fn remove_expired(&mut self) -> usize {
        let before = self.regions.len();
        for region in self.regions.iter().filter(|region| region.expired) {
            self.positions[region.id] = REMOVED;
        }
        self.regions.retain(|region| !region.expired);
        for (pos, region) in self.regions.iter().enumerate() {
            self.positions[region.id] = pos;
        }
        before - self.regions.len()
    }
}

#[cfg(test)]
mod tests {
    use super::Graph;
    use crate::error::{Error, InvariantViolation};

    #[test]
    fn initial_graph_is_four_connected() {
        let graph = Graph::from_attributes(vec![(); 6], 3, 2).unwrap();
        assert_eq!(graph.len(), 6);
        let targets = |id| -> Vec<usize> {
            graph
                .get(id)
                .unwrap()
                .edges()
                .iter()
                .map(|e| e.target)
                .collect()
        };
        assert_eq!(targets(0), vec![1, 3]);
        assert_eq!(targets(1), vec![2, 4, 0]);
        assert_eq!(targets(4), vec![1, 5, 3]);
        assert_eq!(targets(5), vec![2, 4]);
        for region in graph.regions() {
            assert_eq!(region.area, 1);
            assert_eq!(region.perimeter, 4);
            assert_eq!(region.contour.len(), 4);
            assert!(region.edges().iter().all(|e| e.boundary == 1 && !e.is_cost_fresh()));
            for edge in region.edges() {
                assert!(graph.get(edge.target).unwrap().find_edge(region.id).is_some());
            }
        }
    }

    #[test]
    fn removed_regions_resolve_to_none() {
        let mut graph = Graph::from_attributes(vec![0u8; 4], 2, 2).unwrap();
        graph.get_mut(1).unwrap().expired = true;
        assert!(graph.get(1).is_none());
        assert_eq!(graph.len(), 4);
        assert_eq!(graph.remove_expired(), 1);
        assert_eq!(graph.len(), 3);
        assert!(graph.get(1).is_none());
        assert!(graph.get(99).is_none());
        assert_eq!(graph.get(3).unwrap().id, 3);
        assert_eq!(graph.position(3), Some(2));
        assert_eq!(graph.remove_expired(), 0);
    }

    #[test]
    fn pair_mut_in_both_orders() {
        let mut graph = Graph::from_attributes(vec![0u8, 1, 2, 3], 4, 1).unwrap();
        let (a, b) = graph.pair_mut(3, 1).unwrap();
        assert_eq!((a.id, b.id), (3, 1));
        a.attributes = 10;
        let (a, b) = graph.pair_mut(0, 3).unwrap();
        assert_eq!((a.attributes, b.attributes), (0, 10));
        graph.get_mut(2).unwrap().expired = true;
        graph.remove_expired();
        assert_eq!(
            graph.pair_mut(0, 2).err(),
            Some(Error::Invariant(InvariantViolation::MissingRegion(2)))
        );
    }

    #[test]
    fn attribute_count_is_checked() {
        let err = Graph::from_attributes(vec![0u8; 5], 3, 2).unwrap_err();
        assert!(err.is_internal());
        assert!(matches!(
            Graph::from_attributes(Vec::<u8>::new(), 0, 2),
            Err(Error::ZeroDimension { .. })
        ));
    }
}
