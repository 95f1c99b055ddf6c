use crate::arrays::PixelImage;
use crate::graph::Region;

/// Homogeneity criterion driving the merging.
///
/// The engine only knows regions through their geometry; everything about pixel values lives in
/// `Attributes`. Costs are compared against [`crate::common::Config::threshold`], lower is more
/// similar. `cost` must be symmetric in `a` and `b` and must not depend on anything but its
/// arguments, since it runs concurrently over the whole graph.
pub trait Criterion: Sync {
    type Attributes: Send + Sync;

    /// Attributes of the one-pixel regions, indexed by flattened pixel index.
    ///
    /// Must return exactly `image.width * image.height` values.
    fn init_from_image(&self, image: &PixelImage) -> Vec<Self::Attributes>;

    /// Cost of merging two adjacent regions sharing `shared_boundary` unit edges.
    fn cost(
        &self,
        a: &Region<Self::Attributes>,
        b: &Region<Self::Attributes>,
        shared_boundary: u32,
    ) -> f32;

    /// Folds the attributes of the absorbed region into the surviving one.
    fn update_attributes(&self, survivor: &mut Self::Attributes, absorbed: &Self::Attributes);
}
