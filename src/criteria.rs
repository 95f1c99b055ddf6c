//! Homogeneity criteria shipped with the crate.
//!
//! All of them work on per-band means of `f32` samples and keep the region area inside their
//! attributes, so merging attributes never needs the graph.
use crate::arrays::PixelImage;
use crate::criterion::Criterion;
use crate::graph::Region;
use multiversion::multiversion;
use rayon::prelude::*;

#[multiversion(targets = "simd")]
fn squared_distance(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len());
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

#[inline(always)]
fn weighted_mean(m1: f32, a1: f32, m2: f32, a2: f32) -> f32 {
    (a1 * m1 + a2 * m2) / (a1 + a2)
}

/// Area and per-band mean of a region.
#[derive(Debug, Clone, PartialEq)]
pub struct MeanAttributes {
    pub area: u32,
    pub means: Vec<f32>,
}

impl MeanAttributes {
    fn from_image(image: &PixelImage) -> Vec<Self> {
        (0..image.num_pixels())
            .into_par_iter()
            .map(|id| MeanAttributes {
                area: 1,
                means: image.pixel(id).to_vec(),
            })
            .collect()
    }

    fn absorb(&mut self, other: &MeanAttributes) {
        let (a1, a2) = (self.area as f32, other.area as f32);
        for (m1, m2) in self.means.iter_mut().zip(&other.means) {
            *m1 = weighted_mean(*m1, a1, *m2, a2);
        }
        self.area += other.area;
    }
}

/// Euclidean distance between the band means (the "spring" criterion).
#[derive(Debug, Clone, Copy, Default)]
pub struct EuclideanDistance;

impl Criterion for EuclideanDistance {
    type Attributes = MeanAttributes;

    fn init_from_image(&self, image: &PixelImage) -> Vec<MeanAttributes> {
        MeanAttributes::from_image(image)
    }

    fn cost(&self, a: &Region<MeanAttributes>, b: &Region<MeanAttributes>, _: u32) -> f32 {
        squared_distance(&a.attributes.means, &b.attributes.means).sqrt()
    }

    fn update_attributes(&self, survivor: &mut MeanAttributes, absorbed: &MeanAttributes) {
        survivor.absorb(absorbed);
    }
}

/// Full Lambda Schedule: squared mean distance weighted by the harmonic area term and divided by
/// the length of the shared border.
#[derive(Debug, Clone, Copy, Default)]
pub struct FullLambdaSchedule;

impl Criterion for FullLambdaSchedule {
    type Attributes = MeanAttributes;

    fn init_from_image(&self, image: &PixelImage) -> Vec<MeanAttributes> {
        MeanAttributes::from_image(image)
    }

    fn cost(
        &self,
        a: &Region<MeanAttributes>,
        b: &Region<MeanAttributes>,
        shared_boundary: u32,
    ) -> f32 {
        debug_assert!(shared_boundary > 0);
        let (a1, a2) = (a.attributes.area as f32, b.attributes.area as f32);
        let distance = squared_distance(&a.attributes.means, &b.attributes.means);
        (a1 * a2 / (a1 + a2)) * distance / shared_boundary as f32
    }

    fn update_attributes(&self, survivor: &mut MeanAttributes, absorbed: &MeanAttributes) {
        survivor.absorb(absorbed);
    }
}

/// Per-band statistics needed by [`Baatz`].
#[derive(Debug, Clone, PartialEq)]
pub struct BaatzAttributes {
    pub area: u32,
    pub means: Vec<f32>,
    pub sums: Vec<f32>,
    pub squared_sums: Vec<f32>,
    pub std_devs: Vec<f32>,
}

/// Standard deviation of a band from its running sums and the merged mean.
#[inline(always)]
fn std_dev(squared_sum: f32, sum: f32, mean: f32, area: f32) -> f32 {
    ((squared_sum - 2f32 * mean * sum + area * mean * mean) / area)
        .max(0f32)
        .sqrt()
}

/// Baatz & Schape heterogeneity increase.
///
/// Mixes a spectral term (area weighted increase of the band standard deviations) with a shape
/// term itself mixing compactness and smoothness.
#[derive(Debug, Clone, Copy)]
pub struct Baatz {
    /// Weight of the spectral term, in `[0, 1]`. The shape term gets `1 - spectral_weight`.
    pub spectral_weight: f32,
    /// Weight of compactness inside the shape term, in `[0, 1]`. Smoothness gets the rest.
    pub shape_weight: f32,
}

impl Default for Baatz {
    fn default() -> Self {
        Self {
            spectral_weight: 0.7,
            shape_weight: 0.5,
        }
    }
}

impl Baatz {
    /// Merge threshold matching a Baatz scale parameter.
    pub fn threshold_from_scale(scale: f32) -> f32 {
        scale * scale
    }
}

impl Criterion for Baatz {
    type Attributes = BaatzAttributes;

    fn init_from_image(&self, image: &PixelImage) -> Vec<BaatzAttributes> {
        (0..image.num_pixels())
            .into_par_iter()
            .map(|id| {
                let pixel = image.pixel(id);
                BaatzAttributes {
                    area: 1,
                    means: pixel.to_vec(),
                    sums: pixel.to_vec(),
                    squared_sums: pixel.iter().map(|v| v * v).collect(),
                    std_devs: vec![0f32; pixel.len()],
                }
            })
            .collect()
    }

    fn cost(
        &self,
        a: &Region<BaatzAttributes>,
        b: &Region<BaatzAttributes>,
        shared_boundary: u32,
    ) -> f32 {
        let (attr1, attr2) = (&a.attributes, &b.attributes);
        let a1 = attr1.area as f32;
        let a2 = attr2.area as f32;
        let a3 = a1 + a2;

        let mut spectral = 0f32;
        for band in 0..attr1.means.len() {
            let mean = weighted_mean(attr1.means[band], a1, attr2.means[band], a2);
            let sum = attr1.sums[band] + attr2.sums[band];
            let squared_sum = attr1.squared_sums[band] + attr2.squared_sums[band];
            let std3 = std_dev(squared_sum, sum, mean, a3);
            spectral += a3 * std3 - a1 * attr1.std_devs[band] - a2 * attr2.std_devs[band];
        }

        let p1 = a.perimeter as f32;
        let p2 = b.perimeter as f32;
        let p3 = p1 + p2 - 2f32 * shared_boundary as f32;
        let bbp1 = a.bbox.perimeter() as f32;
        let bbp2 = b.bbox.perimeter() as f32;
        let bbp3 = a.bbox.union(&b.bbox).perimeter() as f32;

        let compactness = a3 * p3 / a3.sqrt() - (a1 * p1 / a1.sqrt() + a2 * p2 / a2.sqrt());
        let smoothness = a3 * p3 / bbp3 - (a1 * p1 / bbp1 + a2 * p2 / bbp2);
        let shape = self.shape_weight * compactness + (1f32 - self.shape_weight) * smoothness;

        self.spectral_weight * spectral + (1f32 - self.spectral_weight) * shape
    }

    fn update_attributes(&self, survivor: &mut BaatzAttributes, absorbed: &BaatzAttributes) {
        let (a1, a2) = (survivor.area as f32, absorbed.area as f32);
        let a3 = a1 + a2;
        for band in 0..survivor.means.len() {
            let mean = weighted_mean(survivor.means[band], a1, absorbed.means[band], a2);
            survivor.means[band] = mean;
            survivor.sums[band] += absorbed.sums[band];
            survivor.squared_sums[band] += absorbed.squared_sums[band];
            survivor.std_devs[band] =
                std_dev(survivor.squared_sums[band], survivor.sums[band], mean, a3);
        }
        survivor.area += absorbed.area;
    }
}
