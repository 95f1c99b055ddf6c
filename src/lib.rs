//! Region merging image segmentation in Rust.
//!
//! The segmentation starts with one region per pixel and repeatedly fuses adjacent regions whose
//! merge cost, given by a pluggable homogeneity [`criterion::Criterion`], is under a threshold.
//! Region shapes are kept as Freeman chain codes over bounding boxes and the chain code of a
//! merged region is rebuilt from the two input chain codes only.
//!
//! Two candidate selection heuristics are available: Local Mutual Best Fitting (a pair merges
//! when both regions are the cheapest neighbor of each other) and Best Fitting (faster, but
//! dependent on the scan order).
//!
//! The following example segments an image in packed RGB24 (RGB 8bit) format (default for image
//! crate):
//!
//! ```rust
//! use region_merging::arrays::PixelImage;
//! use region_merging::common::*;
//! use region_merging::criteria::Baatz;
//! use region_merging::raster::label_image;
//! use region_merging::segmenter::segment;
//!
//! fn main(){
//!     // Two flat halves
//!     let img = image::RgbImage::from_fn(32, 16, |x, _| {
//!         if x < 16 { image::Rgb([30, 60, 90]) } else { image::Rgb([200, 180, 20]) }
//!     });
//!     let image = PixelImage::from_rgb8(img.as_raw(), 32, 16).unwrap();
//!     // create config with defaults
//!     let mut config = Config::default();
//!     // the Baatz & Schape criterion takes the square of its scale parameter
//!     config.threshold = Baatz::threshold_from_scale(10.0);
//!     let result = segment(&image, &config, &Baatz::default()).unwrap();
//!     assert!(result.complete);
//!     // one label per region, in the order of `result.graph.regions()`
//!     let labels = label_image(&result.graph);
//!     assert_eq!(labels.width, 32);
//! }
//! ```
//!
//! The loop can also be driven by hand with [`segmenter::perform_pass`] on a
//! [`graph::Graph`] built from the criterion attributes.
//!
//! The read-only parts of every pass (cost refresh and best neighbor search) run on the rayon
//! thread pool unless [`common::ThreadingStrategy::SingleThread`] is selected. Merges are always
//! applied sequentially, so both strategies give the same result.
//!
//! Nothing is logged unless the application installs a `log` backend.

pub mod arrays;
pub mod common;
pub mod contour;
pub mod criteria;
pub mod criterion;
pub mod error;
pub mod graph;
pub mod raster;
pub mod segmenter;
