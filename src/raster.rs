use crate::arrays::Array2D;
use crate::graph::Graph;

/// Label raster of the graph: pixel value is the position of its region in `graph.regions()`.
///
/// Regions are painted from the largest bounding box down, so a region lying in the hole of
/// another one overwrites the enclosed cells reported by the enclosing contour.
pub fn label_image<A>(graph: &Graph<A>) -> Array2D<u32> {
    let width = graph.width();
    let mut labels = Array2D::from_fill(0u32, width, graph.height());
    let mut order: Vec<usize> = (0..graph.len()).collect();
    order.sort_by_key(|&pos| std::cmp::Reverse(graph.regions()[pos].bbox.area()));
    for pos in order {
        for pixel in graph.regions()[pos].pixels(width) {
            labels.data[pixel] = pos as u32;
        }
    }
    labels
}

#[cfg(test)]
mod tests {
    use super::label_image;
    use crate::arrays::PixelImage;
    use crate::common::Config;
    use crate::criteria::EuclideanDistance;
    use crate::segmenter::segment;

    #[test]
    fn labels_of_quadrants() {
        let img = image::RgbImage::from_fn(6, 4, |x, y| {
            if (x < 3) == (y < 2) {
                image::Rgb([0, 0, 0])
            } else {
                image::Rgb([255, 255, 255])
            }
        });
        let image = PixelImage::from_rgb8(img.as_raw(), 6, 4).unwrap();
        let config = Config {
            threshold: 1.0,
            ..Config::default()
        };
        let result = segment(&image, &config, &EuclideanDistance).unwrap();
        assert_eq!(result.graph.len(), 4);
        let labels = label_image(&result.graph);
        assert_eq!(labels.get_row(0), &[0, 0, 0, 1, 1, 1]);
        assert_eq!(labels.get_row(1), &[0, 0, 0, 1, 1, 1]);
        assert_eq!(labels.get_row(2), &[2, 2, 2, 3, 3, 3]);
        assert_eq!(labels.get_row(3), &[2, 2, 2, 3, 3, 3]);
    }

    #[test]
    fn region_inside_a_hole_keeps_its_label() {
        let mut values = [0f32; 9];
        values[4] = 100.0;
        let image = PixelImage::from_interleaved(&values, 3, 3, 1).unwrap();
        let config = Config {
            threshold: 1.0,
            ..Config::default()
        };
        let result = segment(&image, &config, &EuclideanDistance).unwrap();
        let regions = result.graph.regions();
        assert_eq!(regions.len(), 2);

        let ring = &regions[0];
        assert_eq!(ring.area, 8);
        // the hole border counts in the perimeter but is not traced
        assert_eq!(ring.perimeter, 16);
        assert_eq!(ring.contour.len(), 12);
        assert_eq!(ring.find_edge(4).unwrap().boundary, 4);

        let labels = label_image(&result.graph);
        assert_eq!(labels.get_row(0), &[0, 0, 0]);
        assert_eq!(labels.get_row(1), &[0, 1, 0]);
        assert_eq!(labels.get_row(2), &[0, 0, 0]);
    }
}
