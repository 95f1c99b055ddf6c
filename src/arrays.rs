use crate::error::Error;
use aligned_vec::{AVec, ConstAlign};
use rayon::prelude::*;
use std::ops::{Index, IndexMut};

const ALIGN: usize = 64;

/// Row-major 2D raster used for label outputs and scratch grids.
#[derive(Debug, Clone)]
pub struct Array2D<T> {
    pub data: AVec<T, ConstAlign<ALIGN>>,
    pub width: usize,
    pub height: usize,
}

impl<T> Array2D<T> {
    pub fn from_fill(value: T, width: usize, height: usize) -> Self
    where
        T: Clone + Copy,
    {
        let data: AVec<T, ConstAlign<ALIGN>> =
            AVec::from_iter(ALIGN, (0..width * height).map(|_| value));
        Self {
            width,
            height,
            data,
        }
    }

    pub fn get_row(&self, row: usize) -> &[T] {
        debug_assert!(row < self.height);
        &self.data[(self.width * row)..(self.width * row + self.width)]
    }
    #[inline(always)]
    pub fn get_index(&self, x: usize, y: usize) -> usize {
        debug_assert!(self.width > x);
        debug_assert!(self.height > y);
        self.width * y + x
    }
}
impl<T> Index<(usize, usize)> for Array2D<T> {
    type Output = T;
    fn index(&self, (x, y): (usize, usize)) -> &Self::Output {
        &self.data[self.get_index(x, y)]
    }
}
impl<T> IndexMut<(usize, usize)> for Array2D<T> {
    fn index_mut(&mut self, (x, y): (usize, usize)) -> &mut Self::Output {
        let idx = self.get_index(x, y);
        &mut self.data[idx]
    }
}

/// Multi-band image with interleaved `f32` samples, the input of the segmentation.
///
/// Pixel `(x, y)` occupies `bands` consecutive values starting at `(y * width + x) * bands`.
/// The flattened pixel index `y * width + x` is also the id of the initial one-pixel region.
pub struct PixelImage {
    pub data: AVec<f32, ConstAlign<ALIGN>>,
    pub width: usize,
    pub height: usize,
    pub bands: usize,
}

impl PixelImage {
    fn check_shape(width: usize, height: usize, bands: usize, len: usize) -> Result<(), Error> {
        if width == 0 || height == 0 {
            return Err(Error::ZeroDimension { width, height });
        }
        if bands == 0 {
            return Err(Error::NoBands);
        }
        if len != width * height * bands {
            return Err(Error::DimensionMismatch {
                expected: width * height * bands,
                actual: len,
            });
        }
        Ok(())
    }

    /// Checks the shape of an image whose fields were filled directly.
    pub fn validate(&self) -> Result<(), Error> {
        Self::check_shape(self.width, self.height, self.bands, self.data.len())
    }

    pub fn from_interleaved(
        data: &[f32],
        width: usize,
        height: usize,
        bands: usize,
    ) -> Result<Self, Error> {
        Self::check_shape(width, height, bands, data.len())?;
        Ok(Self {
            data: AVec::from_slice(ALIGN, data),
            width,
            height,
            bands,
        })
    }

    /// Converts packed RGB24 (the default layout of the `image` crate) into a 3-band image.
    pub fn from_rgb8(rgb_image: &[u8], width: usize, height: usize) -> Result<Self, Error> {
        Self::check_shape(width, height, 3, rgb_image.len())?;
        let mut data: AVec<f32, ConstAlign<ALIGN>> =
            AVec::from_iter(ALIGN, (0..rgb_image.len()).map(|_| 0f32));
        data.par_chunks_mut(3 * width)
            .zip(rgb_image.par_chunks(3 * width))
            .for_each(|(row_out, row_in)| {
                for (out, value) in row_out.iter_mut().zip(row_in) {
                    *out = *value as f32;
                }
            });
        Ok(Self {
            data,
            width,
            height,
            bands: 3,
        })
    }

    #[inline(always)]
    pub fn num_pixels(&self) -> usize {
        self.width * self.height
    }
    /// Band values of the pixel with flattened index `id`.
    #[inline(always)]
    pub fn pixel(&self, id: usize) -> &[f32] {
        debug_assert!(id < self.num_pixels());
        &self.data[id * self.bands..(id + 1) * self.bands]
    }
}
