//! Freeman chain-code contours addressed through bounding boxes.
//!
//! A contour starts at the first pixel of its region (lowest row, then lowest column) and follows
//! the outer boundary with the region on the mover's right. Every move is one unit edge of the
//! pixel grid, so a hole-free region has exactly `perimeter` moves.
use crate::arrays::Array2D;
use crate::error::{Error, InvariantViolation};
use assume::assume;
use hashbrown::HashSet;

/// Unit move of a chain code. The discriminant is the stored 2-bit symbol.
#[derive(Clone, PartialEq, Eq, Debug, Copy, Hash)]
#[repr(u8)]
pub enum Move {
    Up = 0,
    Right = 1,
    Down = 2,
    Left = 3,
}

impl Move {
    #[inline(always)]
    pub fn from_bits(bits: u8) -> Self {
        match bits & 0b11 {
            0 => Move::Up,
            1 => Move::Right,
            2 => Move::Down,
            _ => Move::Left,
        }
    }
    #[inline(always)]
    pub fn turn_left(self) -> Self {
        Move::from_bits(self as u8 + 3)
    }
    #[inline(always)]
    pub fn turn_right(self) -> Self {
        Move::from_bits(self as u8 + 1)
    }
    /// Cell offset `(dx, dy)` with `y` growing downwards.
    #[inline(always)]
    pub fn offset(self) -> (isize, isize) {
        match self {
            Move::Up => (0, -1),
            Move::Right => (1, 0),
            Move::Down => (0, 1),
            Move::Left => (-1, 0),
        }
    }
}

/// Chain code packed four moves per byte.
#[derive(Clone, PartialEq, Eq, Debug, Default)]
pub struct Contour {
    bits: Vec<u8>,
    len: usize,
}

impl Contour {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn with_capacity(moves: usize) -> Self {
        Self {
            bits: Vec::with_capacity((moves + 3) / 4),
            len: 0,
        }
    }
    pub fn push(&mut self, mv: Move) {
        let shift = (self.len % 4) * 2;
        if shift == 0 {
            self.bits.push(0);
        }
        if let Some(byte) = self.bits.last_mut() {
            *byte |= (mv as u8) << shift;
        }
        self.len += 1;
    }
    #[inline(always)]
    pub fn len(&self) -> usize {
        self.len
    }
    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
    pub fn iter(&self) -> impl Iterator<Item = Move> + '_ {
        (0..self.len).map(move |idx| Move::from_bits(self.bits[idx / 4] >> ((idx % 4) * 2)))
    }
    /// Contour of a region made of one pixel.
    pub fn single_pixel() -> Self {
        [Move::Right, Move::Down, Move::Left, Move::Up]
            .into_iter()
            .collect()
    }
}

impl FromIterator<Move> for Contour {
    fn from_iter<I: IntoIterator<Item = Move>>(iter: I) -> Self {
        let iter = iter.into_iter();
        let mut contour = Contour::with_capacity(iter.size_hint().0);
        for mv in iter {
            contour.push(mv);
        }
        contour
    }
}

/// Axis-aligned box in image coordinates, inclusive of `(x, y)`, `width` and `height` in pixels.
#[derive(Clone, PartialEq, Eq, Debug, Copy)]
pub struct BoundingBox {
    pub x: usize,
    pub y: usize,
    pub width: usize,
    pub height: usize,
}

impl BoundingBox {
    pub fn from_pixel(pixel: usize, image_width: usize) -> Self {
        Self {
            x: pixel % image_width,
            y: pixel / image_width,
            width: 1,
            height: 1,
        }
    }
    pub fn union(&self, other: &BoundingBox) -> BoundingBox {
        let x = self.x.min(other.x);
        let y = self.y.min(other.y);
        let right = (self.x + self.width).max(other.x + other.width);
        let bottom = (self.y + self.height).max(other.y + other.height);
        BoundingBox {
            x,
            y,
            width: right - x,
            height: bottom - y,
        }
    }
    #[inline(always)]
    pub fn area(&self) -> usize {
        self.width * self.height
    }
    /// Perimeter of the box itself, `2 * (width + height)`.
    #[inline(always)]
    pub fn perimeter(&self) -> usize {
        2 * (self.width + self.height)
    }
    /// Coordinates of an image pixel relative to the box origin.
    #[inline(always)]
    fn local(&self, pixel: usize, image_width: usize) -> (isize, isize) {
        (
            (pixel % image_width) as isize - self.x as isize,
            (pixel / image_width) as isize - self.y as isize,
        )
    }
}

/// Walks the cells crossed by `contour` starting at `start`, calling `visit` on each of them.
///
/// The cell under the mover only changes on a straight move (one step) or a left turn (one
/// diagonal step). Right turns happen in place.
fn walk_border<F>(contour: &Contour, start: (isize, isize), mut visit: F)
where
    F: FnMut(isize, isize),
{
    let (mut x, mut y) = start;
    visit(x, y);
    let mut moves = contour.iter();
    let Some(mut prev) = moves.next() else {
        return;
    };
    for mv in moves {
        if mv == prev {
            let (dx, dy) = mv.offset();
            x += dx;
            y += dy;
            visit(x, y);
        } else if mv == prev.turn_left() {
            let (px, py) = prev.offset();
            let (dx, dy) = mv.offset();
            x += px + dx;
            y += py + dy;
            visit(x, y);
        } else {
            debug_assert_eq!(mv, prev.turn_right(), "reversal in chain code");
        }
        prev = mv;
    }
}

/// Image pixels lying on the boundary traced by `contour`. May repeat pixels.
pub fn border_cells(contour: &Contour, first_pixel: usize, image_width: usize) -> Vec<usize> {
    let mut cells = Vec::with_capacity(contour.len());
    let start = (
        (first_pixel % image_width) as isize,
        (first_pixel / image_width) as isize,
    );
    walk_border(contour, start, |x, y| {
        cells.push(y as usize * image_width + x as usize)
    });
    cells
}

/// Follows the outer boundary of the cells for which `is_set` holds, starting at the first cell
/// of the shape heading right.
///
/// At every corner the diagonal cell ahead-left is tried first, then the cell straight ahead,
/// otherwise the mover turns right in place. The walk closes when it is back on the start cell
/// heading up with nothing to its left, since the next move would repeat the first one.
fn trace<F>(
    is_set: F,
    start: (isize, isize),
    start_index: usize,
    limit: usize,
) -> Result<Contour, Error>
where
    F: Fn(isize, isize) -> bool,
{
    let mut contour = Contour::new();
    let (mut x, mut y) = start;
    let mut heading = Move::Right;
    contour.push(heading);
    loop {
        if contour.len() > limit {
            return Err(InvariantViolation::UnclosedContour {
                start: start_index,
                limit,
            }
            .into());
        }
        let left = heading.turn_left();
        let (hx, hy) = heading.offset();
        let (lx, ly) = left.offset();
        if is_set(x + hx + lx, y + hy + ly) {
            x += hx + lx;
            y += hy + ly;
            heading = left;
            contour.push(heading);
        } else if is_set(x + hx, y + hy) {
            x += hx;
            y += hy;
            contour.push(heading);
        } else if heading == Move::Up && (x, y) == start {
            break;
        } else {
            heading = heading.turn_right();
            contour.push(heading);
        }
    }
    Ok(contour)
}

#[inline(always)]
fn trace_limit(bbox: &BoundingBox) -> usize {
    2 * (bbox.width + 1) * (bbox.height + 1) + 4
}

/// Contour of the union of two adjacent regions.
///
/// `merged` must be the union of both bounding boxes. Only the border cells of the inputs are
/// consulted, the interiors are never visited. The result starts at `min(first1, first2)`.
pub fn merge_contours(
    contour1: &Contour,
    first1: usize,
    contour2: &Contour,
    first2: usize,
    merged: &BoundingBox,
    image_width: usize,
) -> Result<Contour, Error> {
    let width = merged.width as isize;
    let height = merged.height as isize;
    let mut cells: HashSet<isize> = HashSet::with_capacity(contour1.len() + contour2.len());
    walk_border(contour1, merged.local(first1, image_width), |x, y| {
        cells.insert(y * width + x);
    });
    walk_border(contour2, merged.local(first2, image_width), |x, y| {
        cells.insert(y * width + x);
    });

    let first = first1.min(first2);
    let start = merged.local(first, image_width);
    trace(
        |x, y| x >= 0 && y >= 0 && x < width && y < height && cells.contains(&(y * width + x)),
        start,
        first,
        trace_limit(merged),
    )
}

/// Encodes the region containing the lowest pixel of `pixels`.
///
/// Returns the first pixel, the bounding box of the whole set and the contour traced from the
/// first pixel. Pixels not 4-connected to the first one widen the box but are not traced.
pub fn encode_pixels(
    pixels: &[usize],
    image_width: usize,
) -> Result<(usize, BoundingBox, Contour), Error> {
    let Some(&first) = pixels.iter().min() else {
        return Err(Error::EmptyPixelSet);
    };
    let bbox = pixels
        .iter()
        .map(|&p| BoundingBox::from_pixel(p, image_width))
        .fold(BoundingBox::from_pixel(first, image_width), |acc, b| {
            acc.union(&b)
        });
    let mut grid = Array2D::from_fill(0u8, bbox.width, bbox.height);
    for &p in pixels {
        let (x, y) = bbox.local(p, image_width);
        grid[(x as usize, y as usize)] = 1;
    }
    let width = bbox.width as isize;
    let height = bbox.height as isize;
    let contour = trace(
        |x, y| x >= 0 && y >= 0 && x < width && y < height && grid[(x as usize, y as usize)] != 0,
        bbox.local(first, image_width),
        first,
        trace_limit(&bbox),
    )?;
    Ok((first, bbox, contour))
}

const OUTSIDE: u8 = 2;
const BORDER: u8 = 1;

/// Enumerates the pixels of a region from its contour and bounding box, in raster order.
///
/// Border cells are marked on a grid with a one cell frame around the box, the exterior is
/// flooded from the frame, and every remaining cell of the box is returned. Cells enclosed by
/// the contour are returned even when they belong to another region.
pub fn region_pixels(
    first_pixel: usize,
    bbox: &BoundingBox,
    contour: &Contour,
    image_width: usize,
) -> Vec<usize> {
    let grid_width = bbox.width + 2;
    let grid_height = bbox.height + 2;
    let mut grid = Array2D::from_fill(0u8, grid_width, grid_height);
    let (sx, sy) = bbox.local(first_pixel, image_width);
    walk_border(contour, (sx + 1, sy + 1), |x, y| {
        grid[(x as usize, y as usize)] = BORDER;
    });

    let len = grid.data.len();
    let mut stack = vec![0usize];
    grid.data[0] = OUTSIDE;
    while let Some(idx) = stack.pop() {
        let (x, y) = (idx % grid_width, idx / grid_width);
        let mut try_push = |next: usize| {
            assume!(unsafe: next < len);
            if grid.data[next] == 0 {
                grid.data[next] = OUTSIDE;
                stack.push(next);
            }
        };
        if x > 0 {
            try_push(idx - 1);
        }
        if x + 1 < grid_width {
            try_push(idx + 1);
        }
        if y > 0 {
            try_push(idx - grid_width);
        }
        if y + 1 < grid_height {
            try_push(idx + grid_width);
        }
    }

    let mut pixels = Vec::new();
    for y in 0..bbox.height {
        let row = grid.get_row(y + 1);
        for x in 0..bbox.width {
            if row[x + 1] != OUTSIDE {
                pixels.push((bbox.y + y) * image_width + bbox.x + x);
            }
        }
    }
    pixels
}

#[cfg(test)]
mod tests {
    use super::{
        border_cells, encode_pixels, merge_contours, region_pixels, BoundingBox, Contour, Move,
    };
    use Move::*;

    const W: usize = 8;

    fn px(x: usize, y: usize) -> usize {
        y * W + x
    }

    fn sorted(mut v: Vec<usize>) -> Vec<usize> {
        v.sort_unstable();
        v.dedup();
        v
    }

    #[test]
    fn move_turns() {
        assert_eq!(Up.turn_left(), Left);
        assert_eq!(Left.turn_right(), Up);
        assert_eq!(Down.turn_right(), Left);
        assert_eq!(Right.turn_left(), Up);
        for bits in 0..4u8 {
            assert_eq!(Move::from_bits(bits) as u8, bits);
        }
    }

    #[test]
    fn contour_packing() {
        let moves = [Right, Right, Down, Left, Left, Up, Up, Down, Right];
        let contour: Contour = moves.iter().copied().collect();
        assert_eq!(contour.len(), moves.len());
        assert_eq!(contour.iter().collect::<Vec<_>>(), moves);
        assert!(Contour::new().is_empty());
    }

    #[test]
    fn single_pixel_contour() {
        let (first, bbox, contour) = encode_pixels(&[px(3, 2)], W).unwrap();
        assert_eq!(first, px(3, 2));
        assert_eq!(bbox.area(), 1);
        assert_eq!(contour, Contour::single_pixel());
        assert_eq!(sorted(border_cells(&contour, first, W)), vec![px(3, 2)]);
        assert_eq!(region_pixels(first, &bbox, &contour, W), vec![px(3, 2)]);
    }

    #[test]
    fn l_shape_round_trip() {
        let shape = vec![px(0, 0), px(0, 1), px(0, 2), px(1, 2), px(2, 2)];
        let (first, bbox, contour) = encode_pixels(&shape, W).unwrap();
        assert_eq!(first, px(0, 0));
        assert_eq!(
            bbox,
            BoundingBox {
                x: 0,
                y: 0,
                width: 3,
                height: 3
            }
        );
        assert_eq!(
            contour.iter().collect::<Vec<_>>(),
            vec![Right, Down, Down, Right, Right, Down, Left, Left, Left, Up, Up, Up]
        );
        assert_eq!(contour.len(), 12);
        assert_eq!(sorted(border_cells(&contour, first, W)), sorted(shape.clone()));
        assert_eq!(region_pixels(first, &bbox, &contour, W), sorted(shape));
    }

    #[test]
    fn merge_two_pixels() {
        let a = BoundingBox::from_pixel(px(1, 1), W);
        let b = BoundingBox::from_pixel(px(2, 1), W);
        let merged = a.union(&b);
        let single = Contour::single_pixel();
        let contour = merge_contours(&single, px(2, 1), &single, px(1, 1), &merged, W).unwrap();
        assert_eq!(
            contour.iter().collect::<Vec<_>>(),
            vec![Right, Right, Down, Left, Left, Up]
        );
    }

    fn check_merge(part1: &[usize], part2: &[usize]) {
        let (first1, bbox1, contour1) = encode_pixels(part1, W).unwrap();
        let (first2, bbox2, contour2) = encode_pixels(part2, W).unwrap();
        let merged = bbox1.union(&bbox2);
        let contour = merge_contours(&contour1, first1, &contour2, first2, &merged, W).unwrap();

        let whole: Vec<usize> = part1.iter().chain(part2).copied().collect();
        let (first, bbox, expected) = encode_pixels(&whole, W).unwrap();
        assert_eq!(bbox, merged);
        assert_eq!(contour, expected);
        assert_eq!(region_pixels(first, &bbox, &contour, W), sorted(whole));
    }

    #[test]
    fn merge_matches_direct_encoding() {
        // L-shape from a bar and a foot.
        check_merge(&[px(0, 0), px(0, 1), px(0, 2)], &[px(1, 2), px(2, 2)]);
        // U-shape with the concavity between the parts.
        check_merge(&[px(0, 0), px(0, 1)], &[px(1, 1), px(2, 1), px(2, 0)]);
        // Second part starts before the first one.
        check_merge(&[px(3, 1), px(3, 2), px(2, 2)], &[px(4, 0), px(4, 1)]);
        // Second part wraps around the first one.
        check_merge(
            &[px(1, 0), px(1, 1), px(2, 1)],
            &[px(0, 1), px(0, 2), px(1, 2), px(2, 2), px(3, 2), px(3, 1)],
        );
    }

    #[test]
    fn ring_keeps_outer_contour() {
        let ring: Vec<usize> = (0..3)
            .flat_map(|y| (0..3).map(move |x| px(x + 2, y + 1)))
            .filter(|&p| p != px(3, 2))
            .collect();
        let (first, bbox, contour) = encode_pixels(&ring, W).unwrap();
        assert_eq!(contour.len(), 12);
        assert_eq!(sorted(border_cells(&contour, first, W)), sorted(ring));
        // the hole is reported as enclosed
        assert_eq!(region_pixels(first, &bbox, &contour, W).len(), 9);
    }

    #[test]
    fn empty_pixel_set_is_rejected() {
        assert!(encode_pixels(&[], W).is_err());
    }
}
