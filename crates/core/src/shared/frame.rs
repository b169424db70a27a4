use ndarray::ArrayView3;

use crate::shared::region::Region;

/// A single captured frame: contiguous RGB bytes in row-major order.
///
/// `index` counts frames from the moment the source was opened. Pixel
/// format conversion happens at the capture boundary only.
#[derive(Clone, Debug)]
pub struct Frame {
    data: Vec<u8>,
    width: u32,
    height: u32,
    channels: u8,
    index: usize,
}

impl Frame {
    pub fn new(data: Vec<u8>, width: u32, height: u32, channels: u8, index: usize) -> Self {
        debug_assert_eq!(
            data.len(),
            (width as usize) * (height as usize) * (channels as usize),
            "data length must equal width * height * channels"
        );
        Self {
            data,
            width,
            height,
            channels,
            index,
        }
    }

    /// A frame filled with a single RGB colour.
    pub fn filled(width: u32, height: u32, rgb: [u8; 3], index: usize) -> Self {
        let data = rgb
            .iter()
            .copied()
            .cycle()
            .take(width as usize * height as usize * 3)
            .collect();
        Self::new(data, width, height, 3, index)
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn channels(&self) -> u8 {
        self.channels
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn as_ndarray(&self) -> ArrayView3<'_, u8> {
        ArrayView3::from_shape(self.shape(), &self.data)
            .expect("Frame data length must match dimensions")
    }

    /// RGB value at `(x, y)`, or `None` outside the frame.
    pub fn pixel(&self, x: i64, y: i64) -> Option<[u8; 3]> {
        let offset = self.offset(x, y)?;
        Some([
            self.data[offset],
            self.data[offset + 1],
            self.data[offset + 2],
        ])
    }

    /// Writes an RGB value at `(x, y)`. Out-of-bounds writes are ignored so
    /// overlays can run off the frame edge.
    pub fn put_pixel(&mut self, x: i64, y: i64, rgb: [u8; 3]) {
        if let Some(offset) = self.offset(x, y) {
            self.data[offset..offset + 3].copy_from_slice(&rgb);
        }
    }

    /// Copies the part of `region` that lies inside the frame into a new frame.
    ///
    /// Returns `None` when the region does not overlap the frame.
    pub fn crop(&self, region: &Region) -> Option<Frame> {
        let clamped = region.clamp_to(self.width, self.height)?;
        let channels = self.channels as usize;
        let fw = self.width as usize;
        let (cx, cy) = (clamped.x as usize, clamped.y as usize);
        let (cw, ch) = (clamped.width as usize, clamped.height as usize);

        let mut data = Vec::with_capacity(cw * ch * channels);
        for row in cy..cy + ch {
            let start = (row * fw + cx) * channels;
            data.extend_from_slice(&self.data[start..start + cw * channels]);
        }
        Some(Frame::new(
            data,
            cw as u32,
            ch as u32,
            self.channels,
            self.index,
        ))
    }

    fn offset(&self, x: i64, y: i64) -> Option<usize> {
        if self.channels < 3 || x < 0 || y < 0 || x >= self.width as i64 || y >= self.height as i64
        {
            return None;
        }
        Some((y as usize * self.width as usize + x as usize) * self.channels as usize)
    }

    fn shape(&self) -> (usize, usize, usize) {
        (
            self.height as usize,
            self.width as usize,
            self.channels as usize,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn region(x: i32, y: i32, w: i32, h: i32) -> Region {
        Region::new(x, y, w, h, 1.0)
    }

    #[test]
    fn test_construction_and_accessors() {
        let data = vec![0u8; 12]; // 2x2x3
        let frame = Frame::new(data.clone(), 2, 2, 3, 5);
        assert_eq!(frame.width(), 2);
        assert_eq!(frame.height(), 2);
        assert_eq!(frame.channels(), 3);
        assert_eq!(frame.index(), 5);
        assert_eq!(frame.data(), &data[..]);
    }

    #[test]
    #[should_panic(expected = "data length must equal width * height * channels")]
    fn test_mismatched_data_length_panics_in_debug() {
        Frame::new(vec![0u8; 10], 2, 2, 3, 0);
    }

    #[test]
    fn test_filled_repeats_colour() {
        let frame = Frame::filled(3, 2, [10, 20, 30], 0);
        assert_eq!(frame.data().len(), 18);
        assert_eq!(frame.pixel(2, 1), Some([10, 20, 30]));
    }

    #[test]
    fn test_as_ndarray_shape() {
        let frame = Frame::new(vec![0u8; 24], 4, 2, 3, 0);
        assert_eq!(frame.as_ndarray().shape(), &[2, 4, 3]);
    }

    #[test]
    fn test_put_pixel_then_read_back() {
        let mut frame = Frame::filled(4, 4, [0, 0, 0], 0);
        frame.put_pixel(1, 2, [255, 0, 0]);
        assert_eq!(frame.pixel(1, 2), Some([255, 0, 0]));
        assert_eq!(frame.as_ndarray()[[2, 1, 0]], 255);
    }

    #[test]
    fn test_put_pixel_out_of_bounds_is_ignored() {
        let mut frame = Frame::filled(2, 2, [1, 1, 1], 0);
        frame.put_pixel(-1, 0, [9, 9, 9]);
        frame.put_pixel(0, 2, [9, 9, 9]);
        assert!(frame.data().iter().all(|&v| v == 1));
        assert_eq!(frame.pixel(5, 5), None);
    }

    #[test]
    fn test_crop_copies_region_pixels() {
        let mut frame = Frame::filled(10, 10, [0, 0, 0], 7);
        frame.put_pixel(3, 4, [200, 100, 50]);
        let crop = frame.crop(&region(2, 3, 4, 4)).unwrap();
        assert_eq!(crop.width(), 4);
        assert_eq!(crop.height(), 4);
        assert_eq!(crop.index(), 7);
        assert_eq!(crop.pixel(1, 1), Some([200, 100, 50]));
    }

    #[test]
    fn test_crop_clamps_to_frame_edges() {
        let frame = Frame::filled(10, 10, [5, 5, 5], 0);
        let crop = frame.crop(&region(-5, 8, 10, 10)).unwrap();
        assert_eq!(crop.width(), 5);
        assert_eq!(crop.height(), 2);
    }

    #[test]
    fn test_crop_outside_frame_is_none() {
        let frame = Frame::filled(10, 10, [5, 5, 5], 0);
        assert!(frame.crop(&region(20, 20, 5, 5)).is_none());
    }
}
