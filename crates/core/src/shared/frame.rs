use ndarray::ArrayView3;

use crate::shared::geometry::Rect;

/// A decoded image: contiguous RGB8 bytes in row-major order.
///
/// Format conversion happens at the input boundary only; everything past
/// `ImageSource::decode` treats pixels as opaque RGB.
#[derive(Clone, Debug)]
pub struct Frame {
    data: Vec<u8>,
    width: u32,
    height: u32,
}

const CHANNELS: usize = 3;

impl Frame {
    pub fn new(data: Vec<u8>, width: u32, height: u32) -> Self {
        debug_assert_eq!(
            data.len(),
            (width as usize) * (height as usize) * CHANNELS,
            "data length must equal width * height * 3"
        );
        Self {
            data,
            width,
            height,
        }
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

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn as_ndarray(&self) -> ArrayView3<'_, u8> {
        ArrayView3::from_shape(
            (self.height as usize, self.width as usize, CHANNELS),
            &self.data,
        )
        .expect("Frame data length must match dimensions")
    }

    /// Copy of the pixels inside `rect`, clamped to the frame bounds.
    ///
    /// A rect entirely outside the frame yields an empty (0x0) frame.
    pub fn crop(&self, rect: Rect) -> Frame {
        let r = rect.clamped_to(self.width, self.height);
        let (w, h) = (r.width() as usize, r.height() as usize);
        if w == 0 || h == 0 {
            return Frame::new(Vec::new(), 0, 0);
        }

        let mut data = Vec::with_capacity(w * h * CHANNELS);
        let src_stride = self.width as usize * CHANNELS;
        for row in r.y0 as usize..r.y1 as usize {
            let start = row * src_stride + r.x0 as usize * CHANNELS;
            data.extend_from_slice(&self.data[start..start + w * CHANNELS]);
        }
        Frame::new(data, w as u32, h as u32)
    }
}
