use image::GrayImage;
use crate::{
    error::{Result, TrackerError},
    traits::FramePreprocessor,
    types::{Frame, KernelSize},
};

/// Unweighted mean filter applied to each color channel
#[derive(Debug, Clone)]
pub struct BoxBlurPreprocessor {
    x_radius: u32,
    y_radius: u32,
}

impl BoxBlurPreprocessor {
    /// Kernel sides must be odd so the window is centred on the pixel
    pub fn new(kernel: KernelSize) -> Result<Self> {
        if kernel.width % 2 == 0 || kernel.height % 2 == 0 {
            return Err(TrackerError::InvalidConfig(format!(
                "blur kernel sides must be odd, got {}x{}",
                kernel.width, kernel.height
            )));
        }
        Ok(Self {
            x_radius: kernel.width / 2,
            y_radius: kernel.height / 2,
        })
    }
}

impl Default for BoxBlurPreprocessor {
    fn default() -> Self {
        Self { x_radius: 3, y_radius: 3 }
    }
}

impl FramePreprocessor for BoxBlurPreprocessor {
    fn smooth(&self, frame: &Frame) -> Result<Frame> {
        // imageproc truncates after each 1-D pass, so values can land one or two
        // levels under the rounded 2-D mean. The segmentation bounds tolerate it.
        let blurred = split_channels(frame)
            .map(|channel| imageproc::filter::box_filter(&channel, self.x_radius, self.y_radius));
        Ok(merge_channels(&blurred))
    }
}

fn split_channels(frame: &Frame) -> [GrayImage; 3] {
    let (width, height) = frame.dimensions();
    let mut channels = [(); 3].map(|_| GrayImage::new(width, height));
    for (c, channel) in channels.iter_mut().enumerate() {
        for (dst, src) in channel.iter_mut().zip(frame.as_raw().chunks_exact(3)) {
            *dst = src[c];
        }
    }
    channels
}

fn merge_channels([red, green, blue]: &[GrayImage; 3]) -> Frame {
    let (width, height) = red.dimensions();
    let mut frame = Frame::new(width, height);
    let sources = red.iter().zip(green.iter()).zip(blue.iter());
    for (dst, ((r, g), b)) in frame.chunks_exact_mut(3).zip(sources) {
        dst.copy_from_slice(&[*r, *g, *b]);
    }
    frame
}
