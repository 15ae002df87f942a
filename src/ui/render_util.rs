use super::{Arc, ImageBuffer, ImageFrame, RenderImage, Rgba};
use crate::pipeline::canvas::RasterCanvas;

pub(super) fn canvas_to_image(canvas: &RasterCanvas) -> Option<Arc<RenderImage>> {
    let source = canvas.image();
    let mut bgra = source.as_raw().clone();

    // GPUI expects BGRA; convert in place to avoid the async asset pipeline and flicker.
    for px in bgra.chunks_exact_mut(4) {
        px.swap(0, 2);
    }

    let buffer = ImageBuffer::<Rgba<u8>, Vec<u8>>::from_raw(source.width(), source.height(), bgra)?;
    let frame = ImageFrame::new(buffer);

    Some(Arc::new(RenderImage::new(vec![frame])))
}
