// THEORY:
// Camera collaborators hand the engine raw, tightly packed byte buffers. The
// perception collaborators, on the other hand, expect a typed `image::RgbImage`.
// These helpers are the bridge: they validate the buffer length against the
// declared dimensions and repack the channels, returning `None` for a buffer
// that cannot possibly describe a frame of that size.

pub mod image_helper {
    use image::RgbImage;

    /// Repacks an RGBA buffer (4 bytes per pixel) into an RGB image.
    pub fn rgb_from_rgba(width: u32, height: u32, buffer: &[u8]) -> Option<RgbImage> {
        repack(width, height, buffer, 4, |px| [px[0], px[1], px[2]])
    }

    /// Repacks a BGR buffer (3 bytes per pixel, OpenCV order) into an RGB image.
    pub fn rgb_from_bgr(width: u32, height: u32, buffer: &[u8]) -> Option<RgbImage> {
        repack(width, height, buffer, 3, |px| [px[2], px[1], px[0]])
    }

    fn repack(
        width: u32,
        height: u32,
        buffer: &[u8],
        channels: usize,
        to_rgb: impl Fn(&[u8]) -> [u8; 3],
    ) -> Option<RgbImage> {
        let expected = (width as usize) * (height as usize) * channels;
        if expected == 0 || buffer.len() != expected {
            return None;
        }
        let rgb: Vec<u8> = buffer.chunks_exact(channels).flat_map(to_rgb).collect();
        RgbImage::from_raw(width, height, rgb)
    }

    /// Number of bytes an RGBA frame of the given size occupies.
    pub fn rgba_len(width: u32, height: u32) -> usize {
        (width as usize) * (height as usize) * 4
    }
}

#[cfg(test)]
mod tests {

    use super::image_helper::*;

    #[test]
    fn rgba_buffer_drops_alpha() {
        let width = 4u32;
        let height = 2u32;
        let mut buffer = vec![255u8; rgba_len(width, height)];
        for px in buffer.chunks_mut(4) {
            px[0] = 10;
            px[1] = 20;
            px[2] = 30;
        }

        let image = rgb_from_rgba(width, height, &buffer).expect("valid frame");
        assert_eq!(image.dimensions(), (4, 2));
        assert_eq!(image.get_pixel(3, 1).0, [10, 20, 30]);
    }

    #[test]
    fn bgr_buffer_is_reordered() {
        let buffer = vec![1u8, 2, 3, 4, 5, 6];
        let image = rgb_from_bgr(2, 1, &buffer).expect("valid frame");
        assert_eq!(image.get_pixel(0, 0).0, [3, 2, 1]);
        assert_eq!(image.get_pixel(1, 0).0, [6, 5, 4]);
    }

    #[test]
    fn mismatched_buffer_is_rejected() {
        assert!(rgb_from_rgba(10, 10, &[0u8; 12]).is_none());
        assert!(rgb_from_bgr(0, 0, &[]).is_none());
    }
}
