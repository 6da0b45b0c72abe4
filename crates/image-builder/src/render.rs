//! Debug rendering of single jet images

use crate::{ImageError, ImageTensor};
use image::{GrayImage, Luma};

/// Render one channel of one batch entry as a grayscale image
///
/// Rows are eta pixels, columns are phi pixels. Values are scaled so the
/// hottest pixel is white; an empty jet renders black.
///
/// # Errors
/// Returns error if `batch` or `channel` is out of range
pub fn render_entry(
    tensor: &ImageTensor,
    batch: usize,
    channel: usize,
) -> Result<GrayImage, ImageError> {
    let layout = tensor.layout();
    if batch >= tensor.batch_size() {
        return Err(ImageError::EntryOutOfRange {
            index: batch,
            batch_size: tensor.batch_size(),
        });
    }
    if channel >= layout.channels {
        return Err(ImageError::ChannelOutOfRange {
            channel,
            channels: layout.channels,
        });
    }

    let view = tensor.view()?;
    let plane = view.slice(ndarray::s![batch, .., .., channel]);
    let max = plane.iter().copied().fold(0.0f32, f32::max);
    let side = layout.npix as u32;

    Ok(GrayImage::from_fn(side, side, |x, y| {
        let value = plane[[y as usize, x as usize]];
        if max > 0.0 {
            Luma([((value / max).clamp(0.0, 1.0) * 255.0).round() as u8])
        } else {
            Luma([0])
        }
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ImageBuilder, ImageConfig};
    use jet_image_common::{Constituent, Jet};

    #[test]
    fn test_render_hottest_pixel_is_white() {
        let builder = ImageBuilder::new(ImageConfig {
            npix: 4,
            channels: 1,
        })
        .unwrap();
        let jet = Jet::new(10.0, 0.0, 0.0).with_constituents(vec![
            Constituent::new(5.0, 0.3, -0.1),
            Constituent::new(2.5, -0.9, 0.9),
        ]);
        let img = render_entry(&builder.build(&[jet]), 0, 0).unwrap();

        assert_eq!(img.dimensions(), (4, 4));
        // eta pixel 2 -> row 2, phi pixel 1 -> column 1
        assert_eq!(img.get_pixel(1, 2)[0], 255);
        assert_eq!(img.get_pixel(3, 0)[0], 128);
        assert_eq!(img.get_pixel(0, 0)[0], 0);
    }

    #[test]
    fn test_render_out_of_range() {
        let builder = ImageBuilder::new(ImageConfig {
            npix: 2,
            channels: 1,
        })
        .unwrap();
        let tensor = builder.build(&[Jet::new(1.0, 0.0, 0.0)]);

        assert!(matches!(
            render_entry(&tensor, 1, 0),
            Err(ImageError::EntryOutOfRange { .. })
        ));
        assert!(matches!(
            render_entry(&tensor, 0, 1),
            Err(ImageError::ChannelOutOfRange { .. })
        ));
        let black = render_entry(&tensor, 0, 0).unwrap();
        assert!(black.pixels().all(|p| p[0] == 0));
    }
}
