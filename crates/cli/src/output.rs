//! PNG output for resolved frames

use std::{fs::File, io::BufWriter, path::Path};

use anyhow::Context;

/// Writes an RGBA f32 buffer (row 0 at the top) as an 8-bit RGB png. Radiance is scaled by
/// `1 / exposure` and clamped, alpha is dropped.
pub fn save_png(buffer: &[f32], exposure: f32, width: u32, height: u32, output_path: &Path) -> anyhow::Result<()> {
    anyhow::ensure!(
        buffer.len() == width as usize * height as usize * 4,
        "buffer of {} floats does not match a {width}x{height} image",
        buffer.len()
    );
    anyhow::ensure!(exposure > 0.0 && exposure.is_finite(), "exposure must be positive, got {exposure}");

    if let Some(parent) = output_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create output directory {}", parent.display()))?;
    }

    let file = File::create(output_path)
        .with_context(|| format!("failed to create output file {}", output_path.display()))?;
    let mut encoder = png::Encoder::new(BufWriter::new(file), width, height);
    encoder.set_color(png::ColorType::Rgb);
    encoder.set_depth(png::BitDepth::Eight);
    encoder.set_source_gamma(png::ScaledFloat::new(1.0));

    let mut writer = encoder.write_header().context("failed to write PNG header")?;

    let image_data: Vec<u8> = buffer
        .chunks_exact(4)
        .flat_map(|px| {
            let quantize = |v: f32| (v / exposure * 255.0).clamp(0.0, 255.0) as u8;
            [quantize(px[0]), quantize(px[1]), quantize(px[2])]
        })
        .collect();

    writer.write_image_data(&image_data).context("failed to write PNG data")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_mismatched_buffer() {
        let path = std::env::temp_dir().join("rtcli-mismatch.png");
        assert!(save_png(&[0.0; 8], 1.0, 4, 4, &path).is_err());
    }

    #[test]
    fn rejects_non_positive_exposure() {
        let path = std::env::temp_dir().join("rtcli-exposure.png");
        assert!(save_png(&[0.0; 4], 0.0, 1, 1, &path).is_err());
        assert!(save_png(&[0.0; 4], -2.0, 1, 1, &path).is_err());
    }

    #[test]
    fn writes_readable_png() {
        let path = std::env::temp_dir().join(format!("rtcli-{}.png", std::process::id()));
        let buffer = [0.5, 1.0, 2.0, 1.0, 0.0, 0.0, 0.0, 1.0];
        save_png(&buffer, 1.0, 2, 1, &path).unwrap();

        let decoder = png::Decoder::new(File::open(&path).unwrap());
        let mut reader = decoder.read_info().unwrap();
        let mut data = vec![0; reader.output_buffer_size()];
        let info = reader.next_frame(&mut data).unwrap();
        assert_eq!((info.width, info.height), (2, 1));
        assert_eq!(&data[..6], &[127, 255, 255, 0, 0, 0]);
        std::fs::remove_file(&path).ok();
    }
}
