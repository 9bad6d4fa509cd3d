use anyhow::{anyhow, Result};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum PixelFormat {
    Rgb24,
    /// Packed 4:2:2, byte order Y0 U Y1 V.
    Yuyv,
}

impl PixelFormat {
    /// Map a V4L2 fourcc to a supported format.
    pub(crate) fn from_fourcc(fourcc: &[u8; 4]) -> Option<Self> {
        match fourcc {
            b"RGB3" => Some(PixelFormat::Rgb24),
            b"YUYV" => Some(PixelFormat::Yuyv),
            _ => None,
        }
    }

    fn bytes_per_pixel(self) -> usize {
        match self {
            PixelFormat::Rgb24 => 3,
            PixelFormat::Yuyv => 2,
        }
    }
}

/// Convert a captured buffer to packed RGB24.
///
/// `stride` is the driver's bytes per line; zero or anything shorter than a
/// packed row is treated as tightly packed. Padding at the end of each row and
/// of the buffer is dropped.
pub(crate) fn normalize_to_rgb(
    pixels: &[u8],
    width: u32,
    height: u32,
    stride: usize,
    format: PixelFormat,
) -> Result<Vec<u8>> {
    if format == PixelFormat::Yuyv && width % 2 != 0 {
        return Err(anyhow!("YUYV frame width must be even, got {}", width));
    }
    let (width, height) = (width as usize, height as usize);
    let row_len = width
        .checked_mul(format.bytes_per_pixel())
        .ok_or_else(|| anyhow!("{:?} frame dimensions overflow", format))?;
    let stride = stride.max(row_len);
    let expected = match height {
        0 => 0,
        h => stride
            .checked_mul(h - 1)
            .and_then(|v| v.checked_add(row_len))
            .ok_or_else(|| anyhow!("{:?} frame dimensions overflow", format))?,
    };
    // Drivers may hand back buffers larger than the image (page-rounded).
    if pixels.len() < expected {
        return Err(anyhow!(
            "{:?} frame length mismatch: expected {}, got {}",
            format,
            expected,
            pixels.len()
        ));
    }

    let mut rgb = Vec::with_capacity(width * height * 3);
    for y in 0..height {
        let row = &pixels[y * stride..y * stride + row_len];
        match format {
            PixelFormat::Rgb24 => rgb.extend_from_slice(row),
            PixelFormat::Yuyv => yuyv_row_to_rgb(row, &mut rgb),
        }
    }
    Ok(rgb)
}

fn yuyv_row_to_rgb(row: &[u8], rgb: &mut Vec<u8>) {
    for chunk in row.chunks_exact(4) {
        let u = chunk[1] as f32 - 128.0;
        let v = chunk[3] as f32 - 128.0;
        for y in [chunk[0] as f32, chunk[2] as f32] {
            let r = y + 1.402_f32 * v;
            let g = y - 0.344_136_f32 * u - 0.714_136_f32 * v;
            let b = y + 1.772_f32 * u;
            rgb.push(clamp_to_u8(r));
            rgb.push(clamp_to_u8(g));
            rgb.push(clamp_to_u8(b));
        }
    }
}

fn clamp_to_u8(value: f32) -> u8 {
    value.round().clamp(0.0, 255.0) as u8
}
