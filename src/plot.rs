use std::io::Cursor;

use image::{DynamicImage, ImageBuffer, ImageFormat, Rgb};
use plotters::prelude::*;

use crate::error::PpgError;

#[derive(Clone, Debug)]
pub struct PlotStyle {
    pub width: u32,
    pub height: u32,
    pub background: RGBColor,
    pub trace: RGBColor,
    pub peak: RGBColor,
}

impl Default for PlotStyle {
    fn default() -> Self {
        Self {
            width: 900,
            height: 300,
            background: RGBColor(10, 10, 10),
            trace: RGBColor(220, 40, 40),
            peak: YELLOW,
        }
    }
}

/// Draws the signal window with a marker on every detected peak and returns PNG bytes.
pub fn render_window_png(
    window: &[f64],
    peaks: &[usize],
    style: &PlotStyle,
) -> Result<Vec<u8>, PpgError> {
    if window.is_empty() {
        return Err(PpgError::EmptyWindow);
    }
    let mut buffer = vec![0u8; (style.width * style.height * 3) as usize];
    {
        let root = BitMapBackend::with_buffer(&mut buffer, (style.width, style.height))
            .into_drawing_area();
        root.fill(&style.background)?;
        let y_min = window.iter().copied().fold(f64::INFINITY, f64::min);
        let y_max = window.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        // keep a flat trace off the axis edges
        let pad = ((y_max - y_min) * 0.1).max(1.0);
        let mut chart = ChartBuilder::on(&root)
            .margin(10)
            .build_cartesian_2d(0f64..window.len() as f64, (y_min - pad)..(y_max + pad))?;
        chart.draw_series(LineSeries::new(
            window.iter().enumerate().map(|(i, v)| (i as f64, *v)),
            &style.trace,
        ))?;
        let peak_color = style.peak;
        chart.draw_series(
            peaks
                .iter()
                .filter_map(|&i| window.get(i).map(|v| (i as f64, *v)))
                .map(|point| Circle::new(point, 4, peak_color.filled())),
        )?;
        root.present()?;
    }
    encode_png(&buffer, style.width, style.height)
}

fn encode_png(buffer: &[u8], width: u32, height: u32) -> Result<Vec<u8>, PpgError> {
    let image = ImageBuffer::<Rgb<u8>, _>::from_raw(width, height, buffer.to_vec())
        .ok_or_else(|| PpgError::Plot("failed to allocate image buffer".into()))?;
    let mut output = Vec::new();
    let dynamic = DynamicImage::ImageRgb8(image);
    dynamic.write_to(&mut Cursor::new(&mut output), ImageFormat::Png)?;
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_png_with_peaks() {
        let window: Vec<f64> = (0..100).map(|i| ((i % 25) as f64).min(12.0)).collect();
        let png = render_window_png(&window, &[12, 37, 500], &PlotStyle::default()).unwrap();
        assert_eq!(&png[1..4], b"PNG");
    }

    #[test]
    fn flat_window_still_renders() {
        let png = render_window_png(&[100.0; 50], &[], &PlotStyle::default()).unwrap();
        assert!(!png.is_empty());
    }

    #[test]
    fn empty_window_is_an_error() {
        assert!(matches!(
            render_window_png(&[], &[], &PlotStyle::default()),
            Err(PpgError::EmptyWindow)
        ));
    }
}
