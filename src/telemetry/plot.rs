use std::io::Cursor;
use std::path::Path;
use image::{DynamicImage, ImageBuffer, ImageFormat, Rgb};
use plotters::prelude::*;
use crate::telemetry::{Session, TelemetryError};
#[derive(Clone, Debug)]
pub struct PlotStyle {
    pub width: u32,
    pub height: u32,
    pub background: RGBColor,
    pub palette: Vec<RGBColor>,
}
impl Default for PlotStyle {
    fn default() -> Self {
        Self {
            width: 1200,
            height: 600,
            background: RGBColor(10, 10, 10),
            palette: vec![BLUE, RED, GREEN, CYAN, MAGENTA, YELLOW, WHITE],
        }
    }
}
/// Axis ranges covering the whole session, widened so a flat signal or a
/// single sample still gets a drawable area.
pub fn history_ranges(session: &Session) -> Result<((f64, f64), (f64, f64)), TelemetryError> {
    let (t0, t1) = session.time_span()?;
    let (y0, y1) = session.overall_value_bounds()?;
    if ![t0, t1, y0, y1].iter().all(|v| v.is_finite()) {
        return Err(TelemetryError::Plot(format!(
            "axis range is not finite: time {t0}..{t1}, value {y0}..{y1}"
        )));
    }
    let x_range = if (t1 - t0).abs() < f64::EPSILON {
        (t0 - 1.0, t1 + 1.0)
    } else {
        (t0, t1)
    };
    let y_range = if (y1 - y0).abs() < f64::EPSILON {
        (y0 - 1.0, y1 + 1.0)
    } else {
        let pad = (y1 - y0) * 0.05;
        (y0 - pad, y1 + pad)
    };
    Ok((x_range, y_range))
}
/// Render every channel's full history as a PNG with a labelled legend.
pub fn render_history_png(session: &Session, style: &PlotStyle) -> Result<Vec<u8>, TelemetryError> {
    let ((x0, x1), (y0, y1)) = history_ranges(session)?;
    let mut buffer = vec![0u8; (style.width * style.height * 3) as usize];
    {
        let root = BitMapBackend::with_buffer(&mut buffer, (style.width, style.height))
            .into_drawing_area();
        root.fill(&style.background)?;
        let mut chart = ChartBuilder::on(&root)
            .margin(10)
            .caption("Telemetry", ("sans-serif", 20).into_font().color(&WHITE))
            .set_label_area_size(LabelAreaPosition::Left, 55)
            .set_label_area_size(LabelAreaPosition::Bottom, 40)
            .build_cartesian_2d(x0..x1, y0..y1)?;
        chart
            .configure_mesh()
            .x_desc("time")
            .axis_desc_style(("sans-serif", 14).into_font().color(&WHITE))
            .label_style(("sans-serif", 12).into_font().color(&WHITE))
            .light_line_style(&WHITE.mix(0.1))
            .draw()?;
        for (idx, series) in session.full_history().iter().enumerate() {
            let color = series_color(&style.palette, idx);
            let points = series.points().iter().map(|p| (p.time, p.value));
            chart
                .draw_series(LineSeries::new(points, &color))?
                .label(
                    session
                        .labels()
                        .get(idx)
                        .cloned()
                        .unwrap_or_else(|| format!("Ch {}", idx + 1)),
                )
                .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], &color));
        }
        chart
            .configure_series_labels()
            .position(SeriesLabelPosition::UpperRight)
            .label_font(("sans-serif", 12).into_font().color(&WHITE))
            .border_style(&WHITE.mix(0.2))
            .background_style(&style.background)
            .draw()?;
        root.present()?;
    }
    encode_png(&buffer, style.width, style.height)
}
/// Palette entry for channel `idx`, cycling; an empty palette falls back
/// to the default one.
fn series_color(palette: &[RGBColor], idx: usize) -> RGBColor {
    if palette.is_empty() {
        let fallback = PlotStyle::default().palette;
        return fallback[idx % fallback.len()];
    }
    palette[idx % palette.len()]
}
pub fn save_history_png(
    session: &Session,
    style: &PlotStyle,
    path: &Path,
) -> Result<(), TelemetryError> {
    let png = render_history_png(session, style)?;
    std::fs::write(path, png)?;
    log::info!("plot written to {}", path.display());
    Ok(())
}
fn encode_png(buffer: &[u8], width: u32, height: u32) -> Result<Vec<u8>, TelemetryError> {
    let image = ImageBuffer::<Rgb<u8>, _>::from_raw(width, height, buffer.to_vec())
        .ok_or_else(|| TelemetryError::Plot("failed to allocate image buffer".into()))?;
    let mut output = Vec::new();
    let dynamic = DynamicImage::ImageRgb8(image);
    dynamic.write_to(&mut Cursor::new(&mut output), ImageFormat::Png)?;
    Ok(output)
}
#[cfg(test)]
mod tests {
    use super::*;
    use crate::telemetry::DecodedRow;
    use assert_matches::assert_matches;
    #[test]
    fn empty_session_is_not_rendered() {
        let session = Session::new(vec!["A".into()]);
        assert_matches!(
            render_history_png(&session, &PlotStyle::default()),
            Err(TelemetryError::NoData)
        );
    }
    #[test]
    fn non_finite_values_are_refused_before_drawing() {
        let mut session = Session::new(vec![]);
        session.append(&DecodedRow::new(vec![0.0, 1.0])).unwrap();
        session.append(&DecodedRow::new(vec![1.0, f64::INFINITY])).unwrap();
        assert_matches!(history_ranges(&session), Err(TelemetryError::Plot(_)));
        assert_matches!(
            render_history_png(&session, &PlotStyle::default()),
            Err(TelemetryError::Plot(_))
        );
    }
    #[test]
    fn backwards_time_still_gives_increasing_x_range() {
        let mut session = Session::new(vec![]);
        for t in [4.0, 9.0, 0.0] {
            session.append(&DecodedRow::new(vec![t, 1.0 + t])).unwrap();
        }
        let (x, _) = history_ranges(&session).unwrap();
        assert_eq!(x, (0.0, 9.0));
    }
    #[test]
    fn empty_palette_falls_back_to_default_colors() {
        let default = PlotStyle::default().palette;
        assert_eq!(series_color(&[], 0), default[0]);
        assert_eq!(series_color(&[], default.len() + 1), default[1]);
        assert_eq!(series_color(&[RED], 3), RED);
    }
    #[test]
    fn ranges_pad_flat_and_single_sample_sessions() {
        let mut session = Session::new(vec![]);
        session.append(&DecodedRow::new(vec![2.0, 5.0])).unwrap();
        let (x, y) = history_ranges(&session).unwrap();
        assert_eq!(x, (1.0, 3.0));
        assert_eq!(y, (4.0, 6.0));
        session.append(&DecodedRow::new(vec![12.0, 15.0])).unwrap();
        let (x, y) = history_ranges(&session).unwrap();
        assert_eq!(x, (2.0, 12.0));
        assert!((y.0 - 4.5).abs() < 1e-9 && (y.1 - 15.5).abs() < 1e-9);
    }
}
