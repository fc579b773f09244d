//! Estimated vs. measured width over frame index, rendered to SVG

use crate::error::{DropWidthError, Result};
use crate::inference::AlignedFrame;
use plotters::element::DashedPathElement;
use plotters::prelude::*;
use std::path::Path;
use tracing::info;

/// Size and caption of the comparison plot
#[derive(Debug, Clone, PartialEq)]
pub struct PlotStyle {
    pub width: u32,
    pub height: u32,
    pub title: String,
}

impl Default for PlotStyle {
    fn default() -> Self {
        Self {
            width: 960,
            height: 540,
            title: "Drop width".to_string(),
        }
    }
}

impl PlotStyle {
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }
}

fn plot_err<E: std::fmt::Display>(stage: &str) -> impl Fn(E) -> DropWidthError + '_ {
    move |e| DropWidthError::Plot(format!("{stage}: {e}"))
}

/// y range spanning both series, padded by 5% (or 1 µm for a flat series)
fn y_range(frames: &[AlignedFrame]) -> (f64, f64) {
    let values = frames
        .iter()
        .flat_map(|f| std::iter::once(f.estimated_um).chain(f.measured_um))
        .filter(|v| v.is_finite());
    let (lo, hi) = values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)));
    if !lo.is_finite() {
        return (0.0, 1.0);
    }
    let pad = ((hi - lo) * 0.05).max(1.0);
    (lo - pad, hi + pad)
}

/// Draws the estimated width as red points and the measured width, when
/// present, as a black line
pub fn plot_comparison<P: AsRef<Path>>(path: P, frames: &[AlignedFrame], style: &PlotStyle) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let x_min = frames.first().map(|f| f.frame as f64).unwrap_or(0.0);
    let x_max = frames.last().map(|f| f.frame as f64).unwrap_or(1.0).max(x_min + 1.0);
    let (y_min, y_max) = y_range(frames);

    let root = SVGBackend::new(path, (style.width, style.height)).into_drawing_area();
    root.fill(&WHITE).map_err(plot_err("backend"))?;

    {
        let mut chart = ChartBuilder::on(&root)
            .margin(10)
            .caption(&style.title, ("sans-serif", 24))
            .set_label_area_size(LabelAreaPosition::Left, 70)
            .set_label_area_size(LabelAreaPosition::Bottom, 50)
            .build_cartesian_2d(x_min..x_max, y_min..y_max)
            .map_err(plot_err("chart build"))?;

        chart
            .configure_mesh()
            .x_desc("Frame")
            .y_desc("Width (um)")
            .draw()
            .map_err(plot_err("mesh"))?;

        let measured: Vec<(f64, f64)> = frames
            .iter()
            .filter_map(|f| f.measured_um.map(|m| (f.frame as f64, m)))
            .collect();
        if !measured.is_empty() {
            chart
                .draw_series(LineSeries::new(measured, BLACK.stroke_width(2)))
                .map_err(plot_err("measured series"))?
                .label("Measured")
                .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], BLACK.stroke_width(2)));
        }

        let estimated: Vec<(f64, f64)> = frames.iter().map(|f| (f.frame as f64, f.estimated_um)).collect();
        chart
            .draw_series(DashedLineSeries::new(estimated, 2, 3, RED.stroke_width(2)))
            .map_err(plot_err("estimated series"))?
            .label("Estimated")
            .legend(|(x, y)| {
                DashedPathElement::new(vec![(x, y), (x + 20, y)], 2, 3, RED.stroke_width(2))
            });

        chart
            .configure_series_labels()
            .background_style(WHITE.mix(0.8))
            .border_style(BLACK)
            .position(SeriesLabelPosition::UpperRight)
            .draw()
            .map_err(plot_err("legend"))?;
    }

    root.present().map_err(plot_err("render"))?;
    info!(path = %path.display(), frames = frames.len(), "wrote comparison plot");
    Ok(())
}
