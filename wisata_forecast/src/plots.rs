//! SVG diagnostics: forecast overlay and residual correlograms
//!
//! Each render call builds its own [`SvgCanvas`] and consumes it into an
//! [`ImageArtifact`]. Coordinates are printed with fixed precision, so the
//! same input always yields the same bytes.

use crate::error::{ForecastError, Result};
use crate::forecast::Forecast;
use crate::utils::ensure_finite;
use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, Normal};
use wisata_math::correlation::{acf, default_acf_lags, default_pacf_lags, pacf};
use wisata_math::{Correlogram, PacfMethod};

/// Media type of every rendered artifact
pub const SVG_MEDIA_TYPE: &str = "image/svg+xml";

const HISTORY_COLOR: &str = "#1f77b4";
const FORECAST_COLOR: &str = "#d62728";
const BAND_COLOR: &str = "#1f77b4";
const AXIS_COLOR: &str = "#333333";
const GRID_COLOR: &str = "#dddddd";

/// Rendered image bytes plus their media type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageArtifact {
    pub media_type: &'static str,
    pub bytes: Vec<u8>,
}

impl ImageArtifact {
    /// File extension matching the media type
    pub fn extension(&self) -> &'static str {
        "svg"
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// The SVG document as text
    pub fn as_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.bytes).ok()
    }
}

/// Output size of rendered plots, in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlotConfig {
    pub width: u32,
    pub height: u32,
}

impl Default for PlotConfig {
    fn default() -> Self {
        Self {
            width: 1000,
            height: 600,
        }
    }
}

/// A drawing surface owned by a single render call
#[derive(Debug)]
pub struct SvgCanvas {
    width: f64,
    height: f64,
    body: String,
}

impl SvgCanvas {
    pub fn new(config: &PlotConfig) -> Self {
        let mut canvas = Self {
            width: config.width as f64,
            height: config.height as f64,
            body: String::with_capacity(8 * 1024),
        };
        canvas.rect(0.0, 0.0, canvas.width, canvas.height, "#ffffff", 1.0);
        canvas
    }

    pub fn rect(&mut self, x: f64, y: f64, width: f64, height: f64, fill: &str, opacity: f64) {
        self.body.push_str(&format!(
            "<rect x=\"{:.2}\" y=\"{:.2}\" width=\"{:.2}\" height=\"{:.2}\" fill=\"{}\" fill-opacity=\"{:.2}\"/>",
            x, y, width.max(0.0), height.max(0.0), fill, opacity
        ));
    }

    pub fn line(&mut self, from: (f64, f64), to: (f64, f64), stroke: &str, width: f64) {
        self.body.push_str(&format!(
            "<line x1=\"{:.2}\" y1=\"{:.2}\" x2=\"{:.2}\" y2=\"{:.2}\" stroke=\"{}\" stroke-width=\"{:.1}\"/>",
            from.0, from.1, to.0, to.1, stroke, width
        ));
    }

    pub fn polyline(&mut self, points: &[(f64, f64)], stroke: &str, width: f64) {
        self.body.push_str("<polyline fill=\"none\" points=\"");
        push_points(&mut self.body, points);
        self.body.push_str(&format!(
            "\" stroke=\"{}\" stroke-width=\"{:.1}\"/>",
            stroke, width
        ));
    }

    pub fn polygon(&mut self, points: &[(f64, f64)], fill: &str, opacity: f64) {
        self.body.push_str("<polygon points=\"");
        push_points(&mut self.body, points);
        self.body.push_str(&format!(
            "\" fill=\"{}\" fill-opacity=\"{:.2}\" stroke=\"none\"/>",
            fill, opacity
        ));
    }

    pub fn circle(&mut self, center: (f64, f64), radius: f64, fill: &str) {
        self.body.push_str(&format!(
            "<circle cx=\"{:.2}\" cy=\"{:.2}\" r=\"{:.1}\" fill=\"{}\"/>",
            center.0, center.1, radius, fill
        ));
    }

    pub fn text(&mut self, at: (f64, f64), content: &str, size: u32, anchor: &str) {
        self.body.push_str(&format!(
            "<text x=\"{:.2}\" y=\"{:.2}\" font-size=\"{}\" text-anchor=\"{}\" fill=\"{}\">",
            at.0, at.1, size, anchor, AXIS_COLOR
        ));
        escape_into(&mut self.body, content);
        self.body.push_str("</text>");
    }

    /// Text rotated a quarter turn counter-clockwise, for y-axis labels
    pub fn vertical_text(&mut self, at: (f64, f64), content: &str, size: u32) {
        self.body.push_str(&format!(
            "<text x=\"{:.2}\" y=\"{:.2}\" font-size=\"{}\" text-anchor=\"middle\" fill=\"{}\" transform=\"rotate(-90 {:.2} {:.2})\">",
            at.0, at.1, size, AXIS_COLOR, at.0, at.1
        ));
        escape_into(&mut self.body, content);
        self.body.push_str("</text>");
    }

    /// Finish the document and hand over its bytes
    pub fn into_artifact(self) -> ImageArtifact {
        let mut doc = format!(
            "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{w}\" height=\"{h}\" viewBox=\"0 0 {w} {h}\" font-family=\"sans-serif\">",
            w = self.width,
            h = self.height
        );
        doc.push_str(&self.body);
        doc.push_str("</svg>");
        ImageArtifact {
            media_type: SVG_MEDIA_TYPE,
            bytes: doc.into_bytes(),
        }
    }
}

fn push_points(out: &mut String, points: &[(f64, f64)]) {
    for (i, (x, y)) in points.iter().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        out.push_str(&format!("{:.2},{:.2}", x, y));
    }
}

fn escape_into(out: &mut String, s: &str) {
    for c in s.chars() {
        match c {
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
}

/// Data-to-pixel mapping for the plotting area
struct Frame {
    x_range: (f64, f64),
    y_range: (f64, f64),
    left: f64,
    right: f64,
    top: f64,
    bottom: f64,
}

impl Frame {
    fn new(canvas: &SvgCanvas, x_range: (f64, f64), y_range: (f64, f64)) -> Self {
        let x_range = widen(x_range, 0.5);
        let pad = ((y_range.1 - y_range.0) * 0.05).max(f64::EPSILON);
        let y_range = widen((y_range.0 - pad, y_range.1 + pad), 1.0);
        Self {
            x_range,
            y_range,
            left: 80.0,
            right: canvas.width - 30.0,
            top: 50.0,
            bottom: canvas.height - 60.0,
        }
    }

    fn x(&self, value: f64) -> f64 {
        let (lo, hi) = self.x_range;
        self.left + (value - lo) / (hi - lo) * (self.right - self.left)
    }

    fn y(&self, value: f64) -> f64 {
        let (lo, hi) = self.y_range;
        self.bottom - (value - lo) / (hi - lo) * (self.bottom - self.top)
    }

    fn map(&self, (x, y): (f64, f64)) -> (f64, f64) {
        (self.x(x), self.y(y))
    }

    /// Border, grid lines and tick labels
    fn draw_axes(&self, canvas: &mut SvgCanvas, integer_x: bool) {
        for tick in ticks(self.y_range, 5) {
            let y = self.y(tick);
            canvas.line((self.left, y), (self.right, y), GRID_COLOR, 1.0);
            canvas.text((self.left - 8.0, y + 4.0), &format_tick(tick), 12, "end");
        }
        for tick in ticks(self.x_range, 10) {
            if integer_x && tick.fract() != 0.0 {
                continue;
            }
            let x = self.x(tick);
            canvas.line((x, self.bottom), (x, self.bottom + 5.0), AXIS_COLOR, 1.0);
            canvas.text((x, self.bottom + 20.0), &format_tick(tick), 12, "middle");
        }
        canvas.line((self.left, self.top), (self.left, self.bottom), AXIS_COLOR, 1.0);
        canvas.line((self.left, self.bottom), (self.right, self.bottom), AXIS_COLOR, 1.0);
    }

    fn draw_labels(&self, canvas: &mut SvgCanvas, title: &str, x_label: &str, y_label: &str) {
        let center_x = (self.left + self.right) / 2.0;
        canvas.text((center_x, 30.0), title, 18, "middle");
        canvas.text((center_x, canvas.height - 15.0), x_label, 14, "middle");
        canvas.vertical_text((20.0, (self.top + self.bottom) / 2.0), y_label, 14);
    }

    /// Legend in the top-left corner of the plotting area
    fn draw_legend(&self, canvas: &mut SvgCanvas, entries: &[(&str, &str, f64)]) {
        let x = self.left + 15.0;
        for (i, (label, color, opacity)) in entries.iter().enumerate() {
            let y = self.top + 18.0 + i as f64 * 20.0;
            canvas.rect(x, y - 9.0, 24.0, 10.0, color, *opacity);
            canvas.text((x + 32.0, y), label, 12, "start");
        }
    }
}

fn widen(range: (f64, f64), by: f64) -> (f64, f64) {
    if range.1 - range.0 > f64::EPSILON * range.0.abs().max(1.0) {
        range
    } else {
        (range.0 - by, range.1 + by)
    }
}

/// Evenly spaced "nice" tick values covering `range`
fn ticks(range: (f64, f64), target: usize) -> Vec<f64> {
    let span = range.1 - range.0;
    let raw_step = span / target.max(1) as f64;
    let magnitude = 10f64.powf(raw_step.log10().floor());
    let step = [1.0, 2.0, 5.0, 10.0]
        .iter()
        .map(|m| m * magnitude)
        .find(|s| *s >= raw_step)
        .unwrap_or(10.0 * magnitude);
    if !(step > 0.0 && step.is_finite()) {
        // Range too narrow to resolve at this magnitude
        return if range.0.is_finite() { vec![range.0] } else { Vec::new() };
    }

    let first = (range.0 / step).ceil() as i64;
    let last = (range.1 / step).floor() as i64;
    (first..=last).map(|i| i as f64 * step).collect()
}

fn format_tick(value: f64) -> String {
    if value.fract().abs() < 1e-9 {
        format!("{:.0}", value)
    } else {
        let text = format!("{:.2}", value);
        text.trim_end_matches('0').to_string()
    }
}

fn z_95() -> Result<f64> {
    let normal = Normal::new(0.0, 1.0).map_err(|e| ForecastError::Math(e.to_string()))?;
    Ok(normal.inverse_cdf(0.975))
}

/// History and forecast on a shared position axis, with default size
pub fn render_forecast_plot(history: &[f64], forecast: &Forecast) -> Result<ImageArtifact> {
    render_forecast_plot_with(history, forecast, &PlotConfig::default())
}

/// History at positions `0..n`, forecast at its own positions, interval band when present
pub fn render_forecast_plot_with(
    history: &[f64],
    forecast: &Forecast,
    config: &PlotConfig,
) -> Result<ImageArtifact> {
    if history.is_empty() {
        return Err(ForecastError::Validation(
            "Cannot plot an empty history".to_string(),
        ));
    }
    ensure_finite(history, "History")?;
    ensure_finite(&forecast.values(), "Forecast")?;

    let mut canvas = SvgCanvas::new(config);

    let history_points: Vec<(f64, f64)> = history
        .iter()
        .enumerate()
        .map(|(i, v)| (i as f64, *v))
        .collect();
    let forecast_points: Vec<(f64, f64)> = forecast
        .points()
        .iter()
        .map(|p| (p.position as f64, p.value))
        .collect();
    let band: Vec<(f64, f64, f64)> = forecast
        .points()
        .iter()
        .filter_map(|p| {
            p.interval
                .filter(|i| i.lower.is_finite() && i.upper.is_finite())
                .map(|i| (p.position as f64, i.lower, i.upper))
        })
        .collect();

    let all_y = history_points
        .iter()
        .chain(&forecast_points)
        .map(|(_, y)| *y)
        .chain(band.iter().flat_map(|(_, lo, hi)| [*lo, *hi]));
    let (y_min, y_max) = min_max(all_y);
    let x_max = forecast_points
        .last()
        .map(|(x, _)| *x)
        .unwrap_or(0.0)
        .max((history.len() - 1) as f64);

    let frame = Frame::new(&canvas, (0.0, x_max), (y_min, y_max));
    frame.draw_axes(&mut canvas, true);

    let band_label = forecast
        .points()
        .iter()
        .find_map(|p| p.interval.map(|i| format!("{:.0}% interval", i.level * 100.0)));
    let mut legend = vec![("Data Historis", HISTORY_COLOR, 1.0)];
    if !band.is_empty() {
        let mut outline: Vec<(f64, f64)> = band.iter().map(|(x, _, hi)| frame.map((*x, *hi))).collect();
        outline.extend(band.iter().rev().map(|(x, lo, _)| frame.map((*x, *lo))));
        canvas.polygon(&outline, FORECAST_COLOR, 0.15);
    }

    let mapped: Vec<(f64, f64)> = history_points.iter().map(|p| frame.map(*p)).collect();
    canvas.polyline(&mapped, HISTORY_COLOR, 2.0);
    if !forecast_points.is_empty() {
        let mapped: Vec<(f64, f64)> = forecast_points.iter().map(|p| frame.map(*p)).collect();
        canvas.polyline(&mapped, FORECAST_COLOR, 2.0);
        legend.push(("Prediksi ARIMA", FORECAST_COLOR, 1.0));
    }
    if let Some(label) = &band_label {
        legend.push((label.as_str(), FORECAST_COLOR, 0.15));
    }

    frame.draw_legend(&mut canvas, &legend);
    frame.draw_labels(&mut canvas, "Prediksi ARIMA", "Waktu", "Jumlah");
    Ok(canvas.into_artifact())
}

fn min_max(values: impl Iterator<Item = f64>) -> (f64, f64) {
    values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    })
}

/// Stems, zero line and a band of `±z * se` centered on zero
fn render_correlogram(
    correlogram: &Correlogram,
    title: &str,
    config: &PlotConfig,
) -> Result<ImageArtifact> {
    ensure_finite(&correlogram.values, title)?;
    let z = z_95()?;
    let nlags = correlogram.nlags();

    let bounds: Vec<f64> = correlogram.std_errors.iter().map(|se| z * se).collect();
    let (lo, hi) = min_max(
        correlogram
            .values
            .iter()
            .copied()
            .chain(bounds.iter().flat_map(|b| [*b, -*b])),
    );

    let mut canvas = SvgCanvas::new(config);
    let frame = Frame::new(
        &canvas,
        (-0.5, nlags as f64 + 0.5),
        (lo.min(-1e-3), hi.max(1.0)),
    );
    frame.draw_axes(&mut canvas, true);

    if nlags >= 1 {
        let mut band: Vec<(f64, f64)> = (1..=nlags)
            .map(|k| frame.map((k as f64 - 0.5, bounds[k])))
            .collect();
        band.push(frame.map((nlags as f64 + 0.5, bounds[nlags])));
        band.push(frame.map((nlags as f64 + 0.5, -bounds[nlags])));
        band.extend((1..=nlags).rev().map(|k| frame.map((k as f64 - 0.5, -bounds[k]))));
        canvas.polygon(&band, BAND_COLOR, 0.2);
    }

    canvas.line(
        frame.map((frame.x_range.0, 0.0)),
        frame.map((frame.x_range.1, 0.0)),
        AXIS_COLOR,
        1.0,
    );
    for (k, value) in correlogram.values.iter().enumerate() {
        let top = frame.map((k as f64, *value));
        canvas.line(frame.map((k as f64, 0.0)), top, HISTORY_COLOR, 1.5);
        canvas.circle(top, 4.0, HISTORY_COLOR);
    }

    frame.draw_labels(&mut canvas, title, "Lag", "Correlation");
    Ok(canvas.into_artifact())
}

fn check_residuals(residuals: &[f64], minimum: usize) -> Result<()> {
    if residuals.len() < minimum {
        return Err(ForecastError::Validation(format!(
            "Correlogram needs at least {} residuals, got {}",
            minimum,
            residuals.len()
        )));
    }
    ensure_finite(residuals, "Residuals")
}

/// Residual ACF with Bartlett bands, default size
pub fn render_autocorrelation(residuals: &[f64]) -> Result<ImageArtifact> {
    render_autocorrelation_with(residuals, &PlotConfig::default())
}

pub fn render_autocorrelation_with(residuals: &[f64], config: &PlotConfig) -> Result<ImageArtifact> {
    check_residuals(residuals, 2)?;
    let correlogram = acf(residuals, default_acf_lags(residuals.len()))?;
    render_correlogram(&correlogram, "Autocorrelation", config)
}

/// Residual PACF with `±z/sqrt(n)` bands, default size
pub fn render_partial_autocorrelation(
    residuals: &[f64],
    method: PacfMethod,
) -> Result<ImageArtifact> {
    render_partial_autocorrelation_with(residuals, method, &PlotConfig::default())
}

/// Residual PACF; needs four residuals so at least one lag is shown
pub fn render_partial_autocorrelation_with(
    residuals: &[f64],
    method: PacfMethod,
    config: &PlotConfig,
) -> Result<ImageArtifact> {
    check_residuals(residuals, 4)?;
    let correlogram = pacf(residuals, default_pacf_lags(residuals.len()), method)?;
    render_correlogram(&correlogram, "Partial Autocorrelation", config)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn residuals() -> Vec<f64> {
        (0..40)
            .map(|i| ((i * 37 % 11) as f64 - 5.0) + (i % 3) as f64 * 0.5)
            .collect()
    }

    #[test]
    fn canvas_escapes_text() {
        let mut canvas = SvgCanvas::new(&PlotConfig::default());
        canvas.text((0.0, 0.0), "a < b & c", 12, "start");
        let svg = canvas.into_artifact();
        let text = svg.as_str().unwrap();
        assert!(text.contains("a &lt; b &amp; c"));
        assert!(text.starts_with("<svg"));
        assert!(text.ends_with("</svg>"));
    }

    #[test]
    fn ticks_span_the_range() {
        assert_eq!(ticks((0.0, 10.0), 5), vec![0.0, 2.0, 4.0, 6.0, 8.0, 10.0]);
    }

    #[test]
    fn unresolvable_range_gives_single_tick() {
        let level = 1e17;
        let range = widen((level, level), 1.0);
        assert_eq!(ticks(range, 5), vec![level]);
    }

    #[test]
    fn correlograms_are_deterministic() {
        let r = residuals();
        assert_eq!(
            render_autocorrelation(&r).unwrap(),
            render_autocorrelation(&r).unwrap()
        );
        assert_eq!(
            render_partial_autocorrelation(&r, PacfMethod::Ywm).unwrap(),
            render_partial_autocorrelation(&r, PacfMethod::Ywm).unwrap()
        );
    }

    #[test]
    fn acf_plot_has_stem_per_lag() {
        let r = residuals();
        let artifact = render_autocorrelation(&r).unwrap();
        assert_eq!(artifact.media_type, SVG_MEDIA_TYPE);
        let text = artifact.as_str().unwrap();
        let lags = default_acf_lags(r.len());
        assert_eq!(text.matches("<circle").count(), lags + 1);
        assert!(text.contains("Autocorrelation"));
    }

    #[test]
    fn pacf_methods_differ() {
        let r = residuals();
        let yw = render_partial_autocorrelation(&r, PacfMethod::YuleWalker).unwrap();
        let ywm = render_partial_autocorrelation(&r, PacfMethod::Ywm).unwrap();
        assert_ne!(yw, ywm);
    }

    #[test]
    fn too_few_residuals_fail() {
        assert!(matches!(
            render_autocorrelation(&[1.0]),
            Err(ForecastError::Validation(_))
        ));
        assert!(matches!(
            render_partial_autocorrelation(&[1.0, 2.0, 3.0], PacfMethod::Ywm),
            Err(ForecastError::Validation(_))
        ));
    }

    #[test]
    fn non_finite_residuals_fail() {
        let mut r = residuals();
        r[3] = f64::INFINITY;
        assert!(matches!(
            render_autocorrelation(&r),
            Err(ForecastError::Validation(_))
        ));
    }

    #[test]
    fn custom_size_is_respected() {
        let config = PlotConfig {
            width: 320,
            height: 200,
        };
        let artifact = render_autocorrelation_with(&residuals(), &config).unwrap();
        assert!(artifact
            .as_str()
            .unwrap()
            .contains("width=\"320\" height=\"200\""));
    }

    #[test]
    fn ticks_are_round_numbers() {
        assert_eq!(ticks((0.0, 10.0), 5), vec![0.0, 2.0, 4.0, 6.0, 8.0, 10.0]);
        assert_eq!(format_tick(0.5), "0.5");
        assert_eq!(format_tick(1200.0), "1200");
    }
}
