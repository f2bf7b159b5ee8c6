use sonoscope_core::coords::{CoordinateTransform, FreqScale};
use sonoscope_core::raster::Raster;
use wasm_bindgen::{Clamped, JsCast};
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement, ImageData};
use crate::canvas::colors::freq_marker_label;

/// Paint a raster over the whole canvas. A raster already at the canvas's
/// device size goes straight in; anything else is scaled through a scratch
/// canvas.
pub fn blit_raster(ctx: &CanvasRenderingContext2d, canvas: &HtmlCanvasElement, raster: &Raster) {
    let cw = canvas.width() as f64;
    let ch = canvas.height() as f64;
    let _ = ctx.set_transform(1.0, 0.0, 0.0, 1.0, 0.0, 0.0);

    if raster.is_empty() {
        ctx.set_fill_style_str("#000");
        ctx.fill_rect(0.0, 0.0, cw, ch);
        return;
    }

    let image_data = match ImageData::new_with_u8_clamped_array_and_sh(
        Clamped(&raster.pixels[..]),
        raster.width,
        raster.height,
    ) {
        Ok(img) => img,
        Err(e) => {
            log::error!("Failed to create ImageData: {e:?}");
            return;
        }
    };

    if raster.width == canvas.width() && raster.height == canvas.height() {
        let _ = ctx.put_image_data(&image_data, 0.0, 0.0);
        return;
    }

    let Some(doc) = web_sys::window().and_then(|w| w.document()) else { return };
    let Some(tmp) = doc
        .create_element("canvas")
        .ok()
        .and_then(|el| el.dyn_into::<HtmlCanvasElement>().ok())
    else {
        return;
    };
    tmp.set_width(raster.width);
    tmp.set_height(raster.height);
    let Some(tmp_ctx) = tmp
        .get_context("2d")
        .ok()
        .flatten()
        .and_then(|c| c.dyn_into::<CanvasRenderingContext2d>().ok())
    else {
        return;
    };
    let _ = tmp_ctx.put_image_data(&image_data, 0.0, 0.0);
    let _ = ctx.draw_image_with_html_canvas_element_and_sw_and_sh_and_dx_and_dy_and_dw_and_dh(
        &tmp,
        0.0,
        0.0,
        raster.width as f64,
        raster.height as f64,
        0.0,
        0.0,
        cw,
        ch,
    );
}

/// 1-2-5 steps in Hz.
const FREQ_STEPS: &[f64] = &[
    1.0, 2.0, 5.0, 10.0, 20.0, 50.0, 100.0, 200.0, 500.0, 1_000.0, 2_000.0, 5_000.0, 10_000.0, 20_000.0,
    50_000.0, 100_000.0,
];

/// Minimum vertical gap between labelled gridlines, in logical pixels.
const MIN_LABEL_GAP: f64 = 22.0;

/// Frequencies to label on the current axis, bottom to top. Linear axes use
/// an even step; the others use decades and their 2× / 5× multiples, thinned
/// so labels do not collide.
pub fn freq_ticks(transform: &CoordinateTransform) -> Vec<f64> {
    let top = transform.axis.nyquist / transform.axis.playback_rate;
    let height = transform.size.height;
    if top <= 0.0 || height <= 0.0 {
        return Vec::new();
    }

    let candidates: Vec<f64> = match transform.mapping.target() {
        FreqScale::Linear => {
            let max_lines = (height / MIN_LABEL_GAP).floor().max(1.0);
            let step = FREQ_STEPS
                .iter()
                .copied()
                .find(|&s| top / s <= max_lines)
                .unwrap_or(FREQ_STEPS[FREQ_STEPS.len() - 1]);
            (1..).map(|i| i as f64 * step).take_while(|&f| f < top).collect()
        }
        FreqScale::Sqrt | FreqScale::Log => FREQ_STEPS.iter().copied().filter(|&f| f < top).collect(),
    };

    let mut ticks = Vec::new();
    let mut last_y = f64::INFINITY;
    for f in candidates {
        let y = transform.y_of(f);
        if last_y - y >= MIN_LABEL_GAP && y >= MIN_LABEL_GAP * 0.5 {
            ticks.push(f);
            last_y = y;
        }
    }
    ticks
}

/// Labelled horizontal gridlines. `ctx` draws in logical pixels.
pub fn draw_freq_axis(ctx: &CanvasRenderingContext2d, transform: &CoordinateTransform) {
    let width = transform.size.width;
    ctx.set_font("10px sans-serif");
    ctx.set_text_baseline("bottom");
    for f in freq_ticks(transform) {
        let y = transform.y_of(f).round() + 0.5;
        ctx.set_stroke_style_str("rgba(140, 200, 255, 0.25)");
        ctx.set_line_width(1.0);
        ctx.begin_path();
        ctx.move_to(0.0, y);
        ctx.line_to(width, y);
        ctx.stroke();

        let label = freq_marker_label(f);
        if let Ok(metrics) = ctx.measure_text(&label) {
            ctx.set_fill_style_str("rgba(0,0,0,0.6)");
            ctx.fill_rect(2.0, y - 13.0, metrics.width() + 4.0, 12.0);
        }
        ctx.set_fill_style_str("rgba(170, 215, 255, 0.85)");
        let _ = ctx.fill_text(&label, 4.0, y - 2.0);
    }
    ctx.set_text_baseline("alphabetic");
}

/// Small status badge in the top-right corner.
pub fn draw_badge(ctx: &CanvasRenderingContext2d, text: &str, width: f64) {
    ctx.set_font("10px sans-serif");
    let tw = ctx.measure_text(text).map(|m| m.width()).unwrap_or(0.0);
    ctx.set_fill_style_str("rgba(0,0,0,0.6)");
    ctx.fill_rect(width - tw - 10.0, 4.0, tw + 6.0, 14.0);
    ctx.set_fill_style_str("rgba(255,255,255,0.7)");
    let _ = ctx.fill_text(text, width - tw - 7.0, 15.0);
}

#[cfg(test)]
mod tests {
    use super::*;
    use sonoscope_core::coords::{FreqAxis, ScaleMapping, SurfaceSize};
    use sonoscope_core::types::TimeRange;

    fn transform(scale: FreqScale, rate: f64) -> CoordinateTransform {
        CoordinateTransform {
            view: TimeRange::new(0.0, 10.0),
            size: SurfaceSize::new(800.0, 300.0, 1.0),
            axis: FreqAxis::new(24_000.0, 1024).with_playback_rate(rate),
            mapping: ScaleMapping::Fixed(scale),
        }
    }

    #[test]
    fn linear_ticks_are_evenly_stepped_and_spaced() {
        let ticks = freq_ticks(&transform(FreqScale::Linear, 1.0));
        assert_eq!(ticks.first(), Some(&2_000.0));
        assert!(ticks.windows(2).all(|w| w[1] - w[0] == 2_000.0));
        assert!(ticks.iter().all(|&f| f < 24_000.0));
    }

    #[test]
    fn log_ticks_never_collide() {
        let t = transform(FreqScale::Log, 1.0);
        let ticks = freq_ticks(&t);
        assert!(!ticks.is_empty());
        for w in ticks.windows(2) {
            assert!(t.y_of(w[0]) - t.y_of(w[1]) >= MIN_LABEL_GAP);
        }
    }

    #[test]
    fn faster_playback_lowers_the_axis_top() {
        let ticks = freq_ticks(&transform(FreqScale::Linear, 2.0));
        assert!(ticks.iter().all(|&f| f < 12_000.0));
    }
}
