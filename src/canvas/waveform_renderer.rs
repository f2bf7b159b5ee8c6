use sonoscope_core::coords::{pixel_to_time, time_to_pixel, time_to_sample};
use sonoscope_core::types::TimeRange;
use web_sys::CanvasRenderingContext2d;

/// Draw the waveform for `view`. Uses a min/max envelope per pixel column
/// when several samples share a pixel, connected samples when zoomed in.
#[allow(clippy::too_many_arguments)]
pub fn draw_waveform(
    ctx: &CanvasRenderingContext2d,
    samples: &[f32],
    sample_rate: u32,
    data_start: f64,
    view: TimeRange,
    canvas_width: f64,
    canvas_height: f64,
    region: Option<TimeRange>,
) {
    ctx.set_fill_style_str("#0a0a0a");
    ctx.fill_rect(0.0, 0.0, canvas_width, canvas_height);

    if samples.is_empty() || view.width() <= 0.0 || canvas_width <= 0.0 {
        return;
    }
    let mid_y = canvas_height / 2.0;

    if let Some(region) = region {
        let x0 = time_to_pixel(region.start, view, canvas_width).max(0.0);
        let x1 = time_to_pixel(region.end, view, canvas_width).min(canvas_width);
        if x1 > x0 {
            ctx.set_fill_style_str("rgba(50, 120, 200, 0.2)");
            ctx.fill_rect(x0, 0.0, x1 - x0, canvas_height);
        }
    }

    ctx.set_stroke_style_str("#333");
    ctx.set_line_width(1.0);
    ctx.begin_path();
    ctx.move_to(0.0, mid_y);
    ctx.line_to(canvas_width, mid_y);
    ctx.stroke();

    ctx.set_stroke_style_str("#6a6");
    let index_at = |x: f64| -> usize {
        let t = pixel_to_time(x, view, canvas_width);
        time_to_sample(t, sample_rate, data_start).max(0.0) as usize
    };
    let samples_per_pixel = view.width() * sample_rate as f64 / canvas_width;

    if samples_per_pixel <= 2.0 {
        ctx.begin_path();
        let first = index_at(0.0).saturating_sub(1);
        let last = (index_at(canvas_width) + 1).min(samples.len().saturating_sub(1));
        for (n, idx) in (first..=last).enumerate() {
            let t = data_start + idx as f64 / sample_rate as f64;
            let x = time_to_pixel(t, view, canvas_width);
            let y = mid_y - samples[idx] as f64 * mid_y * 0.9;
            if n == 0 {
                ctx.move_to(x, y);
            } else {
                ctx.line_to(x, y);
            }
        }
        ctx.stroke();
    } else {
        for px in 0..(canvas_width as usize) {
            let i0 = index_at(px as f64).min(samples.len());
            let i1 = index_at(px as f64 + 1.0).min(samples.len());
            if i0 >= i1 {
                continue;
            }
            let (lo, hi) = samples[i0..i1]
                .iter()
                .fold((f32::MAX, f32::MIN), |(lo, hi), &s| (lo.min(s), hi.max(s)));
            ctx.begin_path();
            ctx.move_to(px as f64 + 0.5, mid_y - hi as f64 * mid_y * 0.9);
            ctx.line_to(px as f64 + 0.5, mid_y - lo as f64 * mid_y * 0.9);
            ctx.stroke();
        }
    }
}

/// Vertical position indicator at `t`.
pub fn draw_playhead(ctx: &CanvasRenderingContext2d, t: f64, view: TimeRange, canvas_width: f64, canvas_height: f64) {
    if !view.contains(t) {
        return;
    }
    let x = time_to_pixel(t, view, canvas_width).round() + 0.5;
    ctx.set_stroke_style_str("rgba(255, 80, 80, 0.9)");
    ctx.set_line_width(1.0);
    ctx.begin_path();
    ctx.move_to(x, 0.0);
    ctx.line_to(x, canvas_height);
    ctx.stroke();
}
