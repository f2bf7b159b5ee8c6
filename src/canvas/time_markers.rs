use sonoscope_core::types::TimeRange;
use web_sys::CanvasRenderingContext2d;

/// 1-2-5 progression of tick intervals in seconds, from 1 ms to 2 h.
const TICK_INTERVALS: &[f64] = &[
    0.001, 0.002, 0.005,
    0.01, 0.02, 0.05,
    0.1, 0.2, 0.5,
    1.0, 2.0, 5.0,
    10.0, 30.0, 60.0,
    120.0, 300.0, 600.0,
    1_200.0, 1_800.0, 3_600.0, 7_200.0,
];

/// Smallest interval that keeps labels at least `min_px` apart.
pub fn tick_interval(visible_secs: f64, width_px: f64, min_px: f64) -> f64 {
    let px_per_sec = width_px / visible_secs;
    let min_interval = min_px / px_per_sec;
    TICK_INTERVALS
        .iter()
        .copied()
        .find(|&i| i >= min_interval)
        .unwrap_or(TICK_INTERVALS[TICK_INTERVALS.len() - 1])
}

/// Label for `seconds` after the start of the recording, with precision to
/// match the tick interval. Spans past a minute read as `h:mm:ss` / `m:ss`.
pub fn format_time_label(seconds: f64, interval: f64) -> String {
    if interval < 1.0 && seconds < 60.0 {
        let decimals = if interval >= 0.1 { 1 } else if interval >= 0.01 { 2 } else { 3 };
        return format!("{:.*}s", decimals, seconds);
    }
    if seconds < 60.0 && interval < 60.0 {
        return format!("{:.0}s", seconds);
    }
    let total = (if interval < 1.0 { seconds.floor() } else { seconds.round() }) as u64;
    let (h, m, s) = (total / 3_600, (total / 60) % 60, total % 60);
    let mut label = if h > 0 { format!("{h}:{m:02}:{s:02}") } else { format!("{m}:{s:02}") };
    if interval < 1.0 {
        let frac = seconds - seconds.floor();
        label.push_str(&format!("{:.1}", frac)[1..]);
    }
    label
}

/// Tick marks and labels along the bottom of a canvas showing `view`.
/// Labels count from `data_start`.
pub fn draw_time_markers(
    ctx: &CanvasRenderingContext2d,
    view: TimeRange,
    data_start: f64,
    canvas_width: f64,
    canvas_height: f64,
) {
    let visible = view.width();
    if visible <= 0.0 || canvas_width <= 0.0 {
        return;
    }
    let px_per_sec = canvas_width / visible;
    let interval = tick_interval(visible, canvas_width, 100.0);

    // Minor ticks
    let minor_interval = interval / 5.0;
    if minor_interval * px_per_sec >= 4.0 {
        ctx.set_stroke_style_str("rgba(255,255,255,0.15)");
        ctx.set_line_width(1.0);
        let first = ((view.start - data_start) / minor_interval).ceil() as i64;
        let last = ((view.end - data_start) / minor_interval).floor() as i64;
        for i in first..=last {
            if i % 5 == 0 {
                continue;
            }
            let x = (data_start + i as f64 * minor_interval - view.start) * px_per_sec;
            ctx.begin_path();
            ctx.move_to(x, canvas_height - 6.0);
            ctx.line_to(x, canvas_height);
            ctx.stroke();
        }
    }

    // Major ticks + labels
    let tick_h = 12.0;
    ctx.set_font("10px sans-serif");
    ctx.set_text_baseline("bottom");
    let first = ((view.start - data_start) / interval).ceil() as i64;
    let last = ((view.end - data_start) / interval).floor() as i64;
    for i in first..=last {
        let rel = i as f64 * interval;
        let x = (data_start + rel - view.start) * px_per_sec;

        ctx.set_stroke_style_str("rgba(255,255,255,0.35)");
        ctx.set_line_width(1.0);
        ctx.begin_path();
        ctx.move_to(x, canvas_height - tick_h);
        ctx.line_to(x, canvas_height);
        ctx.stroke();

        let label = format_time_label(rel, interval);
        if let Ok(metrics) = ctx.measure_text(&label) {
            let tw = metrics.width();
            let lx = x + 3.0;
            if lx + tw < canvas_width - 2.0 {
                ctx.set_fill_style_str("rgba(0,0,0,0.6)");
                ctx.fill_rect(lx - 1.0, canvas_height - tick_h - 12.0, tw + 2.0, 12.0);
                ctx.set_fill_style_str("rgba(255,255,255,0.7)");
                let _ = ctx.fill_text(&label, lx, canvas_height - tick_h - 1.0);
            }
        }
    }
    ctx.set_text_baseline("alphabetic");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interval_keeps_labels_apart() {
        // A full hour across 1000 px: 100 px is 360 s, next step up is 600 s.
        assert_eq!(tick_interval(3_600.0, 1_000.0, 100.0), 600.0);
        assert_eq!(tick_interval(1.0, 1_000.0, 100.0), 0.1);
    }

    #[test]
    fn labels_follow_span() {
        assert_eq!(format_time_label(0.25, 0.05), "0.25s");
        assert_eq!(format_time_label(12.0, 2.0), "12s");
        assert_eq!(format_time_label(600.0, 300.0), "10:00");
        assert_eq!(format_time_label(5_400.0, 1_800.0), "1:30:00");
        assert_eq!(format_time_label(3_723.5, 0.5), "1:02:03.5");
    }
}
