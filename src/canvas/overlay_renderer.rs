use sonoscope_core::annotation::OverlayBox;
use sonoscope_core::coords::PixelRect;
use sonoscope_core::types::{FeatureType, Region};
use web_sys::CanvasRenderingContext2d;
use crate::canvas::colors::{feature_color, rgba};

/// Label colour for each box, looked up in the active region.
pub fn box_types(boxes: &[OverlayBox], region: Option<&Region>) -> Vec<FeatureType> {
    boxes
        .iter()
        .map(|b| {
            region
                .and_then(|r| r.feature(b.index))
                .map(|f| f.feature_type)
                .unwrap_or_default()
        })
        .collect()
}

/// Clear the overlay and draw feature boxes, the in-progress drag and the
/// playhead. `ctx` draws in logical pixels.
pub fn draw_overlay(
    ctx: &CanvasRenderingContext2d,
    boxes: &[OverlayBox],
    types: &[FeatureType],
    drag_rect: Option<PixelRect>,
    playhead_x: Option<f64>,
    width: f64,
    height: f64,
) {
    ctx.clear_rect(0.0, 0.0, width, height);

    ctx.set_font("bold 11px sans-serif");
    ctx.set_text_baseline("top");
    for (b, feature_type) in boxes.iter().zip(types.iter().copied()) {
        let color = feature_color(feature_type);
        let r = b.rect;
        if b.editing {
            ctx.set_fill_style_str(&rgba(color, 0.18));
            ctx.fill_rect(r.x, r.y, r.width, r.height);
            ctx.set_line_width(2.5);
        } else {
            ctx.set_line_width(1.5);
        }
        ctx.set_stroke_style_str(&rgba(color, 0.95));
        ctx.stroke_rect(r.x + 0.5, r.y + 0.5, r.width, r.height);

        // Index tag, kept inside the canvas when the box runs off the top.
        let label = b.index.to_string();
        let tw = ctx.measure_text(&label).map(|m| m.width()).unwrap_or(8.0);
        let tx = r.x.max(0.0) + 2.0;
        let ty = r.y.max(0.0) + 2.0;
        ctx.set_fill_style_str("rgba(0,0,0,0.65)");
        ctx.fill_rect(tx - 1.0, ty - 1.0, tw + 4.0, 14.0);
        ctx.set_fill_style_str(&rgba(color, 1.0));
        let _ = ctx.fill_text(&label, tx + 1.0, ty);
    }
    ctx.set_text_baseline("alphabetic");

    if let Some(r) = drag_rect {
        ctx.set_fill_style_str("rgba(255,255,255,0.08)");
        ctx.fill_rect(r.x, r.y, r.width, r.height);
        ctx.set_stroke_style_str("rgba(255,255,255,0.9)");
        ctx.set_line_width(1.0);
        let dash = js_sys::Array::of2(&4.0.into(), &3.0.into());
        let _ = ctx.set_line_dash(&dash);
        ctx.stroke_rect(r.x + 0.5, r.y + 0.5, r.width, r.height);
        let _ = ctx.set_line_dash(&js_sys::Array::new());
    }

    if let Some(x) = playhead_x.filter(|x| (0.0..=width).contains(x)) {
        let x = x.round() + 0.5;
        ctx.set_stroke_style_str("rgba(255, 80, 80, 0.9)");
        ctx.set_line_width(1.0);
        ctx.begin_path();
        ctx.move_to(x, 0.0);
        ctx.line_to(x, height);
        ctx.stroke();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sonoscope_core::types::{Feature, RegionId};

    #[test]
    fn box_types_follow_feature_labels() {
        let region = Region {
            id: RegionId(1),
            start_time: 0.0,
            end_time: 1.0,
            start_sample: 0,
            end_sample: 8_000,
            features: vec![
                Feature { index: 1, feature_type: FeatureType::Tonal, ..Default::default() },
                Feature { index: 2, feature_type: FeatureType::Pulsed, ..Default::default() },
            ],
        };
        let rect = PixelRect::from_corners(0.0, 0.0, 10.0, 10.0);
        let boxes = vec![
            OverlayBox { index: 2, rect, editing: false },
            OverlayBox { index: 7, rect, editing: true },
        ];
        assert_eq!(box_types(&boxes, Some(&region)), vec![FeatureType::Pulsed, FeatureType::Unlabelled]);
        assert_eq!(box_types(&boxes, None), vec![FeatureType::Unlabelled; 2]);
    }
}
