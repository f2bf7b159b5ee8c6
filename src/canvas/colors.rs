use sonoscope_core::types::FeatureType;

/// Outline colour for a feature box, by label.
pub fn feature_color(feature_type: FeatureType) -> [u8; 3] {
    match feature_type {
        FeatureType::Unlabelled => [255, 200, 50],  // amber
        FeatureType::Tonal => [80, 220, 140],       // green
        FeatureType::Broadband => [255, 110, 80],   // red-orange
        FeatureType::Pulsed => [120, 170, 255],     // blue
        FeatureType::Other => [220, 130, 255],      // violet
    }
}

pub fn rgba(color: [u8; 3], alpha: f64) -> String {
    format!("rgba({},{},{},{})", color[0], color[1], color[2], alpha)
}

/// Label for a frequency gridline: Hz below 1 kHz, otherwise kHz with at
/// most one decimal.
pub fn freq_marker_label(freq_hz: f64) -> String {
    if freq_hz < 1_000.0 {
        format!("{} Hz", freq_hz.round() as u32)
    } else {
        let khz = freq_hz / 1_000.0;
        if (khz - khz.round()).abs() < 1e-6 {
            format!("{} kHz", khz.round() as u32)
        } else {
            format!("{:.1} kHz", khz)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_switch_to_khz() {
        assert_eq!(freq_marker_label(500.0), "500 Hz");
        assert_eq!(freq_marker_label(2_000.0), "2 kHz");
        assert_eq!(freq_marker_label(2_500.0), "2.5 kHz");
    }
}
