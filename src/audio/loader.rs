use std::io::Cursor;
use js_sys::Uint8Array;
use sonoscope_core::types::Signal;
use wasm_bindgen_futures::JsFuture;

/// Read a dropped or picked WAV file into a mono signal.
pub async fn load_file(file: web_sys::File) -> Result<Signal, String> {
    let buffer = JsFuture::from(file.array_buffer())
        .await
        .map_err(|e| format!("could not read {}: {e:?}", file.name()))?;
    let bytes = Uint8Array::new(&buffer).to_vec();
    decode_wav(&bytes)
}

/// Decode WAV bytes, mixing all channels down to mono in `[-1, 1]`.
pub fn decode_wav(bytes: &[u8]) -> Result<Signal, String> {
    let reader = hound::WavReader::new(Cursor::new(bytes)).map_err(|e| format!("not a WAV file: {e}"))?;
    let spec = reader.spec();
    let channels = spec.channels.max(1) as usize;

    let interleaved: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .into_samples::<f32>()
            .collect::<Result<_, _>>()
            .map_err(|e| format!("bad float sample: {e}"))?,
        hound::SampleFormat::Int => {
            let scale = 1.0 / (1u64 << (spec.bits_per_sample.saturating_sub(1))) as f32;
            reader
                .into_samples::<i32>()
                .map(|s| s.map(|v| v as f32 * scale))
                .collect::<Result<_, _>>()
                .map_err(|e| format!("bad integer sample: {e}"))?
        }
    };
    if interleaved.is_empty() {
        return Err("WAV file has no samples".to_string());
    }

    let mono = if channels == 1 {
        interleaved
    } else {
        interleaved
            .chunks(channels)
            .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
            .collect()
    };
    log::info!(
        "Decoded {} frames, {} channel(s), {} Hz, {}-bit",
        mono.len(),
        channels,
        spec.sample_rate,
        spec.bits_per_sample
    );
    Ok(Signal::new(mono, spec.sample_rate, 0.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stereo_wav() -> Vec<u8> {
        let spec = hound::WavSpec {
            channels: 2,
            sample_rate: 8_000,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
            for _ in 0..100 {
                writer.write_sample(16_384i16).unwrap();
                writer.write_sample(0i16).unwrap();
            }
            writer.finalize().unwrap();
        }
        cursor.into_inner()
    }

    #[test]
    fn stereo_int_wav_is_mixed_to_mono() {
        let signal = decode_wav(&stereo_wav()).unwrap();
        assert_eq!(signal.sample_rate, 8_000);
        assert_eq!(signal.samples.len(), 100);
        assert!((signal.samples[0] - 0.25).abs() < 1e-6);
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(decode_wav(b"definitely not a wav").is_err());
    }
}
