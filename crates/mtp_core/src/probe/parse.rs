//! Parsing of the prober's JSON output.

use std::collections::BTreeMap;
use std::path::Path;

use serde_json::{Map, Value};

use super::errors::ProbeOutcome;
use crate::models::{AudioTrackDescriptor, ProbeResult};

/// Parse the prober's stdout into a `ProbeResult`.
///
/// Only streams with `codec_type == "audio"` are kept. They receive dense
/// audio indices in encounter order; the native `index` is kept for display.
pub fn parse_probe_output(stdout: &[u8], path: &Path) -> ProbeOutcome<ProbeResult> {
    // Top level must be an object; `null`, arrays and scalars are parse errors
    let root: Map<String, Value> = serde_json::from_slice(stdout)?;
    Ok(parse_probe_json(&Value::Object(root), path))
}

fn parse_probe_json(json: &Value, path: &Path) -> ProbeResult {
    let mut result = ProbeResult {
        file_path: path.to_path_buf(),
        ..Default::default()
    };

    if let Some(format) = json.get("format") {
        result.duration = format
            .get("duration")
            .and_then(number_f64)
            .filter(|d| d.is_finite() && *d >= 0.0);
        result.format_name = string_field(format, "format_name");
        result.format_long_name = string_field(format, "format_long_name");
    }

    if let Some(streams) = json.get("streams").and_then(|s| s.as_array()) {
        let audio = streams
            .iter()
            .filter(|s| s.get("codec_type").and_then(|t| t.as_str()) == Some("audio"));

        for (audio_index, stream) in audio.enumerate() {
            result
                .audio_tracks
                .push(parse_audio_stream(audio_index, stream));
        }
    }

    result
}

fn parse_audio_stream(audio_index: usize, stream: &Value) -> AudioTrackDescriptor {
    let stream_index = stream.get("index").and_then(number_u64).map(|i| i as usize);

    let mut track = AudioTrackDescriptor::new(audio_index, stream_index);
    track.codec_name = string_field(stream, "codec_name");
    track.channels = stream
        .get("channels")
        .and_then(number_u64)
        .and_then(|c| u32::try_from(c).ok());
    track.sample_rate = stream
        .get("sample_rate")
        .and_then(number_u64)
        .and_then(|r| u32::try_from(r).ok());
    track.bit_rate = stream.get("bit_rate").and_then(number_u64);
    track.tags = parse_tags(stream.get("tags"));
    track
}

/// Flatten a tag object; non-string values are stringified.
fn parse_tags(tags: Option<&Value>) -> BTreeMap<String, String> {
    let Some(obj) = tags.and_then(|t| t.as_object()) else {
        return BTreeMap::new();
    };

    obj.iter()
        .filter(|(_, v)| !v.is_null())
        .map(|(k, v)| {
            let text = match v {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            (k.clone(), text)
        })
        .collect()
}

fn string_field(obj: &Value, key: &str) -> Option<String> {
    obj.get(key)
        .and_then(|v| v.as_str())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// A JSON number or numeric string as f64. Anything else is unset.
fn number_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|v| v.is_finite())
}

/// A JSON number or numeric string as a non-negative integer.
fn number_u64(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0 && f.fract() == 0.0).map(|f| f as u64)),
        Value::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::ProbeError;

    const SAMPLE: &str = r#"{
        "streams": [
            {"index": 0, "codec_type": "video", "codec_name": "h264"},
            {"index": 2, "codec_type": "audio", "codec_name": "ac3",
             "channels": 6, "sample_rate": "48000", "bit_rate": "640000",
             "tags": {"language": "jpn", "title": "Commentary"}},
            {"index": 3, "codec_type": "subtitle", "codec_name": "ass"},
            {"index": 5, "codec_type": "audio", "codec_name": "aac",
             "channels": 2, "sample_rate": "44100", "bit_rate": "N/A"},
            {"index": 7, "codec_type": "audio", "codec_name": "flac",
             "channels": "two", "tags": {"language": "eng", "NUMBER_OF_FRAMES": 1200}}
        ],
        "format": {
            "duration": "1421.504000",
            "format_name": "matroska,webm",
            "format_long_name": "Matroska / WebM"
        }
    }"#;

    #[test]
    fn audio_indices_are_dense_in_stream_order() {
        let result = parse_probe_output(SAMPLE.as_bytes(), Path::new("/media/show.mkv")).unwrap();

        let indices: Vec<usize> = result.audio_tracks.iter().map(|t| t.audio_index).collect();
        let native: Vec<Option<usize>> =
            result.audio_tracks.iter().map(|t| t.stream_index).collect();

        assert_eq!(indices, vec![0, 1, 2]);
        assert_eq!(native, vec![Some(2), Some(5), Some(7)]);
        assert_eq!(result.audio_tracks[1].codec_name.as_deref(), Some("aac"));
    }

    #[test]
    fn numeric_strings_are_parsed() {
        let result = parse_probe_output(SAMPLE.as_bytes(), Path::new("a.mkv")).unwrap();
        let first = &result.audio_tracks[0];

        assert_eq!(first.channels, Some(6));
        assert_eq!(first.sample_rate, Some(48000));
        assert_eq!(first.bit_rate, Some(640_000));
        assert_eq!(first.language(), Some("jpn"));
        assert_eq!(first.title(), Some("Commentary"));
    }

    #[test]
    fn non_numeric_fields_are_unset_not_zero() {
        let result = parse_probe_output(SAMPLE.as_bytes(), Path::new("a.mkv")).unwrap();

        assert_eq!(result.audio_tracks[1].bit_rate, None);
        assert_eq!(result.audio_tracks[2].channels, None);
        assert_eq!(result.audio_tracks[2].sample_rate, None);
    }

    #[test]
    fn tags_are_stringified() {
        let result = parse_probe_output(SAMPLE.as_bytes(), Path::new("a.mkv")).unwrap();
        let tags = &result.audio_tracks[2].tags;

        assert_eq!(tags.get("NUMBER_OF_FRAMES").map(String::as_str), Some("1200"));
        assert_eq!(tags.get("language").map(String::as_str), Some("eng"));
    }

    #[test]
    fn format_fields_are_read() {
        let result = parse_probe_output(SAMPLE.as_bytes(), Path::new("a.mkv")).unwrap();

        assert_eq!(result.duration, Some(1421.504));
        assert_eq!(result.format_name.as_deref(), Some("matroska,webm"));
        assert_eq!(result.format_long_name.as_deref(), Some("Matroska / WebM"));
    }

    #[test]
    fn unparseable_duration_is_absent() {
        let json = r#"{"streams": [], "format": {"duration": "N/A"}}"#;
        let result = parse_probe_output(json.as_bytes(), Path::new("a.mkv")).unwrap();

        assert_eq!(result.duration, None);
        assert!(result.audio_tracks.is_empty());
    }

    #[test]
    fn missing_sections_give_empty_result() {
        let result = parse_probe_output(b"{}", Path::new("a.mkv")).unwrap();
        assert_eq!(result.track_count(), 0);
        assert_eq!(result.format_name, None);
    }

    #[test]
    fn invalid_json_is_a_parse_error() {
        let err = parse_probe_output(b"not json", Path::new("a.mkv")).unwrap_err();
        assert!(matches!(err, ProbeError::Parse(_)));
    }

    #[test]
    fn non_object_json_is_a_parse_error() {
        let cases: [&[u8]; 4] = [b"null", b"[]", b"\"x\"", b"42"];
        for stdout in cases {
            let err = parse_probe_output(stdout, Path::new("a.mkv")).unwrap_err();
            assert!(matches!(err, ProbeError::Parse(_)), "accepted {:?}", stdout);
        }
    }
}
