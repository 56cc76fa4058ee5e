//! Encoded polyline codec (precision 1e5, offset 63)
//!
//! Points are encoded latitude first but returned in GeoJSON order,
//! `[longitude, latitude]`, which is what every downstream consumer expects.

use crate::geometry::{GeometryError, LngLat};

const PRECISION: f64 = 1e5;
const OFFSET: u8 = 63;
const CONTINUATION: i64 = 0x20;
const CHUNK_MASK: i64 = 0x1f;

/// Decode an encoded polyline into `[lng, lat]` pairs
pub fn decode(polyline: &str) -> Result<Vec<LngLat>, GeometryError> {
    if polyline.is_empty() {
        return Err(GeometryError::InvalidInput(
            "polyline must be a non-empty string".to_string(),
        ));
    }

    let bytes = polyline.as_bytes();
    let mut index = 0;
    let mut lat: i64 = 0;
    let mut lng: i64 = 0;
    let mut points = Vec::new();

    while index < bytes.len() {
        lat += next_delta(bytes, &mut index)?;
        lng += next_delta(bytes, &mut index)?;
        points.push([lng as f64 / PRECISION, lat as f64 / PRECISION]);
    }

    Ok(points)
}

/// Encode `[lng, lat]` pairs into a polyline string
pub fn encode(coordinates: &[LngLat]) -> String {
    let mut out = String::new();
    let mut prev_lat: i64 = 0;
    let mut prev_lng: i64 = 0;

    for [lng, lat] in coordinates {
        let lat = (lat * PRECISION).round() as i64;
        let lng = (lng * PRECISION).round() as i64;
        push_value(&mut out, lat - prev_lat);
        push_value(&mut out, lng - prev_lng);
        prev_lat = lat;
        prev_lng = lng;
    }

    out
}

fn next_delta(bytes: &[u8], index: &mut usize) -> Result<i64, GeometryError> {
    let mut result: i64 = 0;
    let mut shift = 0;

    loop {
        let Some(&byte) = bytes.get(*index) else {
            return Err(GeometryError::TruncatedPolyline { offset: *index });
        };
        if !(OFFSET..=126).contains(&byte) {
            return Err(GeometryError::InvalidInput(format!(
                "unexpected byte 0x{byte:02x} at offset {index}",
                index = *index
            )));
        }
        if shift > 60 {
            return Err(GeometryError::InvalidInput(format!(
                "value starting before offset {} is too long",
                *index
            )));
        }

        let chunk = i64::from(byte - OFFSET);
        *index += 1;
        result |= (chunk & CHUNK_MASK) << shift;
        shift += 5;

        if chunk < CONTINUATION {
            break;
        }
    }

    Ok(if result & 1 != 0 {
        !(result >> 1)
    } else {
        result >> 1
    })
}

fn push_value(out: &mut String, value: i64) {
    let mut v = if value < 0 { !(value << 1) } else { value << 1 };
    while v >= CONTINUATION {
        out.push(char::from(((CONTINUATION | (v & CHUNK_MASK)) as u8) + OFFSET));
        v >>= 5;
    }
    out.push(char::from((v as u8) + OFFSET));
}

#[cfg(test)]
mod tests {
    use super::*;

    // Reference polyline from the public format description.
    const REFERENCE: &str = "_p~iF~ps|U_ulLnnqC_mqNvxq`@";

    #[test]
    fn test_decode_reference_polyline() {
        let points = decode(REFERENCE).unwrap();
        assert_eq!(
            points,
            vec![[-120.2, 38.5], [-120.95, 40.7], [-126.453, 43.252]]
        );
    }

    #[test]
    fn test_decode_swaps_to_lng_lat() {
        let points = decode(REFERENCE).unwrap();
        let [lng, lat] = points[0];
        assert!(lng < -100.0, "first component must be longitude");
        assert!(lat > 0.0, "second component must be latitude");
    }

    #[test]
    fn test_encode_reference_polyline() {
        let coords = vec![[-120.2, 38.5], [-120.95, 40.7], [-126.453, 43.252]];
        assert_eq!(encode(&coords), REFERENCE);
    }

    #[test]
    fn test_round_trip_within_precision() {
        let coords = vec![
            [2.352_221, 48.856_613],
            [2.295_0, 48.873_8],
            [-0.127_758, 51.507_351],
            [151.209_296, -33.868_820],
        ];
        let decoded = decode(&encode(&coords)).unwrap();
        assert_eq!(decoded.len(), coords.len());
        for (orig, got) in coords.iter().zip(&decoded) {
            assert!((orig[0] - got[0]).abs() <= 1e-5);
            assert!((orig[1] - got[1]).abs() <= 1e-5);
        }
    }

    #[test]
    fn test_decode_empty_is_invalid_input() {
        assert!(matches!(decode(""), Err(GeometryError::InvalidInput(_))));
    }

    #[test]
    fn test_decode_truncated_stream() {
        // Drop the final byte so the last longitude never terminates.
        let truncated = &REFERENCE[..REFERENCE.len() - 1];
        match decode(truncated) {
            Err(GeometryError::TruncatedPolyline { offset }) => {
                assert_eq!(offset, truncated.len());
            }
            other => panic!("Expected TruncatedPolyline, got {other:?}"),
        }
    }

    #[test]
    fn test_decode_missing_longitude() {
        // A complete latitude with no longitude after it.
        assert!(matches!(
            decode("_p~iF"),
            Err(GeometryError::TruncatedPolyline { offset: 5 })
        ));
    }

    #[test]
    fn test_decode_rejects_bytes_outside_alphabet() {
        assert!(matches!(
            decode("_p~iF ps|U"),
            Err(GeometryError::InvalidInput(_))
        ));
    }
}
