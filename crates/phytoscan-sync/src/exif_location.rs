//! Location read from the photo's own EXIF GPS tags.

use std::io::Cursor;

use async_trait::async_trait;
use ::exif::{Exif, Field, In, Reader, Tag, Value};
use phytoscan_core::location::{dms_to_decimal, parse_exif_timestamp};
use phytoscan_core::{LocationData, LocationSource};
use tracing::debug;

use crate::location::{LocationError, LocationProvider};

/// Provider backed by the GPS tags embedded in an image.
#[derive(Debug, Clone)]
pub struct ExifLocation {
    image: Vec<u8>,
}

impl ExifLocation {
    pub fn new(image: Vec<u8>) -> Self {
        Self { image }
    }

    /// Parse the image synchronously.
    pub fn read(&self) -> Result<LocationData, LocationError> {
        let exif = Reader::new()
            .read_from_container(&mut Cursor::new(&self.image))
            .map_err(|e| LocationError::Unavailable(format!("no EXIF data: {e}")))?;
        location_from_exif(&exif)
    }
}

#[async_trait]
impl LocationProvider for ExifLocation {
    async fn locate(&self) -> Result<LocationData, LocationError> {
        self.read()
    }
}

/// Build a fix from parsed EXIF. `DateTimeOriginal` is preferred over
/// `DateTime` for the capture time.
pub fn location_from_exif(exif: &Exif) -> Result<LocationData, LocationError> {
    let field = |tag| exif.get_field(tag, In::PRIMARY);
    let missing = || LocationError::Unavailable("photo has no GPS tags".into());

    let lat = field(Tag::GPSLatitude).and_then(dms).ok_or_else(missing)?;
    let lon = field(Tag::GPSLongitude).and_then(dms).ok_or_else(missing)?;
    let lat_ref = field(Tag::GPSLatitudeRef).and_then(ascii).unwrap_or_default();
    let lon_ref = field(Tag::GPSLongitudeRef).and_then(ascii).unwrap_or_default();

    let mut fix = LocationData::new(
        dms_to_decimal(lat, &lat_ref),
        dms_to_decimal(lon, &lon_ref),
        LocationSource::Exif,
    );
    fix.captured_at = field(Tag::DateTimeOriginal)
        .or_else(|| field(Tag::DateTime))
        .and_then(ascii)
        .and_then(|raw| parse_exif_timestamp(&raw));

    debug!(latitude = fix.latitude, longitude = fix.longitude, captured_at = ?fix.captured_at, "EXIF location read");
    Ok(fix)
}

fn dms(field: &Field) -> Option<[f64; 3]> {
    match &field.value {
        Value::Rational(parts) if parts.len() >= 3 => Some([
            parts[0].to_f64(),
            parts[1].to_f64(),
            parts[2].to_f64(),
        ]),
        _ => None,
    }
}

fn ascii(field: &Field) -> Option<String> {
    match &field.value {
        Value::Ascii(parts) => parts
            .first()
            .map(|bytes| String::from_utf8_lossy(bytes).trim().to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn put_u16(buf: &mut Vec<u8>, v: u16) {
        buf.extend_from_slice(&v.to_le_bytes());
    }

    fn put_u32(buf: &mut Vec<u8>, v: u32) {
        buf.extend_from_slice(&v.to_le_bytes());
    }

    fn entry(buf: &mut Vec<u8>, tag: u16, kind: u16, count: u32, value: u32) {
        put_u16(buf, tag);
        put_u16(buf, kind);
        put_u32(buf, count);
        put_u32(buf, value);
    }

    /// Little-endian TIFF: IFD0 (DateTime, GPS pointer) at 8, GPS IFD at 38,
    /// latitude rationals at 92, longitude at 116, DateTime text at 140.
    fn tiff_with_gps(lat: [u32; 3], lat_ref: u8, lon: [u32; 3], lon_ref: u8) -> Vec<u8> {
        let mut b = Vec::new();
        b.extend_from_slice(b"II*\0");
        put_u32(&mut b, 8);

        put_u16(&mut b, 2);
        entry(&mut b, 0x0132, 2, 20, 140);
        entry(&mut b, 0x8825, 4, 1, 38);
        put_u32(&mut b, 0);

        put_u16(&mut b, 4);
        entry(&mut b, 0x0001, 2, 2, u32::from(lat_ref));
        entry(&mut b, 0x0002, 5, 3, 92);
        entry(&mut b, 0x0003, 2, 2, u32::from(lon_ref));
        entry(&mut b, 0x0004, 5, 3, 116);
        put_u32(&mut b, 0);

        for v in lat.iter().chain(lon.iter()) {
            put_u32(&mut b, *v);
            put_u32(&mut b, 1);
        }
        b.extend_from_slice(b"2024:06:12 08:30:00\0");
        assert_eq!(b.len(), 160);
        b
    }

    #[test]
    fn reads_gps_and_capture_time() {
        let image = tiff_with_gps([14, 36, 0], b'N', [121, 0, 0], b'E');
        let fix = ExifLocation::new(image).read().unwrap();
        assert!((fix.latitude - 14.6).abs() < 1e-9);
        assert!((fix.longitude - 121.0).abs() < 1e-9);
        assert_eq!(fix.source, LocationSource::Exif);
        assert_eq!(
            fix.captured_at.map(|t| t.to_rfc3339()).as_deref(),
            Some("2024-06-12T08:30:00+00:00")
        );
    }

    #[test]
    fn southern_western_references_are_negative() {
        let image = tiff_with_gps([33, 52, 0], b'S', [151, 12, 0], b'W');
        let fix = ExifLocation::new(image).read().unwrap();
        assert!(fix.latitude < 0.0);
        assert!(fix.longitude < 0.0);
    }

    #[tokio::test]
    async fn image_without_exif_is_unavailable() {
        let provider = ExifLocation::new(vec![0xff, 0xd8, 0xff, 0xd9]);
        assert!(matches!(
            provider.locate().await,
            Err(LocationError::Unavailable(_))
        ));
    }
}
