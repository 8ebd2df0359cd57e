use crate::error::ImportError;
use crate::wakatime::ExportPayload;
use flate2::read::GzDecoder;
use std::io::Read;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Decode a downloaded data dump, inflating it first if it is gzip-compressed.
///
/// Payloads larger than `limit` bytes, before or after inflation, are rejected.
pub fn decode_payload(raw: &[u8], limit: usize) -> Result<ExportPayload, ImportError> {
    if raw.len() > limit {
        return Err(too_large(limit));
    }

    if raw.starts_with(&GZIP_MAGIC) {
        log::debug!("decompressing data dump ({} bytes)", raw.len());
        let decoder = GzDecoder::new(raw);
        let mut inflated = Vec::new();
        decoder
            .take((limit as u64).saturating_add(1))
            .read_to_end(&mut inflated)
            .map_err(|e| ImportError::Payload(format!("gzip: {}", e)))?;
        if inflated.len() > limit {
            return Err(too_large(limit));
        }
        return Ok(serde_json::from_slice(&inflated)?);
    }

    Ok(serde_json::from_slice(raw)?)
}

fn too_large(limit: usize) -> ImportError {
    ImportError::Payload(format!("data dump exceeds {} bytes", limit))
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::Compression;
    use flate2::write::GzEncoder;
    use std::io::Write;

    const PAYLOAD: &str = r#"{"days": [{"date": "2023-07-01", "heartbeats": [{"entity": "a.rs", "time": 1688169600.0}]}]}"#;
    const LIMIT: usize = 1 << 20;

    fn gzip(data: &[u8]) -> Vec<u8> {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(data).unwrap();
        encoder.finish().unwrap()
    }

    #[test]
    fn decodes_plain_json() {
        let payload = decode_payload(PAYLOAD.as_bytes(), LIMIT).unwrap();
        assert_eq!(payload.days.len(), 1);
        assert_eq!(payload.days[0].heartbeats.len(), 1);
    }

    #[test]
    fn decodes_gzip_json() {
        let payload = decode_payload(&gzip(PAYLOAD.as_bytes()), LIMIT).unwrap();
        assert_eq!(payload.days[0].heartbeats[0].entity, "a.rs");
    }

    #[test]
    fn rejects_garbage() {
        assert!(matches!(
            decode_payload(b"<html>expired</html>", LIMIT),
            Err(ImportError::Decode(_))
        ));
        assert!(matches!(
            decode_payload(&[0x1f, 0x8b, 0x00], LIMIT),
            Err(ImportError::Payload(_))
        ));
    }

    #[test]
    fn caps_inflated_size() {
        let bomb = gzip(&vec![b' '; 64 * 1024]);
        assert!(bomb.len() < 1024);
        assert!(matches!(
            decode_payload(&bomb, 1024),
            Err(ImportError::Payload(msg)) if msg.contains("exceeds")
        ));
    }

    #[test]
    fn payload_exactly_at_limit_is_accepted() {
        assert!(decode_payload(PAYLOAD.as_bytes(), PAYLOAD.len()).is_ok());

        let padded = format!("{PAYLOAD}{}", " ".repeat(4096));
        assert!(decode_payload(&gzip(padded.as_bytes()), padded.len()).is_ok());
    }

    #[test]
    fn caps_plain_size() {
        assert!(matches!(
            decode_payload(PAYLOAD.as_bytes(), 16),
            Err(ImportError::Payload(_))
        ));
    }
}
