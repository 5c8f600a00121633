use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};

/// An uploaded coupon photo after decoding
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedImage {
    pub bytes: Vec<u8>,
    pub mime_type: String,
}

/// Decode the `image` field of a capture request
///
/// Accepts plain base64 or a `data:image/...;base64,` URL. The decoded bytes
/// must be a recognizable image no larger than `max_bytes`.
pub fn decode_image_payload(payload: &str, max_bytes: usize) -> Result<DecodedImage, String> {
    let encoded = match payload.split_once(',') {
        Some((_, data)) => data,
        None => payload,
    };

    let compact: String = encoded.chars().filter(|c| !c.is_whitespace()).collect();
    if compact.is_empty() {
        return Err("No image provided".to_string());
    }

    // base64 expands by 4/3; reject oversized payloads before decoding
    if compact.len() / 4 * 3 > max_bytes + 3 {
        return Err(format!("Image exceeds {} bytes", max_bytes));
    }

    let bytes = BASE64
        .decode(compact.as_bytes())
        .map_err(|e| format!("Image is not valid base64: {}", e))?;

    if bytes.is_empty() {
        return Err("No image provided".to_string());
    }
    if bytes.len() > max_bytes {
        return Err(format!("Image exceeds {} bytes", max_bytes));
    }

    let mime_type = validate_image_bytes(&bytes)?;
    Ok(DecodedImage { bytes, mime_type })
}

/// Sniff the bytes and return the image MIME type
pub fn validate_image_bytes(bytes: &[u8]) -> Result<String, String> {
    match infer::get(bytes) {
        Some(kind) if kind.matcher_type() == infer::MatcherType::Image => {
            Ok(kind.mime_type().to_string())
        }
        Some(kind) => Err(format!("Only image files are allowed, got {}", kind.mime_type())),
        None => Err("Only image files are allowed".to_string()),
    }
}
