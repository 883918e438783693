// Generation model seam
// One text (or text plus image) in, one text out. Used for the
// room-description step and for the final recommendation step.


use crate::{AssistantError, Result};

/// A generative model collaborator.
///
/// Failures surface as `GenerationUnavailable`; the caller decides what that
/// means for the request.
pub trait GenerativeModel: Send + Sync {
    /// Generate text from a plain prompt
    fn generate(&self, prompt: &str) -> Result<String>;

    /// Generate text from a prompt plus one image
    fn describe_image(&self, prompt: &str, image: &ImageSource) -> Result<String>;
}

/// An image reference accepted by the service: either a data URI carrying the
/// bytes inline, or a remote URL to fetch.
#[derive(Debug, Clone, PartialEq)]
pub enum ImageSource {
    DataUri { mime_type: String, data: String },
    Remote(String),
}

impl ImageSource {
    /// Parse a url-or-data-uri string as supplied in the request body
    pub fn parse(raw: &str) -> Result<Self> {
        let raw = raw.trim();

        if let Some(rest) = raw.strip_prefix("data:") {
            let (header, data) = rest.split_once(',').ok_or_else(|| {
                AssistantError::InvalidArgument("Malformed data URI in image field".to_string())
            })?;

            let mime_type = header
                .strip_suffix(";base64")
                .ok_or_else(|| {
                    AssistantError::InvalidArgument(
                        "Image data URI must be base64-encoded".to_string(),
                    )
                })?
                .to_string();

            if mime_type.is_empty() || data.is_empty() {
                return Err(AssistantError::InvalidArgument(
                    "Image data URI is missing a media type or payload".to_string(),
                ));
            }

            return Ok(Self::DataUri {
                mime_type,
                data: data.to_string(),
            });
        }

        if raw.starts_with("http://") || raw.starts_with("https://") {
            return Ok(Self::Remote(raw.to_string()));
        }

        Err(AssistantError::InvalidArgument(
            "Image must be an http(s) URL or a base64 data URI".to_string(),
        ))
    }
}
