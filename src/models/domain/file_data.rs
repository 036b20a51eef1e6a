use std::path::Path;

use base64::{engine::general_purpose::STANDARD, Engine};
use serde::{Deserialize, Serialize};

use crate::errors::{AppError, AppResult};

/// An uploaded document or image as handed over by the file picker.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileData {
    #[serde(rename = "base64", with = "base64_bytes")]
    pub bytes: Vec<u8>,
    pub mime_type: String,
    pub name: String,
}

impl FileData {
    pub fn new(bytes: Vec<u8>, mime_type: &str, name: &str) -> Self {
        FileData {
            bytes,
            mime_type: mime_type.to_string(),
            name: name.to_string(),
        }
    }

    /// Reads a PDF or image from disk, enforcing the upload size limit.
    pub fn from_path(path: &Path, max_bytes: usize) -> AppResult<Self> {
        let mime_type = mime_type_for(path).ok_or_else(|| {
            AppError::ValidationError(format!(
                "Unsupported file type: {}. Upload a PDF or an image.",
                path.display()
            ))
        })?;

        let size = std::fs::metadata(path)?.len() as usize;
        if size > max_bytes {
            return Err(AppError::ValidationError(format!(
                "File size is too large ({} bytes). Max {} bytes.",
                size, max_bytes
            )));
        }

        let bytes = std::fs::read(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());

        Ok(FileData::new(bytes, mime_type, &name))
    }

    pub fn to_base64(&self) -> String {
        STANDARD.encode(&self.bytes)
    }

    pub fn is_image(&self) -> bool {
        self.mime_type.starts_with("image/")
    }
}

fn mime_type_for(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "pdf" => Some("application/pdf"),
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "webp" => Some("image/webp"),
        "gif" => Some("image/gif"),
        "heic" => Some("image/heic"),
        _ => None,
    }
}

mod base64_bytes {
    use base64::{engine::general_purpose::STANDARD, Engine};
    use serde::{Deserialize, Deserializer, Serializer};

    use crate::services::model_service::strip_data_url_prefix;

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD
            .decode(strip_data_url_prefix(&encoded))
            .map_err(serde::de::Error::custom)
    }
}
