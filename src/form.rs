use std::collections::HashMap;

use axum::extract::Multipart;
use bytes::Bytes;

use crate::error::ApiError;

/// One uploaded file part, keyed by its multipart field name.
pub struct UploadedFile {
    pub field: String,
    pub content_type: String,
    pub body: Bytes,
}

/// Collected multipart body: text fields plus file parts, in arrival order
/// for the files.
#[derive(Default)]
pub struct FormData {
    fields: HashMap<String, String>,
    files: Vec<UploadedFile>,
}

impl FormData {
    pub async fn collect(mp: &mut Multipart) -> Result<Self, ApiError> {
        let mut form = FormData::default();
        while let Some(field) = mp
            .next_field()
            .await
            .map_err(|e| ApiError::bad_request(e.to_string()))?
        {
            let Some(name) = field.name().map(|s| s.to_string()) else {
                continue;
            };
            if field.file_name().is_some() {
                let content_type = field
                    .content_type()
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| "application/octet-stream".into());
                let body = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::bad_request(e.to_string()))?;
                form.files.push(UploadedFile {
                    field: name,
                    content_type,
                    body,
                });
            } else {
                let value = field
                    .text()
                    .await
                    .map_err(|e| ApiError::bad_request(e.to_string()))?;
                form.fields.insert(name, value);
            }
        }
        Ok(form)
    }

    /// Text field value, with empty strings treated as absent.
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(|s| s.as_str()).filter(|s| !s.is_empty())
    }

    /// First non-empty file uploaded under `name`.
    pub fn file(&self, name: &str) -> Option<&UploadedFile> {
        self.files
            .iter()
            .find(|f| f.field == name && !f.body.is_empty())
    }

    /// All non-empty file parts, in upload order.
    pub fn files(&self) -> impl Iterator<Item = &UploadedFile> {
        self.files.iter().filter(|f| !f.body.is_empty())
    }

    #[cfg(test)]
    pub fn from_parts(fields: Vec<(&str, &str)>, files: Vec<UploadedFile>) -> Self {
        Self {
            fields: fields
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            files,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_fields_are_absent() {
        let form = FormData::from_parts(vec![("title", ""), ("price", "20")], vec![]);
        assert_eq!(form.field("title"), None);
        assert_eq!(form.field("price"), Some("20"));
        assert_eq!(form.field("missing"), None);
    }

    #[test]
    fn zero_byte_files_are_skipped() {
        let files = vec![
            UploadedFile {
                field: "picture".into(),
                content_type: "image/jpeg".into(),
                body: Bytes::new(),
            },
            UploadedFile {
                field: "picture2".into(),
                content_type: "image/png".into(),
                body: Bytes::from_static(b"\x89PNG"),
            },
        ];
        let form = FormData::from_parts(vec![], files);
        assert!(form.file("picture").is_none());
        assert_eq!(form.files().count(), 1);
    }
}
