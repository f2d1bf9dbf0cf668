//! Multi-field file upload processing.
//!
//! A request carries zero or more files per named field. [`FileUploader`]
//! checks each configured [`FileField`] against what arrived, validates the
//! first file of every present field, then uploads them concurrently.
//! Failures on optional fields are logged and the field is left out of the
//! result; failures on required fields fail the whole request.

use std::collections::HashMap;
use std::sync::Arc;

use bytes::Bytes;
use futures::future::try_join_all;
use tracing::warn;
use typed_builder::TypedBuilder;

use crate::error::StoreError;
use crate::reference::ObjectReference;
use crate::store::ObjectStore;

/// A file received from a client.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    /// Name of the form field the file arrived under.
    pub field_name: String,
    /// File name as sent by the client.
    pub original_name: String,
    /// Declared MIME type.
    pub mime_type: String,
    /// Size in bytes.
    pub size: u64,
    /// File contents.
    pub data: Bytes,
}

impl UploadedFile {
    /// Create a file, taking its size from `data`.
    pub fn new(
        field_name: impl Into<String>,
        original_name: impl Into<String>,
        mime_type: impl Into<String>,
        data: impl Into<Bytes>,
    ) -> Self {
        let data = data.into();
        Self {
            field_name: field_name.into(),
            original_name: original_name.into(),
            mime_type: mime_type.into(),
            size: data.len() as u64,
            data,
        }
    }
}

/// Configuration of one upload field.
#[derive(Debug, Clone, TypedBuilder)]
pub struct FileField {
    /// Form field name.
    #[builder(setter(into))]
    pub name: String,

    /// Destination bucket.
    #[builder(default, setter(strip_option, into))]
    pub bucket: Option<String>,

    /// Whether the request fails when this field is absent.
    #[builder(default = false)]
    pub required: bool,

    /// Most files accepted under this field. Only the first is stored.
    #[builder(default = 1)]
    pub max_count: usize,

    /// Accepted MIME types, compared case-insensitively. Empty accepts all.
    #[builder(default)]
    pub allowed_mime_types: Vec<String>,

    /// Largest accepted size in bytes.
    #[builder(default, setter(strip_option))]
    pub max_size: Option<u64>,
}

/// A stored field: the field name and where its file went.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredField {
    /// Form field name.
    pub field: String,
    /// Reference to the stored object.
    pub reference: ObjectReference,
}

/// Reasons an upload request is rejected.
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    /// A field with files has no destination bucket.
    #[error("bucket name is required for file field {field}")]
    MissingBucket {
        /// Field name.
        field: String,
    },

    /// A required field has no file.
    #[error("required file {field} is missing")]
    MissingFile {
        /// Field name.
        field: String,
    },

    /// More files arrived than the field accepts.
    #[error("field {field} accepts at most {max_count} file(s), received {received}")]
    TooManyFiles {
        /// Field name.
        field: String,
        /// Configured limit.
        max_count: usize,
        /// Files received.
        received: usize,
    },

    /// The file is larger than allowed.
    #[error("file {file} exceeds maximum size of {}MB", format_megabytes(.max_size))]
    TooLarge {
        /// Original file name.
        file: String,
        /// Limit in bytes.
        max_size: u64,
    },

    /// The file's MIME type is not in the allow-list.
    #[error(
        "file {file} has invalid type. Received: {received}, allowed types: {}",
        .allowed.join(", ")
    )]
    InvalidMimeType {
        /// Original file name.
        file: String,
        /// Declared MIME type.
        received: String,
        /// Allowed MIME types.
        allowed: Vec<String>,
    },

    /// Storing a required field's file failed.
    #[error("failed to upload required file for {field}")]
    RequiredUploadFailed {
        /// Field name.
        field: String,
        /// Underlying store failure.
        #[source]
        source: StoreError,
    },
}

#[allow(clippy::cast_precision_loss, clippy::trivially_copy_pass_by_ref)]
fn format_megabytes(bytes: &u64) -> String {
    let mb = *bytes as f64 / (1024.0 * 1024.0);
    let rounded = format!("{mb:.2}");
    rounded
        .trim_end_matches('0')
        .trim_end_matches('.')
        .to_owned()
}

/// Check one file against its field's limits.
///
/// # Errors
///
/// Returns [`UploadError::TooLarge`] or [`UploadError::InvalidMimeType`].
pub fn validate_file(field: &FileField, file: &UploadedFile) -> Result<(), UploadError> {
    if let Some(max_size) = field.max_size {
        if file.size > max_size {
            return Err(UploadError::TooLarge {
                file: file.original_name.clone(),
                max_size,
            });
        }
    }

    if !field.allowed_mime_types.is_empty()
        && !mime_allowed(&field.allowed_mime_types, &file.mime_type)
    {
        return Err(UploadError::InvalidMimeType {
            file: file.original_name.clone(),
            received: file.mime_type.clone(),
            allowed: field.allowed_mime_types.clone(),
        });
    }

    Ok(())
}

/// Compare on the essence (`type/subtype`) so parameters such as `charset`
/// do not matter. Unparseable values fall back to a plain comparison.
fn mime_allowed(allowed: &[String], received: &str) -> bool {
    let essence = |value: &str| {
        value.parse::<mime::Mime>().map_or_else(
            |_| value.trim().to_ascii_lowercase(),
            |m| m.essence_str().to_ascii_lowercase(),
        )
    };
    let received = essence(received);
    allowed.iter().any(|a| essence(a) == received)
}

/// Validates and stores the files of an upload request.
#[derive(Debug, Clone)]
pub struct FileUploader {
    store: Arc<ObjectStore>,
}

impl FileUploader {
    /// Create an uploader writing through `store`.
    #[must_use]
    pub fn new(store: Arc<ObjectStore>) -> Self {
        Self { store }
    }

    /// Process one request.
    ///
    /// `files` maps field names to the files received under them. The result
    /// lists stored fields in the order of `fields`.
    ///
    /// # Errors
    ///
    /// Fails before anything is stored when a field lacks a bucket, a required
    /// field is missing, or a file breaks its field's limits. Fails with
    /// [`UploadError::RequiredUploadFailed`] when storing a required file
    /// fails.
    pub async fn process(
        &self,
        fields: &[FileField],
        files: &HashMap<String, Vec<UploadedFile>>,
    ) -> Result<Vec<StoredField>, UploadError> {
        let mut pending = Vec::with_capacity(fields.len());

        for field in fields {
            let Some(first) = files.get(&field.name).and_then(|f| f.first()) else {
                if field.required {
                    return Err(UploadError::MissingFile {
                        field: field.name.clone(),
                    });
                }
                continue;
            };

            let bucket = field
                .bucket
                .as_deref()
                .ok_or_else(|| UploadError::MissingBucket {
                    field: field.name.clone(),
                })?;

            let received = files.get(&field.name).map_or(0, Vec::len);
            if received > field.max_count {
                return Err(UploadError::TooManyFiles {
                    field: field.name.clone(),
                    max_count: field.max_count,
                    received,
                });
            }

            validate_file(field, first)?;
            pending.push((field, bucket, first));
        }

        let stored = try_join_all(
            pending
                .into_iter()
                .map(|(field, bucket, file)| self.store_field(field, bucket, file)),
        )
        .await?;

        Ok(stored.into_iter().flatten().collect())
    }

    async fn store_field(
        &self,
        field: &FileField,
        bucket: &str,
        file: &UploadedFile,
    ) -> Result<Option<StoredField>, UploadError> {
        match self.store.upload(file, bucket, None).await {
            Ok(reference) => Ok(Some(StoredField {
                field: field.name.clone(),
                reference,
            })),
            Err(source) if field.required => Err(UploadError::RequiredUploadFailed {
                field: field.name.clone(),
                source,
            }),
            Err(err) => {
                warn!(
                    field = %field.name,
                    error = %err,
                    "optional file upload failed, skipping field"
                );
                Ok(None)
            }
        }
    }
}
