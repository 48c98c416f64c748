//! Request body encoding
//!
//! Exactly one strategy runs per request, picked in this order:
//! raw body, JSON, XML, file upload, url-encoded form, nothing.

use std::collections::HashMap;
use std::io::ErrorKind;

use bytes::Bytes;
use reqwest::header::HeaderValue;
use reqwest::Method;
use tokio_util::io::ReaderStream;
use tracing::{trace, warn};
use url::form_urlencoded;

use crate::http::multipart::{escape_quotes, MultipartWriter};
use crate::http::options::{Body, BodyKind, FileUpload, Payload};
use crate::{Error, Result};

pub const APPLICATION_JSON: &str = "application/json";
pub const APPLICATION_XML: &str = "application/xml";
pub const FORM_URLENCODED: &str = "application/x-www-form-urlencoded";

/// Output of the body encoder
#[derive(Debug)]
pub struct EncodedBody {
    pub kind: BodyKind,
    pub body: Option<reqwest::Body>,
    pub content_type: Option<HeaderValue>,
}

impl EncodedBody {
    fn empty() -> Self {
        Self {
            kind: BodyKind::None,
            body: None,
            content_type: None,
        }
    }
}

/// Encode the request body for `method`
///
/// `data` supplies the url-encoded form when no other body is set, and the
/// plain fields of a POST multipart upload.
pub async fn encode_body(
    method: &Method,
    body: Option<Body>,
    data: Option<HashMap<String, String>>,
    strict_single_upload: bool,
) -> Result<EncodedBody> {
    match (body, data) {
        (Some(Body::Raw(raw)), _) => Ok(EncodedBody {
            kind: BodyKind::Raw,
            body: Some(raw),
            content_type: None,
        }),
        (Some(Body::Json(payload)), _) => encode_json(payload),
        (Some(Body::Xml(payload)), _) => encode_xml(payload),
        (Some(Body::Files(files)), data) if method == Method::POST => {
            encode_multipart(files, data.as_ref()).await
        }
        (Some(Body::Files(files)), _) => encode_single_upload(method, files, strict_single_upload),
        (None, Some(data)) => Ok(EncodedBody {
            kind: BodyKind::Form,
            body: Some(reqwest::Body::from(encode_form(&data))),
            content_type: Some(HeaderValue::from_static(FORM_URLENCODED)),
        }),
        (None, None) => Ok(EncodedBody::empty()),
    }
}

fn encode_json(payload: Payload) -> Result<EncodedBody> {
    let bytes = match payload {
        Payload::Text(text) => Bytes::from(text),
        Payload::Bytes(bytes) => bytes,
        Payload::Value(value) => value
            .to_json()
            .map(Bytes::from)
            .map_err(|source| Error::Json {
                message: "failed to marshal request body".to_string(),
                source,
            })?,
    };

    Ok(EncodedBody {
        kind: BodyKind::Json,
        body: Some(reqwest::Body::from(bytes)),
        content_type: Some(HeaderValue::from_static(APPLICATION_JSON)),
    })
}

fn encode_xml(payload: Payload) -> Result<EncodedBody> {
    let bytes = match payload {
        Payload::Text(text) => Bytes::from(text),
        Payload::Bytes(bytes) => bytes,
        Payload::Value(value) => value
            .to_xml()
            .map(Bytes::from)
            .map_err(|source| Error::Xml {
                message: "failed to marshal request body".to_string(),
                source,
            })?,
    };

    Ok(EncodedBody {
        kind: BodyKind::Xml,
        body: Some(reqwest::Body::from(bytes)),
        content_type: Some(HeaderValue::from_static(APPLICATION_XML)),
    })
}

/// `file` for a lone upload, `file1`, `file2`, ... otherwise
fn default_field_name(index: usize, count: usize) -> String {
    if count > 1 {
        format!("file{}", index + 1)
    } else {
        "file".to_string()
    }
}

async fn encode_multipart(
    files: Vec<FileUpload>,
    data: Option<&HashMap<String, String>>,
) -> Result<EncodedBody> {
    let mut writer = MultipartWriter::new();
    let count = files.len();

    // Returning early drops the iterator, which closes every stream not yet copied.
    for (index, upload) in files.into_iter().enumerate() {
        let FileUpload {
            field_name,
            file_name,
            mime,
            contents,
        } = upload;

        let mut contents = contents.ok_or_else(|| Error::MissingFileContents {
            index,
            file_name: file_name.clone(),
        })?;

        let field_name = field_name
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| default_field_name(index, count));

        match mime.filter(|mime| !mime.is_empty()) {
            Some(mime) => {
                let file_name = if file_name.is_empty() {
                    "filename".to_string()
                } else {
                    file_name
                };
                let disposition = format!(
                    "form-data; name=\"{}\"; filename=\"{}\"",
                    escape_quotes(&field_name),
                    escape_quotes(&file_name)
                );
                writer.create_part(&[
                    ("Content-Disposition", disposition.as_str()),
                    ("Content-Type", mime.as_str()),
                ]);
            }
            None => writer.create_form_file(&field_name, &file_name),
        }

        let copied = tokio::io::copy(&mut contents, writer.part_body()).await;
        drop(contents);

        match copied {
            Ok(bytes) => trace!(field = %field_name, bytes, "copied upload into multipart body"),
            Err(e) if e.kind() == ErrorKind::UnexpectedEof => {}
            Err(source) => {
                return Err(Error::Multipart {
                    message: format!("failed to read upload for field {:?}", field_name),
                    source,
                })
            }
        }
    }

    if let Some(data) = data {
        let mut fields: Vec<_> = data.iter().collect();
        fields.sort();
        for (key, value) in fields {
            writer.write_field(key, value);
        }
    }

    let content_type = HeaderValue::from_str(&writer.content_type()).map_err(|e| Error::InvalidHeader {
        name: "Content-Type".to_string(),
        message: e.to_string(),
    })?;

    Ok(EncodedBody {
        kind: BodyKind::FileUpload,
        body: Some(reqwest::Body::from(writer.finish())),
        content_type: Some(content_type),
    })
}

/// Non-POST uploads send the first file's stream as the raw body
fn encode_single_upload(method: &Method, files: Vec<FileUpload>, strict: bool) -> Result<EncodedBody> {
    let count = files.len();
    if count > 1 {
        if strict {
            return Err(Error::TooManyUploads {
                method: method.to_string(),
                count,
            });
        }
        warn!(%method, count, "only the first file is sent for non-POST uploads");
    }

    let Some(upload) = files.into_iter().next() else {
        return Err(Error::MissingFileContents {
            index: 0,
            file_name: String::new(),
        });
    };

    let contents = upload.contents.ok_or_else(|| Error::MissingFileContents {
        index: 0,
        file_name: upload.file_name.clone(),
    })?;

    let content_type = match upload.mime.filter(|mime| !mime.is_empty()) {
        Some(mime) => Some(HeaderValue::from_str(&mime).map_err(|e| Error::InvalidHeader {
            name: "Content-Type".to_string(),
            message: e.to_string(),
        })?),
        None => mime_guess::from_path(&upload.file_name)
            .first_raw()
            .map(HeaderValue::from_static),
    };

    Ok(EncodedBody {
        kind: BodyKind::FileUpload,
        body: Some(reqwest::Body::wrap_stream(ReaderStream::new(contents))),
        content_type,
    })
}

/// `application/x-www-form-urlencoded` encoding with keys sorted
pub fn encode_form(data: &HashMap<String, String>) -> String {
    let mut pairs: Vec<_> = data.iter().collect();
    pairs.sort();

    let mut serializer = form_urlencoded::Serializer::new(String::new());
    for (key, value) in pairs {
        serializer.append_pair(key, value);
    }
    serializer.finish()
}
