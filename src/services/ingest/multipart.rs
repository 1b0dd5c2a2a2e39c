//! multipart 上传落盘

use actix_multipart::Multipart;
use futures_util::{StreamExt, TryStreamExt};
use std::path::Path;
use tokio::io::AsyncWriteExt;

use super::archive::{UploadedFile, upload_file_name};
use crate::errors::{CGSystemError, Result};

fn multipart_error(e: impl std::fmt::Display) -> CGSystemError {
    CGSystemError::invalid_param("The request body could not be read").with_description(e.to_string())
}

pub fn too_large(max_size: usize) -> CGSystemError {
    CGSystemError::request_too_large("Uploaded files are too big.")
        .with_description(format!("Request is bigger than maximum upload size of {max_size} bytes."))
}

/// 把字段名满足 `accept` 的文件写进 `dir`，总大小不超过 `max_size`
pub async fn save_files<F>(
    mut payload: Multipart,
    dir: &Path,
    accept: F,
    max_size: usize,
) -> Result<Vec<UploadedFile>>
where
    F: Fn(&str) -> bool,
{
    let mut files = Vec::new();
    let mut total: usize = 0;

    while let Some(mut field) = payload.try_next().await.map_err(multipart_error)? {
        let disposition = field.content_disposition();
        let name = disposition
            .and_then(|cd| cd.get_name())
            .unwrap_or_default()
            .to_string();
        if !accept(&name) {
            continue;
        }
        let filename = upload_file_name(
            disposition
                .and_then(|cd| cd.get_filename())
                .unwrap_or(name.as_str()),
        )?;

        let path = dir.join(format!("upload-{}", files.len()));
        let mut out = tokio::fs::File::create(&path).await?;
        while let Some(chunk) = field.next().await {
            let data = chunk.map_err(multipart_error)?;
            total += data.len();
            if total > max_size {
                return Err(too_large(max_size));
            }
            out.write_all(&data).await?;
        }
        out.flush().await?;

        files.push(UploadedFile { filename, path });
    }
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::error::PayloadError;
    use actix_web::http::header::{self, HeaderMap, HeaderValue};
    use actix_web::web::Bytes;

    fn multipart(files: &[(&str, &str, &str)]) -> Multipart {
        let mut body = String::new();
        for (field, filename, content) in files {
            body.push_str(&format!(
                "--BOUNDARY\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\nContent-Type: text/plain\r\n\r\n{content}\r\n"
            ));
        }
        body.push_str("--BOUNDARY--\r\n");

        let mut headers = HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("multipart/form-data; boundary=BOUNDARY"),
        );
        let stream = futures_util::stream::iter(vec![Ok::<_, PayloadError>(Bytes::from(body))]);
        Multipart::new(&headers, stream)
    }

    #[tokio::test]
    async fn test_size_limit_boundary() {
        let dir = tempfile::tempdir().unwrap();
        let files = save_files(
            multipart(&[("file", "a.py", "12345"), ("file1", "b.py", "678")]),
            dir.path(),
            |f| f.starts_with("file"),
            8,
        )
        .await
        .unwrap();
        assert_eq!(files.len(), 2);
        assert_eq!(std::fs::read_to_string(&files[0].path).unwrap(), "12345");

        let dir = tempfile::tempdir().unwrap();
        let err = save_files(
            multipart(&[("file", "a.py", "12345"), ("file1", "b.py", "6789")]),
            dir.path(),
            |f| f.starts_with("file"),
            8,
        )
        .await
        .unwrap_err();
        assert_eq!(err.api_code(), "REQUEST_TOO_LARGE");
    }

    #[tokio::test]
    async fn test_fields_filtered_and_names_reduced() {
        let dir = tempfile::tempdir().unwrap();
        let files = save_files(
            multipart(&[("other", "x.txt", "x"), ("file", "../../escaped.py", "y")]),
            dir.path(),
            |f| f == "file",
            100,
        )
        .await
        .unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].filename, "escaped.py");
        assert!(files[0].path.starts_with(dir.path()));
    }
}
