//! Upload and delete integration tests.

#[cfg(test)]
mod tests {
    use storelink_core::{StoreError, UploadedFile};

    use crate::{cleanup_bucket, object_store, s3_client, storage_config, test_bucket_name};

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_upload_with_content_type() {
        let bucket = test_bucket_name("upload");
        let store = object_store(storage_config(&[bucket.as_str()], &[]));
        let client = s3_client();

        let file = UploadedFile::new(
            "doc",
            "quarterly report.pdf",
            "application/pdf",
            &b"%PDF-1.7"[..],
        );
        let reference = store.upload(&file, &bucket, None).await.expect("upload");
        assert!(reference.object().ends_with("-quarterly-report.pdf"));

        let object = client
            .get_object()
            .bucket(&bucket)
            .key(reference.object())
            .send()
            .await
            .expect("get_object");
        assert_eq!(object.content_type(), Some("application/pdf"));
        let body = object.body.collect().await.expect("body").into_bytes();
        assert_eq!(&body[..], b"%PDF-1.7");

        cleanup_bucket(&client, &bucket).await;
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_delete_object() {
        let bucket = test_bucket_name("delete");
        let store = object_store(storage_config(&[], &[bucket.as_str()]));
        let client = s3_client();

        let file = UploadedFile::new("doc", "a.txt", "text/plain", &b"a"[..]);
        let reference = store
            .upload(&file, &bucket, Some("nested/a.txt"))
            .await
            .expect("upload");
        store
            .delete(reference.bucket(), reference.object())
            .await
            .expect("delete");

        let head = client
            .head_object()
            .bucket(&bucket)
            .key("nested/a.txt")
            .send()
            .await;
        assert!(head.is_err(), "object should be gone");

        cleanup_bucket(&client, &bucket).await;
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_report_missing_bucket_on_delete() {
        let store = object_store(storage_config(&[], &[]));
        let err = store
            .delete(&test_bucket_name("missing"), "a.txt")
            .await
            .expect_err("delete should fail");
        assert!(matches!(err, StoreError::NotFound { .. }), "{err}");
    }
}
