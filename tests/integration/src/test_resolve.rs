//! URL resolution and rewriting integration tests.

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;
    use storelink_core::UploadedFile;
    use storelink_rewrite::{DescriptorRegistry, ResolveUrl, ResponseRewriter};

    use crate::{cleanup_bucket, object_store, s3_client, storage_config, test_bucket_name};

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_fetch_private_object_with_presigned_url() {
        let bucket = test_bucket_name("signed");
        let store = object_store(storage_config(&[bucket.as_str()], &[]));

        let file = UploadedFile::new("doc", "secret.txt", "text/plain", &b"top secret"[..]);
        let reference = store
            .upload(&file, &bucket, Some("reports/q1 final.txt"))
            .await
            .expect("upload");

        let url = store.resolve(&reference).expect("presign");
        let resp = reqwest::get(&url).await.expect("GET presigned");
        assert_eq!(resp.status().as_u16(), 200, "{url}");
        assert_eq!(&resp.bytes().await.expect("body")[..], b"top secret");

        let direct = store.direct_url(reference.bucket(), reference.object());
        let resp = reqwest::get(&direct).await.expect("GET direct");
        assert_eq!(resp.status().as_u16(), 403);

        cleanup_bucket(&s3_client(), &bucket).await;
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_fetch_public_object_with_direct_url() {
        let bucket = test_bucket_name("public");
        let store = object_store(storage_config(&[], &[bucket.as_str()]));

        let file = UploadedFile::new("logo", "logo.png", "image/png", &b"png"[..]);
        let reference = store
            .upload(&file, &bucket, Some("logo.png"))
            .await
            .expect("upload");

        let url = store.resolve(&reference).expect("url");
        assert!(!url.contains('?'));
        let resp = reqwest::get(&url).await.expect("GET direct");
        assert_eq!(resp.status().as_u16(), 200);

        cleanup_bucket(&s3_client(), &bucket).await;
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_rewrite_references_into_working_urls() {
        let bucket = test_bucket_name("rewrite");
        let store = object_store(storage_config(&[bucket.as_str()], &[]));

        let file = UploadedFile::new("avatar", "u1.png", "image/png", &b"avatar"[..]);
        let reference = store
            .upload(&file, &bucket, Some("u1.png"))
            .await
            .expect("upload");

        let resolver: Arc<dyn ResolveUrl> = store.clone();
        let rewriter = ResponseRewriter::new(resolver, DescriptorRegistry::new());
        let output = rewriter
            .rewrite_json(json!([{"avatar": reference.to_uri()}, {"avatar": "plain"}]))
            .await
            .expect("rewrite");

        let url = output[0]["avatar"].as_str().expect("string");
        let resp = reqwest::get(url).await.expect("GET");
        assert_eq!(&resp.bytes().await.expect("body")[..], b"avatar");
        assert_eq!(output[1]["avatar"], "plain");

        cleanup_bucket(&s3_client(), &bucket).await;
    }
}
