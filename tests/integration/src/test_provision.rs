//! Bucket provisioning integration tests.

#[cfg(test)]
mod tests {
    use crate::{cleanup_bucket, object_store, s3_client, storage_config, test_bucket_name};

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_create_buckets_with_policies() {
        let private = test_bucket_name("priv");
        let public = test_bucket_name("pub");
        let store = object_store(storage_config(&[private.as_str()], &[public.as_str()]));
        let client = s3_client();

        store.init().await.expect("provisioning");

        for bucket in [&private, &public] {
            let head = client.head_bucket().bucket(bucket).send().await;
            assert!(head.is_ok(), "{bucket} should exist");
        }

        let policy = client
            .get_bucket_policy()
            .bucket(&private)
            .send()
            .await
            .expect("private policy");
        assert!(policy.policy().unwrap_or_default().contains("Deny"));

        let policy = client
            .get_bucket_policy()
            .bucket(&public)
            .send()
            .await
            .expect("public policy");
        assert!(policy.policy().unwrap_or_default().contains("Allow"));

        cleanup_bucket(&client, &private).await;
        cleanup_bucket(&client, &public).await;
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_leave_existing_bucket_policy_alone() {
        let bucket = test_bucket_name("existing");
        let client = s3_client();
        client
            .create_bucket()
            .bucket(&bucket)
            .send()
            .await
            .expect("create bucket");

        let store = object_store(storage_config(&[], &[bucket.as_str()]));
        store.init().await.expect("provisioning");

        let policy = client.get_bucket_policy().bucket(&bucket).send().await;
        assert!(policy.is_err(), "existing bucket should not get a policy");

        cleanup_bucket(&client, &bucket).await;
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_provision_once_under_concurrency() {
        let bucket = test_bucket_name("race");
        let store = object_store(storage_config(&[bucket.as_str()], &[]));

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let store = std::sync::Arc::clone(&store);
                tokio::spawn(async move { store.init().await })
            })
            .collect();
        for task in tasks {
            task.await.expect("join").expect("provisioning");
        }

        assert!(store.bucket_manager().is_initialized());
        cleanup_bucket(&s3_client(), &bucket).await;
    }
}
