use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use stellar_client::{
    ClientError, ClusterOptions, Durability, DurabilityLevel, ExistsOptions, GetOptions,
    InsertOptions, MutationState, PersistTo, RawBinaryTranscoder, RemoveOptions, ReplaceOptions,
    ReplicateTo, UpsertOptions,
};
use stellar_proto as proto;
use stellar_test_utils::*;

fn upsert_response(cas: u64, seq_no: u64) -> proto::UpsertResponse {
    proto::UpsertResponse {
        cas,
        mutation_token: Some(mutation_token("travel", 12, seq_no)),
    }
}

#[tokio::test]
async fn test_get_decodes_json_document() {
    init_tracing();
    let transport = ScriptedTransport::new();
    transport.push_get(Ok(json_document(&json!({"name": "Alice", "age": 30}), 1001)));

    let cluster = test_cluster(&transport);
    let users = cluster.bucket("travel").scope("inventory").collection("users");
    let result = users.get("user::1", GetOptions::new()).await.unwrap();

    assert_eq!(result.cas(), 1001);
    assert!(result.success());
    assert_eq!(result.content().as_json(), Some(&json!({"name": "Alice", "age": 30})));
    assert!(result.expiry_time().is_none());

    let requests = transport.requests();
    assert_eq!(requests.get.len(), 1);
    let request = &requests.get[0];
    assert_eq!(request.bucket_name, "travel");
    assert_eq!(request.scope_name, "inventory");
    assert_eq!(request.collection_name, "users");
    assert_eq!(request.key, "user::1");
    assert!(request.project.is_empty());
}

#[tokio::test]
async fn test_get_sends_projection_and_default_timeout() {
    let transport = ScriptedTransport::new();
    transport.push_get(Ok(json_document(&json!({"name": "Alice"}), 7)));

    let cluster = test_cluster(&transport);
    let users = cluster.bucket("travel").default_collection();
    let options = GetOptions::new().project(vec!["name".to_string()]);
    users.get("user::1", options).await.unwrap();

    let requests = transport.requests();
    assert_eq!(requests.get[0].project, vec!["name".to_string()]);
    assert_eq!(requests.get[0].scope_name, "_default");
    assert_eq!(requests.get[0].collection_name, "_default");
    assert_eq!(transport.last_timeout(), Some(Duration::from_millis(2500)));
}

#[tokio::test]
async fn test_per_call_timeout_overrides_cluster_default() {
    let transport = ScriptedTransport::new();
    transport.push_exists(Ok(proto::ExistsResponse { result: true, cas: 5 }));

    let cluster = test_cluster_with(
        &transport,
        ClusterOptions::new().with_kv_timeout(Duration::from_secs(10)),
    );
    let users = cluster.bucket("travel").default_collection();
    let result = users
        .exists("user::1", ExistsOptions::new().timeout(Duration::from_millis(300)))
        .await
        .unwrap();

    assert!(result.exists());
    assert_eq!(result.cas(), 5);
    assert_eq!(transport.last_timeout(), Some(Duration::from_millis(300)));
}

#[tokio::test]
async fn test_get_missing_document() {
    let transport = ScriptedTransport::new();
    transport.push_get(Err(status_with_details(
        tonic::Code::NotFound,
        "",
        "document",
        "user::404",
    )));

    let cluster = test_cluster(&transport);
    let users = cluster.bucket("travel").default_collection();
    let err = users.get("user::404", GetOptions::new()).await.unwrap_err();

    assert!(matches!(err, ClientError::DocumentNotFound(_)));
    assert_eq!(err.code(), "DOCUMENT_NOT_FOUND");
}

#[tokio::test]
async fn test_insert_existing_document() {
    let transport = ScriptedTransport::new();
    transport.push_insert(Err(status_with_details(
        tonic::Code::AlreadyExists,
        "",
        "document",
        "user::1",
    )));

    let cluster = test_cluster(&transport);
    let users = cluster.bucket("travel").default_collection();
    let err = users
        .insert("user::1", json!({"name": "Alice"}), InsertOptions::new())
        .await
        .unwrap_err();

    assert!(matches!(err, ClientError::DocumentExists(_)));
}

#[tokio::test]
async fn test_upsert_request_fields() {
    let transport = ScriptedTransport::new();
    transport.push_upsert(Ok(upsert_response(2002, 40)));

    let cluster = test_cluster(&transport);
    let users = cluster.bucket("travel").default_collection();
    let options = UpsertOptions::new()
        .expiry(Duration::from_secs(3600))
        .preserve_expiry(true)
        .durability(DurabilityLevel::Majority);
    let result = users
        .upsert("user::1", json!({"name": "Alice"}), options)
        .await
        .unwrap();

    assert_eq!(result.cas(), 2002);
    let token = result.mutation_token().unwrap();
    assert_eq!(token.partition_id, 12);
    assert_eq!(token.sequence_number, 40);
    assert_eq!(token.bucket_name, "travel");

    let request = &transport.requests().upsert[0];
    assert_eq!(serde_json::from_slice::<serde_json::Value>(&request.content).unwrap(), json!({"name": "Alice"}));
    assert_eq!(request.content_type, proto::DocumentContentType::Json as i32);
    assert_eq!(request.content_flags, 0x0200_0006);
    assert_eq!(request.expiry_secs, Some(3600));
    assert_eq!(request.preserve_expiry_on_existing, Some(true));
    assert_eq!(
        request.durability_spec,
        Some(proto::DurabilitySpec::DurabilityLevel(
            proto::DurabilityLevel::Majority as i32
        ))
    );
}

#[tokio::test]
async fn test_upsert_legacy_durability() {
    let transport = ScriptedTransport::new();
    transport.push_upsert(Ok(upsert_response(1, 1)));

    let cluster = test_cluster(&transport);
    let users = cluster.bucket("travel").default_collection();
    let options = UpsertOptions::new().durability(Durability::legacy(ReplicateTo::Two, PersistTo::One));
    users.upsert("k", json!(1), options).await.unwrap();

    let request = &transport.requests().upsert[0];
    assert_eq!(
        request.durability_spec,
        Some(proto::DurabilitySpec::LegacyDurabilitySpec(proto::LegacyDurabilitySpec {
            num_replicated: 2,
            num_persisted: 1,
        }))
    );
}

#[tokio::test]
async fn test_keyword_override_beats_typed_option() {
    let transport = ScriptedTransport::new();
    transport.push_upsert(Ok(upsert_response(1, 1)));

    let cluster = test_cluster(&transport);
    let users = cluster.bucket("travel").default_collection();
    let options = UpsertOptions::new()
        .expiry(Duration::from_secs(10))
        .set("expiry", Duration::from_secs(60))
        .set("not_an_option", true);
    users.upsert("k", json!({}), options).await.unwrap();

    let request = &transport.requests().upsert[0];
    assert_eq!(request.expiry_secs, Some(60));
}

#[tokio::test]
async fn test_replace_with_cas_mismatch() {
    let transport = ScriptedTransport::new();
    transport.push_replace(Err(status_with_details(
        tonic::Code::Aborted,
        "CAS_MISMATCH",
        "document",
        "user::1",
    )));

    let cluster = test_cluster(&transport);
    let users = cluster.bucket("travel").default_collection();
    let err = users
        .replace("user::1", json!({"v": 2}), ReplaceOptions::new().cas(77u64))
        .await
        .unwrap_err();

    assert!(matches!(err, ClientError::CasMismatch(_)));
    assert_eq!(transport.requests().replace[0].cas, Some(77));
}

#[tokio::test]
async fn test_zero_cas_is_not_sent() {
    let transport = ScriptedTransport::new();
    transport.push_remove(Ok(proto::RemoveResponse {
        cas: 9,
        mutation_token: None,
    }));

    let cluster = test_cluster(&transport);
    let users = cluster.bucket("travel").default_collection();
    let result = users.remove("user::1", RemoveOptions::new().cas(0u64)).await.unwrap();

    assert!(result.mutation_token().is_none());
    let request = &transport.requests().remove[0];
    assert_eq!(request.cas, None);
    assert_eq!(request.durability_spec, None);
}

#[tokio::test]
async fn test_binary_transcoder_precedence() {
    let transport = ScriptedTransport::new();
    transport.push_upsert(Ok(upsert_response(1, 1)));
    transport.push_get(Ok(proto::GetResponse {
        content: vec![0xde, 0xad, 0xbe, 0xef],
        content_type: proto::DocumentContentType::Binary as i32,
        content_flags: 0x0300_0000,
        cas: 3,
        expiry_time_secs: Some(1_900_000_000),
    }));

    let cluster = test_cluster(&transport);
    let blobs = cluster
        .bucket("travel")
        .collection("blobs")
        .with_transcoder(Arc::new(RawBinaryTranscoder));

    blobs
        .upsert("blob::1", vec![0xde_u8, 0xad, 0xbe, 0xef], UpsertOptions::new())
        .await
        .unwrap();
    let request = &transport.requests().upsert[0];
    assert_eq!(request.content_type, proto::DocumentContentType::Binary as i32);
    assert_eq!(request.content_flags, 0x0300_0000);

    let result = blobs.get("blob::1", GetOptions::new()).await.unwrap();
    assert_eq!(result.content().as_bytes().map(|b| b.to_vec()), Some(vec![0xde, 0xad, 0xbe, 0xef]));
    assert!(result.expiry_time().is_some());
}

#[tokio::test]
async fn test_json_transcoder_rejects_binary_without_sending() {
    let transport = ScriptedTransport::new();
    let cluster = test_cluster(&transport);
    let users = cluster.bucket("travel").default_collection();

    let err = users
        .upsert("k", vec![1u8, 2, 3], UpsertOptions::new())
        .await
        .unwrap_err();

    assert!(matches!(err, ClientError::ValueFormat(_)));
    assert!(transport.calls().is_empty());
}

#[tokio::test]
async fn test_invalid_keys_are_rejected_locally() {
    let transport = ScriptedTransport::new();
    let cluster = test_cluster(&transport);
    let users = cluster.bucket("travel").default_collection();

    let err = users.get("", GetOptions::new()).await.unwrap_err();
    assert!(matches!(err, ClientError::InvalidArgument(_)));

    let long_key = "k".repeat(251);
    let err = users.exists(&long_key, ExistsOptions::new()).await.unwrap_err();
    assert!(matches!(err, ClientError::InvalidArgument(_)));

    assert!(transport.calls().is_empty());
}

#[tokio::test]
async fn test_invalid_option_value() {
    let transport = ScriptedTransport::new();
    let cluster = test_cluster(&transport);
    let users = cluster.bucket("travel").default_collection();

    let options = InsertOptions::new().set("expiry", -5i64);
    let err = users.insert("k", json!({}), options).await.unwrap_err();

    match err {
        ClientError::InvalidArgument(msg) => assert!(msg.contains("expiry"), "{}", msg),
        other => panic!("unexpected error: {:?}", other),
    }
    assert!(transport.calls().is_empty());
}

#[tokio::test]
async fn test_slow_server_times_out() {
    let transport = ScriptedTransport::new();
    transport.set_delay(Duration::from_millis(500));
    transport.push_get(Ok(json_document(&json!({}), 1)));

    let cluster = test_cluster(&transport);
    let users = cluster.bucket("travel").default_collection();
    let err = users
        .get("user::1", GetOptions::new().timeout(Duration::from_millis(20)))
        .await
        .unwrap_err();

    assert!(matches!(err, ClientError::Timeout(_)));
    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_mutation_state_from_results() -> anyhow::Result<()> {
    let transport = ScriptedTransport::new();
    transport.push_upsert(Ok(upsert_response(1, 10)));
    transport.push_upsert(Ok(upsert_response(2, 15)));
    transport.push_upsert(Ok(proto::UpsertResponse {
        cas: 3,
        mutation_token: Some(mutation_token("travel", 40, 3)),
    }));

    let cluster = test_cluster(&transport);
    let users = cluster.bucket("travel").default_collection();

    let mut state = MutationState::new();
    for key in ["a", "b", "c"] {
        let result = users.upsert(key, json!({"key": key}), UpsertOptions::new()).await?;
        state.add_result(&result);
    }

    assert_eq!(state.len(), 2);
    let seqnos: Vec<u64> = state.tokens().map(|t| t.sequence_number).collect();
    assert_eq!(seqnos, vec![15, 3]);
    Ok(())
}

#[tokio::test]
async fn test_concurrent_operations_share_cluster() {
    let transport = ScriptedTransport::new();
    for i in 0..8u64 {
        transport.push_upsert(Ok(upsert_response(100 + i, i)));
    }

    let cluster = test_cluster(&transport);
    let users = cluster.bucket("travel").default_collection();

    let mut handles = Vec::new();
    for i in 0..8 {
        let users = users.clone();
        handles.push(tokio::spawn(async move {
            users
                .upsert(&format!("user::{}", i), json!({"i": i}), UpsertOptions::new())
                .await
        }));
    }

    let mut cas_values = Vec::new();
    for handle in handles {
        cas_values.push(handle.await.unwrap().unwrap().cas());
    }
    cas_values.sort_unstable();
    assert_eq!(cas_values, (100..108).collect::<Vec<u64>>());
    assert_eq!(transport.requests().upsert.len(), 8);
}
