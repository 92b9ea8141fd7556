use serde_json::{json, Value};
use std::time::Duration;
use stellar_client::{
    ClientError, LookupInOptions, LookupInSpec, MutateInOptions, MutateInSpec, StoreSemantics,
};
use stellar_proto as proto;
use stellar_proto::{lookup_in_response, mutate_in_request, mutate_in_response};
use stellar_test_utils::*;

fn found(content: &Value) -> lookup_in_response::Spec {
    lookup_in_response::Spec {
        status: None,
        content: serde_json::to_vec(content).unwrap(),
    }
}

fn failed(code: tonic::Code) -> lookup_in_response::Spec {
    lookup_in_response::Spec {
        status: Some(proto::SpecStatus {
            code: code as i32,
            message: String::new(),
        }),
        content: Vec::new(),
    }
}

#[tokio::test]
async fn test_lookup_in_results_follow_spec_order() {
    init_tracing();
    let transport = ScriptedTransport::new();
    transport.push_lookup_in(Ok(proto::LookupInResponse {
        specs: vec![
            found(&json!("Alice")),
            found(&json!(true)),
            failed(tonic::Code::NotFound),
            found(&json!(3)),
        ],
        cas: 55,
    }));

    let cluster = test_cluster(&transport);
    let users = cluster.bucket("travel").default_collection();
    let specs = [
        LookupInSpec::get("name"),
        LookupInSpec::exists("address"),
        LookupInSpec::get("phone"),
        LookupInSpec::count("tags"),
    ];
    let result = users
        .lookup_in("user::1", &specs, LookupInOptions::new())
        .await
        .unwrap();

    assert_eq!(result.cas(), 55);
    assert_eq!(result.len(), 4);
    assert_eq!(result.path(0), Some("name"));
    assert_eq!(result.content_as::<String>(0).unwrap(), "Alice");
    assert!(result.exists(1).unwrap());
    assert!(!result.exists(2).unwrap());
    assert!(matches!(result.content_as::<String>(2), Err(ClientError::PathNotFound(_))));
    assert_eq!(result.content_as::<u32>(3).unwrap(), 3);
    assert!(matches!(result.content_as::<u32>(9), Err(ClientError::InvalidArgument(_))));

    let request = &transport.requests().lookup_in[0];
    let paths: Vec<&str> = request.specs.iter().map(|s| s.path.as_str()).collect();
    assert_eq!(paths, vec!["name", "address", "phone", "tags"]);
    assert_eq!(
        request.specs[3].operation,
        proto::lookup_in_request::spec::Operation::Count as i32
    );
    assert!(request.flags.is_none());
}

#[tokio::test]
async fn test_lookup_in_path_mismatch_and_access_deleted() {
    let transport = ScriptedTransport::new();
    transport.push_lookup_in(Ok(proto::LookupInResponse {
        specs: vec![failed(tonic::Code::FailedPrecondition)],
        cas: 1,
    }));

    let cluster = test_cluster(&transport);
    let users = cluster.bucket("travel").default_collection();
    let result = users
        .lookup_in(
            "user::1",
            &[LookupInSpec::get("name.first").xattr()],
            LookupInOptions::new().access_deleted(true),
        )
        .await
        .unwrap();

    assert!(matches!(result.content_as::<Value>(0), Err(ClientError::PathMismatch(_))));
    assert!(matches!(result.exists(0), Err(ClientError::PathMismatch(_))));

    let request = &transport.requests().lookup_in[0];
    assert_eq!(
        request.flags,
        Some(proto::lookup_in_request::Flags {
            access_deleted: Some(true)
        })
    );
    assert_eq!(
        request.specs[0].flags,
        Some(proto::lookup_in_request::spec::Flags { xattr: Some(true) })
    );
}

#[tokio::test]
async fn test_lookup_in_spec_count_mismatch() {
    let transport = ScriptedTransport::new();
    transport.push_lookup_in(Ok(proto::LookupInResponse {
        specs: vec![found(&json!(1))],
        cas: 1,
    }));

    let cluster = test_cluster(&transport);
    let users = cluster.bucket("travel").default_collection();
    let err = users
        .lookup_in(
            "k",
            &[LookupInSpec::get("a"), LookupInSpec::get("b")],
            LookupInOptions::new(),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, ClientError::InternalError(_)));
}

#[tokio::test]
async fn test_empty_spec_lists_are_rejected() {
    let transport = ScriptedTransport::new();
    let cluster = test_cluster(&transport);
    let users = cluster.bucket("travel").default_collection();

    let err = users.lookup_in("k", &[], LookupInOptions::new()).await.unwrap_err();
    assert!(matches!(err, ClientError::InvalidArgument(_)));
    let err = users.mutate_in("k", &[], MutateInOptions::new()).await.unwrap_err();
    assert!(matches!(err, ClientError::InvalidArgument(_)));
    assert!(transport.calls().is_empty());
}

#[tokio::test]
async fn test_mutate_in_request_and_counter_result() {
    let transport = ScriptedTransport::new();
    transport.push_mutate_in(Ok(proto::MutateInResponse {
        specs: vec![
            mutate_in_response::Spec { content: None },
            mutate_in_response::Spec { content: None },
            mutate_in_response::Spec {
                content: Some(b"11".to_vec()),
            },
            mutate_in_response::Spec { content: None },
        ],
        cas: 900,
        mutation_token: Some(mutation_token("travel", 7, 31)),
    }));

    let cluster = test_cluster(&transport);
    let users = cluster.bucket("travel").default_collection();
    let specs = [
        MutateInSpec::upsert("address.city", "Paris").create_path(),
        MutateInSpec::array_append("tags", vec![json!("a"), json!({"b": 2})]),
        MutateInSpec::increment("visits", 1),
        MutateInSpec::remove("legacy"),
    ];
    let options = MutateInOptions::new()
        .store_semantics(StoreSemantics::Upsert)
        .expiry(Duration::from_secs(120))
        .cas(44u64);
    let result = users.mutate_in("user::1", &specs, options).await.unwrap();

    assert_eq!(result.cas(), 900);
    assert_eq!(result.len(), 4);
    assert_eq!(result.content_as::<i64>(2).unwrap(), 11);
    assert!(result.content_as::<Value>(0).is_err());
    assert_eq!(result.mutation_token().unwrap().sequence_number, 31);

    let request = &transport.requests().mutate_in[0];
    assert_eq!(
        request.store_semantic,
        Some(mutate_in_request::StoreSemantic::Upsert as i32)
    );
    assert_eq!(request.expiry_secs, Some(120));
    assert_eq!(request.cas, Some(44));

    let wire = &request.specs;
    assert_eq!(wire[0].operation, mutate_in_request::spec::Operation::Upsert as i32);
    assert_eq!(wire[0].content, br#""Paris""#.to_vec());
    assert_eq!(
        wire[0].flags,
        Some(mutate_in_request::spec::Flags {
            create_path: Some(true),
            xattr: None,
        })
    );
    assert_eq!(wire[1].content, br#""a",{"b":2}"#.to_vec());
    assert_eq!(wire[2].operation, mutate_in_request::spec::Operation::Counter as i32);
    assert_eq!(wire[2].content, b"1".to_vec());
    assert!(wire[3].content.is_empty());
}

#[tokio::test]
async fn test_mutate_in_spec_from_operation_name() {
    let transport = ScriptedTransport::new();
    transport.push_mutate_in(Ok(proto::MutateInResponse {
        specs: vec![mutate_in_response::Spec { content: None }],
        cas: 1,
        mutation_token: None,
    }));

    let spec = MutateInSpec::new("array_prepend", "tags", Some(json!(["x", "y"]))).unwrap();
    assert!(MutateInSpec::new("upsert", "a", None).is_err());
    assert!(MutateInSpec::new("explode", "a", Some(json!(1))).is_err());

    let cluster = test_cluster(&transport);
    let users = cluster.bucket("travel").default_collection();
    users
        .mutate_in("k", &[spec], MutateInOptions::new())
        .await
        .unwrap();

    let request = &transport.requests().mutate_in[0];
    assert_eq!(request.specs[0].content, br#""x","y""#.to_vec());
    assert_eq!(request.store_semantic, None);
}

#[tokio::test]
async fn test_zero_counter_delta_is_rejected() {
    let transport = ScriptedTransport::new();
    let cluster = test_cluster(&transport);
    let users = cluster.bucket("travel").default_collection();

    let err = users
        .mutate_in("k", &[MutateInSpec::decrement("n", 0)], MutateInOptions::new())
        .await
        .unwrap_err();

    assert!(matches!(err, ClientError::InvalidArgument(_)));
    assert!(transport.calls().is_empty());
}
