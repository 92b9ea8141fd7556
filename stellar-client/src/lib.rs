//! Stellar gRPC Client Library
//!
//! This crate provides a Rust client for document database clusters that
//! speak the Stellar gRPC protocol: key-value and subdocument operations,
//! streaming N1QL queries and bucket management.
//!
//! ```no_run
//! # use stellar_client::{Cluster, ClusterOptions, GetOptions, PasswordAuthenticator, QueryOptions};
//! # async fn example() -> stellar_client::Result<()> {
//! let options = ClusterOptions::new()
//!     .with_authenticator(PasswordAuthenticator::new("Administrator", "password"));
//! let cluster = Cluster::connect("stellar://localhost", options).await?;
//!
//! let users = cluster.bucket("app").default_collection();
//! let user = users.get("user::1", GetOptions::new()).await?;
//! println!("{:?}", user.content());
//!
//! let mut rows = cluster.query("SELECT 1 AS one", QueryOptions::new())?;
//! while let Some(row) = rows.next_row().await? {
//!     println!("{}", row);
//! }
//! # Ok(())
//! # }
//! ```

pub mod bucket_mgmt;
pub mod cluster;
pub mod collection;
pub mod config;
pub mod durability;
pub mod error;
pub mod mutation_state;
pub mod options;
pub mod query;
pub mod result;
pub mod subdoc;
pub mod transcoder;
pub mod transport;

// Re-export key types
pub use bucket_mgmt::{BucketManager, BucketSettings, BucketType};
pub use cluster::{Bucket, Cluster, Scope};
pub use collection::{Collection, Namespace};
pub use config::{ClusterOptions, PasswordAuthenticator, TimeoutConfig};
pub use durability::{Durability, DurabilityLevel, PersistTo, ReplicateTo};
pub use error::{ClientError, Result};
pub use mutation_state::MutationState;
pub use options::{
    ExistsOptions, GetOptions, InsertOptions, LookupInOptions, ManagementOptions, MutateInOptions,
    OptionValue, OptionsBag, RemoveOptions, ReplaceOptions, StoreSemantics, UpsertOptions,
};
pub use query::{
    N1qlQuery, N1qlRequest, QueryArg, QueryMetaData, QueryOptions, QueryScanConsistency, QueryStatus,
};
pub use result::{
    ExistsResult, GetResult, LookupInResult, MutateInResult, MutationResult, MutationToken,
};
pub use subdoc::{LookupInSpec, MutateInSpec};
pub use transcoder::{
    DefaultJsonSerializer, DocumentValue, JsonTranscoder, RawBinaryTranscoder, Serializer,
    Transcoder,
};
pub use transport::{GrpcTransport, StellarTransport};
