//! N1QL query support
//!
//! Build a [`N1qlQuery`] from [`QueryOptions`] (or mixed arguments through
//! [`create_query_object`]) and read its rows through an [`N1qlRequest`].

mod options;
mod request;

pub use options::{
    create_query_object, N1qlQuery, QueryArg, QueryOptions, QueryProfile, QueryScanConsistency,
};
pub use request::{N1qlRequest, QueryMetaData, QueryMetrics, QueryStatus, QueryWarning};
