// depres-net/src/lib.rs
pub mod http;
pub mod validation;

pub use depres_common::{
    cache::Cache,
    error::{DepresError, Result},
    model::Repository,
    Config,
};
pub use http::{
    build_http_client, download_to_path, fetch_from_repositories, FetchMiss, FetchStatus,
    RepositoryHit,
};
pub use validation::{validate_url, verify_zip_archive};
