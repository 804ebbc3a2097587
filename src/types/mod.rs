// ABOUTME: Validated domain types shared by the catalog, policy, and executor.
// ABOUTME: Digests, repository names, and image records.

mod digest;
mod image;
mod repository;

pub use digest::{Digest, DigestError};
pub use image::Image;
pub use repository::{RepositoryName, RepositoryNameError};
