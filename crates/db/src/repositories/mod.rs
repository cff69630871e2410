//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async methods. Methods
//! that must run inside a caller's transaction take `&mut PgConnection`
//! (pass `&mut *tx`); the rest take `&PgPool`.

pub mod association_repo;
pub mod clone_job_repo;
pub mod event_repo;
pub mod task_repo;

pub use association_repo::AssociationRepo;
pub use clone_job_repo::CloneJobRepo;
pub use event_repo::EventRepo;
pub use task_repo::TaskRepo;
