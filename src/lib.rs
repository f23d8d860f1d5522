pub mod persistence;
pub mod prelude;
pub mod repository;
pub mod router;
pub mod shared;
