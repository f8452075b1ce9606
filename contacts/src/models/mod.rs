pub mod contact;
pub mod group;
pub mod import;

pub use contact::*;
pub use group::*;
pub use import::*;

pub use courier_database::models::{Contact, Group, PaginatedResult};
