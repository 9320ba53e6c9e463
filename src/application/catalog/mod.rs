mod catalog_service;
mod errors;

pub use catalog_service::{delete, find_by_isbn, get_by_id, register, search, update};
pub use errors::{CatalogApplicationError, Result};
