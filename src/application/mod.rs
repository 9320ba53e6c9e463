pub mod catalog;
mod dependencies;
pub mod loan;

pub use dependencies::{DEFAULT_OVERDUE_MESSAGE, ServiceDependencies, ServiceSettings};
