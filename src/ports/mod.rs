pub mod book_repository;
pub mod loan_repository;
pub mod notification_service;

pub use book_repository::{BookRepository, IsbnAlreadyExists};
pub use loan_repository::{ActiveLoanExists, LoanRepository};
pub use notification_service::NotificationService;
