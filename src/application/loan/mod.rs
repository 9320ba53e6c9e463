mod errors;
mod loan_service;
mod overdue_notifier;

pub use errors::{LoanApplicationError, Result};
pub use loan_service::{
    get_all_overdue, get_by_id, get_loans_for_book, get_overdue_as_of, save, search, today,
    update,
};
pub use overdue_notifier::{notify_overdue_loans, send_overdue_notifications};
