mod common;

use lending_library::application::ServiceSettings;
use lending_library::application::loan::{self, LoanApplicationError};
use lending_library::domain::{Book, Loan, LoanFilter, LoanId, PageRequest};
use std::sync::Arc;

fn new_loan(book: &Book, customer: &str) -> Loan {
    Loan::new(
        book.clone(),
        customer,
        format!("{}@email.com", customer),
        loan::today(),
    )
}

// ============================================================================
// 貸出
// ============================================================================

#[tokio::test]
async fn test_save_assigns_id_and_leaves_returned_unset() {
    let ctx = common::setup();
    let book = common::register_book(&ctx.deps, "As Aventuras", "234").await;

    let mut request = new_loan(&book, "fulano");
    request.returned = Some(true);
    let stored = loan::save(&ctx.deps, request).await.unwrap();

    assert!(stored.id.is_some());
    assert_eq!(stored.returned, None);
    assert_eq!(stored.loan_date, loan::today());
    assert_eq!(stored.book, book);
}

#[tokio::test]
async fn test_second_active_loan_is_rejected_and_not_persisted() {
    let ctx = common::setup();
    let book = common::register_book(&ctx.deps, "As Aventuras", "234").await;
    loan::save(&ctx.deps, new_loan(&book, "fulano")).await.unwrap();

    let result = loan::save(&ctx.deps, new_loan(&book, "ciclano")).await;

    assert!(matches!(result, Err(LoanApplicationError::BookAlreadyLoaned)));
    let history = loan::get_loans_for_book(&ctx.deps, &book, PageRequest::default())
        .await
        .unwrap();
    assert_eq!(history.total_elements, 1);
    assert_eq!(history.content[0].customer, "fulano");
}

#[tokio::test]
async fn test_loan_referencing_unstored_book_is_invalid() {
    let ctx = common::setup();
    let book = Book::new("T", "A", "1");

    let result = loan::save(&ctx.deps, new_loan(&book, "fulano")).await;

    assert!(matches!(result, Err(LoanApplicationError::InvalidArgument(_))));
}

/// 存在確認と挿入の間に割り込まれても、有効な貸出は1件のまま
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_saves_produce_single_active_loan() {
    let ctx = common::setup();
    let book = common::register_book(&ctx.deps, "As Aventuras", "234").await;
    let deps = Arc::new(ctx.deps.clone());

    let mut handles = Vec::new();
    for i in 0..16 {
        let deps = deps.clone();
        let loan = new_loan(&book, &format!("customer{}", i));
        handles.push(tokio::spawn(async move { loan::save(&deps, loan).await }));
    }

    let mut succeeded = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => succeeded += 1,
            Err(LoanApplicationError::BookAlreadyLoaned) => {}
            Err(e) => panic!("unexpected error: {e}"),
        }
    }

    assert_eq!(succeeded, 1);
    let history = loan::get_loans_for_book(&ctx.deps, &book, PageRequest::default())
        .await
        .unwrap();
    assert_eq!(history.content.iter().filter(|l| l.is_active()).count(), 1);
}

// ============================================================================
// 貸出ライフサイクル
// ============================================================================

#[tokio::test]
async fn test_end_to_end_loan_cycle() {
    let ctx = common::setup();
    let book = common::register_book(&ctx.deps, "As Aventuras", "234").await;

    // 1. 貸出
    let first = loan::save(&ctx.deps, new_loan(&book, "fulano")).await.unwrap();

    // 2. 同じ書籍の2回目は拒否
    let second = loan::save(&ctx.deps, new_loan(&book, "fulano")).await;
    assert!(matches!(second, Err(LoanApplicationError::BookAlreadyLoaned)));

    // 3. 返却
    let mut returned = first.clone();
    returned.returned = Some(true);
    let returned = loan::update(&ctx.deps, returned).await.unwrap();
    assert_eq!(returned.returned, Some(true));

    // 4. 返却後は再び貸出可能
    let third = loan::save(&ctx.deps, new_loan(&book, "fulano")).await.unwrap();
    assert_ne!(third.id, first.id);
}

#[tokio::test]
async fn test_update_can_reactivate_without_check_by_default() {
    let ctx = common::setup();
    let book = common::register_book(&ctx.deps, "As Aventuras", "234").await;

    let mut first = loan::save(&ctx.deps, new_loan(&book, "fulano")).await.unwrap();
    first.returned = Some(true);
    let mut first = loan::update(&ctx.deps, first).await.unwrap();
    loan::save(&ctx.deps, new_loan(&book, "ciclano")).await.unwrap();

    // 既知の抜け道：返却済みを未返却に戻しても二重貸出チェックは走らない
    first.returned = Some(false);
    let reactivated = loan::update(&ctx.deps, first).await.unwrap();
    assert!(reactivated.is_active());
}

#[tokio::test]
async fn test_update_revalidates_when_enabled() {
    let ctx = common::setup_with(ServiceSettings {
        revalidate_on_update: true,
        ..Default::default()
    });
    let book = common::register_book(&ctx.deps, "As Aventuras", "234").await;

    let mut first = loan::save(&ctx.deps, new_loan(&book, "fulano")).await.unwrap();
    first.returned = Some(true);
    let mut first = loan::update(&ctx.deps, first).await.unwrap();
    loan::save(&ctx.deps, new_loan(&book, "ciclano")).await.unwrap();

    first.returned = Some(false);
    let result = loan::update(&ctx.deps, first.clone()).await;
    assert!(matches!(result, Err(LoanApplicationError::BookAlreadyLoaned)));

    let unchanged = loan::get_by_id(&ctx.deps, first.id.unwrap())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(unchanged.returned, Some(true));
}

/// 再検査を有効にすると、同時に未返却へ戻しても有効な貸出は1件のまま
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_reactivations_produce_single_active_loan() {
    let ctx = common::setup_with(ServiceSettings {
        revalidate_on_update: true,
        ..Default::default()
    });
    let book = common::register_book(&ctx.deps, "As Aventuras", "234").await;

    let mut returned = Vec::new();
    for i in 0..8 {
        let mut stored = loan::save(&ctx.deps, new_loan(&book, &format!("customer{}", i)))
            .await
            .unwrap();
        stored.returned = Some(true);
        returned.push(loan::update(&ctx.deps, stored).await.unwrap());
    }

    let deps = Arc::new(ctx.deps.clone());
    let mut handles = Vec::new();
    for mut stored in returned {
        let deps = deps.clone();
        stored.returned = Some(false);
        handles.push(tokio::spawn(async move { loan::update(&deps, stored).await }));
    }

    let mut succeeded = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => succeeded += 1,
            Err(LoanApplicationError::BookAlreadyLoaned) => {}
            Err(e) => panic!("unexpected error: {e}"),
        }
    }

    assert_eq!(succeeded, 1);
    let history = loan::get_loans_for_book(&ctx.deps, &book, PageRequest::default())
        .await
        .unwrap();
    assert_eq!(history.total_elements, 8);
    assert_eq!(history.content.iter().filter(|l| l.is_active()).count(), 1);
}

#[tokio::test]
async fn test_update_of_the_active_loan_itself_passes_revalidation() {
    let ctx = common::setup_with(ServiceSettings {
        revalidate_on_update: true,
        ..Default::default()
    });
    let book = common::register_book(&ctx.deps, "As Aventuras", "234").await;

    let mut active = loan::save(&ctx.deps, new_loan(&book, "fulano")).await.unwrap();
    active.customer = "fulano de tal".to_string();

    let updated = loan::update(&ctx.deps, active).await.unwrap();
    assert_eq!(updated.customer, "fulano de tal");
}

#[tokio::test]
async fn test_get_by_id_missing_is_none() {
    let ctx = common::setup();

    let found = loan::get_by_id(&ctx.deps, LoanId::from_i64(42)).await.unwrap();

    assert!(found.is_none());
}

// ============================================================================
// 検索
// ============================================================================

#[tokio::test]
async fn test_search_matches_isbn_or_customer_exactly() {
    let ctx = common::setup();
    let first = common::register_book(&ctx.deps, "As Aventuras", "234").await;
    let second = common::register_book(&ctx.deps, "Dom Casmurro", "567").await;
    let third = common::register_book(&ctx.deps, "O Cortiço", "890").await;
    loan::save(&ctx.deps, new_loan(&first, "fulano")).await.unwrap();
    loan::save(&ctx.deps, new_loan(&second, "ciclano")).await.unwrap();
    loan::save(&ctx.deps, new_loan(&third, "beltrano")).await.unwrap();

    let filter = LoanFilter {
        isbn: Some("234".to_string()),
        customer: Some("ciclano".to_string()),
    };
    let page = loan::search(&ctx.deps, filter, PageRequest::new(0, 10))
        .await
        .unwrap();

    assert_eq!(page.total_elements, 2);
    let mut customers: Vec<_> = page.content.iter().map(|l| l.customer.as_str()).collect();
    customers.sort();
    assert_eq!(customers, vec!["ciclano", "fulano"]);
}

#[tokio::test]
async fn test_search_does_not_partially_match() {
    let ctx = common::setup();
    let book = common::register_book(&ctx.deps, "As Aventuras", "234").await;
    loan::save(&ctx.deps, new_loan(&book, "fulano")).await.unwrap();

    let filter = LoanFilter {
        isbn: Some("23".to_string()),
        customer: Some("Fulano".to_string()),
    };
    let page = loan::search(&ctx.deps, filter, PageRequest::default())
        .await
        .unwrap();

    assert_eq!(page.total_elements, 0);
}

#[tokio::test]
async fn test_loans_for_book_include_history() {
    let ctx = common::setup();
    let book = common::register_book(&ctx.deps, "As Aventuras", "234").await;
    let other = common::register_book(&ctx.deps, "Dom Casmurro", "567").await;

    let mut first = loan::save(&ctx.deps, new_loan(&book, "fulano")).await.unwrap();
    first.returned = Some(true);
    loan::update(&ctx.deps, first).await.unwrap();
    loan::save(&ctx.deps, new_loan(&book, "ciclano")).await.unwrap();
    loan::save(&ctx.deps, new_loan(&other, "beltrano")).await.unwrap();

    let page = loan::get_loans_for_book(&ctx.deps, &book, PageRequest::new(0, 1))
        .await
        .unwrap();

    assert_eq!(page.total_elements, 2);
    assert_eq!(page.content.len(), 1);
    assert_eq!(page.size, 1);
}

// ============================================================================
// 延滞
// ============================================================================

#[tokio::test]
async fn test_overdue_boundary_is_strict() {
    let ctx = common::setup();
    let today = loan::today();
    let four = common::register_book(&ctx.deps, "Quatro", "4").await;
    let five = common::register_book(&ctx.deps, "Cinco", "5").await;

    let mut at_four = new_loan(&four, "fulano");
    at_four.loan_date = common::days_ago(today, 4);
    loan::save(&ctx.deps, at_four).await.unwrap();

    let mut at_five = new_loan(&five, "ciclano");
    at_five.loan_date = common::days_ago(today, 5);
    loan::save(&ctx.deps, at_five).await.unwrap();

    let overdue = loan::get_overdue_as_of(&ctx.deps, today).await.unwrap();

    assert_eq!(overdue.len(), 1);
    assert_eq!(overdue[0].book.isbn, "5");
}

#[tokio::test]
async fn test_returned_loan_is_never_overdue() {
    let ctx = common::setup();
    let today = loan::today();
    let book = common::register_book(&ctx.deps, "As Aventuras", "234").await;

    let mut old = new_loan(&book, "fulano");
    old.loan_date = common::days_ago(today, 365);
    let mut stored = loan::save(&ctx.deps, old).await.unwrap();
    stored.returned = Some(true);
    loan::update(&ctx.deps, stored).await.unwrap();

    let overdue = loan::get_all_overdue(&ctx.deps).await.unwrap();

    assert!(overdue.is_empty());
}

#[tokio::test]
async fn test_explicitly_not_returned_loan_can_be_overdue() {
    let ctx = common::setup();
    let today = loan::today();
    let book = common::register_book(&ctx.deps, "As Aventuras", "234").await;

    let mut old = new_loan(&book, "fulano");
    old.loan_date = common::days_ago(today, 10);
    let mut stored = loan::save(&ctx.deps, old).await.unwrap();
    stored.returned = Some(false);
    loan::update(&ctx.deps, stored).await.unwrap();

    let overdue = loan::get_overdue_as_of(&ctx.deps, today).await.unwrap();

    assert_eq!(overdue.len(), 1);
}
