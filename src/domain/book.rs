use serde::{Deserialize, Serialize};

use super::BookId;

/// 書籍 - カタログの1レコード
///
/// 不変条件：ISBNは全書籍の中で一意（カタログサービスが登録時に保証する）。
/// `id`は登録前は`None`、ストレージ採番後は`Some`。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Book {
    pub id: Option<BookId>,
    pub title: String,
    pub author: String,
    pub isbn: String,
}

impl Book {
    /// 未登録の書籍を作成する
    pub fn new(
        title: impl Into<String>,
        author: impl Into<String>,
        isbn: impl Into<String>,
    ) -> Self {
        Self {
            id: None,
            title: title.into(),
            author: author.into(),
            isbn: isbn.into(),
        }
    }

    /// 採番済みIDを付与したコピーを返す
    pub fn with_id(self, id: BookId) -> Self {
        Self {
            id: Some(id),
            ..self
        }
    }
}

/// 書籍検索フィルタ
///
/// 値が入っているフィールドのみ比較する（すべてAND）。
/// 比較は大文字小文字を区別しない部分一致。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookFilter {
    pub title: Option<String>,
    pub author: Option<String>,
    pub isbn: Option<String>,
}

impl BookFilter {
    /// 書籍がフィルタに一致するか
    pub fn matches(&self, book: &Book) -> bool {
        contains_ignore_case(&book.title, self.title.as_deref())
            && contains_ignore_case(&book.author, self.author.as_deref())
            && contains_ignore_case(&book.isbn, self.isbn.as_deref())
    }

    /// 空文字列のフィールドを「未指定」として扱う
    pub fn normalized(self) -> Self {
        fn non_empty(value: Option<String>) -> Option<String> {
            value.filter(|v| !v.is_empty())
        }

        Self {
            title: non_empty(self.title),
            author: non_empty(self.author),
            isbn: non_empty(self.isbn),
        }
    }
}

fn contains_ignore_case(haystack: &str, needle: Option<&str>) -> bool {
    match needle {
        None => true,
        Some(needle) => haystack.to_lowercase().contains(&needle.to_lowercase()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Book {
        Book::new("As Aventuras", "Rock", "234").with_id(BookId::from_i64(1))
    }

    #[test]
    fn test_empty_filter_matches_everything() {
        assert!(BookFilter::default().matches(&sample()));
    }

    #[test]
    fn test_title_match_is_partial_and_case_insensitive() {
        let filter = BookFilter {
            title: Some("aventu".to_string()),
            ..Default::default()
        };
        assert!(filter.matches(&sample()));
    }

    #[test]
    fn test_all_populated_fields_must_match() {
        let filter = BookFilter {
            title: Some("aventuras".to_string()),
            author: Some("someone else".to_string()),
            ..Default::default()
        };
        assert!(!filter.matches(&sample()));
    }

    #[test]
    fn test_normalized_drops_empty_strings() {
        let filter = BookFilter {
            title: Some(String::new()),
            author: Some("rock".to_string()),
            isbn: None,
        }
        .normalized();
        assert_eq!(filter.title, None);
        assert_eq!(filter.author.as_deref(), Some("rock"));
    }

    #[test]
    fn test_with_id_keeps_attributes() {
        let book = sample();
        assert_eq!(book.id, Some(BookId::from_i64(1)));
        assert_eq!(book.isbn, "234");
    }
}
