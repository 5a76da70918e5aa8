use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A catalog entry persisted in the `books` table.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Book {
    /// Identifier generated by the relational store
    pub id: i64,
    /// Display name; never empty
    pub name: String,
    pub description: String,
    /// Non-negative price with two decimal places
    pub price: Decimal,
    /// Public URL of the cover image in the object store
    pub image_url: String,
}

/// Response body for a successful create.
#[derive(Debug, Serialize, Deserialize)]
pub struct BookCreated {
    pub message: String,
    #[serde(rename = "bookId")]
    pub book_id: i64,
}

/// Response body for a successful delete.
#[derive(Debug, Serialize, Deserialize)]
pub struct BookDeleted {
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn book_serializes_price_as_decimal_string() {
        let book = Book {
            id: 7,
            name: "Dune".to_string(),
            description: "desc".to_string(),
            price: Decimal::new(1250, 2),
            image_url: "https://covers.s3.us-east-1.amazonaws.com/images/x.png".to_string(),
        };

        let value = serde_json::to_value(&book).unwrap();
        assert_eq!(value["id"], 7);
        assert_eq!(value["price"], "12.50");
    }

    #[test]
    fn created_response_uses_book_id_casing() {
        let body = BookCreated {
            message: "Book created".to_string(),
            book_id: 42,
        };

        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["bookId"], 42);
        assert!(value.get("book_id").is_none());
    }
}
