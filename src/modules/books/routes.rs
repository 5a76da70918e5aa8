//! Request handlers for the books module.

use std::path::PathBuf;

use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use rust_decimal::Decimal;

use folio_http::error::AppError;
use folio_objstore::ObjectStore;

use super::models::{Book, BookCreated, BookDeleted};
use super::repo::BookRepo;
use super::upload::StagedUpload;

/// Shared state for the books routes.
#[derive(Clone)]
pub struct BooksState {
    pub repo: BookRepo,
    pub store: ObjectStore,
    pub upload_dir: PathBuf,
}

/// Build the books router.
pub fn router(state: BooksState) -> Router {
    Router::new()
        .route("/", post(create_book).get(list_books))
        .route("/{id}", get(get_book).delete(delete_book))
        .with_state(state)
}

/// `POST /books` — stage the image, push it to the object store, then
/// record the metadata row.
async fn create_book(
    State(state): State<BooksState>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<BookCreated>), AppError> {
    let NewBook {
        name,
        description,
        price,
        image,
    } = NewBook::from_multipart(multipart, &state.upload_dir).await?;

    let key = state.store.object_key(image.file_name());
    let image_url = match state
        .store
        .put_file(&key, image.path(), image.content_type())
        .await
    {
        Ok(url) => url,
        Err(err) => {
            // Staged copy is left behind for manual inspection.
            let path = image.keep();
            tracing::warn!(path = %path.display(), "upload failed; staged file kept");
            return Err(err.into());
        }
    };

    // Remote write confirmed; the staged copy is no longer needed.
    image.discard().await;

    let id = match state
        .repo
        .insert(&name, &description, price, &image_url)
        .await
    {
        Ok(id) => id,
        Err(err) => {
            // Compensating delete so a failed insert cannot orphan the upload.
            if let Err(cleanup) = state.store.delete(&key).await {
                tracing::warn!(
                    key = %key,
                    error = %cleanup,
                    "failed to remove uploaded object after insert failure"
                );
            }
            return Err(err.into());
        }
    };

    tracing::info!(book_id = id, key = %key, "book created");
    Ok((
        StatusCode::CREATED,
        Json(BookCreated {
            message: "Book created".to_string(),
            book_id: id,
        }),
    ))
}

/// `GET /books/{id}`
async fn get_book(
    State(state): State<BooksState>,
    Path(id): Path<i64>,
) -> Result<Json<Book>, AppError> {
    let book = state
        .repo
        .get(id)
        .await?
        .ok_or_else(|| AppError::not_found("Book not found"))?;

    Ok(Json(book))
}

/// `GET /books`
async fn list_books(State(state): State<BooksState>) -> Result<Json<Vec<Book>>, AppError> {
    Ok(Json(state.repo.list().await?))
}

/// `DELETE /books/{id}` — row first, then best-effort object cleanup.
async fn delete_book(
    State(state): State<BooksState>,
    Path(id): Path<i64>,
) -> Result<Json<BookDeleted>, AppError> {
    let book = state
        .repo
        .get(id)
        .await?
        .ok_or_else(|| AppError::not_found("Book not found"))?;

    if !state.repo.delete(id).await? {
        // Row vanished between lookup and delete.
        return Err(AppError::not_found("Book not found"));
    }

    // The row is the source of truth and it is gone; object cleanup is
    // best-effort and never fails the request.
    match state.store.key_for_url(&book.image_url) {
        Some(key) => {
            if let Err(err) = state.store.delete(&key).await {
                tracing::warn!(
                    book_id = id,
                    key = %key,
                    error = %err,
                    "failed to delete image after row removal"
                );
            }
        }
        None => {
            tracing::warn!(
                book_id = id,
                url = %book.image_url,
                "image url does not match store layout; skipping object delete"
            );
        }
    }

    Ok(Json(BookDeleted {
        message: "Book deleted successfully".to_string(),
    }))
}

/// Create-request fields pulled out of the multipart body.
struct NewBook {
    name: String,
    description: String,
    price: Decimal,
    image: StagedUpload,
}

impl NewBook {
    /// Parse the multipart form, staging the image on local disk.
    ///
    /// Required-field failures answer 400 before either store is touched;
    /// an already-staged image is discarded on the way out.
    async fn from_multipart(
        mut multipart: Multipart,
        upload_dir: &std::path::Path,
    ) -> Result<Self, AppError> {
        let mut name = None;
        let mut description = None;
        let mut price = None;
        let mut image: Option<StagedUpload> = None;

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|_| AppError::bad_request("malformed multipart body"))?
        {
            match field.name() {
                Some("name") => name = Some(read_text(field).await?),
                Some("description") => description = Some(read_text(field).await?),
                Some("price") => price = Some(read_text(field).await?),
                Some("image") => {
                    let file_name = field.file_name().unwrap_or("upload.bin").to_string();
                    let content_type = field
                        .content_type()
                        .unwrap_or("application/octet-stream")
                        .to_string();
                    let data = field
                        .bytes()
                        .await
                        .map_err(|_| AppError::bad_request("malformed multipart body"))?;

                    let staged = StagedUpload::stage(upload_dir, &file_name, &content_type, data)
                        .await
                        .map_err(|err| {
                            AppError::Internal(
                                anyhow::Error::new(err).context("failed to stage upload"),
                            )
                        })?;
                    image = Some(staged);
                }
                _ => {}
            }
        }

        let image = match image {
            Some(image) => image,
            None => return Err(AppError::bad_request("image file is required")),
        };

        let (name, description, raw_price) = match (name, description, price) {
            (Some(name), Some(description), Some(price)) if !name.trim().is_empty() => {
                (name, description, price)
            }
            _ => {
                image.discard().await;
                return Err(AppError::bad_request(
                    "name, description, and price are required",
                ));
            }
        };

        let price = match parse_price(&raw_price) {
            Ok(price) => price,
            Err(err) => {
                image.discard().await;
                return Err(err);
            }
        };

        Ok(Self {
            name,
            description,
            price,
            image,
        })
    }
}

async fn read_text(field: axum::extract::multipart::Field<'_>) -> Result<String, AppError> {
    field
        .text()
        .await
        .map_err(|_| AppError::bad_request("malformed multipart body"))
}

/// Parse the submitted price; must be a non-negative decimal.
fn parse_price(raw: &str) -> Result<Decimal, AppError> {
    let price: Decimal = raw
        .trim()
        .parse()
        .map_err(|_| AppError::bad_request("price must be a decimal number"))?;

    if price.is_sign_negative() {
        return Err(AppError::bad_request("price must not be negative"));
    }

    Ok(price)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{header, Request};
    use folio_objstore::ObjectStoreConfig;
    use sqlx::mysql::{MySqlConnectOptions, MySqlPoolOptions};
    use tower::ServiceExt;

    const BOUNDARY: &str = "folio-test-boundary";

    fn test_state(upload_dir: PathBuf) -> BooksState {
        // Lazy pool: no connection is attempted until a statement runs.
        let pool = MySqlPoolOptions::new().connect_lazy_with(MySqlConnectOptions::new());

        let cfg = ObjectStoreConfig::default();
        let client = aws_sdk_s3::Client::from_conf(
            aws_sdk_s3::Config::builder()
                .behavior_version(aws_sdk_s3::config::BehaviorVersion::latest())
                .region(aws_sdk_s3::config::Region::new(cfg.region.clone()))
                .build(),
        );

        BooksState {
            repo: BookRepo::new(pool),
            store: ObjectStore::new(client, &cfg),
            upload_dir,
        }
    }

    fn text_part(name: &str, value: &str) -> String {
        format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
        )
    }

    fn file_part(name: &str, file_name: &str, payload: &str) -> String {
        format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\nContent-Type: image/png\r\n\r\n{payload}\r\n"
        )
    }

    fn multipart_request(parts: &[String]) -> Request<Body> {
        let body = format!("{}--{BOUNDARY}--\r\n", parts.concat());
        Request::builder()
            .method("POST")
            .uri("/")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn create_without_file_is_rejected_with_400() {
        let dir = tempfile::tempdir().unwrap();
        let app = router(test_state(dir.path().to_path_buf()));

        let request = multipart_request(&[
            text_part("name", "Dune"),
            text_part("description", "desc"),
            text_part("price", "12.50"),
        ]);

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        // No writes anywhere: the staging directory stays empty.
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn create_with_missing_fields_discards_staged_file() {
        let dir = tempfile::tempdir().unwrap();
        let app = router(test_state(dir.path().to_path_buf()));

        let request = multipart_request(&[
            text_part("name", "Dune"),
            file_part("image", "cover.png", "not-a-real-png"),
        ]);

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn create_with_invalid_price_discards_staged_file() {
        let dir = tempfile::tempdir().unwrap();
        let app = router(test_state(dir.path().to_path_buf()));

        let request = multipart_request(&[
            text_part("name", "Dune"),
            text_part("description", "desc"),
            text_part("price", "not-a-number"),
            file_part("image", "cover.png", "not-a-real-png"),
        ]);

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn price_must_be_a_non_negative_decimal() {
        assert_eq!(parse_price("12.50").unwrap(), Decimal::new(1250, 2));
        assert_eq!(parse_price(" 0 ").unwrap(), Decimal::ZERO);
        assert!(parse_price("-1").is_err());
        assert!(parse_price("twelve").is_err());
        assert!(parse_price("").is_err());
    }
}
