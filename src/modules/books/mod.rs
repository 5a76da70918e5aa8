pub mod models;
pub mod repo;
pub mod routes;
pub mod upload;

use std::sync::Arc;

use async_trait::async_trait;
use axum::Router;
use serde_json::json;

use folio_kernel::{InitCtx, Migration, Module};

use repo::BookRepo;
use routes::BooksState;

/// Catalog module: CRUD over book records with object-store backed cover
/// images.
pub struct BooksModule;

impl BooksModule {
    pub const fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Module for BooksModule {
    fn name(&self) -> &'static str {
        "books"
    }

    async fn init(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(
            module = self.name(),
            environment = ?ctx.settings.environment,
            bucket = %ctx.store.bucket(),
            "books module initialized"
        );
        Ok(())
    }

    fn routes(&self, ctx: &InitCtx<'_>) -> Router {
        routes::router(BooksState {
            repo: BookRepo::new(ctx.db.clone()),
            store: ctx.store.clone(),
            upload_dir: ctx.settings.upload.dir.clone(),
        })
    }

    fn openapi(&self) -> Option<serde_json::Value> {
        Some(json!({
            "paths": {
                "/": {
                    "get": {
                        "summary": "List books",
                        "tags": ["Books"],
                        "responses": {
                            "200": {
                                "description": "List of books",
                                "content": {
                                    "application/json": {
                                        "schema": {
                                            "type": "array",
                                            "items": { "$ref": "#/components/schemas/Book" }
                                        }
                                    }
                                }
                            },
                            "500": {
                                "description": "Internal server error",
                                "content": {
                                    "application/json": {
                                        "schema": { "$ref": "#/components/schemas/ErrorResponse" }
                                    }
                                }
                            }
                        }
                    },
                    "post": {
                        "summary": "Create a book",
                        "tags": ["Books"],
                        "requestBody": {
                            "required": true,
                            "content": {
                                "multipart/form-data": {
                                    "schema": { "$ref": "#/components/schemas/CreateBook" }
                                }
                            }
                        },
                        "responses": {
                            "201": {
                                "description": "Book created",
                                "content": {
                                    "application/json": {
                                        "schema": { "$ref": "#/components/schemas/BookCreated" }
                                    }
                                }
                            },
                            "400": {
                                "description": "Missing or invalid required field",
                                "content": {
                                    "application/json": {
                                        "schema": { "$ref": "#/components/schemas/ErrorResponse" }
                                    }
                                }
                            },
                            "500": {
                                "description": "Store or upload failure",
                                "content": {
                                    "application/json": {
                                        "schema": { "$ref": "#/components/schemas/ErrorResponse" }
                                    }
                                }
                            }
                        }
                    }
                },
                "/{id}": {
                    "get": {
                        "summary": "Get a book by id",
                        "tags": ["Books"],
                        "parameters": [{
                            "name": "id",
                            "in": "path",
                            "required": true,
                            "schema": { "type": "integer", "format": "int64" }
                        }],
                        "responses": {
                            "200": {
                                "description": "The book",
                                "content": {
                                    "application/json": {
                                        "schema": { "$ref": "#/components/schemas/Book" }
                                    }
                                }
                            },
                            "404": {
                                "description": "No such book",
                                "content": {
                                    "application/json": {
                                        "schema": { "$ref": "#/components/schemas/ErrorResponse" }
                                    }
                                }
                            }
                        }
                    },
                    "delete": {
                        "summary": "Delete a book and its image",
                        "tags": ["Books"],
                        "parameters": [{
                            "name": "id",
                            "in": "path",
                            "required": true,
                            "schema": { "type": "integer", "format": "int64" }
                        }],
                        "responses": {
                            "200": {
                                "description": "Book deleted",
                                "content": {
                                    "application/json": {
                                        "schema": { "$ref": "#/components/schemas/BookDeleted" }
                                    }
                                }
                            },
                            "404": {
                                "description": "No such book",
                                "content": {
                                    "application/json": {
                                        "schema": { "$ref": "#/components/schemas/ErrorResponse" }
                                    }
                                }
                            }
                        }
                    }
                }
            },
            "components": {
                "schemas": {
                    "Book": {
                        "type": "object",
                        "properties": {
                            "id": { "type": "integer", "format": "int64" },
                            "name": { "type": "string" },
                            "description": { "type": "string" },
                            "price": { "type": "string", "description": "Decimal with two places" },
                            "image_url": { "type": "string" }
                        },
                        "required": ["id", "name", "description", "price", "image_url"]
                    },
                    "CreateBook": {
                        "type": "object",
                        "properties": {
                            "name": { "type": "string" },
                            "description": { "type": "string" },
                            "price": { "type": "string" },
                            "image": { "type": "string", "format": "binary" }
                        },
                        "required": ["name", "description", "price", "image"]
                    },
                    "BookCreated": {
                        "type": "object",
                        "properties": {
                            "message": { "type": "string" },
                            "bookId": { "type": "integer", "format": "int64" }
                        },
                        "required": ["message", "bookId"]
                    },
                    "BookDeleted": {
                        "type": "object",
                        "properties": {
                            "message": { "type": "string" }
                        },
                        "required": ["message"]
                    }
                }
            }
        }))
    }

    fn migrations(&self) -> Vec<Migration> {
        vec![Migration {
            id: "001_books_table",
            up: r#"
                CREATE TABLE IF NOT EXISTS books (
                    id BIGINT AUTO_INCREMENT PRIMARY KEY,
                    name VARCHAR(255) NOT NULL,
                    description TEXT NOT NULL,
                    price DECIMAL(10, 2) NOT NULL,
                    image_url VARCHAR(255) NOT NULL
                )
                "#,
        }]
    }
}

/// Create a new instance of the books module
pub fn create_module() -> Arc<dyn Module> {
    Arc::new(BooksModule::new())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn migration_creates_books_table_idempotently() {
        let module = BooksModule::new();
        let migrations = module.migrations();

        assert_eq!(migrations.len(), 1);
        assert!(migrations[0].up.contains("CREATE TABLE IF NOT EXISTS books"));
    }

    #[test]
    fn openapi_fragment_covers_every_route() {
        let module = BooksModule::new();
        let spec = module.openapi().unwrap();
        let paths = spec["paths"].as_object().unwrap();

        assert!(paths["/"].get("get").is_some());
        assert!(paths["/"].get("post").is_some());
        assert!(paths["/{id}"].get("get").is_some());
        assert!(paths["/{id}"].get("delete").is_some());
    }
}
