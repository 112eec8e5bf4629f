//! Post handlers.

use actix_web::{HttpResponse, web};

use scribe_core::Context;
use scribe_core::service::{NewPost, PostChanges, PostView};
use scribe_shared::dto::{CreatePostRequest, CreatePostResponse, PostResponse, UpdatePostRequest};

use crate::middleware::error::AppResult;
use crate::state::AppState;

fn post_response(view: PostView) -> PostResponse {
    PostResponse {
        id: view.id,
        title: view.title,
        text: view.text,
        tags: view.tags,
        created_at: view.created_at,
    }
}

/// POST /api/v1/posts
pub async fn create(
    state: web::Data<AppState>,
    body: web::Json<CreatePostRequest>,
) -> AppResult<HttpResponse> {
    let req = body.into_inner();
    let new_post = NewPost {
        title: req.title,
        text: req.text,
        tags: req.tags,
    };

    let id = state.posts.create(&Context::background(), new_post).await?;

    Ok(HttpResponse::Created().json(CreatePostResponse { id }))
}

/// PATCH /api/v1/posts/{id}
pub async fn update(
    state: web::Data<AppState>,
    path: web::Path<String>,
    body: web::Json<UpdatePostRequest>,
) -> AppResult<HttpResponse> {
    let req = body.into_inner();
    let changes = PostChanges {
        title: req.title,
        text: req.text,
        tags: req.tags,
    };

    state
        .posts
        .update(&Context::background(), path.into_inner(), changes)
        .await?;

    Ok(HttpResponse::NoContent().finish())
}

/// DELETE /api/v1/posts/{id}
pub async fn delete(state: web::Data<AppState>, path: web::Path<String>) -> AppResult<HttpResponse> {
    state.posts.delete(&Context::background(), &path).await?;
    Ok(HttpResponse::NoContent().finish())
}

/// GET /api/v1/posts/{id}
pub async fn find(state: web::Data<AppState>, path: web::Path<String>) -> AppResult<HttpResponse> {
    let post = state.posts.find(&Context::background(), &path).await?;
    Ok(HttpResponse::Ok().json(post_response(post)))
}

/// GET /api/v1/search/{keyword}
///
/// Responds with the search backend's result envelope as-is.
pub async fn search(state: web::Data<AppState>, path: web::Path<String>) -> AppResult<HttpResponse> {
    let result = state.posts.search(&Context::background(), &path).await?;
    Ok(HttpResponse::Ok().json(result))
}
