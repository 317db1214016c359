use std::collections::BTreeMap;

use axum::extract::{Extension, Json, Query, State};

use crate::{
    AppState,
    error::{AppError, AppResult},
    limiter::Operation,
    middleware::ClientIp,
    security::{
        CommentInput, InputKind, PostInput, escape_html, escape_search_query, validate_comment,
        validate_post, validate_user_input,
    },
    session::Session,
    utils::{ApiResponse, success_to_api_response},
};

use super::model::{SearchParams, SearchResponse};

/// 管理员发文前的校验；标题和摘要转义，正文为 markdown 原样返回
#[axum::debug_handler]
pub async fn validate_post_input(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Json(post): Json<PostInput>,
) -> AppResult<Json<ApiResponse<PostInput>>> {
    state
        .limiter
        .guarded(Operation::PostCreate, &session.email, || validate_post(&post))?;

    Ok(success_to_api_response(PostInput {
        title: escape_html(post.title.trim()),
        excerpt: post.excerpt.as_deref().map(escape_html),
        content: post.content,
    }))
}

/// 访客评论校验；按客户端 IP 限流，作者邮箱由请求方填写不能作为限流键
#[axum::debug_handler]
pub async fn validate_comment_input(
    State(state): State<AppState>,
    Extension(ClientIp(ip)): Extension<ClientIp>,
    Json(comment): Json<CommentInput>,
) -> AppResult<Json<ApiResponse<CommentInput>>> {
    state
        .limiter
        .guarded(Operation::CommentCreate, &ip, || validate_comment(&comment))?;

    Ok(success_to_api_response(CommentInput {
        author_name: escape_html(comment.author_name.trim()),
        content: escape_html(&comment.content),
        ..comment
    }))
}

#[axum::debug_handler]
pub async fn search(
    State(state): State<AppState>,
    Extension(ClientIp(ip)): Extension<ClientIp>,
    Query(params): Query<SearchParams>,
) -> AppResult<Json<ApiResponse<SearchResponse>>> {
    let query = params.q.trim();
    let escaped = state.limiter.guarded(Operation::Search, &ip, || {
        validate_user_input(query, InputKind::Text).map_err(|e| {
            AppError::Validation(BTreeMap::from([("q".to_string(), e.to_string())]))
        })
    })?;

    Ok(success_to_api_response(SearchResponse {
        query: escaped,
        pattern: escape_search_query(query),
    }))
}
