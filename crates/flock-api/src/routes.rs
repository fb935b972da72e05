use axum::{
    Router, middleware,
    routing::{get, post},
};

use crate::auth::{self, require_session};
use crate::state::AppState;
use crate::{follows, groups, likes, media, posts, users};

/// All `/api` routes. Routes behind `require_session` see a `SessionUser`
/// extension.
pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        // Users
        .route("/api/users", get(users::list_users))
        .route("/api/users/create", post(auth::create_user))
        .route("/api/users/authenticate", post(auth::authenticate))
        .route("/api/users/logout", post(auth::logout))
        .route("/api/users/search", post(users::search_users))
        .route(
            "/api/users/{username}",
            get(users::get_user)
                .put(users::update_user)
                .delete(users::delete_user),
        )
        // Posts
        .route("/api/posts/stats", get(posts::post_stats))
        .route("/api/posts/search", post(posts::search_posts))
        .route("/api/posts/user/{username}", get(posts::posts_by_user))
        .route("/api/posts/group/{group_id}", get(posts::posts_by_group))
        .route("/api/posts/{id}", get(posts::get_post))
        // Follows
        .route("/api/follows/following/{username}", get(follows::following_of))
        .route("/api/follows/followers/{username}", get(follows::followers_of))
        .route("/api/follows/status", get(follows::follow_status))
        .route("/api/follows/stats/{username}", get(follows::follow_stats))
        // Likes
        .route("/api/likes/post/{post_id}", get(likes::likes_for_post))
        // Groups
        .route("/api/groups", get(groups::list_groups).post(groups::create_group))
        .route("/api/groups/join", post(groups::join_group))
        .route("/api/groups/leave", post(groups::leave_group))
        .route("/api/groups/search", post(groups::search_groups))
        .route("/api/groups/stats", get(groups::group_stats))
        .route("/api/groups/creator/{username}", get(groups::groups_by_creator))
        .route("/api/groups/member/{username}", get(groups::groups_by_member))
        .route(
            "/api/groups/{id}",
            get(groups::get_group)
                .put(groups::update_group)
                .delete(groups::delete_group),
        )
        // Visual content
        .route("/api/visual-content", post(media::create_visual_content))
        .route("/api/visual-content/{id}", get(media::get_visual_content));

    let protected_routes = Router::new()
        .route("/api/users/me", get(auth::me))
        .route("/api/posts", get(posts::get_feed).post(posts::create_post))
        .route(
            "/api/follows",
            get(follows::my_following)
                .post(follows::follow)
                .delete(follows::unfollow),
        )
        .route("/api/likes", post(likes::like_post).delete(likes::unlike_post))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_session));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
}
