//! Feed assembly: follow-graph post read -> like annotation.

use std::collections::HashMap;

use flock_types::api::FeedPost;
use flock_types::models::{Like, Post};
use uuid::Uuid;

use crate::error::ApiError;
use crate::state::AppState;

/// Posts by `viewer` and everyone `viewer` follows, newest first, each
/// annotated with its like count and whether `viewer` liked it.
pub async fn assemble_feed(state: &AppState, viewer: &str) -> Result<Vec<FeedPost>, ApiError> {
    let viewer = viewer.to_string();
    state
        .db_call(move |db| {
            let posts = db.feed_posts(&viewer)?;
            let likes = db.feed_likes(&viewer)?;
            Ok(annotate(posts, &likes, &viewer))
        })
        .await
}

/// Attaches like data to `posts` and orders them newest first.
pub fn annotate(posts: Vec<Post>, likes: &[Like], viewer: &str) -> Vec<FeedPost> {
    let mut by_post: HashMap<Uuid, (usize, bool)> = HashMap::new();
    for like in likes {
        let entry = by_post.entry(like.post_id).or_default();
        entry.0 += 1;
        entry.1 |= like.username == viewer;
    }

    let mut feed: Vec<FeedPost> = posts
        .into_iter()
        .map(|post| {
            let (like_count, is_liked_by_user) =
                by_post.get(&post.id).copied().unwrap_or_default();
            FeedPost {
                post,
                like_count,
                is_liked_by_user,
            }
        })
        .collect();

    // Stable, so equal dates keep the store's order.
    feed.sort_by(|a, b| b.post.date.cmp(&a.post.date));
    feed
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Duration, Utc};
    use flock_types::models::PostType;

    fn post(author: &str, date: DateTime<Utc>) -> Post {
        Post {
            id: Uuid::new_v4(),
            date,
            username: author.into(),
            text_content: format!("from {}", author),
            visual_content: None,
            group_id: None,
            post_type: PostType::Personal,
            tags: vec![],
            location: None,
        }
    }

    fn like(post: &Post, username: &str) -> Like {
        Like {
            id: Uuid::new_v4(),
            post_id: post.id,
            username: username.into(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn counts_likes_and_flags_the_viewer() {
        let now = Utc::now();
        let a = post("bob", now);
        let b = post("carol", now - Duration::minutes(1));
        let likes = vec![like(&a, "alice"), like(&a, "dave"), like(&b, "dave")];

        let feed = annotate(vec![b.clone(), a.clone()], &likes, "alice");
        assert_eq!(feed[0].post.id, a.id);
        assert_eq!(feed[0].like_count, 2);
        assert!(feed[0].is_liked_by_user);
        assert_eq!(feed[1].like_count, 1);
        assert!(!feed[1].is_liked_by_user);
    }

    #[tokio::test]
    async fn assembles_from_the_follow_graph() {
        let state = crate::AppStateInner::new(
            flock_db::Database::open_in_memory().unwrap(),
            Duration::hours(1),
            false,
        );
        let now = Utc::now();
        let own = post("alice", now - Duration::minutes(2));
        let followed = post("bob", now);
        let stranger = post("dave", now);
        state.db.create_follow("alice", "bob", now).unwrap();
        for p in [&own, &followed, &stranger] {
            state.db.insert_post(p).unwrap();
        }
        state.db.insert_like(&like(&followed, "alice")).unwrap();
        state.db.insert_like(&like(&followed, "dave")).unwrap();

        let feed = assemble_feed(&state, "alice").await.unwrap();
        let ids: Vec<Uuid> = feed.iter().map(|f| f.post.id).collect();
        assert_eq!(ids, vec![followed.id, own.id]);
        assert_eq!(feed[0].like_count, 2);
        assert!(feed[0].is_liked_by_user);
        assert_eq!(feed[1].like_count, 0);
    }

    #[test]
    fn unliked_posts_report_zero() {
        let feed = annotate(vec![post("bob", Utc::now())], &[], "alice");
        assert_eq!(feed[0].like_count, 0);
        assert!(!feed[0].is_liked_by_user);
    }

    #[test]
    fn feed_is_sorted_newest_first() {
        let now = Utc::now();
        let posts = vec![
            post("a", now - Duration::hours(2)),
            post("b", now),
            post("c", now - Duration::hours(1)),
        ];
        let authors: Vec<String> = annotate(posts, &[], "x")
            .into_iter()
            .map(|f| f.post.username)
            .collect();
        assert_eq!(authors, vec!["b", "c", "a"]);
    }
}
