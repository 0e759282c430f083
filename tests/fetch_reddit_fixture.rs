// tests/fetch_reddit_fixture.rs
//
// Candidate fetching against canned Reddit JSON: thresholds, stickied posts,
// sent-state exclusion, disabled and failing groups.

use chrono::Utc;
use forum_digest::fetch::{fetch_candidates, reddit::RedditSource, PostSource};
use forum_digest::store::{DigestStore, NewGroup, Preferences};

const RUST_HOT: &str = include_str!("fixtures/rust_hot.json");
const GOLANG_HOT: &str = include_str!("fixtures/golang_hot.json");
const R1_COMMENTS: &str = include_str!("fixtures/r1_comments.json");

fn source() -> RedditSource {
    RedditSource::from_fixtures(
        [
            ("rust".to_string(), RUST_HOT.to_string()),
            ("golang".to_string(), GOLANG_HOT.to_string()),
        ],
        [("r1".to_string(), R1_COMMENTS.to_string())],
    )
}

fn store_with(groups: &[&str]) -> DigestStore {
    let store = DigestStore::in_memory(Preferences::default());
    for g in groups {
        store
            .add_group(NewGroup::named(*g), Utc::now())
            .expect("add group");
    }
    store
}

fn ids(posts: &[forum_digest::CandidatePost]) -> Vec<&str> {
    posts.iter().map(|p| p.id.as_str()).collect()
}

#[tokio::test]
async fn thresholds_and_stickied_posts_are_filtered() {
    let store = store_with(&["rust", "golang"]);
    let posts = fetch_candidates(&source(), &store, 100).await;
    // r0 stickied, r3 below min score, r5 below min comments
    assert_eq!(ids(&posts), vec!["r1", "r2", "g1", "g2"]);

    let r2 = posts.iter().find(|p| p.id == "r2").unwrap();
    assert_eq!(r2.title, "What crate do you use for config & secrets?");
    assert_eq!(r2.selftext, None, "empty self text is dropped");
    assert_eq!(r2.url, "https://reddit.com/r/rust/comments/r2/config_secrets/");
}

#[tokio::test]
async fn custom_thresholds_admit_smaller_posts() {
    let store = DigestStore::in_memory(Preferences::default());
    store
        .add_group(
            NewGroup {
                name: "rust".into(),
                min_upvotes: 0,
                min_comments: 0,
            },
            Utc::now(),
        )
        .unwrap();
    let posts = fetch_candidates(&source(), &store, 100).await;
    assert_eq!(ids(&posts), vec!["r1", "r2", "r3", "r5"]);
}

#[tokio::test]
async fn sent_posts_are_excluded() {
    let store = store_with(&["rust"]);
    let first = fetch_candidates(&source(), &store, 100).await;
    let ranked = forum_digest::rank(&first, 1_757_090_000);
    store.cache_posts(&ranked, Utc::now()).unwrap();
    store.mark_sent(&["r1".to_string()], Utc::now()).unwrap();

    let again = fetch_candidates(&source(), &store, 100).await;
    assert_eq!(ids(&again), vec!["r2"]);
}

#[tokio::test]
async fn disabled_and_failing_groups_contribute_nothing() {
    let store = store_with(&["rust", "python", "golang"]);
    let golang = store
        .groups()
        .into_iter()
        .find(|g| g.name == "golang")
        .unwrap();
    store.toggle_group(golang.id).unwrap();

    // "python" has no listing: logged and skipped
    let posts = fetch_candidates(&source(), &store, 100).await;
    assert_eq!(ids(&posts), vec!["r1", "r2"]);
}

#[tokio::test]
async fn fetch_limit_caps_each_group() {
    let store = store_with(&["golang"]);
    let posts = fetch_candidates(&source(), &store, 1).await;
    assert_eq!(ids(&posts), vec!["g1"]);
}

#[tokio::test]
async fn top_comments_skip_moderation_noise() {
    let comments = source().top_comments("r1", 5).await.unwrap();
    assert_eq!(
        comments,
        vec![
            "Finally! This removes so many boxed futures from my code.",
            "The AsyncFn trait family is the real win here.",
            "Does this work with tokio::spawn yet?",
        ]
    );
    assert!(source().top_comments("unknown", 5).await.is_err());
}
