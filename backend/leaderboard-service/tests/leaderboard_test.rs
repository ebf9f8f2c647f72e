use chrono::{Duration as ChronoDuration, Utc};
use leaderboard_service::{
    Leaderboard, LeaderboardError, LeaderboardOptions, MemberScore, RequestOptions, SortBy,
};
use leaderboard_store::{Aggregate, LeaderboardStore, MemoryStore};
use std::sync::Arc;
use std::time::Duration;

const BOARD: &str = "highscores";

fn options(reverse: bool, page_size: usize) -> LeaderboardOptions {
    LeaderboardOptions::new(Some(page_size), Some(reverse), None, None)
}

async fn seeded(reverse: bool, members: &[(&str, f64)]) -> Leaderboard {
    seeded_with(options(reverse, 10), members).await
}

async fn seeded_with(options: LeaderboardOptions, members: &[(&str, f64)]) -> Leaderboard {
    let store: Arc<dyn LeaderboardStore> = Arc::new(MemoryStore::new());
    let board = Leaderboard::new(store, BOARD, options).unwrap();
    for (member, score) in members {
        board.rank_member(member, *score, None).await.unwrap();
    }
    board
}

fn abc() -> Vec<(&'static str, f64)> {
    vec![("a", 10.0), ("b", 20.0), ("c", 30.0)]
}

fn page_options(page_size: usize) -> RequestOptions {
    RequestOptions {
        page_size,
        ..RequestOptions::default()
    }
}

fn names(rows: &[leaderboard_service::RankInfo]) -> Vec<&str> {
    rows.iter().map(|row| row.member.as_str()).collect()
}

// ============= Ranking =============

#[tokio::test]
async fn best_member_ranks_first_in_both_orders() {
    let members = [("a", 10.0), ("b", 20.0), ("c", 30.0), ("d", 5.0), ("e", 25.0)];

    let normal = seeded(false, &members).await;
    assert_eq!(normal.rank_for("c").await.unwrap(), Some(1));
    assert_eq!(normal.rank_for("d").await.unwrap(), Some(5));

    let reverse = seeded(true, &members).await;
    assert_eq!(reverse.rank_for("d").await.unwrap(), Some(1));
    assert_eq!(reverse.rank_for("c").await.unwrap(), Some(5));
}

#[tokio::test]
async fn reverse_board_ranks_lowest_score_first() {
    let board = seeded(true, &abc()).await;
    assert_eq!(board.rank_for("a").await.unwrap(), Some(1));
}

#[tokio::test]
async fn unranked_member_has_no_rank() {
    let board = seeded(false, &abc()).await;
    assert_eq!(board.rank_for("zed").await.unwrap(), None);
    assert_eq!(board.score_for("zed").await.unwrap(), None);
    assert!(!board.member_exists("zed").await.unwrap());
    assert!(board.member_exists("a").await.unwrap());
}

#[tokio::test]
async fn score_and_rank_reads_both() {
    let board = seeded(false, &abc()).await;

    let row = board.score_and_rank("b").await.unwrap();
    assert_eq!(row.score, Some(20.0));
    assert_eq!(row.position, Some(2));

    let missing = board.score_and_rank("zed").await.unwrap();
    assert_eq!(missing.score, None);
    assert_eq!(missing.position, None);
}

#[tokio::test]
async fn add_then_read_round_trip() {
    let board = seeded(false, &[]).await;
    board
        .rank_member("alice", 42.5, Some(r#"{"country":"NZ"}"#))
        .await
        .unwrap();

    assert_eq!(board.score_for("alice").await.unwrap(), Some(42.5));
    assert_eq!(
        board.member_data_for("alice").await.unwrap().as_deref(),
        Some(r#"{"country":"NZ"}"#)
    );
}

#[tokio::test]
async fn re_adding_same_member_keeps_total() {
    let board = seeded(false, &abc()).await;
    board.rank_member("a", 10.0, None).await.unwrap();
    board.rank_member("a", 10.0, None).await.unwrap();
    assert_eq!(board.total_members().await.unwrap(), 3);
}

#[tokio::test]
async fn rank_members_writes_every_member() {
    let board = seeded(false, &[]).await;
    board
        .rank_members(&[
            MemberScore::new("a", 1.0),
            MemberScore::new("b", 2.0),
            MemberScore::new("c", 3.0),
        ])
        .await
        .unwrap();

    assert_eq!(board.total_members().await.unwrap(), 3);
    assert_eq!(board.rank_for("c").await.unwrap(), Some(1));
    assert_eq!(board.member_data_for("a").await.unwrap(), None);
}

#[tokio::test]
async fn rank_member_across_updates_every_board() {
    let board = seeded(false, &[]).await;
    let boards = vec!["weekly".to_string(), "monthly".to_string()];
    board
        .rank_member_across(&boards, "alice", 7.0, Some("data"))
        .await
        .unwrap();

    for name in &boards {
        assert_eq!(board.score_for_in(name, "alice").await.unwrap(), Some(7.0));
        assert_eq!(
            board.member_data_for_in(name, "alice").await.unwrap().as_deref(),
            Some("data")
        );
    }
    assert_eq!(board.total_members().await.unwrap(), 0);
}

#[tokio::test]
async fn failed_batch_on_memory_store_leaves_no_partial_write() {
    let store = Arc::new(MemoryStore::new());
    // The member-data key already holds an ordered set, so HSET fails after
    // ZADD in the same batch. The memory backend restores the board.
    store.add("highscores:member_data", "x", 1.0).await.unwrap();

    let board = Leaderboard::new(store.clone(), BOARD, LeaderboardOptions::default()).unwrap();
    let err = board.rank_member("alice", 10.0, Some("data")).await.unwrap_err();
    assert!(matches!(err, LeaderboardError::Store(_)));

    assert_eq!(board.score_for("alice").await.unwrap(), None);
    assert_eq!(board.total_members().await.unwrap(), 0);
}

#[tokio::test]
async fn blank_input_is_rejected_before_store_calls() {
    let board = seeded(false, &[]).await;

    let err = board.rank_member(" ", 1.0, None).await.unwrap_err();
    assert!(matches!(err, LeaderboardError::InvalidInput(_)));

    let err = board.rank_for_in("", "alice").await.unwrap_err();
    assert!(matches!(err, LeaderboardError::InvalidInput(_)));

    assert_eq!(board.total_members().await.unwrap(), 0);
}

// ============= Conditional ranking =============

#[tokio::test]
async fn rank_member_if_writes_only_improvements() {
    let board = seeded(false, &[("alice", 50.0)]).await;

    let wrote = board
        .rank_member_if(|c| c.is_improvement(), "alice", 40.0, None)
        .await
        .unwrap();
    assert!(!wrote);
    assert_eq!(board.score_for("alice").await.unwrap(), Some(50.0));

    let wrote = board
        .rank_member_if(|c| c.is_improvement(), "alice", 60.0, Some("pb"))
        .await
        .unwrap();
    assert!(wrote);
    assert_eq!(board.score_for("alice").await.unwrap(), Some(60.0));
    assert_eq!(board.member_data_for("alice").await.unwrap().as_deref(), Some("pb"));
}

#[tokio::test]
async fn rank_condition_carries_current_state() {
    let board = seeded(true, &[("alice", 50.0)]).await;

    let pending = board.read_rank_condition("alice", 45.0, None).await.unwrap();
    assert_eq!(pending.leaderboard_name, BOARD);
    assert_eq!(pending.condition.current_score, Some(50.0));
    assert_eq!(pending.condition.score, 45.0);
    assert!(pending.condition.reverse);

    let fresh = board.read_rank_condition("bob", 1.0, None).await.unwrap();
    assert_eq!(fresh.condition.current_score, None);
}

#[tokio::test]
async fn commit_does_not_recheck_after_concurrent_write() {
    let board = seeded(false, &[("alice", 50.0)]).await;

    let pending = board.read_rank_condition("alice", 60.0, None).await.unwrap();
    // Another writer lands between the read and the commit.
    board.rank_member("alice", 100.0, None).await.unwrap();

    let wrote = board
        .commit_rank_if(pending, |c| c.is_improvement())
        .await
        .unwrap();
    assert!(wrote);
    assert_eq!(board.score_for("alice").await.unwrap(), Some(60.0));
}

// ============= Score changes and member data =============

#[tokio::test]
async fn change_score_for_increments_and_updates_data() {
    let board = seeded(false, &[]).await;

    assert_eq!(board.change_score_for("alice", 5.0, None).await.unwrap(), 5.0);
    assert_eq!(
        board.change_score_for("alice", 3.0, Some("lvl2")).await.unwrap(),
        8.0
    );
    assert_eq!(board.score_for("alice").await.unwrap(), Some(8.0));
    assert_eq!(board.member_data_for("alice").await.unwrap().as_deref(), Some("lvl2"));
}

#[tokio::test]
async fn member_data_can_be_updated_and_removed() {
    let board = seeded(false, &abc()).await;

    board.update_member_data("a", "first").await.unwrap();
    board.update_member_data("b", "second").await.unwrap();
    assert_eq!(board.member_data_for("a").await.unwrap().as_deref(), Some("first"));

    let data = board
        .members_data_for_in(BOARD, &["a".to_string(), "b".to_string(), "c".to_string()])
        .await
        .unwrap();
    assert_eq!(data.len(), 2);
    assert_eq!(data.get("b").map(String::as_str), Some("second"));

    assert!(board.remove_member_data("a").await.unwrap());
    assert!(!board.remove_member_data("a").await.unwrap());
    assert_eq!(board.member_data_for("a").await.unwrap(), None);
}

#[tokio::test]
async fn global_member_data_is_shared_between_boards() {
    let options = LeaderboardOptions::new(None, None, Some(true), Some("profiles".into()));
    let board = seeded_with(options, &[]).await;

    board.rank_member_in("weekly", "alice", 1.0, Some("shared")).await.unwrap();
    assert_eq!(
        board.member_data_for_in("monthly", "alice").await.unwrap().as_deref(),
        Some("shared")
    );
}

// ============= Removal =============

#[tokio::test]
async fn remove_member_drops_score_and_data() {
    let board = seeded(false, &[]).await;
    board.rank_member("alice", 1.0, Some("data")).await.unwrap();

    board.remove_member("alice").await.unwrap();
    assert_eq!(board.score_for("alice").await.unwrap(), None);
    assert_eq!(board.member_data_for("alice").await.unwrap(), None);
}

#[tokio::test]
async fn remove_members_in_score_range_is_inclusive() {
    let board = seeded(false, &[("a", 10.0), ("b", 20.0), ("c", 30.0), ("d", 40.0)]).await;
    assert_eq!(board.remove_members_in_score_range(20.0, 30.0).await.unwrap(), 2);
    assert_eq!(board.total_members().await.unwrap(), 2);
    assert!(board.member_exists("a").await.unwrap());
    assert!(board.member_exists("d").await.unwrap());
}

#[tokio::test]
async fn remove_members_outside_rank_keeps_the_best() {
    let board = seeded(false, &abc()).await;
    assert_eq!(board.remove_members_outside_rank(1).await.unwrap(), 2);
    assert_eq!(board.total_members().await.unwrap(), 1);
    assert!(board.member_exists("c").await.unwrap());

    let reverse = seeded(true, &abc()).await;
    assert_eq!(reverse.remove_members_outside_rank(2).await.unwrap(), 1);
    assert!(reverse.member_exists("a").await.unwrap());
    assert!(reverse.member_exists("b").await.unwrap());
    assert!(!reverse.member_exists("c").await.unwrap());
}

// ============= Cardinality and pages =============

#[tokio::test]
async fn total_pages_is_ceiling_of_members() {
    let members: Vec<(String, f64)> = (0..7).map(|i| (format!("m{}", i), i as f64)).collect();
    let refs: Vec<(&str, f64)> = members.iter().map(|(m, s)| (m.as_str(), *s)).collect();
    let board = seeded_with(options(false, 3), &refs).await;

    let total = board.total_members().await.unwrap();
    assert_eq!(total, 7);
    for page_size in 1..=8u64 {
        assert_eq!(
            board.total_pages(Some(page_size as usize)).await.unwrap(),
            total.div_ceil(page_size)
        );
    }
    assert_eq!(board.total_pages(None).await.unwrap(), 3);
    assert_eq!(board.total_pages(Some(0)).await.unwrap(), 3);
}

#[tokio::test]
async fn total_members_in_score_range_counts_inclusive() {
    let board = seeded(false, &abc()).await;
    assert_eq!(board.total_members_in_score_range(10.0, 20.0).await.unwrap(), 2);
    assert_eq!(
        board
            .total_members_in_score_range(f64::NEG_INFINITY, f64::INFINITY)
            .await
            .unwrap(),
        3
    );
}

#[tokio::test]
async fn page_for_uses_rank() {
    let members: Vec<(String, f64)> = (1..=5).map(|i| (format!("m{}", i), i as f64)).collect();
    let refs: Vec<(&str, f64)> = members.iter().map(|(m, s)| (m.as_str(), *s)).collect();
    let board = seeded_with(options(false, 2), &refs).await;

    // m5 is rank 1, m1 is rank 5.
    assert_eq!(board.page_for("m5", None).await.unwrap(), 1);
    assert_eq!(board.page_for("m3", None).await.unwrap(), 2);
    assert_eq!(board.page_for("m1", None).await.unwrap(), 3);
    assert_eq!(board.page_for("m1", Some(5)).await.unwrap(), 1);
    assert_eq!(board.page_for("zed", None).await.unwrap(), 0);
}

// ============= Percentiles =============

#[tokio::test]
async fn percentile_of_top_member() {
    let board = seeded(false, &[("a", 10.0), ("b", 20.0), ("c", 30.0), ("d", 40.0)]).await;
    let expected = 100.0 * 3.0 / 4.0;
    assert!((board.percentile_for("d").await.unwrap() - expected).abs() < 1e-9);
    assert_eq!(board.percentile_for("a").await.unwrap(), 0.0);
    assert_eq!(board.percentile_for("zed").await.unwrap(), 0.0);
}

#[tokio::test]
async fn reverse_percentile_is_inverted() {
    let board = seeded(true, &[("a", 10.0), ("b", 20.0), ("c", 30.0), ("d", 40.0)]).await;
    // Descending index of "b" is 2: (4 - 2 - 1) / 4 * 100 = 25, inverted to 75.
    assert!((board.percentile_for("b").await.unwrap() - 75.0).abs() < 1e-9);
}

#[tokio::test]
async fn score_for_percentile_bounds() {
    let members = [("a", 10.0), ("b", 20.0), ("c", 30.0), ("d", 40.0)];

    let normal = seeded(false, &members).await;
    assert_eq!(normal.score_for_percentile(0.0).await.unwrap(), 10.0);
    assert_eq!(normal.score_for_percentile(100.0).await.unwrap(), 40.0);

    let reverse = seeded(true, &members).await;
    assert_eq!(reverse.score_for_percentile(0.0).await.unwrap(), 40.0);
    assert_eq!(reverse.score_for_percentile(100.0).await.unwrap(), 10.0);
}

#[tokio::test]
async fn score_for_percentile_interpolates() {
    let board = seeded(false, &[("a", 10.0), ("b", 20.0), ("c", 30.0), ("d", 40.0)]).await;
    assert!((board.score_for_percentile(50.0).await.unwrap() - 25.0).abs() < 1e-9);

    let odd = seeded(false, &abc()).await;
    assert_eq!(odd.score_for_percentile(50.0).await.unwrap(), 20.0);
}

#[tokio::test]
async fn score_for_percentile_degenerate_inputs() {
    let board = seeded(false, &abc()).await;
    assert_eq!(board.score_for_percentile(-1.0).await.unwrap(), 0.0);
    assert_eq!(board.score_for_percentile(100.5).await.unwrap(), 0.0);

    let empty = seeded(false, &[]).await;
    assert_eq!(empty.score_for_percentile(50.0).await.unwrap(), 0.0);
}

// ============= Listing =============

#[tokio::test]
async fn top_two_in_score_order() {
    let board = seeded(false, &abc()).await;
    let rows = board.top(2, None).await.unwrap();

    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].member, "c");
    assert_eq!(rows[0].score, Some(30.0));
    assert_eq!(rows[0].position, Some(1));
    assert_eq!(rows[1].member, "b");
    assert_eq!(rows[1].score, Some(20.0));
    assert_eq!(rows[1].position, Some(2));
}

#[tokio::test]
async fn top_zero_is_empty() {
    let board = seeded(false, &abc()).await;
    assert!(board.top(0, None).await.unwrap().is_empty());
}

#[tokio::test]
async fn leaders_pages_through_the_board() {
    let members: Vec<(String, f64)> = (1..=5).map(|i| (format!("m{}", i), i as f64)).collect();
    let refs: Vec<(&str, f64)> = members.iter().map(|(m, s)| (m.as_str(), *s)).collect();
    let board = seeded_with(options(false, 2), &refs).await;
    let opts = page_options(2);

    assert_eq!(names(&board.leaders(1, Some(&opts)).await.unwrap()), vec!["m5", "m4"]);
    assert_eq!(names(&board.leaders(3, Some(&opts)).await.unwrap()), vec!["m1"]);
    assert!(board.leaders(4, Some(&opts)).await.unwrap().is_empty());
    // Page 0 is treated as page 1.
    assert_eq!(names(&board.leaders(0, Some(&opts)).await.unwrap()), vec!["m5", "m4"]);
    // Zero page size falls back to the board's page size.
    assert_eq!(board.leaders(1, Some(&page_options(0))).await.unwrap().len(), 2);
}

#[tokio::test]
async fn listings_without_options_follow_board_page_size() {
    let members: Vec<(String, f64)> = (1..=7).map(|i| (format!("m{}", i), i as f64)).collect();
    let refs: Vec<(&str, f64)> = members.iter().map(|(m, s)| (m.as_str(), *s)).collect();
    let board = seeded_with(options(false, 3), &refs).await;

    assert_eq!(board.total_pages(None).await.unwrap(), 3);
    assert_eq!(names(&board.leaders(1, None).await.unwrap()), vec!["m7", "m6", "m5"]);
    assert_eq!(names(&board.leaders(3, None).await.unwrap()), vec!["m1"]);
    assert!(board.leaders(4, None).await.unwrap().is_empty());

    assert_eq!(board.page_for("m1", None).await.unwrap(), 3);
    let last = board.member_at(7, None).await.unwrap().unwrap();
    assert_eq!(last.member, "m1");
    assert_eq!(last.position, Some(7));

    let rows = board.around_me("m4", None).await.unwrap();
    assert_eq!(rows.len(), 3);
    assert!(rows.iter().any(|row| row.member == "m4"));
}

#[tokio::test]
async fn all_leaders_in_reverse_order() {
    let board = seeded(true, &abc()).await;
    let rows = board.all_leaders(None).await.unwrap();
    assert_eq!(names(&rows), vec!["a", "b", "c"]);
    assert_eq!(rows[2].position, Some(3));
}

#[tokio::test]
async fn listing_options_shape_rows() {
    let board = seeded(false, &[]).await;
    for (member, score) in abc() {
        board
            .rank_member(member, score, Some(&format!("data-{}", member)))
            .await
            .unwrap();
    }

    let members_only = RequestOptions {
        members_only: true,
        ..RequestOptions::default()
    };
    let rows = board.all_leaders(Some(&members_only)).await.unwrap();
    assert_eq!(names(&rows), vec!["c", "b", "a"]);
    assert!(rows.iter().all(|row| row.position.is_none() && row.score.is_none()));

    let with_data = RequestOptions {
        with_member_data: true,
        ..RequestOptions::default()
    };
    let rows = board.all_leaders(Some(&with_data)).await.unwrap();
    assert_eq!(rows[0].member_data.as_deref(), Some("data-c"));

    let without = board.all_leaders(None).await.unwrap();
    assert!(without.iter().all(|row| row.member_data.is_none()));

    let by_score = RequestOptions {
        sort_by: SortBy::Score,
        ..RequestOptions::default()
    };
    let rows = board.all_leaders(Some(&by_score)).await.unwrap();
    assert_eq!(names(&rows), vec!["a", "b", "c"]);
}

#[tokio::test]
async fn ranked_in_list_drops_unranked_members() {
    let board = seeded(false, &[]).await;
    for (member, score) in abc() {
        board
            .rank_member(member, score, Some(&format!("data-{}", member)))
            .await
            .unwrap();
    }
    let requested = || vec!["ghost".to_string(), "a".to_string(), "c".to_string()];

    let rows = board.ranked_in_list(requested(), None).await.unwrap();
    assert_eq!(names(&rows), vec!["c", "a"]);
    assert_eq!(rows[0].position, Some(1));
    assert_eq!(rows[1].position, Some(3));
    assert_eq!(rows[1].score, Some(10.0));

    let with_data = RequestOptions {
        with_member_data: true,
        sort_by: SortBy::Score,
        ..RequestOptions::default()
    };
    let rows = board.ranked_in_list(requested(), Some(&with_data)).await.unwrap();
    assert_eq!(names(&rows), vec!["a", "c"]);
    assert_eq!(rows[0].member_data.as_deref(), Some("data-a"));
    assert_eq!(rows[1].member_data.as_deref(), Some("data-c"));

    let only_missing = board
        .ranked_in_list(vec!["ghost".to_string()], Some(&with_data))
        .await
        .unwrap();
    assert!(only_missing.is_empty());
}

#[tokio::test]
async fn members_from_score_range_best_first() {
    let board = seeded(false, &[("a", 10.0), ("b", 20.0), ("c", 30.0), ("d", 40.0)]).await;
    let rows = board.members_from_score_range(15.0, 35.0, None).await.unwrap();
    assert_eq!(names(&rows), vec!["c", "b"]);

    let reverse = seeded(true, &[("a", 10.0), ("b", 20.0), ("c", 30.0), ("d", 40.0)]).await;
    let rows = reverse.members_from_score_range(15.0, 35.0, None).await.unwrap();
    assert_eq!(names(&rows), vec!["b", "c"]);
}

#[tokio::test]
async fn members_from_rank_range_is_clamped() {
    let board = seeded(false, &abc()).await;

    let rows = board.members_from_rank_range(2, 3, None).await.unwrap();
    assert_eq!(names(&rows), vec!["b", "a"]);
    assert_eq!(rows[0].position, Some(2));

    let rows = board.members_from_rank_range(-5, 100, None).await.unwrap();
    assert_eq!(names(&rows), vec!["c", "b", "a"]);

    assert!(board.members_from_rank_range(3, 2, None).await.unwrap().is_empty());
    assert!(board.members_from_rank_range(4, 10, None).await.unwrap().is_empty());

    let empty = seeded(false, &[]).await;
    assert!(empty.members_from_rank_range(1, 10, None).await.unwrap().is_empty());
}

#[tokio::test]
async fn member_at_resolves_positions() {
    let members: Vec<(String, f64)> = (1..=5).map(|i| (format!("m{}", i), i as f64)).collect();
    let refs: Vec<(&str, f64)> = members.iter().map(|(m, s)| (m.as_str(), *s)).collect();
    let board = seeded_with(options(false, 2), &refs).await;
    let opts = page_options(2);

    let first = board.member_at(1, Some(&opts)).await.unwrap().unwrap();
    assert_eq!(first.member, "m5");
    assert_eq!(first.position, Some(1));

    let third = board.member_at(3, Some(&opts)).await.unwrap().unwrap();
    assert_eq!(third.member, "m3");

    let last = board.member_at(5, Some(&opts)).await.unwrap().unwrap();
    assert_eq!(last.member, "m1");

    assert!(board.member_at(0, Some(&opts)).await.unwrap().is_none());
    assert!(board.member_at(6, Some(&opts)).await.unwrap().is_none());
}

#[tokio::test]
async fn around_me_window_contains_member() {
    let members: Vec<(String, f64)> = (1..=10).map(|i| (format!("m{}", i), i as f64)).collect();
    let refs: Vec<(&str, f64)> = members.iter().map(|(m, s)| (m.as_str(), *s)).collect();
    let board = seeded_with(options(false, 4), &refs).await;

    for (member, _) in &members {
        for page_size in 1..=5 {
            let rows = board
                .around_me(member, Some(&page_options(page_size)))
                .await
                .unwrap();
            assert!(rows.len() <= page_size);
            assert!(rows.iter().any(|row| &row.member == member));
        }
    }

    // m5 is rank 6 (index 5): window starts at 5 - 2 = 3.
    let rows = board.around_me("m5", Some(&page_options(4))).await.unwrap();
    assert_eq!(names(&rows), vec!["m7", "m6", "m5", "m4"]);

    assert!(board.around_me("zed", None).await.unwrap().is_empty());
}

// ============= Lifetime =============

#[tokio::test]
async fn expire_leaderboard_sets_ttl_on_both_keys() {
    let store = Arc::new(MemoryStore::new());
    let board = Leaderboard::new(store.clone(), BOARD, LeaderboardOptions::default()).unwrap();
    board.rank_member("alice", 1.0, Some("data")).await.unwrap();

    board.expire_leaderboard(Duration::from_secs(60)).await.unwrap();
    let deadline = Utc::now() + ChronoDuration::seconds(61);
    for key in ["highscores", "highscores:member_data"] {
        let expires_at = store.expires_at(key).await.expect("ttl set");
        assert!(expires_at <= deadline);
    }
}

#[tokio::test]
async fn expire_leaderboard_at_past_time_removes_it() {
    let store = Arc::new(MemoryStore::new());
    let board = Leaderboard::new(store.clone(), BOARD, LeaderboardOptions::default()).unwrap();
    board.rank_member("alice", 1.0, Some("data")).await.unwrap();

    board
        .expire_leaderboard_at(Utc::now() - ChronoDuration::seconds(1))
        .await
        .unwrap();
    assert_eq!(board.total_members().await.unwrap(), 0);
    assert_eq!(store.key_count().await, 0);
}

#[tokio::test]
async fn delete_leaderboard_removes_both_keys() {
    let store = Arc::new(MemoryStore::new());
    let board = Leaderboard::new(store.clone(), BOARD, LeaderboardOptions::default()).unwrap();
    board.rank_member("alice", 1.0, Some("data")).await.unwrap();
    board.rank_member_in("other", "bob", 1.0, None).await.unwrap();

    board.delete_leaderboard().await.unwrap();
    assert_eq!(board.total_members().await.unwrap(), 0);
    assert_eq!(board.member_data_for("alice").await.unwrap(), None);
    assert_eq!(store.key_count().await, 1);
}

// ============= Multi-board =============

#[tokio::test]
async fn union_and_intersect_leaderboards() {
    let board = seeded(false, &[]).await;
    board.rank_member_in("weekly", "a", 10.0, None).await.unwrap();
    board.rank_member_in("weekly", "b", 20.0, None).await.unwrap();
    board.rank_member_in("monthly", "a", 5.0, None).await.unwrap();

    let sources = vec!["weekly".to_string(), "monthly".to_string()];

    let size = board
        .union_leaderboards("all", &sources, Aggregate::Sum)
        .await
        .unwrap();
    assert_eq!(size, 2);
    assert_eq!(board.score_for_in("all", "a").await.unwrap(), Some(15.0));

    let size = board
        .intersect_leaderboards("both", &sources, Aggregate::Max)
        .await
        .unwrap();
    assert_eq!(size, 1);
    assert_eq!(board.score_for_in("both", "a").await.unwrap(), Some(10.0));
}

#[tokio::test]
async fn combining_without_sources_is_invalid() {
    let board = seeded(false, &[]).await;
    let err = board
        .union_leaderboards("all", &[], Aggregate::Sum)
        .await
        .unwrap_err();
    assert!(matches!(err, LeaderboardError::InvalidInput(_)));
}
