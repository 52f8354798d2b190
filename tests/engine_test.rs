//! Tests for the session engine actor.

use std::sync::Arc;
use std::time::Duration;

use wonder_words::{
    EventReceiver, GameConfig, GameStatus, GuessOutcome, Notice, PlayerId, RepeatGuessPolicy,
    ServerEvent, SessionEngine, SessionHandle, Snapshot, WordBank, WordEntry,
};

fn bank(word: &str) -> Arc<WordBank> {
    Arc::new(WordBank::from_entries(vec![WordEntry::new(
        1,
        word.to_string(),
        "d".to_string(),
    )]))
}

fn start(word: &str, config: GameConfig) -> SessionHandle {
    SessionEngine::spawn(bank(word), config).expect("Engine starts")
}

fn drain(events: &mut EventReceiver) -> Vec<ServerEvent> {
    let mut out = Vec::new();
    while let Ok(event) = events.try_recv() {
        out.push(event);
    }
    out
}

fn snapshots(events: &[ServerEvent]) -> Vec<&Snapshot> {
    events
        .iter()
        .filter_map(|e| match e {
            ServerEvent::State(s) => Some(s),
            ServerEvent::Notice(_) => None,
        })
        .collect()
}

fn p(id: u64) -> PlayerId {
    PlayerId::new(id)
}

#[tokio::test]
async fn test_sea_tower_scenario() {
    let session = start("SEA TOWER", GameConfig::default());
    let (p1, _e1) = session.join().await.expect("Join");
    let (p2, mut e2) = session.join().await.expect("Join");
    drain(&mut e2);

    let initial = session.snapshot(None).await.expect("Snapshot");
    assert_eq!(initial.revealed_word, "___ _____");

    let report = session
        .guess(p1, "e")
        .await
        .expect("Engine running")
        .expect("Guess accepted");
    assert_eq!(report.outcome, GuessOutcome::Correct { revealed: 2 });
    assert_eq!(report.score, 200);

    let after = session.snapshot(Some(p1)).await.expect("Snapshot");
    assert_eq!(after.revealed_word, "_E_ ___E_");
    assert_eq!(after.scores[&p1], 200);
    assert_eq!(after.active_player, Some(p2));
    assert_eq!(after.turn, 2);
    assert_eq!(after.you, Some(p1));

    let seen = drain(&mut e2);
    let states = snapshots(&seen);
    assert_eq!(states.len(), 1);
    assert_eq!(states[0].revealed_word, "_E_ ___E_");
}

#[tokio::test]
async fn test_join_notifies_everyone() {
    let session = start("SEA", GameConfig::default());
    let (p1, mut e1) = session.join().await.expect("Join");

    let first = drain(&mut e1);
    assert_eq!(
        first[0],
        ServerEvent::from(Notice::PlayerJoined {
            player_id: p1,
            player_ids: vec![p1],
        })
    );
    assert_eq!(snapshots(&first)[0].you, Some(p1));

    let (p2, mut e2) = session.join().await.expect("Join");
    assert_eq!(p2, p(2));

    let to_p1 = drain(&mut e1);
    assert_eq!(
        to_p1[0],
        ServerEvent::from(Notice::PlayerJoined {
            player_id: p2,
            player_ids: vec![p1, p2],
        })
    );
    assert_eq!(snapshots(&to_p1)[0].you, None);

    let to_p2 = drain(&mut e2);
    assert_eq!(snapshots(&to_p2)[0].you, Some(p2));
    assert_eq!(snapshots(&to_p2)[0].players[&p1], "Player 1");
}

#[tokio::test]
async fn test_out_of_turn_guess_is_silent() {
    let session = start("SEA", GameConfig::default());
    let (_p1, mut e1) = session.join().await.expect("Join");
    let (p2, _e2) = session.join().await.expect("Join");
    drain(&mut e1);
    let before = session.snapshot(None).await.expect("Snapshot");

    let report = session.guess(p2, "s").await.expect("Engine running");
    assert!(report.is_none());
    assert!(session.guess(p(42), "s").await.expect("Engine running").is_none());

    assert_eq!(session.snapshot(None).await.expect("Snapshot"), before);
    assert!(drain(&mut e1).is_empty());
}

#[tokio::test]
async fn test_last_attempt_ends_game() {
    let session = start("SEA", GameConfig::default().with_max_attempts(1));
    let (p1, mut e1) = session.join().await.expect("Join");
    drain(&mut e1);

    let report = session
        .guess(p1, "z")
        .await
        .expect("Engine running")
        .expect("Guess accepted");
    assert_eq!(report.outcome, GuessOutcome::Wrong { remaining_attempts: 0 });
    assert_eq!(report.score, -100);
    assert_eq!(report.status, GameStatus::Over);

    let seen = drain(&mut e1);
    assert_eq!(seen[0], ServerEvent::from(Notice::GameOver));
    let state = snapshots(&seen)[0];
    assert_eq!(state.status, GameStatus::Over);
    assert_eq!(state.remaining_attempts, 0);

    assert!(session.guess(p1, "s").await.expect("Engine running").is_none());
    assert_eq!(session.snapshot(None).await.expect("Snapshot").revealed_word, "___");
}

#[tokio::test]
async fn test_full_reveal_ends_game_with_attempts_left() {
    let session = start("AB", GameConfig::default());
    let (p1, mut e1) = session.join().await.expect("Join");
    session.guess(p1, "a").await.expect("Engine running");
    drain(&mut e1);

    let report = session
        .guess(p1, "b")
        .await
        .expect("Engine running")
        .expect("Guess accepted");
    assert!(report.ended_round());

    let seen = drain(&mut e1);
    assert_eq!(seen[0], ServerEvent::from(Notice::GameOver));
    let state = session.snapshot(None).await.expect("Snapshot");
    assert_eq!(state.revealed_word, "AB");
    assert_eq!(state.remaining_attempts, 3);
    assert_eq!(state.scores[&p1], 200);
}

#[tokio::test]
async fn test_huge_points_keep_session_alive() {
    let session = start("AAB", GameConfig::default().with_points_per_letter(i64::MAX));
    let (p1, _e1) = session.join().await.expect("Join");

    let report = session
        .guess(p1, "a")
        .await
        .expect("Engine survives")
        .expect("Guess accepted");
    assert_eq!(report.score, i64::MAX);
    assert!(session.snapshot(None).await.is_ok());
}

#[tokio::test]
async fn test_rejected_repeat_is_silent() {
    let config = GameConfig::default().with_repeat_guess_policy(RepeatGuessPolicy::Reject);
    let session = start("SEA", config);
    let (p1, mut e1) = session.join().await.expect("Join");
    let (p2, _e2) = session.join().await.expect("Join");
    session.guess(p1, "s").await.expect("Engine running");
    session.guess(p2, "e").await.expect("Engine running");
    drain(&mut e1);
    let before = session.snapshot(None).await.expect("Snapshot");

    let report = session
        .guess(p1, "S")
        .await
        .expect("Engine running")
        .expect("Rejection is reported");
    assert_eq!(report.outcome, GuessOutcome::Rejected);
    assert!(drain(&mut e1).is_empty());
    assert_eq!(session.snapshot(None).await.expect("Snapshot"), before);
    assert_eq!(before.active_player, Some(p1));
}

#[tokio::test]
async fn test_active_player_leaving_passes_turn() {
    let session = start("SEA", GameConfig::default());
    let (p1, mut e1) = session.join().await.expect("Join");
    let (p2, _e2) = session.join().await.expect("Join");
    let (p3, _e3) = session.join().await.expect("Join");
    session.guess(p1, "z").await.expect("Engine running");
    drain(&mut e1);

    session.leave(p2).await.expect("Engine running");
    let state = session.snapshot(None).await.expect("Snapshot");
    assert_eq!(state.active_player, Some(p3));
    assert!(!state.scores.contains_key(&p2));

    let seen = drain(&mut e1);
    assert_eq!(
        seen[0],
        ServerEvent::from(Notice::PlayerLeft {
            player_id: p2,
            player_ids: vec![p1, p3],
        })
    );
    assert_eq!(snapshots(&seen)[0].active_player, Some(p3));
}

#[tokio::test]
async fn test_ids_are_never_reused() {
    let session = start("SEA", GameConfig::default());
    let (p1, _e1) = session.join().await.expect("Join");
    let (p2, _e2) = session.join().await.expect("Join");
    session.leave(p1).await.expect("Engine running");
    session.leave(p(99)).await.expect("Engine running");

    let (p3, _e3) = session.join().await.expect("Join");
    assert_eq!(p3, p(3));
    let state = session.snapshot(None).await.expect("Snapshot");
    assert_eq!(state.scores.keys().copied().collect::<Vec<_>>(), vec![p2, p3]);
}

#[tokio::test]
async fn test_closed_receiver_is_dropped_from_session() {
    let session = start("SEA", GameConfig::default());
    let (p1, _e1) = session.join().await.expect("Join");
    let (p2, e2) = session.join().await.expect("Join");
    drop(e2);

    session.guess(p1, "s").await.expect("Engine running");
    let state = session.snapshot(None).await.expect("Snapshot");
    assert!(!state.scores.contains_key(&p2));
    assert_eq!(state.active_player, Some(p1));
}

#[tokio::test]
async fn test_new_round_keeps_roster() {
    let session = start("AB", GameConfig::default());
    let (p1, _e1) = session.join().await.expect("Join");
    let (p2, mut e2) = session.join().await.expect("Join");

    assert!(!session.new_round(p1).await.expect("Engine running"));

    session.guess(p1, "a").await.expect("Engine running");
    session.guess(p2, "b").await.expect("Engine running");
    assert_eq!(
        session.snapshot(None).await.expect("Snapshot").status,
        GameStatus::Over
    );
    drain(&mut e2);

    assert!(!session.new_round(p(77)).await.expect("Engine running"));
    assert!(session.new_round(p2).await.expect("Engine running"));

    let state = session.snapshot(None).await.expect("Snapshot");
    assert_eq!(state.status, GameStatus::Active);
    assert_eq!(state.revealed_word, "__");
    assert_eq!(state.active_player, Some(p1));
    assert!(state.scores.values().all(|s| *s == 0));
    assert_eq!(state.scores.len(), 2);
    assert_eq!(state.message, "New round started by Player 2.");
    assert_eq!(snapshots(&drain(&mut e2)).len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_idle_turn_is_skipped() {
    let session = start("SEA", GameConfig::default().with_turn_timeout_secs(Some(10)));
    let (p1, _e1) = session.join().await.expect("Join");
    let (p2, mut e2) = session.join().await.expect("Join");
    drain(&mut e2);

    let event = tokio::time::timeout(Duration::from_secs(60), e2.recv())
        .await
        .expect("Timer fired")
        .expect("Channel open");
    let ServerEvent::State(state) = event else {
        panic!("Expected a snapshot, got {event:?}");
    };
    assert_eq!(state.active_player, Some(p2));
    assert_eq!(state.message, format!("{} ran out of time.", p1.display_name()));
    assert_eq!(state.scores[&p1], 0);
    assert_eq!(state.remaining_attempts, 3);
}

#[tokio::test(start_paused = true)]
async fn test_turn_timer_restarts_when_active_player_leaves() {
    let session = start("SEA", GameConfig::default().with_turn_timeout_secs(Some(10)));
    let (p1, _e1) = session.join().await.expect("Join");
    let (p2, mut e2) = session.join().await.expect("Join");
    let (_p3, _e3) = session.join().await.expect("Join");

    tokio::time::advance(Duration::from_secs(6)).await;
    session.leave(p1).await.expect("Engine running");
    assert_eq!(
        session.snapshot(None).await.expect("Snapshot").active_player,
        Some(p2)
    );
    drain(&mut e2);

    // Past the first deadline but not the restarted one.
    tokio::time::advance(Duration::from_secs(5)).await;
    let state = session.snapshot(None).await.expect("Snapshot");
    assert_eq!(state.active_player, Some(p2));
    assert!(drain(&mut e2).is_empty());

    let event = tokio::time::timeout(Duration::from_secs(60), e2.recv())
        .await
        .expect("Timer fired")
        .expect("Channel open");
    let ServerEvent::State(state) = event else {
        panic!("Expected a snapshot, got {event:?}");
    };
    assert_eq!(state.message, format!("{} ran out of time.", p2.display_name()));
}

#[tokio::test]
async fn test_handle_fails_after_shutdown() {
    let session = start("SEA", GameConfig::default());
    session.shutdown().await.expect("Engine running");
    tokio::task::yield_now().await;
    assert!(session.join().await.is_err());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_commands_stay_consistent() {
    const WORD: &str = "THE QUICK BROWN FOX JUMPS OVER THE LAZY DOG";
    const GUESSERS: usize = 6;
    let config = GameConfig::default().with_max_attempts(1_000);
    let session = start(WORD, config);

    let mut joins = Vec::new();
    for _ in 0..GUESSERS {
        let session = session.clone();
        joins.push(tokio::spawn(async move { session.join().await.expect("Join") }));
    }
    let mut guessers = Vec::new();
    for join in joins {
        guessers.push(join.await.expect("Join task"));
    }
    let mut ids: Vec<u64> = guessers.iter().map(|(id, _)| id.get()).collect();
    ids.sort_unstable();
    assert_eq!(ids, (1..=GUESSERS as u64).collect::<Vec<_>>());

    let alphabet: Vec<char> = "ETAOINSHRDLUCMFWYPVBGKQJXZ0123".chars().collect();
    let (players, receivers): (Vec<PlayerId>, Vec<EventReceiver>) = guessers.into_iter().unzip();
    for mut events in receivers {
        tokio::spawn(async move { while events.recv().await.is_some() {} });
    }
    let mut tasks = Vec::new();
    for (index, player) in players.into_iter().enumerate() {
        let session = session.clone();
        let alphabet = alphabet.clone();
        tasks.push(tokio::spawn(async move {
            let (mut revealed, mut wrong) = (0usize, 0usize);
            for round in 0..150 {
                let ch = alphabet[(index * 7 + round) % alphabet.len()];
                if let Some(report) = session
                    .guess(player, ch.to_string())
                    .await
                    .expect("Engine running")
                {
                    match report.outcome {
                        GuessOutcome::Correct { revealed: n } => revealed += n,
                        GuessOutcome::Wrong { .. } => wrong += 1,
                        GuessOutcome::Repeat | GuessOutcome::Rejected => {}
                    }
                }
                tokio::task::yield_now().await;
            }
            (revealed, wrong)
        }));
    }

    let churn = {
        let session = session.clone();
        tokio::spawn(async move {
            for _ in 0..40 {
                let (player, _events) = session.join().await.expect("Join");
                tokio::task::yield_now().await;
                session.leave(player).await.expect("Leave");
            }
        })
    };

    let (mut revealed, mut wrong) = (0usize, 0usize);
    for task in tasks {
        let (r, w) = task.await.expect("Guess task");
        revealed += r;
        wrong += w;
    }
    churn.await.expect("Churn task");

    let state = session.snapshot(None).await.expect("Snapshot");
    assert_eq!(state.scores.len(), GUESSERS);
    assert_eq!(state.players.len(), GUESSERS);
    assert!(state.active_player.is_some_and(|a| state.scores.contains_key(&a)));
    assert_eq!(state.revealed_word.chars().count(), WORD.chars().count());

    let total: i64 = state.scores.values().sum();
    assert_eq!(total, 100 * revealed as i64 - 100 * wrong as i64);
    assert_eq!(state.remaining_attempts, 1_000 - wrong as u32);
    let shown = state
        .revealed_word
        .chars()
        .filter(|c| *c != '_' && *c != ' ')
        .count();
    assert_eq!(shown, revealed);
}
