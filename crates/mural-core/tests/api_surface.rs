// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Settings, statistics, and playset-file execution.
#![allow(missing_docs, clippy::expect_used, clippy::unwrap_used)]

mod common;

use common::{named_playset, Fixture};
use mural_core::{ExposureMode, PickMode, SchedError};

#[test]
fn pick_mode_and_dwell_are_readable_and_writable() {
    let fixture = Fixture::new(1);
    assert_eq!(fixture.scheduler.pick_mode(), PickMode::Recency);
    fixture.scheduler.set_pick_mode(PickMode::Random);
    assert_eq!(fixture.scheduler.pick_mode(), PickMode::Random);

    fixture.scheduler.set_dwell_time(12);
    assert_eq!(fixture.scheduler.dwell_time(), 12);

    // No ticker attached: timer controls are inert but legal.
    fixture.scheduler.reset_timer();
    fixture.scheduler.pause_auto_swap();
    fixture.scheduler.resume_auto_swap();
}

#[test]
fn stats_reflect_the_executed_playset() {
    let fixture = Fixture::new(1);
    fixture.install_remote_channel("all", &[1, 2, 3], &[0, 2]);
    fixture.install_remote_channel("promoted", &[11], &[0]);

    fixture
        .scheduler
        .execute_playset(&named_playset(
            &[("all", 1), ("promoted", 1)],
            ExposureMode::Equal,
            PickMode::Recency,
        ))
        .unwrap();

    let stats = fixture.scheduler.stats();
    assert_eq!(stats.epoch, 1);
    assert_eq!(stats.channel_count, 2);
    assert_eq!(stats.total_entries, 4);
    assert_eq!(stats.total_available, 3);
    assert_eq!(stats.history_len, 1);
    assert!(stats.last_played_id.is_some());

    assert_eq!(
        fixture.scheduler.active_channel_ids(),
        vec!["all".to_owned(), "promoted".to_owned()]
    );

    let all = fixture.scheduler.channel_stats("all").unwrap();
    assert_eq!(all.total_entries, 3);
    assert_eq!(all.cached, 2);
    assert!(matches!(
        fixture.scheduler.channel_stats("nope"),
        Err(SchedError::NotFound)
    ));
}

#[test]
fn playset_files_execute_from_the_channel_dir() {
    let fixture = Fixture::new(1);
    fixture.install_remote_channel("all", &[5, 6], &[0, 1]);

    let playset = named_playset(&[("all", 1)], ExposureMode::Equal, PickMode::Recency);
    playset
        .save(&fixture.dir.path().join("channels").join("evening.playset"))
        .unwrap();

    fixture.scheduler.execute_playset_file("evening").unwrap();
    assert_eq!(fixture.presented_posts(), vec![5]);

    assert!(fixture.scheduler.execute_playset_file("missing").is_err());
}

#[test]
fn dwell_override_from_the_entry_wins_over_the_global() {
    let fixture = Fixture::new(1);
    fixture.install_remote_channel("all", &[5, 6], &[0, 1]);
    fixture.scheduler.set_dwell_time(9);
    fixture
        .scheduler
        .execute_playset(&named_playset(
            &[("all", 1)],
            ExposureMode::Equal,
            PickMode::Recency,
        ))
        .unwrap();

    // Remote entries carry no per-entry override, so the global applies.
    let swaps = fixture.presenter.swaps();
    assert_eq!(swaps[0].dwell_time_ms, 9_000);
    assert_eq!(swaps[0].start_time_ms, 0);
    assert_eq!(swaps[0].start_frame, 0);
}
