// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! New-artwork events get opportunistic exposure bounded by priority decay.
#![allow(missing_docs, clippy::expect_used, clippy::unwrap_used)]

mod common;

use common::{nae_artwork, named_playset, Fixture};
use mural_core::{ExposureMode, PickMode};

#[test]
fn injected_artwork_appears_a_bounded_number_of_times() {
    let fixture = Fixture::new(0xACE);
    let posts: Vec<i32> = (1..=100).collect();
    let available: Vec<u32> = (0..100).collect();
    fixture.install_remote_channel("all", &posts, &available);

    fixture
        .scheduler
        .execute_playset(&named_playset(
            &[("all", 1)],
            ExposureMode::Equal,
            PickMode::Recency,
        ))
        .unwrap();

    fixture.scheduler.nae_insert(nae_artwork(&fixture, 9999));
    for _ in 0..200 {
        let _ = fixture.scheduler.next().unwrap();
    }

    let appearances = fixture
        .presented_posts()
        .iter()
        .filter(|p| **p == 9999)
        .count();
    // Priority halves per appearance: 0.50, 0.25, 0.125, 0.0625, 0.03125,
    // then the entry drops below the floor and is removed.
    assert!(appearances >= 1, "injected artwork never surfaced");
    assert!(appearances <= 5, "injected artwork surfaced {appearances} times");
    assert!(fixture.scheduler.stats().nae_len <= 1);
}

#[test]
fn disabling_nae_suppresses_injection() {
    let fixture = Fixture::new(0xACE);
    let posts: Vec<i32> = (1..=20).collect();
    let available: Vec<u32> = (0..20).collect();
    fixture.install_remote_channel("all", &posts, &available);

    fixture.scheduler.set_nae_enabled(false);
    assert!(!fixture.scheduler.is_nae_enabled());
    fixture
        .scheduler
        .execute_playset(&named_playset(
            &[("all", 1)],
            ExposureMode::Equal,
            PickMode::Recency,
        ))
        .unwrap();

    fixture.scheduler.nae_insert(nae_artwork(&fixture, 9999));
    for _ in 0..40 {
        fixture.scheduler.next().unwrap();
    }
    assert!(!fixture.presented_posts().contains(&9999));
}

#[test]
fn injected_artwork_with_a_missing_file_is_a_hard_failure() {
    let fixture = Fixture::new(0xACE);
    let posts: Vec<i32> = (1..=10).collect();
    let available: Vec<u32> = (0..10).collect();
    fixture.install_remote_channel("all", &posts, &available);

    fixture
        .scheduler
        .execute_playset(&named_playset(
            &[("all", 1)],
            ExposureMode::Equal,
            PickMode::Recency,
        ))
        .unwrap();

    let ghost = nae_artwork(&fixture, 9999);
    std::fs::remove_file(&ghost.filepath).unwrap();
    fixture.scheduler.nae_insert(ghost);

    // Calls where the injection coin flip misses still present channel
    // artwork; the call that selects the ghost must fail hard.
    let mut failures = 0;
    for _ in 0..50 {
        if fixture.scheduler.next().is_err() {
            failures += 1;
        }
    }
    assert!(failures >= 1, "missing-file injection never failed");
    assert!(!fixture.presented_posts().contains(&9999));
}

#[test]
fn playset_execution_clears_the_pool() {
    let fixture = Fixture::new(0xACE);
    fixture.install_remote_channel("all", &[1, 2], &[0, 1]);
    let playset = named_playset(&[("all", 1)], ExposureMode::Equal, PickMode::Recency);

    fixture.scheduler.execute_playset(&playset).unwrap();
    fixture.scheduler.nae_insert(nae_artwork(&fixture, 9999));
    assert_eq!(fixture.scheduler.stats().nae_len, 1);

    fixture.scheduler.execute_playset(&playset).unwrap();
    assert_eq!(fixture.scheduler.stats().nae_len, 0);
}

#[test]
fn reinserting_an_id_does_not_grow_the_pool() {
    let fixture = Fixture::new(0xACE);
    fixture.install_remote_channel("all", &[1, 2], &[0, 1]);
    fixture
        .scheduler
        .execute_playset(&named_playset(
            &[("all", 1)],
            ExposureMode::Equal,
            PickMode::Recency,
        ))
        .unwrap();

    let artwork = nae_artwork(&fixture, 4242);
    fixture.scheduler.nae_insert(artwork.clone());
    fixture.scheduler.nae_insert(artwork);
    assert_eq!(fixture.scheduler.stats().nae_len, 1);
}
