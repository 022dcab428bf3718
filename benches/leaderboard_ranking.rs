use chrono::{Duration, TimeZone, Utc};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use uuid::Uuid;

use studysync::domain::models::{SortBy, SortOrder, UserContribution, UserSummary};
use studysync::services::leaderboard_engine::{paginate, rank_standings, sort_standings, Standing};

fn standings(members: usize) -> Vec<Standing> {
    let start = Utc.with_ymd_and_hms(2026, 1, 5, 9, 0, 0).unwrap();
    (0..members)
        .map(|i| {
            let id = Uuid::new_v4();
            Standing::new(
                UserContribution {
                    user_id: id,
                    questions_solved: (i % 7) as u64 * 3,
                    total_time_spent: (i as i64 * 37) % 900,
                    last_activity: start + Duration::minutes(i as i64),
                },
                UserSummary {
                    id,
                    name: format!("member-{i:03}"),
                    email: format!("member-{i:03}@example.com"),
                },
                100,
            )
        })
        .collect()
}

fn bench_rank(c: &mut Criterion) {
    let mut group = c.benchmark_group("leaderboard.rank");
    for members in [10usize, 50, 500] {
        let input = standings(members);
        for sort_by in [SortBy::QuestionsSolved, SortBy::UserName] {
            group.bench_with_input(
                BenchmarkId::new(sort_by.as_str(), members),
                &input,
                |b, input| {
                    b.iter(|| {
                        let mut standings = input.clone();
                        sort_standings(&mut standings, sort_by, SortOrder::Desc);
                        black_box(rank_standings(standings, sort_by))
                    });
                },
            );
        }
    }
    group.finish();
}

fn bench_paginate(c: &mut Criterion) {
    let mut input = standings(500);
    sort_standings(&mut input, SortBy::QuestionsSolved, SortOrder::Desc);
    let ranked = rank_standings(input, SortBy::QuestionsSolved);

    c.bench_function("leaderboard.paginate.middle_page", |b| {
        b.iter(|| black_box(paginate(&ranked, black_box(25), 10)));
    });
}

criterion_group!(benches, bench_rank, bench_paginate);
criterion_main!(benches);
