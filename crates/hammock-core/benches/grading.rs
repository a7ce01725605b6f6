use criterion::{black_box, criterion_group, criterion_main, Criterion};

use hammock_core::grading::{grade, percentage, score};
use hammock_core::model::{QuestionModel, ResponseKey};
use hammock_core::template::BraceTemplater;
use hammock_core::validate::validate_question;

fn make_question(parts: usize) -> QuestionModel {
    let parts: Vec<serde_json::Value> = (0..parts)
        .map(|_| {
            serde_json::json!({
                "score": 4,
                "match": {
                    "right": [true, "Yes, {{key}} with {{ detail }}"],
                    "close": [2, "Close"],
                    "wrong": "No"
                }
            })
        })
        .collect();
    validate_question(&serde_json::json!({
        "parts": parts,
        "match": {"shared": [1, "Shared"]}
    }))
    .unwrap()
}

fn make_responses(parts: usize) -> Vec<Option<ResponseKey>> {
    (0..parts)
        .map(|i| match i % 5 {
            0 => Some(ResponseKey::new("right").with_tag("detail", "units")),
            1 => Some(ResponseKey::new("close")),
            2 => Some(ResponseKey::new("shared")),
            3 => Some(ResponseKey::new("unknown")),
            _ => None,
        })
        .collect()
}

fn bench_grade(c: &mut Criterion) {
    let mut group = c.benchmark_group("grade");

    for parts in [1usize, 10, 100] {
        let question = make_question(parts);
        let responses = make_responses(parts);
        group.bench_function(format!("{parts}_parts"), |b| {
            b.iter(|| grade(black_box(&question), black_box(&responses), &BraceTemplater))
        });
    }

    group.finish();
}

fn bench_score(c: &mut Criterion) {
    let mut group = c.benchmark_group("score");

    let question = make_question(100);
    let feedback = grade(&question, &make_responses(100), &BraceTemplater);

    group.bench_function("100_parts", |b| {
        b.iter(|| score(black_box(&question), black_box(&feedback)))
    });

    group.bench_function("percentage", |b| {
        b.iter(|| percentage(black_box(37), black_box(91)))
    });

    group.finish();
}

criterion_group!(benches, bench_grade, bench_score);
criterion_main!(benches);
