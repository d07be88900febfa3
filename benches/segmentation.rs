use chat_rag::database::{DistanceMetric, RetrievalResult, rank};
use chat_rag::embeddings::segment;
use criterion::{Criterion, criterion_group, criterion_main};
use std::hint::black_box;

fn sample_text(sentences: usize) -> String {
    (0..sentences)
        .map(|i| match i % 3 {
            0 => format!("Sentence {} ends with a period.", i),
            1 => format!("Does sentence {} ask a question?", i),
            _ => format!("Sentence {} is exclaimed!", i),
        })
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn criterion_benchmark(c: &mut Criterion) {
    let text = sample_text(5_000);
    c.bench_function("segment 5k sentences", |b| {
        b.iter(|| segment(black_box(&text), black_box(16), black_box(4)));
    });

    let newline_text = (0..5_000)
        .map(|i| format!("line {} without terminal punctuation", i))
        .collect::<Vec<_>>()
        .join("\n");
    c.bench_function("segment newline fallback", |b| {
        b.iter(|| segment(black_box(&newline_text), black_box(16), black_box(4)));
    });

    let query = vec![0.25_f32; 768];
    let candidates: Vec<Vec<f32>> = (0..2_000)
        .map(|i| (0..768).map(|j| ((i * 31 + j) % 97) as f32 / 97.0).collect())
        .collect();
    c.bench_function("rank 2k x 768 cosine", |b| {
        b.iter(|| {
            let results = candidates
                .iter()
                .zip(1_i64..)
                .map(|(embedding, id)| RetrievalResult {
                    id,
                    text: String::new(),
                    embedding: Vec::new(),
                    distance: DistanceMetric::Cosine.distance(black_box(&query), embedding),
                })
                .collect();
            rank(results, 3)
        });
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
