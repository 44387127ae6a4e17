//! 整列処理のベンチマーク
//!
//! 合成語彙のコーパスに対して、GLMあり・なしの発話単位整列の
//! スループットを計測します。

use std::time::Duration;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use terfst::{Aligner, EditConfig, GlmTable, TokenizerMode};

/// 決定的な擬似乱数で発話ペアのコーパスを合成します。
fn synth_corpus(num_utts: usize, len: usize) -> Vec<(Vec<String>, Vec<String>)> {
    const WORDS: [&str; 12] = [
        "THE", "QUICK", "BROWN", "FOX", "JUMPS", "OVER", "LAZY", "DOG", "I'M", "GONNA", "GO",
        "T-SHIRT",
    ];
    let mut state = 0x2545F4914F6CDD1Du64;
    let mut next = || {
        state ^= state << 13;
        state ^= state >> 7;
        state ^= state << 17;
        state as usize
    };
    (0..num_utts)
        .map(|_| {
            let reference: Vec<String> =
                (0..len).map(|_| WORDS[next() % WORDS.len()].to_string()).collect();
            let mut hypothesis = reference.clone();
            // およそ1/4のトークンを別の語に置き換える
            for tok in hypothesis.iter_mut() {
                if next() % 4 == 0 {
                    *tok = WORDS[next() % WORDS.len()].to_string();
                }
            }
            (reference, hypothesis)
        })
        .collect()
}

fn benchmark_alignment(c: &mut Criterion) {
    let corpus = synth_corpus(100, 12);
    let total_tokens: usize = corpus.iter().map(|(r, h)| r.len() + h.len()).sum();

    let mut group = c.benchmark_group("Alignment Speed");
    group.throughput(Throughput::Elements(total_tokens as u64));
    group.warm_up_time(Duration::from_secs(3));
    group.measurement_time(Duration::from_secs(10));
    group.sample_size(20);

    for (name, glm_csv) in [("NoGlm", ""), ("WithGlm", "I'M,I AM\nGONNA,GOING TO\n")] {
        let glm = GlmTable::from_reader(glm_csv.as_bytes()).unwrap();
        let tokens: Vec<String> = corpus
            .iter()
            .flat_map(|(r, h)| r.iter().chain(h.iter()).cloned())
            .collect();
        let aligner = Aligner::new(
            tokens,
            &glm,
            TokenizerMode::Whitespace,
            &EditConfig::default(),
        )
        .unwrap();

        group.bench_function(BenchmarkId::new(name, "Corpus"), |b| {
            b.iter(|| {
                for (reference, hypothesis) in &corpus {
                    let utt = aligner.align(reference, hypothesis).unwrap();
                    criterion::black_box(utt.distance);
                }
            });
        });
    }
    group.finish();
}

criterion_group!(benches, benchmark_alignment);
criterion_main!(benches);
