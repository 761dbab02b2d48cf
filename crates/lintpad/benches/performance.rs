use criterion::{BatchSize, Criterion, black_box, criterion_group, criterion_main};
use lintpad::{Coordinator, LintpadConfig};
use lintpad_core::{Buffer, Diagnostic, DiagnosticSet, Position, Severity};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn large_python(line_count: usize) -> String {
    let mut out = String::with_capacity(line_count * 48);
    for i in 0..line_count {
        if i % 10 == 0 {
            out.push_str(&format!("def handler_{i}(event, *args):\n"));
        } else {
            out.push_str(&format!("    value_{i} = event.get('key', 0x{i:x}) + {i}.5  # note\n"));
        }
    }
    out
}

fn scattered_diagnostics(line_count: usize, count: usize) -> Vec<Diagnostic> {
    let mut rng = StdRng::seed_from_u64(7);
    (0..count)
        .map(|_| {
            Diagnostic::new(Severity::Warning, rng.gen_range(0..line_count), "w")
                .with_column(rng.gen_range(0..20))
        })
        .collect()
}

fn bench_open(c: &mut Criterion) {
    let text = large_python(50_000);
    c.bench_function("open/50k_lines", |b| {
        b.iter(|| {
            let mut coordinator = Coordinator::new(LintpadConfig::default());
            coordinator
                .on_document_opened(black_box(&text), "python")
                .unwrap();
            black_box(coordinator.version());
        })
    });
}

fn bench_typing_in_middle(c: &mut Criterion) {
    let text = large_python(50_000);
    c.bench_function("typing_middle/100_inserts", |b| {
        b.iter_batched(
            || {
                let mut coordinator = Coordinator::new(LintpadConfig::default());
                coordinator.on_document_opened(&text, "python").unwrap();
                coordinator.set_visible_lines(24_980..25_040).unwrap();
                coordinator
            },
            |mut coordinator| {
                for column in 0..100 {
                    coordinator
                        .on_edit(Position::new(25_001, 4 + column), "x", None)
                        .unwrap();
                }
                black_box(coordinator.version());
            },
            BatchSize::LargeInput,
        )
    });
}

fn bench_remap_line_insert(c: &mut Criterion) {
    let text = large_python(50_000);
    let items = scattered_diagnostics(50_000, 2_000);
    c.bench_function("remap/2k_diagnostics_line_insert", |b| {
        b.iter_batched(
            || {
                let mut buffer = Buffer::from_text(&text);
                let set = DiagnosticSet::new(buffer.version(), items.clone());
                let edit = buffer.insert(Position::new(100, 0), "import os\n").unwrap();
                (set, edit)
            },
            |(mut set, edit)| black_box(set.remap_through(&edit)),
            BatchSize::LargeInput,
        )
    });
}

criterion_group!(
    benches,
    bench_open,
    bench_typing_in_middle,
    bench_remap_line_insert
);
criterion_main!(benches);
