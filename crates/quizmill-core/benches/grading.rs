use criterion::{black_box, criterion_group, criterion_main, Criterion};

use quizmill_core::answers::AnswerSheet;
use quizmill_core::grading::grade_multiple_choice;
use quizmill_core::model::{McQuestion, QuestionKind};
use quizmill_core::partition::ModulePartition;
use quizmill_core::shuffle::{shuffle_questions, ShuffledQuestion};
use rand::rngs::StdRng;
use rand::SeedableRng;

fn make_questions(n: usize) -> Vec<McQuestion> {
    (0..n)
        .map(|i| McQuestion {
            text: format!("Question {i}?"),
            correct_answer: format!("right-{i}"),
            distractors: vec![
                format!("wrong-{i}a"),
                format!("wrong-{i}b"),
                "Aucune de ces réponses.".to_string(),
            ],
        })
        .collect()
}

fn make_shuffled(n: usize) -> Vec<ShuffledQuestion> {
    let mut rng = StdRng::seed_from_u64(7);
    shuffle_questions(&make_questions(n), &mut rng)
}

fn bench_shuffle(c: &mut Criterion) {
    let mut group = c.benchmark_group("shuffle");

    for n in [8usize, 24, 96] {
        let questions = make_questions(n);
        group.bench_function(format!("n={n}"), |b| {
            let mut rng = StdRng::seed_from_u64(7);
            b.iter(|| shuffle_questions(black_box(&questions), &mut rng))
        });
    }

    group.finish();
}

fn bench_grade(c: &mut Criterion) {
    let mut group = c.benchmark_group("grade_multiple_choice");

    for n in [8usize, 24, 96] {
        let questions = make_shuffled(n);
        let mut sheet = AnswerSheet::new(QuestionKind::MultipleChoice, n);
        for (i, q) in questions.iter().enumerate() {
            sheet.set_choice(i, q.correct_index);
        }
        group.bench_function(format!("n={n}"), |b| {
            b.iter(|| grade_multiple_choice(black_box(&questions), black_box(&sheet)))
        });
    }

    group.finish();
}

fn bench_group_by_module(c: &mut Criterion) {
    let partition = ModulePartition::default();
    let indices: Vec<usize> = (0..96).step_by(3).collect();

    c.bench_function("group_by_module", |b| {
        b.iter(|| partition.group_by_module(black_box(&indices)))
    });
}

criterion_group!(benches, bench_shuffle, bench_grade, bench_group_by_module);
criterion_main!(benches);
