use criterion::{criterion_group, criterion_main, Criterion};
use ranger_tracker::models::Role;
use ranger_tracker::services::bulk_import::parse_activity_csv;
use ranger_tracker::services::permissions::{permissions_for, Action, Module};
use std::hint::black_box;

const CATEGORIES: [&str; 5] = [
    "patrol",
    "Mantenimiento",
    "fire_prevention",
    "Reforestación",
    "picnic",
];

/// A full-size import with one invalid category in every five rows.
fn build_csv(rows: usize) -> String {
    let mut csv = String::from("category,description,scheduled_at,ranger_email,area_id\n");
    for i in 0..rows {
        csv.push_str(&format!(
            "{},Recorrido {},2026-04-{:02}T07:30:00-06:00,ranger{}@example.org,{}\n",
            CATEGORIES[i % CATEGORIES.len()],
            i,
            i % 28 + 1,
            i % 40,
            i % 12 + 1
        ));
    }
    csv
}

fn benchmark_csv_import(c: &mut Criterion) {
    let csv = build_csv(1000);

    let mut group = c.benchmark_group("bulk_import");
    group.bench_function("parse_1000_rows", |b| {
        b.iter(|| parse_activity_csv(black_box(&csv), -6).expect("CSV parses"))
    });
    group.finish();
}

fn benchmark_permission_lookup(c: &mut Criterion) {
    c.bench_function("permissions_full_matrix", |b| {
        b.iter(|| {
            let mut allowed = 0;
            for role in Role::ALL {
                for module in Module::ALL {
                    for action in Action::ALL {
                        if permissions_for(black_box(*role), black_box(*module)).allows(*action) {
                            allowed += 1;
                        }
                    }
                }
            }
            allowed
        })
    });
}

criterion_group!(benches, benchmark_csv_import, benchmark_permission_lookup);
criterion_main!(benches);
