//! Pipeline performance benchmarks.
//!
//! Measures structure sniffing and full validation across file sizes.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use chargecheck::{sniff, Engine, EngineConfig, RawPrefix, SniffConfig};
use std::io::Write;
use tempfile::NamedTempFile;

/// Generate a synthetic tall standard-charges file with a two-line preamble.
fn generate_tall_data(rows: usize) -> String {
    let mut data = String::from(
        "hospital_name,last_updated_on,version,hospital_location,hospital_address,license_number\n\
         Bench General,2024-01-01,2.0.0,Springfield,1 Main St,12345\n\
         billing_code,billing_code_type,description,standard_charge,cash_price,payer_name,plan_name\n",
    );

    for row in 0..rows {
        let code_type = match row % 4 {
            0 => "CPT",
            1 => "HCPCS",
            2 => "NDC",
            _ => "RC",
        };
        let gross = 50.0 + (row % 500) as f64 * 1.25;
        data.push_str(&format!(
            "{:05},{},Procedure {},{:.2},{:.2},Payer {},Plan {}\n",
            10_000 + row,
            code_type,
            row % 97,
            gross,
            gross * 0.8,
            row % 7,
            row % 3
        ));
    }

    data
}

/// Benchmark header sniffing over the bounded prefix.
fn bench_sniff(c: &mut Criterion) {
    let mut group = c.benchmark_group("sniff");
    let config = SniffConfig::default();

    for rows in [100, 10_000].iter() {
        let data = generate_tall_data(*rows);
        let prefix = RawPrefix::from_bytes(data.as_bytes(), 200_000);

        group.bench_with_input(BenchmarkId::new("rows", rows), &prefix, |b, prefix| {
            b.iter(|| {
                let lines = prefix.lines();
                black_box(sniff(&lines, &config, b','))
            })
        });
    }

    group.finish();
}

/// Benchmark full validation of in-memory buffers.
fn bench_validate_bytes(c: &mut Criterion) {
    let mut group = c.benchmark_group("validate_bytes");
    let engine = Engine::with_builtin_rules(EngineConfig::default()).unwrap();

    for rows in [100, 1_000, 10_000].iter() {
        let data = generate_tall_data(*rows);

        group.throughput(Throughput::Bytes(data.len() as u64));
        group.bench_with_input(BenchmarkId::new("rows", rows), &data, |b, data| {
            b.iter(|| black_box(engine.validate_bytes("bench.csv", data.as_bytes())))
        });
    }

    group.finish();
}

/// Benchmark full validation from disk, including hashing.
fn bench_validate_file(c: &mut Criterion) {
    let mut group = c.benchmark_group("validate_file");
    let engine = Engine::with_builtin_rules(EngineConfig::default()).unwrap();

    for rows in [1_000, 10_000].iter() {
        let data = generate_tall_data(*rows);
        let mut temp = NamedTempFile::new().unwrap();
        temp.write_all(data.as_bytes()).unwrap();

        group.throughput(Throughput::Bytes(data.len() as u64));
        group.bench_with_input(BenchmarkId::new("rows", rows), &temp, |b, temp| {
            b.iter(|| black_box(engine.validate_path(temp.path())))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_sniff, bench_validate_bytes, bench_validate_file);
criterion_main!(benches);
