use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};

use estimators::{EstimatorConfig, LdEngine, Methods};
use popgene::{EligibilityMap, Genotype, LocusSet, Pcrit, PopulationSample};

// Deterministic pseudo-genotypes: enough allelic churn to keep every locus
// polymorphic without pulling in an RNG.
fn synthetic_sample(individuals: usize, loci: usize) -> (PopulationSample, LocusSet) {
    let locus_set = LocusSet::new((0..loci).map(|i| format!("L{i}")));
    let mut sample = PopulationSample::new("bench", loci);
    for individual in 0..individuals {
        let row: Vec<Genotype> = (0..loci).map(|locus| {
            let a = ((individual * 7 + locus * 3) % 5 + 1) as u32;
            let b = ((individual * 11 + locus * 5) % 5 + 1) as u32;
            Genotype(a.min(b), a.max(b))
        }).collect();
        sample.ingest(&row).expect("locus counts match");
    }
    sample.finalize();
    (sample, locus_set)
}

fn bench_ld_engine(c: &mut Criterion) {
    let config = EstimatorConfig {
        methods: Methods { ld: true, ..Methods::default() },
        ..EstimatorConfig::default()
    };

    let mut group = c.benchmark_group("ld_engine");
    for &loci in &[10usize, 20, 40] {
        let (sample, locus_set) = synthetic_sample(50, loci);
        let elig = EligibilityMap::build(&locus_set, &sample, Pcrit::Value(0.02));
        group.bench_with_input(BenchmarkId::from_parameter(loci), &loci, |b, _| {
            b.iter(|| {
                LdEngine::new(&sample, &locus_set, &elig, &config)
                    .run()
                    .expect("engine runs")
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_ld_engine);
criterion_main!(benches);
