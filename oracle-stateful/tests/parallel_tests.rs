use oracle_stateful::prelude::*;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

fn random_cases(seed: u64, count: usize) -> Vec<RunCase> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    (0..count)
        .map(|_| {
            let len = rng.gen_range(0..16);
            let operations: Vec<u8> = (0..len).map(|_| rng.r#gen()).collect();
            RunCase::new(
                operations,
                SeedValues::new(
                    "shared@example.com",
                    "Shared User",
                    "+1 000 000 0000",
                    "+2 000 000 0000",
                ),
            )
        })
        .collect()
}

#[test]
fn test_partitioned_runs_share_one_system() {
    let service = InMemoryUserService::new();
    let engine = OracleEngine::new(
        OracleConfig::strict()
            .with_key_strategy(KeyStrategy::Partitioned)
            .with_final_state_check(true)
            .with_workers(8),
    );

    let cases = random_cases(42, 200);
    let report = engine.run_batch(&cases, |_| MemoryAdapter::new(service.clone()));

    assert!(report.is_clean(), "divergences: {:?}", report.divergences);
    assert_eq!(report.passed, 200);
    assert!(service.is_empty());
}

#[test]
fn test_verbatim_batches_still_partition_keys() {
    let service = InMemoryUserService::new();
    let engine = OracleEngine::new(
        OracleConfig::strict()
            .with_final_state_check(true)
            .with_workers(8),
    );
    assert_eq!(engine.config().key_strategy, KeyStrategy::Verbatim);

    let seeds = SeedValues::new("shared@example.com", "Shared User", "1", "2");
    let cases: Vec<RunCase> = (0..2000)
        .map(|_| RunCase::new(vec![0, 1, 2, 1, 3, 0, 1], seeds.clone()))
        .collect();
    let report = engine.run_batch(&cases, |_| MemoryAdapter::new(service.clone()));

    assert!(report.is_clean(), "divergences: {:?}", report.divergences);
    assert_eq!(report.passed, 2000);
    assert!(service.is_empty());
}

#[test]
fn test_batch_is_reproducible() {
    let engine = OracleEngine::new(
        OracleConfig::strict()
            .with_key_strategy(KeyStrategy::Partitioned)
            .with_workers(4),
    );
    let service = InMemoryUserService::with_quirks([Quirk::DeleteMissingOk]);

    let cases = random_cases(7, 64);
    let first = engine.run_batch(&cases, |_| MemoryAdapter::new(service.clone()));
    let second = engine.run_batch(&cases, |_| MemoryAdapter::new(service.clone()));

    let indices = |report: &BatchReport| -> Vec<usize> {
        report.divergences.iter().map(|(index, _)| *index).collect()
    };
    assert_eq!(indices(&first), indices(&second));
    assert_eq!(first.passed, second.passed);
}

#[test]
fn test_batch_reports_divergences_by_case() {
    let engine = OracleEngine::new(
        OracleConfig::strict()
            .with_key_strategy(KeyStrategy::Partitioned)
            .with_workers(2),
    );
    let service = InMemoryUserService::with_quirks([Quirk::SilentUpdateOnMissing]);
    let seeds = SeedValues::new("a@b.c", "A", "1", "2");

    let cases = vec![
        RunCase::new(vec![0, 2, 1], seeds.clone()),
        RunCase::new(vec![2], seeds.clone()),
        RunCase::new(vec![1, 3], seeds.clone()),
        RunCase::new(vec![3, 2], seeds),
    ];
    let report = engine.run_batch(&cases, |_| MemoryAdapter::new(service.clone()));

    assert_eq!(report.passed, 2);
    let indices: Vec<usize> = report.divergences.iter().map(|(i, _)| *i).collect();
    assert_eq!(indices, vec![1, 3]);
    assert_eq!(report.divergences[1].1.operation_index, 1);
}

#[test]
fn test_faults_are_separate_from_divergences() {
    let engine = OracleEngine::new(OracleConfig::default().with_workers(1));
    let seeds = SeedValues::new("a@b.c", "A", "1", "2");
    let cases = vec![
        RunCase::new(vec![0, 1, 1, 1], seeds.clone()),
        RunCase::new(vec![1], seeds),
    ];

    // a single worker shares one adapter, which stops answering after 2 calls
    let report = engine.run_batch(&cases, |_| {
        MemoryAdapter::new(InMemoryUserService::new()).fail_after(2)
    });

    assert!(report.divergences.is_empty());
    assert_eq!(report.faults.len(), 2);
    assert!(matches!(report.faults[0].1, RuntimeFault::Unavailable { .. }));
}
