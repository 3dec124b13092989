use oracle_stateful::prelude::*;
use proptest::prelude::*;

fn seeds_strategy() -> impl Strategy<Value = SeedValues> {
    (
        "[a-z]{1,10}@[a-z]{1,8}\\.com",
        "[A-Za-z][A-Za-z ]{0,19}",
        "[+0-9 ]{0,15}",
        "[+0-9 ]{0,15}",
    )
        .prop_map(|(key, name, value1, value2)| SeedValues::new(key, name, value1, value2))
}

proptest! {
    #[test]
    fn decoding_is_deterministic_and_bounded(
        raw in proptest::collection::vec(any::<u8>(), 0..64),
        seeds in seeds_strategy(),
    ) {
        let first = decode(&raw, &seeds).unwrap();
        let second = decode(&raw, &seeds).unwrap();
        prop_assert_eq!(&first, &second);
        prop_assert_eq!(first.len(), raw.len().min(MAX_OPERATIONS));

        for (op, byte) in first.operations().iter().zip(&raw) {
            prop_assert_eq!(op.opcode(), Opcode::from_byte(*byte));
        }
    }

    #[test]
    fn correct_system_never_diverges(
        raw in proptest::collection::vec(any::<u8>(), 0..16),
        seeds in seeds_strategy(),
    ) {
        let service = InMemoryUserService::new();
        let mut adapter = MemoryAdapter::new(service.clone());
        let engine = OracleEngine::new(OracleConfig::strict());

        let verdict = engine.run_input(&raw, &seeds, 0, &mut adapter);
        prop_assert!(verdict.is_pass(), "unexpected verdict: {}", verdict);
        prop_assert!(service.is_empty());
    }

    #[test]
    fn delete_of_absent_key_never_succeeds(
        raw in proptest::collection::vec(any::<u8>(), 0..16),
        seeds in seeds_strategy(),
    ) {
        let mut adapter = MemoryAdapter::new(InMemoryUserService::new());
        let engine = OracleEngine::new(OracleConfig::strict());

        let summary = engine
            .run_input(&raw, &seeds, 0, &mut adapter)
            .into_result()
            .unwrap();

        let trace = summary.trace.unwrap();
        for step in trace.steps() {
            if step.operation.opcode() == Opcode::Delete && step.expected == Expectation::Failure {
                prop_assert_ne!(step.actual.status, Status::Ok);
            }
        }
    }

    #[test]
    fn model_presence_matches_system(
        raw in proptest::collection::vec(any::<u8>(), 0..16),
        seeds in seeds_strategy(),
    ) {
        let mut adapter = MemoryAdapter::new(InMemoryUserService::new());
        let engine = OracleEngine::new(
            OracleConfig::strict().with_final_state_check(true),
        );

        let verdict = engine.run_input(&raw, &seeds, 0, &mut adapter);
        prop_assert!(verdict.is_pass(), "unexpected verdict: {}", verdict);
    }

    #[test]
    fn invalid_utf8_seed_is_always_discarded(
        raw in proptest::collection::vec(any::<u8>(), 0..16),
        tail in proptest::collection::vec(any::<u8>(), 0..8),
    ) {
        let mut name = vec![0xC0u8];
        name.extend(tail);
        let seeds = SeedValues::new("k@x.com", name, "1", "2");

        let mut adapter = MemoryAdapter::new(InMemoryUserService::new());
        let verdict = OracleEngine::default().run_input(&raw, &seeds, 0, &mut adapter);
        prop_assert_eq!(
            verdict,
            Verdict::Discarded(DiscardReason::InvalidEncoding { field: "name" })
        );
        prop_assert_eq!(adapter.calls(), 0);
    }
}
