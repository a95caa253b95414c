use dreidel_core::{
    select_outcome, settle, spin_with_seeds, verify_spin, Ledger, ProvablyFairRng, RandomSource,
    Rounding, SeededRng, SequenceRng, SpinConfig, Symbol, TurnController, TurnEvent, Weights,
};

#[test]
fn rng_repeatable() {
    let mut rng1 = ProvablyFairRng::new("s", "c", 42);
    let mut rng2 = ProvablyFairRng::new("s", "c", 42);
    for _ in 0..10 {
        assert_eq!(rng1.next_f64(), rng2.next_f64());
    }
}

#[test]
fn settlements_conserve_gelt() {
    let mut rng = SeededRng::seed_from_u64(2024);
    for (rounding, put) in [(Rounding::Floor, 1), (Rounding::Ceil, 2)] {
        let config = SpinConfig::traditional()
            .with_rounding(rounding)
            .with_put_amount(put);
        let mut ledger = Ledger::new(4, config.starting_gelt).unwrap();
        let total = ledger.total();
        for n in 0..2000usize {
            let symbol = select_outcome(&config, &mut rng);
            settle(&mut ledger, n % 4, symbol, &config).unwrap();
            assert_eq!(ledger.total(), total);
        }
    }
}

#[test]
fn controller_conserves_gelt_across_antes() {
    let config = SpinConfig::traditional().with_put_amount(2);
    let mut game = TurnController::new(3, config, SeededRng::seed_from_u64(9))
        .unwrap()
        .with_listener(Vec::<TurnEvent>::new());
    let start = game.ledger().total();
    for _ in 0..500 {
        game.request_spin().unwrap();
        game.complete_spin().unwrap();
        assert_eq!(game.ledger().total(), start);
    }
    assert!(game
        .listener()
        .iter()
        .any(|e| matches!(e, TurnEvent::Ante { .. })));
}

#[test]
fn weighted_selection_matches_declared_probabilities() {
    let config = SpinConfig::traditional().with_weights(
        Weights::new(vec![
            (Symbol::Nun, 0.5),
            (Symbol::Gimel, 0.2),
            (Symbol::Hey, 0.2),
            (Symbol::Shin, 0.1),
        ])
        .unwrap(),
    );
    let mut rng = SequenceRng::new(vec![0.1, 0.55, 0.75, 0.95]);
    let picks: Vec<Symbol> = (0..4).map(|_| select_outcome(&config, &mut rng)).collect();
    assert_eq!(picks, vec![Symbol::Nun, Symbol::Gimel, Symbol::Hey, Symbol::Shin]);

    let mut rng = SeededRng::seed_from_u64(1);
    let mut counts = [0usize; 4];
    let n = 20_000;
    for _ in 0..n {
        counts[select_outcome(&config, &mut rng).to_index() as usize] += 1;
    }
    let nun_share = counts[0] as f64 / n as f64;
    let shin_share = counts[3] as f64 / n as f64;
    // very loose bounds, only catching a broken accumulation
    assert!((0.45..0.55).contains(&nun_share), "{nun_share}");
    assert!((0.07..0.13).contains(&shin_share), "{shin_share}");
}

#[test]
fn published_spins_verify() {
    let config = SpinConfig::traditional();
    let mut game =
        TurnController::new(2, config.clone(), ProvablyFairRng::new("server", "client", 0)).unwrap();
    for nonce in 0..20u64 {
        assert_eq!(game.rng().nonce, nonce);
        game.request_spin().unwrap();
        let symbol = game.pending_symbol().unwrap();
        assert!(verify_spin("server", "client", nonce, &config, symbol));
        assert_eq!(spin_with_seeds("server", "client", nonce, &config), symbol);
        game.complete_spin().unwrap();
    }
}

#[test]
fn config_file_round_trip_through_disk() {
    let path = std::env::temp_dir().join(format!("dreidel-config-{}.json", std::process::id()));
    std::fs::write(
        &path,
        r#"{"startingGelt": {"pot": 12, "player": 6}, "halfRounding": "ceil", "anteOnEmptyPot": false}"#,
    )
    .unwrap();
    let config = SpinConfig::from_path(&path).unwrap();
    std::fs::remove_file(&path).unwrap();
    assert_eq!(config.half_rounding, Rounding::Ceil);
    assert!(!config.ante_on_empty_pot);
    assert_eq!(config.starting_gelt.pot, 12);
}

#[test]
fn bundled_rules_load() {
    let config = SpinConfig::from_json_str(include_str!("../rules/gambling.json")).unwrap();
    assert_eq!(config.effect_of(Symbol::Shin), dreidel_core::RuleEffect::PutIn(2));
    assert_eq!(config.weights.unwrap().probability_of(Symbol::Gimel), 0.25);
    assert_eq!(config.spin_duration_ms, 3000);
}
