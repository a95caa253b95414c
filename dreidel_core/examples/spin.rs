use dreidel_core::{ProvablyFairRng, SpinConfig, TurnController};

fn main() {
    // Example end-to-end turn
    let server_seed = "example-server-seed";
    let client_seed = "example-client-seed";
    let rng = ProvablyFairRng::new(server_seed, client_seed, 1);
    println!("server_seed_hash={}", rng.server_seed_hash_hex());

    let config = SpinConfig::traditional();
    let mut game = TurnController::new(2, config, rng).expect("traditional rules are valid");
    for _ in 0..4 {
        game.request_spin().expect("table is idle");
        let result = game.complete_spin().expect("spin in flight");
        println!(
            "player={} {} moved={} direction={:?} pot={} next={}",
            result.player,
            result.symbol.describe(game.config().effect_of(result.symbol)),
            result.amount_moved,
            result.direction,
            game.ledger().pot(),
            game.current_player()
        );
    }
}
