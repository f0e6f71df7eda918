use lantern::datagen;
use lantern::logger;
use lantern::uci::Uci;

fn main() {
    logger::init_logging("logs/lantern.log", "lantern=info");

    let args: Vec<String> = std::env::args().collect();

    // `lantern datagen <games> [threads]` runs the self-play generator
    // instead of the UCI loop
    if args.get(1).map(String::as_str) == Some("datagen") {
        let games = args
            .get(2)
            .and_then(|v| v.parse().ok())
            .unwrap_or(100usize);
        let threads = args.get(3).and_then(|v| v.parse().ok()).unwrap_or(1usize);
        datagen::selfplay(games, threads);
        return;
    }

    Uci::new().run();
}
