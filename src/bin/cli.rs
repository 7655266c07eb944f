use halcyon::{logger, uci};

fn main() {
    logger::init_logging("logs/halcyon.log", "info");

    // All process-lifetime tables come up before the first command.
    halcyon::init();

    uci::run();
}
