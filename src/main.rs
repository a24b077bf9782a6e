use minesweeper_kb::util::{play, Board};
use minesweeper_kb::InferenceEngine;
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let board = Board::new(concat!(
        "........\n",
        ".*....*.\n",
        "........\n",
        "...**...\n",
        "........\n",
        "*......*\n",
        "........\n",
        "..*.....\n",
    ))?;
    let (height, width) = board.dimensions();
    let mut engine = InferenceEngine::new(height, width);
    let outcome = play(&board, &mut engine, &mut rand::thread_rng())?;
    println!("Outcome: {outcome:?}");
    println!("Mines found: {:?}", engine.mines());
    println!("Moves made: {}", engine.moves_made().len());
    Ok(())
}
