//! The `vedro concept` command.

use anyhow::Result;

use vedro_core::lab::{check_assignment, verdict_message, ConceptBoard, Verdict, Zone};

pub fn execute(inputs: Vec<String>, outputs: Vec<String>) -> Result<()> {
    let inputs: Vec<&str> = inputs.iter().map(|s| s.trim()).filter(|s| !s.is_empty()).collect();
    let outputs: Vec<&str> = outputs.iter().map(|s| s.trim()).filter(|s| !s.is_empty()).collect();

    let verdict = check_assignment(&inputs, &outputs)?;
    println!("{}", verdict_message(verdict));

    if verdict == Verdict::Incorrect {
        // Replay the moves on a board to point at the misplaced tiles
        let mut board = ConceptBoard::new();
        for (keys, zone) in [(&inputs, Zone::Input), (&outputs, Zone::Output)] {
            for key in keys {
                if let Err(e) = board.place(key, zone) {
                    println!("  {e}");
                }
            }
        }
        std::process::exit(1);
    }

    Ok(())
}
