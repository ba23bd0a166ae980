//! The `vedro quiz` command.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use comfy_table::{Cell, Table};
use serde::Deserialize;

use vedro_core::model::{LearningPack, QuizQuestion};
use vedro_core::quiz::{bank_questions, grade, QuizGrade};

use super::learn::TopicPack;

const LETTERS: [char; 4] = ['A', 'B', 'C', 'D'];

/// Either a bare pack or the output of `vedro learn --format json`.
#[derive(Deserialize)]
#[serde(untagged)]
enum PackFile {
    Pack(LearningPack),
    Learned(Vec<TopicPack>),
}

pub fn execute(answers: Option<Vec<String>>, pack: Option<PathBuf>) -> Result<()> {
    let questions = match &pack {
        Some(path) => load_questions(path)?,
        None => bank_questions(),
    };
    anyhow::ensure!(!questions.is_empty(), "there are no quiz questions to show");

    let Some(answers) = answers else {
        print_questions(&questions);
        return Ok(());
    };

    let result = grade(&questions, &answers)?;
    println!("{}", grade_table(&result));
    println!(
        "\nScore: {}/{} ({:.0}%)",
        result.correct,
        result.total,
        result.correct as f64 * 100.0 / result.total as f64
    );
    Ok(())
}

fn load_questions(path: &Path) -> Result<Vec<QuizQuestion>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let file: PackFile = serde_json::from_str(&content)
        .with_context(|| format!("failed to parse learning pack: {}", path.display()))?;
    Ok(match file {
        PackFile::Pack(pack) => pack.quiz_questions,
        PackFile::Learned(packs) => packs
            .into_iter()
            .flat_map(|p| p.pack.quiz_questions)
            .collect(),
    })
}

fn print_questions(questions: &[QuizQuestion]) {
    for (i, q) in questions.iter().enumerate() {
        println!("{}. {}", i + 1, q.question);
        for (letter, option) in LETTERS.iter().zip(&q.options) {
            println!("   {letter}. {option}");
        }
        println!();
    }
    println!("Grade with: vedro quiz --answers A,B,...");
}

fn grade_table(result: &QuizGrade) -> Table {
    let mut table = Table::new();
    table.set_header(vec!["#", "Question", "Your answer", "Correct answer", "Result"]);
    for (i, g) in result.per_question.iter().enumerate() {
        table.add_row(vec![
            Cell::new(i + 1),
            Cell::new(&g.question),
            Cell::new(&g.chosen),
            Cell::new(&g.correct_answer),
            Cell::new(if g.correct { "OK" } else { "WRONG" }),
        ]);
    }
    table
}
