//! Lab sandbox inventory and the photosynthesis concept builder.
//!
//! Both are headless: a front end drags things around and asks these types
//! whether the move is allowed and whether the result is right.

use std::collections::BTreeSet;

use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LabError {
    #[error("Add at least two elements to the beaker to see a reaction.")]
    NotEnoughElements,

    #[error("unknown element '{0}'")]
    UnknownElement(String),

    #[error("unknown tile '{0}'")]
    UnknownTile(String),

    #[error("This is not the correct zone for {0}.")]
    WrongZone(String),

    #[error("{0} has already been placed")]
    AlreadyPlaced(String),

    #[error("place every tile before checking ({0} left)")]
    TilesRemaining(usize),
}

// ---------------------------------------------------------------------------
// Sandbox
// ---------------------------------------------------------------------------

/// Something that can go into the beaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Element {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
}

pub const INVENTORY: [Element; 8] = [
    Element { id: "hcl", name: "HCl", description: "Hydrochloric Acid" },
    Element { id: "naoh", name: "NaOH", description: "Sodium Hydroxide" },
    Element { id: "battery", name: "Battery", description: "Power Source" },
    Element { id: "wire", name: "Wire", description: "Conductor" },
    Element { id: "bulb", name: "Bulb", description: "Light Source" },
    Element { id: "plant", name: "Plant", description: "A green sprout" },
    Element { id: "sunlight", name: "Sunlight", description: "Rays of light" },
    Element { id: "water", name: "Water", description: "H\u{2082}O" },
];

pub fn find_element(id: &str) -> Option<&'static Element> {
    let id = id.trim().to_lowercase();
    INVENTORY.iter().find(|e| e.id == id)
}

/// The mixing vessel. Holds each element at most once, in insertion order.
#[derive(Debug, Clone, Default)]
pub struct Beaker {
    contents: Vec<&'static Element>,
}

impl Beaker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an element by id. Returns `Ok(false)` if it was already inside.
    pub fn add(&mut self, id: &str) -> Result<bool, LabError> {
        let element = find_element(id).ok_or_else(|| LabError::UnknownElement(id.to_string()))?;
        if self.contents.iter().any(|e| e.id == element.id) {
            return Ok(false);
        }
        self.contents.push(element);
        Ok(true)
    }

    pub fn contents(&self) -> &[&'static Element] {
        &self.contents
    }

    /// Describe the mixture for the explanation prompt.
    pub fn mix(&self) -> Result<String, LabError> {
        if self.contents.len() < 2 {
            return Err(LabError::NotEnoughElements);
        }
        let names: Vec<&str> = self.contents.iter().map(|e| e.name).collect();
        Ok(format!(
            "A student mixed the following items: {}.",
            names.join(", ")
        ))
    }

    pub fn reset(&mut self) {
        self.contents.clear();
    }
}

// ---------------------------------------------------------------------------
// Concept builder
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Zone {
    /// Reactants.
    Input,
    /// Products.
    Output,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Tile {
    pub id: &'static str,
    pub text: &'static str,
    pub zone: Zone,
}

pub const CONCEPT_TILES: [Tile; 5] = [
    Tile { id: "sunlight", text: "Sunlight", zone: Zone::Input },
    Tile { id: "co2", text: "Carbon Dioxide", zone: Zone::Input },
    Tile { id: "glucose", text: "Glucose", zone: Zone::Output },
    Tile { id: "water", text: "Water", zone: Zone::Input },
    Tile { id: "oxygen", text: "Oxygen", zone: Zone::Output },
];

const CORRECT_INPUTS: [&str; 3] = ["sunlight", "co2", "water"];
const CORRECT_OUTPUTS: [&str; 2] = ["glucose", "oxygen"];

/// Look a tile up by id or by its label, case-insensitively.
pub fn find_tile(key: &str) -> Option<&'static Tile> {
    let key = key.trim().to_lowercase();
    CONCEPT_TILES
        .iter()
        .find(|t| t.id == key || t.text.to_lowercase() == key)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    Correct,
    Incorrect,
}

/// Board state: tiles still available, and what sits in each zone.
#[derive(Debug, Clone)]
pub struct ConceptBoard {
    available: Vec<&'static Tile>,
    inputs: Vec<&'static Tile>,
    outputs: Vec<&'static Tile>,
}

impl Default for ConceptBoard {
    fn default() -> Self {
        Self {
            available: CONCEPT_TILES.iter().collect(),
            inputs: Vec::new(),
            outputs: Vec::new(),
        }
    }
}

impl ConceptBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop a tile into a zone. A wrong zone is rejected and the tile stays
    /// available.
    pub fn place(&mut self, key: &str, zone: Zone) -> Result<(), LabError> {
        let tile = find_tile(key).ok_or_else(|| LabError::UnknownTile(key.to_string()))?;
        let Some(pos) = self.available.iter().position(|t| t.id == tile.id) else {
            return Err(LabError::AlreadyPlaced(tile.text.to_string()));
        };
        if tile.zone != zone {
            return Err(LabError::WrongZone(tile.text.to_string()));
        }

        self.available.remove(pos);
        match zone {
            Zone::Input => self.inputs.push(tile),
            Zone::Output => self.outputs.push(tile),
        }
        Ok(())
    }

    pub fn available(&self) -> &[&'static Tile] {
        &self.available
    }

    pub fn inputs(&self) -> &[&'static Tile] {
        &self.inputs
    }

    pub fn outputs(&self) -> &[&'static Tile] {
        &self.outputs
    }

    /// Compare placed tiles with the photosynthesis equation, ignoring order.
    pub fn check(&self) -> Result<Verdict, LabError> {
        if !self.available.is_empty() {
            return Err(LabError::TilesRemaining(self.available.len()));
        }
        Ok(verdict(&self.inputs, &self.outputs))
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

fn id_set(tiles: &[&Tile]) -> BTreeSet<&'static str> {
    tiles.iter().map(|t| t.id).collect()
}

fn verdict(inputs: &[&Tile], outputs: &[&Tile]) -> Verdict {
    let expected_inputs: BTreeSet<&'static str> = CORRECT_INPUTS.into_iter().collect();
    let expected_outputs: BTreeSet<&'static str> = CORRECT_OUTPUTS.into_iter().collect();

    if id_set(inputs) == expected_inputs && id_set(outputs) == expected_outputs {
        Verdict::Correct
    } else {
        Verdict::Incorrect
    }
}

/// Check a complete assignment in one go, without per-move zone feedback.
///
/// Tiles may be named by id or label. Every tile must be assigned exactly once.
pub fn check_assignment(inputs: &[&str], outputs: &[&str]) -> Result<Verdict, LabError> {
    let resolve = |keys: &[&str]| -> Result<Vec<&'static Tile>, LabError> {
        keys.iter()
            .map(|k| find_tile(k).ok_or_else(|| LabError::UnknownTile(k.to_string())))
            .collect()
    };
    let inputs = resolve(inputs)?;
    let outputs = resolve(outputs)?;

    let mut seen = BTreeSet::new();
    for tile in inputs.iter().chain(outputs.iter()) {
        if !seen.insert(tile.id) {
            return Err(LabError::AlreadyPlaced(tile.text.to_string()));
        }
    }
    let remaining = CONCEPT_TILES.len() - seen.len();
    if remaining > 0 {
        return Err(LabError::TilesRemaining(remaining));
    }

    Ok(verdict(&inputs, &outputs))
}

/// Feedback line shown after [`ConceptBoard::check`].
pub fn verdict_message(verdict: Verdict) -> &'static str {
    match verdict {
        Verdict::Correct => {
            "You have correctly assembled the equation for photosynthesis! A fundamental process of life."
        }
        Verdict::Incorrect => {
            "A piece is out of place. Re-examine the roles of each component and try again."
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn beaker_ignores_duplicates() {
        let mut beaker = Beaker::new();
        assert_eq!(beaker.add("hcl"), Ok(true));
        assert_eq!(beaker.add("HCl"), Ok(false));
        assert_eq!(beaker.contents().len(), 1);
        assert_eq!(
            beaker.add("mercury"),
            Err(LabError::UnknownElement("mercury".into()))
        );
    }

    #[test]
    fn mix_needs_two_elements() {
        let mut beaker = Beaker::new();
        beaker.add("water").unwrap();
        assert_eq!(beaker.mix(), Err(LabError::NotEnoughElements));

        beaker.add("plant").unwrap();
        beaker.add("sunlight").unwrap();
        assert_eq!(
            beaker.mix().unwrap(),
            "A student mixed the following items: Water, Plant, Sunlight."
        );

        beaker.reset();
        assert!(beaker.contents().is_empty());
    }

    #[test]
    fn concept_board_correct() {
        let mut board = ConceptBoard::new();
        for id in ["water", "sunlight", "co2"] {
            board.place(id, Zone::Input).unwrap();
        }
        board.place("Oxygen", Zone::Output).unwrap();
        assert_eq!(board.check(), Err(LabError::TilesRemaining(1)));
        board.place("glucose", Zone::Output).unwrap();
        assert_eq!(board.check(), Ok(Verdict::Correct));
    }

    #[test]
    fn concept_board_rejects_wrong_zone() {
        let mut board = ConceptBoard::new();
        assert_eq!(
            board.place("glucose", Zone::Input),
            Err(LabError::WrongZone("Glucose".into()))
        );
        assert_eq!(board.available().len(), 5);
        assert_eq!(
            LabError::WrongZone("Glucose".into()).to_string(),
            "This is not the correct zone for Glucose."
        );
    }

    #[test]
    fn assignment_check() {
        assert_eq!(
            check_assignment(&["sunlight", "water", "Carbon Dioxide"], &["glucose", "oxygen"]),
            Ok(Verdict::Correct)
        );
        assert_eq!(
            check_assignment(&["sunlight", "water", "oxygen"], &["glucose", "co2"]),
            Ok(Verdict::Incorrect)
        );
        assert_eq!(
            check_assignment(&["sunlight"], &["glucose"]),
            Err(LabError::TilesRemaining(3))
        );
        assert_eq!(
            check_assignment(&["sunlight", "sunlight"], &[]),
            Err(LabError::AlreadyPlaced("Sunlight".into()))
        );
        assert_eq!(
            check_assignment(&["chlorophyll"], &[]),
            Err(LabError::UnknownTile("chlorophyll".into()))
        );
    }

    #[test]
    fn concept_board_reset_and_double_place() {
        let mut board = ConceptBoard::new();
        board.place("co2", Zone::Input).unwrap();
        assert_eq!(
            board.place("carbon dioxide", Zone::Input),
            Err(LabError::AlreadyPlaced("Carbon Dioxide".into()))
        );
        board.reset();
        assert_eq!(board.available().len(), 5);
        assert!(board.inputs().is_empty());
    }
}
