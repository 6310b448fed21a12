use serde::{Deserialize, Serialize};

use crate::{BoothError, Result};

/// Ordered list of countdown sequences, one per shot.
///
/// Every sequence is strictly decreasing, positive and ends at `1`. The plan
/// is fixed once constructed; a capture run walks it front to back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Vec<u32>>", into = "Vec<Vec<u32>>")]
pub struct ShotPlan {
    sequences: Vec<Vec<u32>>,
}

impl ShotPlan {
    pub fn new(sequences: Vec<Vec<u32>>) -> Result<Self> {
        if sequences.is_empty() {
            return Err(BoothError::InvalidPlan(
                "plan must contain at least one sequence".to_string(),
            ));
        }

        for (shot, sequence) in sequences.iter().enumerate() {
            validate_sequence(shot, sequence)?;
        }

        Ok(Self { sequences })
    }

    /// Total number of shots taken by one full run.
    pub fn shot_count(&self) -> usize {
        self.sequences.len()
    }

    pub fn last_shot_index(&self) -> usize {
        self.sequences.len() - 1
    }

    pub fn sequence(&self, shot: usize) -> Option<&[u32]> {
        self.sequences.get(shot).map(Vec::as_slice)
    }

    /// Countdown value a shot starts from.
    pub fn first_count(&self, shot: usize) -> Option<u32> {
        self.sequences.get(shot).and_then(|s| s.first().copied())
    }

    pub fn sequences(&self) -> &[Vec<u32>] {
        &self.sequences
    }

    /// Number of ticks between `start` and `Complete`: every countdown plus
    /// one settle tick between consecutive shots.
    pub fn ticks_to_complete(&self) -> u64 {
        let countdowns: u64 = self.sequences.iter().map(|s| u64::from(s[0])).sum();
        countdowns + self.last_shot_index() as u64
    }
}

impl Default for ShotPlan {
    fn default() -> Self {
        Self {
            sequences: vec![vec![3, 2, 1], vec![5, 4, 3, 2, 1], vec![5, 4, 3, 2, 1]],
        }
    }
}

impl TryFrom<Vec<Vec<u32>>> for ShotPlan {
    type Error = BoothError;

    fn try_from(value: Vec<Vec<u32>>) -> Result<Self> {
        Self::new(value)
    }
}

impl From<ShotPlan> for Vec<Vec<u32>> {
    fn from(value: ShotPlan) -> Self {
        value.sequences
    }
}

fn validate_sequence(shot: usize, sequence: &[u32]) -> Result<()> {
    match sequence.last() {
        None => {
            return Err(BoothError::InvalidPlan(format!("sequence {shot} is empty")));
        }
        Some(&last) if last != 1 => {
            return Err(BoothError::InvalidPlan(format!(
                "sequence {shot} must end at 1, ends at {last}"
            )));
        }
        Some(_) => {}
    }

    if sequence.windows(2).any(|pair| pair[0] <= pair[1]) {
        return Err(BoothError::InvalidPlan(format!(
            "sequence {shot} is not strictly decreasing: {sequence:?}"
        )));
    }

    Ok(())
}
