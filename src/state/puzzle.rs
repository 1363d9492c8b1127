//! Puzzle model and the randomized reduction that derives each puzzle's target.

use rand::{Rng, SeedableRng, rngs::StdRng, seq::SliceRandom};

use super::{
    code::{ID_ALPHABET, random_code},
    expression::Operator,
};

/// Number of digits handed out per puzzle.
pub const DIGIT_COUNT: usize = 5;
/// Largest digit that can be drawn (inclusive).
pub const MAX_DIGIT: u8 = 8;
/// Length of generated puzzle identifiers.
const PUZZLE_ID_LENGTH: usize = 5;
/// Random operator draws tried per pair before falling back to addition.
const MAX_OPERATOR_ATTEMPTS: usize = 16;

/// Operators used when deriving targets.
const OPERATORS: [Operator; 4] = [
    Operator::Add,
    Operator::Subtract,
    Operator::Multiply,
    Operator::Divide,
];

/// One round's digits and the value players must reach.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Puzzle {
    /// Opaque identifier.
    pub id: String,
    /// Drawn digits, treated as a multiset during validation.
    pub digits: [u8; DIGIT_COUNT],
    /// Value obtained by reducing the digits.
    pub target: u64,
}

impl Puzzle {
    /// Whether `value` appears among the puzzle digits.
    pub fn has_digit(&self, value: f64) -> bool {
        self.digits.iter().any(|&digit| f64::from(digit) == value)
    }
}

/// Random puzzle source owning its RNG.
#[derive(Debug, Clone)]
pub struct PuzzleGenerator {
    rng: StdRng,
}

impl Default for PuzzleGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl PuzzleGenerator {
    /// Generator seeded from the operating system.
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_os_rng(),
        }
    }

    /// Deterministic generator, used by tests.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Produce a fresh puzzle.
    pub fn generate(&mut self) -> Puzzle {
        let mut digits = [0u8; DIGIT_COUNT];
        for digit in digits.iter_mut() {
            *digit = self.rng.random_range(0..=MAX_DIGIT);
        }

        Puzzle {
            id: random_code(&mut self.rng, ID_ALPHABET, PUZZLE_ID_LENGTH),
            target: self.reduce(&digits),
            digits,
        }
    }

    /// Produce `count` puzzles, in the order they will be played.
    pub fn sequence(&mut self, count: usize) -> Vec<Puzzle> {
        (0..count).map(|_| self.generate()).collect()
    }

    /// Collapse the digits into a single value: repeatedly combine the first two values with a
    /// random operator whose result stays a non-negative integer, append the result and shuffle.
    fn reduce(&mut self, digits: &[u8]) -> u64 {
        let mut pool: Vec<u64> = digits.iter().map(|&digit| u64::from(digit)).collect();

        while pool.len() > 1 {
            let lhs = pool.remove(0);
            let rhs = pool.remove(0);
            pool.push(self.combine(lhs, rhs));
            pool.shuffle(&mut self.rng);
        }

        pool.first().copied().unwrap_or_default()
    }

    fn combine(&mut self, lhs: u64, rhs: u64) -> u64 {
        for _ in 0..MAX_OPERATOR_ATTEMPTS {
            let operator = OPERATORS[self.rng.random_range(0..OPERATORS.len())];
            if let Some(value) = apply_integral(operator, lhs, rhs) {
                return value;
            }
        }
        lhs + rhs
    }
}

/// Apply `operator` when the result is a finite non-negative integer.
fn apply_integral(operator: Operator, lhs: u64, rhs: u64) -> Option<u64> {
    match operator {
        Operator::Add => lhs.checked_add(rhs),
        Operator::Subtract => lhs.checked_sub(rhs),
        Operator::Multiply => lhs.checked_mul(rhs),
        Operator::Divide => (rhs != 0 && lhs % rhs == 0).then(|| lhs / rhs),
        Operator::Power | Operator::Modulo => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Exhaustively check whether `values` can be collapsed into `target` with pairwise
    /// integral combinations.
    fn reachable(values: &[u64], target: u64) -> bool {
        if values.len() == 1 {
            return values[0] == target;
        }
        for i in 0..values.len() {
            for j in 0..values.len() {
                if i == j {
                    continue;
                }
                for operator in OPERATORS {
                    let Some(value) = apply_integral(operator, values[i], values[j]) else {
                        continue;
                    };
                    let mut rest: Vec<u64> = values
                        .iter()
                        .enumerate()
                        .filter(|(k, _)| *k != i && *k != j)
                        .map(|(_, v)| *v)
                        .collect();
                    rest.push(value);
                    if reachable(&rest, target) {
                        return true;
                    }
                }
            }
        }
        false
    }

    #[test]
    fn digits_stay_within_range() {
        let mut generator = PuzzleGenerator::seeded(7);
        for _ in 0..200 {
            let puzzle = generator.generate();
            assert!(puzzle.digits.iter().all(|&d| d <= MAX_DIGIT));
            assert_eq!(puzzle.id.len(), PUZZLE_ID_LENGTH);
        }
    }

    #[test]
    fn targets_are_reachable_from_the_drawn_digits() {
        let mut generator = PuzzleGenerator::seeded(42);
        for _ in 0..50 {
            let puzzle = generator.generate();
            let values: Vec<u64> = puzzle.digits.iter().map(|&d| u64::from(d)).collect();
            assert!(
                reachable(&values, puzzle.target),
                "target {} not reachable from {:?}",
                puzzle.target,
                puzzle.digits
            );
        }
    }

    #[test]
    fn sequence_has_requested_length() {
        let mut generator = PuzzleGenerator::seeded(1);
        assert_eq!(generator.sequence(3).len(), 3);
        assert!(generator.sequence(0).is_empty());
    }

    #[test]
    fn seeded_generators_are_deterministic() {
        let mut left = PuzzleGenerator::seeded(99);
        let mut right = PuzzleGenerator::seeded(99);
        assert_eq!(left.sequence(4), right.sequence(4));
    }

    #[test]
    fn integral_application_rejects_fractions_and_negatives() {
        assert_eq!(apply_integral(Operator::Divide, 7, 2), None);
        assert_eq!(apply_integral(Operator::Divide, 8, 0), None);
        assert_eq!(apply_integral(Operator::Divide, 0, 4), Some(0));
        assert_eq!(apply_integral(Operator::Subtract, 3, 5), None);
        assert_eq!(apply_integral(Operator::Multiply, 6, 7), Some(42));
    }

    #[test]
    fn has_digit_matches_exact_values_only() {
        let puzzle = Puzzle {
            id: "abcde".into(),
            digits: [1, 5, 5, 0, 8],
            target: 10,
        };
        assert!(puzzle.has_digit(5.0));
        assert!(puzzle.has_digit(0.0));
        assert!(!puzzle.has_digit(2.0));
        assert!(!puzzle.has_digit(5.5));
    }
}
