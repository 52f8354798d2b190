//! Secret word with per-position reveal flags.

/// Symbol shown for a position that has not been guessed yet.
pub const PLACEHOLDER: char = '_';

/// Case-insensitive character comparison.
pub fn same_letter(a: char, b: char) -> bool {
    a == b || a.to_lowercase().eq(b.to_lowercase())
}

/// The secret word together with which of its positions are visible.
///
/// Both vectors are built together and never resized, so the mask is always
/// exactly as long as the secret.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevealedMask {
    secret: Vec<char>,
    revealed: Vec<bool>,
}

impl RevealedMask {
    /// Hides every position except spaces.
    pub fn new(secret: &str) -> Self {
        let secret: Vec<char> = secret.chars().collect();
        let revealed = secret.iter().map(|c| *c == ' ').collect();
        Self { secret, revealed }
    }

    /// Whether `ch` already shows somewhere in the mask.
    pub fn is_revealed(&self, ch: char) -> bool {
        self.secret
            .iter()
            .zip(&self.revealed)
            .any(|(c, shown)| *shown && same_letter(*c, ch))
    }

    /// Reveals every hidden position matching `ch` and returns how many
    /// positions changed.
    pub fn reveal(&mut self, ch: char) -> usize {
        let mut count = 0;
        for (c, shown) in self.secret.iter().zip(self.revealed.iter_mut()) {
            if !*shown && same_letter(*c, ch) {
                *shown = true;
                count += 1;
            }
        }
        count
    }

    /// Whether every position is visible.
    pub fn is_complete(&self) -> bool {
        self.revealed.iter().all(|shown| *shown)
    }

    /// The mask as players see it.
    pub fn render(&self) -> String {
        self.secret
            .iter()
            .zip(&self.revealed)
            .map(|(c, shown)| if *shown { *c } else { PLACEHOLDER })
            .collect()
    }

    /// The full secret.
    pub fn secret(&self) -> String {
        self.secret.iter().collect()
    }

    /// Number of positions.
    pub fn len(&self) -> usize {
        self.secret.len()
    }

    /// Whether the secret has no positions.
    pub fn is_empty(&self) -> bool {
        self.secret.is_empty()
    }
}
