//! Collision-resistant multipart boundary generation.

use rand::rngs::OsRng;
use rand::Rng;

const BOUNDARY_CHARACTERS: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const BOUNDARY_LENGTH: usize = 30;

/// Generates multipart boundaries.
///
/// Injected into the message builder so tests can pin boundaries while
/// production use draws them from the OS entropy source.
#[derive(Debug, Clone)]
pub struct BoundaryGenerator {
    mode: Mode,
}

#[derive(Debug, Clone)]
enum Mode {
    Random,
    Fixed { label: String, counter: u32 },
}

impl Default for BoundaryGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl BoundaryGenerator {
    /// Creates a generator backed by OS randomness.
    pub fn new() -> Self {
        Self { mode: Mode::Random }
    }

    /// Creates a deterministic generator producing `----<label>-<n>`.
    pub fn fixed(label: &str) -> Self {
        Self {
            mode: Mode::Fixed {
                label: label.to_string(),
                counter: 0,
            },
        }
    }

    /// Generates the next boundary string.
    pub fn generate(&mut self) -> String {
        match &mut self.mode {
            Mode::Random => {
                let mut boundary = String::with_capacity(4 + BOUNDARY_LENGTH);
                boundary.push_str("----");
                for _ in 0..BOUNDARY_LENGTH {
                    let idx = OsRng.gen_range(0..BOUNDARY_CHARACTERS.len());
                    boundary.push(BOUNDARY_CHARACTERS[idx] as char);
                }
                boundary
            }
            Mode::Fixed { label, counter } => {
                *counter += 1;
                format!("----{}-{}", label, counter)
            }
        }
    }
}
