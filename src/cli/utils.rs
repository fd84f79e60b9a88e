//! Utility functions for CLI operations.

use crate::pq::PqSigner;
use crate::Result;
use std::fs;
use std::io::{Read, Write};
use std::path::Path;

/// Read file contents
pub fn read_file(path: &Path) -> Result<Vec<u8>> {
    let mut file = fs::File::open(path)?;
    let mut contents = Vec::new();
    file.read_to_end(&mut contents)?;
    Ok(contents)
}

/// Read file contents as text
pub fn read_text_file(path: &Path) -> Result<String> {
    Ok(fs::read_to_string(path)?)
}

/// Write file contents
pub fn write_file(path: &Path, contents: &[u8]) -> Result<()> {
    let mut file = fs::File::create(path)?;
    file.write_all(contents)?;
    Ok(())
}

/// Load a signer from its armored key files
pub fn load_signer(public_file: &Path, secret_file: &Path) -> Result<PqSigner> {
    let public_armor = read_text_file(public_file)?;
    let secret_armor = read_text_file(secret_file)?;
    PqSigner::from_armored(&public_armor, &secret_armor)
}
