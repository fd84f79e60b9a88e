//! Command-line interface for PQMail.
//!
//! This module provides a small CLI around the post-quantum signature
//! layer: key generation, key consistency checks, detached signing, and
//! verification of armored signatures.

pub mod args;
pub mod commands;
pub mod utils;

use crate::Result;
use std::process;

pub use args::Command;
pub use commands::*;
pub use utils::*;

/// Main entry point for the CLI application
pub fn run() -> Result<()> {
    // Parse command line arguments
    let command = match args::parse_args() {
        Ok(cmd) => cmd,
        Err(e) => {
            eprintln!("Error parsing arguments: {}", e);
            process::exit(1);
        }
    };

    // Execute command
    let result = match command {
        Command::Keygen {
            algorithm,
            public_file,
            secret_file,
        } => commands::keygen(algorithm, &public_file, &secret_file),
        Command::VerifyKeys {
            public_file,
            secret_file,
        } => commands::verify_keys(&public_file, &secret_file),
        Command::Sign {
            public_file,
            secret_file,
            input_file,
            signature_file,
        } => commands::sign(&public_file, &secret_file, &input_file, &signature_file),
        Command::Verify {
            public_file,
            input_file,
            signature_file,
        } => commands::verify(&public_file, &input_file, &signature_file),
        Command::Algorithms => commands::algorithms(),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        process::exit(1);
    }

    Ok(())
}
