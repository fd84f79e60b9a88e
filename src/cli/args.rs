//! Command-line argument parsing for PQMail.

use crate::pq::PqAlgorithm;
use crate::Result;
use std::env;
use std::path::PathBuf;
use std::process;

/// Command-line interface commands
#[derive(Debug)]
pub enum Command {
    Keygen {
        algorithm: PqAlgorithm,
        public_file: PathBuf,
        secret_file: PathBuf,
    },
    VerifyKeys {
        public_file: PathBuf,
        secret_file: PathBuf,
    },
    Sign {
        public_file: PathBuf,
        secret_file: PathBuf,
        input_file: PathBuf,
        signature_file: PathBuf,
    },
    Verify {
        public_file: PathBuf,
        input_file: PathBuf,
        signature_file: PathBuf,
    },
    Algorithms,
}

/// Parse command line arguments into a Command
pub fn parse_args() -> Result<Command> {
    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        print_usage();
        process::exit(1);
    }

    match args[1].as_str() {
        "keygen" => {
            if args.len() < 5 {
                eprintln!("Error: keygen requires algorithm, public key file, and secret key file");
                eprintln!("Usage: pqmail keygen <algorithm> <public_out> <secret_out>");
                process::exit(1);
            }

            let algorithm = parse_algorithm(&args[2]);

            Ok(Command::Keygen {
                algorithm,
                public_file: PathBuf::from(&args[3]),
                secret_file: PathBuf::from(&args[4]),
            })
        }

        "verify-keys" => {
            if args.len() < 4 {
                eprintln!("Error: verify-keys requires public key file and secret key file");
                process::exit(1);
            }
            Ok(Command::VerifyKeys {
                public_file: PathBuf::from(&args[2]),
                secret_file: PathBuf::from(&args[3]),
            })
        }

        "sign" => {
            if args.len() < 6 {
                eprintln!(
                    "Error: sign requires public key file, secret key file, input file, and signature file"
                );
                process::exit(1);
            }
            Ok(Command::Sign {
                public_file: PathBuf::from(&args[2]),
                secret_file: PathBuf::from(&args[3]),
                input_file: PathBuf::from(&args[4]),
                signature_file: PathBuf::from(&args[5]),
            })
        }

        "verify" => {
            if args.len() < 5 {
                eprintln!("Error: verify requires public key file, input file, and signature file");
                process::exit(1);
            }
            Ok(Command::Verify {
                public_file: PathBuf::from(&args[2]),
                input_file: PathBuf::from(&args[3]),
                signature_file: PathBuf::from(&args[4]),
            })
        }

        "algorithms" => Ok(Command::Algorithms),

        _ => {
            eprintln!("Error: Unknown command '{}'", args[1]);
            print_usage();
            process::exit(1);
        }
    }
}

fn parse_algorithm(name: &str) -> PqAlgorithm {
    match PqAlgorithm::from_name(name) {
        Some(algorithm) => algorithm,
        None => {
            eprintln!("Error: Unsupported algorithm '{}'", name);
            eprintln!("Run 'pqmail algorithms' for the supported list");
            process::exit(1);
        }
    }
}

/// Print usage information
pub fn print_usage() {
    println!("PQMail - Post-Quantum Protected Message Building");
    println!("================================================");
    println!();
    println!("Usage: pqmail <command> [args...]");
    println!();
    println!("Commands:");
    println!("  keygen <algorithm> <public_out> <secret_out>   Generate a new signing key pair");
    println!("  verify-keys <public> <secret>                  Check that stored key material matches");
    println!("  sign <public> <secret> <input> <signature>     Sign a file, writing an armored signature");
    println!("  verify <public> <input> <signature>            Verify an armored signature");
    println!("  algorithms                                     List supported signature algorithms");
    println!();
    println!("Examples:");
    println!("  pqmail keygen dilithium5 public_key.asc secret_key.asc");
    println!("  pqmail keygen falcon-1024 public_key.asc secret_key.asc");
    println!("  pqmail sign public_key.asc secret_key.asc message.eml signature.asc");
    println!("  pqmail verify public_key.asc message.eml signature.asc");
}
