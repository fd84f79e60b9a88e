//! Command implementations for the PQMail CLI.

use crate::{
    armor::{self, BlockKind},
    cli::utils::{load_signer, read_file, read_text_file, write_file},
    error::PqMailError,
    pq::{PqAlgorithm, PqSigner},
    Result,
};
use std::path::Path;
use std::process;
use tracing::{error, info};

/// Execute keygen command
pub fn keygen(algorithm: PqAlgorithm, public_file: &Path, secret_file: &Path) -> Result<()> {
    info!(algorithm = %algorithm, "Generating signing key pair");

    let signer = PqSigner::generate(algorithm);

    write_file(public_file, signer.export_public_key().as_bytes())?;
    write_file(secret_file, signer.export_secret_key().as_bytes())?;

    info!(
        algorithm = %algorithm,
        public_key_file = %public_file.display(),
        secret_key_file = %secret_file.display(),
        public_key_size = signer.public_key().len(),
        "✅ Generated key pair successfully"
    );

    Ok(())
}

/// Execute verify-keys command
pub fn verify_keys(public_file: &Path, secret_file: &Path) -> Result<()> {
    let signer = load_signer(public_file, secret_file)?;

    info!(algorithm = %signer.algorithm(), "Checking stored key material");

    if signer.verify_keys() {
        info!("✅ Key material is consistent");
    } else {
        error!("❌ Key material failed the signing probe");
        process::exit(1);
    }

    Ok(())
}

/// Execute sign command
pub fn sign(
    public_file: &Path,
    secret_file: &Path,
    input_file: &Path,
    signature_file: &Path,
) -> Result<()> {
    let signer = load_signer(public_file, secret_file)?;

    info!(
        file = %input_file.display(),
        algorithm = %signer.algorithm(),
        "Signing file"
    );

    let message = read_file(input_file)?;
    let signature = signer.sign(&message)?;
    let armored = armor::encode(
        BlockKind::Signature,
        signer.algorithm().name(),
        &signature,
    );

    write_file(signature_file, armored.as_bytes())?;

    info!(
        signature_file = %signature_file.display(),
        "✅ File signed and signature saved"
    );

    Ok(())
}

/// Execute verify command
pub fn verify(public_file: &Path, input_file: &Path, signature_file: &Path) -> Result<()> {
    info!(
        file = %input_file.display(),
        signature_file = %signature_file.display(),
        "Verifying signature"
    );

    let key_block = armor::decode(&read_text_file(public_file)?)?;
    if key_block.kind() != BlockKind::PublicKey {
        return Err(PqMailError::armor(format!(
            "Expected a public key block in {}",
            public_file.display()
        )));
    }
    let algorithm = key_block.algorithm().ok_or_else(|| {
        PqMailError::armor(format!(
            "Unsupported algorithm '{}' in public key block",
            key_block.algorithm_name()
        ))
    })?;

    let signature_block = armor::decode(&read_text_file(signature_file)?)?;
    if signature_block.kind() != BlockKind::Signature {
        return Err(PqMailError::armor(format!(
            "Expected a signature block in {}",
            signature_file.display()
        )));
    }

    let message = read_file(input_file)?;

    if PqSigner::verify_with_key(
        algorithm,
        &message,
        signature_block.data(),
        key_block.data(),
    ) {
        info!(algorithm = %algorithm, "✅ Signature is valid");
    } else {
        error!("❌ Signature is invalid");
        process::exit(1);
    }

    Ok(())
}

/// Execute algorithms command
pub fn algorithms() -> Result<()> {
    println!("Supported post-quantum signature algorithms:");
    println!();
    for algorithm in PqAlgorithm::ALL {
        println!(
            "  {:<30} public key {:>5} bytes",
            algorithm.name(),
            algorithm.public_key_size()
        );
    }
    Ok(())
}
