use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use safefolder_crypto::{KdfParams, decrypt_file, encrypt_file};

mod auth;

#[derive(Debug, Parser)]
#[command(name = "sfcrypt")]
#[command(
    version,
    about = "Password-based file encryption for SafeFolder containers."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Encrypts a file into a SafeFolder container
    #[command(arg_required_else_help = true)]
    Encrypt {
        input: PathBuf,
        output: PathBuf,

        /// PBKDF2 iteration count (default: 310000)
        #[arg(long)]
        iterations: Option<u32>,
    },

    /// Decrypts a SafeFolder container
    #[command(arg_required_else_help = true)]
    Decrypt { input: PathBuf, output: PathBuf },
}

fn main() -> Result<()> {
    let args = Cli::parse();

    match args.command {
        Commands::Encrypt {
            input,
            output,
            iterations,
        } => {
            let kdf = match iterations {
                Some(n) => KdfParams::new(n)?,
                None => KdfParams::default(),
            };
            let password = auth::read_new_password_with_confirmation()?;
            encrypt_file(&input, &output, password.as_bytes(), kdf)
                .context("encryption failed")?;
            println!("encrypted to {}", output.display());
        }
        Commands::Decrypt { input, output } => {
            let password = auth::read_password()?;
            decrypt_file(&input, &output, password.as_bytes()).context("decryption failed")?;
            println!("decrypted to {}", output.display());
        }
    }

    Ok(())
}
