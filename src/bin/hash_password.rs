//! CLI tool to hash a password for the credential file.
//!
//! Usage: `cargo run --bin hash-password -- <password>`
//!
//! Prints an Argon2id PHC string suitable for the `password_hash` field of
//! an entry in `users.json`.

use anyhow::{bail, Result};

use timekeeper::services::hash_password;

fn main() -> Result<()> {
    let mut args = std::env::args().skip(1);
    let password = match (args.next(), args.next()) {
        (Some(password), None) if !password.is_empty() => password,
        _ => bail!("usage: hash-password <password>"),
    };

    println!("{}", hash_password(&password)?);
    Ok(())
}
