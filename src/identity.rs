//! Display name resolution.
//!
//! The name is read once from local storage. On first run the view asks for
//! one through a dialog pre-filled with a random `Anonymous-<n>` fallback;
//! whatever gets adopted is stored and never asked for again.

use anyhow::Result;
use rand::Rng;

use crate::storage::LocalStorage;

/// Storage key holding the adopted display name.
pub const USER_NAME_KEY: &str = "userName";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identity {
    Known(String),
    Unknown { fallback: String },
}

pub fn resolve(storage: &LocalStorage) -> Identity {
    match storage.get_item(USER_NAME_KEY) {
        Some(name) if !name.is_empty() => Identity::Known(name.to_string()),
        _ => Identity::Unknown {
            fallback: random_fallback(&mut rand::rng()),
        },
    }
}

pub fn random_fallback<R: Rng + ?Sized>(rng: &mut R) -> String {
    format!("Anonymous-{}", rng.random_range(1..=100))
}

/// The answered name, or the fallback when the dialog was dismissed or left empty.
pub fn choose(answer: Option<&str>, fallback: &str) -> String {
    match answer {
        Some(answer) if !answer.is_empty() => answer.to_string(),
        _ => fallback.to_string(),
    }
}

/// Choose a name and persist it.
pub fn adopt(storage: &mut LocalStorage, answer: Option<&str>, fallback: &str) -> Result<String> {
    let name = choose(answer, fallback);
    storage.set_item(USER_NAME_KEY, &name)?;
    Ok(name)
}
