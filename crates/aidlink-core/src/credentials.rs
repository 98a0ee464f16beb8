use anyhow::{Result, anyhow};
use argon2::{
    Algorithm, Argon2, Params, PasswordHash, PasswordHasher, PasswordVerifier, Version,
    password_hash::{SaltString, rand_core::OsRng},
};
use rand::{Rng, distr::Alphanumeric};
use uuid::Uuid;

/// One-way credential hashing collaborator.
pub trait CredentialHasher: Send + Sync {
    fn hash(&self, plaintext: &str) -> Result<String>;
}

/// Argon2id with a fresh random salt per hash.
pub struct Argon2Hasher {
    argon2: Argon2<'static>,
}

impl Argon2Hasher {
    pub fn new() -> Self {
        Self {
            argon2: Argon2::default(),
        }
    }

    /// Custom cost parameters (memory KiB, iterations, lanes).
    pub fn with_params(m_cost: u32, t_cost: u32, p_cost: u32) -> Result<Self> {
        let params = Params::new(m_cost, t_cost, p_cost, None)
            .map_err(|e| anyhow!("Invalid Argon2 params: {}", e))?;
        Ok(Self {
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
        })
    }
}

impl Default for Argon2Hasher {
    fn default() -> Self {
        Self::new()
    }
}

impl CredentialHasher for Argon2Hasher {
    fn hash(&self, plaintext: &str) -> Result<String> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = self
            .argon2
            .hash_password(plaintext.as_bytes(), &salt)
            .map_err(|e| anyhow!("Password hashing failed: {}", e))?;
        Ok(hash.to_string())
    }
}

/// Check a plaintext against a stored PHC hash string.
pub fn verify_password(stored_hash: &str, plaintext: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(stored_hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(plaintext.as_bytes(), &parsed)
        .is_ok()
}

/// How one-time passwords for newly approved beneficiaries are built.
///
/// The readable prefix lets support staff recognise whose credential it is.
/// With `hardened` set a random tail is appended so the password cannot be
/// derived from an organization's name or a user id alone.
#[derive(Debug, Clone, Copy)]
pub struct CredentialPolicy {
    pub hardened: bool,
}

impl Default for CredentialPolicy {
    fn default() -> Self {
        Self { hardened: true }
    }
}

impl CredentialPolicy {
    /// `{OrgNameAlphanumericOnly}@{year}`.
    pub fn organization_password(&self, org_name: &str, year: i32) -> String {
        let mut compact: String = org_name.chars().filter(|c| c.is_alphanumeric()).collect();
        if compact.is_empty() {
            compact.push_str("Organization");
        }
        self.finish(format!("{compact}@{year}"))
    }

    /// `{LAST6_OF_USER_ID}@{4 random digits}`.
    pub fn individual_password(&self, user_id: Uuid) -> String {
        let id = user_id.simple().to_string();
        let tail = id[id.len() - 6..].to_uppercase();
        let suffix: u16 = rand::rng().random_range(1000..10000);
        self.finish(format!("{tail}@{suffix}"))
    }

    fn finish(&self, base: String) -> String {
        if !self.hardened {
            return base;
        }
        let tail: String = rand::rng()
            .sample_iter(&Alphanumeric)
            .take(4)
            .map(char::from)
            .collect();
        format!("{base}#{tail}")
    }
}
