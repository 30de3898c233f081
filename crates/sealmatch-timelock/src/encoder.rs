//! Puzzle encoder: seal a payload so it can only be read after solving a
//! fresh timelock puzzle.
//!
//! The puzzle secret never encrypts anything directly. It is fed through
//! HKDF-SHA256 into key material for one of two suites, and the ciphertext
//! carries a one-byte suite tag so [`open`] needs nothing besides the
//! ciphertext and the puzzle.
//!
//! ```text
//! 0x01 AES-256-GCM   : tag(1) ‖ nonce(12) ‖ aead_ct
//! 0x02 X25519 ECIES  : tag(1) ‖ ephemeral_pub(32) ‖ nonce(12) ‖ aead_ct
//! ```
//!
//! For ECIES the puzzle secret derives the recipient's X25519 private key;
//! the sealer only ever holds the matching public key and a throwaway
//! ephemeral secret.

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use hkdf::Hkdf;
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use tokio_util::sync::CancellationToken;
use x25519_dalek::{EphemeralSecret, PublicKey, StaticSecret};

use crate::error::{PuzzleError, Result};
use crate::puzzle::{self, Puzzle, PuzzleKind, PuzzleSecret, Timelock};

const NONCE_LEN: usize = 12;
const GCM_TAG_LEN: usize = 16;
const X25519_PUB_LEN: usize = 32;

const AEAD_KEY_INFO: &[u8] = b"sealmatch:puzzle-aead:v1";
const RECIPIENT_KEY_INFO: &[u8] = b"sealmatch:ecies-recipient:v1";
const ECIES_KEY_INFO: &[u8] = b"sealmatch:ecies:v1";

// ============================================================================
// Cipher suites
// ============================================================================

/// Symmetric or hybrid scheme wrapped around the puzzle secret.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CipherSuite {
    #[default]
    Aes256Gcm,
    X25519Ecies,
}

impl CipherSuite {
    /// Leading byte of every ciphertext sealed under this suite.
    #[must_use]
    pub fn tag(self) -> u8 {
        match self {
            Self::Aes256Gcm => 0x01,
            Self::X25519Ecies => 0x02,
        }
    }

    pub fn from_tag(tag: u8) -> Result<Self> {
        match tag {
            0x01 => Ok(Self::Aes256Gcm),
            0x02 => Ok(Self::X25519Ecies),
            other => Err(PuzzleError::UnknownCipherSuite(other)),
        }
    }

    /// Shortest well-formed ciphertext (empty plaintext).
    #[must_use]
    pub fn min_ciphertext_len(self) -> usize {
        match self {
            Self::Aes256Gcm => 1 + NONCE_LEN + GCM_TAG_LEN,
            Self::X25519Ecies => 1 + X25519_PUB_LEN + NONCE_LEN + GCM_TAG_LEN,
        }
    }
}

impl std::fmt::Display for CipherSuite {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Aes256Gcm => write!(f, "aes256_gcm"),
            Self::X25519Ecies => write!(f, "x25519_ecies"),
        }
    }
}

// ============================================================================
// Encoder
// ============================================================================

/// Seals payloads under freshly generated puzzles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PuzzleEncoder {
    kind: PuzzleKind,
    cipher: CipherSuite,
    modulus_bits: usize,
}

impl Default for PuzzleEncoder {
    fn default() -> Self {
        Self::new(
            PuzzleKind::default(),
            CipherSuite::default(),
            puzzle::DEFAULT_MODULUS_BITS,
        )
    }
}

impl PuzzleEncoder {
    #[must_use]
    pub fn new(kind: PuzzleKind, cipher: CipherSuite, modulus_bits: usize) -> Self {
        Self {
            kind,
            cipher,
            modulus_bits,
        }
    }

    #[must_use]
    pub fn kind(&self) -> PuzzleKind {
        self.kind
    }

    #[must_use]
    pub fn cipher(&self) -> CipherSuite {
        self.cipher
    }

    /// Create a puzzle of `difficulty` and encrypt `plaintext` under its secret.
    ///
    /// Every call uses a new puzzle, so the secret of one ciphertext says
    /// nothing about any other.
    pub fn seal(&self, difficulty: u64, plaintext: &[u8]) -> Result<(Vec<u8>, Puzzle)> {
        let (puzzle, secret) = puzzle::setup(self.kind, difficulty, self.modulus_bits)?;
        let ciphertext = match self.cipher {
            CipherSuite::Aes256Gcm => seal_aead(&secret, plaintext)?,
            CipherSuite::X25519Ecies => seal_ecies(&secret, plaintext)?,
        };
        Ok((ciphertext, puzzle))
    }
}

/// Solve `puzzle` and decrypt `ciphertext`.
pub fn open(ciphertext: &[u8], puzzle: &Puzzle) -> Result<Vec<u8>> {
    open_cancellable(ciphertext, puzzle, &CancellationToken::new())
}

/// [`open`], aborting the solve when `cancel` fires.
///
/// Framing is checked before any sequential work starts.
pub fn open_cancellable(
    ciphertext: &[u8],
    puzzle: &Puzzle,
    cancel: &CancellationToken,
) -> Result<Vec<u8>> {
    let suite = check_framing(ciphertext)?;
    let secret = puzzle.solve_cancellable(cancel)?;
    open_with_secret(suite, ciphertext, &secret)
}

fn check_framing(ciphertext: &[u8]) -> Result<CipherSuite> {
    let Some(&tag) = ciphertext.first() else {
        return Err(PuzzleError::CiphertextTooShort { len: 0, min: 1 });
    };
    let suite = CipherSuite::from_tag(tag)?;
    let min = suite.min_ciphertext_len();
    if ciphertext.len() < min {
        return Err(PuzzleError::CiphertextTooShort {
            len: ciphertext.len(),
            min,
        });
    }
    Ok(suite)
}

fn open_with_secret(
    suite: CipherSuite,
    ciphertext: &[u8],
    secret: &PuzzleSecret,
) -> Result<Vec<u8>> {
    match suite {
        CipherSuite::Aes256Gcm => open_aead(secret, &ciphertext[1..]),
        CipherSuite::X25519Ecies => open_ecies(secret, &ciphertext[1..]),
    }
}

// ----------------------------------------------------------------------------
// Key derivation
// ----------------------------------------------------------------------------

fn hkdf_32(salt: Option<&[u8]>, ikm: &[u8], info: &[u8]) -> Result<[u8; 32]> {
    let mut okm = [0u8; 32];
    Hkdf::<Sha256>::new(salt, ikm)
        .expand(info, &mut okm)
        .map_err(|e| PuzzleError::KeyDerivation {
            reason: e.to_string(),
        })?;
    Ok(okm)
}

fn recipient_secret(secret: &PuzzleSecret) -> Result<StaticSecret> {
    Ok(StaticSecret::from(hkdf_32(
        None,
        secret.as_bytes(),
        RECIPIENT_KEY_INFO,
    )?))
}

fn ecies_key(shared: &[u8], ephemeral: &PublicKey, recipient: &PublicKey) -> Result<[u8; 32]> {
    let mut salt = [0u8; 2 * X25519_PUB_LEN];
    salt[..X25519_PUB_LEN].copy_from_slice(ephemeral.as_bytes());
    salt[X25519_PUB_LEN..].copy_from_slice(recipient.as_bytes());
    hkdf_32(Some(&salt), shared, ECIES_KEY_INFO)
}

// ----------------------------------------------------------------------------
// AEAD core
// ----------------------------------------------------------------------------

/// Returns `nonce ‖ ct`.
fn aead_encrypt(key: &[u8; 32], plaintext: &[u8]) -> Result<Vec<u8>> {
    let cipher = Aes256Gcm::new_from_slice(key).map_err(|_| PuzzleError::Encryption)?;
    let nonce_bytes: [u8; NONCE_LEN] = rand::random();
    let nonce = Nonce::from_slice(&nonce_bytes);
    let ct = cipher
        .encrypt(nonce, plaintext)
        .map_err(|_| PuzzleError::Encryption)?;

    let mut out = Vec::with_capacity(NONCE_LEN + ct.len());
    out.extend_from_slice(&nonce_bytes);
    out.extend_from_slice(&ct);
    Ok(out)
}

fn aead_decrypt(key: &[u8; 32], body: &[u8]) -> Result<Vec<u8>> {
    let (nonce_bytes, ct) = body.split_at(NONCE_LEN);
    let cipher = Aes256Gcm::new_from_slice(key).map_err(|_| PuzzleError::Decryption)?;
    cipher
        .decrypt(Nonce::from_slice(nonce_bytes), ct)
        .map_err(|_| PuzzleError::Decryption)
}

// ----------------------------------------------------------------------------
// Suites
// ----------------------------------------------------------------------------

fn seal_aead(secret: &PuzzleSecret, plaintext: &[u8]) -> Result<Vec<u8>> {
    let key = hkdf_32(None, secret.as_bytes(), AEAD_KEY_INFO)?;
    let body = aead_encrypt(&key, plaintext)?;
    let mut out = Vec::with_capacity(1 + body.len());
    out.push(CipherSuite::Aes256Gcm.tag());
    out.extend_from_slice(&body);
    Ok(out)
}

fn open_aead(secret: &PuzzleSecret, body: &[u8]) -> Result<Vec<u8>> {
    let key = hkdf_32(None, secret.as_bytes(), AEAD_KEY_INFO)?;
    aead_decrypt(&key, body)
}

fn seal_ecies(secret: &PuzzleSecret, plaintext: &[u8]) -> Result<Vec<u8>> {
    let recipient_pub = PublicKey::from(&recipient_secret(secret)?);
    let ephemeral = EphemeralSecret::random_from_rng(OsRng);
    let ephemeral_pub = PublicKey::from(&ephemeral);
    let shared = ephemeral.diffie_hellman(&recipient_pub);

    let key = ecies_key(shared.as_bytes(), &ephemeral_pub, &recipient_pub)?;
    let body = aead_encrypt(&key, plaintext)?;

    let mut out = Vec::with_capacity(1 + X25519_PUB_LEN + body.len());
    out.push(CipherSuite::X25519Ecies.tag());
    out.extend_from_slice(ephemeral_pub.as_bytes());
    out.extend_from_slice(&body);
    Ok(out)
}

fn open_ecies(secret: &PuzzleSecret, body: &[u8]) -> Result<Vec<u8>> {
    let (eph_bytes, rest) = body.split_at(X25519_PUB_LEN);
    let mut eph = [0u8; X25519_PUB_LEN];
    eph.copy_from_slice(eph_bytes);
    let ephemeral_pub = PublicKey::from(eph);

    let recipient = recipient_secret(secret)?;
    let recipient_pub = PublicKey::from(&recipient);
    let shared = recipient.diffie_hellman(&ephemeral_pub);

    let key = ecies_key(shared.as_bytes(), &ephemeral_pub, &recipient_pub)?;
    aead_decrypt(&key, rest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::puzzle::MIN_MODULUS_BITS;

    fn encoders() -> Vec<PuzzleEncoder> {
        let mut out = Vec::new();
        for kind in [PuzzleKind::Rsw, PuzzleKind::HashChain] {
            for cipher in [CipherSuite::Aes256Gcm, CipherSuite::X25519Ecies] {
                out.push(PuzzleEncoder::new(kind, cipher, MIN_MODULUS_BITS));
            }
        }
        out
    }

    #[test]
    fn seal_then_open_recovers_plaintext() {
        let payload = b"buy 10 BTC for 500000 USDT";
        for encoder in encoders() {
            for t in [0u64, 1, 10, 1000] {
                let (ct, puzzle) = encoder.seal(t, payload).unwrap();
                assert_eq!(ct[0], encoder.cipher().tag());
                let pt = open(&ct, &puzzle).unwrap();
                assert_eq!(pt, payload, "{encoder:?} t={t}");
            }
        }
    }

    #[test]
    fn empty_plaintext_round_trips() {
        for encoder in encoders() {
            let (ct, puzzle) = encoder.seal(2, b"").unwrap();
            assert_eq!(ct.len(), encoder.cipher().min_ciphertext_len());
            assert!(open(&ct, &puzzle).unwrap().is_empty());
        }
    }

    #[test]
    fn same_plaintext_seals_differently() {
        let encoder = PuzzleEncoder::new(PuzzleKind::HashChain, CipherSuite::Aes256Gcm, 0);
        let (a, _) = encoder.seal(5, b"same").unwrap();
        let (b, _) = encoder.seal(5, b"same").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn wrong_puzzle_fails_authentication() {
        for encoder in encoders() {
            let (ct, _) = encoder.seal(3, b"payload").unwrap();
            let (_, other) = encoder.seal(3, b"payload").unwrap();
            let err = open(&ct, &other).unwrap_err();
            assert!(matches!(err, PuzzleError::Decryption), "{encoder:?}: {err}");
        }
    }

    #[test]
    fn tampered_ciphertext_rejected() {
        let encoder = PuzzleEncoder::new(PuzzleKind::HashChain, CipherSuite::X25519Ecies, 0);
        let (mut ct, puzzle) = encoder.seal(4, b"payload").unwrap();
        let last = ct.len() - 1;
        ct[last] ^= 0x80;
        assert!(matches!(open(&ct, &puzzle), Err(PuzzleError::Decryption)));
    }

    #[test]
    fn short_ciphertext_rejected_before_solving() {
        let encoder = PuzzleEncoder::new(PuzzleKind::HashChain, CipherSuite::Aes256Gcm, 0);
        let (_, puzzle) = encoder.seal(1, b"x").unwrap();

        let err = open(&[], &puzzle).unwrap_err();
        assert!(matches!(err, PuzzleError::CiphertextTooShort { len: 0, .. }));

        let err = open(&[0x01, 0, 0, 0], &puzzle).unwrap_err();
        assert!(matches!(
            err,
            PuzzleError::CiphertextTooShort { len: 4, min: 29 }
        ));

        let err = open(&[0x02; 40], &puzzle).unwrap_err();
        assert!(matches!(
            err,
            PuzzleError::CiphertextTooShort { len: 40, min: 61 }
        ));
    }

    #[test]
    fn unknown_suite_tag_rejected() {
        let encoder = PuzzleEncoder::new(PuzzleKind::HashChain, CipherSuite::Aes256Gcm, 0);
        let (mut ct, puzzle) = encoder.seal(1, b"x").unwrap();
        ct[0] = 0x7f;
        assert!(matches!(
            open(&ct, &puzzle),
            Err(PuzzleError::UnknownCipherSuite(0x7f))
        ));
    }

    #[test]
    fn cancelled_open_returns_cancelled() {
        let encoder = PuzzleEncoder::new(PuzzleKind::HashChain, CipherSuite::Aes256Gcm, 0);
        let (ct, puzzle) = encoder.seal(100_000, b"x").unwrap();
        let token = CancellationToken::new();
        token.cancel();
        assert!(matches!(
            open_cancellable(&ct, &puzzle, &token),
            Err(PuzzleError::Cancelled { .. })
        ));
    }

    #[test]
    fn suite_tags_are_stable() {
        for suite in [CipherSuite::Aes256Gcm, CipherSuite::X25519Ecies] {
            assert_eq!(CipherSuite::from_tag(suite.tag()).unwrap(), suite);
        }
        assert_eq!(CipherSuite::Aes256Gcm.tag(), 0x01);
        assert_eq!(CipherSuite::X25519Ecies.tag(), 0x02);
    }
}
