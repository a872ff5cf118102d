//! Key-pair generation for the connection cipher.
//!
//! A [`KeyPair`] is created once per connection on each side, lives exactly as
//! long as the connection, and is never persisted or reused. The public half
//! (`e`, `n`) is sent to the peer during the handshake; the private exponent
//! never leaves this module's owner.
//!
//! Primes are drawn with a Miller–Rabin probabilistic test. The public
//! exponent is fixed at 65537; in the rare case it shares a factor with
//! `φ(n)`, the primes are simply redrawn.

use num_bigint::{BigInt, BigUint, RandBigInt};
use num_traits::{One, Zero};
use rand::Rng;
use thiserror::Error;

/// Smallest accepted modulus size in bits.
///
/// The line codec encrypts one Unicode scalar value (at most 21 bits) per
/// block, so the modulus must comfortably exceed `char::MAX`. 64 bits is the
/// floor; real deployments use the configured default (512).
pub const MIN_KEY_BITS: u64 = 64;

/// Fixed public exponent (the Fermat prime F4).
const PUBLIC_EXPONENT: u32 = 65_537;

/// Miller–Rabin rounds per prime candidate.
const MILLER_RABIN_ROUNDS: u32 = 32;

/// Small primes used for quick trial division before Miller–Rabin.
const SMALL_PRIMES: [u32; 12] = [2, 3, 5, 7, 11, 13, 17, 19, 23, 29, 31, 37];

/// Error type for key generation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum KeyError {
    /// The requested modulus size is below [`MIN_KEY_BITS`].
    #[error("key size of {0} bits is too small; at least {MIN_KEY_BITS} bits are required")]
    KeySizeTooSmall(u64),
}

/// The shareable half of a key pair: `(e, n)`.
///
/// A public key is only ever used to *encrypt* data destined for its owner;
/// decryption always happens on the owning side with the full [`KeyPair`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicKey {
    pub exponent: BigUint,
    pub modulus: BigUint,
}

/// A public key plus the matching private exponent.
///
/// The private exponent is deliberately not public: only the decrypt path in
/// [`crate::cipher::transform`] can reach it.
#[derive(Debug, Clone)]
pub struct KeyPair {
    public: PublicKey,
    private_exponent: BigUint,
}

impl KeyPair {
    /// Generates a fresh key pair with a modulus of roughly `bits` bits.
    ///
    /// # Errors
    ///
    /// Returns [`KeyError::KeySizeTooSmall`] when `bits` is below
    /// [`MIN_KEY_BITS`].
    pub fn generate(bits: u64) -> Result<KeyPair, KeyError> {
        if bits < MIN_KEY_BITS {
            return Err(KeyError::KeySizeTooSmall(bits));
        }

        let mut rng = rand::thread_rng();
        let e = BigUint::from(PUBLIC_EXPONENT);

        loop {
            let p = generate_prime(bits / 2, &mut rng);
            let q = generate_prime(bits - bits / 2, &mut rng);
            if p == q {
                continue;
            }

            let modulus = &p * &q;
            let phi = (&p - 1u32) * (&q - 1u32);

            // `e` must be invertible mod φ(n); redraw the primes otherwise.
            if let Some(d) = mod_inverse(&e, &phi) {
                return Ok(KeyPair {
                    public: PublicKey {
                        exponent: e,
                        modulus,
                    },
                    private_exponent: d,
                });
            }
        }
    }

    /// The shareable public half.
    pub fn public(&self) -> &PublicKey {
        &self.public
    }

    pub(crate) fn private_exponent(&self) -> &BigUint {
        &self.private_exponent
    }
}

/// Draws a random probable prime with exactly `bits` bits.
fn generate_prime<R: Rng>(bits: u64, rng: &mut R) -> BigUint {
    loop {
        let mut candidate = rng.gen_biguint(bits);
        // Force the top bit (full bit length) and the bottom bit (odd).
        candidate.set_bit(bits - 1, true);
        candidate.set_bit(0, true);
        if is_probably_prime(&candidate, MILLER_RABIN_ROUNDS, rng) {
            return candidate;
        }
    }
}

/// Miller–Rabin probabilistic primality test.
///
/// With 32 random witnesses the error probability is below 4^-32, which is
/// far beyond what the rest of this cipher can claim anyway.
fn is_probably_prime<R: Rng>(n: &BigUint, rounds: u32, rng: &mut R) -> bool {
    let one = BigUint::one();
    let two = BigUint::from(2u32);

    if *n < two {
        return false;
    }
    for small in SMALL_PRIMES {
        let small = BigUint::from(small);
        if *n == small {
            return true;
        }
        if (n % &small).is_zero() {
            return false;
        }
    }

    // Write n − 1 as d · 2^s with d odd.
    let n_minus_one = n - &one;
    let s = n_minus_one.trailing_zeros().unwrap_or(0);
    let d = &n_minus_one >> s;

    'witness: for _ in 0..rounds {
        let a = rng.gen_biguint_range(&two, &n_minus_one);
        let mut x = a.modpow(&d, n);
        if x == one || x == n_minus_one {
            continue;
        }
        for _ in 1..s {
            x = x.modpow(&two, n);
            if x == n_minus_one {
                continue 'witness;
            }
        }
        return false;
    }
    true
}

/// Computes `value⁻¹ mod modulus` via the extended Euclidean algorithm.
///
/// Returns `None` when `gcd(value, modulus) != 1`, i.e. no inverse exists.
fn mod_inverse(value: &BigUint, modulus: &BigUint) -> Option<BigUint> {
    let m = BigInt::from(modulus.clone());

    let mut r0 = m.clone();
    let mut r1 = BigInt::from(value.clone());
    let mut t0 = BigInt::zero();
    let mut t1 = BigInt::one();

    while !r1.is_zero() {
        let q = &r0 / &r1;
        let r2 = &r0 - &q * &r1;
        r0 = std::mem::replace(&mut r1, r2);
        let t2 = &t0 - &q * &t1;
        t0 = std::mem::replace(&mut t1, t2);
    }

    if !r0.is_one() {
        return None;
    }

    // Normalise into [0, m).
    let inverse = ((t0 % &m) + &m) % &m;
    inverse.to_biguint()
}

// ── Tests ─────────────────────────────────────────────────────────────────────
