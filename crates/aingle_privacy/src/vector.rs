//! Scalar and point vector arithmetic
//!
//! Element-wise operations run as rayon data-parallel maps; each call joins
//! before returning, so protocol rounds stay strictly sequential.

use curve25519_dalek::{ristretto::RistrettoPoint, scalar::Scalar, traits::MultiscalarMul};
use rayon::prelude::*;

use crate::error::{PrivacyError, Result};

fn check_lengths(a: usize, b: usize) -> Result<()> {
    if a != b {
        return Err(PrivacyError::InvalidInput(format!(
            "vector length mismatch: {} != {}",
            a, b
        )));
    }
    Ok(())
}

/// Round `m` up to the next power of two (`pad(0) = 1`)
pub fn pad(m: usize) -> usize {
    m.max(1).next_power_of_two()
}

/// `[1, base, base^2, ..., base^(n-1)]`
pub fn power_vector(base: &Scalar, n: usize) -> Vec<Scalar> {
    let mut powers = Vec::with_capacity(n);
    let mut current = Scalar::ONE;
    for _ in 0..n {
        powers.push(current);
        current *= base;
    }
    powers
}

/// `<1, base^n> = 1 + base + ... + base^(n-1)`
pub fn sum_of_powers(base: &Scalar, n: usize) -> Scalar {
    power_vector(base, n).iter().sum()
}

/// `<a, b>`
pub fn inner_product(a: &[Scalar], b: &[Scalar]) -> Result<Scalar> {
    check_lengths(a.len(), b.len())?;
    Ok(a.par_iter().zip(b.par_iter()).map(|(x, y)| x * y).sum())
}

/// `a ∘ b`
pub fn hadamard(a: &[Scalar], b: &[Scalar]) -> Result<Vec<Scalar>> {
    check_lengths(a.len(), b.len())?;
    Ok(a.par_iter().zip(b.par_iter()).map(|(x, y)| x * y).collect())
}

/// `a + b`
pub fn add_vectors(a: &[Scalar], b: &[Scalar]) -> Result<Vec<Scalar>> {
    check_lengths(a.len(), b.len())?;
    Ok(a.par_iter().zip(b.par_iter()).map(|(x, y)| x + y).collect())
}

/// `a - b`
pub fn sub_vectors(a: &[Scalar], b: &[Scalar]) -> Result<Vec<Scalar>> {
    check_lengths(a.len(), b.len())?;
    Ok(a.par_iter().zip(b.par_iter()).map(|(x, y)| x - y).collect())
}

/// `s * a`
pub fn scale_vector(a: &[Scalar], s: &Scalar) -> Vec<Scalar> {
    a.par_iter().map(|x| x * s).collect()
}

/// `a + s*1`
pub fn add_scalar(a: &[Scalar], s: &Scalar) -> Vec<Scalar> {
    a.par_iter().map(|x| x + s).collect()
}

/// Little-endian bit decomposition of `value` into `n` scalars
pub fn to_bits(value: u64, n: usize) -> Vec<Scalar> {
    (0..n)
        .map(|i| {
            if i < 64 && (value >> i) & 1 == 1 {
                Scalar::ONE
            } else {
                Scalar::ZERO
            }
        })
        .collect()
}

/// Bit `j` of `i`
pub fn bit(i: usize, j: usize) -> bool {
    (i >> j) & 1 == 1
}

/// `points_i * scalars_i` for each `i`
pub fn scale_points(points: &[RistrettoPoint], scalars: &[Scalar]) -> Result<Vec<RistrettoPoint>> {
    check_lengths(points.len(), scalars.len())?;
    Ok(points
        .par_iter()
        .zip(scalars.par_iter())
        .map(|(p, s)| p * s)
        .collect())
}

/// `lo_i * s_lo + hi_i * s_hi` for each `i`
pub fn fold_scalars(lo: &[Scalar], hi: &[Scalar], s_lo: &Scalar, s_hi: &Scalar) -> Result<Vec<Scalar>> {
    check_lengths(lo.len(), hi.len())?;
    Ok(lo
        .par_iter()
        .zip(hi.par_iter())
        .map(|(l, h)| l * s_lo + h * s_hi)
        .collect())
}

/// `lo_i * s_lo + hi_i * s_hi` for each `i`, over points
pub fn fold_points(
    lo: &[RistrettoPoint],
    hi: &[RistrettoPoint],
    s_lo: &Scalar,
    s_hi: &Scalar,
) -> Result<Vec<RistrettoPoint>> {
    check_lengths(lo.len(), hi.len())?;
    Ok(lo
        .par_iter()
        .zip(hi.par_iter())
        .map(|(l, h)| RistrettoPoint::multiscalar_mul([*s_lo, *s_hi], [*l, *h]))
        .collect())
}
