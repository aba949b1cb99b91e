//! Coins spent and created by a payment
//!
//! A coin commitment opens to every coin field at its own generator:
//!
//! `C = pk + value*G_value + snd*G_snd + shard*G_shard + randomness*G_rand`
//!
//! with `pk = sk*G_sk`. Fields are optional because a published input coin
//! only carries what its proof reveals.

use curve25519_dalek::{ristretto::RistrettoPoint, scalar::Scalar};
use rand::rngs::OsRng;

use crate::commitment::{GeneratorIndex, PedersenGens};
use crate::encoding::{ByteReader, ByteWriter, POINT_SIZE, SCALAR_SIZE};
use crate::error::{PrivacyError, Result};
use crate::params::PrivacyParams;
use crate::serial_number::derive_serial_number;

/// Longest info memo a coin carries
pub const MAX_INFO_SIZE: usize = 255;

/// Public key `sk*G_sk`
pub fn public_key(pc: &PedersenGens, sk: &Scalar) -> RistrettoPoint {
    pc.generator(GeneratorIndex::SecretKey) * sk
}

/// Last byte of a key's compressed encoding
pub fn last_byte(public_key: &RistrettoPoint) -> u8 {
    public_key.compress().as_bytes()[POINT_SIZE - 1]
}

/// Coin details
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Coin {
    /// Owner's public key
    pub public_key: Option<RistrettoPoint>,
    /// Commitment to all fields
    pub commitment: Option<RistrettoPoint>,
    /// Serial number derivator
    pub snd: Option<Scalar>,
    /// Serial number, known once the coin is spent
    pub serial_number: Option<RistrettoPoint>,
    /// Commitment randomness
    pub randomness: Option<Scalar>,
    /// Amount
    pub value: u64,
    /// Free-form memo
    pub info: Vec<u8>,
}

fn missing(field: &str) -> PrivacyError {
    PrivacyError::InvalidInput(format!("coin has no {}", field))
}

impl Coin {
    /// A coin owned by `public_key`, committed with the given randomness
    pub fn new(
        params: &PrivacyParams,
        public_key: RistrettoPoint,
        value: u64,
        snd: Scalar,
        randomness: Scalar,
    ) -> Self {
        let mut coin = Self {
            public_key: Some(public_key),
            snd: Some(snd),
            randomness: Some(randomness),
            value,
            ..Self::default()
        };
        let shard = params.shard_id(last_byte(&public_key));
        coin.commitment = Some(commit_coin(params.pedersen(), &public_key, value, &snd, shard, &randomness));
        coin
    }

    /// Attach an info memo of at most [`MAX_INFO_SIZE`] bytes
    pub fn with_info(mut self, info: &[u8]) -> Result<Self> {
        if info.len() > MAX_INFO_SIZE {
            return Err(PrivacyError::InvalidInput(format!(
                "info of {} bytes exceeds {}",
                info.len(),
                MAX_INFO_SIZE
            )));
        }
        self.info = info.to_vec();
        Ok(self)
    }

    /// Public key, or an error if absent
    pub fn require_public_key(&self) -> Result<RistrettoPoint> {
        self.public_key.ok_or_else(|| missing("public key"))
    }

    /// Derivator, or an error if absent
    pub fn require_snd(&self) -> Result<Scalar> {
        self.snd.ok_or_else(|| missing("serial number derivator"))
    }

    /// Randomness, or an error if absent
    pub fn require_randomness(&self) -> Result<Scalar> {
        self.randomness.ok_or_else(|| missing("randomness"))
    }

    /// Commitment, or an error if absent
    pub fn require_commitment(&self) -> Result<RistrettoPoint> {
        self.commitment.ok_or_else(|| missing("commitment"))
    }

    /// Serial number, or an error if absent
    pub fn require_serial_number(&self) -> Result<RistrettoPoint> {
        self.serial_number.ok_or_else(|| missing("serial number"))
    }

    /// Shard owning the coin
    pub fn shard_id(&self, params: &PrivacyParams) -> Result<u8> {
        Ok(params.shard_id(last_byte(&self.require_public_key()?)))
    }

    /// Recompute the commitment from the revealed fields
    pub fn recompute_commitment(&self, params: &PrivacyParams) -> Result<RistrettoPoint> {
        let public_key = self.require_public_key()?;
        Ok(commit_coin(
            params.pedersen(),
            &public_key,
            self.value,
            &self.require_snd()?,
            params.shard_id(last_byte(&public_key)),
            &self.require_randomness()?,
        ))
    }

    /// Serialize: each field behind a one-byte length (0 when absent),
    /// value as minimal big-endian bytes
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut w = ByteWriter::new();
        write_point(&mut w, self.public_key.as_ref());
        write_point(&mut w, self.commitment.as_ref());
        write_scalar(&mut w, self.snd.as_ref());
        write_point(&mut w, self.serial_number.as_ref());
        write_scalar(&mut w, self.randomness.as_ref());
        let value = self.value.to_be_bytes();
        let skip = value.iter().take_while(|b| **b == 0).count();
        w.write_u8_prefixed(&value[skip..])?;
        w.write_u8_prefixed(&self.info)?;
        Ok(w.into_bytes())
    }

    /// Deserialize
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let mut r = ByteReader::new(bytes);
        let public_key = read_point(&mut r)?;
        let commitment = read_point(&mut r)?;
        let snd = read_scalar(&mut r)?;
        let serial_number = read_point(&mut r)?;
        let randomness = read_scalar(&mut r)?;
        let value_bytes = r.read_u8_prefixed()?;
        if value_bytes.len() > 8 {
            return Err(PrivacyError::Decode(format!(
                "coin value of {} bytes",
                value_bytes.len()
            )));
        }
        if value_bytes.first() == Some(&0) {
            return Err(PrivacyError::Decode("coin value has a leading zero byte".into()));
        }
        let value = value_bytes
            .iter()
            .fold(0u64, |acc, b| (acc << 8) | u64::from(*b));
        let info = r.read_u8_prefixed()?.to_vec();
        r.finish()?;
        Ok(Self {
            public_key,
            commitment,
            snd,
            serial_number,
            randomness,
            value,
            info,
        })
    }
}

fn commit_coin(
    pc: &PedersenGens,
    public_key: &RistrettoPoint,
    value: u64,
    snd: &Scalar,
    shard: u8,
    randomness: &Scalar,
) -> RistrettoPoint {
    public_key
        + pc.commit_all(&[
            Scalar::ZERO,
            Scalar::from(value),
            *snd,
            Scalar::from(shard),
            *randomness,
        ])
}

fn write_point(w: &mut ByteWriter, point: Option<&RistrettoPoint>) {
    match point {
        Some(p) => {
            w.write_u8(POINT_SIZE as u8);
            w.write_point(p);
        }
        None => w.write_u8(0),
    }
}

fn write_scalar(w: &mut ByteWriter, scalar: Option<&Scalar>) {
    match scalar {
        Some(s) => {
            w.write_u8(SCALAR_SIZE as u8);
            w.write_scalar(s);
        }
        None => w.write_u8(0),
    }
}

fn read_point(r: &mut ByteReader<'_>) -> Result<Option<RistrettoPoint>> {
    match r.read_u8()? as usize {
        0 => Ok(None),
        POINT_SIZE => Ok(Some(r.read_point()?)),
        n => Err(PrivacyError::Decode(format!("coin point field of {} bytes", n))),
    }
}

fn read_scalar(r: &mut ByteReader<'_>) -> Result<Option<Scalar>> {
    match r.read_u8()? as usize {
        0 => Ok(None),
        SCALAR_SIZE => Ok(Some(r.read_scalar()?)),
        n => Err(PrivacyError::Decode(format!("coin scalar field of {} bytes", n))),
    }
}

/// A coin being spent
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputCoin {
    /// Coin details
    pub coin: Coin,
}

impl InputCoin {
    /// Wrap a coin, deriving its serial number from the owner's secret key
    pub fn new(params: &PrivacyParams, coin: Coin, sk: &Scalar) -> Result<Self> {
        let snd = coin.require_snd()?;
        let mut coin = coin;
        coin.serial_number = Some(derive_serial_number(params.pedersen(), sk, &snd)?);
        Ok(Self { coin })
    }

    /// Only the serial number, as published with a privacy proof
    pub fn conceal(&self) -> Self {
        Self {
            coin: Coin {
                serial_number: self.coin.serial_number,
                ..Coin::default()
            },
        }
    }

    /// Serialize the coin
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        self.coin.to_bytes()
    }

    /// Deserialize the coin
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Ok(Self {
            coin: Coin::from_bytes(bytes)?,
        })
    }
}

/// A coin being created
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputCoin {
    /// Coin details
    pub coin: Coin,
}

impl OutputCoin {
    /// A new coin for `public_key` with a fresh derivator; commitment and
    /// randomness are filled in by the payment witness
    pub fn new(public_key: RistrettoPoint, value: u64) -> Self {
        Self {
            coin: Coin {
                public_key: Some(public_key),
                snd: Some(Scalar::random(&mut OsRng)),
                value,
                ..Coin::default()
            },
        }
    }

    /// Drop the value and randomness, as published with a privacy proof
    pub fn conceal(&self) -> Self {
        Self {
            coin: Coin {
                value: 0,
                randomness: None,
                ..self.coin.clone()
            },
        }
    }

    /// Serialize the coin
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        self.coin.to_bytes()
    }

    /// Deserialize the coin
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Ok(Self {
            coin: Coin::from_bytes(bytes)?,
        })
    }
}
