// secp256k1 signing for magic coupons
// EIP-191 personal-message signatures in the 65-byte r || s || v layout, plus the
// local wallet used for contract transactions

use std::fmt;
use std::str::FromStr;

use alloy::network::EthereumWallet;
use alloy::primitives::{eip191_hash_message, Address, B256};
use alloy::signers::local::PrivateKeySigner;
use anyhow::{anyhow, Result};
use once_cell::sync::Lazy;
use secp256k1::ecdsa::{RecoverableSignature, RecoveryId};
use secp256k1::{All, Message, PublicKey, Secp256k1, SecretKey};

static SECP: Lazy<Secp256k1<All>> = Lazy::new(Secp256k1::new);

/// `0x`-prefixed lowercase hex, the form hashes are compared in
pub fn to_hex_prefixed(bytes: impl AsRef<[u8]>) -> String {
    format!("0x{}", hex::encode(bytes))
}

/// Recoverable signature laid out as `r || s || v`
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Signature65 {
    pub rs: [u8; 64],
    /// Recovery id, 0 or 1
    pub recid: u8,
}

impl Signature65 {
    /// Wire form with `v = 27 + recid`
    pub fn to_bytes(&self) -> [u8; 65] {
        let mut out = [0u8; 65];
        out[..64].copy_from_slice(&self.rs);
        out[64] = 27 + self.recid;
        out
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != 65 {
            return Err(anyhow!("Signature must be 65 bytes, got {}", bytes.len()));
        }
        let recid = match bytes[64] {
            0 | 27 => 0,
            1 | 28 => 1,
            v => return Err(anyhow!("Invalid recovery byte: {}", v)),
        };
        let mut rs = [0u8; 64];
        rs.copy_from_slice(&bytes[..64]);
        Ok(Self { rs, recid })
    }

    /// Recover the signer address for a 32-byte digest
    pub fn recover(&self, digest: &B256) -> Result<Address> {
        let recid = RecoveryId::from_i32(self.recid as i32)
            .map_err(|e| anyhow!("Invalid recovery id: {}", e))?;
        let sig = RecoverableSignature::from_compact(&self.rs, recid)
            .map_err(|e| anyhow!("Invalid signature: {}", e))?;
        let message = Message::from_slice(digest.as_slice())
            .map_err(|e| anyhow!("Failed to create message: {}", e))?;
        let public = SECP
            .recover_ecdsa(&message, &sig)
            .map_err(|e| anyhow!("Signature recovery failed: {}", e))?;
        Ok(address_of(&public))
    }
}

impl fmt::Debug for Signature65 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signature65({})", to_hex_prefixed(self.to_bytes()))
    }
}

pub fn address_of(public: &PublicKey) -> Address {
    let uncompressed = public.serialize_uncompressed();
    Address::from_raw_public_key(&uncompressed[1..])
}

/// Administrator signing key
#[derive(Clone)]
pub struct AdminKey {
    secret_key: SecretKey,
    address: Address,
}

impl AdminKey {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let secret_key = SecretKey::from_slice(bytes)
            .map_err(|e| anyhow!("Invalid secret key: {}", e))?;
        let public = PublicKey::from_secret_key(&SECP, &secret_key);
        Ok(Self {
            secret_key,
            address: address_of(&public),
        })
    }

    pub fn address(&self) -> Address {
        self.address
    }

    /// Sign a 32-byte digest as-is (RFC 6979, deterministic)
    pub fn sign_digest(&self, digest: &B256) -> Result<Signature65> {
        let message = Message::from_slice(digest.as_slice())
            .map_err(|e| anyhow!("Failed to create message: {}", e))?;
        let sig = SECP.sign_ecdsa_recoverable(&message, &self.secret_key);
        let (recid, rs) = sig.serialize_compact();
        Ok(Signature65 {
            rs,
            recid: recid.to_i32() as u8,
        })
    }

    /// Sign `message` under the personal-message prefix
    pub fn sign_message(&self, message: &[u8]) -> Result<Signature65> {
        self.sign_digest(&eip191_hash_message(message))
    }

    /// Same key as a wallet for sending contract transactions
    pub fn wallet(&self) -> Result<EthereumWallet> {
        let signer = PrivateKeySigner::from_bytes(&B256::from(self.secret_key.secret_bytes()))
            .map_err(|e| anyhow!("Invalid secret key: {}", e))?;
        Ok(EthereumWallet::from(signer))
    }
}

impl FromStr for AdminKey {
    type Err = anyhow::Error;

    /// Hex private key, with or without `0x`
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let body = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(body).map_err(|e| anyhow!("Invalid private key hex: {}", e))?;
        if bytes.len() != 32 {
            return Err(anyhow!("Private key must be 32 bytes, got {}", bytes.len()));
        }
        Self::from_bytes(&bytes)
    }
}

impl fmt::Debug for AdminKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdminKey")
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}
