//! Deterministic in-memory payment backend for tests: issues real,
//! decodable bolt-11 invoices signed with an ephemeral key, without
//! touching a Lightning node.

use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;

use askexperts_types::Invoice;
use async_trait::async_trait;
use bitcoin_hashes::{sha256, Hash};
use lightning_invoice::{Bolt11Invoice, Currency, InvoiceBuilder, PaymentSecret};
use rand::RngCore;
use secp256k1::{Secp256k1, SecretKey};
use tokio::sync::RwLock;

use crate::backend::{LookupResult, PaymentBackend};
use crate::error::{PaymentError, PaymentResult};

struct InvoiceState {
    preimage_hex: String,
    paid: bool,
}

pub struct InMemoryPaymentBackend {
    signing_key: SecretKey,
    invoices: RwLock<HashMap<String, InvoiceState>>,
}

impl InMemoryPaymentBackend {
    pub fn new() -> Self {
        let mut key_bytes = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut key_bytes);
        Self {
            signing_key: SecretKey::from_slice(&key_bytes).expect("32 random bytes is a valid key"),
            invoices: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for InMemoryPaymentBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PaymentBackend for InMemoryPaymentBackend {
    async fn make_invoice(
        &self,
        amount_sats: u64,
        description: &str,
        expiry_s: u32,
    ) -> PaymentResult<Invoice> {
        let mut preimage_bytes = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut preimage_bytes);
        let payment_hash = sha256::Hash::hash(&preimage_bytes);
        let preimage_hex = hex::encode(preimage_bytes);
        let payment_hash_hex = hex::encode(payment_hash.to_byte_array());

        let secp = Secp256k1::new();
        let built = InvoiceBuilder::new(Currency::Bitcoin)
            .description(description.to_string())
            .payment_hash(payment_hash)
            .payment_secret(PaymentSecret([7u8; 32]))
            .current_timestamp()
            .min_final_cltv_expiry_delta(144)
            .expiry_time(Duration::from_secs(expiry_s as u64))
            .amount_milli_satoshis(amount_sats * 1000)
            .build_signed(|hash| secp.sign_ecdsa_recoverable(hash, &self.signing_key))
            .map_err(|e| PaymentError::InvalidInvoice(e.to_string()))?;

        self.invoices.write().await.insert(
            payment_hash_hex.clone(),
            InvoiceState {
                preimage_hex,
                paid: false,
            },
        );

        Ok(Invoice {
            method: "lightning".into(),
            unit: "sat".into(),
            amount: amount_sats,
            invoice: built.to_string(),
            payment_hash: payment_hash_hex,
        })
    }

    async fn pay_invoice(&self, bolt11: &str) -> PaymentResult<String> {
        let decoded =
            Bolt11Invoice::from_str(bolt11).map_err(|e| PaymentError::InvalidInvoice(e.to_string()))?;
        if decoded.is_expired() {
            return Err(PaymentError::InvoiceExpired);
        }
        let payment_hash_hex = hex::encode(decoded.payment_hash().to_byte_array());

        let mut invoices = self.invoices.write().await;
        let state = invoices
            .get_mut(&payment_hash_hex)
            .ok_or_else(|| PaymentError::InvalidInvoice("unknown invoice".into()))?;
        state.paid = true;
        Ok(state.preimage_hex.clone())
    }

    async fn lookup_invoice(&self, payment_hash: &str) -> PaymentResult<LookupResult> {
        let invoices = self.invoices.read().await;
        match invoices.get(payment_hash) {
            Some(state) => Ok(LookupResult {
                paid: state.paid,
                preimage: state.paid.then(|| state.preimage_hex.clone()),
            }),
            None => Ok(LookupResult {
                paid: false,
                preimage: None,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn make_pay_lookup_round_trip() {
        let backend = InMemoryPaymentBackend::new();
        let invoice = backend.make_invoice(21, "desc", 600).await.unwrap();

        let before = backend.lookup_invoice(&invoice.payment_hash).await.unwrap();
        assert!(!before.paid);

        let preimage = backend.pay_invoice(&invoice.invoice).await.unwrap();
        let computed_hash = hex::encode(sha256::Hash::hash(&hex::decode(&preimage).unwrap()).to_byte_array());
        assert_eq!(computed_hash, invoice.payment_hash);

        let after = backend.lookup_invoice(&invoice.payment_hash).await.unwrap();
        assert!(after.paid);
    }
}
