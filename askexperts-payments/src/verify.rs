//! Proof verification: re-decode bolt11, check the amount and preimage,
//! and confirm settlement — preimage knowledge alone is not evidence that
//! this payer's wallet actually paid.

use std::str::FromStr;

use askexperts_types::{Invoice, Proof};
use lightning_invoice::Bolt11Invoice;
use sha2::{Digest, Sha256};

use crate::backend::PaymentBackend;
use crate::error::{PaymentError, PaymentResult};

/// Decodes the bolt-11 string and checks its encoded amount against the
/// invoice's declared `amount`, without requiring a proof or payment
/// backend. Callers use this before paying, so a quote that promises one
/// price but encodes another is caught ahead of time rather than only
/// discovered when the expert re-verifies the proof.
pub fn check_invoice_amount(invoice: &Invoice) -> PaymentResult<()> {
    let decoded = Bolt11Invoice::from_str(&invoice.invoice)
        .map_err(|e| PaymentError::InvalidInvoice(e.to_string()))?;

    let expected_msat = decoded
        .amount_milli_satoshis()
        .ok_or_else(|| PaymentError::InvalidInvoice("invoice carries no amount".into()))?
        as i64;
    let quoted_msat = (invoice.amount * 1000) as i64;
    if (expected_msat - quoted_msat).abs() > 1 {
        return Err(PaymentError::AmountMismatch {
            expected_msat,
            actual_msat: quoted_msat,
        });
    }
    Ok(())
}

pub async fn verify(
    invoice: &Invoice,
    proof: &Proof,
    backend: &dyn PaymentBackend,
) -> PaymentResult<()> {
    check_invoice_amount(invoice)?;

    let preimage_bytes =
        hex::decode(&proof.preimage).map_err(|_| PaymentError::BadProof("preimage not hex".into()))?;
    let computed_hash = hex::encode(Sha256::digest(&preimage_bytes));
    if computed_hash != invoice.payment_hash {
        return Err(PaymentError::BadProof(
            "preimage does not hash to the invoice's payment hash".into(),
        ));
    }

    let lookup = backend.lookup_invoice(&invoice.payment_hash).await?;
    if !lookup.paid {
        return Err(PaymentError::BadProof(
            "invoice is not marked paid by the payment backend".into(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryPaymentBackend;

    #[tokio::test]
    async fn accepts_a_genuinely_paid_invoice() {
        let backend = InMemoryPaymentBackend::new();
        let invoice = backend.make_invoice(10, "test", 3600).await.unwrap();
        let preimage = backend.pay_invoice(&invoice.invoice).await.unwrap();

        let proof = Proof {
            proof_id: "proof1".into(),
            quote_id: "quote1".into(),
            method: askexperts_types::PaymentMethod::Lightning,
            preimage,
        };

        verify(&invoice, &proof, &backend).await.unwrap();
    }

    #[tokio::test]
    async fn rejects_wrong_preimage() {
        let backend = InMemoryPaymentBackend::new();
        let invoice = backend.make_invoice(10, "test", 3600).await.unwrap();
        backend.pay_invoice(&invoice.invoice).await.unwrap();

        let proof = Proof {
            proof_id: "proof1".into(),
            quote_id: "quote1".into(),
            method: askexperts_types::PaymentMethod::Lightning,
            preimage: hex::encode([0u8; 32]),
        };

        assert!(verify(&invoice, &proof, &backend).await.is_err());
    }
}
