// Transaction building and signing for native payments

use base64::Engine;
use sha2::{Digest, Sha256};
use stellar_xdr::curr::{
    Asset, BytesM, DecoratedSignature, Hash, Limits, Memo, MuxedAccount, Operation, OperationBody,
    PaymentOp, Preconditions, SequenceNumber, Signature, SignatureHint, TimeBounds, TimePoint,
    Transaction, TransactionEnvelope, TransactionExt, TransactionSignaturePayload,
    TransactionSignaturePayloadTaggedTransaction, TransactionV1Envelope, Uint256, WriteXdr,
};

use crate::error::LedgerError;
use crate::ledger::keys::{decode_account_id, Keypair};
use crate::ledger::models::{to_stroops, PaymentRequest};

/// A signed envelope ready for submission
#[derive(Debug, Clone)]
pub struct SignedEnvelope {
    /// Hex transaction hash (what Horizon reports back as `hash`)
    pub hash: String,
    /// Base64 XDR of the `TransactionEnvelope`
    pub envelope_xdr: String,
}

/// Network id = sha256(passphrase)
pub fn network_id(passphrase: &str) -> [u8; 32] {
    let mut id = [0u8; 32];
    id.copy_from_slice(&Sha256::digest(passphrase.as_bytes()));
    id
}

/// Build the single-payment transaction described by `request`, valid until
/// `now_unix + request.validity`
pub fn build_payment(request: &PaymentRequest<'_>, now_unix: u64) -> Result<Transaction, LedgerError> {
    let source = decode_account_id(&request.source.account_id)?;
    let destination = decode_account_id(request.destination)?;
    let amount = to_stroops(request.amount)?;

    let op = Operation {
        source_account: None,
        body: OperationBody::Payment(PaymentOp {
            destination: MuxedAccount::Ed25519(Uint256(destination)),
            asset: Asset::Native,
            amount,
        }),
    };

    Ok(Transaction {
        source_account: MuxedAccount::Ed25519(Uint256(source)),
        // one operation, so the total fee equals the per-operation fee
        fee: request.fee_per_op,
        seq_num: SequenceNumber(request.source.next_sequence()?),
        cond: Preconditions::Time(TimeBounds {
            min_time: TimePoint(0),
            max_time: TimePoint(now_unix + request.validity.as_secs()),
        }),
        memo: Memo::None,
        operations: vec![op]
            .try_into()
            .map_err(|_| LedgerError::Encoding("Failed to create operations list".to_string()))?,
        ext: TransactionExt::V0,
    })
}

/// Hash signed by the source account: sha256(network_id || ENVELOPE_TYPE_TX || tx)
pub fn transaction_hash(tx: &Transaction, passphrase: &str) -> Result<[u8; 32], LedgerError> {
    let payload = TransactionSignaturePayload {
        network_id: Hash(network_id(passphrase)),
        tagged_transaction: TransactionSignaturePayloadTaggedTransaction::Tx(tx.clone()),
    };
    let bytes = payload.to_xdr(Limits::none())?;

    let mut hash = [0u8; 32];
    hash.copy_from_slice(&Sha256::digest(&bytes));
    Ok(hash)
}

pub fn sign(tx: Transaction, keypair: &Keypair, passphrase: &str) -> Result<SignedEnvelope, LedgerError> {
    let hash = transaction_hash(&tx, passphrase)?;
    let signature = keypair.sign(&hash);

    let signature_bytes: BytesM<64> = signature
        .to_bytes()
        .to_vec()
        .try_into()
        .map_err(|_| LedgerError::Encoding("Invalid signature length".to_string()))?;

    let decorated = DecoratedSignature {
        hint: SignatureHint(keypair.signature_hint()),
        signature: Signature(signature_bytes),
    };

    let envelope = TransactionEnvelope::Tx(TransactionV1Envelope {
        tx,
        signatures: vec![decorated]
            .try_into()
            .map_err(|_| LedgerError::Encoding("Failed to create signatures list".to_string()))?,
    });

    let xdr_bytes = envelope.to_xdr(Limits::none())?;

    Ok(SignedEnvelope {
        hash: hex::encode(hash),
        envelope_xdr: base64::engine::general_purpose::STANDARD.encode(xdr_bytes),
    })
}

/// Build and sign in one step
pub fn build_signed_payment(
    request: &PaymentRequest<'_>,
    passphrase: &str,
    now_unix: u64,
) -> Result<SignedEnvelope, LedgerError> {
    let tx = build_payment(request, now_unix)?;
    sign(tx, request.keypair, passphrase)
}
