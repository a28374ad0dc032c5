mod gateway_signature;
mod reference_codec;

pub use gateway_signature::{
    normalize_amount,
    NotificationFields,
    PaymentRequestFields,
    SignatureError,
    SignatureVerifier,
};
pub use reference_codec::{decode_reference, encode_reference, DecodedReference, ReferenceError, REFERENCE_PREFIX};
