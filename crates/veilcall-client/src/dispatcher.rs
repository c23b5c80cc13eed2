//! Intercepting dispatcher: decide, encrypt, submit, retry, decrypt.

use std::sync::{Mutex, MutexGuard, PoisonError};

use serde_json::Value;
use tracing::{debug, warn};
use veilcall_crypto::SessionCipher;

use crate::{
    error::ClientError,
    key_cache::{CalldataPublicKey, KeyEpochCache},
    transport::{RpcError, RpcResponse, Transport},
};

/// Read-only call method; its result is decrypted on the way back.
const CALL_METHOD: &str = "eth_call";
/// Gas estimation; intercepted but never decrypted.
const ESTIMATE_GAS_METHOD: &str = "eth_estimateGas";
/// Transaction submission; intercepted but never decrypted (the result is
/// a transaction identifier, not encrypted payload).
const SEND_TRANSACTION_METHOD: &str = "eth_sendTransaction";
/// Out-of-band key fetch.
const KEY_FETCH_METHOD: &str = "oasis_callDataPublicKey";

/// The remote's stale-epoch rejection, matched verbatim.
///
/// This code/message pair is an external, versioned contract. Matching the
/// message text is fragile, but loosening it would misclassify unrelated
/// errors as retryable; do not change it unless the remote contract is
/// renegotiated to a structured code.
const STALE_KEY_CODE: i64 = -32000;
const STALE_KEY_MESSAGE: &str = "core: invalid call format: epoch too far in the past";

/// Immutable interception policy, fixed at construction.
#[derive(Debug, Clone)]
pub struct DispatchConfig {
    /// Encrypt contract deployments (submission/estimation calls with no
    /// target address). Off by default: encrypting deployment bytecode
    /// breaks downstream bytecode verification tooling.
    pub encrypt_deploys: bool,
    /// Maximum stale-key retries before failing with
    /// [`ClientError::RetryExhausted`].
    pub max_key_retries: u32,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self { encrypt_deploys: false, max_key_retries: 3 }
    }
}

/// Drives encryption, submission, and decryption around a remote call.
///
/// One logical request/response cycle per `request` invocation; the
/// transport call is the sole suspension point. The key cache is scoped to
/// this instance and safe under concurrent calls.
pub struct InterceptingDispatcher<T> {
    transport: T,
    cache: Mutex<KeyEpochCache>,
    config: DispatchConfig,
}

impl<T: Transport> InterceptingDispatcher<T> {
    /// Wrap a transport with the given interception policy.
    pub fn new(transport: T, config: DispatchConfig) -> Self {
        Self { transport, cache: Mutex::new(KeyEpochCache::new()), config }
    }

    /// The wrapped transport.
    pub fn transport_ref(&self) -> &T {
        &self.transport
    }

    /// Issue one RPC call, transparently encrypting calldata and
    /// decrypting read results where the policy applies.
    ///
    /// Non-intercepted calls, and intercepted calls carrying no calldata,
    /// are forwarded untouched. RPC-level errors other than the stale-key
    /// rejection are returned to the caller unmodified inside the
    /// response.
    pub async fn request(&self, method: &str, params: Value) -> Result<RpcResponse, ClientError> {
        if !should_intercept(method, &params, &self.config) {
            return Ok(self.transport.request(method, params).await?);
        }

        let Some(calldata) = extract_calldata(&params)? else {
            // Calls without calldata are plain value transfers; nothing
            // confidential to protect.
            return Ok(self.transport.request(method, params).await?);
        };
        debug!(method, calldata_len = calldata.len(), "intercepting call");

        let mut force_fetch = false;
        for attempt in 0..=self.config.max_key_retries {
            let key = self.candidate_key(force_fetch).await?;
            let cipher = SessionCipher::new(&key.key, Some(key.epoch))?;
            let sealed_params = replace_calldata(&params, &cipher.encrypt(&calldata)?)?;

            let response = self.transport.request(method, sealed_params).await?;

            if let Some(error) = &response.error {
                if is_stale_key_error(error) {
                    warn!(attempt, epoch = key.epoch, "remote rejected key epoch, refetching");
                    force_fetch = true;
                    continue;
                }
                return Ok(response);
            }

            // Only the read-only call variant carries encrypted payload
            // back; submissions return a transaction identifier.
            if method == CALL_METHOD {
                return decrypt_result(&cipher, response);
            }
            return Ok(response);
        }

        Err(ClientError::RetryExhausted { attempts: self.config.max_key_retries })
    }

    /// Current candidate key: cache newest, or a fresh fetch.
    async fn candidate_key(&self, force_fetch: bool) -> Result<CalldataPublicKey, ClientError> {
        if !force_fetch {
            if let Some(key) = self.lock_cache().newest().cloned() {
                return Ok(key);
            }
        }

        let response = self.transport.request(KEY_FETCH_METHOD, Value::Array(Vec::new())).await?;
        let result = match (response.error, response.result) {
            (None, Some(result)) => result,
            _ => return Err(ClientError::NoEncryptionKey),
        };

        let key = CalldataPublicKey::from_rpc(&result)?;
        debug!(epoch = key.epoch, "fetched calldata public key");
        self.lock_cache().add(key.clone());
        Ok(key)
    }

    fn lock_cache(&self) -> MutexGuard<'_, KeyEpochCache> {
        // Cache mutations cannot panic, but recover from poisoning anyway;
        // epoch monotonicity makes a half-applied add harmless.
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Interception policy.
///
/// Read-only calls, gas estimation and submissions are intercepted, except
/// that submissions/estimations lacking a target address (contract
/// deployments) are excluded unless the config opts in.
fn should_intercept(method: &str, params: &Value, config: &DispatchConfig) -> bool {
    if !matches!(method, CALL_METHOD | ESTIMATE_GAS_METHOD | SEND_TRANSACTION_METHOD) {
        return false;
    }
    if !config.encrypt_deploys
        && matches!(method, ESTIMATE_GAS_METHOD | SEND_TRANSACTION_METHOD)
        && !has_target_address(params)
    {
        return false;
    }
    true
}

fn has_target_address(params: &Value) -> bool {
    params
        .get(0)
        .and_then(|call| call.get("to"))
        .is_some_and(|to| to.as_str().is_some_and(|s| !s.is_empty()))
}

/// Pull the calldata bytes out of the first call parameter.
///
/// Absent or empty `data` means nothing to encrypt; present but non-hex
/// `data` is a caller error.
fn extract_calldata(params: &Value) -> Result<Option<Vec<u8>>, ClientError> {
    let Some(data) = params.get(0).and_then(|call| call.get("data")) else {
        return Ok(None);
    };
    let Some(text) = data.as_str() else {
        return Err(ClientError::InvalidParams("`data` must be a hex string".into()));
    };
    let Some(stripped) = text.strip_prefix("0x") else {
        return Err(ClientError::InvalidParams("`data` is not 0x-prefixed".into()));
    };
    if stripped.is_empty() {
        return Ok(None);
    }
    hex::decode(stripped)
        .map(Some)
        .map_err(|e| ClientError::InvalidParams(format!("`data` is not valid hex: {e}")))
}

/// Clone the params with `data` replaced by the hex-encoded envelope,
/// leaving every other field untouched.
fn replace_calldata(params: &Value, envelope: &[u8]) -> Result<Value, ClientError> {
    let mut sealed = params.clone();
    let Some(slot) = sealed.get_mut(0).and_then(|call| call.get_mut("data")) else {
        return Err(ClientError::InvalidParams("first call parameter lost its `data`".into()));
    };
    *slot = Value::String(format!("0x{}", hex::encode(envelope)));
    Ok(sealed)
}

fn is_stale_key_error(error: &RpcError) -> bool {
    error.code == STALE_KEY_CODE && error.message == STALE_KEY_MESSAGE
}

/// Decrypt a non-empty read result in place; empty results pass through.
fn decrypt_result(
    cipher: &SessionCipher,
    response: RpcResponse,
) -> Result<RpcResponse, ClientError> {
    let Some(raw) = response.result.as_ref().and_then(Value::as_str) else {
        return Ok(response);
    };
    let Some(stripped) = raw.strip_prefix("0x") else {
        return Ok(response);
    };
    if stripped.is_empty() {
        return Ok(response);
    }

    let sealed = hex::decode(stripped)
        .map_err(|e| ClientError::InvalidParams(format!("result is not valid hex: {e}")))?;
    let plaintext = cipher.decrypt(&sealed)?;

    let mut response = response;
    response.result = Some(Value::String(format!("0x{}", hex::encode(plaintext))));
    Ok(response)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    fn config(encrypt_deploys: bool) -> DispatchConfig {
        DispatchConfig { encrypt_deploys, ..DispatchConfig::default() }
    }

    #[test]
    fn read_only_and_submission_methods_are_intercepted() {
        let params = json!([{"to": "0xd43f", "data": "0x1234"}]);
        for method in [CALL_METHOD, ESTIMATE_GAS_METHOD, SEND_TRANSACTION_METHOD] {
            assert!(should_intercept(method, &params, &config(false)), "{method}");
        }
    }

    #[test]
    fn unrelated_methods_pass_through() {
        let params = json!([{"to": "0xd43f", "data": "0x1234"}]);
        assert!(!should_intercept("eth_getBalance", &params, &config(false)));
        assert!(!should_intercept("eth_blockNumber", &params, &config(false)));
    }

    #[test]
    fn deployments_are_excluded_unless_opted_in() {
        let deploy = json!([{"data": "0x60806040"}]);

        assert!(!should_intercept(SEND_TRANSACTION_METHOD, &deploy, &config(false)));
        assert!(!should_intercept(ESTIMATE_GAS_METHOD, &deploy, &config(false)));
        assert!(should_intercept(SEND_TRANSACTION_METHOD, &deploy, &config(true)));

        // A read-only call without `to` is still intercepted.
        assert!(should_intercept(CALL_METHOD, &deploy, &config(false)));
    }

    #[test]
    fn empty_target_counts_as_deployment() {
        let deploy = json!([{"to": "", "data": "0x60806040"}]);
        assert!(!should_intercept(SEND_TRANSACTION_METHOD, &deploy, &config(false)));
    }

    #[test]
    fn calldata_extraction_handles_the_edge_shapes() {
        assert_eq!(extract_calldata(&json!([{"to": "0x1"}])).unwrap(), None);
        assert_eq!(extract_calldata(&json!([{"data": "0x"}])).unwrap(), None);
        assert_eq!(
            extract_calldata(&json!([{"data": "0xa1b2"}])).unwrap(),
            Some(vec![0xA1, 0xB2])
        );
        assert!(matches!(
            extract_calldata(&json!([{"data": "a1b2"}])),
            Err(ClientError::InvalidParams(_))
        ));
        assert!(matches!(
            extract_calldata(&json!([{"data": 7}])),
            Err(ClientError::InvalidParams(_))
        ));
    }

    #[test]
    fn replaced_calldata_leaves_other_fields_alone() {
        let params = json!([{"to": "0xd43f", "data": "0x1234", "value": "0x0"}]);
        let sealed = replace_calldata(&params, &[0xEE, 0xFF]).unwrap();

        assert_eq!(sealed[0]["to"], "0xd43f");
        assert_eq!(sealed[0]["value"], "0x0");
        assert_eq!(sealed[0]["data"], "0xeeff");
    }

    #[test]
    fn stale_key_match_is_verbatim() {
        let exact = RpcError { code: STALE_KEY_CODE, message: STALE_KEY_MESSAGE.to_string() };
        assert!(is_stale_key_error(&exact));

        let wrong_code = RpcError { code: -32001, message: STALE_KEY_MESSAGE.to_string() };
        assert!(!is_stale_key_error(&wrong_code));

        let wrong_message = RpcError {
            code: STALE_KEY_CODE,
            message: "core: invalid call format: epoch in the future".to_string(),
        };
        assert!(!is_stale_key_error(&wrong_message));
    }
}
