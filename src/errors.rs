//! Chain-facing errors and the mapping from caught failures to sentences a
//! user can act on.
//!
//! Failures coming back from the node or the signer are normalised into a
//! [`Failure`] chain (`shortMessage` / `message` / `data.errorName` / nested
//! `cause`), which is what [`parse_contract_error`] walks.

use ethers::abi::{self, ParamType, Token};
use ethers::contract::MulticallError;
use ethers::prelude::*;
use ethers::utils::id;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::math::liquidity_amounts::LiquidityMathError;

/// Known custom errors: (name, solidity signature, user message).
pub const KNOWN_ERRORS: &[(&str, &str, &str)] = &[
    ("DebtNotZero", "DebtNotZero()", "You must repay all debt before withdrawing"),
    ("NothingToClaim", "NothingToClaim()", "No ETH available to claim"),
    ("WithdrawDelayNotMet", "WithdrawDelayNotMet()", "Withdrawal delay period not yet passed"),
    ("WithdrawalBreaksCR", "WithdrawalBreaksCR()", "Withdrawal would break collateral ratio"),
    ("InsufficientCollateral", "InsufficientCollateral()", "Insufficient collateral"),
    ("InsufficientShares", "InsufficientShares()", "Insufficient KALA shares to repay this amount"),
    (
        "ERC20InsufficientBalance",
        "ERC20InsufficientBalance(address,uint256,uint256)",
        "Insufficient token balance",
    ),
    (
        "ERC20InsufficientAllowance",
        "ERC20InsufficientAllowance(address,uint256,uint256)",
        "Token allowance too low",
    ),
    ("ZeroValue", "ZeroValue()", "Amount must be greater than zero"),
    ("EnforcedPause", "EnforcedPause()", "Contract is paused"),
    ("ETHTransferFailed", "ETHTransferFailed()", "ETH transfer failed"),
    (
        "ReentrancyGuardReentrantCall",
        "ReentrancyGuardReentrantCall()",
        "Transaction rejected: reentrancy detected",
    ),
];

pub const UNKNOWN_ERROR: &str = "Unknown error";
pub const TRANSACTION_FAILED: &str = "Transaction failed";
pub const NETWORK_FAILURE: &str = "Network request failed";
pub const WALLET_FAILURE: &str = "Wallet request rejected or failed";

const ERROR_STRING_SELECTOR: [u8; 4] = [0x08, 0xc3, 0x79, 0xa0];

#[derive(Debug, Error)]
pub enum ChainError {
    #[error("contract call failed: {}", .0.raw_text())]
    Contract(Failure),
    #[error("provider error: {0}")]
    Provider(#[from] ProviderError),
    #[error("rpc error: {0}")]
    Rpc(String),
    #[error("wallet error: {0}")]
    Wallet(String),
    #[error("no signer configured; write operations are disabled")]
    SignerUnavailable,
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("liquidity math: {0}")]
    Math(#[from] LiquidityMathError),
    #[error("transaction {0:?} was dropped from the mempool")]
    TransactionDropped(H256),
    #[error("transaction {0:?} reverted")]
    TransactionReverted(H256),
    #[error("another action is in progress: {0}")]
    WorkflowBusy(String),
}

impl ChainError {
    /// Sentence suitable for showing next to the action that failed.
    pub fn user_message(&self) -> String {
        match self {
            ChainError::Contract(failure) => {
                parse_contract_error(Some(&CaughtError::Object(failure.clone())))
            }
            ChainError::Provider(_) | ChainError::Rpc(_) => NETWORK_FAILURE.to_string(),
            ChainError::Wallet(_) => WALLET_FAILURE.to_string(),
            ChainError::TransactionDropped(_) | ChainError::TransactionReverted(_) => {
                TRANSACTION_FAILED.to_string()
            }
            other => other.to_string(),
        }
    }
}

impl<M: Middleware> From<ContractError<M>> for ChainError {
    fn from(err: ContractError<M>) -> Self {
        match &err {
            ContractError::MiddlewareError { .. } if err.as_revert().is_none() => {
                ChainError::Wallet(err.to_string())
            }
            _ => ChainError::Contract(failure_from_contract_error(&err)),
        }
    }
}

impl<M: Middleware> From<MulticallError<M>> for ChainError {
    fn from(err: MulticallError<M>) -> Self {
        match err {
            MulticallError::ContractError(inner) => inner.into(),
            other => ChainError::Contract(Failure::with_message(other.to_string())),
        }
    }
}

/// Shape of a caught failure: any field may be missing.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Failure {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub short_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<FailureData>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cause: Option<Box<CaughtError>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FailureData {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_name: Option<String>,
}

/// A thrown value: plain text, a structured failure, or something else.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CaughtError {
    Text(String),
    Object(Failure),
    Opaque(Value),
}

impl Failure {
    pub fn with_short_message(short: impl Into<String>) -> Self {
        Self { short_message: Some(short.into()), ..Default::default() }
    }

    pub fn with_message(message: impl Into<String>) -> Self {
        Self { message: Some(message.into()), ..Default::default() }
    }

    pub fn with_error_name(name: impl Into<String>) -> Self {
        Self {
            data: Some(FailureData { error_name: Some(name.into()) }),
            ..Default::default()
        }
    }

    pub fn caused_by(mut self, cause: Failure) -> Self {
        self.cause = Some(Box::new(CaughtError::Object(cause)));
        self
    }

    fn raw_text(&self) -> String {
        self.message
            .clone()
            .or_else(|| self.short_message.clone())
            .unwrap_or_else(|| TRANSACTION_FAILED.to_string())
    }
}

impl CaughtError {
    /// Interpret an arbitrary JSON value the way a thrown JS value would be:
    /// falsy values are "no error", non-string fields are ignored.
    pub fn from_json(value: &Value) -> Option<CaughtError> {
        match value {
            Value::Null | Value::Bool(false) => None,
            Value::String(s) if s.is_empty() => None,
            Value::Number(n) if n.as_f64() == Some(0.0) => None,
            Value::String(s) => Some(CaughtError::Text(s.clone())),
            Value::Object(map) => {
                let text = |key: &str| map.get(key).and_then(Value::as_str).map(str::to_string);
                let error_name = map
                    .get("data")
                    .and_then(Value::as_object)
                    .map(|data| FailureData {
                        error_name: data
                            .get("errorName")
                            .and_then(Value::as_str)
                            .filter(|name| !name.is_empty())
                            .map(str::to_string),
                    });
                Some(CaughtError::Object(Failure {
                    short_message: text("shortMessage"),
                    message: text("message"),
                    data: error_name,
                    cause: map
                        .get("cause")
                        .and_then(CaughtError::from_json)
                        .map(Box::new),
                }))
            }
            other => Some(CaughtError::Opaque(other.clone())),
        }
    }
}

/// Message for a known revert identifier.
pub fn message_for(error_name: &str) -> Option<&'static str> {
    KNOWN_ERRORS
        .iter()
        .find(|(name, _, _)| *name == error_name)
        .map(|(_, _, message)| *message)
}

static REVERTED_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"execution reverted:?\s*([A-Za-z0-9_]+)?").expect("Failed to compile revert pattern")
});

/// Identifier following "execution reverted", if any.
pub fn reverted_identifier(short_message: &str) -> Option<&str> {
    REVERTED_PATTERN
        .captures(short_message)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Map a caught failure to a user-facing sentence.
///
/// Order: `cause.data.errorName` (recursing through `cause.cause`), then the
/// identifier after "execution reverted" in `shortMessage`, then any known
/// identifier contained in `message`, then the raw text.
pub fn parse_contract_error(error: Option<&CaughtError>) -> String {
    match error {
        None => UNKNOWN_ERROR.to_string(),
        Some(CaughtError::Text(text)) if text.is_empty() => UNKNOWN_ERROR.to_string(),
        Some(CaughtError::Text(text)) => text.clone(),
        Some(CaughtError::Object(failure)) => describe_failure(failure),
        Some(CaughtError::Opaque(_)) => TRANSACTION_FAILED.to_string(),
    }
}

fn describe_failure(err: &Failure) -> String {
    if let Some(CaughtError::Object(cause)) = err.cause.as_deref() {
        if let Some(name) = cause
            .data
            .as_ref()
            .and_then(|d| d.error_name.as_deref())
            .filter(|name| !name.is_empty())
        {
            return message_for(name)
                .map(str::to_string)
                .unwrap_or_else(|| format!("Contract error: {}", name));
        }
        if let Some(inner) = cause.cause.as_deref() {
            return parse_contract_error(Some(inner));
        }
    }

    if let Some(short) = err.short_message.as_deref().filter(|s| !s.is_empty()) {
        if let Some(name) = reverted_identifier(short) {
            return message_for(name).unwrap_or(short).to_string();
        }
        return short.to_string();
    }

    if let Some(message) = err.message.as_deref().filter(|s| !s.is_empty()) {
        for (name, _, text) in KNOWN_ERRORS {
            if message.contains(name) {
                return text.to_string();
            }
        }
        return message.to_string();
    }

    TRANSACTION_FAILED.to_string()
}

/// Turn raw revert bytes into a failure chain.
pub fn failure_from_revert_data(data: &[u8], raw: &str) -> Failure {
    let reverted = Failure {
        short_message: Some("execution reverted".to_string()),
        message: Some(raw.to_string()),
        ..Default::default()
    };
    if data.len() < 4 {
        return reverted;
    }

    let selector: [u8; 4] = [data[0], data[1], data[2], data[3]];
    if selector == ERROR_STRING_SELECTOR {
        if let Ok(tokens) = abi::decode(&[ParamType::String], &data[4..]) {
            if let Some(Token::String(reason)) = tokens.into_iter().next() {
                return Failure {
                    short_message: Some(format!("execution reverted: {}", reason)),
                    message: Some(raw.to_string()),
                    ..Default::default()
                };
            }
        }
        return reverted;
    }

    match KNOWN_ERRORS.iter().find(|(_, signature, _)| id(signature) == selector) {
        Some((name, _, _)) => reverted.caused_by(Failure::with_error_name(*name)),
        None => reverted,
    }
}

pub fn failure_from_contract_error<M: Middleware>(err: &ContractError<M>) -> Failure {
    let raw = err.to_string();
    if let Some(data) = err.as_revert() {
        return failure_from_revert_data(data.as_ref(), &raw);
    }
    match err {
        ContractError::ProviderError { .. } => {
            Failure::with_short_message(NETWORK_FAILURE).caused_by(Failure::with_message(raw))
        }
        _ => Failure::with_message(raw),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(value: Value) -> String {
        parse_contract_error(CaughtError::from_json(&value).as_ref())
    }

    #[test]
    fn test_nested_error_name_maps_to_sentence() {
        let err = json!({
            "shortMessage": "execution reverted",
            "cause": { "data": { "errorName": "DebtNotZero" } }
        });
        assert_eq!(parse(err), "You must repay all debt before withdrawing");
    }

    #[test]
    fn test_unknown_error_name_is_prefixed() {
        let err = json!({ "cause": { "data": { "errorName": "SomethingNew" } } });
        assert_eq!(parse(err), "Contract error: SomethingNew");
    }

    #[test]
    fn test_empty_error_name_falls_through_to_short_message() {
        let err = json!({
            "shortMessage": "execution reverted: ZeroValue",
            "cause": { "data": { "errorName": "" } }
        });
        assert_eq!(parse(err), "Amount must be greater than zero");

        let failure = Failure::with_short_message("execution reverted: EnforcedPause")
            .caused_by(Failure::with_error_name(""));
        assert_eq!(parse_contract_error(Some(&CaughtError::Object(failure))), "Contract is paused");
    }

    #[test]
    fn test_walks_deeper_causes() {
        let err = json!({
            "cause": { "cause": { "cause": { "data": { "errorName": "EnforcedPause" } } } }
        });
        assert_eq!(parse(err), "Contract is paused");
    }

    #[test]
    fn test_short_message_revert_identifier() {
        let err = json!({ "shortMessage": "execution reverted: NothingToClaim" });
        assert_eq!(parse(err), "No ETH available to claim");
        let err = json!({ "shortMessage": "execution reverted ZeroValue" });
        assert_eq!(parse(err), "Amount must be greater than zero");
    }

    #[test]
    fn test_unrecognized_short_message_is_unchanged() {
        let err = json!({ "shortMessage": "User rejected the request." });
        assert_eq!(parse(err), "User rejected the request.");
        let err = json!({ "shortMessage": "execution reverted: Whatever" });
        assert_eq!(parse(err), "execution reverted: Whatever");
    }

    #[test]
    fn test_message_scanned_for_known_names() {
        let err = json!({ "message": "call failed with ERC20InsufficientAllowance(0x..)" });
        assert_eq!(parse(err), "Token allowance too low");
        let err = json!({ "message": "boom" });
        assert_eq!(parse(err), "boom");
    }

    #[test]
    fn test_fallbacks() {
        assert_eq!(parse(Value::Null), UNKNOWN_ERROR);
        assert_eq!(parse(json!("")), UNKNOWN_ERROR);
        assert_eq!(parse(json!("plain text")), "plain text");
        assert_eq!(parse(json!({})), TRANSACTION_FAILED);
        assert_eq!(parse(json!(42)), TRANSACTION_FAILED);
        // non-string errorName is ignored
        assert_eq!(parse(json!({ "cause": { "data": { "errorName": 7 } } })), TRANSACTION_FAILED);
    }

    #[test]
    fn test_string_cause_is_returned_verbatim() {
        let err = json!({ "cause": { "cause": "socket hang up" } });
        assert_eq!(parse(err), "socket hang up");
    }

    #[test]
    fn test_revert_data_with_known_selector() {
        let data = id("DebtNotZero()").to_vec();
        let failure = failure_from_revert_data(&data, "raw");
        assert_eq!(
            parse_contract_error(Some(&CaughtError::Object(failure))),
            "You must repay all debt before withdrawing"
        );
    }

    #[test]
    fn test_revert_data_with_arguments() {
        let mut data = id("ERC20InsufficientBalance(address,uint256,uint256)").to_vec();
        data.extend(abi::encode(&[
            Token::Address(Address::zero()),
            Token::Uint(U256::from(1)),
            Token::Uint(U256::from(2)),
        ]));
        let failure = failure_from_revert_data(&data, "raw");
        assert_eq!(
            parse_contract_error(Some(&CaughtError::Object(failure))),
            "Insufficient token balance"
        );
    }

    #[test]
    fn test_revert_string_reason() {
        let mut data = ERROR_STRING_SELECTOR.to_vec();
        data.extend(abi::encode(&[Token::String("InsufficientCollateral".to_string())]));
        let failure = failure_from_revert_data(&data, "raw");
        assert_eq!(
            failure.short_message.as_deref(),
            Some("execution reverted: InsufficientCollateral")
        );
        assert_eq!(
            parse_contract_error(Some(&CaughtError::Object(failure))),
            "Insufficient collateral"
        );
    }

    #[test]
    fn test_unknown_selector_falls_back_to_short_message() {
        let failure = failure_from_revert_data(&[0xde, 0xad, 0xbe, 0xef], "raw");
        assert_eq!(
            parse_contract_error(Some(&CaughtError::Object(failure))),
            "execution reverted"
        );
    }

    #[test]
    fn test_chain_error_user_messages() {
        assert_eq!(ChainError::TransactionReverted(H256::zero()).user_message(), TRANSACTION_FAILED);
        assert_eq!(ChainError::Wallet("nonce".into()).user_message(), WALLET_FAILURE);
        let contract = ChainError::Contract(
            Failure::with_short_message("execution reverted").caused_by(Failure::with_error_name("ZeroValue")),
        );
        assert_eq!(contract.user_message(), "Amount must be greater than zero");
    }
}
