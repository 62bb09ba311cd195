// src/rpc.rs
use alloy::primitives::Address;
use alloy::sol_types::{sol_data, SolCall, SolType};
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;

use crate::error::ChainQueryError;
use crate::models::{BlockRange, EventRecord};
use crate::parser::{self, pausedCall, BridgeEvent};

#[derive(Debug, Deserialize, Clone)]
pub struct Log {
    #[allow(dead_code)]
    pub address: String,
    pub topics: Vec<String>,
    pub data: String,

    #[serde(rename = "blockNumber")]
    pub block_number_hex: String,

    #[serde(rename = "transactionHash")]
    pub tx_hash: String,

    #[serde(rename = "logIndex")]
    #[allow(dead_code)]
    pub log_index_hex: String,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RpcResponse<T> {
    Success { result: T },
    Error { error: RpcError },
}

#[derive(Debug, Deserialize)]
struct RpcError {
    code: i64,
    message: String,
}

/// Read access to one chain. Every call is independent: no caching, no retries.
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Value of `paused()` on `contract`
    async fn paused_state(&self, contract: Address) -> Result<bool, ChainQueryError>;

    /// Latest block number
    async fn block_height(&self) -> Result<u64, ChainQueryError>;

    /// All `event` logs emitted by `contract` within `range`, decoded
    async fn query_events(
        &self,
        contract: Address,
        event: BridgeEvent,
        range: BlockRange,
    ) -> Result<Vec<EventRecord>, ChainQueryError>;
}

/// JSON-RPC over HTTP
#[derive(Debug, Clone)]
pub struct RpcChainClient {
    name: String,
    rpc_url: String,
    client: Client,
}

impl RpcChainClient {
    pub fn new(
        name: impl Into<String>,
        rpc_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ChainQueryError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            name: name.into(),
            rpc_url: rpc_url.into(),
            client,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    async fn request<T: DeserializeOwned>(
        &self,
        method: &'static str,
        params: Value,
    ) -> Result<T, ChainQueryError> {
        let payload = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": method,
            "params": params
        });

        debug!("📡 [{}] Sending {} → {}", self.name, method, self.rpc_url);

        let resp = self.client.post(&self.rpc_url).json(&payload).send().await?;
        let status = resp.status();
        let text = resp.text().await?;
        if !status.is_success() {
            return Err(ChainQueryError::Status {
                status: status.as_u16(),
                body: text,
            });
        }

        debug!("📩 [{}] {} response: {} bytes", self.name, method, text.len());

        match serde_json::from_str::<RpcResponse<T>>(&text)? {
            RpcResponse::Success { result } => Ok(result),
            RpcResponse::Error { error } => Err(ChainQueryError::Rpc {
                code: error.code,
                message: error.message,
            }),
        }
    }
}

#[async_trait]
impl ChainClient for RpcChainClient {
    async fn paused_state(&self, contract: Address) -> Result<bool, ChainQueryError> {
        let calldata = pausedCall {}.abi_encode();
        let params = json!([{
            "to": contract.to_string(),
            "data": format!("0x{}", hex::encode(calldata)),
        }, "latest"]);

        let result: String = self.request("eth_call", params).await?;
        let bytes = hex::decode(result.trim_start_matches("0x"))
            .map_err(|e| ChainQueryError::decode(format!("eth_call result: {}", e)))?;

        sol_data::Bool::abi_decode(&bytes)
            .map_err(|e| ChainQueryError::decode(format!("paused() return: {}", e)))
    }

    async fn block_height(&self) -> Result<u64, ChainQueryError> {
        let result: String = self.request("eth_blockNumber", json!([])).await?;
        parser::parse_hex_u64(&result)
    }

    async fn query_events(
        &self,
        contract: Address,
        event: BridgeEvent,
        range: BlockRange,
    ) -> Result<Vec<EventRecord>, ChainQueryError> {
        let params = json!([{
            "fromBlock": range.from_block_hex(),
            "toBlock": range.to_block_tag(),
            "address": contract.to_string(),
            "topics": [format!("0x{}", hex::encode(event.topic0()))]
        }]);

        debug!(
            "[{}] eth_getLogs {} from block {} on {}",
            self.name,
            event.signature(),
            range.from_block,
            contract
        );

        let logs: Vec<Log> = self.request("eth_getLogs", params).await?;
        logs.iter().map(|log| event.decode(log)).collect()
    }
}
