// src/parser.rs
use alloy::primitives::{Address, B256, U256};
use alloy::sol;
use alloy::sol_types::SolEvent;
use std::str::FromStr;

use crate::error::ChainQueryError;
use crate::models::{EventRecord, FlowDirection};
use crate::rpc::Log;

sol! {
    /// L1StandardBridge, ETH leaving L1 towards L2
    event ETHDepositInitiated(address indexed from, address indexed to, uint256 amount, bytes extraData);
    /// L1StandardBridge, ETH released on L1 after an L2 withdrawal
    event ETHWithdrawalFinalized(address indexed from, address indexed to, uint256 amount, bytes extraData);
    /// L2StandardBridge, any token credited on L2
    event DepositFinalized(address indexed l1Token, address indexed l2Token, address indexed from, address to, uint256 amount, bytes extraData);
    /// L2StandardBridge, any token burned on L2 to withdraw
    event WithdrawalInitiated(address indexed l1Token, address indexed l2Token, address indexed from, address to, uint256 amount, bytes extraData);

    function paused() external view returns (bool);
}

/// The bridge events the health check knows how to read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BridgeEvent {
    L1EthDeposit,
    L1EthWithdrawal,
    L2Deposit,
    L2Withdrawal,
}

impl BridgeEvent {
    /// keccak256 of the event signature, used as topic0 in `eth_getLogs`
    pub fn topic0(self) -> B256 {
        match self {
            BridgeEvent::L1EthDeposit => ETHDepositInitiated::SIGNATURE_HASH,
            BridgeEvent::L1EthWithdrawal => ETHWithdrawalFinalized::SIGNATURE_HASH,
            BridgeEvent::L2Deposit => DepositFinalized::SIGNATURE_HASH,
            BridgeEvent::L2Withdrawal => WithdrawalInitiated::SIGNATURE_HASH,
        }
    }

    pub fn signature(self) -> &'static str {
        match self {
            BridgeEvent::L1EthDeposit => ETHDepositInitiated::SIGNATURE,
            BridgeEvent::L1EthWithdrawal => ETHWithdrawalFinalized::SIGNATURE,
            BridgeEvent::L2Deposit => DepositFinalized::SIGNATURE,
            BridgeEvent::L2Withdrawal => WithdrawalInitiated::SIGNATURE,
        }
    }

    pub fn direction(self) -> FlowDirection {
        match self {
            BridgeEvent::L1EthDeposit | BridgeEvent::L2Deposit => FlowDirection::Deposit,
            BridgeEvent::L1EthWithdrawal | BridgeEvent::L2Withdrawal => FlowDirection::Withdrawal,
        }
    }

    /// Decode a raw log of this event kind into an `EventRecord`.
    ///
    /// L1 ETH events carry no token, so their `token_address` is the zero address.
    pub fn decode(self, log: &Log) -> Result<EventRecord, ChainQueryError> {
        let topics = log
            .topics
            .iter()
            .map(|t| B256::from_str(t))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| ChainQueryError::decode(format!("bad topic in {}: {}", log.tx_hash, e)))?;
        if topics.first() != Some(&self.topic0()) {
            return Err(ChainQueryError::decode(format!(
                "log in {} is not {}",
                log.tx_hash,
                self.signature()
            )));
        }
        let data = hex::decode(log.data.trim_start_matches("0x"))
            .map_err(|e| ChainQueryError::decode(format!("bad data in {}: {}", log.tx_hash, e)))?;

        let (amount, token_address, from_address) = self
            .decode_fields(&topics, &data)
            .map_err(|e| {
                ChainQueryError::decode(format!("{} in {}: {}", self.signature(), log.tx_hash, e))
            })?;

        let block_number = parse_hex_u64(&log.block_number_hex)?;

        Ok(EventRecord {
            direction: self.direction(),
            amount,
            token_address,
            from_address,
            block_number,
            tx_hash: log.tx_hash.clone(),
        })
    }

    fn decode_fields(
        self,
        topics: &[B256],
        data: &[u8],
    ) -> alloy::sol_types::Result<(U256, Address, Address)> {
        let topics = topics.iter().copied();
        Ok(match self {
            BridgeEvent::L1EthDeposit => {
                let ev = ETHDepositInitiated::decode_raw_log(topics, data)?;
                (ev.amount, Address::ZERO, ev.from)
            }
            BridgeEvent::L1EthWithdrawal => {
                let ev = ETHWithdrawalFinalized::decode_raw_log(topics, data)?;
                (ev.amount, Address::ZERO, ev.from)
            }
            BridgeEvent::L2Deposit => {
                let ev = DepositFinalized::decode_raw_log(topics, data)?;
                (ev.amount, ev.l2Token, ev.from)
            }
            BridgeEvent::L2Withdrawal => {
                let ev = WithdrawalInitiated::decode_raw_log(topics, data)?;
                (ev.amount, ev.l2Token, ev.from)
            }
        })
    }
}

/// Parse a `0x`-prefixed hex quantity
pub fn parse_hex_u64(s: &str) -> Result<u64, ChainQueryError> {
    u64::from_str_radix(s.trim_start_matches("0x"), 16)
        .map_err(|e| ChainQueryError::decode(format!("bad hex quantity {:?}: {}", s, e)))
}
