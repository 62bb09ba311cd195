use alloy::primitives::{Address, U256};
use tracing::info;

use crate::error::ChainQueryError;
use crate::models::{BlockRange, EventRecord, FlowDirection, FlowTotals};
use crate::parser::BridgeEvent;
use crate::rpc::ChainClient;

/// Sum the amounts of all `direction` events. With `native_asset` set, only
/// events for that token count. A total past `U256::MAX` cannot come from a
/// real chain and is reported as undecodable data.
pub fn sum_flows(
    events: &[EventRecord],
    direction: FlowDirection,
    native_asset: Option<Address>,
) -> Result<U256, ChainQueryError> {
    events
        .iter()
        .filter(|ev| ev.direction == direction)
        .filter(|ev| native_asset.map_or(true, |token| ev.token_address == token))
        .try_fold(U256::ZERO, |acc, ev| {
            acc.checked_add(ev.amount).ok_or_else(|| {
                ChainQueryError::decode(format!("flow total overflows uint256 at {}", ev.tx_hash))
            })
        })
}

/// Deposit and withdrawal totals of `bridge` over the last `lookback_blocks`.
pub async fn compute_chain_flows(
    client: &dyn ChainClient,
    bridge: Address,
    deposit_event: BridgeEvent,
    withdrawal_event: BridgeEvent,
    lookback_blocks: u64,
    native_asset: Option<Address>,
) -> Result<FlowTotals, ChainQueryError> {
    let head = client.block_height().await?;
    let range = BlockRange::lookback(head, lookback_blocks);

    // Both reads are independent
    let (deposits, withdrawals) = tokio::try_join!(
        client.query_events(bridge, deposit_event, range),
        client.query_events(bridge, withdrawal_event, range),
    )?;

    let totals = FlowTotals {
        deposited: sum_flows(&deposits, deposit_event.direction(), native_asset)?,
        withdrawn: sum_flows(&withdrawals, withdrawal_event.direction(), native_asset)?,
    };

    info!(
        "Flow on {} from block {} (head {}): {} deposit logs, {} withdrawal logs",
        bridge,
        range.from_block,
        head,
        deposits.len(),
        withdrawals.len()
    );

    Ok(totals)
}
