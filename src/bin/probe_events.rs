use bridge_health::amount::format_units;
use bridge_health::config;
use bridge_health::models::BlockRange;
use bridge_health::parser::BridgeEvent;
use bridge_health::rpc::{ChainClient, RpcChainClient};

// Keep the window small: public endpoints cap eth_getLogs ranges
const PROBE_BLOCKS: u64 = 10;
const SHOWN: usize = 5;

async fn probe(
    client: &RpcChainClient,
    contract: alloy::primitives::Address,
    events: [BridgeEvent; 2],
    decimals: u32,
) -> anyhow::Result<()> {
    let latest_block = client.block_height().await?;
    println!("[{}] Latest block: {}", client.name(), latest_block);

    let range = BlockRange::lookback(latest_block, PROBE_BLOCKS);
    for event in events {
        let records = client.query_events(contract, event, range).await?;
        println!("[{}] {} → {} logs", client.name(), event.signature(), records.len());

        for ev in records.iter().take(SHOWN) {
            println!(
                "Tx: {} | Block: {} | From: {} | Token: {} | Amount: {}",
                ev.tx_hash,
                ev.block_number,
                ev.from_address,
                ev.token_address,
                format_units(ev.amount, decimals)
            );
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cfg = config::load().map_err(|e| anyhow::anyhow!("{:?}", e))?;
    println!("Probing bridge events over the last {} blocks...", PROBE_BLOCKS);

    let l1 = RpcChainClient::new("L1", cfg.l1_rpc_url.clone(), cfg.rpc_timeout)?;
    let l2 = RpcChainClient::new("L2", cfg.l2_rpc_url.clone(), cfg.rpc_timeout)?;

    let paused = l1.paused_state(cfg.l1_proxy).await?;
    println!("[L1] Proxy {} paused: {}", cfg.l1_proxy, paused);

    probe(
        &l1,
        cfg.l1_bridge,
        [BridgeEvent::L1EthDeposit, BridgeEvent::L1EthWithdrawal],
        cfg.native_decimals,
    )
    .await?;

    probe(
        &l2,
        cfg.l2_bridge,
        [BridgeEvent::L2Deposit, BridgeEvent::L2Withdrawal],
        cfg.native_decimals,
    )
    .await?;

    Ok(())
}
