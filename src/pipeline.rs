use alloy::primitives::U256;
use async_stream::stream;
use futures_util::Stream;
use std::{fmt, sync::Arc};
use tracing::{error, info, warn};

use crate::aggregator;
use crate::amount;
use crate::config::{Config, Thresholds};
use crate::error::ChainQueryError;
use crate::models::{FlowTotals, Severity, Status};
use crate::parser::BridgeEvent;
use crate::rpc::{ChainClient, RpcChainClient};

pub const CHECKING_PAUSE: &str = "Checking if L1 proxy is paused...";
pub const CHECKING_L1_FLOW: &str = "Retrieving flow for L1 bridge...";
pub const CHECKING_L2_FLOW: &str = "Retrieving flow for L2 bridge...";
pub const PROXY_PAUSED: &str = "L1 Proxy is paused";
pub const POSSIBLE_HACK: &str =
    "Amount of ETH withdrawn higher than the amount deposited. Possible hack.";
pub const SLOW_PROCESSING: &str =
    "L2 bridge seems to be processing the transactions in a slow way.";
pub const HEALTHY: &str = "Bridge healthy! All checks have passed";
pub const CHECK_FAILED: &str = "An error occurred, check the console for more details";

/// Where a run currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    CheckingPause,
    CheckingL1Flow,
    CheckingL2Flow,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Stage::CheckingPause => "checking L1 proxy pause state",
            Stage::CheckingL1Flow => "retrieving L1 bridge flow",
            Stage::CheckingL2Flow => "retrieving L2 bridge flow",
        };
        f.write_str(s)
    }
}

/// `floor(total * percent / 100)` without overflowing on large totals
fn share_of(total: U256, percent: u32) -> U256 {
    let pct = U256::from(percent);
    let hundred = U256::from(100u64);
    (total / hundred)
        .saturating_mul(pct)
        .saturating_add((total % hundred) * pct / hundred)
}

/// Compare L2 deposits against L1 deposits. First match wins: excess on L2 is
/// a possible hack, a shortfall past the slow threshold is a warning.
pub fn classify(l1: &FlowTotals, l2: &FlowTotals, thresholds: &Thresholds) -> Status {
    if l2.deposited > share_of(l1.deposited, thresholds.hack_ratio_percent) {
        Status::new(Severity::Danger, POSSIBLE_HACK)
    } else if l2.deposited < share_of(l1.deposited, thresholds.slow_ratio_percent) {
        Status::new(Severity::Warning, SLOW_PROCESSING)
    } else {
        Status::new(Severity::Healthy, HEALTHY)
    }
}

/// Runs the staged bridge health check against one L1 and one L2 client.
///
/// The pipeline holds no per-run state, so the same instance can drive any
/// number of concurrent runs.
pub struct BridgeHealthPipeline {
    cfg: Config,
    l1: Arc<dyn ChainClient>,
    l2: Arc<dyn ChainClient>,
}

impl BridgeHealthPipeline {
    pub fn new(cfg: Config, l1: Arc<dyn ChainClient>, l2: Arc<dyn ChainClient>) -> Self {
        Self { cfg, l1, l2 }
    }

    /// JSON-RPC clients for the configured L1 and L2 endpoints
    pub fn from_config(cfg: Config) -> Result<Self, ChainQueryError> {
        let l1 = RpcChainClient::new("L1", cfg.l1_rpc_url.clone(), cfg.rpc_timeout)?;
        let l2 = RpcChainClient::new("L2", cfg.l2_rpc_url.clone(), cfg.rpc_timeout)?;
        Ok(Self::new(cfg, Arc::new(l1), Arc::new(l2)))
    }

    /// Start a run. Each stage yields its progress status before doing any
    /// work; the last element is the verdict. Dropping the stream cancels
    /// the run.
    pub fn run(&self) -> impl Stream<Item = Status> + Send + '_ {
        stream! {
            yield Status::checking(CHECKING_PAUSE);
            match self.l1.paused_state(self.cfg.l1_proxy).await {
                Ok(false) => {}
                Ok(true) => {
                    warn!("L1 proxy {} is paused", self.cfg.l1_proxy);
                    yield Status::new(Severity::Danger, PROXY_PAUSED);
                    return;
                }
                Err(e) => {
                    yield self.failed(Stage::CheckingPause, e);
                    return;
                }
            }

            yield Status::checking(CHECKING_L1_FLOW);
            let l1 = match aggregator::compute_chain_flows(
                self.l1.as_ref(),
                self.cfg.l1_bridge,
                BridgeEvent::L1EthDeposit,
                BridgeEvent::L1EthWithdrawal,
                self.cfg.l1_lookback_blocks,
                None,
            )
            .await
            {
                Ok(totals) => totals,
                Err(e) => {
                    yield self.failed(Stage::CheckingL1Flow, e);
                    return;
                }
            };
            self.log_totals("L1", &l1);

            yield Status::checking(CHECKING_L2_FLOW);
            let l2 = match aggregator::compute_chain_flows(
                self.l2.as_ref(),
                self.cfg.l2_bridge,
                BridgeEvent::L2Deposit,
                BridgeEvent::L2Withdrawal,
                self.cfg.l2_lookback_blocks,
                Some(self.cfg.native_asset),
            )
            .await
            {
                Ok(totals) => totals,
                Err(e) => {
                    yield self.failed(Stage::CheckingL2Flow, e);
                    return;
                }
            };
            self.log_totals("L2", &l2);

            let verdict = classify(&l1, &l2, &self.cfg.thresholds);
            info!("Verdict: {}", verdict.severity);
            yield verdict;
        }
    }

    fn failed(&self, stage: Stage, err: ChainQueryError) -> Status {
        error!("Health check failed while {}: {}", stage, err);
        Status::new(Severity::Unknown, CHECK_FAILED)
    }

    fn log_totals(&self, chain: &str, totals: &FlowTotals) {
        info!(
            "{} flow: deposited {} ETH, withdrawn {} ETH",
            chain,
            self.display_amount(totals.deposited),
            self.display_amount(totals.withdrawn)
        );
    }

    fn display_amount(&self, raw: U256) -> String {
        let decimals = self.cfg.native_decimals;
        match amount::to_decimal(raw, decimals) {
            Ok(d) => d.normalize().to_string(),
            Err(_) => amount::format_units(raw, decimals),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BlockRange, EventRecord};
    use alloy::primitives::{address, Address};
    use async_trait::async_trait;
    use futures_util::StreamExt;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const ETH: Address = address!("DeadDeAddeAddEAddeadDEaDDEAdDeaDDeAD0000");
    const DAI: Address = address!("DA10009cBd5D07dd0CeCc66161FC93D7c9000da1");

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Fail {
        Paused,
        Height,
        Events(BridgeEvent),
    }

    #[derive(Default)]
    struct MockChain {
        paused: bool,
        head: u64,
        events: Vec<(BridgeEvent, u64, Address)>,
        fail: Option<Fail>,
        paused_calls: AtomicUsize,
        height_calls: AtomicUsize,
        event_calls: AtomicUsize,
    }

    impl MockChain {
        fn with_events(events: Vec<(BridgeEvent, u64, Address)>) -> Self {
            Self {
                head: 1_000_000,
                events,
                ..Default::default()
            }
        }

        fn failing(fail: Fail) -> Self {
            Self {
                head: 1_000_000,
                fail: Some(fail),
                ..Default::default()
            }
        }

        fn flow_calls(&self) -> usize {
            self.height_calls.load(Ordering::SeqCst) + self.event_calls.load(Ordering::SeqCst)
        }
    }

    fn unreachable_endpoint() -> ChainQueryError {
        ChainQueryError::Status {
            status: 503,
            body: "upstream unavailable".to_string(),
        }
    }

    #[async_trait]
    impl ChainClient for MockChain {
        async fn paused_state(&self, _contract: Address) -> Result<bool, ChainQueryError> {
            self.paused_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail == Some(Fail::Paused) {
                return Err(unreachable_endpoint());
            }
            Ok(self.paused)
        }

        async fn block_height(&self) -> Result<u64, ChainQueryError> {
            self.height_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail == Some(Fail::Height) {
                return Err(unreachable_endpoint());
            }
            Ok(self.head)
        }

        async fn query_events(
            &self,
            _contract: Address,
            event: BridgeEvent,
            range: BlockRange,
        ) -> Result<Vec<EventRecord>, ChainQueryError> {
            self.event_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail == Some(Fail::Events(event)) {
                return Err(unreachable_endpoint());
            }
            Ok(self
                .events
                .iter()
                .filter(|(kind, _, _)| *kind == event)
                .map(|&(kind, amount, token)| EventRecord {
                    direction: kind.direction(),
                    amount: U256::from(amount),
                    token_address: token,
                    from_address: Address::ZERO,
                    block_number: range.from_block,
                    tx_hash: "0x00".to_string(),
                })
                .collect())
        }
    }

    fn pipeline(l1: MockChain, l2: MockChain) -> (BridgeHealthPipeline, Arc<MockChain>, Arc<MockChain>) {
        let l1 = Arc::new(l1);
        let l2 = Arc::new(l2);
        let p = BridgeHealthPipeline::new(Config::default(), l1.clone(), l2.clone());
        (p, l1, l2)
    }

    fn totals(deposited: u64) -> FlowTotals {
        FlowTotals {
            deposited: U256::from(deposited),
            withdrawn: U256::ZERO,
        }
    }

    fn verdict(l1: u64, l2: u64) -> Severity {
        classify(&totals(l1), &totals(l2), &Thresholds::default()).severity
    }

    fn severities(statuses: &[Status]) -> Vec<Severity> {
        statuses.iter().map(|s| s.severity).collect()
    }

    #[test]
    fn classification_thresholds() {
        assert_eq!(verdict(100, 100), Severity::Healthy);
        assert_eq!(verdict(100, 101), Severity::Danger);
        assert_eq!(verdict(100, 89), Severity::Warning);
        assert_eq!(verdict(100, 90), Severity::Healthy);
        assert_eq!(verdict(0, 0), Severity::Healthy);
    }

    #[test]
    fn any_l2_flow_without_l1_flow_is_danger() {
        assert_eq!(verdict(0, 1), Severity::Danger);
    }

    #[test]
    fn slow_threshold_uses_floor_division() {
        // 90% of 105 is 94.5, floored to 94
        assert_eq!(verdict(105, 94), Severity::Healthy);
        assert_eq!(verdict(105, 93), Severity::Warning);
    }

    #[test]
    fn thresholds_are_tunable() {
        let lenient = Thresholds {
            hack_ratio_percent: 110,
            slow_ratio_percent: 50,
        };
        let status = classify(&totals(100), &totals(105), &lenient);
        assert_eq!(status.severity, Severity::Healthy);
        let status = classify(&totals(100), &totals(111), &lenient);
        assert_eq!(status.severity, Severity::Danger);
        let status = classify(&totals(100), &totals(49), &lenient);
        assert_eq!(status.severity, Severity::Warning);
    }

    #[test]
    fn share_of_handles_full_range() {
        assert_eq!(share_of(U256::from(1000u64), 90), U256::from(900u64));
        assert_eq!(share_of(U256::from(7u64), 90), U256::from(6u64));
        assert_eq!(share_of(U256::MAX, 100), U256::MAX);
        assert!(share_of(U256::MAX, 90) < U256::MAX);
    }

    #[tokio::test]
    async fn slow_l2_ends_in_warning() {
        let l1 = MockChain::with_events(vec![
            (BridgeEvent::L1EthDeposit, 600, Address::ZERO),
            (BridgeEvent::L1EthDeposit, 400, Address::ZERO),
            (BridgeEvent::L1EthWithdrawal, 12_345, Address::ZERO),
        ]);
        let l2 = MockChain::with_events(vec![
            (BridgeEvent::L2Deposit, 850, ETH),
            (BridgeEvent::L2Deposit, 5_000, DAI),
            (BridgeEvent::L2Withdrawal, 777, ETH),
        ]);
        let (p, _, _) = pipeline(l1, l2);

        let statuses: Vec<Status> = p.run().collect().await;

        assert_eq!(
            statuses,
            vec![
                Status::checking(CHECKING_PAUSE),
                Status::checking(CHECKING_L1_FLOW),
                Status::checking(CHECKING_L2_FLOW),
                Status::new(Severity::Warning, SLOW_PROCESSING),
            ]
        );
    }

    #[tokio::test]
    async fn matching_flows_end_healthy() {
        let l1 = MockChain::with_events(vec![(BridgeEvent::L1EthDeposit, 1_000, Address::ZERO)]);
        let l2 = MockChain::with_events(vec![(BridgeEvent::L2Deposit, 950, ETH)]);
        let (p, _, _) = pipeline(l1, l2);

        let statuses: Vec<Status> = p.run().collect().await;

        assert_eq!(statuses.len(), 4);
        assert_eq!(statuses.last(), Some(&Status::new(Severity::Healthy, HEALTHY)));
    }

    #[tokio::test]
    async fn l2_excess_ends_in_danger() {
        let l1 = MockChain::with_events(vec![(BridgeEvent::L1EthDeposit, 1_000, Address::ZERO)]);
        let l2 = MockChain::with_events(vec![(BridgeEvent::L2Deposit, 1_001, ETH)]);
        let (p, _, _) = pipeline(l1, l2);

        let statuses: Vec<Status> = p.run().collect().await;

        assert_eq!(statuses.last(), Some(&Status::new(Severity::Danger, POSSIBLE_HACK)));
    }

    #[tokio::test]
    async fn paused_proxy_short_circuits() {
        let l1 = MockChain {
            paused: true,
            ..MockChain::with_events(vec![(BridgeEvent::L1EthDeposit, 1, Address::ZERO)])
        };
        let (p, l1, l2) = pipeline(l1, MockChain::default());

        let statuses: Vec<Status> = p.run().collect().await;

        assert_eq!(
            statuses,
            vec![
                Status::checking(CHECKING_PAUSE),
                Status::new(Severity::Danger, PROXY_PAUSED),
            ]
        );
        assert_eq!(l1.paused_calls.load(Ordering::SeqCst), 1);
        assert_eq!(l1.flow_calls(), 0);
        assert_eq!(l2.flow_calls(), 0);
    }

    #[tokio::test]
    async fn failures_end_in_a_single_unknown() {
        let cases = [
            (MockChain::failing(Fail::Paused), MockChain::default(), 1),
            (
                MockChain::failing(Fail::Events(BridgeEvent::L1EthWithdrawal)),
                MockChain::default(),
                2,
            ),
            (MockChain::failing(Fail::Height), MockChain::default(), 2),
            (
                MockChain::default(),
                MockChain::failing(Fail::Events(BridgeEvent::L2Deposit)),
                3,
            ),
            (MockChain::default(), MockChain::failing(Fail::Height), 3),
        ];

        for (l1, l2, checking) in cases {
            let (p, _, _) = pipeline(l1, l2);
            let statuses: Vec<Status> = p.run().collect().await;

            assert_eq!(statuses.len(), checking + 1);
            assert!(statuses[..checking]
                .iter()
                .all(|s| s.severity == Severity::Checking));
            assert_eq!(
                statuses.last(),
                Some(&Status::new(Severity::Unknown, CHECK_FAILED))
            );
        }
    }

    #[tokio::test]
    async fn error_detail_stays_out_of_status_text() {
        let (p, _, _) = pipeline(MockChain::failing(Fail::Paused), MockChain::default());
        let statuses: Vec<Status> = p.run().collect().await;
        let text = statuses.last().and_then(|s| s.text.clone()).unwrap_or_default();
        assert!(!text.contains("503"));
        assert!(!text.contains("upstream"));
    }

    #[tokio::test]
    async fn exactly_one_terminal_status_per_run() {
        let l1 = MockChain::with_events(vec![(BridgeEvent::L1EthDeposit, 10, Address::ZERO)]);
        let l2 = MockChain::with_events(vec![(BridgeEvent::L2Deposit, 10, ETH)]);
        let (p, _, _) = pipeline(l1, l2);

        let statuses: Vec<Status> = p.run().collect().await;
        let sev = severities(&statuses);

        assert_eq!(sev.iter().filter(|s| s.is_verdict()).count(), 1);
        assert!(sev.last().is_some_and(|s| s.is_verdict()));
    }

    #[tokio::test]
    async fn progress_is_yielded_before_the_work() {
        let (p, l1, l2) = pipeline(MockChain::default(), MockChain::default());

        let first: Vec<Status> = p.run().take(1).collect().await;

        assert_eq!(first, vec![Status::checking(CHECKING_PAUSE)]);
        assert_eq!(l1.paused_calls.load(Ordering::SeqCst), 0);
        assert_eq!(l2.flow_calls(), 0);
    }

    #[tokio::test]
    async fn concurrent_runs_are_independent() {
        let l1 = MockChain::with_events(vec![(BridgeEvent::L1EthDeposit, 1_000, Address::ZERO)]);
        let l2 = MockChain::with_events(vec![(BridgeEvent::L2Deposit, 850, ETH)]);
        let (p, l1, _) = pipeline(l1, l2);

        let (a, b) = tokio::join!(
            p.run().collect::<Vec<Status>>(),
            p.run().collect::<Vec<Status>>()
        );

        assert_eq!(a, b);
        assert_eq!(severities(&a).last(), Some(&Severity::Warning));
        assert_eq!(l1.paused_calls.load(Ordering::SeqCst), 2);
    }
}
