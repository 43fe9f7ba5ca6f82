//! Financial data collection stage

use super::STOCK_INFO;
use crate::collector::DataCollector;
use crate::state::{PipelineState, StateUpdate};
use analyst_core::{Result, RunContext, Stage};
use async_trait::async_trait;

/// Runs the data collector for the planned ticker
pub struct StockInfoStage {
    collector: DataCollector,
}

impl StockInfoStage {
    pub fn new(collector: DataCollector) -> Self {
        Self { collector }
    }
}

#[async_trait]
impl Stage<PipelineState> for StockInfoStage {
    fn name(&self) -> &str {
        STOCK_INFO
    }

    async fn run(&self, state: &PipelineState, ctx: &RunContext) -> Result<StateUpdate> {
        let ticker = state.ticker(STOCK_INFO)?;
        let financial_info = self.collector.collect(ticker, ctx).await;

        Ok(StateUpdate {
            financial_info: Some(financial_info),
            ..StateUpdate::default()
        })
    }
}
