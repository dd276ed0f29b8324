//! MiniBT Core: bars, resampling, the execution engine, analyzers, strategies.
//!
//! This crate contains everything needed to run one backtest:
//! - Domain types (bars, positions, trades, broker state)
//! - Semicolon-delimited bar loader and the lazy timeframe resampler
//! - Bar-by-bar execution engine with round-turn commission
//! - Performance, drawdown and trade-log analyzers
//! - Strategy trait, parameter sets and the strategy registry

pub mod analyzers;
pub mod data;
pub mod domain;
pub mod engine;
pub mod indicators;
pub mod strategy;

pub use analyzers::{AccountingSnapshot, Analyzer, TradeAccountant};
pub use data::{Resampler, Timeframe};
pub use domain::{Bar, BrokerState, OrderIntent, Side, Trade};
pub use engine::{EngineConfig, EngineError, ExecutionEngine, RunResult};
pub use strategy::{ParamSet, Strategy, StrategyContext, StrategyRegistry};
