//! Alpha Vantage Adapter
//!
//! Implements `QuoteSourcePort` against the `TIME_SERIES_INTRADAY` REST
//! endpoint.
//!
//! - `client`: request construction and transport errors
//! - `response`: body decoding and provider error detection
//! - `params`: interval and output size query values

mod client;
mod params;
mod response;

pub use client::{AlphaVantageClient, AlphaVantageError};
pub use params::{BarInterval, OutputSize};
pub use response::{AlphaVantageBar, IntradayResponse, MetaData, parse_bar_key};
