#![allow(dead_code)]

pub mod candles;
pub mod ledger;
