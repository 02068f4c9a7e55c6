// Copyright (c) 2022-2023 The MobileCoin Foundation

#![allow(unused)]

use std::str::FromStr;

use log::LevelFilter;
use simplelog::SimpleLogger;

use ledger_alamgu::{
    config::{Config, TransferMode},
    DeviceHandle,
};
use ledger_alamgu_tests::mock::{MockDevice, MockOptions};

/// Setup a mock device and handle for the provided transfer mode
pub fn setup(opts: MockOptions) -> (MockDevice, DeviceHandle<MockDevice>) {
    // Setup logging
    let log_level = match std::env::var("LOG_LEVEL").map(|v| LevelFilter::from_str(&v)) {
        Ok(Ok(l)) => l,
        _ => LevelFilter::Debug,
    };

    let _ = SimpleLogger::init(log_level, simplelog::Config::default());

    let config = Config {
        transfer: opts.mode,
        ..Default::default()
    };

    let m = MockDevice::new(opts);
    let d = DeviceHandle::with_config(m.clone(), &config);

    (m, d)
}

/// Mock options for each transfer mode
pub fn modes() -> [MockOptions; 2] {
    [MockOptions::default(), MockOptions::blocks()]
}

/// Approve an operation on the mock device
pub async fn approve(m: &MockDevice) {
    m.approve().await
}

/// Reject an operation on the mock device
pub async fn reject(m: &MockDevice) {
    m.reject().await
}
