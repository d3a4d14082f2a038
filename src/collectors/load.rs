use serde::Serialize;
use sysinfo::System;

/// System load averages.
#[derive(Debug, Serialize)]
pub struct LoadAverage {
    pub load_1: f64,
    pub load_5: f64,
    pub load_15: f64,
}

/// Collect the 1/5/15-minute load averages.
pub fn average() -> LoadAverage {
    let load = System::load_average();
    LoadAverage {
        load_1: load.one,
        load_5: load.five,
        load_15: load.fifteen,
    }
}
