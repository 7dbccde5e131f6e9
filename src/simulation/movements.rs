//! Monthly inbound/outbound pallet generation
//! Arrivals are scattered uniformly over the months; departures are drawn against the
//! stock on hand, and the last month always empties the warehouse.

use rand::{thread_rng, Rng};

/// Inbound and outbound pallets per month, in chronological order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MovementPlan {
    pub inbound: Vec<u32>,
    pub outbound: Vec<u32>,
}

impl MovementPlan {
    /// Pallets left in storage at the end of each month
    pub fn stock_after(&self) -> Vec<u32> {
        let mut stock = 0u32;
        self.inbound
            .iter()
            .zip(&self.outbound)
            .map(|(inbound, outbound)| {
                stock = stock + inbound - outbound;
                stock
            })
            .collect()
    }
}

/// Generate movements with the thread-local random generator
pub fn generate(pallet_count: u32, months: u32) -> MovementPlan {
    generate_with_rng(pallet_count, months, &mut thread_rng())
}

/// Generate movements for `pallet_count` pallets over `months` months (at least one).
pub fn generate_with_rng<R: Rng + ?Sized>(pallet_count: u32, months: u32, rng: &mut R) -> MovementPlan {
    let months = months.max(1) as usize;

    let mut inbound = vec![0u32; months];
    for _ in 0..pallet_count {
        inbound[rng.gen_range(0..months)] += 1;
    }

    let mut outbound = vec![0u32; months];
    let mut stock = 0u32;
    for month in 0..months {
        stock += inbound[month];
        outbound[month] = if month == months - 1 {
            stock
        } else {
            rng.gen_range(0..=stock)
        };
        stock -= outbound[month];
    }

    // Unreachable with the loop above.
    if stock > 0 {
        tracing::warn!(residual = stock, "movement plan left stock behind, liquidating in final month");
        outbound[months - 1] += stock;
    }

    MovementPlan { inbound, outbound }
}
